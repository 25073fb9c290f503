//! Schema surfaces: segments, per-segment definitions, field config.

use std::path::Path;

use anyhow::Result;

use batchline_client::Api;
use batchline_core::schema::ParameterKind;

use super::open_session;

pub fn segments(json_output: bool, config_path: &Path) -> Result<()> {
    let session = open_session(config_path)?;
    let segments = session.api().process_segments()?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&segments)?);
        return Ok(());
    }

    if segments.is_empty() {
        println!("No process segments configured.");
        return Ok(());
    }
    for segment in segments {
        match segment.description.as_deref() {
            Some(description) if !description.is_empty() => {
                println!("{:16} {}", segment.segment_name, description)
            }
            _ => println!("{}", segment.segment_name),
        }
    }
    Ok(())
}

pub fn definitions(segment: &str, json_output: bool, config_path: &Path) -> Result<()> {
    let session = open_session(config_path)?;
    let defs = session.api().segment_definitions(segment)?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&defs)?);
        return Ok(());
    }

    println!("Materials:");
    if defs.materials.is_empty() {
        println!("  (none — manual entry)");
    }
    for def in &defs.materials {
        println!(
            "  {:14} {:20} unit={:6} supplier={}",
            def.code,
            def.name,
            def.unit.as_deref().unwrap_or("-"),
            def.supplier.as_deref().unwrap_or("-"),
        );
    }

    println!("Equipment:");
    if defs.equipment.is_empty() {
        println!("  (none — manual entry)");
    }
    for def in &defs.equipment {
        println!("  {:14} {}", def.code, def.name);
        for spec in &def.parameters {
            let kind = match spec.kind {
                ParameterKind::Text => "text",
                ParameterKind::Number => "number",
                ParameterKind::Boolean => "boolean",
                ParameterKind::Datetime => "datetime",
                ParameterKind::Select => "select",
            };
            let required = if spec.required { " (required)" } else { "" };
            let unit = spec
                .unit
                .as_deref()
                .map(|u| format!(" [{u}]"))
                .unwrap_or_default();
            println!("    - {} {kind}{unit}{required}", spec.display_label());
            if !spec.options.is_empty() {
                println!("      options: {}", spec.options.join(", "));
            }
        }
    }

    println!("Quality:");
    if defs.quality.is_empty() {
        println!("  (none — manual entry)");
    }
    for def in &defs.quality {
        let range = match (def.min, def.max) {
            (Some(min), Some(max)) => format!("{min} ~ {max}"),
            _ => "-".to_string(),
        };
        println!(
            "  {:16} unit={:8} range={}",
            def.item,
            def.unit.as_deref().unwrap_or("-"),
            range,
        );
    }
    Ok(())
}

pub fn fields(json_output: bool, config_path: &Path) -> Result<()> {
    let session = open_session(config_path)?;
    let config = session.field_config();

    if json_output {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "batch_status_options": config.batch_status_options,
                "equipment_status_options": config.equipment_status_options,
                "completed_status": config.completed_status,
            }))?
        );
        return Ok(());
    }

    println!("Batch statuses:     {}", config.batch_status_options.join(", "));
    println!("Equipment statuses: {}", config.equipment_status_options.join(", "));
    println!("Completed status:   {}", config.completed_status);
    Ok(())
}

//! Record commands, driven by the dynamic forms.

use std::path::{Path, PathBuf};

use anyhow::Result;

use batchline_client::{HttpApi, Session};

use super::{confirm, open_session};
use crate::{Category, RecordFields};

pub fn list(category: Category, batch_id: i64, json_output: bool, config_path: &Path) -> Result<()> {
    let mut session = open_session(config_path)?;
    session.refresh_batches()?;
    session.select_batch(Some(batch_id))?;
    session.reload_records()?;

    match category {
        Category::Material => {
            let records: Vec<_> = session.materials().collect();
            if json_output {
                println!("{}", serde_json::to_string_pretty(&records)?);
                return Ok(());
            }
            if records.is_empty() {
                println!("No material records.");
                return Ok(());
            }
            println!(
                "{:>6} {:14} {:20} {:>10} {:8} {:16} {:14}",
                "ID", "CODE", "NAME", "WEIGHT", "UNIT", "SUPPLIER", "LOT"
            );
            for r in records {
                println!(
                    "{:>6} {:14} {:20} {:>10} {:8} {:16} {:14}",
                    r.id,
                    r.material_code,
                    r.material_name,
                    r.weight,
                    r.unit.as_deref().unwrap_or("-"),
                    r.supplier.as_deref().unwrap_or("-"),
                    r.lot_number.as_deref().unwrap_or("-"),
                );
            }
        }
        Category::Equipment => {
            let records: Vec<_> = session.equipment_records().collect();
            if json_output {
                println!("{}", serde_json::to_string_pretty(&records)?);
                return Ok(());
            }
            if records.is_empty() {
                println!("No equipment records.");
                return Ok(());
            }
            println!(
                "{:>6} {:14} {:20} {:18} {:10} {:>5}",
                "ID", "CODE", "NAME", "START", "STATUS", "FILES"
            );
            for r in records {
                println!(
                    "{:>6} {:14} {:20} {:18} {:10} {:>5}",
                    r.id,
                    r.equipment_code,
                    r.equipment_name,
                    r.start_time,
                    r.status,
                    r.attachments.len(),
                );
                if !r.parameters.is_empty() {
                    let params: Vec<String> =
                        r.parameters.iter().map(|(k, v)| format!("{k}: {v}")).collect();
                    println!("       {}", params.join("; "));
                }
            }
        }
        Category::Quality => {
            let records: Vec<_> = session.quality_records().collect();
            if json_output {
                println!("{}", serde_json::to_string_pretty(&records)?);
                return Ok(());
            }
            if records.is_empty() {
                println!("No quality records.");
                return Ok(());
            }
            println!(
                "{:>6} {:16} {:>10} {:8} {:14} {:8} {:>5}",
                "ID", "ITEM", "VALUE", "UNIT", "RANGE", "RESULT", "FILES"
            );
            for r in records {
                let range = match (r.standard_min, r.standard_max) {
                    (Some(min), Some(max)) => format!("{min} ~ {max}"),
                    _ => "-".to_string(),
                };
                println!(
                    "{:>6} {:16} {:>10} {:8} {:14} {:8} {:>5}",
                    r.id,
                    r.test_item,
                    r.test_value,
                    r.unit.as_deref().unwrap_or("-"),
                    range,
                    r.result.as_deref().unwrap_or("-"),
                    r.attachments.len(),
                );
            }
        }
    }
    Ok(())
}

pub fn add(
    category: Category,
    batch_id: i64,
    fields: &RecordFields,
    yes: bool,
    config_path: &Path,
) -> Result<()> {
    let mut session = open_session(config_path)?;
    session.refresh_batches()?;
    session.select_batch(Some(batch_id))?;

    apply_fields(&mut session, category, fields);
    if !confirm(&format!("Save this {} record?", category_name(category)), yes) {
        println!("Cancelled.");
        return Ok(());
    }
    submit(&mut session, category)?;
    println!("{} record saved.", category_name(category));
    Ok(())
}

pub fn edit(
    category: Category,
    batch_id: i64,
    record_id: i64,
    fields: &RecordFields,
    drop: &[String],
    yes: bool,
    config_path: &Path,
) -> Result<()> {
    let mut session = open_session(config_path)?;
    session.refresh_batches()?;
    session.select_batch(Some(batch_id))?;
    session.reload_records()?;

    match category {
        Category::Material => session.edit_material(record_id)?,
        Category::Equipment => session.edit_equipment(record_id)?,
        Category::Quality => session.edit_quality(record_id)?,
    }

    apply_fields(&mut session, category, fields);
    for path in drop {
        let removed = match category {
            Category::Material => {
                anyhow::bail!("material records carry no attachments");
            }
            Category::Equipment => session.equipment_form.attachments.remove_existing(path),
            Category::Quality => session.quality_form.attachments.remove_existing(path),
        };
        if !removed {
            anyhow::bail!("attachment \"{path}\" is not on the record");
        }
    }

    if !confirm(&format!("Update this {} record?", category_name(category)), yes) {
        println!("Cancelled.");
        return Ok(());
    }
    submit(&mut session, category)?;
    println!("{} record updated.", category_name(category));
    Ok(())
}

pub fn delete(
    category: Category,
    batch_id: i64,
    record_id: i64,
    yes: bool,
    config_path: &Path,
) -> Result<()> {
    let mut session = open_session(config_path)?;
    session.refresh_batches()?;
    session.select_batch(Some(batch_id))?;
    session.reload_records()?;

    if !confirm(
        &format!(
            "Delete {} record {record_id}? This cannot be undone.",
            category_name(category)
        ),
        yes,
    ) {
        println!("Cancelled.");
        return Ok(());
    }

    match category {
        Category::Material => session.delete_material(record_id)?,
        Category::Equipment => session.delete_equipment(record_id)?,
        Category::Quality => session.delete_quality(record_id)?,
    }
    println!("Record {record_id} deleted.");
    Ok(())
}

pub fn attach(
    category: Category,
    batch_id: i64,
    record_id: i64,
    files: &[String],
    config_path: &Path,
) -> Result<()> {
    if files.is_empty() {
        anyhow::bail!("no files given");
    }
    let paths: Vec<PathBuf> = files.iter().map(PathBuf::from).collect();

    let mut session = open_session(config_path)?;
    session.refresh_batches()?;
    session.select_batch(Some(batch_id))?;
    session.reload_records()?;

    match category {
        Category::Material => anyhow::bail!("material records carry no attachments"),
        Category::Equipment => {
            session.attach_to_equipment(record_id, paths)?;
        }
        Category::Quality => {
            session.attach_to_quality(record_id, paths)?;
        }
    }
    println!("Attachments uploaded.");
    Ok(())
}

fn category_name(category: Category) -> &'static str {
    match category {
        Category::Material => "material",
        Category::Equipment => "equipment",
        Category::Quality => "quality",
    }
}

/// Copy provided flags into the active form. Selecting a code/item
/// goes through the session so catalog definitions autofill and lock
/// their fields; locked fields ignore manual overrides.
fn apply_fields(session: &mut Session<HttpApi>, category: Category, fields: &RecordFields) {
    match category {
        Category::Material => {
            if let Some(code) = &fields.code {
                session.select_material_code(code);
            }
            let locked = session.material_form.definition_locked();
            let form = &mut session.material_form;
            if !locked {
                if let Some(name) = &fields.name {
                    form.name = name.clone();
                }
                if let Some(supplier) = &fields.supplier {
                    form.supplier = supplier.clone();
                }
            }
            if let Some(weight) = &fields.weight {
                form.weight = weight.clone();
            }
            if let Some(unit) = &fields.unit {
                form.unit = unit.clone();
            }
            if let Some(lot) = &fields.lot {
                form.lot_number = lot.clone();
            }
        }
        Category::Equipment => {
            if let Some(code) = &fields.code {
                session.select_equipment_code(code);
            }
            let locked = session.equipment_form.definition_locked();
            let form = &mut session.equipment_form;
            if !locked {
                if let Some(name) = &fields.name {
                    form.name = name.clone();
                }
            }
            if let Some(start) = &fields.start {
                form.start_time = start.clone();
            }
            if let Some(end) = &fields.end {
                form.end_time = end.clone();
            }
            if let Some(status) = &fields.status {
                form.status = status.clone();
            }
            for pair in &fields.params {
                if let Some((key, value)) = pair.split_once('=') {
                    form.set_parameter(key, value);
                }
            }
            for file in &fields.attach {
                form.add_attachment(PathBuf::from(file));
            }
        }
        Category::Quality => {
            if let Some(item) = &fields.item {
                session.select_quality_item(item);
            }
            let locked = session.quality_form.definition_locked();
            let form = &mut session.quality_form;
            if let Some(value) = &fields.value {
                form.test_value = value.clone();
            }
            if !locked {
                if let Some(unit) = &fields.unit {
                    form.unit = unit.clone();
                }
            }
            if let Some(min) = &fields.min {
                form.standard_min = min.clone();
            }
            if let Some(max) = &fields.max {
                form.standard_max = max.clone();
            }
            if let Some(notes) = &fields.notes {
                form.notes = notes.clone();
            }
            for file in &fields.attach {
                form.add_attachment(PathBuf::from(file));
            }
        }
    }
}

fn submit(session: &mut Session<HttpApi>, category: Category) -> Result<()> {
    match category {
        Category::Material => session.submit_material()?,
        Category::Equipment => session.submit_equipment()?,
        Category::Quality => session.submit_quality()?,
    };
    Ok(())
}

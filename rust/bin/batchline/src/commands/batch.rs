//! Batch commands: listing, lifecycle updates, duplication, deletion.

use std::path::Path;

use anyhow::Result;

use batchline_client::{Api, UpdateOutcome};
use batchline_core::deletion::{DeletionChain, Selection};
use batchline_core::BatchFilter;

use super::{confirm, open_session, prompt_line};

pub fn list(
    product: Option<String>,
    batch: Option<String>,
    segment: Option<String>,
    json_output: bool,
    config_path: &Path,
) -> Result<()> {
    let mut session = open_session(config_path)?;
    session.refresh_batches()?;

    let filter = BatchFilter {
        product_keyword: product,
        batch_keyword: batch,
        segment,
    };
    let views = session.index().filter(&filter);

    if json_output {
        println!("{}", serde_json::to_string_pretty(&views)?);
        return Ok(());
    }

    if views.is_empty() {
        println!("No batches.");
        return Ok(());
    }

    println!(
        "{:>6} {:24} {:16} {:20} {:10} {:7}",
        "ID", "BATCH", "SEGMENT", "PRODUCT", "STATUS", "LATEST"
    );
    for view in views {
        println!(
            "{:>6} {:24} {:16} {:20} {:10} {:7}",
            view.id,
            view.batch_number,
            view.process_segment,
            view.product_name,
            view.status,
            if view.is_latest_segment { "*" } else { "" }
        );
    }
    Ok(())
}

pub fn show(id: i64, config_path: &Path) -> Result<()> {
    let session = open_session(config_path)?;
    let detail = session.api().batch_detail(id)?;
    println!("{}", serde_json::to_string_pretty(&serde_json::json!({
        "batch": detail.batch,
        "segments": detail.segments,
        "summary": detail.summary,
    }))?);
    Ok(())
}

pub fn create(
    number: &str,
    product: &str,
    segment: &str,
    yes: bool,
    config_path: &Path,
) -> Result<()> {
    let mut session = open_session(config_path)?;
    session.refresh_batches()?;

    if session.index().batch_number_exists(number)
        && !confirm(
            &format!(
                "Batch number \"{number}\" already exists; the segment will disambiguate. Continue?"
            ),
            yes,
        )
    {
        println!("Cancelled.");
        return Ok(());
    }

    let batch = session.create_batch(&batchline_client::CreateBatchRequest {
        batch_number: number.to_string(),
        product_name: product.to_string(),
        process_segment: segment.to_string(),
    })?;
    println!("Batch {} created (id {}).", batch.batch_number, batch.id);
    Ok(())
}

pub fn status(id: i64, status: &str, yes: bool, config_path: &Path) -> Result<()> {
    let mut session = open_session(config_path)?;
    session.refresh_batches()?;
    session.select_batch(Some(id))?;

    let number = session
        .current()
        .map(|b| b.batch_number.clone())
        .unwrap_or_default();
    if !confirm(
        &format!("Update batch {number} to status \"{status}\"?"),
        yes,
    ) {
        println!("Cancelled.");
        return Ok(());
    }

    match session.update_batch_status(status)? {
        UpdateOutcome::Unchanged => println!("Status unchanged, nothing to do."),
        UpdateOutcome::Updated(batch) => {
            println!("Batch {} is now \"{}\".", batch.batch_number, batch.status)
        }
    }
    Ok(())
}

pub fn segment(id: i64, segment: &str, yes: bool, config_path: &Path) -> Result<()> {
    let mut session = open_session(config_path)?;
    session.refresh_batches()?;
    session.select_batch(Some(id))?;

    let number = session
        .current()
        .map(|b| b.batch_number.clone())
        .unwrap_or_default();
    if !confirm(
        &format!("Move batch {number} to segment \"{segment}\"?"),
        yes,
    ) {
        println!("Cancelled.");
        return Ok(());
    }

    match session.update_batch_segment(segment)? {
        UpdateOutcome::Unchanged => println!("Batch already in that segment, nothing to do."),
        UpdateOutcome::Updated(batch) => println!(
            "Batch {} moved to \"{}\".",
            batch.batch_number, batch.process_segment
        ),
    }
    Ok(())
}

pub fn duplicate(
    id: i64,
    number: &str,
    product: &str,
    copy_records: bool,
    yes: bool,
    config_path: &Path,
) -> Result<()> {
    let mut session = open_session(config_path)?;
    session.refresh_batches()?;
    session.select_batch(Some(id))?;

    let current = session
        .current()
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("batch {} not found", id))?;
    if number == current.batch_number
        && product == current.product_name
        && !confirm(
            "New batch number and product match the current ones; an identical copy will be created. Continue?",
            yes,
        )
    {
        println!("Cancelled.");
        return Ok(());
    }

    let created = session.duplicate_batch(number, product, copy_records)?;
    println!(
        "Batch duplicated: {} (id {}).",
        created.batch_number, created.id
    );
    Ok(())
}

pub fn delete(id: i64, yes: bool, config_path: &Path) -> Result<()> {
    let mut session = open_session(config_path)?;
    session.refresh_batches()?;

    let label = session
        .index()
        .find_by_id(id)
        .map(|v| v.display_label())
        .ok_or_else(|| anyhow::anyhow!("batch {} not found", id))?;
    if !confirm(&format!("Delete batch {label}? This cannot be undone."), yes) {
        println!("Cancelled.");
        return Ok(());
    }

    session.delete_batch(id)?;
    println!("Batch {id} deleted.");
    Ok(())
}

/// Cascading bulk delete. Flags pre-fill the four selector levels;
/// missing ones are prompted interactively from the actual chain.
pub fn purge(
    product: Option<String>,
    batch: Option<String>,
    segment: Option<String>,
    status: Option<String>,
    yes: bool,
    config_path: &Path,
) -> Result<()> {
    let mut session = open_session(config_path)?;
    session.refresh_batches()?;

    let chain = session.deletion_chain()?;
    if chain.is_empty() {
        println!("No batches to delete.");
        return Ok(());
    }

    let mut selection = Selection::default();
    resolve_level(
        &chain,
        &mut selection,
        Level::Product,
        product.as_deref(),
    )?;
    resolve_level(&chain, &mut selection, Level::Batch, batch.as_deref())?;
    resolve_level(&chain, &mut selection, Level::Segment, segment.as_deref())?;
    resolve_level(&chain, &mut selection, Level::Status, status.as_deref())?;

    let key = selection
        .delete_key()
        .ok_or_else(|| anyhow::anyhow!("请完整选择产品、批号、工段和状态"))?;

    if !confirm(
        &format!(
            "确认删除产品「{}」批号「{}」工段「{}」状态「{}」的所有数据吗？",
            key.product_name, key.batch_number, key.process_segment, key.status
        ),
        yes,
    ) {
        println!("Cancelled.");
        return Ok(());
    }

    let deleted = session.bulk_delete(&selection)?;
    if deleted > 1 {
        println!("批号记录删除成功（共删除{deleted}条）");
    } else {
        println!("批号记录删除成功");
    }
    Ok(())
}

#[derive(Clone, Copy)]
enum Level {
    Product,
    Batch,
    Segment,
    Status,
}

/// Apply a flag value or prompt for one level of the chain. A level
/// already auto-selected (sole status) is left alone.
fn resolve_level(
    chain: &DeletionChain,
    selection: &mut Selection,
    level: Level,
    provided: Option<&str>,
) -> Result<()> {
    let (label, options): (&str, Vec<String>) = match level {
        Level::Product => (
            "product",
            chain.products().iter().map(|s| s.to_string()).collect(),
        ),
        Level::Batch => {
            let Some(product) = selection.product.clone() else {
                anyhow::bail!("select a product first");
            };
            (
                "batch number",
                chain
                    .batch_numbers(&product)
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            )
        }
        Level::Segment => {
            let (Some(product), Some(batch)) =
                (selection.product.clone(), selection.batch_number.clone())
            else {
                anyhow::bail!("select a batch number first");
            };
            (
                "segment",
                chain
                    .segments(&product, &batch)
                    .iter()
                    .map(|e| e.segment.clone())
                    .collect(),
            )
        }
        Level::Status => {
            let (Some(product), Some(batch), Some(segment)) = (
                selection.product.clone(),
                selection.batch_number.clone(),
                selection.segment.clone(),
            ) else {
                anyhow::bail!("select a segment first");
            };
            if selection.status.is_some() && provided.is_none() {
                // Sole status already auto-selected.
                return Ok(());
            }
            ("status", chain.statuses(&product, &batch, &segment))
        }
    };

    let value = match provided {
        Some(value) => value.to_string(),
        None => {
            eprintln!("Available {label}s:");
            for (i, option) in options.iter().enumerate() {
                let annotated = match level {
                    Level::Segment => {
                        let product = selection.product.as_deref().unwrap_or_default();
                        let batch = selection.batch_number.as_deref().unwrap_or_default();
                        chain
                            .segments(product, batch)
                            .iter()
                            .find(|e| e.segment == *option)
                            .map(|e| e.display_label())
                            .unwrap_or_else(|| option.clone())
                    }
                    _ => option.clone(),
                };
                eprintln!("  {}. {}", i + 1, annotated);
            }
            let input = prompt_line(&format!("Select {label} (number or value): "))?;
            match input.parse::<usize>() {
                Ok(i) if i >= 1 && i <= options.len() => options[i - 1].clone(),
                _ => input,
            }
        }
    };

    if !options.contains(&value) {
        anyhow::bail!("unknown {label}: {value}");
    }

    match level {
        Level::Product => selection.select_product(chain, Some(&value)),
        Level::Batch => selection.select_batch_number(chain, Some(&value)),
        Level::Segment => selection.select_segment(chain, Some(&value)),
        Level::Status => selection.select_status(chain, Some(&value)),
    }
    Ok(())
}

//! Product → batch number → segment → status grouping behind the
//! cascading bulk-delete selectors.
//!
//! The chain is rebuilt from the batch index whenever it refreshes;
//! [`Selection`] revalidates downstream levels on every upstream
//! change so a stale pick can never survive a data reload.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::batch::BatchView;

/// One `(segment, id)` entry under a product/batch-number pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentEntry {
    pub id: i64,
    pub segment: String,
    pub status: String,
    pub is_latest: bool,
}

impl SegmentEntry {
    /// Selector label: segment annotated with status and the latest
    /// marker, e.g. `成型（已完成）【当前】`.
    pub fn display_label(&self) -> String {
        let status = if self.status.is_empty() {
            String::new()
        } else {
            format!("（{}）", self.status)
        };
        let latest = if self.is_latest { "【当前】" } else { "" };
        format!("{}{}{}", self.segment, status, latest)
    }
}

/// The quadruple sent to `DELETE /api/batches/delete`. The server may
/// remove more than one row for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteKey {
    pub product_name: String,
    pub batch_number: String,
    pub process_segment: String,
    pub status: String,
}

/// product_name → batch_number → segment entries.
#[derive(Debug, Clone, Default)]
pub struct DeletionChain {
    map: BTreeMap<String, BTreeMap<String, Vec<SegmentEntry>>>,
}

impl DeletionChain {
    /// Group batch views for the selectors. Entries missing product,
    /// batch number, or segment are skipped; `(segment, id)` pairs are
    /// deduplicated.
    pub fn build(views: &[BatchView]) -> DeletionChain {
        let mut map: BTreeMap<String, BTreeMap<String, Vec<SegmentEntry>>> = BTreeMap::new();

        for view in views {
            if view.product_name.is_empty()
                || view.batch_number.is_empty()
                || view.process_segment.is_empty()
            {
                continue;
            }

            let entries = map
                .entry(view.product_name.clone())
                .or_default()
                .entry(view.batch_number.clone())
                .or_default();

            let exists = entries
                .iter()
                .any(|e| e.segment == view.process_segment && e.id == view.id);
            if !exists {
                entries.push(SegmentEntry {
                    id: view.id,
                    segment: view.process_segment.clone(),
                    status: view.status.clone(),
                    is_latest: view.is_latest_segment,
                });
            }
        }

        for batches in map.values_mut() {
            for entries in batches.values_mut() {
                entries.sort_by(|a, b| a.segment.cmp(&b.segment));
            }
        }

        DeletionChain { map }
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Product names, alphabetical.
    pub fn products(&self) -> Vec<&str> {
        self.map.keys().map(String::as_str).collect()
    }

    /// Batch numbers under a product, alphabetical.
    pub fn batch_numbers(&self, product: &str) -> Vec<&str> {
        self.map
            .get(product)
            .map(|batches| batches.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Segment entries under a product/batch pair, segment-ascending.
    pub fn segments(&self, product: &str, batch_number: &str) -> &[SegmentEntry] {
        self.map
            .get(product)
            .and_then(|batches| batches.get(batch_number))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Distinct statuses for the exact (product, batch, segment)
    /// triple, sorted. Entries with an empty status are ignored.
    pub fn statuses(&self, product: &str, batch_number: &str, segment: &str) -> Vec<String> {
        let mut statuses: Vec<String> = self
            .segments(product, batch_number)
            .iter()
            .filter(|e| e.segment == segment && !e.status.is_empty())
            .map(|e| e.status.clone())
            .collect();
        statuses.sort();
        statuses.dedup();
        statuses
    }

    /// The entry a complete selection points at, if any.
    pub fn entry_for(
        &self,
        product: &str,
        batch_number: &str,
        segment: &str,
        status: &str,
    ) -> Option<&SegmentEntry> {
        self.segments(product, batch_number)
            .iter()
            .find(|e| e.segment == segment && e.status == status)
    }
}

/// Current picks across the four selector levels. Any upstream change
/// that no longer matches a downstream pick clears it; a sole
/// remaining status auto-selects.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub product: Option<String>,
    pub batch_number: Option<String>,
    pub segment: Option<String>,
    pub status: Option<String>,
}

impl Selection {
    pub fn select_product(&mut self, chain: &DeletionChain, product: Option<&str>) {
        self.product = product.map(str::to_string);
        self.revalidate(chain);
    }

    pub fn select_batch_number(&mut self, chain: &DeletionChain, batch_number: Option<&str>) {
        self.batch_number = batch_number.map(str::to_string);
        self.revalidate(chain);
    }

    pub fn select_segment(&mut self, chain: &DeletionChain, segment: Option<&str>) {
        self.segment = segment.map(str::to_string);
        self.revalidate(chain);
    }

    pub fn select_status(&mut self, chain: &DeletionChain, status: Option<&str>) {
        self.status = status.map(str::to_string);
        self.revalidate(chain);
    }

    /// Re-derive each level from the chain, top-down. Called after
    /// every pick and after the chain itself is rebuilt.
    pub fn revalidate(&mut self, chain: &DeletionChain) {
        if let Some(product) = &self.product {
            if !chain.products().contains(&product.as_str()) {
                self.product = None;
            }
        }
        let Some(product) = self.product.clone() else {
            self.batch_number = None;
            self.segment = None;
            self.status = None;
            return;
        };

        if let Some(batch_number) = &self.batch_number {
            if !chain
                .batch_numbers(&product)
                .contains(&batch_number.as_str())
            {
                self.batch_number = None;
            }
        }
        let Some(batch_number) = self.batch_number.clone() else {
            self.segment = None;
            self.status = None;
            return;
        };

        if let Some(segment) = &self.segment {
            if !chain
                .segments(&product, &batch_number)
                .iter()
                .any(|e| &e.segment == segment)
            {
                self.segment = None;
            }
        }
        let Some(segment) = self.segment.clone() else {
            self.status = None;
            return;
        };

        let statuses = chain.statuses(&product, &batch_number, &segment);
        match &self.status {
            Some(status) if statuses.iter().any(|s| s == status) => {}
            _ => {
                // A sole status pre-selects.
                self.status = if statuses.len() == 1 {
                    Some(statuses[0].clone())
                } else {
                    None
                };
            }
        }
    }

    /// All four levels set.
    pub fn ready(&self) -> bool {
        self.product.is_some()
            && self.batch_number.is_some()
            && self.segment.is_some()
            && self.status.is_some()
    }

    pub fn delete_key(&self) -> Option<DeleteKey> {
        Some(DeleteKey {
            product_name: self.product.clone()?,
            batch_number: self.batch_number.clone()?,
            process_segment: self.segment.clone()?,
            status: self.status.clone()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::{expand, Batch};

    fn sample_views() -> Vec<BatchView> {
        let batches: Vec<Batch> = serde_json::from_str(
            r#"[
                {"id": 2, "batch_number": "B-100", "product_name": "ProductX",
                 "process_segment": "成型", "status": "已完成",
                 "segment_summaries": [
                    {"batch_id": 1, "process_segment": "混合", "status": "进行中"},
                    {"batch_id": 2, "process_segment": "成型", "status": "已完成"}
                 ]},
                {"id": 3, "batch_number": "B-100", "product_name": "ProductX",
                 "process_segment": "成型", "status": "已完成"},
                {"id": 4, "batch_number": "B-200", "product_name": "ProductY",
                 "process_segment": "混合", "status": "暂停"}
            ]"#,
        )
        .unwrap();
        expand(&batches)
    }

    #[test]
    fn test_build_groups_by_product_and_batch() {
        let chain = DeletionChain::build(&sample_views());
        assert_eq!(chain.products(), vec!["ProductX", "ProductY"]);
        assert_eq!(chain.batch_numbers("ProductX"), vec!["B-100"]);
        assert_eq!(chain.batch_numbers("ProductY"), vec!["B-200"]);

        // B-100 spans two distinct segments plus a duplicated 成型 row.
        let segments = chain.segments("ProductX", "B-100");
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0].segment, "成型");
        assert_eq!(segments[2].segment, "混合");
    }

    #[test]
    fn test_build_skips_malformed_entries() {
        let mut views = sample_views();
        views.push(BatchView {
            id: 9,
            batch_number: String::new(),
            product_name: "ProductZ".to_string(),
            process_segment: "混合".to_string(),
            status: "进行中".to_string(),
            start_time: None,
            end_time: None,
            created_by_name: None,
            material_count: 0,
            equipment_count: 0,
            quality_count: 0,
            latest_batch_id: 9,
            is_latest_segment: true,
        });
        let chain = DeletionChain::build(&views);
        assert!(!chain.products().contains(&"ProductZ"));
    }

    #[test]
    fn test_statuses_scoped_to_triple() {
        let chain = DeletionChain::build(&sample_views());
        assert_eq!(
            chain.statuses("ProductX", "B-100", "混合"),
            vec!["进行中".to_string()]
        );
        // Duplicated 成型 rows share one status — distinct list has one entry.
        assert_eq!(
            chain.statuses("ProductX", "B-100", "成型"),
            vec!["已完成".to_string()]
        );
        assert!(chain.statuses("ProductX", "B-100", "包装").is_empty());
    }

    #[test]
    fn test_sole_status_auto_selects() {
        let chain = DeletionChain::build(&sample_views());
        let mut selection = Selection::default();
        selection.select_product(&chain, Some("ProductX"));
        selection.select_batch_number(&chain, Some("B-100"));
        assert!(!selection.ready());
        selection.select_segment(&chain, Some("成型"));
        assert_eq!(selection.status.as_deref(), Some("已完成"));
        assert!(selection.ready());
        assert_eq!(
            selection.delete_key(),
            Some(DeleteKey {
                product_name: "ProductX".to_string(),
                batch_number: "B-100".to_string(),
                process_segment: "成型".to_string(),
                status: "已完成".to_string(),
            })
        );
    }

    #[test]
    fn test_upstream_change_clears_mismatched_downstream() {
        let chain = DeletionChain::build(&sample_views());
        let mut selection = Selection::default();
        selection.select_product(&chain, Some("ProductX"));
        selection.select_batch_number(&chain, Some("B-100"));
        selection.select_segment(&chain, Some("混合"));
        assert!(selection.ready());

        selection.select_product(&chain, Some("ProductY"));
        assert_eq!(selection.product.as_deref(), Some("ProductY"));
        assert!(selection.batch_number.is_none());
        assert!(selection.segment.is_none());
        assert!(selection.status.is_none());
    }

    #[test]
    fn test_unknown_picks_are_cleared() {
        let chain = DeletionChain::build(&sample_views());
        let mut selection = Selection::default();
        selection.select_product(&chain, Some("Nope"));
        assert!(selection.product.is_none());
        assert!(!selection.ready());
    }

    #[test]
    fn test_segment_display_label() {
        let entry = SegmentEntry {
            id: 1,
            segment: "成型".to_string(),
            status: "已完成".to_string(),
            is_latest: true,
        };
        assert_eq!(entry.display_label(), "成型（已完成）【当前】");
    }
}

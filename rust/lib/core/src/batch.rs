//! Batch payloads and the flattened per-segment index.
//!
//! A production run is not one row: the list endpoint groups rows by
//! `(batch_number, product_name)` and attaches `segment_summaries`, one
//! per segment the run has passed through. [`expand`] unrolls that back
//! into per-segment [`BatchView`]s, tagging which row is the latest.

use serde::{Deserialize, Serialize};

/// Per-segment summary carried by the batch list endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentSummary {
    pub batch_id: i64,
    pub process_segment: String,
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(default)]
    pub material_count: i64,
    #[serde(default)]
    pub equipment_count: i64,
    #[serde(default)]
    pub quality_count: i64,
}

/// Raw batch as returned by `GET /api/batches`. When
/// `segment_summaries` is present, the top-level fields describe the
/// latest segment row and the totals across the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    pub id: i64,
    pub batch_number: String,
    pub product_name: String,
    #[serde(default)]
    pub process_segment: String,
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by_name: Option<String>,
    #[serde(default)]
    pub material_count: i64,
    #[serde(default)]
    pub equipment_count: i64,
    #[serde(default)]
    pub quality_count: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segment_count: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage_index: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage_progress: Option<i64>,
    #[serde(default)]
    pub segment_summaries: Vec<SegmentSummary>,
}

/// One `(batch_number, process_segment)` row, flattened for display.
/// `id` is the only key record sub-entities reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchView {
    pub id: i64,
    pub batch_number: String,
    pub product_name: String,
    pub process_segment: String,
    pub status: String,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub created_by_name: Option<String>,
    pub material_count: i64,
    pub equipment_count: i64,
    pub quality_count: i64,
    /// Id of the run's authoritative (most recent) segment row.
    pub latest_batch_id: i64,
    pub is_latest_segment: bool,
}

impl BatchView {
    /// Human-facing `batch_number-process_segment` key distinguishing
    /// same-numbered batches across segments.
    pub fn composite_key(&self) -> String {
        format!("{}-{}", self.batch_number, self.process_segment)
    }

    /// The picker label: `B-100-成型 | 产品 (状态)`.
    pub fn display_label(&self) -> String {
        format!(
            "{} | {} ({})",
            self.composite_key(),
            self.product_name,
            self.status
        )
    }
}

/// Expand raw batches into one view per segment summary. Batches
/// without summaries pass through as a single view.
pub fn expand(batches: &[Batch]) -> Vec<BatchView> {
    let mut views = Vec::new();

    for batch in batches {
        if batch.segment_summaries.is_empty() {
            views.push(BatchView {
                id: batch.id,
                batch_number: batch.batch_number.clone(),
                product_name: batch.product_name.clone(),
                process_segment: batch.process_segment.clone(),
                status: batch.status.clone(),
                start_time: batch.start_time.clone(),
                end_time: batch.end_time.clone(),
                created_by_name: batch.created_by_name.clone(),
                material_count: batch.material_count,
                equipment_count: batch.equipment_count,
                quality_count: batch.quality_count,
                latest_batch_id: batch.id,
                is_latest_segment: true,
            });
            continue;
        }

        for summary in &batch.segment_summaries {
            views.push(BatchView {
                id: summary.batch_id,
                batch_number: batch.batch_number.clone(),
                product_name: batch.product_name.clone(),
                process_segment: summary.process_segment.clone(),
                status: summary.status.clone(),
                start_time: summary.start_time.clone(),
                end_time: summary.end_time.clone(),
                created_by_name: batch.created_by_name.clone(),
                material_count: summary.material_count,
                equipment_count: summary.equipment_count,
                quality_count: summary.quality_count,
                latest_batch_id: batch.id,
                is_latest_segment: summary.batch_id == batch.id,
            });
        }
    }

    views
}

/// Sort views by (product_name, batch_number, process_segment),
/// ascending. Stable and independent of server response order.
pub fn sort_views(views: &mut [BatchView]) {
    views.sort_by(|a, b| {
        a.product_name
            .cmp(&b.product_name)
            .then_with(|| a.batch_number.cmp(&b.batch_number))
            .then_with(|| a.process_segment.cmp(&b.process_segment))
    });
}

/// Batch picker filters. Keywords are case-insensitive substrings;
/// segment is an exact match (`None` means all).
#[derive(Debug, Clone, Default)]
pub struct BatchFilter {
    pub product_keyword: Option<String>,
    pub batch_keyword: Option<String>,
    pub segment: Option<String>,
}

impl BatchFilter {
    pub fn is_empty(&self) -> bool {
        self.product_keyword.is_none() && self.batch_keyword.is_none() && self.segment.is_none()
    }

    fn matches(&self, view: &BatchView) -> bool {
        if let Some(keyword) = &self.product_keyword {
            let keyword = keyword.to_lowercase();
            if !view.product_name.to_lowercase().contains(&keyword) {
                return false;
            }
        }
        if let Some(keyword) = &self.batch_keyword {
            let keyword = keyword.to_lowercase();
            let number_match = view.batch_number.to_lowercase().contains(&keyword);
            let composite_match = view.composite_key().to_lowercase().contains(&keyword);
            if !number_match && !composite_match {
                return false;
            }
        }
        if let Some(segment) = &self.segment {
            if &view.process_segment != segment {
                return false;
            }
        }
        true
    }
}

/// Sorted collection of per-segment batch views.
#[derive(Debug, Clone, Default)]
pub struct BatchIndex {
    views: Vec<BatchView>,
}

impl BatchIndex {
    /// Expand and sort a raw batch payload.
    pub fn from_batches(batches: &[Batch]) -> BatchIndex {
        let mut views = expand(batches);
        sort_views(&mut views);
        BatchIndex { views }
    }

    pub fn views(&self) -> &[BatchView] {
        &self.views
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    pub fn find_by_id(&self, id: i64) -> Option<&BatchView> {
        self.views.iter().find(|v| v.id == id)
    }

    pub fn filter(&self, filter: &BatchFilter) -> Vec<&BatchView> {
        self.views.iter().filter(|v| filter.matches(v)).collect()
    }

    /// True when any view shares the given batch number. Used to warn
    /// before creating or duplicating into an existing number.
    pub fn batch_number_exists(&self, batch_number: &str) -> bool {
        self.views.iter().any(|v| v.batch_number == batch_number)
    }

    /// Patch a single view in place after a status/segment update.
    pub fn update_view(&mut self, updated: &BatchView) {
        if let Some(view) = self.views.iter_mut().find(|v| v.id == updated.id) {
            *view = updated.clone();
        }
        sort_views(&mut self.views);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch_with_summaries() -> Batch {
        serde_json::from_str(
            r#"{
                "id": 12,
                "batch_number": "B-100",
                "product_name": "ProductX",
                "process_segment": "成型",
                "status": "已完成",
                "created_by_name": "op",
                "segment_count": 3,
                "segment_summaries": [
                    {"batch_id": 10, "process_segment": "混合", "status": "进行中",
                     "start_time": "2025-03-01T08:00:00", "material_count": 2,
                     "equipment_count": 1, "quality_count": 0},
                    {"batch_id": 11, "process_segment": "包装", "status": "暂停",
                     "material_count": 0, "equipment_count": 0, "quality_count": 1},
                    {"batch_id": 12, "process_segment": "成型", "status": "已完成",
                     "material_count": 1, "equipment_count": 2, "quality_count": 3}
                ]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_expand_emits_one_view_per_summary() {
        let views = expand(&[batch_with_summaries()]);
        assert_eq!(views.len(), 3);
        for view in &views {
            assert_eq!(view.batch_number, "B-100");
            assert_eq!(view.product_name, "ProductX");
            assert_eq!(view.latest_batch_id, 12);
        }
        let latest: Vec<_> = views.iter().filter(|v| v.is_latest_segment).collect();
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].id, 12);
        assert_eq!(latest[0].process_segment, "成型");
    }

    #[test]
    fn test_expand_without_summaries_passes_through() {
        let batch: Batch = serde_json::from_str(
            r#"{"id": 5, "batch_number": "B-5", "product_name": "P",
                "process_segment": "混合", "status": "进行中"}"#,
        )
        .unwrap();
        let views = expand(&[batch]);
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].id, 5);
        assert!(views[0].is_latest_segment);
        assert_eq!(views[0].latest_batch_id, 5);
    }

    #[test]
    fn test_sort_is_total_over_segments() {
        let mut views = expand(&[batch_with_summaries()]);
        sort_views(&mut views);
        let segments: Vec<_> = views.iter().map(|v| v.process_segment.as_str()).collect();
        let mut expected = segments.clone();
        expected.sort();
        assert_eq!(segments, expected);
    }

    #[test]
    fn test_index_sorted_by_product_batch_segment() {
        let batches: Vec<Batch> = serde_json::from_str(
            r#"[
                {"id": 1, "batch_number": "B-2", "product_name": "Beta", "process_segment": "成型", "status": "进行中"},
                {"id": 2, "batch_number": "B-1", "product_name": "Beta", "process_segment": "混合", "status": "进行中"},
                {"id": 3, "batch_number": "B-9", "product_name": "Alpha", "process_segment": "包装", "status": "已完成"}
            ]"#,
        )
        .unwrap();
        let index = BatchIndex::from_batches(&batches);
        let ids: Vec<_> = index.views().iter().map(|v| v.id).collect();
        assert_eq!(ids, vec![3, 2, 1]);
    }

    #[test]
    fn test_filter_composite_key_and_case() {
        let batches: Vec<Batch> = serde_json::from_str(
            r#"[
                {"id": 1, "batch_number": "B-100", "product_name": "ProductX", "process_segment": "成型", "status": "已完成"},
                {"id": 2, "batch_number": "B-200", "product_name": "productY", "process_segment": "混合", "status": "进行中"}
            ]"#,
        )
        .unwrap();
        let index = BatchIndex::from_batches(&batches);

        let filter = BatchFilter {
            product_keyword: Some("producty".to_string()),
            ..BatchFilter::default()
        };
        assert_eq!(index.filter(&filter).len(), 1);

        let filter = BatchFilter {
            batch_keyword: Some("b-100-成型".to_string()),
            ..BatchFilter::default()
        };
        let hits = index.filter(&filter);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, 1);

        let filter = BatchFilter {
            segment: Some("混合".to_string()),
            ..BatchFilter::default()
        };
        assert_eq!(index.filter(&filter)[0].id, 2);
    }

    #[test]
    fn test_filter_is_idempotent() {
        let batches: Vec<Batch> = serde_json::from_str(
            r#"[
                {"id": 1, "batch_number": "B-100", "product_name": "ProductX", "process_segment": "成型", "status": "已完成"},
                {"id": 2, "batch_number": "B-200", "product_name": "ProductY", "process_segment": "混合", "status": "进行中"}
            ]"#,
        )
        .unwrap();
        let index = BatchIndex::from_batches(&batches);
        let filter = BatchFilter {
            batch_keyword: Some("b-1".to_string()),
            ..BatchFilter::default()
        };

        let once: Vec<BatchView> = index.filter(&filter).into_iter().cloned().collect();
        let narrowed = BatchIndex { views: once.clone() };
        let twice: Vec<BatchView> = narrowed.filter(&filter).into_iter().cloned().collect();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_same_number_across_segments() {
        let batches: Vec<Batch> = serde_json::from_str(
            r#"[{
                "id": 2,
                "batch_number": "B-100",
                "product_name": "ProductX",
                "process_segment": "成型",
                "status": "已完成",
                "segment_summaries": [
                    {"batch_id": 1, "process_segment": "混合", "status": "进行中"},
                    {"batch_id": 2, "process_segment": "成型", "status": "已完成"}
                ]
            }]"#,
        )
        .unwrap();
        let index = BatchIndex::from_batches(&batches);
        assert_eq!(index.len(), 2);
        assert!(index.batch_number_exists("B-100"));
        assert_eq!(index.find_by_id(1).unwrap().composite_key(), "B-100-混合");
        assert_eq!(index.find_by_id(2).unwrap().composite_key(), "B-100-成型");
    }
}

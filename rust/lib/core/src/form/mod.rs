//! Schema-driven add/edit forms for the three record categories.
//!
//! Each form is a small state machine: **Create** (cleared fields,
//! schema defaults, empty attachment list) ⇄ **Edit** (fields from an
//! existing record, original schema-unknown attributes preserved
//! verbatim, original attachment paths captured as the keep-list).
//! Successful submit or explicit reset returns to Create.

pub mod equipment;
pub mod material;
pub mod quality;
pub mod widget;

use std::path::PathBuf;

use serde::Serialize;

pub use equipment::EquipmentForm;
pub use material::MaterialForm;
pub use quality::QualityForm;
pub use widget::ParameterWidget;

/// Whether the form creates a new record or updates an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormMode {
    #[default]
    Create,
    Edit(i64),
}

impl FormMode {
    pub fn is_edit(&self) -> bool {
        matches!(self, FormMode::Edit(_))
    }

    pub fn record_id(&self) -> Option<i64> {
        match self {
            FormMode::Create => None,
            FormMode::Edit(id) => Some(*id),
        }
    }
}

/// The record's attachment state across an edit cycle: paths to keep
/// plus newly picked local files. The server replaces the stored set
/// with `existing ∪ uploads` on submit — never a partial delta.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttachmentSet {
    existing: Vec<String>,
    added: Vec<PathBuf>,
}

impl AttachmentSet {
    /// Seed the keep-list from a record's stored paths (edit mode).
    pub fn from_existing(paths: Vec<String>) -> AttachmentSet {
        AttachmentSet {
            existing: paths,
            added: Vec::new(),
        }
    }

    pub fn existing(&self) -> &[String] {
        &self.existing
    }

    pub fn added(&self) -> &[PathBuf] {
        &self.added
    }

    pub fn add_file(&mut self, path: PathBuf) {
        self.added.push(path);
    }

    /// Drop a stored path from the keep-list. Returns false when the
    /// path was not present.
    pub fn remove_existing(&mut self, path: &str) -> bool {
        let len = self.existing.len();
        self.existing.retain(|p| p != path);
        self.existing.len() < len
    }

    pub fn clear(&mut self) {
        self.existing.clear();
        self.added.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.existing.is_empty() && self.added.is_empty()
    }
}

/// A ready-to-send multipart submission: the `payload` JSON part, the
/// `existing_attachments` JSON array part, and the new file parts.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordSubmission {
    pub payload: serde_json::Value,
    pub existing_attachments: Vec<String>,
    pub files: Vec<PathBuf>,
}

impl RecordSubmission {
    pub fn new<P: Serialize>(
        payload: &P,
        attachments: &AttachmentSet,
    ) -> Result<RecordSubmission, crate::Error> {
        let payload = serde_json::to_value(payload)
            .map_err(|e| crate::Error::Parse(format!("payload serialization failed: {e}")))?;
        Ok(RecordSubmission {
            payload,
            existing_attachments: attachments.existing().to_vec(),
            files: attachments.added().to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attachment_set_keep_plus_new() {
        let mut set = AttachmentSet::from_existing(vec![
            "uploads/a.pdf".to_string(),
            "uploads/b.png".to_string(),
        ]);
        set.add_file(PathBuf::from("/tmp/new.jpg"));

        assert_eq!(set.existing().len(), 2);
        assert_eq!(set.added().len(), 1);
    }

    #[test]
    fn test_remove_existing_only_on_explicit_call() {
        let mut set = AttachmentSet::from_existing(vec!["uploads/a.pdf".to_string()]);
        assert!(!set.remove_existing("uploads/missing.pdf"));
        assert_eq!(set.existing().len(), 1);
        assert!(set.remove_existing("uploads/a.pdf"));
        assert!(set.is_empty());
    }

    #[test]
    fn test_submission_carries_all_three_parts() {
        let mut set = AttachmentSet::from_existing(vec![
            "uploads/a.pdf".to_string(),
            "uploads/b.png".to_string(),
        ]);
        set.add_file(PathBuf::from("/tmp/new.jpg"));

        let payload = serde_json::json!({"test_item": "粘度"});
        let submission = RecordSubmission::new(&payload, &set).unwrap();
        assert_eq!(submission.existing_attachments.len(), 2);
        assert_eq!(submission.files.len(), 1);
        assert_eq!(submission.payload["test_item"], "粘度");
    }
}

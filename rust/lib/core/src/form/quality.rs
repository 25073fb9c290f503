//! Quality add/edit form.

use std::path::PathBuf;

use crate::record::{QualityPayload, QualityRecord};
use crate::schema::{DefinitionIndex, QualityDef};
use crate::Error;

use super::{AttachmentSet, FormMode, RecordSubmission};

/// Quality form state. A known test item locks the unit and seeds the
/// standard range from its definition; ad-hoc items stay editable.
#[derive(Debug, Clone, Default)]
pub struct QualityForm {
    mode: FormMode,
    pub test_item: String,
    pub test_value: String,
    pub unit: String,
    pub standard_min: String,
    pub standard_max: String,
    pub notes: String,
    definition_locked: bool,
    original_extras: serde_json::Map<String, serde_json::Value>,
    pub attachments: AttachmentSet,
}

impl QualityForm {
    pub fn mode(&self) -> FormMode {
        self.mode
    }

    pub fn definition_locked(&self) -> bool {
        self.definition_locked
    }

    pub fn enter_create(&mut self) {
        *self = QualityForm::default();
    }

    /// Populate from an existing record. The record's stored unit and
    /// standard range win over the definition's autofill.
    pub fn enter_edit(&mut self, record: &QualityRecord, definitions: &DefinitionIndex) {
        *self = QualityForm::default();
        self.mode = FormMode::Edit(record.id);
        self.test_item = record.test_item.clone();
        self.original_extras = record.attributes.clone();
        self.attachments = AttachmentSet::from_existing(record.attachment_paths());

        self.apply_definition(definitions.quality(&record.test_item));

        self.test_value = record.test_value.to_string();
        if let Some(unit) = &record.unit {
            self.unit = unit.clone();
        }
        self.standard_min = record
            .standard_min
            .map(|v| v.to_string())
            .unwrap_or_default();
        self.standard_max = record
            .standard_max
            .map(|v| v.to_string())
            .unwrap_or_default();
        self.notes = record.notes.clone().unwrap_or_default();
    }

    /// Select a test item. A known definition autofills the unit and
    /// standard range; `None` unlocks the unit for manual entry.
    pub fn apply_definition(&mut self, definition: Option<&QualityDef>) {
        match definition {
            Some(def) => {
                self.test_item = def.item.clone();
                self.unit = def.unit.clone().unwrap_or_default();
                if let Some(min) = def.min {
                    self.standard_min = min.to_string();
                }
                if let Some(max) = def.max {
                    self.standard_max = max.to_string();
                }
                self.definition_locked = true;
            }
            None => {
                self.definition_locked = false;
            }
        }
    }

    pub fn add_attachment(&mut self, path: PathBuf) {
        self.attachments.add_file(path);
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.test_item.trim().is_empty() {
            return Err(Error::Validation("请填写所有必填字段".to_string()));
        }
        let value = self.test_value.trim();
        if value.is_empty() || value.parse::<f64>().is_err() {
            return Err(Error::Validation("检测值需要数字".to_string()));
        }
        for (label, raw) in [("标准下限", &self.standard_min), ("标准上限", &self.standard_max)] {
            let raw = raw.trim();
            if !raw.is_empty() && raw.parse::<f64>().is_err() {
                return Err(Error::Validation(format!("{label}需要数字")));
            }
        }
        Ok(())
    }

    pub fn build_submission(&self) -> Result<RecordSubmission, Error> {
        self.validate()?;

        let extras = if self.mode.is_edit() {
            self.original_extras.clone()
        } else {
            serde_json::Map::new()
        };

        let payload = QualityPayload {
            test_item: self.test_item.trim().to_string(),
            test_value: self
                .test_value
                .trim()
                .parse::<f64>()
                .map_err(|_| Error::Validation("检测值需要数字".to_string()))?,
            unit: non_empty(&self.unit),
            standard_min: parse_optional(&self.standard_min)?,
            standard_max: parse_optional(&self.standard_max)?,
            notes: non_empty(&self.notes),
            extras,
        };

        RecordSubmission::new(&payload, &self.attachments)
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn parse_optional(value: &str) -> Result<Option<f64>, Error> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .parse::<f64>()
        .map(Some)
        .map_err(|_| Error::Validation("标准范围需要数字".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SegmentDefinitions;

    fn definitions() -> DefinitionIndex {
        let defs: SegmentDefinitions = serde_json::from_str(
            r#"{"quality": [{"item": "粘度", "unit": "mPa·s", "min": 10.0, "max": 20.0}]}"#,
        )
        .unwrap();
        DefinitionIndex::from_definitions(&defs)
    }

    fn record() -> QualityRecord {
        serde_json::from_str(
            r#"{"id": 9, "test_item": "粘度", "test_value": 15.2, "unit": "mPa·s",
                "standard_min": 10.0, "standard_max": 20.0, "result": "合格",
                "attributes": {"inspector": "王工"},
                "attachments": [
                    {"path": "uploads/q1.pdf", "name": "q1.pdf", "url": "/download/uploads/q1.pdf"},
                    {"path": "uploads/q2.pdf", "name": "q2.pdf", "url": "/download/uploads/q2.pdf"}
                ]}"#,
        )
        .unwrap()
    }

    #[test]
    fn test_known_item_autofills_range_and_locks_unit() {
        let defs = definitions();
        let mut form = QualityForm::default();
        form.apply_definition(defs.quality("粘度"));
        assert_eq!(form.unit, "mPa·s");
        assert_eq!(form.standard_min, "10");
        assert_eq!(form.standard_max, "20");
        assert!(form.definition_locked());
    }

    #[test]
    fn test_unknown_item_stays_editable() {
        let mut form = QualityForm::default();
        form.test_item = "外观".to_string();
        form.apply_definition(None);
        assert!(!form.definition_locked());
    }

    #[test]
    fn test_validation_requires_numeric_value() {
        let mut form = QualityForm {
            test_item: "粘度".to_string(),
            test_value: "合格".to_string(),
            ..QualityForm::default()
        };
        assert!(form.validate().is_err());
        form.test_value = "15.2".to_string();
        assert!(form.validate().is_ok());
    }

    #[test]
    fn test_edit_preserves_extras_and_attachments() {
        let defs = definitions();
        let mut form = QualityForm::default();
        form.enter_edit(&record(), &defs);
        assert_eq!(form.mode(), FormMode::Edit(9));

        form.add_attachment(PathBuf::from("/tmp/photo.jpg"));
        let submission = form.build_submission().unwrap();
        assert_eq!(submission.existing_attachments.len(), 2);
        assert_eq!(submission.files.len(), 1);
        assert_eq!(submission.payload["extras"]["inspector"], "王工");
    }

    #[test]
    fn test_removed_existing_attachment_is_dropped() {
        let defs = definitions();
        let mut form = QualityForm::default();
        form.enter_edit(&record(), &defs);
        assert!(form.attachments.remove_existing("uploads/q1.pdf"));

        let submission = form.build_submission().unwrap();
        assert_eq!(submission.existing_attachments, vec!["uploads/q2.pdf"]);
    }

    #[test]
    fn test_create_submit_create_leaves_no_residue() {
        let mut form = QualityForm::default();
        form.test_item = "粘度".to_string();
        form.test_value = "15".to_string();
        assert!(form.build_submission().is_ok());

        form.enter_create();
        assert!(form.test_item.is_empty());
        assert!(form.test_value.is_empty());
        assert!(form.attachments.is_empty());
        assert!(form.build_submission().is_err());
    }
}

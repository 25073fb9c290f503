//! Equipment add/edit form with dynamic parameter widgets.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::record::{EquipmentPayload, EquipmentRecord};
use crate::schema::{DefinitionIndex, EquipmentDef, FieldConfig};
use crate::Error;

use super::widget::{parse_local_datetime, synthesize_all, ParameterWidget};
use super::{AttachmentSet, FormMode, RecordSubmission};

/// Equipment form state. Parameter widgets are synthesized from the
/// selected definition; values merge over the record's original
/// parameter map on submit so schema-unknown keys survive edits.
#[derive(Debug, Clone, Default)]
pub struct EquipmentForm {
    mode: FormMode,
    pub code: String,
    pub name: String,
    pub start_time: String,
    pub end_time: String,
    pub status: String,
    widgets: Vec<ParameterWidget>,
    definition_locked: bool,
    original_parameters: BTreeMap<String, String>,
    pub attachments: AttachmentSet,
}

impl EquipmentForm {
    pub fn mode(&self) -> FormMode {
        self.mode
    }

    pub fn definition_locked(&self) -> bool {
        self.definition_locked
    }

    pub fn widgets(&self) -> &[ParameterWidget] {
        &self.widgets
    }

    /// Clear back to create mode, seeding the default status.
    pub fn enter_create(&mut self, config: &FieldConfig) {
        *self = EquipmentForm::default();
        self.status = config.default_equipment_status().to_string();
    }

    /// Populate from an existing record: original parameters kept
    /// verbatim as the merge base, stored attachment paths seeded as
    /// the keep-list. The record's stored name wins over the
    /// definition's autofill.
    pub fn enter_edit(&mut self, record: &EquipmentRecord, definitions: &DefinitionIndex) {
        *self = EquipmentForm::default();
        self.mode = FormMode::Edit(record.id);
        self.code = record.equipment_code.clone();
        self.start_time = record.start_time.clone();
        self.end_time = record.end_time.clone().unwrap_or_default();
        self.status = record.status.clone();
        self.original_parameters = record.parameters.clone();
        self.attachments = AttachmentSet::from_existing(record.attachment_paths());

        self.apply_definition(definitions.equipment(&record.equipment_code));
        if !record.equipment_name.is_empty() {
            self.name = record.equipment_name.clone();
        }
    }

    /// Select a code. A known definition locks the name and rebuilds
    /// the widget list, carrying current values through; unknown codes
    /// unlock the name and drop the declared widgets.
    pub fn apply_definition(&mut self, definition: Option<&EquipmentDef>) {
        let prior = self.parameter_values();
        match definition {
            Some(def) => {
                self.code = def.code.clone();
                self.name = def.name.clone();
                self.definition_locked = true;
                self.widgets = synthesize_all(&def.parameters, &prior);
            }
            None => {
                self.definition_locked = false;
                self.widgets.retain(|w| !w.value.is_empty());
            }
        }
    }

    /// Current widget values, keyed by parameter key. The merge base
    /// for edits comes from `original_parameters`, not from here.
    pub fn parameter_values(&self) -> BTreeMap<String, String> {
        let mut values = BTreeMap::new();
        for widget in &self.widgets {
            if !widget.value.is_empty() {
                values.insert(widget.key().to_string(), widget.value.clone());
            }
        }
        // Preserved edit-mode values for widgets no longer rendered.
        for (key, value) in &self.original_parameters {
            values.entry(key.clone()).or_insert_with(|| value.clone());
        }
        values
    }

    /// Set a parameter by key. Keys without a declared widget get an
    /// ad-hoc free-text one (manual entry when no definition exists).
    pub fn set_parameter(&mut self, key: &str, value: &str) {
        if let Some(widget) = self.widgets.iter_mut().find(|w| w.key() == key) {
            widget.value = value.to_string();
        } else {
            self.widgets.push(ParameterWidget::free_text(key, value));
        }
    }

    pub fn add_attachment(&mut self, path: PathBuf) {
        self.attachments.add_file(path);
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.code.trim().is_empty() || self.name.trim().is_empty() {
            return Err(Error::Validation("请填写所有必填字段".to_string()));
        }
        let start = self.start_time.trim();
        if start.is_empty() {
            return Err(Error::Validation("请填写所有必填字段".to_string()));
        }
        if parse_local_datetime(start).is_none() {
            return Err(Error::Validation("开始时间格式无效".to_string()));
        }
        let end = self.end_time.trim();
        if !end.is_empty() && parse_local_datetime(end).is_none() {
            return Err(Error::Validation("结束时间格式无效".to_string()));
        }
        for widget in &self.widgets {
            widget.validate()?;
        }
        Ok(())
    }

    /// Build the multipart submission. Widget values merge over the
    /// original parameter map: empty values delete the key, non-empty
    /// values overwrite, untouched original keys pass through.
    pub fn build_submission(&self, config: &FieldConfig) -> Result<RecordSubmission, Error> {
        self.validate()?;

        let mut parameters = if self.mode.is_edit() {
            self.original_parameters.clone()
        } else {
            BTreeMap::new()
        };
        for widget in &self.widgets {
            if widget.value.is_empty() {
                parameters.remove(widget.key());
            } else {
                parameters.insert(widget.key().to_string(), widget.value.clone());
            }
        }

        let status = if self.status.trim().is_empty() {
            config.default_equipment_status().to_string()
        } else {
            self.status.trim().to_string()
        };

        let payload = EquipmentPayload {
            equipment_code: self.code.trim().to_string(),
            equipment_name: self.name.trim().to_string(),
            start_time: self.start_time.trim().to_string(),
            end_time: {
                let end = self.end_time.trim();
                if end.is_empty() {
                    None
                } else {
                    Some(end.to_string())
                }
            },
            status,
            parameters,
        };

        RecordSubmission::new(&payload, &self.attachments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SegmentDefinitions;

    fn definitions() -> DefinitionIndex {
        let defs: SegmentDefinitions = serde_json::from_str(
            r#"{"equipment": [{
                "code": "E-01", "name": "搅拌机",
                "parameters": [
                    {"key": "temperature", "label": "温度", "type": "number", "unit": "℃"},
                    {"key": "auto_mode", "type": "boolean"},
                    {"key": "speed", "type": "number", "required": true}
                ]
            }]}"#,
        )
        .unwrap();
        DefinitionIndex::from_definitions(&defs)
    }

    fn record() -> EquipmentRecord {
        serde_json::from_str(
            r#"{"id": 3, "equipment_code": "E-01", "equipment_name": "搅拌机",
                "start_time": "2025-03-01T08:00", "status": "正常运行",
                "parameters": {"temperature": "80", "speed": "120", "legacy_knob": "7"},
                "attachments": [
                    {"path": "uploads/a.pdf", "name": "a.pdf", "url": "/download/uploads/a.pdf"},
                    {"path": "uploads/b.png", "name": "b.png", "url": "/download/uploads/b.png"}
                ]}"#,
        )
        .unwrap()
    }

    fn filled_create_form(defs: &DefinitionIndex, config: &FieldConfig) -> EquipmentForm {
        let mut form = EquipmentForm::default();
        form.enter_create(config);
        form.apply_definition(defs.equipment("E-01"));
        form.start_time = "2025-03-01T09:00".to_string();
        form.set_parameter("speed", "100");
        form
    }

    #[test]
    fn test_create_seeds_default_status() {
        let config = FieldConfig::default();
        let mut form = EquipmentForm::default();
        form.enter_create(&config);
        assert_eq!(form.status, "正常运行");
        assert_eq!(form.mode(), FormMode::Create);
    }

    #[test]
    fn test_definition_builds_widgets_and_locks_name() {
        let defs = definitions();
        let config = FieldConfig::default();
        let form = filled_create_form(&defs, &config);
        assert!(form.definition_locked());
        assert_eq!(form.name, "搅拌机");
        assert_eq!(form.widgets().len(), 3);
    }

    #[test]
    fn test_required_parameter_blocks_submission() {
        let defs = definitions();
        let config = FieldConfig::default();
        let mut form = EquipmentForm::default();
        form.enter_create(&config);
        form.apply_definition(defs.equipment("E-01"));
        form.start_time = "2025-03-01T09:00".to_string();
        // speed is required and empty.
        assert!(form.build_submission(&config).is_err());
    }

    #[test]
    fn test_edit_merge_preserves_unknown_keys() {
        let defs = definitions();
        let config = FieldConfig::default();
        let mut form = EquipmentForm::default();
        form.enter_edit(&record(), &defs);
        assert_eq!(form.mode(), FormMode::Edit(3));

        form.set_parameter("temperature", "85");

        let submission = form.build_submission(&config).unwrap();
        let parameters = &submission.payload["parameters"];
        assert_eq!(parameters["temperature"], "85");
        assert_eq!(parameters["speed"], "120");
        // legacy_knob has no widget but survives the merge.
        assert_eq!(parameters["legacy_knob"], "7");
    }

    #[test]
    fn test_empty_widget_value_deletes_key() {
        let defs = definitions();
        let config = FieldConfig::default();
        let mut form = EquipmentForm::default();
        form.enter_edit(&record(), &defs);
        form.set_parameter("temperature", "");

        let submission = form.build_submission(&config).unwrap();
        let parameters = submission.payload["parameters"].as_object().unwrap();
        assert!(!parameters.contains_key("temperature"));
        assert!(parameters.contains_key("speed"));
    }

    #[test]
    fn test_attachment_reconciliation_keep_two_add_one() {
        let defs = definitions();
        let config = FieldConfig::default();
        let mut form = EquipmentForm::default();
        form.enter_edit(&record(), &defs);
        form.add_attachment(PathBuf::from("/tmp/new.jpg"));

        let submission = form.build_submission(&config).unwrap();
        assert_eq!(submission.existing_attachments.len(), 2);
        assert_eq!(submission.files.len(), 1);
    }

    #[test]
    fn test_create_submit_create_leaves_no_residue() {
        let defs = definitions();
        let config = FieldConfig::default();
        let mut form = filled_create_form(&defs, &config);
        assert!(form.build_submission(&config).is_ok());

        form.enter_create(&config);
        assert!(form.code.is_empty());
        assert!(form.start_time.is_empty());
        assert!(form.widgets().is_empty());
        assert!(form.attachments.is_empty());
        assert_eq!(form.mode(), FormMode::Create);
    }

    #[test]
    fn test_unknown_code_keeps_manual_parameters() {
        let config = FieldConfig::default();
        let mut form = EquipmentForm::default();
        form.enter_create(&config);
        form.code = "EXT-77".to_string();
        form.name = "外部设备".to_string();
        form.start_time = "2025-03-01T09:00".to_string();
        form.apply_definition(None);
        form.set_parameter("voltage", "220");

        assert!(!form.definition_locked());
        let submission = form.build_submission(&config).unwrap();
        assert_eq!(submission.payload["parameters"]["voltage"], "220");
    }

    #[test]
    fn test_invalid_start_time_rejected() {
        let config = FieldConfig::default();
        let mut form = EquipmentForm::default();
        form.enter_create(&config);
        form.code = "E-01".to_string();
        form.name = "搅拌机".to_string();
        form.start_time = "yesterday".to_string();
        assert!(form.validate().is_err());
    }
}

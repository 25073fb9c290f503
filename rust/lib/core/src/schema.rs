//! Per-segment field definitions and the global record-field config.
//!
//! Definitions come from `/api/segment_definitions?segment=` and are
//! indexed by code/item for O(1) lookup when the operator picks an
//! entry from a catalog. Empty definitions are a valid state — forms
//! degrade to free-text entry.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Widget type of a dynamic equipment parameter. Unknown kinds degrade
/// to `Text` at deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterKind {
    Number,
    Boolean,
    Datetime,
    Select,
    Text,
}

impl Default for ParameterKind {
    fn default() -> Self {
        ParameterKind::Text
    }
}

impl<'de> Deserialize<'de> for ParameterKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(match raw.as_str() {
            "number" => ParameterKind::Number,
            "boolean" => ParameterKind::Boolean,
            "datetime" => ParameterKind::Datetime,
            "select" => ParameterKind::Select,
            _ => ParameterKind::Text,
        })
    }
}

/// One dynamic parameter declared by an equipment definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: ParameterKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

impl ParameterSpec {
    /// Display label, falling back to the key.
    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.key)
    }

    /// Number-input step as text. The config may carry it as a string
    /// or a number.
    pub fn step_text(&self) -> String {
        match &self.step {
            Some(serde_json::Value::String(s)) if !s.is_empty() => s.clone(),
            Some(serde_json::Value::Number(n)) => n.to_string(),
            _ => "0.01".to_string(),
        }
    }

    /// Default value rendered as the string a widget would carry.
    pub fn default_text(&self) -> Option<String> {
        match &self.default {
            Some(serde_json::Value::String(s)) => Some(s.clone()),
            Some(serde_json::Value::Bool(b)) => Some(b.to_string()),
            Some(serde_json::Value::Number(n)) => Some(n.to_string()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialDef {
    pub code: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supplier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquipmentDef {
    pub code: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub parameters: Vec<ParameterSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityDef {
    pub item: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub standard_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Raw response of `/api/segment_definitions?segment=`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SegmentDefinitions {
    #[serde(default)]
    pub materials: Vec<MaterialDef>,
    #[serde(default)]
    pub equipment: Vec<EquipmentDef>,
    #[serde(default)]
    pub quality: Vec<QualityDef>,
}

/// Code/item-keyed view over a segment's definitions.
#[derive(Debug, Clone, Default)]
pub struct DefinitionIndex {
    materials: BTreeMap<String, MaterialDef>,
    equipment: BTreeMap<String, EquipmentDef>,
    quality: BTreeMap<String, QualityDef>,
}

impl DefinitionIndex {
    pub fn from_definitions(defs: &SegmentDefinitions) -> DefinitionIndex {
        DefinitionIndex {
            materials: defs
                .materials
                .iter()
                .map(|d| (d.code.clone(), d.clone()))
                .collect(),
            equipment: defs
                .equipment
                .iter()
                .map(|d| (d.code.clone(), d.clone()))
                .collect(),
            quality: defs
                .quality
                .iter()
                .map(|d| (d.item.clone(), d.clone()))
                .collect(),
        }
    }

    /// Drop all entries — the state for "no segment selected".
    pub fn clear(&mut self) {
        self.materials.clear();
        self.equipment.clear();
        self.quality.clear();
    }

    pub fn material(&self, code: &str) -> Option<&MaterialDef> {
        self.materials.get(code)
    }

    pub fn equipment(&self, code: &str) -> Option<&EquipmentDef> {
        self.equipment.get(code)
    }

    pub fn quality(&self, item: &str) -> Option<&QualityDef> {
        self.quality.get(item)
    }

    pub fn materials(&self) -> impl Iterator<Item = &MaterialDef> {
        self.materials.values()
    }

    pub fn equipment_defs(&self) -> impl Iterator<Item = &EquipmentDef> {
        self.equipment.values()
    }

    pub fn quality_defs(&self) -> impl Iterator<Item = &QualityDef> {
        self.quality.values()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty() && self.equipment.is_empty() && self.quality.is_empty()
    }
}

/// One entry of `/api/process_segments`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessSegment {
    #[serde(default)]
    pub id: Option<i64>,
    pub segment_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub sort_order: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FieldColumn {
    pub key: String,
    #[serde(default)]
    pub options: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CategoryFields {
    #[serde(default)]
    pub columns: Vec<FieldColumn>,
}

/// Raw response of `/api/config/record_fields`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RecordFieldsResponse {
    #[serde(default)]
    pub equipment: CategoryFields,
    #[serde(default)]
    pub batch_status_options: Vec<String>,
    #[serde(default)]
    pub batch_completed_status: Option<String>,
}

pub const DEFAULT_COMPLETED_STATUS: &str = "已完成";

/// Status enums resolved from the record-field config, with the
/// built-in defaults kept when the fetch fails or fields are absent.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldConfig {
    pub equipment_status_options: Vec<String>,
    pub batch_status_options: Vec<String>,
    pub completed_status: String,
}

impl Default for FieldConfig {
    fn default() -> Self {
        FieldConfig {
            equipment_status_options: vec![
                "正常运行".to_string(),
                "故障".to_string(),
                "维护".to_string(),
            ],
            batch_status_options: vec![
                "进行中".to_string(),
                DEFAULT_COMPLETED_STATUS.to_string(),
                "暂停".to_string(),
                "异常".to_string(),
            ],
            completed_status: DEFAULT_COMPLETED_STATUS.to_string(),
        }
    }
}

impl FieldConfig {
    /// Merge a server response over the defaults. The configured
    /// completed status is always present in the batch status list.
    pub fn from_response(response: &RecordFieldsResponse) -> FieldConfig {
        let mut config = FieldConfig::default();

        if let Some(completed) = response
            .batch_completed_status
            .as_deref()
            .filter(|s| !s.is_empty())
        {
            config.completed_status = completed.to_string();
        }

        if let Some(column) = response
            .equipment
            .columns
            .iter()
            .find(|c| c.key == "status")
        {
            if !column.options.is_empty() {
                config.equipment_status_options = column.options.clone();
            }
        }

        if !response.batch_status_options.is_empty() {
            config.batch_status_options = response.batch_status_options.clone();
        }
        if !config
            .batch_status_options
            .contains(&config.completed_status)
        {
            config
                .batch_status_options
                .push(config.completed_status.clone());
        }

        config
    }

    pub fn is_valid_batch_status(&self, status: &str) -> bool {
        self.batch_status_options.iter().any(|s| s == status)
    }

    pub fn default_equipment_status(&self) -> &str {
        self.equipment_status_options
            .first()
            .map(String::as_str)
            .unwrap_or("正常运行")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameter_kind_unknown_degrades_to_text() {
        let spec: ParameterSpec =
            serde_json::from_str(r#"{"key": "mode", "type": "color"}"#).unwrap();
        assert_eq!(spec.kind, ParameterKind::Text);

        let spec: ParameterSpec =
            serde_json::from_str(r#"{"key": "speed", "type": "number"}"#).unwrap();
        assert_eq!(spec.kind, ParameterKind::Number);
    }

    #[test]
    fn test_parameter_kind_defaults_to_text_when_absent() {
        let spec: ParameterSpec = serde_json::from_str(r#"{"key": "remark"}"#).unwrap();
        assert_eq!(spec.kind, ParameterKind::Text);
        assert!(!spec.required);
    }

    #[test]
    fn test_step_text_accepts_string_and_number() {
        let spec: ParameterSpec =
            serde_json::from_str(r#"{"key": "t", "type": "number", "step": "0.5"}"#).unwrap();
        assert_eq!(spec.step_text(), "0.5");

        let spec: ParameterSpec =
            serde_json::from_str(r#"{"key": "t", "type": "number", "step": 1}"#).unwrap();
        assert_eq!(spec.step_text(), "1");

        let spec: ParameterSpec =
            serde_json::from_str(r#"{"key": "t", "type": "number"}"#).unwrap();
        assert_eq!(spec.step_text(), "0.01");
    }

    #[test]
    fn test_default_text_conversions() {
        let spec: ParameterSpec =
            serde_json::from_str(r#"{"key": "b", "type": "boolean", "default": true}"#).unwrap();
        assert_eq!(spec.default_text().as_deref(), Some("true"));

        let spec: ParameterSpec =
            serde_json::from_str(r#"{"key": "n", "type": "number", "default": 42}"#).unwrap();
        assert_eq!(spec.default_text().as_deref(), Some("42"));
    }

    #[test]
    fn test_definition_index_lookup() {
        let defs: SegmentDefinitions = serde_json::from_str(
            r#"{
                "materials": [{"code": "M-01", "name": "树脂", "supplier": "供应商A", "unit": "kg"}],
                "equipment": [{"code": "E-01", "name": "搅拌机", "parameters": [{"key": "speed", "type": "number"}]}],
                "quality": [{"item": "粘度", "unit": "mPa·s", "min": 10.0, "max": 20.0}]
            }"#,
        )
        .unwrap();

        let index = DefinitionIndex::from_definitions(&defs);
        assert_eq!(index.material("M-01").unwrap().name, "树脂");
        assert_eq!(index.equipment("E-01").unwrap().parameters.len(), 1);
        assert_eq!(index.quality("粘度").unwrap().max, Some(20.0));
        assert!(index.material("M-99").is_none());

        let mut index = index;
        index.clear();
        assert!(index.is_empty());
    }

    #[test]
    fn test_field_config_defaults() {
        let config = FieldConfig::default();
        assert_eq!(
            config.batch_status_options,
            vec!["进行中", "已完成", "暂停", "异常"]
        );
        assert_eq!(
            config.equipment_status_options,
            vec!["正常运行", "故障", "维护"]
        );
    }

    #[test]
    fn test_field_config_from_response_overrides() {
        let response: RecordFieldsResponse = serde_json::from_str(
            r#"{
                "equipment": {"columns": [
                    {"key": "status", "options": ["运行", "停机"]},
                    {"key": "equipment_code"}
                ]},
                "batch_status_options": ["进行中", "暂停"],
                "batch_completed_status": "完结"
            }"#,
        )
        .unwrap();

        let config = FieldConfig::from_response(&response);
        assert_eq!(config.equipment_status_options, vec!["运行", "停机"]);
        // The configured completed status is re-appended.
        assert_eq!(config.batch_status_options, vec!["进行中", "暂停", "完结"]);
        assert!(config.is_valid_batch_status("完结"));
        assert!(!config.is_valid_batch_status("已完成"));
        assert_eq!(config.default_equipment_status(), "运行");
    }

    #[test]
    fn test_field_config_from_empty_response_keeps_defaults() {
        let config = FieldConfig::from_response(&RecordFieldsResponse::default());
        assert_eq!(config, FieldConfig::default());
    }
}

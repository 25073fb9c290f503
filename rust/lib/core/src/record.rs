//! Record models for the three categories and the payload shapes the
//! server accepts on create/update.
//!
//! Equipment `parameters` always travel as strings regardless of the
//! declared parameter type; material/quality `attributes` are kept as
//! raw JSON so schema-unknown keys survive edit cycles verbatim.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Stored attachment. Immutable once uploaded — a record's attachment
/// set is only ever replaced wholesale, never patched per item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub path: String,
    pub name: String,
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialRecord {
    pub id: i64,
    pub material_code: String,
    pub material_name: String,
    pub weight: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supplier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lot_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recorded_by_name: Option<String>,
    #[serde(default)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquipmentRecord {
    pub id: i64,
    pub equipment_code: String,
    pub equipment_name: String,
    pub start_time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    pub status: String,
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recorded_by_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityRecord {
    pub id: i64,
    pub test_item: String,
    pub test_value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub standard_min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub standard_max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_time: Option<String>,
    #[serde(default)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

/// JSON body for material create/update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialPayload {
    pub material_code: String,
    pub material_name: String,
    pub weight: f64,
    pub unit: Option<String>,
    pub supplier: Option<String>,
    pub lot_number: Option<String>,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub extras: serde_json::Map<String, serde_json::Value>,
}

/// The `payload` part of an equipment multipart submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquipmentPayload {
    pub equipment_code: String,
    pub equipment_name: String,
    pub start_time: String,
    pub end_time: Option<String>,
    pub status: String,
    pub parameters: BTreeMap<String, String>,
}

/// The `payload` part of a quality multipart submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityPayload {
    pub test_item: String,
    pub test_value: f64,
    pub unit: Option<String>,
    pub standard_min: Option<f64>,
    pub standard_max: Option<f64>,
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub extras: serde_json::Map<String, serde_json::Value>,
}

impl EquipmentRecord {
    /// Attachment paths in stored order, used to seed the keep-list
    /// when an edit or re-upload begins.
    pub fn attachment_paths(&self) -> Vec<String> {
        self.attachments.iter().map(|a| a.path.clone()).collect()
    }
}

impl QualityRecord {
    pub fn attachment_paths(&self) -> Vec<String> {
        self.attachments.iter().map(|a| a.path.clone()).collect()
    }
}

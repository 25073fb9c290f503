//! Material add/edit form.

use crate::record::{MaterialPayload, MaterialRecord};
use crate::schema::{DefinitionIndex, MaterialDef};
use crate::Error;

use super::FormMode;

/// Material form state. Field values are held as entered; `weight`
/// parses on submit. When a catalog definition owns the selected code,
/// name/supplier lock and follow it; unknown codes leave everything
/// editable.
#[derive(Debug, Clone, Default)]
pub struct MaterialForm {
    mode: FormMode,
    pub code: String,
    pub name: String,
    pub weight: String,
    pub unit: String,
    pub supplier: String,
    pub lot_number: String,
    definition_locked: bool,
    original_extras: serde_json::Map<String, serde_json::Value>,
}

impl MaterialForm {
    pub fn mode(&self) -> FormMode {
        self.mode
    }

    /// Fields owned by a catalog definition are read-only.
    pub fn definition_locked(&self) -> bool {
        self.definition_locked
    }

    /// Clear everything back to create mode.
    pub fn enter_create(&mut self) {
        *self = MaterialForm::default();
    }

    /// Populate from an existing record. Schema-unknown `attributes`
    /// are kept aside verbatim and re-attached on submit. A catalog
    /// definition locks the owned fields, but the record's stored
    /// values win over the catalog's autofill.
    pub fn enter_edit(&mut self, record: &MaterialRecord, definitions: &DefinitionIndex) {
        *self = MaterialForm::default();
        self.mode = FormMode::Edit(record.id);
        self.code = record.material_code.clone();
        self.original_extras = record.attributes.clone();

        self.apply_definition(definitions.material(&record.material_code));

        if !record.material_name.is_empty() {
            self.name = record.material_name.clone();
        }
        if let Some(supplier) = &record.supplier {
            self.supplier = supplier.clone();
        }
        if let Some(unit) = &record.unit {
            self.unit = unit.clone();
        }
        self.weight = record.weight.to_string();
        self.lot_number = record.lot_number.clone().unwrap_or_default();
    }

    /// Select a code. A known definition autofills and locks its
    /// fields; `None` (unknown or manual code) unlocks them.
    pub fn apply_definition(&mut self, definition: Option<&MaterialDef>) {
        match definition {
            Some(def) => {
                self.code = def.code.clone();
                self.name = def.name.clone();
                self.supplier = def.supplier.clone().unwrap_or_default();
                if let Some(unit) = &def.unit {
                    self.unit = unit.clone();
                }
                self.definition_locked = true;
            }
            None => {
                self.definition_locked = false;
            }
        }
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.code.trim().is_empty() || self.name.trim().is_empty() {
            return Err(Error::Validation("请填写所有必填字段".to_string()));
        }
        let weight = self.weight.trim();
        if weight.is_empty() || weight.parse::<f64>().is_err() {
            return Err(Error::Validation("重量需要数字".to_string()));
        }
        Ok(())
    }

    /// Build the JSON body. Preserved extras travel only in edit mode,
    /// matching what the record originally carried.
    pub fn build_payload(&self) -> Result<MaterialPayload, Error> {
        self.validate()?;
        let weight = self
            .weight
            .trim()
            .parse::<f64>()
            .map_err(|_| Error::Validation("重量需要数字".to_string()))?;

        let extras = if self.mode.is_edit() {
            self.original_extras.clone()
        } else {
            serde_json::Map::new()
        };

        Ok(MaterialPayload {
            material_code: self.code.trim().to_string(),
            material_name: self.name.trim().to_string(),
            weight,
            unit: non_empty(&self.unit),
            supplier: non_empty(&self.supplier),
            lot_number: non_empty(&self.lot_number),
            extras,
        })
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

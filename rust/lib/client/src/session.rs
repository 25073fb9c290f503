//! The per-session controller that mediates every read and write.
//!
//! Owns the permission set, the batch index, the active segment's
//! definition index, the per-category record maps, and the three
//! forms. Every mutating method re-checks the relevant permission flag
//! and returns [`Error::Permission`] without touching the network on
//! denial. Record-table application is gated on a generation ticket so
//! a slow response for a previously selected batch can never overwrite
//! the tables of the one the user switched to.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use tracing::{debug, warn};

use batchline_core::deletion::{DeletionChain, Selection};
use batchline_core::form::FormMode;
use batchline_core::record::{
    EquipmentPayload, EquipmentRecord, MaterialRecord, QualityPayload, QualityRecord,
};
use batchline_core::{
    Batch, BatchIndex, BatchView, DefinitionIndex, EquipmentForm, Error, FieldConfig, MaterialForm,
    PermissionSet, QualityForm, RecordSubmission, Role, SegmentDefinitions,
};

use crate::api::{Api, BatchUpdate, CreateBatchRequest, DuplicateBatchRequest};

/// Operation kinds guarded against duplicate submission. Mirrors the
/// page's disable-the-button-while-in-flight behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum OpKind {
    Material,
    Equipment,
    Quality,
    BatchCreate,
    BatchStatus,
    BatchSegment,
    BatchDuplicate,
    BatchDelete,
    BulkDelete,
}

/// Identifies one record-load round: the generation at selection time
/// plus the batch it was issued for. Stale tickets are rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    generation: u64,
    batch_id: i64,
}

impl LoadTicket {
    pub fn batch_id(&self) -> i64 {
        self.batch_id
    }
}

/// Outcome of a status/segment update.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome {
    Updated(Batch),
    /// The new value equals the current one; no call was made.
    Unchanged,
}

pub struct Session<A: Api> {
    api: A,
    role: Role,
    permissions: PermissionSet,
    index: BatchIndex,
    current: Option<BatchView>,
    definitions: DefinitionIndex,
    field_config: FieldConfig,
    materials: BTreeMap<i64, MaterialRecord>,
    equipment: BTreeMap<i64, EquipmentRecord>,
    quality: BTreeMap<i64, QualityRecord>,
    pub material_form: MaterialForm,
    pub equipment_form: EquipmentForm,
    pub quality_form: QualityForm,
    generation: u64,
    busy: BTreeSet<OpKind>,
}

impl<A: Api> Session<A> {
    pub fn new(api: A, role: Role) -> Session<A> {
        let permissions = PermissionSet::resolve(&role);
        Session {
            api,
            role,
            permissions,
            index: BatchIndex::default(),
            current: None,
            definitions: DefinitionIndex::default(),
            field_config: FieldConfig::default(),
            materials: BTreeMap::new(),
            equipment: BTreeMap::new(),
            quality: BTreeMap::new(),
            material_form: MaterialForm::default(),
            equipment_form: EquipmentForm::default(),
            quality_form: QualityForm::default(),
            generation: 0,
            busy: BTreeSet::new(),
        }
    }

    pub fn role(&self) -> &Role {
        &self.role
    }

    pub fn permissions(&self) -> &PermissionSet {
        &self.permissions
    }

    pub fn index(&self) -> &BatchIndex {
        &self.index
    }

    pub fn current(&self) -> Option<&BatchView> {
        self.current.as_ref()
    }

    pub fn definitions(&self) -> &DefinitionIndex {
        &self.definitions
    }

    pub fn field_config(&self) -> &FieldConfig {
        &self.field_config
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    // -----------------------------------------------------------------
    // Loading
    // -----------------------------------------------------------------

    /// Load the status enums. Degrades to the built-in defaults on
    /// failure — the config endpoint is best-effort.
    pub fn load_field_config(&mut self) {
        match self.api.record_fields() {
            Ok(response) => {
                self.field_config = FieldConfig::from_response(&response);
            }
            Err(e) => {
                warn!(error = %e, "record field config unavailable, using defaults");
            }
        }
    }

    /// Refresh the batch index from the server. The current selection
    /// survives when its id still exists, otherwise it is cleared.
    pub fn refresh_batches(&mut self) -> Result<(), Error> {
        let batches = self.api.list_batches()?;
        self.index = BatchIndex::from_batches(&batches);
        if let Some(current) = &self.current {
            self.current = self.index.find_by_id(current.id).cloned();
            if self.current.is_none() {
                self.clear_records();
            }
        }
        Ok(())
    }

    /// Load definitions for a segment. `None` resets to empty; a fetch
    /// failure logs a warning and falls back to empty — the forms
    /// degrade to manual entry, the caller never sees an error.
    pub fn load_definitions(&mut self, segment: Option<&str>) {
        match segment {
            None => self.definitions.clear(),
            Some(segment) => match self.api.segment_definitions(segment) {
                Ok(defs) => {
                    self.definitions = DefinitionIndex::from_definitions(&defs);
                }
                Err(e) => {
                    warn!(segment, error = %e, "segment definitions unavailable, manual entry");
                    self.definitions = DefinitionIndex::from_definitions(
                        &SegmentDefinitions::default(),
                    );
                }
            },
        }
    }

    /// Select a batch (or clear the selection). Bumps the load
    /// generation, loads the segment's definitions, and resets the
    /// forms. Returns the ticket record loads must present.
    pub fn select_batch(&mut self, batch_id: Option<i64>) -> Result<Option<LoadTicket>, Error> {
        self.generation += 1;

        let Some(batch_id) = batch_id else {
            self.current = None;
            self.clear_records();
            self.load_definitions(None);
            self.reset_forms();
            return Ok(None);
        };

        let view = self
            .index
            .find_by_id(batch_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("batch {batch_id}")))?;
        let segment = view.process_segment.clone();
        self.current = Some(view);
        self.load_definitions(Some(&segment));
        self.reset_forms();

        Ok(Some(LoadTicket {
            generation: self.generation,
            batch_id,
        }))
    }

    fn ticket_is_current(&self, ticket: &LoadTicket) -> bool {
        ticket.generation == self.generation
            && self.current.as_ref().map(|b| b.id) == Some(ticket.batch_id)
    }

    /// Apply a material list response. Returns false (and changes
    /// nothing) when the ticket is stale.
    pub fn apply_materials(&mut self, ticket: &LoadTicket, records: Vec<MaterialRecord>) -> bool {
        if !self.ticket_is_current(ticket) {
            debug!(batch_id = ticket.batch_id, "stale material load dropped");
            return false;
        }
        self.materials = records.into_iter().map(|r| (r.id, r)).collect();
        true
    }

    pub fn apply_equipment(&mut self, ticket: &LoadTicket, records: Vec<EquipmentRecord>) -> bool {
        if !self.ticket_is_current(ticket) {
            debug!(batch_id = ticket.batch_id, "stale equipment load dropped");
            return false;
        }
        self.equipment = records.into_iter().map(|r| (r.id, r)).collect();
        true
    }

    pub fn apply_quality(&mut self, ticket: &LoadTicket, records: Vec<QualityRecord>) -> bool {
        if !self.ticket_is_current(ticket) {
            debug!(batch_id = ticket.batch_id, "stale quality load dropped");
            return false;
        }
        self.quality = records.into_iter().map(|r| (r.id, r)).collect();
        true
    }

    /// Fetch the current batch's records for every viewable category.
    /// Categories the role may not view keep empty tables.
    pub fn reload_records(&mut self) -> Result<(), Error> {
        let Some(ticket) = self.current_ticket() else {
            self.clear_records();
            return Ok(());
        };

        if self.permissions.view_materials {
            let records = self.api.list_materials(ticket.batch_id)?;
            self.apply_materials(&ticket, records);
        } else {
            self.materials.clear();
        }

        if self.permissions.view_equipment {
            let records = self.api.list_equipment(ticket.batch_id)?;
            self.apply_equipment(&ticket, records);
        } else {
            self.equipment.clear();
        }

        if self.permissions.view_quality {
            let records = self.api.list_quality(ticket.batch_id)?;
            self.apply_quality(&ticket, records);
        } else {
            self.quality.clear();
        }

        Ok(())
    }

    fn current_ticket(&self) -> Option<LoadTicket> {
        self.current.as_ref().map(|b| LoadTicket {
            generation: self.generation,
            batch_id: b.id,
        })
    }

    pub fn materials(&self) -> impl Iterator<Item = &MaterialRecord> {
        self.materials.values()
    }

    pub fn equipment_records(&self) -> impl Iterator<Item = &EquipmentRecord> {
        self.equipment.values()
    }

    pub fn quality_records(&self) -> impl Iterator<Item = &QualityRecord> {
        self.quality.values()
    }

    fn clear_records(&mut self) {
        self.materials.clear();
        self.equipment.clear();
        self.quality.clear();
    }

    fn reset_forms(&mut self) {
        self.material_form.enter_create();
        self.equipment_form.enter_create(&self.field_config);
        self.quality_form.enter_create();
    }

    /// Pick a material code: a catalog definition autofills and locks
    /// its fields, an unknown code leaves everything editable.
    pub fn select_material_code(&mut self, code: &str) {
        self.material_form.code = code.to_string();
        let def = self.definitions.material(code).cloned();
        self.material_form.apply_definition(def.as_ref());
    }

    pub fn select_equipment_code(&mut self, code: &str) {
        self.equipment_form.code = code.to_string();
        let def = self.definitions.equipment(code).cloned();
        self.equipment_form.apply_definition(def.as_ref());
    }

    pub fn select_quality_item(&mut self, item: &str) {
        self.quality_form.test_item = item.to_string();
        let def = self.definitions.quality(item).cloned();
        self.quality_form.apply_definition(def.as_ref());
    }

    // -----------------------------------------------------------------
    // Guards
    // -----------------------------------------------------------------

    fn require(&self, allowed: bool, action: &str) -> Result<(), Error> {
        if allowed {
            Ok(())
        } else {
            Err(Error::Permission(format!(
                "role {} may not {action}",
                self.role.as_key()
            )))
        }
    }

    fn require_admin(&self, action: &str) -> Result<(), Error> {
        self.require(self.role.is_admin(), action)
    }

    fn current_batch(&self) -> Result<BatchView, Error> {
        self.current
            .clone()
            .ok_or_else(|| Error::Validation("no batch selected".to_string()))
    }

    /// Run one guarded operation. The op slot is taken for the
    /// duration of the call and released on every exit path, so a
    /// re-entrant trigger cannot double-submit.
    fn with_op<T>(
        &mut self,
        op: OpKind,
        f: impl FnOnce(&mut Self) -> Result<T, Error>,
    ) -> Result<T, Error> {
        if !self.busy.insert(op) {
            return Err(Error::Validation(format!("{op:?} already in progress")));
        }
        let result = f(self);
        self.busy.remove(&op);
        result
    }

    // -----------------------------------------------------------------
    // Record lifecycle
    // -----------------------------------------------------------------

    /// Open the material form on an existing record.
    pub fn edit_material(&mut self, record_id: i64) -> Result<(), Error> {
        self.require(self.permissions.manage_materials, "edit material records")?;
        let record = self
            .materials
            .get(&record_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("material record {record_id}")))?;
        self.material_form.enter_edit(&record, &self.definitions);
        Ok(())
    }

    /// Submit the material form. Validation runs before the network;
    /// on success the form resets to create mode and the table
    /// reloads; on failure form state is untouched for retry.
    pub fn submit_material(&mut self) -> Result<serde_json::Value, Error> {
        self.require(self.permissions.manage_materials, "manage material records")?;
        let batch = self.current_batch()?;
        let payload = self.material_form.build_payload()?;

        let result = self.with_op(OpKind::Material, |s| match s.material_form.mode() {
            FormMode::Create => s.api.create_material(batch.id, &payload),
            FormMode::Edit(record_id) => s.api.update_material(batch.id, record_id, &payload),
        })?;

        self.material_form.enter_create();
        self.reload_materials()?;
        Ok(result)
    }

    pub fn delete_material(&mut self, record_id: i64) -> Result<(), Error> {
        self.require(self.permissions.manage_materials, "delete material records")?;
        let batch = self.current_batch()?;
        if !self.materials.contains_key(&record_id) {
            return Err(Error::NotFound(format!("material record {record_id}")));
        }
        self.api.delete_material(batch.id, record_id)?;
        self.reload_materials()
    }

    pub fn edit_equipment(&mut self, record_id: i64) -> Result<(), Error> {
        self.require(self.permissions.manage_equipment, "edit equipment records")?;
        let record = self
            .equipment
            .get(&record_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("equipment record {record_id}")))?;
        self.equipment_form.enter_edit(&record, &self.definitions);
        Ok(())
    }

    pub fn submit_equipment(&mut self) -> Result<serde_json::Value, Error> {
        self.require(self.permissions.manage_equipment, "manage equipment records")?;
        let batch = self.current_batch()?;
        let submission = self.equipment_form.build_submission(&self.field_config)?;

        let result = self.with_op(OpKind::Equipment, |s| match s.equipment_form.mode() {
            FormMode::Create => s.api.create_equipment(batch.id, &submission),
            FormMode::Edit(record_id) => s.api.update_equipment(batch.id, record_id, &submission),
        })?;

        self.equipment_form.enter_create(&self.field_config);
        self.reload_equipment()?;
        Ok(result)
    }

    pub fn delete_equipment(&mut self, record_id: i64) -> Result<(), Error> {
        self.require(self.permissions.manage_equipment, "delete equipment records")?;
        let batch = self.current_batch()?;
        if !self.equipment.contains_key(&record_id) {
            return Err(Error::NotFound(format!("equipment record {record_id}")));
        }
        self.api.delete_equipment(batch.id, record_id)?;
        self.reload_equipment()
    }

    pub fn edit_quality(&mut self, record_id: i64) -> Result<(), Error> {
        self.require(self.permissions.manage_quality, "edit quality records")?;
        let record = self
            .quality
            .get(&record_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("quality record {record_id}")))?;
        self.quality_form.enter_edit(&record, &self.definitions);
        Ok(())
    }

    pub fn submit_quality(&mut self) -> Result<serde_json::Value, Error> {
        self.require(self.permissions.manage_quality, "manage quality records")?;
        let batch = self.current_batch()?;
        let submission = self.quality_form.build_submission()?;

        let result = self.with_op(OpKind::Quality, |s| match s.quality_form.mode() {
            FormMode::Create => s.api.create_quality(batch.id, &submission),
            FormMode::Edit(record_id) => s.api.update_quality(batch.id, record_id, &submission),
        })?;

        self.quality_form.enter_create();
        self.reload_quality()?;
        Ok(result)
    }

    pub fn delete_quality(&mut self, record_id: i64) -> Result<(), Error> {
        self.require(self.permissions.manage_quality, "delete quality records")?;
        let batch = self.current_batch()?;
        if !self.quality.contains_key(&record_id) {
            return Err(Error::NotFound(format!("quality record {record_id}")));
        }
        self.api.delete_quality(batch.id, record_id)?;
        self.reload_quality()
    }

    /// Re-submit an equipment record with its full current field set,
    /// its stored attachment paths, and the new files — the row-level
    /// paperclip upload.
    pub fn attach_to_equipment(
        &mut self,
        record_id: i64,
        files: Vec<PathBuf>,
    ) -> Result<serde_json::Value, Error> {
        self.require(self.permissions.manage_equipment, "upload equipment attachments")?;
        let batch = self.current_batch()?;
        let record = self
            .equipment
            .get(&record_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("equipment record {record_id}")))?;

        let payload = EquipmentPayload {
            equipment_code: record.equipment_code.clone(),
            equipment_name: record.equipment_name.clone(),
            start_time: record.start_time.clone(),
            end_time: record.end_time.clone(),
            status: record.status.clone(),
            parameters: record.parameters.clone(),
        };
        let submission = RecordSubmission {
            payload: serde_json::to_value(&payload)
                .map_err(|e| Error::Parse(e.to_string()))?,
            existing_attachments: record.attachment_paths(),
            files,
        };

        let result = self.with_op(OpKind::Equipment, |s| {
            s.api.update_equipment(batch.id, record_id, &submission)
        })?;
        self.reload_equipment()?;
        Ok(result)
    }

    pub fn attach_to_quality(
        &mut self,
        record_id: i64,
        files: Vec<PathBuf>,
    ) -> Result<serde_json::Value, Error> {
        self.require(self.permissions.manage_quality, "upload quality attachments")?;
        let batch = self.current_batch()?;
        let record = self
            .quality
            .get(&record_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("quality record {record_id}")))?;

        let payload = QualityPayload {
            test_item: record.test_item.clone(),
            test_value: record.test_value,
            unit: record.unit.clone(),
            standard_min: record.standard_min,
            standard_max: record.standard_max,
            notes: record.notes.clone(),
            extras: record.attributes.clone(),
        };
        let submission = RecordSubmission {
            payload: serde_json::to_value(&payload)
                .map_err(|e| Error::Parse(e.to_string()))?,
            existing_attachments: record.attachment_paths(),
            files,
        };

        let result = self.with_op(OpKind::Quality, |s| {
            s.api.update_quality(batch.id, record_id, &submission)
        })?;
        self.reload_quality()?;
        Ok(result)
    }

    fn reload_materials(&mut self) -> Result<(), Error> {
        if let Some(ticket) = self.current_ticket() {
            let records = self.api.list_materials(ticket.batch_id)?;
            self.apply_materials(&ticket, records);
        }
        Ok(())
    }

    fn reload_equipment(&mut self) -> Result<(), Error> {
        if let Some(ticket) = self.current_ticket() {
            let records = self.api.list_equipment(ticket.batch_id)?;
            self.apply_equipment(&ticket, records);
        }
        Ok(())
    }

    fn reload_quality(&mut self) -> Result<(), Error> {
        if let Some(ticket) = self.current_ticket() {
            let records = self.api.list_quality(ticket.batch_id)?;
            self.apply_quality(&ticket, records);
        }
        Ok(())
    }

    // -----------------------------------------------------------------
    // Batch lifecycle
    // -----------------------------------------------------------------

    pub fn create_batch(&mut self, request: &CreateBatchRequest) -> Result<Batch, Error> {
        self.require(self.permissions.create_batch, "create batches")?;
        let batch = self.with_op(OpKind::BatchCreate, |s| s.api.create_batch(request))?;
        self.refresh_batches()?;
        Ok(batch)
    }

    /// Update the current batch's status. A no-op when the value is
    /// unchanged; invalid statuses are rejected locally.
    pub fn update_batch_status(&mut self, status: &str) -> Result<UpdateOutcome, Error> {
        self.require(self.permissions.manage_batch_status, "update batch status")?;
        let batch = self.current_batch()?;

        if !self.field_config.is_valid_batch_status(status) {
            return Err(Error::Validation(format!("状态值无效: {status}")));
        }
        if batch.status == status {
            return Ok(UpdateOutcome::Unchanged);
        }

        let updated = self.with_op(OpKind::BatchStatus, |s| {
            s.api.update_batch(batch.id, &BatchUpdate::status(status))
        })?;

        let mut view = batch;
        view.status = updated.status.clone();
        view.end_time = updated.end_time.clone();
        self.index.update_view(&view);
        self.current = Some(view);
        Ok(UpdateOutcome::Updated(updated))
    }

    /// Move the current batch to another segment. Reloads that
    /// segment's definitions on success.
    pub fn update_batch_segment(&mut self, segment: &str) -> Result<UpdateOutcome, Error> {
        self.require(self.permissions.manage_batch_segment, "update batch segment")?;
        let batch = self.current_batch()?;

        if segment.is_empty() {
            return Err(Error::Validation("请选择目标工段".to_string()));
        }
        if batch.process_segment == segment {
            return Ok(UpdateOutcome::Unchanged);
        }

        let updated = self.with_op(OpKind::BatchSegment, |s| {
            s.api.update_batch(batch.id, &BatchUpdate::segment(segment))
        })?;

        let mut view = batch;
        view.process_segment = updated.process_segment.clone();
        self.index.update_view(&view);
        let segment = view.process_segment.clone();
        self.current = Some(view);
        self.load_definitions(Some(&segment));
        Ok(UpdateOutcome::Updated(updated))
    }

    /// Duplicate the current batch into a new batch number / product
    /// name, optionally copying child records. A colliding batch
    /// number is allowed (segment disambiguates) — callers should
    /// confirm via [`BatchIndex::batch_number_exists`] first.
    pub fn duplicate_batch(
        &mut self,
        batch_number: &str,
        product_name: &str,
        copy_records: bool,
    ) -> Result<Batch, Error> {
        self.require(self.permissions.duplicate_batch, "duplicate batches")?;
        let batch = self.current_batch()?;

        if batch_number.trim().is_empty() || product_name.trim().is_empty() {
            return Err(Error::Validation("请填写新批号和产品名称".to_string()));
        }

        let request = DuplicateBatchRequest {
            batch_number: batch_number.trim().to_string(),
            product_name: product_name.trim().to_string(),
            process_segment: batch.process_segment.clone(),
            copy_records,
        };
        let created = self.with_op(OpKind::BatchDuplicate, |s| {
            s.api.duplicate_batch(batch.id, &request)
        })?;
        self.refresh_batches()?;
        Ok(created)
    }

    /// Delete one batch row. Admin only.
    pub fn delete_batch(&mut self, batch_id: i64) -> Result<(), Error> {
        self.require_admin("delete batches")?;
        self.with_op(OpKind::BatchDelete, |s| s.api.delete_batch(batch_id))?;
        self.refresh_batches()
    }

    /// The grouping behind the cascading delete selectors. Admin only
    /// — non-admin roles get no chain at all.
    pub fn deletion_chain(&self) -> Result<DeletionChain, Error> {
        self.require_admin("bulk delete batch records")?;
        Ok(DeletionChain::build(self.index.views()))
    }

    /// Bulk delete every row matching the selection's quadruple.
    /// Returns the server's actual deleted count (may exceed 1).
    pub fn bulk_delete(&mut self, selection: &Selection) -> Result<u64, Error> {
        self.require_admin("bulk delete batch records")?;
        let key = selection.delete_key().ok_or_else(|| {
            Error::Validation("请完整选择产品、批号、工段和状态".to_string())
        })?;

        let chain = DeletionChain::build(self.index.views());
        if chain
            .entry_for(
                &key.product_name,
                &key.batch_number,
                &key.process_segment,
                &key.status,
            )
            .is_none()
        {
            return Err(Error::NotFound("未找到匹配的批号记录或状态".to_string()));
        }

        let deleted = self.with_op(OpKind::BulkDelete, |s| s.api.bulk_delete_batches(&key))?;
        self.refresh_batches()?;
        Ok(deleted)
    }
}

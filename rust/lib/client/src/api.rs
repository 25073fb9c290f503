//! The batch-tracking server surface, as a trait.
//!
//! The session controller is written against this trait; [`crate::HttpApi`]
//! is the production implementation and tests substitute an in-memory
//! fake.

use serde::{Deserialize, Serialize};

use batchline_core::deletion::DeleteKey;
use batchline_core::record::{EquipmentRecord, MaterialPayload, MaterialRecord, QualityRecord};
use batchline_core::schema::{ProcessSegment, RecordFieldsResponse, SegmentDefinitions};
use batchline_core::{Batch, Error, RecordSubmission};

/// Body of `POST /api/batches`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBatchRequest {
    pub batch_number: String,
    pub product_name: String,
    pub process_segment: String,
}

/// Body of `PUT /api/batches/{id}` — status and/or segment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub process_segment: Option<String>,
}

impl BatchUpdate {
    pub fn status(status: &str) -> BatchUpdate {
        BatchUpdate {
            status: Some(status.to_string()),
            ..BatchUpdate::default()
        }
    }

    pub fn segment(segment: &str) -> BatchUpdate {
        BatchUpdate {
            process_segment: Some(segment.to_string()),
            ..BatchUpdate::default()
        }
    }
}

/// Body of `POST /api/batches/{id}/duplicate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateBatchRequest {
    pub batch_number: String,
    pub product_name: String,
    pub process_segment: String,
    pub copy_records: bool,
}

/// Response of `GET /api/batches/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct BatchDetail {
    pub batch: Batch,
    #[serde(default)]
    pub segments: Vec<Batch>,
    #[serde(default)]
    pub summary: serde_json::Value,
}

/// Every endpoint the client consumes. Methods return typed payloads;
/// create/update calls hand back the raw JSON the server echoes.
pub trait Api {
    fn list_batches(&self) -> Result<Vec<Batch>, Error>;
    fn batch_detail(&self, batch_id: i64) -> Result<BatchDetail, Error>;
    fn create_batch(&self, request: &CreateBatchRequest) -> Result<Batch, Error>;
    fn update_batch(&self, batch_id: i64, update: &BatchUpdate) -> Result<Batch, Error>;
    fn delete_batch(&self, batch_id: i64) -> Result<(), Error>;
    /// Bulk delete by quadruple; returns the server's deleted count.
    fn bulk_delete_batches(&self, key: &DeleteKey) -> Result<u64, Error>;
    fn duplicate_batch(
        &self,
        batch_id: i64,
        request: &DuplicateBatchRequest,
    ) -> Result<Batch, Error>;

    fn process_segments(&self) -> Result<Vec<ProcessSegment>, Error>;
    fn segment_definitions(&self, segment: &str) -> Result<SegmentDefinitions, Error>;
    fn record_fields(&self) -> Result<RecordFieldsResponse, Error>;

    fn list_materials(&self, batch_id: i64) -> Result<Vec<MaterialRecord>, Error>;
    fn create_material(
        &self,
        batch_id: i64,
        payload: &MaterialPayload,
    ) -> Result<serde_json::Value, Error>;
    fn update_material(
        &self,
        batch_id: i64,
        record_id: i64,
        payload: &MaterialPayload,
    ) -> Result<serde_json::Value, Error>;
    fn delete_material(&self, batch_id: i64, record_id: i64) -> Result<(), Error>;

    fn list_equipment(&self, batch_id: i64) -> Result<Vec<EquipmentRecord>, Error>;
    fn create_equipment(
        &self,
        batch_id: i64,
        submission: &RecordSubmission,
    ) -> Result<serde_json::Value, Error>;
    fn update_equipment(
        &self,
        batch_id: i64,
        record_id: i64,
        submission: &RecordSubmission,
    ) -> Result<serde_json::Value, Error>;
    fn delete_equipment(&self, batch_id: i64, record_id: i64) -> Result<(), Error>;

    fn list_quality(&self, batch_id: i64) -> Result<Vec<QualityRecord>, Error>;
    fn create_quality(
        &self,
        batch_id: i64,
        submission: &RecordSubmission,
    ) -> Result<serde_json::Value, Error>;
    fn update_quality(
        &self,
        batch_id: i64,
        record_id: i64,
        submission: &RecordSubmission,
    ) -> Result<serde_json::Value, Error>;
    fn delete_quality(&self, batch_id: i64, record_id: i64) -> Result<(), Error>;
}

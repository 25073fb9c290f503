pub mod batch;
pub mod deletion;
pub mod error;
pub mod form;
pub mod record;
pub mod role;
pub mod schema;

pub use batch::{Batch, BatchFilter, BatchIndex, BatchView, SegmentSummary};
pub use deletion::{DeleteKey, DeletionChain, Selection};
pub use error::Error;
pub use form::{AttachmentSet, EquipmentForm, FormMode, MaterialForm, QualityForm, RecordSubmission};
pub use record::{
    Attachment, EquipmentPayload, EquipmentRecord, MaterialPayload, MaterialRecord, QualityPayload,
    QualityRecord,
};
pub use role::{PermissionSet, Role};
pub use schema::{DefinitionIndex, FieldConfig, ProcessSegment, SegmentDefinitions};

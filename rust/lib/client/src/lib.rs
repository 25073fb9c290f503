pub mod api;
pub mod http;
pub mod session;

pub use api::{Api, BatchDetail, BatchUpdate, CreateBatchRequest, DuplicateBatchRequest};
pub use http::HttpApi;
pub use session::{LoadTicket, OpKind, Session, UpdateOutcome};

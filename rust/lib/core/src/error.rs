use thiserror::Error;

/// Client-side error taxonomy. `Validation` and `Permission` are raised
/// before any network traffic; `Api`/`Network`/`Parse` wrap server or
/// transport failures; `NotFound` covers both 404 responses and local
/// lookup misses after a stale refresh.
#[derive(Error, Debug)]
pub enum Error {
    #[error("{0}")]
    Validation(String),

    #[error("permission denied: {0}")]
    Permission(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("server error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("parse error: {0}")]
    Parse(String),
}

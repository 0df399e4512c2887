//! Common error types for tally

use thiserror::Error;

/// Common result type for tally operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the tally crates
#[derive(Error, Debug)]
pub enum Error {
    #[error("Duplicate set id: {id}")]
    DuplicateSetId { id: String },

    #[error("Malformed query: {reason}")]
    MalformedQuery { reason: String },

    #[error("Unknown model: {id}")]
    UnknownModel { id: String },

    #[error("Invalid state shape: {reason}")]
    InvalidStateShape { reason: String },

    #[error("Offline storage unavailable")]
    StorageUnavailable,

    #[error("Set {set_id} does not override {member}")]
    MissingOverride {
        set_id: String,
        member: &'static str,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

//! Error types for the process-recording core.

use thiserror::Error;

/// Result type alias using the workline error type.
pub type Result<T> = std::result::Result<T, WorklineError>;

/// Main error type for the process-recording core.
#[derive(Error, Debug)]
pub enum WorklineError {
    /// Product row does not exist
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Target field already holds a value; entries are never overwritten
    #[error("Process already recorded: product {0} field {1} is set")]
    AlreadyRecorded(String, String),

    /// Two winding entries by the same employee inside the minimum gap
    #[error("Winding entry too soon: employee {0} last wound at {1}, minimum gap is {2}s")]
    CooldownViolation(String, String, i64),

    /// Caller is not the employee recorded on the process being cleared
    #[error("Not authorized: process {1} on product {0} was recorded by a different employee")]
    NotAuthorized(String, String),

    /// General error from anyhow (storage failures, unknown fields)
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

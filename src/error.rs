//! Error taxonomy for the storage layer.
//!
//! "Not found" is deliberately absent: empty lookups are reported through
//! [`crate::models::Lookup`], not as failures.

use thiserror::Error;

/// Failures surfaced by [`crate::store`] implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A device with this chip id is already registered.
    #[error("Sensor already exists: chip id {0}")]
    AlreadyExists(i32),

    /// Any other engine I/O or constraint error.
    #[error("Storage failure: {0}")]
    Storage(#[from] sqlx::Error),
}

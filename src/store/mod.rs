//! Storage seam between the query façade and the relational engine.
//!
//! Two traits model the two tables: [`ReadingStore`] is the append-only time
//! series, [`DeviceRegistry`] the per-chip metadata it joins against. Both are
//! implemented by [`PgStore`] for production and by `MemoryStore` in test
//! builds. Implementations hold no policy: limits arrive already clamped and
//! empty results are returned as empty vectors.
//!
//! Every newest-first ordering is `created_at DESC, id DESC`, so ties on the
//! timestamp resolve to the later-inserted row.

use std::future::Future;

use chrono::{DateTime, Utc};

use crate::error::StoreError;
use crate::models::{
    DateRange, DeviceInfo, DeviceUpdate, DeviceWithReadings, NewDevice, NewReading, Reading,
    ReadingWithDevice,
};

#[cfg(test)]
mod memory;
mod postgres;

#[cfg(test)]
pub use memory::MemoryStore;
pub use postgres::PgStore;

// ---

/// Append-only writer and reader for time-stamped measurements.
pub trait ReadingStore: Clone + Send + Sync + 'static {
    /// Insert one row; id and both timestamps are assigned by the store.
    fn insert_reading(
        &self,
        new: NewReading,
    ) -> impl Future<Output = Result<Reading, StoreError>> + Send;

    /// Up to `limit` newest readings for `chip_id`, left-joined to metadata.
    fn recent_readings(
        &self,
        chip_id: i32,
        limit: i64,
    ) -> impl Future<Output = Result<Vec<ReadingWithDevice>, StoreError>> + Send;

    /// All readings for `chip_id` with `from <= created_at <= to`, newest first.
    fn readings_between(
        &self,
        chip_id: i32,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vec<ReadingWithDevice>, StoreError>> + Send;

    /// Newest reading of every chip that has a registered device, by chip id.
    fn latest_per_device(
        &self,
    ) -> impl Future<Output = Result<Vec<ReadingWithDevice>, StoreError>> + Send;
}

/// CRUD over device metadata keyed by chip id.
pub trait DeviceRegistry: Clone + Send + Sync + 'static {
    /// Create a device, failing with [`StoreError::AlreadyExists`] on a
    /// duplicate chip id. Uniqueness is enforced by the store itself, not by
    /// a prior existence check.
    fn insert_device(
        &self,
        new: NewDevice,
    ) -> impl Future<Output = Result<DeviceInfo, StoreError>> + Send;

    /// Overwrite name and location. `None` when the chip is not registered.
    fn update_device(
        &self,
        update: DeviceUpdate,
    ) -> impl Future<Output = Result<Option<DeviceInfo>, StoreError>> + Send;

    /// Remove the device row, leaving its readings in place. `false` when
    /// nothing was deleted.
    fn delete_device(&self, chip_id: i32) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Every registered device, by chip id.
    fn list_devices(&self) -> impl Future<Output = Result<Vec<DeviceInfo>, StoreError>> + Send;

    /// Every registered device with at most `per_device` of its newest
    /// readings inside `range`. Devices without matching readings carry an
    /// empty list.
    fn devices_with_readings(
        &self,
        range: DateRange,
        per_device: i64,
    ) -> impl Future<Output = Result<Vec<DeviceWithReadings>, StoreError>> + Send;
}

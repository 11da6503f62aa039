//! Query façade over the reading store and device registry.
//!
//! This is where request-level policy lives: limit coercion, the `to = now`
//! default for ranges, the fixed per-device cap of the registry-first view,
//! and reporting empty collections as [`Lookup::NotFound`]. Storage errors
//! are logged once here and returned unchanged; nothing is retried.

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, instrument, warn};

use crate::error::StoreError;
use crate::models::{
    DateRange, DeviceInfo, DeviceUpdate, DeviceWithReadings, Lookup, NewDevice, NewReading,
    Reading, ReadingWithDevice,
};
use crate::store::{DeviceRegistry, ReadingStore};

// ---

/// Limit used when none (or garbage) is supplied.
pub const DEFAULT_RECENT_LIMIT: i64 = 1;

/// Hard ceiling on `recent_readings`, whatever the caller asks for.
pub const MAX_RECENT_LIMIT: i64 = 100;

/// Readings attached to each device in `list_devices_with_readings`.
pub const READINGS_PER_DEVICE: i64 = 1000;

/// Turn a raw, caller-supplied limit into a row count in `1..=100`.
///
/// Integers are taken as-is, decimals are truncated toward zero, anything
/// else counts as absent. Absent, zero and negative all become 1.
pub fn coerce_limit(raw: Option<&str>) -> i64 {
    // ---
    let parsed = raw.map(str::trim).and_then(|s| {
        s.parse::<i64>().ok().or_else(|| {
            s.parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .map(|v| v.trunc() as i64)
        })
    });

    match parsed {
        Some(n) if n > MAX_RECENT_LIMIT => MAX_RECENT_LIMIT,
        Some(n) if n >= 1 => n,
        _ => DEFAULT_RECENT_LIMIT,
    }
}

/// Composes [`ReadingStore`] and [`DeviceRegistry`] into the operations the
/// transport layer calls.
#[derive(Debug, Clone)]
pub struct SensorService<S> {
    store: S,
}

impl<S> SensorService<S>
where
    S: ReadingStore + DeviceRegistry,
{
    // ---
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Record a measurement. Unknown chip ids are accepted.
    #[instrument(skip(self, new), fields(chip_id = new.chip_id))]
    pub async fn append_reading(&self, new: NewReading) -> Result<Reading, StoreError> {
        // ---
        let reading = self
            .store
            .insert_reading(new)
            .await
            .inspect_err(|e| error!("Error inserting sensor data: {}", e))?;

        debug!("Stored reading {} at {}", reading.id, reading.created_at);
        Ok(reading)
    }

    /// Newest readings for one chip, at most [`MAX_RECENT_LIMIT`].
    #[instrument(skip(self))]
    pub async fn recent_readings(
        &self,
        chip_id: i32,
        limit: Option<&str>,
    ) -> Result<Lookup<Vec<ReadingWithDevice>>, StoreError> {
        // ---
        let limit = coerce_limit(limit);
        let rows = self
            .store
            .recent_readings(chip_id, limit)
            .await
            .inspect_err(|e| error!("Error getting sensor data: {}", e))?;

        debug!("Found {} of at most {} readings", rows.len(), limit);
        Ok(Lookup::from_rows(rows))
    }

    /// Every reading for one chip inside `[from, to]`, newest first.
    ///
    /// `to` defaults to the current time. The result is not capped, so wide
    /// ranges over chatty devices can be large.
    #[instrument(skip(self))]
    pub async fn range_readings(
        &self,
        chip_id: i32,
        from: DateTime<Utc>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Lookup<Vec<ReadingWithDevice>>, StoreError> {
        // ---
        let to = to.unwrap_or_else(Utc::now);
        if from > to {
            warn!("Range starts after it ends ({} > {})", from, to);
        }

        let rows = self
            .store
            .readings_between(chip_id, from, to)
            .await
            .inspect_err(|e| error!("Error getting sensor data: {}", e))?;

        debug!("Found {} readings in range", rows.len());
        Ok(Lookup::from_rows(rows))
    }

    /// The newest reading of each registered chip.
    ///
    /// Chips without a `device_info` row are left out. Among readings that
    /// share the newest timestamp, the one inserted last is returned.
    #[instrument(skip(self))]
    pub async fn latest_per_device(&self) -> Result<Lookup<Vec<ReadingWithDevice>>, StoreError> {
        // ---
        let rows = self
            .store
            .latest_per_device()
            .await
            .inspect_err(|e| error!("Error getting latest data: {}", e))?;

        debug!("Latest readings for {} devices", rows.len());
        Ok(Lookup::from_rows(rows))
    }

    /// Register a device. A second registration of the same chip id fails
    /// with [`StoreError::AlreadyExists`], including when two requests race.
    #[instrument(skip(self, new), fields(chip_id = new.chip_id))]
    pub async fn register_device(&self, new: NewDevice) -> Result<DeviceInfo, StoreError> {
        // ---
        match self.store.insert_device(new).await {
            Ok(device) => {
                info!("Registered sensor {}", device.chip_id);
                Ok(device)
            }
            Err(e @ StoreError::AlreadyExists(_)) => {
                warn!("{}", e);
                Err(e)
            }
            Err(e) => {
                error!("Error inserting sensor info: {}", e);
                Err(e)
            }
        }
    }

    /// Replace name and location of a registered device.
    #[instrument(skip(self, update), fields(chip_id = update.chip_id))]
    pub async fn update_device(
        &self,
        update: DeviceUpdate,
    ) -> Result<Lookup<DeviceInfo>, StoreError> {
        // ---
        let device = self
            .store
            .update_device(update)
            .await
            .inspect_err(|e| error!("Error updating sensor info: {}", e))?;

        if device.is_none() {
            debug!("No sensor to update");
        }
        Ok(device.into())
    }

    /// Unregister a device. Its readings stay in the store.
    #[instrument(skip(self))]
    pub async fn delete_device(&self, chip_id: i32) -> Result<Lookup<()>, StoreError> {
        // ---
        let deleted = self
            .store
            .delete_device(chip_id)
            .await
            .inspect_err(|e| error!("Error deleting sensor info: {}", e))?;

        if deleted {
            info!("Deleted sensor {}", chip_id);
            Ok(Lookup::Found(()))
        } else {
            debug!("No sensor to delete");
            Ok(Lookup::NotFound)
        }
    }

    /// All registered devices. An empty registry is reported as `NotFound`.
    #[instrument(skip(self))]
    pub async fn list_devices(&self) -> Result<Lookup<Vec<DeviceInfo>>, StoreError> {
        // ---
        let devices = self
            .store
            .list_devices()
            .await
            .inspect_err(|e| error!("Error getting sensors data: {}", e))?;

        Ok(Lookup::from_rows(devices))
    }

    /// Every registered device with up to [`READINGS_PER_DEVICE`] of its
    /// newest readings, optionally restricted to a date window.
    ///
    /// When only `from` is given the window ends now. An empty registry
    /// yields an empty list, not `NotFound`.
    #[instrument(skip(self))]
    pub async fn list_devices_with_readings(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<DeviceWithReadings>, StoreError> {
        // ---
        let range = DateRange {
            from,
            to: match (from, to) {
                (Some(_), None) => Some(Utc::now()),
                (_, to) => to,
            },
        };

        let devices = self
            .store
            .devices_with_readings(range, READINGS_PER_DEVICE)
            .await
            .inspect_err(|e| error!("Error getting sensor data: {}", e))?;

        debug!("Listing {} devices with readings", devices.len());
        Ok(devices)
    }
}

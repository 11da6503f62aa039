//! In-memory store for exercising the façade and router without a database.
//!
//! Mirrors the Postgres semantics: uniqueness on chip id, server-assigned
//! timestamps, newest-first ordering with the id as tie-break.

use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};

use super::{DeviceRegistry, ReadingStore};
use crate::error::StoreError;
use crate::models::{
    DateRange, DeviceInfo, DeviceUpdate, DeviceWithReadings, NewDevice, NewReading, Reading,
    ReadingWithDevice,
};

// ---

#[derive(Debug, Default)]
struct Tables {
    readings: Vec<Reading>,
    devices: BTreeMap<i32, DeviceInfo>,
    next_id: i64,
}

impl Tables {
    // ---
    fn hydrate(&self, reading: &Reading) -> ReadingWithDevice {
        // ---
        let device = self.devices.get(&reading.chip_id);
        ReadingWithDevice {
            reading: reading.clone(),
            name: device.and_then(|d| d.name.clone()),
            location: device.and_then(|d| d.location.clone()),
        }
    }

    /// Readings matching `keep`, newest first.
    fn newest_first(&self, keep: impl Fn(&Reading) -> bool) -> Vec<&Reading> {
        // ---
        let mut rows: Vec<&Reading> = self.readings.iter().filter(|&r| keep(r)).collect();
        rows.sort_by_key(|r| Reverse((r.created_at, r.id)));
        rows
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    // ---
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a reading stamped with `created_at` instead of the clock.
    pub fn insert_reading_at(&self, new: NewReading, created_at: DateTime<Utc>) -> Reading {
        // ---
        let mut tables = self.tables();
        tables.next_id += 1;
        let reading = Reading {
            id: tables.next_id,
            chip_id: new.chip_id,
            temperature: new.temperature,
            humidity: new.humidity,
            pressure: new.pressure,
            created_at,
            updated_at: created_at,
        };
        tables.readings.push(reading.clone());
        reading
    }
}

impl ReadingStore for MemoryStore {
    // ---
    async fn insert_reading(&self, new: NewReading) -> Result<Reading, StoreError> {
        Ok(self.insert_reading_at(new, Utc::now()))
    }

    async fn recent_readings(
        &self,
        chip_id: i32,
        limit: i64,
    ) -> Result<Vec<ReadingWithDevice>, StoreError> {
        // ---
        let tables = self.tables();
        let limit = usize::try_from(limit).unwrap_or(0);
        Ok(tables
            .newest_first(|r| r.chip_id == chip_id)
            .into_iter()
            .take(limit)
            .map(|r| tables.hydrate(r))
            .collect())
    }

    async fn readings_between(
        &self,
        chip_id: i32,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<ReadingWithDevice>, StoreError> {
        // ---
        let tables = self.tables();
        let range = DateRange {
            from: Some(from),
            to: Some(to),
        };
        Ok(tables
            .newest_first(|r| r.chip_id == chip_id && range.contains(r.created_at))
            .into_iter()
            .map(|r| tables.hydrate(r))
            .collect())
    }

    async fn latest_per_device(&self) -> Result<Vec<ReadingWithDevice>, StoreError> {
        // ---
        let tables = self.tables();
        let mut latest: BTreeMap<i32, &Reading> = BTreeMap::new();
        for reading in tables.newest_first(|r| tables.devices.contains_key(&r.chip_id)) {
            latest.entry(reading.chip_id).or_insert(reading);
        }
        Ok(latest.into_values().map(|r| tables.hydrate(r)).collect())
    }
}

impl DeviceRegistry for MemoryStore {
    // ---
    async fn insert_device(&self, new: NewDevice) -> Result<DeviceInfo, StoreError> {
        // ---
        let mut tables = self.tables();
        if tables.devices.contains_key(&new.chip_id) {
            return Err(StoreError::AlreadyExists(new.chip_id));
        }
        let device = DeviceInfo {
            chip_id: new.chip_id,
            name: Some(new.name),
            location: Some(new.location),
        };
        tables.devices.insert(device.chip_id, device.clone());
        Ok(device)
    }

    async fn update_device(&self, update: DeviceUpdate) -> Result<Option<DeviceInfo>, StoreError> {
        // ---
        let mut tables = self.tables();
        Ok(tables.devices.get_mut(&update.chip_id).map(|device| {
            device.name = Some(update.name);
            device.location = Some(update.location);
            device.clone()
        }))
    }

    async fn delete_device(&self, chip_id: i32) -> Result<bool, StoreError> {
        Ok(self.tables().devices.remove(&chip_id).is_some())
    }

    async fn list_devices(&self) -> Result<Vec<DeviceInfo>, StoreError> {
        Ok(self.tables().devices.values().cloned().collect())
    }

    async fn devices_with_readings(
        &self,
        range: DateRange,
        per_device: i64,
    ) -> Result<Vec<DeviceWithReadings>, StoreError> {
        // ---
        let tables = self.tables();
        let per_device = usize::try_from(per_device).unwrap_or(0);
        Ok(tables
            .devices
            .values()
            .map(|device| DeviceWithReadings {
                device: device.clone(),
                readings: tables
                    .newest_first(|r| r.chip_id == device.chip_id && range.contains(r.created_at))
                    .into_iter()
                    .take(per_device)
                    .cloned()
                    .collect(),
            })
            .collect())
    }
}

//! Data models for sensor readings and device metadata.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---

/// One immutable measurement row from the `reading` table.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    // ---
    pub id: i64,
    #[serde(rename = "chipid")]
    pub chip_id: i32,
    pub temperature: f64,
    pub humidity: f64,
    pub pressure: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Measurement as posted by a device, before the store assigns id and timestamps.
#[derive(Debug, Clone, Deserialize)]
pub struct NewReading {
    // ---
    #[serde(rename = "chipid")]
    pub chip_id: i32,
    pub temperature: f64,
    pub humidity: f64,
    pub pressure: f64,
}

/// A reading hydrated with the display fields of its device.
///
/// `name` and `location` are `None` when the chip has no `device_info` row.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct ReadingWithDevice {
    // ---
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub reading: Reading,
    pub name: Option<String>,
    pub location: Option<String>,
}

/// Metadata row for one physical sensor.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct DeviceInfo {
    // ---
    #[serde(rename = "chipid")]
    pub chip_id: i32,
    pub name: Option<String>,
    pub location: Option<String>,
}

/// Registration request. Both display fields are mandatory here.
#[derive(Debug, Clone, Deserialize)]
pub struct NewDevice {
    // ---
    #[serde(rename = "chipid")]
    pub chip_id: i32,
    pub name: String,
    pub location: String,
}

/// Replacement values for a registered device. Both fields are required and
/// always written together.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceUpdate {
    // ---
    #[serde(rename = "chipid")]
    pub chip_id: i32,
    pub name: String,
    pub location: String,
}

/// Registry-first view: a device with its most recent readings attached.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceWithReadings {
    // ---
    #[serde(flatten)]
    pub device: DeviceInfo,
    #[serde(rename = "sensorData")]
    pub readings: Vec<Reading>,
}

/// Inclusive `created_at` window. An open end is unbounded on that side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateRange {
    // ---
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

#[cfg(test)]
impl DateRange {
    // ---
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        // ---
        self.from.map_or(true, |from| at >= from) && self.to.map_or(true, |to| at <= to)
    }
}

/// Outcome of a lookup that may legitimately find nothing.
///
/// An empty result is reported here rather than through `Err`, so callers
/// can tell "no data" apart from a failed query.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    Found(T),
    NotFound,
}

impl<T> Lookup<Vec<T>> {
    /// Collapse an empty row set into `NotFound`.
    pub fn from_rows(rows: Vec<T>) -> Self {
        // ---
        if rows.is_empty() {
            Lookup::NotFound
        } else {
            Lookup::Found(rows)
        }
    }
}

impl<T> From<Option<T>> for Lookup<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Lookup::Found(v),
            None => Lookup::NotFound,
        }
    }
}

//! PostgreSQL implementation of the storage traits.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::{DeviceRegistry, ReadingStore};
use crate::error::StoreError;
use crate::models::{
    DateRange, DeviceInfo, DeviceUpdate, DeviceWithReadings, NewDevice, NewReading, Reading,
    ReadingWithDevice,
};

// ---

/// Storage handle backed by a shared connection pool.
///
/// The pool is created once at startup and handed in here; cloning is cheap.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    // ---
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const READING_COLUMNS: &str = "r.id, r.chip_id, r.temperature, r.humidity, r.pressure, \
                               r.created_at, r.updated_at";

impl ReadingStore for PgStore {
    // ---
    async fn insert_reading(&self, new: NewReading) -> Result<Reading, StoreError> {
        // ---
        let reading = sqlx::query_as::<_, Reading>(
            r#"
            INSERT INTO reading (chip_id, temperature, humidity, pressure)
            VALUES ($1, $2, $3, $4)
            RETURNING id, chip_id, temperature, humidity, pressure, created_at, updated_at
            "#,
        )
        .bind(new.chip_id)
        .bind(new.temperature)
        .bind(new.humidity)
        .bind(new.pressure)
        .fetch_one(&self.pool)
        .await?;

        Ok(reading)
    }

    async fn recent_readings(
        &self,
        chip_id: i32,
        limit: i64,
    ) -> Result<Vec<ReadingWithDevice>, StoreError> {
        // ---
        let sql = format!(
            r#"
            SELECT {READING_COLUMNS}, d.name, d.location
            FROM reading r
            LEFT JOIN device_info d ON d.chip_id = r.chip_id
            WHERE r.chip_id = $1
            ORDER BY r.created_at DESC, r.id DESC
            LIMIT $2
            "#
        );

        let rows = sqlx::query_as::<_, ReadingWithDevice>(&sql)
            .bind(chip_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    async fn readings_between(
        &self,
        chip_id: i32,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<ReadingWithDevice>, StoreError> {
        // ---
        let sql = format!(
            r#"
            SELECT {READING_COLUMNS}, d.name, d.location
            FROM reading r
            LEFT JOIN device_info d ON d.chip_id = r.chip_id
            WHERE r.chip_id = $1
              AND r.created_at BETWEEN $2 AND $3
            ORDER BY r.created_at DESC, r.id DESC
            "#
        );

        let rows = sqlx::query_as::<_, ReadingWithDevice>(&sql)
            .bind(chip_id)
            .bind(from)
            .bind(to)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    async fn latest_per_device(&self) -> Result<Vec<ReadingWithDevice>, StoreError> {
        // ---
        // Single statement, so it reads one snapshot taken when it starts.
        let sql = format!(
            r#"
            SELECT DISTINCT ON (r.chip_id) {READING_COLUMNS}, d.name, d.location
            FROM reading r
            INNER JOIN device_info d ON d.chip_id = r.chip_id
            ORDER BY r.chip_id, r.created_at DESC, r.id DESC
            "#
        );

        let rows = sqlx::query_as::<_, ReadingWithDevice>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }
}

impl DeviceRegistry for PgStore {
    // ---
    async fn insert_device(&self, new: NewDevice) -> Result<DeviceInfo, StoreError> {
        // ---
        let result = sqlx::query_as::<_, DeviceInfo>(
            r#"
            INSERT INTO device_info (chip_id, name, location)
            VALUES ($1, $2, $3)
            RETURNING chip_id, name, location
            "#,
        )
        .bind(new.chip_id)
        .bind(&new.name)
        .bind(&new.location)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(device) => Ok(device),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(StoreError::AlreadyExists(new.chip_id))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn update_device(&self, update: DeviceUpdate) -> Result<Option<DeviceInfo>, StoreError> {
        // ---
        let device = sqlx::query_as::<_, DeviceInfo>(
            r#"
            UPDATE device_info
            SET name = $2, location = $3
            WHERE chip_id = $1
            RETURNING chip_id, name, location
            "#,
        )
        .bind(update.chip_id)
        .bind(&update.name)
        .bind(&update.location)
        .fetch_optional(&self.pool)
        .await?;

        Ok(device)
    }

    async fn delete_device(&self, chip_id: i32) -> Result<bool, StoreError> {
        // ---
        let result = sqlx::query("DELETE FROM device_info WHERE chip_id = $1")
            .bind(chip_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_devices(&self) -> Result<Vec<DeviceInfo>, StoreError> {
        // ---
        let devices = sqlx::query_as::<_, DeviceInfo>(
            "SELECT chip_id, name, location FROM device_info ORDER BY chip_id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(devices)
    }

    async fn devices_with_readings(
        &self,
        range: DateRange,
        per_device: i64,
    ) -> Result<Vec<DeviceWithReadings>, StoreError> {
        // ---
        // Both reads share one snapshot so the device list and the attached
        // readings agree.
        let mut tx = self.pool.begin().await?;

        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ READ ONLY")
            .execute(&mut *tx)
            .await?;

        let devices = sqlx::query_as::<_, DeviceInfo>(
            "SELECT chip_id, name, location FROM device_info ORDER BY chip_id",
        )
        .fetch_all(&mut *tx)
        .await?;

        let readings = sqlx::query_as::<_, Reading>(
            r#"
            SELECT id, chip_id, temperature, humidity, pressure, created_at, updated_at
            FROM (
                SELECT r.*,
                       ROW_NUMBER() OVER (
                           PARTITION BY r.chip_id
                           ORDER BY r.created_at DESC, r.id DESC
                       ) AS rn
                FROM reading r
                INNER JOIN device_info d ON d.chip_id = r.chip_id
                WHERE ($1::timestamptz IS NULL OR r.created_at >= $1)
                  AND ($2::timestamptz IS NULL OR r.created_at <= $2)
            ) ranked
            WHERE rn <= $3
            ORDER BY chip_id, created_at DESC, id DESC
            "#,
        )
        .bind(range.from)
        .bind(range.to)
        .bind(per_device)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        let mut by_chip: BTreeMap<i32, Vec<Reading>> = BTreeMap::new();
        for reading in readings {
            by_chip.entry(reading.chip_id).or_default().push(reading);
        }

        Ok(devices
            .into_iter()
            .map(|device| DeviceWithReadings {
                readings: by_chip.remove(&device.chip_id).unwrap_or_default(),
                device,
            })
            .collect())
    }
}

//! Database schema management for `sensor-registry`.
//!
//! Ensures required tables and indexes exist before serving requests.
//! Applied once on startup from `main.rs` (EMBP: single gateway call).

use anyhow::Result;
use sqlx::PgPool;

// ---

/// Create the database schema (idempotent).
///
/// Creates the append-only `reading` table and the `device_info` registry it
/// joins against. `reading.chip_id` is deliberately not a foreign key:
/// devices may report before they are registered, and unregistering a device
/// leaves its history in place. Safe to call on every startup.
///
/// Errors are propagated if any SQL execution fails.
pub async fn create_schema(pool: &PgPool) -> Result<()> {
    // ---
    let mut tx = pool.begin().await?;

    // Time series of measurements, never updated in place
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS reading (
            id          BIGSERIAL        PRIMARY KEY,
            chip_id     INTEGER          NOT NULL,
            temperature DOUBLE PRECISION NOT NULL,
            humidity    DOUBLE PRECISION NOT NULL,
            pressure    DOUBLE PRECISION NOT NULL,
            created_at  TIMESTAMPTZ      NOT NULL DEFAULT now(),
            updated_at  TIMESTAMPTZ      NOT NULL DEFAULT now()
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    // The primary key is the uniqueness guarantee `register` relies on
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS device_info (
            chip_id  INTEGER PRIMARY KEY,
            name     TEXT,
            location TEXT
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    // Serves newest-first per chip, ranges, and latest-per-device
    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_reading_chip_created
            ON reading (chip_id, created_at DESC, id DESC);
        "#,
    )
    .execute(&mut *tx)
    .await?;

    // Range filters across all chips in the registry-first listing
    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_reading_created
            ON reading (created_at);
        "#,
    )
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}

//! Reading-first endpoints: ingest and per-chip queries.

use axum::{
    extract::{Path, State},
    response::Response,
    routing::{get, post},
    Json, Router,
};
use tracing::info;

use super::{lookup, parse_range, store_failure, success};
use crate::models::NewReading;
use crate::service::SensorService;
use crate::store::{DeviceRegistry, ReadingStore};

// ---

pub fn router<S>() -> Router<SensorService<S>>
where
    S: ReadingStore + DeviceRegistry,
{
    // ---
    // The two `/sensor` routes must share the name of their third segment,
    // the router refuses differently named parameters at one position.
    Router::new()
        .route("/postData", post(append::<S>))
        .route("/latest", get(latest::<S>))
        .route("/sensor/{chipid}/{arg}", get(recent::<S>))
        .route("/sensor/{chipid}/{arg}/{date_to}", get(range::<S>))
}

async fn append<S>(
    State(service): State<SensorService<S>>,
    Json(body): Json<NewReading>,
) -> Response
where
    S: ReadingStore + DeviceRegistry,
{
    // ---
    info!("POST /postData - chip {}", body.chip_id);

    match service.append_reading(body).await {
        Ok(reading) => success("sensor", reading),
        Err(e) => store_failure(e, "Error inserting data"),
    }
}

async fn recent<S>(
    State(service): State<SensorService<S>>,
    Path((chip_id, limit)): Path<(i32, String)>,
) -> Response
where
    S: ReadingStore + DeviceRegistry,
{
    // ---
    info!("GET /sensor/{}/{}", chip_id, limit);

    match service.recent_readings(chip_id, Some(&limit)).await {
        Ok(found) => lookup("sensor", found, "Sensor not found"),
        Err(e) => store_failure(e, "Error getting data"),
    }
}

async fn range<S>(
    State(service): State<SensorService<S>>,
    Path((chip_id, date_from, date_to)): Path<(i32, String, String)>,
) -> Response
where
    S: ReadingStore + DeviceRegistry,
{
    // ---
    info!("GET /sensor/{}/{}/{}", chip_id, date_from, date_to);

    let (from, to) = match parse_range(&date_from, &date_to) {
        Ok(range) => range,
        Err(response) => return response,
    };

    match service.range_readings(chip_id, from, Some(to)).await {
        Ok(found) => lookup("sensor", found, "Sensor not found"),
        Err(e) => store_failure(e, "Error getting data"),
    }
}

async fn latest<S>(State(service): State<SensorService<S>>) -> Response
where
    S: ReadingStore + DeviceRegistry,
{
    // ---
    info!("GET /latest");

    match service.latest_per_device().await {
        Ok(found) => lookup("sensor", found, "Sensor not found"),
        Err(e) => store_failure(e, "Error getting data"),
    }
}

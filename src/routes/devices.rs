//! Device registry endpoints, including the registry-first listing.

use axum::{
    extract::{Path, State},
    response::Response,
    routing::{delete, get, post},
    Json, Router,
};
use tracing::info;

use super::{lookup, parse_range, store_failure, success};
use crate::models::{DeviceUpdate, NewDevice};
use crate::service::SensorService;
use crate::store::{DeviceRegistry, ReadingStore};

// ---

pub fn router<S>() -> Router<SensorService<S>>
where
    S: ReadingStore + DeviceRegistry,
{
    // ---
    Router::new()
        .route("/create", post(register::<S>))
        .route("/update", post(update::<S>))
        .route("/delete/{chipid}", delete(remove::<S>))
        .route("/sensors", get(list::<S>))
        .route("/sensors/all", get(list_with_readings::<S>))
        .route(
            "/sensors/all/{date_from}/{date_to}",
            get(list_with_readings_between::<S>),
        )
}

async fn register<S>(
    State(service): State<SensorService<S>>,
    Json(body): Json<NewDevice>,
) -> Response
where
    S: ReadingStore + DeviceRegistry,
{
    // ---
    info!("POST /create - chip {}", body.chip_id);

    match service.register_device(body).await {
        Ok(device) => success("sensor", device),
        Err(e) => store_failure(e, "Error inserting data"),
    }
}

async fn update<S>(
    State(service): State<SensorService<S>>,
    Json(body): Json<DeviceUpdate>,
) -> Response
where
    S: ReadingStore + DeviceRegistry,
{
    // ---
    info!("POST /update - chip {}", body.chip_id);

    match service.update_device(body).await {
        Ok(found) => lookup("sensor", found, "Sensor not found"),
        Err(e) => store_failure(e, "Error updating data"),
    }
}

async fn remove<S>(State(service): State<SensorService<S>>, Path(chip_id): Path<i32>) -> Response
where
    S: ReadingStore + DeviceRegistry,
{
    // ---
    info!("DELETE /delete/{}", chip_id);

    match service.delete_device(chip_id).await {
        Ok(found) => lookup("sensor", found, "Sensor not found"),
        Err(e) => store_failure(e, "Error deleting data"),
    }
}

async fn list<S>(State(service): State<SensorService<S>>) -> Response
where
    S: ReadingStore + DeviceRegistry,
{
    // ---
    info!("GET /sensors");

    match service.list_devices().await {
        Ok(found) => lookup("sensor", found, "Sensors not found"),
        Err(e) => store_failure(e, "Error getting data"),
    }
}

async fn list_with_readings<S>(State(service): State<SensorService<S>>) -> Response
where
    S: ReadingStore + DeviceRegistry,
{
    // ---
    info!("GET /sensors/all");

    match service.list_devices_with_readings(None, None).await {
        Ok(devices) => success("sensorInfo", devices),
        Err(e) => store_failure(e, "Error getting data"),
    }
}

async fn list_with_readings_between<S>(
    State(service): State<SensorService<S>>,
    Path((date_from, date_to)): Path<(String, String)>,
) -> Response
where
    S: ReadingStore + DeviceRegistry,
{
    // ---
    info!("GET /sensors/all/{}/{}", date_from, date_to);

    let (from, to) = match parse_range(&date_from, &date_to) {
        Ok(range) => range,
        Err(response) => return response,
    };

    match service.list_devices_with_readings(Some(from), Some(to)).await {
        Ok(devices) => success("sensorInfo", devices),
        Err(e) => store_failure(e, "Error getting data"),
    }
}

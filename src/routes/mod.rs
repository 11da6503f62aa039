//! HTTP gateway. Sub-modules own their endpoints; this module owns the shared
//! response envelope and path-date parsing.
//!
//! Every body is `{"success": bool, ...}` so clients can branch on the flag.
//! Empty lookups are 404, duplicate registrations 409, storage failures 500
//! with a generic message (details go to the log, not the client).

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json, Router,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;
use serde_json::json;
use tower_http::cors::CorsLayer;

use crate::error::StoreError;
use crate::models::Lookup;
use crate::service::SensorService;
use crate::store::{DeviceRegistry, ReadingStore};

mod devices;
mod health;
mod readings;

// ---

pub fn router<S>(service: SensorService<S>) -> Router
where
    S: ReadingStore + DeviceRegistry,
{
    // ---
    Router::new()
        .merge(readings::router::<S>())
        .merge(devices::router::<S>())
        .merge(health::router())
        .layer(CorsLayer::permissive())
        .with_state(service)
}

/// `200 {"success": true, <key>: value}`.
fn success<T: Serialize>(key: &str, value: T) -> Response {
    // ---
    let mut body = serde_json::Map::new();
    body.insert("success".into(), json!(true));
    body.insert(key.into(), json!(value));
    (StatusCode::OK, Json(body)).into_response()
}

/// `<status> {"success": false, "error": message}`.
fn failure(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "success": false, "error": message }))).into_response()
}

/// Map a lookup onto 200 or 404.
fn lookup<T: Serialize>(key: &str, result: Lookup<T>, not_found: &str) -> Response {
    // ---
    match result {
        Lookup::Found(value) => success(key, value),
        Lookup::NotFound => failure(StatusCode::NOT_FOUND, not_found),
    }
}

/// Map a store error onto 409 or a generic 500.
fn store_failure(err: StoreError, generic: &str) -> Response {
    // ---
    match err {
        StoreError::AlreadyExists(_) => failure(StatusCode::CONFLICT, "Sensor already exists"),
        StoreError::Storage(_) => failure(StatusCode::INTERNAL_SERVER_ERROR, generic),
    }
}

/// Parse a timestamp from a path segment.
///
/// Accepts RFC 3339, a naive `YYYY-MM-DDTHH:MM:SS` (taken as UTC), or a bare
/// `YYYY-MM-DD` (midnight UTC).
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    // ---
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Some(at.with_timezone(&Utc));
    }
    if let Ok(at) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(at.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|at| at.and_utc())
}

/// Parse both ends of a path date range or produce the 400 response.
fn parse_range(from: &str, to: &str) -> Result<(DateTime<Utc>, DateTime<Utc>), Response> {
    // ---
    match (parse_timestamp(from), parse_timestamp(to)) {
        (Some(from), Some(to)) => Ok((from, to)),
        _ => {
            tracing::debug!("Rejecting date range {:?} .. {:?}", from, to);
            Err(failure(StatusCode::BAD_REQUEST, "Invalid date"))
        }
    }
}

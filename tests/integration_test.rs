//! End-to-end checks against a running service and database.
//!
//! Run with `BASE_URL` pointing at the service (default
//! `http://localhost:8080`) and `cargo test -- --ignored`.

use anyhow::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Reading {
    id: i64,
    #[serde(rename = "chipid")]
    chip_id: i32,
    temperature: f64,
    pressure: f64,
    created_at: DateTime<Utc>,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    success: bool,
    sensor: T,
}

#[derive(Debug, Deserialize)]
struct DeviceWithReadings {
    #[serde(rename = "chipid")]
    chip_id: i32,
    #[serde(rename = "sensorData")]
    readings: Vec<Reading>,
}

#[derive(Debug, Deserialize)]
struct Listing {
    success: bool,
    #[serde(rename = "sensorInfo")]
    sensor_info: Vec<DeviceWithReadings>,
}

fn base_url() -> String {
    std::env::var("BASE_URL").unwrap_or_else(|_| "http://localhost:8080".into())
}

/// Chip ids well away from real hardware, unique per run.
fn scratch_chip_id(offset: i32) -> i32 {
    1_000_000 + (Utc::now().timestamp_subsec_micros() % 100_000) as i32 * 10 + offset
}

async fn post_reading(client: &Client, chip_id: i32, temperature: f64) -> Result<Reading> {
    // ---
    let body = json!({
        "chipid": chip_id,
        "temperature": temperature,
        "humidity": 40.0,
        "pressure": 1001.0,
    });
    let response = client
        .post(format!("{}/postData", base_url()))
        .json(&body)
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    let envelope: Envelope<Reading> = response.json().await?;
    Ok(envelope.sensor)
}

async fn register(client: &Client, chip_id: i32, name: &str) -> Result<()> {
    // ---
    let body = json!({ "chipid": chip_id, "name": name, "location": "Test bench" });
    let response = client
        .post(format!("{}/create", base_url()))
        .json(&body)
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
#[ignore = "requires a running service and database"]
async fn appended_reading_is_newest() -> Result<()> {
    // ---
    let base = base_url();
    let client = Client::new();
    let chip_id = scratch_chip_id(0);

    post_reading(&client, chip_id, 18.0).await?;
    post_reading(&client, chip_id, 19.5).await?;

    let url = format!("{base}/sensor/{chip_id}/1");
    let envelope: Envelope<Vec<Reading>> = client.get(&url).send().await?.json().await?;

    assert!(envelope.success);
    assert_eq!(envelope.sensor.len(), 1);
    assert_eq!(envelope.sensor[0].chip_id, chip_id);
    assert_eq!(envelope.sensor[0].temperature, 19.5);
    assert!(envelope.sensor[0].name.is_none());
    assert!(envelope.sensor[0].created_at <= Utc::now());

    Ok(())
}

#[tokio::test]
#[ignore = "requires a running service and database"]
async fn registration_lifecycle() -> Result<()> {
    // ---
    let base = base_url();
    let client = Client::new();
    let chip_id = scratch_chip_id(1);

    register(&client, chip_id, "A").await?;

    let duplicate = json!({ "chipid": chip_id, "name": "B", "location": "Y" });
    let response = client.post(format!("{base}/create")).json(&duplicate).send().await?;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let partial = json!({ "chipid": chip_id, "name": "C" });
    let response = client.post(format!("{base}/update")).json(&partial).send().await?;
    assert!(response.status().is_client_error());

    let response = client.delete(format!("{base}/delete/{chip_id}")).send().await?;
    assert_eq!(response.status(), StatusCode::OK);

    let response = client.delete(format!("{base}/delete/{chip_id}")).send().await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
#[ignore = "requires a running service and database"]
async fn latest_and_listing_join_registered_devices_only() -> Result<()> {
    // ---
    let base = base_url();
    let client = Client::new();
    let busy = scratch_chip_id(2);
    let idle = scratch_chip_id(3);
    let stray = scratch_chip_id(4);

    register(&client, busy, "Busy").await?;
    register(&client, idle, "Idle").await?;
    post_reading(&client, busy, 20.0).await?;
    let newest = post_reading(&client, busy, 21.0).await?;
    post_reading(&client, stray, 99.0).await?;

    // One row per registered chip, full measurement set, stray chip left out
    let latest: Envelope<Vec<Reading>> =
        client.get(format!("{base}/latest")).send().await?.json().await?;
    assert!(latest.success);
    let ours: Vec<&Reading> = latest
        .sensor
        .iter()
        .filter(|r| [busy, idle, stray].contains(&r.chip_id))
        .collect();
    assert_eq!(ours.len(), 1);
    assert_eq!(ours[0].id, newest.id);
    assert_eq!(ours[0].pressure, 1001.0);
    assert_eq!(ours[0].name.as_deref(), Some("Busy"));

    // A window of exactly one instant still includes the reading on it
    let at = newest.created_at.to_rfc3339_opts(SecondsFormat::AutoSi, true);
    let url = format!("{base}/sensors/all/{at}/{at}");
    let listing: Listing = client.get(&url).send().await?.json().await?;
    assert!(listing.success);

    let busy_entry = listing.sensor_info.iter().find(|d| d.chip_id == busy);
    let busy_entry = busy_entry.expect("registered device missing from listing");
    assert!(busy_entry.readings.iter().any(|r| r.id == newest.id));
    assert!(busy_entry
        .readings
        .iter()
        .all(|r| r.created_at == newest.created_at));

    let idle_entry = listing.sensor_info.iter().find(|d| d.chip_id == idle);
    let idle_entry = idle_entry.expect("idle device missing from listing");
    assert!(idle_entry.readings.is_empty());

    assert!(listing.sensor_info.iter().all(|d| d.chip_id != stray));

    for chip_id in [busy, idle] {
        let response = client.delete(format!("{base}/delete/{chip_id}")).send().await?;
        assert_eq!(response.status(), StatusCode::OK);
    }

    Ok(())
}

#[tokio::test]
#[ignore = "requires a running service and database"]
async fn health_does_not_need_database() -> Result<()> {
    // ---
    let body: Value = Client::new()
        .get(format!("{}/health", base_url()))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(body["status"], "ok");
    Ok(())
}

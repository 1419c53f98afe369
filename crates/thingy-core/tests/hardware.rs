//! Hardware integration tests for thingy-core
//!
//! These tests require a powered-on sensor tag in range and should be run with:
//! ```
//! cargo test --package thingy-core --test hardware -- --ignored --nocapture
//! ```
//!
//! Set `THINGY_DEVICE` to pick a specific tag by name or address. Without it
//! the first tag advertising the sensor service is used.

use std::env;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use thingy_core::scan::scan_for_devices;
use thingy_core::{BleSession, BtleplugBackend, ScanOptions};
use thingy_types::SensorKind;
use thingy_types::uuids::SENSOR_SERVICE;
use tokio::time::timeout;

/// Default timeout for BLE operations
const BLE_TIMEOUT: Duration = Duration::from_secs(30);

fn scan_options() -> ScanOptions {
    let options = ScanOptions::new().duration_secs(10);
    match env::var("THINGY_DEVICE").ok().filter(|s| !s.is_empty()) {
        Some(identifier) => options.identifier(identifier),
        None => options,
    }
}

fn session_for(kind: SensorKind) -> BleSession {
    let session = BleSession::new(Arc::new(BtleplugBackend::new(scan_options())));
    session.configure(kind.descriptor());
    session
}

#[tokio::test]
#[ignore = "requires BLE hardware"]
async fn test_scan_finds_sensor_service() {
    let devices = timeout(BLE_TIMEOUT, scan_for_devices(SENSOR_SERVICE, &scan_options()))
        .await
        .expect("scan timed out")
        .expect("scan failed");

    for device in &devices {
        println!(
            "  {} ({}) rssi={:?} service={}",
            device.name.as_deref().unwrap_or("Unknown"),
            device.identifier,
            device.rssi,
            device.advertises_service
        );
    }
    assert!(devices.iter().any(|d| d.advertises_service));
}

#[tokio::test]
#[ignore = "requires BLE hardware"]
async fn test_read_temperature_once() {
    let session = session_for(SensorKind::Temperature);
    let reading = timeout(BLE_TIMEOUT, session.read_once())
        .await
        .expect("read timed out")
        .expect("read failed");
    println!("Temperature: {}", reading.value);

    session.disconnect().await.unwrap();
}

#[tokio::test]
#[ignore = "requires BLE hardware"]
async fn test_stream_rotary_readings() {
    let session = session_for(SensorKind::Rotary);
    session.connect().await.expect("connect failed");

    let mut stream = session.stream().take(5);
    while let Some(item) = timeout(BLE_TIMEOUT, stream.next())
        .await
        .expect("no notification within timeout")
    {
        let reading = item.expect("stream failed");
        println!("Degree: {} at {}", reading.value, reading.timestamp);
    }

    session.disconnect().await.unwrap();
    assert!(!session.is_connected().await);
}

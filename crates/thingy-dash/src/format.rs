//! Output formatting for headless commands.

use anyhow::{Context, Result};
use serde::Serialize;
use thingy_core::DiscoveredDevice;
use thingy_types::{Reading, SensorKind};
use time::format_description::well_known::Rfc3339;

/// A reading tagged with the sensor it came from, as emitted in JSON mode.
#[derive(Debug, Serialize)]
struct ReadingRecord<'a> {
    sensor: SensorKind,
    #[serde(flatten)]
    reading: &'a Reading,
}

/// Format one reading as a text line: timestamp, label, value.
#[must_use]
pub fn format_reading_text(kind: SensorKind, reading: &Reading) -> String {
    let ts = reading
        .timestamp
        .format(&Rfc3339)
        .unwrap_or_else(|_| "???".to_string());
    format!("{}  {}: {}\n", ts, kind.label(), reading.value)
}

/// Format one reading as a single line of JSON.
pub fn format_reading_json(kind: SensorKind, reading: &Reading) -> Result<String> {
    let record = ReadingRecord {
        sensor: kind,
        reading,
    };
    let line = serde_json::to_string(&record).context("Failed to serialize reading")?;
    Ok(line + "\n")
}

/// Format scan results as a table.
#[must_use]
pub fn format_scan_text(devices: &[DiscoveredDevice]) -> String {
    if devices.is_empty() {
        return "No devices found.\n".to_string();
    }

    let mut out = format!("{:<24} {:<40} {:>6}  {}\n", "NAME", "IDENTIFIER", "RSSI", "SENSORS");
    for device in devices {
        let rssi = device
            .rssi
            .map(|r| r.to_string())
            .unwrap_or_else(|| "-".to_string());
        out.push_str(&format!(
            "{:<24} {:<40} {:>6}  {}\n",
            device.name.as_deref().unwrap_or("Unknown"),
            device.identifier,
            rssi,
            if device.advertises_service { "yes" } else { "no" }
        ));
    }
    out
}

/// Format scan results as pretty JSON.
pub fn format_scan_json(devices: &[DiscoveredDevice]) -> Result<String> {
    #[derive(Serialize)]
    struct ScanResult<'a> {
        count: usize,
        devices: Vec<DeviceJson<'a>>,
    }

    #[derive(Serialize)]
    struct DeviceJson<'a> {
        name: Option<&'a str>,
        identifier: &'a str,
        rssi: Option<i16>,
        sensor_service: bool,
    }

    let result = ScanResult {
        count: devices.len(),
        devices: devices
            .iter()
            .map(|d| DeviceJson {
                name: d.name.as_deref(),
                identifier: &d.identifier,
                rssi: d.rssi,
                sensor_service: d.advertises_service,
            })
            .collect(),
    };

    let json = serde_json::to_string_pretty(&result).context("Failed to serialize scan results")?;
    Ok(json + "\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;

    fn reading(value: f64) -> Reading {
        Reading::new(OffsetDateTime::UNIX_EPOCH, value)
    }

    #[test]
    fn test_reading_text() {
        let line = format_reading_text(SensorKind::Temperature, &reading(100.0));
        assert_eq!(line, "1970-01-01T00:00:00Z  Temperature: 100\n");

        let line = format_reading_text(SensorKind::Rotary, &reading(90.0));
        assert!(line.contains("Degree: 90"));
    }

    #[test]
    fn test_reading_json() {
        let line = format_reading_json(SensorKind::Rotary, &reading(45.0)).unwrap();
        assert!(line.ends_with('\n'));

        let value: serde_json::Value = serde_json::from_str(line.trim()).unwrap();
        assert_eq!(value["sensor"], "rotary");
        assert_eq!(value["value"], 45.0);
        assert_eq!(value["timestamp"], "1970-01-01T00:00:00Z");
    }

    #[test]
    fn test_scan_text_empty() {
        assert_eq!(format_scan_text(&[]), "No devices found.\n");
    }

    #[test]
    fn test_scan_text_and_json() {
        let devices = vec![
            DiscoveredDevice {
                name: Some("Thingy".to_string()),
                identifier: "AA:BB:CC:DD:EE:FF".to_string(),
                rssi: Some(-60),
                advertises_service: true,
            },
            DiscoveredDevice {
                name: None,
                identifier: "11:22:33:44:55:66".to_string(),
                rssi: None,
                advertises_service: false,
            },
        ];

        let text = format_scan_text(&devices);
        assert_eq!(text.lines().count(), 3);
        assert!(text.contains("Thingy"));
        assert!(text.contains("Unknown"));
        assert!(text.contains("-60"));

        let json: serde_json::Value =
            serde_json::from_str(&format_scan_json(&devices).unwrap()).unwrap();
        assert_eq!(json["count"], 2);
        assert_eq!(json["devices"][0]["sensor_service"], true);
        assert!(json["devices"][1]["name"].is_null());
    }
}

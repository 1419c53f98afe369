//! Device discovery.
//!
//! Scanning stands in for the platform's device chooser: the first
//! peripheral that advertises the sensor service (or matches a configured
//! identifier) is selected.

use std::time::Duration;

use btleplug::api::{Central, Manager as _, Peripheral as _, PeripheralProperties, ScanFilter};
use btleplug::platform::{Adapter, Manager, Peripheral};
use tokio::time::sleep;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{Error, Result, UnavailableReason};
use crate::util::{create_identifier, format_peripheral_id, identifier_matches};

/// Information about a discovered peripheral.
#[derive(Debug, Clone)]
pub struct DiscoveredDevice {
    /// Advertised local name.
    pub name: Option<String>,
    /// Connection identifier (peripheral ID on macOS, address elsewhere).
    pub identifier: String,
    /// RSSI signal strength.
    pub rssi: Option<i16>,
    /// Whether the advertisement lists the requested service.
    pub advertises_service: bool,
}

/// Options for scanning.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// How long to listen for advertisements.
    pub duration: Duration,
    /// Select a specific device by name, address or peripheral ID.
    pub identifier: Option<String>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            duration: Duration::from_secs(10),
            identifier: None,
        }
    }
}

impl ScanOptions {
    /// Create new scan options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the scan duration.
    pub fn duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Set scan duration in seconds.
    pub fn duration_secs(mut self, secs: u64) -> Self {
        self.duration = Duration::from_secs(secs);
        self
    }

    /// Only accept the device matching this identifier.
    pub fn identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }
}

/// Get the first available Bluetooth adapter.
pub async fn get_adapter() -> Result<Adapter> {
    let manager = Manager::new().await?;
    let adapters = manager.adapters().await?;

    adapters
        .into_iter()
        .next()
        .ok_or(Error::DeviceUnavailable(UnavailableReason::NoAdapter))
}

/// Scan and list every peripheral seen, marking those advertising `service`.
pub async fn scan_for_devices(service: Uuid, options: &ScanOptions) -> Result<Vec<DiscoveredDevice>> {
    let adapter = get_adapter().await?;
    info!("Starting BLE scan for {} seconds...", options.duration.as_secs());

    adapter.start_scan(ScanFilter::default()).await?;
    sleep(options.duration).await;
    adapter.stop_scan().await?;

    let mut discovered = Vec::new();
    for peripheral in adapter.peripherals().await? {
        let Ok(Some(props)) = peripheral.properties().await else {
            continue;
        };
        discovered.push(DiscoveredDevice {
            name: props.local_name.clone(),
            identifier: create_identifier(&props.address.to_string(), &peripheral.id()),
            rssi: props.rssi,
            advertises_service: advertises(&props, service),
        });
    }

    // Sensor tags first, then strongest signal.
    discovered.sort_by_key(|d| (!d.advertises_service, std::cmp::Reverse(d.rssi)));
    info!("Scan complete. Found {} device(s)", discovered.len());
    Ok(discovered)
}

/// Find a peripheral exposing `service`, or the one matching `options.identifier`.
///
/// Peripherals the adapter already knows are checked before scanning. There
/// is a single scan window; an empty result is reported as
/// [`Error::DeviceUnavailable`].
#[tracing::instrument(level = "info", skip(options), fields(identifier = ?options.identifier))]
pub async fn find_device(service: Uuid, options: &ScanOptions) -> Result<(Adapter, Peripheral)> {
    let adapter = get_adapter().await?;

    if let Some(peripheral) = select_peripheral(&adapter, service, options).await? {
        info!("Found device in cache (no scan needed)");
        return Ok((adapter, peripheral));
    }

    info!("Scanning for {:?}...", options.duration);
    adapter
        .start_scan(ScanFilter {
            services: vec![service],
        })
        .await?;
    sleep(options.duration).await;
    adapter.stop_scan().await?;

    if let Some(peripheral) = select_peripheral(&adapter, service, options).await? {
        return Ok((adapter, peripheral));
    }

    match &options.identifier {
        Some(identifier) => {
            warn!("Device not found: {}", identifier);
            Err(Error::device_not_found(identifier.clone()))
        }
        None => {
            warn!("No device advertising {} in range", service);
            Err(Error::DeviceUnavailable(UnavailableReason::NoDevicesInRange {
                scan_duration: options.duration,
            }))
        }
    }
}

/// Pick the first known peripheral that satisfies the options.
async fn select_peripheral(
    adapter: &Adapter,
    service: Uuid,
    options: &ScanOptions,
) -> Result<Option<Peripheral>> {
    for peripheral in adapter.peripherals().await? {
        let Ok(Some(props)) = peripheral.properties().await else {
            continue;
        };

        let selected = match &options.identifier {
            Some(identifier) => identifier_matches(
                identifier,
                &format_peripheral_id(&peripheral.id()),
                &props.address.to_string(),
                props.local_name.as_deref(),
            ),
            None => advertises(&props, service),
        };

        if selected {
            debug!(name = ?props.local_name, "Selected peripheral");
            return Ok(Some(peripheral));
        }
    }
    Ok(None)
}

fn advertises(props: &PeripheralProperties, service: Uuid) -> bool {
    props.services.contains(&service) || props.service_data.contains_key(&service)
}

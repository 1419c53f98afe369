//! The btleplug [`BleBackend`].

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::device::Device;
use crate::error::{Error, Result};
use crate::scan::{ScanOptions, find_device};
use crate::traits::{BleBackend, GattLink};

/// Connects to real peripherals through the host's Bluetooth adapter.
#[derive(Debug, Clone, Default)]
pub struct BtleplugBackend {
    options: ScanOptions,
}

impl BtleplugBackend {
    /// Create a backend that selects peripherals with the given scan options.
    pub fn new(options: ScanOptions) -> Self {
        Self { options }
    }

    /// The scan options used for every connect.
    pub fn options(&self) -> &ScanOptions {
        &self.options
    }
}

#[async_trait]
impl BleBackend for BtleplugBackend {
    async fn connect(&self, service: Uuid) -> Result<Arc<dyn GattLink>> {
        let (adapter, peripheral) = find_device(service, &self.options).await?;
        let device = Device::from_peripheral(adapter, peripheral).await?;

        if !device.exposes_service(service) {
            warn!(name = ?device.name(), "Selected device does not expose {}", service);
            if let Err(e) = device.disconnect().await {
                debug!("Disconnect failed: {}", e);
            }
            let identifier = match &self.options.identifier {
                Some(identifier) => identifier.clone(),
                None => device.address().to_string(),
            };
            return Err(Error::device_not_found(identifier));
        }

        let characteristics = device.cached_characteristic_count().await;
        info!(
            name = ?device.name(),
            address = device.address(),
            characteristics = characteristics,
            "Device ready"
        );
        Ok(Arc::new(device))
    }
}

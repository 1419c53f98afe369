//! btleplug-backed connection to a sensor tag.
//!
//! [`Device`] implements [`GattLink`] on top of a connected btleplug
//! peripheral.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use btleplug::api::{Central, CentralEvent, Characteristic, Peripheral as _};
use btleplug::platform::{Adapter, Peripheral};
use futures::{StreamExt, future, stream};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::traits::{GattLink, NotificationStream};
use crate::util::{create_identifier, exposes_service, format_peripheral_id};

/// A connected sensor tag.
///
/// Call [`GattLink::disconnect`] before dropping; a dropped device that is
/// still connected logs a warning and disconnects in the background.
pub struct Device {
    /// Kept alive for the lifetime of the connection and used for
    /// disconnect events.
    adapter: Adapter,
    peripheral: Peripheral,
    name: Option<String>,
    /// MAC address on Linux/Windows, peripheral UUID on macOS.
    address: String,
    /// Characteristics by UUID, built once after service discovery.
    characteristics_cache: RwLock<HashMap<Uuid, Characteristic>>,
    /// Live notification listeners per characteristic.
    listeners: Mutex<HashMap<Uuid, usize>>,
    disconnected: AtomicBool,
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("name", &self.name)
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

impl Device {
    /// Connect to an already-discovered peripheral and discover its services.
    ///
    /// No timeout is applied: an unresponsive peripheral keeps this pending.
    #[tracing::instrument(level = "info", skip_all)]
    pub async fn from_peripheral(adapter: Adapter, peripheral: Peripheral) -> Result<Self> {
        info!("Connecting to device...");
        peripheral.connect().await?;
        info!("Connected!");

        info!("Discovering services...");
        peripheral.discover_services().await?;

        let services = peripheral.services();
        debug!("Found {} services", services.len());

        let mut characteristics_cache = HashMap::new();
        for service in &services {
            debug!("  Service: {}", service.uuid);
            for char in &service.characteristics {
                debug!("    Characteristic: {} {:?}", char.uuid, char.properties);
                characteristics_cache.insert(char.uuid, char.clone());
            }
        }

        let properties = peripheral.properties().await?;
        let name = properties.as_ref().and_then(|p| p.local_name.clone());
        let address = properties
            .as_ref()
            .map(|p| create_identifier(&p.address.to_string(), &peripheral.id()))
            .unwrap_or_else(|| format_peripheral_id(&peripheral.id()));

        Ok(Self {
            adapter,
            peripheral,
            name,
            address,
            characteristics_cache: RwLock::new(characteristics_cache),
            listeners: Mutex::new(HashMap::new()),
            disconnected: AtomicBool::new(false),
        })
    }

    /// Find a characteristic by UUID in the discovery cache.
    async fn find_characteristic(&self, uuid: Uuid) -> Result<Characteristic> {
        let cache = self.characteristics_cache.read().await;
        cache.get(&uuid).cloned().ok_or_else(|| {
            Error::characteristic_not_found(uuid.to_string(), self.peripheral.services().len())
        })
    }

    /// Whether service discovery found `service` on this peripheral.
    pub fn exposes_service(&self, service: Uuid) -> bool {
        exposes_service(self.peripheral.services().iter().map(|s| s.uuid), service)
    }

    /// Number of discovered characteristics.
    pub async fn cached_characteristic_count(&self) -> usize {
        self.characteristics_cache.read().await.len()
    }
}

#[async_trait]
impl GattLink for Device {
    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn address(&self) -> &str {
        &self.address
    }

    async fn is_connected(&self) -> bool {
        !self.disconnected.load(Ordering::SeqCst)
            && self.peripheral.is_connected().await.unwrap_or(false)
    }

    async fn read(&self, characteristic: Uuid) -> Result<Vec<u8>> {
        let characteristic = self.find_characteristic(characteristic).await?;
        Ok(self.peripheral.read(&characteristic).await?)
    }

    async fn notifications(&self, characteristic: Uuid) -> Result<NotificationStream> {
        let char = self.find_characteristic(characteristic).await?;

        // Open both event sources before touching the listener count so a
        // failure here leaves nothing registered.
        let values = self
            .peripheral
            .notifications()
            .await?
            .filter(move |n| future::ready(n.uuid == characteristic))
            .map(|n| Ok(n.value));

        let peripheral_id = self.peripheral.id();
        let disconnects = self.adapter.events().await?.filter_map(move |event| {
            let lost = matches!(event, CentralEvent::DeviceDisconnected(ref id) if *id == peripheral_id);
            future::ready(lost.then(|| Err(Error::gatt_disconnected())))
        });

        {
            let mut listeners = self.listeners.lock().await;
            if !listeners.contains_key(&characteristic) {
                debug!("Enabling notifications on {}", characteristic);
                self.peripheral.subscribe(&char).await?;
            }
            *listeners.entry(characteristic).or_insert(0) += 1;
        }

        Ok(Box::pin(stream::select(values, disconnects)))
    }

    async fn unsubscribe(&self, characteristic: Uuid) -> Result<()> {
        let mut listeners = self.listeners.lock().await;
        match listeners.get_mut(&characteristic) {
            Some(count) if *count > 1 => {
                *count -= 1;
                Ok(())
            }
            Some(_) => {
                listeners.remove(&characteristic);
                if self.disconnected.load(Ordering::SeqCst) {
                    return Ok(());
                }
                debug!("Disabling notifications on {}", characteristic);
                let char = self.find_characteristic(characteristic).await?;
                self.peripheral.unsubscribe(&char).await?;
                Ok(())
            }
            None => Ok(()),
        }
    }

    #[tracing::instrument(level = "info", skip(self), fields(device_name = ?self.name))]
    async fn disconnect(&self) -> Result<()> {
        info!("Disconnecting from device...");
        self.disconnected.store(true, Ordering::SeqCst);
        self.listeners.lock().await.clear();
        self.peripheral.disconnect().await?;
        Ok(())
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        if self.disconnected.swap(true, Ordering::SeqCst) {
            return;
        }

        warn!(
            device_name = ?self.name,
            device_address = %self.address,
            "Device dropped without calling disconnect() - performing best-effort cleanup"
        );

        let peripheral = self.peripheral.clone();
        let address = self.address.clone();
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                if let Err(e) = peripheral.disconnect().await {
                    debug!(device_address = %address, error = %e, "Best-effort disconnect failed");
                }
            });
        }
    }
}

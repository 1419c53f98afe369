//! Mock backend for testing and demo mode.
//!
//! [`MockBackend`] hands out a single shared [`MockLink`] that behaves like a
//! connected tag without any Bluetooth hardware. Test code drives it
//! directly: push notifications, change the readable value, drop the
//! connection, or make connects fail.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use thingy_core::{BleSession, MockBackend};
//! use thingy_types::SensorKind;
//!
//! #[tokio::main]
//! async fn main() {
//!     let backend = Arc::new(MockBackend::new("Thingy"));
//!     backend.link().set_value(SensorKind::Rotary.characteristic(), vec![0x5A, 0x00]);
//!
//!     let session = BleSession::new(backend.clone());
//!     session.configure(SensorKind::Rotary.descriptor());
//!     let reading = session.read_once().await.unwrap();
//!     assert_eq!(reading.value, 90.0);
//! }
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::{debug, warn};
use uuid::Uuid;

use thingy_types::uuids::SENSOR_SERVICE;

use crate::error::{Error, Result, UnavailableReason};
use crate::traits::{BleBackend, GattLink, NotificationStream};

/// Capacity of the notification fan-out channel.
const EVENT_CAPACITY: usize = 256;

/// Failure a [`MockBackend`] reports on connect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    /// Report that no device was found.
    Unavailable,
    /// Report that Bluetooth access was refused.
    PermissionDenied,
}

impl MockFailure {
    fn into_error(self, name: &str) -> Error {
        match self {
            MockFailure::Unavailable => Error::device_not_found(name),
            MockFailure::PermissionDenied => Error::PermissionDenied,
        }
    }
}

#[derive(Debug, Clone)]
enum LinkEvent {
    Notify(Uuid, Vec<u8>),
    Dropped(String),
}

/// A simulated connection to a sensor tag.
pub struct MockLink {
    name: String,
    address: String,
    service: Uuid,
    connected: AtomicBool,
    values: Mutex<HashMap<Uuid, Vec<u8>>>,
    listeners: Mutex<HashMap<Uuid, usize>>,
    events: broadcast::Sender<LinkEvent>,
    read_count: AtomicU32,
    /// Simulated read latency in milliseconds (0 = no delay).
    read_latency_ms: AtomicU64,
    /// Delay between registering a listener and enabling notifications.
    subscribe_latency_ms: AtomicU64,
    fail_subscribe: AtomicBool,
}

impl std::fmt::Debug for MockLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockLink")
            .field("name", &self.name)
            .field("address", &self.address)
            .field("connected", &self.connected.load(Ordering::Relaxed))
            .finish()
    }
}

impl MockLink {
    fn new(name: &str, service: Uuid) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            name: name.to_string(),
            address: format!("MOCK-{:06X}", rand::random::<u32>() % 0xFFFFFF),
            service,
            connected: AtomicBool::new(false),
            values: Mutex::new(HashMap::new()),
            listeners: Mutex::new(HashMap::new()),
            events,
            read_count: AtomicU32::new(0),
            read_latency_ms: AtomicU64::new(0),
            subscribe_latency_ms: AtomicU64::new(0),
            fail_subscribe: AtomicBool::new(false),
        }
    }

    /// Push a notification to every listener on `characteristic`.
    ///
    /// Also becomes the value returned by reads.
    pub fn notify(&self, characteristic: Uuid, payload: Vec<u8>) {
        self.set_value(characteristic, payload.clone());
        if self.events.send(LinkEvent::Notify(characteristic, payload)).is_err() {
            debug!("Mock notification with no listeners");
        }
    }

    /// Set the value returned by reads without notifying.
    pub fn set_value(&self, characteristic: Uuid, payload: Vec<u8>) {
        lock(&self.values).insert(characteristic, payload);
    }

    /// Simulate the peripheral dropping the link.
    ///
    /// Every live listener receives `ConnectionLost(reason)`.
    pub fn drop_connection(&self, reason: &str) {
        self.connected.store(false, Ordering::SeqCst);
        let _ = self.events.send(LinkEvent::Dropped(reason.to_string()));
    }

    /// Number of registered listeners on a characteristic.
    pub fn listener_count(&self, characteristic: Uuid) -> usize {
        lock(&self.listeners).get(&characteristic).copied().unwrap_or(0)
    }

    /// Wait until at least `count` listeners are registered on a characteristic.
    pub async fn wait_for_listeners(&self, characteristic: Uuid, count: usize) {
        while self.listener_count(characteristic) < count {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    }

    /// Number of reads served.
    pub fn read_count(&self) -> u32 {
        self.read_count.load(Ordering::Relaxed)
    }

    /// Set simulated read latency.
    pub fn set_read_latency(&self, latency: Duration) {
        self.read_latency_ms
            .store(latency.as_millis() as u64, Ordering::Relaxed);
    }

    /// Set simulated latency for enabling notifications.
    ///
    /// The listener is registered before the delay, like a real CCCD write.
    pub fn set_subscribe_latency(&self, latency: Duration) {
        self.subscribe_latency_ms
            .store(latency.as_millis() as u64, Ordering::Relaxed);
    }

    /// Make enabling notifications fail after the listener was registered.
    pub fn set_subscribe_failure(&self, fail: bool) {
        self.fail_subscribe.store(fail, Ordering::Relaxed);
    }

    /// Check if connected.
    pub fn is_connected_sync(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn release_listener(&self, characteristic: Uuid) {
        let mut listeners = lock(&self.listeners);
        if let Some(count) = listeners.get_mut(&characteristic) {
            *count -= 1;
            if *count == 0 {
                listeners.remove(&characteristic);
            }
        }
    }

    fn check_connected(&self) -> Result<()> {
        if self.is_connected_sync() {
            Ok(())
        } else {
            Err(Error::NotConnected)
        }
    }
}

#[async_trait]
impl GattLink for MockLink {
    fn name(&self) -> Option<&str> {
        Some(&self.name)
    }

    fn address(&self) -> &str {
        &self.address
    }

    async fn is_connected(&self) -> bool {
        self.is_connected_sync()
    }

    async fn read(&self, characteristic: Uuid) -> Result<Vec<u8>> {
        self.check_connected()?;

        let latency = self.read_latency_ms.load(Ordering::Relaxed);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }

        self.read_count.fetch_add(1, Ordering::Relaxed);
        lock(&self.values)
            .get(&characteristic)
            .cloned()
            .ok_or_else(|| Error::characteristic_not_found(characteristic.to_string(), 1))
    }

    async fn notifications(&self, characteristic: Uuid) -> Result<NotificationStream> {
        self.check_connected()?;

        let receiver = self.events.subscribe();
        *lock(&self.listeners).entry(characteristic).or_insert(0) += 1;

        let latency = self.subscribe_latency_ms.load(Ordering::Relaxed);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }

        if self.fail_subscribe.load(Ordering::Relaxed) {
            self.release_listener(characteristic);
            return Err(Error::ConnectionLost(
                "Failed to enable notifications".to_string(),
            ));
        }

        let stream = futures::stream::unfold(Some(receiver), move |state| async move {
            let mut receiver = state?;
            loop {
                match receiver.recv().await {
                    Ok(LinkEvent::Notify(uuid, payload)) if uuid == characteristic => {
                        return Some((Ok(payload), Some(receiver)));
                    }
                    Ok(LinkEvent::Notify(..)) => continue,
                    Ok(LinkEvent::Dropped(reason)) => {
                        return Some((Err(Error::ConnectionLost(reason)), None));
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Mock listener lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        });

        Ok(Box::pin(stream))
    }

    async fn unsubscribe(&self, characteristic: Uuid) -> Result<()> {
        self.release_listener(characteristic);
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }
}

/// A [`BleBackend`] that always connects to the same [`MockLink`].
pub struct MockBackend {
    link: Arc<MockLink>,
    connect_count: AtomicU32,
    /// Number of connects to fail before succeeding.
    remaining_failures: AtomicU32,
    failure: Mutex<Option<MockFailure>>,
}

impl std::fmt::Debug for MockBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockBackend")
            .field("link", &self.link)
            .field("connect_count", &self.connect_count.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl MockBackend {
    /// Create a backend whose device exposes the sensor service.
    pub fn new(name: &str) -> Self {
        Self::with_service(name, SENSOR_SERVICE)
    }

    /// Create a backend whose device exposes a different service.
    pub fn with_service(name: &str, service: Uuid) -> Self {
        Self {
            link: Arc::new(MockLink::new(name, service)),
            connect_count: AtomicU32::new(0),
            remaining_failures: AtomicU32::new(0),
            failure: Mutex::new(None),
        }
    }

    /// The simulated device.
    pub fn link(&self) -> Arc<MockLink> {
        self.link.clone()
    }

    /// Number of successful connects.
    pub fn connect_count(&self) -> u32 {
        self.connect_count.load(Ordering::Relaxed)
    }

    /// Fail every connect with `failure` until cleared with `None`.
    pub fn set_failure(&self, failure: Option<MockFailure>) {
        *lock(&self.failure) = failure;
    }

    /// Fail the next `count` connects with [`MockFailure::Unavailable`].
    pub fn set_transient_failures(&self, count: u32) {
        self.remaining_failures.store(count, Ordering::Relaxed);
    }
}

#[async_trait]
impl BleBackend for MockBackend {
    async fn connect(&self, service: Uuid) -> Result<Arc<dyn GattLink>> {
        if self.remaining_failures.load(Ordering::Relaxed) > 0 {
            self.remaining_failures.fetch_sub(1, Ordering::Relaxed);
            return Err(MockFailure::Unavailable.into_error(&self.link.name));
        }

        if let Some(failure) = *lock(&self.failure) {
            return Err(failure.into_error(&self.link.name));
        }

        if service != self.link.service {
            return Err(Error::DeviceUnavailable(UnavailableReason::NoDevicesInRange {
                scan_duration: Duration::ZERO,
            }));
        }

        self.link.connected.store(true, Ordering::SeqCst);
        self.connect_count.fetch_add(1, Ordering::Relaxed);
        Ok(self.link.clone())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use thingy_types::uuids::{ROTARY_CHARACTERISTIC, TEMPERATURE_CHARACTERISTIC};

    #[tokio::test]
    async fn test_mock_backend_connect() {
        let backend = MockBackend::new("Thingy");
        assert!(!backend.link().is_connected_sync());

        let link = backend.connect(SENSOR_SERVICE).await.unwrap();
        assert!(link.is_connected().await);
        assert_eq!(link.name(), Some("Thingy"));
        assert!(link.address().starts_with("MOCK-"));
        assert_eq!(backend.connect_count(), 1);

        link.disconnect().await.unwrap();
        assert!(!backend.link().is_connected_sync());
    }

    #[tokio::test]
    async fn test_mock_backend_wrong_service() {
        let backend = MockBackend::new("Thingy");
        let err = backend.connect(Uuid::nil()).await.err().expect("expected connect to fail");
        assert!(matches!(err, Error::DeviceUnavailable(_)));
    }

    #[tokio::test]
    async fn test_mock_backend_failures() {
        let backend = MockBackend::new("Thingy");
        backend.set_transient_failures(2);
        assert!(backend.connect(SENSOR_SERVICE).await.is_err());
        assert!(backend.connect(SENSOR_SERVICE).await.is_err());
        assert!(backend.connect(SENSOR_SERVICE).await.is_ok());

        backend.set_failure(Some(MockFailure::PermissionDenied));
        assert!(matches!(
            backend.connect(SENSOR_SERVICE).await,
            Err(Error::PermissionDenied)
        ));
        backend.set_failure(None);
        assert!(backend.connect(SENSOR_SERVICE).await.is_ok());
    }

    #[tokio::test]
    async fn test_mock_link_read() {
        let backend = MockBackend::new("Thingy");
        let link = backend.connect(SENSOR_SERVICE).await.unwrap();

        assert!(matches!(
            link.read(TEMPERATURE_CHARACTERISTIC).await,
            Err(Error::CharacteristicNotFound { .. })
        ));

        backend.link().set_value(TEMPERATURE_CHARACTERISTIC, vec![1, 2]);
        assert_eq!(link.read(TEMPERATURE_CHARACTERISTIC).await.unwrap(), vec![1, 2]);
        assert_eq!(backend.link().read_count(), 2);
    }

    #[tokio::test]
    async fn test_mock_link_read_requires_connection() {
        let backend = MockBackend::new("Thingy");
        let err = backend.link().read(TEMPERATURE_CHARACTERISTIC).await.unwrap_err();
        assert!(matches!(err, Error::NotConnected));
    }

    #[tokio::test]
    async fn test_mock_link_notifications_filter_by_characteristic() {
        let backend = MockBackend::new("Thingy");
        let link = backend.connect(SENSOR_SERVICE).await.unwrap();
        let mut stream = link.notifications(ROTARY_CHARACTERISTIC).await.unwrap();
        assert_eq!(backend.link().listener_count(ROTARY_CHARACTERISTIC), 1);

        backend.link().notify(TEMPERATURE_CHARACTERISTIC, vec![9, 9]);
        backend.link().notify(ROTARY_CHARACTERISTIC, vec![1, 0]);
        assert_eq!(stream.next().await.unwrap().unwrap(), vec![1, 0]);

        backend.link().drop_connection("GATT Server disconnected");
        let err = stream.next().await.unwrap().unwrap_err();
        assert_eq!(err.to_string(), "GATT Server disconnected");
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_mock_link_unsubscribe_is_idempotent() {
        let backend = MockBackend::new("Thingy");
        let link = backend.connect(SENSOR_SERVICE).await.unwrap();
        let _a = link.notifications(ROTARY_CHARACTERISTIC).await.unwrap();
        let _b = link.notifications(ROTARY_CHARACTERISTIC).await.unwrap();
        assert_eq!(backend.link().listener_count(ROTARY_CHARACTERISTIC), 2);

        link.unsubscribe(ROTARY_CHARACTERISTIC).await.unwrap();
        link.unsubscribe(ROTARY_CHARACTERISTIC).await.unwrap();
        link.unsubscribe(ROTARY_CHARACTERISTIC).await.unwrap();
        assert_eq!(backend.link().listener_count(ROTARY_CHARACTERISTIC), 0);
    }

    #[tokio::test]
    async fn test_mock_link_failed_subscribe_leaves_no_listener() {
        let backend = MockBackend::new("Thingy");
        let link = backend.connect(SENSOR_SERVICE).await.unwrap();
        backend.link().set_subscribe_failure(true);

        assert!(link.notifications(ROTARY_CHARACTERISTIC).await.is_err());
        assert_eq!(backend.link().listener_count(ROTARY_CHARACTERISTIC), 0);
    }
}

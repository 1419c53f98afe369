//! Trait seams between the session layer and a Bluetooth stack.
//!
//! [`BleBackend`] finds and connects a peripheral; [`GattLink`] is the
//! resulting connection. The btleplug implementation lives in
//! [`crate::device`] and [`crate::backend`], the test double in [`crate::mock`].

use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures::Stream;
use uuid::Uuid;

use crate::error::Result;

/// Raw characteristic payloads as they arrive.
///
/// An `Err` item is terminal: the link is gone and nothing else will arrive.
pub type NotificationStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>>> + Send>>;

/// A connection to one peripheral.
///
/// Notification listeners are reference counted per characteristic: the
/// first [`notifications`](Self::notifications) call enables GATT
/// notifications and the matching last [`unsubscribe`](Self::unsubscribe)
/// disables them. Extra `unsubscribe` calls are ignored.
#[async_trait]
pub trait GattLink: Send + Sync {
    /// Advertised local name, if any.
    fn name(&self) -> Option<&str>;

    /// Platform identifier (MAC address, or a UUID on macOS).
    fn address(&self) -> &str;

    /// Whether the platform still reports the link as connected.
    async fn is_connected(&self) -> bool;

    /// Read the current value of a characteristic.
    async fn read(&self, characteristic: Uuid) -> Result<Vec<u8>>;

    /// Register a listener for notifications on a characteristic.
    async fn notifications(&self, characteristic: Uuid) -> Result<NotificationStream>;

    /// Release one listener registered with [`notifications`](Self::notifications).
    async fn unsubscribe(&self, characteristic: Uuid) -> Result<()>;

    /// Drop the connection.
    async fn disconnect(&self) -> Result<()>;
}

/// Something that can produce a [`GattLink`] to a peripheral exposing a service.
#[async_trait]
pub trait BleBackend: Send + Sync {
    /// Find and connect a peripheral exposing `service`.
    async fn connect(&self, service: Uuid) -> Result<Arc<dyn GattLink>>;
}

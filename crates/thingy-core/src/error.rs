//! Error types for thingy-core.
//!
//! Every failure a session can surface maps onto a small taxonomy:
//!
//! | Error | Meaning |
//! |-------|---------|
//! | [`Error::DeviceUnavailable`] | No peripheral exposing the service was found or selected |
//! | [`Error::PermissionDenied`] | The platform refused Bluetooth access |
//! | [`Error::ConnectionLost`] | The notification source ended or the link dropped |
//! | [`Error::Decode`] | A payload could not be decoded |
//!
//! None of these are retried by this crate. A lost connection is terminal
//! until the caller connects again.

use std::time::Duration;

use thiserror::Error;

use thingy_types::ParseError;

/// Message carried by [`Error::ConnectionLost`] when the peripheral drops the link.
pub const GATT_DISCONNECTED: &str = "GATT Server disconnected";

/// Errors that can occur when talking to a sensor tag.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// No matching peripheral was found or selected.
    #[error("Device unavailable: {0}")]
    DeviceUnavailable(UnavailableReason),

    /// The host platform refused Bluetooth access.
    #[error("Bluetooth permission denied")]
    PermissionDenied,

    /// The link or its notification stream terminated unexpectedly.
    ///
    /// Displays as the bare message so it can be shown to users verbatim.
    #[error("{0}")]
    ConnectionLost(String),

    /// A payload could not be decoded.
    #[error(transparent)]
    Decode(#[from] ParseError),

    /// A session operation was attempted before `configure()`.
    #[error("Session not configured")]
    NotConfigured,

    /// A session operation was attempted after `disconnect()` without a new `connect()`.
    #[error("Not connected to device")]
    NotConnected,

    /// Required characteristic not found on the peripheral.
    #[error("Characteristic not found: {uuid} (searched in {service_count} services)")]
    CharacteristicNotFound {
        /// The UUID that was not found.
        uuid: String,
        /// Number of services that were searched.
        service_count: usize,
    },

    /// Any other Bluetooth stack error.
    #[error("Bluetooth error: {0}")]
    Bluetooth(btleplug::Error),

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Reason why no device could be used.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum UnavailableReason {
    /// No Bluetooth adapter available.
    NoAdapter,
    /// Nothing advertising the service was seen during the scan window.
    NoDevicesInRange {
        /// How long the scan ran.
        scan_duration: Duration,
    },
    /// A specific device was requested but not seen.
    NotFound { identifier: String },
    /// The platform reported the peripheral as gone.
    Gone,
}

impl std::fmt::Display for UnavailableReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoAdapter => write!(f, "no Bluetooth adapter available"),
            Self::NoDevicesInRange { scan_duration } => {
                write!(f, "no devices in range after scanning for {:?}", scan_duration)
            }
            Self::NotFound { identifier } => write!(f, "device '{}' not found", identifier),
            Self::Gone => write!(f, "device no longer present"),
        }
    }
}

impl Error {
    /// Create a device unavailable error for a specific identifier.
    pub fn device_not_found(identifier: impl Into<String>) -> Self {
        Self::DeviceUnavailable(UnavailableReason::NotFound {
            identifier: identifier.into(),
        })
    }

    /// Create the error reported when the peripheral drops the link.
    pub fn gatt_disconnected() -> Self {
        Self::ConnectionLost(GATT_DISCONNECTED.to_string())
    }

    /// Create a characteristic not found error.
    pub fn characteristic_not_found(uuid: impl Into<String>, service_count: usize) -> Self {
        Self::CharacteristicNotFound {
            uuid: uuid.into(),
            service_count,
        }
    }

    /// Create a configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    /// Whether this error ends a stream because the link went away.
    pub fn is_connection_lost(&self) -> bool {
        matches!(self, Self::ConnectionLost(_))
    }
}

impl From<btleplug::Error> for Error {
    fn from(err: btleplug::Error) -> Self {
        match err {
            btleplug::Error::PermissionDenied => Error::PermissionDenied,
            btleplug::Error::DeviceNotFound => Error::DeviceUnavailable(UnavailableReason::Gone),
            btleplug::Error::NotConnected => Error::gatt_disconnected(),
            other => Error::Bluetooth(other),
        }
    }
}

/// Result type alias using thingy-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::device_not_found("Thingy");
        assert_eq!(err.to_string(), "Device unavailable: device 'Thingy' not found");

        let err = Error::NotConnected;
        assert_eq!(err.to_string(), "Not connected to device");

        let err = Error::characteristic_not_found("28229ce0", 3);
        assert!(err.to_string().contains("28229ce0"));
        assert!(err.to_string().contains("3 services"));

        let err = Error::PermissionDenied;
        assert_eq!(err.to_string(), "Bluetooth permission denied");
    }

    #[test]
    fn test_connection_lost_displays_bare_message() {
        assert_eq!(Error::gatt_disconnected().to_string(), "GATT Server disconnected");
        assert!(Error::gatt_disconnected().is_connection_lost());
        assert!(!Error::NotConnected.is_connection_lost());
    }

    #[test]
    fn test_unavailable_reasons() {
        let err = Error::DeviceUnavailable(UnavailableReason::NoAdapter);
        assert!(err.to_string().contains("no Bluetooth adapter"));

        let err = Error::DeviceUnavailable(UnavailableReason::NoDevicesInRange {
            scan_duration: Duration::from_secs(10),
        });
        assert!(err.to_string().contains("10s"));
    }

    #[test]
    fn test_decode_error_conversion() {
        let err: Error = ParseError::insufficient(2, 1).into();
        assert!(matches!(err, Error::Decode(_)));
        assert!(err.to_string().contains("got 1"));
    }

    #[test]
    fn test_btleplug_error_classification() {
        assert!(matches!(
            Error::from(btleplug::Error::PermissionDenied),
            Error::PermissionDenied
        ));
        assert!(matches!(
            Error::from(btleplug::Error::DeviceNotFound),
            Error::DeviceUnavailable(UnavailableReason::Gone)
        ));
        assert!(Error::from(btleplug::Error::NotConnected).is_connection_lost());
        assert!(matches!(
            Error::from(btleplug::Error::NotSupported("scan".to_string())),
            Error::Bluetooth(_)
        ));
    }
}

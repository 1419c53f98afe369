//! Platform-agnostic types for Thingy BLE sensor tags.
//!
//! This crate holds everything about the tag that does not depend on a
//! Bluetooth stack: GATT identifiers, the reading type, sensor descriptors,
//! and the payload decoders.
//!
//! # Example
//!
//! ```
//! use thingy_types::SensorKind;
//!
//! let descriptor = SensorKind::Temperature.descriptor();
//! assert_eq!(descriptor.decode(&[0x64, 0x00]).unwrap(), 100.0);
//! ```

pub mod decode;
pub mod error;
pub mod types;
pub mod uuid;

pub use decode::{RawInterpretation, decode_rotary, decode_temperature, inspect};
pub use error::{ParseError, ParseResult};
pub use types::{Decoder, Reading, SensorDescriptor, SensorKind};
pub use crate::uuid as uuids;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use time::macros::datetime;

    // --- SensorKind tests ---

    #[test]
    fn test_sensor_kind_characteristics() {
        assert_eq!(
            SensorKind::Temperature.characteristic(),
            uuids::TEMPERATURE_CHARACTERISTIC
        );
        assert_eq!(SensorKind::Rotary.characteristic(), uuids::ROTARY_CHARACTERISTIC);
        for kind in SensorKind::ALL {
            assert_eq!(kind.service(), uuids::SENSOR_SERVICE);
        }
    }

    #[test]
    fn test_sensor_kind_labels() {
        assert_eq!(SensorKind::Temperature.label(), "Temperature");
        assert_eq!(SensorKind::Rotary.label(), "Degree");
    }

    #[test]
    fn test_sensor_kind_from_str() {
        assert_eq!("temperature".parse::<SensorKind>().unwrap(), SensorKind::Temperature);
        assert_eq!(" Rotary ".parse::<SensorKind>().unwrap(), SensorKind::Rotary);
        assert_eq!("degree".parse::<SensorKind>().unwrap(), SensorKind::Rotary);
        assert!("humidity".parse::<SensorKind>().is_err());
    }

    #[test]
    fn test_sensor_kind_display_roundtrips() {
        for kind in SensorKind::ALL {
            assert_eq!(kind.to_string().parse::<SensorKind>().unwrap(), kind);
        }
    }

    // --- SensorDescriptor tests ---

    #[test]
    fn test_descriptor_from_kind() {
        let descriptor = SensorKind::Rotary.descriptor();
        assert_eq!(descriptor.kind(), SensorKind::Rotary);
        assert_eq!(descriptor.service(), uuids::SENSOR_SERVICE);
        assert_eq!(descriptor.characteristic(), uuids::ROTARY_CHARACTERISTIC);
        assert_eq!(descriptor.decode(&[0x5A, 0x00]).unwrap(), 90.0);
    }

    #[test]
    fn test_descriptor_custom_decoder() {
        let descriptor = SensorDescriptor::new(
            SensorKind::Temperature,
            uuids::SENSOR_SERVICE,
            uuids::TEMPERATURE_CHARACTERISTIC,
            Arc::new(|payload: &[u8]| Ok(payload.len() as f64)),
        );
        assert_eq!(descriptor.decode(&[1, 2, 3]).unwrap(), 3.0);
    }

    #[test]
    fn test_descriptor_debug_hides_decoder() {
        let debug = format!("{:?}", SensorKind::Temperature.descriptor());
        assert!(debug.contains("Temperature"));
        assert!(debug.contains(".."));
    }

    // --- Reading tests ---

    #[test]
    fn test_reading_unix_seconds() {
        let reading = Reading::new(datetime!(1970-01-01 00:00:10.5 UTC), 1.0);
        assert!((reading.unix_seconds() - 10.5).abs() < 1e-9);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_reading_serializes_rfc3339() {
        let reading = Reading::new(datetime!(2024-05-01 12:00:00 UTC), 100.0);
        let json = serde_json::to_string(&reading).unwrap();
        assert!(json.contains("2024-05-01T12:00:00Z"));
        assert!(json.contains("100"));

        let back: Reading = serde_json::from_str(&json).unwrap();
        assert_eq!(back, reading);
    }
}

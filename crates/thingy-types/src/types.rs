//! Core types for Thingy sensor data.

use core::fmt;
use core::str::FromStr;
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::decode::{decode_rotary, decode_temperature};
use crate::error::{ParseError, ParseResult};
use crate::uuid::{ROTARY_CHARACTERISTIC, SENSOR_SERVICE, TEMPERATURE_CHARACTERISTIC};

/// A single decoded sample, produced once per notification or read.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Reading {
    /// When the sample was received by the host.
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339"))]
    pub timestamp: OffsetDateTime,
    /// Decoded value. Raw device units; no physical scaling is applied.
    pub value: f64,
}

impl Reading {
    /// Create a reading stamped with the given instant.
    pub fn new(timestamp: OffsetDateTime, value: f64) -> Self {
        Self { timestamp, value }
    }

    /// Create a reading stamped with the current UTC time.
    pub fn now(value: f64) -> Self {
        Self::new(OffsetDateTime::now_utc(), value)
    }

    /// Seconds since the Unix epoch, with sub-second precision.
    ///
    /// This is the x coordinate used by the live chart.
    pub fn unix_seconds(&self) -> f64 {
        self.timestamp.unix_timestamp_nanos() as f64 / 1_000_000_000.0
    }
}

/// The sensors exposed by the tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum SensorKind {
    /// Temperature, rendered as a rolling time series.
    Temperature,
    /// Rotary/orientation, rendered as a pie gauge over 360.
    Rotary,
}

impl SensorKind {
    /// All sensor kinds, in dashboard order.
    pub const ALL: [SensorKind; 2] = [SensorKind::Temperature, SensorKind::Rotary];

    /// GATT service carrying this sensor.
    pub fn service(&self) -> Uuid {
        SENSOR_SERVICE
    }

    /// GATT characteristic carrying this sensor's samples.
    pub fn characteristic(&self) -> Uuid {
        match self {
            SensorKind::Temperature => TEMPERATURE_CHARACTERISTIC,
            SensorKind::Rotary => ROTARY_CHARACTERISTIC,
        }
    }

    /// Human-readable series label.
    pub fn label(&self) -> &'static str {
        match self {
            SensorKind::Temperature => "Temperature",
            SensorKind::Rotary => "Degree",
        }
    }

    /// Build the descriptor a session is configured with for this sensor.
    pub fn descriptor(&self) -> SensorDescriptor {
        let decoder: Decoder = match self {
            SensorKind::Temperature => Arc::new(decode_temperature),
            SensorKind::Rotary => Arc::new(decode_rotary),
        };
        SensorDescriptor::new(*self, self.service(), self.characteristic(), decoder)
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorKind::Temperature => write!(f, "temperature"),
            SensorKind::Rotary => write!(f, "rotary"),
        }
    }
}

impl FromStr for SensorKind {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "temperature" | "temp" => Ok(SensorKind::Temperature),
            "rotary" | "degree" | "orientation" => Ok(SensorKind::Rotary),
            other => Err(ParseError::InvalidValue(format!("unknown sensor '{}'", other))),
        }
    }
}

/// Decoder mapping a raw characteristic payload to a numeric value.
pub type Decoder = Arc<dyn Fn(&[u8]) -> ParseResult<f64> + Send + Sync>;

/// Everything a session needs to talk to one characteristic.
///
/// Immutable once built; cloning shares the decoder.
#[derive(Clone)]
pub struct SensorDescriptor {
    kind: SensorKind,
    service: Uuid,
    characteristic: Uuid,
    decoder: Decoder,
}

impl SensorDescriptor {
    /// Create a descriptor from explicit identifiers and a decoder.
    pub fn new(kind: SensorKind, service: Uuid, characteristic: Uuid, decoder: Decoder) -> Self {
        Self {
            kind,
            service,
            characteristic,
            decoder,
        }
    }

    /// The sensor this descriptor reads.
    pub fn kind(&self) -> SensorKind {
        self.kind
    }

    /// The GATT service a matching peripheral must expose.
    pub fn service(&self) -> Uuid {
        self.service
    }

    /// The GATT characteristic carrying samples.
    pub fn characteristic(&self) -> Uuid {
        self.characteristic
    }

    /// Decode one payload.
    pub fn decode(&self, payload: &[u8]) -> ParseResult<f64> {
        (self.decoder)(payload)
    }
}

impl fmt::Debug for SensorDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SensorDescriptor")
            .field("kind", &self.kind)
            .field("service", &self.service)
            .field("characteristic", &self.characteristic)
            .finish_non_exhaustive()
    }
}

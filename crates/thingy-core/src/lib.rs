//! BLE session layer for Thingy sensor tags.
//!
//! This crate connects to a sensor tag over Bluetooth Low Energy and turns
//! characteristic notifications into decoded [`Reading`](thingy_types::Reading)s.
//!
//! # Features
//!
//! - **Device selection**: scan for a peripheral advertising the sensor service
//! - **Sessions**: configure, connect, stream, read once, disconnect
//! - **Live streams**: several independent listeners on one characteristic
//! - **Mock backend**: drive sessions without hardware in tests and demo mode
//!
//! # Platform Differences
//!
//! - **macOS**: peripherals are identified by a CoreBluetooth UUID that is
//!   stable per Mac but differs between machines.
//! - **Linux/Windows**: peripherals are identified by their MAC address.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use futures::StreamExt;
//! use thingy_core::{BleSession, BtleplugBackend, ScanOptions};
//! use thingy_types::SensorKind;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let backend = BtleplugBackend::new(ScanOptions::new().duration_secs(5));
//!     let session = BleSession::new(Arc::new(backend));
//!     session.configure(SensorKind::Temperature.descriptor());
//!
//!     println!("Now: {}", session.read_once().await?.value);
//!
//!     let mut readings = session.stream().take(10);
//!     while let Some(reading) = readings.next().await {
//!         println!("{}", reading?.value);
//!     }
//!
//!     session.disconnect().await?;
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod device;
pub mod error;
pub mod mock;
pub mod scan;
pub mod session;
pub mod streaming;
pub mod traits;
pub mod util;

pub use backend::BtleplugBackend;
pub use device::Device;
pub use error::{Error, GATT_DISCONNECTED, Result, UnavailableReason};
pub use mock::{MockBackend, MockFailure, MockLink};
pub use scan::{DiscoveredDevice, ScanOptions};
pub use session::BleSession;
pub use streaming::{ReadingResult, ReadingStream, Subscription};
pub use traits::{BleBackend, GattLink, NotificationStream};
pub use util::{create_identifier, format_peripheral_id};

// Re-export from thingy-types
pub use thingy_types;
pub use thingy_types::uuid as uuids;
pub use thingy_types::{Reading, SensorDescriptor, SensorKind};

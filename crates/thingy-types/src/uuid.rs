//! Bluetooth UUIDs exposed by the Thingy sensor tag.

use uuid::{Uuid, uuid};

// --- Sensor service ---

/// Custom GATT service carrying the environment and motion characteristics.
pub const SENSOR_SERVICE: Uuid = uuid!("08398469-6586-4ab0-ad45-737857396d87");

// --- Sensor characteristics ---

/// Temperature characteristic (notify, read).
pub const TEMPERATURE_CHARACTERISTIC: Uuid = uuid!("28229ce0-2e66-4f1b-a87d-e841bba4c469");

/// Rotary/orientation characteristic in degrees (notify, read).
pub const ROTARY_CHARACTERISTIC: Uuid = uuid!("8df0983e-7709-4fa9-87ea-5bdbc0821a7d");

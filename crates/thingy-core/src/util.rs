//! Peripheral identification helpers.

use btleplug::platform::PeripheralId;
use uuid::Uuid;

/// Address reported by platforms that hide the real MAC (macOS).
const ZERO_ADDRESS: &str = "00:00:00:00:00:00";

/// Format a peripheral ID as a plain string.
///
/// On macOS peripheral IDs are UUIDs; elsewhere they wrap the MAC address.
pub fn format_peripheral_id(id: &PeripheralId) -> String {
    format!("{:?}", id)
        .trim_start_matches("PeripheralId(")
        .trim_end_matches(')')
        .to_string()
}

/// Create an identifier string from an address and peripheral ID.
///
/// Uses the peripheral ID where the address is hidden.
pub fn create_identifier(address: &str, peripheral_id: &PeripheralId) -> String {
    if address == ZERO_ADDRESS {
        format_peripheral_id(peripheral_id)
    } else {
        address.to_string()
    }
}

/// Check whether a user-supplied identifier selects a peripheral.
///
/// `identifier` matches a substring of the peripheral ID, the full address
/// (with or without colons), or a substring of the advertised name. All
/// comparisons are case-insensitive.
pub fn identifier_matches(
    identifier: &str,
    peripheral_id: &str,
    address: &str,
    name: Option<&str>,
) -> bool {
    let wanted = identifier.trim().to_lowercase();
    if wanted.is_empty() {
        return false;
    }

    if peripheral_id.to_lowercase().contains(&wanted) {
        return true;
    }

    let address = address.to_lowercase();
    if address != ZERO_ADDRESS
        && (address == wanted || address.replace(':', "") == wanted.replace(':', ""))
    {
        return true;
    }

    name.is_some_and(|n| n.to_lowercase().contains(&wanted))
}

/// Check whether service discovery found `service`.
pub fn exposes_service(discovered: impl IntoIterator<Item = Uuid>, service: Uuid) -> bool {
    discovered.into_iter().any(|uuid| uuid == service)
}

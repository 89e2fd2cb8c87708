//! Device identity derived from the ESP32 factory MAC address.
//!
//! Format: `SC-XXXXXXXXXXXX`, the full 6-byte MAC in uppercase hex. The
//! id is stable across reboots (eFuse MAC), is used as the MQTT client
//! id and is embedded in every outgoing message.

use core::fmt::Write;

use crate::app::messages::DeviceId;

/// Full 6-byte MAC address.
pub type MacAddress = [u8; 6];

/// Read the factory MAC address from eFuse.
#[cfg(target_os = "espidf")]
pub fn read_mac() -> MacAddress {
    let mut mac: MacAddress = [0u8; 6];
    // SAFETY: `mac` is a valid 6-byte buffer for the duration of the call.
    unsafe {
        esp_idf_svc::sys::esp_efuse_mac_get_default(mac.as_mut_ptr());
    }
    mac
}

/// Simulation: a deterministic fake MAC.
#[cfg(not(target_os = "espidf"))]
pub fn read_mac() -> MacAddress {
    [0xDE, 0xAD, 0xBE, 0xEF, 0xCA, 0xFE]
}

pub fn device_id(mac: &MacAddress) -> DeviceId {
    let mut id = DeviceId::new();
    let _ = id.push_str("SC-");
    for byte in mac {
        let _ = write!(id, "{:02X}", byte);
    }
    id
}

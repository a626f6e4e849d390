//! Discovered peripherals.

use serde::{Deserialize, Serialize};

/// Stable platform identifier of a peripheral.
///
/// Advertised names collide across units, so identity is always this id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    /// Wrap a platform identifier.
    pub fn new(identifier: impl Into<String>) -> Self {
        Self(identifier.into())
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DeviceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for DeviceId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A peripheral seen during scanning.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Device {
    /// Stable identifier.
    pub identifier: DeviceId,
    /// Advertised local name, if any.
    pub name: Option<String>,
    /// Signal strength in dBm.
    pub rssi: i16,
}

impl Device {
    /// Create a device record.
    pub fn new(identifier: impl Into<DeviceId>, name: Option<String>, rssi: i16) -> Self {
        Self {
            identifier: identifier.into(),
            name,
            rssi,
        }
    }

    /// A device known only by identifier, e.g. a persisted or scanned-in id.
    pub fn unnamed(identifier: impl Into<DeviceId>) -> Self {
        Self::new(identifier, None, i16::MIN)
    }

    /// Name for display, falling back to the identifier.
    pub fn display_name(&self) -> &str {
        match self.name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => self.identifier.as_str(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_fallback() {
        let named = Device::new("AA:BB", Some("ELK-BLEDOM".to_string()), -60);
        assert_eq!(named.display_name(), "ELK-BLEDOM");

        let blank = Device::new("AA:BB", Some("  ".to_string()), -60);
        assert_eq!(blank.display_name(), "AA:BB");

        let unnamed = Device::unnamed("CC:DD");
        assert_eq!(unnamed.display_name(), "CC:DD");
        assert_eq!(unnamed.rssi, i16::MIN);
    }

    #[test]
    fn test_device_id_serde_is_transparent() {
        let id = DeviceId::new("AA:BB");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"AA:BB\"");
        let back: DeviceId = serde_json::from_str("\"AA:BB\"").unwrap();
        assert_eq!(back, id);
    }
}

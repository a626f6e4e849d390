//! Advertisement filtering and the candidate list.
//!
//! Target firmware advertises inconsistent names, so the filter is
//! inclusive: a stray false positive in the list is fine, a missing strip
//! is not.

use crate::ble::device::{Device, DeviceId};

/// Name fragments that mark a plausible controller.
pub const DEFAULT_KEYWORDS: [&str; 9] = [
    "led", "ble", "elk", "dom", "melk", "lotus", "triones", "qhm", "duoco",
];

/// Predicate over advertised names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceFilter {
    keywords: Vec<String>,
    strict: bool,
}

impl DeviceFilter {
    /// Inclusive filter with the default keywords.
    pub fn new() -> Self {
        Self {
            keywords: DEFAULT_KEYWORDS.iter().map(|k| k.to_string()).collect(),
            strict: false,
        }
    }

    /// Exclude peripherals that advertise no name.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Add a name fragment.
    pub fn with_keyword(mut self, keyword: &str) -> Self {
        self.keywords.push(keyword.to_lowercase());
        self
    }

    /// Whether an advertisement could come from a target controller.
    pub fn is_candidate(&self, advertised_name: Option<&str>) -> bool {
        let name = match advertised_name.map(str::trim) {
            Some(name) if !name.is_empty() => name.to_lowercase(),
            _ => return !self.strict,
        };

        self.keywords.iter().any(|k| name.contains(k.as_str()))
    }
}

impl Default for DeviceFilter {
    fn default() -> Self {
        Self::new()
    }
}

/// Devices seen in the current scan session, strongest signal first.
#[derive(Debug, Clone, Default)]
pub struct DiscoveredDevices {
    devices: Vec<Device>,
}

impl DiscoveredDevices {
    /// Create an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an observation. Returns `true` if the device is new.
    ///
    /// Re-observation updates signal strength (and a newly learned name) in
    /// place; the list is then re-sorted by descending signal strength.
    pub fn observe(&mut self, device: Device) -> bool {
        let is_new = match self
            .devices
            .iter_mut()
            .find(|d| d.identifier == device.identifier)
        {
            Some(existing) => {
                existing.rssi = device.rssi;
                if device.name.is_some() {
                    existing.name = device.name;
                }
                false
            }
            None => {
                self.devices.push(device);
                true
            }
        };

        self.devices
            .sort_by_key(|d| std::cmp::Reverse(d.rssi));
        is_new
    }

    /// Look up a device by identifier.
    pub fn get(&self, identifier: &DeviceId) -> Option<&Device> {
        self.devices.iter().find(|d| d.identifier == *identifier)
    }

    /// The devices, strongest first.
    pub fn as_slice(&self) -> &[Device] {
        &self.devices
    }

    /// Number of devices.
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    /// Whether nothing has been seen.
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Forget everything (start of a new scan session).
    pub fn clear(&mut self) {
        self.devices.clear();
    }
}

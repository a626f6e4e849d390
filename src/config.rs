//! Runtime configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::ble::connection::ReconnectPolicy;
use crate::ble::filter::DeviceFilter;
use crate::ble::resolver::DiscoveryMode;
use crate::protocol::ProtocolVariant;
use crate::scheduler::RampPolicy;

/// Connection and protocol settings for a [`crate::DeviceController`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Automatic retries before the connection is declared failed.
    pub max_reconnect_attempts: u32,
    /// First retry delay; doubled per attempt.
    pub backoff_base: Duration,
    /// Upper bound on the retry delay.
    pub backoff_cap: Duration,
    /// How services are discovered after connecting.
    pub discovery_mode: DiscoveryMode,
    /// Exclude peripherals that advertise no name.
    pub strict_names: bool,
    /// Byte layout to encode commands with.
    pub protocol_variant: ProtocolVariant,
    /// Send a power-on command once the write channel is bound.
    pub probe_on_connect: bool,
    /// Stop scanning automatically after this long.
    pub scan_duration: Option<Duration>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        let policy = ReconnectPolicy::default();

        Self {
            max_reconnect_attempts: policy.max_attempts,
            backoff_base: policy.base,
            backoff_cap: policy.cap,
            discovery_mode: DiscoveryMode::default(),
            strict_names: false,
            protocol_variant: ProtocolVariant::default(),
            probe_on_connect: false,
            scan_duration: None,
        }
    }
}

impl ControllerConfig {
    /// Set the retry cap.
    pub fn with_max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.max_reconnect_attempts = attempts;
        self
    }

    /// Set the backoff base and cap.
    pub fn with_backoff(mut self, base: Duration, cap: Duration) -> Self {
        self.backoff_base = base;
        self.backoff_cap = cap;
        self
    }

    /// Set the discovery mode.
    pub fn with_discovery_mode(mut self, mode: DiscoveryMode) -> Self {
        self.discovery_mode = mode;
        self
    }

    /// Exclude unnamed peripherals from scan results.
    pub fn with_strict_names(mut self, strict: bool) -> Self {
        self.strict_names = strict;
        self
    }

    /// Set the protocol variant.
    pub fn with_protocol_variant(mut self, variant: ProtocolVariant) -> Self {
        self.protocol_variant = variant;
        self
    }

    /// Enable the post-connect power-on probe.
    pub fn with_probe_on_connect(mut self, probe: bool) -> Self {
        self.probe_on_connect = probe;
        self
    }

    /// Stop scanning after a fixed window.
    pub fn with_scan_duration(mut self, duration: Duration) -> Self {
        self.scan_duration = Some(duration);
        self
    }

    /// Backoff policy derived from these settings.
    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy {
            max_attempts: self.max_reconnect_attempts,
            base: self.backoff_base,
            cap: self.backoff_cap,
        }
    }

    /// Advertisement filter derived from these settings.
    pub fn device_filter(&self) -> DeviceFilter {
        DeviceFilter::new().strict(self.strict_names)
    }
}

/// Settings for the schedule runner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// How often schedules are evaluated. Must be under a minute.
    pub tick_interval: Duration,
    /// Start-of-ramp behaviour for ramped schedules.
    pub ramp: RampPolicy,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(30),
            ramp: RampPolicy::default(),
        }
    }
}

impl ScheduleConfig {
    /// Set the tick interval.
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Set the ramp policy.
    pub fn with_ramp(mut self, ramp: RampPolicy) -> Self {
        self.ramp = ramp;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = ControllerConfig::default();
        assert_eq!(config.max_reconnect_attempts, 5);
        assert_eq!(config.backoff_cap, Duration::from_secs(30));
        assert_eq!(config.discovery_mode, DiscoveryMode::Broad);
        assert_eq!(config.protocol_variant, ProtocolVariant::BLEDOM);
        assert!(!config.strict_names);
        assert_eq!(config.reconnect_policy(), ReconnectPolicy::default());
    }

    #[test]
    fn test_builder() {
        let config = ControllerConfig::default()
            .with_max_reconnect_attempts(10)
            .with_discovery_mode(DiscoveryMode::Narrow)
            .with_protocol_variant(ProtocolVariant::ELK_BLE);
        assert_eq!(config.reconnect_policy().max_attempts, 10);
        assert_eq!(config.discovery_mode, DiscoveryMode::Narrow);
        assert_eq!(config.protocol_variant.header_byte, 0x00);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: ControllerConfig =
            serde_json::from_str(r#"{"max_reconnect_attempts": 10, "discovery_mode": "narrow"}"#)
                .unwrap();
        assert_eq!(config.max_reconnect_attempts, 10);
        assert_eq!(config.discovery_mode, DiscoveryMode::Narrow);
        assert_eq!(config.backoff_base, Duration::from_secs(1));
    }

    #[test]
    fn test_schedule_config_default() {
        let config = ScheduleConfig::default();
        assert_eq!(config.tick_interval, Duration::from_secs(30));
        assert_eq!(config.ramp, RampPolicy::Immediate);
    }
}

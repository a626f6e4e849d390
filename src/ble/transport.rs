//! The radio boundary.
//!
//! Everything above this trait is platform independent and testable
//! without hardware. [`crate::ble::platform::BtleplugTransport`] is the
//! real implementation.

use async_trait::async_trait;
use btleplug::api::WriteType;
use tokio::sync::broadcast;

use crate::ble::device::{Device, DeviceId};
use crate::ble::resolver::{CharacteristicDescriptor, DiscoveryMode, WriteChannel};
use crate::error::Result;

/// Unsolicited events from the radio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A peripheral advertised while scanning.
    Advertisement(Device),
    /// A connected peripheral dropped the link.
    Disconnected(DeviceId),
    /// The adapter was powered on or off.
    AdapterState {
        /// Whether the adapter is usable.
        powered: bool,
    },
}

/// Abstract BLE central.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BleTransport: Send + Sync {
    /// Start scanning. Advertisements arrive on [`BleTransport::subscribe`].
    async fn start_scan(&self) -> Result<()>;

    /// Stop scanning.
    async fn stop_scan(&self) -> Result<()>;

    /// Establish a link.
    async fn connect(&self, identifier: &DeviceId) -> Result<()>;

    /// Discover characteristics of a connected peripheral, in discovery order.
    async fn discover(
        &self,
        identifier: &DeviceId,
        mode: DiscoveryMode,
    ) -> Result<Vec<CharacteristicDescriptor>>;

    /// Write bytes to a characteristic.
    async fn write(
        &self,
        identifier: &DeviceId,
        channel: &WriteChannel,
        data: Vec<u8>,
        write_type: WriteType,
    ) -> Result<()>;

    /// Drop the link.
    async fn disconnect(&self, identifier: &DeviceId) -> Result<()>;

    /// Subscribe to unsolicited events.
    fn subscribe(&self) -> broadcast::Receiver<TransportEvent>;
}

//! BLE communication module.
//!
//! This module provides the radio-facing pieces: advertisement filtering,
//! write channel resolution, the transport seam and its btleplug
//! implementation, and the connection state machine.

pub mod connection;
pub mod device;
pub mod filter;
pub mod platform;
pub mod resolver;
pub mod transport;
pub mod uuids;

pub use connection::{
    ActiveLink, ConnectionState, ConnectionStateMachine, ConnectionStatus, Effect, Event,
    ReconnectPolicy, RetryToken, SessionId,
};
pub use device::{Device, DeviceId};
pub use filter::{DeviceFilter, DiscoveredDevices};
pub use platform::BtleplugTransport;
pub use resolver::{CharacteristicDescriptor, CharacteristicResolver, DiscoveryMode, WriteChannel};
pub use transport::{BleTransport, TransportEvent};
pub use uuids::*;

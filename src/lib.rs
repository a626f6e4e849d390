// Allow unusual byte groupings for UUIDs which have standard format
#![allow(clippy::unusual_byte_groupings)]

//! # bledom-rust-ble
//!
//! A cross-platform Rust library for driving ELK-BLEDOM, BLEDOM, MELK and
//! Lotus Lantern style LED strip controllers over Bluetooth Low Energy.
//!
//! These controllers are write-only: commands are 9-byte packets written
//! to a vendor characteristic, and nothing is read back.
//!
//! ## Features
//!
//! - **Discovery**: Inclusive name filtering, deduplicated and sorted by signal
//! - **Auto-reconnect**: Direct reconnect to the last device, bounded exponential backoff
//! - **Commands**: Power, brightness, speed, colour, white balance, effects, clock sync, raw hex
//! - **Protocol variants**: Per-family byte layouts selected by configuration
//! - **Schedules**: Minute-granular power schedules with persistence
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use bledom_rust_ble::{
//!     BtleplugTransport, Command, ConnectionState, ControllerConfig, DeviceController,
//!     JsonFileStore, Result,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let transport = Arc::new(BtleplugTransport::new().await?);
//!     let store = Arc::new(JsonFileStore::new("bledom.json"));
//!     let config = ControllerConfig::default();
//!     let controller = DeviceController::new(transport, store, config).await?;
//!
//!     // Reconnects to the last device, or scans.
//!     controller.start()?;
//!     tokio::time::sleep(std::time::Duration::from_secs(5)).await;
//!
//!     if controller.state() != ConnectionState::Connected {
//!         if let Some(device) = controller.discovered_devices().first() {
//!             println!("Connecting to {}", device.display_name());
//!             controller.connect(device.identifier.clone())?;
//!             tokio::time::sleep(std::time::Duration::from_secs(5)).await;
//!         }
//!     }
//!
//!     controller.send(&Command::Color(255, 80, 0)).await?;
//!     controller.shutdown().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Platform Notes
//!
//! ### macOS
//! Requires Bluetooth permission. Add `NSBluetoothAlwaysUsageDescription`
//! to your Info.plist for bundled apps.
//!
//! ### Linux
//! Requires BlueZ. User may need to be in the `bluetooth` group.
//!
//! ### Windows
//! Requires Windows 10 or later with Bluetooth LE support.

// Public modules
pub mod ble;
pub mod config;
pub mod controller;
pub mod data;
pub mod dispatcher;
pub mod error;
pub mod protocol;
pub mod scheduler;
pub mod utils;

// Re-exports for convenience
pub use config::{ControllerConfig, ScheduleConfig};
pub use controller::{CallbackHandle, DeviceController};
pub use dispatcher::{AuditEntry, CommandDispatcher, LinkProvider};
pub use error::{Error, Result};
pub use scheduler::{
    Notifier, RampPolicy, ScheduleEvaluator, ScheduleRunner, ScheduleTrigger, TracingNotifier,
    TriggerKind,
};
pub use utils::{parse_hex, to_hex};

// Re-export commonly used types from submodules
pub use ble::{
    BleTransport, BtleplugTransport, ConnectionState, ConnectionStatus, Device, DeviceFilter,
    DeviceId, DiscoveryMode, TransportEvent, WriteChannel,
};
pub use data::{
    DaySet, JsonFileStore, MemoryStore, Schedule, ScheduleBook, ScheduleId, Store, TimeOfDay,
};
pub use protocol::{Command, EffectMode, Frame, Packet, ProtocolCodec, ProtocolVariant};

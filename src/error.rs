//! Error types for the bledom-rust-ble crate.

use thiserror::Error;

use crate::ble::connection::ConnectionState;

/// The main error type for this crate.
#[derive(Error, Debug)]
pub enum Error {
    /// Bluetooth-related error from the underlying BLE library.
    #[error("Bluetooth error: {0}")]
    Bluetooth(#[from] btleplug::Error),

    /// Bluetooth is powered off, unauthorized or missing on this system.
    #[error("Bluetooth not available or disabled")]
    AdapterUnavailable,

    /// The specified peripheral is not known to the adapter.
    #[error("Device not found: {identifier}")]
    DeviceNotFound {
        /// The identifier that was searched for.
        identifier: String,
    },

    /// A connection attempt failed at the link layer.
    #[error("Link failure: {reason}")]
    LinkFailure {
        /// Description of why the link failed.
        reason: String,
    },

    /// The peripheral connected but exposes no usable write characteristic.
    #[error("No write characteristic found on {identifier}")]
    ResolutionFailure {
        /// The peripheral that failed resolution.
        identifier: String,
    },

    /// A command was submitted while no connection was ready to carry it.
    #[error("Not ready to send commands (state: {state})")]
    NotReady {
        /// The connection state at the time of submission.
        state: ConnectionState,
    },

    /// User-supplied raw bytes could not be decoded.
    #[error("Invalid encoding: {context}")]
    InvalidEncoding {
        /// Description of what was malformed.
        context: String,
    },

    /// A typed mode command carried a value outside the effect catalogue.
    #[error("Unsupported mode: {value:#04x}")]
    UnsupportedMode {
        /// The rejected raw mode byte.
        value: u8,
    },

    /// An invalid parameter was provided.
    #[error("Invalid parameter: {name} = {value}")]
    InvalidParameter {
        /// The name of the parameter.
        name: String,
        /// The invalid value that was provided.
        value: String,
    },

    /// Writing a packet to the bound characteristic failed.
    #[error("Write failed: {reason}")]
    WriteFailed {
        /// Description of the failure.
        reason: String,
    },

    /// No schedule exists with the given id.
    #[error("Schedule not found: {id}")]
    ScheduleNotFound {
        /// The id that was searched for.
        id: String,
    },

    /// The persistence collaborator failed.
    #[error("Storage error: {context}")]
    Storage {
        /// Description of the failure.
        context: String,
    },

    /// Persisted data could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem error from the file-backed store.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An internal error occurred.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether the state machine recovers from this error on its own.
    ///
    /// Transport failures drive the reconnect backoff. Caller misuse
    /// (`NotReady`, `InvalidEncoding`, `UnsupportedMode`, bad parameters)
    /// is surfaced and never retried.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Bluetooth(_)
                | Self::DeviceNotFound { .. }
                | Self::LinkFailure { .. }
                | Self::ResolutionFailure { .. }
        )
    }
}

/// A specialized Result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;

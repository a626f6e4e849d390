//! Command intents.
//!
//! A [`Command`] describes what the caller wants the strip to do. Numeric
//! inputs are deliberately wide so that out-of-range values can be clamped
//! by the codec instead of rejected.

use crate::error::Result;
use crate::protocol::modes::EffectMode;

/// A high-level instruction for the LED controller.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Command {
    /// Switch the strip on or off.
    Power(bool),
    /// Set brightness. Clamped by the active protocol variant.
    Brightness(i32),
    /// Set effect speed. Clamped by the active protocol variant.
    Speed(i32),
    /// Set a static colour; each channel is clamped to `0..=255`.
    Color(i32, i32, i32),
    /// Set white balance; each channel is clamped to `0..=100`.
    ColorTemperature {
        /// Warm white percentage.
        warm: i32,
        /// Cold white percentage.
        cold: i32,
    },
    /// Start a built-in effect.
    Mode(EffectMode),
    /// Set the controller's internal clock.
    SyncTime {
        /// Hour (0-23).
        hour: u8,
        /// Minute (0-59).
        minute: u8,
        /// Second (0-59).
        second: u8,
        /// ISO weekday (1 = Monday .. 7 = Sunday).
        weekday: u8,
    },
    /// Arbitrary bytes, written as-is without framing.
    RawBytes(Vec<u8>),
}

impl Command {
    /// Power the strip on.
    pub fn power_on() -> Self {
        Self::Power(true)
    }

    /// Power the strip off.
    pub fn power_off() -> Self {
        Self::Power(false)
    }

    /// Static colour from byte channels.
    pub fn rgb(red: u8, green: u8, blue: u8) -> Self {
        Self::Color(red as i32, green as i32, blue as i32)
    }

    /// Typed mode command from a raw mode byte.
    ///
    /// Fails with [`Error::UnsupportedMode`](crate::Error::UnsupportedMode)
    /// when the value is not in the effect catalogue.
    pub fn mode_from_raw(value: u8) -> Result<Self> {
        Ok(Self::Mode(EffectMode::from_raw(value)?))
    }

    /// Clock sync command for a local timestamp.
    pub fn sync_time<T: chrono::Timelike + chrono::Datelike>(now: &T) -> Self {
        Self::SyncTime {
            hour: now.hour() as u8,
            minute: now.minute() as u8,
            second: now.second() as u8,
            weekday: now.weekday().number_from_monday() as u8,
        }
    }

    /// Short name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Power(_) => "power",
            Self::Brightness(_) => "brightness",
            Self::Speed(_) => "speed",
            Self::Color(..) => "color",
            Self::ColorTemperature { .. } => "color_temperature",
            Self::Mode(_) => "mode",
            Self::SyncTime { .. } => "sync_time",
            Self::RawBytes(_) => "raw",
        }
    }
}

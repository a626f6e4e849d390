//! Built-in effect modes.
//!
//! The controllers ship a fixed catalogue of animated effects addressed by a
//! single mode byte. Values outside the catalogue can still be transmitted
//! with [`Command::RawBytes`](crate::protocol::Command::RawBytes), but the
//! typed mode path only accepts members of [`EffectMode`].

use crate::error::{Error, Result};

/// Effect mode identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum EffectMode {
    /// Seven-colour cross fade (0x25).
    RainbowFade = 0x25,
    /// Red pulse (0x26).
    RedPulse = 0x26,
    /// Green pulse (0x27).
    GreenPulse = 0x27,
    /// Blue pulse (0x28).
    BluePulse = 0x28,
    /// Yellow pulse (0x29).
    YellowPulse = 0x29,
    /// Cyan pulse (0x2A).
    CyanPulse = 0x2A,
    /// Purple pulse (0x2B).
    PurplePulse = 0x2B,
    /// White pulse (0x2C).
    WhitePulse = 0x2C,
    /// Red/green cross fade (0x2D).
    RedGreenFade = 0x2D,
    /// Red/blue cross fade (0x2E).
    RedBlueFade = 0x2E,
    /// Green/blue cross fade (0x2F).
    GreenBlueFade = 0x2F,
    /// Seven-colour strobe (0x30).
    RainbowStrobe = 0x30,
    /// Red strobe (0x31).
    RedStrobe = 0x31,
    /// Green strobe (0x32).
    GreenStrobe = 0x32,
    /// Blue strobe (0x33).
    BlueStrobe = 0x33,
    /// Yellow strobe (0x34).
    YellowStrobe = 0x34,
    /// Cyan strobe (0x35).
    CyanStrobe = 0x35,
    /// Purple strobe (0x36).
    PurpleStrobe = 0x36,
    /// White strobe (0x37).
    WhiteStrobe = 0x37,
    /// Seven-colour jump (0x38).
    RainbowJump = 0x38,
    /// Fire flicker (0x3C).
    Fire = 0x3C,
}

impl EffectMode {
    /// Every member of the catalogue, in mode-byte order.
    pub const ALL: [EffectMode; 21] = [
        Self::RainbowFade,
        Self::RedPulse,
        Self::GreenPulse,
        Self::BluePulse,
        Self::YellowPulse,
        Self::CyanPulse,
        Self::PurplePulse,
        Self::WhitePulse,
        Self::RedGreenFade,
        Self::RedBlueFade,
        Self::GreenBlueFade,
        Self::RainbowStrobe,
        Self::RedStrobe,
        Self::GreenStrobe,
        Self::BlueStrobe,
        Self::YellowStrobe,
        Self::CyanStrobe,
        Self::PurpleStrobe,
        Self::WhiteStrobe,
        Self::RainbowJump,
        Self::Fire,
    ];

    /// Look up a mode by its raw byte.
    ///
    /// Returns [`Error::UnsupportedMode`] for values outside the catalogue.
    pub fn from_raw(value: u8) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|mode| mode.to_raw() == value)
            .ok_or(Error::UnsupportedMode { value })
    }

    /// Convert to raw byte value.
    pub fn to_raw(&self) -> u8 {
        *self as u8
    }

    /// Get a human-readable name for this mode.
    pub fn name(&self) -> &'static str {
        match self {
            Self::RainbowFade => "Rainbow Fade",
            Self::RedPulse => "Red Pulse",
            Self::GreenPulse => "Green Pulse",
            Self::BluePulse => "Blue Pulse",
            Self::YellowPulse => "Yellow Pulse",
            Self::CyanPulse => "Cyan Pulse",
            Self::PurplePulse => "Purple Pulse",
            Self::WhitePulse => "White Pulse",
            Self::RedGreenFade => "Red/Green Fade",
            Self::RedBlueFade => "Red/Blue Fade",
            Self::GreenBlueFade => "Green/Blue Fade",
            Self::RainbowStrobe => "Rainbow Strobe",
            Self::RedStrobe => "Red Strobe",
            Self::GreenStrobe => "Green Strobe",
            Self::BlueStrobe => "Blue Strobe",
            Self::YellowStrobe => "Yellow Strobe",
            Self::CyanStrobe => "Cyan Strobe",
            Self::PurpleStrobe => "Purple Strobe",
            Self::WhiteStrobe => "White Strobe",
            Self::RainbowJump => "Rainbow Jump",
            Self::Fire => "Fire",
        }
    }
}

impl TryFrom<u8> for EffectMode {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        Self::from_raw(value)
    }
}

impl std::fmt::Display for EffectMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

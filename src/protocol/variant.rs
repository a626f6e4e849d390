//! Hardware protocol variants.
//!
//! Controllers in this family agree on the 9-byte framing but disagree on
//! several byte layouts. A [`ProtocolVariant`] is a small table describing
//! one family; the codec reads it instead of hard-coding a layout.
//!
//! Nothing on the wire identifies the variant, so it is chosen by
//! configuration.

use serde::{Deserialize, Serialize};

/// Layout of the power command body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PowerLayout {
    /// `04 on 00 00 00 00`, with `on` as 1 or 0.
    Flag,
    /// `04 F0 00 01 FF 00` for on, `04 00 00 00 FF 00` for off.
    Elk,
}

/// How a brightness value is mapped onto the wire byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BrightnessScale {
    /// Clamp to `0..=255` and pass through.
    Raw,
    /// Clamp to `0..=100` and pass through (firmware expects a percentage).
    Percent,
    /// Clamp to `0..=100` and scale by 2.55 onto `0..=255`.
    PercentToByte,
}

impl BrightnessScale {
    /// Map a requested brightness onto the wire byte.
    pub fn apply(&self, value: i32) -> u8 {
        match self {
            Self::Raw => value.clamp(0, 255) as u8,
            Self::Percent => value.clamp(0, 100) as u8,
            Self::PercentToByte => {
                let percent = value.clamp(0, 100) as f64;
                (percent * 2.55).round() as u8
            }
        }
    }
}

/// Byte-layout descriptor for one hardware family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProtocolVariant {
    /// Byte 1 of every framed packet.
    pub header_byte: u8,
    /// Layout of the power command.
    pub power: PowerLayout,
    /// Opcode of the mode command (`0x06` or `0x03` in the field).
    pub mode_opcode: u8,
    /// Byte following the mode value.
    pub mode_trailer: u8,
    /// Brightness mapping.
    pub brightness: BrightnessScale,
    /// Upper clamp for effect speed.
    pub speed_max: u8,
}

impl ProtocolVariant {
    /// Canonical BLEDOM layout.
    pub const BLEDOM: ProtocolVariant = ProtocolVariant {
        header_byte: 0x04,
        power: PowerLayout::Flag,
        mode_opcode: 0x06,
        mode_trailer: 0x00,
        brightness: BrightnessScale::Raw,
        speed_max: 0xFF,
    };

    /// BLEDOM firmware that takes a `0x03` mode opcode and percentage
    /// brightness scaled onto a full byte.
    pub const BLEDOM_PERCENT: ProtocolVariant = ProtocolVariant {
        header_byte: 0x04,
        power: PowerLayout::Flag,
        mode_opcode: 0x03,
        mode_trailer: 0x00,
        brightness: BrightnessScale::PercentToByte,
        speed_max: 0xFF,
    };

    /// ELK-BLE / MELK layout.
    pub const ELK_BLE: ProtocolVariant = ProtocolVariant {
        header_byte: 0x00,
        power: PowerLayout::Elk,
        mode_opcode: 0x03,
        mode_trailer: 0x03,
        brightness: BrightnessScale::Percent,
        speed_max: 100,
    };

    /// Body bytes (2..8) of a power command.
    pub fn power_body(&self, on: bool) -> [u8; 6] {
        match (self.power, on) {
            (PowerLayout::Flag, on) => [0x04, on as u8, 0x00, 0x00, 0x00, 0x00],
            (PowerLayout::Elk, true) => [0x04, 0xF0, 0x00, 0x01, 0xFF, 0x00],
            (PowerLayout::Elk, false) => [0x04, 0x00, 0x00, 0x00, 0xFF, 0x00],
        }
    }

    /// Body bytes (2..8) of a mode command.
    pub fn mode_body(&self, mode: u8) -> [u8; 6] {
        [self.mode_opcode, mode, self.mode_trailer, 0x00, 0x00, 0x00]
    }
}

impl Default for ProtocolVariant {
    fn default() -> Self {
        Self::BLEDOM
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_brightness_scales() {
        assert_eq!(BrightnessScale::Raw.apply(-5), 0);
        assert_eq!(BrightnessScale::Raw.apply(500), 255);
        assert_eq!(BrightnessScale::Percent.apply(150), 100);
        assert_eq!(BrightnessScale::PercentToByte.apply(100), 255);
        assert_eq!(BrightnessScale::PercentToByte.apply(50), 128);
        assert_eq!(BrightnessScale::PercentToByte.apply(-1), 0);
    }

    #[test]
    fn test_power_layouts() {
        let bledom = ProtocolVariant::BLEDOM;
        assert_eq!(bledom.power_body(true), [0x04, 0x01, 0, 0, 0, 0]);
        assert_eq!(bledom.power_body(false), [0x04, 0x00, 0, 0, 0, 0]);

        let elk = ProtocolVariant::ELK_BLE;
        assert_eq!(elk.power_body(true), [0x04, 0xF0, 0x00, 0x01, 0xFF, 0x00]);
        assert_eq!(elk.power_body(false), [0x04, 0x00, 0x00, 0x00, 0xFF, 0x00]);
    }

    #[test]
    fn test_mode_opcodes_differ() {
        assert_eq!(ProtocolVariant::BLEDOM.mode_body(0x25)[0], 0x06);
        assert_eq!(ProtocolVariant::BLEDOM_PERCENT.mode_body(0x25)[0], 0x03);
        assert_eq!(
            ProtocolVariant::ELK_BLE.mode_body(0x25),
            [0x03, 0x25, 0x03, 0x00, 0x00, 0x00]
        );
    }

    #[test]
    fn test_default_is_canonical() {
        assert_eq!(ProtocolVariant::default(), ProtocolVariant::BLEDOM);
    }
}

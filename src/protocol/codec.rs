//! Packet construction.
//!
//! Every framed command is a 9-byte packet:
//!
//! | Byte | Content                       |
//! |------|-------------------------------|
//! | 0    | `0x7E` header                 |
//! | 1    | variant header byte           |
//! | 2-7  | command body                  |
//! | 8    | `0xEF` footer                 |
//!
//! Packets are write-only; nothing in this crate parses them back.

use crate::protocol::command::Command;
use crate::protocol::variant::ProtocolVariant;
use crate::utils::{clamp_to_u8, to_hex};

/// Packet length in bytes.
pub const PACKET_LEN: usize = 9;
/// First byte of every packet.
pub const PACKET_HEADER: u8 = 0x7E;
/// Last byte of every packet.
pub const PACKET_FOOTER: u8 = 0xEF;

/// An immutable, framed 9-byte packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Packet([u8; PACKET_LEN]);

impl Packet {
    /// Frame a 6-byte body.
    pub fn new(header_byte: u8, body: [u8; 6]) -> Self {
        let mut bytes = [0u8; PACKET_LEN];
        bytes[0] = PACKET_HEADER;
        bytes[1] = header_byte;
        bytes[2..8].copy_from_slice(&body);
        bytes[8] = PACKET_FOOTER;
        Self(bytes)
    }

    /// The packet bytes.
    pub fn as_bytes(&self) -> &[u8; PACKET_LEN] {
        &self.0
    }

    /// The command body (bytes 2 through 7).
    pub fn body(&self) -> &[u8] {
        &self.0[2..8]
    }
}

/// Bytes produced for a single command.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Frame {
    /// A framed protocol packet.
    Packet(Packet),
    /// Caller-supplied bytes that bypass framing.
    Raw(Vec<u8>),
}

impl Frame {
    /// The bytes to write.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Packet(packet) => packet.as_bytes(),
            Self::Raw(bytes) => bytes,
        }
    }

    /// Consume into an owned buffer.
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Self::Packet(packet) => packet.as_bytes().to_vec(),
            Self::Raw(bytes) => bytes,
        }
    }

    /// Spaced upper-case hex, for audit logs.
    pub fn to_hex(&self) -> String {
        to_hex(self.as_bytes())
    }

    /// The framed packet, if this is not a raw frame.
    pub fn packet(&self) -> Option<&Packet> {
        match self {
            Self::Packet(packet) => Some(packet),
            Self::Raw(_) => None,
        }
    }
}

/// Turns [`Command`]s into bytes for one protocol variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProtocolCodec {
    variant: ProtocolVariant,
}

impl ProtocolCodec {
    /// Create a codec for a protocol variant.
    pub fn new(variant: ProtocolVariant) -> Self {
        Self { variant }
    }

    /// The variant this codec encodes for.
    pub fn variant(&self) -> &ProtocolVariant {
        &self.variant
    }

    /// Encode a command. Total: out-of-range inputs are clamped.
    pub fn encode(&self, command: &Command) -> Frame {
        let variant = &self.variant;

        let body = match command {
            Command::Power(on) => variant.power_body(*on),
            Command::Brightness(value) => {
                [0x01, variant.brightness.apply(*value), 0x00, 0x00, 0x00, 0x00]
            }
            Command::Speed(value) => [
                0x02,
                clamp_to_u8(*value, variant.speed_max),
                0x00,
                0x00,
                0x00,
                0x00,
            ],
            Command::Color(red, green, blue) => [
                0x05,
                0x03,
                clamp_to_u8(*red, 255),
                clamp_to_u8(*green, 255),
                clamp_to_u8(*blue, 255),
                0x00,
            ],
            Command::ColorTemperature { warm, cold } => [
                0x05,
                0x02,
                clamp_to_u8(*warm, 100),
                clamp_to_u8(*cold, 100),
                0x00,
                0x00,
            ],
            Command::Mode(mode) => variant.mode_body(mode.to_raw()),
            Command::SyncTime {
                hour,
                minute,
                second,
                weekday,
            } => [
                0x83,
                (*hour).min(23),
                (*minute).min(59),
                (*second).min(59),
                (*weekday).clamp(1, 7),
                0x00,
            ],
            Command::RawBytes(bytes) => return Frame::Raw(bytes.clone()),
        };

        Frame::Packet(Packet::new(variant.header_byte, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::modes::EffectMode;
    use crate::utils::parse_hex;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn bytes(command: Command) -> Vec<u8> {
        ProtocolCodec::default().encode(&command).into_bytes()
    }

    #[test]
    fn test_canonical_layouts() {
        assert_eq!(
            bytes(Command::Power(true)),
            vec![0x7E, 0x04, 0x04, 0x01, 0x00, 0x00, 0x00, 0x00, 0xEF]
        );
        assert_eq!(
            bytes(Command::Power(false)),
            vec![0x7E, 0x04, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0xEF]
        );
        assert_eq!(
            bytes(Command::Speed(50)),
            vec![0x7E, 0x04, 0x02, 0x32, 0x00, 0x00, 0x00, 0x00, 0xEF]
        );
        assert_eq!(
            bytes(Command::Color(255, 128, 0)),
            vec![0x7E, 0x04, 0x05, 0x03, 0xFF, 0x80, 0x00, 0x00, 0xEF]
        );
        assert_eq!(
            bytes(Command::Mode(EffectMode::RainbowJump)),
            vec![0x7E, 0x04, 0x06, 0x38, 0x00, 0x00, 0x00, 0x00, 0xEF]
        );
    }

    #[test]
    fn test_full_brightness_matches_reference_hex() {
        let expected = parse_hex("7E 04 01 FF 00 00 00 00 EF").unwrap();
        assert_eq!(bytes(Command::Brightness(255)), expected);
    }

    #[test]
    fn test_raw_bytes_bypass_framing() {
        let frame = ProtocolCodec::default().encode(&Command::RawBytes(vec![0xAA, 0xBB]));
        assert!(frame.packet().is_none());
        assert_eq!(frame.as_bytes(), &[0xAA, 0xBB]);
    }

    #[test]
    fn test_elk_variant() {
        let codec = ProtocolCodec::new(ProtocolVariant::ELK_BLE);
        assert_eq!(
            codec.encode(&Command::Power(true)).into_bytes(),
            vec![0x7E, 0x00, 0x04, 0xF0, 0x00, 0x01, 0xFF, 0x00, 0xEF]
        );
        assert_eq!(
            codec.encode(&Command::Brightness(250)).into_bytes(),
            vec![0x7E, 0x00, 0x01, 0x64, 0x00, 0x00, 0x00, 0x00, 0xEF]
        );
        assert_eq!(
            codec.encode(&Command::Mode(EffectMode::Fire)).into_bytes(),
            vec![0x7E, 0x00, 0x03, 0x3C, 0x03, 0x00, 0x00, 0x00, 0xEF]
        );
    }

    #[test]
    fn test_sync_time_clamps() {
        let frame = ProtocolCodec::default().encode(&Command::SyncTime {
            hour: 30,
            minute: 75,
            second: 61,
            weekday: 0,
        });
        assert_eq!(frame.packet().unwrap().body(), &[0x83, 23, 59, 59, 1, 0]);
    }

    #[test]
    fn test_to_hex() {
        let frame = ProtocolCodec::default().encode(&Command::Power(true));
        assert_eq!(frame.to_hex(), "7E 04 04 01 00 00 00 00 EF");
    }

    fn framed_command() -> impl Strategy<Value = Command> {
        prop_oneof![
            any::<bool>().prop_map(Command::Power),
            any::<i32>().prop_map(Command::Brightness),
            any::<i32>().prop_map(Command::Speed),
            (any::<i32>(), any::<i32>(), any::<i32>())
                .prop_map(|(r, g, b)| Command::Color(r, g, b)),
            (any::<i32>(), any::<i32>())
                .prop_map(|(warm, cold)| Command::ColorTemperature { warm, cold }),
            proptest::sample::select(EffectMode::ALL.to_vec()).prop_map(Command::Mode),
        ]
    }

    fn variant() -> impl Strategy<Value = ProtocolVariant> {
        proptest::sample::select(vec![
            ProtocolVariant::BLEDOM,
            ProtocolVariant::BLEDOM_PERCENT,
            ProtocolVariant::ELK_BLE,
        ])
    }

    proptest! {
        #[test]
        fn prop_packets_are_framed(command in framed_command(), variant in variant()) {
            let frame = ProtocolCodec::new(variant).encode(&command);
            let bytes = frame.as_bytes();
            prop_assert_eq!(bytes.len(), PACKET_LEN);
            prop_assert_eq!(bytes[0], PACKET_HEADER);
            prop_assert_eq!(bytes[8], PACKET_FOOTER);
        }

        #[test]
        fn prop_encoding_is_idempotent(command in framed_command(), variant in variant()) {
            let codec = ProtocolCodec::new(variant);
            prop_assert_eq!(codec.encode(&command), codec.encode(&command));
        }

        #[test]
        fn prop_negative_values_clamp_to_zero(value in i32::MIN..0) {
            let codec = ProtocolCodec::default();
            prop_assert_eq!(
                codec.encode(&Command::Brightness(value)),
                codec.encode(&Command::Brightness(0))
            );
            prop_assert_eq!(
                codec.encode(&Command::Speed(value)),
                codec.encode(&Command::Speed(0))
            );
            prop_assert_eq!(
                codec.encode(&Command::Color(value, value, value)),
                codec.encode(&Command::Color(0, 0, 0))
            );
        }

        #[test]
        fn prop_large_values_clamp_to_max(value in 256..i32::MAX) {
            let codec = ProtocolCodec::default();
            prop_assert_eq!(
                codec.encode(&Command::Brightness(value)),
                codec.encode(&Command::Brightness(255))
            );
            prop_assert_eq!(
                codec.encode(&Command::Speed(value)),
                codec.encode(&Command::Speed(255))
            );
            prop_assert_eq!(
                codec.encode(&Command::Color(value, 7, value)),
                codec.encode(&Command::Color(255, 7, 255))
            );
        }
    }

    #[test]
    fn test_spot_clamping() {
        assert_eq!(bytes(Command::Brightness(-5)), bytes(Command::Brightness(0)));
        assert_eq!(
            bytes(Command::Brightness(500)),
            bytes(Command::Brightness(255))
        );
    }
}

//! Protocol module for constructing command packets.
//!
//! This module contains the implementations for:
//! - Command intents
//! - The effect mode catalogue
//! - Per-hardware protocol variants
//! - Packet encoding

pub mod codec;
pub mod command;
pub mod modes;
pub mod variant;

pub use codec::{Frame, Packet, ProtocolCodec, PACKET_FOOTER, PACKET_HEADER, PACKET_LEN};
pub use command::Command;
pub use modes::EffectMode;
pub use variant::{BrightnessScale, PowerLayout, ProtocolVariant};

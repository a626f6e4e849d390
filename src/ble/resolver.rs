//! Write channel resolution.
//!
//! After a link comes up, the peripheral's characteristics are offered to a
//! [`CharacteristicResolver`] in discovery order. The first known write
//! characteristic that actually accepts writes is bound; later matches are
//! ignored.

use btleplug::api::{CharPropFlags, WriteType};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};
use uuid::Uuid;

use crate::ble::device::DeviceId;
use crate::ble::uuids::{is_candidate_service, is_write_candidate};
use crate::error::{Error, Result};

/// How services are discovered after connecting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryMode {
    /// Only the known candidate services are considered.
    Narrow,
    /// Everything is discovered and filtered locally.
    #[default]
    Broad,
}

/// A discovered characteristic and its capability flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharacteristicDescriptor {
    /// Service the characteristic belongs to.
    pub service_uuid: Uuid,
    /// Characteristic UUID.
    pub uuid: Uuid,
    /// Capability flags.
    pub properties: CharPropFlags,
}

impl CharacteristicDescriptor {
    /// Create a descriptor.
    pub fn new(service_uuid: Uuid, uuid: Uuid, properties: CharPropFlags) -> Self {
        Self {
            service_uuid,
            uuid,
            properties,
        }
    }

    /// Whether the characteristic accepts writes of either kind.
    pub fn is_writable(&self) -> bool {
        self.properties
            .intersects(CharPropFlags::WRITE | CharPropFlags::WRITE_WITHOUT_RESPONSE)
    }
}

/// The bound write characteristic of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteChannel {
    /// Service the characteristic belongs to.
    pub service_uuid: Uuid,
    /// Characteristic UUID.
    pub uuid: Uuid,
    /// Capability flags.
    pub properties: CharPropFlags,
}

impl WriteChannel {
    /// Whether unacknowledged writes are supported.
    pub fn supports_write_without_response(&self) -> bool {
        self.properties
            .contains(CharPropFlags::WRITE_WITHOUT_RESPONSE)
    }

    /// Write type to use: without response when available.
    pub fn preferred_write_type(&self) -> WriteType {
        if self.supports_write_without_response() {
            WriteType::WithoutResponse
        } else {
            WriteType::WithResponse
        }
    }
}

impl From<&CharacteristicDescriptor> for WriteChannel {
    fn from(descriptor: &CharacteristicDescriptor) -> Self {
        Self {
            service_uuid: descriptor.service_uuid,
            uuid: descriptor.uuid,
            properties: descriptor.properties,
        }
    }
}

/// First-match-wins binder for the write channel.
#[derive(Debug, Clone)]
pub struct CharacteristicResolver {
    mode: DiscoveryMode,
    bound: Option<WriteChannel>,
}

impl CharacteristicResolver {
    /// Create a resolver for a discovery mode.
    pub fn new(mode: DiscoveryMode) -> Self {
        Self { mode, bound: None }
    }

    /// The discovery mode.
    pub fn mode(&self) -> DiscoveryMode {
        self.mode
    }

    /// Offer a discovered characteristic. Returns `true` if it was bound.
    pub fn offer(&mut self, descriptor: &CharacteristicDescriptor) -> bool {
        if self.bound.is_some() {
            trace!("Write channel already bound, ignoring {}", descriptor.uuid);
            return false;
        }

        if self.mode == DiscoveryMode::Narrow && !is_candidate_service(&descriptor.service_uuid) {
            return false;
        }

        if !is_write_candidate(&descriptor.uuid) || !descriptor.is_writable() {
            return false;
        }

        debug!(
            "Bound write channel {} in service {}",
            descriptor.uuid, descriptor.service_uuid
        );
        self.bound = Some(WriteChannel::from(descriptor));
        true
    }

    /// The bound channel, if any.
    pub fn bound(&self) -> Option<&WriteChannel> {
        self.bound.as_ref()
    }

    /// Finish resolution.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ResolutionFailure`] if nothing was bound.
    pub fn resolve(self, identifier: &DeviceId) -> Result<WriteChannel> {
        self.bound.ok_or_else(|| Error::ResolutionFailure {
            identifier: identifier.to_string(),
        })
    }

    /// Offer every descriptor in order and finish resolution.
    pub fn resolve_all(
        mode: DiscoveryMode,
        identifier: &DeviceId,
        descriptors: &[CharacteristicDescriptor],
    ) -> Result<WriteChannel> {
        let mut resolver = Self::new(mode);
        for descriptor in descriptors {
            resolver.offer(descriptor);
        }
        resolver.resolve(identifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ble::uuids::*;

    fn descriptor(
        service: Uuid,
        uuid: Uuid,
        properties: CharPropFlags,
    ) -> CharacteristicDescriptor {
        CharacteristicDescriptor::new(service, uuid, properties)
    }

    #[test]
    fn test_first_match_wins() {
        let a = descriptor(ELK_SERVICE_UUID, ELK_WRITE_UUID, CharPropFlags::READ);
        let b = descriptor(LEDBLE_SERVICE_UUID, LEDBLE_WRITE_UUID, CharPropFlags::WRITE);
        let c = descriptor(
            TRIONES_SERVICE_UUID,
            TRIONES_WRITE_UUID,
            CharPropFlags::WRITE_WITHOUT_RESPONSE,
        );

        let mut resolver = CharacteristicResolver::new(DiscoveryMode::Broad);
        assert!(!resolver.offer(&a));
        assert!(resolver.offer(&b));
        assert!(!resolver.offer(&c));

        let channel = resolver.resolve(&DeviceId::new("AA")).unwrap();
        assert_eq!(channel.uuid, LEDBLE_WRITE_UUID);
        assert_eq!(channel.preferred_write_type(), WriteType::WithResponse);
    }

    #[test]
    fn test_no_candidate_is_resolution_failure() {
        let other = Uuid::from_u128(0x1234);
        let descriptors = [
            descriptor(other, other, CharPropFlags::WRITE),
            descriptor(ELK_SERVICE_UUID, ELK_NOTIFY_UUID, CharPropFlags::NOTIFY),
        ];

        let result = CharacteristicResolver::resolve_all(
            DiscoveryMode::Broad,
            &DeviceId::new("AA"),
            &descriptors,
        );
        assert!(matches!(
            result,
            Err(Error::ResolutionFailure { identifier }) if identifier == "AA"
        ));
    }

    #[test]
    fn test_narrow_mode_ignores_foreign_services() {
        let foreign = Uuid::from_u128(0x0000_1800_0000_1000_8000_00805f9b34fb);
        let stray = descriptor(foreign, ELK_WRITE_UUID, CharPropFlags::WRITE);
        let real = descriptor(
            ELK_SERVICE_UUID,
            ELK_WRITE_UUID,
            CharPropFlags::WRITE | CharPropFlags::WRITE_WITHOUT_RESPONSE,
        );

        let mut narrow = CharacteristicResolver::new(DiscoveryMode::Narrow);
        assert!(!narrow.offer(&stray));
        assert!(narrow.offer(&real));
        assert_eq!(narrow.bound().unwrap().service_uuid, ELK_SERVICE_UUID);
        assert_eq!(
            narrow.bound().unwrap().preferred_write_type(),
            WriteType::WithoutResponse
        );

        let mut broad = CharacteristicResolver::new(DiscoveryMode::Broad);
        assert!(broad.offer(&stray));
    }
}

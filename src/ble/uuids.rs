//! BLE Service and Characteristic UUIDs.
//!
//! Controllers in this family expose their command channel under one of a
//! few vendor service/characteristic pairs. The pairs are listed in
//! priority order.

use uuid::Uuid;

// ELK-BLEDOM / MELK
/// ELK-BLEDOM service UUID.
pub const ELK_SERVICE_UUID: Uuid = Uuid::from_u128(0x0000_fff0_0000_1000_8000_00805f9b34fb);
/// ELK-BLEDOM write characteristic UUID.
pub const ELK_WRITE_UUID: Uuid = Uuid::from_u128(0x0000_fff3_0000_1000_8000_00805f9b34fb);
/// ELK-BLEDOM notify characteristic UUID (not used for commands).
pub const ELK_NOTIFY_UUID: Uuid = Uuid::from_u128(0x0000_fff4_0000_1000_8000_00805f9b34fb);

// LEDBLE / HM-10 style modules
/// LEDBLE service UUID.
pub const LEDBLE_SERVICE_UUID: Uuid = Uuid::from_u128(0x0000_ffe0_0000_1000_8000_00805f9b34fb);
/// LEDBLE write characteristic UUID.
pub const LEDBLE_WRITE_UUID: Uuid = Uuid::from_u128(0x0000_ffe1_0000_1000_8000_00805f9b34fb);

// Triones / Lotus Lantern
/// Triones service UUID.
pub const TRIONES_SERVICE_UUID: Uuid = Uuid::from_u128(0x0000_ffd5_0000_1000_8000_00805f9b34fb);
/// Triones write characteristic UUID.
pub const TRIONES_WRITE_UUID: Uuid = Uuid::from_u128(0x0000_ffd9_0000_1000_8000_00805f9b34fb);

/// A known service/write-characteristic pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WriteCandidate {
    /// Service that hosts the characteristic.
    pub service: Uuid,
    /// The write characteristic.
    pub characteristic: Uuid,
}

/// Known write channels, highest priority first.
pub const WRITE_CANDIDATES: [WriteCandidate; 3] = [
    WriteCandidate {
        service: ELK_SERVICE_UUID,
        characteristic: ELK_WRITE_UUID,
    },
    WriteCandidate {
        service: LEDBLE_SERVICE_UUID,
        characteristic: LEDBLE_WRITE_UUID,
    },
    WriteCandidate {
        service: TRIONES_SERVICE_UUID,
        characteristic: TRIONES_WRITE_UUID,
    },
];

/// Check if a service UUID hosts a known write channel.
pub fn is_candidate_service(uuid: &Uuid) -> bool {
    WRITE_CANDIDATES.iter().any(|c| c.service == *uuid)
}

/// Check if a characteristic UUID is a known write channel.
pub fn is_write_candidate(uuid: &Uuid) -> bool {
    WRITE_CANDIDATES.iter().any(|c| c.characteristic == *uuid)
}

/// Priority rank of a service (0 is highest), if it is a candidate.
pub fn service_priority(uuid: &Uuid) -> Option<usize> {
    WRITE_CANDIDATES.iter().position(|c| c.service == *uuid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uuid_format() {
        assert!(ELK_SERVICE_UUID.to_string().contains("fff0"));
        assert!(ELK_WRITE_UUID.to_string().contains("fff3"));
        assert!(TRIONES_WRITE_UUID.to_string().contains("ffd9"));
    }

    #[test]
    fn test_is_write_candidate() {
        assert!(is_write_candidate(&ELK_WRITE_UUID));
        assert!(is_write_candidate(&LEDBLE_WRITE_UUID));
        assert!(!is_write_candidate(&ELK_NOTIFY_UUID));
        assert!(!is_write_candidate(&ELK_SERVICE_UUID));
    }

    #[test]
    fn test_service_priority() {
        assert_eq!(service_priority(&ELK_SERVICE_UUID), Some(0));
        assert_eq!(service_priority(&TRIONES_SERVICE_UUID), Some(2));
        assert_eq!(service_priority(&ELK_WRITE_UUID), None);
        assert!(is_candidate_service(&LEDBLE_SERVICE_UUID));
    }
}

//! Command dispatch.
//!
//! [`CommandDispatcher`] turns a [`Command`] into bytes and writes them to
//! the bound characteristic of the current connection. Nothing is queued:
//! a command submitted while no link is ready fails with
//! [`Error::NotReady`] and is gone.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{info, warn};

use crate::ble::connection::ActiveLink;
use crate::ble::device::DeviceId;
use crate::ble::transport::BleTransport;
use crate::error::{Error, Result};
use crate::protocol::{Command, Frame, ProtocolCodec};
use crate::utils::parse_hex;

/// Number of writes kept in the in-memory audit trail.
pub const AUDIT_CAPACITY: usize = 64;

/// Source of the link commands are written to.
pub trait LinkProvider: Send + Sync {
    /// The current link.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotReady`] when not connected with a bound channel.
    fn active_link(&self) -> Result<ActiveLink>;
}

/// A write that reached the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEntry {
    /// When the write completed.
    pub at: DateTime<Utc>,
    /// Target device.
    pub identifier: DeviceId,
    /// Bytes as spaced upper-case hex.
    pub hex: String,
}

/// Encodes commands and writes them over the active link.
#[derive(Clone)]
pub struct CommandDispatcher {
    transport: Arc<dyn BleTransport>,
    links: Arc<dyn LinkProvider>,
    codec: ProtocolCodec,
    audit: Arc<RwLock<VecDeque<AuditEntry>>>,
}

impl CommandDispatcher {
    /// Create a dispatcher.
    pub fn new(
        transport: Arc<dyn BleTransport>,
        links: Arc<dyn LinkProvider>,
        codec: ProtocolCodec,
    ) -> Self {
        Self {
            transport,
            links,
            codec,
            audit: Arc::new(RwLock::new(VecDeque::with_capacity(AUDIT_CAPACITY))),
        }
    }

    /// The codec used for encoding.
    pub fn codec(&self) -> &ProtocolCodec {
        &self.codec
    }

    /// Encode and send a command as a single write.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotReady`] if not connected (nothing is written),
    /// or [`Error::WriteFailed`] if the transport rejects the write.
    pub async fn submit(&self, command: &Command) -> Result<()> {
        let link = match self.links.active_link() {
            Ok(link) => link,
            Err(e) => {
                warn!("Dropping {} command: {}", command.kind(), e);
                return Err(e);
            }
        };

        let frame = self.codec.encode(command);
        self.write_frame(&link, frame).await
    }

    /// Parse user-supplied hex and send it unframed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidEncoding`] for malformed hex, before anything
    /// is written. Otherwise as [`CommandDispatcher::submit`].
    pub async fn submit_hex(&self, input: &str) -> Result<()> {
        let bytes = parse_hex(input)?;
        self.submit(&Command::RawBytes(bytes)).await
    }

    /// The most recent writes, oldest first.
    pub fn recent_writes(&self) -> Vec<AuditEntry> {
        self.audit.read().iter().cloned().collect()
    }

    async fn write_frame(&self, link: &ActiveLink, frame: Frame) -> Result<()> {
        let hex = frame.to_hex();
        let write_type = link.channel.preferred_write_type();

        if let Err(e) = self
            .transport
            .write(&link.identifier, &link.channel, frame.into_bytes(), write_type)
            .await
        {
            warn!("Write of [{}] to {} failed: {}", hex, link.identifier, e);
            return Err(match e {
                Error::WriteFailed { .. } => e,
                other => Error::WriteFailed {
                    reason: other.to_string(),
                },
            });
        }

        info!(
            target: "bledom_rust_ble::audit",
            device = %link.identifier,
            write_type = ?write_type,
            "TX {}",
            hex
        );

        let mut audit = self.audit.write();
        if audit.len() == AUDIT_CAPACITY {
            audit.pop_front();
        }
        audit.push_back(AuditEntry {
            at: Utc::now(),
            identifier: link.identifier.clone(),
            hex,
        });

        Ok(())
    }
}

impl std::fmt::Debug for CommandDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandDispatcher")
            .field("codec", &self.codec)
            .field("audit_len", &self.audit.read().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ble::connection::{ConnectionState, SessionId};
    use crate::ble::resolver::WriteChannel;
    use crate::ble::transport::MockBleTransport;
    use crate::ble::uuids::{ELK_SERVICE_UUID, ELK_WRITE_UUID};
    use crate::protocol::ProtocolVariant;
    use btleplug::api::{CharPropFlags, WriteType};
    use pretty_assertions::assert_eq;

    struct NotConnected(ConnectionState);

    impl LinkProvider for NotConnected {
        fn active_link(&self) -> Result<ActiveLink> {
            Err(Error::NotReady { state: self.0 })
        }
    }

    struct Linked(ActiveLink);

    impl LinkProvider for Linked {
        fn active_link(&self) -> Result<ActiveLink> {
            Ok(self.0.clone())
        }
    }

    fn link(properties: CharPropFlags) -> Linked {
        Linked(ActiveLink {
            identifier: DeviceId::new("AA"),
            channel: WriteChannel {
                service_uuid: ELK_SERVICE_UUID,
                uuid: ELK_WRITE_UUID,
                properties,
            },
            session: SessionId::new(1),
        })
    }

    fn dispatcher(
        transport: MockBleTransport,
        links: impl LinkProvider + 'static,
    ) -> CommandDispatcher {
        CommandDispatcher::new(Arc::new(transport), Arc::new(links), ProtocolCodec::default())
    }

    #[tokio::test]
    async fn test_not_ready_performs_no_write() {
        let mut transport = MockBleTransport::new();
        transport.expect_write().times(0);

        let dispatcher = dispatcher(transport, NotConnected(ConnectionState::Idle));
        let result = dispatcher.submit(&Command::Power(true)).await;

        assert!(matches!(result, Err(Error::NotReady { state: ConnectionState::Idle })));
        assert!(dispatcher.recent_writes().is_empty());
    }

    #[tokio::test]
    async fn test_submit_prefers_write_without_response() {
        let mut transport = MockBleTransport::new();
        transport
            .expect_write()
            .withf(|identifier, channel, data, write_type| {
                identifier.as_str() == "AA"
                    && channel.uuid == ELK_WRITE_UUID
                    && data == &vec![0x7E, 0x04, 0x04, 0x01, 0x00, 0x00, 0x00, 0x00, 0xEF]
                    && *write_type == WriteType::WithoutResponse
            })
            .times(1)
            .returning(|_, _, _, _| Ok(()));

        let dispatcher = dispatcher(
            transport,
            link(CharPropFlags::WRITE | CharPropFlags::WRITE_WITHOUT_RESPONSE),
        );
        dispatcher.submit(&Command::Power(true)).await.unwrap();

        let writes = dispatcher.recent_writes();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].hex, "7E 04 04 01 00 00 00 00 EF");
        assert_eq!(writes[0].identifier, DeviceId::new("AA"));
    }

    #[tokio::test]
    async fn test_submit_falls_back_to_acknowledged_write() {
        let mut transport = MockBleTransport::new();
        transport
            .expect_write()
            .withf(|_, _, _, write_type| *write_type == WriteType::WithResponse)
            .times(1)
            .returning(|_, _, _, _| Ok(()));

        let dispatcher = dispatcher(transport, link(CharPropFlags::WRITE));
        assert!(dispatcher.submit(&Command::Brightness(128)).await.is_ok());
    }

    #[tokio::test]
    async fn test_encoding_follows_variant() {
        let mut transport = MockBleTransport::new();
        transport
            .expect_write()
            .withf(|_, _, data, _| data[1] == 0x00 && data[3] == 100)
            .times(1)
            .returning(|_, _, _, _| Ok(()));

        let dispatcher = CommandDispatcher::new(
            Arc::new(transport),
            Arc::new(link(CharPropFlags::WRITE)),
            ProtocolCodec::new(ProtocolVariant::ELK_BLE),
        );
        dispatcher.submit(&Command::Brightness(255)).await.unwrap();
    }

    #[tokio::test]
    async fn test_submit_hex() {
        let mut transport = MockBleTransport::new();
        transport
            .expect_write()
            .withf(|_, _, data, _| {
                data == &vec![0x7E, 0x04, 0x01, 0xFF, 0x00, 0x00, 0x00, 0x00, 0xEF]
            })
            .times(1)
            .returning(|_, _, _, _| Ok(()));

        let dispatcher = dispatcher(transport, link(CharPropFlags::WRITE));
        dispatcher
            .submit_hex("7e 04 01 ff 00 00 00 00 ef")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_malformed_hex_is_rejected_before_writing() {
        let mut transport = MockBleTransport::new();
        transport.expect_write().times(0);

        let dispatcher = dispatcher(transport, link(CharPropFlags::WRITE));
        for input in ["7E,04", "7E0", "zz"] {
            let result = dispatcher.submit_hex(input).await;
            assert!(matches!(result, Err(Error::InvalidEncoding { .. })), "{}", input);
        }
    }

    #[tokio::test]
    async fn test_write_failure_is_reported() {
        let mut transport = MockBleTransport::new();
        transport.expect_write().times(1).returning(|_, _, _, _| {
            Err(Error::LinkFailure {
                reason: "gone".to_string(),
            })
        });

        let dispatcher = dispatcher(transport, link(CharPropFlags::WRITE));
        let result = dispatcher.submit(&Command::Speed(10)).await;

        assert!(matches!(result, Err(Error::WriteFailed { .. })));
        assert!(dispatcher.recent_writes().is_empty());
    }

    #[tokio::test]
    async fn test_audit_trail_is_bounded() {
        let mut transport = MockBleTransport::new();
        transport.expect_write().returning(|_, _, _, _| Ok(()));

        let dispatcher = dispatcher(transport, link(CharPropFlags::WRITE));
        for value in 0..(AUDIT_CAPACITY as i32 + 10) {
            dispatcher.submit(&Command::Speed(value)).await.unwrap();
        }

        let writes = dispatcher.recent_writes();
        assert_eq!(writes.len(), AUDIT_CAPACITY);
        assert_eq!(writes[0].hex, "7E 04 02 0A 00 00 00 00 EF");
    }
}

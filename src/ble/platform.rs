//! [`BleTransport`] over btleplug.

use async_trait::async_trait;
use btleplug::api::{
    Central, CentralEvent, CentralState, Characteristic, Manager as _, Peripheral as _,
    ScanFilter, WriteType,
};
use btleplug::platform::{Adapter, Manager, Peripheral, PeripheralId};
use futures::stream::StreamExt;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, error, info, trace, warn};

use crate::ble::device::{Device, DeviceId};
use crate::ble::resolver::{CharacteristicDescriptor, DiscoveryMode, WriteChannel};
use crate::ble::transport::{BleTransport, TransportEvent};
use crate::ble::uuids::{is_candidate_service, service_priority};
use crate::error::{Error, Result};

type PeripheralCache = Arc<RwLock<HashMap<DeviceId, Peripheral>>>;

/// BLE central backed by the first system adapter.
pub struct BtleplugTransport {
    /// The BLE adapter.
    adapter: Adapter,
    /// Peripherals seen so far, by identifier.
    peripherals: PeripheralCache,
    /// Whether advertisements are forwarded.
    is_scanning: Arc<RwLock<bool>>,
    /// Channel for transport events.
    event_tx: broadcast::Sender<TransportEvent>,
    /// Handle to the central event pump.
    pump_handle: Option<tokio::task::JoinHandle<()>>,
}

impl BtleplugTransport {
    /// Open the first Bluetooth adapter.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AdapterUnavailable`] if there is no usable adapter.
    pub async fn new() -> Result<Self> {
        let manager = Manager::new()
            .await
            .map_err(|_e| Error::AdapterUnavailable)?;

        let adapters = manager.adapters().await.map_err(map_btleplug)?;

        let adapter = adapters
            .into_iter()
            .next()
            .ok_or(Error::AdapterUnavailable)?;

        info!(
            "Using Bluetooth adapter: {:?}",
            adapter.adapter_info().await.ok()
        );

        Ok(Self::with_adapter(adapter))
    }

    /// Wrap a specific adapter. Must be called inside a tokio runtime.
    pub fn with_adapter(adapter: Adapter) -> Self {
        let (event_tx, _) = broadcast::channel(100);
        let peripherals: PeripheralCache = Arc::new(RwLock::new(HashMap::new()));
        let is_scanning = Arc::new(RwLock::new(false));

        let pump_handle = {
            let adapter = adapter.clone();
            let peripherals = peripherals.clone();
            let is_scanning = is_scanning.clone();
            let event_tx = event_tx.clone();

            tokio::spawn(async move {
                let mut events = match adapter.events().await {
                    Ok(events) => events,
                    Err(e) => {
                        error!("Failed to get adapter events: {}", e);
                        return;
                    }
                };

                while let Some(event) = events.next().await {
                    Self::handle_event(event, &adapter, &peripherals, &is_scanning, &event_tx)
                        .await;
                }

                debug!("Central event pump ended");
            })
        };

        Self {
            adapter,
            peripherals,
            is_scanning,
            event_tx,
            pump_handle: Some(pump_handle),
        }
    }

    /// Get the underlying adapter.
    pub fn adapter(&self) -> &Adapter {
        &self.adapter
    }

    /// Handle a BLE central event.
    async fn handle_event(
        event: CentralEvent,
        adapter: &Adapter,
        peripherals: &PeripheralCache,
        is_scanning: &Arc<RwLock<bool>>,
        event_tx: &broadcast::Sender<TransportEvent>,
    ) {
        match event {
            CentralEvent::DeviceDiscovered(id) | CentralEvent::DeviceUpdated(id) => {
                trace!("Device seen: {:?}", id);
                if *is_scanning.read() {
                    Self::process_peripheral(adapter, id, peripherals, event_tx).await;
                }
            }
            CentralEvent::DeviceDisconnected(id) => {
                debug!("Device disconnected: {:?}", id);
                let _ = event_tx.send(TransportEvent::Disconnected(DeviceId::new(id.to_string())));
            }
            CentralEvent::StateUpdate(state) => {
                let powered = matches!(state, CentralState::PoweredOn);
                info!("Adapter state changed: {:?}", state);
                let _ = event_tx.send(TransportEvent::AdapterState { powered });
            }
            _ => {}
        }
    }

    /// Cache a peripheral and forward its advertisement.
    async fn process_peripheral(
        adapter: &Adapter,
        id: PeripheralId,
        peripherals: &PeripheralCache,
        event_tx: &broadcast::Sender<TransportEvent>,
    ) {
        let peripheral = match adapter.peripheral(&id).await {
            Ok(p) => p,
            Err(e) => {
                trace!("Failed to get peripheral: {}", e);
                return;
            }
        };

        let properties = match peripheral.properties().await {
            Ok(Some(p)) => p,
            _ => return,
        };

        let identifier = DeviceId::new(id.to_string());
        let device = Device::new(
            identifier.clone(),
            properties.local_name,
            properties.rssi.unwrap_or(i16::MIN),
        );

        peripherals.write().insert(identifier, peripheral);

        let _ = event_tx.send(TransportEvent::Advertisement(device));
    }

    /// Look up a cached peripheral.
    fn peripheral(&self, identifier: &DeviceId) -> Result<Peripheral> {
        self.peripherals
            .read()
            .get(identifier)
            .cloned()
            .ok_or_else(|| Error::DeviceNotFound {
                identifier: identifier.to_string(),
            })
    }

    /// Find a peripheral by identifier, asking the adapter if it is not cached.
    async fn find_peripheral(&self, identifier: &DeviceId) -> Result<Peripheral> {
        if let Ok(peripheral) = self.peripheral(identifier) {
            return Ok(peripheral);
        }

        let peripherals = self.adapter.peripherals().await.map_err(map_btleplug)?;
        let found = peripherals
            .into_iter()
            .find(|p| p.id().to_string() == identifier.as_str())
            .ok_or_else(|| Error::DeviceNotFound {
                identifier: identifier.to_string(),
            })?;

        self.peripherals
            .write()
            .insert(identifier.clone(), found.clone());
        Ok(found)
    }
}

/// Order and filter discovered characteristics for a discovery mode.
fn collect_descriptors<I>(characteristics: I, mode: DiscoveryMode) -> Vec<CharacteristicDescriptor>
where
    I: IntoIterator<Item = Characteristic>,
{
    let mut descriptors: Vec<CharacteristicDescriptor> = characteristics
        .into_iter()
        .map(|c| CharacteristicDescriptor::new(c.service_uuid, c.uuid, c.properties))
        .collect();

    if mode == DiscoveryMode::Narrow {
        descriptors.retain(|d| is_candidate_service(&d.service_uuid));
        descriptors.sort_by_key(|d| service_priority(&d.service_uuid));
    }

    descriptors
}

fn map_btleplug(e: btleplug::Error) -> Error {
    match e {
        btleplug::Error::PermissionDenied => Error::AdapterUnavailable,
        other => Error::Bluetooth(other),
    }
}

#[async_trait]
impl BleTransport for BtleplugTransport {
    async fn start_scan(&self) -> Result<()> {
        info!("Starting BLE scan");

        self.adapter
            .start_scan(ScanFilter::default())
            .await
            .map_err(map_btleplug)?;

        *self.is_scanning.write() = true;
        Ok(())
    }

    async fn stop_scan(&self) -> Result<()> {
        if !*self.is_scanning.read() {
            debug!("Not scanning, ignoring stop request");
            return Ok(());
        }

        info!("Stopping BLE scan");
        *self.is_scanning.write() = false;
        self.adapter.stop_scan().await.map_err(map_btleplug)
    }

    async fn connect(&self, identifier: &DeviceId) -> Result<()> {
        let peripheral = self.find_peripheral(identifier).await?;

        if peripheral.is_connected().await.unwrap_or(false) {
            debug!("{} already connected at BLE level", identifier);
            return Ok(());
        }

        peripheral.connect().await.map_err(|e| match e {
            btleplug::Error::PermissionDenied => Error::AdapterUnavailable,
            other => Error::LinkFailure {
                reason: other.to_string(),
            },
        })
    }

    async fn discover(
        &self,
        identifier: &DeviceId,
        mode: DiscoveryMode,
    ) -> Result<Vec<CharacteristicDescriptor>> {
        let peripheral = self.peripheral(identifier)?;

        peripheral
            .discover_services()
            .await
            .map_err(|e| Error::LinkFailure {
                reason: format!("service discovery failed: {}", e),
            })?;

        let descriptors = collect_descriptors(peripheral.characteristics(), mode);
        debug!(
            "Discovered {} characteristics on {} ({:?})",
            descriptors.len(),
            identifier,
            mode
        );
        Ok(descriptors)
    }

    async fn write(
        &self,
        identifier: &DeviceId,
        channel: &WriteChannel,
        data: Vec<u8>,
        write_type: WriteType,
    ) -> Result<()> {
        let peripheral = self.peripheral(identifier)?;

        let characteristic = peripheral
            .characteristics()
            .into_iter()
            .find(|c| c.uuid == channel.uuid && c.service_uuid == channel.service_uuid)
            .ok_or_else(|| Error::WriteFailed {
                reason: format!("characteristic {} not found", channel.uuid),
            })?;

        peripheral
            .write(&characteristic, &data, write_type)
            .await
            .map_err(|e| Error::WriteFailed {
                reason: e.to_string(),
            })?;

        trace!("Wrote {} bytes to {}", data.len(), channel.uuid);
        Ok(())
    }

    async fn disconnect(&self, identifier: &DeviceId) -> Result<()> {
        let peripheral = self.peripheral(identifier)?;

        if let Err(e) = peripheral.disconnect().await {
            warn!("Failed to disconnect {}: {}", identifier, e);
            return Err(map_btleplug(e));
        }

        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<TransportEvent> {
        self.event_tx.subscribe()
    }
}

impl Drop for BtleplugTransport {
    fn drop(&mut self) {
        if let Some(handle) = self.pump_handle.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ble::uuids::*;
    use btleplug::api::CharPropFlags;
    use std::collections::BTreeSet;

    fn characteristic(service_uuid: uuid::Uuid, uuid: uuid::Uuid) -> Characteristic {
        Characteristic {
            uuid,
            service_uuid,
            properties: CharPropFlags::WRITE,
            descriptors: BTreeSet::new(),
        }
    }

    #[test]
    fn test_narrow_collection_orders_by_priority() {
        let foreign = uuid::Uuid::from_u128(0x0000_180a_0000_1000_8000_00805f9b34fb);
        let characteristics = vec![
            characteristic(foreign, foreign),
            characteristic(TRIONES_SERVICE_UUID, TRIONES_WRITE_UUID),
            characteristic(ELK_SERVICE_UUID, ELK_WRITE_UUID),
        ];

        let narrow = collect_descriptors(characteristics.clone(), DiscoveryMode::Narrow);
        let uuids: Vec<_> = narrow.iter().map(|d| d.uuid).collect();
        assert_eq!(uuids, vec![ELK_WRITE_UUID, TRIONES_WRITE_UUID]);

        let broad = collect_descriptors(characteristics, DiscoveryMode::Broad);
        assert_eq!(broad.len(), 3);
        assert_eq!(broad[0].uuid, foreign);
    }
}

//! Device controller for discovering and driving a single LED controller.
//!
//! [`DeviceController`] owns the [`ConnectionStateMachine`] and executes
//! its effects against a [`BleTransport`]. User actions, transport
//! completions, radio events and timer expiries are all posted to one
//! queue and applied by a single task, so transitions never interleave.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::ble::connection::{
    ActiveLink, ConnectionState, ConnectionStateMachine, ConnectionStatus, Effect, Event,
};
use crate::ble::device::{Device, DeviceId};
use crate::ble::transport::{BleTransport, TransportEvent};
use crate::config::ControllerConfig;
use crate::data::store::{load_last_device, save_last_device, Store};
use crate::dispatcher::{CommandDispatcher, LinkProvider};
use crate::error::{Error, Result};
use crate::protocol::{Command, ProtocolCodec};

/// Callback handle for unregistering callbacks.
///
/// The callback is unregistered when the handle is dropped.
pub struct CallbackHandle {
    id: u64,
    unregister_fn: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl CallbackHandle {
    pub(crate) fn new(id: u64, unregister_fn: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            id,
            unregister_fn: Some(Box::new(unregister_fn)),
        }
    }

    /// Unregister this callback.
    pub fn unregister(mut self) {
        if let Some(f) = self.unregister_fn.take() {
            f();
        }
    }

    /// Get the callback ID.
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Drop for CallbackHandle {
    fn drop(&mut self) {
        if let Some(f) = self.unregister_fn.take() {
            f();
        }
    }
}

/// State shared between the controller handle and its tasks.
struct ControllerInner {
    /// Radio.
    transport: Arc<dyn BleTransport>,
    /// Persistence.
    store: Arc<dyn Store>,
    /// The only copy of the connection state.
    machine: Mutex<ConnectionStateMachine>,
    /// Event queue feeding the event loop.
    events_tx: mpsc::UnboundedSender<Event>,
    /// Status change channel.
    status_tx: broadcast::Sender<ConnectionStatus>,
    /// Armed retry timer.
    retry_timer: Mutex<Option<JoinHandle<()>>>,
    /// Armed scan window timer.
    scan_timer: Mutex<Option<JoinHandle<()>>>,
    /// Settings.
    config: ControllerConfig,
}

impl ControllerInner {
    fn post(&self, event: Event) -> Result<()> {
        self.events_tx
            .send(event)
            .map_err(|_| Error::Internal("controller event loop stopped".to_string()))
    }

    /// Apply one event and execute the resulting effects.
    async fn process(self: &Arc<Self>, event: Event, dispatcher: &CommandDispatcher) {
        let (effects, status) = {
            let mut machine = self.machine.lock();
            let before = machine.status().clone();
            let effects = machine.handle(event);
            let after = machine.status().clone();
            (effects, (before != after).then_some(after))
        };

        if let Some(status) = status {
            debug!("Status: {}", status);
            let _ = self.status_tx.send(status);
        }

        for effect in effects {
            self.execute(effect, dispatcher).await;
        }
    }

    async fn execute(self: &Arc<Self>, effect: Effect, dispatcher: &CommandDispatcher) {
        match effect {
            Effect::StartScan => match self.transport.start_scan().await {
                Ok(()) => {
                    if let Some(window) = self.config.scan_duration {
                        self.arm(&self.scan_timer, window, Event::ScanElapsed);
                    }
                }
                Err(e) => {
                    error!("Failed to start scan: {}", e);
                    let _ = self.post(Event::ScanFailed {
                        reason: e.to_string(),
                    });
                }
            },
            Effect::StopScan => {
                disarm(&self.scan_timer);
                if let Err(e) = self.transport.stop_scan().await {
                    warn!("Failed to stop scan: {}", e);
                }
            }
            Effect::Connect {
                session,
                identifier,
            } => {
                let inner = self.clone();
                tokio::spawn(async move {
                    let event = match inner.transport.connect(&identifier).await {
                        Ok(()) => Event::LinkEstablished { session },
                        Err(Error::DeviceNotFound { .. }) => Event::DeviceMissing { session },
                        Err(e) => Event::LinkFailed {
                            session,
                            reason: e.to_string(),
                        },
                    };
                    let _ = inner.post(event);
                });
            }
            Effect::Discover {
                session,
                identifier,
                mode,
            } => {
                let inner = self.clone();
                tokio::spawn(async move {
                    let event = match inner.transport.discover(&identifier, mode).await {
                        Ok(characteristics) => Event::ServicesDiscovered {
                            session,
                            characteristics,
                        },
                        Err(e) => Event::LinkFailed {
                            session,
                            reason: e.to_string(),
                        },
                    };
                    let _ = inner.post(event);
                });
            }
            // Awaited so a following connect to the same device starts after it.
            Effect::Disconnect { identifier } => {
                if let Err(e) = self.transport.disconnect(&identifier).await {
                    debug!("Disconnect of {} failed: {}", identifier, e);
                }
            }
            Effect::ScheduleRetry { token, delay } => {
                debug!("Retry armed for {:?}", delay);
                self.arm(&self.retry_timer, delay, Event::RetryElapsed { token });
            }
            Effect::CancelRetry => disarm(&self.retry_timer),
            Effect::PersistLastDevice(identifier) => {
                if let Err(e) = save_last_device(self.store.as_ref(), identifier.as_ref()).await {
                    warn!("Failed to persist last device: {}", e);
                }
            }
            Effect::Probe { identifier, .. } => {
                info!("Probing {} with power on", identifier);
                let dispatcher = dispatcher.clone();
                tokio::spawn(async move {
                    if let Err(e) = dispatcher.submit(&Command::power_on()).await {
                        warn!("Probe command failed: {}", e);
                    }
                });
            }
        }
    }

    /// Post `event` after `delay`, replacing whatever the slot held.
    fn arm(&self, slot: &Mutex<Option<JoinHandle<()>>>, delay: Duration, event: Event) {
        let events_tx = self.events_tx.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events_tx.send(event);
        });

        if let Some(previous) = slot.lock().replace(handle) {
            previous.abort();
        }
    }
}

fn disarm(slot: &Mutex<Option<JoinHandle<()>>>) {
    if let Some(handle) = slot.lock().take() {
        handle.abort();
    }
}

impl LinkProvider for ControllerInner {
    fn active_link(&self) -> Result<ActiveLink> {
        self.machine.lock().active_link()
    }
}

/// Central controller for one LED strip.
pub struct DeviceController {
    /// Shared state.
    inner: Arc<ControllerInner>,
    /// Command path bound to this controller's link.
    dispatcher: CommandDispatcher,
    /// Callback ID counter.
    callback_counter: AtomicU64,
    /// Event loop and transport forwarder.
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl DeviceController {
    /// Create a controller.
    ///
    /// The last connected device is read from `store` so that
    /// [`DeviceController::start`] can reconnect to it directly.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub async fn new(
        transport: Arc<dyn BleTransport>,
        store: Arc<dyn Store>,
        config: ControllerConfig,
    ) -> Result<Self> {
        let last_device = load_last_device(store.as_ref()).await?;
        if let Some(identifier) = &last_device {
            info!("Last connected device: {}", identifier);
        }

        let machine = ConnectionStateMachine::new(&config, last_device);
        let codec = ProtocolCodec::new(config.protocol_variant);

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (status_tx, _) = broadcast::channel(32);

        let inner = Arc::new(ControllerInner {
            transport: transport.clone(),
            store,
            machine: Mutex::new(machine),
            events_tx,
            status_tx,
            retry_timer: Mutex::new(None),
            scan_timer: Mutex::new(None),
            config,
        });

        let links: Arc<dyn LinkProvider> = inner.clone();
        let dispatcher = CommandDispatcher::new(transport.clone(), links, codec);

        // Subscribe before anything can be emitted.
        let transport_rx = transport.subscribe();

        let event_loop = tokio::spawn(Self::run(inner.clone(), dispatcher.clone(), events_rx));
        let forwarder = tokio::spawn(Self::forward(inner.clone(), transport_rx));

        Ok(Self {
            inner,
            dispatcher,
            callback_counter: AtomicU64::new(0),
            tasks: Mutex::new(vec![event_loop, forwarder]),
        })
    }

    async fn run(
        inner: Arc<ControllerInner>,
        dispatcher: CommandDispatcher,
        mut events_rx: mpsc::UnboundedReceiver<Event>,
    ) {
        while let Some(event) = events_rx.recv().await {
            inner.process(event, &dispatcher).await;
        }

        debug!("Controller event loop ended");
    }

    async fn forward(
        inner: Arc<ControllerInner>,
        mut transport_rx: broadcast::Receiver<TransportEvent>,
    ) {
        loop {
            let event = match transport_rx.recv().await {
                Ok(TransportEvent::Advertisement(device)) => Event::Advertisement { device },
                Ok(TransportEvent::Disconnected(identifier)) => Event::LinkLost { identifier },
                Ok(TransportEvent::AdapterState { powered }) => {
                    Event::AdapterStateChanged { powered }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Dropped {} transport events", skipped);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            };

            if inner.post(event).is_err() {
                break;
            }
        }

        debug!("Transport forwarder ended");
    }

    /// Reconnect to the last device, or scan if there is none.
    pub fn start(&self) -> Result<()> {
        self.inner.post(Event::StartRequested)
    }

    /// Start a fresh scan.
    pub fn scan(&self) -> Result<()> {
        self.inner.post(Event::ScanRequested)
    }

    /// Connect to a device, typically one from [`DeviceController::discovered_devices`].
    pub fn connect(&self, identifier: impl Into<DeviceId>) -> Result<()> {
        self.inner.post(Event::ConnectRequested {
            identifier: identifier.into(),
        })
    }

    /// Disconnect and forget the last device.
    pub fn disconnect(&self) -> Result<()> {
        self.inner.post(Event::DisconnectRequested)
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        self.inner.machine.lock().state()
    }

    /// Current status.
    pub fn status(&self) -> ConnectionStatus {
        self.inner.machine.lock().status().clone()
    }

    /// Consecutive failed attempts.
    pub fn reconnect_attempt(&self) -> u32 {
        self.inner.machine.lock().reconnect_attempt()
    }

    /// Candidates from the current scan, strongest first.
    pub fn discovered_devices(&self) -> Vec<Device> {
        self.inner.machine.lock().discovered().as_slice().to_vec()
    }

    /// Device used for auto-reconnect.
    pub fn last_device(&self) -> Option<DeviceId> {
        self.inner.machine.lock().last_device().cloned()
    }

    /// Device being connected to or connected.
    pub fn target(&self) -> Option<Device> {
        self.inner.machine.lock().target().cloned()
    }

    /// Command path for this controller.
    pub fn dispatcher(&self) -> &CommandDispatcher {
        &self.dispatcher
    }

    /// Encode and send a command.
    pub async fn send(&self, command: &Command) -> Result<()> {
        self.dispatcher.submit(command).await
    }

    /// The persistence collaborator.
    pub fn store(&self) -> &Arc<dyn Store> {
        &self.inner.store
    }

    /// Subscribe to status changes.
    pub fn subscribe_status(&self) -> broadcast::Receiver<ConnectionStatus> {
        self.inner.status_tx.subscribe()
    }

    /// Register a callback for status changes.
    pub fn on_status_changed<F>(&self, callback: F) -> CallbackHandle
    where
        F: Fn(ConnectionStatus) + Send + Sync + 'static,
    {
        let callback_id = self.callback_counter.fetch_add(1, Ordering::SeqCst);
        let mut rx = self.inner.status_tx.subscribe();

        let handle = tokio::spawn(async move {
            while let Ok(status) = rx.recv().await {
                callback(status);
            }
        });

        CallbackHandle::new(callback_id, move || {
            handle.abort();
        })
    }

    /// Stop background work and release the radio.
    ///
    /// Unlike [`DeviceController::disconnect`], the last device is kept so
    /// the next session reconnects to it.
    pub async fn shutdown(&self) -> Result<()> {
        info!("Shutting down device controller");

        for handle in self.tasks.lock().drain(..) {
            handle.abort();
        }
        disarm(&self.inner.retry_timer);
        disarm(&self.inner.scan_timer);

        let (state, target) = {
            let machine = self.inner.machine.lock();
            (machine.state(), machine.target().map(|t| t.identifier.clone()))
        };

        if state == ConnectionState::Scanning {
            self.inner.transport.stop_scan().await?;
        }

        if matches!(state, ConnectionState::Connecting | ConnectionState::Connected) {
            if let Some(identifier) = target {
                self.inner.transport.disconnect(&identifier).await?;
            }
        }

        Ok(())
    }
}

impl Drop for DeviceController {
    fn drop(&mut self) {
        for handle in self.tasks.lock().drain(..) {
            handle.abort();
        }
        disarm(&self.inner.retry_timer);
        disarm(&self.inner.scan_timer);
    }
}

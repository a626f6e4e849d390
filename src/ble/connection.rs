//! Connection lifecycle.
//!
//! [`ConnectionStateMachine`] is a pure transition function: radio
//! callbacks, timer expiries and user actions arrive as [`Event`]s, and the
//! machine answers with [`Effect`]s for the caller to execute. It performs
//! no I/O itself, so every transition is testable without a radio.
//!
//! Connection attempts are tagged with a [`SessionId`] and retry timers with
//! a [`RetryToken`]. Completions carrying an outdated tag are dropped, so a
//! callback from a cancelled attempt can never be applied to a newer one.
//! Disconnect reports carry no tag; they only count once the current
//! session's link has come up.

use std::time::Duration;
use tracing::{debug, info, warn};

use crate::ble::device::{Device, DeviceId};
use crate::ble::filter::{DeviceFilter, DiscoveredDevices};
use crate::ble::resolver::{
    CharacteristicDescriptor, CharacteristicResolver, DiscoveryMode, WriteChannel,
};
use crate::config::ControllerConfig;
use crate::error::{Error, Result};

/// Connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    /// Nothing in progress.
    #[default]
    Idle,
    /// Looking for controllers.
    Scanning,
    /// Establishing a link and resolving the write channel.
    Connecting,
    /// Ready to send commands.
    Connected,
    /// Waiting to retry after a failure.
    Reconnecting,
    /// Retries exhausted. Needs a user action.
    Failed,
}

impl ConnectionState {
    /// Check if connected.
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Check if a link or retry is in progress.
    pub fn is_transitioning(&self) -> bool {
        matches!(self, Self::Connecting | Self::Reconnecting)
    }

    /// Check if the radio is in use.
    pub fn is_active(&self) -> bool {
        !matches!(self, Self::Idle | Self::Failed)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Scanning => write!(f, "Scanning"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Connected => write!(f, "Connected"),
            Self::Reconnecting => write!(f, "Reconnecting"),
            Self::Failed => write!(f, "Failed"),
        }
    }
}

/// Human-readable connection status.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    /// Nothing in progress.
    #[default]
    Idle,
    /// The adapter is off or access was refused.
    BluetoothUnavailable,
    /// Looking for controllers.
    Scanning,
    /// Connecting to a device.
    Connecting {
        /// Display name of the device.
        name: String,
    },
    /// Connected to a device.
    Connected {
        /// Display name of the device.
        name: String,
    },
    /// Waiting before the next attempt.
    Retrying {
        /// Delay before the attempt.
        delay: Duration,
        /// Attempt number, starting at 1.
        attempt: u32,
    },
    /// Retries exhausted.
    Failed,
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::BluetoothUnavailable => write!(f, "Bluetooth unavailable"),
            Self::Scanning => write!(f, "Scanning…"),
            Self::Connecting { name } => write!(f, "Connecting to {}…", name),
            Self::Connected { name } => write!(f, "Connected to {}", name),
            Self::Retrying { delay, attempt } => {
                write!(f, "Retrying in {}s (#{})", delay.as_secs(), attempt)
            }
            Self::Failed => write!(f, "Connection lost - reconnect manually"),
        }
    }
}

/// Bounded exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Retries allowed before giving up.
    pub max_attempts: u32,
    /// Base delay, doubled per attempt.
    pub base: Duration,
    /// Upper bound on the delay.
    pub cap: Duration,
}

impl ReconnectPolicy {
    /// `min(base * 2^attempt, cap)`.
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base.saturating_mul(factor).min(self.cap)
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base: Duration::from_secs(1),
            cap: Duration::from_secs(30),
        }
    }
}

/// Tag of a single connection attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    pub(crate) const fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Tag of a scheduled retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RetryToken(u64);

/// The connected device and its write channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveLink {
    /// Connected device.
    pub identifier: DeviceId,
    /// Bound write channel.
    pub channel: WriteChannel,
    /// Session the channel belongs to.
    pub session: SessionId,
}

/// Inputs to the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Begin work: reconnect to the last device, or scan.
    StartRequested,
    /// User asked for a fresh scan.
    ScanRequested,
    /// User selected a device.
    ConnectRequested {
        /// Device to connect to.
        identifier: DeviceId,
    },
    /// User asked to disconnect.
    DisconnectRequested,
    /// The adapter changed power state.
    AdapterStateChanged {
        /// Whether the adapter is usable.
        powered: bool,
    },
    /// Scanning could not be started.
    ScanFailed {
        /// Failure description.
        reason: String,
    },
    /// The configured scan window ended.
    ScanElapsed,
    /// A peripheral advertised.
    Advertisement {
        /// The advertising device.
        device: Device,
    },
    /// The link came up.
    LinkEstablished {
        /// Attempt this completion belongs to.
        session: SessionId,
    },
    /// The device to connect to is not known to the adapter.
    DeviceMissing {
        /// Attempt this completion belongs to.
        session: SessionId,
    },
    /// The link could not be established or discovery failed.
    LinkFailed {
        /// Attempt this completion belongs to.
        session: SessionId,
        /// Failure description.
        reason: String,
    },
    /// Characteristics were discovered.
    ServicesDiscovered {
        /// Attempt this completion belongs to.
        session: SessionId,
        /// Discovered characteristics in arrival order.
        characteristics: Vec<CharacteristicDescriptor>,
    },
    /// A link dropped without being asked to.
    LinkLost {
        /// Device that dropped.
        identifier: DeviceId,
    },
    /// A retry timer fired.
    RetryElapsed {
        /// Timer that fired.
        token: RetryToken,
    },
}

/// Work requested by the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Start scanning.
    StartScan,
    /// Stop scanning.
    StopScan,
    /// Open a link; report with `LinkEstablished`, `DeviceMissing` or `LinkFailed`.
    Connect {
        /// Attempt tag.
        session: SessionId,
        /// Device to connect to.
        identifier: DeviceId,
    },
    /// Discover characteristics; report with `ServicesDiscovered` or `LinkFailed`.
    Discover {
        /// Attempt tag.
        session: SessionId,
        /// Connected device.
        identifier: DeviceId,
        /// Discovery mode.
        mode: DiscoveryMode,
    },
    /// Drop a link.
    Disconnect {
        /// Device to disconnect.
        identifier: DeviceId,
    },
    /// Arm the retry timer, replacing any armed one.
    ScheduleRetry {
        /// Tag to report with `RetryElapsed`.
        token: RetryToken,
        /// Delay before firing.
        delay: Duration,
    },
    /// Disarm the retry timer.
    CancelRetry,
    /// Store (or clear) the auto-reconnect device.
    PersistLastDevice(Option<DeviceId>),
    /// Send the optional post-connect probe command.
    Probe {
        /// Connected device.
        identifier: DeviceId,
        /// Bound write channel.
        channel: WriteChannel,
    },
}

/// Connection lifecycle state machine.
#[derive(Debug)]
pub struct ConnectionStateMachine {
    policy: ReconnectPolicy,
    discovery_mode: DiscoveryMode,
    filter: DeviceFilter,
    probe_on_connect: bool,

    state: ConnectionState,
    status: ConnectionStatus,
    adapter_ready: bool,
    started: bool,
    attempt: u32,

    target: Option<Device>,
    last_device: Option<DeviceId>,
    discovered: DiscoveredDevices,

    next_session: u64,
    session: Option<SessionId>,
    link_up: Option<SessionId>,
    write_channel: Option<WriteChannel>,
    awaiting: Option<DeviceId>,

    next_token: u64,
    pending_retry: Option<RetryToken>,
}

impl ConnectionStateMachine {
    /// Create a machine in `Idle`.
    pub fn new(config: &ControllerConfig, last_device: Option<DeviceId>) -> Self {
        Self {
            policy: config.reconnect_policy(),
            discovery_mode: config.discovery_mode,
            filter: config.device_filter(),
            probe_on_connect: config.probe_on_connect,
            state: ConnectionState::Idle,
            status: ConnectionStatus::Idle,
            adapter_ready: true,
            started: false,
            attempt: 0,
            target: None,
            last_device,
            discovered: DiscoveredDevices::new(),
            next_session: 0,
            session: None,
            link_up: None,
            write_channel: None,
            awaiting: None,
            next_token: 0,
            pending_retry: None,
        }
    }

    /// Current state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Current status.
    pub fn status(&self) -> &ConnectionStatus {
        &self.status
    }

    /// Consecutive failed attempts.
    pub fn reconnect_attempt(&self) -> u32 {
        self.attempt
    }

    /// Bound write channel, only while connected.
    pub fn write_channel(&self) -> Option<&WriteChannel> {
        self.write_channel.as_ref()
    }

    /// Device being connected to or connected.
    pub fn target(&self) -> Option<&Device> {
        self.target.as_ref()
    }

    /// Device persisted for auto-reconnect.
    pub fn last_device(&self) -> Option<&DeviceId> {
        self.last_device.as_ref()
    }

    /// Candidates from the current scan session.
    pub fn discovered(&self) -> &DiscoveredDevices {
        &self.discovered
    }

    /// Armed retry timer, if any.
    pub fn pending_retry(&self) -> Option<RetryToken> {
        self.pending_retry
    }

    /// Backoff policy in use.
    pub fn policy(&self) -> &ReconnectPolicy {
        &self.policy
    }

    /// The link commands can be sent over.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotReady`] unless connected with a bound channel.
    pub fn active_link(&self) -> Result<ActiveLink> {
        match (self.state, &self.target, &self.write_channel, self.session) {
            (ConnectionState::Connected, Some(target), Some(channel), Some(session)) => {
                Ok(ActiveLink {
                    identifier: target.identifier.clone(),
                    channel: *channel,
                    session,
                })
            }
            _ => Err(Error::NotReady { state: self.state }),
        }
    }

    /// Apply an event and return the effects to execute, in order.
    pub fn handle(&mut self, event: Event) -> Vec<Effect> {
        let mut effects = Vec::new();

        match event {
            Event::StartRequested => self.on_start(&mut effects),
            Event::ScanRequested => self.on_scan_requested(&mut effects),
            Event::ConnectRequested { identifier } => {
                self.on_connect_requested(identifier, &mut effects)
            }
            Event::DisconnectRequested => self.on_disconnect_requested(&mut effects),
            Event::AdapterStateChanged { powered } => {
                self.on_adapter_state(powered, &mut effects)
            }
            Event::ScanFailed { reason } => {
                if self.state == ConnectionState::Scanning {
                    warn!("Scan failed: {}", reason);
                    self.set_state(ConnectionState::Idle, ConnectionStatus::BluetoothUnavailable);
                }
            }
            Event::ScanElapsed => {
                if self.state == ConnectionState::Scanning {
                    info!("Scan window ended with {} candidates", self.discovered.len());
                    effects.push(Effect::StopScan);
                    self.set_state(ConnectionState::Idle, ConnectionStatus::Idle);
                }
            }
            Event::Advertisement { device } => self.on_advertisement(device, &mut effects),
            Event::LinkEstablished { session } => {
                if self.is_current(session) && self.state == ConnectionState::Connecting {
                    self.link_up = Some(session);
                    if let Some(target) = &self.target {
                        debug!("Link up to {}, discovering services", target.identifier);
                        effects.push(Effect::Discover {
                            session,
                            identifier: target.identifier.clone(),
                            mode: self.discovery_mode,
                        });
                    }
                } else {
                    debug!("Ignoring stale link completion {}", session);
                }
            }
            Event::DeviceMissing { session } => {
                if self.is_current(session) && self.state == ConnectionState::Connecting {
                    self.on_device_missing(&mut effects);
                } else {
                    debug!("Ignoring stale device lookup {}", session);
                }
            }
            Event::LinkFailed { session, reason } => {
                if self.is_current(session) && self.state == ConnectionState::Connecting {
                    warn!("Connection attempt failed: {}", reason);
                    self.enter_reconnecting(&mut effects);
                } else {
                    debug!("Ignoring stale link failure {}: {}", session, reason);
                }
            }
            Event::ServicesDiscovered {
                session,
                characteristics,
            } => {
                if self.is_current(session) && self.state == ConnectionState::Connecting {
                    self.on_services_discovered(session, &characteristics, &mut effects);
                } else {
                    debug!("Ignoring stale discovery result {}", session);
                }
            }
            Event::LinkLost { identifier } => self.on_link_lost(identifier, &mut effects),
            Event::RetryElapsed { token } => {
                let due = self.pending_retry == Some(token)
                    && self.state == ConnectionState::Reconnecting;
                if due {
                    self.pending_retry = None;
                    if let Some(target) = self.target.clone() {
                        info!(
                            "Retrying connection to {} (#{})",
                            target.display_name(),
                            self.attempt
                        );
                        self.begin_connect(target, &mut effects);
                    }
                } else {
                    debug!("Ignoring stale retry timer");
                }
            }
        }

        effects
    }

    fn on_start(&mut self, effects: &mut Vec<Effect>) {
        self.started = true;

        if !self.adapter_ready {
            warn!("Bluetooth unavailable, waiting for the adapter");
            self.set_state(ConnectionState::Idle, ConnectionStatus::BluetoothUnavailable);
            return;
        }

        if !matches!(self.state, ConnectionState::Idle | ConnectionState::Failed) {
            debug!("Already {}, ignoring start", self.state);
            return;
        }

        self.attempt = 0;

        match self.last_device.clone() {
            Some(identifier) => {
                info!("Reconnecting directly to last device {}", identifier);
                let device = self
                    .discovered
                    .get(&identifier)
                    .cloned()
                    .unwrap_or_else(|| Device::unnamed(identifier));
                self.begin_connect(device, effects);
            }
            None => self.begin_scan(effects),
        }
    }

    fn on_scan_requested(&mut self, effects: &mut Vec<Effect>) {
        if !self.adapter_ready {
            self.set_state(ConnectionState::Idle, ConnectionStatus::BluetoothUnavailable);
            return;
        }

        match self.state {
            ConnectionState::Idle | ConnectionState::Failed => {}
            ConnectionState::Reconnecting => self.cancel_retry(effects),
            ConnectionState::Scanning => {
                debug!("Already scanning");
                return;
            }
            ConnectionState::Connecting | ConnectionState::Connected => {
                debug!("Ignoring scan request while {}", self.state);
                return;
            }
        }

        self.started = true;
        self.attempt = 0;
        self.session = None;
        self.link_up = None;
        self.awaiting = None;
        self.begin_scan(effects);
    }

    fn on_connect_requested(&mut self, identifier: DeviceId, effects: &mut Vec<Effect>) {
        if !self.adapter_ready {
            self.set_state(ConnectionState::Idle, ConnectionStatus::BluetoothUnavailable);
            return;
        }

        if self.state == ConnectionState::Connected {
            if self.target.as_ref().map(|t| &t.identifier) == Some(&identifier) {
                debug!("Already connected to {}", identifier);
                return;
            }
            if let Some(current) = self.target.take() {
                effects.push(Effect::Disconnect {
                    identifier: current.identifier,
                });
            }
            self.write_channel = None;
        }

        if self.state == ConnectionState::Connecting {
            if let Some(current) = self.target.take() {
                effects.push(Effect::Disconnect {
                    identifier: current.identifier,
                });
            }
        }

        self.cancel_retry(effects);
        if self.state == ConnectionState::Scanning {
            effects.push(Effect::StopScan);
        }

        self.started = true;
        self.attempt = 0;

        let device = self
            .discovered
            .get(&identifier)
            .cloned()
            .unwrap_or_else(|| Device::unnamed(identifier));
        self.begin_connect(device, effects);
    }

    fn on_disconnect_requested(&mut self, effects: &mut Vec<Effect>) {
        info!("Disconnect requested");

        if self.state == ConnectionState::Scanning {
            effects.push(Effect::StopScan);
        }

        if matches!(
            self.state,
            ConnectionState::Connecting | ConnectionState::Connected
        ) {
            if let Some(target) = &self.target {
                effects.push(Effect::Disconnect {
                    identifier: target.identifier.clone(),
                });
            }
        }

        self.pending_retry = None;
        effects.push(Effect::CancelRetry);

        self.session = None;
        self.link_up = None;
        self.write_channel = None;
        self.target = None;
        self.awaiting = None;
        self.attempt = 0;
        self.started = false;

        if self.last_device.take().is_some() {
            debug!("Forgetting last device");
        }
        effects.push(Effect::PersistLastDevice(None));

        self.set_state(ConnectionState::Idle, ConnectionStatus::Idle);
    }

    fn on_adapter_state(&mut self, powered: bool, effects: &mut Vec<Effect>) {
        if powered == self.adapter_ready {
            return;
        }
        self.adapter_ready = powered;

        if powered {
            info!("Bluetooth adapter ready");
            if self.started && self.state == ConnectionState::Idle {
                self.on_start(effects);
            } else if self.status == ConnectionStatus::BluetoothUnavailable {
                let status = self.default_status();
                self.set_state(self.state, status);
            }
            return;
        }

        warn!("Bluetooth adapter powered off");
        if self.state.is_active() {
            self.cancel_retry(effects);
            self.session = None;
            self.link_up = None;
            self.write_channel = None;
        }
        self.set_state(ConnectionState::Idle, ConnectionStatus::BluetoothUnavailable);
    }

    fn on_advertisement(&mut self, device: Device, effects: &mut Vec<Effect>) {
        if self.state != ConnectionState::Scanning {
            return;
        }

        if !self.filter.is_candidate(device.name.as_deref()) {
            return;
        }

        let identifier = device.identifier.clone();
        if self.discovered.observe(device) {
            debug!("Discovered candidate {}", identifier);
        }

        let wanted = self.awaiting.as_ref().or(self.last_device.as_ref());
        if wanted == Some(&identifier) {
            if let Some(device) = self.discovered.get(&identifier).cloned() {
                info!("Device {} re-observed, connecting", identifier);
                effects.push(Effect::StopScan);
                self.attempt = 0;
                self.begin_connect(device, effects);
            }
        }
    }

    fn on_services_discovered(
        &mut self,
        session: SessionId,
        characteristics: &[CharacteristicDescriptor],
        effects: &mut Vec<Effect>,
    ) {
        let Some(target) = self.target.clone() else {
            return;
        };

        let resolved = CharacteristicResolver::resolve_all(
            self.discovery_mode,
            &target.identifier,
            characteristics,
        );

        match resolved {
            Ok(channel) => {
                info!("Connected to {}", target.display_name());
                self.write_channel = Some(channel);
                self.session = Some(session);
                self.attempt = 0;
                self.last_device = Some(target.identifier.clone());
                effects.push(Effect::PersistLastDevice(Some(target.identifier.clone())));
                if self.probe_on_connect {
                    effects.push(Effect::Probe {
                        identifier: target.identifier.clone(),
                        channel,
                    });
                }
                self.set_state(
                    ConnectionState::Connected,
                    ConnectionStatus::Connected {
                        name: target.display_name().to_string(),
                    },
                );
            }
            Err(e) => {
                warn!("{}", e);
                effects.push(Effect::Disconnect {
                    identifier: target.identifier,
                });
                self.enter_reconnecting(effects);
            }
        }
    }

    fn on_device_missing(&mut self, effects: &mut Vec<Effect>) {
        let Some(target) = self.target.take() else {
            return;
        };

        info!(
            "{} is not known to the adapter, scanning for it",
            target.identifier
        );
        self.session = None;
        self.link_up = None;
        self.write_channel = None;
        self.attempt = 0;
        self.awaiting = Some(target.identifier);
        self.begin_scan(effects);
    }

    fn on_link_lost(&mut self, identifier: DeviceId, effects: &mut Vec<Effect>) {
        let is_target = self.target.as_ref().map(|t| &t.identifier) == Some(&identifier);
        // Reports for a link torn down before this session came up are late.
        let is_live = self.link_up.is_some() && self.link_up == self.session;
        let is_active = matches!(
            self.state,
            ConnectionState::Connected | ConnectionState::Connecting
        );

        if is_target && is_live && is_active {
            warn!("Link to {} lost", identifier);
            self.enter_reconnecting(effects);
        } else {
            debug!("Ignoring disconnect of {}", identifier);
        }
    }

    fn begin_scan(&mut self, effects: &mut Vec<Effect>) {
        self.discovered.clear();
        effects.push(Effect::StartScan);
        self.set_state(ConnectionState::Scanning, ConnectionStatus::Scanning);
    }

    fn begin_connect(&mut self, device: Device, effects: &mut Vec<Effect>) {
        self.next_session += 1;
        let session = SessionId::new(self.next_session);
        self.session = Some(session);
        self.link_up = None;
        self.write_channel = None;
        self.awaiting = None;

        effects.push(Effect::Connect {
            session,
            identifier: device.identifier.clone(),
        });

        let name = device.display_name().to_string();
        self.target = Some(device);
        self.set_state(ConnectionState::Connecting, ConnectionStatus::Connecting { name });
    }

    fn enter_reconnecting(&mut self, effects: &mut Vec<Effect>) {
        self.session = None;
        self.link_up = None;
        self.write_channel = None;
        self.attempt = self.attempt.saturating_add(1);

        if self.attempt > self.policy.max_attempts {
            warn!(
                "Giving up after {} reconnect attempts",
                self.policy.max_attempts
            );
            self.cancel_retry(effects);
            self.set_state(ConnectionState::Failed, ConnectionStatus::Failed);
            return;
        }

        self.next_token += 1;
        let token = RetryToken(self.next_token);
        let delay = self.policy.delay(self.attempt);
        self.pending_retry = Some(token);
        effects.push(Effect::ScheduleRetry { token, delay });

        self.set_state(
            ConnectionState::Reconnecting,
            ConnectionStatus::Retrying {
                delay,
                attempt: self.attempt,
            },
        );
    }

    fn cancel_retry(&mut self, effects: &mut Vec<Effect>) {
        if self.pending_retry.take().is_some() {
            effects.push(Effect::CancelRetry);
        }
    }

    fn is_current(&self, session: SessionId) -> bool {
        self.session == Some(session)
    }

    fn default_status(&self) -> ConnectionStatus {
        let name = || {
            self.target
                .as_ref()
                .map(|t| t.display_name().to_string())
                .unwrap_or_default()
        };

        match self.state {
            ConnectionState::Idle => ConnectionStatus::Idle,
            ConnectionState::Scanning => ConnectionStatus::Scanning,
            ConnectionState::Connecting => ConnectionStatus::Connecting { name: name() },
            ConnectionState::Connected => ConnectionStatus::Connected { name: name() },
            ConnectionState::Reconnecting => ConnectionStatus::Retrying {
                delay: self.policy.delay(self.attempt),
                attempt: self.attempt,
            },
            ConnectionState::Failed => ConnectionStatus::Failed,
        }
    }

    /// Update the state and status, logging the transition.
    fn set_state(&mut self, new_state: ConnectionState, status: ConnectionStatus) {
        let old_state = self.state;
        self.state = new_state;
        self.status = status;

        if old_state != new_state {
            debug!("Connection state changed: {} -> {}", old_state, new_state);
        }
    }
}

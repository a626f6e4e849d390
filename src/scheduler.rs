//! Time-of-day power schedules.
//!
//! [`ScheduleEvaluator`] is a pure function of the schedule list and the
//! current local time. [`ScheduleRunner`] drives it from a tokio interval
//! and pushes the resulting commands through a [`CommandDispatcher`].
//!
//! Matching is at minute granularity with no catch-up: a tick that misses a
//! schedule's minute never fires it later. A schedule fires at most once
//! per calendar minute however often it is ticked.

use chrono::{Local, NaiveDate, NaiveDateTime, Timelike};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::ScheduleConfig;
use crate::data::schedule::{Schedule, ScheduleBook, ScheduleId, TimeOfDay};
use crate::dispatcher::CommandDispatcher;
use crate::protocol::Command;

/// What a ramped schedule emits when it starts.
///
/// Only the start of the ramp is defined; the intermediate steps are not
/// generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RampPolicy {
    /// Switch straight to the target state.
    #[default]
    Immediate,
    /// When turning on, set this brightness before powering on.
    StartFrom {
        /// Initial brightness.
        brightness: i32,
    },
}

/// How a trigger was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriggerKind {
    /// A plain power change.
    Direct,
    /// The start of a ramped transition.
    RampStart,
}

/// A schedule that fired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleTrigger {
    /// The schedule that fired.
    pub schedule_id: ScheduleId,
    /// Its time of day.
    pub time_of_day: TimeOfDay,
    /// Power state it switches to.
    pub target_power_state: bool,
    /// Direct or ramped.
    pub kind: TriggerKind,
    /// Commands to send, in order.
    pub commands: Vec<Command>,
}

impl ScheduleTrigger {
    /// One-line description for notifications.
    pub fn describe(&self) -> String {
        let action = if self.target_power_state { "on" } else { "off" };
        match self.kind {
            TriggerKind::Direct => format!("Lights {} ({})", action, self.time_of_day),
            TriggerKind::RampStart => format!("Fading lights {} ({})", action, self.time_of_day),
        }
    }
}

type MinuteKey = (NaiveDate, u32, u32);

fn minute_key(now: &NaiveDateTime) -> MinuteKey {
    (now.date(), now.hour(), now.minute())
}

/// Decides which schedules fire at a given time.
#[derive(Debug, Clone, Default)]
pub struct ScheduleEvaluator {
    ramp: RampPolicy,
    last_fired: HashMap<ScheduleId, MinuteKey>,
}

impl ScheduleEvaluator {
    /// Create an evaluator.
    pub fn new(ramp: RampPolicy) -> Self {
        Self {
            ramp,
            last_fired: HashMap::new(),
        }
    }

    /// Schedules due at `now`, in list order.
    pub fn evaluate(&mut self, schedules: &[Schedule], now: NaiveDateTime) -> Vec<ScheduleTrigger> {
        let key = minute_key(&now);
        self.last_fired.retain(|_, fired| *fired == key);

        let mut triggers = Vec::new();

        for schedule in schedules.iter().filter(|s| s.is_due(&now)) {
            if self.last_fired.insert(schedule.id, key).is_some() {
                debug!("Schedule {} already fired this minute", schedule.id);
                continue;
            }

            triggers.push(self.trigger_for(schedule));
        }

        triggers
    }

    /// Commands due at `now`.
    pub fn tick(&mut self, schedules: &[Schedule], now: NaiveDateTime) -> Vec<Command> {
        self.evaluate(schedules, now)
            .into_iter()
            .flat_map(|t| t.commands)
            .collect()
    }

    fn trigger_for(&self, schedule: &Schedule) -> ScheduleTrigger {
        let target = schedule.target_power_state;

        let (kind, commands) = if schedule.use_ramp {
            let commands = match (self.ramp, target) {
                (RampPolicy::StartFrom { brightness }, true) => {
                    vec![Command::Brightness(brightness), Command::Power(true)]
                }
                _ => vec![Command::Power(target)],
            };
            (TriggerKind::RampStart, commands)
        } else {
            (TriggerKind::Direct, vec![Command::Power(target)])
        };

        ScheduleTrigger {
            schedule_id: schedule.id,
            time_of_day: schedule.time_of_day,
            target_power_state: target,
            kind,
            commands,
        }
    }
}

/// Receives a one-shot notice for each fired schedule.
pub trait Notifier: Send + Sync {
    /// A schedule fired.
    fn notify(&self, trigger: &ScheduleTrigger);
}

/// Notifier that logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, trigger: &ScheduleTrigger) {
        info!("{}", trigger.describe());
    }
}

/// Periodically evaluates schedules and dispatches their commands.
pub struct ScheduleRunner {
    dispatcher: CommandDispatcher,
    schedules: Arc<RwLock<ScheduleBook>>,
    evaluator: Mutex<ScheduleEvaluator>,
    notifier: Arc<dyn Notifier>,
    config: ScheduleConfig,
}

impl ScheduleRunner {
    /// Create a runner over a shared schedule list.
    pub fn new(
        dispatcher: CommandDispatcher,
        schedules: Arc<RwLock<ScheduleBook>>,
        config: ScheduleConfig,
    ) -> Self {
        Self {
            dispatcher,
            schedules,
            evaluator: Mutex::new(ScheduleEvaluator::new(config.ramp)),
            notifier: Arc::new(TracingNotifier),
            config,
        }
    }

    /// Replace the notifier.
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// The shared schedule list.
    pub fn schedules(&self) -> &Arc<RwLock<ScheduleBook>> {
        &self.schedules
    }

    /// Evaluate once and send whatever is due.
    ///
    /// Commands that cannot be sent are logged and dropped; the trigger
    /// still counts as fired.
    pub async fn tick_at(&self, now: NaiveDateTime) -> Vec<ScheduleTrigger> {
        let triggers = {
            let book = self.schedules.read();
            self.evaluator.lock().evaluate(book.as_slice(), now)
        };

        for trigger in &triggers {
            self.notifier.notify(trigger);

            for command in &trigger.commands {
                if let Err(e) = self.dispatcher.submit(command).await {
                    warn!(
                        "Schedule {} could not send {}: {}",
                        trigger.schedule_id,
                        command.kind(),
                        e
                    );
                    break;
                }
            }
        }

        triggers
    }

    /// Run on a tokio interval using local wall-clock time.
    pub fn spawn(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.config.tick_interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            info!(
                "Schedule runner started (every {:?})",
                self.config.tick_interval
            );

            loop {
                interval.tick().await;
                self.tick_at(Local::now().naive_local()).await;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ble::connection::{ActiveLink, ConnectionState, SessionId};
    use crate::ble::device::DeviceId;
    use crate::ble::resolver::WriteChannel;
    use crate::ble::transport::MockBleTransport;
    use crate::ble::uuids::{ELK_SERVICE_UUID, ELK_WRITE_UUID};
    use crate::data::schedule::DaySet;
    use crate::dispatcher::LinkProvider;
    use crate::error::{Error, Result};
    use crate::protocol::ProtocolCodec;
    use btleplug::api::CharPropFlags;
    use chrono::Weekday;
    use pretty_assertions::assert_eq;

    fn at(d: u32, h: u32, m: u32, s: u32) -> NaiveDateTime {
        // January 2024 starts on a Monday.
        NaiveDate::from_ymd_opt(2024, 1, d)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    fn monday_eight() -> Schedule {
        Schedule::new(
            TimeOfDay::new(8, 0).unwrap(),
            [Weekday::Mon].into_iter().collect(),
            true,
        )
    }

    #[test]
    fn test_fires_once_in_matching_minute() {
        let mut evaluator = ScheduleEvaluator::default();
        let schedules = vec![monday_eight()];

        assert_eq!(evaluator.tick(&schedules, at(1, 8, 0, 30)), vec![Command::Power(true)]);
    }

    #[test]
    fn test_no_catch_up() {
        let mut evaluator = ScheduleEvaluator::default();
        let schedules = vec![monday_eight()];

        assert!(evaluator.tick(&schedules, at(1, 8, 1, 0)).is_empty());
        assert!(evaluator.tick(&schedules, at(2, 8, 0, 0)).is_empty());
    }

    #[test]
    fn test_disabled_never_fires() {
        let mut evaluator = ScheduleEvaluator::default();
        let mut schedule = monday_eight();
        schedule.enabled = false;

        assert!(evaluator.tick(&[schedule], at(1, 8, 0, 30)).is_empty());
    }

    #[test]
    fn test_repeated_ticks_in_same_minute() {
        let mut evaluator = ScheduleEvaluator::default();
        let schedules = vec![monday_eight()];

        assert_eq!(evaluator.tick(&schedules, at(1, 8, 0, 0)).len(), 1);
        assert!(evaluator.tick(&schedules, at(1, 8, 0, 45)).is_empty());
        // Same minute a week later fires again.
        assert_eq!(evaluator.tick(&schedules, at(8, 8, 0, 5)).len(), 1);
    }

    #[test]
    fn test_multiple_schedules_keep_order() {
        let mut evaluator = ScheduleEvaluator::default();
        let off = Schedule::new(TimeOfDay::new(8, 0).unwrap(), DaySet::EVERY_DAY, false);
        let schedules = vec![monday_eight(), off];

        let triggers = evaluator.evaluate(&schedules, at(1, 8, 0, 10));
        assert_eq!(triggers.len(), 2);
        assert_eq!(triggers[0].schedule_id, schedules[0].id);
        assert_eq!(triggers[1].commands, vec![Command::Power(false)]);
        assert_eq!(triggers[1].describe(), "Lights off (08:00)");
    }

    #[test]
    fn test_ramp_start_signal() {
        let schedules = vec![monday_eight().with_ramp(true)];

        let mut immediate = ScheduleEvaluator::new(RampPolicy::Immediate);
        let triggers = immediate.evaluate(&schedules, at(1, 8, 0, 0));
        assert_eq!(triggers[0].kind, TriggerKind::RampStart);
        assert_eq!(triggers[0].commands, vec![Command::Power(true)]);

        let mut from_low = ScheduleEvaluator::new(RampPolicy::StartFrom { brightness: 10 });
        assert_eq!(
            from_low.tick(&schedules, at(1, 8, 0, 0)),
            vec![Command::Brightness(10), Command::Power(true)]
        );
    }

    struct Linked;

    impl LinkProvider for Linked {
        fn active_link(&self) -> Result<ActiveLink> {
            Ok(ActiveLink {
                identifier: DeviceId::new("AA"),
                channel: WriteChannel {
                    service_uuid: ELK_SERVICE_UUID,
                    uuid: ELK_WRITE_UUID,
                    properties: CharPropFlags::WRITE,
                },
                session: SessionId::new(1),
            })
        }
    }

    struct Offline;

    impl LinkProvider for Offline {
        fn active_link(&self) -> Result<ActiveLink> {
            Err(Error::NotReady {
                state: ConnectionState::Reconnecting,
            })
        }
    }

    #[derive(Default)]
    struct Recording(parking_lot::Mutex<Vec<String>>);

    impl Notifier for Recording {
        fn notify(&self, trigger: &ScheduleTrigger) {
            self.0.lock().push(trigger.describe());
        }
    }

    fn book() -> Arc<RwLock<ScheduleBook>> {
        let mut book = ScheduleBook::new();
        book.add(monday_eight());
        Arc::new(RwLock::new(book))
    }

    #[tokio::test]
    async fn test_runner_dispatches_and_notifies() {
        let mut transport = MockBleTransport::new();
        transport
            .expect_write()
            .withf(|_, _, data, _| {
                data == &vec![0x7E, 0x04, 0x04, 0x01, 0x00, 0x00, 0x00, 0x00, 0xEF]
            })
            .times(1)
            .returning(|_, _, _, _| Ok(()));

        let dispatcher =
            CommandDispatcher::new(Arc::new(transport), Arc::new(Linked), ProtocolCodec::default());
        let notifier = Arc::new(Recording::default());
        let runner = ScheduleRunner::new(dispatcher, book(), ScheduleConfig::default())
            .with_notifier(notifier.clone());

        assert_eq!(runner.tick_at(at(1, 8, 0, 30)).await.len(), 1);
        assert!(runner.tick_at(at(1, 8, 0, 50)).await.is_empty());
        assert_eq!(notifier.0.lock().clone(), vec!["Lights on (08:00)".to_string()]);
    }

    #[tokio::test]
    async fn test_runner_drops_commands_when_offline() {
        let mut transport = MockBleTransport::new();
        transport.expect_write().times(0);

        let dispatcher = CommandDispatcher::new(
            Arc::new(transport),
            Arc::new(Offline),
            ProtocolCodec::default(),
        );
        let runner = ScheduleRunner::new(dispatcher, book(), ScheduleConfig::default());

        let triggers = runner.tick_at(at(1, 8, 0, 0)).await;
        assert_eq!(triggers.len(), 1);
        // Not queued for later.
        assert!(runner.tick_at(at(1, 8, 0, 30)).await.is_empty());
    }
}

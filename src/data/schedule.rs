//! Power schedules.

use chrono::{Datelike, NaiveDateTime, Timelike, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Unique identifier of a schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScheduleId(Uuid);

impl ScheduleId {
    /// Generate a new random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// The underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ScheduleId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ScheduleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Hour and minute of a day. Serialized as `"HH:MM"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeOfDay {
    hour: u8,
    minute: u8,
}

impl TimeOfDay {
    /// Create a time of day.
    ///
    /// # Errors
    ///
    /// Returns an error if the hour is over 23 or the minute over 59.
    pub fn new(hour: u8, minute: u8) -> Result<Self> {
        if hour > 23 {
            return Err(Error::InvalidParameter {
                name: "hour".to_string(),
                value: hour.to_string(),
            });
        }
        if minute > 59 {
            return Err(Error::InvalidParameter {
                name: "minute".to_string(),
                value: minute.to_string(),
            });
        }
        Ok(Self { hour, minute })
    }

    /// Hour (0-23).
    pub fn hour(&self) -> u8 {
        self.hour
    }

    /// Minute (0-59).
    pub fn minute(&self) -> u8 {
        self.minute
    }

    /// Whether a timestamp falls within this minute.
    pub fn matches<T: Timelike>(&self, time: &T) -> bool {
        time.hour() == u32::from(self.hour) && time.minute() == u32::from(self.minute)
    }
}

impl std::fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl std::str::FromStr for TimeOfDay {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidParameter {
            name: "time_of_day".to_string(),
            value: s.to_string(),
        };

        let (hour, minute) = s.trim().split_once(':').ok_or_else(invalid)?;
        let hour = hour.parse().map_err(|_| invalid())?;
        let minute = minute.parse().map_err(|_| invalid())?;
        Self::new(hour, minute)
    }
}

impl TryFrom<String> for TimeOfDay {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<TimeOfDay> for String {
    fn from(value: TimeOfDay) -> Self {
        value.to_string()
    }
}

const WEEK: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// A set of weekdays.
///
/// Serialized as a sorted list of ISO day numbers (1 = Monday .. 7 = Sunday).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<u8>", into = "Vec<u8>")]
pub struct DaySet(u8);

impl DaySet {
    /// No days.
    pub const EMPTY: DaySet = DaySet(0);
    /// Monday through Friday.
    pub const WEEKDAYS: DaySet = DaySet(0b0001_1111);
    /// Saturday and Sunday.
    pub const WEEKENDS: DaySet = DaySet(0b0110_0000);
    /// Every day.
    pub const EVERY_DAY: DaySet = DaySet(0b0111_1111);

    fn bit(day: Weekday) -> u8 {
        1 << day.num_days_from_monday()
    }

    /// Add a day.
    pub fn insert(&mut self, day: Weekday) {
        self.0 |= Self::bit(day);
    }

    /// Remove a day.
    pub fn remove(&mut self, day: Weekday) {
        self.0 &= !Self::bit(day);
    }

    /// Whether the set contains a day.
    pub fn contains(&self, day: Weekday) -> bool {
        self.0 & Self::bit(day) != 0
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// The days, Monday first.
    pub fn iter(&self) -> impl Iterator<Item = Weekday> + '_ {
        WEEK.iter().copied().filter(|d| self.contains(*d))
    }
}

impl FromIterator<Weekday> for DaySet {
    fn from_iter<I: IntoIterator<Item = Weekday>>(iter: I) -> Self {
        let mut set = Self::EMPTY;
        for day in iter {
            set.insert(day);
        }
        set
    }
}

impl TryFrom<Vec<u8>> for DaySet {
    type Error = Error;

    fn try_from(days: Vec<u8>) -> Result<Self> {
        days.into_iter()
            .map(|n| {
                WEEK.get(usize::from(n).wrapping_sub(1))
                    .copied()
                    .ok_or_else(|| Error::InvalidParameter {
                        name: "weekday".to_string(),
                        value: n.to_string(),
                    })
            })
            .collect()
    }
}

impl From<DaySet> for Vec<u8> {
    fn from(set: DaySet) -> Self {
        set.iter().map(|d| d.number_from_monday() as u8).collect()
    }
}

impl std::fmt::Display for DaySet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Self::EVERY_DAY => write!(f, "every day"),
            Self::WEEKDAYS => write!(f, "weekdays"),
            Self::WEEKENDS => write!(f, "weekends"),
            _ => {
                let names: Vec<String> = self.iter().map(|d| d.to_string()).collect();
                write!(f, "{}", names.join(", "))
            }
        }
    }
}

/// A recurring power change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    /// Unique id.
    pub id: ScheduleId,
    /// When to fire.
    pub time_of_day: TimeOfDay,
    /// Which days to fire on.
    pub days_of_week: DaySet,
    /// Power state to switch to.
    pub target_power_state: bool,
    /// Whether the schedule is active.
    pub enabled: bool,
    /// Whether to transition gradually.
    #[serde(default)]
    pub use_ramp: bool,
}

impl Schedule {
    /// Create an enabled, non-ramped schedule.
    pub fn new(time_of_day: TimeOfDay, days_of_week: DaySet, target_power_state: bool) -> Self {
        Self {
            id: ScheduleId::new(),
            time_of_day,
            days_of_week,
            target_power_state,
            enabled: true,
            use_ramp: false,
        }
    }

    /// Set whether the transition is ramped.
    pub fn with_ramp(mut self, use_ramp: bool) -> Self {
        self.use_ramp = use_ramp;
        self
    }

    /// Whether the schedule fires in the minute containing `now`.
    pub fn is_due(&self, now: &NaiveDateTime) -> bool {
        self.enabled && self.days_of_week.contains(now.weekday()) && self.time_of_day.matches(now)
    }
}

/// The ordered list of schedules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScheduleBook {
    schedules: Vec<Schedule>,
}

impl ScheduleBook {
    /// Create an empty book.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a schedule and return its id.
    pub fn add(&mut self, schedule: Schedule) -> ScheduleId {
        let id = schedule.id;
        self.schedules.push(schedule);
        id
    }

    /// Replace the schedule with the same id, keeping its position.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ScheduleNotFound`] if no schedule has that id.
    pub fn update(&mut self, schedule: Schedule) -> Result<()> {
        let slot = self.get_mut(&schedule.id)?;
        *slot = schedule;
        Ok(())
    }

    /// Enable or disable a schedule.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ScheduleNotFound`] if no schedule has that id.
    pub fn set_enabled(&mut self, id: &ScheduleId, enabled: bool) -> Result<()> {
        self.get_mut(id)?.enabled = enabled;
        Ok(())
    }

    /// Remove a schedule.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ScheduleNotFound`] if no schedule has that id.
    pub fn remove(&mut self, id: &ScheduleId) -> Result<Schedule> {
        let index = self
            .schedules
            .iter()
            .position(|s| s.id == *id)
            .ok_or_else(|| not_found(id))?;
        Ok(self.schedules.remove(index))
    }

    /// Look up a schedule.
    pub fn get(&self, id: &ScheduleId) -> Option<&Schedule> {
        self.schedules.iter().find(|s| s.id == *id)
    }

    /// Iterate in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Schedule> {
        self.schedules.iter()
    }

    /// The schedules in order.
    pub fn as_slice(&self) -> &[Schedule] {
        &self.schedules
    }

    /// Number of schedules.
    pub fn len(&self) -> usize {
        self.schedules.len()
    }

    /// Whether there are no schedules.
    pub fn is_empty(&self) -> bool {
        self.schedules.is_empty()
    }

    fn get_mut(&mut self, id: &ScheduleId) -> Result<&mut Schedule> {
        self.schedules
            .iter_mut()
            .find(|s| s.id == *id)
            .ok_or_else(|| not_found(id))
    }
}

impl From<Vec<Schedule>> for ScheduleBook {
    fn from(schedules: Vec<Schedule>) -> Self {
        Self { schedules }
    }
}

fn not_found(id: &ScheduleId) -> Error {
    Error::ScheduleNotFound { id: id.to_string() }
}

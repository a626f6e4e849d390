//! Persisted data.
//!
//! Schedules and the key-value store that keeps them, together with the
//! last connected device.

pub mod schedule;
pub mod store;

pub use schedule::{DaySet, Schedule, ScheduleBook, ScheduleId, TimeOfDay};
pub use store::{
    load_last_device, load_schedules, save_last_device, save_schedules, JsonFileStore,
    MemoryStore, Store, LAST_DEVICE_KEY, SCHEDULES_KEY,
};

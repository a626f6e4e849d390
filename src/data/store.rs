//! Key-value persistence.
//!
//! Two keys are used: the last connected device (for auto-reconnect) and
//! the schedule list. Values are opaque JSON.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::ble::device::DeviceId;
use crate::data::schedule::ScheduleBook;
use crate::error::{Error, Result};

/// Key of the auto-reconnect device identifier.
pub const LAST_DEVICE_KEY: &str = "lastConnectedIdentifier";
/// Key of the schedule list.
pub const SCHEDULES_KEY: &str = "schedules";

/// A key-value store of JSON values.
#[async_trait]
pub trait Store: Send + Sync {
    /// Read a value.
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Write a value.
    async fn set(&self, key: &str, value: Value) -> Result<()>;

    /// Delete a value. Deleting a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<()>;
}

/// Volatile store, for tests and hosts without a filesystem.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<String, Value>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.values.read().get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        self.values.write().insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.values.write().remove(key);
        Ok(())
    }
}

/// Store backed by a single pretty-printed JSON object on disk.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    /// Serializes read-modify-write cycles.
    lock: Mutex<()>,
}

impl JsonFileStore {
    /// Use the file at `path`. It is created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// The backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Map<String, Value>> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("{} does not exist yet", self.path.display());
                return Ok(Map::new());
            }
            Err(e) => return Err(Error::Io(e)),
        };

        if contents.trim().is_empty() {
            return Ok(Map::new());
        }

        match serde_json::from_str(&contents)? {
            Value::Object(map) => Ok(map),
            other => Err(Error::Storage {
                context: format!(
                    "{} holds {} instead of an object",
                    self.path.display(),
                    json_kind(&other)
                ),
            }),
        }
    }

    async fn save(&self, map: Map<String, Value>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let json = serde_json::to_string_pretty(&Value::Object(map))?;
        tokio::fs::write(&self.path, json).await?;
        Ok(())
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[async_trait]
impl Store for JsonFileStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.remove(key))
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut map = self.load().await?;
        map.insert(key.to_string(), value);
        self.save(map).await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut map = self.load().await?;
        if map.remove(key).is_some() {
            self.save(map).await?;
        }
        Ok(())
    }
}

/// Read the auto-reconnect device.
///
/// A malformed value is logged and treated as absent.
pub async fn load_last_device(store: &dyn Store) -> Result<Option<DeviceId>> {
    let Some(value) = store.get(LAST_DEVICE_KEY).await? else {
        return Ok(None);
    };

    match serde_json::from_value(value) {
        Ok(identifier) => Ok(identifier),
        Err(e) => {
            warn!("Ignoring malformed {}: {}", LAST_DEVICE_KEY, e);
            Ok(None)
        }
    }
}

/// Store or clear the auto-reconnect device.
pub async fn save_last_device(store: &dyn Store, identifier: Option<&DeviceId>) -> Result<()> {
    match identifier {
        Some(identifier) => {
            store
                .set(LAST_DEVICE_KEY, serde_json::to_value(identifier)?)
                .await
        }
        None => store.remove(LAST_DEVICE_KEY).await,
    }
}

/// Read the schedule list. A missing key is an empty list.
pub async fn load_schedules(store: &dyn Store) -> Result<ScheduleBook> {
    match store.get(SCHEDULES_KEY).await? {
        Some(value) => Ok(serde_json::from_value(value)?),
        None => Ok(ScheduleBook::new()),
    }
}

/// Store the schedule list.
pub async fn save_schedules(store: &dyn Store, schedules: &ScheduleBook) -> Result<()> {
    store
        .set(SCHEDULES_KEY, serde_json::to_value(schedules)?)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::schedule::{DaySet, Schedule, TimeOfDay};
    use pretty_assertions::assert_eq;
    use tokio_test::{assert_err, assert_ok};

    fn temp_path() -> PathBuf {
        std::env::temp_dir()
            .join(format!("bledom-store-{}", uuid::Uuid::new_v4()))
            .join("state.json")
    }

    #[tokio::test]
    async fn test_memory_store_last_device() {
        let store = MemoryStore::new();
        assert_eq!(load_last_device(&store).await.unwrap(), None);

        let id = DeviceId::new("AA:BB");
        assert_ok!(save_last_device(&store, Some(&id)).await);
        assert_eq!(load_last_device(&store).await.unwrap(), Some(id));

        assert_ok!(save_last_device(&store, None).await);
        assert_eq!(load_last_device(&store).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_malformed_last_device_is_ignored() {
        let store = MemoryStore::new();
        store.set(LAST_DEVICE_KEY, serde_json::json!(42)).await.unwrap();
        assert_eq!(load_last_device(&store).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_json_file_store_round_trip() {
        let path = temp_path();
        let store = JsonFileStore::new(&path);
        assert!(load_schedules(&store).await.unwrap().is_empty());

        let mut book = ScheduleBook::new();
        book.add(Schedule::new(TimeOfDay::new(6, 30).unwrap(), DaySet::WEEKDAYS, true));
        let night = TimeOfDay::new(23, 0).unwrap();
        book.add(Schedule::new(night, DaySet::EVERY_DAY, false).with_ramp(true));
        assert_ok!(save_schedules(&store, &book).await);
        assert_ok!(save_last_device(&store, Some(&DeviceId::new("AA"))).await);

        // A fresh handle reads what the first one wrote.
        let reopened = JsonFileStore::new(&path);
        assert_eq!(load_schedules(&reopened).await.unwrap(), book);
        assert_eq!(
            load_last_device(&reopened).await.unwrap(),
            Some(DeviceId::new("AA"))
        );

        let raw = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(raw.contains("\"lastConnectedIdentifier\": \"AA\""));

        if let Some(dir) = path.parent() {
            let _ = tokio::fs::remove_dir_all(dir).await;
        }
    }

    #[tokio::test]
    async fn test_json_file_store_rejects_non_object() {
        let path = temp_path();
        let dir = path.parent().unwrap().to_path_buf();
        tokio::fs::create_dir_all(&dir).await.unwrap();
        tokio::fs::write(&path, "[1, 2]").await.unwrap();

        let store = JsonFileStore::new(&path);
        assert_err!(store.get(SCHEDULES_KEY).await);

        let _ = tokio::fs::remove_dir_all(dir).await;
    }
}

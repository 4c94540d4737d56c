//! JSON file-backed status store
//!
//! The whole state is rewritten after every mutation: serialized to a
//! sibling temp file, then renamed over the target. A failed write leaves
//! both the file and the in-memory copy as they were.

use crate::domain::error::StoreError;
use crate::domain::ports::StatusStore;
use crate::domain::types::{AlarmStatus, ArmingStatus, Sensor};
use crate::io::memory_store::StoreState;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub struct JsonFileStatusStore {
    path: PathBuf,
    state: StoreState,
}

impl JsonFileStatusStore {
    /// Open the store at `path`, starting from defaults if the file does not exist
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let state = if path.exists() {
            let content = fs::read_to_string(&path)?;
            serde_json::from_str(&content)?
        } else {
            StoreState::default()
        };

        info!(
            path = %path.display(),
            sensors = %state.sensors.len(),
            arming_status = %state.arming_status,
            alarm_status = %state.alarm_status,
            "status_store_opened"
        );

        Ok(Self { path, state })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Apply `change` to a copy of the state, persist it, then commit
    fn mutate<T>(
        &mut self,
        change: impl FnOnce(&mut StoreState) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut next = self.state.clone();
        let out = change(&mut next)?;
        self.persist(&next)?;
        self.state = next;
        Ok(out)
    }

    fn persist(&self, state: &StoreState) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_string_pretty(state)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json.as_bytes())?;
        fs::rename(&tmp, &self.path)?;

        debug!(path = %self.path.display(), bytes = %json.len(), "status_store_written");
        Ok(())
    }
}

impl StatusStore for JsonFileStatusStore {
    fn arming_status(&self) -> Result<ArmingStatus, StoreError> {
        Ok(self.state.arming_status)
    }

    fn set_arming_status(&mut self, status: ArmingStatus) -> Result<(), StoreError> {
        self.mutate(|state| {
            state.arming_status = status;
            Ok(())
        })
    }

    fn alarm_status(&self) -> Result<AlarmStatus, StoreError> {
        Ok(self.state.alarm_status)
    }

    fn set_alarm_status(&mut self, status: AlarmStatus) -> Result<(), StoreError> {
        self.mutate(|state| {
            state.alarm_status = status;
            Ok(())
        })
    }

    fn sensors(&self) -> Result<Vec<Sensor>, StoreError> {
        Ok(self.state.sensor_list())
    }

    fn sensor(&self, name: &str) -> Result<Sensor, StoreError> {
        self.state
            .sensors
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::SensorNotFound(name.to_string()))
    }

    fn update_sensor(&mut self, sensor: &Sensor) -> Result<(), StoreError> {
        self.mutate(|state| state.update_sensor(sensor))
    }

    fn add_sensor(&mut self, sensor: Sensor) -> Result<(), StoreError> {
        self.mutate(|state| state.add_sensor(sensor))
    }

    fn remove_sensor(&mut self, name: &str) -> Result<Sensor, StoreError> {
        self.mutate(|state| state.remove_sensor(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::SensorType;
    use tempfile::tempdir;

    #[test]
    fn test_open_missing_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let store = JsonFileStatusStore::open(dir.path().join("state.json")).unwrap();

        assert_eq!(store.arming_status().unwrap(), ArmingStatus::Disarmed);
        assert_eq!(store.alarm_status().unwrap(), AlarmStatus::NoAlarm);
        assert!(store.sensors().unwrap().is_empty());
        // Nothing is written until the first mutation
        assert!(!store.path().exists());
    }

    #[test]
    fn test_state_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");

        {
            let mut store = JsonFileStatusStore::open(&path).unwrap();
            store.add_sensor(Sensor::new("Front Door", SensorType::Door).with_active(true)).unwrap();
            store.set_arming_status(ArmingStatus::ArmedAway).unwrap();
            store.set_alarm_status(AlarmStatus::PendingAlarm).unwrap();
        }

        let store = JsonFileStatusStore::open(&path).unwrap();
        assert_eq!(store.arming_status().unwrap(), ArmingStatus::ArmedAway);
        assert_eq!(store.alarm_status().unwrap(), AlarmStatus::PendingAlarm);
        let front = store.sensor("Front Door").unwrap();
        assert!(front.active);
        assert_eq!(front.sensor_type, SensorType::Door);
    }

    #[test]
    fn test_creates_parent_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("state.json");

        let mut store = JsonFileStatusStore::open(&path).unwrap();
        store.set_alarm_status(AlarmStatus::Alarm).unwrap();

        assert!(path.exists());
    }

    #[test]
    fn test_rejected_mutation_not_persisted() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");

        let mut store = JsonFileStatusStore::open(&path).unwrap();
        store.add_sensor(Sensor::new("Hall", SensorType::Motion)).unwrap();
        let before = fs::read_to_string(&path).unwrap();

        let result = store.add_sensor(Sensor::new("Hall", SensorType::Motion));
        assert!(matches!(result, Err(StoreError::DuplicateSensor(_))));
        assert_eq!(fs::read_to_string(&path).unwrap(), before);
    }

    #[test]
    fn test_corrupt_file_is_serialization_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "{ not json").unwrap();

        let result = JsonFileStatusStore::open(&path);
        assert!(matches!(result, Err(StoreError::Serialization(_))));
    }
}

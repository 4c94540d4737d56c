//! In-memory status store

use crate::domain::error::StoreError;
use crate::domain::ports::StatusStore;
use crate::domain::types::{AlarmStatus, ArmingStatus, Sensor};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Complete persisted state: sensors keyed by name plus both statuses
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreState {
    #[serde(default)]
    pub arming_status: ArmingStatus,
    #[serde(default)]
    pub alarm_status: AlarmStatus,
    #[serde(default)]
    pub sensors: BTreeMap<String, Sensor>,
}

impl StoreState {
    pub(crate) fn sensor_list(&self) -> Vec<Sensor> {
        let mut sensors: Vec<Sensor> = self.sensors.values().cloned().collect();
        sensors.sort();
        sensors
    }

    pub(crate) fn update_sensor(&mut self, sensor: &Sensor) -> Result<(), StoreError> {
        match self.sensors.get_mut(&sensor.name) {
            Some(stored) => {
                *stored = sensor.clone();
                Ok(())
            }
            None => Err(StoreError::SensorNotFound(sensor.name.clone())),
        }
    }

    pub(crate) fn add_sensor(&mut self, sensor: Sensor) -> Result<(), StoreError> {
        if self.sensors.contains_key(&sensor.name) {
            return Err(StoreError::DuplicateSensor(sensor.name));
        }
        self.sensors.insert(sensor.name.clone(), sensor);
        Ok(())
    }

    pub(crate) fn remove_sensor(&mut self, name: &str) -> Result<Sensor, StoreError> {
        self.sensors.remove(name).ok_or_else(|| StoreError::SensorNotFound(name.to_string()))
    }
}

/// Status store that keeps everything in process memory
#[derive(Debug, Default)]
pub struct InMemoryStatusStore {
    state: StoreState,
}

impl InMemoryStatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with sensors
    pub fn with_sensors(sensors: impl IntoIterator<Item = Sensor>) -> Self {
        let mut state = StoreState::default();
        for sensor in sensors {
            state.sensors.insert(sensor.name.clone(), sensor);
        }
        Self { state }
    }

    pub fn state(&self) -> &StoreState {
        &self.state
    }
}

impl StatusStore for InMemoryStatusStore {
    fn arming_status(&self) -> Result<ArmingStatus, StoreError> {
        Ok(self.state.arming_status)
    }

    fn set_arming_status(&mut self, status: ArmingStatus) -> Result<(), StoreError> {
        self.state.arming_status = status;
        Ok(())
    }

    fn alarm_status(&self) -> Result<AlarmStatus, StoreError> {
        Ok(self.state.alarm_status)
    }

    fn set_alarm_status(&mut self, status: AlarmStatus) -> Result<(), StoreError> {
        self.state.alarm_status = status;
        Ok(())
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
        self.state.update_sensor(sensor)
    }

    fn add_sensor(&mut self, sensor: Sensor) -> Result<(), StoreError> {
        self.state.add_sensor(sensor)
    }

    fn remove_sensor(&mut self, name: &str) -> Result<Sensor, StoreError> {
        self.state.remove_sensor(name)
    }
}

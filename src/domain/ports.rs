//! Collaborator interfaces consumed and exposed by the security service
//!
//! The service never touches storage, classification or presentation
//! directly; adapters in `io/` implement these traits.

use crate::domain::error::{DetectionError, StoreError};
use crate::domain::types::{AlarmStatus, ArmingStatus, Image, Sensor};

/// Durable holder of the sensor set and both status values
///
/// Writes must be visible to the next read on the same instance.
pub trait StatusStore {
    fn arming_status(&self) -> Result<ArmingStatus, StoreError>;
    fn set_arming_status(&mut self, status: ArmingStatus) -> Result<(), StoreError>;

    fn alarm_status(&self) -> Result<AlarmStatus, StoreError>;
    fn set_alarm_status(&mut self, status: AlarmStatus) -> Result<(), StoreError>;

    /// All sensors, ordered by name
    fn sensors(&self) -> Result<Vec<Sensor>, StoreError>;

    /// Look up a sensor by name
    fn sensor(&self, name: &str) -> Result<Sensor, StoreError> {
        self.sensors()?
            .into_iter()
            .find(|s| s.name == name)
            .ok_or_else(|| StoreError::SensorNotFound(name.to_string()))
    }

    /// Replace the stored sensor with the same name
    fn update_sensor(&mut self, sensor: &Sensor) -> Result<(), StoreError>;

    fn add_sensor(&mut self, sensor: Sensor) -> Result<(), StoreError>;
    fn remove_sensor(&mut self, name: &str) -> Result<Sensor, StoreError>;
}

/// Image classifier answering "does this image show a cat"
pub trait CatDetector {
    fn image_contains_cat(&self, image: &Image, confidence_threshold: f32)
        -> Result<bool, DetectionError>;
}

/// Observer of status changes
///
/// Called synchronously from within the triggering operation.
pub trait StatusListener: Send + Sync {
    fn alarm_status_changed(&self, status: AlarmStatus);

    fn sensors_changed(&self, sensors: &[Sensor]);

    fn cat_detected(&self, _contains_cat: bool) {}
}

impl<S: StatusStore + ?Sized> StatusStore for Box<S> {
    fn arming_status(&self) -> Result<ArmingStatus, StoreError> {
        (**self).arming_status()
    }

    fn set_arming_status(&mut self, status: ArmingStatus) -> Result<(), StoreError> {
        (**self).set_arming_status(status)
    }

    fn alarm_status(&self) -> Result<AlarmStatus, StoreError> {
        (**self).alarm_status()
    }

    fn set_alarm_status(&mut self, status: AlarmStatus) -> Result<(), StoreError> {
        (**self).set_alarm_status(status)
    }

    fn sensors(&self) -> Result<Vec<Sensor>, StoreError> {
        (**self).sensors()
    }

    fn sensor(&self, name: &str) -> Result<Sensor, StoreError> {
        (**self).sensor(name)
    }

    fn update_sensor(&mut self, sensor: &Sensor) -> Result<(), StoreError> {
        (**self).update_sensor(sensor)
    }

    fn add_sensor(&mut self, sensor: Sensor) -> Result<(), StoreError> {
        (**self).add_sensor(sensor)
    }

    fn remove_sensor(&mut self, name: &str) -> Result<Sensor, StoreError> {
        (**self).remove_sensor(name)
    }
}

impl<D: CatDetector + ?Sized> CatDetector for Box<D> {
    fn image_contains_cat(
        &self,
        image: &Image,
        confidence_threshold: f32,
    ) -> Result<bool, DetectionError> {
        (**self).image_contains_cat(image, confidence_threshold)
    }
}

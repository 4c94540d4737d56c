//! Alarm status decisions for sensor, arming and camera events
//!
//! The SecurityService owns the status store and is its only writer. Each
//! operation reads a snapshot (arming status, alarm status, sensors), asks
//! the transition table for the next alarm status, writes the result back
//! and notifies listeners before returning.


use crate::domain::error::{Result, StoreError};
use crate::domain::ports::{CatDetector, StatusListener, StatusStore};
use crate::domain::types::{AlarmStatus, ArmingStatus, Image, Sensor};
use crate::infra::config::DEFAULT_CONFIDENCE_THRESHOLD;
use crate::infra::metrics::Metrics;
use crate::services::transitions::{next_alarm_status, AlarmEvent};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Handle returned by [`SecurityService::add_listener`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Everything a caller can observe about the system at one point in time
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusSnapshot {
    pub arming_status: ArmingStatus,
    pub alarm_status: AlarmStatus,
    pub cat_detected: bool,
    pub sensors: Vec<Sensor>,
}

pub struct SecurityService<S, D> {
    /// Sensors and both status values
    store: S,
    /// Image classifier
    detector: D,
    /// Threshold handed to every detector call
    confidence_threshold: f32,
    /// Result of the most recent successful image analysis
    cat_detected: bool,
    /// Registered listeners, in registration order
    listeners: Vec<(ListenerId, Arc<dyn StatusListener>)>,
    next_listener_id: u64,
    metrics: Arc<Metrics>,
}

impl<S: StatusStore, D: CatDetector> SecurityService<S, D> {
    pub fn new(store: S, detector: D) -> Self {
        Self {
            store,
            detector,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            cat_detected: false,
            listeners: Vec::new(),
            next_listener_id: 0,
            metrics: Arc::new(Metrics::new()),
        }
    }

    pub fn with_confidence_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn add_listener(&mut self, listener: Arc<dyn StatusListener>) -> ListenerId {
        let id = ListenerId(self.next_listener_id);
        self.next_listener_id += 1;
        self.listeners.push((id, listener));
        id
    }

    /// Unregister a listener; returns false if it was not registered
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        self.listeners.len() != before
    }

    /// Turn a sensor on or off and apply the alarm rules
    ///
    /// The sensor's new flag is persisted even when the alarm status does
    /// not change. Returns the resulting alarm status.
    pub fn set_sensor_activation(&mut self, name: &str, active: bool) -> Result<AlarmStatus> {
        let start = Instant::now();
        let result = self.apply_sensor_activation(name, active);
        self.finish_operation(start, &result);
        if result.is_ok() {
            self.metrics.record_sensor_event();
        }
        result
    }

    fn apply_sensor_activation(&mut self, name: &str, active: bool) -> Result<AlarmStatus> {
        let mut sensors = self.store.sensors()?;
        let idx = sensors
            .iter()
            .position(|s| s.name == name)
            .ok_or_else(|| StoreError::SensorNotFound(name.to_string()))?;
        let alarm = self.store.alarm_status()?;
        let arming = self.store.arming_status()?;

        let was_active = sensors[idx].active;
        let event = if active {
            AlarmEvent::SensorActivated { was_active }
        } else {
            let any_active_after =
                sensors.iter().enumerate().any(|(i, s)| i != idx && s.active);
            AlarmEvent::SensorDeactivated { was_active, any_active_after }
        };
        let next = next_alarm_status(alarm, arming, event);

        sensors[idx].active = active;
        self.store.update_sensor(&sensors[idx])?;
        info!(
            sensor = %name,
            was_active = %was_active,
            active = %active,
            arming_status = %arming,
            "sensor_activation_changed"
        );
        self.notify_sensors(&sensors);

        self.apply_alarm_status(alarm, next, event)
    }

    /// Change the arming status
    ///
    /// Disarming clears any alarm. Arming resets every sensor to inactive,
    /// and arming home right after a cat was seen raises the alarm.
    pub fn set_arming_status(&mut self, status: ArmingStatus) -> Result<AlarmStatus> {
        let start = Instant::now();
        let result = self.apply_arming_status(status);
        self.finish_operation(start, &result);
        if result.is_ok() {
            self.metrics.record_arming_change();
        }
        result
    }

    fn apply_arming_status(&mut self, status: ArmingStatus) -> Result<AlarmStatus> {
        let alarm = self.store.alarm_status()?;
        let previous = self.store.arming_status()?;
        let sensors = if status.is_armed() { Some(self.store.sensors()?) } else { None };

        let event = match status {
            ArmingStatus::Disarmed => AlarmEvent::Disarmed,
            mode => AlarmEvent::Armed { mode, cat_seen: self.cat_detected },
        };
        let next = next_alarm_status(alarm, previous, event);

        self.store.set_arming_status(status)?;
        info!(
            from = %previous,
            to = %status,
            cat_detected = %self.cat_detected,
            "arming_status_changed"
        );

        let result = self.finish_arming(sensors, alarm, next, event);
        if result.is_err() {
            self.restore_arming_status(previous);
        }
        result
    }

    /// Sensor reset and alarm write that follow an arming status write
    fn finish_arming(
        &mut self,
        sensors: Option<Vec<Sensor>>,
        alarm: AlarmStatus,
        next: Option<AlarmStatus>,
        event: AlarmEvent,
    ) -> Result<AlarmStatus> {
        if let Some(mut sensors) = sensors {
            for sensor in sensors.iter_mut() {
                sensor.active = false;
                self.store.update_sensor(sensor)?;
            }
            debug!(sensors = %sensors.len(), "sensors_reset");
            self.notify_sensors(&sensors);
        }

        self.apply_alarm_status(alarm, next, event)
    }

    /// Put the arming status back after a failed arming change
    fn restore_arming_status(&mut self, previous: ArmingStatus) {
        match self.store.set_arming_status(previous) {
            Ok(()) => warn!(arming_status = %previous, "arming_status_restored"),
            Err(e) => error!(arming_status = %previous, error = %e, "arming_status_restore_failed"),
        }
    }

    /// Run an image through the cat detector and apply the camera rules
    pub fn process_image(&mut self, image: &Image) -> Result<AlarmStatus> {
        let start = Instant::now();
        let result = self.apply_image(image);
        self.finish_operation(start, &result);
        result
    }

    fn apply_image(&mut self, image: &Image) -> Result<AlarmStatus> {
        let contains_cat = self.detector.image_contains_cat(image, self.confidence_threshold)?;

        let alarm = self.store.alarm_status()?;
        let arming = self.store.arming_status()?;
        let any_active = self.store.sensors()?.iter().any(|s| s.active);

        self.cat_detected = contains_cat;
        self.metrics.record_image(contains_cat);
        info!(
            source = %image.source().unwrap_or("-"),
            contains_cat = %contains_cat,
            any_active = %any_active,
            arming_status = %arming,
            "image_processed"
        );
        for (_, listener) in &self.listeners {
            listener.cat_detected(contains_cat);
        }

        let event = AlarmEvent::ImageAnalyzed { contains_cat, any_active };
        self.apply_alarm_status(alarm, next_alarm_status(alarm, arming, event), event)
    }

    /// Register a new sensor
    pub fn add_sensor(&mut self, sensor: Sensor) -> Result<()> {
        let name = sensor.name.clone();
        let sensor_type = sensor.sensor_type;
        self.store.add_sensor(sensor)?;
        info!(sensor = %name, sensor_type = %sensor_type, "sensor_added");

        let sensors = self.store.sensors()?;
        self.notify_sensors(&sensors);
        Ok(())
    }

    /// Unregister a sensor by name
    ///
    /// The alarm status is left as it is, even if the sensor was active.
    pub fn remove_sensor(&mut self, name: &str) -> Result<Sensor> {
        let removed = self.store.remove_sensor(name)?;
        info!(sensor = %name, was_active = %removed.active, "sensor_removed");

        let sensors = self.store.sensors()?;
        self.notify_sensors(&sensors);
        Ok(removed)
    }

    pub fn alarm_status(&self) -> Result<AlarmStatus> {
        Ok(self.store.alarm_status()?)
    }

    pub fn arming_status(&self) -> Result<ArmingStatus> {
        Ok(self.store.arming_status()?)
    }

    pub fn sensors(&self) -> Result<Vec<Sensor>> {
        Ok(self.store.sensors()?)
    }

    /// Result of the most recent image analysis (false before the first one)
    pub fn cat_detected(&self) -> bool {
        self.cat_detected
    }

    pub fn confidence_threshold(&self) -> f32 {
        self.confidence_threshold
    }

    pub fn snapshot(&self) -> Result<StatusSnapshot> {
        Ok(StatusSnapshot {
            arming_status: self.store.arming_status()?,
            alarm_status: self.store.alarm_status()?,
            cat_detected: self.cat_detected,
            sensors: self.store.sensors()?,
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn detector(&self) -> &D {
        &self.detector
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    /// Write `next` if it differs from `current` and notify listeners
    fn apply_alarm_status(
        &mut self,
        current: AlarmStatus,
        next: Option<AlarmStatus>,
        event: AlarmEvent,
    ) -> Result<AlarmStatus> {
        let Some(next) = next.filter(|next| *next != current) else {
            debug!(alarm_status = %current, event = %event.as_str(), "alarm_status_unchanged");
            return Ok(current);
        };

        self.store.set_alarm_status(next)?;
        self.metrics.record_alarm_transition(next);

        if next == AlarmStatus::Alarm {
            warn!(from = %current, to = %next, event = %event.as_str(), "alarm_status_changed");
        } else {
            info!(from = %current, to = %next, event = %event.as_str(), "alarm_status_changed");
        }

        for (_, listener) in &self.listeners {
            listener.alarm_status_changed(next);
        }
        Ok(next)
    }

    fn notify_sensors(&self, sensors: &[Sensor]) {
        for (_, listener) in &self.listeners {
            listener.sensors_changed(sensors);
        }
    }

    fn finish_operation<T>(&self, start: Instant, result: &Result<T>) {
        self.metrics.record_operation(start.elapsed().as_micros() as u64);
        if let Err(e) = result {
            self.metrics.record_operation_failed();
            warn!(error = %e, "security_operation_failed");
        }
    }
}

impl<S, D> std::fmt::Debug for SecurityService<S, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecurityService")
            .field("confidence_threshold", &self.confidence_threshold)
            .field("cat_detected", &self.cat_detected)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

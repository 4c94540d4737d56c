//! Status listener that writes notifications to the tracing log

use crate::domain::ports::StatusListener;
use crate::domain::types::{AlarmStatus, Sensor};
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct LoggingListener {
    site_id: String,
}

impl LoggingListener {
    pub fn new(site_id: &str) -> Self {
        Self { site_id: site_id.to_string() }
    }
}

impl StatusListener for LoggingListener {
    fn alarm_status_changed(&self, status: AlarmStatus) {
        if status == AlarmStatus::Alarm {
            warn!(site = %self.site_id, alarm_status = %status, "alarm_raised");
        } else {
            info!(site = %self.site_id, alarm_status = %status, "alarm_status_notified");
        }
    }

    fn sensors_changed(&self, sensors: &[Sensor]) {
        let active: Vec<&str> =
            sensors.iter().filter(|s| s.active).map(|s| s.name.as_str()).collect();
        info!(
            site = %self.site_id,
            sensors = %sensors.len(),
            active = ?active,
            "sensors_notified"
        );
    }

    fn cat_detected(&self, contains_cat: bool) {
        info!(site = %self.site_id, contains_cat = %contains_cat, "camera_notified");
    }
}

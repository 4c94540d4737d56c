//! Alarm status transition table
//!
//! Every rule the security service applies is a row in
//! [`next_alarm_status`]. The service gathers a snapshot, builds an
//! [`AlarmEvent`], and writes whatever this function returns.

use crate::domain::types::{AlarmStatus, ArmingStatus};

/// An input to the alarm rules, carrying the facts each rule needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmEvent {
    /// A sensor is being turned on
    SensorActivated { was_active: bool },
    /// A sensor is being turned off
    SensorDeactivated {
        was_active: bool,
        /// Whether any other sensor is still active after this one goes off
        any_active_after: bool,
    },
    /// The cat detector returned a result
    ImageAnalyzed { contains_cat: bool, any_active: bool },
    /// The system was armed in `mode`
    Armed { mode: ArmingStatus, cat_seen: bool },
    Disarmed,
}

impl AlarmEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlarmEvent::SensorActivated { .. } => "sensor_activated",
            AlarmEvent::SensorDeactivated { .. } => "sensor_deactivated",
            AlarmEvent::ImageAnalyzed { .. } => "image_analyzed",
            AlarmEvent::Armed { .. } => "armed",
            AlarmEvent::Disarmed => "disarmed",
        }
    }
}

/// Derive the next alarm status, or `None` when the event leaves it unchanged
///
/// `arming` is the arming status in effect when the event is evaluated.
pub fn next_alarm_status(
    alarm: AlarmStatus,
    arming: ArmingStatus,
    event: AlarmEvent,
) -> Option<AlarmStatus> {
    use AlarmEvent::*;
    use AlarmStatus::*;

    match (alarm, arming, event) {
        // Arming changes
        (_, _, Disarmed) => Some(NoAlarm),
        (_, _, Armed { mode: ArmingStatus::ArmedHome, cat_seen: true }) => Some(Alarm),
        (_, _, Armed { .. }) => None,

        // Sensors cannot move a full alarm
        (Alarm, _, SensorActivated { .. } | SensorDeactivated { .. }) => None,

        // Sensor on
        (_, ArmingStatus::Disarmed, SensorActivated { .. }) => None,
        (NoAlarm, _, SensorActivated { was_active: false }) => Some(PendingAlarm),
        (NoAlarm, _, SensorActivated { was_active: true }) => None,
        (PendingAlarm, _, SensorActivated { .. }) => Some(Alarm),

        // Sensor off
        (_, _, SensorDeactivated { was_active: false, .. }) => None,
        (PendingAlarm, _, SensorDeactivated { any_active_after: false, .. }) => Some(NoAlarm),
        (_, _, SensorDeactivated { .. }) => None,

        // Camera
        (_, ArmingStatus::ArmedHome, ImageAnalyzed { contains_cat: true, .. }) => Some(Alarm),
        (_, _, ImageAnalyzed { contains_cat: false, any_active: false }) => Some(NoAlarm),
        (_, _, ImageAnalyzed { .. }) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use AlarmStatus::*;

    const ALL_ALARM: [AlarmStatus; 3] = [NoAlarm, PendingAlarm, Alarm];
    const ARMED: [ArmingStatus; 2] = [ArmingStatus::ArmedHome, ArmingStatus::ArmedAway];
    const ALL_ARMING: [ArmingStatus; 3] =
        [ArmingStatus::Disarmed, ArmingStatus::ArmedHome, ArmingStatus::ArmedAway];

    fn activated(was_active: bool) -> AlarmEvent {
        AlarmEvent::SensorActivated { was_active }
    }

    fn deactivated(was_active: bool, any_active_after: bool) -> AlarmEvent {
        AlarmEvent::SensorDeactivated { was_active, any_active_after }
    }

    #[test]
    fn test_armed_no_alarm_activation_goes_pending() {
        for arming in ARMED {
            assert_eq!(next_alarm_status(NoAlarm, arming, activated(false)), Some(PendingAlarm));
        }
    }

    #[test]
    fn test_armed_pending_activation_escalates() {
        for arming in ARMED {
            assert_eq!(next_alarm_status(PendingAlarm, arming, activated(false)), Some(Alarm));
            assert_eq!(next_alarm_status(PendingAlarm, arming, activated(true)), Some(Alarm));
        }
    }

    #[test]
    fn test_reactivating_active_sensor_without_pending_is_noop() {
        assert_eq!(next_alarm_status(NoAlarm, ArmingStatus::ArmedAway, activated(true)), None);
    }

    #[test]
    fn test_disarmed_ignores_activation() {
        for alarm in [NoAlarm, PendingAlarm] {
            for was_active in [false, true] {
                assert_eq!(
                    next_alarm_status(alarm, ArmingStatus::Disarmed, activated(was_active)),
                    None
                );
            }
        }
    }

    #[test]
    fn test_alarm_is_sink_for_sensor_events() {
        for arming in ALL_ARMING {
            for was_active in [false, true] {
                assert_eq!(next_alarm_status(Alarm, arming, activated(was_active)), None);
                for any in [false, true] {
                    assert_eq!(next_alarm_status(Alarm, arming, deactivated(was_active, any)), None);
                }
            }
        }
    }

    #[test]
    fn test_pending_clears_when_last_sensor_goes_off() {
        for arming in ARMED {
            assert_eq!(next_alarm_status(PendingAlarm, arming, deactivated(true, false)), Some(NoAlarm));
            assert_eq!(next_alarm_status(PendingAlarm, arming, deactivated(true, true)), None);
        }
    }

    #[test]
    fn test_deactivating_inactive_sensor_never_changes_status() {
        for alarm in ALL_ALARM {
            for arming in ALL_ARMING {
                for any in [false, true] {
                    assert_eq!(next_alarm_status(alarm, arming, deactivated(false, any)), None);
                }
            }
        }
    }

    #[test]
    fn test_disarm_always_clears() {
        for alarm in ALL_ALARM {
            for arming in ALL_ARMING {
                assert_eq!(next_alarm_status(alarm, arming, AlarmEvent::Disarmed), Some(NoAlarm));
            }
        }
    }

    #[test]
    fn test_arm_home_with_cat_seen_alarms() {
        let event = AlarmEvent::Armed { mode: ArmingStatus::ArmedHome, cat_seen: true };
        assert_eq!(next_alarm_status(NoAlarm, ArmingStatus::Disarmed, event), Some(Alarm));

        let away = AlarmEvent::Armed { mode: ArmingStatus::ArmedAway, cat_seen: true };
        assert_eq!(next_alarm_status(NoAlarm, ArmingStatus::Disarmed, away), None);

        let no_cat = AlarmEvent::Armed { mode: ArmingStatus::ArmedHome, cat_seen: false };
        assert_eq!(next_alarm_status(PendingAlarm, ArmingStatus::Disarmed, no_cat), None);
    }

    #[test]
    fn test_image_rules() {
        let cat = |any_active| AlarmEvent::ImageAnalyzed { contains_cat: true, any_active };
        let no_cat = |any_active| AlarmEvent::ImageAnalyzed { contains_cat: false, any_active };

        assert_eq!(next_alarm_status(NoAlarm, ArmingStatus::ArmedHome, cat(false)), Some(Alarm));
        assert_eq!(next_alarm_status(PendingAlarm, ArmingStatus::ArmedHome, cat(true)), Some(Alarm));
        assert_eq!(next_alarm_status(NoAlarm, ArmingStatus::ArmedAway, cat(false)), None);
        assert_eq!(next_alarm_status(NoAlarm, ArmingStatus::Disarmed, cat(false)), None);

        assert_eq!(next_alarm_status(PendingAlarm, ArmingStatus::ArmedAway, no_cat(false)), Some(NoAlarm));
        assert_eq!(next_alarm_status(PendingAlarm, ArmingStatus::ArmedHome, no_cat(true)), None);
    }
}

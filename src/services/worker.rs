//! Security command worker - single owner of the SecurityService
//!
//! Callers enqueue commands through an mpsc channel; the worker applies them
//! one at a time, so every read-decide-write sequence runs without
//! interleaving. The latest status snapshot is published on a watch channel.

use crate::domain::error::{Result, SecurityError};
use crate::domain::ports::{CatDetector, StatusStore};
use crate::domain::types::{AlarmStatus, ArmingStatus, Image, Sensor, SensorType};
use crate::services::security::{SecurityService, StatusSnapshot};
use std::path::PathBuf;
use std::time::Instant;
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

/// A request to the security worker
#[derive(Debug, Clone)]
pub enum SecurityCommand {
    SetArming(ArmingStatus),
    Activate(String),
    Deactivate(String),
    ProcessImage(Image),
    /// Read an image from disk, then process it
    ProcessImageFile(PathBuf),
    AddSensor { name: String, sensor_type: SensorType },
    RemoveSensor(String),
    Status,
}

impl SecurityCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            SecurityCommand::SetArming(_) => "set_arming",
            SecurityCommand::Activate(_) => "activate",
            SecurityCommand::Deactivate(_) => "deactivate",
            SecurityCommand::ProcessImage(_) => "process_image",
            SecurityCommand::ProcessImageFile(_) => "process_image_file",
            SecurityCommand::AddSensor { .. } => "add_sensor",
            SecurityCommand::RemoveSensor(_) => "remove_sensor",
            SecurityCommand::Status => "status",
        }
    }
}

fn required<'a>(rest: &'a str, verb: &str, what: &str) -> Result<&'a str> {
    if rest.is_empty() {
        Err(SecurityError::InvalidCommand(format!("'{verb}' needs {what}")))
    } else {
        Ok(rest)
    }
}

/// Parse one text command, e.g. `arm home`, `activate Front Door`, `add door Back Door`
impl std::str::FromStr for SecurityCommand {
    type Err = SecurityError;

    fn from_str(line: &str) -> Result<Self> {
        let line = line.trim();
        let (verb, rest) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (line, ""),
        };

        match verb.to_ascii_lowercase().as_str() {
            "arm" => {
                let status: ArmingStatus = required(rest, "arm", "a mode")?.parse()?;
                if !status.is_armed() {
                    return Err(SecurityError::InvalidArmingStatus(rest.to_string()));
                }
                Ok(SecurityCommand::SetArming(status))
            }
            "disarm" => Ok(SecurityCommand::SetArming(ArmingStatus::Disarmed)),
            "activate" => {
                Ok(SecurityCommand::Activate(required(rest, "activate", "a sensor name")?.to_string()))
            }
            "deactivate" => Ok(SecurityCommand::Deactivate(
                required(rest, "deactivate", "a sensor name")?.to_string(),
            )),
            "image" => {
                Ok(SecurityCommand::ProcessImageFile(PathBuf::from(required(rest, "image", "a path")?)))
            }
            "add" => {
                let rest = required(rest, "add", "a sensor type and name")?;
                let (kind, name) = rest.split_once(char::is_whitespace).ok_or_else(|| {
                    SecurityError::InvalidCommand("'add' needs a sensor type and name".to_string())
                })?;
                Ok(SecurityCommand::AddSensor {
                    name: name.trim().to_string(),
                    sensor_type: kind.parse()?,
                })
            }
            "remove" => {
                Ok(SecurityCommand::RemoveSensor(required(rest, "remove", "a sensor name")?.to_string()))
            }
            "status" => Ok(SecurityCommand::Status),
            "" => Err(SecurityError::InvalidCommand("empty command".to_string())),
            other => Err(SecurityError::InvalidCommand(format!("unknown command '{other}'"))),
        }
    }
}

/// Worker that applies security commands in arrival order
pub struct SecurityWorker<S, D> {
    service: SecurityService<S, D>,
    cmd_rx: mpsc::Receiver<SecurityCommand>,
    snapshot_tx: watch::Sender<StatusSnapshot>,
}

impl<S: StatusStore, D: CatDetector> SecurityWorker<S, D> {
    pub fn new(
        service: SecurityService<S, D>,
        cmd_rx: mpsc::Receiver<SecurityCommand>,
        snapshot_tx: watch::Sender<StatusSnapshot>,
    ) -> Self {
        Self { service, cmd_rx, snapshot_tx }
    }

    /// Run until every sender is dropped or shutdown is signalled, then hand
    /// the service back
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> SecurityService<S, D> {
        info!("security_worker_started");

        loop {
            tokio::select! {
                cmd = self.cmd_rx.recv() => match cmd {
                    Some(cmd) => self.apply(cmd),
                    None => break,
                },
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("security_worker_stopped");
        self.service
    }

    fn apply(&mut self, cmd: SecurityCommand) {
        let kind = cmd.as_str();
        let start = Instant::now();

        match self.handle(cmd) {
            Ok(status) => {
                info!(
                    command = %kind,
                    alarm_status = %status,
                    elapsed_us = %start.elapsed().as_micros(),
                    "security_command_applied"
                );
            }
            Err(e) => {
                warn!(command = %kind, error = %e, "security_command_rejected");
            }
        }

        match self.service.snapshot() {
            Ok(snapshot) => {
                self.snapshot_tx.send_replace(snapshot);
            }
            Err(e) => warn!(error = %e, "security_snapshot_failed"),
        }
    }

    /// Apply one command and return the resulting alarm status
    pub fn handle(&mut self, cmd: SecurityCommand) -> Result<AlarmStatus> {
        match cmd {
            SecurityCommand::SetArming(status) => self.service.set_arming_status(status),
            SecurityCommand::Activate(name) => self.service.set_sensor_activation(&name, true),
            SecurityCommand::Deactivate(name) => self.service.set_sensor_activation(&name, false),
            SecurityCommand::ProcessImage(image) => self.service.process_image(&image),
            SecurityCommand::ProcessImageFile(path) => {
                let bytes = std::fs::read(&path).map_err(|source| SecurityError::ImageRead {
                    path: path.display().to_string(),
                    source,
                })?;
                let image = Image::new(bytes).with_source(path.display().to_string());
                self.service.process_image(&image)
            }
            SecurityCommand::AddSensor { name, sensor_type } => {
                self.service.add_sensor(Sensor::new(name, sensor_type))?;
                self.service.alarm_status()
            }
            SecurityCommand::RemoveSensor(name) => {
                self.service.remove_sensor(&name)?;
                self.service.alarm_status()
            }
            SecurityCommand::Status => {
                let snapshot = self.service.snapshot()?;
                let active: Vec<&str> = snapshot
                    .sensors
                    .iter()
                    .filter(|s| s.active)
                    .map(|s| s.name.as_str())
                    .collect();
                info!(
                    arming_status = %snapshot.arming_status,
                    alarm_status = %snapshot.alarm_status,
                    cat_detected = %snapshot.cat_detected,
                    sensors = %snapshot.sensors.len(),
                    active = ?active,
                    "security_status"
                );
                Ok(snapshot.alarm_status)
            }
        }
    }
}

/// Create a command channel, a snapshot watch and the worker
///
/// Returns the sender (for producers), the snapshot receiver and the worker
/// (to be run by the caller).
pub fn create_security_worker<S: StatusStore, D: CatDetector>(
    service: SecurityService<S, D>,
    buffer_size: usize,
) -> Result<(mpsc::Sender<SecurityCommand>, watch::Receiver<StatusSnapshot>, SecurityWorker<S, D>)>
{
    let initial = service.snapshot()?;
    let (cmd_tx, cmd_rx) = mpsc::channel(buffer_size);
    let (snapshot_tx, snapshot_rx) = watch::channel(initial);
    let worker = SecurityWorker::new(service, cmd_rx, snapshot_tx);
    Ok((cmd_tx, snapshot_rx, worker))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::detector::ScriptedCatDetector;
    use crate::io::memory_store::InMemoryStatusStore;

    fn parse(line: &str) -> Result<SecurityCommand> {
        line.parse()
    }

    #[test]
    fn test_parse_arming_commands() {
        assert!(matches!(
            parse("arm home").unwrap(),
            SecurityCommand::SetArming(ArmingStatus::ArmedHome)
        ));
        assert!(matches!(
            parse("ARM armed_away").unwrap(),
            SecurityCommand::SetArming(ArmingStatus::ArmedAway)
        ));
        assert!(matches!(
            parse("disarm").unwrap(),
            SecurityCommand::SetArming(ArmingStatus::Disarmed)
        ));
    }

    #[test]
    fn test_parse_invalid_arming_mode() {
        assert!(matches!(parse("arm garden"), Err(SecurityError::InvalidArmingStatus(_))));
        assert!(matches!(parse("arm disarmed"), Err(SecurityError::InvalidArmingStatus(_))));
        assert!(matches!(parse("arm"), Err(SecurityError::InvalidCommand(_))));
    }

    #[test]
    fn test_parse_sensor_commands_keep_full_name() {
        match parse("activate  Front Door ").unwrap() {
            SecurityCommand::Activate(name) => assert_eq!(name, "Front Door"),
            other => panic!("unexpected {other:?}"),
        }
        match parse("add window Kitchen Window").unwrap() {
            SecurityCommand::AddSensor { name, sensor_type } => {
                assert_eq!(name, "Kitchen Window");
                assert_eq!(sensor_type, SensorType::Window);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(parse("add door"), Err(SecurityError::InvalidCommand(_))));
        assert!(matches!(parse("remove"), Err(SecurityError::InvalidCommand(_))));
    }

    #[test]
    fn test_parse_unknown_command() {
        assert!(matches!(parse("open sesame"), Err(SecurityError::InvalidCommand(_))));
        assert!(matches!(parse("   "), Err(SecurityError::InvalidCommand(_))));
    }

    #[tokio::test]
    async fn test_worker_applies_commands_in_order() {
        let store = InMemoryStatusStore::with_sensors([
            Sensor::new("Front Door", SensorType::Door),
            Sensor::new("Back Door", SensorType::Door),
        ]);
        let service = SecurityService::new(store, ScriptedCatDetector::always(false));
        let (cmd_tx, snapshot_rx, worker) = create_security_worker(service, 16).unwrap();

        for line in ["arm home", "activate Front Door", "activate Back Door", "bogus"] {
            match line.parse::<SecurityCommand>() {
                Ok(cmd) => cmd_tx.send(cmd).await.unwrap(),
                Err(_) => continue,
            }
        }
        cmd_tx.send(SecurityCommand::Activate("Garage".to_string())).await.unwrap();
        drop(cmd_tx);

        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let service = worker.run(shutdown_rx).await;

        assert_eq!(service.alarm_status().unwrap(), AlarmStatus::Alarm);
        assert_eq!(snapshot_rx.borrow().alarm_status, AlarmStatus::Alarm);
        assert_eq!(snapshot_rx.borrow().arming_status, ArmingStatus::ArmedHome);
        assert_eq!(service.metrics().report().operations_failed_total, 1);
    }

    #[tokio::test]
    async fn test_worker_stops_on_shutdown() {
        let service =
            SecurityService::new(InMemoryStatusStore::new(), ScriptedCatDetector::always(false));
        let (cmd_tx, _snapshot_rx, worker) = create_security_worker(service, 4).unwrap();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(worker.run(shutdown_rx));
        shutdown_tx.send(true).unwrap();
        let service = handle.await.unwrap();

        // The command sender is still alive, so only the signal can have stopped it
        assert!(cmd_tx.is_closed());
        assert_eq!(service.alarm_status().unwrap(), AlarmStatus::NoAlarm);
    }

    #[tokio::test]
    async fn test_worker_reads_image_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.jpg");
        std::fs::write(&path, [0xFF, 0xD8, 0xFF]).unwrap();

        let mut store = InMemoryStatusStore::new();
        store.set_arming_status(ArmingStatus::ArmedHome).unwrap();
        let service = SecurityService::new(store, ScriptedCatDetector::always(true));
        let (_cmd_tx, _snapshot_rx, mut worker) = create_security_worker(service, 4).unwrap();

        let status = worker.handle(SecurityCommand::ProcessImageFile(path)).unwrap();
        assert_eq!(status, AlarmStatus::Alarm);

        let missing = worker.handle(SecurityCommand::ProcessImageFile(dir.path().join("none.jpg")));
        match missing {
            Err(SecurityError::ImageRead { path, source }) => {
                assert!(path.ends_with("none.jpg"));
                assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}

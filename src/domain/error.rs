//! Error types for the security service and its collaborators

use thiserror::Error;

/// Failures raised by a status store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("sensor '{0}' not found")]
    SensorNotFound(String),

    #[error("sensor '{0}' already registered")]
    DuplicateSensor(String),

    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("store serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Failures raised by a cat detector
#[derive(Error, Debug)]
pub enum DetectionError {
    #[error("image is empty")]
    EmptyImage,

    #[error("confidence threshold {0} outside 0..=100")]
    InvalidThreshold(f32),

    #[error("classification failed: {message}")]
    Classification { message: String },
}

#[derive(Error, Debug)]
pub enum SecurityError {
    #[error("unknown sensor '{0}'")]
    UnknownSensor(String),

    #[error("invalid arming status '{0}'")]
    InvalidArmingStatus(String),

    #[error("invalid command: {0}")]
    InvalidCommand(String),

    #[error("cannot read image {path}: {source}")]
    ImageRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("status store error: {0}")]
    Store(#[source] StoreError),

    #[error("cat detection error: {0}")]
    Detection(#[from] DetectionError),
}

impl From<StoreError> for SecurityError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::SensorNotFound(name) => SecurityError::UnknownSensor(name),
            other => SecurityError::Store(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, SecurityError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sensor_not_found_maps_to_unknown_sensor() {
        let err: SecurityError = StoreError::SensorNotFound("Garage".to_string()).into();
        assert!(matches!(err, SecurityError::UnknownSensor(ref name) if name == "Garage"));
        assert_eq!(err.to_string(), "unknown sensor 'Garage'");
    }

    #[test]
    fn test_io_error_stays_store_error() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        let err: SecurityError = StoreError::from(io).into();
        assert!(matches!(err, SecurityError::Store(StoreError::Io(_))));
    }
}

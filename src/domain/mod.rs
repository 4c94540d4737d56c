//! Domain models - status enumerations, sensors, errors and ports
//!
//! This module contains the canonical data types used throughout the system:
//! - `AlarmStatus` / `ArmingStatus` - the two status values owned by the store
//! - `Sensor` - named binary device with an active flag
//! - `Image` - raw bytes submitted for cat detection
//! - `ports` - traits for the status store, cat detector and listeners

pub mod error;
pub mod ports;
pub mod types;

// Re-export commonly used types at module level
pub use error::{DetectionError, Result, SecurityError, StoreError};
pub use ports::{CatDetector, StatusListener, StatusStore};
pub use types::{AlarmStatus, ArmingStatus, Image, Sensor, SensorId, SensorType};

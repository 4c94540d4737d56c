//! IO modules - adapters behind the domain ports
//!
//! This module contains the concrete collaborators of the security service:
//! - `memory_store` - status store held in process memory
//! - `file_store` - status store persisted as a JSON file
//! - `detector` - fake and scripted cat detectors
//! - `log_listener` - status listener that writes to the tracing log

pub mod detector;
pub mod file_store;
pub mod log_listener;
pub mod memory_store;

// Re-export commonly used types
pub use detector::{FakeCatDetector, ScriptedCatDetector};
pub use file_store::JsonFileStatusStore;
pub use log_listener::LoggingListener;
pub use memory_store::{InMemoryStatusStore, StoreState};

//! Services - alarm rules and state management
//!
//! This module contains the core business logic services:
//! - `transitions` - Alarm status transition table
//! - `security` - SecurityService applying the table to store snapshots
//! - `worker` - Async command worker owning the SecurityService

pub mod security;
pub mod transitions;
pub mod worker;

// Re-export commonly used types
pub use security::{ListenerId, SecurityService, StatusSnapshot};
pub use transitions::{next_alarm_status, AlarmEvent};
pub use worker::{create_security_worker, SecurityCommand, SecurityWorker};

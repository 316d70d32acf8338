//! Infrastructure Layer
//!
//! Configuration loading and logging setup.

pub mod config;
pub mod telemetry;

pub use config::{DriverConfig, HazardConfig, LockOrderingConfig, VisibilityConfig};

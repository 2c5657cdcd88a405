//! Configuration loading
//!
//! The configuration types live in `reefbot_core::config`; this module
//! reads them from storage and checks them before the robot starts.

pub mod loader;

pub use loader::{load, load_binary, parse_toml, validate, ConfigError};

/// Shipped configuration, identical to the built-in defaults
pub const DEFAULT_TOML: &str = include_str!("../../config/robot.toml");

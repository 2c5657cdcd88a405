//! Configuration types
//!
//! Board-agnostic configuration structures. Loaded from TOML or postcard
//! binary data by the robot crate.

pub mod types;

pub use types::*;

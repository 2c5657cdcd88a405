//! Reefbot robot program
//!
//! Ties the subsystems to the scheduler:
//! - Configuration loading (TOML with a postcard fallback)
//! - Operator bindings fed from an `embassy-sync` channel
//! - Autonomous routines and the pre-match selector
//! - The robot container and its fixed-period control loop

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

extern crate alloc;

#[macro_use]
mod fmt;

pub mod bindings;
pub mod config;
pub mod robot;
pub mod routines;

pub use bindings::{Bindings, Button, Controller, Input, OperatorChannel, OperatorEvent, Sticks, Trigger};
pub use config::ConfigError;
pub use robot::{Robot, RobotMode};
pub use routines::{RoutineId, Selector};

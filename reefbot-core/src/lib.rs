//! Board-agnostic core logic for the reefbot
//!
//! This crate contains all control logic that does not depend on
//! specific hardware implementations:
//!
//! - Hardware abstraction traits (motor controller, vision sensor, drive base)
//! - Tasks and task combinators
//! - Resource-exclusive task scheduler
//! - Feedback (PID) controller
//! - Configuration type definitions and unit conversions

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

extern crate alloc;

#[macro_use]
mod fmt;

pub mod config;
pub mod control;
pub mod scheduler;
pub mod task;
pub mod traits;
pub mod units;

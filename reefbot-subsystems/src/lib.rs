//! Robot subsystems
//!
//! Each subsystem owns its actuators exclusively and exposes task builders
//! that borrow it through a `RefCell`:
//!
//! - Lift (dual-motor elevator, manual and closed-loop position)
//! - Vision aligner (two feedback loops steering the base onto a target)
//! - Drive (swerve base with scoped speed limits)
//! - Intake rollers and climb winch (open-loop percent output)

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

extern crate alloc;

#[macro_use]
mod fmt;

pub mod aligner;
pub mod drive;
pub mod lift;
pub mod mechanisms;
pub mod rollers;
pub mod winch;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use aligner::{AlignState, Aligner};
pub use drive::Drive;
pub use lift::{Lift, LiftLevel, LiftState};
pub use mechanisms::{Devices, Mechanisms};
pub use rollers::Rollers;
pub use winch::Winch;

//! Resource-exclusive task scheduler
//!
//! Runs top-level task trees once per tick and guarantees that at most one
//! tree claims any [`Resources`](crate::task::Resources) handle.

pub mod executor;

pub use executor::{DefaultFactory, ScheduleError, Scheduler, TaskId, MAX_DEFAULTS, MAX_TASKS};

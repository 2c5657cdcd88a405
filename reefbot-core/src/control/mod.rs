//! Closed-loop control
//!
//! Generic feedback controller shared by the lift and the vision aligner.

pub mod feedback;

pub use feedback::FeedbackController;

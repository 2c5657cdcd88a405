//! Vision sensor trait
//!
//! Target detection runs on the camera itself; this trait only exposes its
//! results and the two knobs the aligner touches.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Camera LED state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Illumination {
    /// LEDs forced on
    On,
    /// LEDs forced off
    Off,
}

/// Trait for a camera reporting a single tracked target
pub trait VisionSensor {
    /// Check if a target is currently detected
    fn target_visible(&mut self) -> bool;

    /// Horizontal angle from crosshair to target (degrees)
    fn offset_x_deg(&mut self) -> f32;

    /// Vertical angle from crosshair to target (degrees)
    fn offset_y_deg(&mut self) -> f32;

    /// Switch the camera LEDs
    fn set_illumination(&mut self, illumination: Illumination);

    /// Select the active processing pipeline
    fn set_pipeline(&mut self, pipeline: u8);
}

//! Motor controller trait
//!
//! The only hardware contact point for voltage-driven actuators. The core
//! never depends on controller telemetry beyond position.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Behaviour of a motor when commanded to zero output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum NeutralMode {
    /// Windings shorted, motor resists rotation
    #[default]
    Brake,
    /// Windings open, motor spins freely
    Coast,
}

/// Trait for smart motor controllers (TalonFX and similar)
///
/// Implementations wrap the vendor API; register access stays outside
/// this crate.
pub trait MotorController {
    /// Apply a voltage to the motor (positive = forward)
    fn set_voltage(&mut self, volts: f32);

    /// Get the integrated rotor position in rotations
    fn position_rotations(&self) -> f32;

    /// Select brake or coast behaviour at zero output
    fn set_neutral_mode(&mut self, mode: NeutralMode);

    /// Zero output and engage brake mode
    fn brake(&mut self) {
        self.set_voltage(0.0);
        self.set_neutral_mode(NeutralMode::Brake);
    }
}

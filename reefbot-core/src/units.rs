//! Unit conversions
//!
//! Pure functions between physical units and actuator-native units.

/// Nominal battery voltage used to scale percent commands
pub const MAX_VOLTAGE: f32 = 12.0;

/// Meters per foot
pub const METERS_PER_FOOT: f32 = 0.3048;

/// Convert a drive percentage (-100..100) to volts
pub fn percent_to_voltage(percent: f32) -> f32 {
    (percent / 100.0) * MAX_VOLTAGE
}

/// Convert volts to a drive percentage
pub fn voltage_to_percent(volts: f32) -> f32 {
    (volts / MAX_VOLTAGE) * 100.0
}

/// Convert feet to meters
pub fn feet_to_meters(feet: f32) -> f32 {
    feet * METERS_PER_FOOT
}

/// Convert linear travel to motor rotations
///
/// `inches_per_rotation` is the carriage travel for one rotor turn
/// (sprocket circumference divided by gearbox reduction).
pub fn inches_to_rotations(inches: f32, inches_per_rotation: f32) -> f32 {
    inches / inches_per_rotation
}

/// Convert motor rotations to linear travel
pub fn rotations_to_inches(rotations: f32, inches_per_rotation: f32) -> f32 {
    rotations * inches_per_rotation
}

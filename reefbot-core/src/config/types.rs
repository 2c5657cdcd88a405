//! Configuration type definitions
//!
//! These types represent the robot configuration. Defaults match the
//! competition robot as tuned; every field can be overridden from TOML.

use core::f32::consts::PI;

use crate::traits::DriveFrame;
use crate::units::feet_to_meters;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Current configuration format version
pub const CONFIG_VERSION: u8 = 1;

/// Number of named lift levels
pub const LIFT_LEVEL_COUNT: usize = 4;

/// Feedback controller tuning
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FeedbackConfig {
    /// Proportional gain (Kp)
    pub kp: f32,
    /// Integral gain (Ki)
    pub ki: f32,
    /// Derivative gain (Kd)
    pub kd: f32,
    /// Error band within which the loop counts as at setpoint
    pub tolerance: f32,
    /// Error band outside which the integral is reset
    ///
    /// Prevents windup during large transients. `None` accumulates always.
    pub integral_zone: Option<f32>,
    /// Clamp on the integral term's contribution to output
    pub integral_limit: f32,
    /// Loop period in seconds
    pub period_s: f32,
}

impl FeedbackConfig {
    /// Create a config with the given gains and tolerance
    pub const fn new(kp: f32, ki: f32, kd: f32, tolerance: f32) -> Self {
        Self {
            kp,
            ki,
            kd,
            tolerance,
            integral_zone: None,
            integral_limit: 1.0,
            period_s: 0.02,
        }
    }

    /// Set the integral zone
    pub const fn with_integral_zone(mut self, zone: f32) -> Self {
        self.integral_zone = Some(zone);
        self
    }
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self::new(0.0, 0.0, 0.0, 0.0)
    }
}

/// What to do with the closed-loop lift output
///
/// Some tunings ran the loop for its at-setpoint signal only and left the
/// motors idle; the default drives the motors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ClosedLoopOutput {
    /// Apply feedback plus gravity bias to the motors
    #[default]
    Drive,
    /// Compute the loop but command zero output
    Inhibit,
}

/// Lift (elevator) configuration
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LiftConfig {
    /// Position loop tuning (error in inches, output in volts)
    pub feedback: FeedbackConfig,
    /// Constant upward bias added after the feedback term (volts)
    pub gravity_bias_volts: f32,
    /// Whether closed-loop output reaches the motors
    pub closed_loop_output: ClosedLoopOutput,
    /// Motor output limit in percent
    pub max_speed_percent: f32,
    /// Gearbox reduction (motor turns per output turn)
    pub gear_reduction: f32,
    /// Drive sprocket pitch diameter (inches)
    pub sprocket_diameter_in: f32,
    /// Lowest allowed target height (inches)
    pub min_height_in: f32,
    /// Highest allowed target height (inches)
    pub max_height_in: f32,
    /// Named level heights, Level1 first (inches)
    pub levels_in: [f32; LIFT_LEVEL_COUNT],
}

impl LiftConfig {
    /// Carriage travel for one motor rotation (inches)
    pub fn inches_per_rotation(&self) -> f32 {
        PI * self.sprocket_diameter_in / self.gear_reduction
    }
}

impl Default for LiftConfig {
    fn default() -> Self {
        Self {
            feedback: FeedbackConfig::new(0.5, 0.01, 0.0, 0.5).with_integral_zone(1.0),
            gravity_bias_volts: 0.1,
            closed_loop_output: ClosedLoopOutput::Drive,
            max_speed_percent: 50.0,
            gear_reduction: 25.0,
            sprocket_diameter_in: 2.866,
            min_height_in: 0.0,
            max_height_in: 60.0,
            levels_in: [0.0, 6.0, 15.0, 27.5],
        }
    }
}

/// Vision aligner configuration
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AlignerConfig {
    /// Left/right loop on the horizontal offset (degrees -> m/s)
    pub lateral: FeedbackConfig,
    /// Forward/back loop on the vertical offset (degrees -> m/s)
    pub approach: FeedbackConfig,
    /// Safety bound on each loop output (m/s)
    pub max_output: f32,
    /// Frame the corrections are applied in
    pub frame: DriveFrame,
    /// Pipeline selected while aligning and restored afterwards
    pub pipeline: u8,
}

impl Default for AlignerConfig {
    fn default() -> Self {
        Self {
            lateral: FeedbackConfig::new(0.1, 0.0, 0.02, 0.5),
            approach: FeedbackConfig::new(0.1, 0.0, 0.02, 0.5),
            max_output: 0.5,
            frame: DriveFrame::FieldCentric,
            pipeline: 0,
        }
    }
}

/// Drive base configuration
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DriveConfig {
    /// Top translation speed (m/s)
    pub max_speed_mps: f32,
    /// Top rotation rate (rad/s)
    pub max_angular_rate: f32,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            // A quarter of the 12 V free speed
            max_speed_mps: 1.2,
            // 3/4 rotation per second
            max_angular_rate: 0.75 * 2.0 * PI,
        }
    }
}

/// Intake roller configuration
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RollerConfig {
    /// Output limit in percent
    pub max_speed_percent: f32,
}

impl Default for RollerConfig {
    fn default() -> Self {
        Self {
            max_speed_percent: 100.0,
        }
    }
}

/// Climb winch configuration
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct WinchConfig {
    /// Output limit in percent
    pub max_speed_percent: f32,
}

impl Default for WinchConfig {
    fn default() -> Self {
        Self {
            max_speed_percent: 30.0,
        }
    }
}

/// One straight drive leg of an autonomous routine
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PathLeg {
    /// Field-centric forward velocity (m/s)
    pub vx: f32,
    /// Field-centric leftward velocity (m/s)
    pub vy: f32,
    /// Distance to travel before stopping (m)
    pub distance_m: f32,
}

impl PathLeg {
    /// Create a leg
    pub const fn new(vx: f32, vy: f32, distance_m: f32) -> Self {
        Self { vx, vy, distance_m }
    }
}

/// Autonomous routine parameters
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RoutineConfig {
    /// Pause after the lift settles, before and after ejecting (ms)
    pub settle_ms: u32,
    /// How long the rollers run in reverse to release a piece (ms)
    pub eject_ms: u32,
    /// Roller speed while ejecting, as a positive percent
    pub eject_percent: f32,
    /// Run the aligner during drive legs instead of after them
    pub continuous_align: bool,
    /// Give up on alignment after this long (ms); `None` waits forever
    pub align_timeout_ms: Option<u32>,
    /// Starting zone to reef
    pub reef_leg: PathLeg,
    /// Reef to loading station
    pub loading_leg: PathLeg,
    /// Straight drive out of the starting zone
    pub leave_leg: PathLeg,
}

impl Default for RoutineConfig {
    fn default() -> Self {
        Self {
            settle_ms: 500,
            eject_ms: 500,
            eject_percent: 50.0,
            continuous_align: false,
            align_timeout_ms: None,
            reef_leg: PathLeg::new(0.5, 0.0, feet_to_meters(7.0)),
            loading_leg: PathLeg::new(-0.5, 0.0, feet_to_meters(5.0)),
            leave_leg: PathLeg::new(0.5, 0.0, feet_to_meters(7.0)),
        }
    }
}

/// Complete robot configuration
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RobotConfig {
    /// Format version, must equal [`CONFIG_VERSION`]
    pub version: u8,
    /// Control loop period (ms)
    pub tick_period_ms: u32,
    /// Lift
    pub lift: LiftConfig,
    /// Vision aligner
    pub aligner: AlignerConfig,
    /// Drive base
    pub drive: DriveConfig,
    /// Intake rollers
    pub rollers: RollerConfig,
    /// Climb winch
    pub winch: WinchConfig,
    /// Autonomous routines
    pub routines: RoutineConfig,
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            tick_period_ms: 20,
            lift: LiftConfig::default(),
            aligner: AlignerConfig::default(),
            drive: DriveConfig::default(),
            rollers: RollerConfig::default(),
            winch: WinchConfig::default(),
            routines: RoutineConfig::default(),
        }
    }
}

//! Drive base trait
//!
//! Wraps the swerve drivetrain. Module kinematics and odometry live in the
//! vendor layer; the core only issues chassis-level requests.

use micromath::F32Ext;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Chassis velocity (m/s and rad/s)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChassisSpeeds {
    /// Forward velocity
    pub vx: f32,
    /// Leftward velocity
    pub vy: f32,
    /// Counter-clockwise rotation rate
    pub omega: f32,
}

impl ChassisSpeeds {
    /// Create a translation-only velocity
    pub const fn translation(vx: f32, vy: f32) -> Self {
        Self { vx, vy, omega: 0.0 }
    }

    /// Stationary
    pub const fn zero() -> Self {
        Self {
            vx: 0.0,
            vy: 0.0,
            omega: 0.0,
        }
    }

    /// Scale translation so its magnitude does not exceed `max_speed`
    /// and clamp rotation to `max_omega`
    pub fn limited(self, max_speed: f32, max_omega: f32) -> Self {
        let speed = hypot(self.vx, self.vy);
        let scale = if speed > max_speed && speed > 0.0 {
            max_speed / speed
        } else {
            1.0
        };
        Self {
            vx: self.vx * scale,
            vy: self.vy * scale,
            omega: self.omega.clamp(-max_omega, max_omega),
        }
    }
}

fn hypot(x: f32, y: f32) -> f32 {
    (x * x + y * y).sqrt()
}

/// Reference frame for velocity requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum DriveFrame {
    /// Velocities relative to the field (operator perspective)
    #[default]
    FieldCentric,
    /// Velocities relative to the robot chassis
    RobotCentric,
}

/// Request applied to the drivetrain every tick
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DriveRequest {
    /// Drive at a velocity in the given frame
    Velocity {
        /// Reference frame
        frame: DriveFrame,
        /// Commanded velocity
        speeds: ChassisSpeeds,
    },
    /// Point modules in an X and hold
    Brake,
}

impl DriveRequest {
    /// Field-centric velocity request
    pub const fn field_centric(speeds: ChassisSpeeds) -> Self {
        Self::Velocity {
            frame: DriveFrame::FieldCentric,
            speeds,
        }
    }

    /// Robot-centric velocity request
    pub const fn robot_centric(speeds: ChassisSpeeds) -> Self {
        Self::Velocity {
            frame: DriveFrame::RobotCentric,
            speeds,
        }
    }
}

/// Robot pose estimate on the field (meters, radians)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Pose2d {
    /// Field X
    pub x: f32,
    /// Field Y
    pub y: f32,
    /// Heading
    pub heading: f32,
}

impl Pose2d {
    /// Create a pose
    pub const fn new(x: f32, y: f32, heading: f32) -> Self {
        Self { x, y, heading }
    }

    /// Straight-line distance to another pose
    pub fn distance_to(&self, other: &Pose2d) -> f32 {
        hypot(self.x - other.x, self.y - other.y)
    }
}

/// Trait for the mobile base
pub trait DriveBase {
    /// Apply a request; it stays in effect until the next call
    fn apply(&mut self, request: DriveRequest);

    /// Current odometry pose
    fn pose(&self) -> Pose2d;

    /// Treat the current heading as field-forward
    fn seed_field_centric(&mut self);
}

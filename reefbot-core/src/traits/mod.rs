//! Hardware abstraction traits
//!
//! These traits define the interface between the control logic
//! and hardware-specific implementations.

pub mod clock;
pub mod drive;
pub mod motor;
pub mod telemetry;
pub mod vision;

pub use clock::Clock;
pub use drive::{ChassisSpeeds, DriveBase, DriveFrame, DriveRequest, Pose2d};
pub use motor::{MotorController, NeutralMode};
pub use telemetry::{NullSink, TelemetrySink};
pub use vision::{Illumination, VisionSensor};

/// Bundle of concrete hardware types for one robot
///
/// Lets subsystems and routines name every hardware type through a single
/// generic parameter.
pub trait Hardware {
    /// Voltage-driven motor (lift, rollers, winch)
    type Motor: MotorController;
    /// Targeting camera
    type Vision: VisionSensor;
    /// Swerve drivetrain
    type Base: DriveBase;
    /// Monotonic time source
    type Clock: Clock;
}

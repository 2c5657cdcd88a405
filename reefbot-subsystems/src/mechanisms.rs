//! Subsystem bundle
//!
//! Owns every subsystem behind a `RefCell` so task trees can borrow them
//! for the lifetime of the bundle. Borrows are only taken inside a single
//! task call and never held across a tick.

use core::cell::RefCell;

use reefbot_core::config::RobotConfig;
use reefbot_core::traits::{Hardware, TelemetrySink};

use crate::aligner::Aligner;
use crate::drive::Drive;
use crate::lift::Lift;
use crate::rollers::Rollers;
use crate::winch::Winch;

/// Raw devices for one robot
pub struct Devices<H: Hardware> {
    /// Lift leader motor
    pub lift_leader: H::Motor,
    /// Lift follower motor, mounted opposite the leader
    pub lift_follower: H::Motor,
    /// Intake roller motor
    pub rollers: H::Motor,
    /// Climb winch motor
    pub winch: H::Motor,
    /// Targeting camera
    pub camera: H::Vision,
    /// Swerve drivetrain
    pub base: H::Base,
    /// Monotonic clock
    pub clock: H::Clock,
}

/// Every subsystem of the robot
pub struct Mechanisms<H: Hardware> {
    /// Lift
    pub lift: RefCell<Lift<H::Motor>>,
    /// Vision aligner
    pub aligner: RefCell<Aligner<H::Vision>>,
    /// Drive base
    pub drive: RefCell<Drive<H::Base>>,
    /// Intake rollers
    pub rollers: RefCell<Rollers<H::Motor>>,
    /// Climb winch
    pub winch: RefCell<Winch<H::Motor>>,
    /// Shared clock for waits and timeouts
    pub clock: H::Clock,
}

impl<H: Hardware> Mechanisms<H> {
    /// Build every subsystem from its devices and configuration
    pub fn new(devices: Devices<H>, config: &RobotConfig) -> Self {
        Self {
            lift: RefCell::new(Lift::new(
                devices.lift_leader,
                devices.lift_follower,
                config.lift.clone(),
            )),
            aligner: RefCell::new(Aligner::new(devices.camera, config.aligner.clone())),
            drive: RefCell::new(Drive::new(devices.base, config.drive)),
            rollers: RefCell::new(Rollers::new(devices.rollers, config.rollers)),
            winch: RefCell::new(Winch::new(devices.winch, config.winch)),
            clock: devices.clock,
        }
    }

    /// Per-tick subsystem housekeeping, run after the scheduler tick
    pub fn periodic(&self, sink: &mut impl TelemetrySink) {
        self.lift.borrow_mut().periodic(sink);
        self.aligner.borrow_mut().periodic(sink);
        self.drive.borrow_mut().periodic(sink);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lift::{self, LiftState};
    use crate::mock::{self, RecordingSink};
    use reefbot_core::scheduler::Scheduler;

    #[test]
    fn test_periodic_after_tick() {
        let (devices, _probes) = mock::devices();
        let mech = Mechanisms::new(devices, &RobotConfig::default());
        let mut sched = Scheduler::new();
        sched.schedule(lift::seek(&mech.lift, 0.0)).unwrap();

        let mut sink = RecordingSink::default();
        sched.tick();
        mech.periodic(&mut sink);

        // Already at ground: seek completes and the lift holds
        assert_eq!(mech.lift.borrow().state(), LiftState::HoldingPosition);
        assert!(sink.get("lift/leader_in").is_some());
        assert!(sink.get("aligner/state").is_some());
        assert!(sink.get("drive/max_speed").is_some());
    }
}

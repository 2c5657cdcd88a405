//! Drive base subsystem
//!
//! Wraps the swerve base with the configured speed limits. Temporary
//! overrides (slow mode, precise placement) are a stack: a [`SpeedLimit`]
//! task pushes on start and pops on cleanup, so nesting unwinds in order.

use core::cell::RefCell;

use heapless::Vec;
use reefbot_core::config::{DriveConfig, PathLeg};
use reefbot_core::task::{atomic, until, Condition, Resources, RunOnce, Slot, Task, TaskNode};
use reefbot_core::traits::{ChassisSpeeds, DriveBase, DriveRequest, Pose2d, TelemetrySink};

/// Maximum nested speed overrides
pub const MAX_SPEED_LIMITS: usize = 4;

/// Swerve drive with scoped speed limits
pub struct Drive<B> {
    base: B,
    config: DriveConfig,
    limits: Vec<f32, MAX_SPEED_LIMITS>,
    last_request: DriveRequest,
}

impl<B: DriveBase> Drive<B> {
    /// Create the drive
    pub fn new(base: B, config: DriveConfig) -> Self {
        Self {
            base,
            config,
            limits: Vec::new(),
            last_request: DriveRequest::Brake,
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &DriveConfig {
        &self.config
    }

    /// Translation limit in effect (m/s)
    pub fn max_speed(&self) -> f32 {
        self.limits
            .last()
            .copied()
            .unwrap_or(self.config.max_speed_mps)
    }

    /// Push a temporary translation limit
    ///
    /// Returns false if too many overrides are already active.
    pub fn push_speed_limit(&mut self, max_speed_mps: f32) -> bool {
        self.limits.push(max_speed_mps).is_ok()
    }

    /// Drop the innermost override
    pub fn pop_speed_limit(&mut self) {
        self.limits.pop();
    }

    /// Apply a request, limiting velocity requests
    pub fn apply(&mut self, request: DriveRequest) {
        let request = match request {
            DriveRequest::Velocity { frame, speeds } => DriveRequest::Velocity {
                frame,
                speeds: speeds.limited(self.max_speed(), self.config.max_angular_rate),
            },
            DriveRequest::Brake => DriveRequest::Brake,
        };
        self.base.apply(request);
        self.last_request = request;
    }

    /// Lock the modules in place
    pub fn brake(&mut self) {
        self.apply(DriveRequest::Brake);
    }

    /// Last request sent to the base
    pub fn last_request(&self) -> DriveRequest {
        self.last_request
    }

    /// Current odometry pose
    pub fn pose(&self) -> Pose2d {
        self.base.pose()
    }

    /// Treat the current heading as field-forward
    pub fn seed_field_centric(&mut self) {
        self.base.seed_field_centric();
    }

    /// Per-tick telemetry
    pub fn periodic(&mut self, sink: &mut impl TelemetrySink) {
        let pose = self.base.pose();
        sink.record("drive/x", pose.x);
        sink.record("drive/y", pose.y);
        sink.record("drive/heading", pose.heading);
        sink.record("drive/max_speed", self.max_speed());
    }
}

/// Drives with a fixed request until interrupted, braking on cleanup
struct Hold<'a, B> {
    drive: &'a RefCell<Drive<B>>,
    request: DriveRequest,
}

impl<B: DriveBase> Task for Hold<'_, B> {
    fn update(&mut self) {
        self.drive.borrow_mut().apply(self.request);
    }

    fn is_done(&mut self) -> bool {
        false
    }

    fn cleanup(&mut self, _interrupted: bool) {
        self.drive.borrow_mut().brake();
    }

    fn resources(&self) -> Resources {
        Resources::BASE
    }

    fn name(&self) -> &str {
        "drive"
    }
}

/// Drives with the request from `source` every tick
///
/// Used for the operator's default teleop task.
struct Follow<'a, B, F> {
    drive: &'a RefCell<Drive<B>>,
    source: F,
}

impl<B: DriveBase, F: FnMut() -> DriveRequest> Task for Follow<'_, B, F> {
    fn update(&mut self) {
        let request = (self.source)();
        self.drive.borrow_mut().apply(request);
    }

    fn is_done(&mut self) -> bool {
        false
    }

    fn cleanup(&mut self, _interrupted: bool) {
        self.drive.borrow_mut().brake();
    }

    fn resources(&self) -> Resources {
        Resources::BASE
    }

    fn name(&self) -> &str {
        "teleop-drive"
    }
}

/// Lowers the speed limit while its child runs
///
/// The limit is pushed before the child starts and popped after the
/// child's cleanup, however the child ends.
pub struct SpeedLimit<'a, B> {
    drive: &'a RefCell<Drive<B>>,
    max_speed_mps: f32,
    child: Slot<'a>,
    pushed: bool,
}

impl<B: DriveBase> Task for SpeedLimit<'_, B> {
    fn start(&mut self) {
        self.pushed = self.drive.borrow_mut().push_speed_limit(self.max_speed_mps);
        if !self.pushed {
            warn!("drive: speed limit stack full");
        }
        self.child.start();
    }

    fn update(&mut self) {
        self.child.step();
    }

    fn is_done(&mut self) -> bool {
        self.child.is_finished()
    }

    fn cleanup(&mut self, _interrupted: bool) {
        self.child.interrupt();
        if self.pushed {
            self.drive.borrow_mut().pop_speed_limit();
            self.pushed = false;
        }
    }

    fn resources(&self) -> Resources {
        self.child.node().resources()
    }

    fn name(&self) -> &str {
        self.child.node().name()
    }
}

/// Met once the base has moved a given distance from where it was armed
pub struct Travelled<'a, B> {
    drive: &'a RefCell<Drive<B>>,
    distance_m: f32,
    origin: Pose2d,
}

impl<'a, B: DriveBase> Travelled<'a, B> {
    /// Create the condition
    pub fn new(drive: &'a RefCell<Drive<B>>, distance_m: f32) -> Self {
        let origin = drive.borrow().pose();
        Self {
            drive,
            distance_m,
            origin,
        }
    }
}

impl<B: DriveBase> Condition for Travelled<'_, B> {
    fn arm(&mut self) {
        self.origin = self.drive.borrow().pose();
    }

    fn is_met(&mut self) -> bool {
        self.drive.borrow().pose().distance_to(&self.origin) >= self.distance_m
    }
}

/// Apply `request` every tick until interrupted, then brake
pub fn drive_with<B: DriveBase>(drive: &RefCell<Drive<B>>, request: DriveRequest) -> TaskNode<'_> {
    atomic(Hold { drive, request })
}

/// Follow an operator request source until interrupted, then brake
pub fn teleop<'a, B: DriveBase>(
    drive: &'a RefCell<Drive<B>>,
    source: impl FnMut() -> DriveRequest + 'a,
) -> TaskNode<'a> {
    atomic(Follow { drive, source })
}

/// Drive one straight leg field-centric, then brake
pub fn drive_leg<B: DriveBase>(drive: &RefCell<Drive<B>>, leg: PathLeg) -> TaskNode<'_> {
    let request = DriveRequest::field_centric(ChassisSpeeds::translation(leg.vx, leg.vy));
    until(drive_with(drive, request), Travelled::new(drive, leg.distance_m))
}

/// Treat the current heading as field-forward
pub fn seed_field_centric<B: DriveBase>(drive: &RefCell<Drive<B>>) -> TaskNode<'_> {
    atomic(RunOnce::new("seed-heading", Resources::BASE, move || {
        drive.borrow_mut().seed_field_centric()
    }))
}

/// Run `child` with the translation limit lowered to `max_speed_mps`
pub fn with_speed_limit<'a, B: DriveBase>(
    drive: &'a RefCell<Drive<B>>,
    max_speed_mps: f32,
    child: TaskNode<'a>,
) -> TaskNode<'a> {
    atomic(SpeedLimit {
        drive,
        max_speed_mps,
        child: Slot::new(child),
        pushed: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{BaseProbe, MockBase};
    use reefbot_core::scheduler::Scheduler;
    use reefbot_core::traits::DriveFrame;
    use std::rc::Rc;

    fn rig() -> (RefCell<Drive<MockBase>>, Rc<BaseProbe>) {
        let (base, probe) = MockBase::new();
        let config = DriveConfig {
            max_speed_mps: 2.0,
            ..DriveConfig::default()
        };
        (RefCell::new(Drive::new(base, config)), probe)
    }

    fn speed_of(request: Option<DriveRequest>) -> f32 {
        match request {
            Some(DriveRequest::Velocity { speeds, .. }) => speeds.vx,
            _ => 0.0,
        }
    }

    #[test]
    fn test_velocity_is_limited() {
        let (drive, probe) = rig();
        drive
            .borrow_mut()
            .apply(DriveRequest::field_centric(ChassisSpeeds::translation(5.0, 0.0)));
        assert!((speed_of(probe.last()) - 2.0).abs() < 0.15);
    }

    #[test]
    fn test_speed_limit_scoped_to_child() {
        let (drive, probe) = rig();
        let fast = DriveRequest::robot_centric(ChassisSpeeds::translation(1.5, 0.0));
        let mut sched = Scheduler::new();
        let id = sched
            .schedule(with_speed_limit(&drive, 0.5, drive_with(&drive, fast)))
            .unwrap();

        sched.tick();
        assert_eq!(drive.borrow().max_speed(), 0.5);
        assert!((speed_of(probe.last()) - 0.5).abs() < 0.05);
        assert!(matches!(
            probe.last(),
            Some(DriveRequest::Velocity {
                frame: DriveFrame::RobotCentric,
                ..
            })
        ));

        sched.cancel(id);
        assert_eq!(probe.last(), Some(DriveRequest::Brake));
        assert_eq!(drive.borrow().max_speed(), 2.0);
    }

    #[test]
    fn test_nested_limits_unwind() {
        let (drive, _probe) = rig();
        let mut d = drive.borrow_mut();
        assert!(d.push_speed_limit(1.0));
        assert!(d.push_speed_limit(0.25));
        assert_eq!(d.max_speed(), 0.25);
        d.pop_speed_limit();
        assert_eq!(d.max_speed(), 1.0);
        d.pop_speed_limit();
        d.pop_speed_limit();
        assert_eq!(d.max_speed(), 2.0);
    }

    #[test]
    fn test_leg_stops_after_distance() {
        let (drive, probe) = rig();
        probe.pose.set(Pose2d::new(1.0, 0.0, 0.0));
        let mut sched = Scheduler::new();
        let id = sched
            .schedule(drive_leg(&drive, PathLeg::new(0.5, 0.0, 2.0)))
            .unwrap();

        for step in 1..=3 {
            sched.tick();
            assert!(sched.is_scheduled(id));
            probe.pose.set(Pose2d::new(1.0 + step as f32 * 0.5, 0.0, 0.0));
        }
        assert_eq!(speed_of(probe.last()), 0.5);

        probe.pose.set(Pose2d::new(3.2, 0.0, 0.0));
        sched.tick();
        assert!(!sched.is_scheduled(id));
        assert_eq!(probe.last(), Some(DriveRequest::Brake));
    }

    #[test]
    fn test_seed_heading_runs_once() {
        let (drive, probe) = rig();
        let mut sched = Scheduler::new();
        sched.schedule(seed_field_centric(&drive)).unwrap();
        sched.tick();
        sched.tick();
        assert_eq!(probe.seeded.get(), 1);
        assert_eq!(sched.running(), 0);
    }

    #[test]
    fn test_teleop_follows_source() {
        let (drive, probe) = rig();
        let mut vx = 0.0;
        let mut sched = Scheduler::new();
        sched
            .schedule(teleop(&drive, move || {
                vx += 0.5;
                DriveRequest::field_centric(ChassisSpeeds::translation(vx, 0.0))
            }))
            .unwrap();
        sched.tick();
        sched.tick();
        assert_eq!(speed_of(probe.last()), 1.0);
    }
}

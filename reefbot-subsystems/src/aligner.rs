//! Vision aligner subsystem
//!
//! Two independent feedback loops drive the camera's angular offsets to
//! zero: the lateral loop works on the horizontal offset and steers
//! sideways, the approach loop works on the vertical offset and steers
//! forward or back.
//!
//! ```text
//! Searching ──target seen──► Correcting ──both loops in tolerance──► Aligned
//!     ▲                          │                                     │
//!     └────────── target lost ───┴─────────────────────────────────────┘
//! ```
//!
//! While searching the base is braked. Aligned only counts if the target
//! is still visible when completion is checked.
//!
//! [`steered_leg`] mixes the lateral loop into a drive leg instead, so the
//! base keeps one writer while the robot closes on the target.

use core::cell::RefCell;

use reefbot_core::config::{AlignerConfig, PathLeg};
use reefbot_core::control::FeedbackController;
use reefbot_core::task::{atomic, Condition, Resources, Task, TaskNode};
use reefbot_core::traits::{
    ChassisSpeeds, DriveBase, DriveRequest, Illumination, TelemetrySink, VisionSensor,
};

use crate::drive::{Drive, Travelled};

/// Pipeline the camera returns to when not aligning
pub const DEFAULT_PIPELINE: u8 = 0;

/// Aligner state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AlignState {
    /// No target in view
    Searching,
    /// Target in view, offsets outside tolerance
    Correcting,
    /// Both offsets within tolerance on the latest reading
    Aligned,
}

/// Vision aligner
pub struct Aligner<V> {
    sensor: V,
    config: AlignerConfig,
    lateral: FeedbackController,
    approach: FeedbackController,
    state: AlignState,
    /// Latest (horizontal, vertical) offsets in degrees
    offsets: (f32, f32),
}

impl<V: VisionSensor> Aligner<V> {
    /// Create the aligner
    pub fn new(sensor: V, config: AlignerConfig) -> Self {
        Self {
            sensor,
            lateral: FeedbackController::new(config.lateral),
            approach: FeedbackController::new(config.approach),
            config,
            state: AlignState::Searching,
            offsets: (0.0, 0.0),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &AlignerConfig {
        &self.config
    }

    /// Current state
    pub fn state(&self) -> AlignState {
        self.state
    }

    /// Latest (horizontal, vertical) offsets in degrees
    pub fn offsets(&self) -> (f32, f32) {
        self.offsets
    }

    /// Light the target and start fresh loops
    pub fn begin(&mut self) {
        self.sensor.set_illumination(Illumination::On);
        self.sensor.set_pipeline(self.config.pipeline);
        self.lateral.reset();
        self.approach.reset();
        self.state = AlignState::Searching;
    }

    /// Read the camera and compute the base command for this tick
    pub fn step(&mut self) -> DriveRequest {
        if !self.sensor.target_visible() {
            if self.state != AlignState::Searching {
                warn!("aligner: target lost");
            }
            self.state = AlignState::Searching;
            return DriveRequest::Brake;
        }

        let x = self.sensor.offset_x_deg();
        let y = self.sensor.offset_y_deg();
        self.offsets = (x, y);

        let limit = self.config.max_output;
        let x_speed = self.lateral.calculate(x, 0.0).clamp(-limit, limit);
        let y_speed = self.approach.calculate(y, 0.0).clamp(-limit, limit);

        self.state = if self.lateral.at_setpoint() && self.approach.at_setpoint() {
            AlignState::Aligned
        } else {
            AlignState::Correcting
        };

        DriveRequest::Velocity {
            frame: self.config.frame,
            speeds: ChassisSpeeds::translation(y_speed, -x_speed),
        }
    }

    /// Read the camera and compute only the sideways correction (m/s)
    ///
    /// `None` while no target is in view. The approach loop is left alone.
    pub fn lateral_correction(&mut self) -> Option<f32> {
        if !self.sensor.target_visible() {
            self.state = AlignState::Searching;
            return None;
        }

        let x = self.sensor.offset_x_deg();
        self.offsets = (x, self.sensor.offset_y_deg());

        let limit = self.config.max_output;
        let x_speed = self.lateral.calculate(x, 0.0).clamp(-limit, limit);
        self.state = AlignState::Correcting;
        Some(-x_speed)
    }

    /// Check alignment against a fresh visibility reading
    pub fn is_aligned(&mut self) -> bool {
        self.state == AlignState::Aligned && self.sensor.target_visible()
    }

    /// Return the camera to its idle state
    pub fn finish(&mut self) {
        self.sensor.set_illumination(Illumination::Off);
        self.sensor.set_pipeline(DEFAULT_PIPELINE);
        self.state = AlignState::Searching;
    }

    /// Per-tick telemetry
    pub fn periodic(&mut self, sink: &mut impl TelemetrySink) {
        sink.record("aligner/tx", self.offsets.0);
        sink.record("aligner/ty", self.offsets.1);
        sink.record(
            "aligner/state",
            match self.state {
                AlignState::Searching => 0.0,
                AlignState::Correcting => 1.0,
                AlignState::Aligned => 2.0,
            },
        );
    }
}

/// Drives the base onto the target
struct Align<'a, V, B> {
    aligner: &'a RefCell<Aligner<V>>,
    drive: &'a RefCell<Drive<B>>,
}

impl<V: VisionSensor, B: DriveBase> Task for Align<'_, V, B> {
    fn start(&mut self) {
        self.aligner.borrow_mut().begin();
    }

    fn update(&mut self) {
        let request = self.aligner.borrow_mut().step();
        self.drive.borrow_mut().apply(request);
    }

    fn is_done(&mut self) -> bool {
        self.aligner.borrow_mut().is_aligned()
    }

    fn cleanup(&mut self, _interrupted: bool) {
        self.drive.borrow_mut().brake();
        self.aligner.borrow_mut().finish();
    }

    fn resources(&self) -> Resources {
        Resources::BASE | Resources::VISION
    }

    fn name(&self) -> &str {
        "align"
    }
}

/// Drives a leg with the lateral correction added to its sideways speed
struct SteeredLeg<'a, V, B> {
    aligner: &'a RefCell<Aligner<V>>,
    drive: &'a RefCell<Drive<B>>,
    leg: PathLeg,
    travelled: Travelled<'a, B>,
}

impl<V: VisionSensor, B: DriveBase> Task for SteeredLeg<'_, V, B> {
    fn start(&mut self) {
        self.aligner.borrow_mut().begin();
        self.travelled.arm();
    }

    fn update(&mut self) {
        let correction = self.aligner.borrow_mut().lateral_correction().unwrap_or(0.0);
        let speeds = ChassisSpeeds::translation(self.leg.vx, self.leg.vy + correction);
        self.drive
            .borrow_mut()
            .apply(DriveRequest::field_centric(speeds));
    }

    fn is_done(&mut self) -> bool {
        self.travelled.is_met()
    }

    fn cleanup(&mut self, _interrupted: bool) {
        self.drive.borrow_mut().brake();
        self.aligner.borrow_mut().finish();
    }

    fn resources(&self) -> Resources {
        Resources::BASE | Resources::VISION
    }

    fn name(&self) -> &str {
        "steered-leg"
    }
}

/// Drive one leg field-centric, steering sideways onto the target
///
/// Without a target in view the leg drives unchanged. Ends, braking, once
/// the leg's distance is covered.
pub fn steered_leg<'a, V: VisionSensor, B: DriveBase>(
    aligner: &'a RefCell<Aligner<V>>,
    drive: &'a RefCell<Drive<B>>,
    leg: PathLeg,
) -> TaskNode<'a> {
    atomic(SteeredLeg {
        aligner,
        drive,
        leg,
        travelled: Travelled::new(drive, leg.distance_m),
    })
}

/// Align the base to the visible target
///
/// Never finishes while the target is out of view; bound it with a
/// timeout if the routine must move on.
pub fn align<'a, V: VisionSensor, B: DriveBase>(
    aligner: &'a RefCell<Aligner<V>>,
    drive: &'a RefCell<Drive<B>>,
) -> TaskNode<'a> {
    atomic(Align { aligner, drive })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{BaseProbe, MockBase, MockVision, VisionProbe};
    use reefbot_core::config::DriveConfig;
    use reefbot_core::scheduler::Scheduler;
    use reefbot_core::traits::{DriveFrame, Pose2d};
    use std::rc::Rc;

    struct Rig {
        aligner: RefCell<Aligner<MockVision>>,
        drive: RefCell<Drive<MockBase>>,
        camera: Rc<VisionProbe>,
        base: Rc<BaseProbe>,
    }

    fn rig() -> Rig {
        let (vision, camera) = MockVision::new();
        let (base_mock, base) = MockBase::new();
        Rig {
            aligner: RefCell::new(Aligner::new(vision, AlignerConfig::default())),
            drive: RefCell::new(Drive::new(base_mock, DriveConfig::default())),
            camera,
            base,
        }
    }

    impl Rig {
        fn see(&self, tx: f32, ty: f32) {
            self.camera.visible.set(true);
            self.camera.tx.set(tx);
            self.camera.ty.set(ty);
        }

        /// Tick once, checking the base got exactly one request
        fn tick_once(&self, sched: &mut Scheduler<'_>) -> Option<DriveRequest> {
            let before = self.base.requests.borrow().len();
            sched.tick();
            assert_eq!(self.base.requests.borrow().len(), before + 1);
            self.base.last()
        }
    }

    #[test]
    fn test_start_lights_target() {
        let r = rig();
        let mut sched = Scheduler::new();
        sched.schedule(align(&r.aligner, &r.drive)).unwrap();

        assert_eq!(r.camera.illumination.get(), Some(Illumination::On));
        assert_eq!(r.camera.pipeline.get(), Some(0));
    }

    #[test]
    fn test_aligns_when_offsets_settle() {
        let r = rig();
        let mut sched = Scheduler::new();
        let id = sched.schedule(align(&r.aligner, &r.drive)).unwrap();

        r.see(2.0, 0.0);
        sched.tick();
        assert!(sched.is_scheduled(id));
        assert_eq!(r.aligner.borrow().state(), AlignState::Correcting);

        // Horizontal offset only: sideways correction, no forward motion
        match r.base.last() {
            Some(DriveRequest::Velocity { frame, speeds }) => {
                assert_eq!(frame, DriveFrame::FieldCentric);
                assert_eq!(speeds.vx, 0.0);
                assert!(speeds.vy > 0.0);
            }
            other => panic!("unexpected request {:?}", other),
        }

        r.see(0.0, 0.0);
        sched.tick();
        assert!(!sched.is_scheduled(id));

        // Cleanup: base braked, camera back to idle
        assert_eq!(r.base.last(), Some(DriveRequest::Brake));
        assert_eq!(r.camera.illumination.get(), Some(Illumination::Off));
        assert_eq!(r.camera.pipeline.get(), Some(DEFAULT_PIPELINE));
    }

    #[test]
    fn test_output_clamped() {
        let r = rig();
        r.aligner.borrow_mut().begin();
        r.see(-30.0, 40.0);
        match r.aligner.borrow_mut().step() {
            DriveRequest::Velocity { speeds, .. } => {
                assert_eq!(speeds.vx, -0.5);
                assert_eq!(speeds.vy, -0.5);
            }
            DriveRequest::Brake => panic!("expected a velocity"),
        };
    }

    #[test]
    fn test_target_loss_brakes_and_waits() {
        let r = rig();
        let mut sched = Scheduler::new();
        let id = sched.schedule(align(&r.aligner, &r.drive)).unwrap();

        r.see(3.0, 1.0);
        sched.tick();
        assert_eq!(r.aligner.borrow().state(), AlignState::Correcting);

        r.camera.visible.set(false);
        r.camera.tx.set(0.0);
        r.camera.ty.set(0.0);
        sched.tick();

        assert!(sched.is_scheduled(id));
        assert_eq!(r.aligner.borrow().state(), AlignState::Searching);
        assert_eq!(r.base.last(), Some(DriveRequest::Brake));
        assert!(!r.aligner.borrow_mut().is_aligned());
    }

    #[test]
    fn test_stale_alignment_does_not_count() {
        let r = rig();
        r.aligner.borrow_mut().begin();
        r.see(0.1, 0.1);
        r.aligner.borrow_mut().step();
        assert!(r.aligner.borrow_mut().is_aligned());

        // Target drops out between the update and the completion check
        r.camera.visible.set(false);
        assert!(!r.aligner.borrow_mut().is_aligned());
    }

    #[test]
    fn test_interrupt_restores_camera() {
        let r = rig();
        let mut sched = Scheduler::new();
        let id = sched.schedule(align(&r.aligner, &r.drive)).unwrap();
        r.see(5.0, 5.0);
        sched.tick();

        sched.cancel(id);
        assert_eq!(r.base.last(), Some(DriveRequest::Brake));
        assert_eq!(r.camera.illumination.get(), Some(Illumination::Off));
    }

    #[test]
    fn test_steered_leg_drives_without_target() {
        let r = rig();
        let mut sched = Scheduler::new();
        let id = sched
            .schedule(steered_leg(&r.aligner, &r.drive, PathLeg::new(1.0, 0.0, 2.0)))
            .unwrap();
        assert_eq!(r.camera.illumination.get(), Some(Illumination::On));

        for _ in 0..3 {
            let request = r.tick_once(&mut sched);
            assert_eq!(
                request,
                Some(DriveRequest::field_centric(ChassisSpeeds::translation(1.0, 0.0)))
            );
        }
        assert!(sched.is_scheduled(id));
        assert_eq!(r.aligner.borrow().state(), AlignState::Searching);
    }

    #[test]
    fn test_steered_leg_adds_lateral_correction() {
        let r = rig();
        let mut sched = Scheduler::new();
        let id = sched
            .schedule(steered_leg(&r.aligner, &r.drive, PathLeg::new(1.0, 0.0, 2.0)))
            .unwrap();

        // Target off to one side: forward speed kept, sideways correction added
        r.see(2.0, 5.0);
        match r.tick_once(&mut sched) {
            Some(DriveRequest::Velocity { frame, speeds }) => {
                assert_eq!(frame, DriveFrame::FieldCentric);
                assert_eq!(speeds.vx, 1.0);
                assert!(speeds.vy > 0.0);
            }
            other => panic!("unexpected request {:?}", other),
        }
        assert_eq!(r.aligner.borrow().state(), AlignState::Correcting);

        // Distance covered: brake and idle the camera
        r.base.pose.set(Pose2d::new(2.1, 0.0, 0.0));
        sched.tick();
        assert!(!sched.is_scheduled(id));
        assert_eq!(r.base.last(), Some(DriveRequest::Brake));
        assert_eq!(r.camera.illumination.get(), Some(Illumination::Off));
    }
}

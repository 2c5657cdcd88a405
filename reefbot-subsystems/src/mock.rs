//! Mock hardware for host tests
//!
//! Every mock hands its observable state out through an `Rc`, so a test
//! can inspect and steer the hardware after moving the mock into a
//! subsystem.

#![allow(missing_docs)]

use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};

use crate::mechanisms::Devices;
use reefbot_core::traits::{
    Clock, DriveBase, DriveRequest, Hardware, Illumination, MotorController, NeutralMode,
    Pose2d, TelemetrySink, VisionSensor,
};

/// Observable motor state
#[derive(Debug, Default)]
pub struct MotorProbe {
    pub volts: Cell<f32>,
    pub rotations: Cell<f32>,
    pub neutral: Cell<Option<NeutralMode>>,
    pub writes: Cell<u32>,
}

/// Motor whose state the test can read and drive
#[derive(Debug, Clone, Default)]
pub struct MockMotor(pub Rc<MotorProbe>);

impl MockMotor {
    pub fn new() -> (Self, Rc<MotorProbe>) {
        let probe = Rc::new(MotorProbe::default());
        (Self(probe.clone()), probe)
    }
}

impl MotorController for MockMotor {
    fn set_voltage(&mut self, volts: f32) {
        self.0.volts.set(volts);
        self.0.writes.set(self.0.writes.get() + 1);
    }

    fn position_rotations(&self) -> f32 {
        self.0.rotations.get()
    }

    fn set_neutral_mode(&mut self, mode: NeutralMode) {
        self.0.neutral.set(Some(mode));
    }
}

/// Observable camera state
#[derive(Debug, Default)]
pub struct VisionProbe {
    pub visible: Cell<bool>,
    pub tx: Cell<f32>,
    pub ty: Cell<f32>,
    pub illumination: Cell<Option<Illumination>>,
    pub pipeline: Cell<Option<u8>>,
}

#[derive(Debug, Clone, Default)]
pub struct MockVision(pub Rc<VisionProbe>);

impl MockVision {
    pub fn new() -> (Self, Rc<VisionProbe>) {
        let probe = Rc::new(VisionProbe::default());
        (Self(probe.clone()), probe)
    }
}

impl VisionSensor for MockVision {
    fn target_visible(&mut self) -> bool {
        self.0.visible.get()
    }

    fn offset_x_deg(&mut self) -> f32 {
        self.0.tx.get()
    }

    fn offset_y_deg(&mut self) -> f32 {
        self.0.ty.get()
    }

    fn set_illumination(&mut self, illumination: Illumination) {
        self.0.illumination.set(Some(illumination));
    }

    fn set_pipeline(&mut self, pipeline: u8) {
        self.0.pipeline.set(Some(pipeline));
    }
}

/// Observable base state
#[derive(Debug, Default)]
pub struct BaseProbe {
    pub requests: RefCell<Vec<DriveRequest>>,
    pub pose: Cell<Pose2d>,
    pub seeded: Cell<u32>,
}

impl BaseProbe {
    pub fn last(&self) -> Option<DriveRequest> {
        self.requests.borrow().last().copied()
    }
}

#[derive(Debug, Clone, Default)]
pub struct MockBase(pub Rc<BaseProbe>);

impl MockBase {
    pub fn new() -> (Self, Rc<BaseProbe>) {
        let probe = Rc::new(BaseProbe::default());
        (Self(probe.clone()), probe)
    }
}

impl DriveBase for MockBase {
    fn apply(&mut self, request: DriveRequest) {
        self.0.requests.borrow_mut().push(request);
    }

    fn pose(&self) -> Pose2d {
        self.0.pose.get()
    }

    fn seed_field_centric(&mut self) {
        self.0.seeded.set(self.0.seeded.get() + 1);
    }
}

/// Manually advanced clock
#[derive(Debug, Default)]
pub struct MockClock(pub Cell<u64>);

impl MockClock {
    pub fn advance(&self, ms: u64) {
        self.0.set(self.0.get() + ms);
    }
}

impl Clock for MockClock {
    fn now_ms(&self) -> u64 {
        self.0.get()
    }
}

/// Sink keeping the latest value per key
#[derive(Debug, Default)]
pub struct RecordingSink(pub Vec<(String, f32)>);

impl RecordingSink {
    pub fn get(&self, key: &str) -> Option<f32> {
        self.0.iter().rev().find(|(k, _)| k == key).map(|(_, v)| *v)
    }
}

impl TelemetrySink for RecordingSink {
    fn record(&mut self, key: &str, value: f32) {
        self.0.push((String::from(key), value));
    }
}

/// Mock hardware bundle
pub struct MockHardware;

impl Hardware for MockHardware {
    type Motor = MockMotor;
    type Vision = MockVision;
    type Base = MockBase;
    type Clock = MockClock;
}

/// Probes for every device of a [`devices`] bundle
pub struct Probes {
    pub lift_leader: Rc<MotorProbe>,
    pub lift_follower: Rc<MotorProbe>,
    pub rollers: Rc<MotorProbe>,
    pub winch: Rc<MotorProbe>,
    pub camera: Rc<VisionProbe>,
    pub base: Rc<BaseProbe>,
}

/// Mock devices for a whole robot, with their probes
pub fn devices() -> (Devices<MockHardware>, Probes) {
    let (lift_leader, lift_leader_probe) = MockMotor::new();
    let (lift_follower, lift_follower_probe) = MockMotor::new();
    let (rollers, rollers_probe) = MockMotor::new();
    let (winch, winch_probe) = MockMotor::new();
    let (camera, camera_probe) = MockVision::new();
    let (base, base_probe) = MockBase::new();
    let devices = Devices {
        lift_leader,
        lift_follower,
        rollers,
        winch,
        camera,
        base,
        clock: MockClock::default(),
    };
    let probes = Probes {
        lift_leader: lift_leader_probe,
        lift_follower: lift_follower_probe,
        rollers: rollers_probe,
        winch: winch_probe,
        camera: camera_probe,
        base: base_probe,
    };
    (devices, probes)
}

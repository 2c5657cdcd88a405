//! Lift (elevator) subsystem
//!
//! Two motors are mechanically coupled in opposition: the follower is
//! always commanded with the leader's voltage negated. Every voltage write
//! goes through [`Lift::move_motors`].
//!
//! # Operating modes
//!
//! ```text
//! Manual ◄──manual task──┐
//!                        │
//! SeekingPosition ──at setpoint / task end──► HoldingPosition
//!        ▲                                          │
//!        └──────────────── seek task ───────────────┘
//! ```
//!
//! While holding, [`Lift::periodic`] keeps running the position loop
//! against the height measured when the seek ended, so sag is corrected.

use core::cell::RefCell;

use reefbot_core::config::{ClosedLoopOutput, LiftConfig, LIFT_LEVEL_COUNT};
use reefbot_core::control::FeedbackController;
use reefbot_core::task::{atomic, NoOp, Resources, RunEnd, Task, TaskNode};
use reefbot_core::traits::{MotorController, NeutralMode, TelemetrySink};
use reefbot_core::units::{percent_to_voltage, rotations_to_inches, voltage_to_percent};

/// Lift operating mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LiftState {
    /// Open-loop speed from the operator (or braked after release)
    Manual,
    /// Closed loop holding the settled height
    HoldingPosition,
    /// Closed loop driving toward a target height
    SeekingPosition,
}

/// Named lift heights
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LiftLevel {
    /// Ground / intake height
    Level1,
    /// Low branch
    Level2,
    /// Middle branch
    Level3,
    /// High branch
    Level4,
}

impl LiftLevel {
    /// All levels, lowest first
    pub const ALL: [LiftLevel; LIFT_LEVEL_COUNT] =
        [Self::Level1, Self::Level2, Self::Level3, Self::Level4];

    /// Index into [`LiftConfig::levels_in`]
    pub const fn index(self) -> usize {
        match self {
            Self::Level1 => 0,
            Self::Level2 => 1,
            Self::Level3 => 2,
            Self::Level4 => 3,
        }
    }

    /// Operator-facing name
    pub const fn name(self) -> &'static str {
        match self {
            Self::Level1 => "LEVEL_1",
            Self::Level2 => "LEVEL_2",
            Self::Level3 => "LEVEL_3",
            Self::Level4 => "LEVEL_4",
        }
    }

    /// Look up a level by name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|level| level.name() == name)
    }
}

/// Dual-motor lift
pub struct Lift<M> {
    leader: M,
    follower: M,
    config: LiftConfig,
    controller: FeedbackController,
    state: LiftState,
    /// Seek target, or the settled height while holding (inches)
    target_in: f32,
    /// Last percent passed to `move_motors` (after clamping)
    output_percent: f32,
}

impl<M: MotorController> Lift<M> {
    /// Create the lift, both motors braked
    pub fn new(mut leader: M, mut follower: M, config: LiftConfig) -> Self {
        leader.set_neutral_mode(NeutralMode::Brake);
        follower.set_neutral_mode(NeutralMode::Brake);
        Self {
            leader,
            follower,
            controller: FeedbackController::new(config.feedback),
            config,
            state: LiftState::Manual,
            target_in: 0.0,
            output_percent: 0.0,
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &LiftConfig {
        &self.config
    }

    /// Current operating mode
    pub fn state(&self) -> LiftState {
        self.state
    }

    /// Active closed-loop target (inches)
    pub fn target_in(&self) -> f32 {
        self.target_in
    }

    /// Last commanded output in percent
    pub fn output_percent(&self) -> f32 {
        self.output_percent
    }

    /// Measured carriage height from the leader (inches)
    pub fn height_in(&self) -> f32 {
        rotations_to_inches(
            self.leader.position_rotations(),
            self.config.inches_per_rotation(),
        )
    }

    /// Check if the position loop has converged
    pub fn at_setpoint(&self) -> bool {
        self.controller.at_setpoint()
    }

    /// Height for a named level
    pub fn level_height(&self, level: LiftLevel) -> f32 {
        self.config.levels_in[level.index()]
    }

    /// Clamp a target into the travel limits
    pub fn clamp_target(&self, target_in: f32) -> f32 {
        target_in.clamp(self.config.min_height_in, self.config.max_height_in)
    }

    /// Drive both motors, leader forward and follower inverted
    ///
    /// `percent` is clamped to the configured speed limit.
    pub fn move_motors(&mut self, percent: f32) {
        let max = self.config.max_speed_percent;
        let percent = percent.clamp(-max, max);
        let volts = percent_to_voltage(percent);
        self.leader.set_voltage(volts);
        self.follower.set_voltage(-volts);
        self.output_percent = percent;
    }

    /// Zero output with both motors in brake mode
    pub fn brake(&mut self) {
        self.move_motors(0.0);
        self.leader.set_neutral_mode(NeutralMode::Brake);
        self.follower.set_neutral_mode(NeutralMode::Brake);
    }

    /// Apply an operator speed
    pub fn set_manual(&mut self, percent: f32) {
        if self.state != LiftState::Manual {
            debug!("lift: manual");
            self.state = LiftState::Manual;
        }
        self.move_motors(percent);
    }

    /// Begin a new setpoint session toward `target_in`
    pub fn begin_seek(&mut self, target_in: f32) {
        self.target_in = self.clamp_target(target_in);
        self.controller.reset();
        self.state = LiftState::SeekingPosition;
        debug!("lift: seeking {=f32} in", self.target_in);
    }

    /// Run the position loop once toward the current target
    pub fn run_closed_loop(&mut self) {
        let feedback = self.controller.calculate(self.height_in(), self.target_in);
        // Gravity bias stays outside the controller
        let volts = feedback + self.config.gravity_bias_volts;
        match self.config.closed_loop_output {
            ClosedLoopOutput::Drive => self.move_motors(voltage_to_percent(volts)),
            ClosedLoopOutput::Inhibit => self.move_motors(0.0),
        }
    }

    /// Hold the current measured height
    ///
    /// Only sets the target; [`Lift::periodic`] runs the loop. Keeps the
    /// controller's accumulated state so holding continues the same
    /// correction.
    pub fn hold_position(&mut self) {
        self.target_in = self.height_in();
        self.state = LiftState::HoldingPosition;
        debug!("lift: holding {=f32} in", self.target_in);
    }

    /// Per-tick housekeeping: hold correction and telemetry
    pub fn periodic(&mut self, sink: &mut impl TelemetrySink) {
        if self.state == LiftState::HoldingPosition {
            self.run_closed_loop();
        }

        let ipr = self.config.inches_per_rotation();
        let leader = self.leader.position_rotations();
        let follower = self.follower.position_rotations();
        sink.record("lift/leader_rotations", leader);
        sink.record("lift/follower_rotations", follower);
        sink.record("lift/leader_in", rotations_to_inches(leader, ipr));
        sink.record("lift/follower_in", rotations_to_inches(follower, ipr));
        sink.record("lift/output_percent", self.output_percent);
        sink.record_flag("lift/at_setpoint", self.at_setpoint());
        if let Some(error) = self.controller.error() {
            sink.record("lift/error_in", error);
        }
    }
}

/// Closed-loop move toward a fixed height
struct Seek<'a, M> {
    lift: &'a RefCell<Lift<M>>,
    target_in: f32,
}

impl<M: MotorController> Task for Seek<'_, M> {
    fn start(&mut self) {
        self.lift.borrow_mut().begin_seek(self.target_in);
    }

    fn update(&mut self) {
        self.lift.borrow_mut().run_closed_loop();
    }

    fn is_done(&mut self) -> bool {
        self.lift.borrow().at_setpoint()
    }

    fn resources(&self) -> Resources {
        Resources::LIFT
    }

    fn name(&self) -> &str {
        "lift-seek"
    }
}

/// Run the lift at `percent` until released, then brake
pub fn manual<M: MotorController>(lift: &RefCell<Lift<M>>, percent: f32) -> TaskNode<'_> {
    atomic(RunEnd::new(
        "lift-manual",
        Resources::LIFT,
        move || lift.borrow_mut().set_manual(percent),
        move || lift.borrow_mut().brake(),
    ))
}

/// Move to `target_in` inches, then hold there
///
/// Done when the loop is at setpoint. However the move ends, the lift is
/// left holding its measured height.
pub fn seek<M: MotorController>(lift: &RefCell<Lift<M>>, target_in: f32) -> TaskNode<'_> {
    atomic(Seek { lift, target_in }).finally_do(move |_| lift.borrow_mut().hold_position())
}

/// Move to a named level
pub fn seek_level<M: MotorController>(lift: &RefCell<Lift<M>>, level: LiftLevel) -> TaskNode<'_> {
    let target_in = lift.borrow().level_height(level);
    seek(lift, target_in)
}

/// Move to a level given by name
///
/// An unknown name yields a task that finishes immediately and claims
/// nothing.
pub fn seek_named<'a, M: MotorController>(lift: &'a RefCell<Lift<M>>, name: &str) -> TaskNode<'a> {
    match LiftLevel::from_name(name) {
        Some(level) => seek_level(lift, level),
        None => {
            warn!("lift: unknown level {=str}", name);
            atomic(NoOp)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockMotor, MotorProbe, RecordingSink};
    use proptest::prelude::*;
    use reefbot_core::config::FeedbackConfig;
    use reefbot_core::scheduler::Scheduler;
    use reefbot_core::traits::NullSink;
    use std::rc::Rc;

    struct Rig {
        lift: RefCell<Lift<MockMotor>>,
        leader: Rc<MotorProbe>,
        follower: Rc<MotorProbe>,
    }

    fn rig(config: LiftConfig) -> Rig {
        let (leader_motor, leader) = MockMotor::new();
        let (follower_motor, follower) = MockMotor::new();
        Rig {
            lift: RefCell::new(Lift::new(leader_motor, follower_motor, config)),
            leader,
            follower,
        }
    }

    impl Rig {
        fn set_height(&self, inches: f32) {
            let ipr = self.lift.borrow().config().inches_per_rotation();
            self.leader.rotations.set(inches / ipr);
            self.follower.rotations.set(-inches / ipr);
        }

        fn height(&self) -> f32 {
            self.lift.borrow().height_in()
        }

        /// Carriage moves proportionally to the applied voltage
        fn simulate(&self) {
            let h = self.height() + self.leader.volts.get() * 0.05;
            self.set_height(h);
        }
    }

    fn scenario_config() -> LiftConfig {
        LiftConfig {
            feedback: FeedbackConfig::new(0.5, 0.01, 0.0, 0.5).with_integral_zone(1.0),
            ..LiftConfig::default()
        }
    }

    #[test]
    fn test_level_names() {
        assert_eq!(LiftLevel::from_name("LEVEL_3"), Some(LiftLevel::Level3));
        assert_eq!(LiftLevel::from_name("LEVEL_9"), None);
        let r = rig(LiftConfig::default());
        assert_eq!(r.lift.borrow().level_height(LiftLevel::Level4), 27.5);
    }

    #[test]
    fn test_manual_clamps_and_brakes_on_release() {
        let r = rig(LiftConfig::default());
        let mut sched = Scheduler::new();
        let id = sched.schedule(manual(&r.lift, 80.0)).unwrap();
        sched.tick();

        // 50 % limit
        assert_eq!(r.leader.volts.get(), 6.0);
        assert_eq!(r.follower.volts.get(), -6.0);
        assert_eq!(r.lift.borrow().state(), LiftState::Manual);

        sched.cancel(id);
        assert_eq!(r.leader.volts.get(), 0.0);
        assert_eq!(r.follower.volts.get(), 0.0);
        assert_eq!(r.leader.neutral.get(), Some(NeutralMode::Brake));
    }

    #[test]
    fn test_seek_converges_then_holds() {
        let r = rig(scenario_config());
        let mut sched = Scheduler::new();
        let id = sched.schedule(seek(&r.lift, 6.0)).unwrap();
        assert_eq!(r.lift.borrow().state(), LiftState::SeekingPosition);

        let mut ticks = 0;
        while sched.is_scheduled(id) && ticks < 1_000 {
            sched.tick();
            r.simulate();
            ticks += 1;
        }

        assert!(!sched.is_scheduled(id));
        assert!((r.height() - 6.0).abs() <= 0.6);
        assert_eq!(r.lift.borrow().state(), LiftState::HoldingPosition);

        // Sag of one inch: holding pushes back up
        let held = r.lift.borrow().target_in();
        r.set_height(held - 1.0);
        r.lift.borrow_mut().periodic(&mut NullSink);
        assert!(r.leader.volts.get() > 0.0);
        assert_eq!(r.follower.volts.get(), -r.leader.volts.get());

        // Overshoot of one inch: holding pulls back down
        r.set_height(held + 1.0);
        r.lift.borrow_mut().periodic(&mut NullSink);
        assert!(r.leader.volts.get() < 0.0);
    }

    #[test]
    fn test_loop_runs_once_per_period_when_seek_ends() {
        let r = rig(scenario_config());
        r.set_height(6.0);
        let mut sched = Scheduler::new();
        let id = sched.schedule(seek(&r.lift, 6.0)).unwrap();

        // Seek update is the only write on the tick it converges
        sched.tick();
        assert!(!sched.is_scheduled(id));
        assert_eq!(r.lift.borrow().state(), LiftState::HoldingPosition);
        assert_eq!(r.leader.writes.get(), 1);

        r.lift.borrow_mut().periodic(&mut NullSink);
        assert_eq!(r.leader.writes.get(), 2);
    }

    #[test]
    fn test_interrupted_seek_still_holds() {
        let r = rig(scenario_config());
        let mut sched = Scheduler::new();
        let id = sched.schedule(seek(&r.lift, 20.0)).unwrap();
        sched.tick();
        r.set_height(3.0);

        sched.cancel(id);
        let lift = r.lift.borrow();
        assert_eq!(lift.state(), LiftState::HoldingPosition);
        assert!((lift.target_in() - 3.0).abs() < 1e-4);
    }

    #[test]
    fn test_target_clamped_to_travel() {
        let r = rig(LiftConfig::default());
        r.lift.borrow_mut().begin_seek(100.0);
        assert_eq!(r.lift.borrow().target_in(), 60.0);
        r.lift.borrow_mut().begin_seek(-5.0);
        assert_eq!(r.lift.borrow().target_in(), 0.0);
    }

    #[test]
    fn test_unknown_level_is_noop() {
        let r = rig(LiftConfig::default());
        let mut sched = Scheduler::new();
        let node = seek_named(&r.lift, "LEVEL_7");
        assert_eq!(node.resources(), Resources::NONE);

        let id = sched.schedule(node).unwrap();
        sched.tick();
        assert!(!sched.is_scheduled(id));
        assert_eq!(r.leader.writes.get(), 0);
        assert_eq!(r.lift.borrow().state(), LiftState::Manual);
    }

    #[test]
    fn test_inhibited_output() {
        let r = rig(LiftConfig {
            closed_loop_output: ClosedLoopOutput::Inhibit,
            ..LiftConfig::default()
        });
        r.lift.borrow_mut().begin_seek(10.0);
        r.lift.borrow_mut().run_closed_loop();
        assert_eq!(r.leader.volts.get(), 0.0);
        assert!(!r.lift.borrow().at_setpoint());
    }

    #[test]
    fn test_gravity_bias_added_after_feedback() {
        let r = rig(LiftConfig::default());
        r.lift.borrow_mut().begin_seek(0.0);
        r.lift.borrow_mut().run_closed_loop();
        // Zero error: only the bias reaches the motors
        assert!((r.leader.volts.get() - 0.1).abs() < 1e-5);
    }

    #[test]
    fn test_periodic_telemetry() {
        let r = rig(LiftConfig::default());
        r.set_height(6.0);
        let mut sink = RecordingSink::default();
        r.lift.borrow_mut().periodic(&mut sink);

        let leader_in = sink.get("lift/leader_in").unwrap();
        assert!((leader_in - 6.0).abs() < 1e-3);
        assert!(sink.get("lift/follower_rotations").unwrap() < 0.0);
        assert_eq!(sink.get("lift/error_in"), None);
        assert_eq!(sink.get("lift/at_setpoint"), Some(0.0));
    }

    proptest! {
        #[test]
        fn prop_motors_equal_and_opposite(percent in -50.0f32..=50.0) {
            let r = rig(LiftConfig::default());
            r.lift.borrow_mut().move_motors(percent);
            let leader = r.leader.volts.get();
            let follower = r.follower.volts.get();
            prop_assert_eq!(leader, -follower);
            prop_assert_eq!(leader, percent_to_voltage(percent));
        }

        #[test]
        fn prop_manual_speed_clamped(percent in -200.0f32..200.0) {
            let r = rig(LiftConfig::default());
            r.lift.borrow_mut().set_manual(percent);
            let leader = r.leader.volts.get();
            prop_assert!(leader.abs() <= 6.0);
            prop_assert_eq!(leader, -r.follower.volts.get());
        }
    }
}

//! Robot container
//!
//! Owns the scheduler and the binding table, and ties them to the
//! subsystems. One call to [`Robot::step`] is one control period:
//!
//! 1. Drain operator events and resolve bindings
//! 2. Tick the scheduler (skipped while disabled)
//! 3. Subsystem housekeeping and telemetry

use core::cell::Cell;

use alloc::boxed::Box;
use embassy_time::{Duration, Ticker};

use reefbot_core::config::{DriveConfig, RobotConfig};
use reefbot_core::scheduler::{ScheduleError, Scheduler, TaskId};
use reefbot_core::task::{parallel, Resources, TaskNode};
use reefbot_core::traits::{ChassisSpeeds, DriveRequest, Hardware, TelemetrySink};
use reefbot_subsystems::{drive, lift, rollers, winch, Mechanisms};

use crate::bindings::{Bindings, Button, Input, OperatorChannel, OperatorEvent, Sticks};
use crate::routines::Selector;

/// Stick travel ignored around center, as a fraction of full scale
pub const STICK_DEADBAND: f32 = 0.1;

/// Lift speed for the operator's manual buttons (percent)
const MANUAL_LIFT_PERCENT: f32 = 20.0;

/// Roller speed for the operator's triggers (percent)
const ROLLER_PERCENT: f32 = 100.0;

/// Winch speed for the operator's bumpers (percent)
const CLIMB_PERCENT: f32 = 20.0;

/// Lift heights on the operator's D-pad (inches)
const POV_HEIGHTS_IN: [(Button, f32); 4] = [
    (Button::PovUp, 12.0),
    (Button::PovRight, 16.0),
    (Button::PovDown, 0.0),
    (Button::PovLeft, 10.0),
];

/// Robot operating mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RobotMode {
    /// Nothing runs; operator buttons are ignored
    #[default]
    Disabled,
    /// Operator bindings and the default drive are live
    Teleop,
    /// The selected routine runs; operator buttons and sticks are ignored
    Autonomous,
}

/// Field-centric request from the driver's sticks
///
/// Forward on the left stick drives away from the driver, left drives
/// left, and the right stick turns counter-clockwise when pushed left.
pub fn teleop_request(sticks: Sticks, config: &DriveConfig) -> DriveRequest {
    let max_speed = config.max_speed_mps;
    let max_rate = config.max_angular_rate;
    DriveRequest::field_centric(ChassisSpeeds {
        vx: deadband(-sticks.left_y * max_speed, max_speed * STICK_DEADBAND),
        vy: deadband(-sticks.left_x * max_speed, max_speed * STICK_DEADBAND),
        omega: deadband(-sticks.right_x * max_rate, max_rate * STICK_DEADBAND),
    })
}

fn deadband(value: f32, band: f32) -> f32 {
    if value > -band && value < band {
        0.0
    } else {
        value
    }
}

/// Drive from the sticks until interrupted
fn teleop_drive<'a, H: Hardware>(
    mech: &'a Mechanisms<H>,
    sticks: &'a Cell<Sticks>,
    config: DriveConfig,
) -> TaskNode<'a> {
    drive::teleop(&mech.drive, move || teleop_request(sticks.get(), &config))
}

/// The robot program
pub struct Robot<'a, H: Hardware> {
    mech: &'a Mechanisms<H>,
    config: &'a RobotConfig,
    scheduler: Scheduler<'a>,
    bindings: Bindings<'a>,
    events: &'a OperatorChannel,
    sticks: &'a Cell<Sticks>,
    selector: Selector,
    mode: RobotMode,
}

impl<'a, H: Hardware> Robot<'a, H> {
    /// Create the robot, disabled, with the competition bindings
    pub fn new(
        mech: &'a Mechanisms<H>,
        config: &'a RobotConfig,
        events: &'a OperatorChannel,
        sticks: &'a Cell<Sticks>,
    ) -> Result<Self, ScheduleError> {
        let mut robot = Self {
            mech,
            config,
            scheduler: Scheduler::new(),
            bindings: Bindings::new(),
            events,
            sticks,
            selector: Selector::new(),
            mode: RobotMode::Disabled,
        };
        robot.scheduler.set_defaults_enabled(false);
        robot.configure_bindings()?;
        Ok(robot)
    }

    fn configure_bindings(&mut self) -> Result<(), ScheduleError> {
        let mech = self.mech;
        let sticks = self.sticks;
        let drive_config = self.config.drive;

        // X is forward and Y is left, field-centric
        self.scheduler.set_default(
            Resources::BASE,
            Box::new(move || teleop_drive(mech, sticks, drive_config)),
        )?;

        let b = &mut self.bindings;

        // Driver
        b.while_held(Input::driver(Button::A), move || {
            drive::drive_with(&mech.drive, DriveRequest::Brake)
        })?;
        b.on_press(Input::driver(Button::LeftBumper), move || {
            drive::seed_field_centric(&mech.drive)
        })?;
        b.cancel_all(Input::driver(Button::Start))?;

        // Operator: lift
        b.while_held(Input::operator(Button::Y), move || {
            lift::manual(&mech.lift, MANUAL_LIFT_PERCENT)
        })?;
        b.while_held(Input::operator(Button::A), move || {
            lift::manual(&mech.lift, -MANUAL_LIFT_PERCENT)
        })?;
        for (button, height_in) in POV_HEIGHTS_IN {
            b.while_held(Input::operator(button), move || {
                lift::seek(&mech.lift, height_in)
            })?;
        }

        // Operator: rollers
        b.while_held(Input::operator(Button::RightTrigger), move || {
            rollers::spin(&mech.rollers, -ROLLER_PERCENT)
        })?;
        b.while_held(Input::operator(Button::LeftTrigger), move || {
            rollers::spin(&mech.rollers, ROLLER_PERCENT)
        })?;

        // Operator: climb, with the driver still in control of the base
        for (button, percent) in [
            (Button::RightBumper, CLIMB_PERCENT),
            (Button::LeftBumper, -CLIMB_PERCENT),
        ] {
            b.while_held(Input::operator(button), move || {
                parallel([
                    winch::climb(&mech.winch, percent),
                    teleop_drive(mech, sticks, drive_config),
                ])
            })?;
        }

        debug!("{=usize} operator bindings", b.len());
        Ok(())
    }

    /// Current mode
    pub fn mode(&self) -> RobotMode {
        self.mode
    }

    /// Scheduler, for inspection
    pub fn scheduler(&self) -> &Scheduler<'a> {
        &self.scheduler
    }

    /// Autonomous routine chooser
    pub fn selector(&mut self) -> &mut Selector {
        &mut self.selector
    }

    /// Enter teleop
    pub fn enable_teleop(&mut self) {
        self.scheduler.cancel_all();
        self.scheduler.set_defaults_enabled(true);
        self.mode = RobotMode::Teleop;
        info!("Teleop enabled");
    }

    /// Enter autonomous and start the selected routine
    pub fn start_autonomous(&mut self) -> Result<TaskId, ScheduleError> {
        self.scheduler.cancel_all();
        self.scheduler.set_defaults_enabled(false);
        self.mode = RobotMode::Autonomous;

        let routine = self.selector.current();
        info!("Autonomous: {=str}", routine.name());
        let tree = routine.build(self.mech, &self.config.routines);
        self.scheduler.schedule(tree)
    }

    /// Stop everything
    ///
    /// The lift drops to manual at zero output so it stops holding.
    pub fn disable(&mut self) {
        self.scheduler.cancel_all();
        self.scheduler.set_defaults_enabled(false);
        self.mech.lift.borrow_mut().set_manual(0.0);
        self.mode = RobotMode::Disabled;
        info!("Disabled");
    }

    /// Run one control period
    pub fn step(&mut self, sink: &mut impl TelemetrySink) {
        while let Ok(event) = self.events.try_receive() {
            self.handle(event);
        }

        if self.mode != RobotMode::Disabled {
            self.scheduler.tick();
        }

        self.mech.periodic(sink);
        sink.record("scheduler/running", self.scheduler.running() as f32);
    }

    fn handle(&mut self, event: OperatorEvent) {
        match event {
            OperatorEvent::Sticks(sticks) => self.sticks.set(sticks),
            _ if self.mode == RobotMode::Teleop => {
                self.bindings.handle(event, &mut self.scheduler);
            }
            _ => trace!("operator event ignored outside teleop"),
        }
    }

    /// Fixed-period control loop; never returns
    pub async fn run(&mut self, sink: &mut impl TelemetrySink) {
        info!("Control loop started");

        let period = Duration::from_millis(u64::from(self.config.tick_period_ms));
        let mut ticker = Ticker::every(period);

        loop {
            ticker.next().await;
            self.step(sink);
        }
    }
}

//! Intake rollers
//!
//! Single open-loop motor. Positive percent intakes, negative ejects.

use core::cell::RefCell;

use reefbot_core::config::RollerConfig;
use reefbot_core::task::{atomic, Resources, RunEnd, TaskNode};
use reefbot_core::traits::{MotorController, NeutralMode};
use reefbot_core::units::percent_to_voltage;

/// Intake roller motor
pub struct Rollers<M> {
    motor: M,
    config: RollerConfig,
}

impl<M: MotorController> Rollers<M> {
    /// Create the rollers
    pub fn new(mut motor: M, config: RollerConfig) -> Self {
        motor.set_neutral_mode(NeutralMode::Brake);
        Self { motor, config }
    }

    /// Run at `percent`, clamped to the configured limit
    pub fn run(&mut self, percent: f32) {
        let max = self.config.max_speed_percent;
        self.motor
            .set_voltage(percent_to_voltage(percent.clamp(-max, max)));
    }

    /// Stop and hold
    pub fn brake(&mut self) {
        self.motor.brake();
    }
}

/// Spin the rollers until released, then brake
pub fn spin<M: MotorController>(rollers: &RefCell<Rollers<M>>, percent: f32) -> TaskNode<'_> {
    atomic(RunEnd::new(
        "rollers",
        Resources::INTAKE,
        move || rollers.borrow_mut().run(percent),
        move || rollers.borrow_mut().brake(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockMotor;
    use reefbot_core::scheduler::Scheduler;

    #[test]
    fn test_spin_and_brake() {
        let (motor, probe) = MockMotor::new();
        let rollers = RefCell::new(Rollers::new(motor, RollerConfig::default()));
        let mut sched = Scheduler::new();
        let id = sched.schedule(spin(&rollers, -50.0)).unwrap();

        sched.tick();
        assert_eq!(probe.volts.get(), -6.0);

        sched.cancel(id);
        assert_eq!(probe.volts.get(), 0.0);
        assert_eq!(probe.neutral.get(), Some(NeutralMode::Brake));
    }

    #[test]
    fn test_limit() {
        let (motor, probe) = MockMotor::new();
        let mut rollers = Rollers::new(
            motor,
            RollerConfig {
                max_speed_percent: 25.0,
            },
        );
        rollers.run(90.0);
        assert_eq!(probe.volts.get(), 3.0);
    }
}

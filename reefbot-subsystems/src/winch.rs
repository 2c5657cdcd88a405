//! Climb winch
//!
//! Open-loop motor limited to a low speed; released to zero output
//! without forcing a neutral mode.

use core::cell::RefCell;

use reefbot_core::config::WinchConfig;
use reefbot_core::task::{atomic, Resources, RunEnd, TaskNode};
use reefbot_core::traits::MotorController;
use reefbot_core::units::percent_to_voltage;

/// Climb winch motor
pub struct Winch<M> {
    motor: M,
    config: WinchConfig,
}

impl<M: MotorController> Winch<M> {
    /// Create the winch
    pub fn new(motor: M, config: WinchConfig) -> Self {
        Self { motor, config }
    }

    /// Run at `percent`, clamped to the configured limit
    pub fn run(&mut self, percent: f32) {
        let max = self.config.max_speed_percent;
        self.motor
            .set_voltage(percent_to_voltage(percent.clamp(-max, max)));
    }

    /// Zero output
    pub fn stop(&mut self) {
        self.motor.set_voltage(0.0);
    }
}

/// Run the winch until released, then stop
pub fn climb<M: MotorController>(winch: &RefCell<Winch<M>>, percent: f32) -> TaskNode<'_> {
    atomic(RunEnd::new(
        "climb",
        Resources::CLIMB,
        move || winch.borrow_mut().run(percent),
        move || winch.borrow_mut().stop(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockMotor;
    use reefbot_core::scheduler::Scheduler;

    #[test]
    fn test_climb_limited_and_stopped() {
        let (motor, probe) = MockMotor::new();
        let winch = RefCell::new(Winch::new(motor, WinchConfig::default()));
        let mut sched = Scheduler::new();
        let id = sched.schedule(climb(&winch, 100.0)).unwrap();

        sched.tick();
        // 30 % of 12 V
        assert!((probe.volts.get() - 3.6).abs() < 1e-5);

        sched.cancel(id);
        assert_eq!(probe.volts.get(), 0.0);
        assert_eq!(probe.neutral.get(), None);
    }
}

//! Feedback (PID) controller
//!
//! Computes `kp*e + ki*∫e − kd*d(measurement)/dt` with `e = setpoint −
//! measurement`. The derivative acts on the measurement so a setpoint step
//! produces no output kick; for a fixed setpoint it equals `kd*de/dt`.
//!
//! Completion is judged by position: [`FeedbackController::at_setpoint`]
//! looks only at the latest error, never at the output magnitude.

use micromath::F32Ext;

use crate::config::FeedbackConfig;

/// Controller internal state
#[derive(Debug, Clone, Copy, Default)]
struct FeedbackState {
    /// Accumulated error × seconds
    integral: f32,
    /// Measurement from the previous calculation
    prev_measurement: Option<f32>,
    /// Error from the latest calculation
    last_error: Option<f32>,
}

/// PID controller with integral zone and integral clamp
#[derive(Debug, Clone)]
pub struct FeedbackController {
    config: FeedbackConfig,
    state: FeedbackState,
}

impl FeedbackController {
    /// Create a new controller
    pub fn new(config: FeedbackConfig) -> Self {
        Self {
            config,
            state: FeedbackState::default(),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &FeedbackConfig {
        &self.config
    }

    /// Replace the tuning
    ///
    /// Resets internal state to prevent integral windup issues.
    pub fn set_config(&mut self, config: FeedbackConfig) {
        self.config = config;
        self.reset();
    }

    /// Start a new setpoint session
    ///
    /// Zeroes the integral and forgets the previous measurement.
    pub fn reset(&mut self) {
        self.state = FeedbackState::default();
    }

    /// Error from the latest calculation, if any
    pub fn error(&self) -> Option<f32> {
        self.state.last_error
    }

    /// Accumulated integral (error × seconds)
    pub fn integral(&self) -> f32 {
        self.state.integral
    }

    /// Check if the latest error is within tolerance
    ///
    /// False until the first calculation of a session.
    pub fn at_setpoint(&self) -> bool {
        match self.state.last_error {
            Some(error) => error.abs() <= self.config.tolerance,
            None => false,
        }
    }

    /// Calculate the corrective output for one loop period
    pub fn calculate(&mut self, measurement: f32, setpoint: f32) -> f32 {
        let cfg = &self.config;
        let error = setpoint - measurement;

        // Integral term with zone reset and anti-windup clamp
        match cfg.integral_zone {
            Some(zone) if error.abs() > zone => self.state.integral = 0.0,
            _ => self.state.integral += error * cfg.period_s,
        }
        if cfg.ki != 0.0 {
            let bound = cfg.integral_limit / cfg.ki.abs();
            self.state.integral = self.state.integral.clamp(-bound, bound);
        }

        let p_term = cfg.kp * error;
        let i_term = cfg.ki * self.state.integral;
        let d_term = match self.state.prev_measurement {
            Some(prev) if cfg.period_s > 0.0 => -cfg.kd * (measurement - prev) / cfg.period_s,
            _ => 0.0,
        };

        self.state.prev_measurement = Some(measurement);
        self.state.last_error = Some(error);

        p_term + i_term + d_term
    }
}

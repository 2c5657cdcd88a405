//! Predicates for [`Until`](super::Until)

use crate::traits::Clock;

/// External predicate that can end a task early
pub trait Condition {
    /// Reset any captured baseline; called when the race starts
    fn arm(&mut self) {}

    /// Check the predicate
    fn is_met(&mut self) -> bool;
}

/// Condition from a closure
pub struct When<F>(pub F);

impl<F: FnMut() -> bool> Condition for When<F> {
    fn is_met(&mut self) -> bool {
        (self.0)()
    }
}

/// Condition from a closure
pub fn when<F: FnMut() -> bool>(predicate: F) -> When<F> {
    When(predicate)
}

/// Met once a fixed time has passed since arming
pub struct Elapsed<C> {
    clock: C,
    duration_ms: u64,
    armed_at_ms: u64,
}

impl<C: Clock> Elapsed<C> {
    /// Create a timer condition
    pub fn new(clock: C, duration_ms: u64) -> Self {
        let armed_at_ms = clock.now_ms();
        Self {
            clock,
            duration_ms,
            armed_at_ms,
        }
    }
}

impl<C: Clock> Condition for Elapsed<C> {
    fn arm(&mut self) {
        self.armed_at_ms = self.clock.now_ms();
    }

    fn is_met(&mut self) -> bool {
        self.clock.elapsed_since(self.armed_at_ms) >= self.duration_ms
    }
}

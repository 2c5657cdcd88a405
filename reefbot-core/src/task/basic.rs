//! Leaf tasks built from closures and the clock

use super::{Resources, Task};
use crate::traits::Clock;

/// Done on its first tick; claims nothing
///
/// Stands in for a move whose target could not be resolved.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOp;

impl Task for NoOp {
    fn is_done(&mut self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "no-op"
    }
}

/// Does nothing for a fixed time
pub struct Wait<C> {
    clock: C,
    duration_ms: u64,
    started_ms: u64,
}

impl<C: Clock> Wait<C> {
    /// Create a wait
    pub fn new(clock: C, duration_ms: u64) -> Self {
        Self {
            clock,
            duration_ms,
            started_ms: 0,
        }
    }
}

impl<C: Clock> Task for Wait<C> {
    fn start(&mut self) {
        self.started_ms = self.clock.now_ms();
    }

    fn is_done(&mut self) -> bool {
        self.clock.elapsed_since(self.started_ms) >= self.duration_ms
    }

    fn name(&self) -> &str {
        "wait"
    }
}

/// Runs a closure once on start, then is done
pub struct RunOnce<F> {
    action: F,
    resources: Resources,
    name: &'static str,
}

impl<F: FnMut()> RunOnce<F> {
    /// Create the task
    pub fn new(name: &'static str, resources: Resources, action: F) -> Self {
        Self {
            action,
            resources,
            name,
        }
    }
}

impl<F: FnMut()> Task for RunOnce<F> {
    fn start(&mut self) {
        (self.action)();
    }

    fn is_done(&mut self) -> bool {
        true
    }

    fn resources(&self) -> Resources {
        self.resources
    }

    fn name(&self) -> &str {
        self.name
    }
}

/// Runs one closure every tick and another on cleanup; never done
///
/// Ends only by interruption, an enclosing [`Until`](super::Until), or
/// release of an operator binding.
pub struct RunEnd<F, G> {
    run: F,
    end: G,
    resources: Resources,
    name: &'static str,
}

impl<F: FnMut(), G: FnMut()> RunEnd<F, G> {
    /// Create the task
    pub fn new(name: &'static str, resources: Resources, run: F, end: G) -> Self {
        Self {
            run,
            end,
            resources,
            name,
        }
    }
}

impl<F: FnMut(), G: FnMut()> Task for RunEnd<F, G> {
    fn update(&mut self) {
        (self.run)();
    }

    fn is_done(&mut self) -> bool {
        false
    }

    fn cleanup(&mut self, _interrupted: bool) {
        (self.end)();
    }

    fn resources(&self) -> Resources {
        self.resources
    }

    fn name(&self) -> &str {
        self.name
    }
}

#[cfg(test)]
mod tests {
    use super::super::{atomic, Slot};
    use super::*;
    use core::cell::Cell;

    struct FakeClock(Cell<u64>);

    impl Clock for FakeClock {
        fn now_ms(&self) -> u64 {
            self.0.get()
        }
    }

    #[test]
    fn test_wait_measures_from_start() {
        let clock = FakeClock(Cell::new(0));
        let mut slot = Slot::new(atomic(Wait::new(&clock, 500)));

        clock.0.set(1_000);
        slot.start();
        clock.0.set(1_499);
        assert!(!slot.step());
        clock.0.set(1_500);
        assert!(slot.step());
    }

    #[test]
    fn test_run_end_brakes_on_cleanup() {
        let runs = Cell::new(0);
        let ended = Cell::new(false);
        let mut slot = Slot::new(atomic(RunEnd::new(
            "spin",
            Resources::INTAKE,
            || runs.set(runs.get() + 1),
            || ended.set(true),
        )));

        assert_eq!(slot.node().resources(), Resources::INTAKE);
        slot.start();
        slot.step();
        slot.step();
        assert!(!ended.get());
        slot.interrupt();

        assert_eq!(runs.get(), 2);
        assert!(ended.get());
    }

    #[test]
    fn test_run_once_and_noop() {
        let fired = Cell::new(0);
        let mut once = Slot::new(atomic(RunOnce::new("seed", Resources::BASE, || {
            fired.set(fired.get() + 1)
        })));
        once.start();
        assert_eq!(fired.get(), 1);
        assert!(once.step());
        assert_eq!(fired.get(), 1);

        let mut noop = Slot::new(atomic(NoOp));
        noop.start();
        assert!(noop.step());
    }
}

//! Operator bindings
//!
//! Controller buttons map to task factories. Events arrive on an
//! `embassy-sync` channel and are resolved against the binding table once
//! per tick, before the scheduler runs.

use alloc::boxed::Box;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use heapless::Vec;

use reefbot_core::scheduler::{ScheduleError, Scheduler, TaskId};
use reefbot_core::task::TaskNode;

/// Maximum registered bindings
pub const MAX_BINDINGS: usize = 24;

/// Operator event queue depth
pub const OPERATOR_QUEUE_SIZE: usize = 16;

/// Operator events from the driver station
pub type OperatorChannel = Channel<CriticalSectionRawMutex, OperatorEvent, OPERATOR_QUEUE_SIZE>;

/// Builds the task a binding starts
pub type BindingFactory<'a> = Box<dyn FnMut() -> TaskNode<'a> + 'a>;

/// Which handheld controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Controller {
    /// Drives the base
    Driver,
    /// Runs the mechanisms
    Operator,
}

/// Controller button
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Button {
    A,
    B,
    X,
    Y,
    LeftBumper,
    RightBumper,
    LeftTrigger,
    RightTrigger,
    Back,
    Start,
    /// D-pad up (0°)
    PovUp,
    /// D-pad right (90°)
    PovRight,
    /// D-pad down (180°)
    PovDown,
    /// D-pad left (270°)
    PovLeft,
}

/// A button on a specific controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Input {
    /// Controller the button is on
    pub controller: Controller,
    /// Button
    pub button: Button,
}

impl Input {
    /// Button on the driver's controller
    pub const fn driver(button: Button) -> Self {
        Self {
            controller: Controller::Driver,
            button,
        }
    }

    /// Button on the operator's controller
    pub const fn operator(button: Button) -> Self {
        Self {
            controller: Controller::Operator,
            button,
        }
    }
}

/// Driver stick positions, each in -1.0..=1.0
///
/// Forward stick reads negative, as on the controller.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Sticks {
    /// Left stick, right positive
    pub left_x: f32,
    /// Left stick, down positive
    pub left_y: f32,
    /// Right stick, right positive
    pub right_x: f32,
}

/// Event from the driver station
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OperatorEvent {
    /// Button went down
    Pressed(Input),
    /// Button came up
    Released(Input),
    /// New driver stick sample
    Sticks(Sticks),
}

/// When a binding acts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Trigger {
    /// Start the task on press; it runs to completion
    OnPress,
    /// Start the task on press and cancel it on release
    WhileHeld,
    /// Cancel every running task on press
    CancelAll,
}

/// One registered binding
struct Binding<'a> {
    input: Input,
    trigger: Trigger,
    factory: Option<BindingFactory<'a>>,
    /// Task started by a held `WhileHeld` binding
    held: Option<TaskId>,
}

/// Binding table
pub struct Bindings<'a> {
    bindings: Vec<Binding<'a>, MAX_BINDINGS>,
}

impl Default for Bindings<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> Bindings<'a> {
    /// Create an empty table
    pub fn new() -> Self {
        Self {
            bindings: Vec::new(),
        }
    }

    /// Start a task each time `input` is pressed
    pub fn on_press(
        &mut self,
        input: Input,
        factory: impl FnMut() -> TaskNode<'a> + 'a,
    ) -> Result<(), ScheduleError> {
        self.add(input, Trigger::OnPress, Some(Box::new(factory)))
    }

    /// Run a task for as long as `input` is held
    pub fn while_held(
        &mut self,
        input: Input,
        factory: impl FnMut() -> TaskNode<'a> + 'a,
    ) -> Result<(), ScheduleError> {
        self.add(input, Trigger::WhileHeld, Some(Box::new(factory)))
    }

    /// Cancel everything when `input` is pressed
    pub fn cancel_all(&mut self, input: Input) -> Result<(), ScheduleError> {
        self.add(input, Trigger::CancelAll, None)
    }

    /// Number of registered bindings
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Check for an empty table
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    fn add(
        &mut self,
        input: Input,
        trigger: Trigger,
        factory: Option<BindingFactory<'a>>,
    ) -> Result<(), ScheduleError> {
        self.bindings
            .push(Binding {
                input,
                trigger,
                factory,
                held: None,
            })
            .map_err(|_| ScheduleError::Full)
    }

    /// Resolve one button event against the table
    ///
    /// Every binding on the input acts, in registration order. Stick
    /// samples are ignored here.
    pub fn handle(&mut self, event: OperatorEvent, scheduler: &mut Scheduler<'a>) {
        match event {
            OperatorEvent::Pressed(input) => self.pressed(input, scheduler),
            OperatorEvent::Released(input) => self.released(input, scheduler),
            OperatorEvent::Sticks(_) => {}
        }
    }

    fn pressed(&mut self, input: Input, scheduler: &mut Scheduler<'a>) {
        for binding in self.bindings.iter_mut().filter(|b| b.input == input) {
            match binding.trigger {
                Trigger::CancelAll => scheduler.cancel_all(),
                Trigger::WhileHeld
                    if binding.held.is_some_and(|id| scheduler.is_scheduled(id)) =>
                {
                    // Repeated press without a release
                }
                Trigger::OnPress | Trigger::WhileHeld => {
                    let Some(factory) = binding.factory.as_mut() else {
                        continue;
                    };
                    match scheduler.schedule(factory()) {
                        Ok(id) => {
                            if binding.trigger == Trigger::WhileHeld {
                                binding.held = Some(id);
                            }
                        }
                        Err(_) => warn!("binding: no room for task"),
                    }
                }
            }
        }
    }

    fn released(&mut self, input: Input, scheduler: &mut Scheduler<'a>) {
        for binding in self.bindings.iter_mut().filter(|b| b.input == input) {
            if let Some(id) = binding.held.take() {
                // No-op if the task already finished or was displaced
                scheduler.cancel(id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;
    use reefbot_core::task::{atomic, Resources, RunEnd, RunOnce};

    fn counter_task<'a>(runs: &'a Cell<u32>, ends: &'a Cell<u32>) -> TaskNode<'a> {
        atomic(RunEnd::new(
            "counter",
            Resources::LIFT,
            move || runs.set(runs.get() + 1),
            move || ends.set(ends.get() + 1),
        ))
    }

    const Y: Input = Input::operator(Button::Y);

    #[test]
    fn test_while_held_cancels_on_release() {
        let runs = Cell::new(0);
        let ends = Cell::new(0);
        let mut sched = Scheduler::new();
        let mut bindings = Bindings::new();
        bindings.while_held(Y, || counter_task(&runs, &ends)).unwrap();

        bindings.handle(OperatorEvent::Pressed(Y), &mut sched);
        sched.tick();
        sched.tick();
        assert_eq!(runs.get(), 2);
        assert_eq!(sched.running(), 1);

        bindings.handle(OperatorEvent::Released(Y), &mut sched);
        assert_eq!(ends.get(), 1);
        assert_eq!(sched.running(), 0);

        // Release without a press does nothing
        bindings.handle(OperatorEvent::Released(Y), &mut sched);
        assert_eq!(ends.get(), 1);
    }

    #[test]
    fn test_repeated_press_keeps_one_task() {
        let runs = Cell::new(0);
        let ends = Cell::new(0);
        let mut sched = Scheduler::new();
        let mut bindings = Bindings::new();
        bindings.while_held(Y, || counter_task(&runs, &ends)).unwrap();

        bindings.handle(OperatorEvent::Pressed(Y), &mut sched);
        bindings.handle(OperatorEvent::Pressed(Y), &mut sched);
        assert_eq!(sched.running(), 1);
        assert_eq!(ends.get(), 0);
    }

    #[test]
    fn test_on_press_runs_to_completion() {
        let fired = Cell::new(0);
        let mut sched = Scheduler::new();
        let mut bindings = Bindings::new();
        let seed = Input::driver(Button::LeftBumper);
        bindings
            .on_press(seed, || {
                atomic(RunOnce::new("seed", Resources::BASE, || fired.set(fired.get() + 1)))
            })
            .unwrap();

        bindings.handle(OperatorEvent::Pressed(seed), &mut sched);
        bindings.handle(OperatorEvent::Released(seed), &mut sched);
        assert_eq!(fired.get(), 1);

        // Release does not cut it short
        assert_eq!(sched.running(), 1);
        sched.tick();
        assert_eq!(sched.running(), 0);
    }

    #[test]
    fn test_other_controller_ignored() {
        let runs = Cell::new(0);
        let ends = Cell::new(0);
        let mut sched = Scheduler::new();
        let mut bindings = Bindings::new();
        bindings.while_held(Y, || counter_task(&runs, &ends)).unwrap();

        bindings.handle(OperatorEvent::Pressed(Input::driver(Button::Y)), &mut sched);
        assert_eq!(sched.running(), 0);
    }

    #[test]
    fn test_cancel_all() {
        let runs = Cell::new(0);
        let ends = Cell::new(0);
        let stop = Input::driver(Button::Start);
        let mut sched = Scheduler::new();
        let mut bindings = Bindings::new();
        bindings.while_held(Y, || counter_task(&runs, &ends)).unwrap();
        bindings.cancel_all(stop).unwrap();

        bindings.handle(OperatorEvent::Pressed(Y), &mut sched);
        bindings.handle(OperatorEvent::Pressed(stop), &mut sched);
        assert_eq!(sched.running(), 0);
        assert_eq!(ends.get(), 1);

        // Y is still physically held: releasing it is harmless
        bindings.handle(OperatorEvent::Released(Y), &mut sched);
        assert_eq!(ends.get(), 1);
    }

    #[test]
    fn test_held_task_displaced_by_conflict() {
        let runs = Cell::new(0);
        let ends = Cell::new(0);
        let a = Input::operator(Button::A);
        let mut sched = Scheduler::new();
        let mut bindings = Bindings::new();
        bindings.while_held(Y, || counter_task(&runs, &ends)).unwrap();
        bindings.while_held(a, || counter_task(&runs, &ends)).unwrap();

        bindings.handle(OperatorEvent::Pressed(Y), &mut sched);
        bindings.handle(OperatorEvent::Pressed(a), &mut sched);
        assert_eq!(ends.get(), 1);
        assert_eq!(sched.running(), 1);

        // Releasing Y must not touch the task A started
        bindings.handle(OperatorEvent::Released(Y), &mut sched);
        assert_eq!(sched.running(), 1);
        assert_eq!(ends.get(), 1);
    }

    #[test]
    fn test_table_full() {
        let mut bindings = Bindings::new();
        for _ in 0..MAX_BINDINGS {
            bindings.cancel_all(Y).unwrap();
        }
        assert_eq!(bindings.cancel_all(Y), Err(ScheduleError::Full));
        assert_eq!(bindings.len(), MAX_BINDINGS);
    }
}

//! Tasks and task trees
//!
//! A [`Task`] is one unit of work with an explicit lifecycle:
//!
//! ```text
//! Idle ──start()──► Running ──update()/is_done()──► Finished
//!                      │                               ▲
//!                      └──────── cleanup(true) ────────┘
//! ```
//!
//! `cleanup` runs exactly once per started task, whether it finished on its
//! own (`interrupted = false`) or was cut short (`interrupted = true`).
//! Trees are built from the closed set of [`TaskNode`] variants with the
//! builder functions in this module.

pub mod basic;
pub mod combinators;
pub mod condition;
pub mod resources;

use alloc::boxed::Box;
use alloc::vec::Vec;

use crate::traits::Clock;

pub use basic::{NoOp, RunEnd, RunOnce, Wait};
pub use combinators::{FinallyDo, Parallel, Sequence, Until};
pub use condition::{when, Condition, Elapsed, When};
pub use resources::Resources;

/// A schedulable unit of work
///
/// Implementations must never block: a task waits by not yet reporting
/// done. The scheduler guarantees `start` before any `update`, and exactly
/// one `cleanup` after `start`.
pub trait Task {
    /// Called once when the task begins
    fn start(&mut self) {}

    /// Called once per tick while running
    fn update(&mut self) {}

    /// Completion test, checked after each `update`
    fn is_done(&mut self) -> bool;

    /// Return actuators to a safe state
    fn cleanup(&mut self, _interrupted: bool) {}

    /// Actuator groups this task drives
    fn resources(&self) -> Resources {
        Resources::NONE
    }

    /// Name for logs
    fn name(&self) -> &str {
        "task"
    }
}

/// Task lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Lifecycle {
    /// Not started
    #[default]
    Idle,
    /// Started, cleanup not yet run
    Running,
    /// Cleanup has run
    Finished,
}

/// Node in a task tree
pub enum TaskNode<'a> {
    /// A single task
    Atomic(Box<dyn Task + 'a>),
    /// Children one after another
    Sequence(Sequence<'a>),
    /// Children side by side
    Parallel(Parallel<'a>),
    /// Child raced against a condition
    Until(Until<'a>),
    /// Child followed by a guaranteed callback
    FinallyDo(FinallyDo<'a>),
}

impl<'a> TaskNode<'a> {
    /// Start this node
    pub fn start(&mut self) {
        match self {
            Self::Atomic(task) => task.start(),
            Self::Sequence(seq) => seq.start(),
            Self::Parallel(par) => par.start(),
            Self::Until(until) => until.start(),
            Self::FinallyDo(fin) => fin.start(),
        }
    }

    /// Run one tick
    pub fn update(&mut self) {
        match self {
            Self::Atomic(task) => task.update(),
            Self::Sequence(seq) => seq.update(),
            Self::Parallel(par) => par.update(),
            Self::Until(until) => until.update(),
            Self::FinallyDo(fin) => fin.update(),
        }
    }

    /// Completion test
    pub fn is_done(&mut self) -> bool {
        match self {
            Self::Atomic(task) => task.is_done(),
            Self::Sequence(seq) => seq.is_done(),
            Self::Parallel(par) => par.is_done(),
            Self::Until(until) => until.is_done(),
            Self::FinallyDo(fin) => fin.is_done(),
        }
    }

    /// Clean up this node and any still-running descendants
    pub fn cleanup(&mut self, interrupted: bool) {
        match self {
            Self::Atomic(task) => task.cleanup(interrupted),
            Self::Sequence(seq) => seq.cleanup(interrupted),
            Self::Parallel(par) => par.cleanup(interrupted),
            Self::Until(until) => until.cleanup(interrupted),
            Self::FinallyDo(fin) => fin.cleanup(interrupted),
        }
    }

    /// Union of every resource claimed anywhere in the tree
    pub fn resources(&self) -> Resources {
        match self {
            Self::Atomic(task) => task.resources(),
            Self::Sequence(seq) => seq.resources(),
            Self::Parallel(par) => par.resources(),
            Self::Until(until) => until.resources(),
            Self::FinallyDo(fin) => fin.resources(),
        }
    }

    /// Name for logs
    pub fn name(&self) -> &str {
        match self {
            Self::Atomic(task) => task.name(),
            Self::Sequence(_) => "sequence",
            Self::Parallel(_) => "parallel",
            Self::Until(until) => until.name(),
            Self::FinallyDo(fin) => fin.name(),
        }
    }

    /// Run `next` after this node
    pub fn and_then(self, next: TaskNode<'a>) -> TaskNode<'a> {
        match self {
            Self::Sequence(mut seq) => {
                seq.push(next);
                Self::Sequence(seq)
            }
            first => sequence([first, next]),
        }
    }

    /// Run `other` alongside this node
    pub fn along_with(self, other: TaskNode<'a>) -> TaskNode<'a> {
        match self {
            Self::Parallel(mut par) => {
                par.push(other);
                Self::Parallel(par)
            }
            first => parallel([first, other]),
        }
    }

    /// End this node early once `condition` holds
    pub fn until(self, condition: impl Condition + 'a) -> TaskNode<'a> {
        until(self, condition)
    }

    /// End this node after `duration_ms` at the latest
    pub fn with_timeout<C: Clock + 'a>(self, clock: C, duration_ms: u64) -> TaskNode<'a> {
        until(self, Elapsed::new(clock, duration_ms))
    }

    /// Run `f(interrupted)` after this node's cleanup
    pub fn finally_do(self, f: impl FnMut(bool) + 'a) -> TaskNode<'a> {
        finally_do(self, f)
    }
}

/// Wrap a single task
pub fn atomic<'a>(task: impl Task + 'a) -> TaskNode<'a> {
    TaskNode::Atomic(Box::new(task))
}

/// Run children in order
pub fn sequence<'a>(children: impl IntoIterator<Item = TaskNode<'a>>) -> TaskNode<'a> {
    TaskNode::Sequence(Sequence::new(children.into_iter().collect()))
}

/// Run children together, done when all are done
pub fn parallel<'a>(children: impl IntoIterator<Item = TaskNode<'a>>) -> TaskNode<'a> {
    TaskNode::Parallel(Parallel::new(children.into_iter().collect()))
}

/// Run `child` until it finishes or `condition` holds
pub fn until<'a>(child: TaskNode<'a>, condition: impl Condition + 'a) -> TaskNode<'a> {
    TaskNode::Until(Until::new(child, Box::new(condition)))
}

/// Run `child`, then always call `f(interrupted)`
pub fn finally_do<'a>(child: TaskNode<'a>, f: impl FnMut(bool) + 'a) -> TaskNode<'a> {
    TaskNode::FinallyDo(FinallyDo::new(child, Box::new(f)))
}

/// A task node plus its lifecycle
///
/// Enforces start-once and cleanup-once for whoever owns the node, be it a
/// combinator or the scheduler.
pub struct Slot<'a> {
    node: TaskNode<'a>,
    lifecycle: Lifecycle,
}

impl<'a> Slot<'a> {
    /// Wrap an idle node
    pub fn new(node: TaskNode<'a>) -> Self {
        Self {
            node,
            lifecycle: Lifecycle::Idle,
        }
    }

    /// Current lifecycle state
    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    /// Check if started and not yet cleaned up
    pub fn is_running(&self) -> bool {
        self.lifecycle == Lifecycle::Running
    }

    /// Check if cleanup has run
    pub fn is_finished(&self) -> bool {
        self.lifecycle == Lifecycle::Finished
    }

    /// Wrapped node
    pub fn node(&self) -> &TaskNode<'a> {
        &self.node
    }

    /// Start the node if idle
    pub fn start(&mut self) {
        if self.lifecycle == Lifecycle::Idle {
            self.node.start();
            self.lifecycle = Lifecycle::Running;
        }
    }

    /// Run one tick, cleaning up on completion
    ///
    /// Returns true once the node is finished.
    pub fn step(&mut self) -> bool {
        if self.lifecycle == Lifecycle::Running {
            self.node.update();
            if self.node.is_done() {
                self.node.cleanup(false);
                self.lifecycle = Lifecycle::Finished;
            }
        }
        self.is_finished()
    }

    /// Interrupt the node if running
    pub fn interrupt(&mut self) {
        if self.lifecycle == Lifecycle::Running {
            self.node.cleanup(true);
            self.lifecycle = Lifecycle::Finished;
        }
    }
}

pub(crate) fn slots<'a>(nodes: Vec<TaskNode<'a>>) -> Vec<Slot<'a>> {
    nodes.into_iter().map(Slot::new).collect()
}

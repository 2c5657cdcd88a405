//! Task combinators
//!
//! Each combinator owns its children as [`Slot`]s, so a child is started at
//! most once and cleaned up exactly once no matter how the parent ends.

use alloc::boxed::Box;
use alloc::vec::Vec;

use super::{slots, Condition, Resources, Slot, TaskNode};

fn union_of(children: &[Slot<'_>]) -> Resources {
    children
        .iter()
        .fold(Resources::NONE, |acc, child| acc | child.node().resources())
}

/// Runs children one after another
///
/// Child N+1 starts in the tick child N finishes, after child N's cleanup
/// has returned. An empty sequence is done on its first tick.
pub struct Sequence<'a> {
    children: Vec<Slot<'a>>,
    index: usize,
}

impl<'a> Sequence<'a> {
    /// Create a sequence
    pub fn new(children: Vec<TaskNode<'a>>) -> Self {
        Self {
            children: slots(children),
            index: 0,
        }
    }

    /// Append a child
    pub fn push(&mut self, child: TaskNode<'a>) {
        self.children.push(Slot::new(child));
    }

    /// Number of children
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Check for an empty sequence
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Index of the active child
    pub fn current(&self) -> usize {
        self.index
    }

    pub(super) fn start(&mut self) {
        self.index = 0;
        if let Some(first) = self.children.first_mut() {
            first.start();
        }
    }

    pub(super) fn update(&mut self) {
        let Some(active) = self.children.get_mut(self.index) else {
            return;
        };
        if active.step() {
            self.index += 1;
            if let Some(next) = self.children.get_mut(self.index) {
                next.start();
            }
        }
    }

    pub(super) fn is_done(&mut self) -> bool {
        self.index >= self.children.len()
    }

    pub(super) fn cleanup(&mut self, interrupted: bool) {
        // Earlier children already finished; later ones never started
        if interrupted {
            if let Some(active) = self.children.get_mut(self.index) {
                active.interrupt();
            }
        }
    }

    pub(super) fn resources(&self) -> Resources {
        union_of(&self.children)
    }
}

/// Runs children together
///
/// Every running child is ticked once per tick in construction order. Done
/// when all children are done. An empty parallel is done on its first tick.
pub struct Parallel<'a> {
    children: Vec<Slot<'a>>,
}

impl<'a> Parallel<'a> {
    /// Create a parallel group
    pub fn new(children: Vec<TaskNode<'a>>) -> Self {
        Self {
            children: slots(children),
        }
    }

    /// Add a child
    pub fn push(&mut self, child: TaskNode<'a>) {
        self.children.push(Slot::new(child));
    }

    /// Number of children
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Check for an empty group
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub(super) fn start(&mut self) {
        for child in self.children.iter_mut() {
            child.start();
        }
    }

    pub(super) fn update(&mut self) {
        for child in self.children.iter_mut() {
            child.step();
        }
    }

    pub(super) fn is_done(&mut self) -> bool {
        self.children.iter().all(Slot::is_finished)
    }

    pub(super) fn cleanup(&mut self, interrupted: bool) {
        if interrupted {
            for child in self.children.iter_mut() {
                child.interrupt();
            }
        }
    }

    pub(super) fn resources(&self) -> Resources {
        union_of(&self.children)
    }
}

/// Races a child against a condition
///
/// The condition is armed on start and checked before the child's update
/// each tick; once it holds the child is interrupted and the race is done.
pub struct Until<'a> {
    child: Box<Slot<'a>>,
    condition: Box<dyn Condition + 'a>,
}

impl<'a> Until<'a> {
    /// Create a race
    pub fn new(child: TaskNode<'a>, condition: Box<dyn Condition + 'a>) -> Self {
        Self {
            child: Box::new(Slot::new(child)),
            condition,
        }
    }

    pub(super) fn name(&self) -> &str {
        self.child.node().name()
    }

    pub(super) fn start(&mut self) {
        self.condition.arm();
        self.child.start();
    }

    pub(super) fn update(&mut self) {
        if self.child.is_finished() {
            return;
        }
        if self.condition.is_met() {
            self.child.interrupt();
            return;
        }
        self.child.step();
    }

    pub(super) fn is_done(&mut self) -> bool {
        self.child.is_finished()
    }

    pub(super) fn cleanup(&mut self, _interrupted: bool) {
        self.child.interrupt();
    }

    pub(super) fn resources(&self) -> Resources {
        self.child.node().resources()
    }
}

/// Callback run after a node's cleanup, with the interrupted flag
pub type FinallyFn<'a> = Box<dyn FnMut(bool) + 'a>;

/// Runs a child, then always calls a callback
///
/// The callback sees the same `interrupted` flag as the child's cleanup and
/// runs after that cleanup has returned.
pub struct FinallyDo<'a> {
    child: Box<Slot<'a>>,
    finally: FinallyFn<'a>,
}

impl<'a> FinallyDo<'a> {
    /// Create the wrapper
    pub fn new(child: TaskNode<'a>, finally: FinallyFn<'a>) -> Self {
        Self {
            child: Box::new(Slot::new(child)),
            finally,
        }
    }

    pub(super) fn name(&self) -> &str {
        self.child.node().name()
    }

    pub(super) fn start(&mut self) {
        self.child.start();
    }

    pub(super) fn update(&mut self) {
        self.child.step();
    }

    pub(super) fn is_done(&mut self) -> bool {
        self.child.is_finished()
    }

    pub(super) fn cleanup(&mut self, interrupted: bool) {
        self.child.interrupt();
        (self.finally)(interrupted);
    }

    pub(super) fn resources(&self) -> Resources {
        self.child.node().resources()
    }
}

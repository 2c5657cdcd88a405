//! Task tree executor
//!
//! Admission interrupts every running tree whose claims overlap the new
//! tree's, cleanup first, before the new tree is started. Children of one
//! tree may share handles; the claimant is always the top-level tree.

use alloc::boxed::Box;
use heapless::Vec;

use crate::task::{Resources, Slot, TaskNode};

/// Maximum concurrently running top-level trees
pub const MAX_TASKS: usize = 16;

/// Maximum registered default tasks
pub const MAX_DEFAULTS: usize = 8;

/// Identity of a scheduled tree
pub type TaskId = u32;

/// Builds a fresh default task whenever its resources fall idle
pub type DefaultFactory<'a> = Box<dyn FnMut() -> TaskNode<'a> + 'a>;

/// Scheduling errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ScheduleError {
    /// No room for another tree or default
    Full,
}

/// Running tree
struct Entry<'a> {
    /// Identity handed back to the caller
    id: TaskId,
    /// Recursive claim set, computed on admission
    resources: Resources,
    /// Tree and its lifecycle
    slot: Slot<'a>,
}

/// Default task registration
struct DefaultTask<'a> {
    /// Handles the default claims
    resources: Resources,
    /// Task builder
    factory: DefaultFactory<'a>,
}

/// Cooperative scheduler
///
/// Single-threaded: call [`tick`](Self::tick) once per control period.
pub struct Scheduler<'a> {
    /// Running trees, in admission order
    entries: Vec<Entry<'a>, MAX_TASKS>,
    /// Per-resource default tasks
    defaults: Vec<DefaultTask<'a>, MAX_DEFAULTS>,
    /// Whether idle resources get their defaults
    defaults_enabled: bool,
    /// Next identity to hand out
    next_id: TaskId,
}

impl Default for Scheduler<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> Scheduler<'a> {
    /// Create an empty scheduler
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            defaults: Vec::new(),
            defaults_enabled: true,
            next_id: 1,
        }
    }

    /// Admit and start a tree
    ///
    /// Every running tree holding a handle the new tree claims is
    /// interrupted and removed first. Fails without side effects if the
    /// scheduler is full even after those removals.
    pub fn schedule(&mut self, node: TaskNode<'a>) -> Result<TaskId, ScheduleError> {
        let resources = node.resources();
        let evicted = self
            .entries
            .iter()
            .filter(|e| e.resources.overlaps(resources))
            .count();
        if self.entries.len() - evicted >= MAX_TASKS {
            warn!("scheduler full, dropping {=str}", node.name());
            return Err(ScheduleError::Full);
        }

        self.interrupt_where(|e| e.resources.overlaps(resources));

        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1).max(1);

        let mut slot = Slot::new(node);
        debug!("task {=u32} start: {=str}", id, slot.node().name());
        slot.start();

        self.entries
            .push(Entry {
                id,
                resources,
                slot,
            })
            .map_err(|_| ScheduleError::Full)?;
        Ok(id)
    }

    /// Run one control period
    ///
    /// Defaults are admitted for idle resources first, then every running
    /// tree gets one update in admission order.
    pub fn tick(&mut self) {
        self.admit_defaults();

        for entry in self.entries.iter_mut() {
            if entry.slot.step() {
                debug!("task {=u32} finished: {=str}", entry.id, entry.slot.node().name());
            }
        }
        self.entries.retain(|e| e.slot.is_running());
    }

    /// Interrupt one tree
    ///
    /// Returns false if the tree is not running.
    pub fn cancel(&mut self, id: TaskId) -> bool {
        self.interrupt_where(|e| e.id == id) > 0
    }

    /// Interrupt every tree
    pub fn cancel_all(&mut self) {
        let cancelled = self.interrupt_where(|_| true);
        if cancelled > 0 {
            info!("cancelled {=usize} tasks", cancelled);
        }
    }

    /// Check if a tree is still running
    pub fn is_scheduled(&self, id: TaskId) -> bool {
        self.entries.iter().any(|e| e.id == id)
    }

    /// Tree currently holding any of `resources`
    pub fn claimant(&self, resources: Resources) -> Option<TaskId> {
        self.entries
            .iter()
            .find(|e| e.resources.overlaps(resources))
            .map(|e| e.id)
    }

    /// Number of running trees
    pub fn running(&self) -> usize {
        self.entries.len()
    }

    /// Union of every running claim
    pub fn claimed(&self) -> Resources {
        self.entries
            .iter()
            .fold(Resources::NONE, |acc, e| acc | e.resources)
    }

    /// Register a default task for `resources`
    ///
    /// Whenever none of `resources` is claimed at the start of a tick, a
    /// fresh task from `factory` is admitted. Replaces any default whose
    /// resources overlap.
    pub fn set_default(
        &mut self,
        resources: Resources,
        factory: DefaultFactory<'a>,
    ) -> Result<(), ScheduleError> {
        self.defaults.retain(|d| !d.resources.overlaps(resources));
        self.defaults
            .push(DefaultTask { resources, factory })
            .map_err(|_| ScheduleError::Full)
    }

    /// Turn default admission on or off
    ///
    /// Defaults already running are left alone.
    pub fn set_defaults_enabled(&mut self, enabled: bool) {
        self.defaults_enabled = enabled;
    }

    fn admit_defaults(&mut self) {
        if !self.defaults_enabled {
            return;
        }
        for i in 0..self.defaults.len() {
            let claimed = self.claimed();
            let node = match self.defaults.get_mut(i) {
                Some(default) if !claimed.overlaps(default.resources) => (default.factory)(),
                _ => continue,
            };
            if self.schedule(node).is_err() {
                warn!("no room for default task");
            }
        }
    }

    /// Interrupt and remove matching trees, returning how many
    fn interrupt_where(&mut self, mut matches: impl FnMut(&Entry<'a>) -> bool) -> usize {
        let mut count = 0;
        for entry in self.entries.iter_mut() {
            if matches(entry) {
                debug!("task {=u32} interrupted: {=str}", entry.id, entry.slot.node().name());
                entry.slot.interrupt();
                count += 1;
            }
        }
        self.entries.retain(|e| e.slot.is_running());
        count
    }
}

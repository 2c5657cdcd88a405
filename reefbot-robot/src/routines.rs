//! Autonomous routines
//!
//! Each routine is a task tree built once when autonomous starts. Building
//! performs no hardware I/O; the scheduler drives the tree afterwards.

use reefbot_core::config::{PathLeg, RoutineConfig};
use reefbot_core::task::{atomic, sequence, NoOp, Resources, TaskNode, Wait};
use reefbot_core::traits::Hardware;
use reefbot_subsystems::{aligner, drive, lift, rollers, LiftLevel, Mechanisms};

/// Score a game piece at `height_in`
///
/// Raise the lift, settle, eject briefly, settle, then return to the
/// ground level.
pub fn place_at_height<'a, H: Hardware>(
    mech: &'a Mechanisms<H>,
    config: &RoutineConfig,
    height_in: f32,
) -> TaskNode<'a> {
    sequence([
        lift::seek(&mech.lift, height_in),
        settle(mech, config),
        rollers::spin(&mech.rollers, -config.eject_percent)
            .with_timeout(&mech.clock, u64::from(config.eject_ms)),
        settle(mech, config),
        lift::seek_level(&mech.lift, LiftLevel::Level1),
    ])
}

/// Score at a named lift level
pub fn place_at_level<'a, H: Hardware>(
    mech: &'a Mechanisms<H>,
    config: &RoutineConfig,
    level: LiftLevel,
) -> TaskNode<'a> {
    let height_in = mech.lift.borrow().level_height(level);
    place_at_height(mech, config, height_in)
}

/// Drive one leg and line up on the target
///
/// With continuous alignment the leg steers sideways onto the target as
/// it drives. Either way the aligner finishes the job once the leg ends.
pub fn approach<'a, H: Hardware>(
    mech: &'a Mechanisms<H>,
    config: &RoutineConfig,
    leg: PathLeg,
) -> TaskNode<'a> {
    let leg = if config.continuous_align {
        aligner::steered_leg(&mech.aligner, &mech.drive, leg)
    } else {
        drive::drive_leg(&mech.drive, leg)
    };
    let mut align = aligner::align(&mech.aligner, &mech.drive);
    if let Some(timeout_ms) = config.align_timeout_ms {
        align = align.with_timeout(&mech.clock, u64::from(timeout_ms));
    }
    leg.and_then(align)
}

/// Stay put
pub fn do_nothing<'a>() -> TaskNode<'a> {
    atomic(NoOp)
}

/// Drive straight out of the starting zone
pub fn leave_zone<'a, H: Hardware>(mech: &'a Mechanisms<H>, config: &RoutineConfig) -> TaskNode<'a> {
    drive::drive_leg(&mech.drive, config.leave_leg)
}

/// Drive to the reef and score one piece on Level 2
pub fn forward<'a, H: Hardware>(mech: &'a Mechanisms<H>, config: &RoutineConfig) -> TaskNode<'a> {
    sequence([
        drive::seed_field_centric(&mech.drive),
        approach(mech, config, config.reef_leg),
        place_at_level(mech, config, LiftLevel::Level2),
    ])
}

/// Score on Level 2, fetch a second piece, score it on Level 3
pub fn two_piece<'a, H: Hardware>(mech: &'a Mechanisms<H>, config: &RoutineConfig) -> TaskNode<'a> {
    sequence([
        drive::seed_field_centric(&mech.drive),
        approach(mech, config, config.reef_leg),
        place_at_level(mech, config, LiftLevel::Level2),
        approach(mech, config, config.loading_leg),
        approach(mech, config, config.reef_leg),
        place_at_level(mech, config, LiftLevel::Level3),
    ])
}

fn settle<'a, H: Hardware>(mech: &'a Mechanisms<H>, config: &RoutineConfig) -> TaskNode<'a> {
    atomic(Wait::new(&mech.clock, u64::from(config.settle_ms)))
}

/// Selectable autonomous routines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RoutineId {
    /// Sit still
    #[default]
    DoNothing,
    /// Drive out of the starting zone
    LeaveZone,
    /// One piece on Level 2
    Forward,
    /// Level 2, then Level 3
    TwoPiece,
}

impl RoutineId {
    /// Every routine, in selector order
    pub const ALL: [RoutineId; 4] = [
        RoutineId::DoNothing,
        RoutineId::LeaveZone,
        RoutineId::Forward,
        RoutineId::TwoPiece,
    ];

    /// Display name
    pub const fn name(self) -> &'static str {
        match self {
            RoutineId::DoNothing => "Do Nothing",
            RoutineId::LeaveZone => "Leave Zone",
            RoutineId::Forward => "Forward",
            RoutineId::TwoPiece => "Two Piece",
        }
    }

    /// Look a routine up by display name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.name() == name)
    }

    /// Handles the routine's tree claims
    pub const fn resources(self) -> Resources {
        let scoring = Resources::BASE
            .union(Resources::VISION)
            .union(Resources::LIFT)
            .union(Resources::INTAKE);
        match self {
            RoutineId::DoNothing => Resources::NONE,
            RoutineId::LeaveZone => Resources::BASE,
            RoutineId::Forward | RoutineId::TwoPiece => scoring,
        }
    }

    /// Build the routine's task tree
    pub fn build<'a, H: Hardware>(
        self,
        mech: &'a Mechanisms<H>,
        config: &RoutineConfig,
    ) -> TaskNode<'a> {
        match self {
            RoutineId::DoNothing => do_nothing(),
            RoutineId::LeaveZone => leave_zone(mech, config),
            RoutineId::Forward => forward(mech, config),
            RoutineId::TwoPiece => two_piece(mech, config),
        }
    }
}

/// Pre-match routine chooser
#[derive(Debug, Clone, Copy, Default)]
pub struct Selector {
    current: usize,
}

impl Selector {
    /// Create a selector on [`RoutineId::DoNothing`]
    pub const fn new() -> Self {
        Self { current: 0 }
    }

    /// Currently selected routine
    pub fn current(&self) -> RoutineId {
        RoutineId::ALL[self.current]
    }

    /// Select a routine
    pub fn select(&mut self, routine: RoutineId) {
        if let Some(index) = RoutineId::ALL.iter().position(|r| *r == routine) {
            self.current = index;
            info!("Selected routine: {=str}", routine.name());
        }
    }

    /// Step to the next routine, wrapping around
    pub fn next(&mut self) -> RoutineId {
        self.current = (self.current + 1) % RoutineId::ALL.len();
        let routine = self.current();
        info!("Selected routine: {=str}", routine.name());
        routine
    }
}

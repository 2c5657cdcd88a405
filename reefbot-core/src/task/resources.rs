//! Resource handles
//!
//! Each bit names one physical actuator group that at most one running
//! task tree may drive at a time.

use core::ops::{BitOr, BitOrAssign};

/// Set of claimed actuator groups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Resources(u8);

impl Resources {
    /// Claims nothing
    pub const NONE: Self = Self(0);
    /// Lift motors
    pub const LIFT: Self = Self(1 << 0);
    /// Drive base
    pub const BASE: Self = Self(1 << 1);
    /// Intake rollers
    pub const INTAKE: Self = Self(1 << 2);
    /// Climb winch
    pub const CLIMB: Self = Self(1 << 3);
    /// Targeting camera (illumination and pipeline)
    pub const VISION: Self = Self(1 << 4);

    /// Every handle
    pub const ALL: Self = Self(0b1_1111);

    /// Combine two sets
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Check whether any handle appears in both sets
    pub const fn overlaps(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// Check whether every handle in `other` is in this set
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Check for the empty set
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for Resources {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl BitOrAssign for Resources {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = self.union(rhs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlap() {
        let drive_and_aim = Resources::BASE | Resources::VISION;
        assert!(drive_and_aim.overlaps(Resources::BASE));
        assert!(!drive_and_aim.overlaps(Resources::LIFT));
        assert!(!Resources::NONE.overlaps(Resources::ALL));
    }

    #[test]
    fn test_contains() {
        let set = Resources::LIFT | Resources::INTAKE;
        assert!(set.contains(Resources::LIFT));
        assert!(set.contains(Resources::NONE));
        assert!(!set.contains(Resources::LIFT | Resources::CLIMB));
        assert!(Resources::ALL.contains(set));
    }
}

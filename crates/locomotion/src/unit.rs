//! Unit classification components consumed by steering and physics.
//!
//! The full object model lives outside this subsystem; these two components
//! are the slice of it that locomotion actually reads.

use bevy::prelude::*;

/// Coarse kind-of bitmask for a unit. Only the kinds that alter locomotion
/// behavior are represented here.
#[derive(Component, Clone, Copy, Default, PartialEq, Eq, Debug)]
pub struct UnitKind(pub u32);

impl UnitKind {
    pub const PROJECTILE: u32 = 1 << 0;
    pub const DOZER: u32 = 1 << 1;
    pub const VEHICLE: u32 = 1 << 2;
    pub const IMMOBILE: u32 = 1 << 3;
    pub const INFANTRY: u32 = 1 << 4;

    pub fn has(self, kind: u32) -> bool {
        self.0 & kind != 0
    }

    pub fn with(kind: u32) -> Self {
        Self(kind)
    }
}

/// Body damage condition. Kinematic limits switch to their damaged variants
/// once a unit is at least `Damaged`.
#[derive(Component, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub enum BodyDamageState {
    #[default]
    Pristine,
    Damaged,
    ReallyDamaged,
    Rubble,
}

impl BodyDamageState {
    /// True when damaged-variant tuning values apply.
    pub fn uses_damaged_tuning(self) -> bool {
        self >= BodyDamageState::Damaged
    }

    pub fn to_u8(self) -> u8 {
        match self {
            BodyDamageState::Pristine => 0,
            BodyDamageState::Damaged => 1,
            BodyDamageState::ReallyDamaged => 2,
            BodyDamageState::Rubble => 3,
        }
    }

    pub fn from_u8(v: u8) -> Self {
        match v {
            1 => BodyDamageState::Damaged,
            2 => BodyDamageState::ReallyDamaged,
            3 => BodyDamageState::Rubble,
            _ => BodyDamageState::Pristine,
        }
    }
}

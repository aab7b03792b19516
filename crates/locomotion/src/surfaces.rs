//! Legal-surface bitmask shared by terrain cells, locomotor templates, and
//! locomotor sets. Bit values are part of the save format; do not renumber.

use std::ops::{BitOr, BitOrAssign};

#[derive(Clone, Copy, Default, PartialEq, Eq, Debug)]
pub struct SurfaceMask(pub u8);

impl SurfaceMask {
    pub const GROUND: SurfaceMask = SurfaceMask(1 << 0);
    pub const WATER: SurfaceMask = SurfaceMask(1 << 1);
    pub const CLIFF: SurfaceMask = SurfaceMask(1 << 2);
    pub const AIR: SurfaceMask = SurfaceMask(1 << 3);
    pub const RUBBLE: SurfaceMask = SurfaceMask(1 << 4);

    pub const NONE: SurfaceMask = SurfaceMask(0);
    pub const ALL: SurfaceMask = SurfaceMask(0x1F);

    pub fn intersects(self, other: SurfaceMask) -> bool {
        self.0 & other.0 != 0
    }

    pub fn contains(self, other: SurfaceMask) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Parse one surface token as it appears in template definitions.
    pub fn from_token(token: &str) -> Option<SurfaceMask> {
        match token {
            "GROUND" => Some(Self::GROUND),
            "WATER" => Some(Self::WATER),
            "CLIFF" => Some(Self::CLIFF),
            "AIR" => Some(Self::AIR),
            "RUBBLE" => Some(Self::RUBBLE),
            _ => None,
        }
    }
}

impl BitOr for SurfaceMask {
    type Output = SurfaceMask;
    fn bitor(self, rhs: SurfaceMask) -> SurfaceMask {
        SurfaceMask(self.0 | rhs.0)
    }
}

impl BitOrAssign for SurfaceMask {
    fn bitor_assign(&mut self, rhs: SurfaceMask) {
        self.0 |= rhs.0;
    }
}

//! The set of locomotors carried by one unit.
//!
//! Most units own a single locomotor, but transforming units (amphibious
//! vehicles, deploying aircraft) carry one per movement mode and switch by
//! surface. The set also caches the union of legal surfaces so pathfinding
//! can query one mask instead of walking the set.

use bevy::prelude::*;
use bitcode::{Decode, Encode};

use crate::locomotor::{Locomotor, LocomotorSnapshot};
use crate::registry::TemplateRegistry;
use crate::snapshot::SnapshotError;
use crate::surfaces::SurfaceMask;
use crate::SimRng;

#[derive(Component, Default)]
pub struct LocomotorSet {
    locomotors: Vec<Locomotor>,
    valid_surfaces: SurfaceMask,
    downhill_only: bool,
}

impl LocomotorSet {
    /// Instantiate the named template and add it to the set.
    pub fn add_locomotor(
        &mut self,
        registry: &TemplateRegistry,
        name: &str,
        rng: &mut SimRng,
        frame: u64,
    ) -> Result<(), SnapshotError> {
        let template = registry
            .resolve(name)
            .ok_or_else(|| SnapshotError::UnknownTemplate(name.to_string()))?;

        if self.locomotors.is_empty() {
            self.downhill_only = template.downhill_only;
        } else if self.downhill_only != template.downhill_only {
            // Mixed gravity-powered and powered locomotors make no sense for
            // one unit; keep the first one's setting.
            warn!(
                "LocomotorSet: '{name}' disagrees with the set on DownhillOnly"
            );
            debug_assert!(false, "inconsistent DownhillOnly in locomotor set");
        }

        self.valid_surfaces |= template.surfaces;
        self.locomotors.push(Locomotor::new(template, rng, frame));
        Ok(())
    }

    /// First locomotor that can traverse any surface in `mask`.
    pub fn find_locomotor(&self, mask: SurfaceMask) -> Option<&Locomotor> {
        self.locomotors.iter().find(|l| l.surfaces().intersects(mask))
    }

    pub fn find_locomotor_mut(&mut self, mask: SurfaceMask) -> Option<&mut Locomotor> {
        self.locomotors
            .iter_mut()
            .find(|l| l.surfaces().intersects(mask))
    }

    pub fn clear(&mut self) {
        self.locomotors.clear();
        self.valid_surfaces = SurfaceMask::NONE;
        self.downhill_only = false;
    }

    /// Union of legal surfaces across all locomotors in the set.
    pub fn valid_surfaces(&self) -> SurfaceMask {
        self.valid_surfaces
    }

    pub fn is_downhill_only(&self) -> bool {
        self.downhill_only
    }

    pub fn len(&self) -> usize {
        self.locomotors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locomotors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Locomotor> {
        self.locomotors.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Locomotor> {
        self.locomotors.iter_mut()
    }

    // -----------------------------------------------------------------------
    // Snapshots
    // -----------------------------------------------------------------------

    pub fn to_snapshot(&self) -> LocomotorSetSnapshot {
        LocomotorSetSnapshot {
            version: LocomotorSetSnapshot::VERSION,
            entries: self
                .locomotors
                .iter()
                .map(|l| (l.name().to_string(), l.to_snapshot()))
                .collect(),
            valid_surfaces: self.valid_surfaces.0,
            downhill_only: self.downhill_only,
        }
    }

    /// Rebuild the set from a snapshot. The set must be freshly created;
    /// templates are re-resolved by name, so an unknown name (a save from a
    /// different template base) is a hard error.
    pub fn apply_snapshot(
        &mut self,
        snap: &LocomotorSetSnapshot,
        registry: &TemplateRegistry,
        rng: &mut SimRng,
        frame: u64,
    ) -> Result<(), SnapshotError> {
        if snap.version != LocomotorSetSnapshot::VERSION {
            return Err(SnapshotError::VersionMismatch {
                found: snap.version as u32,
                expected: LocomotorSetSnapshot::VERSION as u32,
            });
        }
        if !self.locomotors.is_empty() {
            return Err(SnapshotError::NonEmptySet);
        }
        for (name, loco_snap) in &snap.entries {
            let template = registry
                .resolve(name)
                .ok_or_else(|| SnapshotError::UnknownTemplate(name.clone()))?;
            let mut loco = Locomotor::new(template, rng, frame);
            loco.apply_snapshot(loco_snap)?;
            self.locomotors.push(loco);
        }
        self.valid_surfaces = SurfaceMask(snap.valid_surfaces);
        self.downhill_only = snap.downhill_only;
        Ok(())
    }
}

/// Serialized locomotor set. Field order is the wire format.
#[derive(Encode, Decode, Clone, Debug, PartialEq)]
pub struct LocomotorSetSnapshot {
    pub version: u8,
    pub entries: Vec<(String, LocomotorSnapshot)>,
    pub valid_surfaces: u8,
    pub downhill_only: bool,
}

impl LocomotorSetSnapshot {
    pub const VERSION: u8 = 1;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::LocomotorTemplate;

    fn registry() -> TemplateRegistry {
        let mut reg = TemplateRegistry::default();
        let mut tank = LocomotorTemplate::named("TankLoco");
        tank.set_field("Surfaces", "GROUND RUBBLE").unwrap();
        tank.set_field("Speed", "30").unwrap();
        reg.register_base(tank).unwrap();
        let mut boat = LocomotorTemplate::named("BoatLoco");
        boat.set_field("Surfaces", "WATER").unwrap();
        boat.set_field("Speed", "20").unwrap();
        reg.register_base(boat).unwrap();
        reg
    }

    fn rng() -> SimRng {
        SimRng::from_seed_u64(11)
    }

    #[test]
    fn test_add_unions_surfaces() {
        let reg = registry();
        let mut rng = rng();
        let mut set = LocomotorSet::default();
        set.add_locomotor(&reg, "TankLoco", &mut rng, 0).unwrap();
        set.add_locomotor(&reg, "BoatLoco", &mut rng, 0).unwrap();
        assert_eq!(set.len(), 2);
        assert!(set
            .valid_surfaces()
            .contains(SurfaceMask::GROUND | SurfaceMask::RUBBLE | SurfaceMask::WATER));
    }

    #[test]
    fn test_add_unknown_name_errors() {
        let reg = registry();
        let mut rng = rng();
        let mut set = LocomotorSet::default();
        let err = set.add_locomotor(&reg, "HoverLoco", &mut rng, 0);
        assert!(matches!(err, Err(SnapshotError::UnknownTemplate(_))));
        assert!(set.is_empty());
    }

    #[test]
    fn test_find_by_surface() {
        let reg = registry();
        let mut rng = rng();
        let mut set = LocomotorSet::default();
        set.add_locomotor(&reg, "TankLoco", &mut rng, 0).unwrap();
        set.add_locomotor(&reg, "BoatLoco", &mut rng, 0).unwrap();

        let on_water = set.find_locomotor(SurfaceMask::WATER).unwrap();
        assert_eq!(on_water.name(), "BoatLoco");
        let on_land = set.find_locomotor(SurfaceMask::GROUND).unwrap();
        assert_eq!(on_land.name(), "TankLoco");
        assert!(set.find_locomotor(SurfaceMask::AIR).is_none());
    }

    #[test]
    fn test_clear_resets_everything() {
        let reg = registry();
        let mut rng = rng();
        let mut set = LocomotorSet::default();
        set.add_locomotor(&reg, "TankLoco", &mut rng, 0).unwrap();
        set.clear();
        assert!(set.is_empty());
        assert_eq!(set.valid_surfaces(), SurfaceMask::NONE);
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let reg = registry();
        let mut rng = rng();
        let mut set = LocomotorSet::default();
        set.add_locomotor(&reg, "TankLoco", &mut rng, 0).unwrap();
        set.add_locomotor(&reg, "BoatLoco", &mut rng, 0).unwrap();
        set.find_locomotor_mut(SurfaceMask::WATER)
            .unwrap()
            .braking_factor = 2.5;

        let bytes = bitcode::encode(&set.to_snapshot());
        let snap: LocomotorSetSnapshot = bitcode::decode(&bytes).unwrap();

        let mut restored = LocomotorSet::default();
        restored.apply_snapshot(&snap, &reg, &mut rng, 0).unwrap();
        assert_eq!(restored.len(), 2);
        assert_eq!(restored.valid_surfaces(), set.valid_surfaces());
        assert_eq!(
            restored
                .find_locomotor(SurfaceMask::WATER)
                .unwrap()
                .braking_factor,
            2.5
        );
    }

    #[test]
    fn test_snapshot_into_populated_set_rejected() {
        let reg = registry();
        let mut rng = rng();
        let mut set = LocomotorSet::default();
        set.add_locomotor(&reg, "TankLoco", &mut rng, 0).unwrap();
        let snap = set.to_snapshot();
        let err = set.apply_snapshot(&snap, &reg, &mut rng, 0);
        assert!(matches!(err, Err(SnapshotError::NonEmptySet)));
    }

    #[test]
    fn test_snapshot_with_unknown_template_rejected() {
        let reg = registry();
        let mut rng = rng();
        let mut set = LocomotorSet::default();
        set.add_locomotor(&reg, "TankLoco", &mut rng, 0).unwrap();
        let snap = set.to_snapshot();

        // A registry missing the template cannot restore the save.
        let empty_reg = TemplateRegistry::default();
        let mut restored = LocomotorSet::default();
        let err = restored.apply_snapshot(&snap, &empty_reg, &mut rng, 0);
        assert!(matches!(err, Err(SnapshotError::UnknownTemplate(_))));
    }

    #[test]
    fn test_snapshot_version_mismatch_rejected() {
        let reg = registry();
        let mut rng = rng();
        let mut set = LocomotorSet::default();
        set.add_locomotor(&reg, "TankLoco", &mut rng, 0).unwrap();
        let mut snap = set.to_snapshot();
        snap.version = 9;
        let mut restored = LocomotorSet::default();
        assert!(matches!(
            restored.apply_snapshot(&snap, &reg, &mut rng, 0),
            Err(SnapshotError::VersionMismatch { .. })
        ));
    }
}

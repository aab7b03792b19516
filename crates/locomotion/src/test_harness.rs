//! Headless proving range: a full simulation app with convenience accessors,
//! shared by integration tests and benchmarks.

use bevy::prelude::*;

use crate::driver::MoveOrder;
use crate::locomotor_set::LocomotorSet;
use crate::physics::{PhysicsProfile, RigidBody};
use crate::pose::Pose;
use crate::registry::TemplateRegistry;
use crate::state_hash::StateHash;
use crate::surfaces::SurfaceMask;
use crate::template::LocomotorTemplate;
use crate::terrain::TerrainMap;
use crate::unit::{BodyDamageState, UnitKind};
use crate::{LocomotionPlugin, SimRng, TickCounter};

pub struct TestRange {
    pub app: App,
}

impl Default for TestRange {
    fn default() -> Self {
        Self::new()
    }
}

impl TestRange {
    /// Flat all-surface terrain, default seed.
    pub fn new() -> Self {
        Self::with_terrain(TerrainMap::flat(128, 128, 0.0, SurfaceMask::ALL))
    }

    pub fn with_terrain(terrain: TerrainMap) -> Self {
        let mut app = App::new();
        app.add_plugins(LocomotionPlugin);
        app.insert_resource(terrain);
        Self { app }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.app.insert_resource(SimRng::from_seed_u64(seed));
        self
    }

    /// Register a template from `(key, value)` field pairs. Panics on
    /// malformed fields; harness callers author their own tuning.
    pub fn register_template(&mut self, name: &str, fields: &[(&str, &str)]) {
        let mut template = LocomotorTemplate::named(name);
        for (key, value) in fields {
            template
                .set_field(key, value)
                .unwrap_or_else(|e| panic!("template '{name}': {e}"));
        }
        self.app
            .world_mut()
            .resource_mut::<TemplateRegistry>()
            .register_base(template)
            .unwrap_or_else(|e| panic!("template '{name}': {e}"));
    }

    pub fn spawn_unit(&mut self, template: &str, pos: Vec3) -> Entity {
        self.spawn_unit_with(template, pos, UnitKind::default(), PhysicsProfile::default())
    }

    pub fn spawn_unit_with(
        &mut self,
        template: &str,
        pos: Vec3,
        kind: UnitKind,
        profile: PhysicsProfile,
    ) -> Entity {
        let world = self.app.world_mut();
        let frame = world.resource::<TickCounter>().0;
        let mut set = LocomotorSet::default();
        world.resource_scope::<SimRng, _>(|world, mut rng| {
            let registry = world.resource::<TemplateRegistry>();
            set.add_locomotor(registry, template, &mut rng, frame)
                .unwrap_or_else(|e| panic!("spawn '{template}': {e}"));
        });
        let body = RigidBody::from_profile(&profile);
        world
            .spawn((
                Pose::at(pos),
                body,
                profile,
                kind,
                BodyDamageState::Pristine,
                set,
            ))
            .id()
    }

    pub fn order_move(&mut self, unit: Entity, goal: Vec3) {
        self.app.world_mut().entity_mut(unit).insert(MoveOrder::to(goal));
    }

    /// Advance the simulation by `n` logic frames.
    pub fn tick(&mut self, n: usize) {
        for _ in 0..n {
            self.app.world_mut().run_schedule(FixedUpdate);
        }
    }

    pub fn pose(&self, unit: Entity) -> Pose {
        *self.app.world().get::<Pose>(unit).expect("unit has a Pose")
    }

    pub fn body(&self, unit: Entity) -> RigidBody {
        self.app
            .world()
            .get::<RigidBody>(unit)
            .expect("unit has a RigidBody")
            .clone()
    }

    pub fn has_order(&self, unit: Entity) -> bool {
        self.app.world().get::<MoveOrder>(unit).is_some()
    }

    pub fn tick_count(&self) -> u64 {
        self.app.world().resource::<TickCounter>().0
    }

    pub fn state_hash(&self) -> StateHash {
        *self.app.world().resource::<StateHash>()
    }
}

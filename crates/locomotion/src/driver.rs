//! Per-unit driver: turns [`MoveOrder`] components into locomotor calls each
//! steering phase, and retires orders on arrival.
//!
//! The driver is the only system that calls into locomotors; everything else
//! in the crate is data plus the physics integrator. Path following here is a
//! single straight segment, so the remaining path length is the straight-line
//! distance to the goal.

use bevy::prelude::*;

use crate::config::BIGNUM;
use crate::locomotor::{LocoFlags, SteerContext};
use crate::locomotor_set::LocomotorSet;
use crate::physics::{PhysicsFlags, PhysicsProfile, RigidBody};
use crate::pose::Pose;
use crate::surfaces::SurfaceMask;
use crate::terrain::TerrainMap;
use crate::unit::{BodyDamageState, UnitKind};
use crate::{SimulationSet, TickCounter};

/// Height above ground at which surface selection switches to AIR.
const AIRBORNE_MARGIN: f32 = 0.1;

/// Order a unit to a destination. Removed automatically on arrival.
#[derive(Component, Clone, Copy, Debug, PartialEq)]
pub struct MoveOrder {
    pub goal: Vec3,
    /// Cruise speed override; `None` runs at the locomotor's top speed.
    pub desired_speed: Option<f32>,
}

impl MoveOrder {
    pub fn to(goal: Vec3) -> Self {
        Self {
            goal,
            desired_speed: None,
        }
    }
}

/// Surface the unit is currently moving on, for locomotor selection.
fn surface_under(terrain: &TerrainMap, pose: &Pose) -> SurfaceMask {
    let p = pose.position;
    if p.z > terrain.ground_height(p.x, p.y) + AIRBORNE_MARGIN {
        SurfaceMask::AIR
    } else if terrain.is_underwater(p.x, p.y) {
        SurfaceMask::WATER
    } else {
        SurfaceMask::GROUND
    }
}

fn drive_locomotors(
    mut commands: Commands,
    tick: Res<TickCounter>,
    terrain: Res<TerrainMap>,
    mut units: Query<(
        Entity,
        Option<Ref<MoveOrder>>,
        &mut LocomotorSet,
        &mut Pose,
        &mut RigidBody,
        &PhysicsProfile,
        &UnitKind,
        &BodyDamageState,
    )>,
) {
    for (entity, order, mut set, mut pose, mut body, profile, kind, damage) in units.iter_mut() {
        let surface = surface_under(&terrain, &pose);
        // A unit off every legal surface (a tank knocked into the air) still
        // steers with its primary locomotor.
        let mask = if set.find_locomotor(surface).is_some() {
            surface
        } else {
            SurfaceMask::ALL
        };
        let Some(loco) = set.find_locomotor_mut(mask) else {
            continue;
        };

        loco.apply_physics_options(&mut body);

        let mut ctx = SteerContext {
            frame: tick.0,
            pose: &mut pose,
            body: &mut body,
            profile,
            kind: *kind,
            damage: *damage,
            terrain: &terrain,
            major_radius: profile.bounding_radius,
        };

        match order {
            Some(order) => {
                if order.is_added() {
                    loco.start_move(tick.0);
                }
                let to_goal = order.goal - ctx.pose.position;
                let arrive_dist = if loco.flags.has(LocoFlags::IS_CLOSE_ENOUGH_DIST_3D) {
                    to_goal.length()
                } else {
                    to_goal.truncate().length()
                };
                if arrive_dist <= loco.close_enough_dist {
                    commands.entity(entity).remove::<MoveOrder>();
                    loco.maintain_current_position(&mut ctx);
                } else {
                    let desired = order.desired_speed.unwrap_or(BIGNUM);
                    let on_path = to_goal.truncate().length();
                    loco.move_towards_position(&mut ctx, order.goal, on_path, desired, false);
                }
            }
            None => {
                loco.maintain_current_position(&mut ctx);
            }
        }

        // Physics skips horizontal integration while the arrival snap owns
        // it, so the braking flag must be mirrored every tick.
        ctx.body
            .flags
            .set(PhysicsFlags::IS_BRAKING, loco.is_braking());
    }
}

pub struct DriverPlugin;

impl Plugin for DriverPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            FixedUpdate,
            drive_locomotors.in_set(SimulationSet::Steering),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::TemplateRegistry;
    use crate::template::LocomotorTemplate;
    use crate::{LocomotionPlugin, SimRng};

    fn test_app() -> App {
        let mut app = App::new();
        app.add_plugins(LocomotionPlugin);
        app.insert_resource(TerrainMap::flat(64, 64, 0.0, SurfaceMask::ALL));
        let mut t = LocomotorTemplate::named("DriverTestLoco");
        t.set_field("Surfaces", "GROUND").unwrap();
        t.set_field("Speed", "30").unwrap();
        t.set_field("TurnRate", "360").unwrap();
        t.set_field("Acceleration", "300").unwrap();
        t.set_field("Braking", "300").unwrap();
        app.world_mut()
            .resource_mut::<TemplateRegistry>()
            .register_base(t)
            .unwrap();
        app
    }

    fn spawn_unit(app: &mut App, pos: Vec3) -> Entity {
        let world = app.world_mut();
        let mut set = LocomotorSet::default();
        world.resource_scope::<SimRng, _>(|world, mut rng| {
            let registry = world.resource::<TemplateRegistry>();
            set.add_locomotor(registry, "DriverTestLoco", &mut rng, 0)
                .unwrap();
        });
        let profile = PhysicsProfile::default();
        let body = RigidBody::from_profile(&profile);
        world
            .spawn((
                Pose::at(pos),
                body,
                profile,
                UnitKind::default(),
                BodyDamageState::Pristine,
                set,
            ))
            .id()
    }

    fn tick(app: &mut App, n: usize) {
        for _ in 0..n {
            app.world_mut().run_schedule(FixedUpdate);
        }
    }

    #[test]
    fn test_unit_drives_towards_order() {
        let mut app = test_app();
        let unit = spawn_unit(&mut app, Vec3::new(100.0, 100.0, 0.0));
        app.world_mut()
            .entity_mut(unit)
            .insert(MoveOrder::to(Vec3::new(300.0, 100.0, 0.0)));
        tick(&mut app, 60);
        let pose = app.world().get::<Pose>(unit).unwrap();
        assert!(pose.position.x > 120.0, "moved east: {:?}", pose.position);
        assert!(
            (pose.position.y - 100.0).abs() < 1.0,
            "held course: {:?}",
            pose.position
        );
    }

    #[test]
    fn test_order_removed_on_arrival() {
        let mut app = test_app();
        let unit = spawn_unit(&mut app, Vec3::new(100.0, 100.0, 0.0));
        let goal = Vec3::new(140.0, 100.0, 0.0);
        app.world_mut().entity_mut(unit).insert(MoveOrder::to(goal));
        tick(&mut app, 300);
        assert!(app.world().get::<MoveOrder>(unit).is_none());
        let pose = app.world().get::<Pose>(unit).unwrap();
        let close = app
            .world()
            .get::<LocomotorSet>(unit)
            .unwrap()
            .find_locomotor(SurfaceMask::GROUND)
            .unwrap()
            .close_enough_dist;
        let dist = (pose.position - goal).truncate().length();
        assert!(dist <= close + 1e-3, "stopped on the goal: {dist}");
    }

    #[test]
    fn test_idle_unit_comes_to_rest() {
        let mut app = test_app();
        let unit = spawn_unit(&mut app, Vec3::new(100.0, 100.0, 0.0));
        app.world_mut().get_mut::<RigidBody>(unit).unwrap().vel = Vec3::new(3.0, 0.0, 0.0);
        tick(&mut app, 100);
        let body = app.world().get::<RigidBody>(unit).unwrap();
        assert!(
            body.velocity_magnitude_2d() < 0.05,
            "shove damped out: {:?}",
            body.vel
        );
    }

    #[test]
    fn test_braking_mirrored_to_body() {
        let mut app = test_app();
        let unit = spawn_unit(&mut app, Vec3::new(100.0, 100.0, 0.0));
        app.world_mut()
            .entity_mut(unit)
            .insert(MoveOrder::to(Vec3::new(180.0, 100.0, 0.0)));
        let mut seen_braking = false;
        for _ in 0..300 {
            tick(&mut app, 1);
            let set = app.world().get::<LocomotorSet>(unit).unwrap();
            let braking = set
                .find_locomotor(SurfaceMask::GROUND)
                .unwrap()
                .is_braking();
            let body_flag = app
                .world()
                .get::<RigidBody>(unit)
                .unwrap()
                .flags
                .has(PhysicsFlags::IS_BRAKING);
            assert_eq!(braking, body_flag, "flags stay in lockstep");
            if braking {
                seen_braking = true;
            }
        }
        assert!(seen_braking, "the approach braked at least once");
    }
}

//! Rigid-body physics: per-tick force integration, friction, gravity,
//! ground contact and bounce, landing damage, and collision push-apart.
//!
//! Runs in `SimulationSet::Physics`, always after steering has applied its
//! motive forces for the tick. Steering never mutates velocity or position
//! directly except through the methods on [`RigidBody`] (and the braking
//! arrival snap, which owns position while braking is engaged).

use bevy::prelude::*;

use crate::config::{
    speed_from_fall_height, DEFAULT_FALL_DAMAGE_HEIGHT, GRAVITY, GROUND_STIFFNESS,
    LOGIC_FRAMES_PER_SECOND, STRUCTURE_STIFFNESS,
};
use crate::pose::{normalize_angle, Pose};
use crate::terrain::TerrainMap;
use crate::unit::UnitKind;
use crate::{SimulationSet, TickCounter};

/// How long one motive-force application keeps an entity "driven".
pub const MOTIVE_FRAMES: u64 = (LOGIC_FRAMES_PER_SECOND / 3.0) as u64;

/// Per-frame damping applied to pitch/roll/yaw rates under friction.
const YPR_FRICTION: f32 = 0.85;
/// Extra pitch/roll/yaw damping applied on a bounce.
const YPR_BOUNCE_DAMP: f32 = 0.7;
/// Per-axis velocity below this is treated as rest.
const REST_VELOCITY: f32 = 0.001;
/// Height above ground beyond which a body counts as airborne.
const AIRBORNE_EPSILON: f32 = 0.1;
/// Bounces slower than this are suppressed into rest.
const MIN_BOUNCE_SPEED: f32 = 1.0 / (LOGIC_FRAMES_PER_SECOND * 5.0);
/// Push-apart overlap is capped so coincident objects don't explode.
const MAX_PUSH_OVERLAP: f32 = 5.0;
/// Descent counts as "steep" (eligible for fall damage) when |vz| is at
/// least this multiple of the 2D speed.
const STEEP_FALL_RATIO: f32 = 3.0;

// ---------------------------------------------------------------------------
// Flags and small types
// ---------------------------------------------------------------------------

/// Which way the last steering tick turned the body, for animation layers.
#[derive(Clone, Copy, Default, PartialEq, Eq, Debug)]
pub enum Turning {
    Negative,
    #[default]
    None,
    Positive,
}

impl Turning {
    pub fn to_u8(self) -> u8 {
        match self {
            Turning::Negative => 0,
            Turning::None => 1,
            Turning::Positive => 2,
        }
    }

    pub fn from_u8(v: u8) -> Self {
        match v {
            0 => Turning::Negative,
            2 => Turning::Positive,
            _ => Turning::None,
        }
    }
}

/// Behavioral toggles for one rigid body.
///
/// Bit positions are part of the save format; never renumber, only append.
#[derive(Clone, Copy, Default, PartialEq, Eq, Debug)]
pub struct PhysicsFlags(pub u32);

impl PhysicsFlags {
    pub const STICK_TO_GROUND: u32 = 1 << 0;
    pub const ALLOW_BOUNCE: u32 = 1 << 1;
    pub const APPLY_FRICTION2D_WHEN_AIRBORNE: u32 = 1 << 2;
    pub const UPDATE_EVER_RUN: u32 = 1 << 3;
    pub const WAS_AIRBORNE_LAST_FRAME: u32 = 1 << 4;
    pub const ALLOW_COLLIDE_FORCE: u32 = 1 << 5;
    pub const ALLOW_TO_FALL: u32 = 1 << 6;
    pub const IS_IN_FREEFALL: u32 = 1 << 7;
    pub const IMMUNE_TO_FALLING_DAMAGE: u32 = 1 << 8;
    pub const IS_STUNNED: u32 = 1 << 9;
    pub const IS_IN_UPDATE: u32 = 1 << 10;
    pub const IS_HELD: u32 = 1 << 11;
    /// Mirrored from the locomotor each tick; while set, physics does not
    /// integrate horizontal motion (the arrival snap owns position).
    pub const IS_BRAKING: u32 = 1 << 12;

    pub fn has(self, flag: u32) -> bool {
        self.0 & flag != 0
    }

    pub fn set(&mut self, flag: u32, on: bool) {
        if on {
            self.0 |= flag;
        } else {
            self.0 &= !flag;
        }
    }
}

/// Why the physics step destroyed an entity.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum DestroyReason {
    NanPosition,
    RestingOnGround,
}

// ---------------------------------------------------------------------------
// Events (outward calls to systems outside this subsystem)
// ---------------------------------------------------------------------------

/// Fired when a body lands after being airborne. Audio hooks off this.
#[derive(Event, Debug)]
pub struct BounceImpactEvent {
    pub entity: Entity,
    pub impact_speed: f32,
}

/// Fired when a landing is hard and steep enough to hurt.
#[derive(Event, Debug)]
pub struct FallingDamageEvent {
    pub entity: Entity,
    pub amount: f32,
}

/// Fired just before the physics step despawns an entity.
#[derive(Event, Debug)]
pub struct UnitDestroyedEvent {
    pub entity: Entity,
    pub reason: DestroyReason,
}

// ---------------------------------------------------------------------------
// Components
// ---------------------------------------------------------------------------

/// Static physics tuning for one entity. Friction coefficients are
/// per-logic-frame; callers authoring per-second values convert first.
#[derive(Component, Clone, Debug)]
pub struct PhysicsProfile {
    pub mass: f32,
    pub forward_friction: f32,
    pub lateral_friction: f32,
    pub z_friction: f32,
    pub aerodynamic_friction: f32,
    pub center_of_mass_offset: f32,
    pub bounding_radius: f32,
    pub stick_to_ground: bool,
    pub allow_bouncing: bool,
    pub allow_collide_force: bool,
    pub kill_when_resting_on_ground: bool,
    pub min_fall_speed_for_damage: f32,
    pub fall_height_damage_factor: f32,
    pub pitch_roll_yaw_factor: f32,
}

impl Default for PhysicsProfile {
    fn default() -> Self {
        Self {
            mass: 1.0,
            forward_friction: 0.15,
            lateral_friction: 0.15,
            z_friction: 0.8,
            aerodynamic_friction: 0.0,
            center_of_mass_offset: 0.0,
            bounding_radius: 5.0,
            stick_to_ground: false,
            allow_bouncing: false,
            allow_collide_force: true,
            kill_when_resting_on_ground: false,
            min_fall_speed_for_damage: speed_from_fall_height(DEFAULT_FALL_DAMAGE_HEIGHT),
            fall_height_damage_factor: 1.0,
            pitch_roll_yaw_factor: 2.0,
        }
    }
}

/// Dynamic rigid-body state. Mutated only through its own methods; the
/// steering layer applies forces, it never writes velocity fields directly.
#[derive(Component, Clone, Debug)]
pub struct RigidBody {
    pub vel: Vec3,
    pub accel: Vec3,
    pub prev_accel: Vec3,
    pub yaw_rate: f32,
    pub pitch_rate: f32,
    pub roll_rate: f32,
    pub turning: Turning,
    pub flags: PhysicsFlags,
    pub mass: f32,
    pub extra_bounciness: f32,
    pub extra_friction: f32,
    pub motive_force_expires: u64,
    pub current_overlap: Option<Entity>,
    pub previous_overlap: Option<Entity>,
    pub last_collidee: Option<Entity>,
    pub ignore_collisions_with: Option<Entity>,
}

impl RigidBody {
    pub fn from_profile(profile: &PhysicsProfile) -> Self {
        let mut flags = PhysicsFlags::default();
        flags.set(PhysicsFlags::STICK_TO_GROUND, profile.stick_to_ground);
        flags.set(PhysicsFlags::ALLOW_BOUNCE, profile.allow_bouncing);
        flags.set(PhysicsFlags::ALLOW_COLLIDE_FORCE, profile.allow_collide_force);
        Self {
            vel: Vec3::ZERO,
            accel: Vec3::ZERO,
            prev_accel: Vec3::ZERO,
            yaw_rate: 0.0,
            pitch_rate: 0.0,
            roll_rate: 0.0,
            turning: Turning::None,
            flags,
            mass: profile.mass,
            extra_bounciness: 0.0,
            extra_friction: 0.0,
            motive_force_expires: 0,
            current_overlap: None,
            previous_overlap: None,
            last_collidee: None,
            ignore_collisions_with: None,
        }
    }

    pub fn get_mass(&self) -> f32 {
        self.mass.max(0.01)
    }

    /// Whether a motive force is still in effect at `frame` (the entity is
    /// moving under its own power rather than being shoved).
    pub fn is_motive(&self, frame: u64) -> bool {
        self.motive_force_expires > frame
    }

    pub fn velocity_magnitude(&self) -> f32 {
        self.vel.length()
    }

    pub fn velocity_magnitude_2d(&self) -> f32 {
        self.vel.truncate().length()
    }

    /// Speed along the facing direction, signed (negative while reversing).
    pub fn forward_speed_2d(&self, pose: &Pose) -> f32 {
        self.vel.truncate().dot(pose.direction_2d())
    }

    /// 3D speed signed by whether motion is along or against the facing.
    pub fn forward_speed_3d(&self, pose: &Pose) -> f32 {
        let mag = self.vel.length();
        if self.vel.dot(pose.direction_3d()) >= 0.0 {
            mag
        } else {
            -mag
        }
    }

    /// Add `force / mass` to this tick's acceleration.
    ///
    /// While the body is motive, an external force only contributes its
    /// component lateral to the facing direction; the locomotor owns the
    /// forward axis.
    pub fn apply_force(&mut self, frame: u64, facing_2d: Vec2, force: Vec3) {
        if !force.is_finite() {
            debug_assert!(false, "apply_force: non-finite force {force:?}");
            warn!("apply_force: dropping non-finite force");
            return;
        }
        let mut accepted = force;
        if self.is_motive(frame) {
            let fwd = force.truncate().dot(facing_2d);
            accepted.x -= fwd * facing_2d.x;
            accepted.y -= fwd * facing_2d.y;
        }
        self.accel += accepted / self.get_mass();
    }

    /// Apply a self-propulsion force and mark the body driven for the next
    /// [`MOTIVE_FRAMES`] frames.
    pub fn apply_motive_force(&mut self, frame: u64, facing_2d: Vec2, force: Vec3) {
        self.motive_force_expires = 0;
        self.apply_force(frame, facing_2d, force);
        self.motive_force_expires = frame + MOTIVE_FRAMES;
    }

    /// Trim horizontal speed down to `desired` (never speeds up).
    pub fn scrub_velocity_2d(&mut self, desired: f32) {
        if desired < REST_VELOCITY {
            self.vel.x = 0.0;
            self.vel.y = 0.0;
            return;
        }
        let current = self.vel.truncate().length();
        if desired > current {
            return;
        }
        let scale = desired / current;
        self.vel.x *= scale;
        self.vel.y *= scale;
    }

    /// Trim vertical speed toward `desired` without reversing its sign.
    pub fn scrub_velocity_z(&mut self, desired: f32) {
        if desired.abs() < REST_VELOCITY {
            self.vel.z = 0.0;
        } else if (desired < 0.0 && self.vel.z < desired)
            || (desired > 0.0 && self.vel.z > desired)
        {
            self.vel.z = desired;
        }
    }

    pub fn add_velocity(&mut self, v: Vec3) {
        self.vel += v;
    }

    pub fn transfer_velocity_to(&self, other: &mut RigidBody) {
        other.vel += self.vel;
    }

    pub fn add_overlap(&mut self, other: Entity) {
        if !self.is_currently_overlapped(other) {
            self.current_overlap = Some(other);
        }
    }

    pub fn is_currently_overlapped(&self, other: Entity) -> bool {
        self.current_overlap == Some(other)
    }

    pub fn was_previously_overlapped(&self, other: Entity) -> bool {
        self.previous_overlap == Some(other)
    }

    fn friction_clamped(&self, base: f32) -> f32 {
        (base + self.extra_friction).clamp(0.01, 0.99)
    }

    /// Apply per-frame friction. Grounded bodies get forward friction only
    /// while not motive, lateral friction always, and Z friction; airborne
    /// bodies get proportional aerodynamic drag on all axes.
    pub fn apply_frictional_forces(
        &mut self,
        profile: &PhysicsProfile,
        pose: &Pose,
        frame: u64,
        airborne: bool,
    ) {
        self.yaw_rate *= YPR_FRICTION;
        self.pitch_rate *= YPR_FRICTION;
        self.roll_rate *= YPR_FRICTION;

        if !airborne || self.flags.has(PhysicsFlags::APPLY_FRICTION2D_WHEN_AIRBORNE) {
            let dir = pose.direction_2d();
            let v2 = self.vel.truncate();
            let forward = v2.dot(dir);
            let lateral = v2 - dir * forward;
            let forward_keep = if self.is_motive(frame) {
                1.0
            } else {
                1.0 - self.friction_clamped(profile.forward_friction)
            };
            let lateral_keep = 1.0 - self.friction_clamped(profile.lateral_friction);
            let out = dir * forward * forward_keep + lateral * lateral_keep;
            self.vel.x = out.x;
            self.vel.y = out.y;
            if !airborne {
                self.vel.z *= 1.0 - self.friction_clamped(profile.z_friction);
            }
        } else {
            let aero = (profile.aerodynamic_friction + self.extra_friction).clamp(0.0, 0.99);
            self.vel *= 1.0 - aero;
        }
    }

    /// Sleep-forever hint: true only for a body fully at rest with nothing
    /// pending. Advisory; the scheduler may still tick the entity.
    pub fn calc_sleep_state(&self, frame: u64, grounded: bool) -> bool {
        self.vel == Vec3::ZERO
            && self.accel == Vec3::ZERO
            && self.yaw_rate == 0.0
            && self.pitch_rate == 0.0
            && self.roll_rate == 0.0
            && !self.is_motive(frame)
            && grounded
            && self.current_overlap.is_none()
            && self.previous_overlap.is_none()
            && self.flags.has(PhysicsFlags::UPDATE_EVER_RUN)
    }
}

// ---------------------------------------------------------------------------
// Collision push-apart
// ---------------------------------------------------------------------------

/// The slice of another entity that collision response needs.
#[derive(Clone, Copy, Debug)]
pub struct CollisionOther {
    pub entity: Entity,
    pub immobile: bool,
    pub center: Vec3,
    pub radius: f32,
}

impl RigidBody {
    /// Resolve a collision against `other` by applying a proportional
    /// push-apart force to this body only (the partner's own collision pass
    /// applies the equal-and-opposite force).
    pub fn on_collide(
        &mut self,
        frame: u64,
        pose: &Pose,
        profile: &PhysicsProfile,
        airborne: bool,
        other: &CollisionOther,
    ) {
        if self.ignore_collisions_with == Some(other.entity) {
            return;
        }

        let mut delta = other.center - pose.position;
        let dist_sqr = if airborne {
            delta.length_squared()
        } else {
            delta.z = 0.0;
            delta.truncate().length_squared()
        };
        let reach = profile.bounding_radius + other.radius;
        if dist_sqr > reach * reach {
            return;
        }

        self.last_collidee = Some(other.entity);

        if !self.flags.has(PhysicsFlags::ALLOW_COLLIDE_FORCE) {
            return;
        }

        let dist = dist_sqr.sqrt().max(1.0);
        let overlap = reach - dist;

        let factor = if other.immobile {
            // Enough force to at least stop our motion, or we pass through.
            let stiffness = STRUCTURE_STIFFNESS.clamp(0.01, 0.99);
            let mag = self.velocity_magnitude().max(MIN_BOUNCE_SPEED);
            // Ignore prior velocity in favor of the bounce; re-deriving it
            // from forces would read as a sudden acceleration next frame.
            self.vel = Vec3::ZERO;
            -mag * self.get_mass() * stiffness
        } else {
            -overlap.min(MAX_PUSH_OVERLAP)
        };

        let force = delta * (factor / dist);
        self.apply_force(frame, pose.direction_2d(), force);
    }
}

// ---------------------------------------------------------------------------
// Per-tick step
// ---------------------------------------------------------------------------

/// Side effects of one physics step, routed into events by the system.
#[derive(Default, Debug)]
pub struct StepOutcome {
    pub destroyed: Option<DestroyReason>,
    pub bounce_impact: Option<f32>,
    pub falling_damage: Option<f32>,
}

/// Advance one body by one logic frame. Exposed for direct use in tests.
pub fn step_rigid_body(
    frame: u64,
    terrain: &TerrainMap,
    profile: &PhysicsProfile,
    kind: UnitKind,
    body: &mut RigidBody,
    pose: &mut Pose,
) -> StepOutcome {
    let mut outcome = StepOutcome::default();
    if body.flags.has(PhysicsFlags::IS_HELD) {
        return outcome;
    }
    body.flags.set(PhysicsFlags::IS_IN_UPDATE, true);

    let ground_before = terrain.ground_height(pose.position.x, pose.position.y);
    let airborne_before = pose.position.z > ground_before + AIRBORNE_EPSILON;

    body.accel.z += GRAVITY;
    body.apply_frictional_forces(profile, pose, frame, airborne_before);

    let braking = body.flags.has(PhysicsFlags::IS_BRAKING);
    let projectile = kind.has(UnitKind::PROJECTILE);

    // While braking, the locomotor's arrival snap owns horizontal motion;
    // projectiles snap in 3D so they keep vertical control too.
    if !braking {
        body.vel += body.accel;
    } else if !projectile {
        body.vel.z += body.accel.z;
    }
    if body.vel.x.abs() < REST_VELOCITY {
        body.vel.x = 0.0;
    }
    if body.vel.y.abs() < REST_VELOCITY {
        body.vel.y = 0.0;
    }
    if !braking {
        pose.position += body.vel;
    } else if !projectile {
        pose.position.z += body.vel.z;
    }

    if !pose.position.is_finite() {
        outcome.destroyed = Some(DestroyReason::NanPosition);
        return outcome;
    }

    let f = profile.pitch_roll_yaw_factor;
    pose.yaw = normalize_angle(pose.yaw + body.yaw_rate * f);
    pose.pitch += body.pitch_rate * f * (1.0 + profile.center_of_mass_offset);
    pose.roll += body.roll_rate * f;

    let ground = terrain.ground_height(pose.position.x, pose.position.y);
    let stick = body.flags.has(PhysicsFlags::STICK_TO_GROUND)
        && !body.flags.has(PhysicsFlags::ALLOW_TO_FALL);

    if stick {
        pose.position.z = ground;
        body.vel.z = 0.0;
        body.flags.set(PhysicsFlags::IS_IN_FREEFALL, false);
    } else if pose.position.z <= ground {
        let impact_vz = body.vel.z;
        if impact_vz < 0.0
            && body.flags.has(PhysicsFlags::ALLOW_BOUNCE)
            && profile.allow_bouncing
        {
            let stiffness = (GROUND_STIFFNESS + body.extra_bounciness).clamp(0.01, 0.99);
            let reflected = -impact_vz * stiffness;
            if reflected > MIN_BOUNCE_SPEED {
                body.vel.z = reflected;
                body.yaw_rate *= YPR_BOUNCE_DAMP;
                body.pitch_rate *= YPR_BOUNCE_DAMP;
                body.roll_rate *= YPR_BOUNCE_DAMP;
                pose.pitch *= 0.5;
                pose.roll *= 0.5;
            } else {
                body.vel.z = 0.0;
            }
        } else if impact_vz < 0.0 {
            body.vel.z = 0.0;
        }
        pose.position.z = ground;
        body.flags.set(PhysicsFlags::ALLOW_TO_FALL, false);
        body.flags.set(PhysicsFlags::IS_IN_FREEFALL, false);

        if airborne_before {
            outcome.bounce_impact = Some((-impact_vz).max(0.0));
            if !body.flags.has(PhysicsFlags::IMMUNE_TO_FALLING_DAMAGE) {
                let net = -impact_vz - profile.min_fall_speed_for_damage;
                let v2d = body.velocity_magnitude_2d();
                let steep = v2d < 1e-6 || (-impact_vz) / v2d >= STEEP_FALL_RATIO;
                if net > 0.0 && steep {
                    outcome.falling_damage =
                        Some(net * body.get_mass() * profile.fall_height_damage_factor);
                }
            }
        }
    } else if body.flags.has(PhysicsFlags::ALLOW_TO_FALL) && body.vel.z < 0.0 {
        body.flags.set(PhysicsFlags::IS_IN_FREEFALL, true);
    }

    let grounded_now = pose.position.z <= ground + AIRBORNE_EPSILON;
    body.flags
        .set(PhysicsFlags::WAS_AIRBORNE_LAST_FRAME, !grounded_now);

    if profile.kill_when_resting_on_ground
        && grounded_now
        && body.velocity_magnitude() < REST_VELOCITY
        && body.flags.has(PhysicsFlags::UPDATE_EVER_RUN)
        && outcome.destroyed.is_none()
    {
        outcome.destroyed = Some(DestroyReason::RestingOnGround);
    }

    body.previous_overlap = body.current_overlap;
    body.current_overlap = None;
    body.prev_accel = body.accel;
    body.accel = Vec3::ZERO;
    body.flags.set(PhysicsFlags::UPDATE_EVER_RUN, true);
    body.flags.set(PhysicsFlags::IS_IN_UPDATE, false);

    outcome
}

// ---------------------------------------------------------------------------
// System and plugin
// ---------------------------------------------------------------------------

fn update_rigid_bodies(
    mut commands: Commands,
    tick: Res<TickCounter>,
    terrain: Res<TerrainMap>,
    mut bounce_events: EventWriter<BounceImpactEvent>,
    mut damage_events: EventWriter<FallingDamageEvent>,
    mut destroyed_events: EventWriter<UnitDestroyedEvent>,
    mut bodies: Query<(Entity, &PhysicsProfile, &UnitKind, &mut RigidBody, &mut Pose)>,
) {
    for (entity, profile, kind, mut body, mut pose) in bodies.iter_mut() {
        let outcome = step_rigid_body(tick.0, &terrain, profile, *kind, &mut body, &mut pose);
        if let Some(speed) = outcome.bounce_impact {
            bounce_events.send(BounceImpactEvent {
                entity,
                impact_speed: speed,
            });
        }
        if let Some(amount) = outcome.falling_damage {
            damage_events.send(FallingDamageEvent { entity, amount });
        }
        if let Some(reason) = outcome.destroyed {
            warn!("physics destroying {entity:?}: {reason:?}");
            destroyed_events.send(UnitDestroyedEvent { entity, reason });
            commands.entity(entity).despawn();
        }
    }
}

pub struct PhysicsPlugin;

impl Plugin for PhysicsPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<BounceImpactEvent>()
            .add_event::<FallingDamageEvent>()
            .add_event::<UnitDestroyedEvent>()
            .add_systems(
                FixedUpdate,
                update_rigid_bodies.in_set(SimulationSet::Physics),
            );
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surfaces::SurfaceMask;

    fn flat_terrain() -> TerrainMap {
        TerrainMap::flat(16, 16, 0.0, SurfaceMask::ALL)
    }

    fn body_and_pose() -> (PhysicsProfile, RigidBody, Pose) {
        let profile = PhysicsProfile::default();
        let body = RigidBody::from_profile(&profile);
        let pose = Pose::at(Vec3::new(80.0, 80.0, 0.0));
        (profile, body, pose)
    }

    #[test]
    fn test_motive_force_marks_driven() {
        let (_, mut body, pose) = body_and_pose();
        assert!(!body.is_motive(10));
        body.apply_motive_force(10, pose.direction_2d(), Vec3::X);
        assert!(body.is_motive(10));
        assert!(!body.is_motive(10 + MOTIVE_FRAMES));
        assert!(body.accel.x > 0.0);
    }

    #[test]
    fn test_external_force_lateral_only_while_motive() {
        let (_, mut body, pose) = body_and_pose();
        // Facing +X; motive.
        body.apply_motive_force(5, pose.direction_2d(), Vec3::ZERO);
        let accel_before = body.accel;
        body.apply_force(5, pose.direction_2d(), Vec3::new(10.0, 4.0, 0.0));
        let delta = body.accel - accel_before;
        assert!(delta.x.abs() < 1e-5, "forward component rejected: {delta:?}");
        assert!(delta.y > 0.0, "lateral component accepted");
    }

    #[test]
    fn test_nonfinite_force_dropped() {
        let (_, mut body, pose) = body_and_pose();
        let before = body.accel;
        // debug_assert fires in debug builds; release drops silently.
        if cfg!(not(debug_assertions)) {
            body.apply_force(0, pose.direction_2d(), Vec3::new(f32::NAN, 0.0, 0.0));
            assert_eq!(body.accel, before);
        }
    }

    #[test]
    fn test_scrub_velocity_2d() {
        let (_, mut body, _) = body_and_pose();
        body.vel = Vec3::new(3.0, 4.0, 1.0);
        body.scrub_velocity_2d(10.0); // above current: no-op
        assert_eq!(body.vel.truncate().length(), 5.0);
        body.scrub_velocity_2d(2.5);
        assert!((body.vel.truncate().length() - 2.5).abs() < 1e-4);
        assert_eq!(body.vel.z, 1.0);
        body.scrub_velocity_2d(0.0);
        assert_eq!(body.vel.truncate(), Vec2::ZERO);
    }

    #[test]
    fn test_scrub_velocity_z() {
        let (_, mut body, _) = body_and_pose();
        body.vel.z = -5.0;
        body.scrub_velocity_z(-2.0);
        assert_eq!(body.vel.z, -2.0);
        body.scrub_velocity_z(-3.0); // slower than current: no-op
        assert_eq!(body.vel.z, -2.0);
        body.scrub_velocity_z(0.0);
        assert_eq!(body.vel.z, 0.0);
    }

    #[test]
    fn test_gravity_pulls_airborne_body_down() {
        let terrain = flat_terrain();
        let (profile, mut body, mut pose) = body_and_pose();
        pose.position.z = 50.0;
        let z0 = pose.position.z;
        step_rigid_body(0, &terrain, &profile, UnitKind::default(), &mut body, &mut pose);
        assert!(body.vel.z < 0.0);
        assert!(pose.position.z < z0);
    }

    #[test]
    fn test_stick_to_ground_snaps() {
        let terrain = flat_terrain();
        let (profile, mut body, mut pose) = body_and_pose();
        body.flags.set(PhysicsFlags::STICK_TO_GROUND, true);
        pose.position.z = 3.0;
        step_rigid_body(0, &terrain, &profile, UnitKind::default(), &mut body, &mut pose);
        assert_eq!(pose.position.z, 0.0);
        assert_eq!(body.vel.z, 0.0);
    }

    #[test]
    fn test_allow_to_fall_overrides_stick() {
        let terrain = flat_terrain();
        let (profile, mut body, mut pose) = body_and_pose();
        body.flags.set(PhysicsFlags::STICK_TO_GROUND, true);
        body.flags.set(PhysicsFlags::ALLOW_TO_FALL, true);
        pose.position.z = 30.0;
        step_rigid_body(0, &terrain, &profile, UnitKind::default(), &mut body, &mut pose);
        assert!(pose.position.z > 0.0, "still falling, not snapped");
        assert!(body.flags.has(PhysicsFlags::IS_IN_FREEFALL));
    }

    #[test]
    fn test_landing_after_fall_reports_impact() {
        let terrain = flat_terrain();
        let (profile, mut body, mut pose) = body_and_pose();
        pose.position.z = 1.0;
        body.vel.z = -5.0;
        body.flags.set(PhysicsFlags::WAS_AIRBORNE_LAST_FRAME, true);
        let outcome =
            step_rigid_body(0, &terrain, &profile, UnitKind::default(), &mut body, &mut pose);
        assert_eq!(pose.position.z, 0.0);
        let impact = outcome.bounce_impact.expect("landed");
        assert!(impact > 4.0);
        // Fall of ~5 units/frame well exceeds the default damage threshold.
        assert!(outcome.falling_damage.is_some());
    }

    #[test]
    fn test_shallow_fast_landing_no_damage() {
        let terrain = flat_terrain();
        let (profile, mut body, mut pose) = body_and_pose();
        pose.position.z = 1.0;
        // Fast horizontally, modest descent: not steep, no damage.
        body.vel = Vec3::new(8.0, 0.0, -5.0);
        let outcome =
            step_rigid_body(0, &terrain, &profile, UnitKind::default(), &mut body, &mut pose);
        assert!(outcome.falling_damage.is_none());
    }

    #[test]
    fn test_immune_flag_suppresses_fall_damage() {
        let terrain = flat_terrain();
        let (profile, mut body, mut pose) = body_and_pose();
        pose.position.z = 1.0;
        body.vel.z = -5.0;
        body.flags.set(PhysicsFlags::IMMUNE_TO_FALLING_DAMAGE, true);
        let outcome =
            step_rigid_body(0, &terrain, &profile, UnitKind::default(), &mut body, &mut pose);
        assert!(outcome.falling_damage.is_none());
    }

    #[test]
    fn test_bounce_reflects_velocity() {
        let terrain = flat_terrain();
        let mut profile = PhysicsProfile::default();
        profile.allow_bouncing = true;
        let mut body = RigidBody::from_profile(&profile);
        let mut pose = Pose::at(Vec3::new(80.0, 80.0, 0.5));
        body.vel.z = -4.0;
        step_rigid_body(0, &terrain, &profile, UnitKind::default(), &mut body, &mut pose);
        assert!(body.vel.z > 0.0, "bounced back up: {}", body.vel.z);
        assert!(body.vel.z < 4.0, "restitution lost energy");
    }

    #[test]
    fn test_braking_freezes_horizontal_integration() {
        let terrain = flat_terrain();
        let (profile, mut body, mut pose) = body_and_pose();
        body.vel = Vec3::new(2.0, 0.0, 0.0);
        body.accel = Vec3::new(1.0, 0.0, 0.0);
        body.flags.set(PhysicsFlags::IS_BRAKING, true);
        let x0 = pose.position.x;
        step_rigid_body(0, &terrain, &profile, UnitKind::default(), &mut body, &mut pose);
        assert_eq!(pose.position.x, x0, "arrival snap owns X while braking");
        assert_eq!(body.vel.x, 2.0, "acceleration not integrated");
    }

    #[test]
    fn test_nan_position_destroys() {
        let terrain = flat_terrain();
        let (profile, mut body, mut pose) = body_and_pose();
        pose.position.x = f32::NAN;
        let outcome =
            step_rigid_body(0, &terrain, &profile, UnitKind::default(), &mut body, &mut pose);
        assert_eq!(outcome.destroyed, Some(DestroyReason::NanPosition));
    }

    #[test]
    fn test_forward_friction_skipped_while_motive() {
        let terrain = flat_terrain();
        let (profile, mut body, mut pose) = body_and_pose();
        body.vel = Vec3::new(4.0, 0.0, 0.0);
        body.apply_motive_force(0, pose.direction_2d(), Vec3::ZERO);
        step_rigid_body(0, &terrain, &profile, UnitKind::default(), &mut body, &mut pose);
        let motive_speed = body.vel.x;

        let (profile2, mut body2, mut pose2) = (profile.clone(), RigidBody::from_profile(&profile), Pose::at(Vec3::new(80.0, 80.0, 0.0)));
        body2.vel = Vec3::new(4.0, 0.0, 0.0);
        step_rigid_body(0, &terrain, &profile2, UnitKind::default(), &mut body2, &mut pose2);
        assert!(
            motive_speed > body2.vel.x,
            "coasting body slows faster: {motive_speed} vs {}",
            body2.vel.x
        );
    }

    #[test]
    fn test_kill_when_resting() {
        let terrain = flat_terrain();
        let mut profile = PhysicsProfile::default();
        profile.kill_when_resting_on_ground = true;
        let mut body = RigidBody::from_profile(&profile);
        let mut pose = Pose::at(Vec3::new(80.0, 80.0, 0.0));
        // First step sets UPDATE_EVER_RUN; second detects rest.
        step_rigid_body(0, &terrain, &profile, UnitKind::default(), &mut body, &mut pose);
        body.vel = Vec3::ZERO;
        let outcome =
            step_rigid_body(1, &terrain, &profile, UnitKind::default(), &mut body, &mut pose);
        assert_eq!(outcome.destroyed, Some(DestroyReason::RestingOnGround));
    }

    #[test]
    fn test_collision_with_immobile_nukes_velocity() {
        let (profile, mut body, pose) = body_and_pose();
        body.vel = Vec3::new(3.0, 0.0, 0.0);
        let other = CollisionOther {
            entity: Entity::from_raw(99),
            immobile: true,
            center: pose.position + Vec3::new(6.0, 0.0, 0.0),
            radius: 4.0,
        };
        body.on_collide(0, &pose, &profile, false, &other);
        assert_eq!(body.vel, Vec3::ZERO);
        assert!(body.accel.x < 0.0, "pushed back out");
        assert_eq!(body.last_collidee, Some(other.entity));
    }

    #[test]
    fn test_collision_ignored_for_ignore_target() {
        let (profile, mut body, pose) = body_and_pose();
        let target = Entity::from_raw(7);
        body.ignore_collisions_with = Some(target);
        body.vel = Vec3::new(3.0, 0.0, 0.0);
        let other = CollisionOther {
            entity: target,
            immobile: true,
            center: pose.position + Vec3::new(1.0, 0.0, 0.0),
            radius: 4.0,
        };
        body.on_collide(0, &pose, &profile, false, &other);
        assert_eq!(body.vel.x, 3.0);
        assert_eq!(body.last_collidee, None);
    }

    #[test]
    fn test_collision_out_of_reach_is_noop() {
        let (profile, mut body, pose) = body_and_pose();
        let other = CollisionOther {
            entity: Entity::from_raw(3),
            immobile: false,
            center: pose.position + Vec3::new(100.0, 0.0, 0.0),
            radius: 4.0,
        };
        body.on_collide(0, &pose, &profile, false, &other);
        assert_eq!(body.accel, Vec3::ZERO);
        assert_eq!(body.last_collidee, None);
    }

    #[test]
    fn test_sleep_state() {
        let terrain = flat_terrain();
        let (profile, mut body, mut pose) = body_and_pose();
        assert!(!body.calc_sleep_state(0, true), "never updated yet");
        step_rigid_body(0, &terrain, &profile, UnitKind::default(), &mut body, &mut pose);
        body.vel = Vec3::ZERO;
        body.previous_overlap = None;
        assert!(body.calc_sleep_state(1, true));
        body.vel.x = 1.0;
        assert!(!body.calc_sleep_state(1, true));
    }

    #[test]
    fn test_forward_speed_signed() {
        let (_, mut body, mut pose) = body_and_pose();
        pose.set_yaw(0.0);
        body.vel = Vec3::new(2.0, 0.0, 0.0);
        assert!(body.forward_speed_2d(&pose) > 0.0);
        body.vel = Vec3::new(-2.0, 0.0, 0.0);
        assert!(body.forward_speed_2d(&pose) < 0.0);
        assert!(body.forward_speed_3d(&pose) < 0.0);
    }

    #[test]
    fn test_held_body_does_not_move() {
        let terrain = flat_terrain();
        let (profile, mut body, mut pose) = body_and_pose();
        body.flags.set(PhysicsFlags::IS_HELD, true);
        body.vel = Vec3::new(5.0, 0.0, 0.0);
        let p0 = pose.position;
        step_rigid_body(0, &terrain, &profile, UnitKind::default(), &mut body, &mut pose);
        assert_eq!(pose.position, p0);
    }

    #[test]
    fn test_overlap_rotation() {
        let terrain = flat_terrain();
        let (profile, mut body, mut pose) = body_and_pose();
        let e = Entity::from_raw(12);
        body.add_overlap(e);
        assert!(body.is_currently_overlapped(e));
        step_rigid_body(0, &terrain, &profile, UnitKind::default(), &mut body, &mut pose);
        assert!(!body.is_currently_overlapped(e));
        assert!(body.was_previously_overlapped(e));
    }
}

//! A locomotor drives one unit: it turns template tuning plus per-instance
//! caps into turn commands and motive forces, and owns the braking state
//! machine that brings a unit to rest exactly on its goal.
//!
//! Per-appearance movement styles live in [`crate::steering`]; this module is
//! the shared pipeline around them.

use std::f32::consts::PI;
use std::sync::Arc;

use bevy::prelude::*;
use bitcode::{Decode, Encode};
use rand::Rng;

use crate::config::{
    seconds_to_frames, BIGNUM, DONUT_TIME_DELAY_SECONDS, GRAVITY, LOGIC_FRAMES_PER_SECOND,
    PATHFIND_CELL_SIZE,
};
use crate::physics::{PhysicsFlags, PhysicsProfile, RigidBody, Turning};
use crate::pose::{angle_diff, Pose};
use crate::snapshot::SnapshotError;
use crate::steering::strategy_for;
use crate::surfaces::SurfaceMask;
use crate::template::{LocomotorAppearance, LocomotorTemplate, ZAxisBehavior};
use crate::terrain::TerrainMap;
use crate::unit::{BodyDamageState, UnitKind};
use crate::SimRng;

/// Minimum per-tick travel used by the braking arrival snap, so a unit that
/// has braked to a crawl still reaches its goal.
pub const MIN_ARRIVAL_VEL: f32 = PATHFIND_CELL_SIZE / LOGIC_FRAMES_PER_SECOND;

/// Turn steps smaller than this report `Turning::None`.
const TURN_EPSILON: f32 = 1e-5;
/// Pivot-offset rotation twitch guard, world units.
const PIVOT_TWITCH: f32 = 0.1;

/// Per-locomotor behavior flags.
///
/// Bit positions are part of the save format; never renumber, only append.
#[derive(Clone, Copy, Default, PartialEq, Eq, Debug)]
pub struct LocoFlags(pub u32);

impl LocoFlags {
    pub const IS_BRAKING: u32 = 1 << 0;
    pub const ALLOW_INVALID_POSITION: u32 = 1 << 1;
    pub const MAINTAIN_POS_IS_VALID: u32 = 1 << 2;
    pub const PRECISE_Z_POS: u32 = 1 << 3;
    pub const NO_SLOW_DOWN_AS_APPROACHING_DEST: u32 = 1 << 4;
    pub const OVER_WATER: u32 = 1 << 5;
    pub const ULTRA_ACCURATE: u32 = 1 << 6;
    pub const MOVING_BACKWARDS: u32 = 1 << 7;
    pub const DOING_THREE_POINT_TURN: u32 = 1 << 8;
    pub const CLIMBING: u32 = 1 << 9;
    pub const IS_CLOSE_ENOUGH_DIST_3D: u32 = 1 << 10;
    pub const OFFSET_INCREASING: u32 = 1 << 11;

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

/// Everything one steering tick may read or write besides the locomotor
/// itself. Borrowed fresh each tick by the driver system.
pub struct SteerContext<'a> {
    pub frame: u64,
    pub pose: &'a mut Pose,
    pub body: &'a mut RigidBody,
    pub profile: &'a PhysicsProfile,
    pub kind: UnitKind,
    pub damage: BodyDamageState,
    pub terrain: &'a TerrainMap,
    /// Footprint major radius, for pivot and three-point-turn geometry.
    pub major_radius: f32,
}

/// Distance needed to brake from `current_speed` down to `desired_speed`,
/// with a 5% safety margin.
pub fn calc_slow_down_dist(current_speed: f32, desired_speed: f32, braking: f32) -> f32 {
    let dv = current_speed - desired_speed;
    if dv <= 0.0 {
        return 0.0;
    }
    if braking <= 0.0 {
        return BIGNUM;
    }
    0.5 * dv * dv / braking * 1.05
}

// ---------------------------------------------------------------------------
// Locomotor
// ---------------------------------------------------------------------------

pub struct Locomotor {
    pub template: Arc<LocomotorTemplate>,
    pub flags: LocoFlags,

    // Instance caps, applied on top of the template limits.
    max_lift_cap: f32,
    max_speed_cap: f32,
    max_accel_cap: f32,
    max_braking_cap: f32,
    max_turn_rate_cap: f32,

    pub close_enough_dist: f32,
    pub braking_factor: f32,
    pub preferred_height: f32,
    pub preferred_height_damping: f32,

    /// Frame after which the anti-loiter timer may force braking.
    pub donut_timer: u64,
    /// Hold position cached by `maintain_current_position`.
    pub maintain_pos: Vec3,

    // Wander oscillation state.
    pub angle_offset: f32,
    pub offset_increment: f32,
}

impl Locomotor {
    pub fn new(template: Arc<LocomotorTemplate>, rng: &mut SimRng, frame: u64) -> Self {
        let mut flags = LocoFlags::default();
        flags.set(
            LocoFlags::IS_CLOSE_ENOUGH_DIST_3D,
            template.close_enough_dist_3d,
        );
        flags.set(LocoFlags::OFFSET_INCREASING, rng.0.gen_bool(0.5));
        let angle_offset = rng.0.gen_range(-PI / 6.0..PI / 6.0);
        let offset_increment =
            (PI / 40.0) * rng.0.gen_range(0.8..1.2) / template.wander_length_factor.max(0.01);
        Self {
            close_enough_dist: template.close_enough_dist,
            preferred_height: template.preferred_height,
            preferred_height_damping: template.preferred_height_damping,
            braking_factor: 1.0,
            max_lift_cap: BIGNUM,
            max_speed_cap: BIGNUM,
            max_accel_cap: BIGNUM,
            max_braking_cap: BIGNUM,
            max_turn_rate_cap: BIGNUM,
            donut_timer: frame + seconds_to_frames(DONUT_TIME_DELAY_SECONDS),
            maintain_pos: Vec3::ZERO,
            angle_offset,
            offset_increment,
            flags,
            template,
        }
    }

    pub fn name(&self) -> &str {
        &self.template.name
    }

    pub fn appearance(&self) -> LocomotorAppearance {
        self.template.appearance
    }

    pub fn surfaces(&self) -> SurfaceMask {
        self.template.surfaces
    }

    // -- condition-dependent limits -----------------------------------------

    pub fn max_speed(&self, damage: BodyDamageState) -> f32 {
        let t = if damage.uses_damaged_tuning() {
            self.template.max_speed_damaged
        } else {
            self.template.max_speed
        };
        t.min(self.max_speed_cap)
    }

    pub fn min_speed(&self) -> f32 {
        self.template.min_speed
    }

    pub fn max_turn_rate(&self, damage: BodyDamageState) -> f32 {
        let t = if damage.uses_damaged_tuning() {
            self.template.max_turn_rate_damaged
        } else {
            self.template.max_turn_rate
        };
        let rate = t.min(self.max_turn_rate_cap);
        // Ultra-accurate movement (scripted sequences) turns twice as fast.
        if self.flags.has(LocoFlags::ULTRA_ACCURATE) {
            rate * 2.0
        } else {
            rate
        }
    }

    pub fn max_acceleration(&self, damage: BodyDamageState) -> f32 {
        let t = if damage.uses_damaged_tuning() {
            self.template.acceleration_damaged
        } else {
            self.template.acceleration
        };
        t.min(self.max_accel_cap)
    }

    pub fn max_lift(&self, damage: BodyDamageState) -> f32 {
        let t = if damage.uses_damaged_tuning() {
            self.template.lift_damaged
        } else {
            self.template.lift
        };
        t.min(self.max_lift_cap)
    }

    pub fn max_braking(&self, _damage: BodyDamageState) -> f32 {
        self.template.braking.min(self.max_braking_cap)
    }

    pub fn set_max_speed_cap(&mut self, cap: f32) {
        self.max_speed_cap = cap;
    }

    pub fn set_max_turn_rate_cap(&mut self, cap: f32) {
        self.max_turn_rate_cap = cap;
    }

    pub fn set_max_acceleration_cap(&mut self, cap: f32) {
        self.max_accel_cap = cap;
    }

    pub fn set_max_braking_cap(&mut self, cap: f32) {
        self.max_braking_cap = cap;
    }

    pub fn set_max_lift_cap(&mut self, cap: f32) {
        self.max_lift_cap = cap;
    }

    /// Tightest turn circle achievable at the minimum sustainable turn speed.
    pub fn min_turn_radius(&self, damage: BodyDamageState) -> f32 {
        let speed = self.template.min_turn_speed.min(self.max_speed(damage));
        let rate = self.max_turn_rate(damage);
        if rate > 0.0 {
            speed / rate
        } else {
            0.0
        }
    }

    pub fn is_braking(&self) -> bool {
        self.flags.has(LocoFlags::IS_BRAKING)
    }

    /// Push template-level physics options onto the rigid body.
    pub fn apply_physics_options(&self, body: &mut RigidBody) {
        body.flags.set(
            PhysicsFlags::APPLY_FRICTION2D_WHEN_AIRBORNE,
            self.template.apply_2d_friction_when_airborne,
        );
        body.flags
            .set(PhysicsFlags::STICK_TO_GROUND, self.template.stick_to_ground);
        body.extra_friction = self.template.extra_2d_friction;
    }

    /// Called when a new movement order begins.
    pub fn start_move(&mut self, frame: u64) {
        self.donut_timer = frame + seconds_to_frames(DONUT_TIME_DELAY_SECONDS);
        self.flags.set(LocoFlags::MAINTAIN_POS_IS_VALID, false);
    }

    // -----------------------------------------------------------------------
    // Main steering entry points
    // -----------------------------------------------------------------------

    /// Steer towards `goal` for one tick. `on_path_dist` is the remaining
    /// path length to the final destination (straight-line distance for a
    /// single-segment move); `blocked` marks a unit ahead on the path.
    pub fn move_towards_position(
        &mut self,
        ctx: &mut SteerContext,
        goal: Vec3,
        on_path_dist: f32,
        desired_speed: f32,
        blocked: bool,
    ) {
        let max_speed = self.max_speed(ctx.damage);
        let desired_speed = desired_speed.clamp(self.min_speed(), max_speed.max(self.min_speed()));
        let mut on_path_dist = on_path_dist;

        // Braking disengage hysteresis: only once the remaining path is
        // comfortably longer than the stopping distance.
        if self.flags.has(LocoFlags::IS_BRAKING) {
            let slow_down = calc_slow_down_dist(max_speed, 0.0, self.max_braking(ctx.damage));
            if on_path_dist > PATHFIND_CELL_SIZE && on_path_dist > slow_down {
                self.flags.set(LocoFlags::IS_BRAKING, false);
            }
        }

        let airborne_surfaces = self.template.surfaces.intersects(SurfaceMask::AIR);
        if !airborne_surfaces
            && !self.flags.has(LocoFlags::ALLOW_INVALID_POSITION)
            && !ctx
                .terrain
                .valid_movement_terrain(self.template.surfaces, ctx.pose.position)
            && self.fix_invalid_position(ctx)
        {
            return;
        }

        // A stale path distance shorter than the crow-flies distance means
        // the unit was pushed off its path; trust geometry instead.
        let dist_2d = (goal - ctx.pose.position).truncate().length();
        if dist_2d > on_path_dist {
            if dist_2d > 2.0 * on_path_dist && !ctx.kind.has(UnitKind::PROJECTILE) {
                self.flags.set(LocoFlags::IS_BRAKING, false);
            }
            on_path_dist = dist_2d;
        }

        let height_above = ctx.pose.position.z
            - ctx
                .terrain
                .ground_height(ctx.pose.position.x, ctx.pose.position.y);
        let airborne = height_above > -9.0 * GRAVITY;

        // Mark the body driven even when no net force results this tick.
        let facing = ctx.pose.direction_2d();
        ctx.body.apply_motive_force(ctx.frame, facing, Vec3::ZERO);

        if blocked {
            let clear = desired_speed > ctx.body.velocity_magnitude()
                || (airborne && airborne_surfaces);
            if !clear {
                ctx.body.scrub_velocity_2d(desired_speed);
                if self.template.wander_width_factor == 0.0 {
                    let turning = self.rotate_towards_position(ctx, goal);
                    ctx.body.turning = turning;
                }
                self.handle_behavior_z(ctx, goal);
                return;
            }
        }

        if self.template.appearance == LocomotorAppearance::Wings {
            // Wings can never slow below stall speed, so braking is a lie.
            self.flags.set(LocoFlags::IS_BRAKING, false);
        }

        if airborne && !airborne_surfaces && !self.template.allow_airborne_motive_force {
            // Ballistic: no steering authority until ground contact.
            self.handle_behavior_z(ctx, goal);
            self.arrival_snap(ctx, goal);
            return;
        }

        strategy_for(self.template.appearance).move_towards(
            self,
            ctx,
            goal,
            on_path_dist,
            desired_speed,
        );

        self.handle_behavior_z(ctx, goal);
        self.arrival_snap(ctx, goal);
    }

    /// Rotate towards an absolute heading while holding cruise speed. Used by
    /// wander movement and by circling aircraft.
    pub fn move_towards_angle(&mut self, ctx: &mut SteerContext, angle: f32) {
        let turning = self.rotate_towards_angle(ctx, angle);
        ctx.body.turning = turning;
        self.push_to_speed(ctx, self.max_speed(ctx.damage));
    }

    /// Hold the current position. Returns true when the locomotor must keep
    /// being called every tick to stay put (hovering, circling).
    pub fn maintain_current_position(&mut self, ctx: &mut SteerContext) -> bool {
        if !self.flags.has(LocoFlags::MAINTAIN_POS_IS_VALID) {
            self.maintain_pos = ctx.pose.position;
            self.flags.set(LocoFlags::MAINTAIN_POS_IS_VALID, true);
        }
        self.donut_timer = ctx.frame + seconds_to_frames(DONUT_TIME_DELAY_SECONDS);
        self.flags.set(LocoFlags::IS_BRAKING, false);

        let mut requires_constant_calling =
            strategy_for(self.template.appearance).maintain(self, ctx);
        if self.handle_behavior_z(ctx, self.maintain_pos) {
            requires_constant_calling = true;
        }
        requires_constant_calling
    }

    // -----------------------------------------------------------------------
    // Shared helpers for strategies
    // -----------------------------------------------------------------------

    /// Accelerate (or brake) along the facing direction towards `goal_speed`,
    /// respecting this locomotor's acceleration and braking limits.
    pub(crate) fn push_to_speed(&self, ctx: &mut SteerContext, goal_speed: f32) {
        let actual = ctx.body.forward_speed_2d(ctx.pose);
        let delta = goal_speed - actual;
        // Gaining speed in the goal direction uses engine power; anything
        // else (slowing, or fighting momentum) uses the brakes.
        let speeding_up = goal_speed != 0.0 && delta.signum() == goal_speed.signum();
        let limit = if speeding_up {
            self.max_acceleration(ctx.damage)
        } else {
            self.max_braking(ctx.damage) * self.braking_factor
        };
        let accel = limit.abs().min(delta.abs()) * delta.signum();
        let dir = ctx.pose.direction_2d();
        let force = (dir * accel * ctx.body.get_mass()).extend(0.0);
        ctx.body.apply_motive_force(ctx.frame, dir, force);
    }

    /// Turn towards `goal`, pivoting about the template's pivot offset when
    /// configured (and not braking).
    pub(crate) fn rotate_towards_position(&self, ctx: &mut SteerContext, goal: Vec3) -> Turning {
        let pivot = if self.flags.has(LocoFlags::IS_BRAKING) {
            0.0
        } else {
            self.template.turn_pivot_offset
        };
        let desired = if pivot != 0.0 {
            let dir = ctx.pose.direction_2d();
            let turn_pos = ctx.pose.position + (dir * pivot * ctx.major_radius).extend(0.0);
            let d = goal - turn_pos;
            if d.x.abs() < PIVOT_TWITCH && d.y.abs() < PIVOT_TWITCH {
                return Turning::None;
            }
            d.y.atan2(d.x)
        } else {
            ctx.pose.angle_towards(goal)
        };
        self.rotate_towards_angle(ctx, desired)
    }

    /// Turn towards an absolute heading, clamped to the max turn rate.
    pub(crate) fn rotate_towards_angle(&self, ctx: &mut SteerContext, desired: f32) -> Turning {
        let max_rate = self.max_turn_rate(ctx.damage);
        let diff = angle_diff(desired, ctx.pose.yaw);
        let step = diff.clamp(-max_rate, max_rate);
        ctx.pose.set_yaw(ctx.pose.yaw + step);
        if step > TURN_EPSILON {
            Turning::Positive
        } else if step < -TURN_EPSILON {
            Turning::Negative
        } else {
            Turning::None
        }
    }

    /// Nudge a unit standing on illegal terrain back towards legal cells.
    /// Returns true when a correction was applied (the caller should skip
    /// normal steering this tick). Dozers carve their own terrain and are
    /// never corrected.
    pub(crate) fn fix_invalid_position(&mut self, ctx: &mut SteerContext) -> bool {
        if ctx.kind.has(UnitKind::DOZER) {
            return false;
        }
        let cell = PATHFIND_CELL_SIZE;
        let pos = ctx.pose.position;
        let mut vote = Vec2::ZERO;
        for (ox, oy) in [
            (-1.0, -1.0),
            (0.0, -1.0),
            (1.0, -1.0),
            (-1.0, 0.0),
            (1.0, 0.0),
            (-1.0, 1.0),
            (0.0, 1.0),
            (1.0, 1.0),
        ] {
            let probe = pos + Vec3::new(ox * cell, oy * cell, 0.0);
            if !ctx.terrain.valid_movement_terrain(self.template.surfaces, probe) {
                vote -= Vec2::new(ox, oy);
            }
        }
        if vote == Vec2::ZERO {
            return false;
        }
        let toward_legal = vote.normalize();
        let along = ctx.body.vel.truncate().dot(toward_legal);
        if along > 0.25 {
            // Already escaping fast enough.
            return false;
        }
        let mass = ctx.body.get_mass();
        let mut force = vote * mass / 5.0;
        if along < 0.0 {
            force += toward_legal * (-along).sqrt() * mass;
        }
        let facing = ctx.pose.direction_2d();
        ctx.body.apply_motive_force(ctx.frame, facing, force.extend(0.0));
        true
    }

    // -----------------------------------------------------------------------
    // Vertical behavior
    // -----------------------------------------------------------------------

    /// Apply this locomotor's Z-axis policy. Returns true when the policy
    /// needs the locomotor called every tick even at rest.
    pub fn handle_behavior_z(&mut self, ctx: &mut SteerContext, goal: Vec3) -> bool {
        let pos = ctx.pose.position;
        match self.template.z_axis_behavior {
            ZAxisBehavior::NoZMotiveForce => return false,
            ZAxisBehavior::SeaLevel => {
                ctx.pose.position.z = ctx.terrain.layer_height(pos.x, pos.y);
                ctx.body.vel.z = 0.0;
            }
            ZAxisBehavior::FixedSurfaceRelativeHeight => {
                ctx.pose.position.z =
                    ctx.terrain.ground_height(pos.x, pos.y) + self.preferred_height;
                ctx.body.vel.z = 0.0;
            }
            ZAxisBehavior::FixedAbsoluteHeight => {
                ctx.pose.position.z = self.preferred_height;
                ctx.body.vel.z = 0.0;
            }
            ZAxisBehavior::SurfaceRelativeHeight
            | ZAxisBehavior::SmoothRelativeHeight
            | ZAxisBehavior::AbsoluteHeight
            | ZAxisBehavior::RelativeToGroundAndBuildings => {
                let surface_ht = match self.template.z_axis_behavior {
                    ZAxisBehavior::AbsoluteHeight => 0.0,
                    ZAxisBehavior::RelativeToGroundAndBuildings => {
                        ctx.terrain.ground_or_structure_height(pos.x, pos.y)
                    }
                    _ => ctx.terrain.ground_height(pos.x, pos.y),
                };
                if self.preferred_height != 0.0 || self.flags.has(LocoFlags::PRECISE_Z_POS) {
                    let target_z = if self.flags.has(LocoFlags::PRECISE_Z_POS) {
                        goal.z
                    } else {
                        surface_ht + self.preferred_height
                    };
                    let delta = (target_z - pos.z) * self.preferred_height_damping;
                    let lift = self.calc_lift_to_use(ctx, pos.z, pos.z + delta);
                    if lift != 0.0 {
                        let force = Vec3::new(0.0, 0.0, lift * ctx.body.get_mass());
                        let facing = ctx.pose.direction_2d();
                        ctx.body.apply_motive_force(ctx.frame, facing, force);
                    }
                }
            }
        }
        true
    }

    /// Vertical acceleration control towards `target_z`, bounded by the lift
    /// the chassis can generate.
    pub(crate) fn calc_lift_to_use(
        &self,
        ctx: &SteerContext,
        cur_z: f32,
        target_z: f32,
    ) -> f32 {
        let max_gross = self.max_lift(ctx.damage);
        let max_net = (max_gross + GRAVITY).max(0.0);
        let ultra = self.flags.has(LocoFlags::ULTRA_ACCURATE);
        let vz = ctx.body.vel.z;
        let delta_z = target_z - cur_z;

        let braking_accel = if ultra {
            if vz < 0.0 {
                2.0 * max_net
            } else {
                -2.0 * max_net
            }
        } else if vz < 0.0 {
            max_net
        } else {
            GRAVITY
        };
        // Longstanding formula: the 0.5 factor is missing, so vertical
        // braking starts early. Tuned content depends on it.
        let brake_dist = if braking_accel != 0.0 {
            vz * vz / braking_accel.abs()
        } else {
            BIGNUM
        };

        let desired_accel = if brake_dist > delta_z.abs() {
            braking_accel
        } else if vz.abs() > self.template.speed_limit_z {
            self.template.speed_limit_z * vz.signum() - vz
        } else {
            2.0 * (delta_z - vz)
        };

        let lift = desired_accel - GRAVITY;
        if ultra {
            lift.clamp(-max_gross, 3.0 * max_gross)
        } else {
            lift.clamp(0.0, max_gross)
        }
    }

    // -----------------------------------------------------------------------
    // Arrival
    // -----------------------------------------------------------------------

    /// While braking, physics stops integrating horizontal motion and this
    /// snap walks the unit onto its goal at its current speed, guaranteeing
    /// exact arrival. Projectiles snap in 3D and never leave braking; ground
    /// units snap in 2D and clear braking at the goal.
    fn arrival_snap(&mut self, ctx: &mut SteerContext, goal: Vec3) {
        if !self.flags.has(LocoFlags::IS_BRAKING) {
            return;
        }
        let step = ctx.body.velocity_magnitude().max(MIN_ARRIVAL_VEL);
        if ctx.kind.has(UnitKind::PROJECTILE) {
            let delta = goal - ctx.pose.position;
            let dist = delta.length();
            if dist <= step {
                ctx.pose.position = goal;
            } else {
                ctx.pose.position += delta * (step / dist);
            }
        } else {
            let delta = (goal - ctx.pose.position).truncate();
            let dist = delta.length();
            if dist <= step {
                ctx.pose.position.x = goal.x;
                ctx.pose.position.y = goal.y;
                ctx.body.scrub_velocity_2d(0.0);
                self.flags.set(LocoFlags::IS_BRAKING, false);
            } else {
                let move_2d = delta * (step / dist);
                ctx.pose.position.x += move_2d.x;
                ctx.pose.position.y += move_2d.y;
            }
        }
    }

    // -----------------------------------------------------------------------
    // Snapshots
    // -----------------------------------------------------------------------

    pub fn to_snapshot(&self) -> LocomotorSnapshot {
        LocomotorSnapshot {
            version: LocomotorSnapshot::VERSION,
            donut_timer: self.donut_timer,
            maintain_pos: self.maintain_pos.to_array(),
            braking_factor: self.braking_factor,
            max_lift: self.max_lift_cap,
            max_speed: self.max_speed_cap,
            max_accel: self.max_accel_cap,
            max_braking: self.max_braking_cap,
            max_turn_rate: self.max_turn_rate_cap,
            close_enough_dist: self.close_enough_dist,
            flags: self.flags.0,
            preferred_height: self.preferred_height,
            preferred_height_damping: self.preferred_height_damping,
            angle_offset: self.angle_offset,
            offset_increment: self.offset_increment,
        }
    }

    pub fn apply_snapshot(&mut self, snap: &LocomotorSnapshot) -> Result<(), SnapshotError> {
        if snap.version != LocomotorSnapshot::VERSION {
            return Err(SnapshotError::VersionMismatch {
                found: snap.version as u32,
                expected: LocomotorSnapshot::VERSION as u32,
            });
        }
        self.donut_timer = snap.donut_timer;
        self.maintain_pos = Vec3::from_array(snap.maintain_pos);
        self.braking_factor = snap.braking_factor;
        self.max_lift_cap = snap.max_lift;
        self.max_speed_cap = snap.max_speed;
        self.max_accel_cap = snap.max_accel;
        self.max_braking_cap = snap.max_braking;
        self.max_turn_rate_cap = snap.max_turn_rate;
        self.close_enough_dist = snap.close_enough_dist;
        self.flags = LocoFlags(snap.flags);
        self.preferred_height = snap.preferred_height;
        self.preferred_height_damping = snap.preferred_height_damping;
        self.angle_offset = snap.angle_offset;
        self.offset_increment = snap.offset_increment;
        Ok(())
    }
}

/// Serialized per-locomotor state. Field order is the wire format.
#[derive(Encode, Decode, Clone, Debug, PartialEq)]
pub struct LocomotorSnapshot {
    pub version: u8,
    pub donut_timer: u64,
    pub maintain_pos: [f32; 3],
    pub braking_factor: f32,
    pub max_lift: f32,
    pub max_speed: f32,
    pub max_accel: f32,
    pub max_braking: f32,
    pub max_turn_rate: f32,
    pub close_enough_dist: f32,
    pub flags: u32,
    pub preferred_height: f32,
    pub preferred_height_damping: f32,
    pub angle_offset: f32,
    pub offset_increment: f32,
}

impl LocomotorSnapshot {
    pub const VERSION: u8 = 2;
}

// ---------------------------------------------------------------------------
// Test support
// ---------------------------------------------------------------------------


// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

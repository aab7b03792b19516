//! Thrust-propelled flight (missiles, jets).
//!
//! A thrust chassis has no separate lift: one engine vector, swiveled within
//! a cone around the nose, does all the work. Steering solves for the
//! velocity the engine must produce to intercept the goal, swivels the
//! thrust vector towards it, and lets velocity-proportional damping settle
//! the craft at its top speed.

use bevy::prelude::*;

use crate::config::GRAVITY;
use crate::locomotor::{LocoFlags, Locomotor, SteerContext};
use crate::pose::{angle_diff, rotate_towards_3d};
use crate::steering::SteeringStrategy;

pub struct ThrustSteering;

impl SteeringStrategy for ThrustSteering {
    fn move_towards(
        &self,
        loco: &mut Locomotor,
        ctx: &mut SteerContext,
        goal: Vec3,
        _on_path_dist: f32,
        desired_speed: f32,
    ) {
        let max_accel = loco.max_acceleration(ctx.damage);
        let max_speed = loco.max_speed(ctx.damage);
        let pos = ctx.pose.position;

        // Cruise altitude is folded into the goal itself; there is no lift
        // channel to correct height separately.
        let mut goal = goal;
        if !loco.flags.has(LocoFlags::PRECISE_Z_POS) && loco.preferred_height != 0.0 {
            let target_z =
                ctx.terrain.ground_height(pos.x, pos.y) + loco.preferred_height;
            goal.z = pos.z + (target_z - pos.z) * loco.preferred_height_damping;
        }

        let to_goal = goal - pos;
        let dist = to_goal.length();
        if dist < 1e-6 {
            return;
        }

        let goal_dir = intercept_dir(ctx.body.vel, to_goal, dist, desired_speed);
        let thrust_dir = rotate_towards_3d(
            ctx.pose.direction_3d(),
            goal_dir,
            loco.template.max_thrust_angle,
        );
        let thrust_dir = if thrust_dir.length_squared() > 1e-12 {
            thrust_dir.normalize()
        } else {
            goal_dir
        };

        // Damping proportional to velocity caps the terminal speed at
        // max_accel / damping = max_speed.
        let damping = if max_speed > 0.0 {
            (max_accel / max_speed).clamp(0.0, 1.0)
        } else {
            1.0
        };
        let accel = thrust_dir * max_accel - ctx.body.vel * damping;
        let force = accel * ctx.body.get_mass();
        let facing = ctx.pose.direction_2d();
        ctx.body.apply_motive_force(ctx.frame, facing, force);

        orient_to_flight_path(loco, ctx, goal);
        apply_wobble(loco, ctx);
    }

    fn maintain(&self, loco: &mut Locomotor, ctx: &mut SteerContext) -> bool {
        // Thrust craft cannot hover; they keep flying at the hold point and
        // the intercept solver orbits them around it.
        let hold = loco.maintain_pos;
        let dist = (hold - ctx.pose.position).length();
        let speed = loco.min_speed();
        loco.move_towards_position(ctx, hold, dist, speed, false);
        true
    }
}

/// Direction the engine velocity budget should point to intercept the goal.
///
/// Finds the flight time at which closing the remaining distance needs a
/// velocity change of exactly `speed`, then aims along that change. Gravity
/// is folded into the current velocity since the engine must cancel it too.
fn intercept_dir(vel: Vec3, to_goal: Vec3, dist: f32, speed: f32) -> Vec3 {
    let aim_at_goal = to_goal / dist;
    let v = vel + Vec3::new(0.0, 0.0, GRAVITY);
    let v_mag = v.length();

    let denom = v_mag * v_mag - speed * speed;
    if denom.abs() < 1e-6 {
        return aim_at_goal;
    }
    let t1 = dist * (v_mag + speed) / denom;
    let t2 = dist * (v_mag - speed) / denom;
    let t = match (t1 > 0.0, t2 > 0.0) {
        (true, true) => t1.min(t2),
        (true, false) => t1,
        (false, true) => t2,
        (false, false) => return aim_at_goal,
    };

    let needed = to_goal / t - v;
    if needed.length_squared() < 1e-12 {
        aim_at_goal
    } else {
        needed.normalize()
    }
}

/// Point the nose along the flight path. While braking onto a target the
/// craft snaps towards the goal at triple rate instead, so terminal dives
/// stay on target.
fn orient_to_flight_path(loco: &mut Locomotor, ctx: &mut SteerContext, goal: Vec3) {
    let max_rate = loco.max_turn_rate(ctx.damage);
    let vel_2d = ctx.body.vel.truncate();

    if loco.is_braking() {
        let desired = ctx.pose.angle_towards(goal);
        let step = angle_diff(desired, ctx.pose.yaw).clamp(-3.0 * max_rate, 3.0 * max_rate);
        ctx.pose.set_yaw(ctx.pose.yaw + step);
    } else if vel_2d.length_squared() > 1e-6 {
        let heading = vel_2d.y.atan2(vel_2d.x);
        ctx.body.turning = loco.rotate_towards_angle(ctx, heading);
    }

    let speed_2d = vel_2d.length();
    if speed_2d > 1e-3 || ctx.body.vel.z.abs() > 1e-3 {
        let desired_pitch = ctx.body.vel.z.atan2(speed_2d);
        let step = (desired_pitch - ctx.pose.pitch).clamp(-max_rate, max_rate);
        ctx.pose.pitch += step;
    }
}

/// Cosmetic engine wobble, oscillating between the template's wobble bounds.
fn apply_wobble(loco: &mut Locomotor, ctx: &mut SteerContext) {
    let rate = loco.template.thrust_wobble_rate;
    if rate <= 0.0 {
        if loco.template.thrust_roll != 0.0 {
            ctx.pose.roll = loco.template.thrust_roll;
        }
        return;
    }
    if loco.flags.has(LocoFlags::OFFSET_INCREASING) {
        loco.angle_offset += rate;
        if loco.angle_offset > loco.template.max_thrust_wobble {
            loco.flags.set(LocoFlags::OFFSET_INCREASING, false);
        }
    } else {
        loco.angle_offset -= rate;
        if loco.angle_offset < loco.template.min_thrust_wobble {
            loco.flags.set(LocoFlags::OFFSET_INCREASING, true);
        }
    }
    ctx.pose.pitch += loco.angle_offset;
    ctx.pose.roll = loco.template.thrust_roll + loco.angle_offset;
}

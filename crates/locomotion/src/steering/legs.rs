//! Infantry locomotion, and the cliff-climbing variant layered on top of it.
//!
//! Legged units stop crisply instead of braking, and optionally wander: the
//! heading oscillates around the true goal direction so a crowd of infantry
//! does not march in lockstep along identical lines.

use std::f32::consts::PI;

use bevy::prelude::*;

use crate::config::PATHFIND_CELL_SIZE;
use crate::locomotor::{calc_slow_down_dist, LocoFlags, Locomotor, SteerContext};
use crate::pose::angle_diff;
use crate::steering::{ground_maintain, SteeringStrategy};

/// Forward ground-probe length for climbers, world units.
const CLIMB_PROBE: f32 = 1.0;
/// A probe drop beyond this means the climber is over an edge.
const CLIMB_DROP: f32 = 0.1;
/// Climbing disengages once the remaining height difference is this small.
const CLIMB_DONE: f32 = 1.0;

pub struct LegSteering;

impl SteeringStrategy for LegSteering {
    fn move_towards(
        &self,
        loco: &mut Locomotor,
        ctx: &mut SteerContext,
        goal: Vec3,
        on_path_dist: f32,
        desired_speed: f32,
    ) {
        legs_move(loco, ctx, goal, on_path_dist, desired_speed);
    }

    fn maintain(&self, loco: &mut Locomotor, ctx: &mut SteerContext) -> bool {
        ground_maintain(loco, ctx)
    }
}

fn legs_move(
    loco: &mut Locomotor,
    ctx: &mut SteerContext,
    goal: Vec3,
    on_path_dist: f32,
    desired_speed: f32,
) {
    if loco.template.downhill_only && ctx.pose.position.z < goal.z {
        // Gravity-powered movement cannot go up; wait for a downhill path.
        return;
    }

    if loco.template.wander_width_factor > 0.0 {
        wander(loco, ctx, goal, desired_speed);
        return;
    }

    let turning = loco.rotate_towards_position(ctx, goal);
    ctx.body.turning = turning;

    let rel_angle = angle_diff(ctx.pose.angle_towards(goal), ctx.pose.yaw);
    let angle_coeff = (rel_angle.abs() / (PI / 4.0)).min(1.0);
    let mut goal_speed = (1.0 - angle_coeff) * desired_speed;

    let actual_speed = ctx.body.forward_speed_2d(ctx.pose);
    let slow_down = calc_slow_down_dist(
        actual_speed,
        loco.min_speed(),
        loco.max_braking(ctx.damage),
    );
    if on_path_dist < slow_down && !loco.flags.has(LocoFlags::NO_SLOW_DOWN_AS_APPROACHING_DEST) {
        goal_speed = goal_speed.min(loco.min_speed());
    }

    loco.push_to_speed(ctx, goal_speed);
}

/// Oscillate the heading offset and walk along it at full tilt.
fn wander(loco: &mut Locomotor, ctx: &mut SteerContext, goal: Vec3, desired_speed: f32) {
    let limit = (PI / 8.0) * loco.template.wander_width_factor;
    let step = loco.offset_increment * desired_speed;
    if loco.flags.has(LocoFlags::OFFSET_INCREASING) {
        loco.angle_offset += step;
        if loco.angle_offset > limit {
            loco.flags.set(LocoFlags::OFFSET_INCREASING, false);
        }
    } else {
        loco.angle_offset -= step;
        if loco.angle_offset < -limit {
            loco.flags.set(LocoFlags::OFFSET_INCREASING, true);
        }
    }
    let aim = ctx.pose.angle_towards(goal) + loco.angle_offset;
    loco.move_towards_angle(ctx, aim);
}

// ---------------------------------------------------------------------------
// Climber
// ---------------------------------------------------------------------------

pub struct ClimberSteering;

impl SteeringStrategy for ClimberSteering {
    fn move_towards(
        &self,
        loco: &mut Locomotor,
        ctx: &mut SteerContext,
        goal: Vec3,
        on_path_dist: f32,
        desired_speed: f32,
    ) {
        let dz = goal.z - ctx.pose.position.z;
        if dz * dz > PATHFIND_CELL_SIZE * PATHFIND_CELL_SIZE {
            loco.flags.set(LocoFlags::CLIMBING, true);
        } else if dz.abs() < CLIMB_DONE {
            loco.flags.set(LocoFlags::CLIMBING, false);
        }

        let pos = ctx.pose.position;
        let here = ctx.terrain.ground_height(pos.x, pos.y);
        let ahead_pos = pos + (ctx.pose.direction_2d() * CLIMB_PROBE).extend(0.0);
        let ahead = ctx.terrain.ground_height(ahead_pos.x, ahead_pos.y);

        if here - ahead > CLIMB_DROP {
            // Over an edge nose-first: back off rather than tumble.
            loco.push_to_speed(ctx, -desired_speed);
            return;
        }

        let mut desired_speed = desired_speed;
        if loco.flags.has(LocoFlags::CLIMBING) {
            let slope = (ahead - here) / CLIMB_PROBE;
            desired_speed /= 4.0 * slope.max(1.0);
        }

        legs_move(loco, ctx, goal, on_path_dist, desired_speed);
    }

    fn maintain(&self, loco: &mut Locomotor, ctx: &mut SteerContext) -> bool {
        ground_maintain(loco, ctx)
    }
}

//! Wheeled vehicles: no turning in place, so speed and turn rate are coupled,
//! reversing and three-point turns cover goals behind the vehicle, and an
//! anti-loiter watchdog breaks out of orbiting a goal it keeps missing.

use std::f32::consts::PI;

use bevy::prelude::*;

use crate::config::{
    seconds_to_frames, DONUT_DISTANCE, DONUT_TIME_DELAY_SECONDS, LOGIC_FRAMES_PER_SECOND,
    MAX_BRAKING_FACTOR, PATHFIND_CELL_SIZE,
};
use crate::locomotor::{LocoFlags, Locomotor, SteerContext};
use crate::physics::Turning;
use crate::pose::{angle_diff, normalize_angle};
use crate::steering::{ground_maintain, SteeringStrategy};

/// Misalignment beyond this caps speed to the turn speed.
const TURN_SLOWDOWN_ANGLE: f32 = PI / 20.0;
/// Misalignment beyond this triggers the terrain lookahead.
const LOOKAHEAD_ANGLE: f32 = PI * 15.0 / 180.0;
/// Speeds below this count as standing still for gear changes.
const STANDSTILL: f32 = 1e-3;

pub struct WheelSteering;

impl SteeringStrategy for WheelSteering {
    fn move_towards(
        &self,
        loco: &mut Locomotor,
        ctx: &mut SteerContext,
        goal: Vec3,
        on_path_dist: f32,
        desired_speed: f32,
    ) {
        let damage = ctx.damage;
        let max_speed = loco.max_speed(damage);
        let turn_speed = loco
            .template
            .min_turn_speed
            .min(max_speed)
            .max(max_speed / 4.0);

        let goal_angle = ctx.pose.angle_towards(goal);
        let rel_angle = angle_diff(goal_angle, ctx.pose.yaw);
        let actual_speed = ctx.body.forward_speed_2d(ctx.pose);

        // Gear changes only happen at a standstill.
        if actual_speed.abs() < STANDSTILL {
            if loco.template.can_move_backwards && rel_angle.abs() > PI / 2.0 {
                if !loco.flags.has(LocoFlags::MOVING_BACKWARDS) {
                    loco.flags.set(LocoFlags::MOVING_BACKWARDS, true);
                    // A distant goal is worth swinging the nose around for;
                    // a close one is faster to back straight into.
                    loco.flags.set(
                        LocoFlags::DOING_THREE_POINT_TURN,
                        on_path_dist > 5.0 * ctx.major_radius,
                    );
                }
            } else {
                loco.flags.set(LocoFlags::MOVING_BACKWARDS, false);
                loco.flags.set(LocoFlags::DOING_THREE_POINT_TURN, false);
            }
        }
        if loco.flags.has(LocoFlags::DOING_THREE_POINT_TURN) && rel_angle.abs() < TURN_SLOWDOWN_ANGLE
        {
            // Nose is around; resume normal forward driving.
            loco.flags.set(LocoFlags::MOVING_BACKWARDS, false);
            loco.flags.set(LocoFlags::DOING_THREE_POINT_TURN, false);
        }

        let backing = loco.flags.has(LocoFlags::MOVING_BACKWARDS)
            && !loco.flags.has(LocoFlags::DOING_THREE_POINT_TURN);
        let desired_angle = if backing {
            normalize_angle(goal_angle + PI)
        } else {
            goal_angle
        };
        let rel_eff = angle_diff(desired_angle, ctx.pose.yaw);

        let mut goal_speed = desired_speed;
        if rel_eff.abs() > TURN_SLOWDOWN_ANGLE {
            goal_speed = goal_speed.min(turn_speed);
        }

        // Sharp turns look half a second ahead along the intended heading;
        // if either probe lands on illegal terrain, turn in place instead of
        // driving off a cliff edge.
        if rel_eff.abs() > LOOKAHEAD_ANGLE {
            let travel = actual_speed.abs() * (LOGIC_FRAMES_PER_SECOND / 2.0);
            let ahead = Vec2::new(desired_angle.cos(), desired_angle.sin()) * travel;
            let half = ctx.pose.position + (ahead * 0.5).extend(0.0);
            let full = ctx.pose.position + ahead.extend(0.0);
            let surfaces = loco.template.surfaces;
            if !ctx.terrain.valid_movement_terrain(surfaces, half)
                || !ctx.terrain.valid_movement_terrain(surfaces, full)
            {
                let turning = rotate_with_speed_coupling(loco, ctx, desired_angle, turn_speed);
                ctx.body.turning = turning;
                let facing = ctx.pose.direction_2d();
                ctx.body.apply_motive_force(ctx.frame, facing, Vec3::ZERO);
                return;
            }
        }

        // Anti-loiter watchdog: circling inside donut distance without
        // arriving eventually forces braking so the arrival snap can finish
        // the move.
        if on_path_dist > DONUT_DISTANCE {
            loco.donut_timer = ctx.frame + seconds_to_frames(DONUT_TIME_DELAY_SECONDS);
        } else if ctx.frame > loco.donut_timer {
            loco.flags.set(LocoFlags::IS_BRAKING, true);
        }

        let max_brake = loco.max_braking(damage);
        let abs_speed = actual_speed.abs();
        let slow_down = ((abs_speed / 1.5) * (abs_speed / max_brake.max(1e-6) + 1.0) + abs_speed)
            .max(PATHFIND_CELL_SIZE);
        if on_path_dist < slow_down
            && !loco.flags.has(LocoFlags::NO_SLOW_DOWN_AS_APPROACHING_DEST)
        {
            loco.flags.set(LocoFlags::IS_BRAKING, true);
        }
        if loco.flags.has(LocoFlags::IS_BRAKING) {
            loco.braking_factor = (slow_down / on_path_dist.max(1e-3))
                .powi(2)
                .clamp(1.0, MAX_BRAKING_FACTOR);
            // Scaled braking never shipped for wheels; unity matches the
            // tuning all wheeled content was balanced against.
            loco.braking_factor = 1.0;
            goal_speed = 0.0;
        }

        let turning = rotate_with_speed_coupling(loco, ctx, desired_angle, turn_speed);
        ctx.body.turning = turning;

        let signed_goal = if backing { -goal_speed } else { goal_speed };
        loco.push_to_speed(ctx, signed_goal);
    }

    fn maintain(&self, loco: &mut Locomotor, ctx: &mut SteerContext) -> bool {
        ground_maintain(loco, ctx)
    }
}

/// Wheels only steer as fast as they roll: the usable turn rate scales with
/// speed up to the turn speed.
fn rotate_with_speed_coupling(
    loco: &Locomotor,
    ctx: &mut SteerContext,
    desired_angle: f32,
    turn_speed: f32,
) -> Turning {
    let actual_speed = ctx.body.forward_speed_2d(ctx.pose);
    let coupling = (actual_speed.abs() / turn_speed.max(1e-6)).min(1.0);
    let turn_cap = loco.max_turn_rate(ctx.damage) * coupling;
    let step = angle_diff(desired_angle, ctx.pose.yaw).clamp(-turn_cap, turn_cap);
    ctx.pose.set_yaw(ctx.pose.yaw + step);
    if step > 1e-5 {
        Turning::Positive
    } else if step < -1e-5 {
        Turning::Negative
    } else {
        Turning::None
    }
}

//! Tracked vehicles: turn in place, derate speed while turning, and manage
//! an escalating braking factor on approach.

use std::f32::consts::PI;

use bevy::prelude::*;

use crate::config::{MAX_BRAKING_FACTOR, PATHFIND_CELL_SIZE};
use crate::locomotor::{LocoFlags, Locomotor, SteerContext};
use crate::physics::Turning;
use crate::pose::angle_diff;
use crate::steering::{ground_maintain, SteeringStrategy};

pub struct TreadSteering;

impl SteeringStrategy for TreadSteering {
    fn move_towards(
        &self,
        loco: &mut Locomotor,
        ctx: &mut SteerContext,
        goal: Vec3,
        on_path_dist: f32,
        desired_speed: f32,
    ) {
        let turning = loco.rotate_towards_position(ctx, goal);
        ctx.body.turning = turning;

        // Tracks lose traction in a turn; speed falls off linearly up to a
        // quarter turn of misalignment.
        let rel_angle = angle_diff(ctx.pose.angle_towards(goal), ctx.pose.yaw);
        let angle_coeff = (rel_angle.abs() / (PI / 4.0)).min(1.0);
        let mut goal_speed = (1.0 - angle_coeff) * desired_speed;

        let actual_speed = ctx.body.forward_speed_2d(ctx.pose);
        if on_path_dist < 2.0 * PATHFIND_CELL_SIZE && turning != Turning::None {
            goal_speed = 0.6 * actual_speed;
        }

        let max_brake = loco.max_braking(ctx.damage);
        let slow_down = (actual_speed / 1.5) * (actual_speed / max_brake.max(1e-6));

        if loco.flags.has(LocoFlags::IS_BRAKING) {
            if on_path_dist > PATHFIND_CELL_SIZE && on_path_dist > 2.0 * slow_down {
                loco.flags.set(LocoFlags::IS_BRAKING, false);
                loco.braking_factor = 1.0;
            }
        } else if on_path_dist < slow_down
            && !loco.flags.has(LocoFlags::NO_SLOW_DOWN_AS_APPROACHING_DEST)
        {
            loco.flags.set(LocoFlags::IS_BRAKING, true);
            loco.braking_factor = 1.1;
        }

        if loco.flags.has(LocoFlags::IS_BRAKING) {
            loco.braking_factor = (slow_down / on_path_dist.max(1e-3))
                .powi(2)
                .clamp(1.0, MAX_BRAKING_FACTOR);
            // Stage the deceleration so the unit does not slam to min speed
            // the moment braking engages.
            goal_speed = if on_path_dist < slow_down {
                actual_speed - max_brake
            } else if on_path_dist < 2.0 * slow_down {
                actual_speed - max_brake / 2.0
            } else {
                actual_speed
            };
            goal_speed = goal_speed.max(0.0);
        }

        loco.push_to_speed(ctx, goal_speed);
    }

    fn maintain(&self, loco: &mut Locomotor, ctx: &mut SteerContext) -> bool {
        ground_maintain(loco, ctx)
    }
}

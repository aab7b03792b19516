//! Hovercraft and winged aircraft.
//!
//! Both reuse the fallback style for horizontal control; what differs is how
//! they hold position. Hovercraft stop in place over their hold point, while
//! winged craft can never stop and instead circle it.

use std::f32::consts::PI;

use bevy::prelude::*;

use crate::locomotor::{LocoFlags, Locomotor, SteerContext};
use crate::steering::{other::OtherSteering, SteeringStrategy};

pub struct HoverSteering;

impl SteeringStrategy for HoverSteering {
    fn move_towards(
        &self,
        loco: &mut Locomotor,
        ctx: &mut SteerContext,
        goal: Vec3,
        on_path_dist: f32,
        desired_speed: f32,
    ) {
        let pos = ctx.pose.position;
        loco.flags.set(
            LocoFlags::OVER_WATER,
            ctx.terrain.is_underwater(pos.x, pos.y),
        );
        OtherSteering.move_towards(loco, ctx, goal, on_path_dist, desired_speed);
    }

    fn maintain(&self, loco: &mut Locomotor, ctx: &mut SteerContext) -> bool {
        // Bleed off speed and hold station; the lift policy keeps altitude.
        loco.push_to_speed(ctx, 0.0);
        true
    }
}

pub struct WingSteering;

impl SteeringStrategy for WingSteering {
    fn move_towards(
        &self,
        loco: &mut Locomotor,
        ctx: &mut SteerContext,
        goal: Vec3,
        on_path_dist: f32,
        desired_speed: f32,
    ) {
        OtherSteering.move_towards(loco, ctx, goal, on_path_dist, desired_speed);
        // Fixed-wing craft hold at least stall speed; braking to a stop is
        // never available to them.
        loco.flags.set(LocoFlags::IS_BRAKING, false);
    }

    fn maintain(&self, loco: &mut Locomotor, ctx: &mut SteerContext) -> bool {
        let radius = if loco.template.circling_radius != 0.0 {
            loco.template.circling_radius
        } else {
            loco.min_turn_radius(ctx.damage)
        };
        // Negative radius circles the other way.
        let sign = if radius < 0.0 { -1.0 } else { 1.0 };
        let r = radius.abs().max(1.0);

        let toward = ctx.pose.angle_towards(loco.maintain_pos);
        let dist = (loco.maintain_pos - ctx.pose.position).truncate().length();
        let aim = if dist > 2.0 * r {
            // Strayed off the circle; head back to the hold point.
            toward
        } else {
            toward + sign * (PI - PI / 8.0)
        };
        loco.move_towards_angle(ctx, aim);
        true
    }
}

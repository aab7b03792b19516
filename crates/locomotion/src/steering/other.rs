//! Fallback movement style for anything without a specialized chassis, and
//! the horizontal-control core that hover and winged craft delegate to.

use bevy::prelude::*;

use crate::locomotor::{calc_slow_down_dist, LocoFlags, Locomotor, SteerContext};
use crate::steering::{ground_maintain, SteeringStrategy};

pub struct OtherSteering;

impl SteeringStrategy for OtherSteering {
    fn move_towards(
        &self,
        loco: &mut Locomotor,
        ctx: &mut SteerContext,
        goal: Vec3,
        on_path_dist: f32,
        desired_speed: f32,
    ) {
        // Scripted precision movement glides straight onto the goal once it
        // is within the slide window, skipping normal kinematics.
        if loco.flags.has(LocoFlags::ULTRA_ACCURATE) && loco.template.slide_into_place_time > 0.0 {
            let window = desired_speed * loco.template.slide_into_place_time;
            let d = (goal - ctx.pose.position).truncate();
            if d.x.abs() < window && d.y.abs() < window {
                let dist = d.length();
                if dist <= desired_speed {
                    ctx.pose.position.x = goal.x;
                    ctx.pose.position.y = goal.y;
                } else {
                    let step = d * (desired_speed / dist);
                    ctx.pose.position.x += step.x;
                    ctx.pose.position.y += step.y;
                }
                ctx.body.scrub_velocity_2d(0.0);
                return;
            }
        }

        let turning = loco.rotate_towards_position(ctx, goal);
        ctx.body.turning = turning;

        let actual_speed = ctx.body.forward_speed_2d(ctx.pose);
        let mut goal_speed = desired_speed;
        let slow_down = calc_slow_down_dist(
            actual_speed,
            loco.min_speed(),
            loco.max_braking(ctx.damage),
        );
        if on_path_dist < slow_down
            && !loco.flags.has(LocoFlags::NO_SLOW_DOWN_AS_APPROACHING_DEST)
        {
            goal_speed = loco.min_speed();
            // Hand the final approach to the braking arrival snap.
            loco.flags.set(LocoFlags::IS_BRAKING, true);
        }

        loco.push_to_speed(ctx, goal_speed);
    }

    fn maintain(&self, loco: &mut Locomotor, ctx: &mut SteerContext) -> bool {
        ground_maintain(loco, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locomotor::test_support::{locomotor, SteerRig};
    use crate::unit::BodyDamageState;

    #[test]
    fn test_moves_and_turns_towards_goal() {
        let mut loco = locomotor(&[]);
        let mut rig = SteerRig::flat();
        rig.pose.set_yaw(0.0);
        let goal = rig.pose.position + Vec3::new(200.0, 50.0, 0.0);
        loco.move_towards_position(&mut rig.ctx(), goal, 250.0, 1.0, false);
        assert!(rig.pose.yaw > 0.0);
        assert!(rig.body.accel.truncate().length() > 0.0);
    }

    #[test]
    fn test_engages_braking_inside_slow_down() {
        let mut loco = locomotor(&[]);
        let mut rig = SteerRig::flat();
        rig.pose.set_yaw(0.0);
        let speed = loco.max_speed(BodyDamageState::Pristine);
        rig.body.vel = Vec3::new(speed, 0.0, 0.0);
        let goal = rig.pose.position + Vec3::new(1.4, 0.0, 0.0);
        loco.move_towards_position(&mut rig.ctx(), goal, 1.4, speed, false);
        assert!(loco.is_braking());
    }

    #[test]
    fn test_slide_into_place_when_ultra_accurate() {
        let mut loco = locomotor(&[("SlideIntoPlaceTime", "1000")]);
        loco.flags.set(LocoFlags::ULTRA_ACCURATE, true);
        let mut rig = SteerRig::flat();
        rig.body.vel = Vec3::new(0.4, 0.3, 0.0);
        let start = rig.pose.position;
        let goal = start + Vec3::new(0.6, 0.2, 0.0);
        loco.move_towards_position(&mut rig.ctx(), goal, 0.7, 1.0, false);
        assert_eq!(rig.pose.position.x, goal.x);
        assert_eq!(rig.pose.position.y, goal.y);
        assert_eq!(rig.body.vel.truncate(), Vec2::ZERO);
    }

    #[test]
    fn test_slide_ignored_outside_window() {
        let mut loco = locomotor(&[("SlideIntoPlaceTime", "1000")]);
        loco.flags.set(LocoFlags::ULTRA_ACCURATE, true);
        let mut rig = SteerRig::flat();
        let start = rig.pose.position;
        // Window is desired_speed * 30 frames = 30 units; goal is beyond it.
        let goal = start + Vec3::new(100.0, 0.0, 0.0);
        loco.move_towards_position(&mut rig.ctx(), goal, 100.0, 1.0, false);
        assert_ne!(rig.pose.position.x, goal.x);
    }
}

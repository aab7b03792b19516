//! Per-appearance movement styles.
//!
//! Every chassis appearance maps to one stateless [`SteeringStrategy`]; the
//! mutable state a style needs (braking factor, wander phase, backing-up
//! flags) lives on the [`Locomotor`] so strategies stay zero-sized and the
//! dispatch table is a plain match.

use bevy::prelude::*;

use crate::locomotor::{Locomotor, SteerContext};
use crate::template::LocomotorAppearance;

pub mod hover;
pub mod legs;
pub mod other;
pub mod thrust;
pub mod treads;
pub mod wheels;

pub trait SteeringStrategy: Send + Sync {
    /// One tick of movement towards `goal`. The shared pipeline has already
    /// handled braking hysteresis, invalid terrain, and blockage.
    fn move_towards(
        &self,
        loco: &mut Locomotor,
        ctx: &mut SteerContext,
        goal: Vec3,
        on_path_dist: f32,
        desired_speed: f32,
    );

    /// One tick of holding position. Returns true when the style needs
    /// re-invocation every tick to stay put (hovering, circling).
    fn maintain(&self, loco: &mut Locomotor, ctx: &mut SteerContext) -> bool;
}

pub fn strategy_for(appearance: LocomotorAppearance) -> &'static dyn SteeringStrategy {
    match appearance {
        LocomotorAppearance::Treads => &treads::TreadSteering,
        LocomotorAppearance::FourWheels => &wheels::WheelSteering,
        LocomotorAppearance::TwoLegs => &legs::LegSteering,
        LocomotorAppearance::Climber => &legs::ClimberSteering,
        LocomotorAppearance::Thrust => &thrust::ThrustSteering,
        LocomotorAppearance::Hover => &hover::HoverSteering,
        LocomotorAppearance::Wings => &hover::WingSteering,
        LocomotorAppearance::Other => &other::OtherSteering,
    }
}

/// Ground chassis hold still by bleeding off any residual driven velocity;
/// they need no per-tick upkeep once stopped.
pub(crate) fn ground_maintain(_loco: &mut Locomotor, ctx: &mut SteerContext) -> bool {
    if ctx.body.is_motive(ctx.frame) {
        ctx.body.scrub_velocity_2d(0.0);
    }
    false
}

//! Locomotor templates: immutable per-chassis tuning parsed from INI-style
//! key/value records.
//!
//! All kinematic quantities are stored in logic-frame units. Authoring values
//! are per-second (velocities), per-second-squared (accelerations), degrees
//! (angles), degrees-per-second (turn rates), or milliseconds (durations);
//! `set_field` converts at parse time so the simulation never multiplies by a
//! timestep.

use std::fmt;

use bevy::prelude::*;

use crate::config::{seconds_to_frames, BIGNUM, SECONDS_PER_LOGIC_FRAME};
use crate::surfaces::SurfaceMask;

/// Which steering strategy a locomotor uses, and how renderers should dress
/// the motion up.
#[derive(Clone, Copy, Default, PartialEq, Eq, Debug)]
pub enum LocomotorAppearance {
    TwoLegs,
    FourWheels,
    Treads,
    Hover,
    Thrust,
    Wings,
    Climber,
    #[default]
    Other,
}

impl LocomotorAppearance {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "TWO_LEGS" => Some(Self::TwoLegs),
            "FOUR_WHEELS" => Some(Self::FourWheels),
            "TREADS" => Some(Self::Treads),
            "HOVER" => Some(Self::Hover),
            "THRUST" => Some(Self::Thrust),
            "WINGS" => Some(Self::Wings),
            "CLIMBER" => Some(Self::Climber),
            "OTHER" => Some(Self::Other),
            _ => None,
        }
    }
}

/// Vertical-motion policy applied after horizontal steering each frame.
#[derive(Clone, Copy, Default, PartialEq, Eq, Debug)]
pub enum ZAxisBehavior {
    /// Gravity only; the locomotor never applies vertical force.
    #[default]
    NoZMotiveForce,
    /// Snap to the water surface (or ground where higher).
    SeaLevel,
    /// Hold preferred height above the terrain, with lift forces.
    SurfaceRelativeHeight,
    /// Hold preferred absolute height, with lift forces.
    AbsoluteHeight,
    /// Snap to preferred height above the terrain.
    FixedSurfaceRelativeHeight,
    /// Snap to preferred absolute height.
    FixedAbsoluteHeight,
    /// Like surface-relative, but structures count as terrain.
    RelativeToGroundAndBuildings,
    /// Surface-relative with extra damping towards the preferred height.
    SmoothRelativeHeight,
}

impl ZAxisBehavior {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "NO_Z_MOTIVE_FORCE" => Some(Self::NoZMotiveForce),
            "SEA_LEVEL" => Some(Self::SeaLevel),
            "SURFACE_RELATIVE_HEIGHT" => Some(Self::SurfaceRelativeHeight),
            "ABSOLUTE_HEIGHT" => Some(Self::AbsoluteHeight),
            "FIXED_SURFACE_RELATIVE_HEIGHT" => Some(Self::FixedSurfaceRelativeHeight),
            "FIXED_ABSOLUTE_HEIGHT" => Some(Self::FixedAbsoluteHeight),
            "RELATIVE_TO_GROUND_AND_BUILDINGS" => Some(Self::RelativeToGroundAndBuildings),
            "SMOOTH_RELATIVE_HEIGHT" => Some(Self::SmoothRelativeHeight),
            _ => None,
        }
    }
}

/// Where a unit prefers to travel within a moving group.
#[derive(Clone, Copy, Default, PartialEq, Eq, Debug)]
pub enum MovePriority {
    MovesBack,
    #[default]
    MovesMiddle,
    MovesFront,
}

impl MovePriority {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "MOVES_BACK" => Some(Self::MovesBack),
            "MOVES_MIDDLE" => Some(Self::MovesMiddle),
            "MOVES_FRONT" => Some(Self::MovesFront),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failures while parsing or validating a locomotor template.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateError {
    /// `set_field` was given a key that is not in the field table.
    UnknownField { key: String },
    /// A field value failed to parse for its expected type.
    BadValue { key: String, value: String },
    /// THRUST locomotors must not configure Z behavior or lift; their
    /// vertical motion comes entirely from the thrust vector.
    ThrustZBehaviorConflict { name: String },
}

impl fmt::Display for TemplateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateError::UnknownField { key } => {
                write!(f, "unknown locomotor field '{key}'")
            }
            TemplateError::BadValue { key, value } => {
                write!(f, "bad value '{value}' for locomotor field '{key}'")
            }
            TemplateError::ThrustZBehaviorConflict { name } => {
                write!(
                    f,
                    "locomotor '{name}': THRUST appearance forbids ZAxisBehavior and Lift"
                )
            }
        }
    }
}

impl std::error::Error for TemplateError {}

// ---------------------------------------------------------------------------
// Template
// ---------------------------------------------------------------------------

/// Immutable tuning for one locomotor chassis. Damaged variants default to a
/// negative sentinel and are healed to the undamaged value by `validate`.
#[derive(Clone, Debug)]
pub struct LocomotorTemplate {
    pub name: String,
    pub surfaces: SurfaceMask,

    // Kinematic limits, logic-frame units.
    pub max_speed: f32,
    pub max_speed_damaged: f32,
    pub min_speed: f32,
    pub max_turn_rate: f32,
    pub max_turn_rate_damaged: f32,
    pub acceleration: f32,
    pub acceleration_damaged: f32,
    pub lift: f32,
    pub lift_damaged: f32,
    pub braking: f32,
    pub min_turn_speed: f32,

    // Vertical behavior.
    pub preferred_height: f32,
    pub preferred_height_damping: f32,
    pub circling_radius: f32,
    pub speed_limit_z: f32,
    pub extra_2d_friction: f32,
    pub max_thrust_angle: f32,
    pub z_axis_behavior: ZAxisBehavior,
    pub appearance: LocomotorAppearance,
    pub move_priority: MovePriority,

    // Suspension and attitude dressing.
    pub accel_pitch_limit: f32,
    pub bounce_kick: f32,
    pub pitch_stiffness: f32,
    pub roll_stiffness: f32,
    pub pitch_damping: f32,
    pub roll_damping: f32,
    pub pitch_by_z_vel_coef: f32,
    pub thrust_roll: f32,
    pub thrust_wobble_rate: f32,
    pub min_thrust_wobble: f32,
    pub max_thrust_wobble: f32,
    pub forward_vel_pitch_coef: f32,
    pub lateral_vel_roll_coef: f32,
    pub forward_accel_pitch_coef: f32,
    pub lateral_accel_roll_coef: f32,
    pub uniform_axial_damping: f32,
    pub turn_pivot_offset: f32,

    // Behavior toggles.
    pub apply_2d_friction_when_airborne: bool,
    pub downhill_only: bool,
    pub allow_airborne_motive_force: bool,
    pub works_when_dead: bool,
    pub airborne_targeting_height: f32,
    pub stick_to_ground: bool,
    pub can_move_backwards: bool,
    pub has_suspension: bool,
    pub front_wheel_turn_angle: f32,
    pub max_wheel_extension: f32,
    pub max_wheel_compression: f32,

    // Arrival and wander tuning.
    pub close_enough_dist: f32,
    pub close_enough_dist_3d: bool,
    pub slide_into_place_time: f32,
    pub wander_width_factor: f32,
    pub wander_length_factor: f32,
    pub wander_about_point_radius: f32,
}

impl Default for LocomotorTemplate {
    fn default() -> Self {
        Self {
            name: String::new(),
            surfaces: SurfaceMask::NONE,
            max_speed: 0.0,
            max_speed_damaged: -1.0,
            min_speed: 0.0,
            max_turn_rate: 0.0,
            max_turn_rate_damaged: -1.0,
            acceleration: 0.0,
            acceleration_damaged: -1.0,
            lift: 0.0,
            lift_damaged: -1.0,
            braking: BIGNUM,
            min_turn_speed: BIGNUM,
            preferred_height: 0.0,
            preferred_height_damping: 1.0,
            circling_radius: 0.0,
            speed_limit_z: 999999.0,
            extra_2d_friction: 0.0,
            max_thrust_angle: 0.0,
            z_axis_behavior: ZAxisBehavior::NoZMotiveForce,
            appearance: LocomotorAppearance::Other,
            move_priority: MovePriority::MovesMiddle,
            accel_pitch_limit: 0.0,
            bounce_kick: 0.0,
            pitch_stiffness: 0.1,
            roll_stiffness: 0.1,
            pitch_damping: 0.9,
            roll_damping: 0.9,
            pitch_by_z_vel_coef: 0.0,
            thrust_roll: 0.0,
            thrust_wobble_rate: 0.0,
            min_thrust_wobble: 0.0,
            max_thrust_wobble: 0.0,
            forward_vel_pitch_coef: 0.0,
            lateral_vel_roll_coef: 0.0,
            forward_accel_pitch_coef: 0.0,
            lateral_accel_roll_coef: 0.0,
            uniform_axial_damping: 1.0,
            turn_pivot_offset: 0.0,
            apply_2d_friction_when_airborne: false,
            downhill_only: false,
            allow_airborne_motive_force: false,
            works_when_dead: false,
            airborne_targeting_height: f32::MAX,
            stick_to_ground: false,
            can_move_backwards: false,
            has_suspension: false,
            front_wheel_turn_angle: 0.0,
            max_wheel_extension: 0.0,
            max_wheel_compression: 0.0,
            close_enough_dist: 1.0,
            close_enough_dist_3d: false,
            slide_into_place_time: 0.0,
            wander_width_factor: 0.0,
            wander_length_factor: 1.0,
            wander_about_point_radius: 0.0,
        }
    }
}

// -- parse helpers ----------------------------------------------------------

fn bad(key: &str, value: &str) -> TemplateError {
    TemplateError::BadValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}

fn parse_real(key: &str, value: &str) -> Result<f32, TemplateError> {
    value.trim().parse::<f32>().map_err(|_| bad(key, value))
}

/// Authoring velocities are distance per second.
fn parse_velocity(key: &str, value: &str) -> Result<f32, TemplateError> {
    Ok(parse_real(key, value)? * SECONDS_PER_LOGIC_FRAME)
}

/// Authoring accelerations are distance per second squared.
fn parse_acceleration(key: &str, value: &str) -> Result<f32, TemplateError> {
    Ok(parse_real(key, value)? * SECONDS_PER_LOGIC_FRAME * SECONDS_PER_LOGIC_FRAME)
}

/// Authoring angles are degrees.
fn parse_angle(key: &str, value: &str) -> Result<f32, TemplateError> {
    Ok(parse_real(key, value)?.to_radians())
}

/// Authoring turn rates are degrees per second.
fn parse_angular_velocity(key: &str, value: &str) -> Result<f32, TemplateError> {
    Ok(parse_real(key, value)?.to_radians() * SECONDS_PER_LOGIC_FRAME)
}

/// Authoring durations are milliseconds.
fn parse_duration(key: &str, value: &str) -> Result<f32, TemplateError> {
    Ok(seconds_to_frames(parse_real(key, value)? / 1000.0) as f32)
}

fn parse_bool(key: &str, value: &str) -> Result<bool, TemplateError> {
    match value.trim() {
        "Yes" | "YES" | "yes" | "true" | "True" => Ok(true),
        "No" | "NO" | "no" | "false" | "False" => Ok(false),
        _ => Err(bad(key, value)),
    }
}

fn parse_surfaces(key: &str, value: &str) -> Result<SurfaceMask, TemplateError> {
    let mut mask = SurfaceMask::NONE;
    for token in value.split_whitespace() {
        mask |= SurfaceMask::from_token(token).ok_or_else(|| bad(key, value))?;
    }
    Ok(mask)
}

impl LocomotorTemplate {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set one field from its authoring key and string value, converting
    /// units to logic-frame terms. Unknown keys are a load-time error.
    pub fn set_field(&mut self, key: &str, value: &str) -> Result<(), TemplateError> {
        match key {
            "Surfaces" => self.surfaces = parse_surfaces(key, value)?,
            "Speed" => self.max_speed = parse_velocity(key, value)?,
            "SpeedDamaged" => self.max_speed_damaged = parse_velocity(key, value)?,
            "MinSpeed" => self.min_speed = parse_velocity(key, value)?,
            "TurnRate" => self.max_turn_rate = parse_angular_velocity(key, value)?,
            "TurnRateDamaged" => self.max_turn_rate_damaged = parse_angular_velocity(key, value)?,
            "Acceleration" => self.acceleration = parse_acceleration(key, value)?,
            "AccelerationDamaged" => self.acceleration_damaged = parse_acceleration(key, value)?,
            "Lift" => self.lift = parse_acceleration(key, value)?,
            "LiftDamaged" => self.lift_damaged = parse_acceleration(key, value)?,
            "Braking" => self.braking = parse_acceleration(key, value)?,
            "MinTurnSpeed" => self.min_turn_speed = parse_velocity(key, value)?,
            "PreferredHeight" => self.preferred_height = parse_real(key, value)?,
            "PreferredHeightDamping" => self.preferred_height_damping = parse_real(key, value)?,
            "CirclingRadius" => self.circling_radius = parse_real(key, value)?,
            "SpeedLimitZ" => self.speed_limit_z = parse_velocity(key, value)?,
            "Extra2DFriction" => {
                // Friction per second, applied per frame.
                self.extra_2d_friction = parse_real(key, value)? * SECONDS_PER_LOGIC_FRAME;
            }
            "MaxThrustAngle" => self.max_thrust_angle = parse_angle(key, value)?,
            "ZAxisBehavior" => {
                self.z_axis_behavior =
                    ZAxisBehavior::from_token(value.trim()).ok_or_else(|| bad(key, value))?;
            }
            "Appearance" => {
                self.appearance =
                    LocomotorAppearance::from_token(value.trim()).ok_or_else(|| bad(key, value))?;
            }
            "GroupMovementPriority" => {
                self.move_priority =
                    MovePriority::from_token(value.trim()).ok_or_else(|| bad(key, value))?;
            }
            "AccelerationPitchLimit" => self.accel_pitch_limit = parse_angle(key, value)?,
            "BounceAmount" => self.bounce_kick = parse_angular_velocity(key, value)?,
            "PitchStiffness" => self.pitch_stiffness = parse_real(key, value)?,
            "RollStiffness" => self.roll_stiffness = parse_real(key, value)?,
            "PitchDamping" => self.pitch_damping = parse_real(key, value)?,
            "RollDamping" => self.roll_damping = parse_real(key, value)?,
            "ThrustRoll" => self.thrust_roll = parse_angle(key, value)?,
            "ThrustWobbleRate" => self.thrust_wobble_rate = parse_real(key, value)?,
            "ThrustMinWobble" => self.min_thrust_wobble = parse_real(key, value)?,
            "ThrustMaxWobble" => self.max_thrust_wobble = parse_real(key, value)?,
            "PitchInDirectionOfZVelFactor" => self.pitch_by_z_vel_coef = parse_real(key, value)?,
            "ForwardVelocityPitchFactor" => self.forward_vel_pitch_coef = parse_real(key, value)?,
            "LateralVelocityRollFactor" => self.lateral_vel_roll_coef = parse_real(key, value)?,
            "ForwardAccelerationPitchFactor" => {
                self.forward_accel_pitch_coef = parse_real(key, value)?;
            }
            "LateralAccelerationRollFactor" => {
                self.lateral_accel_roll_coef = parse_real(key, value)?;
            }
            "UniformAxialDamping" => self.uniform_axial_damping = parse_real(key, value)?,
            "TurnPivotOffset" => self.turn_pivot_offset = parse_real(key, value)?,
            "Apply2DFrictionWhenAirborne" => {
                self.apply_2d_friction_when_airborne = parse_bool(key, value)?;
            }
            "DownhillOnly" => self.downhill_only = parse_bool(key, value)?,
            "AllowAirborneMotiveForce" => {
                self.allow_airborne_motive_force = parse_bool(key, value)?;
            }
            "LocomotorWorksWhenDead" => self.works_when_dead = parse_bool(key, value)?,
            "AirborneTargetingHeight" => self.airborne_targeting_height = parse_real(key, value)?,
            "StickToGround" => self.stick_to_ground = parse_bool(key, value)?,
            "CanMoveBackwards" => self.can_move_backwards = parse_bool(key, value)?,
            "HasSuspension" => self.has_suspension = parse_bool(key, value)?,
            "FrontWheelTurnAngle" => self.front_wheel_turn_angle = parse_angle(key, value)?,
            "MaximumWheelExtension" => self.max_wheel_extension = parse_real(key, value)?,
            "MaximumWheelCompression" => self.max_wheel_compression = parse_real(key, value)?,
            "CloseEnoughDist" => self.close_enough_dist = parse_real(key, value)?,
            "CloseEnoughDist3D" => self.close_enough_dist_3d = parse_bool(key, value)?,
            "SlideIntoPlaceTime" => self.slide_into_place_time = parse_duration(key, value)?,
            "WanderWidthFactor" => self.wander_width_factor = parse_real(key, value)?,
            "WanderLengthFactor" => self.wander_length_factor = parse_real(key, value)?,
            "WanderAboutPointRadius" => self.wander_about_point_radius = parse_real(key, value)?,
            _ => {
                return Err(TemplateError::UnknownField {
                    key: key.to_string(),
                })
            }
        }
        Ok(())
    }

    /// Heal sentinel fields and reject inconsistent configurations. Must run
    /// once after all `set_field` calls, before the template is registered.
    pub fn validate(&mut self) -> Result<(), TemplateError> {
        if self.max_speed_damaged < 0.0 {
            self.max_speed_damaged = self.max_speed;
        }
        if self.max_turn_rate_damaged < 0.0 {
            self.max_turn_rate_damaged = self.max_turn_rate;
        }
        if self.acceleration_damaged < 0.0 {
            self.acceleration_damaged = self.acceleration;
        }
        if self.lift_damaged < 0.0 {
            self.lift_damaged = self.lift;
        }

        if self.appearance == LocomotorAppearance::Wings {
            // Wings must keep flying; a zero minimum speed or turn speed
            // would let them hang motionless in the air.
            if self.min_speed <= 0.0 {
                warn!("locomotor '{}': WINGS requires MinSpeed > 0, healing", self.name);
                self.min_speed = 0.01;
            }
            if self.min_turn_speed <= 0.0 {
                warn!(
                    "locomotor '{}': WINGS requires MinTurnSpeed > 0, healing",
                    self.name
                );
                self.min_turn_speed = 0.01;
            }
        }

        if self.appearance == LocomotorAppearance::Thrust {
            if self.z_axis_behavior != ZAxisBehavior::NoZMotiveForce
                || self.lift != 0.0
                || self.lift_damaged != 0.0
            {
                return Err(TemplateError::ThrustZBehaviorConflict {
                    name: self.name.clone(),
                });
            }
            if self.max_speed <= 0.0 {
                warn!("locomotor '{}': THRUST requires Speed > 0, healing", self.name);
                self.max_speed = 0.01;
            }
            if self.max_speed_damaged <= 0.0 {
                self.max_speed_damaged = 0.01;
            }
            if self.min_speed <= 0.0 {
                self.min_speed = 0.01;
            }
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn test_damaged_sentinels_heal_to_undamaged() {
        let mut t = LocomotorTemplate::named("tank");
        t.set_field("Speed", "30").unwrap();
        t.set_field("TurnRate", "90").unwrap();
        t.set_field("Acceleration", "60").unwrap();
        t.validate().unwrap();
        assert!(approx(t.max_speed_damaged, t.max_speed));
        assert!(approx(t.max_turn_rate_damaged, t.max_turn_rate));
        assert!(approx(t.acceleration_damaged, t.acceleration));
        assert!(approx(t.lift_damaged, t.lift));
    }

    #[test]
    fn test_explicit_damaged_values_survive() {
        let mut t = LocomotorTemplate::named("tank");
        t.set_field("Speed", "30").unwrap();
        t.set_field("SpeedDamaged", "15").unwrap();
        t.validate().unwrap();
        assert!(approx(t.max_speed_damaged, t.max_speed / 2.0));
    }

    #[test]
    fn test_velocity_conversion_per_frame() {
        let mut t = LocomotorTemplate::default();
        t.set_field("Speed", "30").unwrap();
        // 30 units/sec at 30 logic frames/sec is 1 unit/frame.
        assert!(approx(t.max_speed, 1.0));
    }

    #[test]
    fn test_turn_rate_conversion() {
        let mut t = LocomotorTemplate::default();
        t.set_field("TurnRate", "90").unwrap();
        assert!(approx(t.max_turn_rate, (PI / 2.0) / 30.0));
    }

    #[test]
    fn test_acceleration_conversion() {
        let mut t = LocomotorTemplate::default();
        t.set_field("Acceleration", "900").unwrap();
        assert!(approx(t.acceleration, 1.0));
    }

    #[test]
    fn test_duration_conversion() {
        let mut t = LocomotorTemplate::default();
        t.set_field("SlideIntoPlaceTime", "500").unwrap();
        assert!(approx(t.slide_into_place_time, 15.0));
    }

    #[test]
    fn test_surfaces_union() {
        let mut t = LocomotorTemplate::default();
        t.set_field("Surfaces", "GROUND RUBBLE").unwrap();
        assert!(t.surfaces.contains(SurfaceMask::GROUND | SurfaceMask::RUBBLE));
        assert!(!t.surfaces.intersects(SurfaceMask::AIR));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let mut t = LocomotorTemplate::default();
        let err = t.set_field("WarpFactor", "9").unwrap_err();
        assert!(matches!(err, TemplateError::UnknownField { .. }));
    }

    #[test]
    fn test_bad_value_rejected() {
        let mut t = LocomotorTemplate::default();
        let err = t.set_field("Speed", "fast").unwrap_err();
        assert!(matches!(err, TemplateError::BadValue { .. }));
        let err = t.set_field("Appearance", "SLITHER").unwrap_err();
        assert!(matches!(err, TemplateError::BadValue { .. }));
    }

    #[test]
    fn test_wings_heals_zero_min_speed() {
        let mut t = LocomotorTemplate::named("raptor");
        t.set_field("Appearance", "WINGS").unwrap();
        t.set_field("Speed", "60").unwrap();
        // MinSpeed omitted: defaults to 0, healed rather than rejected.
        t.validate().unwrap();
        assert!(approx(t.min_speed, 0.01));
        assert!(approx(t.min_turn_speed, 0.01) || t.min_turn_speed > 0.0);
    }

    #[test]
    fn test_wings_min_turn_speed_explicit_zero_heals() {
        let mut t = LocomotorTemplate::named("raptor");
        t.set_field("Appearance", "WINGS").unwrap();
        t.set_field("MinTurnSpeed", "0").unwrap();
        t.validate().unwrap();
        assert!(approx(t.min_turn_speed, 0.01));
    }

    #[test]
    fn test_thrust_with_lift_is_hard_error() {
        let mut t = LocomotorTemplate::named("missile");
        t.set_field("Appearance", "THRUST").unwrap();
        t.set_field("Lift", "120").unwrap();
        let err = t.validate().unwrap_err();
        assert!(matches!(err, TemplateError::ThrustZBehaviorConflict { .. }));
    }

    #[test]
    fn test_thrust_with_z_behavior_is_hard_error() {
        let mut t = LocomotorTemplate::named("missile");
        t.set_field("Appearance", "THRUST").unwrap();
        t.set_field("ZAxisBehavior", "SURFACE_RELATIVE_HEIGHT").unwrap();
        assert!(t.validate().is_err());
    }

    #[test]
    fn test_thrust_heals_zero_speeds() {
        let mut t = LocomotorTemplate::named("missile");
        t.set_field("Appearance", "THRUST").unwrap();
        t.validate().unwrap();
        assert!(approx(t.max_speed, 0.01));
        assert!(approx(t.max_speed_damaged, 0.01));
        assert!(approx(t.min_speed, 0.01));
    }

    #[test]
    fn test_bool_parsing_ini_style() {
        let mut t = LocomotorTemplate::default();
        t.set_field("CanMoveBackwards", "Yes").unwrap();
        assert!(t.can_move_backwards);
        t.set_field("CanMoveBackwards", "No").unwrap();
        assert!(!t.can_move_backwards);
        assert!(t.set_field("CanMoveBackwards", "maybe").is_err());
    }

    #[test]
    fn test_defaults_match_chassis_expectations() {
        let t = LocomotorTemplate::default();
        assert_eq!(t.braking, BIGNUM);
        assert_eq!(t.min_turn_speed, BIGNUM);
        assert!(approx(t.pitch_stiffness, 0.1));
        assert!(approx(t.pitch_damping, 0.9));
        assert!(approx(t.uniform_axial_damping, 1.0));
        assert!(approx(t.close_enough_dist, 1.0));
        assert!(approx(t.wander_length_factor, 1.0));
        assert_eq!(t.z_axis_behavior, ZAxisBehavior::NoZMotiveForce);
        assert_eq!(t.appearance, LocomotorAppearance::Other);
    }
}

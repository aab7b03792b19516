/// Logic ticks per second. All stored tuning values are per-frame; anything
/// authored in per-second units is converted at parse time.
pub const LOGIC_FRAMES_PER_SECOND: f32 = 30.0;
pub const SECONDS_PER_LOGIC_FRAME: f32 = 1.0 / LOGIC_FRAMES_PER_SECOND;

/// Edge length of one pathfind cell in world units. Braking hysteresis and
/// several steering thresholds are expressed in cells.
pub const PATHFIND_CELL_SIZE: f32 = 10.0;

/// Vertical acceleration, world units per frame per frame. Negative is down.
pub const GRAVITY: f32 = -0.07;

/// Sentinel standing in for "unbounded" so downstream division and trig never
/// see a zero. Numeric edge cases substitute this rather than erroring.
pub const BIGNUM: f32 = 99999.0;

/// Upper clamp for the braking factor escalation on tracked vehicles.
pub const MAX_BRAKING_FACTOR: f32 = 5.0;

/// Anti-loiter watchdog: a unit that stays within DONUT_DISTANCE of its goal
/// for this long without arriving is forced into braking.
pub const DONUT_TIME_DELAY_SECONDS: f32 = 2.5;
pub const DONUT_DISTANCE: f32 = 4.0 * PATHFIND_CELL_SIZE;

/// Restitution used when a body crosses the ground plane moving downward.
pub const GROUND_STIFFNESS: f32 = 0.5;
/// Restitution used when shoved back out of an immobile obstacle.
pub const STRUCTURE_STIFFNESS: f32 = 0.5;

/// Default fall height (world units) above which landing causes damage.
pub const DEFAULT_FALL_DAMAGE_HEIGHT: f32 = 40.0;

/// Impact speed reached after falling `height` under gravity, per frame.
pub fn speed_from_fall_height(height: f32) -> f32 {
    (2.0 * GRAVITY.abs() * height.max(0.0)).sqrt()
}

pub fn seconds_to_frames(seconds: f32) -> u64 {
    (seconds * LOGIC_FRAMES_PER_SECOND).ceil() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_speed_from_fall_height_monotonic() {
        let a = speed_from_fall_height(10.0);
        let b = speed_from_fall_height(40.0);
        assert!(b > a);
        assert!(a > 0.0);
    }

    #[test]
    fn test_speed_from_fall_height_zero() {
        assert_eq!(speed_from_fall_height(0.0), 0.0);
        assert_eq!(speed_from_fall_height(-5.0), 0.0);
    }

    #[test]
    fn test_seconds_to_frames() {
        assert_eq!(seconds_to_frames(1.0), 30);
        assert_eq!(seconds_to_frames(2.5), 75);
    }
}

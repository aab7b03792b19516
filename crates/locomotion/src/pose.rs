//! Unit pose component and heading math shared by steering and physics.

use bevy::prelude::*;
use std::f32::consts::PI;

/// Position plus orientation for one simulated unit. Yaw is the 2D facing
/// angle in radians (0 along +X, counter-clockwise); pitch and roll are
/// visual-suspension angles settled back toward zero by physics damping.
#[derive(Component, Clone, Copy, Debug, PartialEq)]
pub struct Pose {
    pub position: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub roll: f32,
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            yaw: 0.0,
            pitch: 0.0,
            roll: 0.0,
        }
    }
}

impl Pose {
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Unit facing direction projected onto the ground plane.
    pub fn direction_2d(&self) -> Vec2 {
        Vec2::new(self.yaw.cos(), self.yaw.sin())
    }

    /// Full 3D facing direction including pitch.
    pub fn direction_3d(&self) -> Vec3 {
        let cp = self.pitch.cos();
        Vec3::new(self.yaw.cos() * cp, self.yaw.sin() * cp, self.pitch.sin())
    }

    pub fn set_yaw(&mut self, yaw: f32) {
        self.yaw = normalize_angle(yaw);
    }

    /// Yaw of the straight line from this pose to `target`.
    pub fn angle_towards(&self, target: Vec3) -> f32 {
        let d = target - self.position;
        d.y.atan2(d.x)
    }
}

/// Wrap an angle into (-PI, PI].
pub fn normalize_angle(mut a: f32) -> f32 {
    while a > PI {
        a -= 2.0 * PI;
    }
    while a <= -PI {
        a += 2.0 * PI;
    }
    a
}

/// Signed shortest rotation from `from` to `to`, in (-PI, PI].
pub fn angle_diff(to: f32, from: f32) -> f32 {
    normalize_angle(to - from)
}

/// Rotate `v` towards `goal` by at most `max_angle` radians, preserving the
/// magnitude of `v`. Returns the rotated vector. Degenerate inputs (zero
/// vectors, already-parallel directions) return `v` unchanged.
pub fn rotate_towards_3d(v: Vec3, goal: Vec3, max_angle: f32) -> Vec3 {
    let v_len = v.length();
    if v_len < 1e-6 || goal.length_squared() < 1e-12 {
        return v;
    }
    let from = v / v_len;
    let to = goal.normalize();
    let dot = from.dot(to).clamp(-1.0, 1.0);
    let angle = dot.acos();
    if angle < 1e-6 {
        return v;
    }
    let axis = from.cross(to);
    let axis = if axis.length_squared() < 1e-12 {
        // Opposite directions: pick any perpendicular axis.
        from.any_orthogonal_vector()
    } else {
        axis.normalize()
    };
    let step = angle.min(max_angle.abs());
    Quat::from_axis_angle(axis, step) * v
}

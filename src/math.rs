//! Vector helpers used by the locomotion step.
//!
//! All directions handled here live in world space with `+Y` as up.

use bevy::prelude::*;

/// Squared length below which a vector is treated as having no direction.
pub const DIRECTION_EPSILON_SQ: f32 = 1.0e-8;

/// Move `current` toward `target` by at most `max_delta`, never overshooting.
#[inline]
pub fn move_towards(current: f32, target: f32, max_delta: f32) -> f32 {
    let delta = target - current;
    if delta.abs() <= max_delta {
        target
    } else {
        current + delta.signum() * max_delta
    }
}

/// Move `current` toward `target` by at most `max_delta` along the straight line between them.
#[inline]
pub fn move_towards_vec3(current: Vec3, target: Vec3, max_delta: f32) -> Vec3 {
    let delta = target - current;
    let distance = delta.length();
    if distance <= max_delta || distance <= f32::EPSILON {
        target
    } else {
        current + delta / distance * max_delta
    }
}

/// Frame-rate independent smoothing factor: `1 - e^(-rate * dt)`.
#[inline]
pub fn exp_blend(rate: f32, dt: f32) -> f32 {
    1.0 - (-rate * dt).exp()
}

/// Drop the vertical component of `v` and renormalise.
///
/// Returns `None` when nothing horizontal is left (e.g. looking straight down).
#[inline]
pub fn flatten(v: Vec3) -> Option<Vec3> {
    let planar = Vec3::new(v.x, 0.0, v.z);
    if planar.length_squared() <= DIRECTION_EPSILON_SQ {
        None
    } else {
        Some(planar.normalize())
    }
}

/// Project `v` onto the plane with unit normal `normal`.
#[inline]
pub fn project_on_plane(v: Vec3, normal: Vec3) -> Vec3 {
    v - normal * v.dot(normal)
}

/// Spherically interpolate between two unit directions.
///
/// Antiparallel inputs rotate about world up when possible so that planar
/// directions stay planar.
pub fn slerp_direction(from: Vec3, to: Vec3, t: f32) -> Vec3 {
    let dot = from.dot(to).clamp(-1.0, 1.0);
    let theta = dot.acos();
    if theta <= 1.0e-5 {
        return to;
    }
    let sin_theta = theta.sin();
    if sin_theta.abs() <= 1.0e-5 {
        let axis = if from.cross(Vec3::Y).length_squared() > DIRECTION_EPSILON_SQ {
            Vec3::Y
        } else {
            from.any_orthonormal_vector()
        };
        return Quat::from_axis_angle(axis, theta * t) * from;
    }
    (from * ((1.0 - t) * theta).sin() + to * (t * theta).sin()) / sin_theta
}

//! Spatial probe contracts.
//!
//! The locomotion step never touches a physics world directly. Everything it
//! needs to know about the surroundings comes through these traits, which a
//! backend (Rapier, an analytic plane world, a heightmap, ...) implements.
//! All queries are synchronous and must not have side effects visible to the
//! step.

use bevy::prelude::*;

use crate::config::LocomotionConfig;

/// Result of the ground check.
#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub struct GroundContact {
    /// Whether walkable ground supports the actor.
    pub grounded: bool,
    /// Surface normal of the ground. `Vec3::Y` when not grounded.
    pub normal: Vec3,
}

impl Default for GroundContact {
    fn default() -> Self {
        Self::airborne()
    }
}

impl GroundContact {
    /// No ground under the actor.
    pub fn airborne() -> Self {
        Self {
            grounded: false,
            normal: Vec3::Y,
        }
    }

    /// Ground with the given normal.
    pub fn on(normal: Vec3) -> Self {
        Self {
            grounded: true,
            normal: normal.try_normalize().unwrap_or(Vec3::Y),
        }
    }

    /// Flat ground.
    pub fn flat() -> Self {
        Self::on(Vec3::Y)
    }
}

/// A wall surface found by a wall cast.
#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub struct WallHit {
    /// Surface normal at the hit point (points away from the wall).
    pub normal: Vec3,
    /// Distance from the cast origin to the hit point.
    pub distance: f32,
}

impl WallHit {
    /// Create a wall hit. The normal is normalised.
    pub fn new(normal: Vec3, distance: f32) -> Self {
        Self {
            normal: normal.try_normalize().unwrap_or(Vec3::X),
            distance,
        }
    }
}

/// Ground, ceiling and snap queries.
///
/// `position` is always the actor's feet in world space.
pub trait GroundProbe {
    /// Is the actor standing on walkable ground, and with what normal?
    fn ground(&self, position: Vec3, config: &LocomotionConfig) -> GroundContact;

    /// Would a standing-height collider fit at `position`?
    fn can_stand(&self, position: Vec3, config: &LocomotionConfig) -> bool;

    /// Gap between the feet and walkable ground found within `max_distance` below.
    ///
    /// Returns `None` when no walkable surface is close enough.
    fn ground_snap(
        &self,
        position: Vec3,
        max_distance: f32,
        config: &LocomotionConfig,
    ) -> Option<f32>;
}

/// Wall queries used by the wallrun state machine.
pub trait WallProbe {
    /// Cast a single ray from `origin` along `direction` (unit length).
    fn cast_wall(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        config: &LocomotionConfig,
    ) -> Option<WallHit>;

    /// Best wall among `directions`: floor-like surfaces are discarded and the
    /// nearest remaining hit wins. Ties keep the earlier direction.
    fn wall(
        &self,
        origin: Vec3,
        directions: &[Vec3],
        max_distance: f32,
        config: &LocomotionConfig,
    ) -> Option<WallHit> {
        directions
            .iter()
            .filter_map(|direction| self.cast_wall(origin, *direction, max_distance, config))
            .filter(|hit| !is_floor_like(hit.normal, config))
            .fold(None, |best: Option<WallHit>, hit| match best {
                Some(current) if current.distance <= hit.distance => Some(current),
                _ => Some(hit),
            })
    }
}

/// Applies an intended displacement with collision resolution.
pub trait MotionResolver {
    /// Returns the displacement that was actually possible from `position`
    /// for an actor currently `height` tall.
    fn resolve(
        &self,
        position: Vec3,
        displacement: Vec3,
        height: f32,
        config: &LocomotionConfig,
    ) -> Vec3;
}

/// The eight scan directions used to find a wall: right, left, forward,
/// back, then the four diagonals.
pub fn wall_scan_directions(forward: Vec3, right: Vec3) -> [Vec3; 8] {
    let f = forward;
    let r = right;
    [
        r,
        -r,
        f,
        -f,
        (r + f).normalize_or_zero(),
        (r - f).normalize_or_zero(),
        (-r + f).normalize_or_zero(),
        (-r - f).normalize_or_zero(),
    ]
}

/// Whether a surface with this normal is gentle enough to stand on.
#[inline]
pub fn is_walkable(normal: Vec3, config: &LocomotionConfig) -> bool {
    normal.angle_between(Vec3::Y) <= config.walkable_angle()
}

/// Whether a surface is too close to horizontal to be wallrun on.
#[inline]
pub fn is_floor_like(normal: Vec3, config: &LocomotionConfig) -> bool {
    normal.angle_between(Vec3::Y) < config.wall_floor_angle
}

//! Analytic collision world made of planes.
//!
//! [`PlaneWorld`] implements every probe trait without a physics engine:
//! floors are (possibly sloped) planes over an XZ region, walls are bounded
//! vertical-ish planes, ceilings are horizontal planes over a region. It is
//! used for headless simulation, AI look-ahead and tests, and as a
//! [`ResourceWorldBackend`](crate::backend::ResourceWorldBackend) resource.

use bevy::prelude::*;

use crate::config::LocomotionConfig;
use crate::probe::{is_walkable, GroundContact, GroundProbe, MotionResolver, WallHit, WallProbe};

/// How far below a floor the feet may be and still count as standing on it.
const PENETRATION_TOLERANCE: f32 = 0.1;
/// Tallest rise the resolver will climb onto in a single move.
const STEP_OFFSET: f32 = 0.3;

/// A floor plane over an optional XZ region.
#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub struct Floor {
    /// Upward-facing unit normal.
    pub normal: Vec3,
    /// Any point on the plane.
    pub point: Vec3,
    /// XZ extent. `None` = infinite.
    pub region: Option<Rect>,
}

impl Floor {
    /// Infinite horizontal floor at `height`.
    pub fn flat(height: f32) -> Self {
        Self {
            normal: Vec3::Y,
            point: Vec3::Y * height,
            region: None,
        }
    }

    /// Sloped floor through `point`. The normal is flipped to face up.
    pub fn slope(normal: Vec3, point: Vec3) -> Self {
        let normal = normal.try_normalize().unwrap_or(Vec3::Y);
        Self {
            normal: if normal.y < 0.0 { -normal } else { normal },
            point,
            region: None,
        }
    }

    /// Builder: restrict the floor to an XZ rectangle.
    pub fn within(mut self, region: Rect) -> Self {
        self.region = Some(region);
        self
    }

    /// Surface height at `(x, z)`, if the floor covers that column.
    pub fn height_at(&self, xz: Vec2) -> Option<f32> {
        if self.normal.y <= f32::EPSILON {
            return None;
        }
        if let Some(region) = self.region {
            if !region.contains(xz) {
                return None;
            }
        }
        let dx = xz.x - self.point.x;
        let dz = xz.y - self.point.z;
        Some(self.point.y - (self.normal.x * dx + self.normal.z * dz) / self.normal.y)
    }
}

/// A bounded wall plane.
#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub struct WallPlane {
    /// Unit normal pointing away from the solid side.
    pub normal: Vec3,
    /// Any point on the plane.
    pub point: Vec3,
    /// Lowest world height the wall covers.
    pub bottom: f32,
    /// Highest world height the wall covers.
    pub top: f32,
    /// Half the extent along the wall, measured from `point`. Infinity = unbounded.
    pub half_width: f32,
}

impl WallPlane {
    /// Unbounded wall through `point` facing `normal`.
    pub fn new(normal: Vec3, point: Vec3) -> Self {
        Self {
            normal: normal.try_normalize().unwrap_or(Vec3::X),
            point,
            bottom: f32::NEG_INFINITY,
            top: f32::INFINITY,
            half_width: f32::INFINITY,
        }
    }

    /// Builder: vertical extent in world space.
    pub fn with_height(mut self, bottom: f32, top: f32) -> Self {
        self.bottom = bottom;
        self.top = top;
        self
    }

    /// Builder: horizontal half extent along the wall.
    pub fn with_half_width(mut self, half_width: f32) -> Self {
        self.half_width = half_width;
        self
    }

    /// Signed distance from the plane; positive on the open side.
    #[inline]
    pub fn signed_distance(&self, point: Vec3) -> f32 {
        (point - self.point).dot(self.normal)
    }

    fn along(&self) -> Vec3 {
        Vec3::Y.cross(self.normal).try_normalize().unwrap_or(Vec3::Z)
    }

    fn covers(&self, point: Vec3) -> bool {
        let lateral = (point - self.point).dot(self.along()).abs();
        lateral <= self.half_width && point.y >= self.bottom && point.y <= self.top
    }

    /// Whether a body spanning `[feet, feet + height]` vertically overlaps the wall.
    fn spans(&self, feet: Vec3, height: f32) -> bool {
        let lateral = (feet - self.point).dot(self.along()).abs();
        lateral <= self.half_width && feet.y <= self.top && feet.y + height >= self.bottom
    }
}

/// A horizontal ceiling (underside) over an optional XZ region.
#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub struct Ceiling {
    pub height: f32,
    pub region: Option<Rect>,
}

impl Ceiling {
    /// Infinite ceiling at `height`.
    pub fn new(height: f32) -> Self {
        Self {
            height,
            region: None,
        }
    }

    /// Builder: restrict the ceiling to an XZ rectangle.
    pub fn within(mut self, region: Rect) -> Self {
        self.region = Some(region);
        self
    }

    fn covers(&self, xz: Vec2) -> bool {
        self.region.is_none_or(|region| region.contains(xz))
    }
}

/// A world built from analytic planes.
///
/// # Example
///
/// ```rust
/// use bevy::prelude::*;
/// use fps_locomotion::prelude::*;
///
/// let world = PlaneWorld::new()
///     .with_floor(Floor::flat(0.0))
///     .with_wall(WallPlane::new(Vec3::NEG_X, Vec3::new(3.0, 0.0, 0.0)).with_height(0.0, 4.0))
///     .with_ceiling(Ceiling::new(1.5).within(Rect::new(-10.0, -10.0, -8.0, -8.0)));
///
/// let config = LocomotionConfig::default();
/// assert!(world.ground(Vec3::ZERO, &config).grounded);
/// ```
#[derive(Resource, Reflect, Debug, Clone, Default, PartialEq)]
#[reflect(Resource)]
pub struct PlaneWorld {
    pub floors: Vec<Floor>,
    pub walls: Vec<WallPlane>,
    pub ceilings: Vec<Ceiling>,
}

impl PlaneWorld {
    /// Empty world: no floor, nothing to hit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: add a floor.
    pub fn with_floor(mut self, floor: Floor) -> Self {
        self.floors.push(floor);
        self
    }

    /// Builder: add a wall.
    pub fn with_wall(mut self, wall: WallPlane) -> Self {
        self.walls.push(wall);
        self
    }

    /// Builder: add a ceiling.
    pub fn with_ceiling(mut self, ceiling: Ceiling) -> Self {
        self.ceilings.push(ceiling);
        self
    }

    /// Highest floor at the column of `position` that is not above
    /// `position.y + reach`. Returns `(surface height, normal)`.
    pub fn floor_below(&self, position: Vec3, reach: f32) -> Option<(f32, Vec3)> {
        let xz = position.xz();
        self.floors
            .iter()
            .filter_map(|floor| floor.height_at(xz).map(|y| (y, floor.normal)))
            .filter(|(y, _)| *y <= position.y + reach)
            .max_by(|a, b| a.0.total_cmp(&b.0))
    }

    /// Lowest ceiling above `y` over the column of `position`.
    fn ceiling_above(&self, position: Vec3, y: f32) -> Option<f32> {
        let xz = position.xz();
        self.ceilings
            .iter()
            .filter(|ceiling| ceiling.covers(xz) && ceiling.height > y)
            .map(|ceiling| ceiling.height)
            .min_by(f32::total_cmp)
    }
}

impl GroundProbe for PlaneWorld {
    fn ground(&self, position: Vec3, config: &LocomotionConfig) -> GroundContact {
        match self.floor_below(position, PENETRATION_TOLERANCE) {
            // Contact band is the snap distance so a jump clears it in one step
            Some((y, normal))
                if position.y - y <= config.snap_distance && is_walkable(normal, config) =>
            {
                GroundContact::on(normal)
            }
            _ => GroundContact::airborne(),
        }
    }

    fn can_stand(&self, position: Vec3, config: &LocomotionConfig) -> bool {
        match self.ceiling_above(position, position.y) {
            Some(height) => height >= position.y + config.stand_height,
            None => true,
        }
    }

    fn ground_snap(
        &self,
        position: Vec3,
        max_distance: f32,
        config: &LocomotionConfig,
    ) -> Option<f32> {
        let (y, normal) = self.floor_below(position, PENETRATION_TOLERANCE)?;
        let gap = position.y - y;
        (gap <= max_distance && is_walkable(normal, config)).then_some(gap)
    }
}

impl WallProbe for PlaneWorld {
    fn cast_wall(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        _config: &LocomotionConfig,
    ) -> Option<WallHit> {
        self.walls
            .iter()
            .filter_map(|wall| {
                let facing = -direction.dot(wall.normal);
                if facing <= f32::EPSILON {
                    return None;
                }
                let distance = wall.signed_distance(origin) / facing;
                if !(0.0..=max_distance).contains(&distance) {
                    return None;
                }
                wall.covers(origin + direction * distance)
                    .then(|| WallHit::new(wall.normal, distance))
            })
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }
}

impl MotionResolver for PlaneWorld {
    fn resolve(
        &self,
        position: Vec3,
        displacement: Vec3,
        height: f32,
        config: &LocomotionConfig,
    ) -> Vec3 {
        let mut target = position + displacement;

        // Walls: keep the capsule radius on the open side
        for wall in &self.walls {
            let horizontal = Vec3::new(wall.normal.x, 0.0, wall.normal.z);
            let Some(push_dir) = horizontal.try_normalize() else {
                continue;
            };
            let before = wall.signed_distance(position);
            let after = wall.signed_distance(target);
            if before >= 0.0 && after < config.radius && wall.spans(target, height) {
                let depth = (config.radius - after) / push_dir.dot(wall.normal).max(f32::EPSILON);
                target += push_dir * depth;
            }
        }

        // Floors: never end below the surface we were above
        if let Some((y, _)) = self.floor_below(target, STEP_OFFSET.max(position.y - target.y)) {
            if target.y < y && position.y + STEP_OFFSET >= y {
                target.y = y;
            }
        }

        // Ceilings: stop the head at the underside
        if displacement.y > 0.0 {
            let head = position.y + height;
            if let Some(ceiling) = self.ceiling_above(position, head - f32::EPSILON) {
                if target.y + height > ceiling {
                    target.y = (ceiling - height).max(position.y);
                }
            }
        }

        target - position
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn config() -> LocomotionConfig {
        LocomotionConfig::default()
    }

    // ==================== Ground Tests ====================

    #[test]
    fn grounded_within_snap_band() {
        let world = PlaneWorld::new().with_floor(Floor::flat(0.0));
        assert!(world.ground(Vec3::ZERO, &config()).grounded);
        assert!(world.ground(Vec3::new(0.0, 0.05, 0.0), &config()).grounded);
        assert!(!world.ground(Vec3::new(0.0, 0.5, 0.0), &config()).grounded);
    }

    #[test]
    fn floor_region_limits_ground() {
        let region = Rect::new(-1.0, -1.0, 1.0, 1.0);
        let world = PlaneWorld::new().with_floor(Floor::flat(0.0).within(region));
        assert!(world.ground(Vec3::ZERO, &config()).grounded);
        assert!(!world.ground(Vec3::new(2.0, 0.0, 0.0), &config()).grounded);
    }

    #[test]
    fn steep_slope_is_not_ground() {
        let steep = Quat::from_rotation_z(60.0_f32.to_radians()) * Vec3::Y;
        let world = PlaneWorld::new().with_floor(Floor::slope(steep, Vec3::ZERO));
        assert!(!world.ground(Vec3::ZERO, &config()).grounded);

        let gentle = Quat::from_rotation_z(20.0_f32.to_radians()) * Vec3::Y;
        let world = PlaneWorld::new().with_floor(Floor::slope(gentle, Vec3::ZERO));
        let contact = world.ground(Vec3::ZERO, &config());
        assert!(contact.grounded);
        assert_abs_diff_eq!(contact.normal.angle_between(Vec3::Y), 20.0_f32.to_radians(), epsilon = 1e-4);
    }

    #[test]
    fn slope_height_follows_plane() {
        let normal = Vec3::new(-1.0, 1.0, 0.0).normalize();
        let floor = Floor::slope(normal, Vec3::ZERO);
        // 45 degrees rising toward +X
        assert_abs_diff_eq!(floor.height_at(Vec2::new(2.0, 0.0)).unwrap(), 2.0, epsilon = 1e-5);
    }

    #[test]
    fn ground_snap_reports_gap() {
        let world = PlaneWorld::new().with_floor(Floor::flat(0.0));
        let gap = world.ground_snap(Vec3::new(0.0, 0.05, 0.0), 0.08, &config());
        assert_abs_diff_eq!(gap.unwrap(), 0.05, epsilon = 1e-6);
        assert!(world.ground_snap(Vec3::new(0.0, 0.5, 0.0), 0.08, &config()).is_none());
    }

    #[test]
    fn low_ceiling_blocks_standing() {
        let world = PlaneWorld::new()
            .with_floor(Floor::flat(0.0))
            .with_ceiling(Ceiling::new(1.5));
        assert!(!world.can_stand(Vec3::ZERO, &config()));
        assert!(PlaneWorld::new().can_stand(Vec3::ZERO, &config()));
    }

    // ==================== Wall Tests ====================

    #[test]
    fn wall_cast_hits_facing_wall() {
        let world = PlaneWorld::new().with_wall(WallPlane::new(Vec3::NEG_X, Vec3::new(0.6, 0.0, 0.0)));
        let hit = world.cast_wall(Vec3::ZERO, Vec3::X, 0.9, &config()).unwrap();
        assert_abs_diff_eq!(hit.distance, 0.6, epsilon = 1e-6);
        assert_eq!(hit.normal, Vec3::NEG_X);

        assert!(world.cast_wall(Vec3::ZERO, Vec3::NEG_X, 0.9, &config()).is_none());
        assert!(world.cast_wall(Vec3::ZERO, Vec3::X, 0.5, &config()).is_none());
    }

    #[test]
    fn wall_cast_respects_extent() {
        let wall = WallPlane::new(Vec3::NEG_X, Vec3::new(0.6, 0.0, 0.0))
            .with_height(0.0, 2.0)
            .with_half_width(1.0);
        let world = PlaneWorld::new().with_wall(wall);
        assert!(world.cast_wall(Vec3::new(0.0, 3.0, 0.0), Vec3::X, 0.9, &config()).is_none());
        assert!(world.cast_wall(Vec3::new(0.0, 1.0, 5.0), Vec3::X, 0.9, &config()).is_none());
        assert!(world.cast_wall(Vec3::new(0.0, 1.0, 0.5), Vec3::X, 0.9, &config()).is_some());
    }

    // ==================== Resolver Tests ====================

    #[test]
    fn resolve_stops_on_floor() {
        let world = PlaneWorld::new().with_floor(Floor::flat(0.0));
        let applied = world.resolve(
            Vec3::new(0.0, 0.5, 0.0),
            Vec3::new(1.0, -2.0, 0.0),
            config().stand_height,
            &config(),
        );
        assert_abs_diff_eq!(applied.x, 1.0);
        assert_abs_diff_eq!(applied.y, -0.5, epsilon = 1e-6);
    }

    #[test]
    fn resolve_keeps_radius_from_wall() {
        let world = PlaneWorld::new().with_wall(WallPlane::new(Vec3::NEG_X, Vec3::new(1.0, 0.0, 0.0)));
        let applied = world.resolve(Vec3::ZERO, Vec3::new(2.0, 0.0, 0.0), config().stand_height, &config());
        assert_abs_diff_eq!(applied.x, 0.5, epsilon = 1e-5);
    }

    #[test]
    fn resolve_stops_head_at_ceiling() {
        let config = config();
        let world = PlaneWorld::new().with_ceiling(Ceiling::new(2.0));
        let rise = Vec3::new(0.0, 1.5, 0.0);

        let standing = world.resolve(Vec3::ZERO, rise, config.stand_height, &config);
        assert_abs_diff_eq!(standing.y, 0.0);

        let crouched = world.resolve(Vec3::ZERO, rise, config.crouch_height, &config);
        assert_abs_diff_eq!(crouched.y, 2.0 - config.crouch_height, epsilon = 1e-5);
    }

    #[test]
    fn short_wall_only_blocks_bodies_that_reach_it() {
        let config = config();
        let world = PlaneWorld::new().with_wall(
            WallPlane::new(Vec3::NEG_X, Vec3::new(1.0, 0.0, 0.0)).with_height(1.5, 3.0),
        );
        let push = Vec3::new(2.0, 0.0, 0.0);

        let standing = world.resolve(Vec3::ZERO, push, config.stand_height, &config);
        assert_abs_diff_eq!(standing.x, 0.5, epsilon = 1e-5);

        let crouched = world.resolve(Vec3::ZERO, push, config.crouch_height, &config);
        assert_abs_diff_eq!(crouched.x, 2.0, epsilon = 1e-5);
    }
}

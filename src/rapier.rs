//! Rapier3D physics backend implementation.
//!
//! Probes are answered with `bevy_rapier3d` ray and shape casts; moves are
//! applied through Rapier's [`KinematicCharacterController`]. Enable with
//! the `rapier3d` feature.
//!
//! The actor's `Transform` is the capsule centre. Feet sit
//! `current_height / 2` below it, so the collider is rebuilt and the body
//! shifted whenever the crouch height changes.

use bevy::prelude::*;
use bevy_rapier3d::parry::shape::Ball;
use bevy_rapier3d::prelude::*;

use crate::backend::LocomotionBackend;
use crate::camera::CameraLook;
use crate::config::LocomotionConfig;
use crate::intent::LocomotionIntent;
use crate::probe::{is_walkable, GroundContact, GroundProbe, WallHit, WallProbe};
use crate::state::{ActorKinematicState, LocomotionOutput};
use crate::systems::{drive_actor, fixed_delta};
use crate::LocomotionSet;

/// Lift applied to downward probe origins so they start clear of the floor.
const PROBE_LIFT: f32 = 0.05;
/// Ceiling clearance ignored by the stand-up check.
const STAND_SAFETY: f32 = 0.02;

/// Rapier3D physics backend for the locomotion controller.
pub struct Rapier3dBackend;

impl LocomotionBackend for Rapier3dBackend {
    fn plugin() -> impl Plugin {
        Rapier3dBackendPlugin
    }
}

/// Plugin that sets up Rapier3D-specific systems for the locomotion controller.
pub struct Rapier3dBackendPlugin;

impl Plugin for Rapier3dBackendPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(FixedUpdate, rapier_step.in_set(LocomotionSet::Step));
    }
}

/// Probe adapter over a Rapier context for a single actor.
pub struct RapierProbes<'c, 'w> {
    context: &'c RapierContext<'w>,
    entity: Entity,
    groups: Option<CollisionGroups>,
}

impl<'c, 'w> RapierProbes<'c, 'w> {
    /// Probes for `entity`, which is excluded from every query.
    pub fn new(
        context: &'c RapierContext<'w>,
        entity: Entity,
        groups: Option<CollisionGroups>,
    ) -> Self {
        Self {
            context,
            entity,
            groups,
        }
    }

    fn filter(&self) -> QueryFilter<'static> {
        let mut filter = QueryFilter::default()
            .exclude_rigid_body(self.entity)
            .exclude_collider(self.entity)
            .exclude_sensors();
        if let Some(groups) = self.groups {
            filter = filter.groups(groups);
        }
        filter
    }

    /// Cast a ball and return `(distance, normal)` of the first hit.
    fn cast_ball(
        &self,
        origin: Vec3,
        direction: Vec3,
        radius: f32,
        max_distance: f32,
    ) -> Option<(f32, Vec3)> {
        let shape = Ball::new(radius);
        self.context
            .cast_shape(
                origin,
                Quat::IDENTITY,
                direction,
                &shape,
                ShapeCastOptions {
                    max_time_of_impact: max_distance,
                    stop_at_penetration: false,
                    ..default()
                },
                self.filter(),
            )
            .map(|(_, hit)| {
                let normal = hit.details.map(|d| d.normal1).unwrap_or(-direction);
                (hit.time_of_impact, normal)
            })
    }

    fn cast_ray(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> Option<(f32, Vec3)> {
        self.context
            .cast_ray_and_get_normal(origin, direction, max_distance, true, self.filter())
            .map(|(_, hit)| (hit.time_of_impact, hit.normal))
    }
}

impl GroundProbe for RapierProbes<'_, '_> {
    fn ground(&self, position: Vec3, config: &LocomotionConfig) -> GroundContact {
        let origin = position + Vec3::Y * (config.probe_radius + PROBE_LIFT);
        match self.cast_ball(origin, Vec3::NEG_Y, config.probe_radius, config.probe_ray + PROBE_LIFT) {
            Some((_, normal)) if is_walkable(normal, config) => GroundContact::on(normal),
            _ => GroundContact::airborne(),
        }
    }

    fn can_stand(&self, position: Vec3, config: &LocomotionConfig) -> bool {
        let radius = (config.radius - 0.01).max(0.01);
        let origin = position + Vec3::Y * (radius + 0.01);
        let reach = (config.stand_height - STAND_SAFETY - radius * 2.0).max(0.0);
        self.cast_ball(origin, Vec3::Y, radius, reach).is_none()
    }

    fn ground_snap(
        &self,
        position: Vec3,
        max_distance: f32,
        config: &LocomotionConfig,
    ) -> Option<f32> {
        let lift = 0.1;
        let origin = position + Vec3::Y * lift;
        let (distance, normal) = self.cast_ray(origin, Vec3::NEG_Y, max_distance + lift)?;
        is_walkable(normal, config).then_some(distance - lift)
    }
}

impl WallProbe for RapierProbes<'_, '_> {
    fn cast_wall(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        _config: &LocomotionConfig,
    ) -> Option<WallHit> {
        self.cast_ray(origin, direction, max_distance)
            .map(|(distance, normal)| WallHit::new(normal, distance))
    }
}

/// Capsule collider for an actor of the given total height.
pub fn actor_collider(height: f32, radius: f32) -> Collider {
    Collider::capsule_y((height * 0.5 - radius).max(0.0), radius)
}

/// Step every Rapier-driven actor and hand the move to its character controller.
#[allow(clippy::type_complexity)]
pub fn rapier_step(
    time: Res<Time<Fixed>>,
    rapier_context: ReadRapierContext,
    mut q_actors: Query<(
        Entity,
        &GlobalTransform,
        &LocomotionConfig,
        &mut LocomotionIntent,
        &mut ActorKinematicState,
        &mut LocomotionOutput,
        &mut KinematicCharacterController,
        &mut Collider,
        Option<&KinematicCharacterControllerOutput>,
        Option<&CameraLook>,
        Option<&CollisionGroups>,
    )>,
) {
    let Ok(context) = rapier_context.single() else {
        return;
    };
    let dt = fixed_delta(&time);

    for (
        entity,
        transform,
        config,
        mut intent,
        mut state,
        mut output,
        mut controller,
        mut collider,
        controller_output,
        look,
        groups,
    ) in &mut q_actors
    {
        let (_, rotation, center) = transform.to_scale_rotation_translation();
        let old_height = state.current_height;
        let feet = center - Vec3::Y * state.center_offset();

        let probes = RapierProbes::new(&context, entity, groups.copied());
        let step = drive_actor(
            &mut intent,
            &mut state,
            config,
            feet,
            rotation,
            look,
            &probes,
            &probes,
            dt,
        );

        // Keep the feet planted while the capsule grows or shrinks
        let mut translation = step.displacement;
        if state.current_height != old_height {
            *collider = actor_collider(state.current_height, config.radius);
            translation += Vec3::Y * (state.current_height - old_height) * 0.5;
        }
        controller.translation = Some(translation);

        // Rapier reports the previous tick's resolved move
        let applied = controller_output
            .map(|out| out.effective_translation)
            .unwrap_or(Vec3::ZERO);
        *output = LocomotionOutput::from_step(&step, applied);
    }
}

/// Bundle for creating an actor with Rapier3D physics.
///
/// Provides a kinematic body, a capsule sized from the config, and a
/// character controller with Rapier's own ground snapping disabled (the
/// step snaps itself).
///
/// # Example
///
/// ```ignore
/// use bevy::prelude::*;
/// use fps_locomotion::prelude::*;
/// use fps_locomotion::rapier::Rapier3dActorBundle;
///
/// fn spawn_player(mut commands: Commands) {
///     let config = LocomotionConfig::player();
///     commands.spawn((
///         Transform::from_xyz(0.0, 2.0, 0.0),
///         LocomotionBundle::new(config),
///         Rapier3dActorBundle::new(&config),
///     ));
/// }
/// ```
#[derive(Bundle)]
pub struct Rapier3dActorBundle {
    pub rigid_body: RigidBody,
    pub collider: Collider,
    pub controller: KinematicCharacterController,
}

impl Rapier3dActorBundle {
    /// Bundle for a standing actor with the given config.
    pub fn new(config: &LocomotionConfig) -> Self {
        Self {
            rigid_body: RigidBody::KinematicPositionBased,
            collider: actor_collider(config.stand_height, config.radius),
            controller: KinematicCharacterController {
                up: Vec3::Y,
                snap_to_ground: None,
                autostep: None,
                max_slope_climb_angle: config.walkable_angle(),
                min_slope_slide_angle: config.walkable_angle(),
                ..default()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collider_matches_actor_height() {
        let collider = actor_collider(2.0, 0.5);
        let capsule = collider.as_capsule().unwrap();
        let segment = capsule.segment();
        let half = (segment.a().y - segment.b().y).abs() / 2.0;
        assert!((half + capsule.radius() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn bundle_disables_builtin_snap() {
        let config = LocomotionConfig::default();
        let bundle = Rapier3dActorBundle::new(&config);
        assert!(bundle.controller.snap_to_ground.is_none());
        assert_eq!(bundle.rigid_body, RigidBody::KinematicPositionBased);
    }
}

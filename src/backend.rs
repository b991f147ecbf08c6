//! Physics backend abstraction.
//!
//! A backend decides where probe answers come from and how the step's
//! displacement is applied. The locomotion systems themselves are backend
//! agnostic: every backend runs [`drive_actor`](crate::systems::drive_actor)
//! in [`LocomotionSet::Step`] with its own probes.

use std::marker::PhantomData;

use bevy::prelude::*;

use crate::camera::CameraLook;
use crate::config::LocomotionConfig;
use crate::intent::LocomotionIntent;
use crate::probe::{GroundProbe, MotionResolver, WallProbe};
use crate::state::{ActorKinematicState, LocomotionOutput};
use crate::systems::{drive_actor, fixed_delta};
use crate::LocomotionSet;

/// Trait for physics backend implementations.
///
/// Implement this trait to integrate a collision world with the locomotion
/// controller. The backend's plugin must add a system in
/// [`LocomotionSet::Step`] that runs the step for every actor and applies
/// the resulting displacement.
///
/// Two backends ship with the crate:
/// - [`ResourceWorldBackend`] for any resource implementing the probe traits
///   (e.g. [`PlaneWorld`](crate::plane_world::PlaneWorld))
/// - `Rapier3dBackend` (feature `rapier3d`)
pub trait LocomotionBackend: 'static + Send + Sync {
    /// Returns the plugin that sets up this backend.
    fn plugin() -> impl Plugin;
}

/// Backend that answers probes from a resource and moves `Transform` directly.
///
/// The actor's `Transform::translation` is its feet.
///
/// ```rust,no_run
/// use bevy::prelude::*;
/// use fps_locomotion::prelude::*;
///
/// App::new()
///     .add_plugins(MinimalPlugins)
///     .insert_resource(PlaneWorld::new().with_floor(Floor::flat(0.0)))
///     .add_plugins(LocomotionPlugin::<ResourceWorldBackend<PlaneWorld>>::default())
///     .run();
/// ```
pub struct ResourceWorldBackend<W> {
    _marker: PhantomData<W>,
}

impl<W> LocomotionBackend for ResourceWorldBackend<W>
where
    W: Resource + GroundProbe + WallProbe + MotionResolver,
{
    fn plugin() -> impl Plugin {
        ResourceWorldPlugin::<W> {
            _marker: PhantomData,
        }
    }
}

/// Plugin installed by [`ResourceWorldBackend`].
pub struct ResourceWorldPlugin<W> {
    _marker: PhantomData<W>,
}

impl<W> Plugin for ResourceWorldPlugin<W>
where
    W: Resource + GroundProbe + WallProbe + MotionResolver,
{
    fn build(&self, app: &mut App) {
        app.add_systems(
            FixedUpdate,
            step_resource_world::<W>.in_set(LocomotionSet::Step),
        );
    }
}

/// Step every actor against the world resource `W`.
pub fn step_resource_world<W>(
    time: Res<Time<Fixed>>,
    world: Option<Res<W>>,
    mut q_actors: Query<(
        Entity,
        &LocomotionConfig,
        &mut LocomotionIntent,
        &mut ActorKinematicState,
        &mut LocomotionOutput,
        &mut Transform,
        Option<&CameraLook>,
    )>,
) where
    W: Resource + GroundProbe + WallProbe + MotionResolver,
{
    let Some(world) = world else {
        return;
    };
    let dt = fixed_delta(&time);
    let world = world.into_inner();

    for (entity, config, mut intent, mut state, mut output, mut transform, look) in &mut q_actors {
        let feet = transform.translation;
        let step = drive_actor(
            &mut intent,
            &mut state,
            config,
            feet,
            transform.rotation,
            look,
            world,
            world,
            dt,
        );

        let applied = world.resolve(feet, step.displacement, state.current_height, config);
        transform.translation += applied;

        *output = LocomotionOutput::from_step(&step, applied);
        trace!("{entity}: moved {applied:?}");
    }
}

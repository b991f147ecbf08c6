//! # `fps_locomotion`
//!
//! A deterministic first-person locomotion controller for Bevy.
//!
//! This crate provides momentum-preserving movement that:
//! - Runs, brakes and strafes on the ground with a sprint latch
//! - Crouches with a ceiling lock and slides with slope acceleration
//! - Wallruns along any qualifying wall with wall jumps and camera tilt
//! - Uses coyote time and jump buffering
//! - Abstracts collision queries behind probe traits (plane world and
//!   Rapier3D backends included)
//!
//! ## Architecture
//!
//! The core is a pure [`step`](motor::step) function:
//! 1. Probes report ground, ceiling and wall contacts
//! 2. The step advances [`ActorKinematicState`](state::ActorKinematicState)
//!    and returns a displacement plus a camera roll target
//! 3. The backend resolves the displacement against its collision world
//!
//! [`LocomotionPlugin`] wires this into `FixedUpdate` for every entity with a
//! [`LocomotionBundle`].
//!
//! ## Usage
//!
//! ```rust
//! use bevy::prelude::*;
//! use fps_locomotion::prelude::*;
//!
//! // Drive the core directly against an analytic world
//! let world = PlaneWorld::new().with_floor(Floor::flat(0.0));
//! let config = LocomotionConfig::player();
//! let mut state = ActorKinematicState::new(&config);
//!
//! let input = FrameInput::new(1.0 / 60.0).with_move(Vec2::Y);
//! let out = step(&mut state, &config, &input, &world, &world);
//! assert!(state.is_grounded);
//! assert!(out.displacement.z < 0.0);
//! ```

use bevy::prelude::*;

pub mod backend;
pub mod camera;
pub mod config;
pub mod intent;
pub mod math;
pub mod motor;
pub mod plane_world;
pub mod probe;
pub mod state;
pub mod systems;

#[cfg(feature = "rapier3d")]
pub mod rapier;

pub mod prelude {
    //! Convenient re-exports for common usage.

    pub use crate::backend::{LocomotionBackend, ResourceWorldBackend};
    pub use crate::camera::{CameraLook, FirstPersonCamera};
    pub use crate::config::{ConfigError, LocomotionConfig};
    pub use crate::intent::{FrameInput, LocomotionIntent};
    pub use crate::motor::{step, StepOutput, WallRunExit};
    pub use crate::plane_world::{Ceiling, Floor, PlaneWorld, WallPlane};
    pub use crate::probe::{
        GroundContact, GroundProbe, MotionResolver, WallHit, WallProbe,
    };
    pub use crate::state::{
        ActorKinematicState, Airborne, Crouching, Grounded, LocomotionOutput, Sliding,
        WallRunning,
    };
    pub use crate::{LocomotionBundle, LocomotionPlugin, LocomotionSet};

    #[cfg(feature = "rapier3d")]
    pub use crate::rapier::Rapier3dBackend;
}

/// System sets for the locomotion controller, chained in `FixedUpdate`.
///
/// Put systems that write [`LocomotionIntent`](intent::LocomotionIntent) from
/// fixed-rate sources (AI, scripted input) in `Input`.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocomotionSet {
    /// Intent is written.
    Input,
    /// The backend steps actors and applies their motion.
    Step,
    /// Marker components are synced from state.
    Sync,
}

/// Components for a locomotion actor.
#[derive(Bundle, Default)]
pub struct LocomotionBundle {
    pub config: config::LocomotionConfig,
    pub intent: intent::LocomotionIntent,
    pub state: state::ActorKinematicState,
    pub output: state::LocomotionOutput,
}

impl LocomotionBundle {
    /// Bundle for an actor spawned at rest, standing.
    pub fn new(config: config::LocomotionConfig) -> Self {
        Self {
            state: state::ActorKinematicState::new(&config),
            config,
            intent: default(),
            output: default(),
        }
    }
}

/// Main plugin for the locomotion controller.
///
/// This plugin is generic over a backend `B` that answers probes and
/// applies motion.
///
/// # Type Parameters
/// - `B`: The backend implementation (e.g. `ResourceWorldBackend<PlaneWorld>`
///   or `Rapier3dBackend`)
///
/// # Examples
///
/// With Rapier3D backend:
/// ```rust,ignore
/// use bevy::prelude::*;
/// use bevy_rapier3d::prelude::*;
/// use fps_locomotion::prelude::*;
///
/// App::new()
///     .add_plugins(DefaultPlugins)
///     .add_plugins(RapierPhysicsPlugin::<NoUserData>::default().in_fixed_schedule())
///     .add_plugins(LocomotionPlugin::<Rapier3dBackend>::default())
///     .run();
/// ```
pub struct LocomotionPlugin<B: backend::LocomotionBackend> {
    _marker: std::marker::PhantomData<B>,
}

impl<B: backend::LocomotionBackend> Default for LocomotionPlugin<B> {
    fn default() -> Self {
        Self {
            _marker: std::marker::PhantomData,
        }
    }
}

impl<B: backend::LocomotionBackend> Plugin for LocomotionPlugin<B> {
    fn build(&self, app: &mut App) {
        // Register core types
        app.register_type::<config::LocomotionConfig>();
        app.register_type::<intent::LocomotionIntent>();
        app.register_type::<state::ActorKinematicState>();
        app.register_type::<state::LocomotionOutput>();
        app.register_type::<state::Grounded>();
        app.register_type::<state::Airborne>();
        app.register_type::<state::Crouching>();
        app.register_type::<state::Sliding>();
        app.register_type::<state::WallRunning>();
        app.register_type::<camera::CameraLook>();
        app.register_type::<camera::FirstPersonCamera>();

        app.configure_sets(
            FixedUpdate,
            (LocomotionSet::Input, LocomotionSet::Step, LocomotionSet::Sync).chain(),
        );

        // Add the backend plugin
        app.add_plugins(B::plugin());

        app.add_systems(
            FixedUpdate,
            systems::sync_state_markers.in_set(LocomotionSet::Sync),
        );

        app.add_systems(
            Update,
            (
                systems::validate_configs,
                (
                    systems::apply_camera_feedback,
                    systems::update_first_person_cameras,
                )
                    .chain(),
            ),
        );
    }
}

//! Core controller systems.
//!
//! These systems are backend agnostic. The backend-specific step systems
//! share [`drive_actor`] so every backend builds its [`FrameInput`] the
//! same way.

use bevy::prelude::*;

use crate::camera::{CameraLook, FirstPersonCamera};
use crate::config::LocomotionConfig;
use crate::intent::{FrameInput, LocomotionIntent};
use crate::motor::{step, StepOutput};
use crate::probe::{GroundProbe, WallProbe};
use crate::state::{
    ActorKinematicState, Airborne, Crouching, Grounded, LocomotionOutput, Sliding, WallRunning,
};

/// Fixed timestep delta, falling back to 60 Hz when the fixed clock has
/// not advanced yet (e.g. when `FixedUpdate` is run by hand in tests).
pub fn fixed_delta(time: &Time<Fixed>) -> f32 {
    Some(time.delta_secs())
        .filter(|&d| d > 0.0)
        .unwrap_or(1.0 / 60.0)
}

/// Build a [`FrameInput`] for one actor and run the step.
///
/// `feet` is the actor's feet in world space and `body_rotation` its body
/// orientation. The camera basis comes from `look` when present, else from
/// the body. Consumes the jump press edge from `intent`.
#[allow(clippy::too_many_arguments)]
pub fn drive_actor<G, W>(
    intent: &mut LocomotionIntent,
    state: &mut ActorKinematicState,
    config: &LocomotionConfig,
    feet: Vec3,
    body_rotation: Quat,
    look: Option<&CameraLook>,
    ground: &G,
    walls: &W,
    dt: f32,
) -> StepOutput
where
    G: GroundProbe + ?Sized,
    W: WallProbe + ?Sized,
{
    let actor_forward = body_rotation * Vec3::NEG_Z;
    let actor_right = body_rotation * Vec3::X;
    let (camera_forward, camera_right) = look
        .map(CameraLook::forward_right)
        .unwrap_or((actor_forward, actor_right));

    let input = FrameInput {
        move_input: intent.move_input.clamp_length_max(1.0),
        sprint_held: intent.sprint_held,
        crouch_held: intent.crouch_held,
        jump_pressed: intent.take_jump_press(),
        camera_forward,
        camera_right,
        actor_forward,
        actor_right,
        position: feet,
        dt,
    };

    step(state, config, &input, ground, walls)
}

/// Log configs that fail validation when they are added or changed.
///
/// The actor keeps simulating with the rejected values.
pub fn validate_configs(q_configs: Query<(Entity, &LocomotionConfig), Changed<LocomotionConfig>>) {
    for (entity, config) in &q_configs {
        if let Err(err) = config.validate() {
            error!("{entity}: invalid locomotion config: {err}");
        }
    }
}

/// Sync state marker components from [`ActorKinematicState`].
pub fn sync_state_markers(
    mut commands: Commands,
    q_actors: Query<(
        Entity,
        &ActorKinematicState,
        Has<Grounded>,
        Has<Airborne>,
        Has<Crouching>,
        Has<Sliding>,
        Option<&WallRunning>,
    )>,
) {
    for (entity, state, has_grounded, has_airborne, has_crouching, has_sliding, wall) in &q_actors {
        let mut entity_commands = commands.entity(entity);

        // Grounded/Airborne
        if state.is_grounded && !has_grounded {
            entity_commands.insert(Grounded).remove::<Airborne>();
        } else if !state.is_grounded && !has_airborne {
            entity_commands.insert(Airborne).remove::<Grounded>();
        }

        // Crouching
        if state.is_crouching && !has_crouching {
            entity_commands.insert(Crouching);
        } else if !state.is_crouching && has_crouching {
            entity_commands.remove::<Crouching>();
        }

        // Sliding
        if state.is_sliding && !has_sliding {
            entity_commands.insert(Sliding);
        } else if !state.is_sliding && has_sliding {
            entity_commands.remove::<Sliding>();
        }

        // WallRunning carries the current wall, so refresh it while it changes
        match (state.is_wall_running, wall) {
            (true, Some(current))
                if current.normal == state.wall_normal && current.tangent == state.wall_tangent => {}
            (true, _) => {
                entity_commands.insert(WallRunning::new(state.wall_normal, state.wall_tangent));
            }
            (false, Some(_)) => {
                entity_commands.remove::<WallRunning>();
            }
            (false, None) => {}
        }
    }
}

/// Feed the latest step into the camera: roll target, roll and eye height
/// smoothing, and body yaw.
pub fn apply_camera_feedback(
    time: Res<Time>,
    mut q_actors: Query<
        (
            &LocomotionOutput,
            &ActorKinematicState,
            &LocomotionConfig,
            &mut CameraLook,
            &mut Transform,
        ),
        Without<FirstPersonCamera>,
    >,
) {
    let dt = time.delta_secs();
    for (output, state, config, mut look, mut transform) in &mut q_actors {
        look.set_roll_target(output.camera_roll_target);
        look.tick_roll(dt);
        look.tick_eye_height(state.is_crouching, config, dt);
        transform.rotation = look.body_rotation();
    }
}

/// Pose first-person cameras from their parent's [`CameraLook`].
pub fn update_first_person_cameras(
    q_looks: Query<&CameraLook>,
    mut q_cameras: Query<(&FirstPersonCamera, &ChildOf, &mut Transform)>,
) {
    for (camera, child_of, mut transform) in &mut q_cameras {
        let Ok(look) = q_looks.get(child_of.parent()) else {
            continue;
        };
        transform.rotation = look.head_rotation();
        transform.translation = Vec3::Y * (camera.eye_height + look.eye_offset);
    }
}

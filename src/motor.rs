//! The locomotion step.
//!
//! [`step`] advances one actor by one tick. It is pure apart from mutating
//! the [`ActorKinematicState`] it is handed: no ECS access, no physics world,
//! no clock other than `state.clock`. Everything spatial comes through the
//! [`GroundProbe`] and [`WallProbe`] traits.
//!
//! Phase order is fixed:
//!
//! 0. clock and jump stamp
//! 1. ground check
//! 2. crouch height
//! 3. slide start/stop
//! 4. sprint latch
//! 5. wish direction and speed cap
//! 6. jump
//! 7. wallrun state machine
//! 8. horizontal integration and ground snap
//! 9. displacement
//! 10. camera roll target

use bevy::prelude::*;

use crate::config::LocomotionConfig;
use crate::intent::FrameInput;
use crate::math::{
    exp_blend, flatten, move_towards, move_towards_vec3, project_on_plane, slerp_direction,
};
use crate::probe::{wall_scan_directions, GroundProbe, WallProbe};
use crate::state::{ActorKinematicState, NEVER};

/// Below this planar speed the velocity has no usable direction.
const MIN_STEER_SPEED_SQ: f32 = 1.0e-4;
/// Below this planar speed air steering is skipped.
const MIN_AIR_SPEED_SQ: f32 = 1.0e-6;
/// Wall alignment needs at least this much speed to pick a direction.
const MIN_ALIGN_SPEED: f32 = 1.0e-4;

/// Why a wallrun ended.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq)]
pub enum WallRunExit {
    /// `wall_run_max_time` elapsed.
    Timeout,
    /// The follow probe no longer finds the wall.
    LostWall,
    /// A buffered jump launched the actor off the wall.
    WallJump,
    /// The actor touched walkable ground.
    Grounded,
    /// A ground or coyote jump was consumed this step.
    Jumped,
}

/// What one step produced.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StepOutput {
    /// Intended world-space displacement for this step. The backend resolves it.
    pub displacement: Vec3,
    /// Camera roll target in degrees.
    pub camera_roll_target: f32,
    /// A ground or coyote jump was consumed.
    pub jumped: bool,
    /// A wall jump was performed.
    pub wall_jumped: bool,
    /// Downward snap folded into `displacement`.
    pub ground_snap: f32,
    /// A wallrun started this step.
    pub wall_run_started: bool,
    /// A wallrun ended this step, and why.
    pub wall_run_exit: Option<WallRunExit>,
}

/// Planar movement basis resolved for one step.
#[derive(Debug, Clone, Copy)]
struct Basis {
    forward: Vec3,
    right: Vec3,
}

impl Basis {
    /// Flattened actor basis; falls back to `-Z`/`+X` when degenerate.
    fn actor(input: &FrameInput) -> Self {
        let forward = flatten(input.actor_forward).unwrap_or(Vec3::NEG_Z);
        let right = flatten(input.actor_right).unwrap_or_else(|| {
            flatten(forward.cross(Vec3::Y)).unwrap_or(Vec3::X)
        });
        Self { forward, right }
    }

    /// Flattened camera basis; each axis falls back to the actor basis.
    fn camera(input: &FrameInput, actor: Basis) -> Self {
        Self {
            forward: flatten(input.camera_forward).unwrap_or(actor.forward),
            right: flatten(input.camera_right).unwrap_or(actor.right),
        }
    }
}

/// Advance one actor by one step.
///
/// The step never fails: a non-positive or non-finite `dt` runs every phase
/// with zero elapsed time, and degenerate directions fall back to the actor
/// basis.
pub fn step<G, W>(
    state: &mut ActorKinematicState,
    config: &LocomotionConfig,
    input: &FrameInput,
    ground: &G,
    walls: &W,
) -> StepOutput
where
    G: GroundProbe + ?Sized,
    W: WallProbe + ?Sized,
{
    let dt = if input.dt.is_finite() && input.dt > 0.0 {
        input.dt
    } else {
        0.0
    };
    let mut output = StepOutput::default();

    // 0. Clock
    state.clock += f64::from(dt);
    let now = state.clock;
    if input.jump_pressed {
        state.last_jump_requested_time = now;
    }

    // 1. Ground
    let contact = ground.ground(input.position, config);
    state.is_grounded = contact.grounded;
    state.ground_normal = if contact.grounded {
        contact.normal
    } else {
        Vec3::Y
    };
    if state.is_grounded {
        state.last_grounded_time = now;
    }

    // 2. Crouch
    update_crouch(state, config, input, ground, dt);

    // 3. Slide
    let planar_speed = state.planar_speed();
    if !state.is_sliding
        && state.is_grounded
        && state.is_crouching
        && planar_speed >= config.slide_min_speed
    {
        state.is_sliding = true;
        debug!("slide start at {planar_speed:.2} u/s");
    }
    if state.is_sliding
        && (!state.is_grounded || !state.is_crouching || planar_speed <= config.slide_end_speed)
    {
        state.is_sliding = false;
        debug!("slide stop at {planar_speed:.2} u/s");
    }

    // 4. Sprint latch
    if state.is_grounded {
        state.sprint_active = input.sprint_held && !state.is_crouching && !state.is_sliding;
    }

    // 5. Intent
    let actor = Basis::actor(input);
    let camera = Basis::camera(input, actor);
    let wish = camera.forward * input.move_input.y + camera.right * input.move_input.x;
    let (wish_dir, wish_mag) = match wish.try_normalize() {
        Some(dir) => (dir, wish.length().min(1.0)),
        None => (Vec3::ZERO, 0.0),
    };
    let run_cap = config.speed_cap(state.is_crouching, state.sprint_active) * wish_mag;

    // 6. Jump
    if state.jump_buffered(config) && (state.is_grounded || state.within_coyote_time(config)) {
        state.vertical_velocity = config.jump_velocity();
        state.last_jump_requested_time = NEVER;
        output.jumped = true;
        debug!("jump, vertical velocity {:.2}", state.vertical_velocity);
    }

    // 7. Wallrun
    if !state.is_grounded && !output.jumped {
        if !state.is_wall_running {
            output.wall_run_started = try_start_wall_run(state, config, input, actor, camera, walls);
        } else if let Err(exit) = update_wall_run(state, config, input, walls, dt) {
            if exit == WallRunExit::WallJump {
                output.wall_jumped = true;
            }
            end_wall_run(state, &mut output, exit);
        }
    } else if state.is_wall_running {
        let exit = if output.jumped {
            WallRunExit::Jumped
        } else {
            WallRunExit::Grounded
        };
        end_wall_run(state, &mut output, exit);
    }

    // 8. Horizontal integration
    if state.is_grounded && !state.is_sliding {
        if wish_mag > 0.0 {
            run_on_ground(state, config, wish_dir, run_cap, dt);
        } else {
            state.planar_velocity =
                move_towards_vec3(state.planar_velocity, Vec3::ZERO, config.ground_decel_no_input * dt);
        }
        stick_to_ground(state, config);
        output.ground_snap = ground_snap(config, input, ground);
    } else if state.is_grounded {
        update_slide(state, config, wish_dir, wish_mag, dt);
        stick_to_ground(state, config);
        output.ground_snap = ground_snap(config, input, ground);
    } else if !state.is_wall_running {
        air_move(state, config, wish_dir, wish_mag, run_cap, dt);
        state.vertical_velocity += config.gravity * dt;
    }
    state.planar_velocity.y = 0.0;

    // 9. Displacement
    output.displacement = (state.planar_velocity + Vec3::Y * state.vertical_velocity) * dt
        - Vec3::Y * output.ground_snap;

    // 10. Camera roll
    output.camera_roll_target = camera_roll_target(state, config, input);

    trace!(
        "step dt={dt:.4} grounded={} crouch={} slide={} wall={} v={:?} vy={:.2}",
        state.is_grounded,
        state.is_crouching,
        state.is_sliding,
        state.is_wall_running,
        state.planar_velocity,
        state.vertical_velocity,
    );

    output
}

fn update_crouch<G: GroundProbe + ?Sized>(
    state: &mut ActorKinematicState,
    config: &LocomotionConfig,
    input: &FrameInput,
    ground: &G,
    dt: f32,
) {
    let mut wants_crouch = input.crouch_held;
    // Ceiling lock
    if !wants_crouch && state.is_crouching && !ground.can_stand(input.position, config) {
        wants_crouch = true;
    }
    state.is_crouching = wants_crouch;

    let target = if state.is_crouching {
        config.crouch_height
    } else {
        config.stand_height
    };
    state.current_height = move_towards(
        state.current_height,
        target,
        config.crouch_transition_speed * dt,
    );
}

fn run_on_ground(
    state: &mut ActorKinematicState,
    config: &LocomotionConfig,
    wish_dir: Vec3,
    run_cap: f32,
    dt: f32,
) {
    let velocity = state.planar_velocity;
    let mut along = velocity.dot(wish_dir);
    let mut perp = velocity - wish_dir * along;

    let perp_speed = perp.length();
    if perp_speed > 0.0 {
        let reduced = (perp_speed - config.strafe_friction * dt).max(0.0);
        perp = perp / perp_speed * reduced;
    }

    if along < 0.0 {
        along = (along + config.ground_brake * dt).min(0.0);
    }
    // Never pull speed that is already above the cap back down
    if along < run_cap {
        along = (along + config.ground_accel * dt).min(run_cap);
    }

    state.planar_velocity = wish_dir * along + perp;
}

fn update_slide(
    state: &mut ActorKinematicState,
    config: &LocomotionConfig,
    wish_dir: Vec3,
    wish_mag: f32,
    dt: f32,
) {
    let speed = state.planar_speed();
    if speed * speed > MIN_STEER_SPEED_SQ && config.slide_friction > 0.0 {
        let reduced = (speed - config.slide_friction * dt).max(0.0);
        state.planar_velocity = state.planar_velocity / speed * reduced;
    }

    // Downhill pull: gravity projected onto the ground, horizontal part only
    let downhill = project_on_plane(Vec3::Y * config.gravity, state.ground_normal);
    state.planar_velocity += project_on_plane(downhill, Vec3::Y) * dt;

    let speed = state.planar_speed();
    if wish_mag > 0.0 && speed * speed > MIN_STEER_SPEED_SQ {
        let t = exp_blend(config.slide_turn_rate, dt);
        let dir = slerp_direction(state.planar_velocity / speed, wish_dir, t)
            .try_normalize()
            .unwrap_or(wish_dir);
        state.planar_velocity = dir * speed;
    }
}

fn air_move(
    state: &mut ActorKinematicState,
    config: &LocomotionConfig,
    wish_dir: Vec3,
    wish_mag: f32,
    run_cap: f32,
    dt: f32,
) {
    let speed = state.planar_speed();
    if speed * speed > MIN_AIR_SPEED_SQ && wish_mag > 0.0 && config.air_control > 0.0 {
        let t = exp_blend(config.air_turn_rate * config.air_control.clamp(0.0, 1.0), dt);
        let dir = slerp_direction(state.planar_velocity / speed, wish_dir, t)
            .try_normalize()
            .unwrap_or(wish_dir);
        state.planar_velocity = dir * speed;
    }

    if config.air_accel > 0.0 && wish_mag > 0.0 {
        let along = state.planar_velocity.dot(wish_dir);
        if along < run_cap {
            let perp = state.planar_velocity - wish_dir * along;
            let along = (along + config.air_accel * dt).min(run_cap);
            state.planar_velocity = wish_dir * along + perp;
        }
    }
}

fn stick_to_ground(state: &mut ActorKinematicState, config: &LocomotionConfig) {
    if state.vertical_velocity < 0.0 {
        state.vertical_velocity = config.ground_stick_velocity;
    }
}

fn ground_snap<G: GroundProbe + ?Sized>(
    config: &LocomotionConfig,
    input: &FrameInput,
    ground: &G,
) -> f32 {
    match ground.ground_snap(input.position, config.snap_distance, config) {
        Some(gap) if gap > 0.0 => gap.min(config.snap_distance),
        _ => 0.0,
    }
}

fn wall_probe_origin(config: &LocomotionConfig, input: &FrameInput) -> Vec3 {
    input.position + Vec3::Y * config.wall_check_height
}

/// Direction the actor prefers to run along a new wall.
fn tangent_preference(state: &ActorKinematicState, config: &LocomotionConfig, camera: Basis) -> Vec3 {
    if state.planar_speed() >= config.wall_tangent_min_speed {
        if let Some(dir) = flatten(state.planar_velocity) {
            return dir;
        }
    }
    // Camera basis already falls back to the actor basis
    camera.forward
}

fn try_start_wall_run<W: WallProbe + ?Sized>(
    state: &mut ActorKinematicState,
    config: &LocomotionConfig,
    input: &FrameInput,
    actor: Basis,
    camera: Basis,
    walls: &W,
) -> bool {
    let now = state.clock;
    if now < state.last_wall_run_end_time + f64::from(config.wall_run_cooldown) {
        return false;
    }

    let directions = wall_scan_directions(actor.forward, actor.right);
    let origin = wall_probe_origin(config, input);
    let Some(hit) = walls.wall(origin, &directions, config.wall_check_distance, config) else {
        return false;
    };

    let normal = hit.normal;
    let Some(mut tangent) = Vec3::Y.cross(normal).try_normalize() else {
        return false;
    };
    if tangent_preference(state, config, camera).dot(tangent) < 0.0 {
        tangent = -tangent;
    }

    state.wall_normal = normal;
    state.wall_tangent = tangent;
    state.is_wall_running = true;
    state.wall_run_start_time = now;
    debug!("wallrun start, normal {normal:?} tangent {tangent:?}");
    true
}

/// Keep running on the current wall. `Err` carries the reason to stop.
fn update_wall_run<W: WallProbe + ?Sized>(
    state: &mut ActorKinematicState,
    config: &LocomotionConfig,
    input: &FrameInput,
    walls: &W,
    dt: f32,
) -> Result<(), WallRunExit> {
    let now = state.clock;
    if config.wall_run_max_time > 0.0
        && now > state.wall_run_start_time + f64::from(config.wall_run_max_time)
    {
        return Err(WallRunExit::Timeout);
    }

    let origin = wall_probe_origin(config, input);
    let hit = walls
        .cast_wall(origin, -state.wall_normal, config.wall_follow_distance(), config)
        .ok_or(WallRunExit::LostWall)?;

    let new_normal = hit.normal;
    let mut new_tangent = Vec3::Y
        .cross(new_normal)
        .try_normalize()
        .ok_or(WallRunExit::LostWall)?;
    // Keep running the same way round
    if new_tangent.dot(state.wall_tangent) < 0.0 {
        new_tangent = -new_tangent;
    }

    state.wall_normal = slerp_direction(state.wall_normal, new_normal, config.wall_normal_blend)
        .try_normalize()
        .unwrap_or(new_normal);
    state.wall_tangent = new_tangent;

    // Only the direction changes; speed is preserved exactly
    let speed = state.planar_speed();
    if speed > MIN_ALIGN_SPEED {
        let t = exp_blend(config.wall_align_rate, dt);
        let dir = slerp_direction(state.planar_velocity / speed, state.wall_tangent, t)
            .try_normalize()
            .unwrap_or(state.wall_tangent);
        state.planar_velocity = dir * speed;
    }

    state.vertical_velocity += config.gravity * config.wall_gravity_scale * dt;

    if state.jump_buffered(config) {
        let launch = state.wall_normal * config.wall_jump_away
            + state.wall_tangent * config.wall_jump_forward;
        state.vertical_velocity = config.wall_jump_up;
        state.planar_velocity = project_on_plane(state.planar_velocity + launch, Vec3::Y);
        state.last_jump_requested_time = NEVER;
        return Err(WallRunExit::WallJump);
    }

    Ok(())
}

fn end_wall_run(state: &mut ActorKinematicState, output: &mut StepOutput, exit: WallRunExit) {
    state.is_wall_running = false;
    state.last_wall_run_end_time = state.clock;
    output.wall_run_exit = Some(exit);
    debug!("wallrun exit: {exit:?}");
}

fn camera_roll_target(
    state: &ActorKinematicState,
    config: &LocomotionConfig,
    input: &FrameInput,
) -> f32 {
    if state.is_wall_running {
        // Positive when the wall is on the camera's right
        (-state.wall_normal).dot(input.camera_right).signum() * config.camera_tilt_on_wall
    } else if state.is_sliding {
        config.camera_tilt_on_slide * config.slide_tilt_fraction
    } else {
        0.0
    }
}

//! Kinematic state and state marker components.
//!
//! [`ActorKinematicState`] is the single source of truth and is only mutated
//! by [`step`](crate::motor::step). The marker components are mirrors that
//! the plugin keeps in sync so that gameplay systems can filter queries with
//! `With<Sliding>`, `Option<&WallRunning>` and so on.

use bevy::prelude::*;

use crate::config::LocomotionConfig;
use crate::motor::{StepOutput, WallRunExit};

/// Timestamp meaning "never happened".
pub const NEVER: f64 = f64::NEG_INFINITY;

/// Per-actor locomotion state.
///
/// Invariants maintained by the step:
/// - `is_sliding` implies `is_grounded && is_crouching`
/// - `is_wall_running` implies `!is_grounded`
/// - `planar_velocity.y == 0`
#[derive(Component, Reflect, Debug, Clone, PartialEq)]
#[reflect(Component)]
pub struct ActorKinematicState {
    /// Horizontal velocity (world XZ plane, `y` is always zero).
    pub planar_velocity: Vec3,
    /// Vertical velocity along world up.
    pub vertical_velocity: f32,

    // === Flags ===
    pub is_grounded: bool,
    pub is_crouching: bool,
    pub is_sliding: bool,
    pub is_wall_running: bool,
    /// Sprint latch. Only updated while grounded.
    pub sprint_active: bool,

    // === Surfaces ===
    /// Ground normal, valid while grounded.
    pub ground_normal: Vec3,
    /// Wall normal, valid while wallrunning.
    pub wall_normal: Vec3,
    /// Direction of travel along the wall, valid while wallrunning.
    pub wall_tangent: Vec3,

    // === Clock ===
    /// Monotonic simulation clock in seconds.
    pub clock: f64,
    pub last_grounded_time: f64,
    pub last_jump_requested_time: f64,
    pub wall_run_start_time: f64,
    pub last_wall_run_end_time: f64,

    /// Current collider height, between crouch and stand height.
    pub current_height: f32,
}

impl Default for ActorKinematicState {
    fn default() -> Self {
        Self::new(&LocomotionConfig::default())
    }
}

impl ActorKinematicState {
    /// Fresh state for an actor spawned at rest, standing, with unknown ground.
    pub fn new(config: &LocomotionConfig) -> Self {
        Self {
            planar_velocity: Vec3::ZERO,
            vertical_velocity: 0.0,
            is_grounded: false,
            is_crouching: false,
            is_sliding: false,
            is_wall_running: false,
            sprint_active: false,
            ground_normal: Vec3::Y,
            wall_normal: Vec3::ZERO,
            wall_tangent: Vec3::ZERO,
            clock: 0.0,
            last_grounded_time: NEVER,
            last_jump_requested_time: NEVER,
            wall_run_start_time: NEVER,
            last_wall_run_end_time: NEVER,
            current_height: config.stand_height,
        }
    }

    /// Horizontal speed.
    #[inline]
    pub fn planar_speed(&self) -> f32 {
        self.planar_velocity.length()
    }

    /// Full velocity vector.
    #[inline]
    pub fn velocity(&self) -> Vec3 {
        self.planar_velocity + Vec3::Y * self.vertical_velocity
    }

    /// Height of the collider centre above the feet. Feet stay planted while
    /// the height changes, so only the centre moves.
    #[inline]
    pub fn center_offset(&self) -> f32 {
        self.current_height * 0.5
    }

    /// Whether a jump press is still waiting to be consumed at `clock`.
    #[inline]
    pub fn jump_buffered(&self, config: &LocomotionConfig) -> bool {
        self.clock - self.last_jump_requested_time <= f64::from(config.jump_buffer)
    }

    /// Whether the actor is within coyote time of its last ground contact.
    #[inline]
    pub fn within_coyote_time(&self, config: &LocomotionConfig) -> bool {
        self.clock - self.last_grounded_time <= f64::from(config.coyote_time)
    }

    /// Seconds spent in the current wallrun, or zero when not wallrunning.
    pub fn wall_run_elapsed(&self) -> f64 {
        if self.is_wall_running {
            self.clock - self.wall_run_start_time
        } else {
            0.0
        }
    }
}

/// Output of the most recent step, kept on the actor for presentation.
#[derive(Component, Reflect, Debug, Clone, Copy, Default, PartialEq)]
#[reflect(Component)]
pub struct LocomotionOutput {
    /// Intended displacement for the step (before collision resolution).
    pub displacement: Vec3,
    /// Displacement the backend actually applied.
    pub applied_displacement: Vec3,
    /// Camera roll target in degrees.
    pub camera_roll_target: f32,
    /// A ground or coyote jump was consumed.
    pub jumped: bool,
    /// A wall jump was performed.
    pub wall_jumped: bool,
    /// Downward snap included in `displacement`.
    pub ground_snap: f32,
    /// A wallrun started during the step.
    pub wall_run_started: bool,
    /// A wallrun ended during the step, and why.
    pub wall_run_exit: Option<WallRunExit>,
}

impl LocomotionOutput {
    /// Record a step together with the displacement the backend applied.
    pub fn from_step(step: &StepOutput, applied_displacement: Vec3) -> Self {
        Self {
            displacement: step.displacement,
            applied_displacement,
            camera_roll_target: step.camera_roll_target,
            jumped: step.jumped,
            wall_jumped: step.wall_jumped,
            ground_snap: step.ground_snap,
            wall_run_started: step.wall_run_started,
            wall_run_exit: step.wall_run_exit,
        }
    }
}

/// Marker: the actor is on walkable ground.
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct Grounded;

/// Marker: the actor is not on the ground. Mutually exclusive with [`Grounded`].
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct Airborne;

/// Marker: the actor is crouched (possibly forced by a low ceiling).
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct Crouching;

/// Marker: the actor is sliding.
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct Sliding;

/// Marker: the actor is wallrunning along a surface.
#[derive(Component, Reflect, Debug, Clone, Copy)]
#[reflect(Component)]
pub struct WallRunning {
    /// Normal of the wall being run on.
    pub normal: Vec3,
    /// Direction of travel along the wall.
    pub tangent: Vec3,
}

impl Default for WallRunning {
    fn default() -> Self {
        Self {
            normal: Vec3::NEG_X,
            tangent: Vec3::NEG_Z,
        }
    }
}

impl WallRunning {
    /// Create a wallrun marker.
    pub fn new(normal: Vec3, tangent: Vec3) -> Self {
        Self { normal, tangent }
    }

    /// Whether the wall is on the right of a viewer with the given right vector.
    pub fn is_right_of(&self, right: Vec3) -> bool {
        (-self.normal).dot(right) > 0.0
    }
}

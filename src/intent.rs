//! Movement intent and per-step input.
//!
//! [`LocomotionIntent`] is the component your input code writes every frame.
//! [`FrameInput`] is the plain-data snapshot the step consumes; the plugin
//! builds one per actor per fixed tick.

use bevy::prelude::*;

/// Desired movement written by player input or AI.
///
/// # Example
///
/// ```rust
/// use bevy::prelude::*;
/// use fps_locomotion::prelude::*;
///
/// let mut intent = LocomotionIntent::default();
/// intent.set_move(Vec2::new(0.0, 1.0));
/// intent.set_jump_held(true);
/// assert!(intent.take_jump_press());
/// // Holding the button does not repeat the press
/// assert!(!intent.take_jump_press());
/// ```
#[derive(Component, Reflect, Debug, Clone, Copy, Default, PartialEq)]
#[reflect(Component)]
pub struct LocomotionIntent {
    /// Movement stick/keys: `x` = strafe right, `y` = forward. Clamped to length 1.
    pub move_input: Vec2,
    /// Sprint button held.
    pub sprint_held: bool,
    /// Crouch button held.
    pub crouch_held: bool,
    /// Jump button held. A press is the false → true transition.
    pub jump_held: bool,
    /// Previous `jump_held` seen by the controller (for edge detection).
    pub(crate) jump_held_prev: bool,
    /// A press delivered as a one-shot event, consumed by the next step.
    pub(crate) jump_queued: bool,
}

impl LocomotionIntent {
    /// Set the movement input, clamping its length to 1.
    pub fn set_move(&mut self, input: Vec2) {
        self.move_input = input.clamp_length_max(1.0);
    }

    /// Clear movement input.
    pub fn clear_move(&mut self) {
        self.move_input = Vec2::ZERO;
    }

    /// Set sprint held state.
    pub fn set_sprint_held(&mut self, held: bool) {
        self.sprint_held = held;
    }

    /// Set crouch held state.
    pub fn set_crouch_held(&mut self, held: bool) {
        self.crouch_held = held;
    }

    /// Set the jump button level. Call every frame with the current state.
    pub fn set_jump_held(&mut self, held: bool) {
        self.jump_held = held;
    }

    /// Register a jump press from an event-style input source.
    pub fn queue_jump(&mut self) {
        self.jump_queued = true;
    }

    /// Whether there is movement input.
    pub fn is_moving(&self) -> bool {
        self.move_input.length_squared() > 1.0e-6
    }

    /// Consume the jump press edge for this step.
    pub fn take_jump_press(&mut self) -> bool {
        let pressed = (self.jump_held && !self.jump_held_prev) || self.jump_queued;
        self.jump_held_prev = self.jump_held;
        self.jump_queued = false;
        pressed
    }
}

/// Everything the step needs from outside besides probes.
///
/// The caller resolves the camera and actor bases from its own scene graph;
/// the step never reads transforms.
#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub struct FrameInput {
    /// `x` = strafe, `y` = forward. Magnitude is clamped to 1 by the step.
    pub move_input: Vec2,
    pub sprint_held: bool,
    pub crouch_held: bool,
    /// Jump pressed this step (edge, not level).
    pub jump_pressed: bool,
    /// Camera forward in world space. Need not be planar.
    pub camera_forward: Vec3,
    /// Camera right in world space. Need not be planar.
    pub camera_right: Vec3,
    /// Actor body forward, used for wall scans and as a fallback direction.
    pub actor_forward: Vec3,
    /// Actor body right.
    pub actor_right: Vec3,
    /// Actor feet position in world space.
    pub position: Vec3,
    /// Step duration in seconds.
    pub dt: f32,
}

impl Default for FrameInput {
    fn default() -> Self {
        Self::new(1.0 / 60.0)
    }
}

impl FrameInput {
    /// Empty input at the origin, looking down `-Z`.
    pub fn new(dt: f32) -> Self {
        Self {
            move_input: Vec2::ZERO,
            sprint_held: false,
            crouch_held: false,
            jump_pressed: false,
            camera_forward: Vec3::NEG_Z,
            camera_right: Vec3::X,
            actor_forward: Vec3::NEG_Z,
            actor_right: Vec3::X,
            position: Vec3::ZERO,
            dt,
        }
    }

    /// Builder: set movement input.
    pub fn with_move(mut self, input: Vec2) -> Self {
        self.move_input = input;
        self
    }

    /// Builder: set sprint and crouch held states.
    pub fn with_buttons(mut self, sprint_held: bool, crouch_held: bool) -> Self {
        self.sprint_held = sprint_held;
        self.crouch_held = crouch_held;
        self
    }

    /// Builder: press jump this step.
    pub fn with_jump(mut self) -> Self {
        self.jump_pressed = true;
        self
    }

    /// Builder: set camera basis.
    pub fn with_camera(mut self, forward: Vec3, right: Vec3) -> Self {
        self.camera_forward = forward;
        self.camera_right = right;
        self
    }

    /// Builder: set actor basis.
    pub fn with_actor_basis(mut self, forward: Vec3, right: Vec3) -> Self {
        self.actor_forward = forward;
        self.actor_right = right;
        self
    }

    /// Builder: set feet position.
    pub fn at(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_move_clamps_length() {
        let mut intent = LocomotionIntent::default();
        intent.set_move(Vec2::new(1.0, 1.0));
        assert!((intent.move_input.length() - 1.0).abs() < 1e-5);

        intent.set_move(Vec2::new(0.0, 0.5));
        assert_eq!(intent.move_input, Vec2::new(0.0, 0.5));
    }

    #[test]
    fn jump_press_is_an_edge() {
        let mut intent = LocomotionIntent::default();
        assert!(!intent.take_jump_press());

        intent.set_jump_held(true);
        assert!(intent.take_jump_press());
        assert!(!intent.take_jump_press());

        intent.set_jump_held(false);
        assert!(!intent.take_jump_press());

        intent.set_jump_held(true);
        assert!(intent.take_jump_press());
    }

    #[test]
    fn queued_jump_fires_once() {
        let mut intent = LocomotionIntent::default();
        intent.queue_jump();
        assert!(intent.take_jump_press());
        assert!(!intent.take_jump_press());
    }

    #[test]
    fn is_moving_threshold() {
        let mut intent = LocomotionIntent::default();
        assert!(!intent.is_moving());
        intent.set_move(Vec2::new(0.1, 0.0));
        assert!(intent.is_moving());
        intent.clear_move();
        assert!(!intent.is_moving());
    }

    #[test]
    fn frame_input_builders() {
        let input = FrameInput::new(0.1)
            .with_move(Vec2::Y)
            .with_buttons(true, false)
            .with_jump()
            .at(Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(input.dt, 0.1);
        assert!(input.sprint_held);
        assert!(!input.crouch_held);
        assert!(input.jump_pressed);
        assert_eq!(input.position, Vec3::new(1.0, 2.0, 3.0));
    }
}

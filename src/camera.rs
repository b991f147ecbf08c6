//! First-person camera look with smoothed roll and crouch eye height.
//!
//! The step only emits a roll *target*. [`CameraLook`] owns the smoothing so
//! that presentation can run at frame rate while the step runs fixed.

use bevy::prelude::*;

use crate::config::LocomotionConfig;
use crate::math::exp_blend;

/// Look angles and presentation smoothing for a first-person camera.
///
/// Attach to the actor. A child entity carrying [`FirstPersonCamera`] gets
/// pitch, roll and eye height applied; the actor itself gets yaw.
/// Angles are in degrees.
#[derive(Component, Reflect, Debug, Clone, Copy, PartialEq)]
#[reflect(Component)]
pub struct CameraLook {
    pub yaw: f32,
    pub pitch: f32,
    /// Current, smoothed roll.
    pub roll: f32,
    /// Roll the camera is easing toward.
    pub roll_target: f32,

    // === Sensitivity ===
    /// Degrees per mouse count.
    pub mouse_sensitivity: f32,
    /// Gamepad look scale, multiplied by `100 * dt`.
    pub gamepad_sensitivity: f32,
    /// Per-axis clamp on a single frame's mouse delta.
    pub mouse_delta_clamp: f32,

    // === Limits ===
    pub min_pitch: f32,
    pub max_pitch: f32,

    // === Smoothing ===
    /// Roll smoothing rate (1/s).
    pub roll_smooth: f32,
    /// Current vertical eye offset from the standing eye position.
    pub eye_offset: f32,
}

impl Default for CameraLook {
    fn default() -> Self {
        Self {
            yaw: 0.0,
            pitch: 0.0,
            roll: 0.0,
            roll_target: 0.0,
            mouse_sensitivity: 1.5,
            gamepad_sensitivity: 3.0,
            mouse_delta_clamp: 500.0,
            min_pitch: -80.0,
            max_pitch: 80.0,
            roll_smooth: 14.0,
            eye_offset: 0.0,
        }
    }
}

impl CameraLook {
    /// Builder: set mouse and gamepad sensitivity.
    pub fn with_sensitivity(mut self, mouse: f32, gamepad: f32) -> Self {
        self.mouse_sensitivity = mouse;
        self.gamepad_sensitivity = gamepad;
        self
    }

    /// Builder: set the pitch limits.
    pub fn with_pitch_limits(mut self, min: f32, max: f32) -> Self {
        self.min_pitch = min;
        self.max_pitch = max;
        self
    }

    /// Set the roll target in degrees.
    pub fn set_roll_target(&mut self, degrees: f32) {
        self.roll_target = degrees;
    }

    /// Apply a look delta without touching roll.
    ///
    /// `delta.x` turns right, `delta.y` pitches up. Mouse deltas are frame
    /// based and clamped; gamepad deltas are rates and get scaled by `dt`.
    /// Use this together with the plugin, which smooths roll itself.
    pub fn add_look(&mut self, delta: Vec2, from_mouse: bool, dt: f32) {
        let delta = if from_mouse {
            let clamp = self.mouse_delta_clamp;
            delta.clamp(Vec2::splat(-clamp), Vec2::splat(clamp)) * self.mouse_sensitivity
        } else {
            delta * (self.gamepad_sensitivity * 100.0 * dt)
        };

        self.yaw += delta.x;
        self.pitch = (self.pitch + delta.y).clamp(self.min_pitch, self.max_pitch);
    }

    /// Apply a look delta and advance roll smoothing, for use without the plugin.
    pub fn tick_look(&mut self, delta: Vec2, from_mouse: bool, dt: f32) {
        self.add_look(delta, from_mouse, dt);
        self.tick_roll(dt);
    }

    /// Ease roll toward its target.
    pub fn tick_roll(&mut self, dt: f32) {
        let t = exp_blend(self.roll_smooth, dt.max(0.0));
        self.roll += (self.roll_target - self.roll) * t;
    }

    /// Ease the eye offset toward the crouched or standing position.
    pub fn tick_eye_height(&mut self, crouching: bool, config: &LocomotionConfig, dt: f32) {
        let target = if crouching {
            config.crouch_camera_offset
        } else {
            0.0
        };
        let t = exp_blend(config.crouch_camera_smooth, dt.max(0.0));
        self.eye_offset += (target - self.eye_offset) * t;
    }

    /// Camera rotation: yaw about up, then pitch, then roll.
    ///
    /// Positive yaw turns right and positive roll tilts the top of the view
    /// to the right.
    pub fn rotation(&self) -> Quat {
        Quat::from_euler(
            EulerRot::YXZ,
            -self.yaw.to_radians(),
            self.pitch.to_radians(),
            -self.roll.to_radians(),
        )
    }

    /// Yaw-only rotation, for the actor body.
    pub fn body_rotation(&self) -> Quat {
        Quat::from_rotation_y(-self.yaw.to_radians())
    }

    /// Pitch and roll only, for a camera parented to the yawed actor.
    pub fn head_rotation(&self) -> Quat {
        Quat::from_euler(
            EulerRot::YXZ,
            0.0,
            self.pitch.to_radians(),
            -self.roll.to_radians(),
        )
    }

    /// Camera forward and right vectors in world space.
    pub fn forward_right(&self) -> (Vec3, Vec3) {
        let rotation = self.rotation();
        (rotation * Vec3::NEG_Z, rotation * Vec3::X)
    }
}

/// Marks the camera entity of a first-person actor.
///
/// Must be a child of an entity with [`CameraLook`]. Its local transform is
/// overwritten every frame.
#[derive(Component, Reflect, Debug, Clone, Copy, PartialEq)]
#[reflect(Component)]
pub struct FirstPersonCamera {
    /// Standing eye height above the actor origin.
    pub eye_height: f32,
}

impl Default for FirstPersonCamera {
    fn default() -> Self {
        Self { eye_height: 1.6 }
    }
}

impl FirstPersonCamera {
    pub fn new(eye_height: f32) -> Self {
        Self { eye_height }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn mouse_delta_is_clamped_and_scaled() {
        let mut look = CameraLook::default();
        look.tick_look(Vec2::new(1000.0, 0.0), true, 1.0 / 60.0);
        assert_abs_diff_eq!(look.yaw, 500.0 * 1.5);
    }

    #[test]
    fn gamepad_delta_scales_with_dt() {
        let mut look = CameraLook::default();
        look.tick_look(Vec2::new(1.0, 0.0), false, 0.5);
        assert_abs_diff_eq!(look.yaw, 3.0 * 100.0 * 0.5, epsilon = 1e-4);
    }

    #[test]
    fn pitch_is_clamped() {
        let mut look = CameraLook::default();
        look.tick_look(Vec2::new(0.0, 200.0), true, 0.016);
        assert_eq!(look.pitch, 80.0);
        look.tick_look(Vec2::new(0.0, -500.0), true, 0.016);
        assert_eq!(look.pitch, -80.0);
    }

    #[test]
    fn builders_set_sensitivity_and_limits() {
        let mut look = CameraLook::default()
            .with_sensitivity(2.0, 1.0)
            .with_pitch_limits(-30.0, 45.0);
        look.add_look(Vec2::new(10.0, 100.0), true, 0.016);
        assert_eq!(look.yaw, 20.0);
        assert_eq!(look.pitch, 45.0);

        look.add_look(Vec2::new(0.0, -1.0), false, 1.0);
        assert_eq!(look.pitch, -30.0);
    }

    #[test]
    fn roll_eases_toward_target() {
        let mut look = CameraLook::default();
        look.set_roll_target(10.0);
        look.tick_roll(0.01);
        assert!(look.roll > 0.0 && look.roll < 10.0);
        for _ in 0..200 {
            look.tick_roll(0.016);
        }
        assert_abs_diff_eq!(look.roll, 10.0, epsilon = 1e-3);
    }

    #[test]
    fn eye_height_follows_crouch() {
        let config = LocomotionConfig::default();
        let mut look = CameraLook::default();
        for _ in 0..200 {
            look.tick_eye_height(true, &config, 0.016);
        }
        assert_abs_diff_eq!(look.eye_offset, config.crouch_camera_offset, epsilon = 1e-3);
        for _ in 0..200 {
            look.tick_eye_height(false, &config, 0.016);
        }
        assert_abs_diff_eq!(look.eye_offset, 0.0, epsilon = 1e-3);
    }

    #[test]
    fn forward_right_follow_yaw() {
        let mut look = CameraLook::default();
        let (forward, right) = look.forward_right();
        assert_abs_diff_eq!(forward.z, -1.0, epsilon = 1e-5);
        assert_abs_diff_eq!(right.x, 1.0, epsilon = 1e-5);

        // Turning right by 90 degrees faces +X
        look.yaw = 90.0;
        let (forward, right) = look.forward_right();
        assert_abs_diff_eq!(forward.x, 1.0, epsilon = 1e-5);
        assert_abs_diff_eq!(right.z, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn add_look_leaves_roll_alone() {
        let mut look = CameraLook::default();
        look.set_roll_target(10.0);
        look.add_look(Vec2::new(1.0, 1.0), true, 0.1);
        assert_eq!(look.roll, 0.0);
        look.tick_look(Vec2::ZERO, true, 0.1);
        assert!(look.roll > 0.0);
    }

    #[test]
    fn head_and_body_compose_to_full_rotation() {
        let look = CameraLook {
            yaw: 30.0,
            pitch: -20.0,
            roll: 5.0,
            ..default()
        };
        let composed = look.body_rotation() * look.head_rotation();
        assert!(composed.angle_between(look.rotation()) < 1e-4);
    }

    #[test]
    fn positive_roll_tilts_view_right() {
        let look = CameraLook {
            roll: 10.0,
            ..default()
        };
        let up = look.rotation() * Vec3::Y;
        assert!(up.x > 0.0);
    }
}

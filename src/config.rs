//! Locomotion configuration component.
//!
//! Every tunable constant used by the step lives here. The step itself
//! contains no magic numbers; defaults reproduce a fast-paced FPS feel.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced when validating or loading a [`LocomotionConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A field holds NaN or infinity.
    #[error("`{field}` must be finite, got {value}")]
    NonFinite { field: &'static str, value: f32 },

    /// A field that must be strictly positive is zero or negative.
    #[error("`{field}` must be greater than zero, got {value}")]
    NotPositive { field: &'static str, value: f32 },

    /// A rate, window or distance is negative.
    #[error("`{field}` must not be negative, got {value}")]
    Negative { field: &'static str, value: f32 },

    /// A blend factor or scale is outside `[0, 1]`.
    #[error("`{field}` must be within [0, 1], got {value}")]
    OutOfUnitRange { field: &'static str, value: f32 },

    /// Gravity must pull down (negative Y).
    #[error("gravity must be negative, got {0}")]
    GravityNotDownward(f32),

    /// Crouching must actually lower the actor.
    #[error("crouch height {crouch} must be below stand height {stand}")]
    CrouchNotBelowStand { crouch: f32, stand: f32 },

    /// The crouched capsule must still fit its own radius.
    #[error("crouch height {crouch} must be at least twice the radius {radius}")]
    CrouchBelowDiameter { crouch: f32, radius: f32 },

    /// The slide would end before it could start.
    #[error("slide end speed {end} must not exceed slide min speed {min}")]
    SlideThresholds { min: f32, end: f32 },

    /// RON source could not be parsed.
    #[error("failed to parse locomotion config: {0}")]
    Parse(#[from] ron::error::SpannedError),
}

/// Tunables for one actor's locomotion.
///
/// Speeds are in units/second, accelerations in units/second², times in
/// seconds, angles in radians and camera tilts in degrees.
#[derive(Component, Reflect, Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[reflect(Component)]
#[serde(default)]
pub struct LocomotionConfig {
    // === Run Speeds ===
    /// Speed cap while walking.
    pub walk_speed: f32,
    /// Speed cap while the sprint latch is active.
    pub sprint_speed: f32,
    /// Speed cap while crouched.
    pub crouch_speed: f32,

    // === Ground Responsiveness ===
    /// Acceleration toward the speed cap along the wish direction.
    pub ground_accel: f32,
    /// Deceleration applied when moving against the wish direction.
    pub ground_brake: f32,
    /// Linear decay of velocity perpendicular to the wish direction.
    pub strafe_friction: f32,
    /// Linear decay toward rest when there is no movement input.
    pub ground_decel_no_input: f32,
    /// Vertical velocity that keeps a grounded actor pressed onto slopes.
    pub ground_stick_velocity: f32,

    // === Air Control ===
    /// Fraction of `air_turn_rate` available in the air (0..1).
    pub air_control: f32,
    /// How fast the velocity direction turns toward intent in the air (1/s).
    pub air_turn_rate: f32,
    /// Optional airborne acceleration along intent. Usually zero.
    pub air_accel: f32,

    // === Jump & Gravity ===
    /// Apex height of a grounded jump.
    pub jump_height: f32,
    /// Vertical gravity acceleration (negative = down).
    pub gravity: f32,
    /// Grace period after leaving the ground during which a jump is allowed.
    pub coyote_time: f32,
    /// How long a jump press stays buffered.
    pub jump_buffer: f32,

    // === Body & Ground Check ===
    /// Standing collider height.
    pub stand_height: f32,
    /// Collider radius.
    pub radius: f32,
    /// Radius of the ground check sphere.
    pub probe_radius: f32,
    /// Length of the downward ground check.
    pub probe_ray: f32,
    /// Maximum downward ground snap per step.
    pub snap_distance: f32,
    /// Steepest walkable slope.
    pub slope_limit: f32,
    /// Extra allowance added to `slope_limit` when classifying surfaces.
    pub slope_tolerance: f32,

    // === Crouch ===
    /// Crouched collider height.
    pub crouch_height: f32,
    /// Linear height change rate while crouching or standing up.
    pub crouch_transition_speed: f32,
    /// Eye offset applied while crouched (negative = lower).
    pub crouch_camera_offset: f32,
    /// Smoothing rate of the eye offset (1/s).
    pub crouch_camera_smooth: f32,

    // === Slide ===
    /// Planar speed needed to start a slide.
    pub slide_min_speed: f32,
    /// Slide ends at or below this planar speed.
    pub slide_end_speed: f32,
    /// Linear speed decay while sliding on flat ground.
    pub slide_friction: f32,
    /// How fast intent can steer a slide (1/s).
    pub slide_turn_rate: f32,
    /// Camera roll while sliding, in degrees.
    pub camera_tilt_on_slide: f32,
    /// Fraction of `camera_tilt_on_slide` actually requested.
    pub slide_tilt_fraction: f32,

    // === Wallrun ===
    /// Reach of the wall scan.
    pub wall_check_distance: f32,
    /// Height above the feet the wall scan originates from.
    pub wall_check_height: f32,
    /// Extra reach when re-validating contact with the current wall.
    pub wall_follow_margin: f32,
    /// Surfaces whose normal is within this angle of up are not walls.
    pub wall_floor_angle: f32,
    /// Gravity multiplier while wallrunning (0..1).
    pub wall_gravity_scale: f32,
    /// Maximum wallrun duration. Zero means unlimited.
    pub wall_run_max_time: f32,
    /// Time after a wallrun ends before another may start.
    pub wall_run_cooldown: f32,
    /// Vertical launch speed of a wall jump.
    pub wall_jump_up: f32,
    /// Impulse away from the wall on a wall jump.
    pub wall_jump_away: f32,
    /// Impulse along the wall tangent on a wall jump.
    pub wall_jump_forward: f32,
    /// How fast planar velocity aligns with the wall tangent (1/s).
    pub wall_align_rate: f32,
    /// Fixed per-step blend toward a freshly sampled wall normal (0..1).
    pub wall_normal_blend: f32,
    /// Below this planar speed the tangent sign follows the camera instead.
    pub wall_tangent_min_speed: f32,
    /// Camera roll toward the wall while wallrunning, in degrees. Zero disables.
    pub camera_tilt_on_wall: f32,
}

impl Default for LocomotionConfig {
    fn default() -> Self {
        Self {
            // Run speeds
            walk_speed: 5.0,
            sprint_speed: 8.0,
            crouch_speed: 3.0,

            // Ground responsiveness
            ground_accel: 80.0,
            ground_brake: 140.0,
            strafe_friction: 60.0,
            ground_decel_no_input: 28.0,
            ground_stick_velocity: -2.0,

            // Air control
            air_control: 0.65,
            air_turn_rate: 12.0,
            air_accel: 0.0,

            // Jump & gravity
            jump_height: 1.35,
            gravity: -22.0,
            coyote_time: 0.12,
            jump_buffer: 0.12,

            // Body & ground check
            stand_height: 2.0,
            radius: 0.5,
            probe_radius: 0.28,
            probe_ray: 0.2,
            snap_distance: 0.08,
            slope_limit: 45.0_f32.to_radians(),
            slope_tolerance: 0.5_f32.to_radians(),

            // Crouch
            crouch_height: 1.2,
            crouch_transition_speed: 6.0,
            crouch_camera_offset: -0.5,
            crouch_camera_smooth: 12.0,

            // Slide
            slide_min_speed: 6.0,
            slide_end_speed: 3.5,
            slide_friction: 5.0,
            slide_turn_rate: 6.0,
            camera_tilt_on_slide: 5.0,
            slide_tilt_fraction: 0.8,

            // Wallrun
            wall_check_distance: 0.9,
            wall_check_height: 0.9,
            wall_follow_margin: 0.15,
            wall_floor_angle: 15.0_f32.to_radians(),
            wall_gravity_scale: 0.25,
            wall_run_max_time: 3.0,
            wall_run_cooldown: 0.15,
            wall_jump_up: 7.5,
            wall_jump_away: 6.0,
            wall_jump_forward: 4.0,
            wall_align_rate: 10.0,
            wall_normal_blend: 0.5,
            wall_tangent_min_speed: 0.1,
            camera_tilt_on_wall: 10.0,
        }
    }
}

impl LocomotionConfig {
    /// Config tuned for a player-controlled actor (the defaults).
    pub fn player() -> Self {
        Self::default()
    }

    /// Config for AI-driven actors: no sprint boost, weaker air control, no camera tilt.
    pub fn bot() -> Self {
        Self {
            sprint_speed: 5.0,
            air_control: 0.3,
            camera_tilt_on_wall: 0.0,
            camera_tilt_on_slide: 0.0,
            ..default()
        }
    }

    /// Parse a config from RON. Missing fields take their default value.
    pub fn from_ron(source: &str) -> Result<Self, ConfigError> {
        let config: Self = ron::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Consume the config, returning it only if it passes [`validate`](Self::validate).
    pub fn validated(self) -> Result<Self, ConfigError> {
        self.validate()?;
        Ok(self)
    }

    /// Check the config for values the step cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in self.fields() {
            if !value.is_finite() {
                return Err(ConfigError::NonFinite { field, value });
            }
        }

        for (field, value) in [
            ("walk_speed", self.walk_speed),
            ("sprint_speed", self.sprint_speed),
            ("crouch_speed", self.crouch_speed),
            ("jump_height", self.jump_height),
            ("stand_height", self.stand_height),
            ("crouch_height", self.crouch_height),
            ("radius", self.radius),
        ] {
            if value <= 0.0 {
                return Err(ConfigError::NotPositive { field, value });
            }
        }

        for (field, value) in [
            ("ground_accel", self.ground_accel),
            ("ground_brake", self.ground_brake),
            ("strafe_friction", self.strafe_friction),
            ("ground_decel_no_input", self.ground_decel_no_input),
            ("air_turn_rate", self.air_turn_rate),
            ("air_accel", self.air_accel),
            ("coyote_time", self.coyote_time),
            ("jump_buffer", self.jump_buffer),
            ("probe_radius", self.probe_radius),
            ("probe_ray", self.probe_ray),
            ("snap_distance", self.snap_distance),
            ("slope_limit", self.slope_limit),
            ("slope_tolerance", self.slope_tolerance),
            ("crouch_transition_speed", self.crouch_transition_speed),
            ("crouch_camera_smooth", self.crouch_camera_smooth),
            ("slide_min_speed", self.slide_min_speed),
            ("slide_end_speed", self.slide_end_speed),
            ("slide_friction", self.slide_friction),
            ("slide_turn_rate", self.slide_turn_rate),
            ("wall_check_distance", self.wall_check_distance),
            ("wall_follow_margin", self.wall_follow_margin),
            ("wall_floor_angle", self.wall_floor_angle),
            ("wall_run_max_time", self.wall_run_max_time),
            ("wall_run_cooldown", self.wall_run_cooldown),
            ("wall_align_rate", self.wall_align_rate),
            ("wall_tangent_min_speed", self.wall_tangent_min_speed),
        ] {
            if value < 0.0 {
                return Err(ConfigError::Negative { field, value });
            }
        }

        for (field, value) in [
            ("air_control", self.air_control),
            ("wall_gravity_scale", self.wall_gravity_scale),
            ("wall_normal_blend", self.wall_normal_blend),
            ("slide_tilt_fraction", self.slide_tilt_fraction),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::OutOfUnitRange { field, value });
            }
        }

        if self.gravity >= 0.0 {
            return Err(ConfigError::GravityNotDownward(self.gravity));
        }
        if self.crouch_height >= self.stand_height {
            return Err(ConfigError::CrouchNotBelowStand {
                crouch: self.crouch_height,
                stand: self.stand_height,
            });
        }
        if self.crouch_height < self.radius * 2.0 {
            return Err(ConfigError::CrouchBelowDiameter {
                crouch: self.crouch_height,
                radius: self.radius,
            });
        }
        if self.slide_end_speed > self.slide_min_speed {
            return Err(ConfigError::SlideThresholds {
                min: self.slide_min_speed,
                end: self.slide_end_speed,
            });
        }
        Ok(())
    }

    /// Initial vertical speed of a grounded jump: `sqrt(-2 * gravity * jump_height)`.
    #[inline]
    pub fn jump_velocity(&self) -> f32 {
        (-2.0 * self.gravity * self.jump_height).max(0.0).sqrt()
    }

    /// Base speed cap for the current posture, before scaling by intent magnitude.
    #[inline]
    pub fn speed_cap(&self, crouching: bool, sprinting: bool) -> f32 {
        if crouching {
            self.crouch_speed
        } else if sprinting {
            self.sprint_speed
        } else {
            self.walk_speed
        }
    }

    /// Reach of the probe that re-validates the current wall.
    #[inline]
    pub fn wall_follow_distance(&self) -> f32 {
        self.wall_check_distance + self.wall_follow_margin
    }

    /// Steepest surface still classified as ground.
    #[inline]
    pub fn walkable_angle(&self) -> f32 {
        self.slope_limit + self.slope_tolerance
    }

    /// Builder: set run speed caps.
    pub fn with_speeds(mut self, walk: f32, sprint: f32, crouch: f32) -> Self {
        self.walk_speed = walk;
        self.sprint_speed = sprint;
        self.crouch_speed = crouch;
        self
    }

    /// Builder: set ground acceleration and braking.
    pub fn with_ground_accel(mut self, accel: f32, brake: f32) -> Self {
        self.ground_accel = accel;
        self.ground_brake = brake;
        self
    }

    /// Builder: set jump apex height and gravity.
    pub fn with_jump(mut self, height: f32, gravity: f32) -> Self {
        self.jump_height = height;
        self.gravity = gravity;
        self
    }

    /// Builder: set coyote time.
    pub fn with_coyote_time(mut self, time: f32) -> Self {
        self.coyote_time = time;
        self
    }

    /// Builder: set jump buffer window.
    pub fn with_jump_buffer(mut self, time: f32) -> Self {
        self.jump_buffer = time;
        self
    }

    /// Builder: set air control fraction and optional air acceleration.
    pub fn with_air_control(mut self, control: f32, accel: f32) -> Self {
        self.air_control = control;
        self.air_accel = accel;
        self
    }

    /// Builder: set crouch height and transition rate.
    pub fn with_crouch(mut self, height: f32, transition_speed: f32) -> Self {
        self.crouch_height = height;
        self.crouch_transition_speed = transition_speed;
        self
    }

    /// Builder: set slide start/end thresholds and friction.
    pub fn with_slide(mut self, min_speed: f32, end_speed: f32, friction: f32) -> Self {
        self.slide_min_speed = min_speed;
        self.slide_end_speed = end_speed;
        self.slide_friction = friction;
        self
    }

    /// Builder: set wallrun duration limit (zero = unlimited) and cooldown.
    pub fn with_wall_run_timing(mut self, max_time: f32, cooldown: f32) -> Self {
        self.wall_run_max_time = max_time;
        self.wall_run_cooldown = cooldown;
        self
    }

    /// Builder: set wall jump launch values.
    pub fn with_wall_jump(mut self, up: f32, away: f32, forward: f32) -> Self {
        self.wall_jump_up = up;
        self.wall_jump_away = away;
        self.wall_jump_forward = forward;
        self
    }

    /// Builder: set camera roll magnitudes in degrees.
    pub fn with_camera_tilt(mut self, on_wall: f32, on_slide: f32) -> Self {
        self.camera_tilt_on_wall = on_wall;
        self.camera_tilt_on_slide = on_slide;
        self
    }

    fn fields(&self) -> [(&'static str, f32); 46] {
        [
            ("walk_speed", self.walk_speed),
            ("sprint_speed", self.sprint_speed),
            ("crouch_speed", self.crouch_speed),
            ("ground_accel", self.ground_accel),
            ("ground_brake", self.ground_brake),
            ("strafe_friction", self.strafe_friction),
            ("ground_decel_no_input", self.ground_decel_no_input),
            ("ground_stick_velocity", self.ground_stick_velocity),
            ("air_control", self.air_control),
            ("air_turn_rate", self.air_turn_rate),
            ("air_accel", self.air_accel),
            ("jump_height", self.jump_height),
            ("gravity", self.gravity),
            ("coyote_time", self.coyote_time),
            ("jump_buffer", self.jump_buffer),
            ("stand_height", self.stand_height),
            ("radius", self.radius),
            ("probe_radius", self.probe_radius),
            ("probe_ray", self.probe_ray),
            ("snap_distance", self.snap_distance),
            ("slope_limit", self.slope_limit),
            ("slope_tolerance", self.slope_tolerance),
            ("crouch_height", self.crouch_height),
            ("crouch_transition_speed", self.crouch_transition_speed),
            ("crouch_camera_offset", self.crouch_camera_offset),
            ("crouch_camera_smooth", self.crouch_camera_smooth),
            ("slide_min_speed", self.slide_min_speed),
            ("slide_end_speed", self.slide_end_speed),
            ("slide_friction", self.slide_friction),
            ("slide_turn_rate", self.slide_turn_rate),
            ("camera_tilt_on_slide", self.camera_tilt_on_slide),
            ("slide_tilt_fraction", self.slide_tilt_fraction),
            ("wall_check_distance", self.wall_check_distance),
            ("wall_check_height", self.wall_check_height),
            ("wall_follow_margin", self.wall_follow_margin),
            ("wall_floor_angle", self.wall_floor_angle),
            ("wall_gravity_scale", self.wall_gravity_scale),
            ("wall_run_max_time", self.wall_run_max_time),
            ("wall_run_cooldown", self.wall_run_cooldown),
            ("wall_jump_up", self.wall_jump_up),
            ("wall_jump_away", self.wall_jump_away),
            ("wall_jump_forward", self.wall_jump_forward),
            ("wall_align_rate", self.wall_align_rate),
            ("wall_normal_blend", self.wall_normal_blend),
            ("wall_tangent_min_speed", self.wall_tangent_min_speed),
            ("camera_tilt_on_wall", self.camera_tilt_on_wall),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn default_config_is_valid() {
        assert!(LocomotionConfig::default().validate().is_ok());
        assert!(LocomotionConfig::bot().validate().is_ok());
    }

    #[test]
    fn jump_velocity_reaches_jump_height() {
        let config = LocomotionConfig::default().with_jump(2.0, -20.0);
        // v^2 = 2 g h
        assert_relative_eq!(config.jump_velocity(), (2.0_f32 * 20.0 * 2.0).sqrt());
    }

    #[test]
    fn speed_cap_by_posture() {
        let config = LocomotionConfig::default();
        assert_eq!(config.speed_cap(false, false), config.walk_speed);
        assert_eq!(config.speed_cap(false, true), config.sprint_speed);
        // Crouch wins over sprint
        assert_eq!(config.speed_cap(true, true), config.crouch_speed);
    }

    #[test]
    fn rejects_crouch_taller_than_stand() {
        let config = LocomotionConfig::default().with_crouch(2.5, 6.0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::CrouchNotBelowStand { .. })
        ));
    }

    #[test]
    fn rejects_crouch_below_diameter() {
        let config = LocomotionConfig::default().with_crouch(0.8, 6.0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::CrouchBelowDiameter { .. })
        ));
    }

    #[test]
    fn rejects_upward_gravity() {
        let config = LocomotionConfig::default().with_jump(1.0, 9.81);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::GravityNotDownward(_))
        ));
    }

    #[test]
    fn rejects_nan() {
        let config = LocomotionConfig {
            air_turn_rate: f32::NAN,
            ..default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NonFinite { field: "air_turn_rate", .. })
        ));
    }

    #[test]
    fn rejects_inverted_slide_thresholds() {
        let config = LocomotionConfig::default().with_slide(3.0, 4.0, 5.0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::SlideThresholds { .. })
        ));
    }

    #[test]
    fn rejects_air_control_above_one() {
        let config = LocomotionConfig::default().with_air_control(1.5, 0.0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfUnitRange { field: "air_control", .. })
        ));
    }

    #[test]
    fn validated_passes_through_good_configs() {
        let config = LocomotionConfig::player().validated().unwrap();
        assert_eq!(config, LocomotionConfig::player());

        let result = LocomotionConfig::default().with_crouch(0.5, 6.0).validated();
        assert!(matches!(result, Err(ConfigError::CrouchBelowDiameter { .. })));
    }

    #[test]
    fn from_ron_fills_defaults() {
        let config = LocomotionConfig::from_ron("(walk_speed: 6.5, wall_run_max_time: 0.0)").unwrap();
        assert_eq!(config.walk_speed, 6.5);
        assert_eq!(config.wall_run_max_time, 0.0);
        assert_eq!(config.sprint_speed, LocomotionConfig::default().sprint_speed);
    }

    #[test]
    fn from_ron_validates() {
        let result = LocomotionConfig::from_ron("(crouch_height: 3.0)");
        assert!(matches!(result, Err(ConfigError::CrouchNotBelowStand { .. })));
    }

    #[test]
    fn from_ron_reports_parse_errors() {
        let result = LocomotionConfig::from_ron("(walk_speed: \"fast\")");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }
}

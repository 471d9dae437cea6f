//! Movement Configuration
//!
//! Designer-facing parameters are plain floats ([`MovementConfig`]). They are
//! turned into fixed-point step constants exactly once ([`DerivedParams`]);
//! nothing inside a step ever touches a float.
//!
//! ```text
//!   MovementConfig (f64, serde) ──sanitize──► DerivedParams::derive ──► Fixed / step counts
//!                                                 │
//!                                                 ├── gravity     = 2·h / t²
//!                                                 ├── max jump    = gravity · t
//!                                                 ├── min jump    = √(2 · gravity · h_min)
//!                                                 └── dash speed  = distance / duration
//! ```

use serde::{Serialize, Deserialize};
use thiserror::Error;
use tracing::warn;

use crate::collision::geometry::LayerMask;
use crate::collision::probe::CollisionSettings;
use crate::core::fixed::{Fixed, fixed_from_f64};
use crate::core::hash::{StateHash, StateHasher};
use crate::core::vec2::FixedVec2;

/// Default fixed step (60 Hz).
pub const DEFAULT_STEP_DURATION: f64 = 1.0 / 60.0;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A duration or size that must be strictly positive
    #[error("{field} must be positive, got {value}")]
    NonPositive {
        /// Field name
        field: &'static str,
        /// Offending value
        value: f64,
    },

    /// A speed or distance that must not be negative
    #[error("{field} must not be negative, got {value}")]
    Negative {
        /// Field name
        field: &'static str,
        /// Offending value
        value: f64,
    },

    /// Minimum jump higher than maximum jump
    #[error("min_jump_height {min} exceeds max_jump_height {max}")]
    JumpHeightOrder {
        /// Configured minimum
        min: f64,
        /// Configured maximum
        max: f64,
    },

    /// Minimum fall speed above maximum fall speed
    #[error("min_fall_speed {min} exceeds max_fall_speed {max}")]
    FallSpeedOrder {
        /// Configured minimum
        min: f64,
        /// Configured maximum
        max: f64,
    },

    /// Malformed JSON
    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// A designer (x, y) pair.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Vec2Param {
    /// Horizontal component
    pub x: f64,
    /// Vertical component
    pub y: f64,
}

impl Vec2Param {
    /// Create a pair.
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Designer tunables for one character.
///
/// Distances are in world units, speeds in units/second, windows in seconds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementConfig {
    /// Fixed simulation step (seconds)
    pub step_duration: f64,

    // Walk
    /// Top horizontal speed
    pub max_move_speed: f64,
    /// Horizontal acceleration while input is held
    pub acceleration: f64,
    /// Horizontal deceleration with no input
    pub deceleration: f64,

    // Jump
    /// Apex height of a full jump
    pub max_jump_height: f64,
    /// Apex height of a tapped jump
    pub min_jump_height: f64,
    /// Time to reach the apex of a full jump
    pub time_to_jump_apex: f64,
    /// How long an early jump press stays queued
    pub jump_buffer_window: f64,
    /// Grace period after leaving ground
    pub coyote_window: f64,

    // Wall
    /// Maximum downward speed while sliding on a wall
    pub wall_slide_speed: f64,
    /// Climb speed while grabbing, scaled by vertical input
    pub wall_climb_speed: f64,
    /// Post-wall-jump window
    pub wall_stick_time: f64,
    /// Grab allowance, refilled on ground
    pub wall_grab_duration: f64,
    /// Maximum gap to a wall that still allows a grab
    pub grab_distance: f64,
    /// Duration of the hop off a grabbed wall
    pub wall_grab_jump_apex_time: f64,
    /// Launch speed away from a wall
    pub wall_jump_impulse: Vec2Param,
    /// Edge climb: x is horizontal speed toward the wall, y the height gained
    pub top_edge_climb_impulse: Vec2Param,

    // Dash
    /// Dash length
    pub dash_distance: f64,
    /// Dash duration
    pub dash_duration: f64,
    /// Vertical speed after a dash, as a fraction of dash speed
    pub post_dash_vertical_speed_scale: f64,
    /// Axis deflection below which a dash axis counts as zero
    pub dash_deadzone: f64,

    // Fall
    /// Lowest downward speed while falling
    pub min_fall_speed: f64,
    /// Terminal downward speed
    pub max_fall_speed: f64,

    // Collision
    /// Half width and half height of the bounding box
    pub half_extents: Vec2Param,
    /// Ray origin inset
    pub skin_width: f64,
    /// Rays per side
    pub ray_count: i32,
    /// Solid geometry layers
    pub collision_layer_mask: LayerMask,
    /// Moving platform layers
    pub platform_layer_mask: LayerMask,
    /// How far below/above the box the vertical probe looks
    pub ground_probe_distance: f64,
    /// Keep every ray of the last step for a debug renderer
    pub debug_record_rays: bool,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            step_duration: DEFAULT_STEP_DURATION,
            max_move_speed: 13.0,
            acceleration: 180.0,
            deceleration: 120.0,
            max_jump_height: 4.0,
            min_jump_height: 1.0,
            time_to_jump_apex: 0.4,
            jump_buffer_window: 0.1,
            coyote_window: 0.1,
            wall_slide_speed: 3.0,
            wall_climb_speed: 4.0,
            wall_stick_time: 0.2,
            wall_grab_duration: 1.5,
            grab_distance: 0.1,
            wall_grab_jump_apex_time: 0.15,
            wall_jump_impulse: Vec2Param::new(10.0, 14.0),
            top_edge_climb_impulse: Vec2Param::new(5.0, 1.25),
            dash_distance: 5.0,
            dash_duration: 0.2,
            post_dash_vertical_speed_scale: 0.3,
            dash_deadzone: 0.35,
            min_fall_speed: 2.0,
            max_fall_speed: 25.0,
            half_extents: Vec2Param::new(0.4, 0.9),
            skin_width: 0.015625,
            ray_count: 4,
            collision_layer_mask: 0b01,
            platform_layer_mask: 0b10,
            ground_probe_distance: 0.0625,
            debug_record_rays: false,
        }
    }
}

impl MovementConfig {
    /// Load from a (possibly partial) JSON document. Missing fields take defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize to pretty JSON.
    pub fn to_json_pretty(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// First inconsistency, if any.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("step_duration", self.step_duration),
            ("time_to_jump_apex", self.time_to_jump_apex),
            ("max_jump_height", self.max_jump_height),
            ("dash_duration", self.dash_duration),
        ];
        for (field, value) in positive {
            if !(value > 0.0) || !value.is_finite() {
                return Err(ConfigError::NonPositive { field, value });
            }
        }

        let non_negative = [
            ("max_move_speed", self.max_move_speed),
            ("acceleration", self.acceleration),
            ("deceleration", self.deceleration),
            ("min_jump_height", self.min_jump_height),
            ("jump_buffer_window", self.jump_buffer_window),
            ("coyote_window", self.coyote_window),
            ("wall_slide_speed", self.wall_slide_speed),
            ("wall_climb_speed", self.wall_climb_speed),
            ("wall_stick_time", self.wall_stick_time),
            ("wall_grab_duration", self.wall_grab_duration),
            ("grab_distance", self.grab_distance),
            ("wall_grab_jump_apex_time", self.wall_grab_jump_apex_time),
            ("dash_distance", self.dash_distance),
            ("min_fall_speed", self.min_fall_speed),
            ("max_fall_speed", self.max_fall_speed),
            ("ground_probe_distance", self.ground_probe_distance),
        ];
        for (field, value) in non_negative {
            if !(value >= 0.0) {
                return Err(ConfigError::Negative { field, value });
            }
        }

        if self.min_jump_height > self.max_jump_height {
            return Err(ConfigError::JumpHeightOrder {
                min: self.min_jump_height,
                max: self.max_jump_height,
            });
        }
        if self.min_fall_speed > self.max_fall_speed {
            return Err(ConfigError::FallSpeedOrder {
                min: self.min_fall_speed,
                max: self.max_fall_speed,
            });
        }
        Ok(())
    }

    /// Copy with every inconsistency repaired. Logs once when something changed.
    pub fn sanitized(&self) -> Self {
        if let Err(e) = self.validate() {
            warn!(error = %e, "Invalid movement config, continuing with repaired values");
        }

        let defaults = Self::default();
        let mut c = self.clone();

        let positive_or = |value: f64, fallback: f64| {
            if value > 0.0 && value.is_finite() { value } else { fallback }
        };
        c.step_duration = positive_or(c.step_duration, DEFAULT_STEP_DURATION);
        c.time_to_jump_apex = positive_or(c.time_to_jump_apex, defaults.time_to_jump_apex);
        c.max_jump_height = positive_or(c.max_jump_height, defaults.max_jump_height);
        c.dash_duration = positive_or(c.dash_duration, defaults.dash_duration);

        for value in [
            &mut c.max_move_speed,
            &mut c.acceleration,
            &mut c.deceleration,
            &mut c.min_jump_height,
            &mut c.jump_buffer_window,
            &mut c.coyote_window,
            &mut c.wall_slide_speed,
            &mut c.wall_climb_speed,
            &mut c.wall_stick_time,
            &mut c.wall_grab_duration,
            &mut c.grab_distance,
            &mut c.wall_grab_jump_apex_time,
            &mut c.dash_distance,
            &mut c.min_fall_speed,
            &mut c.max_fall_speed,
            &mut c.ground_probe_distance,
        ] {
            *value = if value.is_finite() { value.abs() } else { 0.0 };
        }

        c.min_jump_height = c.min_jump_height.min(c.max_jump_height);
        if c.min_fall_speed > c.max_fall_speed {
            std::mem::swap(&mut c.min_fall_speed, &mut c.max_fall_speed);
        }
        c
    }
}

// =============================================================================
// DERIVED PARAMETERS
// =============================================================================

/// Fixed-point step constants derived from a [`MovementConfig`].
///
/// `*_step` values are per-step deltas (rate · dt, rounded once) and
/// `*_steps` values are timer windows in whole steps.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedParams {
    /// Step duration
    pub dt: Fixed,
    /// Top horizontal speed
    pub max_move_speed: Fixed,
    /// Speed change per step with input
    pub acceleration_step: Fixed,
    /// Speed change per step without input
    pub deceleration_step: Fixed,
    /// Gravity (units/s²)
    pub gravity: Fixed,
    /// Gravity applied per step
    pub gravity_step: Fixed,
    /// Launch speed of a full jump
    pub max_jump_speed: Fixed,
    /// Speed a released jump is cut to
    pub min_jump_speed: Fixed,
    /// Jump buffer window
    pub jump_buffer_steps: u32,
    /// Coyote window
    pub coyote_steps: u32,
    /// Wall slide speed limit
    pub wall_slide_speed: Fixed,
    /// Climb speed at full vertical input
    pub wall_climb_speed: Fixed,
    /// Post-wall-jump window
    pub wall_stick_steps: u32,
    /// Grab allowance
    pub wall_grab_steps: u32,
    /// Maximum grab gap
    pub grab_distance: Fixed,
    /// Hop window off a grabbed wall
    pub wall_grab_jump_apex_steps: u32,
    /// Hop launch speed
    pub wall_grab_jump_speed: Fixed,
    /// Wall jump launch velocity (x away from the wall)
    pub wall_jump_impulse: FixedVec2,
    /// Edge climb velocity (x toward the wall)
    pub top_edge_climb_speed: FixedVec2,
    /// Dash length
    pub dash_distance: Fixed,
    /// Dash duration
    pub dash_steps: u32,
    /// Average dash speed
    pub dash_speed: Fixed,
    /// Post-dash vertical speed at full vertical input
    pub post_dash_vertical_speed: Fixed,
    /// Dash axis deadzone
    pub dash_deadzone: Fixed,
    /// Lowest falling speed
    pub min_fall_speed: Fixed,
    /// Terminal falling speed
    pub max_fall_speed: Fixed,
    /// Probe settings
    pub collision: CollisionSettings,
}

/// Seconds → whole steps.
fn to_steps(seconds: f64, dt: f64) -> u32 {
    let steps = (seconds / dt).round();
    if steps.is_finite() && steps > 0.0 {
        steps.min(u32::MAX as f64) as u32
    } else {
        0
    }
}

impl DerivedParams {
    /// Derive from `config` after repairing it.
    pub fn derive(config: &MovementConfig) -> Self {
        let c = config.sanitized();
        let dt = c.step_duration;

        let t = c.time_to_jump_apex;
        let gravity = 2.0 * c.max_jump_height / (t * t);
        let max_jump_speed = gravity * t;
        let min_jump_speed = (2.0 * gravity * c.min_jump_height).sqrt();
        let wall_grab_jump_speed = gravity * c.wall_grab_jump_apex_time;
        let edge_climb_y = (2.0 * gravity * c.top_edge_climb_impulse.y.max(0.0)).sqrt();
        let dash_speed = c.dash_distance / c.dash_duration;

        Self {
            dt: fixed_from_f64(dt),
            max_move_speed: fixed_from_f64(c.max_move_speed),
            acceleration_step: fixed_from_f64(c.acceleration * dt),
            deceleration_step: fixed_from_f64(c.deceleration * dt),
            gravity: fixed_from_f64(gravity),
            gravity_step: fixed_from_f64(gravity * dt),
            max_jump_speed: fixed_from_f64(max_jump_speed),
            min_jump_speed: fixed_from_f64(min_jump_speed),
            jump_buffer_steps: to_steps(c.jump_buffer_window, dt),
            coyote_steps: to_steps(c.coyote_window, dt),
            wall_slide_speed: fixed_from_f64(c.wall_slide_speed),
            wall_climb_speed: fixed_from_f64(c.wall_climb_speed),
            wall_stick_steps: to_steps(c.wall_stick_time, dt),
            wall_grab_steps: to_steps(c.wall_grab_duration, dt),
            grab_distance: fixed_from_f64(c.grab_distance),
            wall_grab_jump_apex_steps: to_steps(c.wall_grab_jump_apex_time, dt),
            wall_grab_jump_speed: fixed_from_f64(wall_grab_jump_speed),
            wall_jump_impulse: FixedVec2::from_floats(c.wall_jump_impulse.x, c.wall_jump_impulse.y),
            top_edge_climb_speed: FixedVec2::from_floats(c.top_edge_climb_impulse.x, edge_climb_y),
            dash_distance: fixed_from_f64(c.dash_distance),
            dash_steps: to_steps(c.dash_duration, dt).max(1),
            dash_speed: fixed_from_f64(dash_speed),
            post_dash_vertical_speed: fixed_from_f64(dash_speed * c.post_dash_vertical_speed_scale),
            dash_deadzone: fixed_from_f64(c.dash_deadzone),
            min_fall_speed: fixed_from_f64(c.min_fall_speed),
            max_fall_speed: fixed_from_f64(c.max_fall_speed),
            collision: CollisionSettings {
                half_extents: FixedVec2::from_floats(c.half_extents.x, c.half_extents.y),
                skin_width: fixed_from_f64(c.skin_width),
                ray_count: c.ray_count,
                collision_mask: c.collision_layer_mask,
                platform_mask: c.platform_layer_mask,
                vertical_probe: fixed_from_f64(c.ground_probe_distance),
                horizontal_probe: fixed_from_f64(c.grab_distance.max(c.ground_probe_distance)),
                record_debug_rays: c.debug_record_rays,
            },
        }
    }

    /// Hash every derived constant in declaration order.
    pub fn hash_into(&self, hasher: &mut StateHasher) {
        for value in [
            self.dt,
            self.max_move_speed,
            self.acceleration_step,
            self.deceleration_step,
            self.gravity,
            self.gravity_step,
            self.max_jump_speed,
            self.min_jump_speed,
            self.wall_slide_speed,
            self.wall_climb_speed,
            self.grab_distance,
            self.wall_grab_jump_speed,
            self.dash_distance,
            self.dash_speed,
            self.post_dash_vertical_speed,
            self.dash_deadzone,
            self.min_fall_speed,
            self.max_fall_speed,
        ] {
            hasher.update_fixed(value);
        }
        for steps in [
            self.jump_buffer_steps,
            self.coyote_steps,
            self.wall_stick_steps,
            self.wall_grab_steps,
            self.wall_grab_jump_apex_steps,
            self.dash_steps,
        ] {
            hasher.update_u32(steps);
        }
        hasher.update_vec2(self.wall_jump_impulse);
        hasher.update_vec2(self.top_edge_climb_speed);

        let c = &self.collision;
        hasher.update_vec2(c.half_extents);
        hasher.update_fixed(c.skin_width);
        hasher.update_i32(c.ray_count);
        hasher.update_u32(c.collision_mask);
        hasher.update_u32(c.platform_mask);
        hasher.update_fixed(c.vertical_probe);
        hasher.update_fixed(c.horizontal_probe);
    }

    /// Fingerprint of these constants.
    pub fn config_hash(&self) -> StateHash {
        let mut hasher = StateHasher::for_config();
        self.hash_into(&mut hasher);
        hasher.finalize()
    }
}

//! Character State
//!
//! Everything a character carries from one step to the next. Collision
//! contact is not part of it: that is re-probed every step.

use serde::{Serialize, Deserialize};

use crate::collision::geometry::ColliderId;
use crate::core::hash::StateHasher;
use crate::core::timer::TimerTable;
use crate::core::vec2::FixedVec2;

// =============================================================================
// CHARACTER ID
// =============================================================================

/// Character handle within a simulation.
///
/// Implements Ord for deterministic BTreeMap ordering.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CharacterId(pub u32);

impl std::fmt::Display for CharacterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// =============================================================================
// MOVEMENT STATE
// =============================================================================

/// Persistent per-character movement state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementState {
    /// Center of the bounding box
    pub position: FixedVec2,
    /// Position at the start of the previous step
    pub last_position: FixedVec2,
    /// (position - last_position) / dt, for external queries only
    pub observed_velocity: FixedVec2,
    /// Simulated speed (units/second)
    pub speed: FixedVec2,
    /// Ability windows
    pub timers: TimerTable,
    /// Last nonzero horizontal input sign
    pub facing: i32,
    /// Down probe touched ground on the last step
    pub grounded: bool,
    /// Wall jump armed by a jump press near a wall
    pub can_wall_jump: bool,
    /// Walk is locked out after a wall jump
    pub wall_jump_in_progress: bool,
    /// Holding onto a wall
    pub wall_grabbing: bool,
    /// Dash running
    pub dash_active: bool,
    /// Dash finished last step; post-dash speed still pending
    pub dash_just_ended: bool,
    /// Dash available
    pub can_dash: bool,
    /// Airborne since the last landing notification
    pub can_land: bool,
    /// Obstruction-clamped dash end point
    pub dash_target: FixedVec2,
    /// Platform stood on at the end of the last step
    pub riding: Option<ColliderId>,
}

impl MovementState {
    /// Fresh state at `position`, facing right with the dash available.
    pub fn new(position: FixedVec2) -> Self {
        Self {
            position,
            last_position: position,
            observed_velocity: FixedVec2::ZERO,
            speed: FixedVec2::ZERO,
            timers: TimerTable::new(),
            facing: 1,
            grounded: false,
            can_wall_jump: false,
            wall_jump_in_progress: false,
            wall_grabbing: false,
            dash_active: false,
            dash_just_ended: false,
            can_dash: true,
            can_land: false,
            dash_target: position,
            riding: None,
        }
    }

    /// Hash for replay verification. Field order is part of the format.
    pub fn hash_into(&self, hasher: &mut StateHasher) {
        hasher.update_vec2(self.position);
        hasher.update_vec2(self.last_position);
        hasher.update_vec2(self.speed);
        self.timers.hash_into(hasher);
        hasher.update_i32(self.facing);

        let flags = [
            self.grounded,
            self.can_wall_jump,
            self.wall_jump_in_progress,
            self.wall_grabbing,
            self.dash_active,
            self.dash_just_ended,
            self.can_dash,
            self.can_land,
        ];
        let packed = flags
            .iter()
            .enumerate()
            .fold(0u8, |acc, (i, &f)| acc | ((f as u8) << i));
        hasher.update_u8(packed);

        hasher.update_vec2(self.dash_target);
        match self.riding {
            Some(id) => {
                hasher.update_bool(true);
                hasher.update_u32(id.0);
            }
            None => hasher.update_bool(false),
        }
    }
}

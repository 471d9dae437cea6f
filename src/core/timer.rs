//! Step Timers
//!
//! Every ability window is a countdown measured in whole fixed steps.
//! Keeping them in one named table makes the decay/reset rules of each
//! pipeline stage visible in one place and testable on their own.

use serde::{Serialize, Deserialize};

use super::hash::StateHasher;

/// Named countdown timers owned by a character.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum TimerId {
    /// Early jump press waiting for ground contact.
    JumpBuffer = 0,
    /// Grace window after leaving ground.
    Coyote = 1,
    /// Post-wall-jump window: slide clamp still applies, walk is locked out.
    WallStick = 2,
    /// Remaining grab allowance; refilled while grounded.
    WallGrab = 3,
    /// Window for the hop or launch that follows a jump press while grabbing.
    WallGrabJumpApex = 4,
    /// Remaining steps of an active dash.
    Dash = 5,
}

impl TimerId {
    /// Number of timers in the table.
    pub const COUNT: usize = 6;

    /// All timers in hashing order.
    pub const ALL: [TimerId; Self::COUNT] = [
        TimerId::JumpBuffer,
        TimerId::Coyote,
        TimerId::WallStick,
        TimerId::WallGrab,
        TimerId::WallGrabJumpApex,
        TimerId::Dash,
    ];
}

/// Fixed-size table of step countdowns.
///
/// A timer is "active" while its remaining count is above zero.
/// Decay saturates at zero.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerTable {
    remaining: [u32; TimerId::COUNT],
}

impl TimerTable {
    /// All timers expired.
    pub const fn new() -> Self {
        Self {
            remaining: [0; TimerId::COUNT],
        }
    }

    /// Steps left on a timer.
    #[inline]
    pub fn remaining(&self, id: TimerId) -> u32 {
        self.remaining[id as usize]
    }

    /// Whether a timer still has steps left.
    #[inline]
    pub fn is_active(&self, id: TimerId) -> bool {
        self.remaining(id) > 0
    }

    /// Set a timer to a full window.
    #[inline]
    pub fn arm(&mut self, id: TimerId, steps: u32) {
        self.remaining[id as usize] = steps;
    }

    /// Expire a timer immediately.
    #[inline]
    pub fn clear(&mut self, id: TimerId) {
        self.remaining[id as usize] = 0;
    }

    /// Count a timer down by one step.
    #[inline]
    pub fn decay(&mut self, id: TimerId) {
        let slot = &mut self.remaining[id as usize];
        *slot = slot.saturating_sub(1);
    }

    /// Arm when `condition` holds, otherwise decay.
    ///
    /// This is the rule shared by coyote, jump buffer and grab timers.
    #[inline]
    pub fn reset_or_decay(&mut self, id: TimerId, condition: bool, steps: u32) {
        if condition {
            self.arm(id, steps);
        } else {
            self.decay(id);
        }
    }

    /// Hash all timers in declaration order.
    pub fn hash_into(&self, hasher: &mut StateHasher) {
        for id in TimerId::ALL {
            hasher.update_u32(self.remaining(id));
        }
    }
}

//! Movement Events
//!
//! One-shot notifications emitted by the pipeline for animation, audio and
//! replay consumers. They never feed back into the simulation.

use serde::{Serialize, Deserialize};

use crate::core::vec2::FixedVec2;
use crate::game::state::CharacterId;

/// What happened.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MovementEventKind {
    /// A jump fired
    JumpStarted {
        /// Fired from the coyote window rather than from the ground
        via_coyote: bool,
    },
    /// Airborne → grounded
    Landed,
    /// Launched off a wall
    WallJumped {
        /// Horizontal launch direction (-1 or 1)
        direction: i32,
    },
    /// Auto-climbed over a ledge
    EdgeClimbed {
        /// Side of the wall that was climbed (-1 or 1)
        wall: i32,
    },
    /// A dash started
    DashStarted {
        /// Unit dash direction
        direction: FixedVec2,
        /// Obstruction-clamped end point
        target: FixedVec2,
    },
}

impl MovementEventKind {
    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            MovementEventKind::JumpStarted { .. } => "jump_started",
            MovementEventKind::Landed => "landed",
            MovementEventKind::WallJumped { .. } => "wall_jumped",
            MovementEventKind::EdgeClimbed { .. } => "edge_climbed",
            MovementEventKind::DashStarted { .. } => "dash_started",
        }
    }
}

/// A notification stamped with the controller step it happened on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementEvent {
    /// Controller step
    pub step: u32,
    /// Event data
    pub kind: MovementEventKind,
}

impl MovementEvent {
    /// Create a new event.
    pub fn new(step: u32, kind: MovementEventKind) -> Self {
        Self { step, kind }
    }
}

/// A movement event attributed to a character of a simulation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterEvent {
    /// Simulation tick
    pub tick: u32,
    /// Character that produced it
    pub character: CharacterId,
    /// The event
    pub event: MovementEvent,
}

//! Movement Simulation
//!
//! Everything that runs inside a fixed step. 100% deterministic.
//!
//! ## Module Structure
//!
//! - `config`: Designer tunables and their fixed-point derivation
//! - `input`: Input frames, edge derivation, live and recorded sources
//! - `state`: Per-character movement state
//! - `controller`: The per-step pipeline (gravity, walk, probe, move)
//! - `jump`, `wall`, `dash`: Ability stages of the pipeline
//! - `events`: One-shot movement notifications
//! - `tick`: Fixed-rate simulation host

pub mod config;
pub mod input;
pub mod state;
pub mod controller;
pub mod jump;
pub mod wall;
pub mod dash;
pub mod events;
pub mod tick;

#[cfg(test)]
pub(crate) mod testing;

// Re-export key types
pub use config::{ConfigError, DerivedParams, MovementConfig};
pub use controller::{ControllerError, MovementController, StepReport, VerticalOwner};
pub use events::{CharacterEvent, MovementEvent, MovementEventKind};
pub use input::{InputFrame, InputRecording, InputSource, InputState, LiveInput, RecordedInput};
pub use state::{CharacterId, MovementState};
pub use tick::{FixedStepClock, Simulation, TickResult};

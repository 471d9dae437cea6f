//! Core deterministic primitives.
//!
//! All types in this module are designed for exact reproducibility.
//! They form the foundation for bit-identical replays.

pub mod fixed;
pub mod vec2;
pub mod hash;
pub mod timer;

// Re-export core types
pub use fixed::{Fixed, FIXED_ONE, FIXED_HALF, FIXED_SCALE};
pub use vec2::FixedVec2;
pub use hash::{StateHash, StateHasher, compute_state_hash};
pub use timer::{TimerId, TimerTable};

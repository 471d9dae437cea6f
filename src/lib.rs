//! # Ledgerun Movement Engine
//!
//! Deterministic fixed-step platformer movement and collision, with replay
//! recording and verification.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    LEDGERUN SIM                              │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Deterministic primitives                  │
//! │  ├── fixed.rs    - Q16.16 fixed-point arithmetic             │
//! │  ├── vec2.rs     - 2D vector with fixed-point                │
//! │  ├── timer.rs    - Whole-step countdown timers               │
//! │  └── hash.rs     - State hashing for verification            │
//! │                                                              │
//! │  collision/      - Raycast collision                         │
//! │  ├── geometry.rs - World query traits, box world             │
//! │  └── probe.rs    - Ray fans, contact probe, resolution       │
//! │                                                              │
//! │  game/           - Movement (deterministic)                  │
//! │  ├── config.rs   - Designer tunables → fixed-point params    │
//! │  ├── input.rs    - Input frames, edges, live/recorded        │
//! │  ├── controller.rs - Per-step movement pipeline              │
//! │  ├── jump.rs     - Coyote, buffer, variable height           │
//! │  ├── wall.rs     - Slide, wall jump, grab, edge climb        │
//! │  ├── dash.rs     - Obstruction-clamped dash                  │
//! │  └── tick.rs     - Fixed-rate simulation host                │
//! │                                                              │
//! │  replay/         - Transcripts and verification              │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism Guarantee
//!
//! The `core/`, `collision/` and `game/` step code is **100% deterministic**:
//! - Designer floats are converted to fixed-point once, at construction
//! - No floating-point arithmetic inside a step
//! - No HashMap (uses BTreeMap for sorted iteration)
//! - No system time dependencies
//!
//! Given identical configs, level and inputs, the simulation produces
//! **identical results** on any platform.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod collision;
pub mod game;
pub mod replay;

// Re-export commonly used types
pub use core::fixed::{Fixed, FIXED_ONE, FIXED_HALF, FIXED_SCALE};
pub use core::vec2::FixedVec2;
pub use collision::{BoxWorld, CollisionSystem, CollisionWorld, PlatformVelocitySource};
pub use game::{InputFrame, InputRecording, MovementConfig, MovementController, Simulation};
pub use replay::{ReplayTranscript, TranscriptRecorder, verify_transcript};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default simulation tick rate (Hz)
pub const TICK_RATE: u32 = 60;

//! Collision detection.
//!
//! `geometry` describes what the level is made of and answers raycasts.
//! `probe` turns those raycasts into per-side contact information for a
//! character's bounding box and clamps its movement.

pub mod geometry;
pub mod probe;

pub use geometry::{
    Aabb, BoxWorld, ColliderId, CollisionWorld, LayerMask, OutOfBoundsPolicy,
    PlatformVelocitySource, RayHit, SolidBox,
};
pub use probe::{
    CollisionInfo, CollisionReport, CollisionSettings, CollisionSystem, DebugRay, Resolution, Side,
};

//! Shared fixtures for the movement stage tests.

use crate::collision::geometry::{Aabb, BoxWorld, LayerMask, PlatformVelocitySource};
use crate::core::fixed::{Fixed, FIXED_ONE, to_fixed};
use crate::core::vec2::FixedVec2;
use crate::game::config::{DerivedParams, MovementConfig};
use crate::game::controller::{MovementController, StepReport};
use crate::game::input::{InputFrame, InputState};

pub const SOLID: LayerMask = 0b01;
pub const PLATFORM: LayerMask = 0b10;

pub fn test_config() -> MovementConfig {
    MovementConfig::default()
}

fn half_extents() -> FixedVec2 {
    DerivedParams::derive(&test_config()).collision.half_extents
}

/// Floor with its top face at y = 0.
pub fn flat_world() -> BoxWorld {
    let mut world = BoxWorld::new();
    world.add_box(Aabb::from_floats(-100.0, -1.0, 100.0, 0.0), SOLID);
    world
}

/// Character with its bottom face on the floor.
pub fn standing_on_floor() -> (BoxWorld, MovementController) {
    let controller = MovementController::new(test_config(), FixedVec2::new(0, half_extents().y));
    (flat_world(), controller)
}

/// Character centered at height `y` above the flat floor.
pub fn floating(y: f64) -> (BoxWorld, MovementController) {
    let controller = MovementController::new(test_config(), FixedVec2::from_floats(0.0, y));
    (flat_world(), controller)
}

/// Standing on a floor whose right edge is at x = 0.5.
pub fn at_ledge() -> (BoxWorld, MovementController) {
    let mut world = BoxWorld::new();
    world.add_box(Aabb::from_floats(-100.0, -1.0, 0.5, 0.0), SOLID);
    let controller = MovementController::new(test_config(), FixedVec2::new(0, half_extents().y));
    (world, controller)
}

/// Wall whose left face is at `face`, spanning `bottom..top`.
fn wall(face: Fixed, bottom: Fixed, top: Fixed) -> Aabb {
    Aabb::new(
        FixedVec2::new(face, bottom),
        FixedVec2::new(face + to_fixed(2.0), top),
    )
}

/// Airborne at height `y`, right face touching a tall wall.
pub fn beside_wall(y: f64) -> (BoxWorld, MovementController) {
    let mut world = flat_world();
    world.add_box(wall(FIXED_ONE, to_fixed(-100.0), to_fixed(100.0)), SOLID);
    let x = FIXED_ONE - half_extents().x;
    let controller = MovementController::new(test_config(), FixedVec2::new(x, to_fixed(y)));
    (world, controller)
}

/// Touching a wall whose top is one unit above the character's feet.
pub fn below_ledge() -> (BoxWorld, MovementController) {
    let h = half_extents();
    let top = to_fixed(5.0);
    let mut world = BoxWorld::new();
    world.add_box(wall(FIXED_ONE, to_fixed(-100.0), top), SOLID);
    let position = FixedVec2::new(FIXED_ONE - h.x, top - FIXED_ONE + h.y);
    (world, MovementController::new(test_config(), position))
}

/// On the floor, right face touching a wall.
pub fn grounded_beside_wall() -> (BoxWorld, MovementController) {
    grounded_beside_wall_at(0.0)
}

/// On the floor with `gap` units between the right face and a wall.
pub fn grounded_beside_wall_at(gap: f64) -> (BoxWorld, MovementController) {
    let h = half_extents();
    let face = FIXED_ONE + to_fixed(gap);
    let mut world = flat_world();
    world.add_box(wall(face, to_fixed(-100.0), to_fixed(100.0)), SOLID);
    let controller = MovementController::new(test_config(), FixedVec2::new(FIXED_ONE - h.x, h.y));
    (world, controller)
}

pub fn step(controller: &mut MovementController, world: &BoxWorld, input: InputState) -> StepReport {
    controller.step_with_input(&input, world, None)
}

pub fn step_with_platforms(
    controller: &mut MovementController,
    world: &BoxWorld,
    input: InputState,
) -> StepReport {
    controller.step_with_input(&input, world, Some(world as &dyn PlatformVelocitySource))
}

/// Axes at full deflection, `buttons` held, no edges.
pub fn held(h: i32, v: i32, buttons: u8) -> InputState {
    InputState {
        horizontal: h.signum() * FIXED_ONE,
        vertical: v.signum() * FIXED_ONE,
        jump_held: buttons & InputFrame::BUTTON_JUMP != 0,
        grab_held: buttons & InputFrame::BUTTON_GRAB != 0,
        ..InputState::default()
    }
}

/// Like [`held`], with press edges for the jump and dash buttons given.
pub fn pressed(h: i32, v: i32, buttons: u8) -> InputState {
    InputState {
        jump_pressed: buttons & InputFrame::BUTTON_JUMP != 0,
        dash_pressed: buttons & InputFrame::BUTTON_DASH != 0,
        ..held(h, v, buttons)
    }
}

pub fn pressed_jump() -> InputState {
    pressed(0, 0, InputFrame::BUTTON_JUMP)
}

pub fn released_jump() -> InputState {
    InputState {
        jump_released: true,
        ..InputState::default()
    }
}

pub fn pressed_dash(h: i32, v: i32) -> InputState {
    pressed(h, v, InputFrame::BUTTON_DASH)
}

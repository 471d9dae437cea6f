//! Dash Stage
//!
//! An obstruction-clamped burst. The end point is fixed when the dash starts;
//! each active step then covers `remaining distance / remaining steps`, so the
//! dash slows down if something (a platform, a resolved collision) holds it
//! back, and always finishes on its target when nothing does.

use crate::collision::geometry::CollisionWorld;
use crate::collision::probe::CollisionSystem;
use crate::core::fixed::{Fixed, FIXED_ONE, fixed_abs, fixed_clamp, fixed_mul, fixed_sign};
use crate::core::timer::TimerId;
use crate::core::vec2::FixedVec2;
use crate::game::controller::{StepContext, VerticalOwner};
use crate::game::events::MovementEventKind;
use crate::game::input::InputState;
use crate::game::state::MovementState;

/// Snap input to one of 8 directions; no input dashes forward.
///
/// Axes within `deadzone` count as zero. The result is unit length.
pub fn dash_direction(input: &InputState, facing: i32, deadzone: Fixed) -> FixedVec2 {
    let snap = |axis: Fixed| if fixed_abs(axis) > deadzone { fixed_sign(axis) } else { 0 };
    let x = snap(input.horizontal);
    let y = snap(input.vertical);

    if x == 0 && y == 0 {
        let forward = if facing < 0 { -1 } else { 1 };
        return FixedVec2::new(forward * FIXED_ONE, 0);
    }
    FixedVec2::new(x * FIXED_ONE, y * FIXED_ONE).normalize()
}

/// Run the dash stage. Returns whether the dash owned this step's velocity.
pub(crate) fn process_dash(
    state: &mut MovementState,
    ctx: &mut StepContext<'_>,
    probe: &mut CollisionSystem,
    world: &dyn CollisionWorld,
) -> bool {
    let p = ctx.params;

    if ctx.report.grounded() && !state.dash_active {
        state.can_dash = true;
    }

    if ctx.input.dash_pressed && state.can_dash && !state.dash_active {
        let direction = dash_direction(ctx.input, state.facing, p.dash_deadzone);
        let far_point = state.position + direction.scale(p.dash_distance);
        let target = probe.dash_hit_pos(world, state.position, direction, far_point);

        state.dash_target = target;
        state.timers.arm(TimerId::Dash, p.dash_steps);
        state.dash_active = true;
        state.dash_just_ended = false;
        state.can_dash = false;
        state.wall_grabbing = false;
        ctx.emit(MovementEventKind::DashStarted { direction, target });
    }

    if state.dash_active {
        let steps_left = state.timers.remaining(TimerId::Dash).max(1) as Fixed;
        let remaining = state.dash_target - state.position;
        let per_step = FixedVec2::new(remaining.x / steps_left, remaining.y / steps_left);

        state.speed = per_step.div_scalar(p.dt);
        ctx.vertical_owner = Some(VerticalOwner::Dash);

        state.timers.decay(TimerId::Dash);
        if !state.timers.is_active(TimerId::Dash) {
            state.dash_active = false;
            state.dash_just_ended = true;
        }
        return true;
    }

    if state.dash_just_ended {
        state.dash_just_ended = false;
        state.speed.x = fixed_clamp(state.speed.x, -p.max_move_speed, p.max_move_speed);
        let post = fixed_mul(p.post_dash_vertical_speed, ctx.input.vertical);
        ctx.set_vertical(state, post, VerticalOwner::PostDash);
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixed::to_fixed;
    use crate::game::testing::*;

    fn axes(h: i32, v: i32) -> InputState {
        InputState {
            horizontal: h * FIXED_ONE,
            vertical: v * FIXED_ONE,
            ..InputState::default()
        }
    }

    #[test]
    fn test_dash_direction_snaps_to_eight_ways() {
        let deadzone = to_fixed(0.35);
        assert_eq!(dash_direction(&axes(1, 0), 1, deadzone), FixedVec2::RIGHT);
        assert_eq!(dash_direction(&axes(0, -1), 1, deadzone), FixedVec2::DOWN);

        let diag = dash_direction(&axes(-1, 1), 1, deadzone);
        assert_eq!(diag.x, -diag.y);
        assert!((diag.length() - FIXED_ONE).abs() < 8);

        // Partial deflection above the deadzone still snaps to full
        let partial = InputState {
            horizontal: to_fixed(0.5),
            ..InputState::default()
        };
        assert_eq!(dash_direction(&partial, -1, deadzone), FixedVec2::RIGHT);
    }

    #[test]
    fn test_dash_direction_defaults_forward() {
        let deadzone = to_fixed(0.35);
        assert_eq!(dash_direction(&InputState::idle(), 1, deadzone), FixedVec2::RIGHT);
        assert_eq!(dash_direction(&InputState::idle(), -1, deadzone), FixedVec2::LEFT);

        let tiny = InputState {
            horizontal: to_fixed(0.2),
            vertical: to_fixed(-0.2),
            ..InputState::default()
        };
        assert_eq!(dash_direction(&tiny, -1, deadzone), FixedVec2::LEFT);
    }

    #[test]
    fn test_unobstructed_dash_covers_full_distance() {
        let (world, mut controller) = standing_on_floor();
        let start = controller.position();
        let p = controller.params().clone();

        let report = step(&mut controller, &world, pressed_dash(1, 0));
        assert_eq!(report.vertical_owner, Some(VerticalOwner::Dash));
        assert!(report.events.iter().any(|e| matches!(e.kind, MovementEventKind::DashStarted { .. })));

        for _ in 1..p.dash_steps {
            let report = step(&mut controller, &world, InputState::idle());
            assert_eq!(report.vertical_owner, Some(VerticalOwner::Dash));
        }
        let travelled = controller.position().x - start.x;
        assert!((travelled - p.dash_distance).abs() <= 4, "travelled {}", travelled);
        assert_eq!(controller.position().y, start.y);
        assert!(!controller.state().dash_active);
        assert!(controller.state().dash_just_ended);
    }

    #[test]
    fn test_obstructed_dash_clamps_to_wall() {
        let (world, mut controller) = grounded_beside_wall_at(2.0);
        let start = controller.position();

        step(&mut controller, &world, pressed_dash(1, 0));
        for _ in 0..controller.params().dash_steps + 2 {
            step(&mut controller, &world, InputState::idle());
        }
        let travelled = controller.position().x - start.x;
        assert!((travelled - to_fixed(2.0)).abs() <= 4, "travelled {}", travelled);
    }

    #[test]
    fn test_dash_is_one_shot_until_grounded() {
        let (world, mut controller) = floating(20.0);
        let p = controller.params().clone();

        step(&mut controller, &world, pressed_dash(1, 0));
        for _ in 0..p.dash_steps + 2 {
            step(&mut controller, &world, InputState::idle());
        }
        assert!(!controller.state().can_dash);

        let report = step(&mut controller, &world, pressed_dash(-1, 0));
        assert!(report.events.is_empty());
        assert_ne!(report.vertical_owner, Some(VerticalOwner::Dash));
    }

    #[test]
    fn test_dash_refreshes_on_landing() {
        let (world, mut controller) = floating(1.5);
        step(&mut controller, &world, pressed_dash(1, 0));
        assert!(!controller.state().can_dash);

        for _ in 0..120 {
            step(&mut controller, &world, InputState::idle());
        }
        assert!(controller.state().grounded);
        assert!(controller.state().can_dash);
    }

    #[test]
    fn test_post_dash_applied_once() {
        let (world, mut controller) = floating(20.0);
        let p = controller.params().clone();

        step(&mut controller, &world, pressed_dash(1, 1));
        for _ in 1..p.dash_steps {
            step(&mut controller, &world, axes(1, 1));
        }

        let report = step(&mut controller, &world, axes(1, 1));
        assert_eq!(report.vertical_owner, Some(VerticalOwner::PostDash));
        assert_eq!(report.speed.y, p.post_dash_vertical_speed);
        assert!(report.speed.x <= p.max_move_speed);

        let report = step(&mut controller, &world, axes(1, 1));
        assert_eq!(report.vertical_owner, None);
        assert!(!controller.state().dash_just_ended);
    }

    #[test]
    fn test_dash_wins_over_grab() {
        let (world, mut controller) = beside_wall(6.0);
        step(&mut controller, &world, held(1, 0, crate::game::input::InputFrame::BUTTON_GRAB));

        let mut input = pressed_dash(-1, 0);
        input.grab_held = true;
        let report = step(&mut controller, &world, input);
        assert_eq!(report.vertical_owner, Some(VerticalOwner::Dash));
        assert!(!controller.state().wall_grabbing);

        let mut input = axes(-1, 0);
        input.grab_held = true;
        let report = step(&mut controller, &world, input);
        assert_eq!(report.vertical_owner, Some(VerticalOwner::Dash));
    }
}

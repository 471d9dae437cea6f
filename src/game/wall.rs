//! Wall Stage
//!
//! Slide, wall jump, grab (with ledge auto-climb) and the grab jump. Only
//! runs while airborne and not dashing. Sub-stages run in this order and
//! later ones override earlier ones:
//!
//! | Sub-stage    | Condition                                                  | Effect                          |
//! |--------------|------------------------------------------------------------|---------------------------------|
//! | slide        | touching a wall or stick window active                     | clamp fall to slide speed       |
//! | wall jump    | jump held, grab released, falling, armed, wall in range    | launch away, arm stick window   |
//! | grab         | wall within grab distance, grab held, grab allowance left  | climb by vertical input         |
//! | ledge climb  | grabbing and only the lowest ray touches                   | climb impulse, grab consumed    |
//! | grab jump    | grabbing, jump held inside the apex window                 | hop, or launch if pushing away  |

use crate::collision::probe::CollisionInfo;
use crate::core::fixed::{Fixed, fixed_mul, fixed_sign};
use crate::core::timer::TimerId;
use crate::core::vec2::FixedVec2;
use crate::game::controller::{StepContext, VerticalOwner};
use crate::game::events::MovementEventKind;
use crate::game::state::MovementState;

/// Run the wall stage.
pub(crate) fn process_wall(state: &mut MovementState, ctx: &mut StepContext<'_>) {
    let p = ctx.params;
    let grounded = ctx.report.grounded();

    state.timers.reset_or_decay(TimerId::WallGrab, grounded, p.wall_grab_steps);

    if grounded {
        state.timers.clear(TimerId::WallStick);
        state.wall_jump_in_progress = false;
        state.can_wall_jump = false;
    }
    if grounded || state.dash_active {
        state.wall_grabbing = false;
        state.timers.clear(TimerId::WallGrabJumpApex);
        return;
    }

    // Stick window
    state.timers.decay(TimerId::WallStick);
    if !state.timers.is_active(TimerId::WallStick) {
        state.wall_jump_in_progress = false;
    }

    let wall = ctx.report.closest_horizontal(state.facing);
    let wall_dir = wall.map_or(0, |(side, _)| side.sign());
    let info: Option<CollisionInfo> = wall.map(|(_, info)| info);
    let near_wall = info.is_some();
    let on_wall = info.map_or(false, |i| i.colliding);
    let within_grab = info.map_or(false, |i| i.distance <= p.grab_distance);

    if ctx.input.jump_pressed && near_wall {
        state.can_wall_jump = true;
    }

    // Slide
    let sliding = on_wall || state.timers.is_active(TimerId::WallStick);
    if sliding && state.speed.y < -p.wall_slide_speed {
        ctx.set_vertical(state, -p.wall_slide_speed, VerticalOwner::WallSlide);
    }

    // Wall jump
    let mut launched = false;
    if ctx.input.jump_held
        && !ctx.input.grab_held
        && state.speed.y < 0
        && state.can_wall_jump
        && near_wall
    {
        launch_off_wall(state, ctx, -wall_dir);
        launched = true;
    }

    // Grab
    let grabbing = !launched
        && within_grab
        && ctx.input.grab_held
        && state.timers.is_active(TimerId::WallGrab);
    state.wall_grabbing = grabbing;

    let Some(info) = info.filter(|_| grabbing) else {
        state.timers.clear(TimerId::WallGrabJumpApex);
        return;
    };

    if info.is_ledge() {
        let climb = p.top_edge_climb_speed;
        state.speed.x = climb.x * wall_dir;
        ctx.set_vertical(state, climb.y, VerticalOwner::EdgeClimb);
        state.timers.clear(TimerId::WallGrab);
        state.timers.clear(TimerId::WallGrabJumpApex);
        state.wall_grabbing = false;
        ctx.emit(MovementEventKind::EdgeClimbed { wall: wall_dir });
        return;
    }

    state.speed.x = 0;
    let climb = fixed_mul(p.wall_climb_speed, ctx.input.vertical);
    ctx.set_vertical(state, climb, VerticalOwner::WallGrab);

    // Grab jump
    if ctx.input.jump_pressed {
        state.timers.arm(TimerId::WallGrabJumpApex, p.wall_grab_jump_apex_steps);
    }
    if state.timers.is_active(TimerId::WallGrabJumpApex) && ctx.input.jump_held {
        if fixed_sign(ctx.input.horizontal) == -wall_dir {
            state.timers.clear(TimerId::WallGrabJumpApex);
            launch_off_wall(state, ctx, -wall_dir);
            return;
        }
        let elapsed = p
            .wall_grab_jump_apex_steps
            .saturating_sub(state.timers.remaining(TimerId::WallGrabJumpApex));
        let hop = p.wall_grab_jump_speed - p.gravity_step * elapsed as Fixed;
        ctx.set_vertical(state, hop, VerticalOwner::WallGrabJump);
    }
    state.timers.decay(TimerId::WallGrabJumpApex);
}

/// Launch with the wall jump impulse in `direction` (-1 or 1).
fn launch_off_wall(state: &mut MovementState, ctx: &mut StepContext<'_>, direction: i32) {
    let p = ctx.params;
    let direction = if direction == 0 { -state.facing } else { direction };
    let impulse: FixedVec2 = p.wall_jump_impulse;

    state.speed.x = impulse.x * direction;
    ctx.set_vertical(state, impulse.y, VerticalOwner::WallJump);
    state.timers.arm(TimerId::WallStick, p.wall_stick_steps);
    state.timers.clear(TimerId::JumpBuffer);
    state.wall_jump_in_progress = true;
    state.can_wall_jump = false;
    state.wall_grabbing = false;
    state.facing = direction;
    ctx.emit(MovementEventKind::WallJumped { direction });
}

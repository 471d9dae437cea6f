//! Jump Stage
//!
//! Coyote time, jump buffering, variable jump height and landing detection.
//!
//! ```text
//!   grounded ──► coyote = window        jump pressed ──► buffer = window
//!   airborne ──► coyote - 1             otherwise    ──► buffer - 1
//!
//!   buffer > 0 && (grounded || coyote > 0)  ──►  speed.y = max jump speed
//!   jump released && speed.y > min jump     ──►  speed.y = min jump speed
//! ```
//!
//! Both windows are read before this step's decay, so a step that starts
//! with one count left is still inside the window.

use crate::core::timer::TimerId;
use crate::game::controller::{StepContext, VerticalOwner};
use crate::game::events::MovementEventKind;
use crate::game::state::MovementState;

/// Run the jump stage.
pub(crate) fn process_jump(state: &mut MovementState, ctx: &mut StepContext<'_>) {
    let p = ctx.params;
    let grounded = ctx.report.grounded();

    let can_jump = grounded || state.timers.is_active(TimerId::Coyote);
    let mut buffered = ctx.input.jump_pressed || state.timers.is_active(TimerId::JumpBuffer);

    state.timers.reset_or_decay(TimerId::Coyote, grounded, p.coyote_steps);
    state.timers.reset_or_decay(TimerId::JumpBuffer, ctx.input.jump_pressed, p.jump_buffer_steps);

    // Still rising on contact: the press was already spent on this jump
    if grounded && state.speed.y > 0 {
        state.timers.clear(TimerId::JumpBuffer);
        buffered = false;
    }

    if grounded {
        if state.can_land {
            state.can_land = false;
            ctx.emit(MovementEventKind::Landed);
        }
    } else {
        state.can_land = true;
    }

    if buffered && can_jump {
        ctx.set_vertical(state, p.max_jump_speed, VerticalOwner::Jump);
        state.timers.clear(TimerId::JumpBuffer);
        state.timers.clear(TimerId::Coyote);
        ctx.emit(MovementEventKind::JumpStarted { via_coyote: !grounded });
    }

    if ctx.input.jump_released && state.speed.y > p.min_jump_speed {
        ctx.set_vertical(state, p.min_jump_speed, VerticalOwner::JumpCut);
    }
}

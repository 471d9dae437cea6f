//! Movement properties checked through the public API.

use ledgerun::collision::{Aabb, BoxWorld};
use ledgerun::core::fixed::{fixed_from_f64, fixed_mul, to_fixed, Fixed, FIXED_ONE};
use ledgerun::core::vec2::FixedVec2;
use ledgerun::game::controller::{StepReport, VerticalOwner};
use ledgerun::game::events::MovementEventKind;
use ledgerun::game::input::{InputFrame, InputRecording, InputState, LiveInput, RecordedInput};
use ledgerun::game::{MovementConfig, MovementController, Simulation};
use ledgerun::replay::{verify_transcript, TranscriptRecorder};

use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const SOLID: u32 = 0b01;

fn floor_world() -> BoxWorld {
    let mut world = BoxWorld::new();
    world.add_box(Aabb::from_floats(-200.0, -1.0, 200.0, 0.0), SOLID);
    world
}

fn controller_at(x: f64, y: f64) -> MovementController {
    MovementController::new(MovementConfig::default(), FixedVec2::from_floats(x, y))
}

fn standing() -> MovementController {
    controller_at(0.0, 0.9)
}

fn axes(h: Fixed) -> InputState {
    InputState {
        horizontal: h,
        ..InputState::default()
    }
}

fn jump_press() -> InputState {
    InputState {
        jump_held: true,
        jump_pressed: true,
        ..InputState::default()
    }
}

fn jump_hold() -> InputState {
    InputState {
        jump_held: true,
        ..InputState::default()
    }
}

fn jumped(report: &StepReport) -> bool {
    report
        .events
        .iter()
        .any(|e| matches!(e.kind, MovementEventKind::JumpStarted { .. }))
}

#[test]
fn grounded_idle_keeps_height() {
    let world = floor_world();
    let mut controller = standing();
    let y = controller.position().y;

    for _ in 0..600 {
        controller.step_with_input(&InputState::idle(), &world, None);
        assert_eq!(controller.position().y, y);
    }
}

#[test]
fn jump_speeds_follow_kinematics() {
    let world = floor_world();
    let mut controller = standing();

    // gravity = 2·4 / 0.4² = 50, jump = 50·0.4 = 20, min = √(2·50·1) = 10
    let report = controller.step_with_input(&jump_press(), &world, None);
    assert_eq!(report.speed.y, fixed_from_f64(20.0));

    let released = InputState {
        jump_released: true,
        ..InputState::default()
    };
    let report = controller.step_with_input(&released, &world, None);
    assert_eq!(report.speed.y, fixed_from_f64(10.0));
}

#[test]
fn walk_scenario_matches_closed_form() {
    let world = floor_world();
    let mut controller = standing();
    let dt = controller.params().dt;
    let mut x = controller.position().x;

    for k in 1..=10 {
        let report = controller.step_with_input(&axes(FIXED_ONE), &world, None);
        let expected = to_fixed(13.0).min(to_fixed(180.0 / 60.0) * k);
        assert_eq!(report.speed.x, expected);
        x += fixed_mul(expected, dt);
        assert_eq!(report.position.x, x);
    }
}

/// Walk off a ledge, idle `idle` airborne steps, then press jump.
fn coyote_attempt(idle: u32) -> bool {
    let mut world = BoxWorld::new();
    world.add_box(Aabb::from_floats(-100.0, -1.0, 0.5, 0.0), SOLID);
    let mut controller = standing();

    while controller.step_with_input(&axes(FIXED_ONE), &world, None).grounded {}
    for _ in 0..idle {
        controller.step_with_input(&InputState::idle(), &world, None);
    }
    jumped(&controller.step_with_input(&jump_press(), &world, None))
}

#[test]
fn coyote_window_is_exact() {
    let window = standing().params().coyote_steps;
    assert_eq!(window, 6);

    // The walk-off step is airborne step 1, the press lands on step idle + 2
    for idle in 0..window + 2 {
        assert_eq!(coyote_attempt(idle), idle + 2 <= window, "idle steps: {}", idle);
    }
}

#[test]
fn buffered_jump_fires_within_window_only() {
    let world = floor_world();
    let buffer = standing().params().jump_buffer_steps;
    let mut landed_at_window = false;

    for hundredths in 5..=300 {
        let height = 0.9 + f64::from(hundredths) / 100.0;

        // Steps from the press until the first grounded step
        let mut dry = controller_at(0.0, height);
        let mut steps_to_land = 0;
        while !dry.step_with_input(&jump_hold(), &world, None).grounded {
            steps_to_land += 1;
        }

        let mut wet = controller_at(0.0, height);
        let mut report = wet.step_with_input(&jump_press(), &world, None);
        for _ in 0..steps_to_land {
            report = wet.step_with_input(&jump_hold(), &world, None);
        }
        assert!(report.grounded);
        assert_eq!(
            jumped(&report),
            steps_to_land <= buffer,
            "landed {} steps after the press",
            steps_to_land
        );
        landed_at_window |= steps_to_land == buffer;
    }
    assert!(landed_at_window);
}

fn dash_travel(wall_gap: Option<f64>) -> Fixed {
    let mut world = floor_world();
    if let Some(gap) = wall_gap {
        world.add_box(Aabb::from_floats(0.4 + gap, 0.0, 0.4 + gap + 1.0, 10.0), SOLID);
    }
    let mut controller = standing();
    let start = controller.position().x;
    let dash = InputState {
        horizontal: FIXED_ONE,
        dash_pressed: true,
        ..InputState::default()
    };

    // Measured at the end of the active window, before post-dash drift
    let mut report = controller.step_with_input(&dash, &world, None);
    for _ in 1..controller.params().dash_steps {
        report = controller.step_with_input(&InputState::idle(), &world, None);
    }
    assert_eq!(report.vertical_owner, Some(VerticalOwner::Dash));
    assert!(!controller.state().dash_active);
    controller.position().x - start
}

#[test]
fn dash_travels_full_distance_or_to_obstruction() {
    let full = standing().params().dash_distance;
    assert!((dash_travel(None) - full).abs() <= 4);

    for gap in [0.5, 1.25, 3.0] {
        let travel = dash_travel(Some(gap));
        assert!((travel - fixed_from_f64(gap)).abs() <= 8, "gap {}: travelled {}", gap, travel);
    }
}

#[test]
fn seeded_random_run_verifies() {
    let mut rng = StdRng::seed_from_u64(0x1ed9e);
    let mut world = floor_world();
    world.add_box(Aabb::from_floats(10.0, 0.0, 12.0, 8.0), SOLID);
    world.add_box(Aabb::from_floats(-12.0, 0.0, -10.0, 8.0), SOLID);

    let mut sim = Simulation::new(world, 60);
    let (live, handle) = LiveInput::channel();
    sim.add_character(MovementConfig::default(), FixedVec2::from_floats(0.0, 0.9), Box::new(live));
    let mut recorder = TranscriptRecorder::new(&sim).unwrap();

    for _ in 0..900 {
        if rng.gen_bool(0.1) {
            handle.set_axes(rng.gen_range(-128..=127), rng.gen_range(-128..=127));
        }
        for button in [InputFrame::BUTTON_JUMP, InputFrame::BUTTON_GRAB, InputFrame::BUTTON_DASH] {
            if rng.gen_bool(0.05) {
                if handle.held().is_held(button) {
                    handle.release(button);
                } else {
                    handle.press(button);
                }
            }
        }
        let result = sim.tick();
        recorder.observe(&sim, &result);
    }

    let transcript = recorder.finish(&sim);
    let result = verify_transcript(&transcript);
    assert!(result.valid, "{:?}", result.error);
}

fn frame_strategy() -> impl Strategy<Value = InputFrame> {
    (any::<i8>(), any::<i8>(), 0u8..8).prop_map(|(move_x, move_y, buttons)| InputFrame {
        move_x,
        move_y,
        buttons,
    })
}

/// Frames held for a few steps each, like a real player.
fn script_strategy() -> impl Strategy<Value = Vec<(InputFrame, u32)>> {
    proptest::collection::vec((frame_strategy(), 1u32..20), 1..30)
}

fn expand(script: &[(InputFrame, u32)]) -> Vec<InputFrame> {
    script
        .iter()
        .flat_map(|&(frame, steps)| std::iter::repeat(frame).take(steps as usize))
        .collect()
}

fn run_frames(frames: &[InputFrame], world: &BoxWorld) -> Vec<StepReport> {
    let mut controller = controller_at(0.0, 3.0);
    let mut previous = InputFrame::new();
    frames
        .iter()
        .map(|frame| {
            let input = InputState::derive(&previous, frame);
            previous = *frame;
            controller.step_with_input(&input, world, None)
        })
        .collect()
}

fn walled_world() -> BoxWorld {
    let mut world = floor_world();
    world.add_box(Aabb::from_floats(4.0, 0.0, 6.0, 12.0), SOLID);
    world.add_box(Aabb::from_floats(-6.0, 0.0, -4.0, 12.0), SOLID);
    world.add_box(Aabb::from_floats(-4.0, 7.0, 4.0, 8.0), SOLID);
    world
}

proptest! {
    #[test]
    fn fall_speed_stays_in_range(script in script_strategy()) {
        let world = walled_world();
        let params = standing().params().clone();

        for report in run_frames(&expand(&script), &world) {
            if report.speed.y < 0 && report.vertical_owner != Some(VerticalOwner::Dash) {
                prop_assert!(-report.speed.y <= params.max_fall_speed);
                prop_assert!(-report.speed.y >= params.min_fall_speed);
            }
        }
    }

    #[test]
    fn identical_inputs_identical_positions(script in script_strategy()) {
        let world = walled_world();
        let frames = expand(&script);

        let a: Vec<FixedVec2> = run_frames(&frames, &world).iter().map(|r| r.position).collect();
        let b: Vec<FixedVec2> = run_frames(&frames, &world).iter().map(|r| r.position).collect();
        prop_assert_eq!(a, b);
    }

    #[test]
    fn recorded_playback_matches_direct_stepping(script in script_strategy()) {
        let frames = expand(&script);
        let recording = InputRecording::from_frames(
            frames.iter().enumerate().map(|(i, f)| (i as u32, *f)),
        );

        let world = walled_world();
        let direct: Vec<FixedVec2> = run_frames(&frames, &world).iter().map(|r| r.position).collect();

        let mut controller = controller_at(0.0, 3.0)
            .with_input(Box::new(RecordedInput::new(recording)));
        let mut played = Vec::new();
        for _ in 0..frames.len() {
            if let Some((_, report)) = controller.fixed_step(&world, None) {
                played.push(report.position);
            }
        }
        prop_assert_eq!(direct, played);
    }
}

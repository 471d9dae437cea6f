//! Ledgerun Sim
//!
//! Headless demo: runs a scripted character through a small level at a
//! variable presentation frame rate, records the run and verifies the replay.
//!
//! Usage: `ledgerun-sim [config.json] [transcript-out.bin]`

use anyhow::{bail, Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use ledgerun::{
    TICK_RATE, VERSION,
    collision::{Aabb, BoxWorld},
    core::vec2::FixedVec2,
    game::{
        events::MovementEventKind,
        input::{InputFrame, LiveInput, LiveInputHandle},
        MovementConfig, Simulation,
    },
    replay::{verify_transcript, TranscriptRecorder},
};

const SOLID: u32 = 0b01;
const PLATFORM: u32 = 0b10;

/// Demo length in presentation frames.
const DEMO_FRAMES: u32 = 1200;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Ledgerun Sim v{}", VERSION);
    info!("Tick Rate: {} Hz", TICK_RATE);

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => {
            let json = std::fs::read_to_string(&path)
                .with_context(|| format!("reading config {}", path))?;
            MovementConfig::from_json_str(&json).with_context(|| format!("parsing config {}", path))?
        }
        None => MovementConfig::default(),
    };
    if let Err(e) = config.validate() {
        info!(error = %e, "Config will be sanitized");
    }

    demo_run(config, args.next())
}

fn demo_level() -> BoxWorld {
    let mut world = BoxWorld::new();
    // Ground with a gap
    world.add_box(Aabb::from_floats(-30.0, -2.0, 12.0, 0.0), SOLID);
    world.add_box(Aabb::from_floats(16.0, -2.0, 60.0, 0.0), SOLID);
    // Climbable wall with a ledge at y = 5
    world.add_box(Aabb::from_floats(24.0, 0.0, 26.0, 5.0), SOLID);
    // Ceiling block
    world.add_box(Aabb::from_floats(-6.0, 3.5, -2.0, 4.5), SOLID);
    // Platform drifting right over the gap
    world.add_platform(
        Aabb::from_floats(8.0, -0.5, 11.0, 0.0),
        PLATFORM,
        FixedVec2::from_floats(0.5, 0.0),
    );
    world
}

/// Presentation-side script: what the "player" is doing at frame `f`.
fn drive(handle: &LiveInputHandle, frame: u32) {
    match frame {
        0 => handle.set_axes(127, InputFrame::NO_INPUT),
        150 => handle.press(InputFrame::BUTTON_JUMP),
        175 => handle.release(InputFrame::BUTTON_JUMP),
        330 => handle.press(InputFrame::BUTTON_JUMP),
        340 => handle.release(InputFrame::BUTTON_JUMP),
        480 => handle.press(InputFrame::BUTTON_GRAB),
        500 => handle.set_axes(127, 127),
        640 => {
            handle.release(InputFrame::BUTTON_GRAB);
            handle.set_axes(127, InputFrame::NO_INPUT);
        }
        760 => handle.press(InputFrame::BUTTON_DASH),
        762 => handle.release(InputFrame::BUTTON_DASH),
        900 => handle.set_axes(-127, InputFrame::NO_INPUT),
        1000 => handle.set_axes(InputFrame::NO_INPUT, InputFrame::NO_INPUT),
        _ => {}
    }
}

fn demo_run(config: MovementConfig, transcript_out: Option<String>) -> Result<()> {
    info!("=== Starting Demo Run ===");

    let mut sim = Simulation::new(demo_level(), TICK_RATE);
    let (live, handle) = LiveInput::channel();
    let runner = sim.add_character(config, FixedVec2::from_floats(-20.0, 0.9), Box::new(live));
    let mut recorder = TranscriptRecorder::new(&sim)?;

    // Jittery ~144 fps presentation clock
    let frame_times = [1.0 / 144.0, 1.0 / 120.0, 1.0 / 165.0, 1.0 / 144.0];
    let mut total_events = 0;

    for f in 0..DEMO_FRAMES {
        drive(&handle, f);
        for result in sim.run_frame(frame_times[(f % 4) as usize]) {
            recorder.observe(&sim, &result);
            total_events += result.events.len();

            for event in &result.events {
                match event.event.kind {
                    MovementEventKind::WallJumped { direction } => {
                        info!("Tick {}: {} wall jumped ({})", event.tick, event.character, direction);
                    }
                    MovementEventKind::EdgeClimbed { .. } => {
                        info!("Tick {}: {} climbed a ledge", event.tick, event.character);
                    }
                    MovementEventKind::DashStarted { target, .. } => {
                        info!("Tick {}: {} dashed toward {}", event.tick, event.character, target);
                    }
                    _ => {}
                }
            }
        }
    }

    if let Some(character) = sim.character(runner) {
        info!(
            "Runner at {} after {} steps, grounded: {}",
            character.position(),
            character.step_count(),
            character.state().grounded
        );
    }
    info!("Ticks: {}, events: {}", sim.current_tick(), total_events);

    // Record and verify
    let transcript = recorder.finish(&sim);
    let bytes = transcript.to_bytes()?;
    info!(
        "Transcript: {} bytes, {} input changes, {} checkpoints",
        bytes.len(),
        transcript.delta_count(),
        transcript.checkpoints.len()
    );

    if let Some(path) = transcript_out {
        std::fs::write(&path, &bytes).with_context(|| format!("writing transcript {}", path))?;
        info!("Transcript written to {}", path);
    }

    info!("=== Verifying Replay ===");
    let result = verify_transcript(&transcript);
    info!("Final State Hash: {}", hex::encode(result.computed_final_hash));
    if !result.valid {
        bail!("replay verification failed: {:?}", result.error);
    }
    info!("Replay verified over {} checkpoints", result.checkpoint_results.len());

    Ok(())
}

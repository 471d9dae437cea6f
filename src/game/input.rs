//! Input Capture and Normalization
//!
//! Raw held state is captured as an [`InputFrame`] once per fixed step. The
//! controller never sees frames directly: it sees an [`InputState`], derived
//! from two consecutive frames, in which press/release edges are true for
//! exactly one step per transition.
//!
//! ```text
//!   presentation clock          fixed clock
//!   ──────────────────          ───────────
//!   LiveInputHandle ──┐
//!                     ├──► InputSource::next_frame(tick) ──► InputState::derive(prev, curr)
//!   InputRecording ───┘                                          │
//!                                                                ▼
//!                                                       MovementController
//! ```
//!
//! Live and recorded sources hand out identical frames for an identical
//! sequence, which is what makes replays bit-exact.

use std::cell::RefCell;
use std::rc::Rc;

use serde::{Serialize, Deserialize};

use crate::core::fixed::Fixed;

// =============================================================================
// AXIS LOOKUP TABLE
// =============================================================================

/// Axis value `i8` → `Fixed` in [-1, 1].
///
/// `(value * 65536) / 127` is not exact, so all 256 results are precomputed
/// with integer division. Index 128 (`-128` as `i8`) is "stick released" and
/// maps to 0.
pub static MOVE_LUT: [Fixed; 256] = {
    let mut lut = [0i32; 256];
    let mut i = 0i32;
    while i < 256 {
        let signed = if i < 128 { i } else { i - 256 };
        lut[i as usize] = if signed == -128 { 0 } else { (signed * 65536) / 127 };
        i += 1;
    }
    lut
};

/// Convert an axis byte to fixed-point.
#[inline]
pub fn move_to_fixed(input: i8) -> Fixed {
    MOVE_LUT[(input as u8) as usize]
}

// =============================================================================
// INPUT FRAME
// =============================================================================

/// Held input sampled for one fixed step. This is the recorded unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(C)]
pub struct InputFrame {
    /// Horizontal axis: -127 (left) to +127 (right), -128 released
    pub move_x: i8,
    /// Vertical axis: -127 (down) to +127 (up), -128 released
    pub move_y: i8,
    /// Held buttons (`BUTTON_*` bits)
    pub buttons: u8,
}

impl Default for InputFrame {
    fn default() -> Self {
        Self::new()
    }
}

impl InputFrame {
    /// Size in bytes
    pub const SIZE: usize = 3;

    /// Axis value for a released stick
    pub const NO_INPUT: i8 = -128;

    /// Jump button bit
    pub const BUTTON_JUMP: u8 = 0x01;

    /// Grab button bit
    pub const BUTTON_GRAB: u8 = 0x02;

    /// Dash button bit
    pub const BUTTON_DASH: u8 = 0x04;

    /// Nothing held.
    pub const fn new() -> Self {
        Self {
            move_x: Self::NO_INPUT,
            move_y: Self::NO_INPUT,
            buttons: 0,
        }
    }

    /// Axes held, no buttons.
    pub const fn with_axes(move_x: i8, move_y: i8) -> Self {
        Self {
            move_x,
            move_y,
            buttons: 0,
        }
    }

    /// Same frame with extra buttons held.
    pub const fn with_buttons(mut self, buttons: u8) -> Self {
        self.buttons |= buttons;
        self
    }

    /// Horizontal axis in [-1, 1].
    #[inline]
    pub fn horizontal(&self) -> Fixed {
        move_to_fixed(self.move_x)
    }

    /// Vertical axis in [-1, 1].
    #[inline]
    pub fn vertical(&self) -> Fixed {
        move_to_fixed(self.move_y)
    }

    /// Whether all bits of `button` are held.
    #[inline]
    pub fn is_held(&self, button: u8) -> bool {
        self.buttons & button == button
    }

    /// Jump held.
    #[inline]
    pub fn jump_held(&self) -> bool {
        self.is_held(Self::BUTTON_JUMP)
    }

    /// Grab held.
    #[inline]
    pub fn grab_held(&self) -> bool {
        self.is_held(Self::BUTTON_GRAB)
    }

    /// Dash held.
    #[inline]
    pub fn dash_held(&self) -> bool {
        self.is_held(Self::BUTTON_DASH)
    }

    /// Set or clear a button.
    #[inline]
    pub fn set_button(&mut self, button: u8, held: bool) {
        if held {
            self.buttons |= button;
        } else {
            self.buttons &= !button;
        }
    }

    /// No axis deflected and no button held.
    #[inline]
    pub fn is_idle(&self) -> bool {
        self.horizontal() == 0 && self.vertical() == 0 && self.buttons == 0
    }
}

// =============================================================================
// INPUT STATE
// =============================================================================

/// Immutable per-step snapshot consumed by the movement pipeline.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InputState {
    /// Horizontal axis in [-1, 1]
    pub horizontal: Fixed,
    /// Vertical axis in [-1, 1]
    pub vertical: Fixed,
    /// Jump currently held
    pub jump_held: bool,
    /// Grab currently held
    pub grab_held: bool,
    /// Jump went down this step
    pub jump_pressed: bool,
    /// Jump went up this step
    pub jump_released: bool,
    /// Dash went down this step
    pub dash_pressed: bool,
}

impl InputState {
    /// Snapshot for `current`, with edges computed against `previous`.
    pub fn derive(previous: &InputFrame, current: &InputFrame) -> Self {
        Self {
            horizontal: current.horizontal(),
            vertical: current.vertical(),
            jump_held: current.jump_held(),
            grab_held: current.grab_held(),
            jump_pressed: current.jump_held() && !previous.jump_held(),
            jump_released: !current.jump_held() && previous.jump_held(),
            dash_pressed: current.dash_held() && !previous.dash_held(),
        }
    }

    /// No input at all.
    pub fn idle() -> Self {
        Self::default()
    }
}

// =============================================================================
// INPUT SOURCES
// =============================================================================

/// Supplies one held-input frame per fixed step.
pub trait InputSource {
    /// Frame for simulation tick `tick`. Called exactly once per step.
    fn next_frame(&mut self, tick: u32) -> InputFrame;
}

#[derive(Debug, Default)]
struct LiveShared {
    held: InputFrame,
    latched: u8,
}

/// Device-driven input sampled by the fixed clock.
///
/// The presentation side writes through a [`LiveInputHandle`]. Buttons pressed
/// since the previous step are latched, so a tap shorter than one step is
/// still seen as held for one step.
#[derive(Debug)]
pub struct LiveInput {
    shared: Rc<RefCell<LiveShared>>,
}

/// Presentation-side writer for a [`LiveInput`].
#[derive(Clone, Debug)]
pub struct LiveInputHandle {
    shared: Rc<RefCell<LiveShared>>,
}

impl LiveInput {
    /// New live source and its writer.
    pub fn channel() -> (Self, LiveInputHandle) {
        let shared = Rc::new(RefCell::new(LiveShared::default()));
        (
            Self { shared: Rc::clone(&shared) },
            LiveInputHandle { shared },
        )
    }
}

impl InputSource for LiveInput {
    fn next_frame(&mut self, _tick: u32) -> InputFrame {
        let mut shared = self.shared.borrow_mut();
        let frame = shared.held.with_buttons(shared.latched);
        shared.latched = 0;
        frame
    }
}

impl LiveInputHandle {
    /// Set both axes.
    pub fn set_axes(&self, move_x: i8, move_y: i8) {
        let mut shared = self.shared.borrow_mut();
        shared.held.move_x = move_x;
        shared.held.move_y = move_y;
    }

    /// Button went down.
    pub fn press(&self, button: u8) {
        let mut shared = self.shared.borrow_mut();
        shared.held.set_button(button, true);
        shared.latched |= button;
    }

    /// Button went up.
    pub fn release(&self, button: u8) {
        self.shared.borrow_mut().held.set_button(button, false);
    }

    /// Currently held state.
    pub fn held(&self) -> InputFrame {
        self.shared.borrow().held
    }
}

/// Plays an [`InputRecording`] back.
#[derive(Clone, Debug)]
pub struct RecordedInput {
    recording: InputRecording,
}

impl RecordedInput {
    /// Play `recording` from its first tick.
    pub fn new(recording: InputRecording) -> Self {
        Self { recording }
    }

    /// The underlying recording.
    pub fn recording(&self) -> &InputRecording {
        &self.recording
    }
}

impl InputSource for RecordedInput {
    fn next_frame(&mut self, tick: u32) -> InputFrame {
        self.recording.frame_at(tick)
    }
}

// =============================================================================
// INPUT RECORDING
// =============================================================================

/// Input change at a tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputDelta {
    /// Tick the new frame starts at
    pub tick: u32,
    /// The new frame
    pub frame: InputFrame,
}

impl InputDelta {
    /// Size in bytes (approximate)
    pub const SIZE: usize = 8;

    /// Create new delta entry.
    pub fn new(tick: u32, frame: InputFrame) -> Self {
        Self { tick, frame }
    }
}

/// Delta-compressed input history of one character.
///
/// Only ticks where the frame changed are stored.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct InputRecording {
    /// First recorded tick
    pub start_tick: u32,
    /// Last recorded tick
    pub end_tick: u32,
    deltas: Vec<InputDelta>,
    #[serde(skip)]
    last_frame: InputFrame,
}

impl InputRecording {
    /// Empty recording starting at `start_tick`.
    pub fn new(start_tick: u32) -> Self {
        Self {
            start_tick,
            end_tick: start_tick,
            deltas: Vec::with_capacity(256),
            last_frame: InputFrame::new(),
        }
    }

    /// Build from `(tick, frame)` pairs in tick order.
    pub fn from_frames<I>(frames: I) -> Self
    where
        I: IntoIterator<Item = (u32, InputFrame)>,
    {
        let mut recording = Self::new(0);
        for (tick, frame) in frames {
            recording.record(tick, frame);
        }
        recording
    }

    /// Record the frame consumed at `tick`. Stored only if it changed.
    pub fn record(&mut self, tick: u32, frame: InputFrame) {
        self.end_tick = tick;
        if frame != self.last_frame {
            self.deltas.push(InputDelta::new(tick, frame));
            self.last_frame = frame;
        }
    }

    /// Frame in effect at `tick` (idle before the first change).
    pub fn frame_at(&self, tick: u32) -> InputFrame {
        let idx = self.deltas.partition_point(|d| d.tick <= tick);
        if idx == 0 {
            InputFrame::new()
        } else {
            self.deltas[idx - 1].frame
        }
    }

    /// Stored changes.
    pub fn deltas(&self) -> &[InputDelta] {
        &self.deltas
    }

    /// Number of stored changes.
    pub fn delta_count(&self) -> usize {
        self.deltas.len()
    }

    /// Mark the last tick.
    pub fn finalize(&mut self, end_tick: u32) {
        self.end_tick = end_tick;
    }

    /// Iterate every tick from start to end inclusive.
    pub fn replay_iter(&self) -> ReplayIterator<'_> {
        ReplayIterator {
            recording: self,
            current_tick: self.start_tick,
            delta_idx: 0,
            current_frame: InputFrame::new(),
        }
    }
}

impl PartialEq for InputRecording {
    fn eq(&self, other: &Self) -> bool {
        self.start_tick == other.start_tick
            && self.end_tick == other.end_tick
            && self.deltas == other.deltas
    }
}

impl Eq for InputRecording {}

/// Tick-by-tick iterator over a recording.
pub struct ReplayIterator<'a> {
    recording: &'a InputRecording,
    current_tick: u32,
    delta_idx: usize,
    current_frame: InputFrame,
}

impl<'a> Iterator for ReplayIterator<'a> {
    type Item = (u32, InputFrame);

    fn next(&mut self) -> Option<Self::Item> {
        if self.current_tick > self.recording.end_tick {
            return None;
        }

        while let Some(delta) = self.recording.deltas.get(self.delta_idx) {
            if delta.tick > self.current_tick {
                break;
            }
            self.current_frame = delta.frame;
            self.delta_idx += 1;
        }

        let result = (self.current_tick, self.current_frame);
        self.current_tick += 1;
        Some(result)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixed::FIXED_ONE;

    const JUMP: u8 = InputFrame::BUTTON_JUMP;
    const DASH: u8 = InputFrame::BUTTON_DASH;

    #[test]
    fn test_move_lut_values() {
        assert_eq!(MOVE_LUT[0], 0);
        assert_eq!(MOVE_LUT[127], FIXED_ONE);
        assert_eq!(MOVE_LUT[129], -FIXED_ONE);
        assert_eq!(MOVE_LUT[128], 0);

        for i in 1..=127 {
            assert_eq!(MOVE_LUT[i], -MOVE_LUT[256 - i], "LUT should be symmetric for {}", i);
        }
    }

    #[test]
    fn test_frame_buttons() {
        let mut frame = InputFrame::new();
        assert!(frame.is_idle());

        frame.set_button(JUMP, true);
        assert!(frame.jump_held());
        assert!(!frame.grab_held());

        frame.set_button(InputFrame::BUTTON_GRAB, true);
        frame.set_button(JUMP, false);
        assert!(!frame.jump_held());
        assert!(frame.grab_held());
        assert!(!frame.is_idle());
    }

    #[test]
    fn test_derive_edges_fire_once() {
        let idle = InputFrame::new();
        let jumping = InputFrame::with_axes(127, 0).with_buttons(JUMP | DASH);

        let down = InputState::derive(&idle, &jumping);
        assert!(down.jump_pressed && down.jump_held && down.dash_pressed);
        assert!(!down.jump_released);
        assert_eq!(down.horizontal, FIXED_ONE);

        let still = InputState::derive(&jumping, &jumping);
        assert!(still.jump_held);
        assert!(!still.jump_pressed && !still.dash_pressed && !still.jump_released);

        let up = InputState::derive(&jumping, &idle);
        assert!(up.jump_released);
        assert!(!up.jump_held && !up.jump_pressed);
    }

    #[test]
    fn test_live_input_latches_short_taps() {
        let (mut live, handle) = LiveInput::channel();

        // Pressed and released between two steps
        handle.press(JUMP);
        handle.release(JUMP);
        assert!(live.next_frame(0).jump_held());
        assert!(!live.next_frame(1).jump_held());

        handle.set_axes(-127, 0);
        handle.press(DASH);
        let frame = live.next_frame(2);
        assert!(frame.dash_held());
        assert_eq!(frame.horizontal(), -FIXED_ONE);
        assert!(handle.held().dash_held());
    }

    #[test]
    fn test_recording_delta_compression() {
        let mut recording = InputRecording::new(0);
        let frame = InputFrame::with_axes(100, 50);
        for tick in 0..4 {
            recording.record(tick, frame);
        }
        assert_eq!(recording.delta_count(), 1);

        recording.record(4, InputFrame::with_axes(-100, -50));
        assert_eq!(recording.delta_count(), 2);
        assert_eq!(recording.end_tick, 4);
    }

    #[test]
    fn test_recording_frame_at() {
        let f1 = InputFrame::with_axes(50, 0);
        let f2 = InputFrame::with_axes(-50, 0).with_buttons(JUMP);
        let recording = InputRecording::from_frames([(10, f1), (20, f2)]);

        assert!(recording.frame_at(5).is_idle());
        assert_eq!(recording.frame_at(10), f1);
        assert_eq!(recording.frame_at(19), f1);
        assert_eq!(recording.frame_at(20), f2);
        assert_eq!(recording.frame_at(500), f2);
    }

    #[test]
    fn test_replay_iterator_covers_every_tick() {
        let mut recording = InputRecording::new(0);
        recording.record(0, InputFrame::with_axes(10, 0));
        recording.record(3, InputFrame::with_axes(20, 0));
        recording.finalize(5);

        let frames: Vec<_> = recording.replay_iter().collect();
        assert_eq!(frames.len(), 6);
        assert_eq!(frames[2].1.move_x, 10);
        assert_eq!(frames[3].1.move_x, 20);
        assert_eq!(frames[5], (5, InputFrame::with_axes(20, 0)));
    }

    #[test]
    fn test_recorded_input_matches_live_sequence() {
        let (mut live, handle) = LiveInput::channel();
        let mut recording = InputRecording::new(0);

        handle.set_axes(127, 0);
        for tick in 0..10 {
            if tick == 4 {
                handle.press(JUMP);
            }
            if tick == 7 {
                handle.release(JUMP);
            }
            recording.record(tick, live.next_frame(tick));
        }

        let mut replay = RecordedInput::new(recording.clone());
        for (tick, frame) in recording.replay_iter() {
            assert_eq!(replay.next_frame(tick), frame);
        }
    }
}

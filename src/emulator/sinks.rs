// Sink traits consumed by the emulation core.
//
// Host windowing, audio device integration, and presentation are collaborators
// behind these interfaces; the core only ever calls through them.

use crate::error::EmulatorError;

/// Receives the finished framebuffer at the end of every emitted frame.
pub trait VideoSink {
    /// Called once per emitted frame with a fresh RGBA copy (256x240x4 bytes).
    /// The core always passes an owned copy to avoid tearing against a
    /// double-buffered presentation target.
    fn submit_frame(&mut self, rgba: &[u8; 256 * 240 * 4]);

    /// Informs the sink of the target presentation rate, so it can size its
    /// own buffering or vsync behavior accordingly.
    fn set_fps(&mut self, fps: u32);

    /// Displays a transient on-screen message (e.g. "State Saved") for the
    /// given duration, in milliseconds.
    fn show_message(&mut self, message: &str, duration_ms: u32);
}

/// Receives audio samples as they are produced by the APU mixer.
pub trait AudioSink {
    /// The sample rate, in Hz, the sink expects samples to arrive at.
    fn sample_rate(&self) -> u32;

    /// Called once per audio sample, in `[-1.0, 1.0]`. Audio is a best-effort
    /// sink: a full queue should drop the sample rather than block.
    fn submit_sample(&mut self, sample: f32);

    /// Resets any internal buffering (e.g. on pause, seek, or reset).
    fn reset(&mut self);
}

/// Notified of frame-loop milestones and fatal emulation errors.
pub trait FrameCallback {
    /// Called at the end of every emitted frame, after the VideoSink and
    /// AudioSink have been serviced.
    fn on_frame_complete(&mut self) {}

    /// Called when the emulation core transitions to the `Error` state.
    fn on_error(&mut self, error: &EmulatorError) {
        let _ = error;
    }
}

/// A `VideoSink` that drops every frame. Used when no video presentation is
/// wired up (headless test runs, turbo mode without a real window).
#[derive(Debug, Default, Clone, Copy)]
pub struct NullVideoSink;

impl VideoSink for NullVideoSink {
    fn submit_frame(&mut self, _rgba: &[u8; 256 * 240 * 4]) {}
    fn set_fps(&mut self, _fps: u32) {}
    fn show_message(&mut self, _message: &str, _duration_ms: u32) {}
}

/// An `AudioSink` that drops every sample.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAudioSink;

impl AudioSink for NullAudioSink {
    fn sample_rate(&self) -> u32 {
        44_100
    }
    fn submit_sample(&mut self, _sample: f32) {}
    fn reset(&mut self) {}
}

/// A `FrameCallback` that does nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullFrameCallback;

impl FrameCallback for NullFrameCallback {}

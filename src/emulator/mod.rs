// Emulator module - Main emulator coordinator
//
// This module provides the main emulator interface that coordinates all NES components
// (CPU, PPU, APU, Bus) and implements quality-of-life features like save states,
// screenshots, speed control, and configuration management.

mod config;
mod recent_roms;
mod save_state;
mod screenshot;
mod sinks;

pub use config::{EmulatorConfig, SpeedMode};
pub use recent_roms::RecentRomsList;
pub use save_state::{SaveState, SaveStateError};
pub use screenshot::{save_screenshot, ScreenshotError};
pub use sinks::{
    AudioSink, FrameCallback, NullAudioSink, NullFrameCallback, NullVideoSink, VideoSink,
};

use crate::bus::Bus;
use crate::cartridge::mappers::create_mapper;
use crate::cartridge::{Cartridge, Mapper};
use crate::cpu::Cpu;
use crate::display::palette::palette_to_rgba;
use crate::error::EmulatorError;
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::Instant;

/// Default number of consecutive frames turbo mode skips video submission for.
pub const DEFAULT_TURBO_SKIP_FRAMES: u32 = 20;

/// Lifecycle state of the emulator's control state machine.
///
/// `Ready → Running ↔ Paused → Stopped`; any state may transition to `Error`.
/// `Stopped` and `Error` are terminal: once reached, the emulator must be
/// recreated to run again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmulatorState {
    /// No frame loop has run yet. A ROM may or may not be loaded.
    Ready,
    /// The frame loop is actively stepping the core.
    Running,
    /// The frame loop is suspended between frames.
    Paused,
    /// The frame loop has exited normally and will not run again.
    Stopped,
    /// An emulation fault occurred; the frame loop has exited.
    Error,
}

/// State shared between the host thread and the emulation thread: the
/// control state machine plus the request flags the two sides hand off
/// through.
struct ControlFlags {
    /// Set by `pause()`, polled by the emulation thread at end-of-frame.
    pause_requested: bool,
    /// Set by `stop()`, polled by the emulation thread at end-of-frame and
    /// while waiting out a pause.
    stop_requested: bool,
    state: EmulatorState,
}

/// The mutex/condvar pair the host thread and emulation thread rendezvous
/// on. See the module-level docs on `Emulator::start` for the handshake.
struct Control {
    flags: Mutex<ControlFlags>,
    cv: Condvar,
}

impl Control {
    fn new(state: EmulatorState) -> Self {
        Control {
            flags: Mutex::new(ControlFlags {
                pause_requested: false,
                stop_requested: false,
                state,
            }),
            cv: Condvar::new(),
        }
    }

    fn state(&self) -> EmulatorState {
        self.flags.lock().unwrap().state
    }

    fn set_state(&self, state: EmulatorState) {
        let mut flags = self.flags.lock().unwrap();
        flags.state = state;
        self.cv.notify_all();
    }
}

/// Raw pointer to an `Emulator`, sent into the emulation thread.
///
/// # Safety
///
/// The emulation thread only dereferences this while `Control::state` is
/// `Running`, and `Emulator::stop`/`Drop` join the thread before any access
/// that could invalidate the pointee. The `Emulator` must not be moved in
/// memory while a thread is running; callers that need to relocate it must
/// `stop()` first.
struct EmuPtr(*mut Emulator);

unsafe impl Send for EmuPtr {}

/// Main emulator structure
///
/// Coordinates all NES components and provides high-level functionality
/// for running games, saving/loading states, and managing configuration.
pub struct Emulator {
    /// CPU (6502 processor)
    cpu: Cpu,

    /// Bus (connects all components)
    bus: Bus,

    /// Shared handle to the loaded cartridge's mapper, also held by the Bus and PPU
    mapper: Option<Rc<RefCell<Box<dyn Mapper>>>>,

    /// Configuration
    config: EmulatorConfig,

    /// Currently loaded ROM path
    rom_path: Option<PathBuf>,

    /// Control state machine, shared with the emulation thread spawned by `start`
    control: Arc<Control>,

    /// Handle to the running emulation thread, if `start` has been called
    /// and `stop` has not yet joined it.
    emu_thread: Option<JoinHandle<()>>,

    /// Speed mode
    speed_mode: SpeedMode,

    /// Frame timing for speed control
    #[allow(dead_code)]
    last_frame_time: Option<Instant>,

    /// Destination for completed framebuffers
    video_sink: Box<dyn VideoSink>,

    /// Destination for APU samples
    audio_sink: Box<dyn AudioSink>,

    /// Notified of frame-loop milestones and fatal errors
    frame_callback: Box<dyn FrameCallback>,

    /// Turbo mode: skip video submission for this many consecutive frames
    turbo_skip_frames: u32,

    /// How many more frames turbo mode will skip video submission for
    turbo_skip_remaining: u32,

    /// Human-readable description of the error that moved this emulator into
    /// the `Error` state, if any.
    last_error: Option<String>,
}

impl Emulator {
    /// Create a new emulator instance
    ///
    /// Initializes all components to their power-on state.
    ///
    /// # Returns
    ///
    /// A new emulator instance
    ///
    /// # Example
    ///
    /// ```
    /// use nescore::emulator::Emulator;
    ///
    /// let mut emulator = Emulator::new();
    /// ```
    pub fn new() -> Self {
        Emulator {
            cpu: Cpu::new(),
            bus: Bus::new(),
            mapper: None,
            config: EmulatorConfig::load_or_default(),
            rom_path: None,
            control: Arc::new(Control::new(EmulatorState::Ready)),
            emu_thread: None,
            speed_mode: SpeedMode::Normal,
            last_frame_time: None,
            video_sink: Box::new(NullVideoSink),
            audio_sink: Box::new(NullAudioSink),
            frame_callback: Box::new(NullFrameCallback),
            turbo_skip_frames: DEFAULT_TURBO_SKIP_FRAMES,
            turbo_skip_remaining: 0,
            last_error: None,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> EmulatorState {
        self.control.state()
    }

    /// Description of the fault that moved this emulator into `Error`, if any.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    fn fail(&mut self, error: EmulatorError) -> EmulatorError {
        self.control.set_state(EmulatorState::Error);
        self.last_error = Some(error.to_string());
        self.frame_callback.on_error(&error);
        error
    }

    /// Load a ROM file
    ///
    /// Loads a ROM from the specified path and initializes the emulator state.
    /// Adds the ROM to the recent ROMs list. Only valid in the `Ready` state.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the ROM file (.nes)
    ///
    /// # Returns
    ///
    /// Result indicating success or error
    ///
    /// # Example
    ///
    /// ```no_run
    /// use nescore::emulator::Emulator;
    ///
    /// let mut emulator = Emulator::new();
    /// emulator.load_rom("game.nes").expect("Failed to load ROM");
    /// ```
    pub fn load_rom<P: AsRef<Path>>(&mut self, path: P) -> Result<(), EmulatorError> {
        if self.control.state() != EmulatorState::Ready {
            return Err(EmulatorError::LoadGameAfterStart);
        }

        let path = path.as_ref();
        let cartridge = Cartridge::from_ines_file(path).map_err(EmulatorError::from)?;
        let mapper = create_mapper(cartridge).map_err(EmulatorError::from)?;
        let mapper = Rc::new(RefCell::new(mapper));

        self.bus.set_mapper(mapper.clone());
        self.mapper = Some(mapper);
        self.rom_path = Some(path.to_path_buf());

        // Add to recent ROMs list; a failure here does not roll back the load
        // since it's bookkeeping, not core state.
        let mut recent_roms = RecentRomsList::load_or_default();
        recent_roms.add(path);
        let _ = recent_roms.save();

        self.reset();

        Ok(())
    }

    /// Reset the emulator
    ///
    /// Resets all components to their power-on state, as if pressing the reset button.
    ///
    /// # Example
    ///
    /// ```
    /// use nescore::emulator::Emulator;
    ///
    /// let mut emulator = Emulator::new();
    /// emulator.reset();
    /// ```
    pub fn reset(&mut self) {
        self.cpu.reset(&mut self.bus);
        // PPU and APU will be reset through the bus
        self.audio_sink.reset();
        self.turbo_skip_remaining = 0;
    }

    /// Start the emulator: spawns the emulation thread, which runs the frame
    /// loop until `stop()` joins it. Returns once the thread has been
    /// launched; it does not wait for a frame to complete.
    ///
    /// The owning thread (the caller of `start`) is expected to drive control
    /// operations (`pause`, `resume`, `stop`, `save_state`, `load_state`,
    /// `set_controller_one_state`/`set_controller_two_state`, the volume/turbo
    /// setters) while the emulation thread runs the CPU/PPU/APU loop.
    ///
    /// # Safety invariant
    ///
    /// Once `start` succeeds, this `Emulator` must not be moved in memory
    /// until `stop` has joined the emulation thread (or the `Emulator` is
    /// dropped, which joins it automatically) — the emulation thread holds a
    /// raw pointer into this struct for the duration of the run.
    pub fn start(&mut self) -> Result<(), EmulatorError> {
        match self.control.state() {
            EmulatorState::Error => return Err(EmulatorError::StartAfterError),
            EmulatorState::Stopped => return Err(EmulatorError::StartAfterStop),
            EmulatorState::Running | EmulatorState::Paused => {
                return Err(EmulatorError::StartAlreadyStarted)
            }
            EmulatorState::Ready => {}
        }
        if self.mapper.is_none() {
            return Err(EmulatorError::StartWithoutGame);
        }

        self.control.set_state(EmulatorState::Running);

        let ptr = EmuPtr(self as *mut Emulator);
        let control = Arc::clone(&self.control);
        let handle = std::thread::spawn(move || {
            let ptr = ptr;
            loop {
                {
                    let flags = control.flags.lock().unwrap();
                    if flags.stop_requested {
                        break;
                    }
                }

                // SAFETY: see `EmuPtr`'s doc comment. The pointee is only
                // touched while `state == Running`, which this thread alone
                // transitions away from.
                if unsafe { (*ptr.0).run_frame() }.is_err() {
                    // `run_frame`'s error path already moved control state to `Error`.
                    return;
                }

                let mut flags = control.flags.lock().unwrap();
                if flags.stop_requested {
                    break;
                }
                if flags.pause_requested {
                    flags.state = EmulatorState::Paused;
                    control.cv.notify_all();
                    flags = control
                        .cv
                        .wait_while(flags, |f| f.pause_requested && !f.stop_requested)
                        .unwrap();
                    if flags.stop_requested {
                        break;
                    }
                    flags.state = EmulatorState::Running;
                    control.cv.notify_all();
                }
            }

            let mut flags = control.flags.lock().unwrap();
            flags.state = EmulatorState::Stopped;
            control.cv.notify_all();
        });

        self.emu_thread = Some(handle);
        Ok(())
    }

    /// Block the calling thread until the emulation thread is `Paused`,
    /// requesting a pause first if it is currently `Running`. A no-op if the
    /// emulator is not `Running` (idempotent with an already-`Paused` state).
    fn pause_blocking(&self) {
        let mut flags = self.control.flags.lock().unwrap();
        if flags.state != EmulatorState::Running {
            return;
        }
        flags.pause_requested = true;
        flags = self
            .control
            .cv
            .wait_while(flags, |f| f.state == EmulatorState::Running)
            .unwrap();
        drop(flags);
    }

    /// Run `f` with the emulation thread paused, resuming afterward only if
    /// this call is the one that paused it (an externally-`Paused` emulator
    /// is left paused).
    fn with_paused<R>(&self, f: impl FnOnce(&Self) -> R) -> R {
        let was_running = self.control.state() == EmulatorState::Running;
        if was_running {
            self.pause_blocking();
        }
        let result = f(self);
        if was_running {
            self.resume();
        }
        result
    }

    /// Mutable counterpart of `with_paused`, for operations that mutate the
    /// emulator (e.g. restoring a save state) while the emulation thread is
    /// parked.
    fn with_paused_mut<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        let was_running = self.control.state() == EmulatorState::Running;
        if was_running {
            self.pause_blocking();
        }
        let result = f(self);
        if was_running {
            self.resume();
        }
        result
    }

    /// Stop the emulator. Terminal: the emulator cannot be started again and
    /// must be recreated. Requests the emulation thread to exit, joins it,
    /// then flushes battery-backed PRG-RAM to disk if present.
    pub fn stop(&mut self) -> Result<(), EmulatorError> {
        match self.control.state() {
            EmulatorState::Error => return Err(EmulatorError::StopAfterError),
            EmulatorState::Ready => return Err(EmulatorError::StopNotStarted),
            EmulatorState::Stopped => return Err(EmulatorError::StopAlreadyStopped),
            EmulatorState::Running | EmulatorState::Paused => {}
        }

        {
            let mut flags = self.control.flags.lock().unwrap();
            flags.stop_requested = true;
            flags.pause_requested = false;
            self.control.cv.notify_all();
        }
        if let Some(handle) = self.emu_thread.take() {
            let _ = handle.join();
        }

        if let Err(e) = self.save_battery_backed_ram() {
            self.control.set_state(EmulatorState::Stopped);
            return Err(e);
        }

        self.control.set_state(EmulatorState::Stopped);
        Ok(())
    }

    /// Write battery-backed PRG-RAM to `<save-dir>/<gamename>.sav`, if the
    /// loaded cartridge has any and declares it battery-backed.
    fn save_battery_backed_ram(&self) -> Result<(), EmulatorError> {
        let Some(mapper) = &self.mapper else {
            return Ok(());
        };
        let mapper = mapper.borrow();
        let Some(ram) = mapper.prg_ram() else {
            return Ok(());
        };

        let Some(rom_path) = &self.rom_path else {
            return Ok(());
        };
        let stem = rom_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("default");
        let save_dir = PathBuf::from("saves");
        std::fs::create_dir_all(&save_dir).map_err(EmulatorError::SaveNvRamFailed)?;
        let save_path = save_dir.join(format!("{}.sav", stem));
        std::fs::write(save_path, ram).map_err(EmulatorError::SaveNvRamFailed)
    }

    /// Save state to a file
    ///
    /// Saves the complete emulator state to a file slot. Only valid while
    /// `Running` or `Paused`.
    ///
    /// # Arguments
    ///
    /// * `slot` - Save slot number (0-9)
    ///
    /// # Returns
    ///
    /// Result indicating success or error
    ///
    /// # Example
    ///
    /// ```no_run
    /// use nescore::emulator::Emulator;
    ///
    /// let mut emulator = Emulator::new();
    /// emulator.save_state(0).expect("Failed to save state");
    /// ```
    pub fn save_state(&self, slot: u8) -> Result<(), EmulatorError> {
        if !matches!(
            self.control.state(),
            EmulatorState::Running | EmulatorState::Paused
        ) {
            return Err(EmulatorError::StateSaveNotRunning);
        }
        self.with_paused(|this| {
            let save_state = SaveState::from_emulator(this)?;
            save_state.save_to_file(slot, this.rom_path.as_deref())?;
            Ok(())
        })
    }

    /// Quick save to slot 0
    ///
    /// Convenience method for quick save (F5 hotkey).
    ///
    /// # Returns
    ///
    /// Result indicating success or error
    pub fn quick_save(&self) -> Result<(), EmulatorError> {
        self.save_state(0)
    }

    /// Load state from a file
    ///
    /// Loads the complete emulator state from a file slot. Only valid while
    /// `Running` or `Paused`.
    ///
    /// # Arguments
    ///
    /// * `slot` - Save slot number (0-9)
    ///
    /// # Returns
    ///
    /// Result indicating success or error
    ///
    /// # Example
    ///
    /// ```no_run
    /// use nescore::emulator::Emulator;
    ///
    /// let mut emulator = Emulator::new();
    /// emulator.load_state(0).expect("Failed to load state");
    /// ```
    pub fn load_state(&mut self, slot: u8) -> Result<(), EmulatorError> {
        if !matches!(
            self.control.state(),
            EmulatorState::Running | EmulatorState::Paused
        ) {
            return Err(EmulatorError::StateLoadNotRunning);
        }
        let rom_path = self.rom_path.clone();
        self.with_paused_mut(|this| {
            let save_state = SaveState::load_from_file(slot, rom_path.as_deref())?;
            save_state.restore_to_emulator(this)?;
            Ok(())
        })
    }

    /// Quick load from slot 0
    ///
    /// Convenience method for quick load (F7 hotkey).
    ///
    /// # Returns
    ///
    /// Result indicating success or error
    pub fn quick_load(&mut self) -> Result<(), EmulatorError> {
        self.load_state(0)
    }

    /// Take a screenshot
    ///
    /// Captures the current frame buffer and saves it as a PNG file.
    ///
    /// # Returns
    ///
    /// Result containing the path to the saved screenshot or an error
    ///
    /// # Example
    ///
    /// ```no_run
    /// use nescore::emulator::Emulator;
    ///
    /// let mut emulator = Emulator::new();
    /// let screenshot_path = emulator.screenshot().expect("Failed to save screenshot");
    /// println!("Screenshot saved to: {}", screenshot_path.display());
    /// ```
    pub fn screenshot(&self) -> Result<PathBuf, ScreenshotError> {
        screenshot::save_screenshot(self.bus.ppu().frame(), self.rom_path.as_deref())
    }

    /// Set speed mode
    ///
    /// Controls emulation speed (normal, fast forward, slow motion).
    ///
    /// # Arguments
    ///
    /// * `mode` - The speed mode to set
    ///
    /// # Example
    ///
    /// ```
    /// use nescore::emulator::{Emulator, SpeedMode};
    ///
    /// let mut emulator = Emulator::new();
    /// emulator.set_speed_mode(SpeedMode::FastForward2x);
    /// ```
    pub fn set_speed_mode(&mut self, mode: SpeedMode) {
        self.speed_mode = mode;
    }

    /// Get current speed mode
    ///
    /// # Returns
    ///
    /// The current speed mode
    pub fn speed_mode(&self) -> SpeedMode {
        self.speed_mode
    }

    /// Pause the emulator. A no-op unless currently `Running`. Blocks the
    /// caller until the emulation thread observes the pause request at
    /// end-of-frame, transitions to `Paused`, and signals back (idempotent:
    /// calling it again while already `Paused` returns immediately).
    ///
    /// # Example
    ///
    /// ```
    /// use nescore::emulator::Emulator;
    ///
    /// let emulator = Emulator::new();
    /// emulator.pause();
    /// ```
    pub fn pause(&self) {
        self.pause_blocking();
    }

    /// Resume the emulator. A no-op unless currently `Paused`. Signals the
    /// emulation thread and returns without waiting for it to observe the
    /// signal.
    ///
    /// # Example
    ///
    /// ```
    /// use nescore::emulator::Emulator;
    ///
    /// let emulator = Emulator::new();
    /// emulator.resume();
    /// ```
    pub fn resume(&self) {
        let mut flags = self.control.flags.lock().unwrap();
        if flags.state != EmulatorState::Paused {
            return;
        }
        flags.pause_requested = false;
        self.control.cv.notify_all();
    }

    /// Toggle between `Running` and `Paused`. A no-op in any other state.
    ///
    /// # Example
    ///
    /// ```
    /// use nescore::emulator::Emulator;
    ///
    /// let emulator = Emulator::new();
    /// emulator.toggle_pause();
    /// ```
    pub fn toggle_pause(&self) {
        match self.control.state() {
            EmulatorState::Running => self.pause(),
            EmulatorState::Paused => self.resume(),
            _ => {}
        }
    }

    /// Check if emulator is paused
    ///
    /// # Returns
    ///
    /// true if paused, false otherwise
    pub fn is_paused(&self) -> bool {
        self.control.state() == EmulatorState::Paused
    }

    /// Get reference to CPU
    pub fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    /// Get mutable reference to CPU
    pub fn cpu_mut(&mut self) -> &mut Cpu {
        &mut self.cpu
    }

    /// Get reference to Bus
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Get mutable reference to Bus
    pub fn bus_mut(&mut self) -> &mut Bus {
        &mut self.bus
    }

    /// Get the loaded cartridge's mapper handle, if a ROM is loaded
    pub fn mapper(&self) -> Option<&Rc<RefCell<Box<dyn Mapper>>>> {
        self.mapper.as_ref()
    }

    /// Get reference to configuration
    pub fn config(&self) -> &EmulatorConfig {
        &self.config
    }

    /// Get mutable reference to configuration
    pub fn config_mut(&mut self) -> &mut EmulatorConfig {
        &mut self.config
    }

    /// Get the currently loaded ROM path
    pub fn rom_path(&self) -> Option<&Path> {
        self.rom_path.as_deref()
    }

    /// Install the video sink the frame loop submits completed frames to.
    /// Only valid in the `Ready` state.
    pub fn set_video_sink(&mut self, sink: Box<dyn VideoSink>) -> Result<(), EmulatorError> {
        if self.control.state() != EmulatorState::Ready {
            return Err(EmulatorError::SetWindowAfterStart);
        }
        self.video_sink = sink;
        Ok(())
    }

    /// Install the audio sink the frame loop submits samples to. Only valid
    /// in the `Ready` state.
    pub fn set_audio_sink(&mut self, sink: Box<dyn AudioSink>) -> Result<(), EmulatorError> {
        if self.control.state() != EmulatorState::Ready {
            return Err(EmulatorError::SetWindowAfterStart);
        }
        self.audio_sink = sink;
        Ok(())
    }

    /// Install the frame-loop milestone/error callback. Only valid in the
    /// `Ready` state.
    pub fn set_frame_callback(&mut self, callback: Box<dyn FrameCallback>) -> Result<(), EmulatorError> {
        if self.control.state() != EmulatorState::Ready {
            return Err(EmulatorError::SetCallbackAfterStart);
        }
        self.frame_callback = callback;
        Ok(())
    }

    /// Set controller one's button state from a single packed byte, one bit
    /// per button, order A, B, Select, Start, Up, Down, Left, Right (LSB first).
    pub fn set_controller_one_state(&self, state: u8) {
        self.bus.set_controller1_byte(state);
    }

    /// Set controller two's button state. See `set_controller_one_state`.
    pub fn set_controller_two_state(&self, state: u8) {
        self.bus.set_controller2_byte(state);
    }

    /// Number of consecutive frames turbo mode will skip video submission
    /// for. The PPU still computes full logical state while skipping.
    pub fn set_turbo_skip_frames(&mut self, frames: u32) {
        self.turbo_skip_frames = frames;
    }

    /// Engage turbo mode for `turbo_skip_frames` upcoming frames (default
    /// `DEFAULT_TURBO_SKIP_FRAMES`): video submission and audio are skipped
    /// to let emulation run at maximum speed.
    pub fn engage_turbo(&mut self) {
        self.turbo_skip_remaining = self.turbo_skip_frames;
    }

    /// Whether the current frame is being skipped for turbo mode.
    pub fn is_turbo(&self) -> bool {
        self.turbo_skip_remaining > 0
    }

    /// Run instructions until the PPU signals end-of-frame, then deliver the
    /// framebuffer to the `VideoSink` (unless turbo mode is skipping this
    /// frame), flush audio, and honor a pending pause.
    ///
    /// Only valid while `Running` or `Paused`; while `Paused` this returns
    /// immediately without stepping. Returns `Ok(true)` if a frame was
    /// emitted, `Ok(false)` if the loop is paused or stopped, and transitions
    /// the emulator to `Error` (returning the fault) on an emulation fault.
    pub fn run_frame(&mut self) -> Result<bool, EmulatorError> {
        match self.control.state() {
            EmulatorState::Paused => return Ok(false),
            EmulatorState::Running => {}
            EmulatorState::Ready => return Err(EmulatorError::StartWithoutGame),
            EmulatorState::Stopped => return Err(EmulatorError::StopAlreadyStopped),
            EmulatorState::Error => return Err(EmulatorError::StartAfterError),
        }

        let start_frame = self.bus.ppu().frame_count();
        loop {
            if self.cpu.halted {
                return Err(self.fail(EmulatorError::CpuExecutedStp));
            }
            self.cpu.step(&mut self.bus);
            if self.bus.ppu().frame_count() != start_frame {
                break;
            }
        }

        let turbo = self.turbo_skip_remaining > 0;
        if turbo {
            self.turbo_skip_remaining -= 1;
        } else {
            let mut rgba = [0u8; 256 * 240 * 4];
            for (i, &palette_index) in self.bus.ppu().frame().iter().enumerate() {
                let pixel = palette_to_rgba(palette_index);
                rgba[i * 4..i * 4 + 4].copy_from_slice(&pixel);
            }
            self.video_sink.submit_frame(&rgba);

            let sample_rate = self.audio_sink.sample_rate() as f32;
            const NTSC_TARGET_FPS: f32 = 60.098_814;
            let samples_per_frame = (sample_rate / NTSC_TARGET_FPS).round() as u32;
            for _ in 0..samples_per_frame {
                self.audio_sink.submit_sample(self.bus.apu().output());
            }
        }

        self.frame_callback.on_frame_complete();
        Ok(true)
    }
}

impl Default for Emulator {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Emulator {
    /// If the emulation thread is still running, requests it to stop and
    /// joins it. Without this, a dropped `Emulator` whose thread is still
    /// alive would leave it holding a dangling `EmuPtr`.
    fn drop(&mut self) {
        if let Some(handle) = self.emu_thread.take() {
            let mut flags = self.control.flags.lock().unwrap();
            flags.stop_requested = true;
            flags.pause_requested = false;
            self.control.cv.notify_all();
            drop(flags);
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_emulator_is_ready() {
        let emulator = Emulator::new();
        assert_eq!(emulator.state(), EmulatorState::Ready);
        assert!(emulator.last_error().is_none());
    }

    #[test]
    fn test_start_without_game_fails() {
        let mut emulator = Emulator::new();
        assert!(matches!(
            emulator.start(),
            Err(EmulatorError::StartWithoutGame)
        ));
        assert_eq!(emulator.state(), EmulatorState::Ready);
    }

    #[test]
    fn test_stop_without_start_fails() {
        let mut emulator = Emulator::new();
        assert!(matches!(emulator.stop(), Err(EmulatorError::StopNotStarted)));
    }

    /// Mimics the real emulation thread's pause/resume/stop handshake
    /// closely enough to exercise `pause`/`resume`'s condvar logic without a
    /// real frame loop behind it.
    fn spawn_fake_emulation_worker(control: Arc<Control>) -> std::thread::JoinHandle<()> {
        std::thread::spawn(move || loop {
            let mut flags = control.flags.lock().unwrap();
            if flags.stop_requested {
                flags.state = EmulatorState::Stopped;
                control.cv.notify_all();
                return;
            }
            if flags.pause_requested {
                flags.state = EmulatorState::Paused;
                control.cv.notify_all();
                flags = control
                    .cv
                    .wait_while(flags, |f| f.pause_requested && !f.stop_requested)
                    .unwrap();
                if flags.stop_requested {
                    flags.state = EmulatorState::Stopped;
                    control.cv.notify_all();
                    return;
                }
                flags.state = EmulatorState::Running;
                control.cv.notify_all();
            }
            drop(flags);
            std::thread::yield_now();
        })
    }

    #[test]
    fn test_pause_resume_idempotence() {
        let mut emulator = Emulator::new();
        emulator.control = Arc::new(Control::new(EmulatorState::Running));
        let worker = spawn_fake_emulation_worker(Arc::clone(&emulator.control));

        emulator.pause();
        assert_eq!(emulator.state(), EmulatorState::Paused);
        emulator.pause();
        assert_eq!(emulator.state(), EmulatorState::Paused, "pause is idempotent");

        emulator.resume();
        assert_eq!(emulator.state(), EmulatorState::Running);
        emulator.resume();
        assert_eq!(
            emulator.state(),
            EmulatorState::Running,
            "resume while running is a no-op"
        );

        emulator.control.flags.lock().unwrap().stop_requested = true;
        emulator.control.cv.notify_all();
        worker.join().unwrap();
    }

    #[test]
    fn test_toggle_pause() {
        let mut emulator = Emulator::new();
        emulator.control = Arc::new(Control::new(EmulatorState::Running));
        let worker = spawn_fake_emulation_worker(Arc::clone(&emulator.control));

        emulator.toggle_pause();
        assert!(emulator.is_paused());
        emulator.toggle_pause();
        assert!(!emulator.is_paused());

        emulator.control.flags.lock().unwrap().stop_requested = true;
        emulator.control.cv.notify_all();
        worker.join().unwrap();
    }

    #[test]
    fn test_save_state_requires_running() {
        let emulator = Emulator::new();
        assert!(matches!(
            emulator.save_state(0),
            Err(EmulatorError::StateSaveNotRunning)
        ));
    }

    #[test]
    fn test_load_state_requires_running() {
        let mut emulator = Emulator::new();
        assert!(matches!(
            emulator.load_state(0),
            Err(EmulatorError::StateLoadNotRunning)
        ));
    }

    #[test]
    fn test_set_video_sink_after_start_fails() {
        let mut emulator = Emulator::new();
        emulator.control.set_state(EmulatorState::Running);
        assert!(matches!(
            emulator.set_video_sink(Box::new(NullVideoSink)),
            Err(EmulatorError::SetWindowAfterStart)
        ));
    }

    #[test]
    fn test_set_frame_callback_after_start_fails() {
        let mut emulator = Emulator::new();
        emulator.control.set_state(EmulatorState::Running);
        assert!(matches!(
            emulator.set_frame_callback(Box::new(NullFrameCallback)),
            Err(EmulatorError::SetCallbackAfterStart)
        ));
    }

    #[test]
    fn test_load_rom_after_start_fails() {
        let mut emulator = Emulator::new();
        emulator.control.set_state(EmulatorState::Running);
        assert!(matches!(
            emulator.load_rom("nonexistent.nes"),
            Err(EmulatorError::LoadGameAfterStart)
        ));
    }

    #[test]
    fn test_turbo_defaults_and_engage() {
        let mut emulator = Emulator::new();
        assert!(!emulator.is_turbo());
        emulator.engage_turbo();
        assert!(emulator.is_turbo());
        assert_eq!(emulator.turbo_skip_remaining, DEFAULT_TURBO_SKIP_FRAMES);
    }

    #[test]
    fn test_set_controller_state_updates_bus() {
        let mut emulator = Emulator::new();
        emulator.set_controller_one_state(0b0000_0001); // A pressed

        // Strobe and read back through the real $4016 path.
        emulator.bus_mut().write(0x4016, 0x01);
        emulator.bus_mut().write(0x4016, 0x00);
        assert_eq!(emulator.bus().read(0x4016), 0x01, "A pressed");
        assert_eq!(emulator.bus().read(0x4016), 0x00, "B released");
    }

    #[test]
    fn test_run_frame_without_start_fails() {
        let mut emulator = Emulator::new();
        assert!(matches!(
            emulator.run_frame(),
            Err(EmulatorError::StartWithoutGame)
        ));
    }

    #[test]
    fn test_run_frame_while_paused_returns_false() {
        let mut emulator = Emulator::new();
        emulator.control.set_state(EmulatorState::Paused);
        assert!(!emulator.run_frame().unwrap());
    }
}

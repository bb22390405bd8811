// Top-level error taxonomy for emulator lifecycle and control operations.
//
// Distinct from `cartridge::INesError`, which only covers ROM parsing.
// These variants cover the Emulator's own state-machine guards, I/O around
// save states and logs, emulation faults that halt the core, and the
// debug-inspection range checks exposed to `debug::*`.

use std::fmt;
use std::io;

/// Errors surfaced by `Emulator` control operations and the core itself.
#[derive(Debug)]
pub enum EmulatorError {
    // --- Configuration: misuse of the control API given the current state ---
    /// `load_rom` called after the emulator has started running.
    LoadGameAfterStart,
    /// A video/audio sink was set after the emulator has started running.
    SetWindowAfterStart,
    /// A frame callback was set after the emulator has started running.
    SetCallbackAfterStart,
    /// `start` called with no ROM loaded.
    StartWithoutGame,
    /// `start` called while already running or paused.
    StartAlreadyStarted,
    /// `start` called on an emulator that has already been stopped.
    StartAfterStop,
    /// `start` called on an emulator that is in the `Error` state.
    StartAfterError,
    /// `stop` called on an emulator that was never started.
    StopNotStarted,
    /// `stop` called on an emulator that has already been stopped.
    StopAlreadyStopped,
    /// `stop` called on an emulator that is in the `Error` state.
    StopAfterError,
    /// `save_state` called while the emulator is not running or paused.
    StateSaveNotRunning,
    /// `load_state` called while the emulator is not running or paused.
    StateLoadNotRunning,

    // --- I/O ---
    /// The ROM file could not be opened.
    OpenRomFailed(io::Error),
    /// The ROM file was opened but could not be fully read.
    ReadRomFailed(io::Error),
    /// The ROM's iNES header failed validation.
    InvalidRomHeader(String),
    /// A save-state file could not be read or written.
    StateFileError(io::Error),
    /// Battery-backed PRG-RAM could not be written to disk.
    SaveNvRamFailed(io::Error),
    /// The configured log file could not be opened.
    OpenLogFileFailed(io::Error),
    /// A save-state file existed but failed to deserialize or validate.
    StateLoadFailed(String),

    // --- Emulation ---
    /// The ROM declares a mapper number with no implementation.
    UnsupportedMapper(u8),
    /// Execution reached a code path that is not implemented.
    Unimplemented(&'static str),
    /// The CPU executed an `STP`-class opcode (the core halts, matching hardware).
    CpuExecutedStp,
    /// An otherwise-uncategorized emulation fault (e.g. an unmapped write the
    /// mapper refused).
    RuntimeError(String),

    // --- Debug-range: out-of-range indices passed to debug inspection hooks ---
    /// Nametable index outside `0..4`.
    InvalidNameTableIndex(usize),
    /// Pattern table index outside `0..2`.
    InvalidPatternTableIndex(usize),
    /// Palette index outside `0..32`.
    InvalidPaletteIndex(usize),
    /// OAM sprite index outside `0..64`.
    InvalidSpriteIndex(usize),
}

impl fmt::Display for EmulatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmulatorError::LoadGameAfterStart => {
                write!(f, "cannot load a ROM after the emulator has started")
            }
            EmulatorError::SetWindowAfterStart => {
                write!(f, "cannot set video/audio sink after the emulator has started")
            }
            EmulatorError::SetCallbackAfterStart => {
                write!(f, "cannot set frame callback after the emulator has started")
            }
            EmulatorError::StartWithoutGame => write!(f, "cannot start with no ROM loaded"),
            EmulatorError::StartAlreadyStarted => write!(f, "emulator is already started"),
            EmulatorError::StartAfterStop => write!(f, "cannot restart a stopped emulator"),
            EmulatorError::StartAfterError => write!(f, "cannot start an emulator in the error state"),
            EmulatorError::StopNotStarted => write!(f, "cannot stop an emulator that was never started"),
            EmulatorError::StopAlreadyStopped => write!(f, "emulator is already stopped"),
            EmulatorError::StopAfterError => write!(f, "cannot stop an emulator in the error state"),
            EmulatorError::StateSaveNotRunning => {
                write!(f, "cannot save state while not running or paused")
            }
            EmulatorError::StateLoadNotRunning => {
                write!(f, "cannot load state while not running or paused")
            }
            EmulatorError::OpenRomFailed(e) => write!(f, "failed to open ROM file: {}", e),
            EmulatorError::ReadRomFailed(e) => write!(f, "failed to read ROM file: {}", e),
            EmulatorError::InvalidRomHeader(msg) => write!(f, "invalid iNES header: {}", msg),
            EmulatorError::StateFileError(e) => write!(f, "save state I/O error: {}", e),
            EmulatorError::SaveNvRamFailed(e) => write!(f, "failed to write battery save: {}", e),
            EmulatorError::OpenLogFileFailed(e) => write!(f, "failed to open log file: {}", e),
            EmulatorError::StateLoadFailed(msg) => write!(f, "failed to load save state: {}", msg),
            EmulatorError::UnsupportedMapper(n) => write!(f, "mapper {} is not supported", n),
            EmulatorError::Unimplemented(what) => write!(f, "unimplemented: {}", what),
            EmulatorError::CpuExecutedStp => write!(f, "CPU executed an STP opcode"),
            EmulatorError::RuntimeError(msg) => write!(f, "runtime error: {}", msg),
            EmulatorError::InvalidNameTableIndex(i) => write!(f, "invalid nametable index {}", i),
            EmulatorError::InvalidPatternTableIndex(i) => {
                write!(f, "invalid pattern table index {}", i)
            }
            EmulatorError::InvalidPaletteIndex(i) => write!(f, "invalid palette index {}", i),
            EmulatorError::InvalidSpriteIndex(i) => write!(f, "invalid sprite index {}", i),
        }
    }
}

impl std::error::Error for EmulatorError {}

impl From<crate::cartridge::INesError> for EmulatorError {
    fn from(e: crate::cartridge::INesError) -> Self {
        use crate::cartridge::INesError as I;
        match e {
            I::OpenRomFailed(e) => EmulatorError::OpenRomFailed(e),
            I::ReadRomFailed(e) => EmulatorError::ReadRomFailed(e),
            I::InvalidRomHeader(msg) => EmulatorError::InvalidRomHeader(msg),
            I::TruncatedRom => EmulatorError::InvalidRomHeader("truncated ROM file".to_string()),
            I::UnsupportedMapper(n) => EmulatorError::UnsupportedMapper(n),
        }
    }
}

impl From<crate::cartridge::mappers::MapperError> for EmulatorError {
    fn from(e: crate::cartridge::mappers::MapperError) -> Self {
        use crate::cartridge::mappers::MapperError as M;
        match e {
            M::UnsupportedMapper(n) => EmulatorError::UnsupportedMapper(n),
            M::InvalidConfiguration(msg) => EmulatorError::InvalidRomHeader(msg),
        }
    }
}

impl From<crate::emulator::SaveStateError> for EmulatorError {
    fn from(e: crate::emulator::SaveStateError) -> Self {
        use crate::emulator::SaveStateError as S;
        match e {
            S::Io(e) => EmulatorError::StateFileError(e),
            S::Serialization(e) => EmulatorError::StateLoadFailed(e.to_string()),
            S::VersionMismatch { expected, found } => EmulatorError::StateLoadFailed(format!(
                "save state version mismatch: expected {}, found {}",
                expected, found
            )),
            S::NoRomLoaded => EmulatorError::StateLoadFailed("no ROM loaded".to_string()),
        }
    }
}

// Save state functionality
//
// Implements serialization and deserialization of the complete emulator state
// to enable save states and quick save/load functionality. The on-disk format
// is a binary container: a small metadata header, followed by the CPU, PPU,
// APU and Cartridge sub-states in that fixed order, each prefixed with a
// little-endian u64 byte count. Each component is free to pick its own
// internal encoding (these use `serde_json`); only the outer framing is a
// fixed binary layout, so a corrupt or truncated component can be detected
// without having to parse the ones after it.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Errors that can occur during save state operations
#[derive(Debug)]
pub enum SaveStateError {
    /// I/O error
    Io(io::Error),

    /// Serialization/deserialization error
    Serialization(serde_json::Error),

    /// Save state version mismatch
    VersionMismatch { expected: u32, found: u32 },

    /// No ROM loaded
    NoRomLoaded,

    /// The binary container was truncated or malformed
    Corrupt(String),
}

impl std::fmt::Display for SaveStateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SaveStateError::Io(e) => write!(f, "I/O error: {}", e),
            SaveStateError::Serialization(e) => write!(f, "Serialization error: {}", e),
            SaveStateError::VersionMismatch { expected, found } => {
                write!(
                    f,
                    "Version mismatch: expected {}, found {}",
                    expected, found
                )
            }
            SaveStateError::NoRomLoaded => write!(f, "No ROM loaded"),
            SaveStateError::Corrupt(msg) => write!(f, "Corrupt save state: {}", msg),
        }
    }
}

impl std::error::Error for SaveStateError {}

impl From<io::Error> for SaveStateError {
    fn from(e: io::Error) -> Self {
        SaveStateError::Io(e)
    }
}

impl From<serde_json::Error> for SaveStateError {
    fn from(e: serde_json::Error) -> Self {
        SaveStateError::Serialization(e)
    }
}

/// Current save state format version
const SAVE_STATE_VERSION: u32 = 1;

/// Complete emulator save state
///
/// Contains all the state needed to restore the emulator to an exact point in time.
#[derive(Debug)]
pub struct SaveState {
    /// Version number for compatibility checking
    version: u32,

    /// Timestamp when the save state was created
    timestamp: String,

    /// ROM identifier (file name for validation)
    rom_name: Option<String>,

    /// CPU state
    cpu_state: CpuState,

    /// PPU state
    ppu_state: PpuState,

    /// APU state
    apu_state: crate::apu::Apu,

    /// RAM contents
    ram: Vec<u8>,

    /// Cartridge RAM (if battery-backed)
    cartridge_ram: Option<Vec<u8>>,

    /// Mapper-internal registers and CHR-RAM, from `Mapper::save_state`
    mapper_state: Vec<u8>,
}

/// CPU state for serialization
#[derive(Debug, Serialize, Deserialize)]
struct CpuState {
    a: u8,
    x: u8,
    y: u8,
    sp: u8,
    pc: u16,
    status: u8,
    cycles: u64,
}

/// PPU state for serialization
#[derive(Debug, Serialize, Deserialize)]
struct PpuState {
    // PPU registers
    ppuctrl: u8,
    ppumask: u8,
    ppustatus: u8,
    oam_addr: u8,

    // Internal scroll registers
    v: u16,
    t: u16,
    fine_x: u8,
    write_latch: bool,
    read_buffer: u8,

    // Timing
    scanline: u16,
    cycle: u16,
    frame: u64,

    // Memory
    vram: Vec<u8>,
    palette_ram: Vec<u8>,
    oam: Vec<u8>,
}

/// Cartridge-side state: battery-backed PRG-RAM plus mapper-internal
/// registers and CHR-RAM, as produced by `Mapper::save_state`.
#[derive(Debug, Serialize, Deserialize)]
struct CartridgeState {
    prg_ram: Option<Vec<u8>>,
    mapper_state: Vec<u8>,
}

/// Top-level metadata carried ahead of the four component blobs.
#[derive(Debug, Serialize, Deserialize)]
struct SaveStateHeader {
    version: u32,
    timestamp: String,
    rom_name: Option<String>,
    ram: Vec<u8>,
}

/// Write a component's bytes prefixed with its little-endian u64 length.
fn write_sized_blob(out: &mut Vec<u8>, blob: &[u8]) {
    out.extend_from_slice(&(blob.len() as u64).to_le_bytes());
    out.extend_from_slice(blob);
}

/// Read one little-endian u64 length-prefixed blob, returning the blob and
/// the remainder of the buffer.
fn read_sized_blob<'a>(data: &'a [u8], what: &str) -> Result<(&'a [u8], &'a [u8]), SaveStateError> {
    if data.len() < 8 {
        return Err(SaveStateError::Corrupt(format!(
            "truncated size prefix for {}",
            what
        )));
    }
    let mut len_bytes = [0u8; 8];
    len_bytes.copy_from_slice(&data[..8]);
    let len = u64::from_le_bytes(len_bytes) as usize;
    let rest = &data[8..];
    if rest.len() < len {
        return Err(SaveStateError::Corrupt(format!(
            "truncated {} body: expected {} bytes, found {}",
            what,
            len,
            rest.len()
        )));
    }
    Ok((&rest[..len], &rest[len..]))
}

impl SaveState {
    /// Create a save state from the current emulator state
    ///
    /// # Arguments
    ///
    /// * `emulator` - Reference to the emulator
    ///
    /// # Returns
    ///
    /// Result containing the save state or an error
    pub fn from_emulator(emulator: &super::Emulator) -> Result<Self, SaveStateError> {
        let cpu = emulator.cpu();
        let bus = emulator.bus();

        // Get ROM name for validation
        let rom_name = emulator
            .rom_path()
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_str())
            .map(|s| s.to_string());

        // Create timestamp
        let timestamp = chrono::Local::now().to_rfc3339();

        // Capture CPU state
        let cpu_state = CpuState {
            a: cpu.a,
            x: cpu.x,
            y: cpu.y,
            sp: cpu.sp,
            pc: cpu.pc,
            status: cpu.status,
            cycles: cpu.cycles,
        };

        // Capture PPU state
        let ppu = bus.ppu();
        let ppu_state = PpuState {
            ppuctrl: ppu.ppuctrl,
            ppumask: ppu.ppumask,
            ppustatus: ppu.ppustatus,
            oam_addr: ppu.oam_addr,
            v: ppu.v,
            t: ppu.t,
            fine_x: ppu.fine_x,
            write_latch: ppu.write_latch,
            read_buffer: ppu.read_buffer,
            scanline: ppu.scanline,
            cycle: ppu.cycle,
            frame: ppu.frame,
            vram: ppu.nametables.to_vec(),
            palette_ram: ppu.palette_ram.to_vec(),
            oam: ppu.oam.to_vec(),
        };

        let apu_state = bus.apu().clone();

        // Capture memory
        let ram = bus.ram_contents().to_vec();

        let cartridge_ram = emulator
            .mapper()
            .and_then(|m| m.borrow().prg_ram().map(|ram| ram.to_vec()));
        let mapper_state = emulator
            .mapper()
            .map(|m| m.borrow().save_state())
            .unwrap_or_default();

        Ok(SaveState {
            version: SAVE_STATE_VERSION,
            timestamp,
            rom_name,
            cpu_state,
            ppu_state,
            apu_state,
            ram,
            cartridge_ram,
            mapper_state,
        })
    }

    /// Restore emulator state from this save state
    ///
    /// # Arguments
    ///
    /// * `emulator` - Mutable reference to the emulator
    ///
    /// # Returns
    ///
    /// Result indicating success or error
    pub fn restore_to_emulator(
        &self,
        emulator: &mut super::Emulator,
    ) -> Result<(), SaveStateError> {
        // Version check
        if self.version != SAVE_STATE_VERSION {
            return Err(SaveStateError::VersionMismatch {
                expected: SAVE_STATE_VERSION,
                found: self.version,
            });
        }

        // Restore CPU state
        let cpu = emulator.cpu_mut();
        cpu.a = self.cpu_state.a;
        cpu.x = self.cpu_state.x;
        cpu.y = self.cpu_state.y;
        cpu.sp = self.cpu_state.sp;
        cpu.pc = self.cpu_state.pc;
        cpu.status = self.cpu_state.status;
        cpu.cycles = self.cpu_state.cycles;

        // Restore bus/memory state
        let bus = emulator.bus_mut();
        bus.restore_ram_contents(&self.ram);

        // Restore PPU state
        let ppu = bus.ppu_mut();
        ppu.ppuctrl = self.ppu_state.ppuctrl;
        ppu.ppumask = self.ppu_state.ppumask;
        ppu.ppustatus = self.ppu_state.ppustatus;
        ppu.oam_addr = self.ppu_state.oam_addr;
        ppu.v = self.ppu_state.v;
        ppu.t = self.ppu_state.t;
        ppu.fine_x = self.ppu_state.fine_x;
        ppu.write_latch = self.ppu_state.write_latch;
        ppu.read_buffer = self.ppu_state.read_buffer;
        ppu.scanline = self.ppu_state.scanline;
        ppu.cycle = self.ppu_state.cycle;
        ppu.frame = self.ppu_state.frame;

        // Validate array sizes before copying to prevent panics
        if self.ppu_state.vram.len() != ppu.nametables.len()
            || self.ppu_state.palette_ram.len() != ppu.palette_ram.len()
            || self.ppu_state.oam.len() != ppu.oam.len()
        {
            return Err(SaveStateError::Corrupt(format!(
                "memory size mismatch: vram={} (expected {}), palette={} (expected {}), oam={} (expected {})",
                self.ppu_state.vram.len(),
                ppu.nametables.len(),
                self.ppu_state.palette_ram.len(),
                ppu.palette_ram.len(),
                self.ppu_state.oam.len(),
                ppu.oam.len()
            )));
        }

        ppu.nametables.copy_from_slice(&self.ppu_state.vram);
        ppu.palette_ram.copy_from_slice(&self.ppu_state.palette_ram);
        ppu.oam.copy_from_slice(&self.ppu_state.oam);

        *bus.apu_mut() = self.apu_state.clone();

        if let Some(mapper) = emulator.mapper() {
            let mut mapper = mapper.borrow_mut();
            if let Some(cartridge_ram) = &self.cartridge_ram {
                if let Some(prg_ram) = mapper.prg_ram_mut() {
                    if prg_ram.len() == cartridge_ram.len() {
                        prg_ram.copy_from_slice(cartridge_ram);
                    }
                }
            }
            if !self.mapper_state.is_empty() {
                mapper.load_state(&self.mapper_state);
            }
        }

        Ok(())
    }

    /// Encode this save state as the binary container: a metadata header
    /// followed by the CPU, PPU, APU and Cartridge sub-states, each prefixed
    /// with a little-endian u64 byte count.
    fn to_bytes(&self) -> Result<Vec<u8>, SaveStateError> {
        let header = SaveStateHeader {
            version: self.version,
            timestamp: self.timestamp.clone(),
            rom_name: self.rom_name.clone(),
            ram: self.ram.clone(),
        };
        let cartridge_state = CartridgeState {
            prg_ram: self.cartridge_ram.clone(),
            mapper_state: self.mapper_state.clone(),
        };

        let header_bytes = serde_json::to_vec(&header)?;
        let cpu_bytes = serde_json::to_vec(&self.cpu_state)?;
        let ppu_bytes = serde_json::to_vec(&self.ppu_state)?;
        let apu_bytes = serde_json::to_vec(&self.apu_state)?;
        let cartridge_bytes = serde_json::to_vec(&cartridge_state)?;

        let mut out = Vec::with_capacity(
            32 + header_bytes.len()
                + cpu_bytes.len()
                + ppu_bytes.len()
                + apu_bytes.len()
                + cartridge_bytes.len(),
        );
        write_sized_blob(&mut out, &header_bytes);
        write_sized_blob(&mut out, &cpu_bytes);
        write_sized_blob(&mut out, &ppu_bytes);
        write_sized_blob(&mut out, &apu_bytes);
        write_sized_blob(&mut out, &cartridge_bytes);
        Ok(out)
    }

    /// Decode the binary container produced by [`Self::to_bytes`].
    fn from_bytes(data: &[u8]) -> Result<Self, SaveStateError> {
        let (header_bytes, rest) = read_sized_blob(data, "header")?;
        let (cpu_bytes, rest) = read_sized_blob(rest, "cpu")?;
        let (ppu_bytes, rest) = read_sized_blob(rest, "ppu")?;
        let (apu_bytes, rest) = read_sized_blob(rest, "apu")?;
        let (cartridge_bytes, _rest) = read_sized_blob(rest, "cartridge")?;

        let header: SaveStateHeader = serde_json::from_slice(header_bytes)?;
        let cpu_state: CpuState = serde_json::from_slice(cpu_bytes)?;
        let ppu_state: PpuState = serde_json::from_slice(ppu_bytes)?;
        let apu_state: crate::apu::Apu = serde_json::from_slice(apu_bytes)?;
        let cartridge_state: CartridgeState = serde_json::from_slice(cartridge_bytes)?;

        Ok(SaveState {
            version: header.version,
            timestamp: header.timestamp,
            rom_name: header.rom_name,
            cpu_state,
            ppu_state,
            apu_state,
            ram: header.ram,
            cartridge_ram: cartridge_state.prg_ram,
            mapper_state: cartridge_state.mapper_state,
        })
    }

    /// Save this save state to a file
    ///
    /// # Arguments
    ///
    /// * `slot` - Save slot number (0-9)
    /// * `rom_path` - Optional path to the currently loaded ROM (for naming)
    ///
    /// # Returns
    ///
    /// Result indicating success or error
    pub fn save_to_file(&self, slot: u8, rom_path: Option<&Path>) -> Result<(), SaveStateError> {
        let state_dir = Self::state_dir();
        fs::create_dir_all(&state_dir)?;

        let file_path = Self::state_file_path(slot, rom_path);
        let bytes = self.to_bytes()?;
        fs::write(file_path, bytes)?;

        Ok(())
    }

    /// Load a save state from a file
    ///
    /// # Arguments
    ///
    /// * `slot` - Save slot number (0-9)
    /// * `rom_path` - Optional path to the currently loaded ROM (for naming)
    ///
    /// # Returns
    ///
    /// Result containing the save state or an error
    pub fn load_from_file(slot: u8, rom_path: Option<&Path>) -> Result<Self, SaveStateError> {
        let file_path = Self::state_file_path(slot, rom_path);
        let bytes = fs::read(file_path)?;
        Self::from_bytes(&bytes)
    }

    /// Base directory holding all save state files.
    fn state_dir() -> PathBuf {
        PathBuf::from("saves")
    }

    /// Full path to the state file for a given slot: `<state-dir>/<gamename>.state<slot>`.
    fn state_file_path(slot: u8, rom_path: Option<&Path>) -> PathBuf {
        let game_name = rom_path
            .and_then(|p| p.file_stem())
            .and_then(|n| n.to_str())
            .unwrap_or("default");
        Self::state_dir().join(format!("{}.state{}", game_name, slot))
    }
}

// Bus module - Memory bus implementation
//
// This module implements the main memory bus that connects the CPU to all memory-mapped
// components in the NES system. It handles address routing, memory mirroring, and
// OAM/DMC DMA.
//
// # NES Memory Map (CPU Address Space)
//
// ```text
// $0000-$07FF: 2KB Internal RAM
// $0800-$1FFF: Mirrors of RAM (3 times)
// $2000-$2007: PPU Registers
// $2008-$3FFF: Mirrors of PPU Registers (repeating every 8 bytes)
// $4000-$4013, $4015, $4017: APU registers
// $4014: OAM DMA
// $4016-$4017: Controller I/O
// $4018-$401F: APU and I/O test functionality (usually disabled)
// $4020-$FFFF: Cartridge space (PRG-ROM, PRG-RAM, and mapper registers)
// ```
//
// Several CPU instruction helpers call `Bus::read` through a shared reference
// (see `cpu::addressing`), even though reading PPU/APU registers has side
// effects (status flags clear, sequencers advance). Ppu and Apu are therefore
// held behind `RefCell`, mirroring the interior-mutability pattern the PPU
// itself already uses for its mapper reference.

use crate::apu::Apu;
use crate::cartridge::Mapper;
use crate::input::{Controller, ControllerIO};
use crate::ppu::Ppu;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::atomic::{AtomicU8, Ordering};

/// Trait for memory-mapped components
///
/// This trait defines the interface for components that can be mapped into the
/// CPU's address space. Components implementing this trait can handle read and
/// write operations for their specific memory ranges.
pub trait MemoryMappedDevice {
    /// Read a byte from the device
    fn read(&mut self, addr: u16) -> u8;

    /// Write a byte to the device
    fn write(&mut self, addr: u16, data: u8);
}

/// Main memory bus structure
///
/// The Bus connects the CPU to all memory-mapped components in the NES system.
/// It handles address decoding, memory mirroring, and routes read/write operations
/// to the appropriate components.
pub struct Bus {
    /// Internal RAM: 2KB, mirrored 3 times across $0000-$1FFF
    ram: [u8; 2048],

    /// Picture Processing Unit
    ppu: RefCell<Ppu>,

    /// Audio Processing Unit
    apu: RefCell<Apu>,

    /// Controller shift-register I/O ($4016-$4017)
    controllers: RefCell<ControllerIO>,

    /// Controller 1 button state, one bit per button (see `Controller::from_byte`).
    /// Written directly by `Emulator::set_controller_one_state` without locking,
    /// so host input stays usable while the emulation thread runs.
    controller1_byte: AtomicU8,

    /// Controller 2 button state. See `controller1_byte`.
    controller2_byte: AtomicU8,

    /// Cartridge mapper, shared with the PPU for pattern-table access
    mapper: Option<Rc<RefCell<Box<dyn Mapper>>>>,

    /// Writable scratch memory standing in for cartridge space ($4020-$FFFF)
    /// until a real cartridge is loaded. Lets CPU tests install a program
    /// directly without needing a full iNES image.
    scratch: RefCell<[u8; 0xC000]>,

    /// CPU cycles the last OAM DMA transfer should stall the CPU for,
    /// consumed by `Cpu::step` after the triggering instruction completes.
    pending_dma_stall: Cell<u16>,

    /// Running CPU cycle count, used to decide whether OAM DMA takes
    /// 513 or 514 cycles (one extra on an odd CPU cycle).
    cycle_count: Cell<u64>,
}

impl Bus {
    /// Create a new bus instance with zero-initialized memory and no cartridge loaded
    ///
    /// # Example
    /// ```
    /// use nescore::Bus;
    /// let bus = Bus::new();
    /// ```
    pub fn new() -> Self {
        Bus {
            ram: [0; 2048],
            ppu: RefCell::new(Ppu::new()),
            apu: RefCell::new(Apu::new()),
            controllers: RefCell::new(ControllerIO::new()),
            controller1_byte: AtomicU8::new(0),
            controller2_byte: AtomicU8::new(0),
            mapper: None,
            scratch: RefCell::new([0; 0xC000]),
            pending_dma_stall: Cell::new(0),
            cycle_count: Cell::new(0),
        }
    }

    /// Attach a cartridge mapper, sharing it with the PPU for CHR access.
    pub fn set_mapper(&mut self, mapper: Rc<RefCell<Box<dyn Mapper>>>) {
        self.ppu.borrow_mut().set_mapper(mapper.clone());
        self.mapper = Some(mapper);
    }

    /// Borrow the PPU.
    pub fn ppu(&self) -> std::cell::Ref<'_, Ppu> {
        self.ppu.borrow()
    }

    /// Mutably borrow the PPU.
    pub fn ppu_mut(&self) -> std::cell::RefMut<'_, Ppu> {
        self.ppu.borrow_mut()
    }

    /// Borrow the APU.
    pub fn apu(&self) -> std::cell::Ref<'_, Apu> {
        self.apu.borrow()
    }

    /// Mutably borrow the APU.
    pub fn apu_mut(&self) -> std::cell::RefMut<'_, Apu> {
        self.apu.borrow_mut()
    }

    /// Borrow the controller I/O.
    pub fn controllers(&self) -> std::cell::Ref<'_, ControllerIO> {
        self.controllers.borrow()
    }

    /// Mutably borrow the controller I/O.
    pub fn controllers_mut(&self) -> std::cell::RefMut<'_, ControllerIO> {
        self.controllers.borrow_mut()
    }

    /// Set controller one's button state from a packed byte. Lock-free: safe
    /// to call from the host thread while the emulation thread is running.
    pub fn set_controller1_byte(&self, state: u8) {
        self.controller1_byte.store(state, Ordering::Relaxed);
    }

    /// Set controller two's button state from a packed byte. See `set_controller1_byte`.
    pub fn set_controller2_byte(&self, state: u8) {
        self.controller2_byte.store(state, Ordering::Relaxed);
    }

    /// Whether the mapper's IRQ line is currently asserted.
    pub fn mapper_irq(&self) -> bool {
        self.mapper
            .as_ref()
            .map(|m| m.borrow().check_irq())
            .unwrap_or(false)
    }

    /// Whether any maskable interrupt source (APU frame/DMC IRQ or mapper IRQ)
    /// is currently asserting the CPU's IRQ line.
    pub fn irq_pending(&self) -> bool {
        self.apu.borrow().irq_pending() || self.mapper_irq()
    }

    /// Consume a pending PPU NMI, if any, clearing the PPU's flag.
    pub fn take_nmi(&self) -> bool {
        let mut ppu = self.ppu.borrow_mut();
        if ppu.nmi_pending() {
            ppu.clear_nmi();
            true
        } else {
            false
        }
    }

    /// Advance the bus's notion of elapsed CPU cycles.
    ///
    /// Called once per CPU cycle by `Cpu::step`. Each CPU cycle advances the
    /// PPU three dots and clocks the APU once, and services any pending DMC
    /// sample fetch.
    pub fn tick(&self, cycles: u64) {
        for _ in 0..cycles {
            self.cycle_count.set(self.cycle_count.get() + 1);

            for _ in 0..3 {
                self.ppu.borrow_mut().step();
            }

            self.apu.borrow_mut().clock();
            self.service_dmc_dma();
        }
    }

    /// Fetch a DMC sample byte if the APU has requested one, stalling the CPU
    /// for the DMA. The stall length is approximated at a constant 4 cycles.
    fn service_dmc_dma(&self) {
        let pending = self.apu.borrow().dmc_pending_fetch();
        if let Some(addr) = pending {
            let byte = self.read(addr);
            self.apu.borrow_mut().dmc_provide_sample(byte);
            let extra = self.pending_dma_stall.get().saturating_add(4);
            self.pending_dma_stall.set(extra);
        }
    }

    /// Take and clear any CPU stall cycles queued by an OAM DMA transfer.
    pub fn take_dma_stall(&self) -> u16 {
        let stall = self.pending_dma_stall.get();
        self.pending_dma_stall.set(0);
        stall
    }

    fn read_cartridge(&self, addr: u16) -> u8 {
        match self.mapper {
            Some(ref mapper) => mapper.borrow().cpu_read(addr),
            None => self.scratch.borrow()[(addr - 0x4020) as usize],
        }
    }

    fn write_cartridge(&self, addr: u16, data: u8) {
        match self.mapper {
            Some(ref mapper) => mapper.borrow_mut().cpu_write(addr, data),
            None => self.scratch.borrow_mut()[(addr - 0x4020) as usize] = data,
        }
    }

    /// Perform an OAM DMA transfer from CPU page `page` ($XX00-$XXFF) into PPU OAM.
    fn oam_dma(&self, page: u8) {
        let base = (page as u16) << 8;
        let mut page_data = [0u8; 256];
        for (i, slot) in page_data.iter_mut().enumerate() {
            *slot = self.read(base.wrapping_add(i as u16));
        }

        let mut ppu = self.ppu.borrow_mut();
        let start_addr = ppu.oam_addr;
        for (i, &value) in page_data.iter().enumerate() {
            let oam_addr = start_addr.wrapping_add(i as u8);
            ppu.write_oam(oam_addr, value);
        }
        drop(ppu);

        // 513 cycles normally, 514 if the transfer starts on an odd CPU cycle.
        let extra = if self.cycle_count.get() % 2 == 1 { 514 } else { 513 };
        self.pending_dma_stall.set(extra);
    }

    /// Read a byte from the bus
    ///
    /// Routes the read operation to the appropriate memory region or device
    /// based on the address. Handles mirroring for RAM and PPU registers.
    ///
    /// # Example
    /// ```
    /// use nescore::Bus;
    /// let bus = Bus::new();
    /// let value = bus.read(0x0000); // Read from RAM
    /// ```
    pub fn read(&self, addr: u16) -> u8 {
        match addr {
            // Internal RAM: $0000-$07FF (2KB), mirrored through $1FFF
            0x0000..=0x1FFF => {
                let ram_addr = (addr & 0x07FF) as usize;
                self.ram[ram_addr]
            }

            // PPU Registers: $2000-$2007, mirrored every 8 bytes through $3FFF
            0x2000..=0x3FFF => {
                let register = addr & 0x0007;
                self.ppu.borrow_mut().read(register)
            }

            // APU channel/status registers
            0x4000..=0x4013 | 0x4015 => self.apu.borrow_mut().read(addr),

            // OAM DMA register is write-only; reads return open bus (0)
            0x4014 => 0,

            // Controller 1/2 serial read
            0x4016 | 0x4017 => {
                let mut controllers = self.controllers.borrow_mut();
                controllers.set_controller1(Controller::from_byte(
                    self.controller1_byte.load(Ordering::Relaxed),
                ));
                controllers.set_controller2(Controller::from_byte(
                    self.controller2_byte.load(Ordering::Relaxed),
                ));
                controllers.read(addr)
            }

            // APU/I/O test mode, usually disabled on retail hardware
            0x4018..=0x401F => 0,

            // Cartridge space: PRG-ROM, PRG-RAM, mapper registers
            0x4020..=0xFFFF => self.read_cartridge(addr),
        }
    }

    /// Write a byte to the bus
    ///
    /// Routes the write operation to the appropriate memory region or device
    /// based on the address. Handles mirroring for RAM and PPU registers.
    ///
    /// # Example
    /// ```
    /// use nescore::Bus;
    /// let mut bus = Bus::new();
    /// bus.write(0x0000, 0x42); // Write to RAM
    /// ```
    pub fn write(&mut self, addr: u16, data: u8) {
        match addr {
            0x0000..=0x1FFF => {
                let ram_addr = (addr & 0x07FF) as usize;
                self.ram[ram_addr] = data;
            }

            0x2000..=0x3FFF => {
                let register = addr & 0x0007;
                self.ppu.borrow_mut().write(register, data);
            }

            // $4017 is write-only APU frame counter, but doubles as the
            // controller 2 serial read register.
            0x4000..=0x4013 | 0x4015 | 0x4017 => {
                self.apu.borrow_mut().write(addr, data);
            }

            0x4014 => {
                let page = data;
                self.oam_dma(page);
            }

            0x4016 => {
                self.controllers.borrow_mut().write(addr, data);
            }

            0x4018..=0x401F => {
                // Ignore writes to APU/IO test region
            }

            0x4020..=0xFFFF => {
                self.write_cartridge(addr, data);
            }
        }
    }

    /// Read a 16-bit word from the bus (little-endian)
    ///
    /// # Example
    /// ```
    /// use nescore::Bus;
    /// let mut bus = Bus::new();
    /// bus.write(0x0000, 0x34);
    /// bus.write(0x0001, 0x12);
    /// assert_eq!(bus.read_u16(0x0000), 0x1234);
    /// ```
    pub fn read_u16(&self, addr: u16) -> u16 {
        let lo = self.read(addr) as u16;
        let hi = self.read(addr.wrapping_add(1)) as u16;
        (hi << 8) | lo
    }

    /// Write a 16-bit word to the bus (little-endian)
    ///
    /// # Example
    /// ```
    /// use nescore::Bus;
    /// let mut bus = Bus::new();
    /// bus.write_u16(0x0000, 0x1234);
    /// assert_eq!(bus.read(0x0000), 0x34);
    /// assert_eq!(bus.read(0x0001), 0x12);
    /// ```
    pub fn write_u16(&mut self, addr: u16, data: u16) {
        let lo = (data & 0xFF) as u8;
        let hi = (data >> 8) as u8;
        self.write(addr, lo);
        self.write(addr.wrapping_add(1), hi);
    }
}

impl Default for Bus {
    fn default() -> Self {
        Self::new()
    }
}

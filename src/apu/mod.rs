// APU module - Audio Processing Unit implementation
//
// This module contains the APU emulation for the NES (Ricoh 2A03): two pulse
// channels, a triangle channel, a noise channel, a delta-modulation channel,
// the frame sequencer that clocks their envelopes/sweeps/length counters,
// and the non-linear mixer.
//
// ## Register Map
//
// | Address | Description                           |
// |---------|---------------------------------------|
// | $4000   | Pulse 1 - Duty cycle, envelope        |
// | $4001   | Pulse 1 - Sweep unit                  |
// | $4002   | Pulse 1 - Timer low byte               |
// | $4003   | Pulse 1 - Length counter, timer high   |
// | $4004   | Pulse 2 - Duty cycle, envelope        |
// | $4005   | Pulse 2 - Sweep unit                  |
// | $4006   | Pulse 2 - Timer low byte               |
// | $4007   | Pulse 2 - Length counter, timer high   |
// | $4008   | Triangle - Linear counter              |
// | $400A   | Triangle - Timer low byte               |
// | $400B   | Triangle - Length counter, timer high   |
// | $400C   | Noise - Envelope                        |
// | $400E   | Noise - Mode, period                    |
// | $400F   | Noise - Length counter                  |
// | $4010   | DMC - Flags, rate                       |
// | $4011   | DMC - Direct load                       |
// | $4012   | DMC - Sample address                    |
// | $4013   | DMC - Sample length                     |
// | $4015   | Status/Control (R/W)                    |
// | $4017   | Frame counter (W)                        |

pub mod channels;
pub mod components;
pub mod constants;

use crate::bus::MemoryMappedDevice;
use channels::{DmcChannel, NoiseChannel, PulseChannel, TriangleChannel};
use components::{FrameCounter, FrameEvent};

/// APU structure representing the Audio Processing Unit state
///
/// Drives all five sound channels, the frame sequencer, DMC sample requests,
/// and the non-linear mixer.
#[derive(Clone, serde::Serialize, serde::Deserialize)]
pub struct Apu {
    pulse1: PulseChannel,
    pulse2: PulseChannel,
    triangle: TriangleChannel,
    noise: NoiseChannel,
    dmc: DmcChannel,
    frame_counter: FrameCounter,

    /// Parity of the half-speed clock shared by pulse/noise/DMC timers.
    /// Toggles every CPU cycle; those channels clock on the falling edge.
    half_clock_tick: bool,
}

impl Apu {
    /// Create a new APU instance with default state
    ///
    /// # Example
    ///
    /// ```
    /// use nescore::apu::Apu;
    ///
    /// let apu = Apu::new();
    /// ```
    pub fn new() -> Self {
        Apu {
            pulse1: PulseChannel::new(1),
            pulse2: PulseChannel::new(2),
            triangle: TriangleChannel::new(),
            noise: NoiseChannel::new(),
            dmc: DmcChannel::new(),
            frame_counter: FrameCounter::new(),
            half_clock_tick: false,
        }
    }

    /// Reset APU to power-on state
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Clock the APU one CPU cycle.
    ///
    /// Triangle's timer is clocked every CPU cycle; pulse, noise, and DMC
    /// timers are clocked every other CPU cycle. The frame sequencer runs on
    /// every CPU cycle and its events drive the quarter/half frame clocks.
    pub fn clock(&mut self) {
        self.triangle.clock_timer();

        self.half_clock_tick = !self.half_clock_tick;
        if self.half_clock_tick {
            self.pulse1.clock_timer();
            self.pulse2.clock_timer();
            self.noise.clock_timer();
            self.dmc.clock_timer();
        }

        for event in self.frame_counter.clock() {
            self.apply_frame_event(event);
        }
    }

    fn apply_frame_event(&mut self, event: FrameEvent) {
        match event {
            FrameEvent::QuarterFrame => self.clock_quarter_frame(),
            FrameEvent::HalfFrame => self.clock_half_frame(),
            FrameEvent::SetIrq => {}
        }
    }

    /// Clock envelopes and the triangle's linear counter.
    fn clock_quarter_frame(&mut self) {
        self.pulse1.clock_envelope();
        self.pulse2.clock_envelope();
        self.triangle.clock_linear_counter();
        self.noise.clock_envelope();
    }

    /// Clock length counters and sweep units, in addition to a quarter frame.
    fn clock_half_frame(&mut self) {
        self.clock_quarter_frame();

        self.pulse1.clock_length_counter();
        self.pulse1.clock_sweep();
        self.pulse2.clock_length_counter();
        self.pulse2.clock_sweep();
        self.triangle.clock_length_counter();
        self.noise.clock_length_counter();
    }

    /// Address the DMC memory reader wants fetched, if any. The Bus should
    /// fetch the byte, stall the CPU for the DMA, and call
    /// [`Apu::dmc_provide_sample`].
    pub fn dmc_pending_fetch(&self) -> Option<u16> {
        self.dmc.needs_sample_read()
    }

    /// Deliver the byte fetched for a pending DMC sample request.
    pub fn dmc_provide_sample(&mut self, byte: u8) {
        self.dmc.load_sample_byte(byte);
    }

    /// Whether the APU's IRQ line (frame IRQ or DMC IRQ) is currently asserted.
    pub fn irq_pending(&self) -> bool {
        self.frame_counter.irq_pending() || self.dmc.irq_pending()
    }

    /// Get the mixed output sample from all channels.
    ///
    /// Applies the NES's non-linear mixing formula:
    /// `pulse_out = 95.88 / (8128/(p1+p2) + 100)`,
    /// `tnd_out = 159.79 / (1 / (tri/8227 + noise/12241 + dmc/22638) + 100)`.
    /// Returns a sample in `[0.0, 1.0]`.
    pub fn output(&self) -> f32 {
        let p1 = self.pulse1.output() as f32;
        let p2 = self.pulse2.output() as f32;
        let tri = self.triangle.output() as f32;
        let noise = self.noise.output() as f32;
        let dmc = self.dmc.output() as f32;

        let pulse_out = if p1 + p2 > 0.0 {
            95.88 / (8128.0 / (p1 + p2) + 100.0)
        } else {
            0.0
        };

        let tnd_sum = tri / 8227.0 + noise / 12241.0 + dmc / 22638.0;
        let tnd_out = if tnd_sum > 0.0 {
            159.79 / (1.0 / tnd_sum + 100.0)
        } else {
            0.0
        };

        (pulse_out + tnd_out).clamp(0.0, 1.0)
    }

    /// Get the output from pulse channel 1 (0-15).
    pub fn pulse1_output(&self) -> u8 {
        self.pulse1.output()
    }

    /// Get the output from pulse channel 2 (0-15).
    pub fn pulse2_output(&self) -> u8 {
        self.pulse2.output()
    }

    fn read_register(&mut self, addr: u16) -> u8 {
        match addr {
            0x4015 => {
                let mut status = 0u8;
                if self.pulse1.is_active() {
                    status |= 0x01;
                }
                if self.pulse2.is_active() {
                    status |= 0x02;
                }
                if self.triangle.length_counter.is_active() {
                    status |= 0x04;
                }
                if self.noise.is_active() {
                    status |= 0x08;
                }
                if self.dmc.is_active() {
                    status |= 0x10;
                }
                if self.frame_counter.irq_pending() {
                    status |= 0x40;
                }
                if self.dmc.irq_pending() {
                    status |= 0x80;
                }
                // Reading $4015 clears the frame IRQ flag (not the DMC one).
                self.frame_counter.clear_irq();
                status
            }
            // All other registers, including $4014/$4016/$4017, are write-only
            // from the APU's point of view; the bus routes those addresses
            // elsewhere before they reach here.
            _ => 0,
        }
    }

    fn write_register(&mut self, addr: u16, data: u8) {
        match addr {
            0x4000 => self.pulse1.write_register_0(data),
            0x4001 => self.pulse1.write_register_1(data),
            0x4002 => self.pulse1.write_register_2(data),
            0x4003 => self.pulse1.write_register_3(data),

            0x4004 => self.pulse2.write_register_0(data),
            0x4005 => self.pulse2.write_register_1(data),
            0x4006 => self.pulse2.write_register_2(data),
            0x4007 => self.pulse2.write_register_3(data),

            0x4008 => self.triangle.write_register_0(data),
            0x4009 => self.triangle.write_register_1(data),
            0x400A => self.triangle.write_register_2(data),
            0x400B => self.triangle.write_register_3(data),

            0x400C => self.noise.write_register_0(data),
            0x400D => self.noise.write_register_1(data),
            0x400E => self.noise.write_register_2(data),
            0x400F => self.noise.write_register_3(data),

            0x4010 => self.dmc.write_register_0(data),
            0x4011 => self.dmc.write_register_1(data),
            0x4012 => self.dmc.write_register_2(data),
            0x4013 => self.dmc.write_register_3(data),

            // $4015: channel enables. Writing DMC enable=1 with zero bytes
            // remaining restarts the sample from $4012/$4013.
            0x4015 => {
                self.pulse1.set_enabled((data & 0x01) != 0);
                self.pulse2.set_enabled((data & 0x02) != 0);
                self.triangle.set_enabled((data & 0x04) != 0);
                self.noise.set_enabled((data & 0x08) != 0);
                self.dmc.set_enabled((data & 0x10) != 0);
            }

            // $4017: frame sequencer mode/IRQ inhibit. Writing in 5-step mode
            // clocks all units immediately.
            0x4017 => {
                for event in self.frame_counter.write_control(data) {
                    self.apply_frame_event(event);
                }
            }

            _ => {}
        }
    }
}

impl MemoryMappedDevice for Apu {
    fn read(&mut self, addr: u16) -> u8 {
        self.read_register(addr)
    }

    fn write(&mut self, addr: u16, data: u8) {
        self.write_register(addr, data);
    }
}

impl Default for Apu {
    fn default() -> Self {
        Self::new()
    }
}

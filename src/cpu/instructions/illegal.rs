// Undocumented ("illegal") 6502 opcodes actually relied on by commercial NES software.
//
// Each of these composes two legal operations that the decoder happens to
// trigger simultaneously when an unofficial opcode byte is fetched (e.g. SLO
// is ASL immediately followed by ORA on the same operand). The bodies below
// mirror that pairing instead of inventing new semantics.

use crate::bus::Bus;
use crate::cpu::addressing::AddressingResult;
use crate::cpu::Cpu;

impl Cpu {
    /// *LAX - Load Accumulator and X
    ///
    /// Flags affected: Z, N
    pub fn lax(&mut self, bus: &Bus, addr_result: &AddressingResult) {
        let value = self.read_operand(bus, addr_result);
        self.a = value;
        self.x = value;
        self.update_zero_and_negative_flags(value);
    }

    /// *SAX - Store (A & X)
    ///
    /// Flags affected: none
    pub fn sax(&self, bus: &mut Bus, addr_result: &AddressingResult) {
        bus.write(addr_result.address, self.a & self.x);
    }

    /// *DCP - DEC memory, then CMP with A
    ///
    /// Flags affected: C, Z, N
    pub fn dcp(&mut self, bus: &mut Bus, addr_result: &AddressingResult) {
        let value = bus.read(addr_result.address).wrapping_sub(1);
        bus.write(addr_result.address, value);

        self.set_carry(self.a >= value);
        self.set_zero(self.a == value);
        self.set_negative((self.a.wrapping_sub(value) & 0x80) != 0);
    }

    /// *ISC (ISB) - INC memory, then SBC with A
    ///
    /// Flags affected: C, Z, V, N
    pub fn isc(&mut self, bus: &mut Bus, addr_result: &AddressingResult) {
        let value = bus.read(addr_result.address).wrapping_add(1);
        bus.write(addr_result.address, value);

        let inverted = !value;
        let carry = if self.get_carry() { 1 } else { 0 };
        let sum = self.a as u16 + inverted as u16 + carry as u16;
        self.set_carry(sum > 0xFF);

        let result = sum as u8;
        let overflow = (self.a ^ result) & (inverted ^ result) & 0x80 != 0;
        self.set_overflow(overflow);

        self.a = result;
        self.update_zero_and_negative_flags(result);
    }

    /// *SLO - ASL memory, then ORA with A
    ///
    /// Flags affected: C, Z, N
    pub fn slo(&mut self, bus: &mut Bus, addr_result: &AddressingResult) {
        let value = bus.read(addr_result.address);
        self.set_carry((value & 0x80) != 0);
        let shifted = value << 1;
        bus.write(addr_result.address, shifted);

        self.a |= shifted;
        self.update_zero_and_negative_flags(self.a);
    }

    /// *RLA - ROL memory, then AND with A
    ///
    /// Flags affected: C, Z, N
    pub fn rla(&mut self, bus: &mut Bus, addr_result: &AddressingResult) {
        let value = bus.read(addr_result.address);
        let old_carry = if self.get_carry() { 1 } else { 0 };
        self.set_carry((value & 0x80) != 0);
        let rotated = (value << 1) | old_carry;
        bus.write(addr_result.address, rotated);

        self.a &= rotated;
        self.update_zero_and_negative_flags(self.a);
    }

    /// *SRE - LSR memory, then EOR with A
    ///
    /// Flags affected: C, Z, N
    pub fn sre(&mut self, bus: &mut Bus, addr_result: &AddressingResult) {
        let value = bus.read(addr_result.address);
        self.set_carry((value & 0x01) != 0);
        let shifted = value >> 1;
        bus.write(addr_result.address, shifted);

        self.a ^= shifted;
        self.update_zero_and_negative_flags(self.a);
    }

    /// *RRA - ROR memory, then ADC with A
    ///
    /// Flags affected: C, Z, V, N
    pub fn rra(&mut self, bus: &mut Bus, addr_result: &AddressingResult) {
        let value = bus.read(addr_result.address);
        let old_carry = if self.get_carry() { 0x80 } else { 0 };
        self.set_carry((value & 0x01) != 0);
        let rotated = (value >> 1) | old_carry;
        bus.write(addr_result.address, rotated);

        let carry = if self.get_carry() { 1 } else { 0 };
        let sum = self.a as u16 + rotated as u16 + carry as u16;
        self.set_carry(sum > 0xFF);

        let result = sum as u8;
        let overflow = (self.a ^ result) & (rotated ^ result) & 0x80 != 0;
        self.set_overflow(overflow);

        self.a = result;
        self.update_zero_and_negative_flags(result);
    }

    /// *ANC - AND immediate, copy N into C
    ///
    /// Flags affected: C, Z, N
    pub fn anc(&mut self, bus: &Bus, addr_result: &AddressingResult) {
        let value = self.read_operand(bus, addr_result);
        self.a &= value;
        self.update_zero_and_negative_flags(self.a);
        self.set_carry((self.a & 0x80) != 0);
    }

    /// *ALR (ASR) - AND immediate, then LSR A
    ///
    /// Flags affected: C, Z, N
    pub fn alr(&mut self, bus: &Bus, addr_result: &AddressingResult) {
        let value = self.read_operand(bus, addr_result);
        self.a &= value;
        self.set_carry((self.a & 0x01) != 0);
        self.a >>= 1;
        self.update_zero_and_negative_flags(self.a);
    }

    /// *ARR - AND immediate, then ROR A with quirky C/V
    ///
    /// C is copied from bit 6 of the result, V from bit 6 XOR bit 5.
    pub fn arr(&mut self, bus: &Bus, addr_result: &AddressingResult) {
        let value = self.read_operand(bus, addr_result);
        self.a &= value;

        let old_carry = if self.get_carry() { 0x80 } else { 0 };
        self.a = (self.a >> 1) | old_carry;
        self.update_zero_and_negative_flags(self.a);

        let bit6 = (self.a & 0x40) != 0;
        let bit5 = (self.a & 0x20) != 0;
        self.set_carry(bit6);
        self.set_overflow(bit6 != bit5);
    }

    /// *AXS (SBX) - X = (A & X) - immediate, unsigned, no borrow input
    ///
    /// Flags affected: C, Z, N
    pub fn axs(&mut self, bus: &Bus, addr_result: &AddressingResult) {
        let value = self.read_operand(bus, addr_result);
        let base = self.a & self.x;

        self.set_carry(base >= value);
        let result = base.wrapping_sub(value);
        self.x = result;
        self.update_zero_and_negative_flags(result);
    }

    /// *STP (KIL/JAM) - freezes the CPU core.
    ///
    /// Real hardware locks the bus permanently; emulated here by setting
    /// `halted` so the caller can surface a fault.
    pub fn stp(&mut self) {
        self.halted = true;
    }
}

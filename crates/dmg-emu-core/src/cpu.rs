//! LR35902 CPU: register file, flag algebra and table-driven dispatch.

mod cb_ops;
mod ops;
mod registers;

pub use ops::Instruction;
pub use registers::{Reg16, Reg8};

use crate::interrupts::{DISPATCH_CYCLES, InterruptTarget};
use crate::mmu::Mmu;
use registers::Registers;

// CPU flag bits as documented in gbdev.io/pandocs/The_CPU_Flags.html
pub const FLAG_Z: u8 = 0x80; // Zero
pub const FLAG_N: u8 = 0x40; // Subtract
pub const FLAG_H: u8 = 0x20; // Half Carry
pub const FLAG_C: u8 = 0x10; // Carry

// Post-boot CPU state from gbdev.io/pandocs/Power_Up_State.html
const BOOT_AF: u16 = 0x01B0;
const BOOT_BC: u16 = 0x0013;
const BOOT_DE: u16 = 0x00D8;
const BOOT_HL: u16 = 0x014D;
const BOOT_SP: u16 = 0xFFFE;
const BOOT_PC: u16 = 0x0100;

/// Cycles charged for a step while halted or stopped.
pub const IDLE_CYCLES: u32 = 4;

pub struct Cpu {
    regs: Registers,
    ime: bool,
    /// Counts down to IME=1 after EI; the instruction following EI still
    /// runs with interrupts disabled.
    ime_enable_delay: u8,
    halted: bool,
    stopped: bool,
    cycles: u64,
}

impl Cpu {
    /// A CPU with every register cleared.
    pub fn new() -> Self {
        Self {
            regs: Registers::default(),
            ime: false,
            ime_enable_delay: 0,
            halted: false,
            stopped: false,
            cycles: 0,
        }
    }

    /// Register values the DMG boot ROM leaves behind at 0x0100.
    pub fn post_boot() -> Self {
        let mut cpu = Self::new();
        cpu.regs.set16(Reg16::AF, BOOT_AF);
        cpu.regs.set16(Reg16::BC, BOOT_BC);
        cpu.regs.set16(Reg16::DE, BOOT_DE);
        cpu.regs.set16(Reg16::HL, BOOT_HL);
        cpu.regs.sp = BOOT_SP;
        cpu.regs.pc = BOOT_PC;
        cpu
    }

    pub fn register(&self, reg: Reg8) -> u8 {
        self.regs.get(reg)
    }

    pub fn set_register(&mut self, reg: Reg8, val: u8) {
        self.regs.set(reg, val);
    }

    pub fn register16(&self, reg: Reg16) -> u16 {
        self.regs.get16(reg)
    }

    pub fn set_register16(&mut self, reg: Reg16, val: u16) {
        self.regs.set16(reg, val);
    }

    pub fn pc(&self) -> u16 {
        self.regs.pc
    }

    pub fn sp(&self) -> u16 {
        self.regs.sp
    }

    /// Whether every bit of `mask` is set in F.
    pub fn flag(&self, mask: u8) -> bool {
        self.regs.f() & mask == mask
    }

    pub fn set_flag(&mut self, mask: u8, on: bool) {
        let f = self.regs.f();
        self.regs.set_f(if on { f | mask } else { f & !mask });
    }

    pub fn ime(&self) -> bool {
        self.ime
    }

    pub fn set_ime(&mut self, on: bool) {
        self.ime = on;
        self.ime_enable_delay = 0;
    }

    pub fn halted(&self) -> bool {
        self.halted
    }

    pub fn set_halted(&mut self, on: bool) {
        self.halted = on;
    }

    pub fn stopped(&self) -> bool {
        self.stopped
    }

    pub fn set_stopped(&mut self, on: bool) {
        self.stopped = on;
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn set_cycles(&mut self, cycles: u64) {
        self.cycles = cycles;
    }

    pub fn debug_state(&self) -> String {
        format!(
            "AF:{:04X} BC:{:04X} DE:{:04X} HL:{:04X} PC:{:04X} SP:{:04X} CY:{}",
            self.regs.get16(Reg16::AF),
            self.regs.get16(Reg16::BC),
            self.regs.get16(Reg16::DE),
            self.regs.get16(Reg16::HL),
            self.regs.pc,
            self.regs.sp,
            self.cycles
        )
    }

    /// Execute one instruction (or idle while halted/stopped) and return the
    /// cycles it took.
    pub fn step(&mut self, mmu: &mut Mmu) -> u32 {
        if self.halted || self.stopped {
            self.cycles += IDLE_CYCLES as u64;
            return IDLE_CYCLES;
        }

        #[cfg(feature = "cpu-trace")]
        let pc = self.regs.pc;

        let opcode = self.fetch8(mmu);
        let cycles = if opcode == 0xCB {
            let cb = self.fetch8(mmu);
            #[cfg(feature = "cpu-trace")]
            log::trace!(
                "{pc:04X}: CB {} | {}",
                Self::cb_instruction(cb).mnemonic,
                self.debug_state()
            );
            cb_ops::execute(self, mmu, cb)
        } else {
            #[cfg(feature = "cpu-trace")]
            log::trace!(
                "{pc:04X}: {} | {}",
                Self::instruction(opcode).mnemonic,
                self.debug_state()
            );
            ops::execute(self, mmu, opcode)
        };

        if self.ime_enable_delay > 0 {
            self.ime_enable_delay -= 1;
            if self.ime_enable_delay == 0 {
                self.ime = true;
            }
        }

        self.cycles += cycles as u64;
        cycles
    }

    /// Table entry for a base opcode.
    pub fn instruction(opcode: u8) -> &'static Instruction {
        &ops::BASE_TABLE[opcode as usize]
    }

    /// Table entry for the byte following a 0xCB prefix.
    pub fn cb_instruction(opcode: u8) -> &'static Instruction {
        &cb_ops::CB_TABLE[opcode as usize]
    }

    // --- memory helpers -------------------------------------------------

    #[inline(always)]
    fn fetch8(&mut self, mmu: &Mmu) -> u8 {
        let val = mmu.read_byte(self.regs.pc);
        self.regs.pc = self.regs.pc.wrapping_add(1);
        val
    }

    #[inline(always)]
    fn fetch16(&mut self, mmu: &Mmu) -> u16 {
        let lo = self.fetch8(mmu) as u16;
        let hi = self.fetch8(mmu) as u16;
        (hi << 8) | lo
    }

    /// Operand register by its 3-bit encoding; 6 is (HL).
    #[inline(always)]
    fn read_r(&self, mmu: &Mmu, index: u8) -> u8 {
        match index & 0x07 {
            0 => self.regs.b,
            1 => self.regs.c,
            2 => self.regs.d,
            3 => self.regs.e,
            4 => self.regs.h,
            5 => self.regs.l,
            6 => mmu.read_byte(self.regs.get16(Reg16::HL)),
            _ => self.regs.a,
        }
    }

    #[inline(always)]
    fn write_r(&mut self, mmu: &mut Mmu, index: u8, val: u8) {
        match index & 0x07 {
            0 => self.regs.b = val,
            1 => self.regs.c = val,
            2 => self.regs.d = val,
            3 => self.regs.e = val,
            4 => self.regs.h = val,
            5 => self.regs.l = val,
            6 => mmu.write_byte(self.regs.get16(Reg16::HL), val),
            _ => self.regs.a = val,
        }
    }

    fn push_stack(&mut self, mmu: &mut Mmu, val: u16) {
        self.regs.sp = self.regs.sp.wrapping_sub(2);
        mmu.write_word(self.regs.sp, val);
    }

    fn pop_stack(&mut self, mmu: &Mmu) -> u16 {
        let val = mmu.read_word(self.regs.sp);
        self.regs.sp = self.regs.sp.wrapping_add(2);
        val
    }

    /// NZ, Z, NC, C by opcode bits 3-4.
    fn condition(&self, op: u8) -> bool {
        match (op >> 3) & 0x03 {
            0 => !self.flag(FLAG_Z),
            1 => self.flag(FLAG_Z),
            2 => !self.flag(FLAG_C),
            _ => self.flag(FLAG_C),
        }
    }

    // --- flag algebra ---------------------------------------------------

    #[inline(always)]
    fn set_flags(&mut self, z: bool, n: bool, h: bool, c: bool) {
        self.regs.set_f(
            if z { FLAG_Z } else { 0 }
                | if n { FLAG_N } else { 0 }
                | if h { FLAG_H } else { 0 }
                | if c { FLAG_C } else { 0 },
        );
    }

    fn alu_add(&mut self, val: u8, use_carry: bool) {
        let a = self.regs.a;
        let carry = (use_carry && self.flag(FLAG_C)) as u8;
        let res = a.wrapping_add(val).wrapping_add(carry);
        let h = (a & 0x0F) + (val & 0x0F) + carry > 0x0F;
        let c = a as u16 + val as u16 + carry as u16 > 0xFF;
        self.regs.a = res;
        self.set_flags(res == 0, false, h, c);
    }

    /// SUB/SBC/CP share this; `store` is false for CP.
    fn alu_sub(&mut self, val: u8, use_carry: bool, store: bool) {
        let a = self.regs.a;
        let carry = (use_carry && self.flag(FLAG_C)) as u8;
        let res = a.wrapping_sub(val).wrapping_sub(carry);
        let h = (a & 0x0F) < (val & 0x0F) + carry;
        let c = (a as u16) < val as u16 + carry as u16;
        if store {
            self.regs.a = res;
        }
        self.set_flags(res == 0, true, h, c);
    }

    fn alu_and(&mut self, val: u8) {
        self.regs.a &= val;
        self.set_flags(self.regs.a == 0, false, true, false);
    }

    fn alu_xor(&mut self, val: u8) {
        self.regs.a ^= val;
        self.set_flags(self.regs.a == 0, false, false, false);
    }

    fn alu_or(&mut self, val: u8) {
        self.regs.a |= val;
        self.set_flags(self.regs.a == 0, false, false, false);
    }

    /// ALU operation selected by opcode bits 3-5.
    fn alu(&mut self, op: u8, val: u8) {
        match (op >> 3) & 0x07 {
            0 => self.alu_add(val, false),
            1 => self.alu_add(val, true),
            2 => self.alu_sub(val, false, true),
            3 => self.alu_sub(val, true, true),
            4 => self.alu_and(val),
            5 => self.alu_xor(val),
            6 => self.alu_or(val),
            _ => self.alu_sub(val, false, false),
        }
    }

    /// INC r: C is untouched.
    fn alu_inc(&mut self, val: u8) -> u8 {
        let res = val.wrapping_add(1);
        let c = self.flag(FLAG_C);
        self.set_flags(res == 0, false, (val & 0x0F) + 1 > 0x0F, c);
        res
    }

    /// DEC r: C is untouched.
    fn alu_dec(&mut self, val: u8) -> u8 {
        let res = val.wrapping_sub(1);
        let c = self.flag(FLAG_C);
        self.set_flags(res == 0, true, val & 0x0F == 0, c);
        res
    }

    fn alu_add_hl(&mut self, val: u16) {
        let hl = self.regs.get16(Reg16::HL);
        let res = hl.wrapping_add(val);
        let z = self.flag(FLAG_Z);
        let h = (hl & 0x0FFF) + (val & 0x0FFF) > 0x0FFF;
        let c = hl as u32 + val as u32 > 0xFFFF;
        self.regs.set16(Reg16::HL, res);
        self.set_flags(z, false, h, c);
    }

    /// SP + signed offset; flags come from the unsigned low byte add.
    fn sp_plus_offset(&mut self, offset: u8) -> u16 {
        let sp = self.regs.sp;
        let val = offset as i8 as i16 as u16;
        let h = (sp & 0x0F) + (val & 0x0F) > 0x0F;
        let c = (sp & 0xFF) + (val & 0xFF) > 0xFF;
        self.set_flags(false, false, h, c);
        sp.wrapping_add(val)
    }

    /// BCD correction after an add or subtract.
    fn daa(&mut self) {
        let n = self.flag(FLAG_N);
        let mut correction = 0u8;
        let mut carry = false;
        if self.flag(FLAG_H) || (!n && (self.regs.a & 0x0F) > 9) {
            correction |= 0x06;
        }
        if self.flag(FLAG_C) || (!n && self.regs.a > 0x99) {
            correction |= 0x60;
            carry = true;
        }
        self.regs.a = if n {
            self.regs.a.wrapping_sub(correction)
        } else {
            self.regs.a.wrapping_add(correction)
        };
        self.set_flags(self.regs.a == 0, n, false, carry);
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

impl InterruptTarget for Cpu {
    fn is_halted(&self) -> bool {
        self.halted
    }

    fn clear_halt(&mut self) {
        self.halted = false;
    }

    fn is_stopped(&self) -> bool {
        self.stopped
    }

    fn clear_stop(&mut self) {
        self.stopped = false;
    }

    fn interrupts_enabled(&self) -> bool {
        self.ime
    }

    fn interrupt(&mut self, mmu: &mut Mmu, vector: u16) -> bool {
        if !self.ime {
            return false;
        }
        self.ime = false;
        self.ime_enable_delay = 0;
        self.halted = false;
        let pc = self.regs.pc;
        self.push_stack(mmu, pc);
        self.regs.pc = vector;
        self.cycles += DISPATCH_CYCLES as u64;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cpu_with_program(program: &[u8]) -> (Cpu, Mmu) {
        let mut mmu = Mmu::new();
        for (i, b) in program.iter().enumerate() {
            mmu.wram[i] = *b;
        }
        let mut cpu = Cpu::new();
        cpu.regs.pc = 0xC000;
        cpu.regs.sp = 0xDFFE;
        (cpu, mmu)
    }

    #[test]
    fn sub_half_borrow_and_borrow() {
        let mut cpu = Cpu::new();
        cpu.regs.a = 0x10;
        cpu.alu_sub(0x01, false, true);
        assert_eq!(cpu.regs.a, 0x0F);
        assert!(cpu.flag(FLAG_N | FLAG_H));
        assert!(!cpu.flag(FLAG_C));

        cpu.regs.a = 0x00;
        cpu.alu_sub(0x01, false, true);
        assert_eq!(cpu.regs.a, 0xFF);
        assert!(cpu.flag(FLAG_C | FLAG_H));
    }

    #[test]
    fn sbc_includes_carry_in_both_flags() {
        let mut cpu = Cpu::new();
        cpu.regs.a = 0x00;
        cpu.set_flag(FLAG_C, true);
        cpu.alu_sub(0xFF, true, true);
        assert_eq!(cpu.regs.a, 0x00);
        assert!(cpu.flag(FLAG_Z | FLAG_N | FLAG_H | FLAG_C));
    }

    #[test]
    fn daa_after_add_and_sub() {
        let mut cpu = Cpu::new();
        cpu.regs.a = 0x45;
        cpu.alu_add(0x38, false);
        cpu.daa();
        assert_eq!(cpu.regs.a, 0x83);
        assert!(!cpu.flag(FLAG_C));

        cpu.regs.a = 0x83;
        cpu.alu_sub(0x38, false, true);
        cpu.daa();
        assert_eq!(cpu.regs.a, 0x45);

        cpu.regs.a = 0x99;
        cpu.alu_add(0x01, false);
        cpu.daa();
        assert_eq!(cpu.regs.a, 0x00);
        assert!(cpu.flag(FLAG_Z | FLAG_C));
    }

    #[test]
    fn add_hl_keeps_zero_flag() {
        let mut cpu = Cpu::new();
        cpu.set_flag(FLAG_Z, true);
        cpu.regs.set16(Reg16::HL, 0x0FFF);
        cpu.alu_add_hl(0x0001);
        assert_eq!(cpu.regs.get16(Reg16::HL), 0x1000);
        assert!(cpu.flag(FLAG_Z | FLAG_H));
        assert!(!cpu.flag(FLAG_C));
    }

    #[test]
    fn sp_offset_flags_use_low_byte() {
        let mut cpu = Cpu::new();
        cpu.regs.sp = 0x00FF;
        let res = cpu.sp_plus_offset(0x01);
        assert_eq!(res, 0x0100);
        assert!(cpu.flag(FLAG_H | FLAG_C));

        cpu.regs.sp = 0x1000;
        let res = cpu.sp_plus_offset(0xFF); // -1
        assert_eq!(res, 0x0FFF);
        assert!(!cpu.flag(FLAG_H));
        assert!(!cpu.flag(FLAG_C));
    }

    #[test]
    fn ei_takes_effect_after_next_instruction() {
        // EI; NOP; NOP
        let (mut cpu, mut mmu) = cpu_with_program(&[0xFB, 0x00, 0x00]);
        cpu.step(&mut mmu);
        assert!(!cpu.ime());
        cpu.step(&mut mmu);
        assert!(cpu.ime());
    }

    #[test]
    fn di_right_after_ei_cancels() {
        // EI; DI; NOP
        let (mut cpu, mut mmu) = cpu_with_program(&[0xFB, 0xF3, 0x00]);
        cpu.step(&mut mmu);
        cpu.step(&mut mmu);
        cpu.step(&mut mmu);
        assert!(!cpu.ime());
    }

    #[test]
    fn halted_cpu_idles_without_advancing_pc() {
        let (mut cpu, mut mmu) = cpu_with_program(&[0x76, 0x00]);
        assert_eq!(cpu.step(&mut mmu), 4);
        assert!(cpu.halted());
        let pc = cpu.pc();
        assert_eq!(cpu.step(&mut mmu), IDLE_CYCLES);
        assert_eq!(cpu.pc(), pc);
        assert_eq!(cpu.cycles(), 8);
    }

    #[test]
    fn interrupt_requires_ime() {
        let (mut cpu, mut mmu) = cpu_with_program(&[]);
        assert!(!cpu.interrupt(&mut mmu, 0x50));
        assert_eq!(cpu.pc(), 0xC000);

        cpu.set_ime(true);
        cpu.halted = true;
        assert!(cpu.interrupt(&mut mmu, 0x50));
        assert_eq!(cpu.pc(), 0x0050);
        assert!(!cpu.ime());
        assert!(!cpu.halted());
        assert_eq!(mmu.read_word(cpu.sp()), 0xC000);
        assert_eq!(cpu.cycles(), DISPATCH_CYCLES as u64);
    }
}

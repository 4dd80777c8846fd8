//! Base opcode table.
//!
//! Every entry pairs a handler with its fixed cost in T-cycles. Conditional
//! branches are listed at their taken cost and charge it on both paths.
//! Handlers that cover a family of opcodes decode their operands from the
//! opcode bits they are given.

use super::{Cpu, FLAG_C, FLAG_H, FLAG_N, FLAG_Z, Reg16, Registers};
use crate::mmu::Mmu;

pub(super) type Handler = fn(&mut Cpu, &mut Mmu, u8);

#[derive(Clone, Copy)]
pub struct Instruction {
    pub mnemonic: &'static str,
    pub cycles: u32,
    pub(super) exec: Handler,
}

impl std::fmt::Debug for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instruction")
            .field("mnemonic", &self.mnemonic)
            .field("cycles", &self.cycles)
            .finish()
    }
}

pub(super) const fn ins(mnemonic: &'static str, cycles: u32, exec: Handler) -> Instruction {
    Instruction {
        mnemonic,
        cycles,
        exec,
    }
}

pub(super) fn execute(cpu: &mut Cpu, mmu: &mut Mmu, opcode: u8) -> u32 {
    let entry = &BASE_TABLE[opcode as usize];
    (entry.exec)(cpu, mmu, opcode);
    entry.cycles
}

pub(super) static BASE_TABLE: [Instruction; 256] = build();

const fn build() -> [Instruction; 256] {
    let mut t = [ins("ILLEGAL", 4, illegal); 256];

    t[0x00] = ins("NOP", 4, nop);
    t[0x01] = ins("LD BC,d16", 12, ld_rr_d16);
    t[0x02] = ins("LD (BC),A", 8, ld_ind_a);
    t[0x03] = ins("INC BC", 8, inc_rr);
    t[0x04] = ins("INC B", 4, inc_r);
    t[0x05] = ins("DEC B", 4, dec_r);
    t[0x06] = ins("LD B,d8", 8, ld_r_d8);
    t[0x07] = ins("RLCA", 4, rlca);
    t[0x08] = ins("LD (a16),SP", 20, ld_a16_sp);
    t[0x09] = ins("ADD HL,BC", 8, add_hl_rr);
    t[0x0A] = ins("LD A,(BC)", 8, ld_a_ind);
    t[0x0B] = ins("DEC BC", 8, dec_rr);
    t[0x0C] = ins("INC C", 4, inc_r);
    t[0x0D] = ins("DEC C", 4, dec_r);
    t[0x0E] = ins("LD C,d8", 8, ld_r_d8);
    t[0x0F] = ins("RRCA", 4, rrca);

    t[0x10] = ins("STOP", 4, stop);
    t[0x11] = ins("LD DE,d16", 12, ld_rr_d16);
    t[0x12] = ins("LD (DE),A", 8, ld_ind_a);
    t[0x13] = ins("INC DE", 8, inc_rr);
    t[0x14] = ins("INC D", 4, inc_r);
    t[0x15] = ins("DEC D", 4, dec_r);
    t[0x16] = ins("LD D,d8", 8, ld_r_d8);
    t[0x17] = ins("RLA", 4, rla);
    t[0x18] = ins("JR r8", 12, jr);
    t[0x19] = ins("ADD HL,DE", 8, add_hl_rr);
    t[0x1A] = ins("LD A,(DE)", 8, ld_a_ind);
    t[0x1B] = ins("DEC DE", 8, dec_rr);
    t[0x1C] = ins("INC E", 4, inc_r);
    t[0x1D] = ins("DEC E", 4, dec_r);
    t[0x1E] = ins("LD E,d8", 8, ld_r_d8);
    t[0x1F] = ins("RRA", 4, rra);

    t[0x20] = ins("JR NZ,r8", 12, jr_cc);
    t[0x21] = ins("LD HL,d16", 12, ld_rr_d16);
    t[0x22] = ins("LD (HL+),A", 8, ld_hli_a);
    t[0x23] = ins("INC HL", 8, inc_rr);
    t[0x24] = ins("INC H", 4, inc_r);
    t[0x25] = ins("DEC H", 4, dec_r);
    t[0x26] = ins("LD H,d8", 8, ld_r_d8);
    t[0x27] = ins("DAA", 4, daa);
    t[0x28] = ins("JR Z,r8", 12, jr_cc);
    t[0x29] = ins("ADD HL,HL", 8, add_hl_rr);
    t[0x2A] = ins("LD A,(HL+)", 8, ld_a_hli);
    t[0x2B] = ins("DEC HL", 8, dec_rr);
    t[0x2C] = ins("INC L", 4, inc_r);
    t[0x2D] = ins("DEC L", 4, dec_r);
    t[0x2E] = ins("LD L,d8", 8, ld_r_d8);
    t[0x2F] = ins("CPL", 4, cpl);

    t[0x30] = ins("JR NC,r8", 12, jr_cc);
    t[0x31] = ins("LD SP,d16", 12, ld_rr_d16);
    t[0x32] = ins("LD (HL-),A", 8, ld_hld_a);
    t[0x33] = ins("INC SP", 8, inc_rr);
    t[0x34] = ins("INC (HL)", 12, inc_r);
    t[0x35] = ins("DEC (HL)", 12, dec_r);
    t[0x36] = ins("LD (HL),d8", 12, ld_r_d8);
    t[0x37] = ins("SCF", 4, scf);
    t[0x38] = ins("JR C,r8", 12, jr_cc);
    t[0x39] = ins("ADD HL,SP", 8, add_hl_rr);
    t[0x3A] = ins("LD A,(HL-)", 8, ld_a_hld);
    t[0x3B] = ins("DEC SP", 8, dec_rr);
    t[0x3C] = ins("INC A", 4, inc_r);
    t[0x3D] = ins("DEC A", 4, dec_r);
    t[0x3E] = ins("LD A,d8", 8, ld_r_d8);
    t[0x3F] = ins("CCF", 4, ccf);

    t[0x40] = ins("LD B,B", 4, ld_r_r);
    t[0x41] = ins("LD B,C", 4, ld_r_r);
    t[0x42] = ins("LD B,D", 4, ld_r_r);
    t[0x43] = ins("LD B,E", 4, ld_r_r);
    t[0x44] = ins("LD B,H", 4, ld_r_r);
    t[0x45] = ins("LD B,L", 4, ld_r_r);
    t[0x46] = ins("LD B,(HL)", 8, ld_r_r);
    t[0x47] = ins("LD B,A", 4, ld_r_r);
    t[0x48] = ins("LD C,B", 4, ld_r_r);
    t[0x49] = ins("LD C,C", 4, ld_r_r);
    t[0x4A] = ins("LD C,D", 4, ld_r_r);
    t[0x4B] = ins("LD C,E", 4, ld_r_r);
    t[0x4C] = ins("LD C,H", 4, ld_r_r);
    t[0x4D] = ins("LD C,L", 4, ld_r_r);
    t[0x4E] = ins("LD C,(HL)", 8, ld_r_r);
    t[0x4F] = ins("LD C,A", 4, ld_r_r);

    t[0x50] = ins("LD D,B", 4, ld_r_r);
    t[0x51] = ins("LD D,C", 4, ld_r_r);
    t[0x52] = ins("LD D,D", 4, ld_r_r);
    t[0x53] = ins("LD D,E", 4, ld_r_r);
    t[0x54] = ins("LD D,H", 4, ld_r_r);
    t[0x55] = ins("LD D,L", 4, ld_r_r);
    t[0x56] = ins("LD D,(HL)", 8, ld_r_r);
    t[0x57] = ins("LD D,A", 4, ld_r_r);
    t[0x58] = ins("LD E,B", 4, ld_r_r);
    t[0x59] = ins("LD E,C", 4, ld_r_r);
    t[0x5A] = ins("LD E,D", 4, ld_r_r);
    t[0x5B] = ins("LD E,E", 4, ld_r_r);
    t[0x5C] = ins("LD E,H", 4, ld_r_r);
    t[0x5D] = ins("LD E,L", 4, ld_r_r);
    t[0x5E] = ins("LD E,(HL)", 8, ld_r_r);
    t[0x5F] = ins("LD E,A", 4, ld_r_r);

    t[0x60] = ins("LD H,B", 4, ld_r_r);
    t[0x61] = ins("LD H,C", 4, ld_r_r);
    t[0x62] = ins("LD H,D", 4, ld_r_r);
    t[0x63] = ins("LD H,E", 4, ld_r_r);
    t[0x64] = ins("LD H,H", 4, ld_r_r);
    t[0x65] = ins("LD H,L", 4, ld_r_r);
    t[0x66] = ins("LD H,(HL)", 8, ld_r_r);
    t[0x67] = ins("LD H,A", 4, ld_r_r);
    t[0x68] = ins("LD L,B", 4, ld_r_r);
    t[0x69] = ins("LD L,C", 4, ld_r_r);
    t[0x6A] = ins("LD L,D", 4, ld_r_r);
    t[0x6B] = ins("LD L,E", 4, ld_r_r);
    t[0x6C] = ins("LD L,H", 4, ld_r_r);
    t[0x6D] = ins("LD L,L", 4, ld_r_r);
    t[0x6E] = ins("LD L,(HL)", 8, ld_r_r);
    t[0x6F] = ins("LD L,A", 4, ld_r_r);

    t[0x70] = ins("LD (HL),B", 8, ld_r_r);
    t[0x71] = ins("LD (HL),C", 8, ld_r_r);
    t[0x72] = ins("LD (HL),D", 8, ld_r_r);
    t[0x73] = ins("LD (HL),E", 8, ld_r_r);
    t[0x74] = ins("LD (HL),H", 8, ld_r_r);
    t[0x75] = ins("LD (HL),L", 8, ld_r_r);
    t[0x76] = ins("HALT", 4, halt);
    t[0x77] = ins("LD (HL),A", 8, ld_r_r);
    t[0x78] = ins("LD A,B", 4, ld_r_r);
    t[0x79] = ins("LD A,C", 4, ld_r_r);
    t[0x7A] = ins("LD A,D", 4, ld_r_r);
    t[0x7B] = ins("LD A,E", 4, ld_r_r);
    t[0x7C] = ins("LD A,H", 4, ld_r_r);
    t[0x7D] = ins("LD A,L", 4, ld_r_r);
    t[0x7E] = ins("LD A,(HL)", 8, ld_r_r);
    t[0x7F] = ins("LD A,A", 4, ld_r_r);

    t[0x80] = ins("ADD A,B", 4, alu_r);
    t[0x81] = ins("ADD A,C", 4, alu_r);
    t[0x82] = ins("ADD A,D", 4, alu_r);
    t[0x83] = ins("ADD A,E", 4, alu_r);
    t[0x84] = ins("ADD A,H", 4, alu_r);
    t[0x85] = ins("ADD A,L", 4, alu_r);
    t[0x86] = ins("ADD A,(HL)", 8, alu_r);
    t[0x87] = ins("ADD A,A", 4, alu_r);
    t[0x88] = ins("ADC A,B", 4, alu_r);
    t[0x89] = ins("ADC A,C", 4, alu_r);
    t[0x8A] = ins("ADC A,D", 4, alu_r);
    t[0x8B] = ins("ADC A,E", 4, alu_r);
    t[0x8C] = ins("ADC A,H", 4, alu_r);
    t[0x8D] = ins("ADC A,L", 4, alu_r);
    t[0x8E] = ins("ADC A,(HL)", 8, alu_r);
    t[0x8F] = ins("ADC A,A", 4, alu_r);

    t[0x90] = ins("SUB B", 4, alu_r);
    t[0x91] = ins("SUB C", 4, alu_r);
    t[0x92] = ins("SUB D", 4, alu_r);
    t[0x93] = ins("SUB E", 4, alu_r);
    t[0x94] = ins("SUB H", 4, alu_r);
    t[0x95] = ins("SUB L", 4, alu_r);
    t[0x96] = ins("SUB (HL)", 8, alu_r);
    t[0x97] = ins("SUB A", 4, alu_r);
    t[0x98] = ins("SBC A,B", 4, alu_r);
    t[0x99] = ins("SBC A,C", 4, alu_r);
    t[0x9A] = ins("SBC A,D", 4, alu_r);
    t[0x9B] = ins("SBC A,E", 4, alu_r);
    t[0x9C] = ins("SBC A,H", 4, alu_r);
    t[0x9D] = ins("SBC A,L", 4, alu_r);
    t[0x9E] = ins("SBC A,(HL)", 8, alu_r);
    t[0x9F] = ins("SBC A,A", 4, alu_r);

    t[0xA0] = ins("AND B", 4, alu_r);
    t[0xA1] = ins("AND C", 4, alu_r);
    t[0xA2] = ins("AND D", 4, alu_r);
    t[0xA3] = ins("AND E", 4, alu_r);
    t[0xA4] = ins("AND H", 4, alu_r);
    t[0xA5] = ins("AND L", 4, alu_r);
    t[0xA6] = ins("AND (HL)", 8, alu_r);
    t[0xA7] = ins("AND A", 4, alu_r);
    t[0xA8] = ins("XOR B", 4, alu_r);
    t[0xA9] = ins("XOR C", 4, alu_r);
    t[0xAA] = ins("XOR D", 4, alu_r);
    t[0xAB] = ins("XOR E", 4, alu_r);
    t[0xAC] = ins("XOR H", 4, alu_r);
    t[0xAD] = ins("XOR L", 4, alu_r);
    t[0xAE] = ins("XOR (HL)", 8, alu_r);
    t[0xAF] = ins("XOR A", 4, alu_r);

    t[0xB0] = ins("OR B", 4, alu_r);
    t[0xB1] = ins("OR C", 4, alu_r);
    t[0xB2] = ins("OR D", 4, alu_r);
    t[0xB3] = ins("OR E", 4, alu_r);
    t[0xB4] = ins("OR H", 4, alu_r);
    t[0xB5] = ins("OR L", 4, alu_r);
    t[0xB6] = ins("OR (HL)", 8, alu_r);
    t[0xB7] = ins("OR A", 4, alu_r);
    t[0xB8] = ins("CP B", 4, alu_r);
    t[0xB9] = ins("CP C", 4, alu_r);
    t[0xBA] = ins("CP D", 4, alu_r);
    t[0xBB] = ins("CP E", 4, alu_r);
    t[0xBC] = ins("CP H", 4, alu_r);
    t[0xBD] = ins("CP L", 4, alu_r);
    t[0xBE] = ins("CP (HL)", 8, alu_r);
    t[0xBF] = ins("CP A", 4, alu_r);

    t[0xC0] = ins("RET NZ", 20, ret_cc);
    t[0xC1] = ins("POP BC", 12, pop);
    t[0xC2] = ins("JP NZ,a16", 16, jp_cc);
    t[0xC3] = ins("JP a16", 16, jp);
    t[0xC4] = ins("CALL NZ,a16", 24, call_cc);
    t[0xC5] = ins("PUSH BC", 16, push);
    t[0xC6] = ins("ADD A,d8", 8, alu_d8);
    t[0xC7] = ins("RST 00H", 16, rst);
    t[0xC8] = ins("RET Z", 20, ret_cc);
    t[0xC9] = ins("RET", 16, ret);
    t[0xCA] = ins("JP Z,a16", 16, jp_cc);
    // The prefixed opcode adds its own cost from the CB table.
    // The prefixed instruction runs from CB_TABLE; this entry is never executed.
    t[0xCB] = ins("PREFIX CB", 4, nop);
    t[0xCC] = ins("CALL Z,a16", 24, call_cc);
    t[0xCD] = ins("CALL a16", 24, call);
    t[0xCE] = ins("ADC A,d8", 8, alu_d8);
    t[0xCF] = ins("RST 08H", 16, rst);

    t[0xD0] = ins("RET NC", 20, ret_cc);
    t[0xD1] = ins("POP DE", 12, pop);
    t[0xD2] = ins("JP NC,a16", 16, jp_cc);
    t[0xD4] = ins("CALL NC,a16", 24, call_cc);
    t[0xD5] = ins("PUSH DE", 16, push);
    t[0xD6] = ins("SUB d8", 8, alu_d8);
    t[0xD7] = ins("RST 10H", 16, rst);
    t[0xD8] = ins("RET C", 20, ret_cc);
    t[0xD9] = ins("RETI", 16, reti);
    t[0xDA] = ins("JP C,a16", 16, jp_cc);
    t[0xDC] = ins("CALL C,a16", 24, call_cc);
    t[0xDE] = ins("SBC A,d8", 8, alu_d8);
    t[0xDF] = ins("RST 18H", 16, rst);

    t[0xE0] = ins("LDH (a8),A", 12, ldh_a8_a);
    t[0xE1] = ins("POP HL", 12, pop);
    t[0xE2] = ins("LD (C),A", 8, ld_c_a);
    t[0xE5] = ins("PUSH HL", 16, push);
    t[0xE6] = ins("AND d8", 8, alu_d8);
    t[0xE7] = ins("RST 20H", 16, rst);
    t[0xE8] = ins("ADD SP,r8", 16, add_sp_r8);
    t[0xE9] = ins("JP (HL)", 4, jp_hl);
    t[0xEA] = ins("LD (a16),A", 16, ld_a16_a);
    t[0xEE] = ins("XOR d8", 8, alu_d8);
    t[0xEF] = ins("RST 28H", 16, rst);

    t[0xF0] = ins("LDH A,(a8)", 12, ldh_a_a8);
    t[0xF1] = ins("POP AF", 12, pop);
    t[0xF2] = ins("LD A,(C)", 8, ld_a_c);
    t[0xF3] = ins("DI", 4, di);
    t[0xF5] = ins("PUSH AF", 16, push);
    t[0xF6] = ins("OR d8", 8, alu_d8);
    t[0xF7] = ins("RST 30H", 16, rst);
    t[0xF8] = ins("LD HL,SP+r8", 12, ld_hl_sp_r8);
    t[0xF9] = ins("LD SP,HL", 8, ld_sp_hl);
    t[0xFA] = ins("LD A,(a16)", 16, ld_a_a16);
    t[0xFB] = ins("EI", 4, ei);
    t[0xFE] = ins("CP d8", 8, alu_d8);
    t[0xFF] = ins("RST 38H", 16, rst);

    t
}

// --- control ------------------------------------------------------------

fn nop(_: &mut Cpu, _: &mut Mmu, _: u8) {}

/// Opcodes with no defined behaviour run as a NOP.
fn illegal(cpu: &mut Cpu, _: &mut Mmu, op: u8) {
    log::debug!(
        "Illegal opcode {op:02X} at {:04X}; treated as NOP",
        cpu.regs.pc.wrapping_sub(1)
    );
}

fn halt(cpu: &mut Cpu, _: &mut Mmu, _: u8) {
    cpu.halted = true;
}

fn stop(cpu: &mut Cpu, mmu: &mut Mmu, _: u8) {
    // STOP is two bytes long and resets the divider.
    cpu.fetch8(mmu);
    mmu.write_byte(0xFF04, 0);
    cpu.stopped = true;
}

fn di(cpu: &mut Cpu, _: &mut Mmu, _: u8) {
    cpu.ime = false;
    cpu.ime_enable_delay = 0;
}

fn ei(cpu: &mut Cpu, _: &mut Mmu, _: u8) {
    if !cpu.ime && cpu.ime_enable_delay == 0 {
        cpu.ime_enable_delay = 2;
    }
}

// --- 8-bit loads --------------------------------------------------------

fn ld_r_r(cpu: &mut Cpu, mmu: &mut Mmu, op: u8) {
    let val = cpu.read_r(mmu, op);
    cpu.write_r(mmu, op >> 3, val);
}

fn ld_r_d8(cpu: &mut Cpu, mmu: &mut Mmu, op: u8) {
    let val = cpu.fetch8(mmu);
    cpu.write_r(mmu, op >> 3, val);
}

fn ld_ind_a(cpu: &mut Cpu, mmu: &mut Mmu, op: u8) {
    let addr = cpu.regs.get16(Registers::rp(op >> 4));
    mmu.write_byte(addr, cpu.regs.a);
}

fn ld_a_ind(cpu: &mut Cpu, mmu: &mut Mmu, op: u8) {
    let addr = cpu.regs.get16(Registers::rp(op >> 4));
    cpu.regs.a = mmu.read_byte(addr);
}

fn ld_hli_a(cpu: &mut Cpu, mmu: &mut Mmu, _: u8) {
    let hl = cpu.regs.get16(Reg16::HL);
    mmu.write_byte(hl, cpu.regs.a);
    cpu.regs.set16(Reg16::HL, hl.wrapping_add(1));
}

fn ld_hld_a(cpu: &mut Cpu, mmu: &mut Mmu, _: u8) {
    let hl = cpu.regs.get16(Reg16::HL);
    mmu.write_byte(hl, cpu.regs.a);
    cpu.regs.set16(Reg16::HL, hl.wrapping_sub(1));
}

fn ld_a_hli(cpu: &mut Cpu, mmu: &mut Mmu, _: u8) {
    let hl = cpu.regs.get16(Reg16::HL);
    cpu.regs.a = mmu.read_byte(hl);
    cpu.regs.set16(Reg16::HL, hl.wrapping_add(1));
}

fn ld_a_hld(cpu: &mut Cpu, mmu: &mut Mmu, _: u8) {
    let hl = cpu.regs.get16(Reg16::HL);
    cpu.regs.a = mmu.read_byte(hl);
    cpu.regs.set16(Reg16::HL, hl.wrapping_sub(1));
}

fn ldh_a8_a(cpu: &mut Cpu, mmu: &mut Mmu, _: u8) {
    let offset = cpu.fetch8(mmu);
    mmu.write_byte(0xFF00 | offset as u16, cpu.regs.a);
}

fn ldh_a_a8(cpu: &mut Cpu, mmu: &mut Mmu, _: u8) {
    let offset = cpu.fetch8(mmu);
    cpu.regs.a = mmu.read_byte(0xFF00 | offset as u16);
}

fn ld_c_a(cpu: &mut Cpu, mmu: &mut Mmu, _: u8) {
    mmu.write_byte(0xFF00 | cpu.regs.c as u16, cpu.regs.a);
}

fn ld_a_c(cpu: &mut Cpu, mmu: &mut Mmu, _: u8) {
    cpu.regs.a = mmu.read_byte(0xFF00 | cpu.regs.c as u16);
}

fn ld_a16_a(cpu: &mut Cpu, mmu: &mut Mmu, _: u8) {
    let addr = cpu.fetch16(mmu);
    mmu.write_byte(addr, cpu.regs.a);
}

fn ld_a_a16(cpu: &mut Cpu, mmu: &mut Mmu, _: u8) {
    let addr = cpu.fetch16(mmu);
    cpu.regs.a = mmu.read_byte(addr);
}

// --- 16-bit loads and stack ---------------------------------------------

fn ld_rr_d16(cpu: &mut Cpu, mmu: &mut Mmu, op: u8) {
    let val = cpu.fetch16(mmu);
    cpu.regs.set16(Registers::rp(op >> 4), val);
}

fn ld_a16_sp(cpu: &mut Cpu, mmu: &mut Mmu, _: u8) {
    let addr = cpu.fetch16(mmu);
    mmu.write_word(addr, cpu.regs.sp);
}

fn ld_sp_hl(cpu: &mut Cpu, _: &mut Mmu, _: u8) {
    cpu.regs.sp = cpu.regs.get16(Reg16::HL);
}

fn ld_hl_sp_r8(cpu: &mut Cpu, mmu: &mut Mmu, _: u8) {
    let offset = cpu.fetch8(mmu);
    let val = cpu.sp_plus_offset(offset);
    cpu.regs.set16(Reg16::HL, val);
}

fn push(cpu: &mut Cpu, mmu: &mut Mmu, op: u8) {
    let val = cpu.regs.get16(Registers::rp_stack(op >> 4));
    cpu.push_stack(mmu, val);
}

/// POP AF drops the low nibble of F through the register file.
fn pop(cpu: &mut Cpu, mmu: &mut Mmu, op: u8) {
    let val = cpu.pop_stack(mmu);
    cpu.regs.set16(Registers::rp_stack(op >> 4), val);
}

// --- 8-bit arithmetic ---------------------------------------------------

fn alu_r(cpu: &mut Cpu, mmu: &mut Mmu, op: u8) {
    let val = cpu.read_r(mmu, op);
    cpu.alu(op, val);
}

fn alu_d8(cpu: &mut Cpu, mmu: &mut Mmu, op: u8) {
    let val = cpu.fetch8(mmu);
    cpu.alu(op, val);
}

fn inc_r(cpu: &mut Cpu, mmu: &mut Mmu, op: u8) {
    let r = op >> 3;
    let val = cpu.read_r(mmu, r);
    let res = cpu.alu_inc(val);
    cpu.write_r(mmu, r, res);
}

fn dec_r(cpu: &mut Cpu, mmu: &mut Mmu, op: u8) {
    let r = op >> 3;
    let val = cpu.read_r(mmu, r);
    let res = cpu.alu_dec(val);
    cpu.write_r(mmu, r, res);
}

fn daa(cpu: &mut Cpu, _: &mut Mmu, _: u8) {
    cpu.daa();
}

fn cpl(cpu: &mut Cpu, _: &mut Mmu, _: u8) {
    cpu.regs.a = !cpu.regs.a;
    let f = cpu.regs.f();
    cpu.regs.set_f((f & (FLAG_Z | FLAG_C)) | FLAG_N | FLAG_H);
}

fn scf(cpu: &mut Cpu, _: &mut Mmu, _: u8) {
    let f = cpu.regs.f();
    cpu.regs.set_f((f & FLAG_Z) | FLAG_C);
}

fn ccf(cpu: &mut Cpu, _: &mut Mmu, _: u8) {
    let f = cpu.regs.f();
    cpu.regs.set_f((f & FLAG_Z) | ((f ^ FLAG_C) & FLAG_C));
}

// --- 16-bit arithmetic --------------------------------------------------

fn inc_rr(cpu: &mut Cpu, _: &mut Mmu, op: u8) {
    let rp = Registers::rp(op >> 4);
    let val = cpu.regs.get16(rp).wrapping_add(1);
    cpu.regs.set16(rp, val);
}

fn dec_rr(cpu: &mut Cpu, _: &mut Mmu, op: u8) {
    let rp = Registers::rp(op >> 4);
    let val = cpu.regs.get16(rp).wrapping_sub(1);
    cpu.regs.set16(rp, val);
}

fn add_hl_rr(cpu: &mut Cpu, _: &mut Mmu, op: u8) {
    let val = cpu.regs.get16(Registers::rp(op >> 4));
    cpu.alu_add_hl(val);
}

fn add_sp_r8(cpu: &mut Cpu, mmu: &mut Mmu, _: u8) {
    let offset = cpu.fetch8(mmu);
    cpu.regs.sp = cpu.sp_plus_offset(offset);
}

// --- accumulator rotates (Z always cleared) -----------------------------

fn rlca(cpu: &mut Cpu, _: &mut Mmu, _: u8) {
    let a = cpu.regs.a;
    cpu.regs.a = a.rotate_left(1);
    cpu.set_flags(false, false, false, a & 0x80 != 0);
}

fn rrca(cpu: &mut Cpu, _: &mut Mmu, _: u8) {
    let a = cpu.regs.a;
    cpu.regs.a = a.rotate_right(1);
    cpu.set_flags(false, false, false, a & 0x01 != 0);
}

fn rla(cpu: &mut Cpu, _: &mut Mmu, _: u8) {
    let a = cpu.regs.a;
    let carry = cpu.flag(FLAG_C) as u8;
    cpu.regs.a = (a << 1) | carry;
    cpu.set_flags(false, false, false, a & 0x80 != 0);
}

fn rra(cpu: &mut Cpu, _: &mut Mmu, _: u8) {
    let a = cpu.regs.a;
    let carry = cpu.flag(FLAG_C) as u8;
    cpu.regs.a = (a >> 1) | (carry << 7);
    cpu.set_flags(false, false, false, a & 0x01 != 0);
}

// --- jumps, calls, returns ----------------------------------------------

fn jr(cpu: &mut Cpu, mmu: &mut Mmu, _: u8) {
    let offset = cpu.fetch8(mmu) as i8;
    cpu.regs.pc = cpu.regs.pc.wrapping_add(offset as u16);
}

fn jr_cc(cpu: &mut Cpu, mmu: &mut Mmu, op: u8) {
    let offset = cpu.fetch8(mmu) as i8;
    if cpu.condition(op) {
        cpu.regs.pc = cpu.regs.pc.wrapping_add(offset as u16);
    }
}

fn jp(cpu: &mut Cpu, mmu: &mut Mmu, _: u8) {
    cpu.regs.pc = cpu.fetch16(mmu);
}

fn jp_cc(cpu: &mut Cpu, mmu: &mut Mmu, op: u8) {
    let addr = cpu.fetch16(mmu);
    if cpu.condition(op) {
        cpu.regs.pc = addr;
    }
}

fn jp_hl(cpu: &mut Cpu, _: &mut Mmu, _: u8) {
    cpu.regs.pc = cpu.regs.get16(Reg16::HL);
}

fn call(cpu: &mut Cpu, mmu: &mut Mmu, _: u8) {
    let addr = cpu.fetch16(mmu);
    let ret = cpu.regs.pc;
    cpu.push_stack(mmu, ret);
    cpu.regs.pc = addr;
}

fn call_cc(cpu: &mut Cpu, mmu: &mut Mmu, op: u8) {
    let addr = cpu.fetch16(mmu);
    if cpu.condition(op) {
        let ret = cpu.regs.pc;
        cpu.push_stack(mmu, ret);
        cpu.regs.pc = addr;
    }
}

fn ret(cpu: &mut Cpu, mmu: &mut Mmu, _: u8) {
    cpu.regs.pc = cpu.pop_stack(mmu);
}

fn ret_cc(cpu: &mut Cpu, mmu: &mut Mmu, op: u8) {
    if cpu.condition(op) {
        cpu.regs.pc = cpu.pop_stack(mmu);
    }
}

fn reti(cpu: &mut Cpu, mmu: &mut Mmu, _: u8) {
    cpu.regs.pc = cpu.pop_stack(mmu);
    cpu.ime = true;
    cpu.ime_enable_delay = 0;
}

fn rst(cpu: &mut Cpu, mmu: &mut Mmu, op: u8) {
    let ret = cpu.regs.pc;
    cpu.push_stack(mmu, ret);
    cpu.regs.pc = (op & 0x38) as u16;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn illegal_opcodes_are_nops() {
        for op in [
            0xD3u8, 0xDB, 0xDD, 0xE3, 0xE4, 0xEB, 0xEC, 0xED, 0xF4, 0xFC, 0xFD,
        ] {
            assert_eq!(BASE_TABLE[op as usize].mnemonic, "ILLEGAL");
            assert_eq!(BASE_TABLE[op as usize].cycles, 4);
        }
        let defined = BASE_TABLE.iter().filter(|i| i.mnemonic != "ILLEGAL").count();
        assert_eq!(defined, 256 - 11);
    }

    #[test]
    fn conditional_costs_match_taken_path() {
        assert_eq!(BASE_TABLE[0x20].cycles, BASE_TABLE[0x18].cycles);
        assert_eq!(BASE_TABLE[0xC2].cycles, BASE_TABLE[0xC3].cycles);
        assert_eq!(BASE_TABLE[0xC4].cycles, BASE_TABLE[0xCD].cycles);
        assert_eq!(BASE_TABLE[0xC0].cycles, 20);
    }

    #[test]
    fn hl_memory_operands_cost_extra() {
        for op in 0x40u8..=0x7F {
            if op == 0x76 {
                continue;
            }
            let uses_hl = op & 0x07 == 6 || (op >> 3) & 0x07 == 6;
            let expected = if uses_hl { 8 } else { 4 };
            assert_eq!(BASE_TABLE[op as usize].cycles, expected, "opcode {op:02X}");
        }
    }
}

//! CB-prefixed opcode table.
//!
//! Costs cover the whole instruction, prefix included. Handlers take the
//! operand register from bits 0-2 and the bit number from bits 3-5.

use super::ops::{Instruction, ins};
use super::{Cpu, FLAG_C};
use crate::mmu::Mmu;

pub(super) fn execute(cpu: &mut Cpu, mmu: &mut Mmu, opcode: u8) -> u32 {
    let entry = &CB_TABLE[opcode as usize];
    (entry.exec)(cpu, mmu, opcode);
    entry.cycles
}

pub(super) static CB_TABLE: [Instruction; 256] = build();

const fn build() -> [Instruction; 256] {
    let mut t = [ins("RLC B", 8, rlc); 256];

    t[0x00] = ins("RLC B", 8, rlc);
    t[0x01] = ins("RLC C", 8, rlc);
    t[0x02] = ins("RLC D", 8, rlc);
    t[0x03] = ins("RLC E", 8, rlc);
    t[0x04] = ins("RLC H", 8, rlc);
    t[0x05] = ins("RLC L", 8, rlc);
    t[0x06] = ins("RLC (HL)", 16, rlc);
    t[0x07] = ins("RLC A", 8, rlc);
    t[0x08] = ins("RRC B", 8, rrc);
    t[0x09] = ins("RRC C", 8, rrc);
    t[0x0A] = ins("RRC D", 8, rrc);
    t[0x0B] = ins("RRC E", 8, rrc);
    t[0x0C] = ins("RRC H", 8, rrc);
    t[0x0D] = ins("RRC L", 8, rrc);
    t[0x0E] = ins("RRC (HL)", 16, rrc);
    t[0x0F] = ins("RRC A", 8, rrc);

    t[0x10] = ins("RL B", 8, rl);
    t[0x11] = ins("RL C", 8, rl);
    t[0x12] = ins("RL D", 8, rl);
    t[0x13] = ins("RL E", 8, rl);
    t[0x14] = ins("RL H", 8, rl);
    t[0x15] = ins("RL L", 8, rl);
    t[0x16] = ins("RL (HL)", 16, rl);
    t[0x17] = ins("RL A", 8, rl);
    t[0x18] = ins("RR B", 8, rr);
    t[0x19] = ins("RR C", 8, rr);
    t[0x1A] = ins("RR D", 8, rr);
    t[0x1B] = ins("RR E", 8, rr);
    t[0x1C] = ins("RR H", 8, rr);
    t[0x1D] = ins("RR L", 8, rr);
    t[0x1E] = ins("RR (HL)", 16, rr);
    t[0x1F] = ins("RR A", 8, rr);

    t[0x20] = ins("SLA B", 8, sla);
    t[0x21] = ins("SLA C", 8, sla);
    t[0x22] = ins("SLA D", 8, sla);
    t[0x23] = ins("SLA E", 8, sla);
    t[0x24] = ins("SLA H", 8, sla);
    t[0x25] = ins("SLA L", 8, sla);
    t[0x26] = ins("SLA (HL)", 16, sla);
    t[0x27] = ins("SLA A", 8, sla);
    t[0x28] = ins("SRA B", 8, sra);
    t[0x29] = ins("SRA C", 8, sra);
    t[0x2A] = ins("SRA D", 8, sra);
    t[0x2B] = ins("SRA E", 8, sra);
    t[0x2C] = ins("SRA H", 8, sra);
    t[0x2D] = ins("SRA L", 8, sra);
    t[0x2E] = ins("SRA (HL)", 16, sra);
    t[0x2F] = ins("SRA A", 8, sra);

    t[0x30] = ins("SWAP B", 8, swap);
    t[0x31] = ins("SWAP C", 8, swap);
    t[0x32] = ins("SWAP D", 8, swap);
    t[0x33] = ins("SWAP E", 8, swap);
    t[0x34] = ins("SWAP H", 8, swap);
    t[0x35] = ins("SWAP L", 8, swap);
    t[0x36] = ins("SWAP (HL)", 16, swap);
    t[0x37] = ins("SWAP A", 8, swap);
    t[0x38] = ins("SRL B", 8, srl);
    t[0x39] = ins("SRL C", 8, srl);
    t[0x3A] = ins("SRL D", 8, srl);
    t[0x3B] = ins("SRL E", 8, srl);
    t[0x3C] = ins("SRL H", 8, srl);
    t[0x3D] = ins("SRL L", 8, srl);
    t[0x3E] = ins("SRL (HL)", 16, srl);
    t[0x3F] = ins("SRL A", 8, srl);

    t[0x40] = ins("BIT 0,B", 8, bit);
    t[0x41] = ins("BIT 0,C", 8, bit);
    t[0x42] = ins("BIT 0,D", 8, bit);
    t[0x43] = ins("BIT 0,E", 8, bit);
    t[0x44] = ins("BIT 0,H", 8, bit);
    t[0x45] = ins("BIT 0,L", 8, bit);
    t[0x46] = ins("BIT 0,(HL)", 12, bit);
    t[0x47] = ins("BIT 0,A", 8, bit);
    t[0x48] = ins("BIT 1,B", 8, bit);
    t[0x49] = ins("BIT 1,C", 8, bit);
    t[0x4A] = ins("BIT 1,D", 8, bit);
    t[0x4B] = ins("BIT 1,E", 8, bit);
    t[0x4C] = ins("BIT 1,H", 8, bit);
    t[0x4D] = ins("BIT 1,L", 8, bit);
    t[0x4E] = ins("BIT 1,(HL)", 12, bit);
    t[0x4F] = ins("BIT 1,A", 8, bit);

    t[0x50] = ins("BIT 2,B", 8, bit);
    t[0x51] = ins("BIT 2,C", 8, bit);
    t[0x52] = ins("BIT 2,D", 8, bit);
    t[0x53] = ins("BIT 2,E", 8, bit);
    t[0x54] = ins("BIT 2,H", 8, bit);
    t[0x55] = ins("BIT 2,L", 8, bit);
    t[0x56] = ins("BIT 2,(HL)", 12, bit);
    t[0x57] = ins("BIT 2,A", 8, bit);
    t[0x58] = ins("BIT 3,B", 8, bit);
    t[0x59] = ins("BIT 3,C", 8, bit);
    t[0x5A] = ins("BIT 3,D", 8, bit);
    t[0x5B] = ins("BIT 3,E", 8, bit);
    t[0x5C] = ins("BIT 3,H", 8, bit);
    t[0x5D] = ins("BIT 3,L", 8, bit);
    t[0x5E] = ins("BIT 3,(HL)", 12, bit);
    t[0x5F] = ins("BIT 3,A", 8, bit);

    t[0x60] = ins("BIT 4,B", 8, bit);
    t[0x61] = ins("BIT 4,C", 8, bit);
    t[0x62] = ins("BIT 4,D", 8, bit);
    t[0x63] = ins("BIT 4,E", 8, bit);
    t[0x64] = ins("BIT 4,H", 8, bit);
    t[0x65] = ins("BIT 4,L", 8, bit);
    t[0x66] = ins("BIT 4,(HL)", 12, bit);
    t[0x67] = ins("BIT 4,A", 8, bit);
    t[0x68] = ins("BIT 5,B", 8, bit);
    t[0x69] = ins("BIT 5,C", 8, bit);
    t[0x6A] = ins("BIT 5,D", 8, bit);
    t[0x6B] = ins("BIT 5,E", 8, bit);
    t[0x6C] = ins("BIT 5,H", 8, bit);
    t[0x6D] = ins("BIT 5,L", 8, bit);
    t[0x6E] = ins("BIT 5,(HL)", 12, bit);
    t[0x6F] = ins("BIT 5,A", 8, bit);

    t[0x70] = ins("BIT 6,B", 8, bit);
    t[0x71] = ins("BIT 6,C", 8, bit);
    t[0x72] = ins("BIT 6,D", 8, bit);
    t[0x73] = ins("BIT 6,E", 8, bit);
    t[0x74] = ins("BIT 6,H", 8, bit);
    t[0x75] = ins("BIT 6,L", 8, bit);
    t[0x76] = ins("BIT 6,(HL)", 12, bit);
    t[0x77] = ins("BIT 6,A", 8, bit);
    t[0x78] = ins("BIT 7,B", 8, bit);
    t[0x79] = ins("BIT 7,C", 8, bit);
    t[0x7A] = ins("BIT 7,D", 8, bit);
    t[0x7B] = ins("BIT 7,E", 8, bit);
    t[0x7C] = ins("BIT 7,H", 8, bit);
    t[0x7D] = ins("BIT 7,L", 8, bit);
    t[0x7E] = ins("BIT 7,(HL)", 12, bit);
    t[0x7F] = ins("BIT 7,A", 8, bit);

    t[0x80] = ins("RES 0,B", 8, res);
    t[0x81] = ins("RES 0,C", 8, res);
    t[0x82] = ins("RES 0,D", 8, res);
    t[0x83] = ins("RES 0,E", 8, res);
    t[0x84] = ins("RES 0,H", 8, res);
    t[0x85] = ins("RES 0,L", 8, res);
    t[0x86] = ins("RES 0,(HL)", 16, res);
    t[0x87] = ins("RES 0,A", 8, res);
    t[0x88] = ins("RES 1,B", 8, res);
    t[0x89] = ins("RES 1,C", 8, res);
    t[0x8A] = ins("RES 1,D", 8, res);
    t[0x8B] = ins("RES 1,E", 8, res);
    t[0x8C] = ins("RES 1,H", 8, res);
    t[0x8D] = ins("RES 1,L", 8, res);
    t[0x8E] = ins("RES 1,(HL)", 16, res);
    t[0x8F] = ins("RES 1,A", 8, res);

    t[0x90] = ins("RES 2,B", 8, res);
    t[0x91] = ins("RES 2,C", 8, res);
    t[0x92] = ins("RES 2,D", 8, res);
    t[0x93] = ins("RES 2,E", 8, res);
    t[0x94] = ins("RES 2,H", 8, res);
    t[0x95] = ins("RES 2,L", 8, res);
    t[0x96] = ins("RES 2,(HL)", 16, res);
    t[0x97] = ins("RES 2,A", 8, res);
    t[0x98] = ins("RES 3,B", 8, res);
    t[0x99] = ins("RES 3,C", 8, res);
    t[0x9A] = ins("RES 3,D", 8, res);
    t[0x9B] = ins("RES 3,E", 8, res);
    t[0x9C] = ins("RES 3,H", 8, res);
    t[0x9D] = ins("RES 3,L", 8, res);
    t[0x9E] = ins("RES 3,(HL)", 16, res);
    t[0x9F] = ins("RES 3,A", 8, res);

    t[0xA0] = ins("RES 4,B", 8, res);
    t[0xA1] = ins("RES 4,C", 8, res);
    t[0xA2] = ins("RES 4,D", 8, res);
    t[0xA3] = ins("RES 4,E", 8, res);
    t[0xA4] = ins("RES 4,H", 8, res);
    t[0xA5] = ins("RES 4,L", 8, res);
    t[0xA6] = ins("RES 4,(HL)", 16, res);
    t[0xA7] = ins("RES 4,A", 8, res);
    t[0xA8] = ins("RES 5,B", 8, res);
    t[0xA9] = ins("RES 5,C", 8, res);
    t[0xAA] = ins("RES 5,D", 8, res);
    t[0xAB] = ins("RES 5,E", 8, res);
    t[0xAC] = ins("RES 5,H", 8, res);
    t[0xAD] = ins("RES 5,L", 8, res);
    t[0xAE] = ins("RES 5,(HL)", 16, res);
    t[0xAF] = ins("RES 5,A", 8, res);

    t[0xB0] = ins("RES 6,B", 8, res);
    t[0xB1] = ins("RES 6,C", 8, res);
    t[0xB2] = ins("RES 6,D", 8, res);
    t[0xB3] = ins("RES 6,E", 8, res);
    t[0xB4] = ins("RES 6,H", 8, res);
    t[0xB5] = ins("RES 6,L", 8, res);
    t[0xB6] = ins("RES 6,(HL)", 16, res);
    t[0xB7] = ins("RES 6,A", 8, res);
    t[0xB8] = ins("RES 7,B", 8, res);
    t[0xB9] = ins("RES 7,C", 8, res);
    t[0xBA] = ins("RES 7,D", 8, res);
    t[0xBB] = ins("RES 7,E", 8, res);
    t[0xBC] = ins("RES 7,H", 8, res);
    t[0xBD] = ins("RES 7,L", 8, res);
    t[0xBE] = ins("RES 7,(HL)", 16, res);
    t[0xBF] = ins("RES 7,A", 8, res);

    t[0xC0] = ins("SET 0,B", 8, set);
    t[0xC1] = ins("SET 0,C", 8, set);
    t[0xC2] = ins("SET 0,D", 8, set);
    t[0xC3] = ins("SET 0,E", 8, set);
    t[0xC4] = ins("SET 0,H", 8, set);
    t[0xC5] = ins("SET 0,L", 8, set);
    t[0xC6] = ins("SET 0,(HL)", 16, set);
    t[0xC7] = ins("SET 0,A", 8, set);
    t[0xC8] = ins("SET 1,B", 8, set);
    t[0xC9] = ins("SET 1,C", 8, set);
    t[0xCA] = ins("SET 1,D", 8, set);
    t[0xCB] = ins("SET 1,E", 8, set);
    t[0xCC] = ins("SET 1,H", 8, set);
    t[0xCD] = ins("SET 1,L", 8, set);
    t[0xCE] = ins("SET 1,(HL)", 16, set);
    t[0xCF] = ins("SET 1,A", 8, set);

    t[0xD0] = ins("SET 2,B", 8, set);
    t[0xD1] = ins("SET 2,C", 8, set);
    t[0xD2] = ins("SET 2,D", 8, set);
    t[0xD3] = ins("SET 2,E", 8, set);
    t[0xD4] = ins("SET 2,H", 8, set);
    t[0xD5] = ins("SET 2,L", 8, set);
    t[0xD6] = ins("SET 2,(HL)", 16, set);
    t[0xD7] = ins("SET 2,A", 8, set);
    t[0xD8] = ins("SET 3,B", 8, set);
    t[0xD9] = ins("SET 3,C", 8, set);
    t[0xDA] = ins("SET 3,D", 8, set);
    t[0xDB] = ins("SET 3,E", 8, set);
    t[0xDC] = ins("SET 3,H", 8, set);
    t[0xDD] = ins("SET 3,L", 8, set);
    t[0xDE] = ins("SET 3,(HL)", 16, set);
    t[0xDF] = ins("SET 3,A", 8, set);

    t[0xE0] = ins("SET 4,B", 8, set);
    t[0xE1] = ins("SET 4,C", 8, set);
    t[0xE2] = ins("SET 4,D", 8, set);
    t[0xE3] = ins("SET 4,E", 8, set);
    t[0xE4] = ins("SET 4,H", 8, set);
    t[0xE5] = ins("SET 4,L", 8, set);
    t[0xE6] = ins("SET 4,(HL)", 16, set);
    t[0xE7] = ins("SET 4,A", 8, set);
    t[0xE8] = ins("SET 5,B", 8, set);
    t[0xE9] = ins("SET 5,C", 8, set);
    t[0xEA] = ins("SET 5,D", 8, set);
    t[0xEB] = ins("SET 5,E", 8, set);
    t[0xEC] = ins("SET 5,H", 8, set);
    t[0xED] = ins("SET 5,L", 8, set);
    t[0xEE] = ins("SET 5,(HL)", 16, set);
    t[0xEF] = ins("SET 5,A", 8, set);

    t[0xF0] = ins("SET 6,B", 8, set);
    t[0xF1] = ins("SET 6,C", 8, set);
    t[0xF2] = ins("SET 6,D", 8, set);
    t[0xF3] = ins("SET 6,E", 8, set);
    t[0xF4] = ins("SET 6,H", 8, set);
    t[0xF5] = ins("SET 6,L", 8, set);
    t[0xF6] = ins("SET 6,(HL)", 16, set);
    t[0xF7] = ins("SET 6,A", 8, set);
    t[0xF8] = ins("SET 7,B", 8, set);
    t[0xF9] = ins("SET 7,C", 8, set);
    t[0xFA] = ins("SET 7,D", 8, set);
    t[0xFB] = ins("SET 7,E", 8, set);
    t[0xFC] = ins("SET 7,H", 8, set);
    t[0xFD] = ins("SET 7,L", 8, set);
    t[0xFE] = ins("SET 7,(HL)", 16, set);
    t[0xFF] = ins("SET 7,A", 8, set);

    t
}

/// Read-modify-write of the operand through `f`, which gets the old carry
/// and returns the result with the new carry.
#[inline(always)]
fn shift(cpu: &mut Cpu, mmu: &mut Mmu, op: u8, f: fn(u8, u8) -> (u8, bool)) {
    let r = op & 0x07;
    let val = cpu.read_r(mmu, r);
    let (res, carry) = f(val, cpu.flag(FLAG_C) as u8);
    cpu.set_flags(res == 0, false, false, carry);
    cpu.write_r(mmu, r, res);
}

fn rlc(cpu: &mut Cpu, mmu: &mut Mmu, op: u8) {
    shift(cpu, mmu, op, |v, _| (v.rotate_left(1), v & 0x80 != 0));
}

fn rrc(cpu: &mut Cpu, mmu: &mut Mmu, op: u8) {
    shift(cpu, mmu, op, |v, _| (v.rotate_right(1), v & 0x01 != 0));
}

fn rl(cpu: &mut Cpu, mmu: &mut Mmu, op: u8) {
    shift(cpu, mmu, op, |v, c| ((v << 1) | c, v & 0x80 != 0));
}

fn rr(cpu: &mut Cpu, mmu: &mut Mmu, op: u8) {
    shift(cpu, mmu, op, |v, c| ((v >> 1) | (c << 7), v & 0x01 != 0));
}

fn sla(cpu: &mut Cpu, mmu: &mut Mmu, op: u8) {
    shift(cpu, mmu, op, |v, _| (v << 1, v & 0x80 != 0));
}

fn sra(cpu: &mut Cpu, mmu: &mut Mmu, op: u8) {
    shift(cpu, mmu, op, |v, _| ((v >> 1) | (v & 0x80), v & 0x01 != 0));
}

fn swap(cpu: &mut Cpu, mmu: &mut Mmu, op: u8) {
    shift(cpu, mmu, op, |v, _| (v.rotate_left(4), false));
}

fn srl(cpu: &mut Cpu, mmu: &mut Mmu, op: u8) {
    shift(cpu, mmu, op, |v, _| (v >> 1, v & 0x01 != 0));
}

#[inline(always)]
fn bit_index(op: u8) -> u8 {
    (op >> 3) & 0x07
}

fn bit(cpu: &mut Cpu, mmu: &mut Mmu, op: u8) {
    let val = cpu.read_r(mmu, op & 0x07);
    let c = cpu.flag(FLAG_C);
    cpu.set_flags(val & (1 << bit_index(op)) == 0, false, true, c);
}

fn res(cpu: &mut Cpu, mmu: &mut Mmu, op: u8) {
    let r = op & 0x07;
    let val = cpu.read_r(mmu, r);
    cpu.write_r(mmu, r, val & !(1 << bit_index(op)));
}

fn set(cpu: &mut Cpu, mmu: &mut Mmu, op: u8) {
    let r = op & 0x07;
    let val = cpu.read_r(mmu, r);
    cpu.write_r(mmu, r, val | (1 << bit_index(op)));
}

mod common;

use common::{cpu_in_wram, run_steps};
use dmg_emu_core::cpu::{Cpu, FLAG_C, FLAG_H, FLAG_N, FLAG_Z, Reg8, Reg16};

#[test]
fn f_low_nibble_reads_zero() {
    let mut cpu = Cpu::new();
    for v in 0..=0xFFu8 {
        cpu.set_register(Reg8::F, v);
        assert_eq!(cpu.register(Reg8::F) & 0x0F, 0);
    }
    for reg in [Reg8::A, Reg8::B, Reg8::C, Reg8::D, Reg8::E, Reg8::H, Reg8::L] {
        cpu.set_register(reg, 0x5B);
        assert_eq!(cpu.register(reg), 0x5B);
    }
}

#[test]
fn pop_af_masks_flags() {
    // LD BC,0x12FF; PUSH BC; POP AF
    let (mut cpu, mut mmu) = cpu_in_wram(&[0x01, 0xFF, 0x12, 0xC5, 0xF1]);
    run_steps(&mut cpu, &mut mmu, 3);
    assert_eq!(cpu.register16(Reg16::AF), 0x12F0);
}

#[test]
fn add_a_a_with_ff() {
    // LD A,0xFF; ADD A,A
    let (mut cpu, mut mmu) = cpu_in_wram(&[0x3E, 0xFF, 0x87]);
    run_steps(&mut cpu, &mut mmu, 2);
    assert_eq!(cpu.register(Reg8::A), 0xFE);
    assert!(!cpu.flag(FLAG_Z));
    assert!(!cpu.flag(FLAG_N));
    assert!(cpu.flag(FLAG_H));
    assert!(cpu.flag(FLAG_C));
}

#[test]
fn loads_leave_flags_alone() {
    // LD B,0; LD C,B; LD (HL),C; LD A,(HL); LD HL,0xC100; LD SP,HL
    let (mut cpu, mut mmu) = cpu_in_wram(&[0x06, 0x00, 0x48, 0x71, 0x7E, 0x21, 0x00, 0xC1, 0xF9]);
    cpu.set_register16(Reg16::HL, 0xC080);
    cpu.set_register(Reg8::F, 0xF0);
    run_steps(&mut cpu, &mut mmu, 6);
    assert_eq!(cpu.register(Reg8::F), 0xF0);
    assert_eq!(cpu.sp(), 0xC100);
}

#[test]
fn xor_a_clears_everything_but_zero() {
    let (mut cpu, mut mmu) = cpu_in_wram(&[0xAF]);
    cpu.set_register(Reg8::A, 0x3C);
    cpu.set_register(Reg8::F, FLAG_N | FLAG_H | FLAG_C);
    cpu.step(&mut mmu);
    assert_eq!(cpu.register(Reg8::A), 0);
    assert_eq!(cpu.register(Reg8::F), FLAG_Z);
}

#[test]
fn inc_dec_preserve_carry() {
    // SCF; LD A,0x0F; INC A; DEC A
    let (mut cpu, mut mmu) = cpu_in_wram(&[0x37, 0x3E, 0x0F, 0x3C, 0x3D]);
    run_steps(&mut cpu, &mut mmu, 3);
    assert_eq!(cpu.register(Reg8::A), 0x10);
    assert!(cpu.flag(FLAG_H | FLAG_C));
    assert!(!cpu.flag(FLAG_N));
    cpu.step(&mut mmu);
    assert_eq!(cpu.register(Reg8::A), 0x0F);
    assert!(cpu.flag(FLAG_N | FLAG_H | FLAG_C));
}

#[test]
fn conditional_branches_cost_the_same_either_way() {
    // XOR A (Z=1); JR NZ,+0 (not taken); JR Z,+0 (taken)
    let (mut cpu, mut mmu) = cpu_in_wram(&[0xAF, 0x20, 0x00, 0x28, 0x00]);
    cpu.step(&mut mmu);
    let not_taken = cpu.step(&mut mmu);
    let taken = cpu.step(&mut mmu);
    assert_eq!(not_taken, taken);
    assert_eq!(cpu.pc(), 0xC005);
}

#[test]
fn call_and_ret_use_the_stack() {
    // CALL 0xC010 ... at C010: RET
    let mut program = vec![0u8; 0x11];
    program[..3].copy_from_slice(&[0xCD, 0x10, 0xC0]);
    program[0x10] = 0xC9;
    let (mut cpu, mut mmu) = cpu_in_wram(&program);
    assert_eq!(cpu.step(&mut mmu), 24);
    assert_eq!(cpu.pc(), 0xC010);
    assert_eq!(cpu.sp(), 0xDFFC);
    assert_eq!(mmu.read_word(0xDFFC), 0xC003);
    assert_eq!(cpu.step(&mut mmu), 16);
    assert_eq!(cpu.pc(), 0xC003);
    assert_eq!(cpu.sp(), 0xDFFE);
}

#[test]
fn rst_jumps_to_fixed_vector() {
    let (mut cpu, mut mmu) = cpu_in_wram(&[0xEF]);
    cpu.step(&mut mmu);
    assert_eq!(cpu.pc(), 0x0028);
    assert_eq!(mmu.read_word(cpu.sp()), 0xC001);
}

#[test]
fn cb_prefixed_costs_include_prefix() {
    // SWAP A; BIT 7,(HL); SET 0,(HL)
    let (mut cpu, mut mmu) = cpu_in_wram(&[0xCB, 0x37, 0xCB, 0x7E, 0xCB, 0xC6]);
    cpu.set_register16(Reg16::HL, 0xC100);
    assert_eq!(cpu.step(&mut mmu), 8);
    assert_eq!(cpu.step(&mut mmu), 12);
    assert_eq!(cpu.step(&mut mmu), 16);
    assert_eq!(mmu.read_byte(0xC100), 0x01);
}

#[test]
fn cb_table_entries_describe_the_instruction() {
    let swap = Cpu::cb_instruction(0x37);
    assert_eq!(swap.mnemonic, "SWAP A");
    assert_eq!(swap.cycles, 8);
    assert_eq!(Cpu::cb_instruction(0x46).cycles, 12);
    assert_eq!(Cpu::cb_instruction(0xC6).mnemonic, "SET 0,(HL)");
    assert_eq!(Cpu::cb_instruction(0xC6).cycles, 16);
}

#[test]
fn illegal_opcode_is_a_nop() {
    let (mut cpu, mut mmu) = cpu_in_wram(&[0xD3, 0xDD]);
    cpu.set_register(Reg8::A, 0x42);
    cpu.set_register(Reg8::F, 0xA0);
    assert_eq!(cpu.step(&mut mmu), 4);
    assert_eq!(cpu.step(&mut mmu), 4);
    assert_eq!(cpu.pc(), 0xC002);
    assert_eq!(cpu.register(Reg8::A), 0x42);
    assert_eq!(cpu.register(Reg8::F), 0xA0);
    assert_eq!(Cpu::instruction(0xD3).mnemonic, "ILLEGAL");
}

#[test]
fn ld_hl_sp_offset_and_add_sp() {
    // LD HL,SP+2; ADD SP,-2
    let (mut cpu, mut mmu) = cpu_in_wram(&[0xF8, 0x02, 0xE8, 0xFE]);
    cpu.set_register16(Reg16::SP, 0xFFF8);
    assert_eq!(cpu.step(&mut mmu), 12);
    assert_eq!(cpu.register16(Reg16::HL), 0xFFFA);
    assert!(!cpu.flag(FLAG_Z));
    assert_eq!(cpu.step(&mut mmu), 16);
    assert_eq!(cpu.sp(), 0xFFF6);
}

#[test]
fn cycle_counter_accumulates() {
    let (mut cpu, mut mmu) = cpu_in_wram(&[0x00, 0x01, 0x00, 0x00, 0xC5]);
    let total = run_steps(&mut cpu, &mut mmu, 3);
    assert_eq!(total, 4 + 12 + 16);
    assert_eq!(cpu.cycles(), total as u64);
}

#[test]
fn post_boot_registers() {
    let cpu = Cpu::post_boot();
    assert_eq!(cpu.register16(Reg16::AF), 0x01B0);
    assert_eq!(cpu.register16(Reg16::BC), 0x0013);
    assert_eq!(cpu.register16(Reg16::DE), 0x00D8);
    assert_eq!(cpu.register16(Reg16::HL), 0x014D);
    assert_eq!(cpu.sp(), 0xFFFE);
    assert_eq!(cpu.pc(), 0x0100);
    assert!(!cpu.ime());
}

mod common;

use common::cpu_in_wram;
use dmg_emu_core::interrupts::{self, DISPATCH_CYCLES, Interrupt};

#[test]
fn vectors_follow_bit_order() {
    let vectors: Vec<u16> = Interrupt::ALL.iter().map(|i| i.vector()).collect();
    assert_eq!(vectors, [0x40, 0x48, 0x50, 0x58, 0x60]);
}

#[test]
fn dispatch_takes_highest_priority_and_clears_ime() {
    let (mut cpu, mut mmu) = cpu_in_wram(&[0x00]);
    cpu.set_ime(true);
    mmu.write_byte(0xFFFF, 0x1F);
    mmu.interrupts.request(Interrupt::Joypad);
    mmu.interrupts.request(Interrupt::Timer);

    assert_eq!(interrupts::service(&mut cpu, &mut mmu), DISPATCH_CYCLES);
    assert_eq!(cpu.pc(), 0x0050);
    assert!(!cpu.ime());
    assert_eq!(mmu.read_word(cpu.sp()), 0xC000);
    assert_eq!(mmu.read_byte(0xFF0F), 0xE0 | 0x10);

    // IME is now clear, so the joypad request waits.
    assert_eq!(interrupts::service(&mut cpu, &mut mmu), 0);
    assert_eq!(cpu.pc(), 0x0050);
}

#[test]
fn nothing_dispatches_when_masked() {
    let (mut cpu, mut mmu) = cpu_in_wram(&[0x00]);
    cpu.set_ime(true);
    mmu.write_byte(0xFFFF, 0x01);
    mmu.interrupts.request(Interrupt::Serial);
    assert_eq!(interrupts::service(&mut cpu, &mut mmu), 0);
    assert_eq!(cpu.pc(), 0xC000);
    assert!(cpu.ime());
}

#[test]
fn halt_wakes_without_ime_and_resumes_after_halt() {
    // HALT; INC A
    let (mut cpu, mut mmu) = cpu_in_wram(&[0x76, 0x3C]);
    cpu.step(&mut mmu);
    assert!(cpu.halted());
    interrupts::service(&mut cpu, &mut mmu);
    assert!(cpu.halted());

    mmu.interrupts.request(Interrupt::Timer);
    assert_eq!(interrupts::service(&mut cpu, &mut mmu), 0);
    assert!(!cpu.halted());
    cpu.step(&mut mmu);
    assert_eq!(cpu.register(dmg_emu_core::cpu::Reg8::A), 1);
}

#[test]
fn reti_restores_ime_immediately() {
    // RETI at 0xC000 returning to 0xC010
    let (mut cpu, mut mmu) = cpu_in_wram(&[0xD9]);
    mmu.write_word(0xDFFC, 0xC010);
    cpu.set_register16(dmg_emu_core::cpu::Reg16::SP, 0xDFFC);
    cpu.step(&mut mmu);
    assert!(cpu.ime());
    assert_eq!(cpu.pc(), 0xC010);
}

#[test]
fn ei_delays_dispatch_by_one_instruction() {
    // EI; INC A; INC A
    let (mut cpu, mut mmu) = cpu_in_wram(&[0xFB, 0x3C, 0x3C]);
    mmu.write_byte(0xFFFF, 0x04);
    mmu.interrupts.request(Interrupt::Timer);

    cpu.step(&mut mmu);
    assert_eq!(interrupts::service(&mut cpu, &mut mmu), 0);
    cpu.step(&mut mmu);
    assert_eq!(interrupts::service(&mut cpu, &mut mmu), DISPATCH_CYCLES);
    assert_eq!(cpu.pc(), 0x0050);
    assert_eq!(mmu.read_word(cpu.sp()), 0xC002);
}

#[test]
fn joypad_press_ends_stop() {
    // STOP 0
    let (mut cpu, mut mmu) = cpu_in_wram(&[0x10, 0x00]);
    cpu.step(&mut mmu);
    assert!(cpu.stopped());
    assert_eq!(cpu.pc(), 0xC002);
    interrupts::service(&mut cpu, &mut mmu);
    assert!(cpu.stopped());

    mmu.input.press(dmg_emu_core::input::Button::A, &mut mmu.interrupts);
    interrupts::service(&mut cpu, &mut mmu);
    assert!(!cpu.stopped());
}

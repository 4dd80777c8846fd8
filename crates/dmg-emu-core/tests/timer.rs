use dmg_emu_core::{
    interrupts::{Interrupt, InterruptController},
    mmu::Mmu,
    timer::Timer,
};

#[test]
fn tima_overflow_reloads_and_interrupts() {
    let mut timer = Timer::new();
    let mut ic = InterruptController::new();
    timer.write(0xFF06, 0xAB);
    timer.write(0xFF05, 0xFF);
    timer.write(0xFF07, 0x04); // enabled, 1024-cycle rate
    timer.step(1023, &mut ic);
    assert_eq!(timer.tima, 0xFF);
    assert!(!ic.is_requested(Interrupt::Timer));
    timer.step(1, &mut ic);
    assert_eq!(timer.tima, 0xAB);
    assert!(ic.is_requested(Interrupt::Timer));
}

#[test]
fn overflow_through_the_bus_sets_if_bit_two() {
    let mut mmu = Mmu::new();
    mmu.write_byte(0xFF06, 0x10);
    mmu.write_byte(0xFF05, 0xFF);
    mmu.write_byte(0xFF07, 0x04);
    mmu.step(1024);
    assert_eq!(mmu.read_byte(0xFF05), 0x10);
    assert_eq!(mmu.read_byte(0xFF0F) & 0x04, 0x04);
}

#[test]
fn any_div_write_resets_it() {
    let mut timer = Timer::new();
    let mut ic = InterruptController::new();
    timer.step(256 * 5 + 100, &mut ic);
    assert_eq!(timer.read(0xFF04), 5);
    timer.write(0xFF04, 0x77);
    assert_eq!(timer.read(0xFF04), 0);
    // The sub-counter restarted too.
    timer.step(255, &mut ic);
    assert_eq!(timer.read(0xFF04), 0);
    timer.step(1, &mut ic);
    assert_eq!(timer.read(0xFF04), 1);
}

#[test]
fn disabling_keeps_tima_and_tma() {
    let mut timer = Timer::new();
    let mut ic = InterruptController::new();
    timer.write(0xFF06, 0x42);
    timer.write(0xFF07, 0x05); // 16-cycle rate
    timer.step(40, &mut ic);
    assert_eq!(timer.tima, 2);
    timer.write(0xFF07, 0x01);
    timer.step(1000, &mut ic);
    assert_eq!(timer.tima, 2);
    assert_eq!(timer.tma, 0x42);

    // Re-enabling starts a fresh period.
    timer.write(0xFF07, 0x05);
    timer.step(15, &mut ic);
    assert_eq!(timer.tima, 2);
    timer.step(1, &mut ic);
    assert_eq!(timer.tima, 3);
}

#[test]
fn tac_reads_unused_bits_high() {
    let mut timer = Timer::new();
    timer.write(0xFF07, 0xFF);
    assert_eq!(timer.read(0xFF07), 0xFF);
    timer.write(0xFF07, 0x00);
    assert_eq!(timer.read(0xFF07), 0xF8);
}

use dmg_emu_core::{
    interrupts::{Interrupt, InterruptController},
    mmu::Mmu,
    ppu::{FRAME_CYCLES, LINE_CYCLES, LcdMode, Ppu, SCREEN_HEIGHT},
};

fn lit_ppu() -> (Ppu, InterruptController) {
    let mut ppu = Ppu::new();
    let mut ic = InterruptController::new();
    ppu.write_reg(0xFF40, 0x91, &mut ic);
    (ppu, ic)
}

#[test]
fn one_line_is_456_cycles() {
    let (mut ppu, mut ic) = lit_ppu();
    assert_eq!(ppu.mode(), LcdMode::OamScan);
    ppu.step(80, &mut ic);
    assert_eq!(ppu.mode(), LcdMode::Transfer);
    ppu.step(172, &mut ic);
    assert_eq!(ppu.mode(), LcdMode::HBlank);
    assert_eq!(ppu.ly(), 0);
    ppu.step(204, &mut ic);
    assert_eq!(ppu.ly(), 1);
    assert_eq!(ppu.mode(), LcdMode::OamScan);
    assert_eq!(LINE_CYCLES, 456);
}

#[test]
fn stat_mode_bits_track_the_mode() {
    let (mut ppu, mut ic) = lit_ppu();
    for (cycles, mode) in [(0, 2u8), (80, 3), (172, 0), (204, 2)] {
        ppu.step(cycles, &mut ic);
        assert_eq!(ppu.read_reg(0xFF41) & 0x03, mode);
    }
}

#[test]
fn vblank_at_line_144() {
    let (mut ppu, mut ic) = lit_ppu();
    ppu.step(LINE_CYCLES * SCREEN_HEIGHT as u32 - 1, &mut ic);
    assert!(!ppu.frame_ready());
    assert!(!ic.is_requested(Interrupt::VBlank));
    ppu.step(1, &mut ic);
    assert_eq!(ppu.ly(), 144);
    assert_eq!(ppu.mode(), LcdMode::VBlank);
    assert!(ppu.frame_ready());
    assert!(ic.is_requested(Interrupt::VBlank));
    assert!(ppu.take_frame_ready());
    assert!(!ppu.frame_ready());
}

#[test]
fn ly_never_passes_153() {
    let (mut ppu, mut ic) = lit_ppu();
    for _ in 0..(FRAME_CYCLES * 2 / 4) {
        ppu.step(4, &mut ic);
        assert!(ppu.ly() <= 153);
    }
    assert_eq!(ppu.frames(), 2);
}

#[test]
fn vblank_stat_source_fires_on_entry() {
    let (mut ppu, mut ic) = lit_ppu();
    ppu.write_reg(0xFF41, 0x10, &mut ic);
    ppu.step(LINE_CYCLES * 144, &mut ic);
    assert!(ic.is_requested(Interrupt::LcdStat));
}

#[test]
fn bus_locks_during_transfer() {
    let mut mmu = Mmu::new();
    mmu.write_byte(0x8000, 0x11);
    mmu.write_byte(0xFE00, 0x22);
    mmu.write_byte(0xFF40, 0x91);

    // OAM scan: VRAM open, OAM locked.
    assert_eq!(mmu.read_byte(0x8000), 0x11);
    assert_eq!(mmu.read_byte(0xFE00), 0xFF);
    mmu.write_byte(0xFE00, 0x33);

    mmu.step(80);
    assert_eq!(mmu.ppu.mode(), LcdMode::Transfer);
    mmu.write_byte(0x8000, 0x44);
    assert_eq!(mmu.read_byte(0x8000), 0xFF);

    mmu.step(172);
    assert_eq!(mmu.read_byte(0x8000), 0x11);
    assert_eq!(mmu.read_byte(0xFE00), 0x22);
}

#[test]
fn disabling_lcd_resets_ly_and_mode() {
    let mut mmu = Mmu::new();
    mmu.write_byte(0xFF40, 0x91);
    mmu.step(LINE_CYCLES * 3 + 10);
    assert_eq!(mmu.read_byte(0xFF44), 3);
    mmu.write_byte(0xFF40, 0x11);
    assert_eq!(mmu.read_byte(0xFF44), 0);
    assert_eq!(mmu.read_byte(0xFF41) & 0x03, 0);
    // LY is read-only.
    mmu.write_byte(0xFF44, 0x50);
    assert_eq!(mmu.read_byte(0xFF44), 0);
}

#[test]
fn hblank_stat_source_fires_on_entry() {
    let (mut ppu, mut ic) = lit_ppu();
    ppu.write_reg(0xFF41, 0x08, &mut ic);
    ppu.step(80 + 171, &mut ic);
    assert!(!ic.is_requested(Interrupt::LcdStat));
    ppu.step(1, &mut ic);
    assert_eq!(ppu.mode(), LcdMode::HBlank);
    assert!(ic.is_requested(Interrupt::LcdStat));

    // Once per line: acknowledged, it stays quiet until the next HBlank.
    ic.acknowledge(Interrupt::LcdStat);
    ppu.step(204 + 80 + 171, &mut ic);
    assert!(!ic.is_requested(Interrupt::LcdStat));
    ppu.step(1, &mut ic);
    assert!(ic.is_requested(Interrupt::LcdStat));
    assert_eq!(ppu.ly(), 1);
}

#[test]
fn cpu_writes_respect_mode_locks() {
    let mut mmu = Mmu::new();
    mmu.write_byte(0xFF40, 0x91);

    // Mode 2: VRAM writable, OAM not.
    mmu.write_byte(0x8010, 0xAA);
    mmu.write_byte(0xFE10, 0xAA);
    assert_eq!(mmu.ppu.vram[0x10], 0xAA);
    assert_eq!(mmu.ppu.oam[0x10], 0x00);

    // Mode 3: neither.
    mmu.step(80);
    assert_eq!(mmu.ppu.mode(), LcdMode::Transfer);
    mmu.write_byte(0x8010, 0xBB);
    mmu.write_byte(0xFE10, 0xBB);
    assert_eq!(mmu.ppu.vram[0x10], 0xAA);
    assert_eq!(mmu.ppu.oam[0x10], 0x00);

    // Mode 0: both.
    mmu.step(172);
    assert_eq!(mmu.ppu.mode(), LcdMode::HBlank);
    mmu.write_byte(0x8010, 0xCC);
    mmu.write_byte(0xFE10, 0xCC);
    assert_eq!(mmu.ppu.vram[0x10], 0xCC);
    assert_eq!(mmu.ppu.oam[0x10], 0xCC);
}

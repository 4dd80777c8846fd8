#![allow(dead_code)]

use dmg_emu_core::{EmulatorConfig, GameBoy, cpu::Cpu, mmu::Mmu};

/// Builds cartridge images for the integration tests.
pub struct RomBuilder {
    rom: Vec<u8>,
}

impl RomBuilder {
    /// A 32 KiB ROM-only image.
    pub fn new() -> Self {
        Self::with_banks(2)
    }

    pub fn with_banks(banks: usize) -> Self {
        let mut rom = vec![0u8; banks * 0x4000];
        // Tag the first byte of every bank with its number.
        for bank in 1..banks {
            rom[bank * 0x4000] = bank as u8;
        }
        let size_code = (banks / 2).trailing_zeros() as u8;
        rom[0x0148] = size_code;
        Self { rom }
    }

    pub fn title(mut self, title: &str) -> Self {
        let bytes = title.as_bytes();
        self.rom[0x0134..0x0134 + bytes.len()].copy_from_slice(bytes);
        self
    }

    pub fn cart_type(mut self, code: u8) -> Self {
        self.rom[0x0147] = code;
        self
    }

    pub fn ram_size(mut self, code: u8) -> Self {
        self.rom[0x0149] = code;
        self
    }

    /// Place `code` at the entry point 0x0100.
    pub fn program(self, code: &[u8]) -> Self {
        self.code_at(0x0100, code)
    }

    pub fn code_at(mut self, addr: usize, code: &[u8]) -> Self {
        self.rom[addr..addr + code.len()].copy_from_slice(code);
        self
    }

    pub fn build(self) -> Vec<u8> {
        self.rom
    }
}

/// A muted machine with `rom` loaded and reset.
pub fn machine(rom: Vec<u8>) -> GameBoy {
    let mut gb = GameBoy::new(EmulatorConfig::muted());
    gb.load_rom(rom).unwrap();
    gb
}

/// A CPU at 0xC000 running `program` from work RAM, with a cartridge-less
/// memory map.
pub fn cpu_in_wram(program: &[u8]) -> (Cpu, Mmu) {
    let mut mmu = Mmu::new();
    for (i, b) in program.iter().enumerate() {
        mmu.write_byte(0xC000 + i as u16, *b);
    }
    let mut cpu = Cpu::new();
    cpu.set_register16(dmg_emu_core::cpu::Reg16::PC, 0xC000);
    cpu.set_register16(dmg_emu_core::cpu::Reg16::SP, 0xDFFE);
    (cpu, mmu)
}

/// Step `cpu` `n` times, returning the total cycles.
pub fn run_steps(cpu: &mut Cpu, mmu: &mut Mmu, n: usize) -> u32 {
    (0..n).map(|_| cpu.step(mmu)).sum()
}

use log::warn;

use crate::{
    cartridge::Cartridge,
    input::Input,
    interrupts::InterruptController,
    ppu::{OAM_SIZE, Ppu},
    serial::Serial,
    sound::{DEFAULT_SAMPLE_RATE, Sound},
    timer::Timer,
};

const WRAM_SIZE: usize = 0x2000;
const HRAM_SIZE: usize = 0x7F;

/// I/O register values left behind by the DMG boot ROM, applied in order.
/// NR52 comes first so the sound registers accept their writes.
const POST_BOOT_IO: &[(u16, u8)] = &[
    (0xFF26, 0xF1),
    (0xFF00, 0xCF),
    (0xFF05, 0x00),
    (0xFF06, 0x00),
    (0xFF07, 0x00),
    (0xFF10, 0x80),
    (0xFF11, 0xBF),
    (0xFF12, 0xF3),
    (0xFF14, 0xBF),
    (0xFF16, 0x3F),
    (0xFF17, 0x00),
    (0xFF19, 0xBF),
    (0xFF1A, 0x7F),
    (0xFF1B, 0xFF),
    (0xFF1C, 0x9F),
    (0xFF1E, 0xBF),
    (0xFF20, 0xFF),
    (0xFF21, 0x00),
    (0xFF22, 0x00),
    (0xFF23, 0xBF),
    (0xFF24, 0x77),
    (0xFF25, 0xF3),
    (0xFF40, 0x91),
    (0xFF42, 0x00),
    (0xFF43, 0x00),
    (0xFF45, 0x00),
    (0xFF47, 0xFC),
    (0xFF48, 0xFF),
    (0xFF49, 0xFF),
    (0xFF4A, 0x00),
    (0xFF4B, 0x00),
    (0xFF0F, 0xE1),
    (0xFFFF, 0x00),
];

pub struct Mmu {
    pub wram: [u8; WRAM_SIZE],
    pub hram: [u8; HRAM_SIZE],
    pub cart: Option<Cartridge>,
    pub interrupts: InterruptController,
    pub ppu: Ppu,
    pub timer: Timer,
    pub input: Input,
    pub serial: Serial,
    pub sound: Sound,
}

impl Mmu {
    pub fn new() -> Self {
        Self::with_sample_rate(DEFAULT_SAMPLE_RATE)
    }

    pub fn with_sample_rate(sample_rate: u32) -> Self {
        Self {
            wram: [0; WRAM_SIZE],
            hram: [0; HRAM_SIZE],
            cart: None,
            interrupts: InterruptController::new(),
            ppu: Ppu::new(),
            timer: Timer::new(),
            input: Input::new(),
            serial: Serial::new(),
            sound: Sound::new(sample_rate),
        }
    }

    pub fn load_cart(&mut self, cart: Cartridge) {
        self.cart = Some(cart);
    }

    pub fn save_cart_ram(&mut self) {
        if let Some(cart) = self.cart.as_ref()
            && let Err(e) = cart.save_ram()
        {
            warn!("Failed to save cartridge RAM: {e}");
        }
    }

    /// Put the I/O block in the state the boot ROM leaves it in.
    pub fn apply_post_boot_io(&mut self) {
        for &(addr, val) in POST_BOOT_IO {
            self.write_byte(addr, val);
        }
    }

    pub fn read_byte(&self, addr: u16) -> u8 {
        match addr {
            0x0000..=0x7FFF | 0xA000..=0xBFFF => {
                self.cart.as_ref().map_or(0xFF, |c| c.read(addr))
            }
            0x8000..=0x9FFF => self.ppu.read_vram(addr),
            0xC000..=0xDFFF => self.wram[(addr - 0xC000) as usize],
            0xE000..=0xFDFF => self.wram[(addr - 0xE000) as usize],
            0xFE00..=0xFE9F => self.ppu.read_oam(addr),
            0xFEA0..=0xFEFF => 0xFF,
            0xFF00 => self.input.read(),
            0xFF01 | 0xFF02 => self.serial.read(addr),
            0xFF04..=0xFF07 => self.timer.read(addr),
            0xFF0F => self.interrupts.read_if(),
            0xFF10..=0xFF26 | 0xFF30..=0xFF3F => self.sound.read(addr),
            0xFF40..=0xFF4B => self.ppu.read_reg(addr),
            0xFF80..=0xFFFE => self.hram[(addr - 0xFF80) as usize],
            0xFFFF => self.interrupts.read_ie(),
            _ => 0xFF,
        }
    }

    pub fn write_byte(&mut self, addr: u16, val: u8) {
        match addr {
            0x0000..=0x7FFF | 0xA000..=0xBFFF => {
                if let Some(cart) = self.cart.as_mut() {
                    cart.write(addr, val);
                }
            }
            0x8000..=0x9FFF => self.ppu.write_vram(addr, val),
            0xC000..=0xDFFF => self.wram[(addr - 0xC000) as usize] = val,
            0xE000..=0xFDFF => self.wram[(addr - 0xE000) as usize] = val,
            0xFE00..=0xFE9F => self.ppu.write_oam(addr, val),
            0xFEA0..=0xFEFF => {}
            0xFF00 => self.input.write(val),
            0xFF01 | 0xFF02 => self.serial.write(addr, val, &mut self.interrupts),
            0xFF04..=0xFF07 => self.timer.write(addr, val),
            0xFF0F => self.interrupts.write_if(val),
            0xFF10..=0xFF26 | 0xFF30..=0xFF3F => self.sound.write(addr, val),
            0xFF46 => {
                self.ppu.dma = val;
                self.oam_dma(val);
            }
            0xFF40..=0xFF4B => self.ppu.write_reg(addr, val, &mut self.interrupts),
            0xFF80..=0xFFFE => self.hram[(addr - 0xFF80) as usize] = val,
            0xFFFF => self.interrupts.write_ie(val),
            _ => {}
        }
    }

    pub fn read_word(&self, addr: u16) -> u16 {
        let lo = self.read_byte(addr) as u16;
        let hi = self.read_byte(addr.wrapping_add(1)) as u16;
        (hi << 8) | lo
    }

    pub fn write_word(&mut self, addr: u16, val: u16) {
        self.write_byte(addr, val as u8);
        self.write_byte(addr.wrapping_add(1), (val >> 8) as u8);
    }

    /// Source side of OAM DMA. Cartridge, work RAM and I/O reads go through
    /// [`Mmu::read_byte`] so banking applies; VRAM ignores the mode lock.
    fn dma_read_byte(&self, addr: u16) -> u8 {
        match addr {
            // The DMA unit sees VRAM regardless of the PPU mode.
            0x8000..=0x9FFF => self.ppu.vram[(addr - 0x8000) as usize],
            // Sources past echo RAM fold back onto work RAM.
            0xFE00..=0xFFFF => self.wram[(addr - 0xE000) as usize & (WRAM_SIZE - 1)],
            _ => self.read_byte(addr),
        }
    }

    /// Copy 160 bytes from `page << 8` into OAM in one go.
    ///
    /// The destination is written straight into `ppu.oam`, not through
    /// [`Mmu::write_byte`]: the DMA unit owns the OAM bus, so the lock that
    /// drops CPU writes during OAM scan and pixel transfer does not apply.
    fn oam_dma(&mut self, page: u8) {
        let base = (page as u16) << 8;
        for i in 0..OAM_SIZE as u16 {
            self.ppu.oam[i as usize] = self.dma_read_byte(base + i);
        }
    }

    /// Advance the peripherals; the PPU runs first so its interrupts are
    /// requested before the timer's for the same slice.
    pub fn step(&mut self, cycles: u32) {
        self.ppu.step(cycles, &mut self.interrupts);
        self.timer.step(cycles, &mut self.interrupts);
        self.sound.step(cycles);
    }

    pub fn take_serial(&mut self) -> Vec<u8> {
        self.serial.take_output()
    }
}

impl Default for Mmu {
    fn default() -> Self {
        Self::new()
    }
}

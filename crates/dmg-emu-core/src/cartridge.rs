use std::{
    fs, io,
    path::{Path, PathBuf},
};

use log::{info, warn};

use crate::error::{LoadError, LoadResult};

/// Smallest image a cartridge can have: two 16 KiB ROM banks.
pub const MIN_ROM_SIZE: usize = 0x8000;
pub const ROM_BANK_SIZE: usize = 0x4000;
pub const RAM_BANK_SIZE: usize = 0x2000;
/// MBC2 carries 512 four-bit cells on the controller itself.
pub const MBC2_RAM_SIZE: usize = 0x200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MbcType {
    NoMbc,
    Mbc1,
    Mbc2,
    Mbc3,
    Mbc5,
}

impl MbcType {
    pub fn from_cart_type(code: u8) -> Option<Self> {
        match code {
            0x00 | 0x08 | 0x09 => Some(MbcType::NoMbc),
            0x01..=0x03 => Some(MbcType::Mbc1),
            0x05 | 0x06 => Some(MbcType::Mbc2),
            0x0F..=0x13 => Some(MbcType::Mbc3),
            0x19..=0x1E => Some(MbcType::Mbc5),
            _ => None,
        }
    }
}

/// What the MBC3 0x4000-0x5FFF register currently maps into 0xA000-0xBFFF.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mbc3Select {
    Ram(u8),
    Rtc(u8),
}

#[derive(Debug, Clone)]
enum MbcState {
    NoMbc,
    Mbc1 {
        bank_lo: u8,
        bank_hi: u8,
        mode: u8,
        ram_enable: bool,
    },
    Mbc2 {
        rom_bank: u8,
        ram_enable: bool,
    },
    Mbc3 {
        rom_bank: u8,
        select: Mbc3Select,
        ram_enable: bool,
    },
    Mbc5 {
        rom_bank: u16,
        ram_bank: u8,
        ram_enable: bool,
    },
}

impl MbcState {
    fn new(mbc: MbcType) -> Self {
        match mbc {
            MbcType::NoMbc => MbcState::NoMbc,
            MbcType::Mbc1 => MbcState::Mbc1 {
                bank_lo: 1,
                bank_hi: 0,
                mode: 0,
                ram_enable: false,
            },
            MbcType::Mbc2 => MbcState::Mbc2 {
                rom_bank: 1,
                ram_enable: false,
            },
            MbcType::Mbc3 => MbcState::Mbc3 {
                rom_bank: 1,
                select: Mbc3Select::Ram(0),
                ram_enable: false,
            },
            MbcType::Mbc5 => MbcState::Mbc5 {
                rom_bank: 1,
                ram_bank: 0,
                ram_enable: false,
            },
        }
    }

    /// Register write decoder for 0x0000-0x7FFF.
    fn write(&mut self, addr: u16, val: u8) {
        match self {
            MbcState::NoMbc => {}
            MbcState::Mbc1 {
                bank_lo,
                bank_hi,
                mode,
                ram_enable,
            } => match addr {
                0x0000..=0x1FFF => *ram_enable = val & 0x0F == 0x0A,
                0x2000..=0x3FFF => {
                    *bank_lo = match val & 0x1F {
                        0 => 1,
                        v => v,
                    }
                }
                0x4000..=0x5FFF => *bank_hi = val & 0x03,
                _ => *mode = val & 0x01,
            },
            MbcState::Mbc2 {
                rom_bank,
                ram_enable,
            } => {
                if addr <= 0x3FFF {
                    if addr & 0x0100 == 0 {
                        *ram_enable = val & 0x0F == 0x0A;
                    } else {
                        *rom_bank = match val & 0x0F {
                            0 => 1,
                            v => v,
                        };
                    }
                }
            }
            MbcState::Mbc3 {
                rom_bank,
                select,
                ram_enable,
            } => match addr {
                0x0000..=0x1FFF => *ram_enable = val & 0x0F == 0x0A,
                0x2000..=0x3FFF => {
                    *rom_bank = match val & 0x7F {
                        0 => 1,
                        v => v,
                    }
                }
                0x4000..=0x5FFF => {
                    *select = match val {
                        0x08..=0x0C => Mbc3Select::Rtc(val),
                        _ => Mbc3Select::Ram(val & 0x03),
                    }
                }
                // RTC latch; the clock is not modeled.
                _ => {}
            },
            MbcState::Mbc5 {
                rom_bank,
                ram_bank,
                ram_enable,
            } => match addr {
                0x0000..=0x1FFF => *ram_enable = val & 0x0F == 0x0A,
                0x2000..=0x2FFF => *rom_bank = (*rom_bank & 0x100) | val as u16,
                0x3000..=0x3FFF => *rom_bank = (*rom_bank & 0xFF) | (((val & 0x01) as u16) << 8),
                0x4000..=0x5FFF => *ram_bank = val & 0x0F,
                _ => {}
            },
        }
    }

    fn rom_bank(&self) -> usize {
        match *self {
            MbcState::NoMbc => 1,
            MbcState::Mbc1 {
                bank_lo,
                bank_hi,
                mode,
                ..
            } => {
                if mode == 0 {
                    ((bank_hi as usize) << 5) | bank_lo as usize
                } else {
                    bank_lo as usize
                }
            }
            MbcState::Mbc2 { rom_bank, .. } | MbcState::Mbc3 { rom_bank, .. } => rom_bank as usize,
            MbcState::Mbc5 { rom_bank, .. } => rom_bank as usize,
        }
    }

    fn ram_bank(&self) -> usize {
        match *self {
            MbcState::NoMbc | MbcState::Mbc2 { .. } => 0,
            MbcState::Mbc1 { bank_hi, mode, .. } => {
                if mode == 0 {
                    0
                } else {
                    bank_hi as usize
                }
            }
            MbcState::Mbc3 { select, .. } => match select {
                Mbc3Select::Ram(bank) => bank as usize,
                Mbc3Select::Rtc(_) => 0,
            },
            MbcState::Mbc5 { ram_bank, .. } => ram_bank as usize,
        }
    }

    fn ram_enabled(&self) -> bool {
        match *self {
            // A plain ROM+RAM board has no enable gate.
            MbcState::NoMbc => true,
            MbcState::Mbc1 { ram_enable, .. }
            | MbcState::Mbc2 { ram_enable, .. }
            | MbcState::Mbc3 { ram_enable, .. }
            | MbcState::Mbc5 { ram_enable, .. } => ram_enable,
        }
    }

    fn rtc_selected(&self) -> bool {
        matches!(
            self,
            MbcState::Mbc3 {
                select: Mbc3Select::Rtc(_),
                ..
            }
        )
    }
}

#[derive(Debug)]
pub struct Cartridge {
    pub rom: Vec<u8>,
    pub ram: Vec<u8>,
    pub mbc: MbcType,
    pub title: String,
    cart_type: u8,
    save_path: Option<PathBuf>,
    mbc_state: MbcState,
}

impl Cartridge {
    /// Validate a ROM image and build a cartridge around it.
    pub fn load(data: Vec<u8>) -> LoadResult<Self> {
        if data.len() < MIN_ROM_SIZE {
            return Err(LoadError::RomTooSmall { len: data.len() });
        }

        let header = Header::parse(&data);
        let cart_type = header.cart_type();
        let mbc = MbcType::from_cart_type(cart_type)
            .ok_or(LoadError::UnsupportedCartridgeType(cart_type))?;

        if let Some(expected) = header.rom_size()
            && expected != data.len()
        {
            warn!(
                "ROM header declares {expected} bytes but image is {} bytes",
                data.len()
            );
        }

        let ram_size = header.ram_size(mbc);
        let title = header.title();

        Ok(Self {
            rom: data,
            ram: vec![0; ram_size],
            mbc,
            title,
            cart_type,
            save_path: None,
            mbc_state: MbcState::new(mbc),
        })
    }

    /// Load a ROM from disk. Battery-backed cartridges pick up `<rom>.sav`
    /// when it exists and remember where to write it back.
    pub fn from_file<P: AsRef<Path>>(path: P) -> LoadResult<Self> {
        let data = fs::read(&path)?;
        let mut cart = Self::load(data)?;

        if cart.has_battery() {
            let save = path.as_ref().with_extension("sav");
            if let Ok(bytes) = fs::read(&save) {
                for (d, s) in cart.ram.iter_mut().zip(bytes.iter()) {
                    *d = *s;
                }
                info!("Loaded battery RAM from {}", save.display());
            }
            cart.save_path = Some(save);
        }

        info!(
            "Loaded ROM: {} (MBC: {:?}, ROM: {} KiB, RAM: {} bytes)",
            cart.title,
            cart.mbc,
            cart.rom.len() / 1024,
            cart.ram.len()
        );
        Ok(cart)
    }

    pub fn cart_type(&self) -> u8 {
        self.cart_type
    }

    /// Currently selected bank for 0x4000-0x7FFF.
    pub fn rom_bank(&self) -> usize {
        self.mbc_state.rom_bank()
    }

    pub fn ram_bank(&self) -> usize {
        self.mbc_state.ram_bank()
    }

    pub fn ram_enabled(&self) -> bool {
        self.mbc_state.ram_enabled()
    }

    /// MBC1 mode latch; 0 on every other controller.
    pub fn banking_mode(&self) -> u8 {
        match self.mbc_state {
            MbcState::Mbc1 { mode, .. } => mode,
            _ => 0,
        }
    }

    pub fn read(&self, addr: u16) -> u8 {
        match addr {
            0x0000..=0x3FFF => self.rom.get(addr as usize).copied().unwrap_or(0xFF),
            0x4000..=0x7FFF => {
                let index = self.rom_bank() * ROM_BANK_SIZE + (addr as usize - 0x4000);
                self.rom.get(index).copied().unwrap_or(0xFF)
            }
            0xA000..=0xBFFF => self.read_ram(addr),
            _ => 0xFF,
        }
    }

    pub fn write(&mut self, addr: u16, val: u8) {
        match addr {
            0x0000..=0x7FFF => self.mbc_state.write(addr, val),
            0xA000..=0xBFFF => self.write_ram(addr, val),
            _ => {}
        }
    }

    fn read_ram(&self, addr: u16) -> u8 {
        if !self.ram_enabled() {
            return 0xFF;
        }
        if self.mbc_state.rtc_selected() {
            return 0x00;
        }
        match self.ram_index(addr) {
            Some(i) if self.mbc == MbcType::Mbc2 => 0xF0 | (self.ram[i] & 0x0F),
            Some(i) => self.ram[i],
            None => 0xFF,
        }
    }

    fn write_ram(&mut self, addr: u16, val: u8) {
        if !self.ram_enabled() || self.mbc_state.rtc_selected() {
            return;
        }
        let val = if self.mbc == MbcType::Mbc2 {
            val & 0x0F
        } else {
            val
        };
        if let Some(i) = self.ram_index(addr) {
            self.ram[i] = val;
        }
    }

    fn ram_index(&self, addr: u16) -> Option<usize> {
        let offset = addr as usize - 0xA000;
        let index = match self.mbc {
            MbcType::Mbc2 => offset & 0x01FF,
            _ => self.ram_bank() * RAM_BANK_SIZE + offset,
        };
        (index < self.ram.len()).then_some(index)
    }

    pub fn has_battery(&self) -> bool {
        matches!(
            self.cart_type,
            0x03 | 0x06 | 0x09 | 0x0F | 0x10 | 0x13 | 0x1B | 0x1E
        )
    }

    /// Flush battery RAM to the `.sav` file chosen by [`Cartridge::from_file`].
    pub fn save_ram(&self) -> io::Result<()> {
        if let (true, Some(path)) = (self.has_battery(), &self.save_path)
            && !self.ram.is_empty()
        {
            fs::write(path, &self.ram)?;
        }
        Ok(())
    }
}

struct Header<'a> {
    data: &'a [u8],
}

impl<'a> Header<'a> {
    fn parse(data: &'a [u8]) -> Self {
        Self { data }
    }

    fn title(&self) -> String {
        let mut slice = &self.data[0x0134..0x0144];
        if let Some(pos) = slice.iter().position(|&b| b == 0) {
            slice = &slice[..pos];
        }
        String::from_utf8_lossy(slice).trim().to_string()
    }

    fn cart_type(&self) -> u8 {
        self.data[0x0147]
    }

    /// Image size implied by the ROM-size code (2^(n+1) banks).
    fn rom_size(&self) -> Option<usize> {
        match self.data[0x0148] {
            code @ 0x00..=0x08 => Some(ROM_BANK_SIZE << (code + 1)),
            _ => None,
        }
    }

    fn ram_size(&self, mbc: MbcType) -> usize {
        if mbc == MbcType::Mbc2 {
            return MBC2_RAM_SIZE;
        }

        match self.data[0x0149] {
            0x00 => 0,
            0x01 => 0x800,
            0x02 => 0x2000,
            0x03 => 0x8000,
            0x04 => 0x20000,
            0x05 => 0x10000,
            code => {
                warn!("Unknown RAM size code 0x{code:02X}; assuming 8 KiB");
                0x2000
            }
        }
    }
}

use crate::interrupts::{Interrupt, InterruptController};

// Screen resolution used by the Game Boy PPU
pub const SCREEN_WIDTH: usize = 160;
pub const SCREEN_HEIGHT: usize = 144;

// Timing constants per LCD mode in T-cycles
const MODE0_CYCLES: u32 = 204; // HBlank
const MODE1_CYCLES: u32 = 456; // One line during VBlank
const MODE2_CYCLES: u32 = 80; // OAM scan
const MODE3_CYCLES: u32 = 172; // Pixel transfer

pub const LINE_CYCLES: u32 = MODE2_CYCLES + MODE3_CYCLES + MODE0_CYCLES;
pub const FRAME_CYCLES: u32 = LINE_CYCLES * (SCREEN_HEIGHT as u32 + VBLANK_LINES as u32);

// Number of lines spent in VBlank
const VBLANK_LINES: u8 = 10;
pub const LAST_LINE: u8 = SCREEN_HEIGHT as u8 + VBLANK_LINES - 1;

// Sprite limits
const MAX_SPRITES_PER_LINE: usize = 10;
const TOTAL_SPRITES: usize = 40;

pub const VRAM_SIZE: usize = 0x2000;
pub const OAM_SIZE: usize = 0xA0;

// Window X position is clipped if greater than this value
const WINDOW_X_MAX: u8 = 166;

// VRAM layout constants
const BG_MAP_0_BASE: usize = 0x1800;
const BG_MAP_1_BASE: usize = 0x1C00;
const TILE_DATA_0_BASE: usize = 0x0000;
const TILE_DATA_1_BASE: usize = 0x0800;

/// One finished frame of 2-bit shades, row-major.
pub type FrameBuffer = [[u8; SCREEN_WIDTH]; SCREEN_HEIGHT];

/// Number of PPU registers carried in a snapshot, LCDC through WX plus DMA.
pub const PPU_REGISTER_COUNT: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LcdMode {
    HBlank = 0,
    VBlank = 1,
    OamScan = 2,
    Transfer = 3,
}

impl LcdMode {
    pub fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            0 => Some(LcdMode::HBlank),
            1 => Some(LcdMode::VBlank),
            2 => Some(LcdMode::OamScan),
            3 => Some(LcdMode::Transfer),
            _ => None,
        }
    }

    /// Cycles spent in this mode before the next transition.
    pub fn cycles(self) -> u32 {
        match self {
            LcdMode::OamScan => MODE2_CYCLES,
            LcdMode::Transfer => MODE3_CYCLES,
            LcdMode::HBlank => MODE0_CYCLES,
            LcdMode::VBlank => MODE1_CYCLES,
        }
    }
}

#[derive(Clone, Copy, Default)]
struct Sprite {
    x: i16,
    y: i16,
    tile: u8,
    flags: u8,
    oam_index: usize,
}

pub struct Ppu {
    pub vram: [u8; VRAM_SIZE],
    pub oam: [u8; OAM_SIZE],

    lcdc: u8,
    stat: u8,
    scy: u8,
    scx: u8,
    ly: u8,
    lyc: u8,
    pub dma: u8,
    bgp: u8,
    obp0: u8,
    obp1: u8,
    wy: u8,
    wx: u8,

    /// Internal window line counter
    win_line_counter: u8,

    mode_clock: u32,
    mode: LcdMode,

    line_sprites: [Sprite; MAX_SPRITES_PER_LINE],
    sprite_count: usize,

    /// Background/window color ids for the line being composited
    bg_line: [u8; SCREEN_WIDTH],
    /// Columns already claimed by a higher-priority sprite
    obj_line: [bool; SCREEN_WIDTH],
    framebuffer: Box<FrameBuffer>,

    frame_ready: bool,
    stat_irq_line: bool,
    frame_counter: u64,
}

impl Ppu {
    pub fn new() -> Self {
        Self {
            vram: [0; VRAM_SIZE],
            oam: [0; OAM_SIZE],
            lcdc: 0,
            stat: 0,
            scy: 0,
            scx: 0,
            ly: 0,
            lyc: 0,
            dma: 0xFF,
            bgp: 0,
            obp0: 0,
            obp1: 0,
            wy: 0,
            wx: 0,
            win_line_counter: 0,
            mode_clock: 0,
            mode: LcdMode::HBlank,
            line_sprites: [Sprite::default(); MAX_SPRITES_PER_LINE],
            sprite_count: 0,
            bg_line: [0; SCREEN_WIDTH],
            obj_line: [false; SCREEN_WIDTH],
            framebuffer: Box::new([[0; SCREEN_WIDTH]; SCREEN_HEIGHT]),
            frame_ready: false,
            stat_irq_line: false,
            frame_counter: 0,
        }
    }

    pub fn lcd_enabled(&self) -> bool {
        self.lcdc & 0x80 != 0
    }

    pub fn mode(&self) -> LcdMode {
        self.mode
    }

    pub fn ly(&self) -> u8 {
        self.ly
    }

    pub fn mode_clock(&self) -> u32 {
        self.mode_clock
    }

    pub fn frame_ready(&self) -> bool {
        self.frame_ready
    }

    /// Return and clear the frame-ready flag.
    pub fn take_frame_ready(&mut self) -> bool {
        std::mem::take(&mut self.frame_ready)
    }

    pub fn framebuffer(&self) -> &FrameBuffer {
        &self.framebuffer
    }

    pub fn frames(&self) -> u64 {
        self.frame_counter
    }

    /// VRAM is unreachable from the CPU during pixel transfer.
    pub fn vram_accessible(&self) -> bool {
        self.mode != LcdMode::Transfer
    }

    /// OAM is unreachable from the CPU during OAM scan and pixel transfer.
    pub fn oam_accessible(&self) -> bool {
        !matches!(self.mode, LcdMode::OamScan | LcdMode::Transfer)
    }

    pub fn read_vram(&self, addr: u16) -> u8 {
        if self.vram_accessible() {
            self.vram[(addr as usize - 0x8000) & (VRAM_SIZE - 1)]
        } else {
            0xFF
        }
    }

    pub fn write_vram(&mut self, addr: u16, val: u8) {
        if self.vram_accessible() {
            self.vram[(addr as usize - 0x8000) & (VRAM_SIZE - 1)] = val;
        }
    }

    pub fn read_oam(&self, addr: u16) -> u8 {
        if self.oam_accessible() {
            self.oam[addr as usize - 0xFE00]
        } else {
            0xFF
        }
    }

    pub fn write_oam(&mut self, addr: u16, val: u8) {
        if self.oam_accessible() {
            self.oam[addr as usize - 0xFE00] = val;
        }
    }

    fn lyc_match(&self) -> bool {
        self.ly == self.lyc
    }

    pub fn read_reg(&self, addr: u16) -> u8 {
        match addr {
            0xFF40 => self.lcdc,
            0xFF41 => {
                (self.stat & 0x78)
                    | 0x80
                    | self.mode as u8
                    | if self.lyc_match() { 0x04 } else { 0 }
            }
            0xFF42 => self.scy,
            0xFF43 => self.scx,
            0xFF44 => self.ly,
            0xFF45 => self.lyc,
            0xFF46 => self.dma,
            0xFF47 => self.bgp,
            0xFF48 => self.obp0,
            0xFF49 => self.obp1,
            0xFF4A => self.wy,
            0xFF4B => self.wx,
            _ => 0xFF,
        }
    }

    pub fn write_reg(&mut self, addr: u16, val: u8, interrupts: &mut InterruptController) {
        match addr {
            0xFF40 => {
                let was_on = self.lcd_enabled();
                self.lcdc = val;
                if was_on && !self.lcd_enabled() {
                    self.mode = LcdMode::HBlank;
                    self.mode_clock = 0;
                    self.win_line_counter = 0;
                    self.ly = 0;
                    self.stat_irq_line = false;
                } else if !was_on && self.lcd_enabled() {
                    self.mode = LcdMode::OamScan;
                    self.mode_clock = 0;
                    self.update_stat_irq(interrupts);
                }
            }
            0xFF41 => {
                self.stat = (self.stat & 0x07) | (val & 0x78);
                self.update_stat_irq(interrupts);
            }
            0xFF42 => self.scy = val,
            0xFF43 => self.scx = val,
            // LY is read-only.
            0xFF44 => {}
            0xFF45 => {
                self.lyc = val;
                self.update_stat_irq(interrupts);
            }
            0xFF46 => self.dma = val,
            0xFF47 => self.bgp = val,
            0xFF48 => self.obp0 = val,
            0xFF49 => self.obp1 = val,
            0xFF4A => self.wy = val,
            0xFF4B => self.wx = val,
            _ => {}
        }
    }

    /// LCDC, STAT, SCY, SCX, LY, LYC, BGP, OBP0, OBP1, WY, WX, DMA.
    pub fn registers(&self) -> [u8; PPU_REGISTER_COUNT] {
        [
            self.lcdc,
            self.read_reg(0xFF41),
            self.scy,
            self.scx,
            self.ly,
            self.lyc,
            self.bgp,
            self.obp0,
            self.obp1,
            self.wy,
            self.wx,
            self.dma,
        ]
    }

    /// Restore timing and register state from a snapshot. The caller is
    /// responsible for checking that `ly`, `mode` and `mode_clock` agree.
    /// DMA only gets its register value back; no copy is started.
    pub fn restore(&mut self, regs: [u8; PPU_REGISTER_COUNT], mode: LcdMode, mode_clock: u32) {
        let [lcdc, stat, scy, scx, ly, lyc, bgp, obp0, obp1, wy, wx, dma] = regs;
        self.lcdc = lcdc;
        self.stat = stat & 0x78;
        self.scy = scy;
        self.scx = scx;
        self.ly = ly;
        self.lyc = lyc;
        self.bgp = bgp;
        self.obp0 = obp0;
        self.obp1 = obp1;
        self.wy = wy;
        self.wx = wx;
        self.dma = dma;
        self.mode = mode;
        self.mode_clock = mode_clock;
        self.win_line_counter = 0;
        self.frame_ready = false;
        self.stat_irq_line = self.stat_signal();
    }

    #[inline(always)]
    fn dmg_shade(palette: u8, color_id: u8) -> u8 {
        (palette >> (color_id * 2)) & 0x03
    }

    /// Collect up to 10 sprites visible on the current scanline, in OAM order.
    fn oam_scan(&mut self) {
        let sprite_height: i16 = if self.lcdc & 0x04 != 0 { 16 } else { 8 };
        self.sprite_count = 0;
        for i in 0..TOTAL_SPRITES {
            if self.sprite_count >= MAX_SPRITES_PER_LINE {
                break;
            }
            let base = i * 4;
            let y = self.oam[base] as i16 - 16;
            if self.ly as i16 >= y && (self.ly as i16) < y + sprite_height {
                self.line_sprites[self.sprite_count] = Sprite {
                    x: self.oam[base + 1] as i16 - 8,
                    y,
                    tile: self.oam[base + 2],
                    flags: self.oam[base + 3],
                    oam_index: i,
                };
                self.sprite_count += 1;
            }
        }
        // Overlaps resolve by X, then OAM index.
        self.line_sprites[..self.sprite_count].sort_by_key(|s| (s.x, s.oam_index));
    }

    fn tile_row_addr(&self, tile_index: u8, row: usize) -> usize {
        let base = if self.lcdc & 0x10 != 0 {
            TILE_DATA_0_BASE + tile_index as usize * 16
        } else {
            TILE_DATA_1_BASE + ((tile_index as i8 as i16 + 128) as usize) * 16
        };
        base + row * 2
    }

    fn tile_color(&self, row_addr: usize, bit: usize) -> u8 {
        let lo = self.vram[row_addr];
        let hi = self.vram[row_addr + 1];
        (((hi >> bit) & 1) << 1) | ((lo >> bit) & 1)
    }

    fn render_scanline(&mut self) {
        let ly = self.ly as usize;
        if !self.lcd_enabled() || ly >= SCREEN_HEIGHT {
            return;
        }

        // With LCDC bit 0 clear the line is color 0 and sprites see it as such.
        self.bg_line.fill(0);
        self.obj_line.fill(false);

        if self.lcdc & 0x01 != 0 {
            self.render_background(ly);
            self.render_window();
        }

        let mut line = [0u8; SCREEN_WIDTH];
        for (x, shade) in line.iter_mut().enumerate() {
            *shade = Self::dmg_shade(self.bgp, self.bg_line[x]);
        }

        if self.lcdc & 0x02 != 0 {
            self.render_sprites(ly, &mut line);
        }

        self.framebuffer[ly] = line;
    }

    fn render_background(&mut self, ly: usize) {
        let tile_map_base = if self.lcdc & 0x08 != 0 {
            BG_MAP_1_BASE
        } else {
            BG_MAP_0_BASE
        };
        let y = (ly + self.scy as usize) & 0xFF;
        let tile_row = y / 8;
        let tile_y = y % 8;

        for x in 0..SCREEN_WIDTH {
            let px = (x + self.scx as usize) & 0xFF;
            let tile_col = px / 8;
            let tile_index = self.vram[tile_map_base + tile_row * 32 + tile_col];
            let addr = self.tile_row_addr(tile_index, tile_y);
            self.bg_line[x] = self.tile_color(addr, 7 - px % 8);
        }
    }

    fn render_window(&mut self) {
        if self.lcdc & 0x20 == 0 || self.ly < self.wy || self.wx > WINDOW_X_MAX {
            return;
        }
        let window_map_base = if self.lcdc & 0x40 != 0 {
            BG_MAP_1_BASE
        } else {
            BG_MAP_0_BASE
        };
        let wx = self.wx as i16 - 7;
        let window_y = self.win_line_counter as usize;
        let start = wx.max(0) as usize;

        for x in start..SCREEN_WIDTH {
            let window_x = (x as i16 - wx) as usize;
            let tile_index =
                self.vram[window_map_base + (window_y / 8) * 32 + (window_x / 8) % 32];
            let addr = self.tile_row_addr(tile_index, window_y % 8);
            self.bg_line[x] = self.tile_color(addr, 7 - window_x % 8);
        }

        #[cfg(feature = "ppu-trace")]
        log::trace!("window line {} drawn on LY {}", self.win_line_counter, self.ly);

        self.win_line_counter = self.win_line_counter.wrapping_add(1);
    }

    fn render_sprites(&mut self, ly: usize, line: &mut [u8; SCREEN_WIDTH]) {
        let sprite_height: i16 = if self.lcdc & 0x04 != 0 { 16 } else { 8 };
        for s in &self.line_sprites[..self.sprite_count] {
            let mut tile = s.tile;
            if sprite_height == 16 {
                tile &= 0xFE;
            }
            let mut line_idx = ly as i16 - s.y;
            if s.flags & 0x40 != 0 {
                line_idx = sprite_height - 1 - line_idx;
            }
            let addr = tile as usize * 16 + line_idx as usize * 2;
            let palette = if s.flags & 0x10 != 0 {
                self.obp1
            } else {
                self.obp0
            };

            for px in 0..8usize {
                let bit = if s.flags & 0x20 != 0 { px } else { 7 - px };
                let color_id = self.tile_color(addr, bit);
                // Color 0 is transparent.
                if color_id == 0 {
                    continue;
                }
                let sx = s.x + px as i16;
                if !(0i16..SCREEN_WIDTH as i16).contains(&sx) {
                    continue;
                }
                let sx = sx as usize;
                if self.obj_line[sx] {
                    continue;
                }
                self.obj_line[sx] = true;
                // Behind-background sprites only show through BG color 0.
                if s.flags & 0x80 != 0 && self.bg_line[sx] != 0 {
                    continue;
                }
                line[sx] = Self::dmg_shade(palette, color_id);
            }
        }
    }

    /// Advance the PPU by `cycles` CPU cycles.
    pub fn step(&mut self, cycles: u32, interrupts: &mut InterruptController) {
        if !self.lcd_enabled() {
            return;
        }

        self.mode_clock += cycles;
        loop {
            let threshold = self.mode.cycles();
            if self.mode_clock < threshold {
                break;
            }
            self.mode_clock -= threshold;

            match self.mode {
                LcdMode::OamScan => {
                    self.oam_scan();
                    self.mode = LcdMode::Transfer;
                }
                LcdMode::Transfer => {
                    self.render_scanline();
                    self.mode = LcdMode::HBlank;
                }
                LcdMode::HBlank => {
                    self.ly += 1;
                    if self.ly as usize >= SCREEN_HEIGHT {
                        self.mode = LcdMode::VBlank;
                        self.frame_ready = true;
                        interrupts.request(Interrupt::VBlank);
                    } else {
                        self.mode = LcdMode::OamScan;
                    }
                }
                LcdMode::VBlank => {
                    self.ly += 1;
                    if self.ly > LAST_LINE {
                        self.ly = 0;
                        self.win_line_counter = 0;
                        self.frame_counter = self.frame_counter.wrapping_add(1);
                        self.mode = LcdMode::OamScan;
                    }
                }
            }

            #[cfg(feature = "ppu-trace")]
            log::trace!("LY={} mode={:?}", self.ly, self.mode);

            self.update_stat_irq(interrupts);
        }
    }

    fn stat_signal(&self) -> bool {
        if !self.lcd_enabled() {
            return false;
        }
        let coincidence = self.lyc_match() && self.stat & 0x40 != 0;
        let mode_signal = match self.mode {
            LcdMode::HBlank => self.stat & 0x08 != 0,
            LcdMode::VBlank => self.stat & 0x10 != 0,
            LcdMode::OamScan => self.stat & 0x20 != 0,
            LcdMode::Transfer => false,
        };
        coincidence || mode_signal
    }

    /// STAT fires on the rising edge of the OR of all enabled sources.
    fn update_stat_irq(&mut self, interrupts: &mut InterruptController) {
        let current = self.stat_signal();
        if current && !self.stat_irq_line {
            interrupts.request(Interrupt::LcdStat);
        }
        self.stat_irq_line = current;
    }
}

impl Default for Ppu {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lcd_on(ppu: &mut Ppu, lcdc: u8, ic: &mut InterruptController) {
        ppu.write_reg(0xFF40, lcdc, ic);
    }

    /// Tile 1 is solid color 3, tile 2 solid color 1.
    fn load_tiles(ppu: &mut Ppu) {
        for row in 0..8 {
            ppu.vram[16 + row * 2] = 0xFF;
            ppu.vram[16 + row * 2 + 1] = 0xFF;
            ppu.vram[32 + row * 2] = 0xFF;
            ppu.vram[32 + row * 2 + 1] = 0x00;
        }
    }

    #[test]
    fn full_frame_is_70224_cycles() {
        let mut ppu = Ppu::new();
        let mut ic = InterruptController::new();
        lcd_on(&mut ppu, 0x91, &mut ic);
        ppu.step(FRAME_CYCLES - 4, &mut ic);
        assert_eq!(ppu.ly(), LAST_LINE);
        ppu.step(4, &mut ic);
        assert_eq!(ppu.ly(), 0);
        assert_eq!(ppu.mode(), LcdMode::OamScan);
        assert_eq!(ppu.frames(), 1);
    }

    #[test]
    fn background_uses_palette() {
        let mut ppu = Ppu::new();
        let mut ic = InterruptController::new();
        load_tiles(&mut ppu);
        ppu.vram[BG_MAP_0_BASE] = 1;
        ppu.bgp = 0b1110_0100;
        lcd_on(&mut ppu, 0x91, &mut ic);
        ppu.step(LINE_CYCLES, &mut ic);
        assert_eq!(ppu.framebuffer()[0][0], 3);
        assert_eq!(ppu.framebuffer()[0][8], 0);

        ppu.bgp = 0b0001_1011; // inverted
        ppu.step(LINE_CYCLES, &mut ic);
        assert_eq!(ppu.framebuffer()[1][0], 0);
        assert_eq!(ppu.framebuffer()[1][8], 3);
    }

    #[test]
    fn signed_tile_data_addressing() {
        let mut ppu = Ppu::new();
        let mut ic = InterruptController::new();
        // Tile index 0 in 8800 mode lives at 0x9000.
        for row in 0..8 {
            ppu.vram[0x1000 + row * 2] = 0xFF;
        }
        ppu.bgp = 0b1110_0100;
        lcd_on(&mut ppu, 0x81, &mut ic);
        ppu.step(LINE_CYCLES, &mut ic);
        assert_eq!(ppu.framebuffer()[0][0], 1);
    }

    #[test]
    fn sprite_priority_and_transparency() {
        let mut ppu = Ppu::new();
        let mut ic = InterruptController::new();
        load_tiles(&mut ppu);
        ppu.bgp = 0b1110_0100;
        ppu.obp0 = 0b1110_0100;
        // BG columns 8..16 use tile 2 (color 1).
        ppu.vram[BG_MAP_0_BASE + 1] = 2;
        // Sprite 0 at x=0 in front, sprite 1 behind BG at x=8.
        ppu.oam[0..4].copy_from_slice(&[16, 8, 1, 0x00]);
        ppu.oam[4..8].copy_from_slice(&[16, 16, 1, 0x80]);
        lcd_on(&mut ppu, 0x93, &mut ic);
        ppu.step(LINE_CYCLES, &mut ic);
        assert_eq!(ppu.framebuffer()[0][0], 3);
        assert_eq!(ppu.framebuffer()[0][8], 1);
        assert_eq!(ppu.framebuffer()[0][16], 0);
    }

    #[test]
    fn ten_sprite_limit() {
        let mut ppu = Ppu::new();
        let mut ic = InterruptController::new();
        load_tiles(&mut ppu);
        ppu.obp0 = 0b1110_0100;
        for i in 0..12 {
            let x = 8 + (i as u8) * 8;
            ppu.oam[i * 4..i * 4 + 4].copy_from_slice(&[16, x, 1, 0]);
        }
        lcd_on(&mut ppu, 0x82, &mut ic);
        ppu.step(LINE_CYCLES, &mut ic);
        assert_eq!(ppu.framebuffer()[0][9 * 8], 3);
        assert_eq!(ppu.framebuffer()[0][10 * 8], 0);
    }

    #[test]
    fn lyc_coincidence_raises_stat_once() {
        let mut ppu = Ppu::new();
        let mut ic = InterruptController::new();
        lcd_on(&mut ppu, 0x91, &mut ic);
        ppu.write_reg(0xFF45, 2, &mut ic);
        ppu.write_reg(0xFF41, 0x40, &mut ic);
        ppu.step(LINE_CYCLES, &mut ic);
        assert!(!ic.is_requested(Interrupt::LcdStat));
        ppu.step(LINE_CYCLES, &mut ic);
        assert!(ic.is_requested(Interrupt::LcdStat));
        assert_eq!(ppu.read_reg(0xFF41) & 0x04, 0x04);
    }

    #[test]
    fn lcd_off_resets_line() {
        let mut ppu = Ppu::new();
        let mut ic = InterruptController::new();
        lcd_on(&mut ppu, 0x91, &mut ic);
        ppu.step(LINE_CYCLES * 5 + 100, &mut ic);
        ppu.write_reg(0xFF40, 0x11, &mut ic);
        assert_eq!(ppu.ly(), 0);
        assert_eq!(ppu.mode(), LcdMode::HBlank);
        ppu.step(FRAME_CYCLES, &mut ic);
        assert!(!ppu.frame_ready());
    }
    #[test]
    fn hblank_past_the_visible_area_enters_vblank() {
        let mut ppu = Ppu::new();
        let mut ic = InterruptController::new();
        let mut regs = [0u8; PPU_REGISTER_COUNT];
        regs[0] = 0x91;
        regs[4] = 150;
        ppu.restore(regs, LcdMode::HBlank, 0);
        ppu.step(MODE0_CYCLES, &mut ic);
        assert_eq!(ppu.mode(), LcdMode::VBlank);
        for _ in 0..(FRAME_CYCLES / 4) {
            ppu.step(4, &mut ic);
            assert!(ppu.ly() <= LAST_LINE);
        }
    }

    #[test]
    fn snapshot_registers_carry_dma() {
        let mut ppu = Ppu::new();
        let mut ic = InterruptController::new();
        ppu.write_reg(0xFF46, 0xC1, &mut ic);
        let regs = ppu.registers();
        assert_eq!(regs[PPU_REGISTER_COUNT - 1], 0xC1);

        let mut other = Ppu::new();
        other.restore(regs, LcdMode::HBlank, 0);
        assert_eq!(other.read_reg(0xFF46), 0xC1);
    }
}

use crate::hardware::Model;
use crate::interrupts::{Interrupt, InterruptController};

pub const SCREEN_HEIGHT: u8 = 144;

// Mode lengths in dots.
const OAM_SCAN_DOTS: u32 = 80;
const TRANSFER_DOTS: u32 = 172;
const HBLANK_DOTS: u32 = 204;
const LINE_DOTS: u32 = 456;
const VBLANK_LINES: u8 = 10;

/// Dots in one full frame.
pub const FRAME_DOTS: u32 = LINE_DOTS * (SCREEN_HEIGHT as u32 + VBLANK_LINES as u32);

const VRAM_BANK_SIZE: usize = 0x2000;
const OAM_SIZE: usize = 0xA0;
const PALETTE_RAM_SIZE: usize = 0x40;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    HBlank = 0,
    VBlank = 1,
    OamScan = 2,
    Transfer = 3,
}

/// CGB palette index register plus its 64 bytes of colour RAM.
#[derive(Debug, Clone)]
struct PaletteRam {
    index: u8,
    data: [u8; PALETTE_RAM_SIZE],
}

impl PaletteRam {
    fn new() -> Self {
        Self {
            index: 0,
            data: [0; PALETTE_RAM_SIZE],
        }
    }

    fn read_index(&self) -> u8 {
        self.index | 0x40
    }

    fn write_index(&mut self, val: u8) {
        self.index = val & 0xBF;
    }

    fn read_data(&self) -> u8 {
        self.data[(self.index & 0x3F) as usize]
    }

    /// Writes advance the index when bit 7 (auto-increment) is set.
    fn write_data(&mut self, val: u8) {
        self.data[(self.index & 0x3F) as usize] = val;
        if self.index & 0x80 != 0 {
            self.index = 0x80 | ((self.index + 1) & 0x3F);
        }
    }

    /// 15-bit BGR colour.
    fn color(&self, palette: usize, color: usize) -> u16 {
        let off = (palette * 4 + color) * 2;
        u16::from_le_bytes([self.data[off], self.data[off + 1]])
    }
}

/// Picture processor register file, video memory and mode timing.
///
/// Pixels are not produced here; only the state the CPU and DMA can see.
#[derive(Debug, Clone)]
pub struct Ppu {
    model: Model,
    vram: Box<[[u8; VRAM_BANK_SIZE]; 2]>,
    vram_bank: usize,
    oam: [u8; OAM_SIZE],

    lcdc: u8,
    stat: u8,
    scy: u8,
    scx: u8,
    ly: u8,
    lyc: u8,
    bgp: u8,
    obp0: u8,
    obp1: u8,
    wy: u8,
    wx: u8,
    bg_palettes: PaletteRam,
    obj_palettes: PaletteRam,

    mode: Mode,
    dots: u32,
    stat_line: bool,
    frame_ready: bool,
    frames: u64,
}

impl Ppu {
    pub fn new(model: Model) -> Self {
        Self {
            model,
            vram: Box::new([[0; VRAM_BANK_SIZE]; 2]),
            vram_bank: 0,
            oam: [0; OAM_SIZE],
            lcdc: 0,
            stat: 0,
            scy: 0,
            scx: 0,
            ly: 0,
            lyc: 0,
            bgp: 0,
            obp0: 0,
            obp1: 0,
            wy: 0,
            wx: 0,
            bg_palettes: PaletteRam::new(),
            obj_palettes: PaletteRam::new(),
            mode: Mode::OamScan,
            dots: 0,
            stat_line: false,
            frame_ready: false,
            frames: 0,
        }
    }

    /// Register state the boot ROM leaves behind.
    pub fn apply_post_boot_state(&mut self) {
        self.lcdc = 0x91;
        self.bgp = 0xFC;
        self.stat = 0;
        self.ly = 0;
        self.dots = 0;
        self.mode = Mode::OamScan;
    }

    pub fn vram_load(&self, addr: u16) -> u8 {
        self.vram[self.vram_bank][(addr & 0x1FFF) as usize]
    }

    pub fn vram_store(&mut self, addr: u16, val: u8) {
        self.vram[self.vram_bank][(addr & 0x1FFF) as usize] = val;
    }

    pub fn vram_bank(&self) -> usize {
        self.vram_bank
    }

    pub fn set_vram_bank(&mut self, val: u8) {
        if self.model.is_cgb() {
            self.vram_bank = (val & 0x01) as usize;
        }
    }

    pub fn read_vram_bank(&self) -> u8 {
        if self.model.is_cgb() {
            0xFE | self.vram_bank as u8
        } else {
            0xFF
        }
    }

    /// Read a byte from a specific VRAM bank, ignoring the bank register.
    pub fn vram_bank_byte(&self, bank: usize, offset: usize) -> u8 {
        self.vram[bank & 1][offset & 0x1FFF]
    }

    pub fn oam_load(&self, addr: u16) -> u8 {
        self.oam[(addr as usize - 0xFE00) % OAM_SIZE]
    }

    pub fn oam_store(&mut self, addr: u16, val: u8) {
        self.oam[(addr as usize - 0xFE00) % OAM_SIZE] = val;
    }

    /// OAM DMA destination write, by table index.
    pub fn oam_dma_store(&mut self, index: u8, val: u8) {
        self.oam[index as usize % OAM_SIZE] = val;
    }

    pub fn oam(&self) -> &[u8; OAM_SIZE] {
        &self.oam
    }

    pub fn lcd_enabled(&self) -> bool {
        self.lcdc & 0x80 != 0
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn in_hblank(&self) -> bool {
        self.mode == Mode::HBlank
    }

    pub fn ly(&self) -> u8 {
        self.ly
    }

    pub fn frame_ready(&self) -> bool {
        self.frame_ready
    }

    pub fn clear_frame_ready(&mut self) {
        self.frame_ready = false;
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// CGB background palette colour as 15-bit BGR.
    pub fn bg_color(&self, palette: usize, color: usize) -> u16 {
        self.bg_palettes.color(palette & 7, color & 3)
    }

    pub fn obj_color(&self, palette: usize, color: usize) -> u16 {
        self.obj_palettes.color(palette & 7, color & 3)
    }

    pub fn read(&self, addr: u16) -> u8 {
        let cgb = self.model.is_cgb();
        match addr {
            0xFF40 => self.lcdc,
            0xFF41 => 0x80 | (self.stat & 0x78) | self.coincidence_bit() | self.mode as u8,
            0xFF42 => self.scy,
            0xFF43 => self.scx,
            0xFF44 => self.ly,
            0xFF45 => self.lyc,
            0xFF47 => self.bgp,
            0xFF48 => self.obp0,
            0xFF49 => self.obp1,
            0xFF4A => self.wy,
            0xFF4B => self.wx,
            0xFF68 if cgb => self.bg_palettes.read_index(),
            0xFF69 if cgb => self.bg_palettes.read_data(),
            0xFF6A if cgb => self.obj_palettes.read_index(),
            0xFF6B if cgb => self.obj_palettes.read_data(),
            _ => 0xFF,
        }
    }

    pub fn write(&mut self, addr: u16, val: u8, ic: &mut InterruptController) {
        let cgb = self.model.is_cgb();
        match addr {
            0xFF40 => {
                let was_on = self.lcd_enabled();
                self.lcdc = val;
                if was_on && !self.lcd_enabled() {
                    self.ly = 0;
                    self.dots = 0;
                    self.mode = Mode::HBlank;
                } else if !was_on && self.lcd_enabled() {
                    self.mode = Mode::OamScan;
                    self.dots = 0;
                }
            }
            0xFF41 => {
                self.stat = val & 0x78;
                self.update_stat_line(ic);
            }
            0xFF42 => self.scy = val,
            0xFF43 => self.scx = val,
            0xFF44 => {}
            0xFF45 => {
                self.lyc = val;
                self.update_stat_line(ic);
            }
            0xFF47 => self.bgp = val,
            0xFF48 => self.obp0 = val,
            0xFF49 => self.obp1 = val,
            0xFF4A => self.wy = val,
            0xFF4B => self.wx = val,
            0xFF68 if cgb => self.bg_palettes.write_index(val),
            0xFF69 if cgb => self.bg_palettes.write_data(val),
            0xFF6A if cgb => self.obj_palettes.write_index(val),
            0xFF6B if cgb => self.obj_palettes.write_data(val),
            _ => {}
        }
    }

    fn coincidence_bit(&self) -> u8 {
        if self.ly == self.lyc { 0x04 } else { 0 }
    }

    /// Advance by `dots`. Returns true if HBlank was entered.
    pub fn step(&mut self, dots: u32, ic: &mut InterruptController) -> bool {
        if !self.lcd_enabled() {
            return false;
        }
        self.dots += dots;
        let mut entered_hblank = false;
        loop {
            let (length, next) = match self.mode {
                Mode::OamScan => (OAM_SCAN_DOTS, Mode::Transfer),
                Mode::Transfer => (TRANSFER_DOTS, Mode::HBlank),
                Mode::HBlank if self.ly + 1 == SCREEN_HEIGHT => (HBLANK_DOTS, Mode::VBlank),
                Mode::HBlank => (HBLANK_DOTS, Mode::OamScan),
                Mode::VBlank if self.ly + 1 == SCREEN_HEIGHT + VBLANK_LINES => {
                    (LINE_DOTS, Mode::OamScan)
                }
                Mode::VBlank => (LINE_DOTS, Mode::VBlank),
            };
            if self.dots < length {
                break;
            }
            self.dots -= length;

            match (self.mode, next) {
                (Mode::Transfer, Mode::HBlank) => entered_hblank = true,
                (Mode::HBlank, Mode::VBlank) => {
                    self.ly += 1;
                    self.frame_ready = true;
                    self.frames = self.frames.wrapping_add(1);
                    ic.request(Interrupt::VBlank);
                }
                (Mode::VBlank, Mode::OamScan) => self.ly = 0,
                (Mode::HBlank, _) | (Mode::VBlank, _) => self.ly += 1,
                _ => {}
            }
            self.mode = next;
            self.update_stat_line(ic);
        }
        entered_hblank
    }

    /// The STAT interrupt fires on a rising edge of the OR of all enabled
    /// sources.
    fn update_stat_line(&mut self, ic: &mut InterruptController) {
        let line = self.lcd_enabled()
            && ((self.stat & 0x40 != 0 && self.ly == self.lyc)
                || match self.mode {
                    Mode::HBlank => self.stat & 0x08 != 0,
                    Mode::VBlank => self.stat & 0x10 != 0,
                    Mode::OamScan => self.stat & 0x20 != 0,
                    Mode::Transfer => false,
                });
        if line && !self.stat_line {
            ic.request(Interrupt::LcdStat);
        }
        self.stat_line = line;
    }
}

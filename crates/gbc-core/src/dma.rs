//! OAM DMA and CGB VRAM DMA state machines.
//!
//! Both engines only keep cursors and counters. The bus does the actual
//! byte copies, because only the bus can reach every source region.

use log::debug;

/// Bytes copied by one OAM DMA transfer.
pub const OAM_DMA_LEN: u8 = 0xA0;

/// Bytes copied per HDMA block.
pub const HDMA_BLOCK_LEN: u16 = 0x10;

/// One OAM DMA transfer in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DmaRequest {
    pub source: u16,
    /// Next OAM byte to fill.
    pub index: u8,
    /// First step after the trigger; nothing is copied yet.
    pub preparing: bool,
    /// Superseded by a newer request. Keeps copying until that one is ready.
    pub canceling: bool,
}

impl DmaRequest {
    fn new(page: u8) -> Self {
        let mut source = (page as u16) << 8;
        // 0xE000-0xFFFF sources read from the work RAM underneath.
        if source >= 0xE000 {
            source -= 0x2000;
        }
        Self {
            source,
            index: 0,
            preparing: true,
            canceling: false,
        }
    }
}

/// A single byte the bus should copy into OAM this step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OamTransfer {
    pub source: u16,
    pub oam_index: u8,
}

#[derive(Debug, Default, Clone)]
pub struct OamDma {
    requests: Vec<DmaRequest>,
    /// Last value written to 0xFF46.
    register: u8,
}

impl OamDma {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self) -> u8 {
        self.register
    }

    /// 0xFF46 write. Any transfer already running is marked for cancellation.
    pub fn start(&mut self, page: u8) {
        self.register = page;
        for req in &mut self.requests {
            req.canceling = true;
        }
        let req = DmaRequest::new(page);
        debug!("OAM DMA requested from {:04X}", req.source);
        self.requests.push(req);
    }

    /// True once some request has finished preparing. The CPU is locked out
    /// of most of the address space while this holds.
    pub fn is_active(&self) -> bool {
        self.requests.iter().any(|req| !req.preparing)
    }

    pub fn requests(&self) -> &[DmaRequest] {
        &self.requests
    }

    /// Advance one bus step. Returns the copy the bus must perform, if any.
    pub fn tick(&mut self) -> Option<OamTransfer> {
        let transfer = self
            .requests
            .iter_mut()
            .find(|req| !req.preparing)
            .map(|req| {
                let t = OamTransfer {
                    source: req.source.wrapping_add(req.index as u16),
                    oam_index: req.index,
                };
                req.index += 1;
                t
            });

        let newest_preparing = self.requests.iter().any(|req| req.preparing);
        if newest_preparing {
            self.requests.retain(|req| !req.canceling);
            for req in &mut self.requests {
                req.preparing = false;
            }
        }
        self.requests.retain(|req| req.index < OAM_DMA_LEN);
        transfer
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HdmaMode {
    /// Everything at once while the CPU waits.
    General,
    /// One block per PPU HBlank.
    HBlank,
}

/// What a 0xFF55 write asks the bus to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HdmaCommand {
    None,
    RunGeneral,
    StartHBlank,
    Cancelled,
}

/// Source and destination for one 16-byte block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HdmaBlock {
    pub source: u16,
    pub dest: u16,
}

/// CGB VRAM DMA (0xFF51-0xFF55).
#[derive(Debug, Clone)]
pub struct Hdma {
    source: u16,
    dest: u16,
    blocks_left: u8,
    mode: HdmaMode,
    active: bool,
    cancelled: bool,
}

impl Default for Hdma {
    fn default() -> Self {
        Self {
            source: 0,
            dest: 0x8000,
            blocks_left: 0,
            mode: HdmaMode::General,
            active: false,
            cancelled: false,
        }
    }
}

#[inline]
fn vram_dest(addr: u16) -> u16 {
    0x8000 | (addr & 0x1FF0)
}

impl Hdma {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_hblank_active(&self) -> bool {
        self.active && self.mode == HdmaMode::HBlank
    }

    pub fn blocks_left(&self) -> u8 {
        self.blocks_left
    }

    pub fn read(&self, addr: u16) -> u8 {
        match addr {
            0xFF51 => (self.source >> 8) as u8,
            0xFF52 => (self.source & 0xF0) as u8,
            0xFF53 => ((self.dest >> 8) & 0x1F) as u8,
            0xFF54 => (self.dest & 0xF0) as u8,
            0xFF55 if self.active => self.blocks_left.wrapping_sub(1) & 0x7F,
            0xFF55 if self.cancelled => 0x80 | (self.blocks_left.wrapping_sub(1) & 0x7F),
            _ => 0xFF,
        }
    }

    pub fn write(&mut self, addr: u16, val: u8) -> HdmaCommand {
        // Address registers are frozen while an HBlank transfer runs.
        if addr != 0xFF55 && self.active {
            return HdmaCommand::None;
        }
        match addr {
            0xFF51 => self.source = ((val as u16) << 8) | (self.source & 0x00F0),
            0xFF52 => self.source = (self.source & 0xFF00) | (val & 0xF0) as u16,
            0xFF53 => self.dest = vram_dest(((val as u16) << 8) | (self.dest & 0x00F0)),
            0xFF54 => self.dest = vram_dest((self.dest & 0x1F00) | (val & 0xF0) as u16),
            0xFF55 => return self.control(val),
            _ => {}
        }
        HdmaCommand::None
    }

    fn control(&mut self, val: u8) -> HdmaCommand {
        if self.is_hblank_active() && val & 0x80 == 0 {
            self.active = false;
            self.cancelled = true;
            debug!("HDMA cancelled with {} blocks left", self.blocks_left);
            return HdmaCommand::Cancelled;
        }

        self.blocks_left = (val & 0x7F) + 1;
        self.cancelled = false;
        self.active = true;
        if val & 0x80 == 0 {
            self.mode = HdmaMode::General;
            debug!(
                "GDMA {:04X} -> {:04X}, {} blocks",
                self.source, self.dest, self.blocks_left
            );
            HdmaCommand::RunGeneral
        } else {
            self.mode = HdmaMode::HBlank;
            debug!(
                "HDMA {:04X} -> {:04X}, {} blocks",
                self.source, self.dest, self.blocks_left
            );
            HdmaCommand::StartHBlank
        }
    }

    /// Claim the next block and advance the cursors past it.
    pub fn next_block(&mut self) -> Option<HdmaBlock> {
        if !self.active || self.blocks_left == 0 {
            return None;
        }
        let block = HdmaBlock {
            source: self.source,
            dest: self.dest,
        };
        self.source = self.source.wrapping_add(HDMA_BLOCK_LEN);
        self.dest = vram_dest(self.dest.wrapping_add(HDMA_BLOCK_LEN));
        self.blocks_left -= 1;
        if self.blocks_left == 0 {
            self.active = false;
        }
        Some(block)
    }

    /// Bus steps the CPU is stalled for each block copied.
    pub fn stall_steps_per_block(double_speed: bool) -> u32 {
        if double_speed { 16 } else { 8 }
    }
}

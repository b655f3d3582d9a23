//! The memory bus: address decoding, boot ROM overlay, DMA arbitration and
//! the clock that drives every peripheral.

use log::{info, warn};

use crate::apu::Apu;
use crate::cartridge::Cartridge;
use crate::dma::{HDMA_BLOCK_LEN, Hdma, HdmaCommand, OamDma};
use crate::error::{EmuError, Result};
use crate::hardware::{Model, Speed};
use crate::interrupts::InterruptController;
use crate::joypad::Joypad;
use crate::memory_map::{self, IoRegister, Region};
use crate::ppu::Ppu;
use crate::serial::Serial;
use crate::timer::Timer;

/// T-cycles per bus access.
pub const CYCLES_PER_STEP: u32 = 4;

const WRAM_BANK_SIZE: usize = 0x1000;
const HRAM_SIZE: usize = 0x7F;

pub struct Bus {
    model: Model,
    speed: Speed,
    /// KEY1 bit 0: a speed switch happens on the next STOP.
    speed_switch_armed: bool,

    cartridge: Option<Cartridge>,
    boot_rom: Option<Vec<u8>>,
    boot_rom_locked: bool,

    wram: Box<[[u8; WRAM_BANK_SIZE]; 8]>,
    wram_bank: usize,
    hram: [u8; HRAM_SIZE],

    interrupts: InterruptController,
    timer: Timer,
    serial: Serial,
    joypad: Joypad,
    ppu: Ppu,
    apu: Apu,
    oam_dma: OamDma,
    hdma: Hdma,

    cycles: u64,
    /// Bus steps owed to a VRAM DMA, paid at the next instruction boundary.
    stall_steps: u32,
}

impl Bus {
    pub fn new(model: Model) -> Self {
        Self {
            model,
            speed: Speed::Normal,
            speed_switch_armed: false,
            cartridge: None,
            boot_rom: None,
            boot_rom_locked: false,
            wram: Box::new([[0; WRAM_BANK_SIZE]; 8]),
            wram_bank: 1,
            hram: [0; HRAM_SIZE],
            interrupts: InterruptController::new(),
            timer: Timer::new(),
            serial: Serial::new(model),
            joypad: Joypad::new(),
            ppu: Ppu::new(model),
            apu: Apu::new(),
            oam_dma: OamDma::new(),
            hdma: Hdma::new(),
            cycles: 0,
            stall_steps: 0,
        }
    }

    pub fn model(&self) -> Model {
        self.model
    }

    pub fn speed(&self) -> Speed {
        self.speed
    }

    /// T-cycles elapsed since power on.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn insert_cartridge(&mut self, cartridge: Cartridge) {
        self.cartridge = Some(cartridge);
    }

    pub fn cartridge(&self) -> Option<&Cartridge> {
        self.cartridge.as_ref()
    }

    pub fn cartridge_mut(&mut self) -> Option<&mut Cartridge> {
        self.cartridge.as_mut()
    }

    pub fn take_cartridge(&mut self) -> Option<Cartridge> {
        self.cartridge.take()
    }

    pub fn load_boot_rom(&mut self, rom: Vec<u8>) {
        info!("{} boot ROM mapped ({} bytes)", self.model.name(), rom.len());
        self.boot_rom = Some(rom);
        self.boot_rom_locked = false;
    }

    pub fn take_boot_rom(&mut self) -> Option<Vec<u8>> {
        self.boot_rom.take()
    }

    pub fn boot_rom_mapped(&self) -> bool {
        self.boot_rom.is_some() && !self.boot_rom_locked
    }

    /// I/O state the boot ROM would have left behind, for starting
    /// straight at the cartridge entry point.
    pub fn apply_post_boot_state(&mut self) {
        self.boot_rom_locked = true;
        self.timer.set_divider(self.model.post_boot_divider());
        self.ppu.apply_post_boot_state();
        self.apu.apply_post_boot_state();
        self.interrupts.write_if(0x01);
    }

    pub fn interrupts(&self) -> &InterruptController {
        &self.interrupts
    }

    pub fn interrupts_mut(&mut self) -> &mut InterruptController {
        &mut self.interrupts
    }

    pub fn timer(&self) -> &Timer {
        &self.timer
    }

    pub fn ppu(&self) -> &Ppu {
        &self.ppu
    }

    pub fn ppu_mut(&mut self) -> &mut Ppu {
        &mut self.ppu
    }

    pub fn serial_mut(&mut self) -> &mut Serial {
        &mut self.serial
    }

    pub fn joypad(&self) -> &Joypad {
        &self.joypad
    }

    pub fn joypad_mut(&mut self) -> &mut Joypad {
        &mut self.joypad
    }

    pub fn oam_dma(&self) -> &OamDma {
        &self.oam_dma
    }

    /// Joypad interrupt check, run once per instruction.
    pub fn update_joypad(&mut self) {
        self.joypad.update_joypad(&mut self.interrupts);
    }

    /// Read a byte.
    ///
    /// `should_step` advances the clock one bus step before the access.
    /// `has_priority` marks the DMA engine itself, which is never locked out.
    pub fn load(&mut self, addr: u16, should_step: bool, has_priority: bool) -> Result<u8> {
        if should_step {
            self.step()?;
        }
        if let Some(byte) = self.boot_rom_byte(addr) {
            return Ok(byte);
        }
        if !has_priority && self.oam_dma.is_active() && addr < memory_map::IO.start {
            return Ok(0xFF);
        }
        self.dispatch_load(addr)
    }

    /// Write a byte. Same flags as [`load`](Self::load).
    pub fn store(&mut self, addr: u16, val: u8, should_step: bool, has_priority: bool) -> Result<()> {
        if should_step {
            self.step()?;
        }
        if !has_priority && self.oam_dma.is_active() && addr < memory_map::IO.start {
            return Ok(());
        }
        self.dispatch_store(addr, val)
    }

    /// Little-endian 16-bit read: low byte at `addr`.
    pub fn load16(&mut self, addr: u16, should_step: bool, has_priority: bool) -> Result<u16> {
        let lo = self.load(addr, should_step, has_priority)?;
        let hi = self.load(addr.wrapping_add(1), should_step, has_priority)?;
        Ok(u16::from_le_bytes([lo, hi]))
    }

    pub fn store16(&mut self, addr: u16, val: u16, should_step: bool, has_priority: bool) -> Result<()> {
        let [lo, hi] = val.to_le_bytes();
        self.store(addr, lo, should_step, has_priority)?;
        self.store(addr.wrapping_add(1), hi, should_step, has_priority)
    }

    /// Untimed CPU-side read, for frontends and tests.
    pub fn read_byte(&mut self, addr: u16) -> Result<u8> {
        self.load(addr, false, false)
    }

    /// Untimed CPU-side write, for frontends and tests.
    pub fn write_byte(&mut self, addr: u16, val: u8) -> Result<()> {
        self.store(addr, val, false, false)
    }

    fn boot_rom_byte(&self, addr: u16) -> Option<u8> {
        if !self.boot_rom_mapped() {
            return None;
        }
        let rom = self.boot_rom.as_deref()?;
        // The CGB image skips 0x100-0x1FF so the cartridge header shows through.
        let overlaid = addr < 0x0100 || (self.model.is_cgb() && (0x0200..0x0900).contains(&addr));
        if overlaid {
            rom.get(addr as usize).copied()
        } else {
            None
        }
    }

    fn dispatch_load(&mut self, addr: u16) -> Result<u8> {
        let region = memory_map::classify(addr).ok_or(EmuError::UnhandledAddress { address: addr })?;
        let offset = region.range().offset(addr);
        Ok(match region {
            Region::RomBank0 | Region::RomBankN | Region::ExternalRam => {
                self.cartridge.as_ref().map_or(0xFF, |cart| cart.load(addr))
            }
            Region::VideoRam => self.ppu.vram_load(addr),
            Region::WorkRam0 => self.wram[0][offset],
            Region::WorkRamN => self.wram[self.wram_bank][offset],
            Region::EchoRam => return self.dispatch_load(addr - 0x2000),
            Region::Oam => self.ppu.oam_load(addr),
            Region::Unusable => {
                warn!("read from unusable address {addr:04X}");
                0x00
            }
            Region::Io => self.read_io(addr),
            Region::HighRam => self.hram[offset],
            Region::InterruptEnable => self.interrupts.read_ie(),
        })
    }

    fn dispatch_store(&mut self, addr: u16, val: u8) -> Result<()> {
        let region = memory_map::classify(addr).ok_or(EmuError::UnhandledAddress { address: addr })?;
        let offset = region.range().offset(addr);
        match region {
            Region::RomBank0 | Region::RomBankN | Region::ExternalRam => {
                if let Some(cart) = self.cartridge.as_mut() {
                    cart.store(addr, val);
                }
            }
            Region::VideoRam => self.ppu.vram_store(addr, val),
            Region::WorkRam0 => self.wram[0][offset] = val,
            Region::WorkRamN => self.wram[self.wram_bank][offset] = val,
            Region::EchoRam => return self.dispatch_store(addr - 0x2000, val),
            Region::Oam => self.ppu.oam_store(addr, val),
            Region::Unusable => warn!("write {val:02X} to unusable address {addr:04X}"),
            Region::Io => self.write_io(addr, val)?,
            Region::HighRam => self.hram[offset] = val,
            Region::InterruptEnable => self.interrupts.write_ie(val),
        }
        Ok(())
    }

    fn read_io(&mut self, addr: u16) -> u8 {
        let cgb = self.model.is_cgb();
        match memory_map::classify_io(addr) {
            IoRegister::Joypad => self.joypad.read(),
            IoRegister::Serial => self.serial.read(addr),
            IoRegister::Timer => self.timer.read(addr),
            IoRegister::InterruptFlag => self.interrupts.read_if(),
            IoRegister::Sound => self.apu.read(addr),
            IoRegister::Lcd | IoRegister::Palettes => self.ppu.read(addr),
            IoRegister::OamDma => self.oam_dma.register(),
            IoRegister::SpeedSwitch if cgb => {
                let current = if self.speed == Speed::Double { 0x80 } else { 0 };
                0x7E | current | self.speed_switch_armed as u8
            }
            IoRegister::VramBank => self.ppu.read_vram_bank(),
            IoRegister::BootRomLock => 0xFE | self.boot_rom_locked as u8,
            IoRegister::Hdma if cgb => self.hdma.read(addr),
            IoRegister::WramBank if cgb => 0xF8 | self.wram_bank as u8,
            IoRegister::SpeedSwitch | IoRegister::Hdma | IoRegister::WramBank => 0xFF,
            IoRegister::Unmapped => {
                warn!("read from unimplemented I/O register {addr:04X}");
                0xFF
            }
        }
    }

    fn write_io(&mut self, addr: u16, val: u8) -> Result<()> {
        let cgb = self.model.is_cgb();
        match memory_map::classify_io(addr) {
            IoRegister::Joypad => self.joypad.write(val),
            IoRegister::Serial => self.serial.write(addr, val),
            IoRegister::Timer => self.timer.write(addr, val, &mut self.interrupts),
            IoRegister::InterruptFlag => self.interrupts.write_if(val),
            IoRegister::Sound => self.apu.write(addr, val),
            IoRegister::Lcd => {
                let was_on = self.ppu.lcd_enabled();
                self.ppu.write(addr, val, &mut self.interrupts);
                // Switching the LCD off flushes a pending HBlank transfer.
                if was_on && !self.ppu.lcd_enabled() {
                    while self.hdma.is_hblank_active() {
                        self.run_hdma_block()?;
                    }
                }
            }
            IoRegister::Palettes => self.ppu.write(addr, val, &mut self.interrupts),
            IoRegister::OamDma => self.oam_dma.start(val),
            IoRegister::SpeedSwitch if cgb => self.speed_switch_armed = val & 0x01 != 0,
            IoRegister::VramBank => self.ppu.set_vram_bank(val),
            IoRegister::BootRomLock => {
                if val & 0x01 != 0 && !self.boot_rom_locked {
                    info!("boot ROM unmapped");
                    self.boot_rom_locked = true;
                }
            }
            IoRegister::Hdma if cgb => match self.hdma.write(addr, val) {
                HdmaCommand::RunGeneral => {
                    while self.hdma.blocks_left() > 0 {
                        self.run_hdma_block()?;
                    }
                }
                HdmaCommand::StartHBlank => {
                    if !self.ppu.lcd_enabled() || self.ppu.in_hblank() {
                        self.run_hdma_block()?;
                    }
                }
                HdmaCommand::Cancelled | HdmaCommand::None => {}
            },
            IoRegister::WramBank if cgb => {
                self.wram_bank = match val & 0x07 {
                    0 => 1,
                    bank => bank as usize,
                };
            }
            IoRegister::SpeedSwitch | IoRegister::Hdma | IoRegister::WramBank => {}
            IoRegister::Unmapped => warn!("write {val:02X} to unimplemented I/O register {addr:04X}"),
        }
        Ok(())
    }

    /// Copy one 16-byte VRAM DMA block and charge its stall.
    fn run_hdma_block(&mut self) -> Result<()> {
        let Some(block) = self.hdma.next_block() else {
            return Ok(());
        };
        for i in 0..HDMA_BLOCK_LEN {
            let byte = self.load(block.source.wrapping_add(i), false, true)?;
            self.ppu.vram_store(block.dest.wrapping_add(i), byte);
        }
        self.stall_steps += Hdma::stall_steps_per_block(self.speed == Speed::Double);
        Ok(())
    }

    /// Pending VRAM DMA stall, in bus steps. Resets the counter.
    pub fn take_stall_steps(&mut self) -> u32 {
        std::mem::take(&mut self.stall_steps)
    }

    /// Advance every peripheral by one bus step (4 T-cycles).
    pub fn step(&mut self) -> Result<()> {
        self.cycles += CYCLES_PER_STEP as u64;

        let prev_div = self.timer.divider();
        self.timer.step(CYCLES_PER_STEP, &mut self.interrupts);
        self.serial
            .step(prev_div, self.timer.divider(), &mut self.interrupts);

        if let Some(transfer) = self.oam_dma.tick() {
            let byte = self.load(transfer.source, false, true)?;
            self.ppu.oam_dma_store(transfer.oam_index, byte);
        }

        let dots = self.speed.dots_per_bus_step();
        self.apu.step(dots);
        if self.ppu.step(dots, &mut self.interrupts) && self.hdma.is_hblank_active() {
            self.run_hdma_block()?;
        }
        Ok(())
    }

    /// STOP with KEY1 armed on a CGB. Returns whether the speed changed.
    pub fn try_speed_switch(&mut self) -> bool {
        if !self.model.is_cgb() || !self.speed_switch_armed {
            return false;
        }
        self.speed = self.speed.toggled();
        self.speed_switch_armed = false;
        self.timer.reset_div(&mut self.interrupts);
        info!("switched to {:?} speed", self.speed);
        true
    }

    /// DIV reset done by STOP when no speed switch is pending.
    pub fn reset_divider(&mut self) {
        self.timer.reset_div(&mut self.interrupts);
    }
}

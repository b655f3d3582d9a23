//! Bank controller variants.
//!
//! Every variant answers the same three questions (which ROM bank sits at
//! 0x0000, which at 0x4000, what the 0xA000 window currently maps) and
//! handles writes to its control registers. The byte-level windowing that
//! follows from those answers lives in the free functions at the bottom.

use std::time::SystemTime;

use log::{debug, warn};

use super::header::ControllerFamily;
use super::rtc::RealTimeClock;

pub const ROM_BANK_SIZE: usize = 0x4000;
pub const RAM_BANK_SIZE: usize = 0x2000;

/// What the external RAM window is wired to right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RamMapping {
    Disabled,
    Bank(usize),
    /// An MBC3 clock register (0x08-0x0C).
    Rtc(u8),
    /// MBC3 select value that maps nothing.
    Open,
}

#[derive(Debug, Default)]
pub struct Mbc1 {
    ram_enabled: bool,
    /// 5-bit primary bank register, never 0.
    bank1: u8,
    /// 2-bit secondary register: upper ROM bank bits or RAM bank.
    bank2: u8,
    /// Mode 1 routes `bank2` to the 0x0000 window and to RAM.
    advanced_mode: bool,
}

#[derive(Debug)]
pub struct Mbc3 {
    ram_enabled: bool,
    rom_bank: u8,
    select: u8,
    rtc: Option<RealTimeClock>,
}

#[derive(Debug, Default)]
pub struct Mbc5 {
    ram_enabled: bool,
    /// 9-bit bank; bank 0 is allowed in the switchable window.
    rom_bank: u16,
    ram_bank: u8,
}

#[derive(Debug)]
pub enum BankController {
    PlainRom,
    Mbc1(Mbc1),
    Mbc3(Mbc3),
    Mbc5(Mbc5),
}

impl BankController {
    pub fn new(family: ControllerFamily, rtc: Option<RealTimeClock>) -> Self {
        match family {
            ControllerFamily::Plain => BankController::PlainRom,
            ControllerFamily::Mbc1 => BankController::Mbc1(Mbc1 {
                bank1: 1,
                ..Mbc1::default()
            }),
            ControllerFamily::Mbc3 => BankController::Mbc3(Mbc3 {
                ram_enabled: false,
                rom_bank: 1,
                select: 0,
                rtc,
            }),
            ControllerFamily::Mbc5 => BankController::Mbc5(Mbc5 {
                rom_bank: 1,
                ..Mbc5::default()
            }),
        }
    }

    /// Bank mapped at 0x0000-0x3FFF.
    pub fn rom_bank0(&self) -> usize {
        match self {
            BankController::Mbc1(m) if m.advanced_mode => (m.bank2 as usize) << 5,
            _ => 0,
        }
    }

    /// Bank mapped at 0x4000-0x7FFF.
    pub fn rom_bank_n(&self) -> usize {
        match self {
            BankController::PlainRom => 1,
            BankController::Mbc1(m) => ((m.bank2 as usize) << 5) | m.bank1 as usize,
            BankController::Mbc3(m) => m.rom_bank as usize,
            BankController::Mbc5(m) => m.rom_bank as usize,
        }
    }

    pub fn ram_mapping(&self) -> RamMapping {
        match self {
            // Plain ROM+RAM carts have no enable latch.
            BankController::PlainRom => RamMapping::Bank(0),
            BankController::Mbc1(m) if !m.ram_enabled => RamMapping::Disabled,
            BankController::Mbc1(m) => {
                RamMapping::Bank(if m.advanced_mode { m.bank2 as usize } else { 0 })
            }
            BankController::Mbc3(m) if !m.ram_enabled => RamMapping::Disabled,
            BankController::Mbc3(m) => match m.select {
                0x00..=0x03 => RamMapping::Bank(m.select as usize),
                0x08..=0x0C => RamMapping::Rtc(m.select),
                _ => RamMapping::Open,
            },
            BankController::Mbc5(m) if !m.ram_enabled => RamMapping::Disabled,
            BankController::Mbc5(m) => RamMapping::Bank(m.ram_bank as usize),
        }
    }

    /// Write to the control window 0x0000-0x7FFF.
    pub fn write_control(&mut self, addr: u16, val: u8, now: SystemTime) {
        match self {
            BankController::PlainRom => {}
            BankController::Mbc1(m) => match addr {
                0x0000..=0x1FFF => m.ram_enabled = val & 0x0F == 0x0A,
                0x2000..=0x3FFF => m.bank1 = nonzero_bank(val & 0x1F),
                0x4000..=0x5FFF => m.bank2 = val & 0x03,
                _ => m.advanced_mode = val & 0x01 != 0,
            },
            BankController::Mbc3(m) => match addr {
                0x0000..=0x1FFF => m.ram_enabled = val & 0x0F == 0x0A,
                0x2000..=0x3FFF => m.rom_bank = nonzero_bank(val & 0x7F),
                0x4000..=0x5FFF => m.select = val,
                _ => match m.rtc.as_mut() {
                    Some(rtc) => rtc.write_latch(val, now),
                    None => debug!("RTC latch write {val:02X} on a cartridge without a clock"),
                },
            },
            BankController::Mbc5(m) => match addr {
                0x0000..=0x1FFF => m.ram_enabled = val == 0x0A,
                0x2000..=0x2FFF => m.rom_bank = (m.rom_bank & 0x100) | val as u16,
                0x3000..=0x3FFF => m.rom_bank = (m.rom_bank & 0xFF) | ((val as u16 & 1) << 8),
                0x4000..=0x5FFF => m.ram_bank = val & 0x0F,
                _ => {}
            },
        }
    }

    pub fn read_rtc(&self, select: u8) -> u8 {
        match self.rtc() {
            Some(rtc) => rtc.read(select),
            None => {
                warn!("RTC register {select:02X} read on a cartridge without a clock");
                0xFF
            }
        }
    }

    pub fn write_rtc(&mut self, select: u8, val: u8, now: SystemTime) {
        match self.rtc_mut() {
            Some(rtc) => rtc.write(select, val, now),
            None => warn!("RTC register {select:02X} write on a cartridge without a clock"),
        }
    }

    pub fn rtc(&self) -> Option<&RealTimeClock> {
        match self {
            BankController::Mbc3(Mbc3 { rtc: Some(rtc), .. }) => Some(rtc),
            _ => None,
        }
    }

    pub fn rtc_mut(&mut self) -> Option<&mut RealTimeClock> {
        match self {
            BankController::Mbc3(Mbc3 { rtc: Some(rtc), .. }) => Some(rtc),
            _ => None,
        }
    }
}

fn nonzero_bank(bank: u8) -> u8 {
    if bank == 0 { 1 } else { bank }
}

/// Byte offset into the ROM image for `addr` inside a 16 KiB window.
/// Banks past the end of the image wrap, as the unused address lines do.
pub fn rom_offset(rom_len: usize, bank: usize, addr: u16) -> usize {
    let banks = rom_len.div_ceil(ROM_BANK_SIZE).max(1);
    (bank % banks) * ROM_BANK_SIZE + (addr as usize & (ROM_BANK_SIZE - 1))
}

/// Byte offset into external RAM for `addr` in 0xA000-0xBFFF, or `None`
/// when the cartridge has no RAM.
pub fn ram_offset(ram_len: usize, bank: usize, addr: u16) -> Option<usize> {
    if ram_len == 0 {
        return None;
    }
    let offset = bank * RAM_BANK_SIZE + (addr as usize & (RAM_BANK_SIZE - 1));
    Some(offset % ram_len)
}

pub fn read_rom(rom: &[u8], bank: usize, addr: u16) -> u8 {
    rom.get(rom_offset(rom.len(), bank, addr))
        .copied()
        .unwrap_or(0xFF)
}

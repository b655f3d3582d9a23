//! Cartridge ROM/RAM and bank controllers.

mod header;
mod mbc;
mod rtc;

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::error::{EmuError, Result};

pub use header::{CartridgeHeader, CartridgeKind, CgbSupport, ControllerFamily, Destination};
pub use mbc::{BankController, RamMapping};
pub use rtc::{HostClock, ManualClock, RTC_SAVE_LEN, RealTimeClock, RtcRegisters, SystemClock};

pub struct Cartridge {
    header: CartridgeHeader,
    rom: Vec<u8>,
    ram: Vec<u8>,
    controller: BankController,
    save_path: Option<PathBuf>,
    clock: Box<dyn HostClock>,
}

impl fmt::Debug for Cartridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cartridge")
            .field("title", &self.header.title)
            .field("kind", &self.header.kind)
            .field("rom_len", &self.rom.len())
            .field("ram_len", &self.ram.len())
            .field("controller", &self.controller)
            .field("save_path", &self.save_path)
            .finish_non_exhaustive()
    }
}

impl Cartridge {
    pub fn from_bytes(rom: Vec<u8>) -> Result<Self> {
        Self::with_clock(rom, Box::new(SystemClock))
    }

    /// Build a cartridge whose RTC (if any) reads time from `clock`.
    pub fn with_clock(rom: Vec<u8>, clock: Box<dyn HostClock>) -> Result<Self> {
        let header = CartridgeHeader::parse(&rom)?;
        let family = header
            .kind
            .family()
            .ok_or(EmuError::UnsupportedCartridge {
                code: header.kind_code,
                kind: header.kind,
            })?;

        if let Some(declared) = header.rom_size()
            && declared != rom.len()
        {
            warn!(
                "ROM header declares {declared:#X} bytes but the image has {:#X}",
                rom.len()
            );
        }
        if header.kind.has_rumble() {
            debug!("rumble motor is not emulated");
        }
        if !header.header_checksum_valid() {
            warn!("header checksum mismatch for \"{}\"", header.title);
        }

        let rtc = header
            .kind
            .has_rtc()
            .then(|| RealTimeClock::new(clock.now()));
        let ram = vec![0; header.ram_size()];

        info!(
            "cartridge \"{}\": {:?}, {} KiB ROM, {} KiB RAM",
            header.title,
            header.kind,
            rom.len() / 1024,
            ram.len() / 1024
        );

        Ok(Self {
            controller: BankController::new(family, rtc),
            header,
            rom,
            ram,
            save_path: None,
            clock,
        })
    }

    /// Load a ROM file. Battery-backed carts pick up `<rom>.sav` if present.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let rom = fs::read(path).map_err(|e| EmuError::io(path, e))?;
        let mut cart = Self::from_bytes(rom)?;
        if cart.has_battery() {
            cart.save_path = Some(path.with_extension("sav"));
            cart.load_external_ram_from_save_file()?;
        }
        Ok(cart)
    }

    pub fn set_save_path(&mut self, path: impl Into<PathBuf>) {
        self.save_path = Some(path.into());
    }

    pub fn save_path(&self) -> Option<&Path> {
        self.save_path.as_deref()
    }

    pub fn header(&self) -> &CartridgeHeader {
        &self.header
    }

    pub fn title(&self) -> &str {
        &self.header.title
    }

    pub fn controller(&self) -> &BankController {
        &self.controller
    }

    pub fn external_ram(&self) -> &[u8] {
        &self.ram
    }

    pub fn has_battery(&self) -> bool {
        self.header.kind.has_battery()
    }

    pub fn has_rtc(&self) -> bool {
        self.controller.rtc().is_some()
    }

    pub fn rtc(&self) -> Option<&RealTimeClock> {
        self.controller.rtc()
    }

    pub fn rtc_mut(&mut self) -> Option<&mut RealTimeClock> {
        self.controller.rtc_mut()
    }

    /// Read from 0x0000-0x7FFF or 0xA000-0xBFFF.
    pub fn load(&self, addr: u16) -> u8 {
        match addr {
            0x0000..=0x3FFF => mbc::read_rom(&self.rom, self.controller.rom_bank0(), addr),
            0x4000..=0x7FFF => mbc::read_rom(&self.rom, self.controller.rom_bank_n(), addr),
            0xA000..=0xBFFF => match self.controller.ram_mapping() {
                RamMapping::Bank(bank) => mbc::ram_offset(self.ram.len(), bank, addr)
                    .map_or(0xFF, |i| self.ram[i]),
                RamMapping::Rtc(select) => self.controller.read_rtc(select),
                RamMapping::Disabled | RamMapping::Open => 0xFF,
            },
            _ => 0xFF,
        }
    }

    /// Write to the control registers (0x0000-0x7FFF) or external RAM.
    pub fn store(&mut self, addr: u16, val: u8) {
        match addr {
            0x0000..=0x7FFF => {
                let now = self.clock.now();
                self.controller.write_control(addr, val, now);
                debug!(
                    "bank write {addr:04X}={val:02X}: rom {}/{} ram {:?}",
                    self.controller.rom_bank0(),
                    self.controller.rom_bank_n(),
                    self.controller.ram_mapping()
                );
            }
            0xA000..=0xBFFF => match self.controller.ram_mapping() {
                RamMapping::Bank(bank) => {
                    if let Some(i) = mbc::ram_offset(self.ram.len(), bank, addr) {
                        self.ram[i] = val;
                    }
                }
                RamMapping::Rtc(select) => {
                    let now = self.clock.now();
                    self.controller.write_rtc(select, val, now);
                }
                RamMapping::Disabled | RamMapping::Open => {}
            },
            _ => {}
        }
    }

    /// Restore external RAM (and the clock block for MBC3+TIMER) from the
    /// save file. A missing file just means this is the first run.
    pub fn load_external_ram_from_save_file(&mut self) -> Result<()> {
        let Some(path) = self.save_path.clone() else {
            return Ok(());
        };
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!("no save file at {}, starting fresh", path.display());
                return Ok(());
            }
            Err(e) => return Err(EmuError::io(path, e)),
        };

        let ram_len = self.ram.len().min(bytes.len());
        self.ram[..ram_len].copy_from_slice(&bytes[..ram_len]);

        let now = self.clock.now();
        if let Some(rtc) = self.controller.rtc_mut() {
            let tail = bytes.get(self.ram.len()..).unwrap_or_default();
            if rtc.load_save_bytes(tail) {
                rtc.update(now);
            } else {
                warn!(
                    "save file {} has no clock block; RTC starts from zero",
                    path.display()
                );
            }
        }
        info!("loaded {} bytes from {}", bytes.len(), path.display());
        Ok(())
    }

    /// Write external RAM, followed by the clock block when there is one.
    pub fn save_external_ram(&mut self) -> Result<()> {
        let Some(path) = self.save_path.clone() else {
            debug!("no save path set; skipping save");
            return Ok(());
        };
        if !self.has_battery() {
            return Ok(());
        }

        let mut out = self.ram.clone();
        let now = self.clock.now();
        if let Some(rtc) = self.controller.rtc_mut() {
            rtc.update(now);
            out.extend_from_slice(&rtc.to_save_bytes());
        }
        fs::write(&path, &out).map_err(|e| EmuError::io(&path, e))?;
        info!("saved {} bytes to {}", out.len(), path.display());
        Ok(())
    }
}

use std::fs;

use log::{error, info, warn};

use crate::{
    bus::{Bus, CYCLES_PER_STEP},
    cartridge::Cartridge,
    config::EmuConfig,
    cpu::Cpu,
    error::{EmuError, Result},
    hardware::Model,
    joypad::Button,
    ppu::FRAME_DOTS,
    trace::LogTracer,
};

/// A complete machine: CPU plus the bus that owns every other device.
pub struct GameBoy {
    pub cpu: Cpu,
    pub bus: Bus,
    config: EmuConfig,
}

impl GameBoy {
    /// An empty machine. The model follows `config.mode`, falling back to
    /// DMG until a cartridge header says otherwise.
    pub fn new(config: EmuConfig) -> Self {
        let model = config.mode.resolve(false);
        let mut gb = Self {
            cpu: Cpu::default(),
            bus: Bus::new(model),
            config,
        };
        gb.power_up(model, None, None);
        gb
    }

    pub fn model(&self) -> Model {
        self.bus.model()
    }

    pub fn config(&self) -> &EmuConfig {
        &self.config
    }

    /// Insert `cartridge`, picking the model from its header and the
    /// configured mode. A boot ROM already loaded is kept unless the model
    /// changes, since it was checked against the old model.
    pub fn load_cartridge(&mut self, cartridge: Cartridge) {
        let model = self
            .config
            .mode
            .resolve(cartridge.header().cgb_support.supports_cgb());
        let mut boot_rom = self.bus.take_boot_rom();
        if boot_rom.is_some() && model != self.model() {
            warn!(
                "dropping {} boot ROM: cartridge runs as {}",
                self.model().name(),
                model.name()
            );
            boot_rom = None;
        }
        self.power_up(model, Some(cartridge), boot_rom);
    }

    /// Map a boot ROM and restart from 0x0000.
    pub fn load_boot_rom(&mut self, rom: Vec<u8>) -> Result<()> {
        let model = self.model();
        if rom.len() < model.boot_rom_len() {
            return Err(EmuError::InvalidRom {
                reason: format!(
                    "{} boot ROM must be {:#X} bytes, got {:#X}",
                    model.name(),
                    model.boot_rom_len(),
                    rom.len()
                ),
            });
        }
        let cartridge = self.bus.take_cartridge();
        self.power_up(model, cartridge, Some(rom));
        Ok(())
    }

    /// Insert `cartridge` and load whichever boot ROM the configuration
    /// names for the resolved model.
    pub fn insert_from_config(&mut self, cartridge: Cartridge) -> Result<()> {
        self.load_cartridge(cartridge);
        let model = self.model();

        match self.config.boot_rom_path(model).cloned() {
            Some(path) => {
                let rom = fs::read(&path).map_err(|e| EmuError::io(&path, e))?;
                info!("loaded {} boot ROM from {}", model.name(), path.display());
                self.load_boot_rom(rom)
            }
            None if self.config.boot_rom_required(model) => Err(EmuError::MissingBootRom {
                model: model.name(),
            }),
            None => {
                info!("no boot ROM configured; starting at 0x0100");
                Ok(())
            }
        }
    }

    /// Power-cycle, keeping the cartridge and boot ROM.
    pub fn reset(&mut self) {
        let cartridge = self.bus.take_cartridge();
        let boot_rom = self.bus.take_boot_rom();
        self.power_up(self.model(), cartridge, boot_rom);
    }

    /// Execute one instruction. Returns the T-cycles it took, including any
    /// interrupt dispatch and DMA stall.
    pub fn step(&mut self) -> Result<u32> {
        if self.bus.cartridge().is_none() && !self.bus.boot_rom_mapped() {
            return Err(EmuError::MissingCartridge);
        }
        self.cpu.step(&mut self.bus)
    }

    /// Run until the PPU finishes a frame, or one frame's worth of time if
    /// the LCD is off.
    pub fn emulate(&mut self) -> Result<()> {
        let budget =
            FRAME_DOTS as u64 * CYCLES_PER_STEP as u64 / self.bus.speed().dots_per_bus_step() as u64;
        let start = self.bus.cycles();
        self.bus.ppu_mut().clear_frame_ready();

        while self.bus.cycles() - start < budget {
            self.step()?;
            if self.bus.ppu().frame_ready() {
                self.bus.ppu_mut().clear_frame_ready();
                break;
            }
        }
        Ok(())
    }

    pub fn save_external_ram(&mut self) -> Result<()> {
        match self.bus.cartridge_mut() {
            Some(cart) => cart.save_external_ram(),
            None => Ok(()),
        }
    }

    /// Bytes shifted out over the link port since the last call.
    pub fn take_serial_output(&mut self) -> Vec<u8> {
        self.bus.serial_mut().take_output()
    }

    pub fn set_button(&mut self, button: Button, pressed: bool) {
        self.bus.joypad_mut().set_button(button, pressed);
    }

    fn power_up(&mut self, model: Model, cartridge: Option<Cartridge>, boot_rom: Option<Vec<u8>>) {
        self.bus = Bus::new(model);
        if let Some(cart) = cartridge {
            info!("inserted \"{}\" ({:?})", cart.title(), cart.header().kind);
            if model.is_cgb() && !cart.header().cgb_support.supports_cgb() {
                warn!("running a DMG-only cartridge in CGB mode");
            }
            self.bus.insert_cartridge(cart);
        }

        self.cpu = match boot_rom {
            Some(rom) => {
                self.bus.load_boot_rom(rom);
                Cpu::default()
            }
            None => {
                self.bus.apply_post_boot_state();
                Cpu::post_boot(model)
            }
        };

        if self.config.trace_instructions {
            self.cpu.set_tracer(Some(Box::new(LogTracer)));
        }
    }
}

impl Drop for GameBoy {
    fn drop(&mut self) {
        if !self.config.save_on_exit {
            return;
        }
        if let Err(e) = self.save_external_ram() {
            error!("failed to save cartridge RAM: {e}");
        }
    }
}

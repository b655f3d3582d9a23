use std::path::PathBuf;

use crate::hardware::Model;

/// Which console to emulate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmulationMode {
    /// Follow the cartridge header's CGB flag.
    #[default]
    Auto,
    ForceDmg,
    ForceCgb,
}

impl EmulationMode {
    pub fn resolve(self, header_supports_cgb: bool) -> Model {
        match self {
            EmulationMode::Auto if header_supports_cgb => Model::Cgb,
            EmulationMode::Auto | EmulationMode::ForceDmg => Model::Dmg,
            EmulationMode::ForceCgb => Model::Cgb,
        }
    }
}

/// Startup configuration for a [`GameBoy`](crate::gameboy::GameBoy).
///
/// Built once by the frontend and handed to the machine by value.
#[derive(Debug, Clone, Default)]
pub struct EmuConfig {
    pub mode: EmulationMode,
    pub dmg_boot_rom: Option<PathBuf>,
    pub cgb_boot_rom: Option<PathBuf>,
    /// Treat a missing DMG boot ROM as fatal too. CGB always needs one.
    pub require_boot_rom: bool,
    /// Log every executed instruction at trace level.
    pub trace_instructions: bool,
    /// Write battery-backed RAM back to disk when the machine is dropped.
    pub save_on_exit: bool,
}

impl EmuConfig {
    pub fn boot_rom_path(&self, model: Model) -> Option<&PathBuf> {
        match model {
            Model::Dmg => self.dmg_boot_rom.as_ref(),
            Model::Cgb => self.cgb_boot_rom.as_ref(),
        }
    }

    pub fn boot_rom_required(&self, model: Model) -> bool {
        model.is_cgb() || self.require_boot_rom
    }
}

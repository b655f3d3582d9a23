/// Console model being emulated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Model {
    #[default]
    Dmg,
    Cgb,
}

impl Model {
    #[inline]
    pub const fn is_cgb(self) -> bool {
        matches!(self, Model::Cgb)
    }

    pub const fn name(self) -> &'static str {
        match self {
            Model::Dmg => "DMG",
            Model::Cgb => "CGB",
        }
    }

    /// Expected boot ROM image size in bytes.
    pub const fn boot_rom_len(self) -> usize {
        match self {
            Model::Dmg => 0x100,
            Model::Cgb => 0x900,
        }
    }

    /// Register values left behind by the boot ROM, as `[A, F, B, C, D, E, H, L]`.
    pub const fn post_boot_registers(self) -> [u8; 8] {
        match self {
            Model::Dmg => [0x01, 0xB0, 0x00, 0x13, 0x00, 0xD8, 0x01, 0x4D],
            Model::Cgb => [0x11, 0x80, 0x00, 0x00, 0xFF, 0x56, 0x00, 0x0D],
        }
    }

    /// Internal divider value at the first cartridge instruction.
    pub const fn post_boot_divider(self) -> u16 {
        match self {
            Model::Dmg => 0xABCC,
            Model::Cgb => 0x1EA0,
        }
    }
}

/// CPU clock mode. Only the CGB can switch to double speed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Speed {
    #[default]
    Normal,
    Double,
}

impl Speed {
    /// Dots handed to the PPU and APU for every 4-cycle bus step.
    #[inline]
    pub const fn dots_per_bus_step(self) -> u32 {
        match self {
            Speed::Normal => 4,
            Speed::Double => 2,
        }
    }

    pub const fn toggled(self) -> Self {
        match self {
            Speed::Normal => Speed::Double,
            Speed::Double => Speed::Normal,
        }
    }
}

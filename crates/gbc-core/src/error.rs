use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::cartridge::CartridgeKind;

/// Conditions that stop emulation.
///
/// Anything recoverable (reserved address ranges, unimplemented I/O
/// sub-registers, a missing save file) is logged and answered with a
/// sentinel value instead of being reported here.
#[derive(Debug, Error)]
pub enum EmuError {
    #[error("unimplemented opcode {}{opcode:02X} at PC={pc:04X}", if *.prefixed { "CB " } else { "" })]
    UnimplementedOpcode { opcode: u8, prefixed: bool, pc: u16 },

    #[error("no memory range claims address {address:04X}")]
    UnhandledAddress { address: u16 },

    #[error("no cartridge and no boot ROM loaded")]
    MissingCartridge,

    #[error("a boot ROM is required for {model} mode")]
    MissingBootRom { model: &'static str },

    #[error("unsupported cartridge type {code:02X} ({kind:?})")]
    UnsupportedCartridge { code: u8, kind: CartridgeKind },

    #[error("invalid ROM image: {reason}")]
    InvalidRom { reason: String },

    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl EmuError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        EmuError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, EmuError>;

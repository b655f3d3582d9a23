//! Game Boy / Game Boy Color emulation core.
//!
//! This crate holds the platform-agnostic machine: the LR35902 CPU, the
//! memory bus and the devices it routes to. Frontends drive it through the
//! [`gameboy`] facade, one instruction or one frame at a time.

/// Register-level sound unit. No synthesis.
pub mod apu;

/// Address decoding, boot ROM overlay and DMA bus priority.
pub mod bus;

/// Cartridge header parsing, bank controllers (MBC1/MBC3/MBC5), external RAM
/// and the MBC3 real-time clock.
pub mod cartridge;

pub mod config;

/// LR35902 CPU core.
pub mod cpu;

/// OAM DMA and CGB VRAM DMA (HDMA).
pub mod dma;

pub mod error;

/// The machine root: one CPU plus the bus that owns every device.
pub mod gameboy;

/// DMG/CGB model differences and CPU speed.
pub mod hardware;

pub mod interrupts;

/// P1 button matrix and the joypad interrupt.
pub mod joypad;

/// The fixed address ranges of the 16-bit bus.
pub mod memory_map;

/// LCD timing, VRAM/OAM storage and CGB palettes. Pixels are not drawn.
pub mod ppu;

/// Serial unit and link cable plumbing.
pub mod serial;

/// DIV/TIMA timer with the delayed overflow reload.
pub mod timer;

pub mod trace;

pub use config::{EmuConfig, EmulationMode};
pub use error::{EmuError, Result};
pub use gameboy::GameBoy;

//! Address-space layout shared by the bus and the cartridge.

/// Half-open interval `[start, start + length)` in the 16-bit address space.
///
/// `length` is 32-bit so a range may end exactly at 0x10000.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryRange {
    pub start: u16,
    pub length: u32,
}

impl MemoryRange {
    pub const fn new(start: u16, length: u32) -> Self {
        Self { start, length }
    }

    #[inline]
    pub const fn contains(&self, address: u16) -> bool {
        let a = address as u32;
        let s = self.start as u32;
        a >= s && a < s + self.length
    }

    /// Offset of `address` from the start of the range. Caller must have
    /// checked [`contains`](Self::contains).
    #[inline]
    pub const fn offset(&self, address: u16) -> usize {
        (address - self.start) as usize
    }

    /// One past the last address, as a 32-bit value.
    #[inline]
    pub const fn end(&self) -> u32 {
        self.start as u32 + self.length
    }
}

/// Top-level windows of the CPU address space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    RomBank0,
    RomBankN,
    VideoRam,
    ExternalRam,
    WorkRam0,
    WorkRamN,
    EchoRam,
    Oam,
    Unusable,
    Io,
    HighRam,
    InterruptEnable,
}

impl Region {
    pub const fn range(self) -> MemoryRange {
        match self {
            Region::RomBank0 => ROM_BANK_0,
            Region::RomBankN => ROM_BANK_N,
            Region::VideoRam => VIDEO_RAM,
            Region::ExternalRam => EXTERNAL_RAM,
            Region::WorkRam0 => WORK_RAM_0,
            Region::WorkRamN => WORK_RAM_N,
            Region::EchoRam => ECHO_RAM,
            Region::Oam => OAM,
            Region::Unusable => UNUSABLE,
            Region::Io => IO,
            Region::HighRam => HIGH_RAM,
            Region::InterruptEnable => INTERRUPT_ENABLE,
        }
    }
}

pub const ROM_BANK_0: MemoryRange = MemoryRange::new(0x0000, 0x4000);
pub const ROM_BANK_N: MemoryRange = MemoryRange::new(0x4000, 0x4000);
pub const VIDEO_RAM: MemoryRange = MemoryRange::new(0x8000, 0x2000);
pub const EXTERNAL_RAM: MemoryRange = MemoryRange::new(0xA000, 0x2000);
pub const WORK_RAM_0: MemoryRange = MemoryRange::new(0xC000, 0x1000);
pub const WORK_RAM_N: MemoryRange = MemoryRange::new(0xD000, 0x1000);
pub const ECHO_RAM: MemoryRange = MemoryRange::new(0xE000, 0x1E00);
pub const OAM: MemoryRange = MemoryRange::new(0xFE00, 0xA0);
pub const UNUSABLE: MemoryRange = MemoryRange::new(0xFEA0, 0x60);
pub const IO: MemoryRange = MemoryRange::new(0xFF00, 0x80);
pub const HIGH_RAM: MemoryRange = MemoryRange::new(0xFF80, 0x7F);
pub const INTERRUPT_ENABLE: MemoryRange = MemoryRange::new(0xFFFF, 1);

/// Every top-level window in classification order.
pub const MEMORY_MAP: [Region; 12] = [
    Region::RomBank0,
    Region::RomBankN,
    Region::VideoRam,
    Region::ExternalRam,
    Region::WorkRam0,
    Region::WorkRamN,
    Region::EchoRam,
    Region::Oam,
    Region::Unusable,
    Region::Io,
    Region::HighRam,
    Region::InterruptEnable,
];

pub fn classify(address: u16) -> Option<Region> {
    MEMORY_MAP
        .into_iter()
        .find(|region| region.range().contains(address))
}

/// Sub-windows of the I/O block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoRegister {
    Joypad,
    Serial,
    Timer,
    InterruptFlag,
    Sound,
    Lcd,
    OamDma,
    SpeedSwitch,
    VramBank,
    BootRomLock,
    Hdma,
    Palettes,
    WramBank,
    Unmapped,
}

pub const JOYPAD: MemoryRange = MemoryRange::new(0xFF00, 1);
pub const SERIAL: MemoryRange = MemoryRange::new(0xFF01, 2);
pub const TIMER: MemoryRange = MemoryRange::new(0xFF04, 4);
pub const INTERRUPT_FLAG: MemoryRange = MemoryRange::new(0xFF0F, 1);
pub const SOUND: MemoryRange = MemoryRange::new(0xFF10, 0x30);
pub const LCD: MemoryRange = MemoryRange::new(0xFF40, 0x0C);
pub const SPEED_SWITCH: MemoryRange = MemoryRange::new(0xFF4D, 1);
pub const VRAM_BANK: MemoryRange = MemoryRange::new(0xFF4F, 1);
pub const BOOT_ROM_LOCK: MemoryRange = MemoryRange::new(0xFF50, 1);
pub const HDMA: MemoryRange = MemoryRange::new(0xFF51, 5);
pub const PALETTES: MemoryRange = MemoryRange::new(0xFF68, 4);
pub const WRAM_BANK: MemoryRange = MemoryRange::new(0xFF70, 1);

pub const OAM_DMA_REGISTER: u16 = 0xFF46;

/// Classify an address inside [`IO`].
pub fn classify_io(address: u16) -> IoRegister {
    if address == OAM_DMA_REGISTER {
        return IoRegister::OamDma;
    }
    const TABLE: [(MemoryRange, IoRegister); 12] = [
        (JOYPAD, IoRegister::Joypad),
        (SERIAL, IoRegister::Serial),
        (TIMER, IoRegister::Timer),
        (INTERRUPT_FLAG, IoRegister::InterruptFlag),
        (SOUND, IoRegister::Sound),
        (LCD, IoRegister::Lcd),
        (SPEED_SWITCH, IoRegister::SpeedSwitch),
        (VRAM_BANK, IoRegister::VramBank),
        (BOOT_ROM_LOCK, IoRegister::BootRomLock),
        (HDMA, IoRegister::Hdma),
        (PALETTES, IoRegister::Palettes),
        (WRAM_BANK, IoRegister::WramBank),
    ];
    TABLE
        .iter()
        .find(|(range, _)| range.contains(address))
        .map_or(IoRegister::Unmapped, |&(_, reg)| reg)
}

/// The five interrupt sources, in servicing priority order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Interrupt {
    VBlank,
    LcdStat,
    Timer,
    Serial,
    Joypad,
}

impl Interrupt {
    pub const PRIORITY: [Interrupt; 5] = [
        Interrupt::VBlank,
        Interrupt::LcdStat,
        Interrupt::Timer,
        Interrupt::Serial,
        Interrupt::Joypad,
    ];

    #[inline]
    pub const fn bit(self) -> u8 {
        match self {
            Interrupt::VBlank => 0x01,
            Interrupt::LcdStat => 0x02,
            Interrupt::Timer => 0x04,
            Interrupt::Serial => 0x08,
            Interrupt::Joypad => 0x10,
        }
    }

    #[inline]
    pub const fn vector(self) -> u16 {
        match self {
            Interrupt::VBlank => 0x0040,
            Interrupt::LcdStat => 0x0048,
            Interrupt::Timer => 0x0050,
            Interrupt::Serial => 0x0058,
            Interrupt::Joypad => 0x0060,
        }
    }
}

/// IME plus the IE (0xFFFF) and IF (0xFF0F) registers.
///
/// Devices only ever call [`request`](Self::request); the CPU is the only
/// caller that touches IME.
#[derive(Debug, Default, Clone)]
pub struct InterruptController {
    ime: bool,
    enable: u8,
    flag: u8,
}

impl InterruptController {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn request(&mut self, interrupt: Interrupt) {
        self.flag |= interrupt.bit();
    }

    #[inline]
    pub fn ime(&self) -> bool {
        self.ime
    }

    #[inline]
    pub fn set_ime(&mut self, enabled: bool) {
        self.ime = enabled;
    }

    /// Enabled and requested bits, regardless of IME. Wakes a halted CPU.
    #[inline]
    pub fn pending(&self) -> u8 {
        self.enable & self.flag & 0x1F
    }

    #[inline]
    pub fn has_pending(&self) -> bool {
        self.pending() != 0
    }

    /// Picks the highest-priority interrupt that is both enabled and
    /// requested, acknowledges it and clears IME. Returns `None` without
    /// touching any state when IME is clear or nothing is pending.
    pub fn serve(&mut self) -> Option<Interrupt> {
        if !self.ime {
            return None;
        }
        let pending = self.pending();
        let interrupt = Interrupt::PRIORITY
            .into_iter()
            .find(|irq| pending & irq.bit() != 0)?;
        self.flag &= !interrupt.bit();
        self.ime = false;
        Some(interrupt)
    }

    pub fn read_if(&self) -> u8 {
        self.flag | 0xE0
    }

    pub fn write_if(&mut self, val: u8) {
        self.flag = val & 0x1F;
    }

    pub fn read_ie(&self) -> u8 {
        self.enable
    }

    pub fn write_ie(&mut self, val: u8) {
        self.enable = val;
    }
}

use crate::interrupts::{Interrupt, InterruptController};

/// DIV bit watched by the TIMA edge detector for each TAC rate.
const TAP_BITS: [u16; 4] = [9, 3, 5, 7];

/// TIMA reload lag after an overflow, in T-cycles.
const RELOAD_DELAY: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reload {
    Idle,
    /// TIMA overflowed and reads 0x00; reload happens when the count runs out.
    Pending { value: u8, delay: u8 },
    /// The reload happened on this T-cycle. TIMA writes are ignored and TMA
    /// writes pass straight through.
    Reloading,
}

/// DIV/TIMA/TMA/TAC (0xFF04-0xFF07).
#[derive(Debug, Clone)]
pub struct Timer {
    /// Internal 16-bit divider. DIV is the upper byte.
    div: u16,
    tima: u8,
    tma: u8,
    tac: u8,
    signal: bool,
    /// TMA value before a write on the current cycle.
    tma_before_write: Option<u8>,
    reload: Reload,
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer {
    pub fn new() -> Self {
        Self {
            div: 0,
            tima: 0,
            tma: 0,
            tac: 0,
            signal: false,
            tma_before_write: None,
            reload: Reload::Idle,
        }
    }

    /// Internal divider value, used by the serial clock.
    #[inline]
    pub fn divider(&self) -> u16 {
        self.div
    }

    pub(crate) fn set_divider(&mut self, div: u16) {
        self.div = div;
        self.signal = Self::signal_for(self.div, self.tac);
    }

    pub fn read(&self, addr: u16) -> u8 {
        match addr {
            0xFF04 => (self.div >> 8) as u8,
            0xFF05 => self.tima,
            0xFF06 => self.tma,
            0xFF07 => self.tac | 0xF8,
            _ => 0xFF,
        }
    }

    pub fn write(&mut self, addr: u16, val: u8, ic: &mut InterruptController) {
        match addr {
            0xFF04 => self.reset_div(ic),
            0xFF05 => match self.reload {
                Reload::Reloading | Reload::Pending { delay: 0, .. } => {}
                Reload::Pending { .. } => {
                    // Writing while the overflow is still pending aborts the reload.
                    self.tima = val;
                    self.reload = Reload::Idle;
                }
                Reload::Idle => self.tima = val,
            },
            0xFF06 => {
                self.tma_before_write = Some(self.tma);
                self.tma = val;
                match &mut self.reload {
                    Reload::Pending { value, .. } => *value = val,
                    Reload::Reloading => self.tima = val,
                    Reload::Idle => {}
                }
            }
            0xFF07 => {
                let before = self.signal;
                self.tac = val & 0x07;
                self.signal = Self::signal_for(self.div, self.tac);
                // Changing the rate or disabling the timer can itself produce
                // a falling edge.
                if before && !self.signal {
                    let old_tma = self.tma_before_write.take();
                    self.increment(old_tma);
                }
            }
            _ => {}
        }
    }

    /// Advance by `cycles` T-cycles.
    pub fn step(&mut self, cycles: u32, ic: &mut InterruptController) {
        for _ in 0..cycles {
            self.advance_reload(ic);
            let old_tma = self.tma_before_write.take();
            self.div = self.div.wrapping_add(1);
            self.detect_edge(old_tma);
        }
    }

    /// DIV write (or STOP): zero the divider. The drop to zero may clock TIMA.
    pub fn reset_div(&mut self, ic: &mut InterruptController) {
        self.advance_reload(ic);
        self.div = 0;
        let old_tma = self.tma_before_write.take();
        self.detect_edge(old_tma);
    }

    fn advance_reload(&mut self, ic: &mut InterruptController) {
        self.reload = match self.reload {
            Reload::Pending { value, delay: 0 } => {
                self.tima = value;
                ic.request(Interrupt::Timer);
                Reload::Reloading
            }
            Reload::Pending { value, delay } => Reload::Pending {
                value,
                delay: delay - 1,
            },
            Reload::Reloading | Reload::Idle => Reload::Idle,
        };
    }

    fn detect_edge(&mut self, old_tma: Option<u8>) {
        let now = Self::signal_for(self.div, self.tac);
        if self.signal && !now {
            self.increment(old_tma);
        }
        self.signal = now;
    }

    fn increment(&mut self, old_tma: Option<u8>) {
        let (next, overflow) = self.tima.overflowing_add(1);
        self.tima = next;
        if overflow {
            self.reload = Reload::Pending {
                value: old_tma.unwrap_or(self.tma),
                delay: RELOAD_DELAY,
            };
        }
    }

    #[inline]
    fn signal_for(div: u16, tac: u8) -> bool {
        tac & 0x04 != 0 && (div >> TAP_BITS[(tac & 0x03) as usize]) & 1 != 0
    }
}

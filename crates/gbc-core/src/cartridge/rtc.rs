use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Size of the clock block appended to an MBC3+TIMER save file.
pub const RTC_SAVE_LEN: usize = 48;

/// Source of wall-clock time for the cartridge clock.
pub trait HostClock: Send {
    fn now(&self) -> SystemTime;
}

/// The host's real clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl HostClock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// A clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock(Arc<Mutex<SystemTime>>);

impl ManualClock {
    pub fn new(start: SystemTime) -> Self {
        Self(Arc::new(Mutex::new(start)))
    }

    pub fn advance(&self, by: Duration) {
        if let Ok(mut now) = self.0.lock() {
            *now += by;
        }
    }
}

impl HostClock for ManualClock {
    fn now(&self) -> SystemTime {
        self.0.lock().map(|now| *now).unwrap_or(UNIX_EPOCH)
    }
}

/// One copy of the five clock registers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RtcRegisters {
    pub seconds: u8,
    pub minutes: u8,
    pub hours: u8,
    /// 9-bit day counter.
    pub days: u16,
    pub halt: bool,
    pub carry: bool,
}

impl RtcRegisters {
    /// Register value as seen through the 0xA000 window.
    pub fn read(&self, select: u8) -> u8 {
        match select {
            0x08 => self.seconds & 0x3F,
            0x09 => self.minutes & 0x3F,
            0x0A => self.hours & 0x1F,
            0x0B => self.days as u8,
            0x0C => {
                ((self.days >> 8) as u8 & 0x01)
                    | if self.halt { 0x40 } else { 0 }
                    | if self.carry { 0x80 } else { 0 }
            }
            _ => 0xFF,
        }
    }

    fn write(&mut self, select: u8, value: u8) {
        match select {
            0x08 => self.seconds = value & 0x3F,
            0x09 => self.minutes = value & 0x3F,
            0x0A => self.hours = value & 0x1F,
            0x0B => self.days = (self.days & 0x100) | value as u16,
            0x0C => {
                self.days = (self.days & 0xFF) | (((value & 0x01) as u16) << 8);
                self.halt = value & 0x40 != 0;
                self.carry = value & 0x80 != 0;
            }
            _ => {}
        }
    }

    fn in_range(&self) -> bool {
        self.seconds < 60 && self.minutes < 60 && self.hours < 24
    }

    /// One second, with the counters' real overflow points. Out-of-range
    /// values count up to their bit width and wrap without carrying.
    fn tick(&mut self) {
        self.seconds = (self.seconds + 1) & 0x3F;
        if self.seconds != 60 {
            return;
        }
        self.seconds = 0;
        self.minutes = (self.minutes + 1) & 0x3F;
        if self.minutes != 60 {
            return;
        }
        self.minutes = 0;
        self.hours = (self.hours + 1) & 0x1F;
        if self.hours != 24 {
            return;
        }
        self.hours = 0;
        self.add_days(1);
    }

    fn add_days(&mut self, days: u64) {
        let total = self.days as u64 + days;
        if total > 0x1FF {
            self.carry = true;
        }
        self.days = (total & 0x1FF) as u16;
    }

    fn advance(&mut self, mut seconds: u64) {
        while seconds > 0 && !self.in_range() {
            self.tick();
            seconds -= 1;
        }
        if seconds == 0 {
            return;
        }
        let total = self.seconds as u64 + seconds;
        self.seconds = (total % 60) as u8;
        let total = self.minutes as u64 + total / 60;
        self.minutes = (total % 60) as u8;
        let total = self.hours as u64 + total / 60;
        self.hours = (total % 24) as u8;
        self.add_days(total / 24);
    }

    fn encode(&self, out: &mut Vec<u8>) {
        for select in 0x08..=0x0C {
            out.extend_from_slice(&(self.read(select) as u32).to_le_bytes());
        }
    }

    fn decode(bytes: &[u8]) -> Self {
        let mut regs = Self::default();
        for (select, word) in (0x08..=0x0C).zip(bytes.chunks_exact(4)) {
            regs.write(select, word[0]);
        }
        regs
    }
}

/// MBC3 real-time clock, driven by host time rather than emulated cycles.
pub struct RealTimeClock {
    live: RtcRegisters,
    latched: RtcRegisters,
    /// Host time the live registers were last brought up to date.
    anchor: SystemTime,
    /// Elapsed time not yet worth a whole second.
    remainder: Duration,
    latch_armed: bool,
}

impl fmt::Debug for RealTimeClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RealTimeClock")
            .field("live", &self.live)
            .field("latched", &self.latched)
            .field("anchor", &self.anchor)
            .finish_non_exhaustive()
    }
}

impl RealTimeClock {
    pub fn new(now: SystemTime) -> Self {
        Self {
            live: RtcRegisters::default(),
            latched: RtcRegisters::default(),
            anchor: now,
            remainder: Duration::ZERO,
            latch_armed: false,
        }
    }

    pub fn live(&self) -> &RtcRegisters {
        &self.live
    }

    pub fn latched(&self) -> &RtcRegisters {
        &self.latched
    }

    /// Fold host time elapsed since the last update into the live registers.
    pub fn update(&mut self, now: SystemTime) {
        let elapsed = now.duration_since(self.anchor).unwrap_or_default();
        self.anchor = now;
        if self.live.halt {
            return;
        }
        let total = self.remainder + elapsed;
        self.remainder = Duration::from_nanos(total.subsec_nanos() as u64);
        self.live.advance(total.as_secs());
    }

    /// Handle a write to 0x6000-0x7FFF. Writing 0x00 then 0x01 latches.
    pub fn write_latch(&mut self, value: u8, now: SystemTime) {
        if value == 0x01 && self.latch_armed {
            self.update(now);
            self.latched = self.live;
        }
        self.latch_armed = value == 0x00;
    }

    pub fn read(&self, select: u8) -> u8 {
        self.latched.read(select)
    }

    pub fn write(&mut self, select: u8, value: u8, now: SystemTime) {
        self.update(now);
        self.live.write(select, value);
        if select == 0x08 {
            self.remainder = Duration::ZERO;
        }
        self.latched = self.live;
    }

    /// The clock block appended to the save file.
    ///
    /// Live registers, then latched registers, each as a little-endian
    /// 32-bit word, then the anchor as 64-bit little-endian Unix seconds.
    pub fn to_save_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(RTC_SAVE_LEN);
        self.live.encode(&mut out);
        self.latched.encode(&mut out);
        let stamp = self
            .anchor
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        out.extend_from_slice(&stamp.to_le_bytes());
        out
    }

    /// Restore from a save block. Returns false if the block is truncated.
    /// Call [`update`](Self::update) afterwards to catch up to the host clock.
    pub fn load_save_bytes(&mut self, bytes: &[u8]) -> bool {
        if bytes.len() < RTC_SAVE_LEN {
            return false;
        }
        self.live = RtcRegisters::decode(&bytes[0..20]);
        self.latched = RtcRegisters::decode(&bytes[20..40]);
        let mut stamp = [0u8; 8];
        stamp.copy_from_slice(&bytes[40..48]);
        self.anchor = UNIX_EPOCH + Duration::from_secs(u64::from_le_bytes(stamp));
        self.remainder = Duration::ZERO;
        self.latch_armed = false;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: u64) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(secs)
    }

    #[test]
    fn save_block_round_trip_then_advance() {
        let start = at(1_700_000_000);
        let mut rtc = RealTimeClock::new(start);
        rtc.write(0x08, 10, start);
        rtc.write(0x09, 42, start);
        rtc.write(0x0A, 7, start);
        rtc.write(0x0B, 0x34, start);
        rtc.write(0x0C, 0x01, start);

        let bytes = rtc.to_save_bytes();
        assert_eq!(bytes.len(), RTC_SAVE_LEN);

        let mut restored = RealTimeClock::new(at(0));
        assert!(restored.load_save_bytes(&bytes));
        assert_eq!(restored.live(), rtc.live());
        assert_eq!(restored.latched(), rtc.latched());
        assert_eq!(restored.live().days, 0x134);

        let before = *restored.live();
        restored.update(start + Duration::from_secs(90));
        assert_eq!(restored.live().seconds, before.seconds + 30);
        assert_eq!(restored.live().minutes, before.minutes + 1);
        assert_eq!(restored.live().hours, before.hours);
    }

    #[test]
    fn subsecond_remainder_is_kept() {
        let mut rtc = RealTimeClock::new(at(0));
        let mut now = at(0);
        for _ in 0..3 {
            now += Duration::from_millis(400);
            rtc.update(now);
        }
        assert_eq!(rtc.live().seconds, 1);
        now += Duration::from_millis(800);
        rtc.update(now);
        assert_eq!(rtc.live().seconds, 2);
    }

    #[test]
    fn halted_clock_ignores_elapsed_time() {
        let mut rtc = RealTimeClock::new(at(0));
        rtc.write(0x0C, 0x40, at(0));
        rtc.update(at(500));
        assert_eq!(rtc.live().seconds, 0);

        rtc.write(0x0C, 0x00, at(500));
        rtc.update(at(505));
        assert_eq!(rtc.live().seconds, 5);
    }

    #[test]
    fn latch_needs_zero_then_one() {
        let mut rtc = RealTimeClock::new(at(0));
        rtc.write_latch(0x01, at(30));
        assert_eq!(rtc.read(0x08), 0);

        rtc.write_latch(0x00, at(30));
        rtc.write_latch(0x01, at(30));
        assert_eq!(rtc.read(0x08), 30);

        // Latched values stay frozen while the live clock keeps running.
        rtc.update(at(45));
        assert_eq!(rtc.read(0x08), 30);
        assert_eq!(rtc.live().seconds, 45);
    }

    #[test]
    fn day_counter_overflow_sets_carry() {
        let mut rtc = RealTimeClock::new(at(0));
        rtc.write(0x0A, 23, at(0));
        rtc.write(0x09, 59, at(0));
        rtc.write(0x08, 59, at(0));
        rtc.write(0x0B, 0xFF, at(0));
        rtc.write(0x0C, 0x01, at(0));

        rtc.update(at(1));
        assert_eq!(rtc.live().days, 0);
        assert!(rtc.live().carry);
        assert_eq!(rtc.read(0x0C) & 0x80, 0);
    }

    #[test]
    fn out_of_range_values_wrap_without_carry() {
        let mut rtc = RealTimeClock::new(at(0));
        rtc.write(0x08, 63, at(0));
        rtc.write(0x09, 5, at(0));
        rtc.update(at(1));
        assert_eq!(rtc.live().seconds, 0);
        assert_eq!(rtc.live().minutes, 5);
    }
}

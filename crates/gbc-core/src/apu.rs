/// Dots between frame sequencer steps (512 Hz).
const FRAME_SEQUENCER_PERIOD: u32 = 8192;

const NR52: u16 = 0xFF26;
const WAVE_RAM_START: u16 = 0xFF30;

/// Bits that always read back as 1, per register in 0xFF10-0xFF2F.
fn read_mask(addr: u16) -> u8 {
    match addr {
        0xFF10 => 0x80,
        0xFF11 | 0xFF16 => 0x3F,
        0xFF13 | 0xFF18 | 0xFF1B | 0xFF1D | 0xFF20 => 0xFF,
        0xFF14 | 0xFF19 | 0xFF1E | 0xFF23 => 0xBF,
        0xFF1A => 0x7F,
        0xFF1C => 0x9F,
        0xFF12 | 0xFF17 | 0xFF21 | 0xFF22 | 0xFF24 | 0xFF25 => 0x00,
        NR52 => 0x70,
        _ => 0xFF,
    }
}

/// Per-channel length counter and enable flag.
#[derive(Debug, Clone, Copy, Default)]
struct Channel {
    enabled: bool,
    length: u16,
    length_enabled: bool,
}

impl Channel {
    fn clock_length(&mut self) {
        if self.length_enabled && self.length > 0 {
            self.length -= 1;
            if self.length == 0 {
                self.enabled = false;
            }
        }
    }
}

/// Sound register block (0xFF10-0xFF3F).
///
/// Models what software can observe: read-back masks, power gating,
/// channel status bits and length expiry. No samples are produced.
#[derive(Debug, Clone)]
pub struct Apu {
    regs: [u8; 0x20],
    wave_ram: [u8; 0x10],
    powered: bool,
    channels: [Channel; 4],
    sequencer_dots: u32,
    sequencer_step: u8,
}

impl Default for Apu {
    fn default() -> Self {
        Self::new()
    }
}

impl Apu {
    pub fn new() -> Self {
        Self {
            regs: [0; 0x20],
            wave_ram: [0; 0x10],
            powered: false,
            channels: [Channel::default(); 4],
            sequencer_dots: 0,
            sequencer_step: 0,
        }
    }

    /// Values left by the boot ROM: powered on, channel 1 just played.
    pub fn apply_post_boot_state(&mut self) {
        self.powered = true;
        self.regs[0x11 - 0x10] = 0x80;
        self.regs[0x12 - 0x10] = 0xF3;
        self.regs[0x24 - 0x10] = 0x77;
        self.regs[0x25 - 0x10] = 0xF3;
        self.channels[0].enabled = true;
    }

    pub fn read(&self, addr: u16) -> u8 {
        match addr {
            NR52 => {
                let status = self
                    .channels
                    .iter()
                    .enumerate()
                    .filter(|(_, ch)| ch.enabled)
                    .fold(0u8, |acc, (i, _)| acc | 1 << i);
                read_mask(NR52) | if self.powered { 0x80 } else { 0 } | status
            }
            0xFF30..=0xFF3F => self.wave_ram[(addr - WAVE_RAM_START) as usize],
            0xFF10..=0xFF2F => self.regs[(addr - 0xFF10) as usize] | read_mask(addr),
            _ => 0xFF,
        }
    }

    pub fn write(&mut self, addr: u16, val: u8) {
        if let 0xFF30..=0xFF3F = addr {
            self.wave_ram[(addr - WAVE_RAM_START) as usize] = val;
            return;
        }
        if addr == NR52 {
            self.set_power(val & 0x80 != 0);
            return;
        }
        if !self.powered || !(0xFF10..=0xFF2F).contains(&addr) {
            return;
        }
        self.regs[(addr - 0xFF10) as usize] = val;

        match addr {
            0xFF11 | 0xFF16 | 0xFF20 => {
                let ch = ((addr - 0xFF11) / 5) as usize;
                self.channels[ch].length = 64 - (val & 0x3F) as u16;
            }
            0xFF1B => self.channels[2].length = 256 - val as u16,
            0xFF12 | 0xFF17 | 0xFF21 if val & 0xF8 == 0 => {
                // DAC off silences the channel.
                self.channels[((addr - 0xFF12) / 5) as usize].enabled = false;
            }
            0xFF1A if val & 0x80 == 0 => self.channels[2].enabled = false,
            0xFF14 | 0xFF19 | 0xFF1E | 0xFF23 => {
                let ch = ((addr - 0xFF14) / 5) as usize;
                self.write_control(ch, val);
            }
            _ => {}
        }
    }

    fn dac_enabled(&self, ch: usize) -> bool {
        match ch {
            2 => self.regs[0x1A - 0x10] & 0x80 != 0,
            _ => self.regs[0x12 - 0x10 + ch * 5] & 0xF8 != 0,
        }
    }

    fn write_control(&mut self, ch: usize, val: u8) {
        let dac = self.dac_enabled(ch);
        let channel = &mut self.channels[ch];
        channel.length_enabled = val & 0x40 != 0;
        if val & 0x80 != 0 {
            if channel.length == 0 {
                channel.length = if ch == 2 { 256 } else { 64 };
            }
            channel.enabled = dac;
        }
    }

    fn set_power(&mut self, on: bool) {
        if self.powered && !on {
            self.regs = [0; 0x20];
            self.channels = [Channel::default(); 4];
        } else if !self.powered && on {
            self.sequencer_step = 0;
        }
        self.powered = on;
    }

    /// Advance by `dots` of the PPU clock.
    pub fn step(&mut self, dots: u32) {
        if !self.powered {
            return;
        }
        self.sequencer_dots += dots;
        while self.sequencer_dots >= FRAME_SEQUENCER_PERIOD {
            self.sequencer_dots -= FRAME_SEQUENCER_PERIOD;
            // Length counters run on even steps (256 Hz).
            if self.sequencer_step % 2 == 0 {
                for channel in &mut self.channels {
                    channel.clock_length();
                }
            }
            self.sequencer_step = (self.sequencer_step + 1) % 8;
        }
    }
}

use crate::hardware::Model;
use crate::interrupts::{Interrupt, InterruptController};

/// The other end of the link cable.
pub trait LinkPort: Send {
    /// Exchange one byte with the partner, returning what it sent back.
    fn transfer(&mut self, byte: u8) -> u8;
}

/// No cable attached: the line floats high, so every transfer receives
/// 0xFF. With `loopback` the sent byte comes straight back.
#[derive(Debug, Default)]
pub struct NullLinkPort {
    loopback: bool,
}

impl NullLinkPort {
    pub fn new(loopback: bool) -> Self {
        Self { loopback }
    }
}

impl LinkPort for NullLinkPort {
    fn transfer(&mut self, byte: u8) -> u8 {
        if self.loopback { byte } else { 0xFF }
    }
}

#[derive(Debug, Clone, Copy)]
struct Transfer {
    bits_left: u8,
    outgoing: u8,
    incoming: u8,
    fast: bool,
}

/// SB/SC (0xFF01-0xFF02).
pub struct Serial {
    model: Model,
    sb: u8,
    sc: u8,
    transfer: Option<Transfer>,
    port: Box<dyn LinkPort>,
    output: Vec<u8>,
}

impl std::fmt::Debug for Serial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Serial")
            .field("sb", &self.sb)
            .field("sc", &self.sc)
            .field("transfer", &self.transfer)
            .finish_non_exhaustive()
    }
}

impl Serial {
    pub fn new(model: Model) -> Self {
        Self {
            model,
            sb: 0,
            sc: 0,
            transfer: None,
            port: Box::new(NullLinkPort::default()),
            output: Vec::new(),
        }
    }

    pub fn connect(&mut self, port: Box<dyn LinkPort>) {
        self.port = port;
    }

    pub fn read(&self, addr: u16) -> u8 {
        match addr {
            0xFF01 => self.sb,
            0xFF02 if self.model.is_cgb() => self.sc | 0x7C,
            0xFF02 => self.sc | 0x7E,
            _ => 0xFF,
        }
    }

    pub fn write(&mut self, addr: u16, val: u8) {
        match addr {
            0xFF01 => self.sb = val,
            0xFF02 => {
                self.sc = val & 0x83;
                self.transfer = None;
                // Only an internally clocked transfer makes progress; with
                // an external clock and no partner it waits forever.
                if val & 0x81 == 0x81 {
                    self.transfer = Some(Transfer {
                        bits_left: 8,
                        outgoing: self.sb,
                        incoming: self.port.transfer(self.sb),
                        fast: self.model.is_cgb() && val & 0x02 != 0,
                    });
                }
            }
            _ => {}
        }
    }

    /// Clock the shift register from the divider moving `prev_div` -> `div`.
    pub fn step(&mut self, prev_div: u16, div: u16, ic: &mut InterruptController) {
        let Some(transfer) = self.transfer.as_mut() else {
            return;
        };
        // 8192 Hz normally, 262144 Hz with the CGB fast clock.
        let bit = if transfer.fast { 3 } else { 8 };
        let mut d = prev_div;
        while d != div {
            let next = d.wrapping_add(1);
            if (d >> bit) & 1 == 1 && (next >> bit) & 1 == 0 {
                self.sb = (self.sb << 1) | (transfer.incoming >> 7);
                transfer.incoming <<= 1;
                transfer.bits_left -= 1;
                if transfer.bits_left == 0 {
                    self.output.push(transfer.outgoing);
                    self.sc &= 0x7F;
                    self.transfer = None;
                    ic.request(Interrupt::Serial);
                    return;
                }
            }
            d = next;
        }
    }

    /// Bytes sent since the last call. Test ROMs print through here.
    pub fn take_output(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.output)
    }
}

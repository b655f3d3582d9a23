use crate::interrupts::{Interrupt, InterruptController};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    Right,
    Left,
    Up,
    Down,
    A,
    B,
    Select,
    Start,
}

impl Button {
    /// Bit in the low nibble of P1 for this key's group.
    fn mask(self) -> u8 {
        match self {
            Button::Right | Button::A => 0x01,
            Button::Left | Button::B => 0x02,
            Button::Up | Button::Select => 0x04,
            Button::Down | Button::Start => 0x08,
        }
    }

    fn is_dpad(self) -> bool {
        matches!(self, Button::Right | Button::Left | Button::Up | Button::Down)
    }
}

/// P1/JOYP (0xFF00).
#[derive(Debug, Clone)]
pub struct Joypad {
    /// Bits 4-5 as last written; 0 selects a group.
    select: u8,
    /// Pressed keys, 1 = pressed.
    dpad: u8,
    buttons: u8,
    /// Low nibble seen at the previous instruction boundary.
    last_lines: u8,
}

impl Default for Joypad {
    fn default() -> Self {
        Self::new()
    }
}

impl Joypad {
    pub fn new() -> Self {
        Self {
            select: 0x30,
            dpad: 0,
            buttons: 0,
            last_lines: 0x0F,
        }
    }

    pub fn set_button(&mut self, button: Button, pressed: bool) {
        let group = if button.is_dpad() {
            &mut self.dpad
        } else {
            &mut self.buttons
        };
        if pressed {
            *group |= button.mask();
        } else {
            *group &= !button.mask();
        }
    }

    pub fn any_pressed(&self) -> bool {
        self.dpad | self.buttons != 0
    }

    fn lines(&self) -> u8 {
        let mut pressed = 0;
        if self.select & 0x10 == 0 {
            pressed |= self.dpad;
        }
        if self.select & 0x20 == 0 {
            pressed |= self.buttons;
        }
        !pressed & 0x0F
    }

    pub fn read(&self) -> u8 {
        0xC0 | self.select | self.lines()
    }

    pub fn write(&mut self, val: u8) {
        self.select = val & 0x30;
    }

    /// Called once per instruction. Any selected line going low requests
    /// the joypad interrupt.
    pub fn update_joypad(&mut self, ic: &mut InterruptController) {
        let lines = self.lines();
        if self.last_lines & !lines != 0 {
            ic.request(Interrupt::Joypad);
        }
        self.last_lines = lines;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selected_group_reads_active_low() {
        let mut joy = Joypad::new();
        joy.set_button(Button::Start, true);
        joy.set_button(Button::Left, true);

        joy.write(0x10); // buttons
        assert_eq!(joy.read(), 0xD7);
        joy.write(0x20); // d-pad
        assert_eq!(joy.read(), 0xED);
        joy.write(0x30);
        assert_eq!(joy.read(), 0xFF);
    }

    #[test]
    fn press_requests_interrupt_on_edge_only() {
        let mut ic = InterruptController::new();
        let mut joy = Joypad::new();
        joy.write(0x10);
        joy.update_joypad(&mut ic);
        assert_eq!(ic.read_if() & 0x1F, 0);

        joy.set_button(Button::A, true);
        joy.update_joypad(&mut ic);
        assert_eq!(ic.read_if() & 0x1F, Interrupt::Joypad.bit());

        ic.write_if(0);
        joy.update_joypad(&mut ic);
        assert_eq!(ic.read_if() & 0x1F, 0);
    }

    #[test]
    fn unselected_group_does_not_interrupt() {
        let mut ic = InterruptController::new();
        let mut joy = Joypad::new();
        joy.write(0x20);
        joy.set_button(Button::A, true);
        joy.update_joypad(&mut ic);
        assert_eq!(ic.read_if() & 0x1F, 0);
    }
}

use core::fmt;

use super::Reg;

/// 54 MHz system clock / 115200 baud
pub const DEFAULT_DIVISOR: u32 = 468;

/// Transmit side of the SoC serial port.
#[derive(Copy, Clone)]
pub struct Uart {
    clkdiv: Reg<u32>,
    data: Reg<u32>,
}

impl Uart {
    /// # Safety
    ///
    /// `clkdiv` and `data` must be the UART registers.
    pub const unsafe fn new(clkdiv: usize, data: usize) -> Self {
        Self { clkdiv: Reg::new(clkdiv), data: Reg::new(data) }
    }

    pub fn set_divisor(&self, divisor: u32) {
        self.clkdiv.write(divisor)
    }

    pub fn put_char(&self, c: u8) {
        if c == b'\n' {
            self.data.write(b'\r' as u32);
        }
        self.data.write(c as u32)
    }
}

impl fmt::Write for Uart {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        s.bytes().for_each(|b| self.put_char(b));
        Ok(())
    }
}

use embedded_hal::blocking::delay::{DelayMs, DelayUs};

use super::Reg;

/// Microsecond countdown register, reads zero once expired.
pub struct Countdown(Reg<u32>);

impl Countdown {
    /// # Safety
    ///
    /// `address` must be the countdown register.
    pub unsafe fn new(address: usize) -> Self {
        Self(Reg::new(address))
    }
}

impl DelayUs<u32> for Countdown {
    fn delay_us(&mut self, us: u32) {
        self.0.write(us);
        while self.0.read() != 0 {}
    }
}

/// Free running millisecond counter.
pub struct SystemTimer(Reg<u32>);

impl SystemTimer {
    /// # Safety
    ///
    /// `address` must be the system time register.
    pub unsafe fn new(address: usize) -> Self {
        Self(Reg::new(address))
    }

    pub fn now(&self) -> u32 {
        self.0.read()
    }
}

impl DelayMs<u32> for SystemTimer {
    fn delay_ms(&mut self, ms: u32) {
        let start = self.now();
        while self.now().wrapping_sub(start) < ms {}
    }
}

use embedded_error::mci::MciError;

use crate::bus::Bus;

use super::Reg;

/// SD card port of the soft core.
///
/// Writing the transfer register clocks a byte out, reading it back returns
/// the byte clocked in during that exchange.
pub struct SdcardPort {
    prescale: Reg<u32>,
    cs: Reg<u32>,
    xfer: Reg<u32>,
    mode: Reg<u32>,
}

impl SdcardPort {
    /// # Safety
    ///
    /// `base` must be the SD card register block and nothing else may drive it.
    pub unsafe fn new(base: usize) -> Self {
        Self {
            prescale: Reg::new(base),
            cs: Reg::new(base + 0x4),
            xfer: Reg::new(base + 0x8),
            mode: Reg::new(base + 0xC),
        }
    }
}

impl Bus for SdcardPort {
    fn configure(&mut self, prescale: u32, mode: u32) -> Result<(), MciError> {
        self.prescale.write(prescale);
        self.mode.write(mode);
        Ok(())
    }

    fn transfer(&mut self, value: u8) -> Result<u8, MciError> {
        self.xfer.write(value as u32);
        Ok(self.xfer.read() as u8)
    }

    fn select(&mut self, enabled: bool) -> Result<(), MciError> {
        // chip select is active low
        self.cs.write(if enabled { 0 } else { 1 });
        Ok(())
    }
}

use embedded_error::mci::MciError;
use embedded_hal::blocking::spi;
use embedded_hal::digital::v2::OutputPin;

use crate::bus::Bus;

/// Adapter from an embedded-hal SPI peripheral and a chip select pin.
///
/// The peripheral is expected to be clocked for card identification already,
/// so `configure` is a no-op here.
pub struct SpiBus<SPI, CS> {
    pub(crate) spi: SPI,
    cs: CS,
}

impl<SPI, CS, E, OE> SpiBus<SPI, CS>
where
    SPI: spi::Transfer<u8, Error = E>,
    CS: OutputPin<Error = OE>,
{
    pub fn new(spi: SPI, cs: CS) -> Self {
        Self { spi, cs }
    }

    pub fn free(self) -> (SPI, CS) {
        (self.spi, self.cs)
    }
}

impl<SPI, CS, E, OE> Bus for SpiBus<SPI, CS>
where
    SPI: spi::Transfer<u8, Error = E>,
    CS: OutputPin<Error = OE>,
{
    fn configure(&mut self, _prescale: u32, _mode: u32) -> Result<(), MciError> {
        Ok(()) // NOP
    }

    fn transfer(&mut self, value: u8) -> Result<u8, MciError> {
        let mut retval = value;
        self.spi.transfer(core::slice::from_mut(&mut retval)).map_err(|_| MciError::WriteError)?;
        Ok(retval)
    }

    fn select(&mut self, enabled: bool) -> Result<(), MciError> {
        let result = if enabled { self.cs.set_low() } else { self.cs.set_high() };
        result.map_err(|_| MciError::CouldNotSelectDevice)
    }
}

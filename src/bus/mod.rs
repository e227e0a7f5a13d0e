pub mod spi;

use embedded_error::mci::MciError;

pub const SD_MMC_BLOCK_SIZE: usize = 512;

/// Byte exchange with the card over a serial link.
///
/// There is no buffering: every `transfer` clocks exactly one byte out and one
/// byte in, in the order the calls are made.
pub trait Bus {
    /// Set the transfer clock prescaler and the SPI mode.
    fn configure(&mut self, prescale: u32, mode: u32) -> Result<(), MciError>;

    /// Exchange one byte with the card.
    fn transfer(&mut self, value: u8) -> Result<u8, MciError>;

    /// Drive chip select. `true` asserts it.
    fn select(&mut self, enabled: bool) -> Result<(), MciError>;
}

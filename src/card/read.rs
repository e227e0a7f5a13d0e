use embedded_error::mci::{CommandOrDataError, MciError};
use embedded_error::ImplError;
use embedded_hal::blocking::delay::DelayUs;

use crate::bus::spi::response::{R1Response, BLOCK_READ_DATA_TOKEN, NO_RESPONSE};
use crate::bus::{Bus, SD_MMC_BLOCK_SIZE};
use crate::fs::ReadTarget;

use super::command::READ_SINGLE_BLOCK;
use super::SdCard;

/// Data block trailer (CRC16), not checked in SPI mode
const CRC_LENGTH: usize = 2;
/// Wait for the data packet in timeout of 100ms
const START_TOKEN_ATTEMPTS: u32 = 1000;
const START_TOKEN_INTERVAL_US: u32 = 100;

impl<BUS: Bus, DELAY: DelayUs<u32>> SdCard<BUS, DELAY> {
    /// Read part of a sector.
    ///
    /// `offset + count` must not exceed 512. The whole data packet is clocked
    /// through regardless of the range, so the card is always left at a packet
    /// boundary, and the card is released on every path.
    pub fn read_partial(
        &mut self,
        target: ReadTarget<'_>,
        sector: u32,
        offset: usize,
    ) -> Result<(), MciError> {
        let count = target.count();
        if offset.checked_add(count).map_or(true, |end| end > SD_MMC_BLOCK_SIZE) {
            return Err(MciError::Impl(ImplError::InvalidConfiguration));
        }
        let address = self.card_type.address(sector);
        let result = self.read_packet(target, address, offset);
        self.release()?;
        if result.is_err() {
            log::warn!("Read of sector {} failed", sector);
        }
        result
    }

    fn read_packet(
        &mut self,
        target: ReadTarget<'_>,
        address: u32,
        offset: usize,
    ) -> Result<(), MciError> {
        if !R1Response(self.send_command(READ_SINGLE_BLOCK, address)?).ready() {
            return Err(MciError::ReadError);
        }
        self.wait_start_token()?;

        let count = target.count();
        self.skip(offset)?;
        match target {
            ReadTarget::Buffer(buffer) => {
                for byte in buffer.iter_mut() {
                    *byte = self.read_byte()?;
                }
            }
            ReadTarget::Stream { count, sink } => {
                for _ in 0..count {
                    let byte = self.read_byte()?;
                    sink(byte);
                }
            }
        }
        // Skip trailing bytes and CRC
        self.skip(SD_MMC_BLOCK_SIZE + CRC_LENGTH - offset - count)
    }

    fn wait_start_token(&mut self) -> Result<(), MciError> {
        let mut token = NO_RESPONSE;
        for _ in 0..START_TOKEN_ATTEMPTS {
            self.delay.delay_us(START_TOKEN_INTERVAL_US);
            token = self.read_byte()?;
            if token != NO_RESPONSE {
                break;
            }
        }
        match token {
            BLOCK_READ_DATA_TOKEN => Ok(()),
            NO_RESPONSE => Err(MciError::DataError(CommandOrDataError::Timeout)),
            _ => Err(MciError::ReadError),
        }
    }
}

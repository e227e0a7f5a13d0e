use embedded_error::mci::{CommandOrDataError, MciError};
use embedded_hal::blocking::delay::DelayUs;

use crate::bus::spi::response::{DataResponse, R1Response, ResponseCode, WriteToken, NO_RESPONSE};
use crate::bus::{Bus, SD_MMC_BLOCK_SIZE};

use super::command::WRITE_BLOCK;
use super::SdCard;

/// Wait for the end of the internal write in timeout of 1s
const BUSY_ATTEMPTS: u32 = 10_000;
const BUSY_INTERVAL_US: u32 = 100;

/// One phase of a single block write transaction.
///
/// A transaction is `Open`, any number of `Data` chunks totalling at most 512
/// bytes, then `Finalize`.
pub enum WriteStep<'a> {
    Open(u32),
    Data(&'a [u8]),
    Finalize,
}

impl<BUS: Bus, DELAY: DelayUs<u32>> SdCard<BUS, DELAY> {
    pub fn write_partial(&mut self, step: WriteStep<'_>) -> Result<(), MciError> {
        match step {
            WriteStep::Open(sector) => self.open_write(sector),
            WriteStep::Data(data) => self.write_data(data).map(|_| ()),
            WriteStep::Finalize => self.finalize_write(),
        }
    }

    /// Start a single block write at `sector`.
    pub fn open_write(&mut self, sector: u32) -> Result<(), MciError> {
        let address = self.card_type.address(sector);
        if !R1Response(self.send_command(WRITE_BLOCK, address)?).ready() {
            return Err(MciError::WriteError);
        }
        // Data block header
        self.write_byte(0xFF)?;
        self.write_byte(WriteToken::SingleWrite as u8)?;
        self.write_budget = SD_MMC_BLOCK_SIZE as u16;
        Ok(())
    }

    /// Send data into the open block. Bytes past the end of the block are
    /// dropped, the number of bytes sent is returned.
    pub fn write_data(&mut self, data: &[u8]) -> Result<usize, MciError> {
        let size = data.len().min(self.write_budget as usize);
        for &byte in data[..size].iter() {
            self.write_byte(byte)?;
            self.write_budget -= 1;
        }
        Ok(size)
    }

    /// Pad the block with zeros, send the CRC placeholder and wait for the
    /// card to finish programming. The card is released on every path.
    pub fn finalize_write(&mut self) -> Result<(), MciError> {
        let result = self.finish_block();
        self.write_budget = 0;
        self.release()?;
        result
    }

    fn finish_block(&mut self) -> Result<(), MciError> {
        // Fill left bytes and CRC with zeros
        for _ in 0..self.write_budget as usize + 2 {
            self.write_byte(0)?;
        }

        let token = self.read_byte()?;
        match DataResponse::try_from(token).and_then(|token| token.response_code()) {
            Some(ResponseCode::Accepted) => (),
            Some(ResponseCode::CRCError) => {
                return Err(MciError::DataError(CommandOrDataError::Crc));
            }
            _ => return Err(MciError::WriteError),
        }

        let mut attempts = BUSY_ATTEMPTS;
        while self.read_byte()? != NO_RESPONSE && attempts > 0 {
            self.delay.delay_us(BUSY_INTERVAL_US);
            attempts -= 1;
        }
        if attempts == 0 {
            log::warn!("SD card busy after write");
            return Err(MciError::DataError(CommandOrDataError::Timeout));
        }
        Ok(())
    }
}

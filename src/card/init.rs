use bit_field::BitField;
use embedded_error::mci::MciError;
use embedded_hal::blocking::delay::DelayUs;

use crate::bus::spi::response::R1Response;
use crate::bus::{Bus, SD_MMC_BLOCK_SIZE};

use super::command::{
    Command, GO_IDLE_STATE, MMC_SEND_OP_COND, READ_OCR, SD_SEND_OP_COND, SEND_IF_COND,
    SET_BLOCKLEN,
};
use super::{CardType, SdCard};

/// Transfer clock prescaler used for identification
pub const IDENTIFICATION_PRESCALE: u32 = 16;
pub const SPI_MODE: u32 = 0;

/// Voltage range 2.7-3.6V and check pattern
const IF_COND_ARGUMENT: u32 = 0x1AA;
const IF_COND_CHECK_PATTERN: u8 = 0xAA;
/// ACMD41 High Capacity Support
const ACMD41_HCS: usize = 30;
/// OCR Card Capacity Status
const OCR_CCS: usize = 30;

/// Attempts to leave idle state, 1ms apart
const OP_COND_ATTEMPTS: u32 = 1000;
const OP_COND_INTERVAL_US: u32 = 1000;

impl<BUS: Bus, DELAY: DelayUs<u32>> SdCard<BUS, DELAY> {
    /// Identify the card and put it in transfer state.
    ///
    /// Negotiates MMCv3, SDv1 or SDv2 and byte or block addressing. The result
    /// is kept for every following block operation, an empty classification
    /// is reported as [`MciError::UnusableCard`]. The card is released on
    /// every path.
    pub fn initialize(&mut self) -> Result<CardType, MciError> {
        let result = self.identify();
        self.card_type = *result.as_ref().unwrap_or(&CardType::empty());
        self.release()?;

        let card_type = result?;
        if card_type.is_empty() {
            log::warn!("SD card not usable");
            return Err(MciError::UnusableCard);
        }
        log::debug!("SD card is {:?}", card_type);
        Ok(card_type)
    }

    fn identify(&mut self) -> Result<CardType, MciError> {
        let mut card_type = CardType::empty();

        self.bus.configure(IDENTIFICATION_PRESCALE, SPI_MODE)?;
        // Supply minimum of 74 clock cycles without CS asserted.
        self.bus.select(false)?;
        self.skip(10)?;

        if !R1Response(self.send_command(GO_IDLE_STATE, 0)?).idle() {
            return Ok(card_type);
        }

        if R1Response(self.send_command(SEND_IF_COND, IF_COND_ARGUMENT)?).idle() {
            // SDv2, trailing bytes of R7
            let mut r7 = [0u8; 4];
            for byte in r7.iter_mut() {
                *byte = self.read_byte()?;
            }
            if r7[2] != 0x01 || r7[3] != IF_COND_CHECK_PATTERN {
                log::debug!("SD card rejected voltage range: {:02x?}", r7);
                return Ok(card_type);
            }
            let mut argument = 0u32;
            argument.set_bit(ACMD41_HCS, true);
            if !self.wait_ready(SD_SEND_OP_COND, argument)? {
                return Ok(card_type);
            }
            if R1Response(self.send_command(READ_OCR, 0)?).ready() {
                let mut ocr = [0u8; 4];
                for byte in ocr.iter_mut() {
                    *byte = self.read_byte()?;
                }
                let ocr = u32::from_be_bytes(ocr);
                card_type.set_sd2(true).set_block_addressing(ocr.get_bit(OCR_CCS));
            }
        } else {
            // SDv1 or MMCv3
            let command = if R1Response(self.send_command(SD_SEND_OP_COND, 0)?).accepted() {
                card_type.set_sd1(true);
                SD_SEND_OP_COND
            } else {
                card_type.set_mmc(true);
                MMC_SEND_OP_COND
            };
            if !self.wait_ready(command, 0)? || !self.set_block_length()? {
                card_type.set_unknown();
            }
        }
        Ok(card_type)
    }

    fn set_block_length(&mut self) -> Result<bool, MciError> {
        let response = self.send_command(SET_BLOCKLEN, SD_MMC_BLOCK_SIZE as u32)?;
        Ok(R1Response(response).ready())
    }

    /// Repeat an operating condition command until the card leaves idle state.
    fn wait_ready(&mut self, command: Command, argument: u32) -> Result<bool, MciError> {
        for _ in 0..OP_COND_ATTEMPTS {
            if R1Response(self.send_command(command, argument)?).ready() {
                return Ok(true);
            }
            self.delay.delay_us(OP_COND_INTERVAL_US);
        }
        log::warn!("CMD{} timed out waiting for ready", command.index());
        Ok(false)
    }
}

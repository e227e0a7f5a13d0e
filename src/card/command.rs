use embedded_error::mci::MciError;
use embedded_hal::blocking::delay::DelayUs;

use crate::bus::spi::response::{R1Response, NO_RESPONSE};
use crate::bus::Bus;

use super::SdCard;

/// A card command in SPI mode.
///
/// Application commands (ACMD<n>) are sent as the sequence CMD55, CMD<n>.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Command {
    index: u8,
    application: bool,
}

impl Command {
    pub const fn new(index: u8) -> Self {
        Self { index: index & 0x3F, application: false }
    }

    pub const fn application(index: u8) -> Self {
        Self { index: index & 0x3F, application: true }
    }

    pub fn index(self) -> u8 {
        self.index
    }

    pub fn is_application(self) -> bool {
        self.application
    }

    /// Start bit, transmission bit and command index
    pub fn token(self) -> u8 {
        0x40 | self.index
    }

    /// CRC7 and stop bit.
    ///
    /// The card only checks the CRC of CMD0 and CMD8 before it is initialized,
    /// and only ever sees CMD0(0) and CMD8(0x1AA) at that point.
    pub fn trailer(self) -> u8 {
        match self {
            GO_IDLE_STATE => 0x95,
            SEND_IF_COND => 0x87,
            _ => 0x01,
        }
    }
}

pub const GO_IDLE_STATE: Command = Command::new(0);
pub const MMC_SEND_OP_COND: Command = Command::new(1);
pub const SEND_IF_COND: Command = Command::new(8);
pub const SET_BLOCKLEN: Command = Command::new(16);
pub const READ_SINGLE_BLOCK: Command = Command::new(17);
pub const WRITE_BLOCK: Command = Command::new(24);
pub const APP_CMD: Command = Command::new(55);
pub const READ_OCR: Command = Command::new(58);
pub const SD_SEND_OP_COND: Command = Command::application(41);

/// Number of exchanges to wait for a response with bit 7 clear.
const NCR_ATTEMPTS: usize = 10;

pub fn crc7(data: &[u8]) -> u8 {
    let mut crc = 0u8;
    for &b in data.iter() {
        for i in 0..8 {
            crc <<= 1;
            if (((b << i) & 0x80) ^ (crc & 0x80)) != 0 {
                crc ^= 0x09;
            }
        }
    }
    (crc << 1) | 1
}

impl<BUS: Bus, DELAY: DelayUs<u32>> SdCard<BUS, DELAY> {
    /// Send a command packet and return the R1 response byte.
    ///
    /// Returns [`NO_RESPONSE`] when the card stays silent for the whole
    /// response window. The card is left selected.
    pub fn send_command(&mut self, command: Command, argument: u32) -> Result<u8, MciError> {
        if command.is_application() {
            let response = self.send_command(APP_CMD, 0)?;
            if response > 1 {
                return Ok(response);
            }
        }

        // Select the card
        self.bus.select(false)?;
        self.read_byte()?;
        self.bus.select(true)?;
        self.read_byte()?;

        let mut frame = [0u8; 6];
        frame[0] = command.token();
        frame[1..5].copy_from_slice(&argument.to_be_bytes());
        frame[5] = command.trailer();
        for &byte in frame.iter() {
            self.write_byte(byte)?;
        }

        let mut response = NO_RESPONSE;
        for _ in 0..NCR_ATTEMPTS {
            response = self.read_byte()?;
            if R1Response(response).valid() {
                break;
            }
        }
        log::trace!("CMD{}({:#010x}) -> {:#04x}", command.index(), argument, response);
        Ok(response)
    }
}

mod card_type;
pub mod command;
mod init;
mod read;
mod write;

use embedded_error::mci::MciError;
use embedded_hal::blocking::delay::DelayUs;

use crate::bus::Bus;
use crate::fs::DiskIo;

pub use card_type::CardType;
pub use crate::fs::ReadTarget;
pub use write::WriteStep;

/// An SD/MMC card session on a byte exchange bus.
///
/// Holds the classification found by [`SdCard::initialize`] and the byte
/// budget of the write transaction in progress. Every block operation reads
/// the classification to scale sector numbers.
pub struct SdCard<BUS, DELAY> {
    pub(crate) bus: BUS,
    pub(crate) delay: DELAY,
    /// Card type, empty until initialized
    pub(crate) card_type: CardType,
    /// Bytes still owed to the open write block
    pub(crate) write_budget: u16,
}

impl<BUS: Bus, DELAY: DelayUs<u32>> SdCard<BUS, DELAY> {
    pub fn new(bus: BUS, delay: DELAY) -> Self {
        Self { bus, delay, card_type: CardType::empty(), write_budget: 0 }
    }

    pub fn card_type(&self) -> CardType {
        self.card_type
    }

    /// Bytes the open write transaction still expects.
    pub fn write_budget(&self) -> u16 {
        self.write_budget
    }

    pub fn free(self) -> (BUS, DELAY) {
        (self.bus, self.delay)
    }

    pub(crate) fn write_byte(&mut self, value: u8) -> Result<(), MciError> {
        self.bus.transfer(value).map(|_| ())
    }

    pub(crate) fn read_byte(&mut self) -> Result<u8, MciError> {
        self.bus.transfer(0xFF)
    }

    pub(crate) fn skip(&mut self, count: usize) -> Result<(), MciError> {
        for _ in 0..count {
            self.read_byte()?;
        }
        Ok(())
    }

    /// Deselect the card and give it 8 clocks to release DO.
    pub(crate) fn release(&mut self) -> Result<(), MciError> {
        self.bus.select(false)?;
        self.read_byte().map(|_| ())
    }
}

impl<BUS: Bus, DELAY: DelayUs<u32>> DiskIo for SdCard<BUS, DELAY> {
    type Error = MciError;

    fn initialize(&mut self) -> Result<(), MciError> {
        SdCard::initialize(self).map(|_| ())
    }

    fn read_partial(
        &mut self,
        target: ReadTarget<'_>,
        sector: u32,
        offset: usize,
    ) -> Result<(), MciError> {
        SdCard::read_partial(self, target, sector, offset)
    }

    fn write_partial(&mut self, data: Option<&[u8]>, size_or_sector: u32) -> Result<(), MciError> {
        let step = match data {
            Some(data) => {
                let size = (size_or_sector as usize).min(data.len());
                WriteStep::Data(&data[..size])
            }
            None if size_or_sector != 0 => WriteStep::Open(size_or_sector),
            None => WriteStep::Finalize,
        };
        SdCard::write_partial(self, step)
    }
}

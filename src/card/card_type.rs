use core::fmt;

use bit_field::BitField;

/// Negotiated protocol family and addressing granularity.
///
/// b0: MMC ver 3, b1: SD ver 1, b2: SD ver 2, b3: block addressing
#[derive(Copy, Clone, Default, PartialEq, Eq)]
pub struct CardType(u8);

impl CardType {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub fn from_bits(bits: u8) -> Self {
        Self(bits & 0x0F)
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn set_unknown(&mut self) -> &mut Self {
        self.0 = 0x0;
        self
    }

    pub fn set_mmc(&mut self, mmc: bool) -> &mut Self {
        self.0.set_bit(0, mmc);
        self
    }

    pub fn mmc(self) -> bool {
        self.0.get_bit(0)
    }

    pub fn set_sd1(&mut self, sd1: bool) -> &mut Self {
        self.0.set_bit(1, sd1);
        self
    }

    pub fn sd1(self) -> bool {
        self.0.get_bit(1)
    }

    pub fn set_sd2(&mut self, sd2: bool) -> &mut Self {
        self.0.set_bit(2, sd2);
        self
    }

    pub fn sd2(self) -> bool {
        self.0.get_bit(2)
    }

    pub fn sd(self) -> bool {
        self.sd1() || self.sd2()
    }

    pub fn set_block_addressing(&mut self, block: bool) -> &mut Self {
        self.0.set_bit(3, block);
        self
    }

    pub fn block_addressing(self) -> bool {
        self.0.get_bit(3)
    }

    /// Address argument for a sector on this card.
    ///
    /// SDSC and MMC cards use byte addresses, SDHC and SDXC cards (CCS=1) take
    /// the 512 byte block number directly.
    pub fn address(self, sector: u32) -> u32 {
        if self.block_addressing() {
            sector
        } else {
            sector.wrapping_mul(crate::bus::SD_MMC_BLOCK_SIZE as u32)
        }
    }
}

impl fmt::Debug for CardType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("CardType(none)");
        }
        let family = match (self.mmc(), self.sd1(), self.sd2()) {
            (true, _, _) => "MMCv3",
            (_, true, _) => "SDv1",
            (_, _, true) => "SDv2",
            _ => "?",
        };
        let addressing = if self.block_addressing() { "block" } else { "byte" };
        write!(f, "CardType({}, {} addressing)", family, addressing)
    }
}

use super::Reg;

/// Disk image state published to the emulated Disk II controller.
///
/// `active`, `lba`, `rd` and `wr` belong to the hardware and are not part of
/// this record.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct VolumeStatus {
    pub ready: bool,
    pub mounted: bool,
    pub readonly: bool,
    /// Image size in bytes
    pub size: u32,
    pub block_count: u8,
    pub ack: u32,
}

impl Default for VolumeStatus {
    /// Not ready, read-only 140K nibble image geometry
    fn default() -> Self {
        Self {
            ready: false,
            mounted: false,
            readonly: true,
            size: 0x40000,
            block_count: 0x80,
            ack: 0,
        }
    }
}

impl VolumeStatus {
    /// A loaded image of `size` bytes.
    pub fn mounted(size: u32, block_count: u8, readonly: bool) -> Self {
        Self { ready: true, mounted: true, readonly, size, block_count, ack: 1 }
    }
}

pub trait VolumePort {
    fn publish(&mut self, status: &VolumeStatus);
}

const READY: usize = 0x00;
const ACTIVE: usize = 0x04;
const MOUNTED: usize = 0x08;
const READONLY: usize = 0x0C;
const SIZE: usize = 0x10;
const BLK_CNT: usize = 0x18;
const ACK: usize = 0x24;

/// One volume status register block.
pub struct VolumeRegisters {
    ready: Reg<u8>,
    active: Reg<u8>,
    mounted: Reg<u8>,
    readonly: Reg<u8>,
    size: Reg<u32>,
    blk_cnt: Reg<u8>,
    ack: Reg<u32>,
}

impl VolumeRegisters {
    /// # Safety
    ///
    /// `base` must be a volume status block.
    pub unsafe fn new(base: usize) -> Self {
        Self {
            ready: Reg::new(base + READY),
            active: Reg::new(base + ACTIVE),
            mounted: Reg::new(base + MOUNTED),
            readonly: Reg::new(base + READONLY),
            size: Reg::new(base + SIZE),
            blk_cnt: Reg::new(base + BLK_CNT),
            ack: Reg::new(base + ACK),
        }
    }

    /// The controller is currently spinning this volume.
    pub fn active(&self) -> bool {
        self.active.read() != 0
    }
}

impl VolumePort for VolumeRegisters {
    fn publish(&mut self, status: &VolumeStatus) {
        // geometry first, the controller samples it on the ready edge
        self.readonly.write(status.readonly as u8);
        self.size.write(status.size);
        self.blk_cnt.write(status.block_count);
        self.ready.write(status.ready as u8);
        self.mounted.write(status.mounted as u8);
        self.ack.write(status.ack);
    }
}

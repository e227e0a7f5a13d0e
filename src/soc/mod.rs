//! Memory mapped peripherals of the A2FPGA soft core.
//!
//! Everything here is a thin wrapper over volatile register accesses. The
//! boot stages only see these through the traits they define
//! ([`crate::bus::Bus`], [`host::HostBus`], [`volume::VolumePort`],
//! [`cpu::Cpu`], [`gpio::StatusLed`]) and the embedded-hal delay traits.

pub mod cpu;
pub mod gpio;
pub mod host;
pub mod sdcard;
pub mod timer;
pub mod uart;
pub mod volume;

use core::marker::PhantomData;
use core::ptr::{read_volatile, write_volatile};

/// A single memory mapped register.
#[derive(Debug)]
pub struct Reg<T> {
    address: usize,
    _marker: PhantomData<T>,
}

impl<T> Clone for Reg<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Reg<T> {}

impl<T: Copy> Reg<T> {
    /// # Safety
    ///
    /// `address` must be a register (or memory) valid for volatile accesses of
    /// `T` for as long as the returned value is used.
    pub const unsafe fn new(address: usize) -> Self {
        Self { address, _marker: PhantomData }
    }

    pub fn address(&self) -> usize {
        self.address
    }

    #[inline(always)]
    pub fn read(&self) -> T {
        unsafe { read_volatile(self.address as *const T) }
    }

    #[inline(always)]
    pub fn write(&self, value: T) {
        unsafe { write_volatile(self.address as *mut T, value) }
    }
}

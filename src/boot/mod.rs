//! The two boot stages.
//!
//! The loader ([`loader::Loader`]) runs from ROM, reads the kernel image off
//! the card and jumps to it with a [`BootParams`] record. The kernel
//! ([`kernel::Kernel`]) loads the disk images, publishes them to the Disk II
//! controller and serves the menu forever.

pub mod irq;
pub mod kernel;
pub mod loader;
#[cfg(target_arch = "riscv32")]
pub mod target;

use crate::soc::host::{self, HostBus};

/// Services the loader keeps offering once the kernel is running.
pub trait Firmware {
    fn wait_for_cmd(&mut self) -> u8;
    fn wait_for_char(&mut self) -> u8;
    fn wait_for_reset(&mut self) -> u8;
}

pub const BOOT_PARAMS_VERSION: u32 = 1;

/// Hand-off record from the loader to the kernel.
///
/// Both images are built by this crate, so the slice and trait object
/// pointers share one layout.
#[repr(C)]
pub struct BootParams<'a> {
    pub version: u32,
    /// Open the menu without waiting for an Apple II reset
    pub enter_menu: bool,
    pub firmware_date: &'a str,
    pub firmware_time: &'a str,
    pub firmware: &'a mut dyn Firmware,
}

/// Kernel entry point as called by the loader.
#[allow(improper_ctypes_definitions)]
pub type KernelEntry = extern "C" fn(&mut BootParams<'_>) -> !;

/// Transfer control to a loaded kernel image.
///
/// # Safety
///
/// `entry` must be the address of a function with the [`KernelEntry`]
/// signature and interrupts must be masked.
pub unsafe fn enter_kernel(entry: usize, params: &mut BootParams<'_>) -> ! {
    let kernel: KernelEntry = core::mem::transmute(entry);
    kernel(params)
}

/// Peripherals both stages drive.
pub struct Board<CPU, LED, H, CON, D> {
    pub cpu: CPU,
    pub led: LED,
    pub host: H,
    pub console: CON,
    /// Millisecond delay
    pub delay: D,
}

impl<CPU, LED, H: HostBus, CON, D> Firmware for Board<CPU, LED, H, CON, D> {
    fn wait_for_cmd(&mut self) -> u8 {
        host::wait_for_cmd(&mut self.host)
    }

    fn wait_for_char(&mut self) -> u8 {
        host::wait_for_char(&mut self.host)
    }

    fn wait_for_reset(&mut self) -> u8 {
        host::wait_for_reset(&mut self.host)
    }
}

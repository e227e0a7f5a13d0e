//! Wiring of both stages to the soft core peripherals.
//!
//! The board binaries provide the startup code, a [`FileSystem`] over
//! [`sd_card`] and call [`firmware_main`] or [`kernel_main`].

use core::ptr::{addr_of, addr_of_mut};
use core::slice;

use log::LevelFilter;

use crate::card::SdCard;
use crate::config::{
    KernelConfig, LoaderConfig, Profile, DISK_BUFFERS, DISK_BUFFER_SIZE, KERNEL_BASE,
    KERNEL_WINDOW_SIZE, TEXT_PAGE,
};
use crate::console::{Screen, TextPage};
use crate::fs::FileSystem;
use crate::soc::cpu::PicoRv32;
use crate::soc::gpio::Gpio;
use crate::soc::host::A2Bus;
use crate::soc::sdcard::SdcardPort;
use crate::soc::timer::{Countdown, SystemTimer};
use crate::soc::volume::VolumeRegisters;

use super::irq::handle_irq;
use super::kernel::Kernel;
use super::loader::Loader;
use super::{Board, BootParams};

pub type SocBoard = Board<PicoRv32, Gpio, A2Bus, &'static mut Screen<TextPage>, SystemTimer>;
pub type SocCard = SdCard<SdcardPort, Countdown>;

// Shared by the stage code and the IRQ handler, single hart
static mut SCREEN: Screen<TextPage> = Screen::new(unsafe { TextPage::new(TEXT_PAGE) });
static mut PROFILE: Profile = Profile::ENHANCED;

/// # Safety
///
/// `profile` must describe the board this runs on. The returned board
/// aliases the global screen.
pub unsafe fn board(profile: &Profile) -> SocBoard {
    Board {
        cpu: PicoRv32,
        led: Gpio::new(profile.gpio, profile.ws2812),
        host: A2Bus::new(profile.host_bus),
        console: &mut *addr_of_mut!(SCREEN),
        delay: SystemTimer::new(profile.system_time()),
    }
}

/// # Safety
///
/// `profile` must describe the board this runs on.
pub unsafe fn sd_card(profile: &Profile) -> SocCard {
    SdCard::new(SdcardPort::new(profile.sdcard), Countdown::new(profile.countdown()))
}

pub extern "C" fn irq_handler(irq_mask: u32, regs: *mut u32) {
    let config = LoaderConfig::default();
    unsafe {
        let regs = slice::from_raw_parts(regs as *const u32, 32);
        let mut board = board(&*addr_of!(PROFILE));
        handle_irq(irq_mask, regs, &mut board, config.timer_period, config.failure_display_ms);
    }
}

/// First stage entry.
///
/// # Safety
///
/// Must run once, from reset, on the board `profile` describes.
pub unsafe fn firmware_main<FS: FileSystem>(profile: Profile, fs: FS) -> ! {
    *addr_of_mut!(PROFILE) = profile;
    crate::logger::init(LevelFilter::Info);

    let window = slice::from_raw_parts_mut(KERNEL_BASE as *mut u8, KERNEL_WINDOW_SIZE);
    let loader = Loader::new(LoaderConfig::default(), fs, board(&profile));
    loader.run(Some(irq_handler), window, KERNEL_BASE, false)
}

/// Second stage entry.
///
/// # Safety
///
/// Must be entered once by the loader on the board `profile` describes.
pub unsafe fn kernel_main<FS: FileSystem>(
    profile: Profile,
    fs: FS,
    params: &mut BootParams<'_>,
) -> ! {
    crate::logger::init(LevelFilter::Info);

    let volumes =
        [VolumeRegisters::new(profile.volumes[0]), VolumeRegisters::new(profile.volumes[1])];
    let buffers = [
        slice::from_raw_parts_mut(DISK_BUFFERS[0] as *mut u8, DISK_BUFFER_SIZE),
        slice::from_raw_parts_mut(DISK_BUFFERS[1] as *mut u8, DISK_BUFFER_SIZE),
    ];
    let kernel = Kernel::new(KernelConfig::for_profile(&profile), fs, volumes, board(&profile));
    kernel.run(params, buffers)
}

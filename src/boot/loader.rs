use core::fmt::Write;

use embedded_hal::blocking::delay::DelayMs;

use crate::config::{LoaderConfig, BUILD_DATE, BUILD_TIME};
use crate::console::Console;
use crate::fs::{FileSystem, FsError, OpenMode};
use crate::soc::cpu::{Cpu, IrqHandlerFn};
use crate::soc::gpio::StatusLed;
use crate::soc::host::HostBus;

use super::{enter_kernel, Board, BootParams, BOOT_PARAMS_VERSION};

/// Every IRQ masked
const MASK_ALL: u32 = 0xFFFF_FFFF;

/// First boot stage: reads the kernel image into RAM and enters it.
pub struct Loader<FS, CPU, LED, H, CON, D> {
    config: LoaderConfig,
    fs: FS,
    board: Board<CPU, LED, H, CON, D>,
}

impl<FS, CPU, LED, H, CON, D> Loader<FS, CPU, LED, H, CON, D>
where
    FS: FileSystem,
    CPU: Cpu,
    LED: StatusLed,
    H: HostBus,
    CON: Console,
    D: DelayMs<u32>,
{
    pub fn new(config: LoaderConfig, fs: FS, board: Board<CPU, LED, H, CON, D>) -> Self {
        Self { config, fs, board }
    }

    pub fn board(&mut self) -> &mut Board<CPU, LED, H, CON, D> {
        &mut self.board
    }

    /// Install the IRQ handler, start the heartbeat timer and show the banner.
    pub fn start(&mut self, handler: Option<IrqHandlerFn>) {
        self.board.cpu.set_irq_handler(handler);
        self.board.cpu.mask_irq(0);
        self.board.cpu.set_timer(self.config.timer_period);

        self.board.console.clear();
        self.board.console.write_str(self.config.banner).ok();
        self.board.host.set_bus_ready();
        log::info!("loader built {} {}", BUILD_DATE, BUILD_TIME);
    }

    /// Read the boot file into `window`, returning the image size.
    pub fn load(&mut self, window: &mut [u8]) -> Result<usize, FsError> {
        self.board.console.write_str("\nMounting SDCard\n").ok();
        self.fs.mount()?;

        self.board.console.write_str("\nOpening boot.bin\n").ok();
        let mut file = self.fs.open(self.config.boot_file, OpenMode::Read)?;

        self.board.console.write_str("\nLoading kernel...\n").ok();
        let size = self.fs.read(&mut file, window)?;
        self.fs.close(file)?;
        log::info!("{} bytes of {}", size, self.config.boot_file);

        self.board.console.write_str("\nKernel loaded!\n").ok();
        self.board.led.set(0);
        Ok(size)
    }

    /// Mask every IRQ and detach the handler before leaving the loader.
    pub fn stop_interrupts(&mut self) {
        self.board.cpu.mask_irq(MASK_ALL);
        self.board.cpu.set_irq_handler(None);
    }

    /// Show the FatFs result code for the configured time.
    pub fn report_failure(&mut self, error: FsError) {
        log::error!("boot failed: {}", error);
        self.board.host.set_bus_ready();
        self.board.host.set_video_enable(true);
        write!(self.board.console, "\nDisk error: {}", error.code()).ok();

        self.board.delay.delay_ms(self.config.failure_display_ms);
        self.board.host.set_video_enable(false);
    }

    pub fn halt(&mut self) -> ! {
        loop {
            core::hint::spin_loop();
        }
    }

    /// Load the kernel into `window` and enter it at `entry`.
    ///
    /// # Safety
    ///
    /// `window` must be the RAM `entry` points into, and whatever the boot
    /// file holds is executed.
    pub unsafe fn run(
        mut self,
        handler: Option<IrqHandlerFn>,
        window: &mut [u8],
        entry: usize,
        enter_menu: bool,
    ) -> ! {
        self.start(handler);
        if let Err(error) = self.load(window) {
            self.report_failure(error);
            self.halt()
        }
        self.stop_interrupts();

        let mut params = BootParams {
            version: BOOT_PARAMS_VERSION,
            enter_menu,
            firmware_date: BUILD_DATE,
            firmware_time: BUILD_TIME,
            firmware: &mut self.board,
        };
        enter_kernel(entry, &mut params)
    }
}

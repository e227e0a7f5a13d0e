use core::fmt::Write;

use embedded_hal::blocking::delay::DelayMs;

use crate::config::{EventLoop, KernelConfig, BUILD_DATE, BUILD_TIME};
use crate::console::Console;
use crate::fs::{FileSystem, FsError, OpenMode};
use crate::soc::cpu::Cpu;
use crate::soc::gpio::{StatusLed, RED};
use crate::soc::host::{self, HostBus};
use crate::soc::volume::{VolumePort, VolumeStatus};

use super::{Board, BootParams, Firmware};

/// Second boot stage.
///
/// Publishes the disk images to the Disk II controller, then waits for the
/// user forever. Image load failures are reported and leave the volume
/// unready; the event loop runs regardless.
pub struct Kernel<FS, V, CPU, LED, H, CON, D> {
    config: KernelConfig,
    fs: FS,
    volumes: [V; 2],
    board: Board<CPU, LED, H, CON, D>,
}

impl<FS, V, CPU, LED, H, CON, D> Kernel<FS, V, CPU, LED, H, CON, D>
where
    FS: FileSystem,
    V: VolumePort,
    CPU: Cpu,
    LED: StatusLed,
    H: HostBus,
    CON: Console,
    D: DelayMs<u32>,
{
    pub fn new(
        config: KernelConfig,
        fs: FS,
        volumes: [V; 2],
        board: Board<CPU, LED, H, CON, D>,
    ) -> Self {
        Self { config, fs, volumes, board }
    }

    pub fn board(&mut self) -> &mut Board<CPU, LED, H, CON, D> {
        &mut self.board
    }

    pub fn volumes(&self) -> &[V; 2] {
        &self.volumes
    }

    /// Bring the volumes up and return whether the first event loop step
    /// skips the reset wait.
    pub fn start(&mut self, params: &BootParams<'_>, mut buffers: [&mut [u8]; 2]) -> bool {
        self.board.cpu.set_irq_handler(None);

        self.board.console.clear();
        let console = &mut self.board.console;
        console.write_str("A2FPGA OS Loaded\n\n").ok();
        writeln!(console, "Firmware Build: {} {}", params.firmware_date, params.firmware_time).ok();
        writeln!(console, "Kernel Build: {} {}\n", BUILD_DATE, BUILD_TIME).ok();

        for index in 0..self.volumes.len() {
            let status = self.unmounted(index);
            self.volumes[index].publish(&status);
        }

        match self.fs.mount() {
            Ok(()) => {
                for (index, buffer) in buffers.iter_mut().enumerate() {
                    if let Err(error) = self.load_volume(index, buffer) {
                        let volume = self.config.volumes[index];
                        log::warn!("volume {} not loaded: {}", index, error);
                        self.put_rc(error);
                        writeln!(
                            self.board.console,
                            "Unable to load {} ({})",
                            volume.label,
                            volume.image.unwrap_or("")
                        )
                        .ok();
                    }
                }
                if self.config.list_directory {
                    if let Err(error) = self.dump_directory() {
                        self.put_rc(error);
                        self.halt();
                    }
                }
            }
            Err(error) => {
                log::warn!("mount failed: {}", error);
                self.put_rc(error);
                self.board.console.write_str("Unable to mount SD Card\n").ok();
            }
        }

        self.board.host.clear_reset();
        if self.board.host.cardrom_active() {
            self.board.console.write_str("\nA2FPGA Card Rom Active\n").ok();
        }
        if self.board.host.video_enabled() {
            self.board.console.write_str("\nA2FPGA Video Enabled\n").ok();
        }
        if params.enter_menu {
            self.board.console.write_str("\nSkipping initial reset wait\n").ok();
        }
        params.enter_menu
    }

    fn unmounted(&self, index: usize) -> VolumeStatus {
        let volume = &self.config.volumes[index];
        VolumeStatus {
            readonly: volume.readonly,
            size: volume.size,
            block_count: volume.block_count,
            ..Default::default()
        }
    }

    /// Load the configured image of a volume into its buffer and publish it.
    /// Returns the bytes read, `None` when the volume has no image.
    pub fn load_volume(
        &mut self,
        index: usize,
        buffer: &mut [u8],
    ) -> Result<Option<usize>, FsError> {
        let volume = self.config.volumes[index];
        let name = match volume.image {
            Some(name) => name,
            None => return Ok(None),
        };

        writeln!(self.board.console, "\nOpening {}...", volume.label).ok();
        let mut file = self.fs.open(name, OpenMode::Read)?;

        writeln!(self.board.console, "\nLoading {}...", volume.label).ok();
        let limit = buffer.len().min(volume.size as usize);
        let size = self.fs.read(&mut file, &mut buffer[..limit])?;
        self.fs.close(file)?;
        writeln!(self.board.console, "\n{:4} bytes read", size).ok();
        writeln!(self.board.console, "\n{} loaded!", volume.label).ok();

        // Only now is the whole image in the buffer
        let status = VolumeStatus::mounted(volume.size, volume.block_count, volume.readonly);
        self.volumes[index].publish(&status);
        log::info!("volume {}: {} ({} bytes)", index, name, size);
        Ok(Some(size))
    }

    /// List the root directory with file, directory and byte totals.
    pub fn dump_directory(&mut self) -> Result<(), FsError> {
        let mut dir = self.fs.open_dir("")?;
        let (mut files, mut dirs, mut bytes) = (0u32, 0u32, 0u64);
        let console = &mut self.board.console;
        while let Ok(Some(entry)) = self.fs.read_dir(&mut dir) {
            if entry.is_dir {
                dirs += 1;
            } else {
                files += 1;
                bytes += entry.size;
            }
            let kind = if entry.is_dir { 'D' } else { '-' };
            writeln!(console, "{} {:7}  {}", kind, entry.size, entry.name()).ok();
        }
        writeln!(console, "\n{:4} File(s)", files).ok();
        writeln!(console, "{:9} bytes total", bytes).ok();
        writeln!(console, "{:4} Dir(s)", dirs).ok();
        Ok(())
    }

    fn put_rc(&mut self, error: FsError) {
        self.board.host.set_video_enable(true);
        writeln!(self.board.console, "{}", error).ok();
    }

    /// One pass of the event loop.
    pub fn poll_event(&mut self, skip_reset_wait: bool, firmware: &mut dyn Firmware) {
        match self.config.event_loop {
            EventLoop::ResetHotKey { hot_key, exit_key, sample_window } => {
                self.reset_hot_key(skip_reset_wait, hot_key, exit_key, sample_window)
            }
            EventLoop::HostCommand { exit_key } => self.host_command(firmware, exit_key),
        }
    }

    fn reset_hot_key(&mut self, skip_reset_wait: bool, hot_key: u8, exit_key: u8, window: u32) {
        let host = &mut self.board.host;
        let mut hot_key_pressed = skip_reset_wait;
        if !skip_reset_wait {
            host::wait_for_reset(host);
            for _ in 0..window {
                match host.keycode() & 0x1F {
                    c if c == hot_key => {
                        hot_key_pressed = true;
                        break;
                    }
                    0 => continue,
                    _ => break,
                }
            }
        }
        host.clear_keycode();

        if hot_key_pressed {
            host.clear_reset();
            host.set_video_enable(true);
            self.board.console.write_str("\nEntering menu...\n").ok();
            self.echo_until(exit_key);
            self.board.console.write_str("\nExiting menu...\n").ok();
        }

        let host = &mut self.board.host;
        host.clear_reset();
        host.set_video_enable(false);
        host.release_cardrom();
    }

    fn host_command(&mut self, firmware: &mut dyn Firmware, exit_key: u8) {
        let command = firmware.wait_for_cmd();
        log::debug!("host command {:#04x}", command);
        self.board.host.clear_command();

        self.board.host.set_video_enable(true);
        self.board.console.write_str("\nEntering co-processor...\n").ok();
        self.echo_until(exit_key);
        self.board.console.write_str("\nExiting co-processor...\n").ok();
        self.board.host.set_video_enable(false);
    }

    fn echo_until(&mut self, exit_key: u8) {
        loop {
            let c = host::wait_for_char(&mut self.board.host);
            if c == exit_key {
                break;
            }
            self.board.console.put_char(c);
        }
    }

    /// Flash the failure on screen, then keep handing the card ROM back to
    /// the Apple II on every reset.
    pub fn halt(&mut self) -> ! {
        log::error!("kernel halted");
        let host = &mut self.board.host;
        host.set_bus_ready();
        self.board.led.set_color(RED);
        host.set_video_enable(true);
        self.board.delay.delay_ms(self.config.failure_display_ms);
        host.set_video_enable(false);
        host.release_cardrom();

        loop {
            host::wait_for_reset(host);
            host.release_cardrom();
        }
    }

    pub fn run(mut self, params: &mut BootParams<'_>, buffers: [&mut [u8]; 2]) -> ! {
        let mut skip_reset_wait = self.start(params, buffers);
        loop {
            self.poll_event(skip_reset_wait, &mut *params.firmware);
            skip_reset_wait = false;
        }
    }
}

//! Board profiles, memory map and boot stage settings.

/// Soft core RAM window holding the Apple II text page
pub const TEXT_PAGE: usize = 0x0402_0800;
/// Disk II image buffers, one per volume
pub const DISK_BUFFERS: [usize; 2] = [0x0408_0000, 0x040C_0000];
pub const DISK_BUFFER_SIZE: usize = 0x40000;
/// Stage two is loaded and entered here
pub const KERNEL_BASE: usize = 0x0440_0000;
pub const KERNEL_WINDOW_SIZE: usize = 0x40_0000;

pub const BUILD_DATE: &str = match option_env!("A2BOOT_BUILD_DATE") {
    Some(date) => date,
    None => "unknown",
};
pub const BUILD_TIME: &str = match option_env!("A2BOOT_BUILD_TIME") {
    Some(time) => time,
    None => "unknown",
};

/// Register map of one board.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Profile {
    pub name: &'static str,
    pub uart_clkdiv: usize,
    pub uart_data: usize,
    pub gpio: usize,
    pub ws2812: Option<usize>,
    pub host_bus: usize,
    pub sdcard: usize,
    pub volumes: [usize; 2],
    pub event_loop: EventLoop,
}

impl Profile {
    /// a2n20v2 Enhanced: volumes in their own block, reset driven menu
    pub const ENHANCED: Profile = Profile {
        name: "a2n20v2-enhanced",
        uart_clkdiv: 0x0200_0004,
        uart_data: 0x0200_0008,
        gpio: 0x0300_0000,
        ws2812: Some(0x0300_0004),
        host_bus: 0x0500_0000,
        sdcard: 0x0600_0000,
        volumes: [0x0700_0000, 0x0700_0080],
        event_loop: EventLoop::RESET_HOT_KEY,
    };

    /// picosoc: volumes inside the host bus block, command driven
    pub const PICOSOC: Profile = Profile {
        name: "picosoc",
        uart_clkdiv: 0x0200_0004,
        uart_data: 0x0200_0008,
        gpio: 0x0300_0000,
        ws2812: None,
        host_bus: 0x0500_0000,
        sdcard: 0x0600_0000,
        volumes: [0x0500_0080, 0x0500_00C0],
        event_loop: EventLoop::HOST_COMMAND,
    };

    /// Countdown register of the host bus block.
    pub fn countdown(&self) -> usize {
        self.host_bus + 0x4C
    }

    pub fn system_time(&self) -> usize {
        self.host_bus
    }
}

/// How the kernel waits for the user.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EventLoop {
    /// After each Apple II reset, sample the keyboard for the hot key.
    ResetHotKey { hot_key: u8, exit_key: u8, sample_window: u32 },
    /// Serve commands written by the card ROM.
    HostCommand { exit_key: u8 },
}

impl EventLoop {
    /// Ctrl-Z opens the menu, ESC leaves it
    pub const RESET_HOT_KEY: EventLoop =
        EventLoop::ResetHotKey { hot_key: 26, exit_key: 27, sample_window: 500 };
    pub const HOST_COMMAND: EventLoop = EventLoop::HostCommand { exit_key: b'Q' };
}

/// A disk image loaded at boot.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct VolumeConfig {
    pub image: Option<&'static str>,
    pub label: &'static str,
    pub size: u32,
    pub block_count: u8,
    pub readonly: bool,
}

impl Default for VolumeConfig {
    fn default() -> Self {
        Self {
            image: None,
            label: "",
            size: DISK_BUFFER_SIZE as u32,
            block_count: 0x80,
            readonly: true,
        }
    }
}

#[derive(Clone, Debug)]
pub struct LoaderConfig {
    pub banner: &'static str,
    pub boot_file: &'static str,
    /// Heartbeat timer period in CPU cycles
    pub timer_period: u32,
    /// How long fatal diagnostics stay on screen
    pub failure_display_ms: u32,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            banner: "        A2fpga Firmware v1.0b1\n\n",
            boot_file: "BOOT.BIN",
            timer_period: 10_000_000,
            failure_display_ms: 10_000,
        }
    }
}

#[derive(Clone, Debug)]
pub struct KernelConfig {
    pub volumes: [VolumeConfig; 2],
    pub event_loop: EventLoop,
    /// List the card root directory after mounting
    pub list_directory: bool,
    pub failure_display_ms: u32,
}

impl KernelConfig {
    pub fn for_profile(profile: &Profile) -> Self {
        Self { event_loop: profile.event_loop, ..Default::default() }
    }
}

impl Default for KernelConfig {
    fn default() -> Self {
        let dos33 =
            VolumeConfig { image: Some("dos33.nib"), label: "DOS 3.3", ..Default::default() };
        Self {
            volumes: [dos33, VolumeConfig::default()],
            event_loop: EventLoop::RESET_HOT_KEY,
            list_directory: false,
            failure_display_ms: 10_000,
        }
    }
}

use super::Reg;

/// Apple II bus side signals seen by the soft core.
///
/// All of these are level registers latched by the FPGA: reading never
/// clears them, the `clear_*` calls do.
pub trait HostBus {
    /// Last key code seen on the Apple II keyboard, 0 when none.
    fn keycode(&mut self) -> u8;
    fn clear_keycode(&mut self);
    /// Command byte written by the Apple II card ROM, 0 when none.
    fn command(&mut self) -> u8;
    fn clear_command(&mut self);
    /// Non zero once the Apple II has been reset.
    fn reset(&mut self) -> u8;
    fn clear_reset(&mut self);
    fn video_enabled(&mut self) -> bool;
    fn set_video_enable(&mut self, enabled: bool);
    fn cardrom_active(&mut self) -> bool;
    /// Hand the bus back to the Apple II.
    fn release_cardrom(&mut self);
    fn set_bus_ready(&mut self);
}

pub fn wait_for_cmd<H: HostBus + ?Sized>(host: &mut H) -> u8 {
    loop {
        let c = host.command();
        if c != 0 {
            host.clear_command();
            return c;
        }
    }
}

pub fn wait_for_char<H: HostBus + ?Sized>(host: &mut H) -> u8 {
    loop {
        let c = host.keycode();
        if c != 0 {
            host.clear_keycode();
            return c;
        }
    }
}

pub fn wait_for_reset<H: HostBus + ?Sized>(host: &mut H) -> u8 {
    loop {
        let c = host.reset();
        if c != 0 {
            host.clear_reset();
            return c;
        }
    }
}

const SYSTEM_TIME: usize = 0x00;
const KEYCODE: usize = 0x04;
const VIDEO_ENABLE: usize = 0x08;
const A2_CMD: usize = 0x44;
const A2BUS_READY: usize = 0x50;
const RESET: usize = 0x54;
const CARDROM_ACTIVE: usize = 0x58;
const CARDROM_RELEASE: usize = 0x5C;

/// Host bus register block.
pub struct A2Bus {
    keycode: Reg<u8>,
    video_enable: Reg<u8>,
    a2_cmd: Reg<u8>,
    a2bus_ready: Reg<u8>,
    reset: Reg<u8>,
    cardrom_active: Reg<u8>,
    cardrom_release: Reg<u8>,
}

impl A2Bus {
    /// # Safety
    ///
    /// `base` must be the host bus register block.
    pub unsafe fn new(base: usize) -> Self {
        Self {
            keycode: Reg::new(base + KEYCODE),
            video_enable: Reg::new(base + VIDEO_ENABLE),
            a2_cmd: Reg::new(base + A2_CMD),
            a2bus_ready: Reg::new(base + A2BUS_READY),
            reset: Reg::new(base + RESET),
            cardrom_active: Reg::new(base + CARDROM_ACTIVE),
            cardrom_release: Reg::new(base + CARDROM_RELEASE),
        }
    }

    /// Free running millisecond counter of the same block.
    ///
    /// # Safety
    ///
    /// As [`A2Bus::new`].
    pub unsafe fn system_time(base: usize) -> Reg<u32> {
        Reg::new(base + SYSTEM_TIME)
    }
}

impl HostBus for A2Bus {
    fn keycode(&mut self) -> u8 {
        self.keycode.read()
    }

    fn clear_keycode(&mut self) {
        self.keycode.write(0)
    }

    fn command(&mut self) -> u8 {
        self.a2_cmd.read()
    }

    fn clear_command(&mut self) {
        self.a2_cmd.write(0)
    }

    fn reset(&mut self) -> u8 {
        self.reset.read()
    }

    fn clear_reset(&mut self) {
        self.reset.write(0)
    }

    fn video_enabled(&mut self) -> bool {
        self.video_enable.read() != 0
    }

    fn set_video_enable(&mut self, enabled: bool) {
        self.video_enable.write(enabled as u8)
    }

    fn cardrom_active(&mut self) -> bool {
        self.cardrom_active.read() != 0
    }

    fn release_cardrom(&mut self) {
        self.cardrom_release.write(1)
    }

    fn set_bus_ready(&mut self) {
        self.a2bus_ready.write(1)
    }
}

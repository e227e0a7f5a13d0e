use super::Reg;

/// Board status indicators.
pub trait StatusLed {
    /// Heartbeat step.
    fn toggle(&mut self);
    fn set(&mut self, value: u32);
    /// 0x00RRGGBB on boards with a WS2812, ignored elsewhere.
    fn set_color(&mut self, _rgb: u32) {}
}

pub const RED: u32 = 0x00FF_0000;

pub struct Gpio {
    led: Reg<u32>,
    ws2812: Option<Reg<u32>>,
}

impl Gpio {
    /// # Safety
    ///
    /// `base` must be the GPIO block, `ws2812` the colour LED register when
    /// the board has one.
    pub unsafe fn new(base: usize, ws2812: Option<usize>) -> Self {
        Self { led: Reg::new(base), ws2812: ws2812.map(|a| Reg::new(a)) }
    }
}

impl StatusLed for Gpio {
    fn toggle(&mut self) {
        let lit = self.led.read() & 1;
        self.led.write(lit ^ 1);
    }

    fn set(&mut self, value: u32) {
        self.led.write(value)
    }

    fn set_color(&mut self, rgb: u32) {
        if let Some(reg) = self.ws2812 {
            reg.write(rgb)
        }
    }
}

//! Logging via the `log` crate, output to the SoC serial port.

use core::fmt::Write;

use log::{Level, LevelFilter, Metadata, Record};

use crate::config::Profile;
use crate::soc::uart::{Uart, DEFAULT_DIVISOR};

struct UartLogger {
    uart: Uart,
}

impl log::Log for UartLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= Level::Trace
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let level = match record.level() {
            Level::Error => "ERROR",
            Level::Warn => "WARN ",
            Level::Info => "INFO ",
            Level::Debug => "DEBUG",
            Level::Trace => "TRACE",
        };
        let mut uart = self.uart;
        // Format: [LEVEL] target: message
        writeln!(uart, "[{}] {}: {}", level, record.target(), record.args()).ok();
    }

    fn flush(&self) {}
}

// Both boards share the UART block
static LOGGER: UartLogger = UartLogger {
    uart: unsafe { Uart::new(Profile::ENHANCED.uart_clkdiv, Profile::ENHANCED.uart_data) },
};

/// Set the baud rate and install the serial logger.
///
/// # Safety
///
/// Must be called once, before anything logs. The soft core has no atomic
/// compare-and-swap, so the logger is installed without synchronization.
pub unsafe fn init(level: LevelFilter) {
    LOGGER.uart.set_divisor(DEFAULT_DIVISOR);
    if log::set_logger_racy(&LOGGER).is_ok() {
        log::set_max_level_racy(level);
    }
}

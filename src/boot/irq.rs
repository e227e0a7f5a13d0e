//! Loader interrupt handling: LED heartbeat and fault dumps.

use core::fmt::{self, Write};

use embedded_hal::blocking::delay::DelayMs;

use crate::console::Console;
use crate::soc::cpu::Cpu;
use crate::soc::gpio::StatusLed;
use crate::soc::host::HostBus;

use super::Board;

pub const IRQ_TIMER: u32 = 1 << 0;
/// EBREAK, ECALL or illegal instruction
pub const IRQ_ILLEGAL: u32 = 1 << 1;
pub const IRQ_BUS_ERROR: u32 = 1 << 2;

const EBREAK: u32 = 0x0010_0073;
const C_EBREAK: u32 = 0x9002;

/// Faulting instruction as far as it can be recovered from the saved
/// return address.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FaultReport {
    pub irq_mask: u32,
    pub pc: u32,
    pub instruction: u32,
}

impl FaultReport {
    /// `return_address` points past the faulting instruction. It is taken to
    /// be 32 bits wide unless the half-word before the return address does
    /// not look like the low half of one. This guesses wrong on some
    /// compressed sequences and is always right for uncompressed code.
    pub fn decode<F: Fn(u32) -> u16>(irq_mask: u32, return_address: u32, fetch: F) -> Self {
        let pc = return_address.wrapping_sub(4);
        let instruction = (fetch(pc.wrapping_add(2)) as u32) << 16 | fetch(pc) as u32;
        if instruction & 3 == 3 {
            return Self { irq_mask, pc, instruction };
        }
        let pc = return_address.wrapping_sub(2);
        Self { irq_mask, pc, instruction: fetch(pc) as u32 }
    }

    pub fn compressed(&self) -> bool {
        self.instruction & 3 != 3
    }

    pub fn write<W: Write + ?Sized>(&self, out: &mut W, regs: &[u32]) -> fmt::Result {
        out.write_str("\n--\n")?;
        if self.irq_mask & IRQ_BUS_ERROR != 0 {
            out.write_str("Bus error in ")?;
        }
        if self.irq_mask & IRQ_ILLEGAL != 0 {
            match self.instruction {
                EBREAK | C_EBREAK => out.write_str("SBREAK ")?,
                _ => out.write_str("Illegal ")?,
            }
        }
        let width = if self.compressed() { 4 } else { 8 };
        writeln!(
            out,
            "instruction at 0x{:08x}: 0x{:0width$x}",
            self.pc,
            self.instruction,
            width = width
        )?;

        for i in 0..8 {
            for k in 0..4 {
                let r = i + k * 8;
                if r == 0 {
                    out.write_str("pc  ")?;
                } else {
                    write!(out, "x{:<2} ", r)?;
                }
                let value = regs.get(r).copied().unwrap_or(0);
                write!(out, "0x{:08x}{}", value, if k == 3 { "\n" } else { "    " })?;
            }
        }
        Ok(())
    }
}

/// Dispatch the pending IRQs. Faults do not return.
pub fn handle_irq<CPU, LED, H, CON, D>(
    irq_mask: u32,
    regs: &[u32],
    board: &mut Board<CPU, LED, H, CON, D>,
    timer_period: u32,
    display_ms: u32,
) where
    CPU: Cpu,
    LED: StatusLed,
    H: HostBus,
    CON: Console,
    D: DelayMs<u32>,
{
    if irq_mask & IRQ_TIMER != 0 {
        board.led.toggle();
        board.cpu.set_timer(timer_period);
    }

    if irq_mask & (IRQ_ILLEGAL | IRQ_BUS_ERROR) != 0 {
        report_fault(irq_mask, regs, board, display_ms);
        // EBREAK inside the IRQ handler stops the core
        board.cpu.breakpoint();
    }
}

/// Put the fault on screen, leave it there for `display_ms` and give the
/// bus back to the Apple II.
pub fn report_fault<CPU, LED, H, CON, D>(
    irq_mask: u32,
    regs: &[u32],
    board: &mut Board<CPU, LED, H, CON, D>,
    display_ms: u32,
) where
    CPU: Cpu,
    H: HostBus,
    CON: Console,
    D: DelayMs<u32>,
{
    board.host.set_video_enable(true);
    board.console.write_str("System error!\n").ok();

    let return_address = regs.first().copied().unwrap_or(0);
    let cpu = &board.cpu;
    let report = FaultReport::decode(irq_mask, return_address, |address| cpu.fetch_u16(address));
    log::error!("fault {:#x} at {:#010x}: {:#x}", irq_mask, report.pc, report.instruction);
    report.write(&mut board.console, regs).ok();
    board.console.write_str("STOP.\n").ok();

    board.delay.delay_ms(display_ms);
    board.host.set_video_enable(false);
    board.host.set_bus_ready();
}

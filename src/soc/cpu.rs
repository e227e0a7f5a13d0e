//! PicoRV32 custom interrupt instructions.

/// Interrupt handler entry as the PicoRV32 IRQ vector calls it: the pending
/// IRQ mask and the saved register file, `regs[0]` being the return address.
pub type IrqHandlerFn = extern "C" fn(irq_mask: u32, regs: *mut u32);

/// Word the IRQ vector loads the handler address from.
pub const IRQ_HANDLER_SLOT: usize = 0x8;

pub trait Cpu {
    /// Replace the IRQ mask, returning the previous one. A set bit disables
    /// the IRQ.
    fn mask_irq(&mut self, mask: u32) -> u32;

    /// Arm the cycle timer (IRQ 0), returning the previous count.
    fn set_timer(&mut self, ticks: u32) -> u32;

    fn set_irq_handler(&mut self, handler: Option<IrqHandlerFn>);

    /// Half-word of code memory at `address`.
    fn fetch_u16(&self, address: u32) -> u16;

    /// Trap into the debugger. Inside the IRQ handler this halts the core.
    fn breakpoint(&mut self) -> !;
}

/// The soft core itself.
pub struct PicoRv32;

#[cfg(target_arch = "riscv32")]
impl Cpu for PicoRv32 {
    fn mask_irq(&mut self, mask: u32) -> u32 {
        let mut value = mask;
        // picorv32_maskirq_insn(a0, a0)
        unsafe { core::arch::asm!(".word 0x0605650b", inout("a0") value) };
        value
    }

    fn set_timer(&mut self, ticks: u32) -> u32 {
        let mut value = ticks;
        // picorv32_timer_insn(a0, a0)
        unsafe { core::arch::asm!(".word 0x0a05650b", inout("a0") value) };
        value
    }

    fn set_irq_handler(&mut self, handler: Option<IrqHandlerFn>) {
        let address = handler.map(|f| f as usize as u32).unwrap_or(0);
        unsafe { core::ptr::write_volatile(IRQ_HANDLER_SLOT as *mut u32, address) }
    }

    fn fetch_u16(&self, address: u32) -> u16 {
        unsafe { core::ptr::read_volatile(address as usize as *const u16) }
    }

    fn breakpoint(&mut self) -> ! {
        loop {
            unsafe { core::arch::asm!("ebreak") };
        }
    }
}

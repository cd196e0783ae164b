//! Interrupt controller and interrupt-line abstractions.
//!
//! On the Zynq-7000 the generic interrupt controller (GIC) routes every
//! peripheral interrupt to the Cortex-A9. The controller driver only needs
//! to connect a source to the common trampoline, gate it, and unmask IRQs
//! at the processor; the per-source handler lookup lives in the control
//! core's dispatch table.

/// Interrupt source identifier (GIC interrupt id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct IrqSource(pub u16);

/// Interrupt controller driver.
pub trait InterruptController {
    /// Driver error type
    type Error: core::fmt::Debug;

    /// Route `source` to the dispatch trampoline.
    fn connect(&mut self, source: IrqSource) -> Result<(), Self::Error>;

    /// Unmask `source` at the distributor.
    fn enable(&mut self, source: IrqSource);

    /// Mask `source` at the distributor.
    ///
    /// This stops notification only; the peripheral keeps running.
    fn disable(&mut self, source: IrqSource);

    /// Unmask IRQs at the processor (clear CPSR.I).
    fn enable_processor_interrupts(&mut self);
}

/// Interrupt-context view of one peripheral's pending condition.
///
/// Implementations are shared between the main loop (which owns the driver)
/// and the interrupt handler, so they must only touch registers that the
/// handler is the sole writer of: the interrupt status / clear registers.
pub trait InterruptAck: Sync {
    /// Clear the peripheral's pending condition.
    ///
    /// Returns whether the event qualifies for the main loop, e.g. a GPIO
    /// edge that still reads high, or a timer status with the interval bit
    /// set. The pending condition is cleared either way.
    fn acknowledge(&self) -> bool;
}

impl<T: InterruptAck + ?Sized> InterruptAck for &T {
    fn acknowledge(&self) -> bool {
        (**self).acknowledge()
    }
}

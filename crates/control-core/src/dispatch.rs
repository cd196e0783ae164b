//! Interrupt dispatch table: interrupt source id → typed handler.
//!
//! The GIC trampoline (the IRQ vector on hardware, a simulation thread in the
//! emulator) calls [`DispatchTable::dispatch`] with the acknowledged
//! interrupt id. Handlers run inside a critical section, so no other
//! dispatch can preempt them, and must stay short: clear the peripheral's
//! pending condition, raise an [`EventFlag`], optionally re-arm a one-shot
//! device. Anything longer belongs in the control loop.
//!
//! A panicking handler is fatal (`panic = "abort"`); there is no retry.

use core::cell::RefCell;

use critical_section::Mutex;
use heapless::Vec;
use platform::interrupt::{InterruptAck, InterruptController, IrqSource};
use platform::timer::OneShotRearm;
use thiserror::Error;

use crate::event::EventFlag;

/// Code run when a bound interrupt source fires.
pub trait InterruptHandler: Sync {
    /// Service the interrupt.
    fn on_interrupt(&self);
}

impl<F: Fn() + Sync> InterruptHandler for F {
    fn on_interrupt(&self) {
        self();
    }
}

/// Dispatch table errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DispatchError {
    /// Every slot is taken by another source.
    #[error("dispatch table is full ({capacity} sources)")]
    TableFull {
        /// Table capacity
        capacity: usize,
    },
    /// The source has no binding.
    #[error("interrupt source {0:?} is not bound")]
    Unbound(IrqSource),
    /// The interrupt controller refused to connect the source.
    #[error("interrupt controller refused source {0:?}")]
    Connect(IrqSource),
}

struct Binding<'h> {
    source: IrqSource,
    handler: &'h dyn InterruptHandler,
    enabled: bool,
}

/// Fixed-capacity table of at most `N` interrupt bindings.
///
/// At most one binding exists per source; binding a source again replaces
/// its handler. New bindings start disabled.
pub struct DispatchTable<'h, const N: usize> {
    bindings: Mutex<RefCell<Vec<Binding<'h>, N>>>,
}

impl<const N: usize> Default for DispatchTable<'_, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'h, const N: usize> DispatchTable<'h, N> {
    /// An empty table. Usable in `static` items.
    pub const fn new() -> Self {
        Self {
            bindings: Mutex::new(RefCell::new(Vec::new())),
        }
    }

    /// Register `handler` for `source`, replacing any previous handler.
    ///
    /// A replaced binding keeps its enable state.
    pub fn bind(
        &self,
        source: IrqSource,
        handler: &'h dyn InterruptHandler,
    ) -> Result<(), DispatchError> {
        critical_section::with(|cs| {
            let mut bindings = self.bindings.borrow_ref_mut(cs);
            if let Some(existing) = bindings.iter_mut().find(|b| b.source == source) {
                existing.handler = handler;
                return Ok(());
            }
            bindings
                .push(Binding {
                    source,
                    handler,
                    enabled: false,
                })
                .map_err(|_| DispatchError::TableFull { capacity: N })
        })?;
        #[cfg(feature = "defmt")]
        defmt::debug!("bound irq {}", source.0);
        #[cfg(feature = "tracing")]
        tracing::debug!(irq = source.0, "bound interrupt handler");
        Ok(())
    }

    /// Allow `source` to reach its handler.
    pub fn enable(&self, source: IrqSource) -> Result<(), DispatchError> {
        self.set_enabled(source, true)
    }

    /// Stop `source` from reaching its handler. The binding stays.
    pub fn disable(&self, source: IrqSource) -> Result<(), DispatchError> {
        self.set_enabled(source, false)
    }

    fn set_enabled(&self, source: IrqSource, enabled: bool) -> Result<(), DispatchError> {
        critical_section::with(|cs| {
            let mut bindings = self.bindings.borrow_ref_mut(cs);
            let binding = bindings
                .iter_mut()
                .find(|b| b.source == source)
                .ok_or(DispatchError::Unbound(source))?;
            binding.enabled = enabled;
            Ok(())
        })
    }

    /// Run the handler bound to `source`.
    ///
    /// Returns whether a handler ran. An unbound or disabled source is a
    /// no-op.
    pub fn dispatch(&self, source: IrqSource) -> bool {
        critical_section::with(|cs| {
            let handler = self
                .bindings
                .borrow_ref(cs)
                .iter()
                .find(|b| b.source == source && b.enabled)
                .map(|b| b.handler);
            match handler {
                Some(handler) => {
                    handler.on_interrupt();
                    true
                }
                None => {
                    #[cfg(feature = "defmt")]
                    defmt::trace!("spurious irq {}", source.0);
                    #[cfg(feature = "tracing")]
                    tracing::trace!(irq = source.0, "spurious interrupt");
                    false
                }
            }
        })
    }

    /// Whether `source` has a binding.
    pub fn is_bound(&self, source: IrqSource) -> bool {
        critical_section::with(|cs| {
            self.bindings
                .borrow_ref(cs)
                .iter()
                .any(|b| b.source == source)
        })
    }

    /// Whether `source` is bound and enabled.
    pub fn is_enabled(&self, source: IrqSource) -> bool {
        critical_section::with(|cs| {
            self.bindings
                .borrow_ref(cs)
                .iter()
                .any(|b| b.source == source && b.enabled)
        })
    }

    /// Number of bound sources.
    pub fn len(&self) -> usize {
        critical_section::with(|cs| self.bindings.borrow_ref(cs).len())
    }

    /// Whether no source is bound.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Interrupt controller plus dispatch table, kept in step.
///
/// Binding connects the source at the controller and records the handler;
/// enabling unmasks it in both places.
pub struct InterruptManager<'t, 'h, C, const N: usize> {
    controller: C,
    table: &'t DispatchTable<'h, N>,
}

impl<'t, 'h, C: InterruptController, const N: usize> InterruptManager<'t, 'h, C, N> {
    /// Wrap an initialized controller.
    pub fn new(controller: C, table: &'t DispatchTable<'h, N>) -> Self {
        Self { controller, table }
    }

    /// Connect `source` and bind `handler` to it.
    pub fn bind(
        &mut self,
        source: IrqSource,
        handler: &'h dyn InterruptHandler,
    ) -> Result<(), DispatchError> {
        self.controller
            .connect(source)
            .map_err(|_| DispatchError::Connect(source))?;
        self.table.bind(source, handler)
    }

    /// Unmask `source` at the table and the controller.
    pub fn enable(&mut self, source: IrqSource) -> Result<(), DispatchError> {
        self.table.enable(source)?;
        self.controller.enable(source);
        Ok(())
    }

    /// Mask `source` at the controller and the table.
    ///
    /// Stops notification only; the peripheral keeps running.
    pub fn disable(&mut self, source: IrqSource) -> Result<(), DispatchError> {
        self.controller.disable(source);
        self.table.disable(source)
    }

    /// Unmask IRQs at the processor.
    pub fn start(&mut self) {
        self.controller.enable_processor_interrupts();
        #[cfg(feature = "defmt")]
        defmt::info!("interrupts enabled ({} sources)", self.table.len());
        #[cfg(feature = "tracing")]
        tracing::info!(sources = self.table.len(), "interrupts enabled");
    }

    /// The dispatch table.
    pub fn table(&self) -> &'t DispatchTable<'h, N> {
        self.table
    }

    /// The controller driver.
    pub fn controller(&self) -> &C {
        &self.controller
    }
}

/// Handler that acknowledges a peripheral and raises a flag.
///
/// The pending condition is always cleared first; the flag is raised only
/// if the acknowledgement reports a qualifying event.
pub struct FlagHandler<'f, A> {
    line: A,
    flag: &'f EventFlag,
}

impl<'f, A: InterruptAck> FlagHandler<'f, A> {
    /// Raise `flag` whenever `line` acknowledges a qualifying event.
    pub fn new(line: A, flag: &'f EventFlag) -> Self {
        Self { line, flag }
    }
}

impl<A: InterruptAck> InterruptHandler for FlagHandler<'_, A> {
    fn on_interrupt(&self) {
        if self.line.acknowledge() {
            self.flag.raise();
        }
    }
}

/// Handler for a one-shot timer used periodically: acknowledge, raise,
/// reload and restart.
pub struct RearmingHandler<'f, L> {
    line: L,
    flag: &'f EventFlag,
    reload_ticks: u32,
}

impl<'f, L: InterruptAck + OneShotRearm> RearmingHandler<'f, L> {
    /// Raise `flag` and restart the timer with `reload_ticks` on every expiry.
    pub fn new(line: L, flag: &'f EventFlag, reload_ticks: u32) -> Self {
        Self {
            line,
            flag,
            reload_ticks,
        }
    }
}

impl<L: InterruptAck + OneShotRearm> InterruptHandler for RearmingHandler<'_, L> {
    fn on_interrupt(&self) {
        if self.line.acknowledge() {
            self.flag.raise();
        }
        self.line.rearm(self.reload_ticks);
    }
}

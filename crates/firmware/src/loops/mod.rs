//! Control loops: one composition root per peripheral.
//!
//! Every loop follows the same cycle:
//!
//! ```text
//! init: bind handlers → arm hardware
//! poll: wait on flag / delay → bounded action → Progress
//! run:  poll forever; Err → fatal::halt
//! ```
//!
//! Handler objects live in caller-provided `Option` slots so they outlive
//! the dispatch table that points at them. On target the slots are
//! `StaticCell`s; in tests they are locals declared before the table.

use control_core::fatal::{halt, FatalReason};

pub mod dma;
pub mod gpio;
pub mod private_timer;
pub mod shared_memory;
pub mod switch_uart;
pub mod system_monitor;
pub mod triple_timer;
pub mod watchdog;

pub use dma::{CachePolicy, CopyBuffer, DmaHandlerSlots, DmaLoop, DmaLoopConfig};
pub use gpio::{GpioLoop, GpioLoopConfig};
pub use private_timer::{PrivateTimerConfig, PrivateTimerLoop};
pub use shared_memory::{SharedMemoryConfig, SharedMemoryMirror, SharedMemoryPublisher};
pub use switch_uart::SwitchUartLoop;
pub use system_monitor::{Readings, SystemMonitorConfig, SystemMonitorLoop};
pub use triple_timer::{TripleTimerConfig, TripleTimerLoop};
pub use watchdog::{WatchdogFlags, WatchdogHandlerSlots, WatchdogLoop, WatchdogLoopConfig};

/// Outcome of one loop pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Progress {
    /// Nothing to do this pass
    Idle,
    /// The loop acted on an event or period
    Acted,
}

/// A control loop.
pub trait ControlLoop {
    /// One non-blocking (or bounded-delay) pass.
    fn poll(&mut self) -> Result<Progress, FatalReason>;

    /// Poll forever. A fatal error halts the core.
    fn run(&mut self) -> ! {
        loop {
            if let Err(reason) = self.poll() {
                halt(reason);
            }
        }
    }
}

/// Format one console line into a fixed buffer.
///
/// Overlong lines are truncated; the console is best effort.
pub(crate) fn line<const N: usize>(args: core::fmt::Arguments<'_>) -> heapless::String<N> {
    use core::fmt::Write as _;
    let mut buf = heapless::String::new();
    let _ = buf.write_fmt(args);
    buf
}

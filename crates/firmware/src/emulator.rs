//! Desktop emulator: host threads stand in for interrupting hardware.
//!
//! A simulated interrupt controller thread polls each routed source's
//! pending latch and calls [`DispatchTable::dispatch`], so handlers run on
//! a different thread from the control loop, as they would run in IRQ mode
//! on the target. Peripheral threads advance simulated hardware on a fixed
//! period.
//!
//! Everything the threads touch is `'static`: the dispatch table and flags
//! are plain statics, handler slots and buffers come from `StaticCell`s.

use std::boxed::Box;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use std::vec::Vec;

use control_core::dispatch::DispatchTable;
use platform::console::Console;
use platform::interrupt::IrqSource;
use tracing_subscriber::EnvFilter;

/// How often the simulated GIC samples pending latches.
pub const GIC_POLL_PERIOD: Duration = Duration::from_micros(200);

/// Install a `tracing` subscriber. `RUST_LOG` overrides the default `info`.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // A second call (several examples in one process) keeps the first.
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Console that turns each line into a `tracing` event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingConsole;

impl Console for TracingConsole {
    fn write_line(&mut self, line: &str) {
        tracing::info!(target: "console", "{line}");
    }
}

/// Reports whether a source has a pending, unacknowledged interrupt.
pub type PendingProbe = Box<dyn Fn() -> bool + Send>;

/// Threads driving one emulated board. Dropping it stops and joins them.
pub struct Simulation {
    stop: Arc<AtomicBool>,
    dispatched: Arc<AtomicUsize>,
    threads: Vec<JoinHandle<()>>,
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new()
    }
}

impl Simulation {
    /// No threads yet.
    pub fn new() -> Self {
        Self {
            stop: Arc::new(AtomicBool::new(false)),
            dispatched: Arc::new(AtomicUsize::new(0)),
            threads: Vec::new(),
        }
    }

    /// Spawn the interrupt controller thread for `table`.
    ///
    /// Each route pairs a source with a probe of its pending latch; a
    /// pending source is dispatched until its handler clears the latch.
    pub fn gic<const N: usize>(
        &mut self,
        table: &'static DispatchTable<'static, N>,
        routes: Vec<(IrqSource, PendingProbe)>,
    ) {
        let stop = Arc::clone(&self.stop);
        let dispatched = Arc::clone(&self.dispatched);
        self.threads.push(thread::spawn(move || {
            while !stop.load(Ordering::Acquire) {
                for (source, pending) in &routes {
                    if pending() && table.dispatch(*source) {
                        dispatched.fetch_add(1, Ordering::Relaxed);
                        tracing::trace!(irq = source.0, "dispatched");
                    }
                }
                thread::sleep(GIC_POLL_PERIOD);
            }
        }));
    }

    /// Spawn a peripheral thread calling `tick` every `period`.
    pub fn peripheral(&mut self, period: Duration, mut tick: impl FnMut() + Send + 'static) {
        let stop = Arc::clone(&self.stop);
        self.threads.push(thread::spawn(move || {
            while !stop.load(Ordering::Acquire) {
                thread::sleep(period);
                tick();
            }
        }));
    }

    /// Interrupts dispatched so far.
    pub fn dispatched(&self) -> usize {
        self.dispatched.load(Ordering::Relaxed)
    }

    /// Stop and join every thread.
    pub fn shutdown(mut self) {
        self.stop_and_join();
    }

    fn stop_and_join(&mut self) {
        self.stop.store(true, Ordering::Release);
        for handle in self.threads.drain(..) {
            if handle.join().is_err() {
                tracing::error!("simulation thread panicked");
            }
        }
    }
}

impl Drop for Simulation {
    fn drop(&mut self) {
        self.stop_and_join();
    }
}

//! DMA copy loop on the desktop emulator.
//!
//! The mock controller copies with `memcpy` and latches its done line; the
//! GIC thread dispatches it, and the loop verifies each copy before
//! mutating the pattern and launching the next one.
//!
//! ```bash
//! RUST_LOG=debug cargo run -p firmware --example dma_emulator --features emulator
//! ```

use control_core::dispatch::DispatchTable;
use control_core::dma::DmaFlags;
use control_core::fatal::halt;
use firmware::board::{self, DMA_BUFFER_LEN};
use firmware::boot::{bring_up, interrupt_manager};
use firmware::emulator::{init_tracing, PendingProbe, Simulation};
use firmware::loops::{ControlLoop, CopyBuffer, DmaHandlerSlots, DmaLoop, DmaLoopConfig, Progress};
use platform::dma::DmaController;
use platform::dma_safety::Align32;
use platform::mocks::{MockDataCache, MockDma, MockGic, MockIrqLine};
use static_cell::StaticCell;

const TRANSFERS: u32 = 16;

static TABLE: DispatchTable<'static, { board::MAX_IRQ_BINDINGS }> = DispatchTable::new();
static FLAGS: DmaFlags = DmaFlags::new();
static SLOTS: StaticCell<DmaHandlerSlots<'static, MockIrqLine>> = StaticCell::new();
static SOURCE: StaticCell<CopyBuffer> = StaticCell::new();
static DESTINATION: StaticCell<CopyBuffer> = StaticCell::new();

fn main() {
    init_tracing();
    tracing::info!("{}", platform::config::boot_banner());

    let mut irq = match interrupt_manager::<MockGic, { board::MAX_IRQ_BINDINGS }>(
        board::GIC_DEVICE,
        &TABLE,
    ) {
        Ok(irq) => irq,
        Err(reason) => halt(reason),
    };
    let dma = match bring_up::<MockDma>(board::DMA_DEVICE) {
        Ok(dma) => dma,
        Err(reason) => halt(reason),
    };
    let done_line = dma.done_line(board::DMA_CHANNEL);
    let fault_line = dma.fault_line();

    let mut sim = Simulation::new();
    let done_pending: PendingProbe = Box::new(move || done_line.is_pending());
    let fault_pending: PendingProbe = Box::new(move || fault_line.is_pending());
    sim.gic(
        &TABLE,
        vec![
            (board::DMA_DONE0_IRQ, done_pending),
            (board::DMA_FAULT_IRQ, fault_pending),
        ],
    );
    irq.start();

    let mut lp = match DmaLoop::init(
        dma,
        MockDataCache::new(),
        &mut irq,
        &FLAGS,
        SLOTS.init(DmaHandlerSlots::new()),
        SOURCE.init(Align32([0; DMA_BUFFER_LEN])),
        DESTINATION.init(Align32([0; DMA_BUFFER_LEN])),
        DmaLoopConfig::default(),
    ) {
        Ok(lp) => lp,
        Err(reason) => halt(reason),
    };
    tracing::info!(policy = ?lp.cache_policy(), "first transfer launched");

    while lp.transfers() < TRANSFERS {
        match lp.poll() {
            Ok(Progress::Acted) => {}
            Ok(Progress::Idle) => std::thread::yield_now(),
            Err(reason) => halt(reason),
        }
    }

    let dispatched = sim.dispatched();
    sim.shutdown();
    tracing::info!(
        transfers = lp.transfers(),
        first_byte = lp.source().first().copied(),
        dispatched,
        "done"
    );
}

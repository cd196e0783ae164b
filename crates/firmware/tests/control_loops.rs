//! Integration test: several control loops sharing one dispatch table.
//!
//! Tests that:
//!   1. Boot brings up every peripheral through `boot::bring_up`
//!   2. Each loop only reacts to its own interrupt sources
//!   3. Processor IRQs stay masked until `start`
//!   4. A table with no room left makes the next loop's init fatal
//!   5. A missing device is fatal before anything is bound
//!
//! Does NOT require physical hardware.
//!
//! Run with: cargo test -p firmware --test control_loops

// Integration test file -- intentional test patterns permitted.
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects,
)]

use control_core::dispatch::{DispatchError, DispatchTable, InterruptManager, RearmingHandler};
use control_core::dma::DmaFlags;
use control_core::event::EventFlag;
use control_core::fatal::FatalReason;
use firmware::board::{self, DMA_BUFFER_LEN};
use firmware::boot::{bring_up, interrupt_manager};
use firmware::loops::{
    CopyBuffer, DmaHandlerSlots, DmaLoop, DmaLoopConfig, PrivateTimerConfig, PrivateTimerLoop,
    WatchdogFlags, WatchdogHandlerSlots, WatchdogLoop, WatchdogLoopConfig,
};
use firmware::{ControlLoop, Progress};
use platform::dma_safety::Align32;
use platform::gpio::PinState;
use platform::mocks::{
    MockConsole, MockDataCache, MockDma, MockGic, MockGpio, MockGpioLine, MockIrqLine,
    MockPrivateTimer, MockWatchdog, MISSING_DEVICE,
};
use platform::watchdog::WatchdogDevice;

fn buffer() -> CopyBuffer {
    Align32([0; DMA_BUFFER_LEN])
}

#[test]
fn three_loops_share_one_table() {
    let timer_flag = EventFlag::new();
    let mut timer_slot: Option<RearmingHandler<'_, MockIrqLine>> = None;
    let dma_flags = DmaFlags::new();
    let mut dma_slots: DmaHandlerSlots<'_, MockIrqLine> = DmaHandlerSlots::new();
    let wdt_flags = WatchdogFlags::new();
    let mut wdt_slots: WatchdogHandlerSlots<'_, MockGpioLine, MockIrqLine> =
        WatchdogHandlerSlots::new();
    let mut src = buffer();
    let mut dst = buffer();
    let console = MockConsole::new();
    let table: DispatchTable<'_, { board::MAX_IRQ_BINDINGS }> = DispatchTable::new();
    let mut irq =
        interrupt_manager::<MockGic, { board::MAX_IRQ_BINDINGS }>(board::GIC_DEVICE, &table)
            .unwrap();

    let mut timer_loop = PrivateTimerLoop::init(
        bring_up::<MockPrivateTimer>(board::PRIVATE_TIMER_DEVICE).unwrap(),
        &mut irq,
        &timer_flag,
        &mut timer_slot,
        console.clone(),
        PrivateTimerConfig::default(),
    )
    .unwrap();
    let mut dma_loop = DmaLoop::init(
        bring_up::<MockDma>(board::DMA_DEVICE).unwrap(),
        MockDataCache::new(),
        &mut irq,
        &dma_flags,
        &mut dma_slots,
        &mut src,
        &mut dst,
        DmaLoopConfig::default(),
    )
    .unwrap();
    let gpio = bring_up::<MockGpio>(board::GPIO_DEVICE).unwrap();
    let pins = gpio.handle();
    let mut wdt_loop = WatchdogLoop::init(
        bring_up::<MockWatchdog>(board::WATCHDOG_DEVICE).unwrap(),
        gpio,
        &mut irq,
        &wdt_flags,
        &mut wdt_slots,
        console.clone(),
        WatchdogLoopConfig::default(),
    )
    .unwrap();

    assert_eq!(table.len(), board::MAX_IRQ_BINDINGS);
    assert!(!irq.controller().processor_interrupts_enabled());
    irq.start();
    assert!(irq.controller().processor_interrupts_enabled());

    // Private timer expiry: only the timer loop acts.
    assert!(timer_loop.timer().expire());
    assert!(table.dispatch(board::PRIVATE_TIMER_IRQ));
    assert_eq!(wdt_loop.poll().unwrap(), Progress::Idle);
    assert_eq!(timer_loop.poll().unwrap(), Progress::Acted);

    // The first copy completed during init: only the DMA loop acts.
    assert!(table.dispatch(board::DMA_DONE0_IRQ));
    assert_eq!(timer_loop.poll().unwrap(), Progress::Idle);
    assert_eq!(dma_loop.poll().unwrap(), Progress::Acted);
    assert_eq!(dma_loop.transfers(), 1);

    // Button press: only the watchdog loop acts.
    let one_second = wdt_loop.supervisor().device().input_clock_hz();
    wdt_loop.supervisor_mut().device_mut().advance(one_second);
    assert!(pins.drive_input(board::BUTTON_BTN8, PinState::High));
    assert!(table.dispatch(board::GPIO_IRQ));
    assert_eq!(dma_loop.poll().unwrap(), Progress::Idle);
    assert_eq!(wdt_loop.poll().unwrap(), Progress::Acted);

    assert_eq!(
        console.lines(),
        vec![
            "System powered up normally..".to_string(),
            "Timer expired!".to_string(),
            "Button pressed!".to_string(),
        ]
    );
    assert_eq!(wdt_loop.supervisor().device().restarts(), 1);
}

#[test]
fn no_room_for_another_source_is_fatal() {
    let dma_flags = DmaFlags::new();
    let mut dma_slots: DmaHandlerSlots<'_, MockIrqLine> = DmaHandlerSlots::new();
    let wdt_flags = WatchdogFlags::new();
    let mut wdt_slots: WatchdogHandlerSlots<'_, MockGpioLine, MockIrqLine> =
        WatchdogHandlerSlots::new();
    let mut src = buffer();
    let mut dst = buffer();
    let table: DispatchTable<'_, 3> = DispatchTable::new();
    let mut irq = InterruptManager::new(MockGic::new(), &table);

    let _dma_loop = DmaLoop::init(
        MockDma::new(),
        MockDataCache::new(),
        &mut irq,
        &dma_flags,
        &mut dma_slots,
        &mut src,
        &mut dst,
        DmaLoopConfig::default(),
    )
    .unwrap();
    let result = WatchdogLoop::init(
        MockWatchdog::new(
            platform::clock_config::CPU_3X2X_CLOCK_HZ,
            platform::mocks::LatchBehavior::ClearOnRead,
        ),
        MockGpio::new(),
        &mut irq,
        &wdt_flags,
        &mut wdt_slots,
        MockConsole::new(),
        WatchdogLoopConfig {
            expiry_telemetry: true,
            ..WatchdogLoopConfig::default()
        },
    );

    assert_eq!(
        result.err(),
        Some(FatalReason::Dispatch(DispatchError::TableFull { capacity: 3 }))
    );
    assert!(!table.is_bound(board::WATCHDOG_IRQ));
}

#[test]
fn missing_device_is_fatal_before_binding() {
    let table: DispatchTable<'_, 2> = DispatchTable::new();
    let irq = interrupt_manager::<MockGic, 2>(MISSING_DEVICE, &table);
    assert_eq!(irq.err(), Some(FatalReason::ConfigNotFound(MISSING_DEVICE)));

    let timer = bring_up::<MockPrivateTimer>(MISSING_DEVICE);
    assert!(matches!(timer, Err(FatalReason::ConfigNotFound(_))));
    assert!(table.is_empty());
}

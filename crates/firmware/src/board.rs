//! Zedboard wiring: device ids, interrupt ids, pins.
//!
//! Interrupt ids are GIC shared/private peripheral interrupt numbers from
//! UG585 Table 7-3. Pin numbers are PS GPIO (MIO) numbers; the Pmod JE
//! header is wired to MIO 0 and 9..=15.

use platform::device::DeviceId;
use platform::dma::DmaChannelId;
use platform::gpio::PinId;
use platform::interrupt::IrqSource;

// ── Device ids (BSP configuration table indices) ────────────────────────────

/// Generic interrupt controller
pub const GIC_DEVICE: DeviceId = DeviceId(0);
/// Cortex-A9 private timer
pub const PRIVATE_TIMER_DEVICE: DeviceId = DeviceId(0);
/// Cortex-A9 private watchdog
pub const WATCHDOG_DEVICE: DeviceId = DeviceId(0);
/// Triple timer counter 0, counter 0 (1 Hz tick)
pub const TTC0_DEVICE: DeviceId = DeviceId(0);
/// Triple timer counter 0, counter 1 (PWM)
pub const TTC1_DEVICE: DeviceId = DeviceId(1);
/// PL330 DMA controller (secure)
pub const DMA_DEVICE: DeviceId = DeviceId(0);
/// PS GPIO
pub const GPIO_DEVICE: DeviceId = DeviceId(0);
/// XADC
pub const XADC_DEVICE: DeviceId = DeviceId(0);

// ── Interrupt ids ───────────────────────────────────────────────────────────

/// Private timer (PPI)
pub const PRIVATE_TIMER_IRQ: IrqSource = IrqSource(29);
/// Private watchdog (PPI)
pub const WATCHDOG_IRQ: IrqSource = IrqSource(30);
/// TTC0 counter 0
pub const TTC0_0_IRQ: IrqSource = IrqSource(42);
/// DMAC abort
pub const DMA_FAULT_IRQ: IrqSource = IrqSource(45);
/// DMAC channel 0 done
pub const DMA_DONE0_IRQ: IrqSource = IrqSource(46);
/// PS GPIO bank interrupt
pub const GPIO_IRQ: IrqSource = IrqSource(52);

/// Dispatch table capacity; the busiest loop binds three sources.
pub const MAX_IRQ_BINDINGS: usize = 4;

// ── DMA ─────────────────────────────────────────────────────────────────────

/// Channel used for memory-to-memory copies
pub const DMA_CHANNEL: DmaChannelId = DmaChannelId(0);

/// Copy buffer size in bytes
pub const DMA_BUFFER_LEN: usize = 128;

// ── Pins ────────────────────────────────────────────────────────────────────

/// Pmod JE1
pub const JE1: PinId = PinId(13);
/// Pmod JE2
pub const JE2: PinId = PinId(10);
/// Pmod JE3
pub const JE3: PinId = PinId(11);
/// Pmod JE4
pub const JE4: PinId = PinId(12);
/// Pmod JE7
pub const JE7: PinId = PinId(0);
/// Pmod JE8
pub const JE8: PinId = PinId(9);
/// Pmod JE9
pub const JE9: PinId = PinId(14);
/// Pmod JE10
pub const JE10: PinId = PinId(15);

/// Output walk order
pub const JE_OUTPUTS: [PinId; 4] = [JE1, JE2, JE3, JE4];

/// Logged inputs with their silkscreen labels
pub const JE_INPUTS: [(&str, PinId); 4] = [("JE7", JE7), ("JE8", JE8), ("JE9", JE9), ("JE10", JE10)];

/// Push button BTN8 (EMIO)
pub const BUTTON_BTN8: PinId = PinId(50);

// ── Timing ──────────────────────────────────────────────────────────────────

/// Watchdog timeout
pub const WATCHDOG_TIMEOUT_SECS: u32 = 5;

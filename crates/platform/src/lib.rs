//! Hardware Abstraction Layer (HAL) for the Zynq-7000 control loops
//!
//! This crate provides trait-based abstractions for every peripheral the
//! control core drives, enabling development and testing without physical
//! hardware.
//!
//! # Architecture Layers
//!
//! ```text
//! Control loops (firmware crate)
//!         ↓
//! Control core (control-core crate: dispatch, timing, DMA, watchdog)
//!         ↓
//! Platform HAL (this crate - trait abstractions)
//!         ↓
//! Register-level drivers (vendor BSP)
//! ```
//!
//! # Abstraction Levels
//!
//! ## Bring-up
//! - [`device`] - lookup by device id, initialize, self-test
//!
//! ## Interrupt plumbing
//! - [`interrupt`] - GIC connect/enable and per-peripheral acknowledge
//!
//! ## Peripherals
//! - [`timer`] - private timer and triple timer counter
//! - [`dma`] - descriptor-based DMA controller
//! - [`watchdog`] - system watchdog
//! - [`gpio`] - PS GPIO and AXI GPIO banks
//! - [`adc`] - XADC system monitor
//! - [`shared_memory`] - block RAM shared with a soft processor
//! - [`console`] - line-oriented UART console
//!
//! # Features
//!
//! - `std`: Enable standard library support and the [`mocks`] module
//! - `defmt`: Enable defmt logging derives
//!
//! # Example
//!
//! ```
//! use platform::device::{bring_up, BringUpError, DeviceId};
//! use platform::timer::OneShotTimer;
//!
//! fn one_second<T: OneShotTimer + platform::Peripheral>(id: DeviceId) -> Result<T, BringUpError> {
//!     let mut timer: T = bring_up(id)?;
//!     let ticks = timer.input_clock_hz();
//!     timer.load(ticks);
//!     Ok(timer)
//! }
//! ```

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(clippy::unreachable)] // no unreachable!() that isn't documented
#![deny(unused_must_use)]
// all Results must be handled
// ────────────────────────────────────────────────────────────────────────────
#![cfg_attr(all(not(test), not(feature = "std")), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(unsafe_op_in_unsafe_fn)] // unsafe fn body is not implicitly unsafe block
#![warn(clippy::print_stdout)] // prefer tracing/defmt over println! in lib code
// Pedantic lints suppressed for this hardware HAL crate:
#![allow(clippy::doc_markdown)] // register names and UG585 references in doc comments
#![allow(clippy::must_use_candidate)] // hardware accessors; callers decide
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod adc;
pub mod clock_config;
pub mod config;
pub mod console;
pub mod device;
pub mod dma;
pub mod dma_safety;
pub mod gpio;
pub mod interrupt;
pub mod mocks;
pub mod shared_memory;
pub mod timer;
pub mod watchdog;

// Re-export bring-up and interrupt types
pub use device::{bring_up, BringUpError, DeviceId, Peripheral};
pub use interrupt::{InterruptAck, InterruptController, IrqSource};

// Re-export peripheral traits
pub use adc::SystemMonitor;
pub use console::{Console, SerialConsole};
pub use dma::{DmaBuffer, DmaBufferMut, DmaChannelId, DmaController, DmaTransfer, TransferFault};
pub use dma_safety::{Align32, CacheCoherence, DataCache};
pub use gpio::{GpioBank, PinGroup, PinId, PinState};
pub use shared_memory::SharedMemory;
pub use timer::{IntervalTimer, OneShotRearm, OneShotTimer, TimerIrq, TimerOptions};
pub use watchdog::WatchdogDevice;

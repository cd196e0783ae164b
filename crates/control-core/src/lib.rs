//! Interrupt-driven peripheral control core.
//!
//! The pieces every control loop shares: interrupt handlers hand events to
//! a polling loop through [`event::EventFlag`]s, registered in a
//! [`dispatch::DispatchTable`]; hardware timer parameters come from the pure
//! [`timing`] solver; DMA transfers and the watchdog each get a small state
//! machine ([`dma::DmaEngine`], [`watchdog::WatchdogSupervisor`]); anything
//! unrecoverable ends in [`fatal::halt`].
//!
//! ```text
//! interrupt context                    loop context
//! ─────────────────                    ────────────
//! DispatchTable::dispatch(irq)
//!   └─ handler: acknowledge ──raise──► EventFlag ──take──► act, re-arm
//! ```
//!
//! # Features
//!
//! - `std`: host builds; [`fatal::halt`] aborts instead of spinning
//! - `defmt`: defmt logging and `defmt::Format` derives
//! - `tracing`: tracing events (emulator, host tests)

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
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::print_stdout)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]

pub mod dispatch;
pub mod dma;
pub mod event;
pub mod fatal;
pub mod timing;
pub mod watchdog;

pub use dispatch::{
    DispatchError, DispatchTable, FlagHandler, InterruptHandler, InterruptManager,
    RearmingHandler,
};
pub use dma::{DmaEngine, DmaError, DmaFlags, DmaState};
pub use event::EventFlag;
pub use fatal::{halt, FatalReason};
pub use timing::{
    solve_pwm, solve_timer, InvalidDutyCycle, InvalidFrequency, PwmSpec, TimerConfig, TimerSpec,
};
pub use watchdog::{WatchdogError, WatchdogState, WatchdogSupervisor, WatchdogTimeout};

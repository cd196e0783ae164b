//! Zedboard control loops
//!
//! One control loop per peripheral, composed from the interrupt-driven
//! control core. Each loop owns its drivers, binds its interrupt handlers
//! into a shared dispatch table during `init`, then polls.
//!
//! # Architecture
//!
//! ```text
//! Control loops (loops::*)
//!         ↓
//! Bring-up + board wiring (boot, board)
//!         ↓
//! Control core (dispatch, timing, dma, watchdog, fatal)
//!         ↓
//! Platform traits (GIC, timers, DMAC, GPIO, XADC, …)
//! ```
//!
//! # Features
//!
//! - `defmt` - target logging
//! - `std` - standard library (host tests)
//! - `emulator` - desktop emulator: interrupt sources are threads, logging
//!   through `tracing`
//!
//! # Examples
//!
//! ```bash
//! cargo run -p firmware --example timer_emulator --features emulator
//! RUST_LOG=debug cargo run -p firmware --example dma_emulator --features emulator
//! ```

#![cfg_attr(all(not(test), not(feature = "std")), no_std)]
// Upgrade relevant warns to deny; keep pedantic as warn (too noisy for firmware)
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Critical correctness: deny these
#![deny(unsafe_op_in_unsafe_fn)]
// unsafe fn body is not implicitly unsafe block
// Logging discipline (allow println in tests via clippy.toml)
#![warn(clippy::print_stdout)] // prefer tracing/defmt over println! in lib code
#![warn(clippy::dbg_macro)] // dbg! should not be left in committed code
// Intentional allows for this codebase:
#![allow(clippy::module_name_repetitions)] // common in Rust crates; not a real issue
#![allow(clippy::missing_errors_doc)] // most errors are self-explanatory
// Pedantic lints too noisy for firmware application code:
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::similar_names)]

pub mod board;
pub mod boot;
pub mod loops;

#[cfg(feature = "emulator")]
pub mod emulator;

pub use loops::{ControlLoop, Progress};

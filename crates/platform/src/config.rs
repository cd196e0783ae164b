//! Application configuration and constants
//!
//! Names and banner strings shared by every control loop. Board wiring
//! (device ids, interrupt ids, pins) lives in `firmware::board`.

/// The application name
pub const APP_NAME: &str = "Zynq Control Core";

/// The board this build targets
pub const BOARD_NAME: &str = "Zedboard";

/// Application version (synchronized with Cargo.toml)
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Boot banner
pub const fn boot_banner() -> &'static str {
    "Zynq Control Core - Zedboard"
}

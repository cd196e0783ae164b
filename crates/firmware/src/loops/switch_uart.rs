//! Switch bank to serial port: send the four switch positions as ASCII
//! digits whenever they change.

use control_core::fatal::FatalReason;
use platform::gpio::PinGroup;

use super::{ControlLoop, Progress};

/// Switches reported per message.
pub const SWITCHES: usize = 4;

const SWITCH_MASK: u32 = 0b1111;

/// `'0'`/`'1'` per switch, bit 0 first, then CR LF.
#[allow(clippy::arithmetic_side_effects)] // Safety: shift amount below SWITCHES
pub fn encode_switches(value: u32) -> [u8; SWITCHES + 2] {
    let mut msg = [0u8; SWITCHES + 2];
    for (bit, digit) in msg.iter_mut().take(SWITCHES).enumerate() {
        *digit = if value & (1 << bit) == 0 { b'0' } else { b'1' };
    }
    if let Some(tail) = msg.get_mut(SWITCHES..) {
        tail.copy_from_slice(b"\r\n");
    }
    msg
}

/// Polls the switches, reports changes over the UART.
pub struct SwitchUartLoop<P, U> {
    switches: P,
    uart: U,
    previous: Option<u32>,
}

impl<P: PinGroup, U: embedded_io::Write> SwitchUartLoop<P, U> {
    /// Nothing is sent until the first poll; that poll always reports.
    pub fn new(switches: P, uart: U) -> Self {
        Self {
            switches,
            uart,
            previous: None,
        }
    }

    /// The UART.
    pub fn uart(&self) -> &U {
        &self.uart
    }
}

impl<P: PinGroup, U: embedded_io::Write> ControlLoop for SwitchUartLoop<P, U> {
    fn poll(&mut self) -> Result<Progress, FatalReason> {
        let Ok(raw) = self.switches.read() else {
            return Ok(Progress::Idle);
        };
        let value = raw & SWITCH_MASK;
        if self.previous == Some(value) {
            return Ok(Progress::Idle);
        }
        self.previous = Some(value);
        if self.uart.write_all(&encode_switches(value)).is_err() {
            #[cfg(feature = "defmt")]
            defmt::warn!("UART write failed");
        }
        Ok(Progress::Acted)
    }
}

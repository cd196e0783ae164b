//! Fatal conditions and the halt path.
//!
//! There is no supervisor to escalate to. Every unrecoverable condition is
//! reported once (defmt on target, tracing on host) and the core then stops
//! where it is. A watchdog, if armed, turns the halt into a reset.

use platform::adc::AdcError;
use platform::device::{BringUpError, DeviceId};
use thiserror::Error;

use crate::dispatch::DispatchError;
use crate::dma::DmaError;
use crate::timing::{InvalidDutyCycle, InvalidFrequency};
use crate::watchdog::WatchdogError;

/// Why a control loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FatalReason {
    /// Device lookup found no configuration record.
    #[error("no configuration for device {0:?}")]
    ConfigNotFound(DeviceId),
    /// The driver refused its configuration record.
    #[error("device {0:?} failed to initialize")]
    InitFailed(DeviceId),
    /// A peripheral self test failed.
    #[error("device {0:?} failed its self test")]
    SelfTestFailed(DeviceId),
    /// No timer configuration reproduces the target frequency.
    #[error(transparent)]
    InvalidFrequency(#[from] InvalidFrequency),
    /// No usable PWM match value.
    #[error(transparent)]
    InvalidDutyCycle(#[from] InvalidDutyCycle),
    /// A match register read back something other than what was written.
    #[error("match register holds {actual}, wrote {expected}")]
    MatchReadback {
        /// Value written
        expected: u32,
        /// Value read back
        actual: u32,
    },
    /// Interrupt wiring failed.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    /// DMA fault or rejected descriptor.
    #[error(transparent)]
    Dma(#[from] DmaError),
    /// A completed transfer's destination differs from its source.
    #[error("data mismatch at byte {offset}: expected {expected:#04x}, got {actual:#04x}")]
    DataMismatch {
        /// First differing byte
        offset: usize,
        /// Source byte
        expected: u8,
        /// Destination byte
        actual: u8,
    },
    /// Watchdog protocol violated.
    #[error(transparent)]
    Watchdog(#[from] WatchdogError),
    /// The analog monitor sequencer refused its configuration.
    #[error(transparent)]
    SystemMonitor(#[from] AdcError),
}

impl From<BringUpError> for FatalReason {
    fn from(err: BringUpError) -> Self {
        match err {
            BringUpError::ConfigNotFound(id) => Self::ConfigNotFound(id),
            BringUpError::InitFailed(id) => Self::InitFailed(id),
            BringUpError::SelfTestFailed(id) => Self::SelfTestFailed(id),
        }
    }
}

/// Compare two buffers, reporting the first differing byte.
pub fn verify_copy(expected: &[u8], actual: &[u8]) -> Result<(), FatalReason> {
    let mismatch = expected
        .iter()
        .zip(actual)
        .enumerate()
        .find(|(_, (e, a))| e != a);
    if let Some((offset, (&want, &got))) = mismatch {
        return Err(FatalReason::DataMismatch {
            offset,
            expected: want,
            actual: got,
        });
    }
    if expected.len() == actual.len() {
        Ok(())
    } else {
        Err(FatalReason::DataMismatch {
            offset: expected.len().min(actual.len()),
            expected: 0,
            actual: 0,
        })
    }
}

/// Report `reason` and stop forever.
///
/// Host builds abort the process so tests and the emulator see the failure;
/// target builds spin.
pub fn halt(reason: FatalReason) -> ! {
    #[cfg(feature = "defmt")]
    defmt::error!("fatal: {}", reason);
    #[cfg(feature = "tracing")]
    tracing::error!(%reason, "fatal");
    #[cfg(any(test, feature = "std"))]
    {
        let _ = reason;
        std::process::abort();
    }
    #[cfg(not(any(test, feature = "std")))]
    {
        let _ = reason;
        loop {
            core::hint::spin_loop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bring_up_errors_keep_the_device_id() {
        let id = DeviceId(3);
        assert_eq!(
            FatalReason::from(BringUpError::ConfigNotFound(id)),
            FatalReason::ConfigNotFound(id)
        );
        assert_eq!(
            FatalReason::from(BringUpError::SelfTestFailed(id)),
            FatalReason::SelfTestFailed(id)
        );
    }

    #[test]
    fn component_errors_convert() {
        let r: FatalReason = DmaError::Faulted.into();
        assert_eq!(r, FatalReason::Dma(DmaError::Faulted));
        let r: FatalReason = InvalidFrequency::ZeroTarget.into();
        assert!(matches!(r, FatalReason::InvalidFrequency(_)));
    }

    #[test]
    fn verify_copy_finds_first_difference() {
        assert_eq!(verify_copy(&[1, 2, 3], &[1, 2, 3]), Ok(()));
        assert_eq!(
            verify_copy(&[1, 2, 3], &[1, 9, 8]),
            Err(FatalReason::DataMismatch {
                offset: 1,
                expected: 2,
                actual: 9
            })
        );
        assert!(verify_copy(&[1, 2], &[1, 2, 3]).is_err());
    }

    #[test]
    fn display_names_the_byte() {
        let r = FatalReason::DataMismatch {
            offset: 127,
            expected: 0x7f,
            actual: 0x80,
        };
        assert_eq!(
            r.to_string(),
            "data mismatch at byte 127: expected 0x7f, got 0x80"
        );
    }
}

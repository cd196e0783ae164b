//! Peripheral bring-up: lookup by device id, initialize, self-test.
//!
//! Every Zynq PS peripheral driver follows the same three-step sequence. The
//! vendor driver looks up a static configuration record by device id, builds a
//! handle from it, and runs a register-level self test. [`bring_up`] runs the
//! three steps in order and reports which one failed, so the caller can route
//! the failure to its fatal-halt path.

use thiserror::Error;

/// Device identifier used to look up a peripheral's configuration record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceId(pub u16);

/// A peripheral driver that can be brought up from a device id.
pub trait Peripheral: Sized {
    /// Static configuration record (base address, input clock, ...).
    type Config;

    /// Find the configuration record for `id`, if the build has one.
    fn lookup_config(id: DeviceId) -> Option<Self::Config>;

    /// Build a driver handle from a configuration record.
    fn initialize(config: Self::Config) -> Option<Self>;

    /// Run the driver's register-level self test.
    fn self_test(&mut self) -> bool;
}

/// Which bring-up step failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BringUpError {
    /// No configuration record exists for the device id.
    #[error("no configuration for device {0:?}")]
    ConfigNotFound(DeviceId),
    /// The driver refused the configuration record.
    #[error("device {0:?} failed to initialize")]
    InitFailed(DeviceId),
    /// The register-level self test failed.
    #[error("device {0:?} failed its self test")]
    SelfTestFailed(DeviceId),
}

/// Look up, initialize and self-test the peripheral identified by `id`.
pub fn bring_up<P: Peripheral>(id: DeviceId) -> Result<P, BringUpError> {
    let config = P::lookup_config(id).ok_or(BringUpError::ConfigNotFound(id))?;
    let mut device = P::initialize(config).ok_or(BringUpError::InitFailed(id))?;
    if !device.self_test() {
        return Err(BringUpError::SelfTestFailed(id));
    }
    Ok(device)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Probe {
        passes: bool,
    }

    impl Peripheral for Probe {
        type Config = u16;

        fn lookup_config(id: DeviceId) -> Option<u16> {
            (id.0 != 99).then_some(id.0)
        }

        fn initialize(config: u16) -> Option<Self> {
            (config != 7).then_some(Probe {
                passes: config != 3,
            })
        }

        fn self_test(&mut self) -> bool {
            self.passes
        }
    }

    #[test]
    fn bring_up_reports_each_failing_step() {
        assert!(bring_up::<Probe>(DeviceId(0)).is_ok());
        assert_eq!(
            bring_up::<Probe>(DeviceId(99)).err(),
            Some(BringUpError::ConfigNotFound(DeviceId(99)))
        );
        assert_eq!(
            bring_up::<Probe>(DeviceId(7)).err(),
            Some(BringUpError::InitFailed(DeviceId(7)))
        );
        assert_eq!(
            bring_up::<Probe>(DeviceId(3)).err(),
            Some(BringUpError::SelfTestFailed(DeviceId(3)))
        );
    }
}

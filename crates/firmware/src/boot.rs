//! Bring-up sequence shared by every control loop.
//!
//! Initialization order (MUST be respected):
//!   1. Interrupt controller: lookup, initialize, self-test
//!   2. Peripherals: lookup, initialize, self-test
//!   3. Handlers: connect + bind every interrupt source the loop uses
//!   4. Hardware: arm timers / DMA / watchdog, enable peripheral interrupts
//!   5. Processor: unmask IRQs
//!   6. Control loop: poll forever
//!
//! Any failure in steps 1 to 4 is fatal; there is nothing to fall back to.

use control_core::dispatch::{DispatchTable, InterruptManager};
use control_core::fatal::FatalReason;
use platform::device::{self, DeviceId, Peripheral};
use platform::interrupt::InterruptController;

/// Ordered list of boot steps, for documentation and tests.
///
/// # Correctness Invariants
///
/// - Handlers are bound BEFORE the hardware is armed. A timer that expires
///   before its handler exists leaves a pending interrupt nothing clears.
/// - Processor IRQs are unmasked LAST. Unmasking earlier lets a stale
///   pending interrupt from before the reset reach a half-built table.
/// - The watchdog boot status is read before the watchdog is armed; on some
///   devices arming clears the latch.
pub const BOOT_SEQUENCE_STEPS: &[&str] = &[
    "1. GIC: lookup, initialize, self-test",
    "2. Peripherals: lookup, initialize, self-test",
    "3. Handlers: connect and bind interrupt sources",
    "4. Hardware: read watchdog boot status, arm timers / DMA / watchdog",
    "5. Processor: unmask IRQs",
    "6. Control loop: poll forever",
];

/// Bring up peripheral `id`, mapping failure to its fatal reason.
pub fn bring_up<P: Peripheral>(id: DeviceId) -> Result<P, FatalReason> {
    let peripheral = device::bring_up(id)?;
    #[cfg(feature = "defmt")]
    defmt::debug!("device {} up", id.0);
    #[cfg(feature = "emulator")]
    tracing::debug!(device = id.0, "device up");
    Ok(peripheral)
}

/// Bring up the interrupt controller and couple it with `table`.
pub fn interrupt_manager<'t, 'h, C, const N: usize>(
    id: DeviceId,
    table: &'t DispatchTable<'h, N>,
) -> Result<InterruptManager<'t, 'h, C, N>, FatalReason>
where
    C: InterruptController + Peripheral,
{
    let controller = bring_up::<C>(id)?;
    Ok(InterruptManager::new(controller, table))
}

/// Counter ticks in `ms` milliseconds of a `clock_hz` clock, saturating.
pub fn ticks_for_ms(clock_hz: u32, ms: u32) -> u32 {
    let ticks = u64::from(clock_hz)
        .saturating_mul(u64::from(ms))
        .checked_div(1_000)
        .unwrap_or(0);
    u32::try_from(ticks).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use platform::clock_config::CPU_3X2X_CLOCK_HZ;
    use platform::mocks::{MockGic, MockPrivateTimer, FAILING_SELF_TEST, MISSING_DEVICE};

    fn step_index(prefix: &str) -> usize {
        BOOT_SEQUENCE_STEPS
            .iter()
            .position(|s| s.contains(prefix))
            .unwrap()
    }

    #[test]
    fn handlers_bound_before_hardware_armed() {
        assert!(step_index("Handlers") < step_index("Hardware"));
    }

    #[test]
    fn irqs_unmasked_last_before_loop() {
        assert!(step_index("Hardware") < step_index("unmask IRQs"));
        assert_eq!(step_index("Control loop"), BOOT_SEQUENCE_STEPS.len() - 1);
    }

    #[test]
    fn bring_up_failures_become_fatal_reasons() {
        assert_eq!(
            bring_up::<MockPrivateTimer>(MISSING_DEVICE).err(),
            Some(FatalReason::ConfigNotFound(MISSING_DEVICE))
        );
        assert_eq!(
            bring_up::<MockPrivateTimer>(FAILING_SELF_TEST).err(),
            Some(FatalReason::SelfTestFailed(FAILING_SELF_TEST))
        );
        assert!(bring_up::<MockPrivateTimer>(DeviceId(0)).is_ok());
    }

    #[test]
    fn interrupt_manager_wraps_a_live_controller() {
        let table: DispatchTable<'_, 2> = DispatchTable::new();
        let irq = interrupt_manager::<MockGic, 2>(DeviceId(0), &table).unwrap();
        assert!(!irq.controller().processor_interrupts_enabled());
    }

    #[test]
    fn one_second_of_private_timer_ticks() {
        assert_eq!(ticks_for_ms(CPU_3X2X_CLOCK_HZ, 1_000), CPU_3X2X_CLOCK_HZ);
        assert_eq!(ticks_for_ms(1_000_000, 250), 250_000);
        assert_eq!(ticks_for_ms(u32::MAX, 10_000), u32::MAX);
    }
}

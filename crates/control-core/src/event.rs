//! Event flag channel: interrupt-to-loop handoff of "it happened".
//!
//! One interrupt handler raises, one control loop takes. Multiple raises
//! before a take coalesce into a single observed event; callers rely on
//! occurrence, never on counts.

use core::sync::atomic::{AtomicBool, Ordering};

/// Single-writer / single-reader event flag.
///
/// `raise` is a release store and `take` an acquire-release swap, so every
/// write the handler made before raising is visible to the loop once `take`
/// returns `true`.
#[derive(Debug)]
pub struct EventFlag {
    raised: AtomicBool,
}

impl Default for EventFlag {
    fn default() -> Self {
        Self::new()
    }
}

impl EventFlag {
    /// A lowered flag. Usable in `static` items.
    pub const fn new() -> Self {
        Self {
            raised: AtomicBool::new(false),
        }
    }

    /// Signal the event (interrupt context). Idempotent until the next take.
    #[inline]
    pub fn raise(&self) {
        self.raised.store(true, Ordering::Release);
    }

    /// Read and clear the flag (loop context).
    ///
    /// Returns whether the event had been raised since the last take.
    #[inline]
    pub fn take(&self) -> bool {
        self.raised.swap(false, Ordering::AcqRel)
    }

    /// Peek without clearing.
    #[inline]
    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::Acquire)
    }

    /// Busy-wait until the event is raised, then clear it.
    ///
    /// This is the control loops' standard wait: a spin on `take`. It never
    /// sleeps, so it is only correct when the raising side is an interrupt
    /// handler (or another thread) that runs while this one spins.
    pub fn wait(&self) {
        while !self.take() {
            core::hint::spin_loop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_after_construction_is_false() {
        let flag = EventFlag::new();
        assert!(!flag.take());
        assert!(!flag.is_raised());
    }

    #[test]
    fn raise_is_observed_exactly_once() {
        let flag = EventFlag::new();
        flag.raise();
        assert!(flag.is_raised());
        assert!(flag.take());
        assert!(!flag.take());
        assert!(!flag.take());
    }

    #[test]
    fn repeated_raises_coalesce() {
        let flag = EventFlag::new();
        flag.raise();
        flag.raise();
        flag.raise();
        assert!(flag.take());
        assert!(!flag.take());
    }

    #[test]
    fn wait_returns_immediately_when_raised() {
        static FLAG: EventFlag = EventFlag::new();
        FLAG.raise();
        FLAG.wait();
        assert!(!FLAG.is_raised());
    }
}

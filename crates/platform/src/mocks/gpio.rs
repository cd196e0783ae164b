use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::vec::Vec;

use crate::device::{DeviceId, Peripheral};
use crate::gpio::{
    Direction, EdgeQualifier, GpioBank, InterruptMode, PinGroup, PinId, PinState,
};
use crate::interrupt::InterruptAck;

use super::{lock, lookup, self_test_passes, MockConfig};

/// Number of PS GPIO pins (54 MIO + 64 EMIO).
const PINS: usize = 118;

#[derive(Debug)]
struct BankState {
    levels: [AtomicBool; PINS],
    latched: [AtomicBool; PINS],
    irq_enabled: [AtomicBool; PINS],
    modes: Mutex<[Option<InterruptMode>; PINS]>,
    writes: Mutex<Vec<(PinId, PinState)>>,
}

impl BankState {
    fn level(&self, pin: PinId) -> bool {
        self.levels
            .get(usize::from(pin.0))
            .is_some_and(|l| l.load(Ordering::Acquire))
    }
}

/// Mock PS GPIO controller.
#[derive(Debug)]
pub struct MockGpio {
    id: DeviceId,
    directions: [Direction; PINS],
    output_enabled: [bool; PINS],
    state: Arc<BankState>,
}

impl Default for MockGpio {
    fn default() -> Self {
        Self::new()
    }
}

impl MockGpio {
    /// All pins inputs, low, no interrupts.
    pub fn new() -> Self {
        Self {
            id: DeviceId(0),
            directions: [Direction::Input; PINS],
            output_enabled: [false; PINS],
            state: Arc::new(BankState {
                levels: core::array::from_fn(|_| AtomicBool::new(false)),
                latched: core::array::from_fn(|_| AtomicBool::new(false)),
                irq_enabled: core::array::from_fn(|_| AtomicBool::new(false)),
                modes: Mutex::new([None; PINS]),
                writes: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Handle for driving inputs and observing outputs from outside the
    /// control loop.
    pub fn handle(&self) -> MockGpioHandle {
        MockGpioHandle {
            state: Arc::clone(&self.state),
        }
    }

    /// Direction of `pin`
    pub fn direction(&self, pin: PinId) -> Option<Direction> {
        self.directions.get(usize::from(pin.0)).copied()
    }

    /// Whether `pin`'s output driver is enabled
    pub fn output_enabled(&self, pin: PinId) -> bool {
        self.output_enabled
            .get(usize::from(pin.0))
            .copied()
            .unwrap_or(false)
    }
}

/// External view of a [`MockGpio`]: the board around the pins.
#[derive(Debug, Clone)]
pub struct MockGpioHandle {
    state: Arc<BankState>,
}

impl MockGpioHandle {
    /// Drive an input pin from outside.
    ///
    /// Returns whether the transition latched the pin's interrupt, i.e.
    /// whether the caller should dispatch the GPIO interrupt.
    pub fn drive_input(&self, pin: PinId, level: PinState) -> bool {
        let idx = usize::from(pin.0);
        let (Some(slot), Some(latch), Some(enabled)) = (
            self.state.levels.get(idx),
            self.state.latched.get(idx),
            self.state.irq_enabled.get(idx),
        ) else {
            return false;
        };
        let high = bool::from(level);
        let was_high = slot.swap(high, Ordering::AcqRel);
        let mode = lock(&self.state.modes).get(idx).copied().flatten();
        let edge = match mode {
            Some(InterruptMode::RisingEdge) => !was_high && high,
            Some(InterruptMode::FallingEdge) => was_high && !high,
            Some(InterruptMode::BothEdges) => was_high != high,
            None => false,
        };
        if edge && enabled.load(Ordering::Acquire) {
            latch.store(true, Ordering::Release);
            return true;
        }
        false
    }

    /// Whether `pin` has a latched, unacknowledged interrupt.
    pub fn is_latched(&self, pin: PinId) -> bool {
        self.state
            .latched
            .get(usize::from(pin.0))
            .is_some_and(|l| l.load(Ordering::Acquire))
    }

    /// Current level of `pin`.
    pub fn level(&self, pin: PinId) -> PinState {
        PinState::from(self.state.level(pin))
    }

    /// Every output write so far, in order.
    pub fn writes(&self) -> Vec<(PinId, PinState)> {
        lock(&self.state.writes).clone()
    }
}

/// Interrupt-context handle for one GPIO pin.
#[derive(Debug, Clone)]
pub struct MockGpioLine {
    state: Arc<BankState>,
    pin: PinId,
    qualifier: EdgeQualifier,
}

impl InterruptAck for MockGpioLine {
    fn acknowledge(&self) -> bool {
        let latched = self
            .state
            .latched
            .get(usize::from(self.pin.0))
            .is_some_and(|l| l.swap(false, Ordering::AcqRel));
        match self.qualifier {
            EdgeQualifier::Any => latched,
            EdgeQualifier::LevelHigh => latched && self.state.level(self.pin),
        }
    }
}

impl Peripheral for MockGpio {
    type Config = MockConfig;

    fn lookup_config(id: DeviceId) -> Option<MockConfig> {
        lookup(id)
    }

    fn initialize(config: MockConfig) -> Option<Self> {
        let mut gpio = Self::new();
        gpio.id = config.id;
        Some(gpio)
    }

    fn self_test(&mut self) -> bool {
        self_test_passes(self.id)
    }
}

impl GpioBank for MockGpio {
    type Line = MockGpioLine;

    fn set_direction(&mut self, pin: PinId, direction: Direction) {
        if let Some(d) = self.directions.get_mut(usize::from(pin.0)) {
            *d = direction;
        }
    }

    fn set_output_enable(&mut self, pin: PinId, enabled: bool) {
        if let Some(e) = self.output_enabled.get_mut(usize::from(pin.0)) {
            *e = enabled;
        }
    }

    fn write_pin(&mut self, pin: PinId, state: PinState) {
        if let Some(level) = self.state.levels.get(usize::from(pin.0)) {
            level.store(bool::from(state), Ordering::Release);
            lock(&self.state.writes).push((pin, state));
        }
    }

    fn read_pin(&self, pin: PinId) -> PinState {
        PinState::from(self.state.level(pin))
    }

    fn set_interrupt_mode(&mut self, pin: PinId, mode: InterruptMode) {
        if let Some(m) = lock(&self.state.modes).get_mut(usize::from(pin.0)) {
            *m = Some(mode);
        }
    }

    fn enable_interrupt(&mut self, pin: PinId) {
        if let Some(e) = self.state.irq_enabled.get(usize::from(pin.0)) {
            e.store(true, Ordering::Release);
        }
    }

    fn line(&self, pin: PinId, qualifier: EdgeQualifier) -> MockGpioLine {
        MockGpioLine {
            state: Arc::clone(&self.state),
            pin,
            qualifier,
        }
    }
}

/// Mock AXI GPIO word (switch bank or LED bank); clones share the value.
#[derive(Debug, Clone, Default)]
pub struct MockPinGroup {
    value: Arc<AtomicU32>,
}

impl MockPinGroup {
    /// A bank reading `value`.
    pub fn new(value: u32) -> Self {
        Self {
            value: Arc::new(AtomicU32::new(value)),
        }
    }

    /// Change what the bank reads (flip switches).
    pub fn set(&self, value: u32) {
        self.value.store(value, Ordering::Release);
    }

    /// Current value (LED state).
    pub fn get(&self) -> u32 {
        self.value.load(Ordering::Acquire)
    }
}

impl PinGroup for MockPinGroup {
    type Error = core::convert::Infallible;

    fn read(&self) -> Result<u32, Self::Error> {
        Ok(self.get())
    }

    fn write(&mut self, value: u32) -> Result<(), Self::Error> {
        self.set(value);
        Ok(())
    }

    fn set_high(&mut self, mask: u32) -> Result<(), Self::Error> {
        self.value.fetch_or(mask, Ordering::AcqRel);
        Ok(())
    }

    fn set_low(&mut self, mask: u32) -> Result<(), Self::Error> {
        self.value.fetch_and(!mask, Ordering::AcqRel);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BUTTON: PinId = PinId(50);

    #[test]
    fn rising_edge_latches_only_when_enabled() {
        let mut gpio = MockGpio::new();
        let board = gpio.handle();
        gpio.set_interrupt_mode(BUTTON, InterruptMode::RisingEdge);
        assert!(!board.drive_input(BUTTON, PinState::High));
        board.drive_input(BUTTON, PinState::Low);
        gpio.enable_interrupt(BUTTON);
        assert!(board.drive_input(BUTTON, PinState::High));
        assert!(!board.drive_input(BUTTON, PinState::High));
    }

    #[test]
    fn level_high_qualifier_drops_bounced_edges() {
        let mut gpio = MockGpio::new();
        let board = gpio.handle();
        gpio.set_interrupt_mode(BUTTON, InterruptMode::RisingEdge);
        gpio.enable_interrupt(BUTTON);
        let line = gpio.line(BUTTON, EdgeQualifier::LevelHigh);

        assert!(board.drive_input(BUTTON, PinState::High));
        board.drive_input(BUTTON, PinState::Low);
        assert!(!line.acknowledge());

        assert!(board.drive_input(BUTTON, PinState::High));
        assert!(line.acknowledge());
        assert!(!line.acknowledge());
    }

    #[test]
    fn pin_group_masks() {
        let mut leds = MockPinGroup::new(0);
        leds.set_high(0b1010).expect("infallible");
        leds.set_low(0b0010).expect("infallible");
        assert_eq!(leds.get(), 0b1000);
    }
}

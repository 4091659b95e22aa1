//! Simulated host platform
//!
//! Stands in for a board when no panel is attached: pins keep a logical
//! level instead of a voltage, the bus shifts bits into a log one clock edge
//! at a time, and delays advance a virtual monotonic clock instead of
//! blocking. A [`SimProbe`] looks at all of it from the outside and can
//! change what the "panel" presents on input pins.
//!
//! Everything shares one `Rc<RefCell<_>>`, matching the single thread of
//! control the interface assumes.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::convert::Infallible;
use std::rc::Rc;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{self, InputPin, OutputPin, PinState, StatefulOutputPin};
use embedded_hal::spi::{self, SpiBus};
use thiserror::Error;

use crate::epdif::platform::{BusConfig, Platform};

/// Number of pins a [`SimPlatform::new`] board has
pub const DEFAULT_PIN_COUNT: u8 = 48;

/// Observable step taken through the simulated hardware
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// An output was driven
    Write {
        /// Pin identifier
        pin: u8,
        /// Driven level
        level: PinState,
    },
    /// A pin was read
    Read {
        /// Pin identifier
        pin: u8,
        /// Level returned
        level: PinState,
    },
    /// One byte went out on the bus
    Transfer {
        /// Byte shifted out
        byte: u8,
    },
    /// A delay elapsed
    Delay {
        /// Nanoseconds the clock advanced
        ns: u64,
    },
}

/// Why the simulated platform refused a claim
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimError {
    /// Pin identifier does not exist on this board
    #[error("pin {0} does not exist")]
    NoSuchPin(u8),
    /// Pin is already handed out
    #[error("pin {0} is already claimed")]
    PinClaimed(u8),
    /// Bus is already handed out
    #[error("bus is already claimed")]
    BusClaimed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Output,
    Input,
}

#[derive(Debug)]
struct SimPin {
    direction: Option<Direction>,
    level: PinState,
    script: VecDeque<PinState>,
}

#[derive(Debug)]
struct SimState {
    pins: Vec<SimPin>,
    bus: Option<BusConfig>,
    clock_edges: usize,
    mosi_bits: Vec<bool>,
    bytes: Vec<u8>,
    now_ns: u64,
    events: Vec<Event>,
}

impl SimState {
    fn pin_mut(&mut self, pin: u8) -> &mut SimPin {
        &mut self.pins[usize::from(pin)]
    }

    fn claim_pin(&mut self, pin: u8, direction: Direction) -> Result<&mut SimPin, SimError> {
        let slot = self
            .pins
            .get_mut(usize::from(pin))
            .ok_or(SimError::NoSuchPin(pin))?;
        if slot.direction.is_some() {
            return Err(SimError::PinClaimed(pin));
        }
        slot.direction = Some(direction);
        Ok(slot)
    }

    fn write(&mut self, pin: u8, level: PinState) {
        self.pin_mut(pin).level = level;
        self.events.push(Event::Write { pin, level });
    }

    fn sense(&mut self, pin: u8) -> PinState {
        let slot = self.pin_mut(pin);
        if let Some(next) = slot.script.pop_front() {
            slot.level = next;
        }
        let level = slot.level;
        self.events.push(Event::Read { pin, level });
        level
    }

    fn read_back(&mut self, pin: u8) -> PinState {
        let level = self.pin_mut(pin).level;
        self.events.push(Event::Read { pin, level });
        level
    }

    fn shift_out(&mut self, config: &BusConfig, byte: u8) {
        for bit in config.bit_order.bits(byte) {
            self.mosi_bits.push(bit);
            self.clock_edges += 1;
        }
        self.bytes.push(byte);
        self.events.push(Event::Transfer { byte });
    }

    fn advance(&mut self, ns: u64) {
        self.now_ns += ns;
        self.events.push(Event::Delay { ns });
    }
}

type Shared = Rc<RefCell<SimState>>;

/// Board with simulated pins, bus and clock
#[derive(Debug, Clone)]
pub struct SimPlatform {
    state: Shared,
}

impl SimPlatform {
    /// Board with [`DEFAULT_PIN_COUNT`] pins, all low and unclaimed
    pub fn new() -> Self {
        Self::with_pin_count(DEFAULT_PIN_COUNT)
    }

    /// Board with pins `0..count`
    pub fn with_pin_count(count: u8) -> Self {
        let pins = (0..count)
            .map(|_| SimPin {
                direction: None,
                level: PinState::Low,
                script: VecDeque::new(),
            })
            .collect();
        SimPlatform {
            state: Rc::new(RefCell::new(SimState {
                pins,
                bus: None,
                clock_edges: 0,
                mosi_bits: Vec::new(),
                bytes: Vec::new(),
                now_ns: 0,
                events: Vec::new(),
            })),
        }
    }

    /// Handle for inspecting and steering the board
    pub fn probe(&self) -> SimProbe {
        SimProbe {
            state: Rc::clone(&self.state),
        }
    }

    /// Mark the bus as taken by someone else
    pub fn hold_bus(&mut self) {
        self.state.borrow_mut().bus = Some(BusConfig::default());
    }

    /// Give back a bus taken with [`SimPlatform::hold_bus`]
    pub fn release_bus(&mut self) {
        self.state.borrow_mut().bus = None;
    }
}

impl Default for SimPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl Platform for SimPlatform {
    type PinId = u8;
    type Output = SimOutput;
    type Input = SimInput;
    type Bus = SimBus;
    type Delay = SimDelay;
    type Error = SimError;

    fn claim_output(&mut self, pin: u8, initial: PinState) -> Result<SimOutput, SimError> {
        self.state
            .borrow_mut()
            .claim_pin(pin, Direction::Output)?
            .level = initial;
        Ok(SimOutput {
            pin,
            state: Rc::clone(&self.state),
        })
    }

    fn claim_input(&mut self, pin: u8) -> Result<SimInput, SimError> {
        self.state.borrow_mut().claim_pin(pin, Direction::Input)?;
        Ok(SimInput {
            pin,
            state: Rc::clone(&self.state),
        })
    }

    fn claim_bus(&mut self, config: &BusConfig) -> Result<SimBus, SimError> {
        let mut state = self.state.borrow_mut();
        if state.bus.is_some() {
            return Err(SimError::BusClaimed);
        }
        state.bus = Some(*config);
        Ok(SimBus {
            config: *config,
            state: Rc::clone(&self.state),
        })
    }

    fn delay(&mut self) -> SimDelay {
        SimDelay {
            state: Rc::clone(&self.state),
        }
    }
}

fn release_pin(state: &Shared, pin: u8) {
    let mut state = state.borrow_mut();
    let slot = state.pin_mut(pin);
    slot.direction = None;
}

/// Simulated output pin
#[derive(Debug)]
pub struct SimOutput {
    pin: u8,
    state: Shared,
}

impl digital::ErrorType for SimOutput {
    type Error = Infallible;
}

impl OutputPin for SimOutput {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.state.borrow_mut().write(self.pin, PinState::Low);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.state.borrow_mut().write(self.pin, PinState::High);
        Ok(())
    }
}

impl StatefulOutputPin for SimOutput {
    fn is_set_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.state.borrow_mut().read_back(self.pin) == PinState::High)
    }

    fn is_set_low(&mut self) -> Result<bool, Self::Error> {
        Ok(self.state.borrow_mut().read_back(self.pin) == PinState::Low)
    }
}

impl Drop for SimOutput {
    fn drop(&mut self) {
        release_pin(&self.state, self.pin);
    }
}

/// Simulated input pin
#[derive(Debug)]
pub struct SimInput {
    pin: u8,
    state: Shared,
}

impl digital::ErrorType for SimInput {
    type Error = Infallible;
}

impl InputPin for SimInput {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.state.borrow_mut().sense(self.pin) == PinState::High)
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(self.state.borrow_mut().sense(self.pin) == PinState::Low)
    }
}

impl Drop for SimInput {
    fn drop(&mut self) {
        release_pin(&self.state, self.pin);
    }
}

/// Simulated serial bus
///
/// Every byte is shifted out bit by bit in the configured order, one clock
/// edge per bit. Reads shift in zeros.
#[derive(Debug)]
pub struct SimBus {
    config: BusConfig,
    state: Shared,
}

impl spi::ErrorType for SimBus {
    type Error = Infallible;
}

impl SpiBus<u8> for SimBus {
    fn read(&mut self, words: &mut [u8]) -> Result<(), Self::Error> {
        let mut state = self.state.borrow_mut();
        for word in words.iter_mut() {
            state.shift_out(&self.config, 0x00);
            *word = 0x00;
        }
        Ok(())
    }

    fn write(&mut self, words: &[u8]) -> Result<(), Self::Error> {
        let mut state = self.state.borrow_mut();
        for &word in words {
            state.shift_out(&self.config, word);
        }
        Ok(())
    }

    fn transfer(&mut self, read: &mut [u8], write: &[u8]) -> Result<(), Self::Error> {
        let mut state = self.state.borrow_mut();
        let len = read.len().max(write.len());
        for i in 0..len {
            state.shift_out(&self.config, write.get(i).copied().unwrap_or(0x00));
            if let Some(word) = read.get_mut(i) {
                *word = 0x00;
            }
        }
        Ok(())
    }

    fn transfer_in_place(&mut self, words: &mut [u8]) -> Result<(), Self::Error> {
        let mut state = self.state.borrow_mut();
        for word in words.iter_mut() {
            state.shift_out(&self.config, *word);
            *word = 0x00;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl Drop for SimBus {
    fn drop(&mut self) {
        self.state.borrow_mut().bus = None;
    }
}

/// Delay that advances the virtual clock
#[derive(Debug, Clone)]
pub struct SimDelay {
    state: Shared,
}

impl DelayNs for SimDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.state.borrow_mut().advance(u64::from(ns));
    }

    fn delay_us(&mut self, us: u32) {
        self.state.borrow_mut().advance(u64::from(us) * 1_000);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.state.borrow_mut().advance(u64::from(ms) * 1_000_000);
    }
}

/// Outside view of a [`SimPlatform`]
///
/// Methods taking a pin identifier panic if the pin does not exist on the
/// board.
#[derive(Debug, Clone)]
pub struct SimProbe {
    state: Shared,
}

impl SimProbe {
    /// Level currently on `pin`
    pub fn level(&self, pin: u8) -> PinState {
        self.state.borrow_mut().pin_mut(pin).level
    }

    /// Present `level` on `pin`, dropping any scripted levels
    pub fn set_level(&self, pin: u8, level: PinState) {
        let mut state = self.state.borrow_mut();
        let slot = state.pin_mut(pin);
        slot.script.clear();
        slot.level = level;
    }

    /// Levels presented on `pin` by successive reads
    ///
    /// Once the script runs out the pin holds its last scripted level.
    pub fn script_levels(&self, pin: u8, levels: impl IntoIterator<Item = PinState>) {
        self.state
            .borrow_mut()
            .pin_mut(pin)
            .script
            .extend(levels);
    }

    /// Whether `pin` is handed out
    pub fn is_claimed(&self, pin: u8) -> bool {
        self.state.borrow_mut().pin_mut(pin).direction.is_some()
    }

    /// Whether `pin` is claimed as an output
    pub fn is_output(&self, pin: u8) -> bool {
        self.state.borrow_mut().pin_mut(pin).direction == Some(Direction::Output)
    }

    /// Whether `pin` is claimed as an input
    pub fn is_input(&self, pin: u8) -> bool {
        self.state.borrow_mut().pin_mut(pin).direction == Some(Direction::Input)
    }

    /// Whether the bus is handed out
    pub fn bus_claimed(&self) -> bool {
        self.state.borrow().bus.is_some()
    }

    /// Clock edges driven on the bus so far
    pub fn clock_edges(&self) -> usize {
        self.state.borrow().clock_edges
    }

    /// Bits driven on the data line, in wire order
    pub fn mosi_bits(&self) -> Vec<bool> {
        self.state.borrow().mosi_bits.clone()
    }

    /// Bytes shifted out so far
    pub fn bytes(&self) -> Vec<u8> {
        self.state.borrow().bytes.clone()
    }

    /// Virtual monotonic time in nanoseconds
    pub fn now_ns(&self) -> u64 {
        self.state.borrow().now_ns
    }

    /// Everything that happened since the last [`SimProbe::clear_events`]
    pub fn events(&self) -> Vec<Event> {
        self.state.borrow().events.clone()
    }

    /// Forget recorded events
    pub fn clear_events(&self) {
        self.state.borrow_mut().events.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dropping_a_pin_releases_it() {
        let mut platform = SimPlatform::new();
        let probe = platform.probe();

        let pin = platform.claim_output(3, PinState::High).unwrap();
        assert!(probe.is_output(3));
        assert_eq!(probe.level(3), PinState::High);
        assert_eq!(
            platform.claim_input(3).err(),
            Some(SimError::PinClaimed(3))
        );

        drop(pin);
        assert!(!probe.is_claimed(3));
        assert!(platform.claim_input(3).is_ok());
    }

    #[test]
    fn bus_can_only_be_claimed_once() {
        let mut platform = SimPlatform::new();
        let bus = platform.claim_bus(&BusConfig::default()).unwrap();
        assert_eq!(
            platform.claim_bus(&BusConfig::default()).err(),
            Some(SimError::BusClaimed)
        );
        drop(bus);
        assert!(platform.claim_bus(&BusConfig::default()).is_ok());
    }

    #[test]
    fn refusals_describe_the_resource() {
        assert_eq!(SimError::NoSuchPin(60).to_string(), "pin 60 does not exist");
        assert_eq!(SimError::PinClaimed(8).to_string(), "pin 8 is already claimed");
        assert_eq!(SimError::BusClaimed.to_string(), "bus is already claimed");
    }

    #[test]
    fn unknown_pin_is_refused() {
        let mut platform = SimPlatform::with_pin_count(4);
        assert_eq!(
            platform.claim_output(4, PinState::Low).err(),
            Some(SimError::NoSuchPin(4))
        );
    }

    #[test]
    fn scripted_levels_hold_the_last_value() {
        let mut platform = SimPlatform::new();
        let probe = platform.probe();
        let mut busy = platform.claim_input(8).unwrap();

        probe.script_levels(8, [PinState::High, PinState::Low]);
        assert!(busy.is_high().unwrap());
        assert!(busy.is_low().unwrap());
        assert!(busy.is_low().unwrap());
    }

    #[test]
    fn delay_advances_clock_without_blocking() {
        let mut platform = SimPlatform::new();
        let probe = platform.probe();
        let mut delay = platform.delay();

        delay.delay_ms(250);
        delay.delay_us(3);
        delay.delay_ns(7);
        assert_eq!(probe.now_ns(), 250_000_000 + 3_000 + 7);
        assert_eq!(probe.events().len(), 3);
    }

    #[test]
    fn transfer_pads_the_shorter_buffer() {
        let mut platform = SimPlatform::new();
        let probe = platform.probe();
        let mut bus = platform.claim_bus(&BusConfig::default()).unwrap();

        let mut read = [0xEE; 3];
        bus.transfer(&mut read, &[0x12]).unwrap();
        assert_eq!(read, [0x00; 3]);
        assert_eq!(probe.bytes(), vec![0x12, 0x00, 0x00]);
        assert_eq!(probe.clock_edges(), 24);
    }
}

//! Host platform seam
//!
//! [`EpdIf`](crate::epdif::interface::EpdIf) never touches registers itself. It
//! asks a [`Platform`] for the pins, the bus and a delay, all expressed as
//! `embedded-hal` traits, so the same interface runs on a board or against
//! [`SimPlatform`](crate::epdif::sim::SimPlatform) in tests.

use core::fmt::Debug;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, PinState, StatefulOutputPin};
use embedded_hal::spi::{Mode, SpiBus, MODE_0};

/// Order in which the bits of a byte leave the shift register
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BitOrder {
    /// Most significant bit first, what the panel controllers expect
    #[default]
    MsbFirst,
    /// Least significant bit first
    LsbFirst,
}

impl BitOrder {
    /// Bits of `value` in transmission order
    pub fn bits(self, value: u8) -> [bool; 8] {
        let mut bits = [false; 8];
        for (i, bit) in bits.iter_mut().enumerate() {
            let shift = match self {
                BitOrder::MsbFirst => 7 - i,
                BitOrder::LsbFirst => i,
            };
            *bit = value & (1 << shift) != 0;
        }
        bits
    }
}

/// Serial bus settings applied when the bus is claimed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusConfig {
    /// Clock rate in Hz
    pub frequency_hz: u32,
    /// Bit order on the data line
    pub bit_order: BitOrder,
    /// Clock polarity and phase
    pub mode: Mode,
}

impl BusConfig {
    /// 2 MHz, MSB first, mode 0
    pub const fn new() -> Self {
        BusConfig {
            frequency_hz: 2_000_000,
            bit_order: BitOrder::MsbFirst,
            mode: MODE_0,
        }
    }

    /// Set the clock rate
    #[must_use]
    pub const fn frequency_hz(mut self, frequency_hz: u32) -> Self {
        self.frequency_hz = frequency_hz;
        self
    }

    /// Set the bit order
    #[must_use]
    pub const fn bit_order(mut self, bit_order: BitOrder) -> Self {
        self.bit_order = bit_order;
        self
    }

    /// Set clock polarity and phase
    #[must_use]
    pub const fn mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }
}

impl Default for BusConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Pin, bus and timer facilities of the host platform
///
/// Each `claim_*` hands out exclusive ownership of one resource. Claiming
/// something that is already out must fail; dropping the returned object
/// gives it back.
pub trait Platform {
    /// Physical pin identifier
    type PinId: Copy + PartialEq + Debug;
    /// Pin configured as a push-pull output
    type Output: StatefulOutputPin;
    /// Pin configured as an input
    type Input: InputPin;
    /// The serial data bus
    type Bus: SpiBus<u8>;
    /// Blocking delay provider
    type Delay: DelayNs;
    /// Reason a claim was refused
    type Error: Debug;

    /// Configure `pin` as an output driven to `initial`
    fn claim_output(
        &mut self,
        pin: Self::PinId,
        initial: PinState,
    ) -> Result<Self::Output, Self::Error>;

    /// Configure `pin` as an input
    fn claim_input(&mut self, pin: Self::PinId) -> Result<Self::Input, Self::Error>;

    /// Configure and activate the serial bus
    fn claim_bus(&mut self, config: &BusConfig) -> Result<Self::Bus, Self::Error>;

    /// Delay provider used by [`EpdIf::sleep_ms`](crate::epdif::interface::EpdIf::sleep_ms)
    fn delay(&mut self) -> Self::Delay;
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal::spi::MODE_3;

    #[test]
    fn default_bus_is_2mhz_msb_first_mode0() {
        let config = BusConfig::default();
        assert_eq!(config.frequency_hz, 2_000_000);
        assert_eq!(config.bit_order, BitOrder::MsbFirst);
        assert_eq!(config.mode, MODE_0);
    }

    #[test]
    fn builder_overrides_fields() {
        let config = BusConfig::new()
            .frequency_hz(200_000)
            .bit_order(BitOrder::LsbFirst)
            .mode(MODE_3);
        assert_eq!(config.frequency_hz, 200_000);
        assert_eq!(config.bit_order, BitOrder::LsbFirst);
        assert_eq!(config.mode, MODE_3);
    }

    #[test]
    fn bit_order_controls_transmission_order() {
        let msb = BitOrder::MsbFirst.bits(0x01);
        assert_eq!(msb, [false, false, false, false, false, false, false, true]);

        let lsb = BitOrder::LsbFirst.bits(0x01);
        assert_eq!(lsb, [true, false, false, false, false, false, false, false]);

        assert!(BitOrder::MsbFirst.bits(0xAA)[0]);
        assert!(!BitOrder::LsbFirst.bits(0xAA)[0]);
    }
}

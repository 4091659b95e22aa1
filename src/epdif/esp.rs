//! ESP-IDF platform backed by `esp-idf-svc`
//!
//! Pins are handed out by GPIO number, the bus is SPI2 on the SCK/MOSI pins
//! given to [`EspPlatform::new`]. No MISO is wired, the panel only listens.
//!
//! Every handed out driver carries its [`PinClaim`] or [`BusClaim`], so
//! dropping it, or a failed driver setup, frees the resource again.

use esp_idf_svc::hal::delay::Delay;
use esp_idf_svc::hal::gpio::{self, AnyInputPin, AnyOutputPin, PinDriver};
use esp_idf_svc::hal::prelude::*;
use esp_idf_svc::hal::spi::{self, config, SpiBusDriver, SpiDriver, SpiDriverConfig, SPI2};
use esp_idf_svc::sys::EspError;
use thiserror::Error;

use embedded_hal::digital::{self as hal_digital, InputPin, OutputPin, PinState, StatefulOutputPin};
use embedded_hal::spi::{self as hal_spi, SpiBus};

use crate::epdif::claim::{BusClaim, ClaimError, ClaimTable, PinClaim};
use crate::epdif::platform::{BitOrder, BusConfig, Platform};

/// Highest GPIO number on the ESP32-S3
const MAX_GPIO: i32 = 48;

/// Why the ESP platform refused a claim
#[derive(Error, Debug)]
pub enum EspClaimError {
    /// Pin or bus is unavailable
    #[error(transparent)]
    Claim(#[from] ClaimError),
    /// ESP-IDF driver refused the configuration
    #[error("ESP-IDF driver error: {0}")]
    Esp(#[from] EspError),
}

type OutputDriver = PinDriver<'static, AnyOutputPin, gpio::Output>;
type InputDriver = PinDriver<'static, AnyInputPin, gpio::Input>;
type BusDriver = SpiBusDriver<'static, SpiDriver<'static>>;

/// ESP32 GPIO and SPI2
pub struct EspPlatform {
    claims: ClaimTable,
    sclk: PinClaim,
    sdo: PinClaim,
}

impl EspPlatform {
    /// Take ownership of the GPIO block and SPI2
    ///
    /// `sclk` and `sdo` are reserved for the bus for the life of the platform
    /// and cannot be claimed as panel lines.
    pub fn new(_pins: gpio::Pins, _spi2: SPI2, sclk: i32, sdo: i32) -> Result<Self, EspClaimError> {
        let claims = ClaimTable::new(MAX_GPIO);
        let sclk = claims.reserve_pin(sclk)?;
        let sdo = claims.reserve_pin(sdo)?;
        Ok(EspPlatform { claims, sclk, sdo })
    }
}

fn spi_config(bus: &BusConfig) -> spi::SpiConfig {
    let bit_order = match bus.bit_order {
        BitOrder::MsbFirst => config::BitOrder::MsbFirst,
        BitOrder::LsbFirst => config::BitOrder::LsbFirst,
    };
    spi::SpiConfig::new()
        .baudrate(bus.frequency_hz.Hz())
        .data_mode(bus.mode)
        .bit_order(bit_order)
}

impl Platform for EspPlatform {
    type PinId = i32;
    type Output = EspOutput;
    type Input = EspInput;
    type Bus = EspBus;
    type Delay = Delay;
    type Error = EspClaimError;

    fn claim_output(&mut self, pin: i32, initial: PinState) -> Result<EspOutput, EspClaimError> {
        let claim = self.claims.reserve_pin(pin)?;
        // SAFETY: the GPIO block is owned by this platform and `claim`
        // guarantees no other driver exists for this number.
        let mut driver = PinDriver::output(unsafe { AnyOutputPin::new(pin) })?;
        driver.set_level(match initial {
            PinState::High => gpio::Level::High,
            PinState::Low => gpio::Level::Low,
        })?;
        log::info!("GPIO{} configured as output", pin);
        Ok(EspOutput {
            driver,
            _claim: claim,
        })
    }

    fn claim_input(&mut self, pin: i32) -> Result<EspInput, EspClaimError> {
        let claim = self.claims.reserve_pin(pin)?;
        // SAFETY: see `claim_output`
        let driver = PinDriver::input(unsafe { AnyInputPin::new(pin) })?;
        log::info!("GPIO{} configured as input", pin);
        Ok(EspInput {
            driver,
            _claim: claim,
        })
    }

    fn claim_bus(&mut self, config: &BusConfig) -> Result<EspBus, EspClaimError> {
        let claim = self.claims.reserve_bus()?;
        // SAFETY: SPI2 and the two bus pins were handed to `EspPlatform::new`
        // and `claim` guarantees no other driver holds them. If setup fails
        // the drivers below are dropped and `claim` frees the bus again.
        let (spi2, sclk, sdo) = unsafe {
            (
                SPI2::new(),
                AnyOutputPin::new(self.sclk.pin()),
                AnyOutputPin::new(self.sdo.pin()),
            )
        };
        let driver = SpiDriver::new(
            spi2,
            sclk,
            sdo,
            Option::<gpio::AnyIOPin>::None,
            &SpiDriverConfig::new().dma(spi::Dma::Disabled),
        )?;
        let bus = SpiBusDriver::new(driver, &spi_config(config))?;
        log::info!("SPI2 configured at {} Hz", config.frequency_hz);
        Ok(EspBus { bus, _claim: claim })
    }

    fn delay(&mut self) -> Delay {
        Delay::default()
    }
}

/// Output pin driver holding its GPIO reservation
pub struct EspOutput {
    driver: OutputDriver,
    _claim: PinClaim,
}

impl hal_digital::ErrorType for EspOutput {
    type Error = <OutputDriver as hal_digital::ErrorType>::Error;
}

impl OutputPin for EspOutput {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        OutputPin::set_low(&mut self.driver)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        OutputPin::set_high(&mut self.driver)
    }
}

impl StatefulOutputPin for EspOutput {
    fn is_set_high(&mut self) -> Result<bool, Self::Error> {
        StatefulOutputPin::is_set_high(&mut self.driver)
    }

    fn is_set_low(&mut self) -> Result<bool, Self::Error> {
        StatefulOutputPin::is_set_low(&mut self.driver)
    }
}

/// Input pin driver holding its GPIO reservation
pub struct EspInput {
    driver: InputDriver,
    _claim: PinClaim,
}

impl hal_digital::ErrorType for EspInput {
    type Error = <InputDriver as hal_digital::ErrorType>::Error;
}

impl InputPin for EspInput {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        InputPin::is_high(&mut self.driver)
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        InputPin::is_low(&mut self.driver)
    }
}

/// SPI2 bus driver holding the bus reservation
pub struct EspBus {
    bus: BusDriver,
    _claim: BusClaim,
}

impl hal_spi::ErrorType for EspBus {
    type Error = <BusDriver as hal_spi::ErrorType>::Error;
}

impl SpiBus<u8> for EspBus {
    fn read(&mut self, words: &mut [u8]) -> Result<(), Self::Error> {
        SpiBus::read(&mut self.bus, words)
    }

    fn write(&mut self, words: &[u8]) -> Result<(), Self::Error> {
        SpiBus::write(&mut self.bus, words)
    }

    fn transfer(&mut self, read: &mut [u8], write: &[u8]) -> Result<(), Self::Error> {
        SpiBus::transfer(&mut self.bus, read, write)
    }

    fn transfer_in_place(&mut self, words: &mut [u8]) -> Result<(), Self::Error> {
        SpiBus::transfer_in_place(&mut self.bus, words)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        SpiBus::flush(&mut self.bus)
    }
}

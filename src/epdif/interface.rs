//! Panel line and bus access
//!
//! [`EpdIf`] owns the four panel lines and the serial bus once
//! [`EpdIf::init`] has claimed them from a [`Platform`]. Holding an `EpdIf`
//! is the proof of initialization; dropping it hands everything back.
use embedded_hal::{
    delay::DelayNs,
    digital::{Error as _, InputPin, OutputPin, PinState, StatefulOutputPin},
    spi::{Error as _, SpiBus},
};

use crate::epdif::error::{Error, InitError, Resource, Result};
use crate::epdif::pins::{Line, OutputLine, PinConfig};
use crate::epdif::platform::{BusConfig, Platform};

/// Claimed panel lines, bus and delay
pub struct EpdIf<P: Platform> {
    /// Chip select, idles high
    cs: P::Output,
    /// Data/Command Control Pin (High for data, Low for command)
    dc: P::Output,
    /// Pin for Reseting
    rst: P::Output,
    /// High for busy, Wait until display is ready!
    busy: P::Input,
    /// Serial data bus
    bus: P::Bus,
    delay: P::Delay,
    pins: PinConfig<P::PinId>,
}

fn claim_failed<E: core::fmt::Debug>(resource: Resource, err: E) -> Error {
    log::error!("Could not claim {:?}: {:?}", resource, err);
    Error::Init(InitError::Claim {
        resource,
        reason: format!("{:?}", err),
    })
}

impl<P: Platform> EpdIf<P> {
    /// Claim the panel lines and the bus
    ///
    /// CS, DC and RST come up as outputs driven high, so the panel is
    /// deselected and out of reset. BUSY comes up as an input. The bus is
    /// configured with `bus` and left active.
    ///
    /// Anything claimed before a failure is released again before the error
    /// is returned.
    pub fn init(
        platform: &mut P,
        pins: PinConfig<P::PinId>,
        bus: &BusConfig,
    ) -> Result<Self> {
        log::info!("Initializing panel interface with {:?}", pins);
        pins.validate()?;

        let cs = platform
            .claim_output(pins.cs, PinState::High)
            .map_err(|e| claim_failed(Resource::Line(Line::ChipSelect), e))?;
        let dc = platform
            .claim_output(pins.dc, PinState::High)
            .map_err(|e| claim_failed(Resource::Line(Line::DataCommand), e))?;
        let rst = platform
            .claim_output(pins.rst, PinState::High)
            .map_err(|e| claim_failed(Resource::Line(Line::Reset), e))?;
        let busy = platform
            .claim_input(pins.busy)
            .map_err(|e| claim_failed(Resource::Line(Line::Busy), e))?;

        log::info!(
            "Configuring bus: {} Hz, {:?}, {:?}",
            bus.frequency_hz,
            bus.bit_order,
            bus.mode
        );
        let bus = platform
            .claim_bus(bus)
            .map_err(|e| claim_failed(Resource::Bus, e))?;

        let delay = platform.delay();

        log::info!("Panel interface ready");
        Ok(EpdIf {
            cs,
            dc,
            rst,
            busy,
            bus,
            delay,
            pins,
        })
    }

    /// Pin assignment this interface was initialized with
    pub fn pins(&self) -> &PinConfig<P::PinId> {
        &self.pins
    }

    fn output(&mut self, line: OutputLine) -> &mut P::Output {
        match line {
            OutputLine::ChipSelect => &mut self.cs,
            OutputLine::DataCommand => &mut self.dc,
            OutputLine::Reset => &mut self.rst,
        }
    }

    /// Drive `line` to `level`
    pub fn write_line(&mut self, line: OutputLine, level: PinState) -> Result<()> {
        log::trace!("{} <- {:?}", Line::from(line), level);
        self.output(line).set_state(level).map_err(|e| {
            let kind = e.kind();
            log::error!("Writing {} failed: {:?}", Line::from(line), kind);
            Error::Line {
                line: line.into(),
                kind,
            }
        })
    }

    /// Current level of `line`
    ///
    /// BUSY is sensed on every call. Output lines report the level they are
    /// driven to.
    pub fn read_line(&mut self, line: Line) -> Result<PinState> {
        let high = match line {
            Line::Busy => self.busy.is_high().map_err(|e| e.kind()),
            Line::ChipSelect => self.cs.is_set_high().map_err(|e| e.kind()),
            Line::DataCommand => self.dc.is_set_high().map_err(|e| e.kind()),
            Line::Reset => self.rst.is_set_high().map_err(|e| e.kind()),
        }
        .map_err(|kind| {
            log::error!("Reading {} failed: {:?}", line, kind);
            Error::Line { line, kind }
        })?;

        let level = PinState::from(high);
        log::trace!("{} -> {:?}", line, level);
        Ok(level)
    }

    /// Shift one byte out on the bus
    ///
    /// Returns once the transfer has completed on the wire. Whatever was
    /// shifted in at the same time is dropped.
    pub fn transfer_byte(&mut self, value: u8) -> Result<()> {
        log::trace!("bus <- 0x{:02X}", value);
        let mut word = [value];
        self.bus
            .transfer_in_place(&mut word)
            .and_then(|()| self.bus.flush())
            .map_err(|e| {
                let kind = e.kind();
                log::error!("Bus transfer of 0x{:02X} failed: {:?}", value, kind);
                Error::Bus(kind)
            })
    }

    /// Block for at least `ms` milliseconds
    pub fn sleep_ms(&mut self, ms: u32) {
        self.delay.delay_ms(ms);
    }
}

//! Command/data framing on top of [`EpdIf`]
//!
//! Panel drivers talk in commands and data bytes, not in pin levels. This
//! module provides the small set of framing primitives every SSD16xx/UC81xx
//! style controller shares:
//!
//! - `cmd()` / `data()` / `cmd_with_data()` - one CS frame with DC low or high
//! - `data_x_times()` - the same byte repeated, for filling panel RAM
//! - `reset()` - hardware reset pulse on RST
//! - `wait_until_idle()` - poll BUSY until the panel is done
//!
//! [`EpdLink`] also implements [`WriteOnlyDataCommand`], so drivers written
//! against `display-interface` can use it directly.

use display_interface::{DataFormat, DisplayError, WriteOnlyDataCommand};
use embedded_hal::digital::PinState;

use crate::epdif::error::{Error, Result};
use crate::epdif::interface::EpdIf;
use crate::epdif::pins::{Line, OutputLine};
use crate::epdif::platform::Platform;

/// Level of BUSY while the panel is working
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BusyPolarity {
    /// BUSY high means busy (SSD16xx family)
    #[default]
    ActiveHigh,
    /// BUSY low means busy (UC81xx family)
    ActiveLow,
}

impl BusyPolarity {
    fn busy_level(self) -> PinState {
        match self {
            BusyPolarity::ActiveHigh => PinState::High,
            BusyPolarity::ActiveLow => PinState::Low,
        }
    }
}

/// Hardware reset pulse timing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResetTiming {
    /// How long RST is held low
    pub low_ms: u32,
    /// Wait after RST goes back high
    pub settle_ms: u32,
}

impl Default for ResetTiming {
    fn default() -> Self {
        ResetTiming {
            low_ms: 10,
            settle_ms: 10,
        }
    }
}

/// Framing behaviour of an [`EpdLink`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkConfig {
    /// Which BUSY level means busy
    pub busy_polarity: BusyPolarity,
    /// Reset pulse timing
    pub reset: ResetTiming,
    /// Sleep between BUSY polls, at least 1 ms is used
    pub poll_ms: u32,
    /// Give up waiting for BUSY after this long, `None` waits forever
    pub busy_timeout_ms: Option<u32>,
}

impl Default for LinkConfig {
    fn default() -> Self {
        LinkConfig {
            busy_polarity: BusyPolarity::default(),
            reset: ResetTiming::default(),
            poll_ms: 10,
            busy_timeout_ms: None,
        }
    }
}

/// Command/data framing over an initialized [`EpdIf`]
pub struct EpdLink<P: Platform> {
    hal: EpdIf<P>,
    config: LinkConfig,
}

impl<P: Platform> EpdLink<P> {
    /// Wrap an initialized interface
    pub fn new(hal: EpdIf<P>, config: LinkConfig) -> Self {
        EpdLink { hal, config }
    }

    /// Framing configuration in use
    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// The underlying interface, for raw line access
    pub fn hal_mut(&mut self) -> &mut EpdIf<P> {
        &mut self.hal
    }

    /// Give back the underlying interface
    pub fn into_inner(self) -> EpdIf<P> {
        self.hal
    }

    /// One chip-select frame of `bytes` with DC at `dc`
    ///
    /// CS is raised again even when a transfer fails; the transfer error wins.
    fn frame(&mut self, dc: PinState, bytes: impl IntoIterator<Item = u8>) -> Result<()> {
        self.hal.write_line(OutputLine::DataCommand, dc)?;
        self.hal.write_line(OutputLine::ChipSelect, PinState::Low)?;

        let sent = bytes
            .into_iter()
            .try_for_each(|byte| self.hal.transfer_byte(byte));
        let released = self.hal.write_line(OutputLine::ChipSelect, PinState::High);

        sent.and(released)
    }

    /// Basic function for sending commands
    pub fn cmd(&mut self, command: u8) -> Result<()> {
        // low for commands
        self.frame(PinState::Low, [command]).map_err(|e| {
            log::error!("Sending command 0x{:02X} failed: {}", command, e);
            e
        })
    }

    /// Basic function for sending an array of u8-values of data
    pub fn data(&mut self, data: &[u8]) -> Result<()> {
        // high for data
        self.frame(PinState::High, data.iter().copied())
    }

    /// Basic function for sending a command and the data belonging to it.
    pub fn cmd_with_data(&mut self, command: u8, data: &[u8]) -> Result<()> {
        self.cmd(command)?;
        self.data(data)
    }

    /// Basic function for sending the same byte of data (one u8) multiple times
    /// Used for setting one color for the whole frame
    pub fn data_x_times(&mut self, val: u8, repetitions: u32) -> Result<()> {
        log::debug!("Sending 0x{:02X} {} times", val, repetitions);
        self.frame(PinState::High, (0..repetitions).map(|_| val))
    }

    /// Hardware reset: RST low for `low_ms`, then high and wait `settle_ms`
    pub fn reset(&mut self) -> Result<()> {
        let timing = self.config.reset;
        log::debug!(
            "Resetting panel ({} ms low, {} ms settle)",
            timing.low_ms,
            timing.settle_ms
        );
        self.hal.write_line(OutputLine::Reset, PinState::Low)?;
        self.hal.sleep_ms(timing.low_ms);
        self.hal.write_line(OutputLine::Reset, PinState::High)?;
        self.hal.sleep_ms(timing.settle_ms);
        Ok(())
    }

    /// Whether BUSY currently reports the panel as working
    pub fn is_busy(&mut self) -> Result<bool> {
        let level = self.hal.read_line(Line::Busy)?;
        Ok(level == self.config.busy_polarity.busy_level())
    }

    /// Waits until device isn't busy anymore
    pub fn wait_until_idle(&mut self) -> Result<()> {
        let poll_ms = self.config.poll_ms.max(1);
        let mut waited_ms: u32 = 0;

        while self.is_busy()? {
            if let Some(timeout) = self.config.busy_timeout_ms {
                if waited_ms >= timeout {
                    log::error!("TIMEOUT waiting for BUSY to clear after {} ms", waited_ms);
                    return Err(Error::BusyTimeout { waited_ms });
                }
            }
            self.hal.sleep_ms(poll_ms);
            waited_ms = waited_ms.saturating_add(poll_ms);
        }

        if waited_ms > 0 {
            log::debug!("Panel idle after {} ms", waited_ms);
        }
        Ok(())
    }

    fn frame_format(
        &mut self,
        dc: PinState,
        format: DataFormat<'_>,
    ) -> core::result::Result<(), DisplayError> {
        let sent = match format {
            DataFormat::U8(bytes) => self.frame(dc, bytes.iter().copied()),
            DataFormat::U16(words) => self.frame(dc, words.iter().flat_map(|w| w.to_ne_bytes())),
            DataFormat::U16BE(words) => {
                self.frame(dc, words.iter().flat_map(|w| w.to_be_bytes()))
            }
            DataFormat::U16LE(words) => {
                self.frame(dc, words.iter().flat_map(|w| w.to_le_bytes()))
            }
            DataFormat::U8Iter(iter) => self.frame(dc, iter),
            DataFormat::U16BEIter(iter) => self.frame(dc, iter.flat_map(u16::to_be_bytes)),
            DataFormat::U16LEIter(iter) => self.frame(dc, iter.flat_map(u16::to_le_bytes)),
            _ => return Err(DisplayError::DataFormatNotImplemented),
        };
        sent.map_err(DisplayError::from)
    }
}

impl<P: Platform> WriteOnlyDataCommand for EpdLink<P> {
    fn send_commands(&mut self, cmd: DataFormat<'_>) -> core::result::Result<(), DisplayError> {
        self.frame_format(PinState::Low, cmd)
    }

    fn send_data(&mut self, buf: DataFormat<'_>) -> core::result::Result<(), DisplayError> {
        self.frame_format(PinState::High, buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::epdif::pins::PinConfig;
    use crate::epdif::platform::BusConfig;
    use crate::epdif::sim::{Event, SimPlatform, SimProbe};

    const CS: u8 = 11;
    const DC: u8 = 10;
    const RST: u8 = 9;
    const BUSY: u8 = 8;

    fn link(config: LinkConfig) -> (EpdLink<SimPlatform>, SimProbe) {
        let mut platform = SimPlatform::new();
        let probe = platform.probe();
        let hal = EpdIf::init(
            &mut platform,
            PinConfig::new(CS, DC, RST, BUSY),
            &BusConfig::default(),
        )
        .unwrap();
        probe.clear_events();
        (EpdLink::new(hal, config), probe)
    }

    fn write(pin: u8, level: PinState) -> Event {
        Event::Write { pin, level }
    }

    #[test]
    fn command_is_framed_with_dc_low() {
        let (mut link, probe) = link(LinkConfig::default());
        link.cmd(0x12).unwrap();

        assert_eq!(
            probe.events(),
            vec![
                write(DC, PinState::Low),
                write(CS, PinState::Low),
                Event::Transfer { byte: 0x12 },
                write(CS, PinState::High),
            ]
        );
    }

    #[test]
    fn data_is_framed_with_dc_high() {
        let (mut link, probe) = link(LinkConfig::default());
        link.cmd_with_data(0x44, &[0x00, 0x0F]).unwrap();

        let events = probe.events();
        assert_eq!(
            &events[4..],
            &[
                write(DC, PinState::High),
                write(CS, PinState::Low),
                Event::Transfer { byte: 0x00 },
                Event::Transfer { byte: 0x0F },
                write(CS, PinState::High),
            ]
        );
        assert_eq!(probe.bytes(), vec![0x44, 0x00, 0x0F]);
    }

    #[test]
    fn repeated_data_fills_in_one_frame() {
        let (mut link, probe) = link(LinkConfig::default());
        link.data_x_times(0xFF, 100).unwrap();

        assert_eq!(probe.bytes(), vec![0xFF; 100]);
        assert_eq!(probe.clock_edges(), 800);
        let cs_writes = probe
            .events()
            .iter()
            .filter(|e| matches!(e, Event::Write { pin: CS, .. }))
            .count();
        assert_eq!(cs_writes, 2);
    }

    #[test]
    fn reset_pulses_rst_with_configured_timing() {
        let config = LinkConfig {
            reset: ResetTiming {
                low_ms: 2,
                settle_ms: 20,
            },
            ..LinkConfig::default()
        };
        let (mut link, probe) = link(config);
        link.reset().unwrap();

        assert_eq!(
            probe.events(),
            vec![
                write(RST, PinState::Low),
                Event::Delay { ns: 2_000_000 },
                write(RST, PinState::High),
                Event::Delay { ns: 20_000_000 },
            ]
        );
    }

    #[test]
    fn wait_until_idle_polls_until_busy_clears() {
        let (mut link, probe) = link(LinkConfig::default());
        probe.script_levels(BUSY, [PinState::High, PinState::High, PinState::Low]);

        link.wait_until_idle().unwrap();

        assert_eq!(probe.now_ns(), 20_000_000);
        let reads = probe
            .events()
            .iter()
            .filter(|e| matches!(e, Event::Read { pin: BUSY, .. }))
            .count();
        assert_eq!(reads, 3);
    }

    #[test]
    fn active_low_busy_waits_for_high() {
        let config = LinkConfig {
            busy_polarity: BusyPolarity::ActiveLow,
            ..LinkConfig::default()
        };
        let (mut link, probe) = link(config);
        probe.script_levels(BUSY, [PinState::Low, PinState::High]);

        assert!(link.is_busy().unwrap());
        assert!(!link.is_busy().unwrap());
        link.wait_until_idle().unwrap();
    }

    #[test]
    fn wait_until_idle_gives_up_after_timeout() {
        let config = LinkConfig {
            poll_ms: 5,
            busy_timeout_ms: Some(20),
            ..LinkConfig::default()
        };
        let (mut link, probe) = link(config);
        probe.set_level(BUSY, PinState::High);

        assert_eq!(
            link.wait_until_idle(),
            Err(Error::BusyTimeout { waited_ms: 20 })
        );
        assert_eq!(probe.now_ns(), 20_000_000);
    }

    #[test]
    fn display_interface_formats_are_framed() {
        let (mut link, probe) = link(LinkConfig::default());

        link.send_commands(DataFormat::U8(&[0x24])).unwrap();
        let mut words = [0x1234u16, 0xABCD];
        link.send_data(DataFormat::U16BE(&mut words)).unwrap();
        let mut iter = [0x01u8, 0x02].into_iter();
        link.send_data(DataFormat::U8Iter(&mut iter)).unwrap();
        let mut words = [0x1234u16];
        link.send_data(DataFormat::U16LE(&mut words)).unwrap();

        assert_eq!(
            probe.bytes(),
            vec![0x24, 0x12, 0x34, 0xAB, 0xCD, 0x01, 0x02, 0x34, 0x12]
        );
        assert_eq!(probe.level(DC), PinState::High);
        assert_eq!(probe.level(CS), PinState::High);
    }

    #[test]
    fn canonical_reset_and_first_command() {
        let (mut link, probe) = link(LinkConfig::default());
        probe.script_levels(BUSY, [PinState::High, PinState::Low]);

        link.reset().unwrap();
        link.wait_until_idle().unwrap();
        link.cmd(0x01).unwrap();

        assert_eq!(
            probe.events(),
            vec![
                write(RST, PinState::Low),
                Event::Delay { ns: 10_000_000 },
                write(RST, PinState::High),
                Event::Delay { ns: 10_000_000 },
                Event::Read {
                    pin: BUSY,
                    level: PinState::High
                },
                Event::Delay { ns: 10_000_000 },
                Event::Read {
                    pin: BUSY,
                    level: PinState::Low
                },
                write(DC, PinState::Low),
                write(CS, PinState::Low),
                Event::Transfer { byte: 0x01 },
                write(CS, PinState::High),
            ]
        );
    }
}

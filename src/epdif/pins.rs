//! Pin assignment for the e-paper panel control lines
//!
//! The panel is wired through four lines. Which physical pin carries which
//! role is board specific, so the roles are kept apart from the identifiers
//! and bound together in a [`PinConfig`] handed to
//! [`EpdIf::init`](crate::epdif::interface::EpdIf::init).

use core::fmt;

use crate::epdif::error::{Error, InitError};

/// Logical role of a panel line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Line {
    /// Chip select, low while the panel listens on the bus
    ChipSelect,
    /// Data/Command select (High for data, Low for command)
    DataCommand,
    /// Reset, low holds the panel controller in reset
    Reset,
    /// Busy sense, driven by the panel while it works
    Busy,
}

impl Line {
    /// All roles in the order they are claimed during initialization
    pub const ALL: [Line; 4] = [Line::ChipSelect, Line::DataCommand, Line::Reset, Line::Busy];
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Line::ChipSelect => "CS",
            Line::DataCommand => "DC",
            Line::Reset => "RST",
            Line::Busy => "BUSY",
        };
        f.write_str(name)
    }
}

/// The lines the interface drives
///
/// Busy sense is an input and deliberately has no variant here, so it
/// cannot be passed to [`EpdIf::write_line`](crate::epdif::interface::EpdIf::write_line).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputLine {
    /// Chip select
    ChipSelect,
    /// Data/Command select
    DataCommand,
    /// Reset
    Reset,
}

impl From<OutputLine> for Line {
    fn from(line: OutputLine) -> Self {
        match line {
            OutputLine::ChipSelect => Line::ChipSelect,
            OutputLine::DataCommand => Line::DataCommand,
            OutputLine::Reset => Line::Reset,
        }
    }
}

/// Default GPIO assignment of the reference wiring
pub struct Pins;

impl Pins {
    /// Chip Select pin for SPI display
    pub const CS: u8 = 11;
    /// Data/Command control pin (High for data, Low for command)
    pub const DC: u8 = 10;
    /// Reset pin for display
    pub const RST: u8 = 9;
    /// Busy status pin (High when display is busy)
    pub const BSY: u8 = 8;
}

/// Mapping from the four line roles to platform pin identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinConfig<Id> {
    /// Chip select
    pub cs: Id,
    /// Data/Command select
    pub dc: Id,
    /// Reset
    pub rst: Id,
    /// Busy sense
    pub busy: Id,
}

impl<Id: Copy + PartialEq> PinConfig<Id> {
    /// Bind the four roles to pin identifiers
    pub const fn new(cs: Id, dc: Id, rst: Id, busy: Id) -> Self {
        PinConfig { cs, dc, rst, busy }
    }

    /// Pin identifier assigned to `line`
    pub fn pin(&self, line: Line) -> Id {
        match line {
            Line::ChipSelect => self.cs,
            Line::DataCommand => self.dc,
            Line::Reset => self.rst,
            Line::Busy => self.busy,
        }
    }

    /// Role bound to a raw pin identifier, if any
    pub fn role_of(&self, id: Id) -> Option<Line> {
        Line::ALL.into_iter().find(|&line| self.pin(line) == id)
    }

    /// Check that no two roles share a pin
    pub fn validate(&self) -> Result<(), Error> {
        for (i, &first) in Line::ALL.iter().enumerate() {
            for &second in &Line::ALL[i + 1..] {
                if self.pin(first) == self.pin(second) {
                    return Err(Error::Init(InitError::DuplicatePin { first, second }));
                }
            }
        }
        Ok(())
    }
}

impl Default for PinConfig<u8> {
    fn default() -> Self {
        PinConfig::new(Pins::CS, Pins::DC, Pins::RST, Pins::BSY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_assignment_is_valid() {
        let pins = PinConfig::default();
        assert!(pins.validate().is_ok());
        assert_eq!(pins.pin(Line::ChipSelect), 11);
        assert_eq!(pins.pin(Line::Busy), 8);
    }

    #[test]
    fn shared_pin_is_rejected() {
        let pins = PinConfig::new(3u8, 4, 3, 5);
        match pins.validate() {
            Err(Error::Init(InitError::DuplicatePin { first, second })) => {
                assert_eq!(first, Line::ChipSelect);
                assert_eq!(second, Line::Reset);
            }
            other => panic!("expected duplicate pin error, got {:?}", other),
        }
    }

    #[test]
    fn raw_identifier_maps_back_to_role() {
        let pins = PinConfig::default();
        assert_eq!(pins.role_of(Pins::DC), Some(Line::DataCommand));
        assert_eq!(pins.role_of(Pins::BSY), Some(Line::Busy));
        assert_eq!(pins.role_of(42), None);
    }

    #[test]
    fn output_lines_convert_to_roles() {
        assert_eq!(Line::from(OutputLine::Reset), Line::Reset);
        assert_eq!(Line::from(OutputLine::ChipSelect).to_string(), "CS");
    }
}

//! Error types for the panel interface

use display_interface::DisplayError;
use embedded_hal::{digital, spi};
use thiserror::Error;

use crate::epdif::pins::Line;

/// Hardware resource claimed during initialization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    /// One of the four panel lines
    Line(Line),
    /// The serial data bus
    Bus,
}

/// Why initialization failed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InitError {
    /// Two roles were assigned the same physical pin
    #[error("{first} and {second} are assigned the same pin")]
    DuplicatePin {
        /// Role listed first in the assignment
        first: Line,
        /// Role sharing its pin
        second: Line,
    },

    /// The platform refused to hand out a pin or the bus
    #[error("could not claim {resource:?}: {reason}")]
    Claim {
        /// Resource that was being claimed
        resource: Resource,
        /// Platform description of the refusal
        reason: String,
    },
}

/// Errors raised by the panel interface
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Initialization failed, nothing was left claimed
    #[error("initialization failed: {0}")]
    Init(#[from] InitError),

    /// The platform reported a fault on a line
    #[error("{line} line fault: {kind:?}")]
    Line {
        /// Line that faulted
        line: Line,
        /// Fault reported by the pin driver
        kind: digital::ErrorKind,
    },

    /// The platform reported a bus fault
    #[error("bus fault: {0:?}")]
    Bus(spi::ErrorKind),

    /// The panel stayed busy past the configured timeout
    #[error("panel still busy after {waited_ms} ms")]
    BusyTimeout {
        /// Milliseconds spent polling
        waited_ms: u32,
    },
}

/// Convenience type alias for Results using our Error type.
pub type Result<T> = core::result::Result<T, Error>;

impl From<Error> for DisplayError {
    fn from(err: Error) -> Self {
        match err {
            Error::Line {
                line: Line::ChipSelect,
                ..
            } => DisplayError::CSError,
            Error::Line {
                line: Line::DataCommand,
                ..
            } => DisplayError::DCError,
            Error::Line {
                line: Line::Reset, ..
            } => DisplayError::RSError,
            Error::Line {
                line: Line::Busy, ..
            }
            | Error::Bus(_)
            | Error::BusyTimeout { .. }
            | Error::Init(_) => DisplayError::BusWriteError,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_faults_map_to_display_errors() {
        let err = Error::Line {
            line: Line::DataCommand,
            kind: digital::ErrorKind::Other,
        };
        assert_eq!(DisplayError::from(err), DisplayError::DCError);

        let err = Error::Line {
            line: Line::Reset,
            kind: digital::ErrorKind::Other,
        };
        assert_eq!(DisplayError::from(err), DisplayError::RSError);
        assert_eq!(
            DisplayError::from(Error::Bus(spi::ErrorKind::Other)),
            DisplayError::BusWriteError
        );
    }

    #[test]
    fn init_error_message_names_the_resource() {
        let err = Error::from(InitError::Claim {
            resource: Resource::Bus,
            reason: "already claimed".into(),
        });
        assert_eq!(
            err.to_string(),
            "initialization failed: could not claim Bus: already claimed"
        );
    }
}

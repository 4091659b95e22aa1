//! E-paper panel interface
//!
//! Everything a panel driver needs from the board, and nothing more: three
//! output lines (CS, DC, RST), one input line (BUSY), a byte-wide serial
//! bus and a millisecond delay.
//!
//! ### Usage
//!
//! 1. describe the wiring in a [`PinConfig`] and the bus in a [`BusConfig`]
//! 1. claim everything with [`EpdIf::init`], which is the only step that can
//!    fail for lack of hardware
//! 1. drive lines with [`EpdIf::write_line`], sense BUSY with
//!    [`EpdIf::read_line`], shift bytes with [`EpdIf::transfer_byte`] and
//!    wait with [`EpdIf::sleep_ms`]
//! 1. or wrap it in an [`EpdLink`] to speak in commands and data
//!
//! ```rust
//! use embedded_hal::digital::PinState;
//! use epaper_hal::epdif::{BusConfig, EpdIf, Line, OutputLine, PinConfig};
//! use epaper_hal::epdif::sim::SimPlatform;
//!
//! let mut platform = SimPlatform::new();
//! let mut epd = EpdIf::init(&mut platform, PinConfig::default(), &BusConfig::default())?;
//!
//! epd.write_line(OutputLine::Reset, PinState::Low)?;
//! epd.sleep_ms(10);
//! epd.write_line(OutputLine::Reset, PinState::High)?;
//! epd.sleep_ms(10);
//! while epd.read_line(Line::Busy)? == PinState::High {}
//! epd.transfer_byte(0x01)?;
//! # Ok::<(), epaper_hal::epdif::Error>(())
//! ```

pub mod claim;
pub mod error;
pub mod interface;
pub mod link;
pub mod pins;
pub mod platform;
pub mod sim;

#[cfg(target_os = "espidf")]
pub mod esp;

pub use error::{Error, InitError, Resource};
pub use interface::EpdIf;
pub use link::{BusyPolarity, EpdLink, LinkConfig, ResetTiming};
pub use pins::{Line, OutputLine, PinConfig, Pins};
pub use platform::{BitOrder, BusConfig, Platform};

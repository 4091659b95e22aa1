//! Hardware abstraction for e-paper panels
//!
//! Gives a panel driver the control lines and serial bus of an e-paper
//! display without tying it to one microcontroller's pin API. See
//! [`epdif`] for the interface itself.
#![deny(missing_docs)]
#![allow(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]

pub mod epdif;

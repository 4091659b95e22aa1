//! Claim bookkeeping for platforms that address pins by number
//!
//! A [`ClaimTable`] remembers which GPIO numbers and whether the bus are
//! handed out. Every successful reservation returns a guard; dropping the
//! guard gives the resource back, so a platform only has to keep the guard
//! next to the driver it built.

use std::cell::Cell;
use std::rc::Rc;

use thiserror::Error;

/// Why a reservation was refused
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimError {
    /// No such GPIO on this chip
    #[error("GPIO{0} does not exist")]
    InvalidPin(i32),
    /// GPIO is already handed out
    #[error("GPIO{0} is already claimed")]
    PinClaimed(i32),
    /// The bus is already handed out
    #[error("bus is already claimed")]
    BusClaimed,
}

#[derive(Debug)]
struct Claims {
    max_pin: i32,
    pins: Cell<u64>,
    bus: Cell<bool>,
}

/// Shared record of handed out pins and bus
#[derive(Debug, Clone)]
pub struct ClaimTable {
    claims: Rc<Claims>,
}

impl ClaimTable {
    /// Table for GPIO numbers `0..=max_pin`, at most 63
    pub fn new(max_pin: i32) -> Self {
        ClaimTable {
            claims: Rc::new(Claims {
                max_pin: max_pin.min(63),
                pins: Cell::new(0),
                bus: Cell::new(false),
            }),
        }
    }

    /// Reserve GPIO `pin` until the guard is dropped
    pub fn reserve_pin(&self, pin: i32) -> Result<PinClaim, ClaimError> {
        if !(0..=self.claims.max_pin).contains(&pin) {
            return Err(ClaimError::InvalidPin(pin));
        }
        let bit = 1u64 << pin;
        let pins = self.claims.pins.get();
        if pins & bit != 0 {
            return Err(ClaimError::PinClaimed(pin));
        }
        self.claims.pins.set(pins | bit);
        Ok(PinClaim {
            pin,
            claims: Rc::clone(&self.claims),
        })
    }

    /// Reserve the bus until the guard is dropped
    pub fn reserve_bus(&self) -> Result<BusClaim, ClaimError> {
        if self.claims.bus.replace(true) {
            return Err(ClaimError::BusClaimed);
        }
        Ok(BusClaim {
            claims: Rc::clone(&self.claims),
        })
    }

    /// Whether GPIO `pin` is handed out
    pub fn is_pin_claimed(&self, pin: i32) -> bool {
        (0..=self.claims.max_pin).contains(&pin) && self.claims.pins.get() & (1u64 << pin) != 0
    }

    /// Whether the bus is handed out
    pub fn is_bus_claimed(&self) -> bool {
        self.claims.bus.get()
    }
}

/// Reservation of one GPIO, released on drop
#[derive(Debug)]
pub struct PinClaim {
    pin: i32,
    claims: Rc<Claims>,
}

impl PinClaim {
    /// GPIO number held by this reservation
    pub fn pin(&self) -> i32 {
        self.pin
    }
}

impl Drop for PinClaim {
    fn drop(&mut self) {
        let pins = self.claims.pins.get();
        self.claims.pins.set(pins & !(1u64 << self.pin));
    }
}

/// Reservation of the bus, released on drop
#[derive(Debug)]
pub struct BusClaim {
    claims: Rc<Claims>,
}

impl Drop for BusClaim {
    fn drop(&mut self) {
        self.claims.bus.set(false);
    }
}

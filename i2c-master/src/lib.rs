#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]

//! Transaction-level I2C bus master.
//!
//! This crate turns the byte-level primitives of an I2C engine (START, STOP,
//! read-byte, write-byte, acknowledge) into a request/response transaction
//! protocol. The [`Controller`] is a synchronous state machine evaluated
//! once per logical tick; the engine that actually drives the wire is an
//! injected [`ByteEngine`] implementation, which keeps the controller fully
//! testable with a simulated engine.
//!
//! # Example
//! ```no_run
//! use i2c_master::{Config, Controller, Request};
//! # use i2c_master::{ByteEngine, Command, Report};
//! # struct Engine;
//! # impl ByteEngine for Engine {
//! #     fn poll(&mut self) -> Report { Report::default() }
//! #     fn execute(&mut self, _: Command) {}
//! #     fn reset(&mut self) {}
//! # }
//! # let engine = Engine;
//!
//! let mut i2c = Controller::new(engine, Config::default());
//! assert!(i2c.submit(Request::read(0x42u8.into()).with_stop()));
//! let response = loop {
//!     i2c.tick();
//!     if let Some(response) = i2c.poll() {
//!         break response;
//!     }
//! };
//! assert!(response.error.is_none());
//! ```

pub use embedded_hal::i2c::{AddressMode, SevenBitAddress, TenBitAddress};

mod controller;
mod engine;

pub use controller::Controller;
pub use engine::{ByteEngine, Command, Report};

/// An I2C target address in either addressing mode.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Address {
    /// Classic 7-bit address, sent as a single byte.
    Seven(u8),
    /// 10-bit address, sent as a reserved-prefix byte pair.
    Ten(u16),
}

impl From<SevenBitAddress> for Address {
    fn from(value: SevenBitAddress) -> Self {
        Self::Seven(value)
    }
}

impl From<TenBitAddress> for Address {
    fn from(value: TenBitAddress) -> Self {
        Self::Ten(value)
    }
}

/// Transfer direction of a transaction, as seen from the bus master.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Direction {
    /// The master receives bytes from the target.
    Read,
    /// The master transmits bytes to the target.
    Write,
}

impl Direction {
    /// The R/W bit as it appears in the address byte.
    pub const fn bit(self) -> u8 {
        match self {
            Self::Read => 1,
            Self::Write => 0,
        }
    }
}

/// One byte-granular request to the [`Controller`].
///
/// The underlying protocol is byte oriented, so a multi-byte transaction is
/// a sequence of requests: the address phase runs once, on the first byte,
/// and every following request with the data-phase direction re-enters the
/// data phase directly. `continues` tells the controller whether another
/// byte follows (which decides the acknowledge bit driven on reads), and
/// `stop` releases the bus after the final byte.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Request {
    /// Target address; also selects the addressing mode.
    pub address: Address,
    /// Transfer direction.
    pub direction: Direction,
    /// Another byte of this transaction follows this one.
    pub continues: bool,
    /// Release the bus with a STOP condition after the final byte. Without
    /// it the bus stays held and the next transaction begins with a
    /// repeated START.
    pub stop: bool,
    /// The byte to transmit for a write. A write request without one sends
    /// zero, mirroring an empty transmit register.
    pub data: Option<u8>,
    /// Claim the bus instead of transferring data: run the address phase,
    /// report [`Response::bus_claimed`] and keep the bus held so following
    /// transactions cannot be interleaved by another master.
    pub claim: bool,
}

impl Request {
    /// A single-byte read with no continuation and no STOP.
    pub const fn read(address: Address) -> Self {
        Self {
            address,
            direction: Direction::Read,
            continues: false,
            stop: false,
            data: None,
            claim: false,
        }
    }

    /// A single-byte write with no continuation and no STOP.
    pub const fn write(address: Address, data: u8) -> Self {
        Self {
            address,
            direction: Direction::Write,
            continues: false,
            stop: false,
            data: Some(data),
            claim: false,
        }
    }

    /// A bus claim: address phase only, bus left held.
    pub const fn claim(address: Address, direction: Direction) -> Self {
        Self {
            address,
            direction,
            continues: false,
            stop: false,
            data: None,
            claim: true,
        }
    }

    /// Mark that another byte of the same transaction follows.
    pub const fn continued(mut self) -> Self {
        self.continues = true;
        self
    }

    /// Request a STOP condition after the final byte.
    pub const fn with_stop(mut self) -> Self {
        self.stop = true;
        self
    }
}

/// Outcome of a request, pulsed by the [`Controller`].
///
/// A response is produced once per request that reaches a terminal decision
/// and must be taken with [`Controller::poll`] before the next tick;
/// unsampled responses are dropped, not queued.
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
pub struct Response {
    /// The byte captured by a read request.
    pub data: Option<u8>,
    /// The target acknowledged a written data byte.
    pub write_acked: bool,
    /// A claim request completed its address phase; the bus is held.
    pub bus_claimed: bool,
    /// The request failed. The controller is already back in its idle state
    /// and will accept a new request.
    pub error: Option<Error>,
}

impl Response {
    /// A successful read carrying the captured byte.
    pub const fn read(data: u8) -> Self {
        Self {
            data: Some(data),
            write_acked: false,
            bus_claimed: false,
            error: None,
        }
    }

    /// A successful, acknowledged write.
    pub const fn write_acked() -> Self {
        Self {
            data: None,
            write_acked: true,
            bus_claimed: false,
            error: None,
        }
    }

    /// A successful bus claim.
    pub const fn claimed() -> Self {
        Self {
            data: None,
            write_acked: false,
            bus_claimed: true,
            error: None,
        }
    }

    /// A failed request.
    pub const fn failed(error: Error) -> Self {
        Self {
            data: None,
            write_acked: false,
            bus_claimed: false,
            error: Some(error),
        }
    }
}

/// Ways a transaction can fail.
///
/// None of these are fatal to the controller: it resolves each one by
/// returning to idle, and retry policy is left to the client.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Error {
    /// No target acknowledged the address phase.
    AddressNack,
    /// The addressed target rejected a data byte of a write.
    WriteNack,
    /// Bus ownership was lost to another master; the transaction was
    /// abandoned mid-flight.
    ArbitrationLost,
    /// The byte engine failed to complete a command within the configured
    /// bound. The engine has been soft-reset.
    Timeout,
}

impl embedded_hal::i2c::Error for Error {
    fn kind(&self) -> embedded_hal::i2c::ErrorKind {
        use embedded_hal::i2c::{ErrorKind, NoAcknowledgeSource};
        match self {
            Self::AddressNack => ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address),
            Self::WriteNack => ErrorKind::NoAcknowledge(NoAcknowledgeSource::Data),
            Self::ArbitrationLost => ErrorKind::ArbitrationLoss,
            Self::Timeout => ErrorKind::Bus,
        }
    }
}

/// Static controller configuration, fixed at construction.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Config {
    /// Number of ticks the controller waits on an engine acknowledgement
    /// before declaring [`Error::Timeout`] and soft-resetting the engine.
    pub timeout_ticks: u32,
    /// Default addressing mode used by [`Config::address`].
    pub ten_bit: bool,
    /// The output-enable line of the bus driver is active low. Pure
    /// configuration pass-through; the state machine never looks at it.
    pub invert_enable: bool,
    /// Enable the engine's dynamic glitch filter. Forwarded to the engine
    /// once at construction.
    pub dynamic_filter: bool,
}

impl Config {
    /// Wrap a raw address in the configured default addressing mode.
    pub const fn address(&self, raw: u16) -> Address {
        if self.ten_bit {
            Address::Ten(raw)
        } else {
            Address::Seven(raw as u8)
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timeout_ticks: 1024,
            ten_bit: false,
            invert_enable: false,
            dynamic_filter: false,
        }
    }
}

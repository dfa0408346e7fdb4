#![warn(missing_docs)]

//! Deterministic simulation of a byte engine with an attached target.
//!
//! This crate provides a [`SimEngine`] implementing the
//! [`ByteEngine`](i2c_master::ByteEngine) boundary, so a
//! [`Controller`](i2c_master::Controller) can be exercised without hardware.
//! The engine is tick-exact: commands complete a fixed number of ticks after
//! they are latched, and faults (lost arbitration, a wedged bus) fire on the
//! tick they were scheduled for. The [`SimTarget`] on the far end decodes
//! the address bytes itself and records the bus traffic it sees, so tests
//! can assert on the exact wire behaviour.
//!
//! # Example
//! ```rust
//! use i2c_master::{Address, Request};
//! use simulator::{SimTarget, simulator};
//!
//! let target = SimTarget::new(Address::Seven(0x42)).with_read_data(&[0xc0]);
//! let mut i2c = simulator(target);
//!
//! assert!(i2c.submit(Request::read(Address::Seven(0x42)).with_stop()));
//! let response = loop {
//!     i2c.tick();
//!     if let Some(response) = i2c.poll() {
//!         break response;
//!     }
//! };
//! assert_eq!(response.data, Some(0xc0));
//! ```

use i2c_master::{Config, Controller};

mod engine;
mod target;

pub use engine::SimEngine;
pub use target::SimTarget;

/// Create a controller driving a simulated bus with the given target,
/// using the default configuration.
pub fn simulator(target: SimTarget) -> Controller<SimEngine> {
    Controller::new(SimEngine::new(target), Config::default())
}

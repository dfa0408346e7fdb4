#![no_std]
#![warn(missing_docs)]

//! Blocking `embedded-hal` bus on top of the transaction controller.
//!
//! [`BlockingI2c`] wraps a [`Controller`] and drives its tick loop until
//! each byte resolves, exposing the standard
//! [`embedded_hal::i2c::I2c`] trait. Buffer-level operations are cut into
//! the controller's byte-granular requests: one address phase per segment
//! of same-direction operations, continuation bytes in between, and a
//! single STOP on the very last byte of the transaction.
//!
//! Zero-length operations become bus claims (an address-phase probe). A
//! transaction *ending* in one leaves the bus held instead of issuing a
//! STOP; the controller has no standalone STOP, a release always rides on
//! a data byte.

use embedded_hal::i2c::{AddressMode, ErrorType, I2c, Operation};
use i2c_master::{Address, ByteEngine, Controller, Direction, Error, Request, Response};

/// Blocking I2C bus adapter around a [`Controller`].
pub struct BlockingI2c<E> {
    controller: Controller<E>,
    budget: u32,
}

impl<E: ByteEngine> BlockingI2c<E> {
    /// Wrap a controller. The per-byte tick budget is derived from the
    /// controller's own timeout so the loop can never outlast it.
    pub fn new(controller: Controller<E>) -> Self {
        let budget = controller
            .config()
            .timeout_ticks
            .saturating_mul(4)
            .max(64);
        Self { controller, budget }
    }

    /// Read-only view of the wrapped controller.
    pub fn controller(&self) -> &Controller<E> {
        &self.controller
    }

    /// Tear the adapter down into its controller.
    pub fn into_controller(self) -> Controller<E> {
        self.controller
    }

    /// Run a single request to its response, ticking the controller.
    fn run(&mut self, request: Request) -> Result<Response, Error> {
        let accepted = self.controller.submit(request);
        debug_assert!(accepted, "controller busy with a previous transaction");

        for _ in 0..self.budget {
            self.controller.tick();
            if let Some(response) = self.controller.poll() {
                return match response.error {
                    Some(error) => Err(error),
                    None => Ok(response),
                };
            }
        }
        // The controller's own timeout fires well inside the budget; this
        // is only reachable if the request was never accepted.
        Err(Error::Timeout)
    }

    /// Address the target without moving data, holding the bus.
    fn probe(&mut self, address: Address, direction: Direction) -> Result<(), Error> {
        self.run(Request::claim(address, direction)).map(drop)
    }

    fn read_segment(
        &mut self,
        address: Address,
        buffer: &mut [u8],
        merges_next: bool,
        stop: bool,
    ) -> Result<(), Error> {
        let final_index = buffer.len() - 1;
        for (index, slot) in buffer.iter_mut().enumerate() {
            let mut request = Request::read(address);
            if index < final_index || merges_next {
                request = request.continued();
            } else if stop {
                request = request.with_stop();
            }
            *slot = self.run(request)?.data.unwrap_or(0xff);
        }
        Ok(())
    }

    fn write_segment(
        &mut self,
        address: Address,
        bytes: &[u8],
        merges_next: bool,
        stop: bool,
    ) -> Result<(), Error> {
        let final_index = bytes.len() - 1;
        for (index, byte) in bytes.iter().enumerate() {
            let mut request = Request::write(address, *byte);
            if index < final_index || merges_next {
                request = request.continued();
            } else if stop {
                request = request.with_stop();
            }
            self.run(request)?;
        }
        Ok(())
    }
}

impl<E: ByteEngine> ErrorType for BlockingI2c<E> {
    type Error = Error;
}

impl<E, A> I2c<A> for BlockingI2c<E>
where
    E: ByteEngine,
    A: AddressMode + Into<Address>,
{
    fn transaction(
        &mut self,
        address: A,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        let address: Address = address.into();
        let count = operations.len();

        for index in 0..count {
            let last_op = index + 1 == count;
            // Adjacent non-empty operations of the same kind share one
            // data phase, with no repeated start in between.
            let merges_next = !last_op && merges(&operations[index], &operations[index + 1]);

            match &mut operations[index] {
                Operation::Read(buffer) if buffer.is_empty() => {
                    self.probe(address, Direction::Read)?;
                }
                Operation::Write(bytes) if bytes.is_empty() => {
                    self.probe(address, Direction::Write)?;
                }
                Operation::Read(buffer) => {
                    self.read_segment(address, buffer, merges_next, last_op)?;
                }
                Operation::Write(bytes) => {
                    self.write_segment(address, bytes, merges_next, last_op)?;
                }
            }
        }
        Ok(())
    }
}

/// Whether two adjacent operations continue the same data phase.
fn merges(current: &Operation<'_>, next: &Operation<'_>) -> bool {
    match (current, next) {
        (Operation::Read(_), Operation::Read(next)) => !next.is_empty(),
        (Operation::Write(_), Operation::Write(next)) => !next.is_empty(),
        _ => false,
    }
}

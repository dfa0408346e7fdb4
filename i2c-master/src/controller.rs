//! The transaction controller state machine.

use crate::engine::{ByteEngine, Command};
use crate::{Address, Config, Direction, Error, Request, Response};
use log::{debug, trace, warn};

/// Controller state. Exactly one is active; it persists across ticks until
/// a transition condition is met.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
enum State {
    /// Waiting for a client request.
    Idle,
    /// Issue the next address byte to the engine.
    SendAddress,
    /// Waiting for the engine to finish the address byte.
    AwaitAddressAck,
    /// Issue a read command for one data byte.
    ReadByte,
    /// Waiting for the engine to deliver the read byte.
    AwaitReadData,
    /// Issue a write command for one data byte.
    WriteByte,
    /// Waiting for the engine to finish the written byte.
    AwaitWriteAck,
}

impl State {
    /// States in which the controller is waiting on the engine and the
    /// timeout counter runs.
    const fn waiting(self) -> bool {
        matches!(
            self,
            Self::AwaitAddressAck | Self::AwaitReadData | Self::AwaitWriteAck
        )
    }
}

/// Transaction-level I2C bus master.
///
/// The controller is a perpetual server loop: it accepts one byte-granular
/// [`Request`] at a time, drives its [`ByteEngine`] through the matching
/// command sequence and pulses one [`Response`] per request. It is evaluated
/// synchronously, once per call to [`tick`](Controller::tick); there is no
/// blocking anywhere, absence of progress is only visible as the timeout
/// counter advancing.
///
/// The engine is owned by value, so no other component can issue commands
/// to it, and the state machine never has more than one command in flight
/// (no state issues two).
pub struct Controller<E> {
    engine: E,
    config: Config,
    state: State,
    request: Option<Request>,
    response: Option<Response>,
    timer: u32,
    /// The high half of a 10-bit address was acknowledged and the low half
    /// is still owed. Cleared once the full address is through, so a later
    /// address phase starts from the high half again.
    low_half_pending: bool,
    /// An open data phase: the address phase completed and following
    /// requests of this direction go straight to the data states without
    /// re-addressing. Cleared on the final byte and on any error.
    transfer: Option<Direction>,
}

impl<E: ByteEngine> Controller<E> {
    /// Create a controller around its exclusively-owned byte engine.
    pub fn new(mut engine: E, config: Config) -> Self {
        engine.set_filter(config.dynamic_filter);
        Self {
            engine,
            config,
            state: State::Idle,
            request: None,
            response: None,
            timer: 0,
            low_half_pending: false,
            transfer: None,
        }
    }

    /// Submit the next byte-granular request.
    ///
    /// Accepted only while the controller is idle, the previous request has
    /// been consumed and its response taken with [`poll`](Controller::poll).
    /// Returns whether the request was accepted; a rejected request is
    /// dropped, not queued.
    pub fn submit(&mut self, request: Request) -> bool {
        if self.state != State::Idle || self.request.is_some() || self.response.is_some() {
            return false;
        }
        debug!("accepted request {request:?}");
        self.request = Some(request);
        true
    }

    /// Take the pulsed response of the most recent request.
    ///
    /// A response stays available until the next [`tick`](Controller::tick),
    /// then it is lost. Fire and forget, not a queue.
    pub fn poll(&mut self) -> Option<Response> {
        self.response.take()
    }

    /// The controller is idle with nothing queued and nothing unsampled.
    pub fn is_idle(&self) -> bool {
        self.state == State::Idle && self.request.is_none() && self.response.is_none()
    }

    /// A transaction is open on the bus: the address phase has completed
    /// and the final byte has not gone out yet.
    pub fn transaction_open(&self) -> bool {
        self.transfer.is_some()
    }

    /// Read-only view of the engine, for inspection. All commands flow
    /// through the controller.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// The configuration the controller was built with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Tear the controller down into its engine.
    pub fn into_engine(self) -> E {
        self.engine
    }

    /// Full synchronous reset: controller back to its initial state, engine
    /// soft-reset. Also the recovery path if state is ever lost; recovery
    /// is total and reports no error.
    pub fn reset(&mut self) {
        self.state = State::Idle;
        self.request = None;
        self.response = None;
        self.timer = 0;
        self.low_half_pending = false;
        self.transfer = None;
        self.engine.reset();
    }

    /// Evaluate one tick.
    ///
    /// Samples the engine, computes the complete next state, then applies
    /// the global guards (arbitration loss and timeout) to the computed
    /// transition instead of folding them into every state arm.
    pub fn tick(&mut self) {
        // A response not polled before this tick is lost.
        self.response = None;

        let report = self.engine.poll();
        let mut next = self.state;

        match self.state {
            State::Idle => {
                if self.request.is_some() {
                    next = match self.transfer {
                        Some(Direction::Read) => State::ReadByte,
                        Some(Direction::Write) => State::WriteByte,
                        None => State::SendAddress,
                    };
                }
            }
            State::SendAddress => match self.request {
                Some(request) => {
                    // The high half (or a 7-bit address) gets the START; the
                    // low half of a 10-bit address follows as a plain byte.
                    let first = !self.low_half_pending;
                    let byte = address_byte(request.address, request.direction, first);
                    self.engine.execute(Command::write(byte, first));
                    next = State::AwaitAddressAck;
                }
                None => next = State::Idle,
            },
            State::AwaitAddressAck => {
                self.timer += 1;
                if report.done {
                    next = self.address_acked(report.target_ack);
                }
            }
            State::ReadByte => match self.request {
                Some(request) => {
                    let last = !request.continues;
                    self.engine
                        .execute(Command::read(last, last && request.stop));
                    next = State::AwaitReadData;
                }
                None => next = State::Idle,
            },
            State::AwaitReadData => {
                self.timer += 1;
                if report.done {
                    match self.request.take() {
                        Some(request) => {
                            if !request.continues {
                                self.transfer = None;
                            }
                            self.respond(Response::read(report.data));
                        }
                        None => warn!("read completed without a request, dropping byte"),
                    }
                    next = State::Idle;
                }
            }
            State::WriteByte => match self.request {
                Some(request) => {
                    let mut command = Command::write(request.data.unwrap_or(0), false);
                    if !request.continues && request.stop {
                        command = command.with_stop();
                    }
                    self.engine.execute(command);
                    next = State::AwaitWriteAck;
                }
                None => next = State::Idle,
            },
            State::AwaitWriteAck => {
                self.timer += 1;
                if report.done {
                    match self.request.take() {
                        Some(request) if report.target_ack => {
                            if !request.continues {
                                self.transfer = None;
                            }
                            self.respond(Response::write_acked());
                        }
                        Some(_) => self.fail(Error::WriteNack),
                        None => warn!("write completed without a request"),
                    }
                    next = State::Idle;
                }
            }
        }

        // Global guards, checked every tick regardless of state.
        // Arbitration loss overrides any pending transition on the same
        // tick; the timeout only fires when the primary transition made no
        // progress.
        if report.arbitration_lost {
            self.fail(Error::ArbitrationLost);
            next = State::Idle;
        } else if next == self.state
            && self.state.waiting()
            && self.timer >= self.config.timeout_ticks
        {
            self.engine.reset();
            self.fail(Error::Timeout);
            next = State::Idle;
        }

        if next != self.state {
            trace!("state {:?} -> {next:?}", self.state);
            self.state = next;
            self.timer = 0;
        }
    }

    /// Outcome of a finished address byte.
    fn address_acked(&mut self, acked: bool) -> State {
        let Some(request) = self.request else {
            return State::Idle;
        };

        if !acked {
            self.fail(Error::AddressNack);
            return State::Idle;
        }

        if matches!(request.address, Address::Ten(_)) && !self.low_half_pending {
            // High half acknowledged, low half still owed.
            self.low_half_pending = true;
            return State::SendAddress;
        }
        self.low_half_pending = false;

        if request.claim {
            // Address phase only: report the held bus and go back to idle
            // without touching the data states. No STOP, so nothing can
            // interleave before the client's next request.
            self.request = None;
            self.respond(Response::claimed());
            return State::Idle;
        }

        self.transfer = Some(request.direction);
        match request.direction {
            Direction::Read => State::ReadByte,
            Direction::Write => State::WriteByte,
        }
    }

    fn respond(&mut self, response: Response) {
        debug!("response {response:?}");
        self.response = Some(response);
    }

    /// Abandon the current transaction and surface `error` once. Leaves the
    /// controller servable for the next request.
    fn fail(&mut self, error: Error) {
        warn!("transaction failed: {error:?}");
        self.request = None;
        self.transfer = None;
        self.low_half_pending = false;
        self.respond(Response::failed(error));
    }

    #[cfg(test)]
    fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }
}

/// Encode one address byte. 7-bit addresses take a single byte; 10-bit
/// addresses take a reserved `11110xx` prefix byte carrying the two high
/// bits and the direction, followed by the low eight bits.
const fn address_byte(address: Address, direction: Direction, first: bool) -> u8 {
    match address {
        Address::Seven(a) => ((a & 0x7f) << 1) | direction.bit(),
        Address::Ten(a) => {
            if first {
                0b1111_0000 | (((a >> 8) as u8 & 0b11) << 1) | direction.bit()
            } else {
                a as u8
            }
        }
    }
}

//! The boundary between the transaction controller and the byte engine.
//!
//! The byte engine is the block that owns the physical bus: it generates
//! START/STOP conditions, shifts bytes in and out, samples acknowledge bits
//! and detects loss of arbitration. The controller never touches the wire;
//! it latches one [`Command`] at a time and watches the engine's [`Report`]
//! signals, one sample per tick.

/// One command bundle for the byte engine.
///
/// Each flag is consumed as a one-cycle strobe. The controller guarantees at
/// most one command is in flight: a new command is only latched after the
/// previous one reported [`Report::done`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Command {
    /// Generate a (repeated) START condition before the byte.
    pub start: bool,
    /// Generate a STOP condition once the byte and its acknowledge slot are
    /// done, releasing the bus.
    pub stop: bool,
    /// Clock one byte in from the bus.
    pub read: bool,
    /// Clock `data` out onto the bus.
    pub write: bool,
    /// The acknowledge bit to drive after a received byte: `false` pulls the
    /// line low (ACK, more bytes wanted), `true` leaves it high (NACK, final
    /// byte). Only meaningful together with `read`.
    pub nack: bool,
    /// The byte to transmit when `write` is set.
    pub data: u8,
}

impl Command {
    /// Transmit a byte, optionally preceded by a START condition.
    pub const fn write(data: u8, start: bool) -> Self {
        Self {
            start,
            write: true,
            data,
            stop: false,
            read: false,
            nack: false,
        }
    }

    /// Receive a byte, answering with the given acknowledge bit and
    /// optionally ending in a STOP condition.
    pub const fn read(nack: bool, stop: bool) -> Self {
        Self {
            read: true,
            nack,
            stop,
            start: false,
            write: false,
            data: 0,
        }
    }

    /// Attach a STOP condition to this command.
    pub const fn with_stop(mut self) -> Self {
        self.stop = true;
        self
    }
}

/// Output signals of the byte engine, sampled once per tick.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Report {
    /// The in-flight command completed this tick. Pulsed for one tick.
    pub done: bool,
    /// The acknowledge bit sampled from the target: `true` means the target
    /// pulled the line low (acknowledged). Valid together with `done` after
    /// an address or data write.
    pub target_ack: bool,
    /// The engine lost bus arbitration. The transaction is already dead on
    /// the wire when this is reported.
    pub arbitration_lost: bool,
    /// The byte sampled from the bus. Valid together with `done` after a
    /// read.
    pub data: u8,
    /// A command is in flight.
    pub busy: bool,
}

/// A byte-level bus engine driven by the transaction controller.
///
/// The controller owns its engine by value, which makes the single-owner
/// requirement structural: nothing else can slip a command in between the
/// controller's own, so the engine needs no arbitration of its own.
///
/// Implementations advance their internal model by one tick on every
/// [`poll`](ByteEngine::poll) call and report their output signals for that
/// tick. [`execute`](ByteEngine::execute) latches a command to be carried
/// out over the following ticks.
pub trait ByteEngine {
    /// Advance one tick and sample the engine's output signals.
    fn poll(&mut self) -> Report;

    /// Latch a command. Only called when no command is in flight.
    fn execute(&mut self, command: Command);

    /// One-cycle soft reset: abandon the in-flight command and return the
    /// engine to a state where it accepts commands again. Issued by the
    /// controller only on timeout recovery.
    fn reset(&mut self);

    /// Enable or disable the engine's dynamic glitch filter. Pure
    /// pass-through; engines without a filter can keep the default no-op.
    fn set_filter(&mut self, enabled: bool) {
        let _ = enabled;
    }
}

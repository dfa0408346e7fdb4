//! Deterministic byte-engine implementation backing the simulator.

use crate::SimTarget;
use i2c_master::{ByteEngine, Command, Report};
use log::trace;

/// Simulated byte engine.
///
/// Commands complete a fixed number of ticks after they are latched, which
/// makes every run fully deterministic: a test that counts ticks gets the
/// same answer every time. Wire-level behaviour (acknowledgement, served
/// bytes) is decided by the attached [`SimTarget`]; the engine itself only
/// models command pacing and the failure modes a real engine can exhibit:
/// losing arbitration and wedging until soft-reset.
pub struct SimEngine {
    target: SimTarget,
    latency: u32,
    in_flight: Option<(Command, u32)>,
    tick: u64,
    lose_arbitration_at: Option<u64>,
    wedge_after: Option<u64>,
    resets: u32,
    filter: bool,
}

impl SimEngine {
    /// An engine completing every command on the tick after it was latched.
    pub fn new(target: SimTarget) -> Self {
        Self {
            target,
            latency: 1,
            in_flight: None,
            tick: 0,
            lose_arbitration_at: None,
            wedge_after: None,
            resets: 0,
            filter: false,
        }
    }

    /// Commands take `ticks` ticks to complete (minimum one).
    pub fn with_latency(mut self, ticks: u32) -> Self {
        self.latency = ticks.max(1);
        self
    }

    /// Report loss of arbitration on the given absolute tick, abandoning
    /// whatever command is in flight.
    pub fn lose_arbitration_at(mut self, tick: u64) -> Self {
        self.lose_arbitration_at = Some(tick);
        self
    }

    /// Stop making progress after the given absolute tick, as a stuck bus
    /// would. Only a soft reset clears the condition.
    pub fn wedge_after(mut self, tick: u64) -> Self {
        self.wedge_after = Some(tick);
        self
    }

    /// Number of soft resets the engine has received.
    pub fn resets(&self) -> u32 {
        self.resets
    }

    /// Ticks elapsed.
    pub fn ticks(&self) -> u64 {
        self.tick
    }

    /// Whether the dynamic glitch filter was switched on.
    pub fn filter_enabled(&self) -> bool {
        self.filter
    }

    /// The attached target and its recorded bus history.
    pub fn target(&self) -> &SimTarget {
        &self.target
    }

    fn wedged(&self) -> bool {
        self.wedge_after.is_some_and(|after| self.tick > after)
    }

    /// Carry a completed command out against the target.
    fn complete(&mut self, command: Command) -> Report {
        let mut report = Report {
            done: true,
            ..Report::default()
        };

        if command.start {
            self.target.start();
        }
        if command.write {
            report.target_ack = self.target.write_byte(command.data, command.start);
        }
        if command.read {
            report.data = self.target.read_byte(!command.nack);
        }
        if command.stop {
            self.target.stop();
        }

        trace!("engine: completed {command:?} -> {report:?}");
        report
    }
}

impl ByteEngine for SimEngine {
    fn poll(&mut self) -> Report {
        self.tick += 1;

        if self.lose_arbitration_at == Some(self.tick) {
            self.lose_arbitration_at = None;
            self.in_flight = None;
            trace!("engine: arbitration lost at tick {}", self.tick);
            return Report {
                arbitration_lost: true,
                ..Report::default()
            };
        }

        let Some((command, remaining)) = self.in_flight else {
            return Report::default();
        };

        if self.wedged() {
            // No progress; the countdown is frozen.
            return Report {
                busy: true,
                ..Report::default()
            };
        }

        if remaining > 1 {
            self.in_flight = Some((command, remaining - 1));
            return Report {
                busy: true,
                ..Report::default()
            };
        }

        self.in_flight = None;
        self.complete(command)
    }

    fn execute(&mut self, command: Command) {
        assert!(
            self.in_flight.is_none(),
            "command latched while another is in flight"
        );
        trace!("engine: latched {command:?}");
        self.in_flight = Some((command, self.latency));
    }

    fn reset(&mut self) {
        trace!("engine: soft reset");
        self.resets += 1;
        self.in_flight = None;
        self.wedge_after = None;
    }

    fn set_filter(&mut self, enabled: bool) {
        self.filter = enabled;
    }
}

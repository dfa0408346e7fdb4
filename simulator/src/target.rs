//! The simulated target device on the far end of the bus.

use i2c_master::{Address, Direction};
use log::trace;
use std::collections::VecDeque;

/// Byte served on reads when the device has nothing left to say: an
/// undriven line reads as all ones.
const OVERRUN: u8 = 0xff;

/// How the target produces and consumes data bytes.
enum Behavior {
    /// Serve reads from a queue, record writes.
    Script { read_data: VecDeque<u8> },
    /// A tiny I2C RAM: the first written byte after selection sets the
    /// cursor, further writes store at the cursor, reads serve from it.
    Ram {
        memory: Vec<u8>,
        cursor: usize,
        cursor_pending: bool,
    },
}

/// A simulated I2C target.
///
/// The target decodes the wire-level bytes produced by the controller
/// independently: it recognises 7-bit address bytes and the two-byte 10-bit
/// prefix form, decides acknowledgement itself, and records everything it
/// observes so tests can assert on the exact bus traffic.
pub struct SimTarget {
    address: Address,
    behavior: Behavior,
    /// Direction the device is currently selected for, if any.
    selected: Option<Direction>,
    /// A matching 10-bit prefix byte was received; the low address byte is
    /// expected next.
    pending_ten_bit: Option<Direction>,
    /// Data bytes the target refuses once this many have been accepted.
    write_limit: Option<usize>,
    accepted_writes: usize,

    /// Every data byte the target accepted.
    pub written: Vec<u8>,
    /// Every address-phase byte observed, in wire order.
    pub address_bytes: Vec<u8>,
    /// The acknowledge bit received after each byte served to a read:
    /// `true` means the master acknowledged and wants more.
    pub read_acks: Vec<bool>,
    /// Number of START conditions observed.
    pub starts: u32,
    /// Number of STOP conditions observed.
    pub stops: u32,
}

impl SimTarget {
    /// A scripted target: answers reads from `read_data`, records writes.
    pub fn new(address: Address) -> Self {
        Self {
            address,
            behavior: Behavior::Script {
                read_data: VecDeque::new(),
            },
            selected: None,
            pending_ten_bit: None,
            write_limit: None,
            accepted_writes: 0,
            written: Vec::new(),
            address_bytes: Vec::new(),
            read_acks: Vec::new(),
            starts: 0,
            stops: 0,
        }
    }

    /// A RAM target with `size` bytes of zeroed memory (at most 256, a
    /// one-byte cursor).
    pub fn ram(address: Address, size: usize) -> Self {
        Self {
            behavior: Behavior::Ram {
                memory: vec![0; size.min(256)],
                cursor: 0,
                cursor_pending: false,
            },
            ..Self::new(address)
        }
    }

    /// Queue bytes for the target to serve on reads (scripted mode only).
    pub fn with_read_data(mut self, bytes: &[u8]) -> Self {
        if let Behavior::Script { read_data } = &mut self.behavior {
            read_data.extend(bytes);
        }
        self
    }

    /// Refuse data bytes once `accepted` of them have been acknowledged.
    pub fn nack_writes_after(mut self, accepted: usize) -> Self {
        self.write_limit = Some(accepted);
        self
    }

    pub(crate) fn start(&mut self) {
        self.starts += 1;
        // A (repeated) START abandons a half-received 10-bit address.
        self.pending_ten_bit = None;
        trace!("target: START");
    }

    pub(crate) fn stop(&mut self) {
        self.stops += 1;
        self.selected = None;
        self.pending_ten_bit = None;
        if let Behavior::Ram { cursor_pending, .. } = &mut self.behavior {
            *cursor_pending = false;
        }
        trace!("target: STOP");
    }

    /// One byte written by the master. Returns the acknowledge decision.
    pub(crate) fn write_byte(&mut self, byte: u8, address_phase: bool) -> bool {
        if address_phase {
            return self.address_high(byte);
        }
        if let Some(direction) = self.pending_ten_bit.take() {
            return self.address_low(byte, direction);
        }
        self.data_byte(byte)
    }

    /// One byte read by the master; `ack` is the acknowledge bit it drove
    /// back (`true` = more bytes wanted).
    pub(crate) fn read_byte(&mut self, ack: bool) -> u8 {
        let byte = if self.selected == Some(Direction::Read) {
            match &mut self.behavior {
                Behavior::Script { read_data } => read_data.pop_front().unwrap_or(OVERRUN),
                Behavior::Ram { memory, cursor, .. } => {
                    if memory.is_empty() {
                        OVERRUN
                    } else {
                        let byte = memory[*cursor];
                        *cursor = (*cursor + 1) % memory.len();
                        byte
                    }
                }
            }
        } else {
            OVERRUN
        };
        self.read_acks.push(ack);
        trace!("target: served {byte:#04x}, master ack {ack}");
        byte
    }

    /// Address byte following a START: either a 7-bit address or the high
    /// half of a 10-bit one.
    fn address_high(&mut self, byte: u8) -> bool {
        self.address_bytes.push(byte);
        self.selected = None;
        let direction = if byte & 1 == 1 {
            Direction::Read
        } else {
            Direction::Write
        };

        if byte & 0b1111_1000 == 0b1111_0000 {
            let high = u16::from(byte >> 1) & 0b11;
            return match self.address {
                Address::Ten(a) if a >> 8 == high => {
                    self.pending_ten_bit = Some(direction);
                    true
                }
                _ => false,
            };
        }

        match self.address {
            Address::Seven(a) if byte >> 1 == a => {
                self.select(direction);
                true
            }
            _ => false,
        }
    }

    /// Low half of a 10-bit address, after a matching prefix byte.
    fn address_low(&mut self, byte: u8, direction: Direction) -> bool {
        self.address_bytes.push(byte);
        match self.address {
            Address::Ten(a) if (a & 0xff) as u8 == byte => {
                self.select(direction);
                true
            }
            _ => false,
        }
    }

    fn select(&mut self, direction: Direction) {
        trace!("target: selected for {direction:?}");
        self.selected = Some(direction);
        if let Behavior::Ram { cursor_pending, .. } = &mut self.behavior {
            if direction == Direction::Write {
                *cursor_pending = true;
            }
        }
    }

    fn data_byte(&mut self, byte: u8) -> bool {
        if self.selected != Some(Direction::Write) {
            return false;
        }
        if self
            .write_limit
            .is_some_and(|limit| self.accepted_writes >= limit)
        {
            trace!("target: refusing data byte {byte:#04x}");
            return false;
        }
        self.accepted_writes += 1;
        self.written.push(byte);

        match &mut self.behavior {
            Behavior::Script { .. } => {}
            Behavior::Ram {
                memory,
                cursor,
                cursor_pending,
            } => {
                if *cursor_pending {
                    *cursor = usize::from(byte) % memory.len().max(1);
                    *cursor_pending = false;
                } else if !memory.is_empty() {
                    memory[*cursor] = byte;
                    *cursor = (*cursor + 1) % memory.len();
                }
            }
        }
        true
    }
}

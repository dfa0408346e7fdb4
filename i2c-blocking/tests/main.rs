use embedded_hal::i2c::{Error as _, ErrorKind, I2c, NoAcknowledgeSource, Operation};
use i2c_blocking::BlockingI2c;
use i2c_master::{Address, Config, Controller, Error};
use simulator::{SimEngine, SimTarget, simulator};

const A7: u8 = 0x42;
const ADDR: Address = Address::Seven(A7);

fn ram(size: usize) -> BlockingI2c<SimEngine> {
    let _ = env_logger::try_init();
    BlockingI2c::new(simulator(SimTarget::ram(ADDR, size)))
}

#[test]
fn ram_write_then_read_back() {
    let mut i2c = ram(16);

    // Cursor byte first, then the payload.
    i2c.write(A7, &[4, 0xde, 0xad, 0xbe, 0xef]).unwrap();

    let mut data = [0; 4];
    i2c.write_read(A7, &[4], &mut data).unwrap();
    assert_eq!(data, [0xde, 0xad, 0xbe, 0xef]);

    let target = i2c.controller().engine().target();
    // write, then write_read as write-segment + read-segment.
    assert_eq!(target.starts, 3);
    assert_eq!(target.stops, 2);
}

#[test]
fn multi_operation_transaction_merges_segments() {
    let mut i2c = ram(16);
    i2c.write(A7, &[0, 0xaa, 0xbb]).unwrap();

    let mut first = [0];
    let mut second = [0];
    i2c.transaction(
        A7,
        &mut [
            Operation::Write(&[0]),
            Operation::Read(&mut first),
            Operation::Read(&mut second),
        ],
    )
    .unwrap();
    assert_eq!(first, [0xaa]);
    assert_eq!(second, [0xbb]);

    let target = i2c.controller().engine().target();
    // The two reads share one data phase: address phases are the initial
    // write, the cursor write and one read segment.
    assert_eq!(target.starts, 3);
    assert_eq!(target.read_acks, [true, false]);
    assert_eq!(target.stops, 2);
}

#[test]
fn empty_write_probes_for_presence() {
    let mut present = ram(4);
    present.write(A7, &[]).unwrap();

    let mut absent = BlockingI2c::new(simulator(SimTarget::new(Address::Seven(0x13))));
    let err = absent.write(A7, &[]).unwrap_err();
    assert_eq!(err, Error::AddressNack);
}

#[test]
fn error_kinds_map_to_embedded_hal() {
    // Address phase rejection.
    let mut i2c = BlockingI2c::new(simulator(SimTarget::new(Address::Seven(0x13))));
    let err = i2c.read(A7, &mut [0]).unwrap_err();
    assert_eq!(
        err.kind(),
        ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address)
    );

    // Data byte rejection.
    let mut i2c = BlockingI2c::new(simulator(SimTarget::new(ADDR).nack_writes_after(1)));
    let err = i2c.write(A7, &[1, 2]).unwrap_err();
    assert_eq!(err, Error::WriteNack);
    assert_eq!(err.kind(), ErrorKind::NoAcknowledge(NoAcknowledgeSource::Data));

    // Arbitration loss, during the wait on the address byte.
    let engine = SimEngine::new(SimTarget::new(ADDR)).lose_arbitration_at(3);
    let mut i2c = BlockingI2c::new(Controller::new(engine, Config::default()));
    let err = i2c.write(A7, &[1]).unwrap_err();
    assert_eq!(err, Error::ArbitrationLost);
    assert_eq!(err.kind(), ErrorKind::ArbitrationLoss);

    // Engine timeout.
    let config = Config {
        timeout_ticks: 32,
        ..Config::default()
    };
    let engine = SimEngine::new(SimTarget::new(ADDR)).wedge_after(0);
    let mut i2c = BlockingI2c::new(Controller::new(engine, config));
    let err = i2c.read(A7, &mut [0]).unwrap_err();
    assert_eq!(err, Error::Timeout);
    assert_eq!(err.kind(), ErrorKind::Bus);
}

#[test]
fn failed_byte_aborts_the_rest_of_the_transaction() {
    let mut i2c = BlockingI2c::new(simulator(SimTarget::new(ADDR).nack_writes_after(1)));

    let mut data = [0];
    let err = i2c
        .transaction(
            A7,
            &mut [Operation::Write(&[1, 2, 3]), Operation::Read(&mut data)],
        )
        .unwrap_err();
    assert_eq!(err, Error::WriteNack);

    let target = i2c.controller().engine().target();
    assert_eq!(target.written, [1]);
    // The read segment never ran.
    assert!(target.read_acks.is_empty());
    // The adapter is reusable after the failure.
    assert!(i2c.controller().is_idle());
}

#[test]
fn ten_bit_addresses_work_through_the_trait() {
    let target = SimTarget::new(Address::Ten(0x2a5)).with_read_data(&[0x44]);
    let mut i2c = BlockingI2c::new(simulator(target));

    let mut data = [0];
    i2c.read(0x2a5u16, &mut data).unwrap();
    assert_eq!(data, [0x44]);
    assert_eq!(
        i2c.controller().engine().target().address_bytes,
        [0b1111_0101, 0xa5]
    );
}

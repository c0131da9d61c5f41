//! Unit tests for the I2C transport

use i2c_regmap::{I2cInterface, Transport};

use crate::common::{MockError, MockI2c, Operation};

const ADDR: u8 = 0x40;

#[test]
fn test_write_mem_sends_pointer_and_payload_in_one_write() {
    let bus = MockI2c::new();
    bus.add_memory_target(ADDR);
    let mut interface = I2cInterface::new(bus.clone());

    interface.write_mem(ADDR, 0x00, &[1, 2, 3, 4, 5, 6]).unwrap();

    assert_eq!(
        bus.operations(),
        vec![Operation::Write {
            address: ADDR,
            data: vec![0x00, 1, 2, 3, 4, 5, 6]
        }]
    );
    assert_eq!(bus.bytes(ADDR, 0x00, 6), vec![1, 2, 3, 4, 5, 6]);
}

#[test]
fn test_read_mem_sets_pointer_then_reads() {
    let bus = MockI2c::new();
    bus.add_memory_target(ADDR);
    bus.set_bytes(ADDR, 0x10, &[0xAA, 0xBB]);
    let mut interface = I2cInterface::new(bus.clone());

    let mut buf = [0u8; 2];
    interface.read_mem(ADDR, 0x10, &mut buf).unwrap();

    assert_eq!(buf, [0xAA, 0xBB]);
    assert_eq!(
        bus.operations(),
        vec![
            Operation::Write {
                address: ADDR,
                data: vec![0x10]
            },
            Operation::Read {
                address: ADDR,
                data: vec![0xAA, 0xBB]
            },
        ]
    );
}

#[test]
fn test_plain_transfers() {
    let bus = MockI2c::new();
    bus.add_port_target(ADDR);
    let mut interface = I2cInterface::new(bus.clone());

    interface.write(ADDR, &[0x5A]).unwrap();
    let mut buf = [0u8; 1];
    interface.read(ADDR, &mut buf).unwrap();

    assert_eq!(buf, [0x5A]);
}

#[test]
fn test_write_mem_to_absent_target() {
    let mut interface = I2cInterface::new(MockI2c::new());
    assert_eq!(
        interface.write_mem(ADDR, 0x00, &[1]),
        Err(MockError::NoAcknowledge)
    );
}

#[test]
fn test_forwarding_through_mutable_reference() {
    let bus = MockI2c::new();
    bus.add_memory_target(ADDR);
    let mut interface = I2cInterface::new(bus.clone());

    let mut borrowed = &mut interface;
    Transport::write_mem(&mut borrowed, ADDR, 0x03, &[0x77]).unwrap();

    assert_eq!(bus.byte(ADDR, 0x03), 0x77);
}

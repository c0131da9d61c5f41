//! Unit tests for multi-byte register encoding on the wire

use i2c_regmap::{ByteOrder, RegisterDef};

use crate::common::{create_device, Operation};

const ADDR: u8 = 0x50;

#[test]
fn test_big_endian_is_default() {
    let (mut device, bus) = create_device(ADDR);
    assert_eq!(device.byte_order(), ByteOrder::BigEndian);
    device
        .add_register(RegisterDef::new("WORD", 0x02).width(16))
        .unwrap();

    device.register("WORD").unwrap().write(0x1234).unwrap();
    assert_eq!(bus.data_writes_to(ADDR), vec![vec![0x02, 0x12, 0x34]]);
}

#[test]
fn test_little_endian_write() {
    let (device, bus) = create_device(ADDR);
    let mut device = device.with_byte_order(ByteOrder::LittleEndian);
    device
        .add_register(RegisterDef::new("WORD", 0x02).width(16))
        .unwrap();

    device.register("WORD").unwrap().write(0x1234).unwrap();
    assert_eq!(bus.data_writes_to(ADDR), vec![vec![0x02, 0x34, 0x12]]);
}

#[test]
fn test_little_endian_read() {
    let (device, bus) = create_device(ADDR);
    let mut device = device.with_byte_order(ByteOrder::LittleEndian);
    device
        .add_register(RegisterDef::new("WORD", 0x02).width(16))
        .unwrap();
    bus.set_bytes(ADDR, 0x02, &[0x34, 0x12]);

    assert_eq!(device.register("WORD").unwrap().read(), Ok(0x1234));
}

#[test]
fn test_read_transfers_register_width() {
    let (mut device, bus) = create_device(ADDR);
    device
        .add_register(RegisterDef::new("BYTE", 0x01))
        .unwrap();
    device
        .add_register(RegisterDef::new("WORD", 0x02).width(16))
        .unwrap();
    device
        .add_register(RegisterDef::new("DWORD", 0x04).width(32))
        .unwrap();
    bus.set_bytes(ADDR, 0x01, &[0xAA, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06]);

    assert_eq!(device.register("BYTE").unwrap().read(), Ok(0xAA));
    assert_eq!(device.register("WORD").unwrap().read(), Ok(0x0102));
    assert_eq!(device.register("DWORD").unwrap().read(), Ok(0x0304_0506));

    let reads: Vec<usize> = bus
        .operations()
        .into_iter()
        .filter_map(|op| match op {
            Operation::Read { data, .. } => Some(data.len()),
            Operation::Write { .. } => None,
        })
        .collect();
    assert_eq!(reads, vec![1, 2, 4]);
}

#[test]
fn test_narrow_register_is_masked_on_read() {
    let (mut device, bus) = create_device(ADDR);
    device
        .add_register(RegisterDef::new("NIBBLE", 0x08).width(4))
        .unwrap();
    bus.set_byte(ADDR, 0x08, 0xF5);

    assert_eq!(device.register("NIBBLE").unwrap().read(), Ok(0x5));
}

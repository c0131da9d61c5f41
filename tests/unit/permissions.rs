//! Unit tests for register and field permission enforcement

use i2c_regmap::{Access, Error, FieldDef, LayoutError, RegisterDef};

use crate::common::{create_device, Operation};

const ADDR: u8 = 0x40;

#[test]
fn test_read_of_write_only_register_is_refused() {
    let (mut device, bus) = create_device(ADDR);
    device
        .add_register(RegisterDef::new("CMD", 0x10).write_only())
        .unwrap();

    let result = device.register("CMD").unwrap().read();
    assert_eq!(
        result,
        Err(Error::Permission {
            target: "CMD",
            access: Access::Read
        })
    );
    assert_eq!(bus.operation_count(), 0, "No bus traffic on refusal");
}

#[test]
fn test_write_of_read_only_register_is_refused() {
    let (mut device, bus) = create_device(ADDR);
    device
        .add_register(RegisterDef::new("STATUS", 0x11).read_only())
        .unwrap();

    let result = device.register("STATUS").unwrap().write(0x01);
    assert_eq!(
        result,
        Err(Error::Permission {
            target: "STATUS",
            access: Access::Write
        })
    );
    assert_eq!(bus.operation_count(), 0, "No bus traffic on refusal");
}

#[test]
fn test_read_only_field_write_is_refused() {
    let (mut device, bus) = create_device(ADDR);
    device
        .add_register(RegisterDef::new("CTRL", 0x12))
        .unwrap()
        .add_field(FieldDef::new("READY", 7).read_only())
        .unwrap();

    let result = device.field("CTRL", "READY").unwrap().write(1);
    assert_eq!(
        result,
        Err(Error::Permission {
            target: "READY",
            access: Access::Write
        })
    );
    assert_eq!(bus.operation_count(), 0);
}

#[test]
fn test_write_only_field_read_is_refused() {
    let (mut device, bus) = create_device(ADDR);
    device
        .add_register(RegisterDef::new("CTRL", 0x12))
        .unwrap()
        .add_field(FieldDef::new("RESET", 0).write_only())
        .unwrap();

    let result = device.field("CTRL", "RESET").unwrap().read();
    assert_eq!(
        result,
        Err(Error::Permission {
            target: "RESET",
            access: Access::Read
        })
    );
    assert_eq!(bus.operation_count(), 0);
}

#[test]
fn test_write_only_field_is_written_without_verification() {
    let (mut device, bus) = create_device(ADDR);
    device
        .add_register(RegisterDef::new("CTRL", 0x12))
        .unwrap()
        .add_field(FieldDef::new("RESET", 0).write_only())
        .unwrap();
    bus.set_byte(ADDR, 0x12, 0b1000_0000);

    device.field("CTRL", "RESET").unwrap().write(1).unwrap();

    // Pointer write + read for the modify step, then the data write
    assert_eq!(
        bus.operations(),
        vec![
            Operation::Write {
                address: ADDR,
                data: vec![0x12]
            },
            Operation::Read {
                address: ADDR,
                data: vec![0b1000_0000]
            },
            Operation::Write {
                address: ADDR,
                data: vec![0x12, 0b1000_0001]
            },
        ]
    );
}

#[test]
fn test_partial_field_of_write_only_register_is_refused() {
    let (mut device, bus) = create_device(ADDR);
    device
        .add_register(RegisterDef::new("CMD", 0x10).write_only())
        .unwrap()
        .add_field(FieldDef::new("OPCODE", 0).width(4).write_only())
        .unwrap();

    let result = device.field("CMD", "OPCODE").unwrap().write(0x5);
    assert_eq!(
        result,
        Err(Error::Permission {
            target: "CMD",
            access: Access::Read
        })
    );
    assert_eq!(bus.operation_count(), 0);
}

#[test]
fn test_full_width_field_of_write_only_register() {
    let (mut device, bus) = create_device(ADDR);
    device
        .add_register(RegisterDef::new("CMD", 0x10).write_only())
        .unwrap()
        .add_field(FieldDef::new("OPCODE", 0).width(8).write_only())
        .unwrap();

    device.field("CMD", "OPCODE").unwrap().write(0xA5).unwrap();

    assert_eq!(bus.writes_to(ADDR), vec![vec![0x10, 0xA5]]);
    assert_eq!(bus.operation_count(), 1, "Nothing to read or verify");
}

#[test]
fn test_field_cannot_exceed_register_permission() {
    let (mut device, _bus) = create_device(ADDR);
    let register = device
        .add_register(RegisterDef::new("STATUS", 0x11).read_only())
        .unwrap();

    assert_eq!(
        register.add_field(FieldDef::new("FLAG", 0)).unwrap_err(),
        LayoutError::PermissionConflict {
            field: "FLAG",
            register: "STATUS"
        }
    );
    assert!(register.add_field(FieldDef::new("FLAG", 0).read_only()).is_ok());
}

#[test]
fn test_register_read_bypasses_permission() {
    let (mut device, bus) = create_device(ADDR);
    device
        .add_register(RegisterDef::new("CMD", 0x10).write_only())
        .unwrap();
    bus.set_byte(ADDR, 0x10, 0x42);

    assert_eq!(device.register_read("CMD"), Ok(0x42));
}

#[test]
fn test_register_write_bypasses_permission() {
    let (mut device, bus) = create_device(ADDR);
    device
        .add_register(RegisterDef::new("STATUS", 0x11).read_only())
        .unwrap();

    device.register_write("STATUS", 0x3C).unwrap();
    assert_eq!(bus.byte(ADDR, 0x11), 0x3C);
}

#![no_std]
#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

#[cfg(test)]
extern crate std;

pub mod device;
pub mod drivers;
pub mod field;
pub mod helpers;
pub mod interface;
pub mod permission;
pub mod register;

use core::fmt;

// Re-export main types
pub use device::{ByteOrder, Device};
pub use field::{Field, FieldDef, FieldHandle};
pub use interface::{I2cInterface, Transport};
pub use permission::{Access, Permission};
pub use register::{Register, RegisterDef, RegisterHandle};

pub use drivers::bq25756::Bq25756;
pub use drivers::hd44780::{Hd44780, LcdBus, LcdConfig, ParallelBus, Pcf8574Backpack};
pub use drivers::mcp9808::Mcp9808;

/// Largest register width supported by the framework, in bits
pub const MAX_REGISTER_WIDTH: u8 = 32;

/// Largest register width supported by the framework, in bytes
pub const MAX_REGISTER_BYTES: usize = (MAX_REGISTER_WIDTH / 8) as usize;

/// Number of registers a [`Device`] can hold
pub const MAX_REGISTERS: usize = 48;

/// Number of fields a [`Register`] can hold
pub const MAX_FIELDS: usize = 12;

/// Errors raised while building a register map
///
/// These are configuration mistakes in a driver's register table. They never
/// involve the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LayoutError {
    /// Bus address does not fit in 7 bits
    InvalidAddress(u8),
    /// A register or field with this name already exists in the same scope
    DuplicateName(&'static str),
    /// The device or register map is full; carries the rejected name
    CapacityExceeded(&'static str),
    /// Register width is not a power of two in `1..=32`, or a field width is zero
    InvalidWidth {
        /// Offending register or field
        name: &'static str,
        /// Requested width
        width_bits: u8,
    },
    /// Field does not fit inside its register
    FieldOutOfBounds {
        /// Field name
        field: &'static str,
        /// Requested bit offset
        bit_offset: u8,
        /// Requested field width
        width_bits: u8,
        /// Width of the parent register
        register_width: u8,
    },
    /// Field claims an access the parent register does not grant
    PermissionConflict {
        /// Field name
        field: &'static str,
        /// Parent register name
        register: &'static str,
    },
}

/// Driver errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// Communication error reported by the transport
    Bus(E),
    /// No transport is attached to the device
    BusNotReady,
    /// Register map construction failed
    Layout(LayoutError),
    /// No register with this name on the device
    UnknownRegister(&'static str),
    /// No field with this name on the register
    UnknownField {
        /// Register that was searched
        register: &'static str,
        /// Field name that was not found
        field: &'static str,
    },
    /// Target lacks the requested access
    Permission {
        /// Register or field name
        target: &'static str,
        /// Access that was refused
        access: Access,
    },
    /// Value does not fit in the target's bit width
    ValueTooLarge {
        /// Rejected value
        value: u32,
        /// Width of the target in bits
        width_bits: u8,
    },
    /// Readback after a write did not match the written value
    ///
    /// The write reached the bus and may have been partially applied.
    /// Clear-on-read status registers are a known source of false positives.
    WriteVerification {
        /// Value that was written
        written: u32,
        /// Value that was read back
        read: u32,
    },
    /// Value is not representable in the expected integer type
    TypeMismatch {
        /// Rejected value
        value: i64,
    },
    /// Value is NaN or infinite
    NotFinite,
    /// Value lies outside an inclusive range
    Range {
        /// Rejected value
        value: i64,
        /// Inclusive minimum
        min: i64,
        /// Inclusive maximum
        max: i64,
    },
}

impl<E> From<LayoutError> for Error<E> {
    fn from(error: LayoutError) -> Self {
        Self::Layout(error)
    }
}

impl fmt::Display for LayoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidAddress(address) => {
                write!(f, "bus address 0x{address:02X} is not a 7-bit address")
            }
            Self::DuplicateName(name) => write!(f, "'{name}' is already defined"),
            Self::CapacityExceeded(name) => write!(f, "no room left for '{name}'"),
            Self::InvalidWidth { name, width_bits } => {
                write!(f, "'{name}' has invalid width {width_bits}")
            }
            Self::FieldOutOfBounds {
                field,
                bit_offset,
                width_bits,
                register_width,
            } => write!(
                f,
                "field '{field}' at bit {bit_offset} with width {width_bits} exceeds {register_width}-bit register"
            ),
            Self::PermissionConflict { field, register } => write!(
                f,
                "field '{field}' grants access its register '{register}' does not"
            ),
        }
    }
}

impl<E: fmt::Debug> fmt::Display for Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bus(error) => write!(f, "bus error: {error:?}"),
            Self::BusNotReady => f.write_str("no transport attached"),
            Self::Layout(error) => write!(f, "register map error: {error}"),
            Self::UnknownRegister(name) => write!(f, "unknown register '{name}'"),
            Self::UnknownField { register, field } => {
                write!(f, "register '{register}' has no field '{field}'")
            }
            Self::Permission { target, access } => {
                write!(f, "'{target}' does not permit {access}")
            }
            Self::ValueTooLarge { value, width_bits } => {
                write!(f, "value {value} does not fit in {width_bits} bits")
            }
            Self::WriteVerification { written, read } => write!(
                f,
                "write verification failed: wrote 0x{written:X}, read 0x{read:X}"
            ),
            Self::TypeMismatch { value } => {
                write!(f, "value {value} is not of the expected type")
            }
            Self::NotFinite => f.write_str("value is not a finite number"),
            Self::Range { value, min, max } => {
                write!(f, "value {value} is not within [{min}, {max}]")
            }
        }
    }
}

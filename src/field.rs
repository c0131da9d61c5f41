//! Fields: named bit ranges inside a register
//!
//! Writing a field is a read-modify-write of the whole register. The bits
//! outside the field, including reserved bits, are written back unchanged.
//!
//! The sequence is not atomic on the bus. Within one [`Device`] it cannot be
//! interleaved, because every handle borrows the device mutably; two `Device`
//! values describing the same physical chip can still lose an update.
//!
//! [`Device`]: crate::Device

use crate::device::Device;
use crate::helpers::{field_mask, read_modify};
use crate::interface::Transport;
use crate::permission::{Access, Permission};
use crate::register::Slot;
use crate::Error;

/// Construction parameters for a [`Field`]
///
/// Defaults: 1 bit wide, [`Permission::ReadWrite`], no description.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FieldDef {
    /// Field name, unique within the register
    pub name: &'static str,
    /// Position of the least significant bit
    pub bit_offset: u8,
    /// Width in bits (at least 1)
    pub width_bits: u8,
    /// Field-level permission
    pub permission: Permission,
    /// Free-form description
    pub description: Option<&'static str>,
}

impl FieldDef {
    /// Create a one-bit, read/write field definition
    #[must_use]
    pub const fn new(name: &'static str, bit_offset: u8) -> Self {
        Self {
            name,
            bit_offset,
            width_bits: 1,
            permission: Permission::ReadWrite,
            description: None,
        }
    }

    /// Set the field width in bits
    #[must_use]
    pub const fn width(mut self, width_bits: u8) -> Self {
        self.width_bits = width_bits;
        self
    }

    /// Set the field permission
    #[must_use]
    pub const fn permission(mut self, permission: Permission) -> Self {
        self.permission = permission;
        self
    }

    /// Mark the field read-only
    #[must_use]
    pub const fn read_only(self) -> Self {
        self.permission(Permission::ReadOnly)
    }

    /// Mark the field write-only
    #[must_use]
    pub const fn write_only(self) -> Self {
        self.permission(Permission::WriteOnly)
    }

    /// Attach a description
    #[must_use]
    pub const fn description(mut self, description: &'static str) -> Self {
        self.description = Some(description);
        self
    }
}

/// A named bit range of a register
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Field {
    name: &'static str,
    bit_offset: u8,
    width_bits: u8,
    permission: Permission,
    description: Option<&'static str>,
}

impl Field {
    pub(crate) const fn from_def(def: FieldDef) -> Self {
        Self {
            name: def.name,
            bit_offset: def.bit_offset,
            width_bits: def.width_bits,
            permission: def.permission,
            description: def.description,
        }
    }

    /// Field name
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Position of the least significant bit
    #[must_use]
    pub const fn bit_offset(&self) -> u8 {
        self.bit_offset
    }

    /// Width in bits
    #[must_use]
    pub const fn width_bits(&self) -> u8 {
        self.width_bits
    }

    /// Field-level permission
    #[must_use]
    pub const fn permission(&self) -> Permission {
        self.permission
    }

    /// Description, if any
    #[must_use]
    pub const fn description(&self) -> Option<&'static str> {
        self.description
    }

    /// Largest value the field can hold
    #[must_use]
    pub const fn max_value(&self) -> u32 {
        field_mask(self.width_bits)
    }

    /// Mask of the field's bits within the register
    #[must_use]
    pub const fn mask(&self) -> u32 {
        field_mask(self.width_bits) << self.bit_offset
    }

    /// Isolate the field value from a full register value
    #[must_use]
    pub const fn extract(&self, register_value: u32) -> u32 {
        (register_value >> self.bit_offset) & field_mask(self.width_bits)
    }

    /// Replace the field bits of `register_value` with `value`
    #[must_use]
    pub const fn insert(&self, register_value: u32, value: u32) -> u32 {
        read_modify(register_value, value << self.bit_offset, self.mask())
    }

    fn check<E>(&self, access: Access) -> Result<(), Error<E>> {
        if self.permission.allows(access) {
            Ok(())
        } else {
            Err(Error::Permission {
                target: self.name,
                access,
            })
        }
    }

    const fn covers(&self, register_width: u8) -> bool {
        self.bit_offset == 0 && self.width_bits == register_width
    }
}

/// Bus access to one field of a device register
pub struct FieldHandle<'a, T> {
    device: &'a mut Device<T>,
    register: Slot,
    field: Field,
}

impl<'a, T: Transport> FieldHandle<'a, T> {
    pub(crate) fn new(device: &'a mut Device<T>, register: Slot, field: Field) -> Self {
        Self {
            device,
            register,
            field,
        }
    }

    /// Field metadata
    #[must_use]
    pub fn info(&self) -> &Field {
        &self.field
    }

    /// Read the field value
    ///
    /// Reads the whole register and isolates the field bits.
    ///
    /// # Errors
    ///
    /// - [`Error::Permission`] if the field is write-only (no bus traffic)
    /// - [`Error::BusNotReady`] / [`Error::Bus`] on transport failure
    pub fn read(&mut self) -> Result<u32, Error<T::Error>> {
        self.field.check(Access::Read)?;
        let register_value = self.device.read_slot(&self.register)?;
        Ok(self.field.extract(register_value))
    }

    /// Write the field value, leaving every other bit of the register intact
    ///
    /// When the field is readable it is read back and compared.
    ///
    /// # Errors
    ///
    /// - [`Error::Permission`] if the field is read-only, or if the register
    ///   is write-only and the field does not span it (no bus traffic)
    /// - [`Error::ValueTooLarge`] if `value` does not fit in the field (no bus traffic)
    /// - [`Error::WriteVerification`] if the readback differs
    /// - [`Error::BusNotReady`] / [`Error::Bus`] on transport failure
    pub fn write(&mut self, value: u32) -> Result<(), Error<T::Error>> {
        self.field.check(Access::Write)?;
        if value > self.field.max_value() {
            return Err(Error::ValueTooLarge {
                value,
                width_bits: self.field.width_bits,
            });
        }

        let current = if self.register.permission.is_readable() {
            self.device.read_slot(&self.register)?
        } else if self.field.covers(self.register.width_bits) {
            0
        } else {
            // Sibling bits cannot be preserved without reading them
            return Err(Error::Permission {
                target: self.register.name,
                access: Access::Read,
            });
        };

        let updated = self.field.insert(current, value);

        #[cfg(feature = "defmt")]
        defmt::trace!(
            "{}.{}: 0x{:X} -> 0x{:X}",
            self.register.name,
            self.field.name,
            current,
            updated
        );

        self.device.write_slot(&self.register, updated)?;

        if self.field.permission.is_readable() {
            let read = self.read()?;
            if read != value {
                #[cfg(feature = "defmt")]
                defmt::warn!(
                    "{}.{}: verification failed, wrote {} read {}",
                    self.register.name,
                    self.field.name,
                    value,
                    read
                );
                return Err(Error::WriteVerification {
                    written: value,
                    read,
                });
            }
        }

        Ok(())
    }
}

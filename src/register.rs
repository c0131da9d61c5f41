//! Registers: addressable, fixed-width locations in a device's memory map
//!
//! A [`Register`] is created through [`Device::add_register`] from a
//! [`RegisterDef`] and owns its named [`Field`]s. Bus access goes through a
//! [`RegisterHandle`] obtained from [`Device::register`].
//!
//! ```ignore
//! device
//!     .add_register(RegisterDef::new("CONFIG", 0x01).width(16))?
//!     .add_field(FieldDef::new("SHDN", 8))?
//!     .add_field(FieldDef::new("T_HYST", 9).width(2))?;
//!
//! let raw = device.register("CONFIG")?.read()?;
//! ```
//!
//! [`Device::add_register`]: crate::Device::add_register
//! [`Device::register`]: crate::Device::register

use heapless::LinearMap;

use crate::device::Device;
use crate::field::{Field, FieldDef, FieldHandle};
use crate::helpers::field_mask;
use crate::interface::Transport;
use crate::permission::{Access, Permission};
use crate::{Error, LayoutError, MAX_FIELDS, MAX_REGISTER_WIDTH};

/// Construction parameters for a [`Register`]
///
/// Defaults: 8 bits wide, [`Permission::ReadWrite`], no description.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RegisterDef {
    /// Register name, unique within the device
    pub name: &'static str,
    /// Offset within the device memory map
    pub address: u8,
    /// Width in bits (power of two, at most 32)
    pub width_bits: u8,
    /// Register-level permission
    pub permission: Permission,
    /// Free-form description
    pub description: Option<&'static str>,
}

impl RegisterDef {
    /// Create a definition with default width and permission
    #[must_use]
    pub const fn new(name: &'static str, address: u8) -> Self {
        Self {
            name,
            address,
            width_bits: 8,
            permission: Permission::ReadWrite,
            description: None,
        }
    }

    /// Set the register width in bits
    #[must_use]
    pub const fn width(mut self, width_bits: u8) -> Self {
        self.width_bits = width_bits;
        self
    }

    /// Set the register permission
    #[must_use]
    pub const fn permission(mut self, permission: Permission) -> Self {
        self.permission = permission;
        self
    }

    /// Mark the register read-only
    #[must_use]
    pub const fn read_only(self) -> Self {
        self.permission(Permission::ReadOnly)
    }

    /// Mark the register write-only
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

/// A register in a device's memory map
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Register {
    name: &'static str,
    address: u8,
    width_bits: u8,
    permission: Permission,
    description: Option<&'static str>,
    fields: LinearMap<&'static str, Field, MAX_FIELDS>,
}

impl Register {
    pub(crate) fn from_def(def: RegisterDef) -> Result<Self, LayoutError> {
        if !def.width_bits.is_power_of_two() || def.width_bits > MAX_REGISTER_WIDTH {
            return Err(LayoutError::InvalidWidth {
                name: def.name,
                width_bits: def.width_bits,
            });
        }

        Ok(Self {
            name: def.name,
            address: def.address,
            width_bits: def.width_bits,
            permission: def.permission,
            description: def.description,
            fields: LinearMap::new(),
        })
    }

    /// Add a field to the register
    ///
    /// Returns the register so that several fields can be chained.
    ///
    /// # Errors
    ///
    /// - [`LayoutError::DuplicateName`] if a field with this name exists
    /// - [`LayoutError::CapacityExceeded`] if the register already holds
    ///   [`MAX_FIELDS`] fields
    /// - [`LayoutError::InvalidWidth`] if the field width is zero
    /// - [`LayoutError::FieldOutOfBounds`] if the field does not fit in the register
    /// - [`LayoutError::PermissionConflict`] if the field grants an access the
    ///   register does not
    pub fn add_field(&mut self, def: FieldDef) -> Result<&mut Self, LayoutError> {
        if self.fields.contains_key(&def.name) {
            return Err(LayoutError::DuplicateName(def.name));
        }
        if def.width_bits == 0 {
            return Err(LayoutError::InvalidWidth {
                name: def.name,
                width_bits: def.width_bits,
            });
        }
        if u16::from(def.bit_offset) + u16::from(def.width_bits) > u16::from(self.width_bits) {
            return Err(LayoutError::FieldOutOfBounds {
                field: def.name,
                bit_offset: def.bit_offset,
                width_bits: def.width_bits,
                register_width: self.width_bits,
            });
        }
        if !def.permission.is_subset_of(self.permission) {
            return Err(LayoutError::PermissionConflict {
                field: def.name,
                register: self.name,
            });
        }

        self.fields
            .insert(def.name, Field::from_def(def))
            .map_err(|_| LayoutError::CapacityExceeded(def.name))?;
        Ok(self)
    }

    /// Register name
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Offset within the device memory map
    #[must_use]
    pub const fn address(&self) -> u8 {
        self.address
    }

    /// Width in bits
    #[must_use]
    pub const fn width_bits(&self) -> u8 {
        self.width_bits
    }

    /// Number of bytes the register occupies on the bus
    #[must_use]
    pub const fn byte_len(&self) -> usize {
        byte_len(self.width_bits)
    }

    /// Register-level permission
    #[must_use]
    pub const fn permission(&self) -> Permission {
        self.permission
    }

    /// Description, if any
    #[must_use]
    pub const fn description(&self) -> Option<&'static str> {
        self.description
    }

    /// Largest value the register can hold
    #[must_use]
    pub const fn max_value(&self) -> u32 {
        field_mask(self.width_bits)
    }

    /// Look up a field by name
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    /// Iterate over the fields in the order they were added
    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.values()
    }

    pub(crate) const fn slot(&self) -> Slot {
        Slot {
            name: self.name,
            address: self.address,
            width_bits: self.width_bits,
            permission: self.permission,
        }
    }
}

/// Number of bus bytes for a register of the given width
pub(crate) const fn byte_len(width_bits: u8) -> usize {
    if width_bits <= 8 {
        1
    } else {
        (width_bits / 8) as usize
    }
}

/// Copy of the register attributes needed for bus access
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Slot {
    pub(crate) name: &'static str,
    pub(crate) address: u8,
    pub(crate) width_bits: u8,
    pub(crate) permission: Permission,
}

impl Slot {
    pub(crate) fn check<E>(&self, access: Access) -> Result<(), Error<E>> {
        if self.permission.allows(access) {
            Ok(())
        } else {
            Err(Error::Permission {
                target: self.name,
                access,
            })
        }
    }
}

/// Bus access to one register of a device
///
/// Borrows the device mutably, so no other operation on the same device can
/// run until the handle is dropped.
pub struct RegisterHandle<'a, T> {
    device: &'a mut Device<T>,
    slot: Slot,
}

impl<'a, T: Transport> RegisterHandle<'a, T> {
    pub(crate) fn new(device: &'a mut Device<T>, slot: Slot) -> Self {
        Self { device, slot }
    }

    /// Register name
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.slot.name
    }

    /// Read the register value
    ///
    /// # Errors
    ///
    /// - [`Error::Permission`] if the register is write-only (no bus traffic)
    /// - [`Error::BusNotReady`] / [`Error::Bus`] on transport failure
    pub fn read(&mut self) -> Result<u32, Error<T::Error>> {
        self.slot.check(Access::Read)?;
        self.device.read_slot(&self.slot)
    }

    /// Write the register value
    ///
    /// When the register is also readable the value is read back and compared.
    ///
    /// # Errors
    ///
    /// - [`Error::Permission`] if the register is read-only (no bus traffic)
    /// - [`Error::ValueTooLarge`] if `value` does not fit in the register (no bus traffic)
    /// - [`Error::WriteVerification`] if the readback differs
    /// - [`Error::BusNotReady`] / [`Error::Bus`] on transport failure
    pub fn write(&mut self, value: u32) -> Result<(), Error<T::Error>> {
        self.slot.check(Access::Write)?;
        self.device.write_slot_verified(&self.slot, value)
    }

    /// Access a field of this register
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownField`] if the register has no such field.
    pub fn field(self, name: &'static str) -> Result<FieldHandle<'a, T>, Error<T::Error>> {
        let field = self
            .device
            .register_info(self.slot.name)
            .and_then(|register| register.field(name))
            .copied()
            .ok_or(Error::UnknownField {
                register: self.slot.name,
                field: name,
            })?;

        Ok(FieldHandle::new(self.device, self.slot, field))
    }
}

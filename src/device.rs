//! I2C target devices and their register maps
//!
//! A [`Device`] knows its 7-bit bus address, its byte order and a map of named
//! [`Register`]s. Drivers build the map once at construction and then reach
//! registers and fields by name:
//!
//! ```ignore
//! let mut device = Device::new("MCP9808", 0x18, I2cInterface::new(i2c))?;
//! device
//!     .add_register(RegisterDef::new("RES", 0x08))?
//!     .add_field(FieldDef::new("RESOLUTION", 0).width(2))?;
//!
//! device.field("RES", "RESOLUTION")?.write(0b11)?;
//! ```
//!
//! Devices without a memory map (I/O expanders and the like) use
//! [`Device::raw_read`] and [`Device::raw_write`] instead.

use embedded_hal::i2c::SevenBitAddress;
use heapless::LinearMap;

use crate::field::{FieldDef, FieldHandle};
use crate::helpers::field_mask;
use crate::interface::Transport;
use crate::register::{byte_len, Register, RegisterDef, RegisterHandle, Slot};
use crate::{Error, LayoutError, MAX_REGISTERS, MAX_REGISTER_BYTES};

/// Byte order of multi-byte registers on the bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ByteOrder {
    /// Most significant byte first
    #[default]
    BigEndian,
    /// Least significant byte first
    LittleEndian,
}

impl ByteOrder {
    fn encode(self, value: u32, out: &mut [u8]) {
        let len = out.len();
        match self {
            Self::BigEndian => {
                out.copy_from_slice(&value.to_be_bytes()[MAX_REGISTER_BYTES - len..]);
            }
            Self::LittleEndian => out.copy_from_slice(&value.to_le_bytes()[..len]),
        }
    }

    fn decode(self, bytes: &[u8]) -> u32 {
        match self {
            Self::BigEndian => bytes
                .iter()
                .fold(0, |acc, &byte| (acc << 8) | u32::from(byte)),
            Self::LittleEndian => bytes
                .iter()
                .rev()
                .fold(0, |acc, &byte| (acc << 8) | u32::from(byte)),
        }
    }
}

/// An I2C target device
///
/// The transport is optional so that a device can be described before the bus
/// is available; every bus operation fails with [`Error::BusNotReady`] until one
/// is attached.
pub struct Device<T> {
    name: &'static str,
    address: SevenBitAddress,
    description: Option<&'static str>,
    byte_order: ByteOrder,
    registers: LinearMap<&'static str, Register, MAX_REGISTERS>,
    transport: Option<T>,
}

impl<T> Device<T> {
    /// Create a device on the given bus
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::InvalidAddress`] if `address` is not a 7-bit address.
    pub fn new(
        name: &'static str,
        address: SevenBitAddress,
        transport: T,
    ) -> Result<Self, LayoutError> {
        let mut device = Self::detached(name, address)?;
        device.transport = Some(transport);
        Ok(device)
    }

    /// Create a device with no transport attached
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::InvalidAddress`] if `address` is not a 7-bit address.
    pub fn detached(name: &'static str, address: SevenBitAddress) -> Result<Self, LayoutError> {
        if address > 0x7F {
            return Err(LayoutError::InvalidAddress(address));
        }

        Ok(Self {
            name,
            address,
            description: None,
            byte_order: ByteOrder::default(),
            registers: LinearMap::new(),
            transport: None,
        })
    }

    /// Attach a description
    #[must_use]
    pub fn with_description(mut self, description: &'static str) -> Self {
        self.description = Some(description);
        self
    }

    /// Set the byte order used for multi-byte registers
    #[must_use]
    pub fn with_byte_order(mut self, byte_order: ByteOrder) -> Self {
        self.byte_order = byte_order;
        self
    }

    /// Device name
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// 7-bit bus address
    #[must_use]
    pub fn address(&self) -> SevenBitAddress {
        self.address
    }

    /// Description, if any
    #[must_use]
    pub fn description(&self) -> Option<&'static str> {
        self.description
    }

    /// Byte order of multi-byte registers
    #[must_use]
    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    /// Attach a transport, returning the previous one
    pub fn attach(&mut self, transport: T) -> Option<T> {
        self.transport.replace(transport)
    }

    /// Detach and return the transport
    pub fn detach(&mut self) -> Option<T> {
        self.transport.take()
    }

    /// Whether a transport is attached
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.transport.is_some()
    }

    /// Consume the device and return its transport
    pub fn release(self) -> Option<T> {
        self.transport
    }

    /// Add a register to the memory map
    ///
    /// Returns the new register so fields can be added to it right away.
    ///
    /// # Errors
    ///
    /// - [`LayoutError::DuplicateName`] if a register with this name exists
    /// - [`LayoutError::InvalidWidth`] if the width is not a power of two up to 32
    /// - [`LayoutError::CapacityExceeded`] if the device already holds
    ///   [`MAX_REGISTERS`] registers
    pub fn add_register(&mut self, def: RegisterDef) -> Result<&mut Register, LayoutError> {
        if self.registers.contains_key(&def.name) {
            return Err(LayoutError::DuplicateName(def.name));
        }

        let register = Register::from_def(def)?;
        let full = LayoutError::CapacityExceeded(def.name);
        self.registers.insert(def.name, register).map_err(|_| full)?;
        self.registers.get_mut(def.name).ok_or(full)
    }

    /// Look up register metadata by name
    #[must_use]
    pub fn register_info(&self, name: &str) -> Option<&Register> {
        self.registers.get(name)
    }

    /// Look up register metadata by name, for adding fields later
    pub fn register_info_mut(&mut self, name: &str) -> Option<&mut Register> {
        self.registers.get_mut(name)
    }

    /// Iterate over the registers in the order they were added
    pub fn registers(&self) -> impl Iterator<Item = &Register> {
        self.registers.values()
    }
}

impl<T: Transport> Device<T> {
    /// Add a field to a register that is already in the map
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownRegister`] if there is no such register, or
    /// [`Error::Layout`] if [`Register::add_field`] rejects the field.
    pub fn add_field(
        &mut self,
        register: &'static str,
        def: FieldDef,
    ) -> Result<&mut Register, Error<T::Error>> {
        let target = self
            .registers
            .get_mut(register)
            .ok_or(Error::UnknownRegister(register))?;
        Ok(target.add_field(def)?)
    }

    /// Access a register by name
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownRegister`] if the device has no such register.
    pub fn register(
        &mut self,
        name: &'static str,
    ) -> Result<RegisterHandle<'_, T>, Error<T::Error>> {
        let slot = self.slot(name)?;
        Ok(RegisterHandle::new(self, slot))
    }

    /// Access a field by register and field name
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownRegister`] or [`Error::UnknownField`] if either
    /// name is not defined.
    pub fn field(
        &mut self,
        register: &'static str,
        field: &'static str,
    ) -> Result<FieldHandle<'_, T>, Error<T::Error>> {
        self.register(register)?.field(field)
    }

    /// Read one byte from a device without a memory map
    ///
    /// # Errors
    ///
    /// Returns [`Error::BusNotReady`] with no transport, or [`Error::Bus`].
    pub fn raw_read(&mut self) -> Result<u8, Error<T::Error>> {
        let address = self.address;
        let mut buf = [0u8; 1];
        self.transport()?
            .read(address, &mut buf)
            .map_err(Error::Bus)?;
        Ok(buf[0])
    }

    /// Write one byte to a device without a memory map, then read it back
    ///
    /// # Errors
    ///
    /// - [`Error::WriteVerification`] if the readback differs from `value`
    /// - [`Error::BusNotReady`] / [`Error::Bus`] on transport failure
    pub fn raw_write(&mut self, value: u8) -> Result<(), Error<T::Error>> {
        self.raw_write_unchecked(value)?;

        let read = self.raw_read()?;
        if read != value {
            #[cfg(feature = "defmt")]
            defmt::warn!("{}: verification failed, wrote {} read {}", self.name, value, read);
            return Err(Error::WriteVerification {
                written: u32::from(value),
                read: u32::from(read),
            });
        }

        Ok(())
    }

    /// Write one byte to a device without a memory map, without reading it back
    ///
    /// For targets whose input levels legitimately differ from what was
    /// written, such as an expander pin driving a transistor base.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BusNotReady`] with no transport, or [`Error::Bus`].
    pub fn raw_write_unchecked(&mut self, value: u8) -> Result<(), Error<T::Error>> {
        let address = self.address;
        self.transport()?
            .write(address, &[value])
            .map_err(Error::Bus)
    }

    /// Read a register without checking its permission
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownRegister`], [`Error::BusNotReady`] or [`Error::Bus`].
    pub fn register_read(&mut self, name: &'static str) -> Result<u32, Error<T::Error>> {
        let slot = self.slot(name)?;
        self.read_slot(&slot)
    }

    /// Write a register without checking its permission
    ///
    /// The value is still range-checked, and read back when the register is
    /// readable.
    ///
    /// # Errors
    ///
    /// - [`Error::UnknownRegister`] if the device has no such register
    /// - [`Error::ValueTooLarge`] if `value` does not fit in the register
    /// - [`Error::WriteVerification`] if the readback differs
    /// - [`Error::BusNotReady`] / [`Error::Bus`] on transport failure
    pub fn register_write(
        &mut self,
        name: &'static str,
        value: u32,
    ) -> Result<(), Error<T::Error>> {
        let slot = self.slot(name)?;
        self.write_slot_verified(&slot, value)
    }

    fn slot(&self, name: &'static str) -> Result<Slot, Error<T::Error>> {
        self.registers
            .get(name)
            .map(Register::slot)
            .ok_or(Error::UnknownRegister(name))
    }

    fn transport(&mut self) -> Result<&mut T, Error<T::Error>> {
        self.transport.as_mut().ok_or(Error::BusNotReady)
    }

    pub(crate) fn read_slot(&mut self, slot: &Slot) -> Result<u32, Error<T::Error>> {
        let address = self.address;
        let byte_order = self.byte_order;
        let mut buf = [0u8; MAX_REGISTER_BYTES];
        let bytes = &mut buf[..byte_len(slot.width_bits)];

        self.transport()?
            .read_mem(address, slot.address, bytes)
            .map_err(Error::Bus)?;

        Ok(byte_order.decode(bytes) & field_mask(slot.width_bits))
    }

    pub(crate) fn write_slot(&mut self, slot: &Slot, value: u32) -> Result<(), Error<T::Error>> {
        let address = self.address;
        let mut buf = [0u8; MAX_REGISTER_BYTES];
        let bytes = &mut buf[..byte_len(slot.width_bits)];
        self.byte_order.encode(value, bytes);

        #[cfg(feature = "defmt")]
        defmt::trace!("{}.{} <- 0x{:X}", self.name, slot.name, value);

        self.transport()?
            .write_mem(address, slot.address, bytes)
            .map_err(Error::Bus)
    }

    pub(crate) fn write_slot_verified(
        &mut self,
        slot: &Slot,
        value: u32,
    ) -> Result<(), Error<T::Error>> {
        if value > field_mask(slot.width_bits) {
            return Err(Error::ValueTooLarge {
                value,
                width_bits: slot.width_bits,
            });
        }

        self.write_slot(slot, value)?;

        if slot.permission.is_readable() {
            let read = self.read_slot(slot)?;
            if read != value {
                #[cfg(feature = "defmt")]
                defmt::warn!(
                    "{}.{}: verification failed, wrote {} read {}",
                    self.name,
                    slot.name,
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

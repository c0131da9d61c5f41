//! Bus transport for register-mapped I2C targets
//!
//! [`Transport`] is the only boundary the framework talks to. It offers plain
//! addressed reads and writes, for targets without a memory map such as I/O
//! expanders, and memory-addressed variants that first send a register pointer.
//!
//! [`I2cInterface`] implements it for any `embedded-hal` I2C bus. One bus is
//! usually shared by several devices; wrap it with an `embedded-hal-bus`
//! adapter and give every device its own handle:
//!
//! ```ignore
//! let bus = core::cell::RefCell::new(i2c);
//! let charger = Bq25756::new(I2cInterface::new(RefCellDevice::new(&bus)))?;
//! let sensor = Mcp9808::new(I2cInterface::new(RefCellDevice::new(&bus)))?;
//! ```

use embedded_hal::i2c::{Operation, SevenBitAddress};

/// Byte-oriented, addressed bus
pub trait Transport {
    /// Error reported by the bus (NACK, arbitration loss, timeout, ...)
    type Error;

    /// Read `buf.len()` bytes from the target at `address`
    fn read(&mut self, address: SevenBitAddress, buf: &mut [u8]) -> Result<(), Self::Error>;

    /// Write `bytes` to the target at `address`
    fn write(&mut self, address: SevenBitAddress, bytes: &[u8]) -> Result<(), Self::Error>;

    /// Read `buf.len()` bytes starting at `register` on the target at `address`
    fn read_mem(
        &mut self,
        address: SevenBitAddress,
        register: u8,
        buf: &mut [u8],
    ) -> Result<(), Self::Error>;

    /// Write `bytes` starting at `register` on the target at `address`
    fn write_mem(
        &mut self,
        address: SevenBitAddress,
        register: u8,
        bytes: &[u8],
    ) -> Result<(), Self::Error>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    type Error = T::Error;

    fn read(&mut self, address: SevenBitAddress, buf: &mut [u8]) -> Result<(), Self::Error> {
        T::read(self, address, buf)
    }

    fn write(&mut self, address: SevenBitAddress, bytes: &[u8]) -> Result<(), Self::Error> {
        T::write(self, address, bytes)
    }

    fn read_mem(
        &mut self,
        address: SevenBitAddress,
        register: u8,
        buf: &mut [u8],
    ) -> Result<(), Self::Error> {
        T::read_mem(self, address, register, buf)
    }

    fn write_mem(
        &mut self,
        address: SevenBitAddress,
        register: u8,
        bytes: &[u8],
    ) -> Result<(), Self::Error> {
        T::write_mem(self, address, register, bytes)
    }
}

/// I2C transport over an `embedded-hal` bus
pub struct I2cInterface<I2C> {
    i2c: I2C,
}

impl<I2C> I2cInterface<I2C> {
    /// Wrap an I2C peripheral (or a shared-bus device handle)
    pub const fn new(i2c: I2C) -> Self {
        Self { i2c }
    }

    /// Consume the interface and return the I2C peripheral
    pub fn release(self) -> I2C {
        self.i2c
    }
}

impl<I2C, E> Transport for I2cInterface<I2C>
where
    I2C: embedded_hal::i2c::I2c<Error = E>,
{
    type Error = E;

    fn read(&mut self, address: SevenBitAddress, buf: &mut [u8]) -> Result<(), Self::Error> {
        self.i2c.read(address, buf)
    }

    fn write(&mut self, address: SevenBitAddress, bytes: &[u8]) -> Result<(), Self::Error> {
        self.i2c.write(address, bytes)
    }

    fn read_mem(
        &mut self,
        address: SevenBitAddress,
        register: u8,
        buf: &mut [u8],
    ) -> Result<(), Self::Error> {
        self.i2c.write_read(address, &[register], buf)
    }

    fn write_mem(
        &mut self,
        address: SevenBitAddress,
        register: u8,
        bytes: &[u8],
    ) -> Result<(), Self::Error> {
        // Adjacent writes in one transaction go out without a restart, so
        // the target sees the pointer and the payload as a single write
        self.i2c.transaction(
            address,
            &mut [Operation::Write(&[register]), Operation::Write(bytes)],
        )
    }
}

//! Backends that move 4-bit nibbles to an HD44780 controller

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use embedded_hal::i2c::SevenBitAddress;

use crate::device::Device;
use crate::interface::Transport;
use crate::Error;

/// Target of a transfer, selected with the RS line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mode {
    /// Instruction register (RS low)
    Command,
    /// Data register (RS high)
    Data,
}

/// A 4-bit connection to the controller
///
/// The controller latches on the falling edge of EN. Implementations drive
/// the data lines and RS, raise EN, then drop it.
pub trait LcdBus {
    /// Error of the underlying bus or pins
    type Error;

    /// Send the low four bits of `nibble`
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails to drive the lines.
    fn write_nibble<D: DelayNs>(
        &mut self,
        nibble: u8,
        mode: Mode,
        delay: &mut D,
    ) -> Result<(), Error<Self::Error>>;

    /// Switch the backlight
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails to drive the backlight.
    fn set_backlight(&mut self, on: bool) -> Result<(), Error<Self::Error>>;
}

/// Default address of PCF8574 backpacks (A2..A0 pulled high)
pub const PCF8574_DEFAULT_ADDRESS: SevenBitAddress = 0x27;

// PCF8574 port pins; P1 (RW) stays low
const MASK_RS: u8 = 0x01; // P0
const MASK_EN: u8 = 0x04; // P2
const SHIFT_BACKLIGHT: u8 = 3; // P3
const SHIFT_DATA: u8 = 4; // P4..P7

/// PCF8574 I/O expander wired as an LCD backpack
///
/// The expander has no register map: each port update is a single byte
/// written with [`Device::raw_write_unchecked`]. The port is not read back,
/// since P3 drives the backlight transistor and reads low while set.
pub struct Pcf8574Backpack<T> {
    device: Device<T>,
    backlight: bool,
}

impl<T: Transport> Pcf8574Backpack<T> {
    /// Backpack at [`PCF8574_DEFAULT_ADDRESS`]
    ///
    /// # Errors
    ///
    /// Never fails for the default address.
    pub fn new(transport: T) -> Result<Self, Error<T::Error>> {
        Self::with_address(transport, PCF8574_DEFAULT_ADDRESS)
    }

    /// Backpack at a custom address
    ///
    /// # Errors
    ///
    /// Returns [`Error::Layout`] if `address` is not a 7-bit address.
    pub fn with_address(transport: T, address: SevenBitAddress) -> Result<Self, Error<T::Error>> {
        let device = Device::new("PCF8574", address, transport)?
            .with_description("8-bit I/O expander driving an HD44780 in 4-bit mode");

        Ok(Self {
            device,
            backlight: false,
        })
    }

    /// Consume the backpack and return the transport
    pub fn release(self) -> Option<T> {
        self.device.release()
    }
}

/// Port value carrying `nibble` with EN low
const fn port(nibble: u8, mode: Mode, backlight: bool) -> u8 {
    let rs = match mode {
        Mode::Command => 0,
        Mode::Data => MASK_RS,
    };
    ((nibble & 0x0F) << SHIFT_DATA) | ((backlight as u8) << SHIFT_BACKLIGHT) | rs
}

impl<T: Transport> LcdBus for Pcf8574Backpack<T> {
    type Error = T::Error;

    fn write_nibble<D: DelayNs>(
        &mut self,
        nibble: u8,
        mode: Mode,
        _delay: &mut D,
    ) -> Result<(), Error<T::Error>> {
        // An I2C byte takes longer than the EN pulse and settle times
        let byte = port(nibble, mode, self.backlight);
        self.device.raw_write_unchecked(byte | MASK_EN)?;
        self.device.raw_write_unchecked(byte)
    }

    fn set_backlight(&mut self, on: bool) -> Result<(), Error<T::Error>> {
        self.backlight = on;
        self.device
            .raw_write_unchecked(u8::from(on) << SHIFT_BACKLIGHT)
    }
}

/// Direct GPIO connection: RS, EN and the upper data lines D4..D7
///
/// RW must be tied low. There is no backlight control on this backend.
pub struct ParallelBus<RS, EN, D4, D5, D6, D7> {
    rs: RS,
    en: EN,
    data: (D4, D5, D6, D7),
}

impl<RS, EN, D4, D5, D6, D7> ParallelBus<RS, EN, D4, D5, D6, D7> {
    /// Bundle the control and data pins
    pub fn new(rs: RS, en: EN, d4: D4, d5: D5, d6: D6, d7: D7) -> Self {
        Self {
            rs,
            en,
            data: (d4, d5, d6, d7),
        }
    }

    /// Return the pins
    pub fn release(self) -> (RS, EN, D4, D5, D6, D7) {
        let (d4, d5, d6, d7) = self.data;
        (self.rs, self.en, d4, d5, d6, d7)
    }
}

fn drive<P: OutputPin>(pin: &mut P, high: bool) -> Result<(), Error<P::Error>> {
    if high {
        pin.set_high()
    } else {
        pin.set_low()
    }
    .map_err(Error::Bus)
}

impl<E, RS, EN, D4, D5, D6, D7> LcdBus for ParallelBus<RS, EN, D4, D5, D6, D7>
where
    RS: OutputPin<Error = E>,
    EN: OutputPin<Error = E>,
    D4: OutputPin<Error = E>,
    D5: OutputPin<Error = E>,
    D6: OutputPin<Error = E>,
    D7: OutputPin<Error = E>,
{
    type Error = E;

    fn write_nibble<D: DelayNs>(
        &mut self,
        nibble: u8,
        mode: Mode,
        delay: &mut D,
    ) -> Result<(), Error<E>> {
        drive(&mut self.rs, mode == Mode::Data)?;
        drive(&mut self.data.0, nibble & 0x01 != 0)?;
        drive(&mut self.data.1, nibble & 0x02 != 0)?;
        drive(&mut self.data.2, nibble & 0x04 != 0)?;
        drive(&mut self.data.3, nibble & 0x08 != 0)?;

        drive(&mut self.en, true)?;
        delay.delay_us(1);
        drive(&mut self.en, false)?;
        // Most instructions take 37 us
        delay.delay_us(50);
        Ok(())
    }

    fn set_backlight(&mut self, _on: bool) -> Result<(), Error<E>> {
        Ok(())
    }
}

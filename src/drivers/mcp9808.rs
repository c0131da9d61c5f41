//! MCP9808 digital temperature sensor
//!
//! ±0.25 °C typical accuracy, selectable resolution down to 0.0625 °C and a
//! programmable alert output. Registers are big-endian 16-bit apart from the
//! resolution register.

use embedded_hal::i2c::SevenBitAddress;

use crate::device::{ByteOrder, Device};
use crate::field::FieldDef;
use crate::helpers::check_range;
use crate::interface::Transport;
use crate::register::RegisterDef;
use crate::Error;

/// Default I2C address (A2..A0 tied low)
pub const DEFAULT_ADDRESS: SevenBitAddress = 0x18;

/// Lowest supported I2C clock
pub const I2C_MIN_FREQ_HZ: u32 = 100_000;

/// Highest supported I2C clock
pub const I2C_MAX_FREQ_HZ: u32 = 400_000;

/// Expected content of the manufacturer ID register
pub const MANUFACTURER_ID: u16 = 0x0054;

/// Lowest alert limit in °C
pub const LIMIT_MIN_C: f32 = -40.0;

/// Highest alert limit in °C
pub const LIMIT_MAX_C: f32 = 125.0;

/// Register names
pub mod reg {
    /// Sensor configuration
    pub const CONFIG: &str = "CONFIG";
    /// Upper alert boundary
    pub const UP_ALERT: &str = "UP_ALERT";
    /// Lower alert boundary
    pub const LO_ALERT: &str = "LO_ALERT";
    /// Critical temperature
    pub const CRIT_ALERT: &str = "CRIT_ALERT";
    /// Ambient temperature
    pub const TEMP: &str = "TEMP";
    /// Manufacturer ID
    pub const MFTR_ID: &str = "MFTR_ID";
    /// Device ID and revision
    pub const DEV_ID: &str = "DEV_ID";
    /// Resolution
    pub const RES: &str = "RES";
}

/// Field names
pub mod field {
    /// Limit hysteresis
    pub const T_HYST: &str = "T_HYST";
    /// Shutdown mode
    pub const SHDN: &str = "SHDN";
    /// Critical limit lock
    pub const CRIT_LOCK: &str = "CRIT_LOCK";
    /// Window (upper/lower) limit lock
    pub const WIN_LOCK: &str = "WIN_LOCK";
    /// Interrupt clear
    pub const INT_CLEAR: &str = "INT_CLEAR";
    /// Alert output status
    pub const ALERT_STAT: &str = "ALERT_STAT";
    /// Alert output enable
    pub const ALERT_CNT: &str = "ALERT_CNT";
    /// Alert on critical only
    pub const ALERT_SEL: &str = "ALERT_SEL";
    /// Alert polarity
    pub const ALERT_POL: &str = "ALERT_POL";
    /// Alert interrupt mode
    pub const ALERT_MOD: &str = "ALERT_MOD";
    /// Ambient above critical limit
    pub const TCRIT: &str = "TCRIT";
    /// Ambient above upper limit
    pub const TUPPER: &str = "TUPPER";
    /// Ambient below lower limit
    pub const TLOWER: &str = "TLOWER";
    /// Temperature sign
    pub const SIGN: &str = "SIGN";
    /// Temperature magnitude in 1/16 °C
    pub const TA: &str = "TA";
    /// Alert boundary in 1/4 °C, two's complement
    pub const LIMIT: &str = "LIMIT";
    /// Conversion resolution
    pub const RESOLUTION: &str = "RESOLUTION";
}

#[rustfmt::skip]
const REGISTERS: [RegisterDef; 8] = [
    RegisterDef::new(reg::CONFIG, 0x01).width(16).description("Configure Device Settings"),
    RegisterDef::new(reg::UP_ALERT, 0x02).width(16).description("Alert Temperature Upper Boundary Trip register"),
    RegisterDef::new(reg::LO_ALERT, 0x03).width(16).description("Alert Temperature Lower Boundary Trip register"),
    RegisterDef::new(reg::CRIT_ALERT, 0x04).width(16).description("Critical Temperature Trip register"),
    RegisterDef::new(reg::TEMP, 0x05).width(16).read_only().description("Temperature register"),
    RegisterDef::new(reg::MFTR_ID, 0x06).width(16).read_only().description("Manufacturer ID register"),
    RegisterDef::new(reg::DEV_ID, 0x07).width(16).read_only().description("Device ID/Revision register"),
    RegisterDef::new(reg::RES, 0x08).description("Resolution register"),
];

#[rustfmt::skip]
const FIELDS: [(&str, FieldDef); 22] = [
    (reg::CONFIG, FieldDef::new(field::T_HYST, 9).width(2)),
    (reg::CONFIG, FieldDef::new(field::SHDN, 8)),
    (reg::CONFIG, FieldDef::new(field::CRIT_LOCK, 7)),
    (reg::CONFIG, FieldDef::new(field::WIN_LOCK, 6)),
    (reg::CONFIG, FieldDef::new(field::INT_CLEAR, 5).write_only()),
    (reg::CONFIG, FieldDef::new(field::ALERT_STAT, 4).read_only()),
    (reg::CONFIG, FieldDef::new(field::ALERT_CNT, 3)),
    (reg::CONFIG, FieldDef::new(field::ALERT_SEL, 2)),
    (reg::CONFIG, FieldDef::new(field::ALERT_POL, 1)),
    (reg::CONFIG, FieldDef::new(field::ALERT_MOD, 0)),
    (reg::UP_ALERT, FieldDef::new(field::LIMIT, 2).width(11)),
    (reg::LO_ALERT, FieldDef::new(field::LIMIT, 2).width(11)),
    (reg::CRIT_ALERT, FieldDef::new(field::LIMIT, 2).width(11)),
    (reg::TEMP, FieldDef::new(field::TCRIT, 15).read_only()),
    (reg::TEMP, FieldDef::new(field::TUPPER, 14).read_only()),
    (reg::TEMP, FieldDef::new(field::TLOWER, 13).read_only()),
    (reg::TEMP, FieldDef::new(field::SIGN, 12).read_only()),
    (reg::TEMP, FieldDef::new(field::TA, 0).width(12).read_only()),
    (reg::MFTR_ID, FieldDef::new("ID", 0).width(16).read_only()),
    (reg::DEV_ID, FieldDef::new("DEVICE_ID", 8).width(8).read_only()),
    (reg::DEV_ID, FieldDef::new("REVISION", 0).width(8).read_only()),
    (reg::RES, FieldDef::new(field::RESOLUTION, 0).width(2)),
];

/// Conversion resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Resolution {
    /// 0.5 °C, 30 ms conversion
    Half = 0b00,
    /// 0.25 °C, 65 ms conversion
    Quarter = 0b01,
    /// 0.125 °C, 130 ms conversion
    Eighth = 0b10,
    /// 0.0625 °C, 250 ms conversion (power-up default)
    Sixteenth = 0b11,
}

impl Resolution {
    const fn from_bits(bits: u32) -> Self {
        match bits & 0b11 {
            0b00 => Self::Half,
            0b01 => Self::Quarter,
            0b10 => Self::Eighth,
            _ => Self::Sixteenth,
        }
    }

    /// Temperature step in °C
    #[must_use]
    pub const fn step_c(self) -> f32 {
        match self {
            Self::Half => 0.5,
            Self::Quarter => 0.25,
            Self::Eighth => 0.125,
            Self::Sixteenth => 0.0625,
        }
    }
}

/// Alert flags latched in the temperature register
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AlertFlags {
    /// Ambient ≥ critical limit
    pub critical: bool,
    /// Ambient > upper limit
    pub upper: bool,
    /// Ambient < lower limit
    pub lower: bool,
}

impl AlertFlags {
    const fn from_raw(raw: u32) -> Self {
        Self {
            critical: raw & (1 << 15) != 0,
            upper: raw & (1 << 14) != 0,
            lower: raw & (1 << 13) != 0,
        }
    }
}

/// Convert a raw temperature register value to °C
///
/// Bits 12..0 hold a 13-bit two's complement value in 1/16 °C; the alert
/// flags in bits 15..13 are ignored.
#[must_use]
pub fn temperature_from_raw(raw: u16) -> f32 {
    let sixteenths = i32::from(raw & 0x0FFF) - if raw & 0x1000 != 0 { 0x1000 } else { 0 };
    sixteenths as f32 / 16.0
}

/// Convert an alert limit field (11-bit two's complement, 1/4 °C) to °C
#[must_use]
pub fn limit_from_raw(raw: u32) -> f32 {
    let quarters = ((raw << 21) as i32) >> 21;
    quarters as f32 / 4.0
}

/// Convert °C to an alert limit field value
///
/// The value is truncated toward zero to a 0.25 °C step.
///
/// # Errors
///
/// Returns [`Error::NotFinite`] for NaN or infinity, and [`Error::Range`] (in
/// quarter degrees) outside −40..=125 °C.
pub fn limit_to_raw<E>(celsius: f32) -> Result<u32, Error<E>> {
    if !celsius.is_finite() {
        return Err(Error::NotFinite);
    }
    let quarters = (celsius * 4.0) as i64;
    check_range::<E>(
        Some(quarters),
        (LIMIT_MIN_C * 4.0) as i64,
        (LIMIT_MAX_C * 4.0) as i64,
    )?;
    Ok((quarters as u32) & 0x7FF)
}

/// MCP9808 driver
pub struct Mcp9808<T> {
    device: Device<T>,
}

impl<T: Transport> Mcp9808<T> {
    /// Create a driver at the default address
    ///
    /// # Errors
    ///
    /// Only fails if the register table is inconsistent.
    pub fn new(transport: T) -> Result<Self, Error<T::Error>> {
        Self::with_address(transport, DEFAULT_ADDRESS)
    }

    /// Create a driver at a custom address (0x18..=0x1F depending on A2..A0)
    ///
    /// # Errors
    ///
    /// Returns [`Error::Layout`] if `address` is not a 7-bit address.
    pub fn with_address(transport: T, address: SevenBitAddress) -> Result<Self, Error<T::Error>> {
        let mut device = Device::new("MCP9808", address, transport)?
            .with_description("Digital temperature sensor")
            .with_byte_order(ByteOrder::BigEndian);

        for def in REGISTERS {
            device.add_register(def)?;
        }
        for (register, def) in FIELDS {
            device.add_field(register, def)?;
        }

        #[cfg(feature = "defmt")]
        defmt::debug!("MCP9808 at 0x{:02X}", address);

        Ok(Self { device })
    }

    /// Underlying register map
    pub fn device(&mut self) -> &mut Device<T> {
        &mut self.device
    }

    /// Consume the driver and return the transport
    pub fn release(self) -> Option<T> {
        self.device.release()
    }

    /// Ambient temperature in °C
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn temperature_c(&mut self) -> Result<f32, Error<T::Error>> {
        let raw = self.device.register(reg::TEMP)?.read()?;
        Ok(temperature_from_raw(raw as u16))
    }

    /// Alert flags from the temperature register
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn alert_flags(&mut self) -> Result<AlertFlags, Error<T::Error>> {
        let raw = self.device.register(reg::TEMP)?.read()?;
        Ok(AlertFlags::from_raw(raw))
    }

    fn limit(&mut self, register: &'static str) -> Result<f32, Error<T::Error>> {
        let raw = self.device.field(register, field::LIMIT)?.read()?;
        Ok(limit_from_raw(raw))
    }

    fn set_limit(&mut self, register: &'static str, celsius: f32) -> Result<(), Error<T::Error>> {
        let raw = limit_to_raw::<T::Error>(celsius)?;
        self.device.field(register, field::LIMIT)?.write(raw)
    }

    /// Upper alert limit in °C
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn upper_limit(&mut self) -> Result<f32, Error<T::Error>> {
        self.limit(reg::UP_ALERT)
    }

    /// Set the upper alert limit in °C
    ///
    /// # Errors
    ///
    /// Returns [`Error::Range`] outside −40..=125 °C, or
    /// [`Error::WriteVerification`] if the window limits are locked.
    pub fn set_upper_limit(&mut self, celsius: f32) -> Result<(), Error<T::Error>> {
        self.set_limit(reg::UP_ALERT, celsius)
    }

    /// Lower alert limit in °C
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn lower_limit(&mut self) -> Result<f32, Error<T::Error>> {
        self.limit(reg::LO_ALERT)
    }

    /// Set the lower alert limit in °C
    ///
    /// # Errors
    ///
    /// Returns [`Error::Range`] outside −40..=125 °C, or
    /// [`Error::WriteVerification`] if the window limits are locked.
    pub fn set_lower_limit(&mut self, celsius: f32) -> Result<(), Error<T::Error>> {
        self.set_limit(reg::LO_ALERT, celsius)
    }

    /// Critical temperature limit in °C
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn critical_limit(&mut self) -> Result<f32, Error<T::Error>> {
        self.limit(reg::CRIT_ALERT)
    }

    /// Set the critical temperature limit in °C
    ///
    /// # Errors
    ///
    /// Returns [`Error::Range`] outside −40..=125 °C, or
    /// [`Error::WriteVerification`] if the critical limit is locked.
    pub fn set_critical_limit(&mut self, celsius: f32) -> Result<(), Error<T::Error>> {
        self.set_limit(reg::CRIT_ALERT, celsius)
    }

    /// Conversion resolution
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn resolution(&mut self) -> Result<Resolution, Error<T::Error>> {
        let bits = self.device.field(reg::RES, field::RESOLUTION)?.read()?;
        Ok(Resolution::from_bits(bits))
    }

    /// Set the conversion resolution
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn set_resolution(&mut self, resolution: Resolution) -> Result<(), Error<T::Error>> {
        self.device
            .field(reg::RES, field::RESOLUTION)?
            .write(resolution as u32)
    }

    /// Whether the sensor is in low-power shutdown
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn shutdown(&mut self) -> Result<bool, Error<T::Error>> {
        Ok(self.device.field(reg::CONFIG, field::SHDN)?.read()? != 0)
    }

    /// Enter or leave shutdown; conversions stop while shut down
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn set_shutdown(&mut self, shutdown: bool) -> Result<(), Error<T::Error>> {
        self.device
            .field(reg::CONFIG, field::SHDN)?
            .write(u32::from(shutdown))
    }

    /// Manufacturer ID, [`MANUFACTURER_ID`] for a genuine part
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn manufacturer_id(&mut self) -> Result<u16, Error<T::Error>> {
        let raw = self.device.register(reg::MFTR_ID)?.read()?;
        Ok(raw as u16)
    }

    /// Device ID (high byte) and revision (low byte)
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn device_id(&mut self) -> Result<u16, Error<T::Error>> {
        let raw = self.device.register(reg::DEV_ID)?.read()?;
        Ok(raw as u16)
    }
}

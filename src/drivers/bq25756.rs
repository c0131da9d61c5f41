//! BQ25756 buck-boost battery charge controller
//!
//! The BQ25756 charges Li-Ion, Li-polymer and LiFePO4 cells over a wide input
//! range with bidirectional power flow. It answers at address 0x6B; registers
//! outside the map read back 0xFF. Multi-byte registers are little-endian.
//!
//! # Example
//!
//! ```ignore
//! let mut charger = Bq25756::new(I2cInterface::new(i2c))?;
//! charger.set_voltage_limit(1536)?;
//! assert_eq!(charger.voltage_limit()?, 1536);
//! ```

use embedded_hal::i2c::SevenBitAddress;

use crate::device::{ByteOrder, Device};
use crate::field::FieldDef;
use crate::helpers::{check_range, Affine};
use crate::interface::Transport;
use crate::register::RegisterDef;
use crate::Error;

/// Default I2C address
pub const DEFAULT_ADDRESS: SevenBitAddress = 0x6B;

/// Lowest supported I2C clock
pub const I2C_MIN_FREQ_HZ: u32 = 100_000;

/// Highest supported I2C clock (fast mode plus)
pub const I2C_MAX_FREQ_HZ: u32 = 1_000_000;

/// Register names
pub mod reg {
    /// Charge voltage limit
    pub const CHARGE_VOLT_LIMIT: &str = "CHARGE_VOLT_LIMIT";
    /// Charge current limit
    pub const CHARGE_CURR_LIMIT: &str = "CHARGE_CURR_LIMIT";
    /// Input current limit
    pub const INPUT_CURR_LIMIT: &str = "INPUT_CURR_LIMIT";
    /// Input voltage limit
    pub const INPUT_VOLT_LIMIT: &str = "INPUT_VOLT_LIMIT";
    /// Precharge current limit
    pub const PRECHG_CURR_LIMIT: &str = "PRECHG_CURR_LIMIT";
    /// Termination current limit
    pub const TERM_CURR_LIMIT: &str = "TERM_CURR_LIMIT";
    /// Part information
    pub const PART_INFO: &str = "PART_INFO";
}

/// Field names
pub mod field {
    /// FB voltage regulation limit
    pub const VFB_REG: &str = "VFB_REG";
    /// Fast charge current regulation limit
    pub const ICHG_REG: &str = "ICHG_REG";
    /// Input current DPM limit
    pub const IAC_DPM: &str = "IAC_DPM";
    /// Input voltage DPM limit
    pub const VAC_DPM: &str = "VAC_DPM";
    /// Precharge current regulation limit
    pub const PRECHG_REG: &str = "PRECHG_REG";
    /// Termination current regulation limit
    pub const ITERM_REG: &str = "ITERM_REG";
}

#[rustfmt::skip]
const REGISTERS: [RegisterDef; 42] = [
    RegisterDef::new(reg::CHARGE_VOLT_LIMIT, 0x00).width(16).description("Charge Voltage limit register."),
    RegisterDef::new(reg::CHARGE_CURR_LIMIT, 0x02).width(16).description("Charge Current limit register."),
    RegisterDef::new(reg::INPUT_CURR_LIMIT, 0x06).width(16).description("Input Current limit register."),
    RegisterDef::new(reg::INPUT_VOLT_LIMIT, 0x08).width(16).description("Input Voltage limit register."),
    RegisterDef::new("REV_MODE_IN_CURR", 0x0A).width(16).description("Reverse Mode Input Current Limit register."),
    RegisterDef::new("REV_MODE_IN_VOLT", 0x0C).width(16).description("Reverse Mode Input Voltage Limit register."),
    RegisterDef::new(reg::PRECHG_CURR_LIMIT, 0x10).width(16).description("Precharge Current limit register."),
    RegisterDef::new(reg::TERM_CURR_LIMIT, 0x12).width(16).description("Termination Current limit register."),
    RegisterDef::new("PRECHG_TERM_CTRL", 0x14).description("Precharge and Termination Control register."),
    RegisterDef::new("TIMER_CTRL", 0x15).description("Timer Control register."),
    RegisterDef::new("THREE_STAGE_CHARGE_CTRL", 0x16).description("Three-Stage Charge Control register."),
    RegisterDef::new("CHARGER_CTRL", 0x17).description("Charger Control register."),
    RegisterDef::new("PIN_CTRL", 0x18).description("Pin Control register."),
    RegisterDef::new("PWR_PATH_CTRL", 0x19).description("Power Path and Reverse Mode Control register."),
    RegisterDef::new("MPPT_CTRL", 0x1A).description("MPPT Control register."),
    RegisterDef::new("TS_CHARGE_THRESH_CTRL", 0x1B).description("TS Charging Threshold Control register."),
    RegisterDef::new("TS_CHARGE_REGION_CTRL", 0x1C).description("TS Charging Region Behavior Control register."),
    RegisterDef::new("TS_CHARGE_MODE_CTRL", 0x1D).description("TS Charging Threshold Mode Control register."),
    RegisterDef::new("REV_UNDERVOLTAGE_CTRL", 0x1E).description("Reverse Undervoltage Control register."),
    RegisterDef::new("VAC_MPP_DETECT", 0x1F).description("VAC Max Power Point Detected register."),
    RegisterDef::new("CHARGER_STATUS_1", 0x21).read_only().description("Charger Status 1 register."),
    RegisterDef::new("CHARGER_STATUS_2", 0x22).read_only().description("Charger Status 2 register."),
    RegisterDef::new("CHARGER_STATUS_3", 0x23).read_only().description("Charger Status 3 register."),
    RegisterDef::new("FAULT_STATUS", 0x24).read_only().description("Fault Status register."),
    // Flags clear on read, so a verified write would always fail
    RegisterDef::new("CHARGER_FLAG_1", 0x25).read_only().description("Charger Flag 1 register."),
    RegisterDef::new("CHARGER_FLAG_2", 0x26).read_only().description("Charger Flag 2 register."),
    RegisterDef::new("FAULT_FLAG", 0x27).read_only().description("Fault Flag register."),
    RegisterDef::new("CHARGER_MASK_1", 0x28).description("Charger Mask 1 register."),
    RegisterDef::new("CHARGER_MASK_2", 0x29).description("Charger Mask 2 register."),
    RegisterDef::new("FAULT_MASK", 0x2A).description("Fault Mask register."),
    RegisterDef::new("ADC_CTRL", 0x2B).description("ADC Control register."),
    RegisterDef::new("ADC_CHAN_CTRL", 0x2C).description("ADC Channel Control register."),
    RegisterDef::new("IAC_ADC", 0x2D).width(16).read_only().description("IAC ADC register."),
    RegisterDef::new("IBAT_ADC", 0x2F).width(16).read_only().description("IBAT ADC register."),
    RegisterDef::new("VAC_ADC", 0x31).read_only().description("VAC ADC register."),
    RegisterDef::new("VBAT_ADC", 0x32).read_only().description("VBAT ADC register."),
    RegisterDef::new("TS_ADC", 0x37).width(16).read_only().description("TS ADC register."),
    RegisterDef::new("VFB_ADC", 0x39).width(16).read_only().description("VFB ADC register."),
    RegisterDef::new("GD_STR_CTRL", 0x3B).description("Gate Driver Strength Control register."),
    RegisterDef::new("GD_DT_CTRL", 0x3C).description("Gate Driver Dead Time Control register."),
    RegisterDef::new(reg::PART_INFO, 0x3D).read_only().description("Part Information register."),
    RegisterDef::new("REV_BAT_DISCH_CURR", 0x62).width(16).description("Reverse Mode Battery Discharge Current register."),
];

#[rustfmt::skip]
const FIELDS: [(&str, FieldDef); 6] = [
    (reg::CHARGE_VOLT_LIMIT, FieldDef::new(field::VFB_REG, 0).width(5).description("FB Voltage Regulation Limit")),
    (reg::CHARGE_CURR_LIMIT, FieldDef::new(field::ICHG_REG, 2).width(9).description("Fast Charge Current Regulation Limit")),
    (reg::INPUT_CURR_LIMIT, FieldDef::new(field::IAC_DPM, 2).width(9).description("Input Current DPM Limit")),
    (reg::INPUT_VOLT_LIMIT, FieldDef::new(field::VAC_DPM, 2).width(12).description("Input Voltage DPM Limit")),
    (reg::PRECHG_CURR_LIMIT, FieldDef::new(field::PRECHG_REG, 2).width(8).description("Precharge Current Regulation Limit")),
    (reg::TERM_CURR_LIMIT, FieldDef::new(field::ITERM_REG, 2).width(8).description("Termination Current Regulation Limit")),
];

/// A field holding a limit in engineering units
struct Limit {
    register: &'static str,
    field: &'static str,
    conversion: Affine,
    min: i64,
    max: i64,
}

/// 2 mV steps above 1.504 V
const VOLTAGE_LIMIT: Limit = Limit {
    register: reg::CHARGE_VOLT_LIMIT,
    field: field::VFB_REG,
    conversion: Affine::new(2, 1504),
    min: 1504,
    max: 1566,
};

const CURRENT_LIMIT: Limit = Limit {
    register: reg::CHARGE_CURR_LIMIT,
    field: field::ICHG_REG,
    conversion: Affine::new(50, 0),
    min: 400,
    max: 20_000,
};

const INPUT_CURRENT_LIMIT: Limit = Limit {
    register: reg::INPUT_CURR_LIMIT,
    field: field::IAC_DPM,
    conversion: Affine::new(50, 0),
    min: 400,
    max: 20_000,
};

const INPUT_VOLTAGE_LIMIT: Limit = Limit {
    register: reg::INPUT_VOLT_LIMIT,
    field: field::VAC_DPM,
    conversion: Affine::new(20, 0),
    min: 4200,
    max: 65_000,
};

const PRECHARGE_CURRENT_LIMIT: Limit = Limit {
    register: reg::PRECHG_CURR_LIMIT,
    field: field::PRECHG_REG,
    conversion: Affine::new(50, 0),
    min: 250,
    max: 10_000,
};

const TERMINATION_CURRENT_LIMIT: Limit = Limit {
    register: reg::TERM_CURR_LIMIT,
    field: field::ITERM_REG,
    conversion: Affine::new(50, 0),
    min: 250,
    max: 10_000,
};

/// BQ25756 driver
pub struct Bq25756<T> {
    device: Device<T>,
}

impl<T: Transport> Bq25756<T> {
    /// Create a driver at the default address
    ///
    /// No bus traffic happens during construction.
    ///
    /// # Errors
    ///
    /// Only fails if the register table is inconsistent.
    pub fn new(transport: T) -> Result<Self, Error<T::Error>> {
        Self::with_address(transport, DEFAULT_ADDRESS)
    }

    /// Create a driver at a custom address
    ///
    /// # Errors
    ///
    /// Returns [`Error::Layout`] if `address` is not a 7-bit address.
    pub fn with_address(transport: T, address: SevenBitAddress) -> Result<Self, Error<T::Error>> {
        let mut device = Device::new("BQ25756", address, transport)?
            .with_description("Buck-boost battery charge controller")
            .with_byte_order(ByteOrder::LittleEndian);

        for def in REGISTERS {
            device.add_register(def)?;
        }
        for (register, def) in FIELDS {
            device.add_field(register, def)?;
        }

        #[cfg(feature = "defmt")]
        defmt::debug!("BQ25756 at 0x{:02X}: {} registers", address, REGISTERS.len());

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

    fn limit(&mut self, limit: &Limit) -> Result<u32, Error<T::Error>> {
        let raw = self.device.field(limit.register, limit.field)?.read()?;
        let units = limit.conversion.to_units(raw);
        u32::try_from(units).map_err(|_| Error::TypeMismatch { value: units })
    }

    fn set_limit(&mut self, limit: &Limit, units: u32) -> Result<(), Error<T::Error>> {
        let units = i64::from(units);
        check_range::<T::Error>(Some(units), limit.min, limit.max)?;
        let raw = limit.conversion.to_raw::<T::Error>(units)?;
        self.device.field(limit.register, limit.field)?.write(raw)
    }

    /// Charge voltage (FB regulation) limit in mV
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn voltage_limit(&mut self) -> Result<u32, Error<T::Error>> {
        self.limit(&VOLTAGE_LIMIT)
    }

    /// Set the charge voltage (FB regulation) limit in mV, 1504..=1566 in 2 mV steps
    ///
    /// # Errors
    ///
    /// Returns [`Error::Range`] outside the supported range, or a bus error.
    pub fn set_voltage_limit(&mut self, millivolts: u32) -> Result<(), Error<T::Error>> {
        self.set_limit(&VOLTAGE_LIMIT, millivolts)
    }

    /// Fast charge current limit in mA
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn current_limit(&mut self) -> Result<u32, Error<T::Error>> {
        self.limit(&CURRENT_LIMIT)
    }

    /// Set the fast charge current limit in mA, 400..=20000 in 50 mA steps
    ///
    /// # Errors
    ///
    /// Returns [`Error::Range`] outside the supported range, or a bus error.
    pub fn set_current_limit(&mut self, milliamps: u32) -> Result<(), Error<T::Error>> {
        self.set_limit(&CURRENT_LIMIT, milliamps)
    }

    /// Input current limit in mA
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn input_current_limit(&mut self) -> Result<u32, Error<T::Error>> {
        self.limit(&INPUT_CURRENT_LIMIT)
    }

    /// Set the input current limit in mA, 400..=20000 in 50 mA steps
    ///
    /// # Errors
    ///
    /// Returns [`Error::Range`] outside the supported range, or a bus error.
    pub fn set_input_current_limit(&mut self, milliamps: u32) -> Result<(), Error<T::Error>> {
        self.set_limit(&INPUT_CURRENT_LIMIT, milliamps)
    }

    /// Input voltage limit in mV
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn input_voltage_limit(&mut self) -> Result<u32, Error<T::Error>> {
        self.limit(&INPUT_VOLTAGE_LIMIT)
    }

    /// Set the input voltage limit in mV, 4200..=65000 in 20 mV steps
    ///
    /// # Errors
    ///
    /// Returns [`Error::Range`] outside the supported range, or a bus error.
    pub fn set_input_voltage_limit(&mut self, millivolts: u32) -> Result<(), Error<T::Error>> {
        self.set_limit(&INPUT_VOLTAGE_LIMIT, millivolts)
    }

    /// Precharge current limit in mA
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn precharge_current_limit(&mut self) -> Result<u32, Error<T::Error>> {
        self.limit(&PRECHARGE_CURRENT_LIMIT)
    }

    /// Set the precharge current limit in mA, 250..=10000 in 50 mA steps
    ///
    /// # Errors
    ///
    /// Returns [`Error::Range`] outside the supported range, or a bus error.
    pub fn set_precharge_current_limit(&mut self, milliamps: u32) -> Result<(), Error<T::Error>> {
        self.set_limit(&PRECHARGE_CURRENT_LIMIT, milliamps)
    }

    /// Termination current limit in mA
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn termination_current_limit(&mut self) -> Result<u32, Error<T::Error>> {
        self.limit(&TERMINATION_CURRENT_LIMIT)
    }

    /// Set the termination current limit in mA, 250..=10000 in 50 mA steps
    ///
    /// # Errors
    ///
    /// Returns [`Error::Range`] outside the supported range, or a bus error.
    pub fn set_termination_current_limit(&mut self, milliamps: u32) -> Result<(), Error<T::Error>> {
        self.set_limit(&TERMINATION_CURRENT_LIMIT, milliamps)
    }

    /// Raw PART_INFO register (part number and revision)
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn part_info(&mut self) -> Result<u8, Error<T::Error>> {
        let value = self.device.register(reg::PART_INFO)?.read()?;
        // 8-bit register, masked on read
        Ok(value as u8)
    }
}

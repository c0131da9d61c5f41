//! HD44780 dot-matrix character LCD controller in 4-bit mode
//!
//! The controller is reached through an [`LcdBus`]: a PCF8574 I2C backpack
//! ([`Pcf8574Backpack`]) or four GPIO data lines ([`ParallelBus`]).
//!
//! # Example
//!
//! ```ignore
//! use core::fmt::Write;
//!
//! let backpack = Pcf8574Backpack::new(I2cInterface::new(i2c))?;
//! let mut lcd = Hd44780::new(backpack, delay, LcdConfig::default())?;
//! lcd.putstr("Hello World!\n")?;
//! write!(lcd, "{}{}C", 21, DEGREE)?;
//! ```

mod bus;

pub use bus::{LcdBus, Mode, ParallelBus, Pcf8574Backpack, PCF8574_DEFAULT_ADDRESS};

use embedded_hal::delay::DelayNs;

use crate::helpers::check_range;
use crate::Error;

/// Degree sign in the A00 character ROM
pub const DEGREE: char = '\u{DF}';

/// Clear display
const LCD_CLR: u8 = 0x01;
/// Return home
const LCD_HOME: u8 = 0x02;

const LCD_ENTRY_MODE: u8 = 0x04;
const LCD_ENTRY_INC: u8 = 0x02;

const LCD_ON_CTRL: u8 = 0x08;
const LCD_ON_DISPLAY: u8 = 0x04;
const LCD_ON_CURSOR: u8 = 0x02;
const LCD_ON_BLINK: u8 = 0x01;

const LCD_FUNCTION: u8 = 0x20;
const LCD_FUNCTION_2LINES: u8 = 0x08;
/// Upper nibble of a function set with DL=1, sent three times to reset
const LCD_FUNCTION_RESET: u8 = 0x30;

/// Set CGRAM address
const LCD_CGRAM: u8 = 0x40;
/// Set DDRAM address
const LCD_DDRAM: u8 = 0x80;

/// Display geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LcdConfig {
    /// Number of lines, 1..=4
    pub rows: u8,
    /// Characters per line, 8..=40
    pub columns: u8,
}

impl LcdConfig {
    /// Create a configuration
    #[must_use]
    pub const fn new(rows: u8, columns: u8) -> Self {
        Self { rows, columns }
    }

    fn validate<E>(&self) -> Result<(), Error<E>> {
        check_range::<E>(Some(i64::from(self.rows)), 1, 4)?;
        check_range(Some(i64::from(self.columns)), 8, 40)
    }
}

impl Default for LcdConfig {
    /// 2x16, the common module size
    fn default() -> Self {
        Self::new(2, 16)
    }
}

/// HD44780 driver
pub struct Hd44780<B, D> {
    bus: B,
    delay: D,
    config: LcdConfig,
    cursor_x: u8,
    cursor_y: u8,
    implied_newline: bool,
}

impl<B: LcdBus, D: DelayNs> Hd44780<B, D> {
    /// Validate the geometry and run the initialization sequence
    ///
    /// The display ends up cleared and on, with the cursor hidden, the
    /// backlight on and the address counter incrementing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Range`] for an unsupported geometry (before any bus
    /// traffic), or a bus error.
    pub fn new(bus: B, delay: D, config: LcdConfig) -> Result<Self, Error<B::Error>> {
        config.validate::<B::Error>()?;

        let mut lcd = Self {
            bus,
            delay,
            config,
            cursor_x: 0,
            cursor_y: 0,
            implied_newline: false,
        };
        lcd.init()?;

        #[cfg(feature = "defmt")]
        defmt::debug!("HD44780 {}x{} ready", config.columns, config.rows);

        Ok(lcd)
    }

    fn init(&mut self) -> Result<(), Error<B::Error>> {
        self.bus.set_backlight(false)?;
        self.delay.delay_ms(20);

        // Initializing by instruction: the controller may be in 8-bit mode or
        // halfway through a 4-bit transfer
        self.write_init_nibble(LCD_FUNCTION_RESET)?;
        self.delay.delay_ms(5);
        self.write_init_nibble(LCD_FUNCTION_RESET)?;
        self.delay.delay_us(100);
        self.write_init_nibble(LCD_FUNCTION_RESET)?;
        self.write_init_nibble(LCD_FUNCTION)?;

        let mut function = LCD_FUNCTION;
        if self.config.rows > 1 {
            function |= LCD_FUNCTION_2LINES;
        }
        self.write_command(function)?;

        self.display_off()?;
        self.backlight_on()?;
        self.clear()?;
        self.write_command(LCD_ENTRY_MODE | LCD_ENTRY_INC)?;
        self.hide_cursor()
    }

    /// Consume the driver and return the bus and delay
    pub fn release(self) -> (B, D) {
        (self.bus, self.delay)
    }

    /// Display geometry
    #[must_use]
    pub fn config(&self) -> LcdConfig {
        self.config
    }

    /// Current cursor position as (column, row)
    #[must_use]
    pub fn cursor(&self) -> (u8, u8) {
        (self.cursor_x, self.cursor_y)
    }

    fn write_init_nibble(&mut self, nibble: u8) -> Result<(), Error<B::Error>> {
        self.bus.write_nibble(nibble >> 4, Mode::Command, &mut self.delay)
    }

    fn write_byte(&mut self, byte: u8, mode: Mode) -> Result<(), Error<B::Error>> {
        self.bus.write_nibble(byte >> 4, mode, &mut self.delay)?;
        self.bus.write_nibble(byte & 0x0F, mode, &mut self.delay)
    }

    /// Send a raw instruction
    ///
    /// # Errors
    ///
    /// Returns an error if the bus transfer fails.
    pub fn write_command(&mut self, command: u8) -> Result<(), Error<B::Error>> {
        self.write_byte(command, Mode::Command)
    }

    /// Send a raw data byte (character code or CGRAM row)
    ///
    /// # Errors
    ///
    /// Returns an error if the bus transfer fails.
    pub fn write_data(&mut self, data: u8) -> Result<(), Error<B::Error>> {
        self.write_byte(data, Mode::Data)
    }

    /// Clear the display and move the cursor to the top left corner
    ///
    /// # Errors
    ///
    /// Returns an error if the bus transfer fails.
    pub fn clear(&mut self) -> Result<(), Error<B::Error>> {
        self.write_command(LCD_CLR)?;
        self.delay.delay_ms(5);
        self.home()
    }

    /// Move the cursor to the top left corner without clearing
    ///
    /// # Errors
    ///
    /// Returns an error if the bus transfer fails.
    pub fn home(&mut self) -> Result<(), Error<B::Error>> {
        self.write_command(LCD_HOME)?;
        self.delay.delay_ms(5);
        self.cursor_x = 0;
        self.cursor_y = 0;
        self.implied_newline = false;
        Ok(())
    }

    /// Unblank the display
    ///
    /// # Errors
    ///
    /// Returns an error if the bus transfer fails.
    pub fn display_on(&mut self) -> Result<(), Error<B::Error>> {
        self.write_command(LCD_ON_CTRL | LCD_ON_DISPLAY)
    }

    /// Blank the display; DDRAM is kept
    ///
    /// # Errors
    ///
    /// Returns an error if the bus transfer fails.
    pub fn display_off(&mut self) -> Result<(), Error<B::Error>> {
        self.write_command(LCD_ON_CTRL)
    }

    /// Show an underline cursor
    ///
    /// # Errors
    ///
    /// Returns an error if the bus transfer fails.
    pub fn show_cursor(&mut self) -> Result<(), Error<B::Error>> {
        self.write_command(LCD_ON_CTRL | LCD_ON_DISPLAY | LCD_ON_CURSOR)
    }

    /// Hide the cursor
    ///
    /// # Errors
    ///
    /// Returns an error if the bus transfer fails.
    pub fn hide_cursor(&mut self) -> Result<(), Error<B::Error>> {
        self.write_command(LCD_ON_CTRL | LCD_ON_DISPLAY)
    }

    /// Show a blinking block cursor
    ///
    /// # Errors
    ///
    /// Returns an error if the bus transfer fails.
    pub fn blink_cursor_on(&mut self) -> Result<(), Error<B::Error>> {
        self.write_command(LCD_ON_CTRL | LCD_ON_DISPLAY | LCD_ON_CURSOR | LCD_ON_BLINK)
    }

    /// Show a solid cursor
    ///
    /// # Errors
    ///
    /// Returns an error if the bus transfer fails.
    pub fn blink_cursor_off(&mut self) -> Result<(), Error<B::Error>> {
        self.show_cursor()
    }

    /// Turn the backlight on
    ///
    /// # Errors
    ///
    /// Returns an error if the bus transfer fails.
    pub fn backlight_on(&mut self) -> Result<(), Error<B::Error>> {
        self.bus.set_backlight(true)
    }

    /// Turn the backlight off
    ///
    /// # Errors
    ///
    /// Returns an error if the bus transfer fails.
    pub fn backlight_off(&mut self) -> Result<(), Error<B::Error>> {
        self.bus.set_backlight(false)
    }

    /// Move the cursor to a zero-based (column, row) position
    ///
    /// Rows 1 and 3 start at DDRAM 0x40; rows 2 and 3 continue rows 0 and 1
    /// after `columns` characters.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Range`] if the position is off the display (before any
    /// bus traffic), or an error if the bus transfer fails.
    pub fn move_to(&mut self, x: u8, y: u8) -> Result<(), Error<B::Error>> {
        check_range::<B::Error>(Some(i64::from(x)), 0, i64::from(self.config.columns) - 1)?;
        check_range::<B::Error>(Some(i64::from(y)), 0, i64::from(self.config.rows) - 1)?;

        self.cursor_x = x;
        self.cursor_y = y;

        let mut addr = x & 0x3F;
        if y & 1 != 0 {
            addr += 0x40;
        }
        if y & 2 != 0 {
            addr += self.config.columns;
        }

        self.write_command(LCD_DDRAM | addr)
    }

    /// Write a character at the cursor and advance it
    ///
    /// The cursor wraps to the next line at the end of a row and back to the
    /// top after the last row. A `'\n'` moves to the start of the next line,
    /// unless it directly follows a wrap. Characters outside 0..=255 are shown
    /// as `'?'`.
    ///
    /// # Errors
    ///
    /// Returns an error if the bus transfer fails.
    pub fn putchar(&mut self, c: char) -> Result<(), Error<B::Error>> {
        if c == '\n' {
            if self.implied_newline {
                self.implied_newline = false;
            } else {
                self.cursor_x = self.config.columns;
            }
        } else {
            self.write_data(u8::try_from(c).unwrap_or(b'?'))?;
            self.cursor_x += 1;
            self.implied_newline = false;
        }

        if self.cursor_x >= self.config.columns {
            self.cursor_x = 0;
            self.cursor_y += 1;
            self.implied_newline = c != '\n';
        }
        if self.cursor_y >= self.config.rows {
            self.cursor_y = 0;
        }

        self.move_to(self.cursor_x, self.cursor_y)
    }

    /// Write a string at the cursor
    ///
    /// # Errors
    ///
    /// Returns an error if the bus transfer fails.
    pub fn putstr(&mut self, s: &str) -> Result<(), Error<B::Error>> {
        s.chars().try_for_each(|c| self.putchar(c))
    }

    /// Store a 5x8 glyph in CGRAM location 0..=7
    ///
    /// The glyph is then printed with `char::from(location)`. The cursor is
    /// restored afterwards.
    ///
    /// # Errors
    ///
    /// Returns an error if the bus transfer fails.
    pub fn custom_char(&mut self, location: u8, charmap: &[u8; 8]) -> Result<(), Error<B::Error>> {
        self.write_command(LCD_CGRAM | ((location & 0x07) << 3))?;
        self.delay.delay_us(40);
        for &row in charmap {
            self.write_data(row)?;
            self.delay.delay_us(40);
        }
        self.move_to(self.cursor_x, self.cursor_y)
    }
}

impl<B: LcdBus, D: DelayNs> core::fmt::Write for Hd44780<B, D> {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        self.putstr(s).map_err(|_| core::fmt::Error)
    }
}

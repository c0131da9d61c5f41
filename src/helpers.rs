//! Validation and bit-manipulation helpers shared by the framework and drivers
//!
//! The checks run before any bus traffic, so a failed check never touches the
//! device.

use crate::Error;

/// Check that an optional value is representable as `T`
///
/// `None` passes through unchanged.
///
/// # Errors
///
/// Returns [`Error::TypeMismatch`] if the value does not fit in `T`.
pub fn check_type<T, E>(value: Option<i64>) -> Result<Option<T>, Error<E>>
where
    T: TryFrom<i64>,
{
    value
        .map(|v| T::try_from(v).map_err(|_| Error::TypeMismatch { value: v }))
        .transpose()
}

/// Check that an optional value lies within `[min, max]`
///
/// `None` passes.
///
/// # Errors
///
/// Returns [`Error::Range`] if the value is below `min` or above `max`.
pub fn check_range<E>(value: Option<i64>, min: i64, max: i64) -> Result<(), Error<E>> {
    match value {
        Some(value) if value < min || value > max => Err(Error::Range { value, min, max }),
        _ => Ok(()),
    }
}

/// Merge `modify_data` into `read_data` on the bits selected by `mask`
///
/// Bits outside the mask keep their value from `read_data`.
#[must_use]
pub const fn read_modify(read_data: u32, modify_data: u32, mask: u32) -> u32 {
    (read_data & !mask) | (modify_data & mask)
}

/// Mask covering the lowest `width_bits` bits
#[must_use]
pub const fn field_mask(width_bits: u8) -> u32 {
    if width_bits >= 32 {
        u32::MAX
    } else {
        (1u32 << width_bits) - 1
    }
}

/// Linear conversion between a raw field value and engineering units
///
/// `units = raw * scale + offset`. The inverse truncates toward zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Affine {
    /// Units per LSB
    pub scale: i64,
    /// Units at raw value zero
    pub offset: i64,
}

impl Affine {
    /// Create a conversion with the given step and offset
    #[must_use]
    pub const fn new(scale: i64, offset: i64) -> Self {
        Self { scale, offset }
    }

    /// Convert a raw field value to engineering units
    #[must_use]
    pub const fn to_units(&self, raw: u32) -> i64 {
        raw as i64 * self.scale + self.offset
    }

    /// Convert engineering units to a raw field value
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeMismatch`] if the result is negative, does not
    /// fit in a `u32`, or cannot be computed (zero `scale`, overflow).
    pub fn to_raw<E>(&self, units: i64) -> Result<u32, Error<E>> {
        let raw = units
            .checked_sub(self.offset)
            .and_then(|delta| delta.checked_div(self.scale))
            .ok_or(Error::TypeMismatch { value: units })?;
        u32::try_from(raw).map_err(|_| Error::TypeMismatch { value: raw })
    }
}

//! Read/write permissions for registers and fields
//!
//! Every register and every field carries its own [`Permission`]. A read on a
//! write-only target, or a write on a read-only target, is refused before any
//! bus traffic happens.

use core::fmt;

/// Access capability of a register or field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Permission {
    /// Can only be read (`R`)
    ReadOnly,
    /// Can only be written (`W`)
    WriteOnly,
    /// Can be read and written (`R/W`)
    #[default]
    ReadWrite,
}

/// Kind of access requested on a target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Access {
    /// Read access
    Read,
    /// Write access
    Write,
}

impl Permission {
    /// Whether the target can be read
    #[must_use]
    pub const fn is_readable(self) -> bool {
        matches!(self, Self::ReadOnly | Self::ReadWrite)
    }

    /// Whether the target can be written
    #[must_use]
    pub const fn is_writable(self) -> bool {
        matches!(self, Self::WriteOnly | Self::ReadWrite)
    }

    /// Whether the given access is allowed
    #[must_use]
    pub const fn allows(self, access: Access) -> bool {
        match access {
            Access::Read => self.is_readable(),
            Access::Write => self.is_writable(),
        }
    }

    /// Whether every access granted by `self` is also granted by `other`
    #[must_use]
    pub const fn is_subset_of(self, other: Self) -> bool {
        (!self.is_readable() || other.is_readable()) && (!self.is_writable() || other.is_writable())
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ReadOnly => "R",
            Self::WriteOnly => "W",
            Self::ReadWrite => "R/W",
        })
    }
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Read => "read",
            Self::Write => "write",
        })
    }
}

//! Device drivers built on the register-map framework
//!
//! Each driver holds a [`Device`](crate::Device), fills its register map at
//! construction and exposes accessors in engineering units. Accessors come in
//! pairs: `x()` reads and converts, `set_x(value)` range-checks, converts and
//! writes the underlying field.

pub mod bq25756;
pub mod hd44780;
pub mod mcp9808;

//! Const-generic binary fixed-point numbers
//!
//! [`Fixed<P, S>`] stores a real number as a native integer `S` scaled by
//! `2^P`. Any signed or unsigned primitive integer can be the storage, and
//! any number of fractional bits below its width can be chosen.
//!
//! - **Fixed16** (`Fixed<16, i32>`): range ±32768, resolution 1/65536
//! - **Fixed<8, u16>**: range 0 to 256, resolution 1/256
//! - **Fixed<64, i128>**: range ±2^63, resolution 2^-64
//!
//! ## Features
//!
//! - **Mixed operands**: arithmetic and comparison with native integers,
//!   floats, and other `Fixed` instantiations
//! - **Overflow-aware multiply**: a wider intermediate when the storage has
//!   one, a four-part decomposition when it doesn't
//! - **Exact formatting**: `Display` prints the full decimal expansion and
//!   `FromStr` reads it back
//! - **Identity hashing**: hash by raw value, with [`BuildIdentityHasher`]
//!   for hash maps
//! - **no_std compatible**, with optional serde support
//!
//! All arithmetic wraps on overflow. Division by zero panics like the
//! native integer division it is built on.
//!
//! ## Example
//!
//! ```rust
//! use fixpoint::{Fixed, Fixed16};
//!
//! let price: Fixed16 = "25.5".parse().unwrap();
//! let total = price * 4i32;
//! assert_eq!(total, 102);
//!
//! // mixing instantiations converts the right operand first
//! let coarse = Fixed::<4, i8>::from(1.5);
//! assert_eq!(price * coarse, 38.25);
//! assert_eq!(total.to_string(), "102");
//! ```

#![no_std]
#![cfg_attr(test, allow(unused_imports))]

#[cfg(test)]
extern crate std;

mod fixed;
mod hash;
mod mask;
mod storage;

pub use fixed::{Fixed, Fixed16, FixedPoint};
pub use hash::{BuildIdentityHasher, IdentityHasher};
pub use mask::{mask_high, mask_low};
pub use storage::{Storage, Widen};

use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseFixedError {
    #[error("cannot parse a fixed-point number from an empty string")]
    Empty,

    #[error("invalid digit in fixed-point string")]
    InvalidDigit,

    #[error("negative value for unsigned storage")]
    NegativeUnsigned,
}

pub type Result<T> = core::result::Result<T, ParseFixedError>;

//! A `Constant` holds a single signed value of a fixed width.
//!
//! Widths run from 1 to 64 bits. Values are stored sign-extended to 64 bits,
//! after being wrapped into the width.

use crate::il::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The smallest signed value representable in `bits` bits.
pub fn min_value(bits: usize) -> i64 {
    if bits >= 64 {
        i64::MIN
    } else {
        -(1i64 << (bits - 1))
    }
}

/// The largest signed value representable in `bits` bits.
pub fn max_value(bits: usize) -> i64 {
    if bits >= 64 {
        i64::MAX
    } else {
        (1i64 << (bits - 1)) - 1
    }
}

/// Wrap `value` into the two's complement range of `bits` bits.
pub fn wrap(value: i128, bits: usize) -> i64 {
    let modulus = 1i128 << bits;
    let value = value.rem_euclid(modulus);
    if value > max_value(bits) as i128 {
        (value - modulus) as i64
    } else {
        value as i64
    }
}

/// Returns true if `bits` is a width slots and constants may have.
pub fn valid_bits(bits: usize) -> bool {
    (1..=64).contains(&bits)
}

/// A constant value
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Constant {
    value: i64,
    bits: usize,
}

impl Constant {
    /// Create a new `Constant` with the given value and bitness.
    ///
    /// Values outside the range of `bits` are wrapped into it.
    pub fn new(value: i64, bits: usize) -> Constant {
        let value = if valid_bits(bits) {
            wrap(value as i128, bits)
        } else {
            value
        };
        Constant { value, bits }
    }

    /// Get the value of this `Constant`.
    pub fn value(&self) -> i64 {
        self.value
    }

    /// Get the number of bits for this `Constant`.
    pub fn bits(&self) -> usize {
        self.bits
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.value, self.bits)
    }
}

impl From<Constant> for Operand {
    fn from(constant: Constant) -> Operand {
        Operand::Constant(constant)
    }
}

use crate::il::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An input to an `Operation`: either a `Slot` or a `Constant`.
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Operand {
    Slot(Slot),
    Constant(Constant),
}

impl Operand {
    /// The width of this operand in bits.
    pub fn bits(&self) -> usize {
        match self {
            Operand::Slot(slot) => slot.bits(),
            Operand::Constant(constant) => constant.bits(),
        }
    }

    /// Returns the slot if this operand is a slot.
    pub fn slot(&self) -> Option<&Slot> {
        match self {
            Operand::Slot(slot) => Some(slot),
            Operand::Constant(_) => None,
        }
    }

    /// Returns the constant if this operand is a constant.
    pub fn constant(&self) -> Option<&Constant> {
        match self {
            Operand::Slot(_) => None,
            Operand::Constant(constant) => Some(constant),
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Operand::Slot(slot) => slot.fmt(f),
            Operand::Constant(constant) => constant.fmt(f),
        }
    }
}

use crate::il::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A named integer variable slot of a procedure.
///
/// Two slots are the same slot when both their names and their widths match.
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Slot {
    name: String,
    bits: usize,
}

impl Slot {
    pub fn new<S>(name: S, bits: usize) -> Slot
    where
        S: Into<String>,
    {
        Slot {
            name: name.into(),
            bits,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bits(&self) -> usize {
        self.bits
    }

    /// An identifier uniquely identifies the slot in the form `<name>:<bits>`
    pub fn identifier(&self) -> String {
        format!("{}:{}", self.name, self.bits)
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.identifier())
    }
}

impl From<Slot> for Operand {
    fn from(slot: Slot) -> Operand {
        Operand::Slot(slot)
    }
}

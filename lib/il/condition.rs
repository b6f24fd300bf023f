//! Signed comparisons guarding `Branch` operations.

use crate::il::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A signed integer comparison.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Comparison {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Comparison {
    /// The comparison that holds exactly when this one does not.
    pub fn negate(&self) -> Comparison {
        match self {
            Comparison::Eq => Comparison::Ne,
            Comparison::Ne => Comparison::Eq,
            Comparison::Lt => Comparison::Ge,
            Comparison::Le => Comparison::Gt,
            Comparison::Gt => Comparison::Le,
            Comparison::Ge => Comparison::Lt,
        }
    }

    /// The comparison with its operands exchanged, so `a < b` becomes `b > a`.
    pub fn swap(&self) -> Comparison {
        match self {
            Comparison::Eq => Comparison::Eq,
            Comparison::Ne => Comparison::Ne,
            Comparison::Lt => Comparison::Gt,
            Comparison::Le => Comparison::Ge,
            Comparison::Gt => Comparison::Lt,
            Comparison::Ge => Comparison::Le,
        }
    }

    /// Whether the comparison holds when both operands hold the same value.
    pub fn reflexive(&self) -> bool {
        matches!(self, Comparison::Eq | Comparison::Le | Comparison::Ge)
    }

    /// Evaluate this comparison over two concrete values.
    pub fn holds(&self, lhs: i64, rhs: i64) -> bool {
        match self {
            Comparison::Eq => lhs == rhs,
            Comparison::Ne => lhs != rhs,
            Comparison::Lt => lhs < rhs,
            Comparison::Le => lhs <= rhs,
            Comparison::Gt => lhs > rhs,
            Comparison::Ge => lhs >= rhs,
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let symbol = match self {
            Comparison::Eq => "==",
            Comparison::Ne => "!=",
            Comparison::Lt => "<",
            Comparison::Le => "<=",
            Comparison::Gt => ">",
            Comparison::Ge => ">=",
        };
        write!(f, "{}", symbol)
    }
}

/// A comparison between two operands of the same width.
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Condition {
    comparison: Comparison,
    lhs: Operand,
    rhs: Operand,
}

impl Condition {
    pub fn new(comparison: Comparison, lhs: Operand, rhs: Operand) -> Condition {
        Condition {
            comparison,
            lhs,
            rhs,
        }
    }

    pub fn eq(lhs: Operand, rhs: Operand) -> Condition {
        Condition::new(Comparison::Eq, lhs, rhs)
    }

    pub fn ne(lhs: Operand, rhs: Operand) -> Condition {
        Condition::new(Comparison::Ne, lhs, rhs)
    }

    pub fn lt(lhs: Operand, rhs: Operand) -> Condition {
        Condition::new(Comparison::Lt, lhs, rhs)
    }

    pub fn le(lhs: Operand, rhs: Operand) -> Condition {
        Condition::new(Comparison::Le, lhs, rhs)
    }

    pub fn gt(lhs: Operand, rhs: Operand) -> Condition {
        Condition::new(Comparison::Gt, lhs, rhs)
    }

    pub fn ge(lhs: Operand, rhs: Operand) -> Condition {
        Condition::new(Comparison::Ge, lhs, rhs)
    }

    pub fn comparison(&self) -> Comparison {
        self.comparison
    }

    pub fn lhs(&self) -> &Operand {
        &self.lhs
    }

    pub fn rhs(&self) -> &Operand {
        &self.rhs
    }

    /// The condition guarding the other edge of a branch.
    pub fn negate(&self) -> Condition {
        Condition::new(self.comparison.negate(), self.lhs.clone(), self.rhs.clone())
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {} {}", self.lhs, self.comparison, self.rhs)
    }
}

//! An `Operation` is the single effect of one program point.
//!
//! The set of operations is closed. Anything a front-end cannot express with
//! the other variants becomes `Operation::Unsupported`, which names the slots
//! it writes so the analysis can forget what it knew about them.

use crate::il::*;
use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum UnaryOperator {
    /// Two's complement negation.
    Neg,
    /// Bitwise complement.
    Not,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum BinaryOperator {
    Add,
    Sub,
    Mul,
    /// Signed division, truncating toward zero.
    Div,
    /// Signed remainder, taking the sign of the dividend.
    Rem,
    And,
    Or,
    Xor,
    Shl,
    /// Arithmetic shift right.
    Shr,
    /// Logical shift right.
    Ushr,
}

impl BinaryOperator {
    /// Shift amounts may have a different width than the shifted value.
    pub fn is_shift(&self) -> bool {
        matches!(
            self,
            BinaryOperator::Shl | BinaryOperator::Shr | BinaryOperator::Ushr
        )
    }
}

impl fmt::Display for UnaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            UnaryOperator::Neg => write!(f, "-"),
            UnaryOperator::Not => write!(f, "~"),
        }
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let symbol = match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Sub => "-",
            BinaryOperator::Mul => "*",
            BinaryOperator::Div => "/",
            BinaryOperator::Rem => "%",
            BinaryOperator::And => "&",
            BinaryOperator::Or => "|",
            BinaryOperator::Xor => "^",
            BinaryOperator::Shl => "<<",
            BinaryOperator::Shr => ">>",
            BinaryOperator::Ushr => ">>>",
        };
        write!(f, "{}", symbol)
    }
}

/// The effect of a program point.
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Operation {
    /// Load a constant into a slot.
    Const { dst: Slot, constant: Constant },
    /// Copy one slot into another.
    Copy { dst: Slot, src: Slot },
    Unary {
        dst: Slot,
        operator: UnaryOperator,
        operand: Operand,
    },
    Binary {
        dst: Slot,
        operator: BinaryOperator,
        lhs: Operand,
        rhs: Operand,
    },
    /// Signed truncation or sign extension of `src` to the width of `dst`.
    Cast { dst: Slot, src: Operand },
    /// A two-way branch. Leaves through `BranchTrue` and `BranchFalse` edges.
    Branch { condition: Condition },
    /// A multi-way branch. Leaves through `SwitchCase` and `SwitchDefault`
    /// edges.
    Switch { scrutinee: Operand },
    /// Read an element of an array of `length` elements, when the length is
    /// known.
    ArrayLoad {
        dst: Slot,
        index: Operand,
        length: Option<Operand>,
    },
    /// Write an element of an array of `length` elements, when the length is
    /// known.
    ArrayStore {
        index: Operand,
        value: Operand,
        length: Option<Operand>,
    },
    Call {
        dst: Option<Slot>,
        target: String,
        arguments: Vec<Operand>,
    },
    Return { value: Option<Operand> },
    Nop,
    Unsupported { mnemonic: String, writes: Vec<Slot> },
}

impl Operation {
    pub fn constant(dst: Slot, constant: Constant) -> Operation {
        Operation::Const { dst, constant }
    }

    pub fn copy(dst: Slot, src: Slot) -> Operation {
        Operation::Copy { dst, src }
    }

    pub fn unary(dst: Slot, operator: UnaryOperator, operand: Operand) -> Operation {
        Operation::Unary {
            dst,
            operator,
            operand,
        }
    }

    pub fn neg(dst: Slot, operand: Operand) -> Operation {
        Operation::unary(dst, UnaryOperator::Neg, operand)
    }

    pub fn binary(dst: Slot, operator: BinaryOperator, lhs: Operand, rhs: Operand) -> Operation {
        Operation::Binary {
            dst,
            operator,
            lhs,
            rhs,
        }
    }

    pub fn add(dst: Slot, lhs: Operand, rhs: Operand) -> Operation {
        Operation::binary(dst, BinaryOperator::Add, lhs, rhs)
    }

    pub fn sub(dst: Slot, lhs: Operand, rhs: Operand) -> Operation {
        Operation::binary(dst, BinaryOperator::Sub, lhs, rhs)
    }

    pub fn mul(dst: Slot, lhs: Operand, rhs: Operand) -> Operation {
        Operation::binary(dst, BinaryOperator::Mul, lhs, rhs)
    }

    pub fn cast(dst: Slot, src: Operand) -> Operation {
        Operation::Cast { dst, src }
    }

    pub fn branch(condition: Condition) -> Operation {
        Operation::Branch { condition }
    }

    pub fn switch(scrutinee: Operand) -> Operation {
        Operation::Switch { scrutinee }
    }

    pub fn array_load(dst: Slot, index: Operand, length: Option<Operand>) -> Operation {
        Operation::ArrayLoad { dst, index, length }
    }

    pub fn array_store(index: Operand, value: Operand, length: Option<Operand>) -> Operation {
        Operation::ArrayStore {
            index,
            value,
            length,
        }
    }

    pub fn call<S: Into<String>>(dst: Option<Slot>, target: S, arguments: Vec<Operand>) -> Operation {
        Operation::Call {
            dst,
            target: target.into(),
            arguments,
        }
    }

    pub fn ret(value: Option<Operand>) -> Operation {
        Operation::Return { value }
    }

    pub fn nop() -> Operation {
        Operation::Nop
    }

    pub fn unsupported<S: Into<String>>(mnemonic: S, writes: Vec<Slot>) -> Operation {
        Operation::Unsupported {
            mnemonic: mnemonic.into(),
            writes,
        }
    }

    /// Get each `Slot` written by this `Operation`.
    pub fn slots_written(&self) -> Vec<&Slot> {
        match self {
            Operation::Const { dst, .. }
            | Operation::Copy { dst, .. }
            | Operation::Unary { dst, .. }
            | Operation::Binary { dst, .. }
            | Operation::Cast { dst, .. }
            | Operation::ArrayLoad { dst, .. } => vec![dst],
            Operation::Call { dst, .. } => dst.iter().collect(),
            Operation::Unsupported { writes, .. } => writes.iter().collect(),
            Operation::Branch { .. }
            | Operation::Switch { .. }
            | Operation::ArrayStore { .. }
            | Operation::Return { .. }
            | Operation::Nop => Vec::new(),
        }
    }

    /// Get each `Operand` read by this `Operation`.
    pub fn operands_read(&self) -> Vec<&Operand> {
        match self {
            Operation::Const { .. } | Operation::Nop | Operation::Unsupported { .. } => Vec::new(),
            Operation::Copy { .. } => Vec::new(),
            Operation::Unary { operand, .. } => vec![operand],
            Operation::Binary { lhs, rhs, .. } => vec![lhs, rhs],
            Operation::Cast { src, .. } => vec![src],
            Operation::Branch { condition } => vec![condition.lhs(), condition.rhs()],
            Operation::Switch { scrutinee } => vec![scrutinee],
            Operation::ArrayLoad { index, length, .. } => {
                let mut operands = vec![index];
                operands.extend(length.iter());
                operands
            }
            Operation::ArrayStore {
                index,
                value,
                length,
            } => {
                let mut operands = vec![index, value];
                operands.extend(length.iter());
                operands
            }
            Operation::Call { arguments, .. } => arguments.iter().collect(),
            Operation::Return { value } => value.iter().collect(),
        }
    }

    /// Check every width this operation carries.
    ///
    /// Every slot and constant must be 1 to 64 bits wide, and operands that
    /// are combined with each other must share a width.
    pub fn check_sorts(&self, index: usize) -> Result<(), Error> {
        for slot in self.slots_written() {
            if !valid_bits(slot.bits()) {
                return Err(Error::InvalidBits(slot.bits()));
            }
        }
        for operand in self.operands_read() {
            if !valid_bits(operand.bits()) {
                return Err(Error::InvalidBits(operand.bits()));
            }
        }

        let sorts_agree = match self {
            Operation::Const { dst, constant } => dst.bits() == constant.bits(),
            Operation::Copy { dst, src } => {
                if !valid_bits(src.bits()) {
                    return Err(Error::InvalidBits(src.bits()));
                }
                dst.bits() == src.bits()
            }
            Operation::Unary { dst, operand, .. } => dst.bits() == operand.bits(),
            Operation::Binary {
                dst,
                operator,
                lhs,
                rhs,
            } => dst.bits() == lhs.bits() && (operator.is_shift() || lhs.bits() == rhs.bits()),
            Operation::Branch { condition } => condition.lhs().bits() == condition.rhs().bits(),
            Operation::Cast { .. }
            | Operation::Switch { .. }
            | Operation::ArrayLoad { .. }
            | Operation::ArrayStore { .. }
            | Operation::Call { .. }
            | Operation::Return { .. }
            | Operation::Nop
            | Operation::Unsupported { .. } => true,
        };

        if sorts_agree {
            Ok(())
        } else {
            Err(Error::Sort(index))
        }
    }
}

fn join_operands(operands: &[Operand]) -> String {
    operands
        .iter()
        .map(|operand| operand.to_string())
        .collect::<Vec<String>>()
        .join(", ")
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Operation::Const { dst, constant } => write!(f, "{} = {}", dst, constant),
            Operation::Copy { dst, src } => write!(f, "{} = {}", dst, src),
            Operation::Unary {
                dst,
                operator,
                operand,
            } => write!(f, "{} = {}{}", dst, operator, operand),
            Operation::Binary {
                dst,
                operator,
                lhs,
                rhs,
            } => write!(f, "{} = {} {} {}", dst, lhs, operator, rhs),
            Operation::Cast { dst, src } => write!(f, "{} = cast({})", dst, src),
            Operation::Branch { condition } => write!(f, "branch {}", condition),
            Operation::Switch { scrutinee } => write!(f, "switch {}", scrutinee),
            Operation::ArrayLoad { dst, index, length } => match length {
                Some(length) => write!(f, "{} = array[{}; {}]", dst, index, length),
                None => write!(f, "{} = array[{}]", dst, index),
            },
            Operation::ArrayStore {
                index,
                value,
                length,
            } => match length {
                Some(length) => write!(f, "array[{}; {}] = {}", index, length, value),
                None => write!(f, "array[{}] = {}", index, value),
            },
            Operation::Call {
                dst,
                target,
                arguments,
            } => match dst {
                Some(dst) => write!(f, "{} = {}({})", dst, target, join_operands(arguments)),
                None => write!(f, "{}({})", target, join_operands(arguments)),
            },
            Operation::Return { value } => match value {
                Some(value) => write!(f, "return {}", value),
                None => write!(f, "return"),
            },
            Operation::Nop => write!(f, "nop"),
            Operation::Unsupported { mnemonic, writes } => {
                let writes = writes
                    .iter()
                    .map(|slot| slot.to_string())
                    .collect::<Vec<String>>()
                    .join(", ");
                write!(f, "unsupported {} [{}]", mnemonic, writes)
            }
        }
    }
}

//! An `Edge` is a directed edge between two `Point`s in a `ControlFlowGraph`.
//!
//! Each edge carries an `EdgeKind` describing how control leaves the head
//! point. Branch and switch kinds let the analysis narrow values along the
//! edge; `LoopBack` marks its tail as a loop header.
//!
//! To create a new edge, call one of the edge constructors on
//! `ControlFlowGraph`.

use crate::graph;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum EdgeKind {
    /// Fall through to the next point.
    Sequential,
    /// An unconditional jump.
    Unconditional,
    /// An unconditional jump back to a loop header.
    LoopBack,
    /// Taken when the head's branch condition holds.
    BranchTrue,
    /// Taken when the head's branch condition does not hold.
    BranchFalse,
    /// Taken when the head's scrutinee equals one of these values.
    SwitchCase(BTreeSet<i64>),
    /// Taken when the head's scrutinee matches no case.
    SwitchDefault,
}

impl EdgeKind {
    /// Combine two kinds describing edges between the same pair of points.
    ///
    /// Returns `None` when the two kinds cannot share an edge.
    pub fn merge(&self, other: &EdgeKind) -> Option<EdgeKind> {
        match (self, other) {
            (EdgeKind::SwitchCase(lhs), EdgeKind::SwitchCase(rhs)) => {
                Some(EdgeKind::SwitchCase(lhs.union(rhs).cloned().collect()))
            }
            (EdgeKind::SwitchCase(_), EdgeKind::SwitchDefault)
            | (EdgeKind::SwitchDefault, EdgeKind::SwitchCase(_)) => Some(EdgeKind::SwitchDefault),
            (EdgeKind::BranchTrue, EdgeKind::BranchFalse)
            | (EdgeKind::BranchFalse, EdgeKind::BranchTrue)
            | (EdgeKind::Unconditional, EdgeKind::BranchTrue)
            | (EdgeKind::Unconditional, EdgeKind::BranchFalse)
            | (EdgeKind::BranchTrue, EdgeKind::Unconditional)
            | (EdgeKind::BranchFalse, EdgeKind::Unconditional) => Some(EdgeKind::Unconditional),
            (EdgeKind::LoopBack, EdgeKind::Sequential)
            | (EdgeKind::LoopBack, EdgeKind::Unconditional)
            | (EdgeKind::Sequential, EdgeKind::LoopBack)
            | (EdgeKind::Unconditional, EdgeKind::LoopBack) => Some(EdgeKind::LoopBack),
            (EdgeKind::Sequential, EdgeKind::Unconditional)
            | (EdgeKind::Unconditional, EdgeKind::Sequential) => Some(EdgeKind::Unconditional),
            (lhs, rhs) if lhs == rhs => Some(lhs.clone()),
            _ => None,
        }
    }

    /// Returns true for kinds that may leave a straight-line operation.
    pub fn is_fall_through(&self) -> bool {
        matches!(
            self,
            EdgeKind::Sequential | EdgeKind::Unconditional | EdgeKind::LoopBack
        )
    }
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EdgeKind::Sequential => write!(f, "sequential"),
            EdgeKind::Unconditional => write!(f, "unconditional"),
            EdgeKind::LoopBack => write!(f, "loop-back"),
            EdgeKind::BranchTrue => write!(f, "true"),
            EdgeKind::BranchFalse => write!(f, "false"),
            EdgeKind::SwitchCase(values) => {
                let values = values
                    .iter()
                    .map(|value| value.to_string())
                    .collect::<Vec<String>>();
                write!(f, "case {}", values.join(", "))
            }
            EdgeKind::SwitchDefault => write!(f, "default"),
        }
    }
}

/// Edge between program points
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Edge {
    head: usize,
    tail: usize,
    kind: EdgeKind,
}

impl Edge {
    pub fn new(head: usize, tail: usize, kind: EdgeKind) -> Edge {
        Edge { head, tail, kind }
    }

    /// Retrieve the index of the head `Point` for this `Edge`.
    pub fn head(&self) -> usize {
        self.head
    }

    /// Retrieve the index of the tail `Point` for this `Edge`.
    pub fn tail(&self) -> usize {
        self.tail
    }

    /// Retrieve the kind of this `Edge`.
    pub fn kind(&self) -> &EdgeKind {
        &self.kind
    }

    pub(crate) fn set_kind(&mut self, kind: EdgeKind) {
        self.kind = kind;
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({:02}->{:02}) {}", self.head, self.tail, self.kind)
    }
}

impl graph::Edge for Edge {
    fn head(&self) -> usize {
        self.head
    }
    fn tail(&self) -> usize {
        self.tail
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn case(values: &[i64]) -> EdgeKind {
        EdgeKind::SwitchCase(values.iter().cloned().collect())
    }

    #[test]
    fn merge() {
        assert_eq!(case(&[1]).merge(&case(&[3])), Some(case(&[1, 3])));
        assert_eq!(
            case(&[1]).merge(&EdgeKind::SwitchDefault),
            Some(EdgeKind::SwitchDefault)
        );
        assert_eq!(
            EdgeKind::BranchTrue.merge(&EdgeKind::BranchFalse),
            Some(EdgeKind::Unconditional)
        );
        assert_eq!(
            EdgeKind::BranchTrue.merge(&EdgeKind::BranchTrue),
            Some(EdgeKind::BranchTrue)
        );
        assert_eq!(
            EdgeKind::Sequential.merge(&EdgeKind::LoopBack),
            Some(EdgeKind::LoopBack)
        );
        assert_eq!(EdgeKind::BranchTrue.merge(&case(&[0])), None);
    }
}

//! A `Point` is one vertex of a `ControlFlowGraph`, holding one `Operation`.

use crate::graph;
use crate::il::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A program point.
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Point {
    index: usize,
    operation: Operation,
    #[serde(default)]
    comment: Option<String>,
}

impl Point {
    pub(crate) fn new(index: usize, operation: Operation) -> Point {
        Point {
            index,
            operation,
            comment: None,
        }
    }

    /// Retrieve the index of this `Point`.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Retrieve the `Operation` performed at this `Point`.
    pub fn operation(&self) -> &Operation {
        &self.operation
    }

    /// Get the comment for this `Point`.
    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    /// Set the comment for this `Point`.
    pub fn set_comment(&mut self, comment: Option<String>) {
        self.comment = comment;
    }
}

impl graph::Vertex for Point {
    fn index(&self) -> usize {
        self.index
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if let Some(ref comment) = self.comment {
            writeln!(f, "// {}", comment)?;
        }
        write!(f, "[{:02}] {}", self.index, self.operation)
    }
}

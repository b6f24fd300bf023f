//! Kestrel: interval value analysis over control flow graphs.
//!
//! Kestrel computes, for every program point of a procedure, a sound
//! over-approximation of the integer values each variable slot may hold. It is
//! an intraprocedural, worklist-driven fixed-point analysis over an interval
//! domain, extended with alias tracking so that a branch on one slot also
//! narrows every slot known to hold the same value.
//!
//! The crate is split into three parts:
//!
//! * [`graph`], an index-based directed graph.
//! * [`il`], the control flow graph model the analysis runs over.
//! * [`analysis`], the interval domain, the fixed-point engine, the reporter
//! and a parallel batch driver.
//!
//! ```
//! use kestrel::analysis::{self, Interval, Options, State};
//! use kestrel::il;
//!
//! # fn example() -> Result<(), kestrel::Error> {
//! let i = il::slot("i", 32);
//! let j = il::slot("j", 32);
//!
//! let mut cfg = il::ControlFlowGraph::new();
//! let copy = cfg.new_point(il::Operation::copy(j.clone(), i.clone()))?;
//! let test = cfg.new_point(il::Operation::branch(il::Condition::lt(
//!     j.clone().into(),
//!     il::constant(5, 32).into(),
//! )))?;
//! let small = cfg.new_point(il::Operation::ret(Some(i.clone().into())))?;
//! let large = cfg.new_point(il::Operation::ret(Some(il::constant(5, 32).into())))?;
//! cfg.set_entry(copy)?;
//! cfg.sequential_edge(copy, test)?;
//! cfg.branch_edge(test, small, true)?;
//! cfg.branch_edge(test, large, false)?;
//!
//! let procedure = il::Procedure::new("max5", vec![i], cfg);
//! let report = analysis::interval_analysis(&procedure, State::new(), &Options::default())?;
//!
//! assert_eq!(report.return_value(), Some(Interval::new(32, i32::MIN as i64, 5)));
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

pub mod analysis;
pub mod graph;
pub mod il;
#[cfg(test)]
mod tests;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Analysis error: {0}")]
    Analysis(String),
    #[error("The control flow graph has no entry point")]
    ControlFlowGraphEntryNotFound,
    #[error("Invalid bit width: {0}")]
    InvalidBits(usize),
    #[error("Edge {0} -> {1} does not fit the operation at {0}: {2}")]
    InvalidEdge(usize, usize, String),
    #[error("Graph duplicate edge: {0} -> {1}")]
    GraphDuplicateEdge(usize, usize),
    #[error("Graph duplicate vertex: {0}")]
    GraphDuplicateVertex(usize),
    #[error("Graph edge not found: {0} -> {1}")]
    GraphEdgeNotFound(usize, usize),
    #[error("Graph vertex not found: {0}")]
    GraphVertexNotFound(usize),
    #[error("Json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Sort error, invalid bitness between operands at point {0}")]
    Sort(usize),
    #[error("{0}")]
    Custom(String),
}

impl From<&str> for Error {
    fn from(s: &str) -> Error {
        Error::Custom(s.to_string())
    }
}

impl From<String> for Error {
    fn from(s: String) -> Error {
        Error::Custom(s)
    }
}

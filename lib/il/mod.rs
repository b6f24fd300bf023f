//! The control flow graph model.
//!
//! A procedure is a `ControlFlowGraph` of `Point`s, each holding exactly one
//! `Operation`, connected by `Edge`s. Points are referred to by index
//! everywhere outside of the graph, which owns them.
//!
//! # Components
//!
//! * `Slot` and `Constant` are the terminals. Both carry a width of 1 to 64
//! bits, and values are signed two's complement integers of that width.
//! * `Operand` is either of the two.
//! * `Operation` is the closed set of effects a point may have: constant
//! loads, copies, arithmetic, casts, branches over a `Condition`, switches,
//! array accesses, calls, returns, and `Unsupported` for everything else.
//! * `Edge` carries an `EdgeKind`, telling the analysis which outcome of the
//! head's operation the edge belongs to.
//!
//! # Building a graph
//!
//! ```
//! use kestrel::il;
//!
//! # fn example() -> Result<(), kestrel::Error> {
//! let x = il::slot("x", 32);
//!
//! let mut cfg = il::ControlFlowGraph::new();
//! let head = cfg.new_point(il::Operation::switch(x.clone().into()))?;
//! let one = cfg.new_point(il::Operation::constant(x.clone(), il::constant(1, 32)))?;
//! let exit = cfg.new_point(il::Operation::ret(Some(x.into())))?;
//!
//! cfg.set_entry(head)?;
//! cfg.switch_case_edge(head, one, 0)?;
//! cfg.switch_case_edge(head, one, 2)?;
//! cfg.switch_default_edge(head, exit)?;
//! cfg.sequential_edge(one, exit)?;
//! cfg.validate()?;
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

mod condition;
mod constant;
mod control_flow_graph;
mod edge;
mod operand;
mod operation;
mod point;
mod procedure;
mod slot;

pub use self::condition::*;
pub use self::constant::*;
pub use self::control_flow_graph::*;
pub use self::edge::*;
pub use self::operand::*;
pub use self::operation::*;
pub use self::point::*;
pub use self::procedure::*;
pub use self::slot::*;

/// A convenience function to create a new slot.
pub fn slot<S>(name: S, bits: usize) -> Slot
where
    S: Into<String>,
{
    Slot::new(name, bits)
}

/// A convenience function to create a new constant.
pub fn constant(value: i64, bits: usize) -> Constant {
    Constant::new(value, bits)
}

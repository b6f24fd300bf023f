//! Transfer functions.
//!
//! `Transfer::eval` applies the effect of a point's operation to the state
//! flowing into the point. `Transfer::edge_state` then narrows the resulting
//! state along one outgoing edge, using the branch condition or switch case
//! the edge belongs to. An edge whose narrowed state would hold no values is
//! infeasible, and `edge_state` returns `None` for it.

use crate::analysis::{CallSummary, Interval, State, Summaries};
use crate::il::{self, BinaryOperator, EdgeKind, Operation, UnaryOperator};
use crate::Error;
use log::{debug, warn};
use std::collections::BTreeSet;

/// Evaluates operations over `State`s.
#[derive(Clone, Copy, Debug)]
pub struct Transfer<'t> {
    summaries: &'t Summaries,
}

impl<'t> Transfer<'t> {
    pub fn new(summaries: &'t Summaries) -> Transfer<'t> {
        Transfer { summaries }
    }

    /// The state after `operation` executes in `state`.
    pub fn eval(&self, operation: &Operation, state: &State) -> State {
        let mut state = state.clone();

        match operation {
            Operation::Const { dst, constant } => {
                state.set(dst, Interval::constant(constant.bits(), constant.value()));
            }
            Operation::Copy { dst, src } => state.copy(dst, src),
            Operation::Unary {
                dst,
                operator,
                operand,
            } => {
                let value = state.eval(operand);
                let result = match operator {
                    UnaryOperator::Neg => value.neg(),
                    UnaryOperator::Not => value.not(),
                };
                state.set(dst, result);
            }
            Operation::Binary {
                dst,
                operator,
                lhs,
                rhs,
            } => {
                let result = binary(*operator, &state.eval(lhs), &state.eval(rhs));
                state.set(dst, result);
            }
            Operation::Cast { dst, src } => {
                let result = state.eval(src).cast(dst.bits());
                state.set(dst, result);
            }
            Operation::ArrayLoad { dst, .. } => state.set(dst, Interval::top(dst.bits())),
            Operation::Call {
                dst: Some(dst),
                target,
                arguments,
            } => self.call(&mut state, dst, target, arguments),
            Operation::Unsupported { mnemonic, writes } => {
                warn!("unsupported operation {}, forgetting {} slots", mnemonic, writes.len());
                for slot in writes {
                    state.set(slot, Interval::top(slot.bits()));
                }
            }
            Operation::Call { dst: None, .. }
            | Operation::Branch { .. }
            | Operation::Switch { .. }
            | Operation::ArrayStore { .. }
            | Operation::Return { .. }
            | Operation::Nop => {}
        }

        state
    }

    fn call(&self, state: &mut State, dst: &il::Slot, target: &str, arguments: &[il::Operand]) {
        match self.summaries.get(target) {
            Some(CallSummary::ReturnsArgument(position)) => match arguments.get(*position) {
                Some(il::Operand::Slot(argument)) if argument.bits() == dst.bits() => {
                    state.copy(dst, argument)
                }
                Some(argument) => {
                    let result = state.eval(argument).cast(dst.bits());
                    state.set(dst, result);
                }
                None => {
                    debug!(
                        "summary of {} returns argument {}, but the call passes {}",
                        target,
                        position,
                        arguments.len()
                    );
                    state.set(dst, Interval::top(dst.bits()));
                }
            },
            Some(summary) => {
                let result = summary
                    .returned_interval(dst.bits())
                    .unwrap_or_else(|| Interval::top(dst.bits()));
                state.set(dst, result);
            }
            None => state.set(dst, Interval::top(dst.bits())),
        }
    }

    /// The state flowing along `edge`, given `post`, the state after the
    /// operation at the edge's head.
    ///
    /// Returns `None` if the edge cannot be taken from `post`.
    pub fn edge_state(
        &self,
        control_flow_graph: &il::ControlFlowGraph,
        edge: &il::Edge,
        post: &State,
    ) -> Result<Option<State>, Error> {
        let operation = control_flow_graph.point(edge.head())?.operation();

        let state = match (operation, edge.kind()) {
            (Operation::Branch { condition }, EdgeKind::BranchTrue) => {
                self.condition(condition, post)
            }
            (Operation::Branch { condition }, EdgeKind::BranchFalse) => {
                self.condition(&condition.negate(), post)
            }
            (Operation::Switch { scrutinee }, EdgeKind::SwitchCase(values)) => {
                self.switch_case(scrutinee, values, post)
            }
            (Operation::Switch { scrutinee }, EdgeKind::SwitchDefault) => {
                let mut cases = BTreeSet::new();
                for sibling in control_flow_graph.edges_out(edge.head())? {
                    if let EdgeKind::SwitchCase(values) = sibling.kind() {
                        cases.extend(values.iter().cloned());
                    }
                }
                self.switch_default(scrutinee, &cases, post)
            }
            _ => Some(post.clone()),
        };

        if state.is_none() {
            debug!("edge {} is infeasible", edge);
        }

        Ok(state)
    }

    /// Every edge out of `index`, with the state flowing along it.
    pub fn edge_states<'c>(
        &self,
        control_flow_graph: &'c il::ControlFlowGraph,
        index: usize,
        post: &State,
    ) -> Result<Vec<(&'c il::Edge, Option<State>)>, Error> {
        control_flow_graph
            .edges_out(index)?
            .into_iter()
            .map(|edge| Ok((edge, self.edge_state(control_flow_graph, edge, post)?)))
            .collect()
    }

    /// Narrow `state` to the values for which `condition` holds.
    fn condition(&self, condition: &il::Condition, state: &State) -> Option<State> {
        let comparison = condition.comparison();
        let (lhs, rhs) = (condition.lhs(), condition.rhs());

        // Two aliased slots hold the same value, whatever that value is.
        if let (Some(lhs), Some(rhs)) = (lhs.slot(), rhs.slot()) {
            if state.aliases().are_aliased(lhs, rhs) {
                return if comparison.reflexive() {
                    Some(state.clone())
                } else {
                    None
                };
            }
        }

        let lhs_value = state.eval(lhs).refine(comparison, &state.eval(rhs));
        if lhs_value.is_bottom() {
            return None;
        }
        let rhs_value = state.eval(rhs).refine(comparison.swap(), &lhs_value);
        if rhs_value.is_bottom() {
            return None;
        }

        let mut state = state.clone();
        if let Some(slot) = lhs.slot() {
            if !state.narrow(slot, &lhs_value) {
                return None;
            }
        }
        if let Some(slot) = rhs.slot() {
            if !state.narrow(slot, &rhs_value) {
                return None;
            }
        }
        if comparison == il::Comparison::Eq {
            if let (Some(lhs), Some(rhs)) = (lhs.slot(), rhs.slot()) {
                if !state.equate(lhs, rhs) {
                    return None;
                }
            }
        }

        Some(state)
    }

    /// Narrow the scrutinee to the case values selecting this edge.
    fn switch_case(
        &self,
        scrutinee: &il::Operand,
        values: &BTreeSet<i64>,
        state: &State,
    ) -> Option<State> {
        let value = state.eval(scrutinee);
        let mut possible = values.iter().filter(|&&case| value.contains(case));
        let lo = *possible.next()?;
        let hi = possible.last().cloned().unwrap_or(lo);
        let narrowed = value.meet(&Interval::new(value.bits(), lo, hi));

        let mut state = state.clone();
        if let Some(slot) = scrutinee.slot() {
            if !state.narrow(slot, &narrowed) {
                return None;
            }
        }
        Some(state)
    }

    /// Remove case values from the ends of the scrutinee's interval.
    ///
    /// Values inside the interval cannot be removed, so the default edge is
    /// only narrowed when the cases cover one end of the scrutinee's range.
    fn switch_default(
        &self,
        scrutinee: &il::Operand,
        cases: &BTreeSet<i64>,
        state: &State,
    ) -> Option<State> {
        let mut value = state.eval(scrutinee);
        loop {
            let (lo, hi) = value.bounds()?;
            let trimmed = if cases.contains(&lo) {
                value.refine(il::Comparison::Ne, &Interval::constant(value.bits(), lo))
            } else if cases.contains(&hi) {
                value.refine(il::Comparison::Ne, &Interval::constant(value.bits(), hi))
            } else {
                break;
            };
            value = trimmed;
        }

        let mut state = state.clone();
        if let Some(slot) = scrutinee.slot() {
            if !state.narrow(slot, &value) {
                return None;
            }
        }
        Some(state)
    }
}

/// Apply a binary operator to two intervals.
pub fn binary(operator: BinaryOperator, lhs: &Interval, rhs: &Interval) -> Interval {
    match operator {
        BinaryOperator::Add => lhs.add(rhs),
        BinaryOperator::Sub => lhs.sub(rhs),
        BinaryOperator::Mul => lhs.mul(rhs),
        BinaryOperator::Div => lhs.div(rhs),
        BinaryOperator::Rem => lhs.rem(rhs),
        BinaryOperator::And => lhs.and(rhs),
        BinaryOperator::Or => lhs.or(rhs),
        BinaryOperator::Xor => lhs.xor(rhs),
        BinaryOperator::Shl => lhs.shl(rhs),
        BinaryOperator::Shr => lhs.shr(rhs),
        BinaryOperator::Ushr => lhs.ushr(rhs),
    }
}

/// Describe why an array access with this index may be out of range, or
/// return `None` if it is always in range.
///
/// An access may be out of range if the index may be negative or is
/// unconstrained. With a known length the index must stay below the smallest
/// possible length, and without one it must at least have an upper bound.
pub fn out_of_range(index: &Interval, length: Option<&Interval>) -> Option<String> {
    let (lo, hi) = index.bounds()?;
    if index.is_top() {
        return Some(format!("index {} is unconstrained", index));
    }
    if lo < 0 {
        return Some(format!("index {} may be negative", index));
    }
    match length.and_then(|length| length.lo()) {
        Some(length) if hi >= length => Some(format!(
            "index {} may reach the array length {}",
            index, length
        )),
        Some(_) => None,
        None if hi == il::max_value(index.bits()) => {
            Some(format!("index {} has no upper bound", index))
        }
        None => None,
    }
}

//! Findings and the per-point state table of one analyzed procedure.

use crate::analysis::fixed_point::Solution;
use crate::analysis::{transfer, Interval, State, Transfer};
use crate::il;
use crate::Error;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// How the analysis of a procedure ended.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum Outcome {
    /// Every state reached a fixed point.
    Converged,
    /// The iteration budget ran out.
    Diverged,
    /// The deadline passed.
    DeadlineExceeded,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Outcome::Converged => write!(f, "converged"),
            Outcome::Diverged => write!(f, "diverged"),
            Outcome::DeadlineExceeded => write!(f, "deadline exceeded"),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum FindingKind {
    /// The edge from the finding's point to `tail` can never be taken.
    InfeasibleEdge { tail: usize },
    /// An array access whose index may fall outside the array.
    PossibleOutOfRange,
    /// The analysis gave up, and every state is unconstrained.
    Divergence,
}

impl fmt::Display for FindingKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            FindingKind::InfeasibleEdge { tail } => write!(f, "infeasible edge to {}", tail),
            FindingKind::PossibleOutOfRange => write!(f, "possible out of range access"),
            FindingKind::Divergence => write!(f, "divergence"),
        }
    }
}

/// A fact about one point of a procedure.
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Finding {
    point: usize,
    kind: FindingKind,
    detail: String,
}

impl Finding {
    pub fn new<S: Into<String>>(point: usize, kind: FindingKind, detail: S) -> Finding {
        Finding {
            point,
            kind,
            detail: detail.into(),
        }
    }

    pub fn point(&self) -> usize {
        self.point
    }

    pub fn kind(&self) -> &FindingKind {
        &self.kind
    }

    pub fn detail(&self) -> &str {
        &self.detail
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "0x{:x}: {}: {}", self.point, self.kind, self.detail)
    }
}

/// The result of analyzing one procedure.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Report {
    procedure: String,
    outcome: Outcome,
    iterations: usize,
    states: BTreeMap<usize, State>,
    findings: Vec<Finding>,
    returns: BTreeMap<usize, Interval>,
    unreachable: BTreeSet<usize>,
}

impl Report {
    /// The name of the analyzed procedure.
    pub fn procedure(&self) -> &str {
        &self.procedure
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// The state before every reachable point.
    pub fn states(&self) -> &BTreeMap<usize, State> {
        &self.states
    }

    /// The state before `point`, or `None` if the point is unreachable.
    pub fn state(&self, point: usize) -> Option<&State> {
        self.states.get(&point)
    }

    /// The interval of `slot` before `point`. `Bottom` if the point is
    /// unreachable.
    pub fn value(&self, point: usize, slot: &il::Slot) -> Interval {
        match self.states.get(&point) {
            Some(state) => state.value(slot),
            None => Interval::bottom(slot.bits()),
        }
    }

    /// The join of the values returned by every reachable return point.
    pub fn return_value(&self) -> Option<Interval> {
        self.returns
            .values()
            .fold(None, |joined: Option<Interval>, value| match joined {
                Some(joined) => Some(joined.join(value)),
                None => Some(*value),
            })
    }

    /// The value returned at each reachable return point with a value.
    pub fn returns(&self) -> &BTreeMap<usize, Interval> {
        &self.returns
    }

    /// Every finding, ordered by point.
    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    /// Every infeasible edge, as `(head, tail)`.
    pub fn infeasible_edges(&self) -> BTreeSet<(usize, usize)> {
        self.findings
            .iter()
            .filter_map(|finding| match finding.kind() {
                FindingKind::InfeasibleEdge { tail } => Some((finding.point(), *tail)),
                _ => None,
            })
            .collect()
    }

    /// The points no feasible path from the entry reaches.
    pub fn unreachable_points(&self) -> &BTreeSet<usize> {
        &self.unreachable
    }

    pub fn is_reachable(&self, point: usize) -> bool {
        self.states.contains_key(&point)
    }

    pub fn to_json(&self) -> Result<String, Error> {
        Ok(serde_json::to_string(self)?)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(
            f,
            "{}: {} after {} iterations",
            self.procedure, self.outcome, self.iterations
        )?;
        for (point, state) in &self.states {
            writeln!(f, "  0x{:x}: {}", point, state)?;
        }
        for finding in &self.findings {
            writeln!(f, "  {}", finding)?;
        }
        Ok(())
    }
}

/// Builds the `Report` of a procedure from its solved states.
pub struct Reporter<'r> {
    procedure: &'r il::Procedure,
    transfer: Transfer<'r>,
}

impl<'r> Reporter<'r> {
    pub fn new(procedure: &'r il::Procedure, transfer: Transfer<'r>) -> Reporter<'r> {
        Reporter {
            procedure,
            transfer,
        }
    }

    pub fn report(&self, solution: Solution) -> Result<Report, Error> {
        let control_flow_graph = self.procedure.control_flow_graph();
        let outcome = solution.outcome();
        let iterations = solution.iterations();
        let states = solution.states().clone();

        let mut findings = Vec::new();

        if outcome != Outcome::Converged {
            findings.push(Finding::new(
                control_flow_graph.entry_index()?,
                FindingKind::Divergence,
                format!("{} after {} iterations", outcome, iterations),
            ));
        } else {
            for (&index, state) in &states {
                let operation = control_flow_graph.point(index)?.operation();
                findings.append(&mut self.infeasible_edges(index, operation, state)?);
                if let Some(finding) = self.out_of_range(index, operation, state) {
                    findings.push(finding);
                }
            }
        }
        findings.sort();

        let mut returns = BTreeMap::new();
        for (&index, state) in &states {
            if let il::Operation::Return { value: Some(value) } =
                control_flow_graph.point(index)?.operation()
            {
                returns.insert(index, state.eval(value));
            }
        }

        let unreachable = control_flow_graph
            .points()
            .into_iter()
            .map(|point| point.index())
            .filter(|index| !states.contains_key(index))
            .collect::<BTreeSet<usize>>();

        debug!(
            "{}: {} findings, {} unreachable points",
            self.procedure.name(),
            findings.len(),
            unreachable.len()
        );

        Ok(Report {
            procedure: self.procedure.name().to_string(),
            outcome,
            iterations,
            states,
            findings,
            returns,
            unreachable,
        })
    }

    fn infeasible_edges(
        &self,
        index: usize,
        operation: &il::Operation,
        state: &State,
    ) -> Result<Vec<Finding>, Error> {
        let condition = match operation {
            il::Operation::Branch { condition } => condition.to_string(),
            il::Operation::Switch { scrutinee } => format!("switch on {}", scrutinee),
            _ => return Ok(Vec::new()),
        };

        let post = self.transfer.eval(operation, state);
        let control_flow_graph = self.procedure.control_flow_graph();
        Ok(self
            .transfer
            .edge_states(control_flow_graph, index, &post)?
            .into_iter()
            .filter(|(_, state)| state.is_none())
            .map(|(edge, _)| {
                Finding::new(
                    index,
                    FindingKind::InfeasibleEdge { tail: edge.tail() },
                    format!("{} edge of {} is never taken", edge.kind(), condition),
                )
            })
            .collect())
    }

    fn out_of_range(&self, index: usize, operation: &il::Operation, state: &State) -> Option<Finding> {
        let (array_index, length) = match operation {
            il::Operation::ArrayLoad { index, length, .. }
            | il::Operation::ArrayStore { index, length, .. } => (index, length),
            _ => return None,
        };

        let array_index = state.eval(array_index);
        let length = length.as_ref().map(|length| state.eval(length));
        transfer::out_of_range(&array_index, length.as_ref())
            .map(|detail| Finding::new(index, FindingKind::PossibleOutOfRange, detail))
    }
}

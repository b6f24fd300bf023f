//! The worklist fixed-point scheduler.
//!
//! States are attached to points, and hold the values of slots just before
//! the point's operation executes. The scheduler first ascends, joining the
//! states flowing along every feasible edge into the edge's tail and widening
//! at loop headers, until no state changes. It then runs a bounded number of
//! descending passes, which recompute every state from its predecessors
//! without widening, and keep the recomputed state when it is more precise.

use crate::analysis::{Options, Outcome, State, Transfer};
use crate::il;
use crate::Error;
use log::{debug, trace, warn};
use rustc_hash::FxHashMap;
use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

/// The states computed by the scheduler.
#[derive(Clone, Debug)]
pub struct Solution {
    states: BTreeMap<usize, State>,
    outcome: Outcome,
    iterations: usize,
}

impl Solution {
    /// The state before every reachable point.
    pub fn states(&self) -> &BTreeMap<usize, State> {
        &self.states
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    /// The number of operations evaluated.
    pub fn iterations(&self) -> usize {
        self.iterations
    }
}

/// Solves one procedure.
pub struct FixedPoint<'f> {
    procedure: &'f il::Procedure,
    transfer: Transfer<'f>,
    options: &'f Options,
    entry: usize,
    loop_headers: BTreeSet<usize>,
    reverse_post_order: Vec<usize>,
    order: FxHashMap<usize, usize>,
    iterations: usize,
    started: Instant,
}

impl<'f> FixedPoint<'f> {
    /// Prepare to solve `procedure`, which must be valid.
    pub fn new(procedure: &'f il::Procedure, options: &'f Options) -> Result<FixedPoint<'f>, Error> {
        procedure.validate()?;
        let control_flow_graph = procedure.control_flow_graph();

        let reverse_post_order = control_flow_graph.reverse_post_order()?;
        let order = reverse_post_order
            .iter()
            .enumerate()
            .map(|(order, &index)| (index, order))
            .collect::<FxHashMap<usize, usize>>();

        Ok(FixedPoint {
            procedure,
            transfer: Transfer::new(options.summaries()),
            options,
            entry: control_flow_graph.entry_index()?,
            loop_headers: control_flow_graph.loop_headers()?,
            reverse_post_order,
            order,
            iterations: 0,
            started: Instant::now(),
        })
    }

    fn control_flow_graph(&self) -> &'f il::ControlFlowGraph {
        self.procedure.control_flow_graph()
    }

    fn order(&self, index: usize) -> Result<usize, Error> {
        self.order
            .get(&index)
            .cloned()
            .ok_or_else(|| Error::Analysis(format!("point {} is not reachable", index)))
    }

    /// The reason to stop, if the budget is spent. A deadline is spent as
    /// soon as it is reached.
    fn exhausted(&self) -> Option<Outcome> {
        if self.iterations >= self.options.max_iterations() {
            return Some(Outcome::Diverged);
        }
        match self.options.deadline() {
            Some(deadline) if self.started.elapsed() >= deadline => Some(Outcome::DeadlineExceeded),
            _ => None,
        }
    }

    /// Compute the state before every reachable point, starting from
    /// `initial` at the entry.
    pub fn solve(mut self, initial: State) -> Result<Solution, Error> {
        self.started = Instant::now();

        let mut states = BTreeMap::new();
        states.insert(self.entry, initial.clone());

        if let Some(outcome) = self.ascend(&mut states)? {
            warn!(
                "{}: gave up after {} iterations ({})",
                self.procedure.name(),
                self.iterations,
                outcome
            );
            let states = self
                .control_flow_graph()
                .points()
                .into_iter()
                .map(|point| (point.index(), State::new()))
                .collect();
            return Ok(Solution {
                states,
                outcome,
                iterations: self.iterations,
            });
        }

        debug!(
            "{}: ascended in {} iterations",
            self.procedure.name(),
            self.iterations
        );

        self.descend(&mut states, &initial)?;

        Ok(Solution {
            states,
            outcome: Outcome::Converged,
            iterations: self.iterations,
        })
    }

    /// Returns the reason the ascent stopped early, or `None` once no state
    /// changes.
    fn ascend(&mut self, states: &mut BTreeMap<usize, State>) -> Result<Option<Outcome>, Error> {
        let control_flow_graph = self.control_flow_graph();

        let mut merges: FxHashMap<usize, usize> = FxHashMap::default();
        let mut worklist: BTreeSet<(usize, usize)> = BTreeSet::new();

        worklist.insert((self.order(self.entry)?, self.entry));

        loop {
            let next = match worklist.iter().next() {
                Some(&next) => next,
                None => break,
            };
            if let Some(outcome) = self.exhausted() {
                return Ok(Some(outcome));
            }
            worklist.remove(&next);
            let (_, index) = next;

            self.iterations += 1;

            let pre = match states.get(&index) {
                Some(state) => state.clone(),
                None => continue,
            };
            let point = control_flow_graph.point(index)?;
            let post = self.transfer.eval(point.operation(), &pre);
            trace!("{}: {}", point, post);

            for (edge, state) in self.transfer.edge_states(control_flow_graph, index, &post)? {
                let state = match state {
                    Some(state) => state,
                    None => continue,
                };
                let tail = edge.tail();

                let merged = match states.get(&tail) {
                    None => state,
                    Some(old) => {
                        let joined = old.join(&state);
                        let count = merges.entry(tail).or_insert(0);
                        *count += 1;
                        if self.loop_headers.contains(&tail) && *count > self.options.widening_delay()
                        {
                            let widened = old.widen(&joined);
                            if widened != *old {
                                debug!("widening at {}: {}", tail, widened);
                            }
                            widened
                        } else {
                            joined
                        }
                    }
                };

                if states.get(&tail) != Some(&merged) {
                    trace!("{} -> {}: {}", index, tail, merged);
                    states.insert(tail, merged);
                    worklist.insert((self.order(tail)?, tail));
                }
            }
        }

        let unvisited = self
            .reverse_post_order
            .iter()
            .filter(|index| !states.contains_key(index))
            .count();
        if unvisited > 0 {
            debug!(
                "{}: {} points never reached",
                self.procedure.name(),
                unvisited
            );
        }

        Ok(None)
    }

    /// The state before `index`, recomputed from the current states of its
    /// predecessors. `None` if no feasible edge reaches it.
    fn recompute(
        &self,
        states: &BTreeMap<usize, State>,
        index: usize,
        initial: &State,
    ) -> Result<Option<State>, Error> {
        let control_flow_graph = self.control_flow_graph();

        let mut result = if index == self.entry {
            Some(initial.clone())
        } else {
            None
        };

        for edge in control_flow_graph.edges_in(index)? {
            let pre = match states.get(&edge.head()) {
                Some(pre) => pre,
                None => continue,
            };
            let operation = control_flow_graph.point(edge.head())?.operation();
            let post = self.transfer.eval(operation, pre);
            if let Some(state) = self.transfer.edge_state(control_flow_graph, edge, &post)? {
                result = Some(match result {
                    Some(result) => result.join(&state),
                    None => state,
                });
            }
        }

        Ok(result)
    }

    fn descend(&mut self, states: &mut BTreeMap<usize, State>, initial: &State) -> Result<(), Error> {
        for pass in 0..self.options.narrowing_passes() {
            let mut changed = false;

            for i in 0..self.reverse_post_order.len() {
                if self.exhausted().is_some() {
                    debug!(
                        "{}: budget spent in descending pass {}",
                        self.procedure.name(),
                        pass
                    );
                    return Ok(());
                }
                self.iterations += 1;

                let index = self.reverse_post_order[i];
                let current = match states.get(&index) {
                    Some(current) => current,
                    None => continue,
                };

                match self.recompute(states, index, initial)? {
                    Some(state) => {
                        if state != *current && state <= *current {
                            trace!("narrowed {}: {}", index, state);
                            states.insert(index, state);
                            changed = true;
                        }
                    }
                    None => {
                        trace!("{} is unreachable", index);
                        states.remove(&index);
                        changed = true;
                    }
                }
            }

            debug!(
                "{}: descending pass {} done, changed: {}",
                self.procedure.name(),
                pass,
                changed
            );
            if !changed {
                break;
            }
        }
        Ok(())
    }
}

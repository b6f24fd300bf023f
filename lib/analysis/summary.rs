//! Effect summaries for the targets of calls.
//!
//! The analysis is intraprocedural. What a call returns is only known when the
//! caller supplies a `CallSummary` for its target; every other call returns
//! an unconstrained value.

use crate::analysis::Interval;
use crate::Error;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What a call is known to return.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum CallSummary {
    /// A value in `[lo, hi]`.
    Returns { lo: i64, hi: i64 },
    /// The argument at this position, unchanged.
    ReturnsArgument(usize),
}

impl CallSummary {
    /// The interval of a `Returns` summary in a result of `bits` bits.
    ///
    /// An empty summary returns `Top`, as no call can return nothing.
    pub fn returned_interval(&self, bits: usize) -> Option<Interval> {
        match *self {
            CallSummary::Returns { lo, hi } if lo > hi => Some(Interval::top(bits)),
            CallSummary::Returns { lo, hi } => {
                Some(Interval::from_exact(bits, lo as i128, hi as i128))
            }
            CallSummary::ReturnsArgument(_) => None,
        }
    }

    /// Check this summary describes at least one value.
    pub fn validate(&self, target: &str) -> Result<(), Error> {
        match *self {
            CallSummary::Returns { lo, hi } if lo > hi => Err(Error::Analysis(format!(
                "summary of {} returns the empty range [{}, {}]",
                target, lo, hi
            ))),
            _ => Ok(()),
        }
    }
}

/// Call summaries, keyed by call target.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Summaries {
    summaries: BTreeMap<String, CallSummary>,
}

impl Summaries {
    pub fn new() -> Summaries {
        Summaries::default()
    }

    /// Add or replace the summary for `target`.
    pub fn insert<S: Into<String>>(&mut self, target: S, summary: CallSummary) {
        self.summaries.insert(target.into(), summary);
    }

    /// The summary for `target`, if one was supplied.
    pub fn get(&self, target: &str) -> Option<&CallSummary> {
        self.summaries.get(target)
    }

    /// Check every summary.
    pub fn validate(&self) -> Result<(), Error> {
        for (target, summary) in &self.summaries {
            summary.validate(target)?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.summaries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.summaries.is_empty()
    }
}

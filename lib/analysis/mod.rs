//! Interval analysis over kestrel IL.
//!
//! * `interval` implements the interval domain.
//! * `alias` and `state` implement the abstract state of a program point.
//! * `transfer` gives the effect of every operation and edge on a state.
//! * `fixed_point` drives the transfer functions to a fixed point.
//! * `report` turns the fixed point into findings.
//! * `batch` analyzes many procedures in parallel.

mod alias;
pub mod batch;
pub mod fixed_point;
mod interval;
mod options;
pub mod report;
mod state;
mod summary;
pub mod transfer;

pub use self::alias::AliasClasses;
pub use self::batch::{analyze_batch, BatchReport, Unit};
pub use self::interval::Interval;
pub use self::options::{Options, OptionsBuilder};
pub use self::report::{Finding, FindingKind, Outcome, Report};
pub use self::state::State;
pub use self::summary::{CallSummary, Summaries};
pub use self::transfer::Transfer;

use crate::il;
use crate::Error;
use log::info;

/// Compute the interval of every slot at every point of `procedure`, given
/// the facts in `initial` at its entry.
///
/// Fails if the procedure is invalid, if a call summary returns no value, or
/// if `initial` holds a fact which is not a value of its slot's width.
/// Running out of iterations is not an error, and is reported through the
/// `Report`'s outcome.
pub fn interval_analysis(
    procedure: &il::Procedure,
    initial: State,
    options: &Options,
) -> Result<Report, Error> {
    options.summaries().validate()?;
    check_initial(procedure, &initial)?;

    let solution = fixed_point::FixedPoint::new(procedure, options)?.solve(initial)?;
    let report = report::Reporter::new(procedure, Transfer::new(options.summaries()))
        .report(solution)?;

    info!(
        "{}: {} in {} iterations, {} findings",
        report.procedure(),
        report.outcome(),
        report.iterations(),
        report.findings().len()
    );

    Ok(report)
}

/// A `State` read from json may hold facts `State::set` would never store.
fn check_initial(procedure: &il::Procedure, initial: &State) -> Result<(), Error> {
    for (slot, interval) in initial.values() {
        if !il::valid_bits(slot.bits()) {
            return Err(Error::InvalidBits(slot.bits()));
        }
        if interval.bits() != slot.bits() {
            return Err(Error::Analysis(format!(
                "initial value of {} in {} has {} bits",
                slot,
                procedure.name(),
                interval.bits()
            )));
        }
        if interval.is_bottom() {
            return Err(Error::Analysis(format!(
                "initial value of {} in {} is bottom",
                slot,
                procedure.name()
            )));
        }
    }
    Ok(())
}

//! Analyze many procedures in parallel.

use crate::analysis::{interval_analysis, Options, Report, State};
use crate::il;
use crate::Error;
use log::{info, warn};
use rayon::prelude::*;

/// A procedure, and the facts holding at its entry.
#[derive(Clone, Debug)]
pub struct Unit {
    procedure: il::Procedure,
    initial: State,
}

impl Unit {
    pub fn new(procedure: il::Procedure, initial: State) -> Unit {
        Unit { procedure, initial }
    }

    pub fn procedure(&self) -> &il::Procedure {
        &self.procedure
    }

    pub fn initial(&self) -> &State {
        &self.initial
    }
}

/// The reports of every unit of a batch, ordered by procedure name.
#[derive(Debug)]
pub struct BatchReport {
    reports: Vec<Report>,
    failures: Vec<(String, Error)>,
}

impl BatchReport {
    pub fn reports(&self) -> &[Report] {
        &self.reports
    }

    /// The report of the procedure named `name`.
    pub fn report(&self, name: &str) -> Option<&Report> {
        self.reports.iter().find(|report| report.procedure() == name)
    }

    /// Units which could not be analyzed, with the reason.
    pub fn failures(&self) -> &[(String, Error)] {
        &self.failures
    }

    pub fn to_json(&self) -> Result<String, Error> {
        let failures = self
            .failures
            .iter()
            .map(|(name, error)| serde_json::json!({ "procedure": name, "error": error.to_string() }))
            .collect::<Vec<serde_json::Value>>();
        let value = serde_json::json!({
            "reports": serde_json::to_value(&self.reports)?,
            "failures": failures,
        });
        Ok(serde_json::to_string(&value)?)
    }
}

/// Analyze every unit on the rayon thread pool.
///
/// Units share nothing but `options`. A unit with an invalid control flow
/// graph is never analyzed, and is returned as a failure instead.
pub fn analyze_batch(units: &[Unit], options: &Options) -> BatchReport {
    let results: Vec<(String, Result<Report, Error>)> = units
        .par_iter()
        .map(|unit| {
            let name = unit.procedure().name().to_string();
            (name, interval_analysis(unit.procedure(), unit.initial().clone(), options))
        })
        .collect();

    let mut reports = Vec::new();
    let mut failures = Vec::new();
    for (name, result) in results {
        match result {
            Ok(report) => reports.push(report),
            Err(error) => {
                warn!("{}: {}", name, error);
                failures.push((name, error));
            }
        }
    }

    // Stable, so procedures sharing a name keep their input order
    reports.sort_by(|lhs, rhs| lhs.procedure().cmp(rhs.procedure()));
    failures.sort_by(|lhs, rhs| lhs.0.cmp(&rhs.0));

    info!(
        "analyzed {} procedures, {} failed",
        reports.len(),
        failures.len()
    );

    BatchReport { reports, failures }
}

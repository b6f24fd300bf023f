use crate::analysis::{CallSummary, Summaries};
use std::time::Duration;

/// Options controlling an interval analysis.
#[derive(Clone, Debug)]
pub struct Options {
    max_iterations: usize,
    deadline: Option<Duration>,
    widening_delay: usize,
    narrowing_passes: usize,
    summaries: Summaries,
}

impl Default for Options {
    fn default() -> Options {
        Options {
            max_iterations: 10_000,
            deadline: None,
            widening_delay: 0,
            narrowing_passes: 1,
            summaries: Summaries::new(),
        }
    }
}

impl Options {
    /// Create a new set of Options with the default settings.
    pub fn new() -> Options {
        Options::default()
    }

    /// The number of point evaluations one procedure may take before its
    /// analysis is abandoned as divergent.
    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    /// Wall-clock time one procedure may take before its analysis is
    /// abandoned.
    pub fn deadline(&self) -> Option<Duration> {
        self.deadline
    }

    /// How many merges into a loop header are joined before merges start to
    /// widen.
    ///
    /// With the default of 0, the second state to reach a loop header is
    /// already widened. Larger values let short loops stabilize on their own
    /// before widening throws their bounds away.
    pub fn widening_delay(&self) -> usize {
        self.widening_delay
    }

    /// How many descending passes run after the fixed point is reached.
    ///
    /// Each pass recomputes every state from its predecessors without
    /// widening, recovering bounds that widening gave up.
    pub fn narrowing_passes(&self) -> usize {
        self.narrowing_passes
    }

    /// Summaries for the targets of calls.
    pub fn summaries(&self) -> &Summaries {
        &self.summaries
    }
}

/// Create your options with the builder pattern.
///
/// For more details on the options, see `analysis::Options`
#[derive(Debug, Default)]
pub struct OptionsBuilder {
    options: Options,
}

impl OptionsBuilder {
    /// Create a new builder for analysis options.
    pub fn new() -> OptionsBuilder {
        OptionsBuilder {
            options: Options::default(),
        }
    }

    /// Set the iteration budget. By default this is 10,000.
    pub fn max_iterations(mut self, max_iterations: usize) -> OptionsBuilder {
        self.options.max_iterations = max_iterations;
        self
    }

    /// Set a wall-clock deadline. By default there is none.
    pub fn deadline(mut self, deadline: Duration) -> OptionsBuilder {
        self.options.deadline = Some(deadline);
        self
    }

    pub fn widening_delay(mut self, widening_delay: usize) -> OptionsBuilder {
        self.options.widening_delay = widening_delay;
        self
    }

    pub fn narrowing_passes(mut self, narrowing_passes: usize) -> OptionsBuilder {
        self.options.narrowing_passes = narrowing_passes;
        self
    }

    pub fn summary<S: Into<String>>(mut self, target: S, summary: CallSummary) -> OptionsBuilder {
        self.options.summaries.insert(target, summary);
        self
    }

    pub fn summaries(mut self, summaries: Summaries) -> OptionsBuilder {
        self.options.summaries = summaries;
        self
    }

    pub fn build(self) -> Options {
        self.options
    }
}

use crate::config::{EdgeConfig, INDEPENDENCE_FLOOR};
use crate::contingency::{PairCounts, Route};
use crate::error::Result;
use crate::statistics::{
    binomial_ln_upper_tail, binomial_upper_tail, bonferroni_threshold, error_ratio, null_probability,
};
use crate::types::{ContingencyTable, Decision, PValue};

/// Strict comparison against the corrected cut-off; a tail equal to the
/// threshold is not significant.
pub fn passes_threshold(tail: f64, threshold: f64) -> bool {
    tail < threshold
}

/// Classifies contingency tables as edges.
pub struct EdgeDecider<'a> {
    config: &'a EdgeConfig,
    threshold: f64,
}

impl<'a> EdgeDecider<'a> {
    pub fn new(config: &'a EdgeConfig, reference_length: usize) -> Self {
        Self {
            config,
            threshold: bonferroni_threshold(config.adjustment, reference_length),
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn decide(&self, counts: &PairCounts, first: usize, second: usize) -> Result<Decision> {
        match counts.route {
            Route::ZeroCell => self.zero_cell(&counts.table),
            Route::Full => self.full(&counts.table, first, second),
        }
    }

    /// Degenerate tables: accepted on the error ratio alone, scored with the
    /// log of the upper tail.
    pub fn zero_cell(&self, table: &ContingencyTable) -> Result<Decision> {
        let e = self.config.max_read_error;
        let ratio = error_ratio(table, e);
        // NaN (0/0) falls through to rejection
        if !(ratio >= e) {
            return Ok(Decision::Rejected);
        }

        let p = null_probability(table);
        let p = if p.is_nan() { 0.0 } else { p.min(1.0) };
        let ln_tail = binomial_ln_upper_tail(table.o22, table.reads, p)?;
        Ok(Decision::AcceptedHeuristic(PValue::LnTail(ln_tail)))
    }

    /// Tables with four positive cells: exact binomial test, with the error
    /// ratio as a fallback where the reads can span both positions.
    pub fn full(&self, table: &ContingencyTable, first: usize, second: usize) -> Result<Decision> {
        let p = null_probability(table);
        if p > 1.0 {
            return Ok(Decision::Rejected);
        }

        let tail = binomial_upper_tail(table.o22, table.reads, p)?;
        if p < INDEPENDENCE_FLOOR || passes_threshold(tail, self.threshold) {
            return Ok(Decision::AcceptedExact(PValue::Tail(tail)));
        }

        if self.config.heuristic_allowed(first, second)
            && error_ratio(table, self.config.max_read_error) > self.config.max_read_error
        {
            return Ok(Decision::AcceptedHeuristic(PValue::Tail(tail)));
        }

        Ok(Decision::Rejected)
    }
}

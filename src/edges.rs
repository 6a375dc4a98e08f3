//! Per-anchor edge scan and the parallel driver over all anchors.
//!
//! Each anchor is an independent task: it reads the shared variant table,
//! evaluates the partners [`partners`] assigns to it and owns its output. The
//! driver runs the tasks on the rayon pool and gathers edges and failures in
//! anchor order, so repeated runs give identical output.

use crate::config::EdgeConfig;
use crate::contingency::{ContingencyBuilder, PairCounts, VariantIndex};
use crate::error::{EdgeError, Result};
use crate::ground_truth::GroundTruth;
use crate::partition::partners;
use crate::significance::EdgeDecider;
use crate::statistics::error_ratio;
use crate::types::{Acceptance, EdgeSummary, PValue, VariantId, GAP};
use indicatif::ProgressBar;
use log::{debug, trace, warn};
use rayon::prelude::*;

/// An anchor whose task hit an arithmetic inconsistency.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskFailure {
    pub anchor: usize,
    pub error: EdgeError,
}

/// Everything gathered from one scan over all anchors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EdgeScan {
    pub edges: Vec<EdgeSummary>,
    pub failures: Vec<TaskFailure>,
}

impl EdgeScan {
    pub fn count(&self, acceptance: Acceptance) -> usize {
        self.edges.iter().filter(|e| e.acceptance == acceptance).count()
    }

    pub fn true_edges(&self) -> usize {
        self.edges.iter().filter(|e| e.true_edge).count()
    }
}

/// Evaluates all partners of one anchor.
pub struct EdgeTask<'a, I: VariantIndex + ?Sized> {
    index: &'a I,
    config: &'a EdgeConfig,
    decider: EdgeDecider<'a>,
    ground_truth: Option<&'a GroundTruth>,
}

impl<'a, I: VariantIndex + ?Sized> EdgeTask<'a, I> {
    pub fn new(index: &'a I, config: &'a EdgeConfig, ground_truth: Option<&'a GroundTruth>) -> Self {
        Self {
            index,
            config,
            decider: EdgeDecider::new(config, index.reference_length()),
            ground_truth,
        }
    }

    fn hits_fit_threshold(&self, hits: u64, reads: u64) -> bool {
        reads > 0 && hits >= self.config.min_o22
    }

    pub fn run(&self, anchor: usize) -> Result<Vec<EdgeSummary>> {
        let width = self.index.width();
        if anchor >= width {
            return Err(EdgeError::AnchorOutOfRange { anchor, width });
        }

        let mut edges = Vec::new();
        let minors = self.index.minor_reads(anchor);
        let first = VariantId::decode(anchor);
        if (minors.len() as u64) < self.config.min_o22 || !self.config.in_window(first.position) {
            return Ok(edges);
        }

        let hits = self.index.hits(minors, width);
        let builder = ContingencyBuilder::new(self.index);

        for partner in partners(anchor, hits.len()) {
            let second = VariantId::decode(partner);
            if !self.config.in_window(second.position) || first.position == second.position {
                continue;
            }
            let o22 = hits[partner];
            if o22 < self.config.min_o22 {
                continue;
            }
            let reads = self.index.common_reads(first.position, second.position);
            if !self.hits_fit_threshold(o22, reads)
                || first.position.abs_diff(second.position) <= self.config.close_positions
            {
                continue;
            }

            let m1 = self.index.symbol(anchor);
            let m2 = self.index.symbol(partner);
            if self.config.ignore_deletions && (m1 == GAP || m2 == GAP) {
                continue;
            }

            let counts = builder.build(anchor, partner, reads, o22)?;
            let decision = self.decider.decide(&counts, first.position, second.position)?;
            match decision.accepted() {
                Some((acceptance, p_value)) => {
                    let edge = self.summarize(anchor, partner, m1, m2, &counts, acceptance, p_value);
                    self.log_edge(&edge, minors.len() as u64);
                    edges.push(edge);
                }
                None => trace!(
                    "rejected {} {} {} {} {:?}",
                    first.position,
                    second.position,
                    m1 as char,
                    m2 as char,
                    counts.table
                ),
            }
        }
        Ok(edges)
    }

    #[allow(clippy::too_many_arguments)]
    fn summarize(
        &self,
        anchor: usize,
        partner: usize,
        m1: u8,
        m2: u8,
        counts: &PairCounts,
        acceptance: Acceptance,
        p_value: PValue,
    ) -> EdgeSummary {
        let first = VariantId::decode(anchor);
        let second = VariantId::decode(partner);
        let table = counts.table;
        let true_edge = self
            .ground_truth
            .is_some_and(|t| t.supports(first.position, m1, second.position, m2));

        EdgeSummary {
            first_index: anchor,
            second_index: partner,
            first,
            second,
            first_symbol: m1,
            second_symbol: m2,
            table,
            p_value,
            acceptance,
            relative_frequency: table.o22 as f64 / table.reads as f64,
            true_edge,
            error_ratio: error_ratio(&table, self.config.max_read_error),
        }
    }

    fn log_edge(&self, edge: &EdgeSummary, anchor_minors: u64) {
        let t = &edge.table;
        debug!(
            "{} {} {} {} mi1={}\tma1={}\tmi2={}\tma2={}\tp={:e} ({})\tr={}\t{}\t{}\t{}\t{}\t{}\t{:.4}",
            edge.first.position,
            edge.second.position,
            edge.first_symbol as char,
            edge.second_symbol as char,
            format_si(anchor_minors),
            format_si(self.index.major_count(edge.first.position)),
            format_si(self.index.minor_reads(edge.second_index).len() as u64),
            format_si(self.index.major_count(edge.second.position)),
            edge.p_value.value(),
            edge.p_value.kind(),
            t.reads,
            t.o11,
            t.o12,
            t.o21,
            t.o22,
            edge.true_edge,
            edge.error_ratio,
        );
    }
}

/// Scan every anchor on the rayon pool.
///
/// Failed anchors are reported in [`EdgeScan::failures`] and do not affect
/// the edges of other anchors.
pub fn find_edges<I: VariantIndex + ?Sized>(
    index: &I,
    config: &EdgeConfig,
    ground_truth: Option<&GroundTruth>,
    progress: Option<&ProgressBar>,
) -> Result<EdgeScan> {
    config.validate()?;
    let task = EdgeTask::new(index, config, ground_truth);

    let results: Vec<(usize, Result<Vec<EdgeSummary>>)> = (0..index.width())
        .into_par_iter()
        .map(|anchor| {
            let result = task.run(anchor);
            if let Some(pb) = progress {
                pb.inc(1);
            }
            (anchor, result)
        })
        .collect();

    let mut scan = EdgeScan::default();
    for (anchor, result) in results {
        match result {
            Ok(edges) => scan.edges.extend(edges),
            Err(error) => {
                warn!("Anchor {} failed: {}", anchor, error);
                scan.failures.push(TaskFailure { anchor, error });
            }
        }
    }
    Ok(scan)
}

/// Compact count for log lines: 950, 12.3k, 4.1M.
fn format_si(n: u64) -> String {
    const UNITS: [&str; 4] = ["k", "M", "G", "T"];
    if n < 1000 {
        return n.to_string();
    }
    let mut value = n as f64;
    let mut unit = 0;
    value /= 1000.0;
    while value >= 1000.0 && unit < UNITS.len() - 1 {
        value /= 1000.0;
        unit += 1;
    }
    format!("{:.1}{}", value, UNITS[unit])
}

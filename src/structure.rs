//! In-memory variant table built from reads projected onto the reference.
//!
//! Every read is a run of calls starting at a reference offset. Positions the
//! read does not reach, and `N` calls inside it, are ambiguous. The major
//! symbol at a position is the most frequent definite call there; every other
//! definite call is a minor and gets a slot in the minor-read table.

use crate::contingency::VariantIndex;
use crate::types::{minor_offset, symbol_rank, Call, VariantId, ALPHABET, AMBIGUOUS, MINOR_COUNT};

/// A read (or merged read pair) laid out in reference coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignedRead {
    pub start: usize,
    pub calls: Vec<u8>,
}

impl AlignedRead {
    pub fn new(start: usize, calls: &[u8]) -> Self {
        Self {
            start,
            calls: calls.iter().map(|b| b.to_ascii_uppercase()).collect(),
        }
    }

    /// One past the last reference position.
    pub fn end(&self) -> usize {
        self.start + self.calls.len()
    }

    pub fn base_at(&self, position: usize) -> u8 {
        if position < self.start || position >= self.end() {
            AMBIGUOUS
        } else {
            self.calls[position - self.start]
        }
    }

    pub fn span(&self) -> usize {
        self.calls.len()
    }
}

pub struct SnvStructure {
    reference_length: usize,
    consensus: Vec<u8>,
    reads: Vec<AlignedRead>,
    row_minors: Vec<Vec<u32>>,
    majors_in_row: Vec<u64>,
    /// Reads with a definite call, per position, in read order.
    covered: Vec<Vec<u32>>,
    /// Slot of each position carrying a minor in `co_coverage`.
    variable_slot: Vec<Option<usize>>,
    variable_positions: usize,
    /// Reads with definite calls at both of two variable positions,
    /// row-major over slots.
    co_coverage: Vec<u64>,
    /// Minor variant indices each read carries.
    read_minors: Vec<Vec<u32>>,
}

impl SnvStructure {
    pub fn from_reads(reads: Vec<AlignedRead>, reference_length: usize) -> Self {
        let mut counts = vec![[0u64; ALPHABET.len()]; reference_length];
        for read in &reads {
            for (offset, &base) in read.calls.iter().enumerate() {
                let position = read.start + offset;
                if position >= reference_length {
                    break;
                }
                if let Some(rank) = symbol_rank(base) {
                    counts[position][rank] += 1;
                }
            }
        }

        let consensus: Vec<u8> = counts
            .iter()
            .map(|row| {
                // First maximum in alphabet order wins ties
                let mut best = 0;
                for rank in 1..row.len() {
                    if row[rank] > row[best] {
                        best = rank;
                    }
                }
                ALPHABET[best]
            })
            .collect();

        let width = reference_length * MINOR_COUNT;
        let mut row_minors = vec![Vec::new(); width];
        let mut majors_in_row = vec![0u64; reference_length];
        let mut covered = vec![Vec::new(); reference_length];
        let mut read_minors = Vec::with_capacity(reads.len());

        for (id, read) in reads.iter().enumerate() {
            let id = id as u32;
            let mut minors = Vec::new();
            for (offset, &base) in read.calls.iter().enumerate() {
                let position = read.start + offset;
                if position >= reference_length {
                    break;
                }
                if symbol_rank(base).is_none() {
                    continue;
                }
                covered[position].push(id);
                match minor_offset(consensus[position], base) {
                    None => majors_in_row[position] += 1,
                    Some(minor) => {
                        let index = VariantId::new(position, minor).encode();
                        row_minors[index].push(id);
                        minors.push(index as u32);
                    }
                }
            }
            read_minors.push(minors);
        }

        let (variable_slot, co_coverage) = co_coverage(&reads, &row_minors, reference_length);
        let variable_positions = variable_slot.iter().flatten().count();

        Self {
            reference_length,
            consensus,
            reads,
            row_minors,
            majors_in_row,
            covered,
            variable_slot,
            variable_positions,
            co_coverage,
            read_minors,
        }
    }

    pub fn consensus(&self) -> &[u8] {
        &self.consensus
    }

    pub fn reads(&self) -> &[AlignedRead] {
        &self.reads
    }

    /// Mean reference span of the reads, used as the fragment length when
    /// none is configured.
    pub fn mean_read_span(&self) -> f64 {
        if self.reads.is_empty() {
            return 0.0;
        }
        let total: usize = self.reads.iter().map(AlignedRead::span).sum();
        total as f64 / self.reads.len() as f64
    }

    /// Variant indices with at least one minor read.
    pub fn observed_variants(&self) -> usize {
        self.row_minors.iter().filter(|r| !r.is_empty()).count()
    }
}

/// Pairwise read overlap between positions that carry at least one minor.
///
/// Only those positions can ever reach the contingency stage, so the matrix
/// stays small next to the reference.
fn co_coverage(
    reads: &[AlignedRead],
    row_minors: &[Vec<u32>],
    reference_length: usize,
) -> (Vec<Option<usize>>, Vec<u64>) {
    let mut slots = vec![None; reference_length];
    let mut variable = 0;
    for (position, slot) in slots.iter_mut().enumerate() {
        let row = &row_minors[position * MINOR_COUNT..(position + 1) * MINOR_COUNT];
        if row.iter().any(|r| !r.is_empty()) {
            *slot = Some(variable);
            variable += 1;
        }
    }

    let mut matrix = vec![0u64; variable * variable];
    let mut seen = Vec::new();
    for read in reads {
        seen.clear();
        for (offset, &base) in read.calls.iter().enumerate() {
            let position = read.start + offset;
            if position >= reference_length {
                break;
            }
            if let (Some(slot), Some(_)) = (slots[position], symbol_rank(base)) {
                seen.push(slot);
            }
        }
        for (i, &a) in seen.iter().enumerate() {
            for &b in &seen[i..] {
                matrix[a * variable + b] += 1;
                if a != b {
                    matrix[b * variable + a] += 1;
                }
            }
        }
    }
    (slots, matrix)
}

fn sorted_intersection_len(a: &[u32], b: &[u32]) -> u64 {
    let (mut i, mut j, mut n) = (0, 0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                n += 1;
                i += 1;
                j += 1;
            }
        }
    }
    n
}

impl VariantIndex for SnvStructure {
    fn reference_length(&self) -> usize {
        self.reference_length
    }

    fn minor_reads(&self, index: usize) -> &[u32] {
        self.row_minors.get(index).map(Vec::as_slice).unwrap_or(&[])
    }

    fn major_count(&self, position: usize) -> u64 {
        self.majors_in_row.get(position).copied().unwrap_or(0)
    }

    fn major_symbol(&self, position: usize) -> u8 {
        self.consensus.get(position).copied().unwrap_or(AMBIGUOUS)
    }

    fn common_reads(&self, first: usize, second: usize) -> u64 {
        let slot = |p: usize| self.variable_slot.get(p).copied().flatten();
        if let (Some(a), Some(b)) = (slot(first), slot(second)) {
            return self.co_coverage[a * self.variable_positions + b];
        }
        match (self.covered.get(first), self.covered.get(second)) {
            (Some(a), Some(b)) => sorted_intersection_len(a, b),
            _ => 0,
        }
    }

    fn call(&self, read: u32, position: usize) -> Call {
        let Some(read) = self.reads.get(read as usize) else {
            return Call::Ambiguous;
        };
        if position >= self.reference_length {
            return Call::Ambiguous;
        }
        let base = read.base_at(position);
        if symbol_rank(base).is_none() {
            return Call::Ambiguous;
        }
        match minor_offset(self.consensus[position], base) {
            None => Call::Major,
            Some(offset) => Call::Minor(offset),
        }
    }

    fn hits(&self, reads: &[u32], width: usize) -> Vec<u64> {
        let mut hits = vec![0u64; width];
        for &read in reads {
            let Some(minors) = self.read_minors.get(read as usize) else {
                continue;
            };
            for &index in minors {
                if let Some(slot) = hits.get_mut(index as usize) {
                    *slot += 1;
                }
            }
        }
        hits
    }
}

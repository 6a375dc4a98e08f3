//! 2x2 table reconstruction for a pair of minor variants.
//!
//! The raw inputs are marginals (every read minor at a variant) plus the
//! minor/minor overlap. Reads that are ambiguous at the other position, or
//! carry a different minor there, belong to neither the major nor the minor
//! column and are removed before the table is closed off with `o11`.

use crate::error::{EdgeError, Result};
use crate::types::{Call, ContingencyTable, VariantId, MINOR_COUNT};

/// Read-only view of the variant table shared by every anchor task.
pub trait VariantIndex: Sync {
    fn reference_length(&self) -> usize;

    /// Read ids calling the minor symbol of `index`, ascending.
    fn minor_reads(&self, index: usize) -> &[u32];

    /// Reads calling the major symbol at `position`.
    fn major_count(&self, position: usize) -> u64;

    fn major_symbol(&self, position: usize) -> u8;

    /// Reads with a definite call at both positions.
    fn common_reads(&self, first: usize, second: usize) -> u64;

    fn call(&self, read: u32, position: usize) -> Call;

    /// For every variant index below `width`, how many of `reads` are minor there.
    fn hits(&self, reads: &[u32], width: usize) -> Vec<u64>;

    /// Number of variant indices.
    fn width(&self) -> usize {
        self.reference_length() * MINOR_COUNT
    }

    /// Minor symbol behind a variant index.
    fn symbol(&self, index: usize) -> u8 {
        let variant = VariantId::decode(index);
        variant.symbol(self.major_symbol(variant.position))
    }
}

/// Which decision path a table goes down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// A marginal corrected to zero, or a cell is still zero after the swap.
    ZeroCell,
    Full,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairCounts {
    pub table: ContingencyTable,
    pub route: Route,
    /// `o11` and `o22` were exchanged because `o11` came out zero.
    pub swapped: bool,
}

pub struct ContingencyBuilder<'a, I: VariantIndex + ?Sized> {
    index: &'a I,
}

impl<'a, I: VariantIndex + ?Sized> ContingencyBuilder<'a, I> {
    pub fn new(index: &'a I) -> Self {
        Self { index }
    }

    /// Build the table for `anchor`/`partner` given the reads covering both
    /// positions and the raw minor/minor hit count.
    pub fn build(&self, anchor: usize, partner: usize, reads: u64, o22: u64) -> Result<PairCounts> {
        let first = VariantId::decode(anchor);
        let second = VariantId::decode(partner);

        let o21 = self.corrected_marginal("o21", anchor, partner, second, o22)?;
        if o21 == 0 {
            let o12 = self.corrected_marginal("o12", partner, anchor, first, o22)?;
            return Ok(PairCounts {
                table: close_table(o12, o21, o22, reads),
                route: Route::ZeroCell,
                swapped: false,
            });
        }

        let o12 = self.corrected_marginal("o12", partner, anchor, first, o22)?;
        if o12 == 0 {
            return Ok(PairCounts {
                table: close_table(o12, o21, o22, reads),
                route: Route::ZeroCell,
                swapped: false,
            });
        }

        let mut table = close_table(o12, o21, o22, reads);
        let swapped = table.o11 == 0;
        if swapped {
            std::mem::swap(&mut table.o11, &mut table.o22);
        }
        let route = if table.all_positive() { Route::Full } else { Route::ZeroCell };
        Ok(PairCounts { table, route, swapped })
    }

    /// Minor reads of `own` that call the major symbol at `other`'s position.
    ///
    /// Starts from the whole minor set, drops reads ambiguous at the other
    /// position, then reads carrying a different minor there, then the
    /// minor/minor overlap.
    fn corrected_marginal(
        &self,
        cell: &'static str,
        own: usize,
        other_index: usize,
        other: VariantId,
        o22: u64,
    ) -> Result<u64> {
        let minors = self.index.minor_reads(own);
        let raw = minors.len() as u64;

        let mut ambiguous = 0u64;
        let mut false_minor = 0u64;
        for &read in minors {
            match self.index.call(read, other.position) {
                Call::Ambiguous => ambiguous += 1,
                Call::Minor(offset) if offset != other.minor_offset => false_minor += 1,
                _ => {}
            }
        }

        let negative = |removed: u64| EdgeError::NegativeCount {
            cell,
            first: own.min(other_index),
            second: own.max(other_index),
            raw,
            removed,
        };

        let count = raw.checked_sub(ambiguous).ok_or_else(|| negative(ambiguous))?;
        let count = count
            .checked_sub(false_minor)
            .ok_or_else(|| negative(ambiguous + false_minor))?;
        count
            .checked_sub(o22)
            .ok_or_else(|| negative(ambiguous + false_minor + o22))
    }
}

/// `o11 = reads - o12 - o21 - o22`, clipped at zero.
fn close_table(o12: u64, o21: u64, o22: u64, reads: u64) -> ContingencyTable {
    let o11 = reads.saturating_sub(o12 + o21 + o22);
    ContingencyTable { o11, o12, o21, o22, reads }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structure::{AlignedRead, SnvStructure};

    /// Reference `AAAA`; builds `n` copies of each row.
    fn structure(rows: &[(&str, usize)]) -> SnvStructure {
        let reads = rows
            .iter()
            .flat_map(|(s, n)| std::iter::repeat(AlignedRead::new(0, s.as_bytes())).take(*n))
            .collect();
        SnvStructure::from_reads(reads, 4)
    }

    fn c(position: usize) -> usize {
        // C is offset 0 when the major is A
        VariantId::new(position, 0).encode()
    }

    fn build(s: &SnvStructure, anchor: usize, partner: usize) -> PairCounts {
        let a = VariantId::decode(anchor).position;
        let b = VariantId::decode(partner).position;
        let reads = s.common_reads(a, b);
        let o22 = s.hits(s.minor_reads(anchor), s.width())[partner];
        ContingencyBuilder::new(s).build(anchor, partner, reads, o22).unwrap()
    }

    #[test]
    fn test_clean_table() {
        let s = structure(&[("AAAA", 50), ("CAAA", 6), ("AACA", 7), ("CACA", 9)]);
        let counts = build(&s, c(0), c(2));
        assert_eq!(counts.route, Route::Full);
        assert!(!counts.swapped);
        assert_eq!(
            counts.table,
            ContingencyTable { o11: 50, o12: 7, o21: 6, o22: 9, reads: 72 }
        );
    }

    #[test]
    fn test_ambiguous_and_false_minor_removed() {
        let s = structure(&[
            ("AAAA", 50),
            ("CAAA", 6),
            ("CANA", 3), // ambiguous at the partner position
            ("CAGA", 2), // different minor at the partner position
            ("AACA", 7),
            ("NACA", 4), // ambiguous at the anchor position
            ("CACA", 9),
        ]);
        let counts = build(&s, c(0), c(2));
        // reads covering both: 50 + 6 + 2 + 7 + 9
        assert_eq!(counts.table.reads, 74);
        assert_eq!(counts.table.o21, 6);
        assert_eq!(counts.table.o12, 7);
        assert_eq!(counts.table.o22, 9);
        // the false-minor reads stay in the complement
        assert_eq!(counts.table.o11, 52);
        assert!(counts.table.total() <= counts.table.reads);
    }

    #[test]
    fn test_zero_o21_routes_to_zero_cell() {
        let s = structure(&[("AAAA", 50), ("AACA", 7), ("CACA", 9)]);
        let counts = build(&s, c(0), c(2));
        assert_eq!(counts.route, Route::ZeroCell);
        assert_eq!(counts.table.o21, 0);
        assert_eq!(counts.table.o12, 7);
        assert_eq!(counts.table.o11, 50);
    }

    #[test]
    fn test_zero_o12_routes_to_zero_cell() {
        let s = structure(&[("AAAA", 50), ("CAAA", 6), ("CACA", 9)]);
        let counts = build(&s, c(0), c(2));
        assert_eq!(counts.route, Route::ZeroCell);
        assert_eq!(counts.table.o12, 0);
        assert_eq!(counts.table.o21, 6);
    }

    #[test]
    fn test_swap_when_no_major_major_reads() {
        // Every read covering both positions carries at least one minor; the
        // single-position reads keep A as the major at 0 and 2.
        let s = structure(&[
            ("CAAA", 30),
            ("AACA", 30),
            ("CACA", 40),
            ("AANA", 100),
            ("NAAA", 100),
        ]);
        let counts = build(&s, c(0), c(2));
        assert!(counts.swapped);
        assert_eq!(counts.table.o11, 40);
        assert_eq!(counts.table.o22, 0);
        assert_eq!(counts.table.reads, 100);
        // o22 is now zero, so the full path no longer applies
        assert_eq!(counts.route, Route::ZeroCell);
    }

    struct Inconsistent;

    impl VariantIndex for Inconsistent {
        fn reference_length(&self) -> usize {
            4
        }
        fn minor_reads(&self, _index: usize) -> &[u32] {
            &[0, 1]
        }
        fn major_count(&self, _position: usize) -> u64 {
            0
        }
        fn major_symbol(&self, _position: usize) -> u8 {
            b'A'
        }
        fn common_reads(&self, _first: usize, _second: usize) -> u64 {
            10
        }
        fn call(&self, _read: u32, _position: usize) -> Call {
            Call::Major
        }
        fn hits(&self, _reads: &[u32], width: usize) -> Vec<u64> {
            vec![5; width]
        }
    }

    #[test]
    fn test_overlap_larger_than_marginal_is_an_error() {
        let err = ContingencyBuilder::new(&Inconsistent).build(c(0), c(2), 10, 5).unwrap_err();
        assert!(matches!(err, EdgeError::NegativeCount { cell: "o21", raw: 2, removed: 5, .. }));
    }

    #[test]
    fn test_negative_count_names_pair_in_index_order() {
        let err = ContingencyBuilder::new(&Inconsistent).build(c(2), c(0), 10, 5).unwrap_err();
        assert_eq!(
            err,
            EdgeError::NegativeCount { cell: "o21", first: c(0), second: c(2), raw: 2, removed: 5 }
        );
    }
}

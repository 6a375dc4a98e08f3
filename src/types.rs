/// Definite symbols a read can carry at a reference position, in index order.
pub const ALPHABET: &[u8; 5] = b"ACGT-";

/// Number of minor symbols per position (every definite symbol except the major).
pub const MINOR_COUNT: usize = ALPHABET.len() - 1;

/// Gap symbol produced by a deletion in the read.
pub const GAP: u8 = b'-';

/// Ambiguous / uncalled base.
pub const AMBIGUOUS: u8 = b'N';

/// Position in the alphabet for a definite symbol, `None` for anything ambiguous.
pub fn symbol_rank(symbol: u8) -> Option<usize> {
    ALPHABET.iter().position(|&s| s == symbol.to_ascii_uppercase())
}

/// A minor allele: the genome position plus which of the `MINOR_COUNT`
/// non-major symbols it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VariantId {
    pub position: usize,
    pub minor_offset: usize,
}

impl VariantId {
    pub fn new(position: usize, minor_offset: usize) -> Self {
        debug_assert!(minor_offset < MINOR_COUNT);
        Self { position, minor_offset }
    }

    /// Flat index used for the hit vector and the minor-read table.
    pub fn encode(&self) -> usize {
        self.position * MINOR_COUNT + self.minor_offset
    }

    pub fn decode(index: usize) -> Self {
        Self {
            position: index / MINOR_COUNT,
            minor_offset: index % MINOR_COUNT,
        }
    }

    /// Symbol this variant stands for given the major symbol at its position.
    pub fn symbol(&self, major: u8) -> u8 {
        minor_symbol(major, self.minor_offset)
    }
}

/// The `offset`-th symbol of the alphabet once `major` is taken out.
pub fn minor_symbol(major: u8, offset: usize) -> u8 {
    let major_rank = symbol_rank(major).unwrap_or(ALPHABET.len());
    let rank = if offset < major_rank { offset } else { offset + 1 };
    ALPHABET[rank.min(ALPHABET.len() - 1)]
}

/// Inverse of [`minor_symbol`]; `None` when `symbol` is the major or not definite.
pub fn minor_offset(major: u8, symbol: u8) -> Option<usize> {
    let rank = symbol_rank(symbol)?;
    match symbol_rank(major) {
        Some(major_rank) if rank == major_rank => None,
        Some(major_rank) if rank > major_rank => Some(rank - 1),
        _ => Some(rank),
    }
}

/// What a single read says at one reference position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    Major,
    Minor(usize),
    /// `N`, or the position lies outside the read.
    Ambiguous,
}

/// 2x2 read counts for a pair of variants.
///
/// ```text
///                  second major | second minor
/// first major:         o11      |     o12
/// first minor:         o21      |     o22
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ContingencyTable {
    pub o11: u64,
    pub o12: u64,
    pub o21: u64,
    pub o22: u64,
    /// Reads with a definite call at both positions.
    pub reads: u64,
}

impl ContingencyTable {
    pub fn total(&self) -> u64 {
        self.o11 + self.o12 + self.o21 + self.o22
    }

    pub fn all_positive(&self) -> bool {
        self.o11 > 0 && self.o12 > 0 && self.o21 > 0 && self.o22 > 0
    }
}

/// Significance reported for an edge. The full path reports the upper tail
/// itself; the zero-cell path reports its natural log. They are not comparable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PValue {
    Tail(f64),
    LnTail(f64),
}

impl PValue {
    pub fn value(&self) -> f64 {
        match self {
            PValue::Tail(v) | PValue::LnTail(v) => *v,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            PValue::Tail(_) => "tail",
            PValue::LnTail(_) => "ln_tail",
        }
    }
}

/// Which test let an edge through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acceptance {
    Exact,
    Heuristic,
}

impl Acceptance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Acceptance::Exact => "exact",
            Acceptance::Heuristic => "heuristic",
        }
    }
}

/// Outcome of evaluating one pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Decision {
    Rejected,
    AcceptedExact(PValue),
    AcceptedHeuristic(PValue),
}

impl Decision {
    pub fn accepted(&self) -> Option<(Acceptance, PValue)> {
        match *self {
            Decision::Rejected => None,
            Decision::AcceptedExact(p) => Some((Acceptance::Exact, p)),
            Decision::AcceptedHeuristic(p) => Some((Acceptance::Heuristic, p)),
        }
    }
}

/// An accepted pair of linked variants.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeSummary {
    pub first_index: usize,
    pub second_index: usize,
    pub first: VariantId,
    pub second: VariantId,
    pub first_symbol: u8,
    pub second_symbol: u8,
    pub table: ContingencyTable,
    pub p_value: PValue,
    pub acceptance: Acceptance,
    pub relative_frequency: f64, // o22 / reads covering both positions
    pub true_edge: bool,
    pub error_ratio: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode() {
        let v = VariantId::new(17, 3);
        assert_eq!(v.encode(), 17 * MINOR_COUNT + 3);
        assert_eq!(VariantId::decode(v.encode()), v);
        assert_eq!(VariantId::decode(0), VariantId::new(0, 0));
        assert_eq!(VariantId::decode(MINOR_COUNT).position, 1);
    }

    #[test]
    fn test_minor_symbols_skip_major() {
        // Major C: minors are A, G, T, -
        assert_eq!(minor_symbol(b'C', 0), b'A');
        assert_eq!(minor_symbol(b'C', 1), b'G');
        assert_eq!(minor_symbol(b'C', 2), b'T');
        assert_eq!(minor_symbol(b'C', 3), b'-');
        // Major gap: minors are the four bases
        assert_eq!(minor_symbol(b'-', 3), b'T');
    }

    #[test]
    fn test_minor_offset_inverse() {
        for &major in ALPHABET.iter() {
            for offset in 0..MINOR_COUNT {
                let s = minor_symbol(major, offset);
                assert_eq!(minor_offset(major, s), Some(offset));
            }
            assert_eq!(minor_offset(major, major), None);
        }
        assert_eq!(minor_offset(b'A', b'N'), None);
        assert_eq!(minor_offset(b'A', b'g'), Some(1));
    }

    #[test]
    fn test_table_helpers() {
        let t = ContingencyTable { o11: 5, o12: 1, o21: 2, o22: 0, reads: 10 };
        assert_eq!(t.total(), 8);
        assert!(!t.all_positive());
    }

    #[test]
    fn test_decision_accepted() {
        assert_eq!(Decision::Rejected.accepted(), None);
        let d = Decision::AcceptedHeuristic(PValue::LnTail(-3.0));
        assert_eq!(d.accepted(), Some((Acceptance::Heuristic, PValue::LnTail(-3.0))));
        assert_eq!(PValue::Tail(0.5).kind(), "tail");
    }
}

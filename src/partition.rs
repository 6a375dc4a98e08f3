/// Partner indices an anchor evaluates out of `n` candidates.
///
/// Every anchor takes the ~n/2 indices that follow it, wrapping around the
/// end. Laid out as an n x n grid the kept cells form a diagonal band:
///
/// ```text
///  ****
///   ****
///    ****
///     ****
/// *    ***
/// **    **
/// ***    *
/// ```
///
/// so each unordered pair `{a, b}` is visited by exactly one of its two
/// anchors and every anchor gets within one of n/2 partners.
pub fn partners(anchor: usize, n: usize) -> impl Iterator<Item = usize> {
    (0..n).filter(move |&b| is_partner(anchor, b, n))
}

/// Membership test behind [`partners`]:
/// `(b > a && b < a + n/2) || b <= a - n/2`, never `b == a`.
pub fn is_partner(anchor: usize, b: usize, n: usize) -> bool {
    let half = n / 2;
    if b == anchor {
        return false;
    }
    (b > anchor && b < anchor + half) || b + half <= anchor
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn covered_pairs(n: usize) -> Vec<(usize, usize)> {
        let mut pairs = Vec::new();
        for a in 0..n {
            for b in partners(a, n) {
                pairs.push((a.min(b), a.max(b)));
            }
        }
        pairs
    }

    #[test]
    fn test_every_pair_exactly_once() {
        for n in 0..40 {
            let pairs = covered_pairs(n);
            let unique: HashSet<_> = pairs.iter().copied().collect();
            assert_eq!(pairs.len(), unique.len(), "duplicate pair for n={}", n);
            let expected = n * n.saturating_sub(1) / 2;
            assert_eq!(unique.len(), expected, "missing pairs for n={}", n);
        }
    }

    #[test]
    fn test_balanced_share() {
        for n in 1..64 {
            for a in 0..n {
                let count = partners(a, n).count();
                assert!(
                    count.abs_diff(n / 2) <= 1,
                    "anchor {} of {} has {} partners",
                    a,
                    n,
                    count
                );
            }
        }
    }

    #[test]
    fn test_never_self() {
        for a in 0..10 {
            assert!(!is_partner(a, a, 10));
        }
    }

    #[test]
    fn test_wraparound() {
        // n = 8, half = 4: anchor 6 sees 7 forward and 0..=2 wrapped
        let got: Vec<usize> = partners(6, 8).collect();
        assert_eq!(got, vec![0, 1, 2, 7]);
        let first: Vec<usize> = partners(0, 8).collect();
        assert_eq!(first, vec![1, 2, 3]);
    }
}

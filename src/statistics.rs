use crate::error::{EdgeError, Result};
use crate::types::ContingencyTable;
use statrs::distribution::{Binomial, Discrete, DiscreteCDF};

/// Log-space terms this far below the leading term no longer change the sum.
const LN_TAIL_CUTOFF: f64 = -50.0;

/// Probability that a read is minor/minor under independence of the two
/// positions.
///
/// p = (o12 * o21) / (o11 * reads)
///
/// NaN when `o11` or `reads` is zero.
pub fn null_probability(table: &ContingencyTable) -> f64 {
    (table.o12 as f64 * table.o21 as f64) / (table.o11 as f64 * table.reads as f64)
}

/// Error-weighted share of minor/minor reads.
///
/// ratio = o22 / (e * o11 + (1 - e) * (o12 + o21))
pub fn error_ratio(table: &ContingencyTable, max_read_error: f64) -> f64 {
    let denominator = max_read_error * table.o11 as f64
        + (1.0 - max_read_error) * (table.o12 + table.o21) as f64;
    table.o22 as f64 / denominator
}

/// Bonferroni-style cut-off for one of the L*(L-1)/2 position pairs.
pub fn bonferroni_threshold(adjustment: f64, reference_length: usize) -> f64 {
    let l = reference_length as f64;
    adjustment / (l * (l - 1.0) / 2.0)
}

fn binomial(n: u64, p: f64) -> Result<Binomial> {
    Binomial::new(p, n).map_err(|_| EdgeError::InvalidBinomial { n, p })
}

/// One-sided upper tail P(X >= k) for X ~ Binomial(n, p).
pub fn binomial_upper_tail(k: u64, n: u64, p: f64) -> Result<f64> {
    let dist = binomial(n, p)?;
    if k == 0 {
        return Ok(1.0);
    }
    if k > n {
        return Ok(0.0);
    }
    Ok(dist.sf(k - 1))
}

/// Natural log of P(X >= k) for X ~ Binomial(n, p).
///
/// Falls back to a log-sum-exp over the pmf when the tail underflows, so very
/// small tails still get a finite value.
pub fn binomial_ln_upper_tail(k: u64, n: u64, p: f64) -> Result<f64> {
    let dist = binomial(n, p)?;
    if k == 0 || p >= 1.0 {
        return Ok(0.0);
    }
    if k > n || p <= 0.0 {
        return Ok(f64::NEG_INFINITY);
    }

    let tail = dist.sf(k - 1);
    if tail > f64::MIN_POSITIVE {
        return Ok(tail.ln());
    }

    // The tail starts past the mode, so the first term is the largest.
    let lead = dist.ln_pmf(k);
    let mut sum = 0.0;
    for i in k..=n {
        let delta = dist.ln_pmf(i) - lead;
        if delta < LN_TAIL_CUTOFF {
            break;
        }
        sum += delta.exp();
    }
    Ok(lead + sum.ln())
}

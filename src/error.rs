//! Error types for edge detection.

use thiserror::Error;

/// Result type alias for the edge-detection core
pub type Result<T> = std::result::Result<T, EdgeError>;

/// Error type for the edge-detection core
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EdgeError {
    /// Invalid configuration value
    #[error("Invalid parameter '{parameter}': {reason}")]
    InvalidParameter {
        /// The parameter name
        parameter: String,
        /// Explanation of why it's invalid
        reason: String,
    },

    /// A marginal correction removed more reads than the marginal held
    #[error("Negative {cell} for pair {first}-{second}: {raw} reads, {removed} removed")]
    NegativeCount {
        /// Cell being corrected (`o21` or `o12`)
        cell: &'static str,
        /// Lower variant index of the pair
        first: usize,
        /// Higher variant index of the pair
        second: usize,
        /// Count before correction
        raw: u64,
        /// Reads the correction tried to remove
        removed: u64,
    },

    /// Binomial null model could not be built
    #[error("Invalid binomial parameters: n={n}, p={p}")]
    InvalidBinomial {
        /// Number of trials
        n: u64,
        /// Success probability
        p: f64,
    },

    /// Anchor index past the end of the variant table
    #[error("Anchor {anchor} out of range (width {width})")]
    AnchorOutOfRange {
        /// Requested anchor
        anchor: usize,
        /// Number of variant indices
        width: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_count_message() {
        let err = EdgeError::NegativeCount { cell: "o21", first: 4, second: 9, raw: 3, removed: 5 };
        assert_eq!(err.to_string(), "Negative o21 for pair 4-9: 3 reads, 5 removed");
    }

    #[test]
    fn test_invalid_parameter_message() {
        let err = EdgeError::InvalidParameter {
            parameter: "adjustment".to_string(),
            reason: "must be positive".to_string(),
        };
        assert!(err.to_string().contains("adjustment"));
    }
}

use crate::error::{EdgeError, Result};

/// Below this null probability the pair is accepted without a tail test.
pub const INDEPENDENCE_FLOOR: f64 = 1e-12;

/// Single-end evidence is only trusted for positions closer than this
/// fraction of the fragment length.
pub const SINGLE_READ_SPAN: f64 = 0.8;

/// Thresholds for one edge-detection run. Read-only once the scan starts.
#[derive(Debug, Clone)]
pub struct EdgeConfig {
    pub min_o22: u64,
    pub start_position: usize, // inclusive
    pub end_position: usize,   // inclusive
    pub close_positions: usize,
    pub max_read_error: f64,
    pub adjustment: f64,
    pub single_read: bool,
    pub fragment_length: f64,
    pub ignore_deletions: bool,
}

impl Default for EdgeConfig {
    fn default() -> Self {
        Self {
            min_o22: 10,
            start_position: 0,
            end_position: usize::MAX,
            close_positions: 1,
            max_read_error: 0.1,
            adjustment: 1e-7,
            single_read: false,
            fragment_length: 0.0,
            ignore_deletions: false,
        }
    }
}

impl EdgeConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.max_read_error > 0.0 && self.max_read_error < 1.0) {
            return Err(invalid("max_read_error", format!("{} is not in (0, 1)", self.max_read_error)));
        }
        if !(self.adjustment > 0.0) {
            return Err(invalid("adjustment", format!("{} must be positive", self.adjustment)));
        }
        if self.start_position > self.end_position {
            return Err(invalid(
                "start_position",
                format!("{} is after end position {}", self.start_position, self.end_position),
            ));
        }
        if self.fragment_length < 0.0 {
            return Err(invalid("fragment_length", "must not be negative".to_string()));
        }
        Ok(())
    }

    pub fn in_window(&self, position: usize) -> bool {
        position >= self.start_position && position <= self.end_position
    }

    /// Whether the error-ratio heuristic may be used for two positions.
    pub fn heuristic_allowed(&self, first: usize, second: usize) -> bool {
        let distance = first.abs_diff(second) as f64;
        !(self.single_read && distance > SINGLE_READ_SPAN * self.fragment_length)
    }
}

fn invalid(parameter: &str, reason: String) -> EdgeError {
    EdgeError::InvalidParameter { parameter: parameter.to_string(), reason }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(EdgeConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_error_rate() {
        let cfg = EdgeConfig { max_read_error: 1.5, ..Default::default() };
        assert!(matches!(
            cfg.validate(),
            Err(EdgeError::InvalidParameter { parameter, .. }) if parameter == "max_read_error"
        ));
    }

    #[test]
    fn test_rejects_inverted_window() {
        let cfg = EdgeConfig { start_position: 50, end_position: 10, ..Default::default() };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_window_is_inclusive() {
        let cfg = EdgeConfig { start_position: 10, end_position: 20, ..Default::default() };
        assert!(cfg.in_window(10));
        assert!(cfg.in_window(20));
        assert!(!cfg.in_window(9));
        assert!(!cfg.in_window(21));
    }

    #[test]
    fn test_heuristic_allowed() {
        let paired = EdgeConfig { fragment_length: 100.0, ..Default::default() };
        assert!(paired.heuristic_allowed(0, 5000));

        let single = EdgeConfig { single_read: true, fragment_length: 100.0, ..Default::default() };
        assert!(single.heuristic_allowed(0, 80));
        assert!(!single.heuristic_allowed(0, 81));
        assert!(!single.heuristic_allowed(81, 0));
    }
}

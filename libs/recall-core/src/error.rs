//! Error types for recall-core.

use std::fmt;

use thiserror::Error;

/// Result type alias using ParseError.
pub type Result<T> = std::result::Result<T, ParseError>;

/// Errors raised when decoding ratings, modes, or persisted state labels.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("invalid rating {0:?}")]
    InvalidRating(String),

    #[error("invalid mode {0:?}")]
    InvalidMode(String),

    #[error("invalid card state {0:?}")]
    InvalidCardState(String),
}

/// A single weight that falls outside its allowed range.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightViolation {
    pub index: usize,
    pub value: f64,
    pub lower: f64,
    pub upper: f64,
}

impl fmt::Display for WeightViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "weights[{}] = {} is out of bounds: ({}, {})",
            self.index, self.value, self.lower, self.upper
        )
    }
}

/// Errors raised when building a scheduler from a configuration.
///
/// These are configuration-load failures, never per-review conditions.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchedulerError {
    #[error("one or more weights are out of bounds: {}", join_violations(.0))]
    WeightsOutOfBounds(Vec<WeightViolation>),

    #[error("desired retention must be between 0 and 1 (exclusive), got {0}")]
    InvalidRetention(f64),

    #[error("maximum interval must be between 1 and 36500 days, got {0}")]
    InvalidMaximumInterval(i64),

    #[error("step ladder entries must be positive and no longer than the maximum interval")]
    InvalidStep,
}

fn join_violations(violations: &[WeightViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weights_error_lists_every_violation() {
        let err = SchedulerError::WeightsOutOfBounds(vec![
            WeightViolation { index: 0, value: 0.0, lower: 0.001, upper: 100.0 },
            WeightViolation { index: 20, value: 0.9, lower: 0.1, upper: 0.8 },
        ]);
        let message = err.to_string();
        assert!(message.contains("weights[0] = 0"));
        assert!(message.contains("weights[20] = 0.9"));
    }

    #[test]
    fn parse_error_display() {
        assert_eq!(
            ParseError::InvalidRating("meh".to_string()).to_string(),
            "invalid rating \"meh\""
        );
    }
}

//! Scheduler configuration.
//!
//! One configuration exists per notebook. It is an immutable value for the
//! duration of a scheduling call; changing it only affects future interval
//! math unless a reschedule is run explicitly.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::{SchedulerError, WeightViolation};

/// Number of model weights (FSRS-6).
pub const NUM_WEIGHTS: usize = 21;

pub const DEFAULT_DESIRED_RETENTION: f64 = 0.9;
pub const DEFAULT_MAXIMUM_INTERVAL: i64 = 36500;
/// Hundred years; keeps every due date representable.
pub const MAX_MAXIMUM_INTERVAL: i64 = 36500;
pub const DEFAULT_DECAY: f64 = 0.1542;

/// Upper bound of the initial-stability weights.
const INITIAL_STABILITY_MAX: f64 = 100.0;
const STABILITY_MIN: f64 = crate::algorithm::MIN_STABILITY;

/// Default FSRS-6 weights.
pub const DEFAULT_WEIGHTS: [f64; NUM_WEIGHTS] = [
    0.212, 1.2931, 2.3065, 8.2956, // w[0-3]: initial stability for Again, Hard, Good, Easy
    6.4133, // w[4]: initial difficulty base
    0.8334, // w[5]: initial difficulty slope
    3.0194, // w[6]: difficulty delta per rating
    0.001,  // w[7]: mean reversion weight
    1.8722, // w[8]: recall stability scale
    0.1666, // w[9]: recall stability decay
    0.796,  // w[10]: retrievability effect on recall
    1.4835, // w[11]: forget stability base
    0.0614, // w[12]: difficulty on forget
    0.2629, // w[13]: stability on forget
    1.6483, // w[14]: retrievability on forget
    0.6014, // w[15]: hard penalty
    1.8729, // w[16]: easy bonus
    0.5425, // w[17]: short-term stability scale
    0.0912, // w[18]: short-term rating offset
    0.0658, // w[19]: short-term stability decay
    DEFAULT_DECAY, // w[20]: forgetting curve decay
];

const LOWER_BOUNDS: [f64; NUM_WEIGHTS] = [
    STABILITY_MIN, STABILITY_MIN, STABILITY_MIN, STABILITY_MIN,
    1.0, 0.001, 0.001, 0.001,
    0.0, 0.0, 0.001, 0.001,
    0.001, 0.001, 0.0, 0.0,
    1.0, 0.0, 0.0, 0.0,
    0.1,
];

const UPPER_BOUNDS: [f64; NUM_WEIGHTS] = [
    INITIAL_STABILITY_MAX, INITIAL_STABILITY_MAX, INITIAL_STABILITY_MAX, INITIAL_STABILITY_MAX,
    10.0, 4.0, 4.0, 0.75,
    4.5, 0.8, 3.5, 5.0,
    0.25, 0.9, 4.0, 1.0,
    6.0, 2.0, 2.0, 0.8,
    0.8,
];

/// Scheduler configuration attached to a notebook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub weights: [f64; NUM_WEIGHTS],
    pub desired_retention: f64,
    /// Learning ladder, serialized as whole seconds.
    #[serde(with = "step_seconds")]
    pub learning_steps: Vec<Duration>,
    /// Relearning ladder, serialized as whole seconds.
    #[serde(with = "step_seconds")]
    pub relearning_steps: Vec<Duration>,
    /// Longest interval in days.
    pub maximum_interval: i64,
    pub enable_fuzzing: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            weights: DEFAULT_WEIGHTS,
            desired_retention: DEFAULT_DESIRED_RETENTION,
            learning_steps: vec![Duration::minutes(1), Duration::minutes(10)],
            relearning_steps: vec![Duration::minutes(10)],
            maximum_interval: DEFAULT_MAXIMUM_INTERVAL,
            enable_fuzzing: true,
        }
    }
}

impl SchedulerConfig {
    /// Check every weight against its bounds and the remaining fields for sanity.
    ///
    /// All weight violations are reported together.
    pub fn validate(&self) -> Result<(), SchedulerError> {
        let violations: Vec<WeightViolation> = self
            .weights
            .iter()
            .enumerate()
            .filter(|(i, w)| **w < LOWER_BOUNDS[*i] || **w > UPPER_BOUNDS[*i] || w.is_nan())
            .map(|(index, value)| WeightViolation {
                index,
                value: *value,
                lower: LOWER_BOUNDS[index],
                upper: UPPER_BOUNDS[index],
            })
            .collect();
        if !violations.is_empty() {
            return Err(SchedulerError::WeightsOutOfBounds(violations));
        }

        if !(self.desired_retention > 0.0 && self.desired_retention < 1.0) {
            return Err(SchedulerError::InvalidRetention(self.desired_retention));
        }
        if !(1..=MAX_MAXIMUM_INTERVAL).contains(&self.maximum_interval) {
            return Err(SchedulerError::InvalidMaximumInterval(self.maximum_interval));
        }
        // Steps may not outlast the longest review interval
        let zero = Duration::zero();
        let longest = Duration::days(self.maximum_interval);
        if self
            .learning_steps
            .iter()
            .chain(self.relearning_steps.iter())
            .any(|step| *step <= zero || *step > longest)
        {
            return Err(SchedulerError::InvalidStep);
        }
        Ok(())
    }

    /// Copy of this configuration with fuzzing switched on or off.
    pub fn with_fuzzing(mut self, enable: bool) -> Self {
        self.enable_fuzzing = enable;
        self
    }
}

mod step_seconds {
    use chrono::Duration;
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(steps: &[Duration], serializer: S) -> Result<S::Ok, S::Error> {
        steps
            .iter()
            .map(Duration::num_seconds)
            .collect::<Vec<_>>()
            .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Duration>, D::Error> {
        let seconds = Vec::<i64>::deserialize(deserializer)?;
        seconds
            .into_iter()
            .map(|s| {
                Duration::try_seconds(s)
                    .ok_or_else(|| D::Error::custom(format!("step of {} seconds is out of range", s)))
            })
            .collect()
    }
}

//! Memory model: pure functions over the model weights.

use crate::config::NUM_WEIGHTS;
use crate::types::Rating;

pub const MIN_STABILITY: f64 = 0.001;
pub const MIN_DIFFICULTY: f64 = 1.0;
pub const MAX_DIFFICULTY: f64 = 10.0;

/// Retrievability the stability is defined against.
const STABILITY_RETENTION: f64 = 0.9;

/// FSRS-6 memory model with precomputed forgetting-curve constants.
#[derive(Debug, Clone)]
pub struct MemoryModel {
    w: [f64; NUM_WEIGHTS],
    decay: f64,
    factor: f64,
}

impl MemoryModel {
    /// Weights are expected to be validated already.
    pub fn new(weights: [f64; NUM_WEIGHTS]) -> Self {
        let decay = -weights[20];
        let factor = STABILITY_RETENTION.powf(1.0 / decay) - 1.0;
        Self {
            w: weights,
            decay,
            factor,
        }
    }

    /// S0(G) = w[G-1]
    pub fn initial_stability(&self, rating: Rating) -> f64 {
        clamp_stability(self.w[usize::from(rating.to_value()) - 1])
    }

    /// D0(G) = w[4] - e^(w[5] * (G - 1)) + 1
    pub fn initial_difficulty(&self, rating: Rating) -> f64 {
        clamp_difficulty(self.raw_initial_difficulty(rating))
    }

    fn raw_initial_difficulty(&self, rating: Rating) -> f64 {
        let g = f64::from(rating.to_value());
        self.w[4] - (self.w[5] * (g - 1.0)).exp() + 1.0
    }

    /// Linear-damped update pulled toward D0(Easy):
    /// D' = w[7] * D0(4) + (1 - w[7]) * (D + ΔD * (10 - D) / 9), ΔD = -w[6] * (G - 3)
    pub fn next_difficulty(&self, difficulty: f64, rating: Rating) -> f64 {
        let g = f64::from(rating.to_value());
        let delta = -(self.w[6] * (g - 3.0));
        let damped = difficulty + (10.0 - difficulty) * delta / 9.0;
        let target = self.raw_initial_difficulty(Rating::Easy);
        clamp_difficulty(self.w[7] * target + (1.0 - self.w[7]) * damped)
    }

    /// Same-day review: S' = S * e^(w[17] * (G - 3 + w[18])) * S^(-w[19])
    ///
    /// A correct answer never lowers stability here.
    pub fn short_term_stability(&self, stability: f64, rating: Rating) -> f64 {
        let g = f64::from(rating.to_value());
        let mut increase =
            (self.w[17] * (g - 3.0 + self.w[18])).exp() * stability.powf(-self.w[19]);
        if matches!(rating, Rating::Good | Rating::Easy) {
            increase = increase.max(1.0);
        }
        clamp_stability(stability * increase)
    }

    pub fn next_stability(
        &self,
        difficulty: f64,
        stability: f64,
        retrievability: f64,
        rating: Rating,
    ) -> f64 {
        let next = match rating {
            Rating::Again => self.next_forget_stability(difficulty, stability, retrievability),
            _ => self.next_recall_stability(difficulty, stability, retrievability, rating),
        };
        clamp_stability(next)
    }

    /// S'f = w[11] * D^(-w[12]) * ((S+1)^w[13] - 1) * e^(w[14]*(1-R)),
    /// capped by the same-day estimate S / e^(w[17] * w[18]).
    fn next_forget_stability(&self, difficulty: f64, stability: f64, retrievability: f64) -> f64 {
        let long_term = self.w[11]
            * difficulty.powf(-self.w[12])
            * ((stability + 1.0).powf(self.w[13]) - 1.0)
            * ((1.0 - retrievability) * self.w[14]).exp();
        let short_term = stability / (self.w[17] * self.w[18]).exp();
        long_term.min(short_term)
    }

    /// S'r = S * (1 + e^w[8] * (11 - D) * S^(-w[9]) * (e^(w[10]*(1-R)) - 1) * hard * easy)
    fn next_recall_stability(
        &self,
        difficulty: f64,
        stability: f64,
        retrievability: f64,
        rating: Rating,
    ) -> f64 {
        let hard_penalty = if rating == Rating::Hard { self.w[15] } else { 1.0 };
        let easy_bonus = if rating == Rating::Easy { self.w[16] } else { 1.0 };
        stability
            * (1.0
                + self.w[8].exp()
                    * (11.0 - difficulty)
                    * stability.powf(-self.w[9])
                    * (((1.0 - retrievability) * self.w[10]).exp() - 1.0)
                    * hard_penalty
                    * easy_bonus)
    }

    /// R = (1 + factor * t / S)^decay
    pub fn retrievability(&self, elapsed_days: i64, stability: f64) -> f64 {
        let t = elapsed_days.max(0) as f64;
        (1.0 + self.factor * t / stability).powf(self.decay)
    }

    pub fn next_interval(&self, stability: f64, desired_retention: f64, maximum_interval: i64) -> i64 {
        next_interval(
            stability,
            desired_retention,
            self.decay,
            self.factor,
            maximum_interval,
        )
    }
}

/// Days until predicted recall falls to `desired_retention`, rounded and
/// clamped to `[1, maximum_interval]`.
///
/// I = S / factor * (R^(1/decay) - 1)
pub fn next_interval(
    stability: f64,
    desired_retention: f64,
    decay: f64,
    factor: f64,
    maximum_interval: i64,
) -> i64 {
    let interval = (stability / factor) * (desired_retention.powf(1.0 / decay) - 1.0);
    let interval = interval.round().max(1.0).min(maximum_interval as f64);
    interval as i64
}

fn clamp_difficulty(difficulty: f64) -> f64 {
    difficulty.clamp(MIN_DIFFICULTY, MAX_DIFFICULTY)
}

fn clamp_stability(stability: f64) -> f64 {
    stability.max(MIN_STABILITY)
}

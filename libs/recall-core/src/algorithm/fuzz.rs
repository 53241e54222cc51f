//! Interval fuzzing.
//!
//! Spreads reviews that would otherwise land on the same day. Only applied
//! to intervals of at least 2.5 days.

use rand::Rng;

struct FuzzRange {
    start: f64,
    end: f64,
    factor: f64,
}

const FUZZ_RANGES: [FuzzRange; 3] = [
    FuzzRange { start: 2.5, end: 7.0, factor: 0.15 },
    FuzzRange { start: 7.0, end: 20.0, factor: 0.1 },
    FuzzRange { start: 20.0, end: f64::INFINITY, factor: 0.05 },
];

const MIN_FUZZ_INTERVAL: f64 = 2.5;
const MIN_FUZZED_DAYS: i64 = 2;

/// Half-width of the fuzz window for an interval in days.
pub fn fuzz_delta(interval_days: f64) -> f64 {
    FUZZ_RANGES.iter().fold(1.0, |delta, range| {
        delta + range.factor * (interval_days.min(range.end) - range.start).max(0.0)
    })
}

/// Inclusive `(min, max)` window a fuzzed interval is drawn from.
///
/// The lower edge is clamped to 2 days even though fuzzing starts at 2.5.
pub fn fuzz_range(interval_days: i64, maximum_interval: i64) -> (i64, i64) {
    let days = interval_days as f64;
    let delta = fuzz_delta(days);
    let max_ivl = ((days + delta).round() as i64).min(maximum_interval);
    let min_ivl = ((days - delta).round() as i64).max(MIN_FUZZED_DAYS).min(max_ivl);
    (min_ivl, max_ivl)
}

/// Draw a fuzzed interval uniformly from the fuzz window.
pub fn fuzzed_interval<R: Rng + ?Sized>(interval_days: i64, maximum_interval: i64, rng: &mut R) -> i64 {
    if (interval_days as f64) < MIN_FUZZ_INTERVAL {
        return interval_days;
    }
    let (min_ivl, max_ivl) = fuzz_range(interval_days, maximum_interval);
    rng.gen_range(min_ivl..=max_ivl)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn short_intervals_are_not_fuzzed() {
        let mut rng = StdRng::seed_from_u64(7);
        for days in [1, 2] {
            for _ in 0..50 {
                assert_eq!(fuzzed_interval(days, 36500, &mut rng), days);
            }
        }
    }

    #[test]
    fn delta_widens_across_bands() {
        assert_eq!(fuzz_delta(2.0), 1.0);
        assert!((fuzz_delta(7.0) - (1.0 + 0.15 * 4.5)).abs() < 1e-12);
        assert!((fuzz_delta(20.0) - (1.0 + 0.15 * 4.5 + 0.1 * 13.0)).abs() < 1e-12);
        assert!((fuzz_delta(120.0) - (1.0 + 0.15 * 4.5 + 0.1 * 13.0 + 0.05 * 100.0)).abs() < 1e-9);
    }

    #[test]
    fn lower_edge_is_two_days() {
        // 3 - 1.075 rounds to 2
        assert_eq!(fuzz_range(3, 36500), (2, 4));
    }

    #[test]
    fn window_respects_maximum_interval() {
        let (min_ivl, max_ivl) = fuzz_range(100, 100);
        assert_eq!(max_ivl, 100);
        assert!(min_ivl < 100);
        assert_eq!(fuzz_range(10, 1), (1, 1));
    }

    #[test]
    fn fuzzed_values_stay_in_window() {
        let mut rng = StdRng::seed_from_u64(42);
        for days in [3, 7, 15, 45, 365] {
            let (lo, hi) = fuzz_range(days, 36500);
            for _ in 0..200 {
                let fuzzed = fuzzed_interval(days, 36500, &mut rng);
                assert!(fuzzed >= lo && fuzzed <= hi, "{} outside [{}, {}]", fuzzed, lo, hi);
            }
        }
    }

    #[test]
    fn same_seed_gives_same_sequence() {
        let mut a = StdRng::seed_from_u64(99);
        let mut b = StdRng::seed_from_u64(99);
        let xs: Vec<i64> = (0..20).map(|_| fuzzed_interval(30, 36500, &mut a)).collect();
        let ys: Vec<i64> = (0..20).map(|_| fuzzed_interval(30, 36500, &mut b)).collect();
        assert_eq!(xs, ys);
    }
}

//! Rating previews shown before the user answers.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::algorithm::Scheduler;
use crate::types::{Rating, ScheduleState};

/// Next interval for each rating, formatted for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntervalPreview {
    pub again: String,
    pub hard: String,
    pub good: String,
    pub easy: String,
}

impl Scheduler {
    /// Compute the outcome of each rating without fuzzing and without side effects.
    pub fn preview(&self, card: &ScheduleState, now: DateTime<Utc>) -> IntervalPreview {
        let interval = |rating: Rating| {
            let outcome = self.review_unfuzzed(card, rating, now);
            format_interval(outcome.card.due - now)
        };
        IntervalPreview {
            again: interval(Rating::Again),
            hard: interval(Rating::Hard),
            good: interval(Rating::Good),
            easy: interval(Rating::Easy),
        }
    }
}

/// Minutes under an hour, hours under a day, days under 30, else months.
pub fn format_interval(d: Duration) -> String {
    let seconds = d.num_seconds() as f64;
    let hours = seconds / 3600.0;
    if hours < 1.0 {
        format!("{}m", rounded_at_least_one(seconds / 60.0))
    } else if hours < 24.0 {
        format!("{}h", rounded_at_least_one(hours))
    } else {
        let days = hours / 24.0;
        if days < 30.0 {
            format!("{}d", rounded_at_least_one(days))
        } else {
            format!("{}mo", rounded_at_least_one(days / 30.0))
        }
    }
}

fn rounded_at_least_one(value: f64) -> i64 {
    (value.round() as i64).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SchedulerConfig;
    use crate::types::{CardState, Memory};
    use pretty_assertions::assert_eq;

    #[test]
    fn format_interval_units() {
        assert_eq!(format_interval(Duration::seconds(10)), "1m");
        assert_eq!(format_interval(Duration::minutes(10)), "10m");
        assert_eq!(format_interval(Duration::seconds(330)), "6m");
        assert_eq!(format_interval(Duration::minutes(90)), "2h");
        assert_eq!(format_interval(Duration::hours(23)), "23h");
        assert_eq!(format_interval(Duration::days(1)), "1d");
        assert_eq!(format_interval(Duration::days(29)), "29d");
        assert_eq!(format_interval(Duration::days(30)), "1mo");
        assert_eq!(format_interval(Duration::days(365)), "12mo");
    }

    #[test]
    fn preview_for_new_card() {
        let scheduler = Scheduler::new(SchedulerConfig::default()).unwrap();
        let now = Utc::now();
        let preview = scheduler.preview(&ScheduleState::new(now), now);
        assert_eq!(
            preview,
            IntervalPreview {
                again: "1m".to_string(),
                hard: "6m".to_string(),
                good: "10m".to_string(),
                easy: "8d".to_string(),
            }
        );
    }

    #[test]
    fn preview_ignores_fuzzing_setting() {
        let scheduler = Scheduler::new(SchedulerConfig::default()).unwrap();
        let last = Utc::now() - Duration::days(20);
        let card = ScheduleState {
            state: CardState::Review,
            memory: Some(Memory { stability: 20.0, difficulty: 5.0 }),
            due: last + Duration::days(20),
            last_review: Some(last),
        };
        let now = last + Duration::days(20);
        let first = scheduler.preview(&card, now);
        for _ in 0..20 {
            assert_eq!(scheduler.preview(&card, now), first);
        }
        assert_eq!(first.again, "10m");
    }
}

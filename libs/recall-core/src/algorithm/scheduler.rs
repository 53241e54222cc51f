//! Scheduler: configuration plus the review state machine.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;

use super::fuzz;
use super::model::MemoryModel;
use crate::config::SchedulerConfig;
use crate::error::SchedulerError;
use crate::types::{CardState, Memory, Rating, ReviewEntry, ReviewOutcome, ScheduleState};

/// FSRS scheduler for one notebook configuration.
///
/// Stateless apart from the configuration; safe to share across threads as
/// long as each call brings its own random source.
#[derive(Debug, Clone)]
pub struct Scheduler {
    config: SchedulerConfig,
    model: MemoryModel,
}

impl Scheduler {
    /// Build a scheduler, rejecting out-of-bounds weights and invalid settings.
    pub fn new(config: SchedulerConfig) -> Result<Self, SchedulerError> {
        config.validate()?;
        let model = MemoryModel::new(config.weights);
        Ok(Self { config, model })
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn model(&self) -> &MemoryModel {
        &self.model
    }

    /// Copy of this scheduler that never fuzzes.
    pub fn without_fuzzing(&self) -> Self {
        Self {
            config: self.config.clone().with_fuzzing(false),
            model: self.model.clone(),
        }
    }

    /// Probability of recall at `now`; 0 for a card without review history.
    pub fn retrievability(&self, card: &ScheduleState, now: DateTime<Utc>) -> f64 {
        match (card.last_review, card.memory) {
            (Some(last_review), Some(memory)) => self
                .model
                .retrievability(elapsed_days(last_review, now), memory.stability),
            _ => 0.0,
        }
    }

    /// Apply one rating to a card.
    ///
    /// `rng` is only consulted when fuzzing is enabled and the card ends in review.
    pub fn review<R: Rng + ?Sized>(
        &self,
        card: &ScheduleState,
        rating: Rating,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> ReviewOutcome {
        self.review_inner(card, rating, now, Some(rng))
    }

    /// Apply one rating with fuzzing disabled regardless of configuration.
    pub fn review_unfuzzed(&self, card: &ScheduleState, rating: Rating, now: DateTime<Utc>) -> ReviewOutcome {
        self.review_inner::<rand::rngs::ThreadRng>(card, rating, now, None)
    }

    /// Replay an ordered review history starting from an unreviewed state.
    ///
    /// Used after the configuration changes. Replay never fuzzes, so the
    /// result depends only on the history and the configuration.
    pub fn reschedule(&self, initial: ScheduleState, history: &[ReviewEntry]) -> ScheduleState {
        history.iter().fold(initial, |card, entry| {
            self.review_unfuzzed(&card, entry.rating, entry.reviewed_at).card
        })
    }

    fn review_inner<R: Rng + ?Sized>(
        &self,
        card: &ScheduleState,
        rating: Rating,
        now: DateTime<Utc>,
        rng: Option<&mut R>,
    ) -> ReviewOutcome {
        let days_since_last_review = card.last_review.map(|last| elapsed_days(last, now));
        let memory = self.next_memory(card, rating, now, days_since_last_review);

        let (state, mut interval) = match card.state {
            CardState::Learning { step } => self.stepped(
                &self.config.learning_steps,
                step,
                rating,
                memory,
                |step| CardState::Learning { step },
            ),
            CardState::Relearning { step } => self.stepped(
                &self.config.relearning_steps,
                step,
                rating,
                memory,
                |step| CardState::Relearning { step },
            ),
            CardState::Review => match (rating, self.config.relearning_steps.first()) {
                (Rating::Again, Some(first)) => (CardState::Relearning { step: 0 }, *first),
                _ => (CardState::Review, self.graduated_interval(memory)),
            },
        };

        if let (true, CardState::Review, Some(rng)) = (self.config.enable_fuzzing, state, rng) {
            let days = fuzz::fuzzed_interval(interval.num_days(), self.config.maximum_interval, rng);
            interval = whole_days(days);
        }

        let updated = ScheduleState {
            state,
            memory: Some(memory),
            due: now.checked_add_signed(interval).unwrap_or(DateTime::<Utc>::MAX_UTC),
            last_review: Some(now),
        };
        let retrievability = self.retrievability(&updated, now);

        ReviewOutcome {
            card: updated,
            scheduled_days: interval.num_days(),
            elapsed_days: days_since_last_review.unwrap_or(0),
            retrievability,
        }
    }

    /// First review initializes memory; same-day reviews use the short-term
    /// formula; later reviews use the full update at current retrievability.
    fn next_memory(
        &self,
        card: &ScheduleState,
        rating: Rating,
        now: DateTime<Utc>,
        days_since_last_review: Option<i64>,
    ) -> Memory {
        let Some(memory) = card.memory else {
            return Memory {
                stability: self.model.initial_stability(rating),
                difficulty: self.model.initial_difficulty(rating),
            };
        };

        let stability = match days_since_last_review {
            Some(days) if days < 1 => self.model.short_term_stability(memory.stability, rating),
            _ => {
                let r = self.retrievability(card, now);
                self.model
                    .next_stability(memory.difficulty, memory.stability, r, rating)
            }
        };
        Memory {
            stability,
            difficulty: self.model.next_difficulty(memory.difficulty, rating),
        }
    }

    /// Transition for the stepped states over the given ladder.
    fn stepped(
        &self,
        ladder: &[Duration],
        step: u32,
        rating: Rating,
        memory: Memory,
        at_step: impl Fn(u32) -> CardState,
    ) -> (CardState, Duration) {
        let index = step as usize;
        let graduate = || (CardState::Review, self.graduated_interval(memory));

        if ladder.is_empty() || (index >= ladder.len() && rating != Rating::Again) {
            return graduate();
        }

        match rating {
            Rating::Again => (at_step(0), ladder[0]),
            Rating::Hard => {
                let interval = match (ladder.get(index), ladder.get(index + 1)) {
                    (Some(current), Some(next)) => (*current + *next) / 2,
                    (Some(current), None) if ladder.len() == 1 => *current * 3 / 2,
                    (Some(current), None) => *current,
                    (None, _) => ladder[ladder.len() - 1],
                };
                (at_step(step), interval)
            }
            Rating::Good => match ladder.get(index + 1) {
                Some(next) => (at_step(step + 1), *next),
                None => graduate(),
            },
            Rating::Easy => graduate(),
        }
    }

    fn graduated_interval(&self, memory: Memory) -> Duration {
        whole_days(self.model.next_interval(
            memory.stability,
            self.config.desired_retention,
            self.config.maximum_interval,
        ))
    }
}

fn whole_days(days: i64) -> Duration {
    Duration::try_days(days).unwrap_or(Duration::MAX)
}

/// Whole days between two instants, never negative.
fn elapsed_days(from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
    ((to - from).num_hours() / 24).max(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::{MAX_DIFFICULTY, MIN_DIFFICULTY, MIN_STABILITY};
    use pretty_assertions::assert_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn start() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-03-01T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn scheduler() -> Scheduler {
        Scheduler::new(SchedulerConfig::default().with_fuzzing(false)).unwrap()
    }

    fn with_config(config: SchedulerConfig) -> Scheduler {
        Scheduler::new(config.with_fuzzing(false)).unwrap()
    }

    fn review_card(stability: f64, difficulty: f64, last_review: DateTime<Utc>) -> ScheduleState {
        ScheduleState {
            state: CardState::Review,
            memory: Some(Memory { stability, difficulty }),
            due: last_review + Duration::days(stability.round() as i64),
            last_review: Some(last_review),
        }
    }

    #[test]
    fn construction_rejects_out_of_bounds_weights() {
        let mut config = SchedulerConfig::default();
        config.weights[4] = 11.0;
        assert!(matches!(
            Scheduler::new(config),
            Err(SchedulerError::WeightsOutOfBounds(_))
        ));
    }

    #[test]
    fn new_card_good_twice_graduates() {
        let s = scheduler();
        let now = start();
        let card = ScheduleState::new(now);

        let first = s.review_unfuzzed(&card, Rating::Good, now);
        assert_eq!(first.card.state, CardState::Learning { step: 1 });
        assert_eq!(first.card.due, now + Duration::minutes(10));
        assert_eq!(first.scheduled_days, 0);
        assert_eq!(first.elapsed_days, 0);

        let later = now + Duration::minutes(10);
        let second = s.review_unfuzzed(&first.card, Rating::Good, later);
        assert_eq!(second.card.state, CardState::Review);
        assert_eq!(second.card.state.step(), None);
        assert!(second.scheduled_days >= 1);
        assert_eq!(second.card.due, later + Duration::days(second.scheduled_days));
    }

    #[test]
    fn first_review_initializes_memory() {
        let s = scheduler();
        let now = start();
        let outcome = s.review_unfuzzed(&ScheduleState::new(now), Rating::Hard, now);
        let memory = outcome.card.memory.unwrap();
        assert_eq!(memory.stability, s.model().initial_stability(Rating::Hard));
        assert_eq!(memory.difficulty, s.model().initial_difficulty(Rating::Hard));
        assert_eq!(outcome.card.last_review, Some(now));
    }

    #[test]
    fn again_resets_learning_step() {
        let s = scheduler();
        let now = start();
        let card = ScheduleState {
            state: CardState::Learning { step: 1 },
            memory: Some(Memory { stability: 2.3, difficulty: 5.0 }),
            due: now,
            last_review: Some(now - Duration::minutes(10)),
        };
        let outcome = s.review_unfuzzed(&card, Rating::Again, now);
        assert_eq!(outcome.card.state, CardState::Learning { step: 0 });
        assert_eq!(outcome.card.due, now + Duration::minutes(1));
    }

    #[test]
    fn hard_at_first_step_uses_midpoint() {
        let s = scheduler();
        let now = start();
        let outcome = s.review_unfuzzed(&ScheduleState::new(now), Rating::Hard, now);
        assert_eq!(outcome.card.state, CardState::Learning { step: 0 });
        assert_eq!(outcome.card.due, now + Duration::seconds(330));
    }

    #[test]
    fn hard_with_single_step_ladder_is_one_and_a_half() {
        let s = with_config(SchedulerConfig {
            learning_steps: vec![Duration::minutes(10)],
            ..Default::default()
        });
        let now = start();
        let outcome = s.review_unfuzzed(&ScheduleState::new(now), Rating::Hard, now);
        assert_eq!(outcome.card.due, now + Duration::minutes(15));
    }

    #[test]
    fn hard_at_last_step_repeats_step() {
        let s = scheduler();
        let now = start();
        let card = ScheduleState {
            state: CardState::Learning { step: 1 },
            memory: Some(Memory { stability: 2.3, difficulty: 5.0 }),
            due: now,
            last_review: Some(now - Duration::minutes(1)),
        };
        let outcome = s.review_unfuzzed(&card, Rating::Hard, now);
        assert_eq!(outcome.card.state, CardState::Learning { step: 1 });
        assert_eq!(outcome.card.due, now + Duration::minutes(10));
    }

    #[test]
    fn easy_graduates_immediately() {
        let s = scheduler();
        let now = start();
        let outcome = s.review_unfuzzed(&ScheduleState::new(now), Rating::Easy, now);
        assert_eq!(outcome.card.state, CardState::Review);
        // S0(Easy) = 8.2956 days
        assert_eq!(outcome.scheduled_days, 8);
    }

    #[test]
    fn empty_learning_ladder_graduates_on_any_rating() {
        let s = with_config(SchedulerConfig {
            learning_steps: vec![],
            ..Default::default()
        });
        let now = start();
        for rating in Rating::ALL {
            let outcome = s.review_unfuzzed(&ScheduleState::new(now), rating, now);
            assert_eq!(outcome.card.state, CardState::Review);
            assert!(outcome.scheduled_days >= 1);
        }
    }

    #[test]
    fn step_beyond_shrunk_ladder_graduates() {
        let s = with_config(SchedulerConfig {
            learning_steps: vec![Duration::minutes(5)],
            ..Default::default()
        });
        let now = start();
        let card = ScheduleState {
            state: CardState::Learning { step: 3 },
            memory: Some(Memory { stability: 2.0, difficulty: 5.0 }),
            due: now,
            last_review: Some(now - Duration::hours(1)),
        };
        assert_eq!(
            s.review_unfuzzed(&card, Rating::Hard, now).card.state,
            CardState::Review
        );
        assert_eq!(
            s.review_unfuzzed(&card, Rating::Again, now).card.state,
            CardState::Learning { step: 0 }
        );
    }

    #[test]
    fn review_again_enters_relearning() {
        let s = scheduler();
        let last = start();
        let now = last + Duration::days(12);
        let card = review_card(10.0, 5.0, last);
        let outcome = s.review_unfuzzed(&card, Rating::Again, now);
        assert_eq!(outcome.card.state, CardState::Relearning { step: 0 });
        assert_eq!(outcome.card.due, now + Duration::minutes(10));
        assert_eq!(outcome.elapsed_days, 12);
        assert!(outcome.card.stability().unwrap() < 10.0);
        assert!(outcome.card.difficulty().unwrap() > 5.0);
    }

    #[test]
    fn review_again_without_relearning_steps_stays_in_review() {
        let s = with_config(SchedulerConfig {
            relearning_steps: vec![],
            ..Default::default()
        });
        let last = start();
        let outcome = s.review_unfuzzed(&review_card(10.0, 5.0, last), Rating::Again, last + Duration::days(10));
        assert_eq!(outcome.card.state, CardState::Review);
        assert!(outcome.scheduled_days >= 1);
    }

    #[test]
    fn relearning_good_graduates_back_to_review() {
        let s = scheduler();
        let now = start();
        let card = ScheduleState {
            state: CardState::Relearning { step: 0 },
            memory: Some(Memory { stability: 3.0, difficulty: 6.0 }),
            due: now,
            last_review: Some(now - Duration::minutes(10)),
        };
        let outcome = s.review_unfuzzed(&card, Rating::Good, now);
        assert_eq!(outcome.card.state, CardState::Review);
        assert!(outcome.scheduled_days >= 1);
    }

    #[test]
    fn same_day_review_uses_short_term_stability() {
        let s = scheduler();
        let last = start();
        let now = last + Duration::hours(3);
        let card = review_card(10.0, 5.0, last);
        let outcome = s.review_unfuzzed(&card, Rating::Good, now);
        assert_eq!(
            outcome.card.stability().unwrap(),
            s.model().short_term_stability(10.0, Rating::Good)
        );
        assert_eq!(outcome.elapsed_days, 0);
    }

    #[test]
    fn overdue_review_uses_full_update() {
        let s = scheduler();
        let last = start();
        let now = last + Duration::days(10);
        let card = review_card(10.0, 5.0, last);
        let r = s.retrievability(&card, now);
        let outcome = s.review_unfuzzed(&card, Rating::Good, now);
        assert_eq!(
            outcome.card.stability().unwrap(),
            s.model().next_stability(5.0, 10.0, r, Rating::Good)
        );
    }

    #[test]
    fn retrievability_is_zero_without_history() {
        let s = scheduler();
        let now = start();
        assert_eq!(s.retrievability(&ScheduleState::new(now), now), 0.0);
        let outcome = s.review_unfuzzed(&ScheduleState::new(now), Rating::Good, now);
        assert!((outcome.retrievability - 1.0).abs() < 1e-12);
    }

    #[test]
    fn retrievability_never_increases_over_time() {
        let s = scheduler();
        let last = start();
        let card = review_card(7.0, 5.0, last);
        let mut previous = 1.0;
        for hours in (0..24 * 90).step_by(6) {
            let r = s.retrievability(&card, last + Duration::hours(hours));
            assert!(r <= previous);
            previous = r;
        }
    }

    #[test]
    fn review_is_deterministic_without_fuzzing() {
        let s = scheduler();
        let last = start();
        let card = review_card(4.0, 7.0, last);
        let now = last + Duration::days(5);
        for rating in Rating::ALL {
            assert_eq!(
                s.review_unfuzzed(&card, rating, now),
                s.review_unfuzzed(&card, rating, now)
            );
        }
    }

    #[test]
    fn fuzzing_stays_near_raw_interval() {
        let fuzzed = Scheduler::new(SchedulerConfig::default()).unwrap();
        let plain = scheduler();
        let last = start();
        let card = review_card(30.0, 5.0, last);
        let now = last + Duration::days(30);
        let raw = plain.review_unfuzzed(&card, Rating::Good, now).scheduled_days;
        let (lo, hi) = fuzz::fuzz_range(raw, 36500);

        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..100 {
            let outcome = fuzzed.review(&card, Rating::Good, now, &mut rng);
            assert!(outcome.scheduled_days >= lo && outcome.scheduled_days <= hi);
            assert_eq!(outcome.card.due, now + Duration::days(outcome.scheduled_days));
        }
    }

    #[test]
    fn fuzzing_is_reproducible_with_seeded_rng() {
        let s = Scheduler::new(SchedulerConfig::default()).unwrap();
        let last = start();
        let card = review_card(40.0, 5.0, last);
        let now = last + Duration::days(41);
        let a = s.review(&card, Rating::Easy, now, &mut StdRng::seed_from_u64(5));
        let b = s.review(&card, Rating::Easy, now, &mut StdRng::seed_from_u64(5));
        assert_eq!(a, b);
    }

    #[test]
    fn learning_steps_are_never_fuzzed() {
        let s = Scheduler::new(SchedulerConfig::default()).unwrap();
        let now = start();
        let mut rng = StdRng::seed_from_u64(3);
        let outcome = s.review(&ScheduleState::new(now), Rating::Good, now, &mut rng);
        assert_eq!(outcome.card.due, now + Duration::minutes(10));
    }

    #[test]
    fn bounds_hold_over_long_random_histories() {
        let s = Scheduler::new(SchedulerConfig::default()).unwrap();
        let mut rng = StdRng::seed_from_u64(2024);
        for _ in 0..20 {
            let mut now = start();
            let mut card = ScheduleState::new(now);
            for _ in 0..60 {
                let rating = Rating::ALL[rng.gen_range(0..4)];
                let outcome = s.review(&card, rating, now, &mut rng);
                let memory = outcome.card.memory.unwrap();
                assert!(memory.stability >= MIN_STABILITY);
                assert!((MIN_DIFFICULTY..=MAX_DIFFICULTY).contains(&memory.difficulty));
                assert!(outcome.scheduled_days <= 36500);
                card = outcome.card;
                now = now + Duration::minutes(rng.gen_range(1..60 * 24 * 40));
            }
        }
    }

    #[test]
    fn reschedule_replays_history() {
        let s = scheduler();
        let t0 = start();
        let history = vec![
            ReviewEntry { rating: Rating::Good, reviewed_at: t0 },
            ReviewEntry { rating: Rating::Good, reviewed_at: t0 + Duration::minutes(10) },
            ReviewEntry { rating: Rating::Again, reviewed_at: t0 + Duration::days(4) },
            ReviewEntry { rating: Rating::Good, reviewed_at: t0 + Duration::days(4) + Duration::minutes(10) },
        ];

        let mut expected = ScheduleState::new(t0);
        for entry in &history {
            expected = s.review_unfuzzed(&expected, entry.rating, entry.reviewed_at).card;
        }

        let replayed = s.reschedule(ScheduleState::new(t0), &history);
        assert_eq!(replayed, expected);
        assert_eq!(replayed.state, CardState::Review);
    }

    #[test]
    fn reschedule_with_new_retention_changes_interval() {
        let t0 = start();
        let history = vec![
            ReviewEntry { rating: Rating::Easy, reviewed_at: t0 },
            ReviewEntry { rating: Rating::Good, reviewed_at: t0 + Duration::days(8) },
        ];
        let strict = with_config(SchedulerConfig {
            desired_retention: 0.95,
            ..Default::default()
        });
        let relaxed = with_config(SchedulerConfig {
            desired_retention: 0.8,
            ..Default::default()
        });
        let a = strict.reschedule(ScheduleState::new(t0), &history);
        let b = relaxed.reschedule(ScheduleState::new(t0), &history);
        assert!(b.due > a.due);
    }

    #[test]
    fn empty_history_returns_initial_state() {
        let s = scheduler();
        let initial = ScheduleState::new(start());
        assert_eq!(s.reschedule(initial.clone(), &[]), initial);
    }

    #[test]
    fn longest_allowed_interval_does_not_overflow() {
        let s = with_config(SchedulerConfig {
            desired_retention: 0.01,
            maximum_interval: crate::config::MAX_MAXIMUM_INTERVAL,
            ..Default::default()
        });
        let now = start();
        let outcome = s.review_unfuzzed(&ScheduleState::new(now), Rating::Easy, now);
        assert_eq!(outcome.scheduled_days, crate::config::MAX_MAXIMUM_INTERVAL);
        assert_eq!(outcome.card.due, now + Duration::days(crate::config::MAX_MAXIMUM_INTERVAL));
        assert_eq!(s.preview(&ScheduleState::new(now), now).easy, "1217mo");
    }

    #[test]
    fn due_date_saturates_at_end_of_time() {
        let s = scheduler();
        let now = DateTime::<Utc>::MAX_UTC - Duration::days(1);
        let card = review_card(30.0, 5.0, now - Duration::days(40));
        let outcome = s.review_unfuzzed(&card, Rating::Easy, now);
        assert_eq!(outcome.card.due, DateTime::<Utc>::MAX_UTC);
        assert_eq!(outcome.card.state, CardState::Review);
    }
}

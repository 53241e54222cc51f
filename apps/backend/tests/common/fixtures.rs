//! Test fixtures and factory functions for creating test data.

use serde_json::{json, Value};
use uuid::Uuid;

use recall_backend::models::{DbCard, SchedulerConfig};

/// Default configuration without fuzzing.
pub fn unfuzzed_config() -> SchedulerConfig {
    SchedulerConfig::default().with_fuzzing(false)
}

/// Body for POST /api/reviews with a fresh idempotency key.
pub fn review_request(card_id: Uuid, rating: &str) -> Value {
    review_request_with_id(Uuid::new_v4(), card_id, rating)
}

pub fn review_request_with_id(id: Uuid, card_id: Uuid, rating: &str) -> Value {
    json!({
        "id": id,
        "card_id": card_id,
        "rating": rating,
        "duration_ms": 4200,
    })
}

pub fn practice_request(card_id: Uuid, rating: &str) -> Value {
    json!({
        "id": Uuid::new_v4(),
        "card_id": card_id,
        "rating": rating,
        "mode": "practice",
    })
}

/// Card fields that a review may change, for before/after comparison.
pub fn schedule_fields(card: &DbCard) -> Value {
    json!({
        "state": card.state,
        "step": card.step,
        "stability": card.stability,
        "difficulty": card.difficulty,
        "due": card.due,
        "last_review": card.last_review,
        "elapsed_days": card.elapsed_days,
        "scheduled_days": card.scheduled_days,
        "reps": card.reps,
        "lapses": card.lapses,
    })
}

//! Database models and API types

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::{ApiError, Result};

// Re-export shared types from recall-core
pub use recall_core::{
    CardState, CardStatus, IntervalPreview, Memory, ParseError, Rating, ReviewMode, Scheduler,
    SchedulerConfig, ScheduleState,
};

// === Database Entity Types ===

/// Registered user; the token is the bearer credential
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub token: String,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Notebook with its scheduler configuration
#[derive(Debug, Clone, FromRow)]
pub struct DbNotebook {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub scheduler_config: Json<SchedulerConfig>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DbNotebook {
    /// Build the scheduler for this notebook.
    ///
    /// Configurations are validated when written, so a failure here means the
    /// stored row was edited out of band.
    pub fn scheduler(&self) -> Result<Scheduler> {
        Scheduler::new(self.scheduler_config.0.clone()).map_err(|e| {
            ApiError::Internal(format!(
                "notebook {} has an invalid scheduler config: {}",
                self.id, e
            ))
        })
    }
}

/// Card row: the persisted schedule state of one schedulable item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct DbCard {
    pub id: Uuid,
    pub user_id: Uuid,
    pub notebook_id: Uuid,
    pub state: String,
    pub step: Option<i16>,
    pub stability: Option<f64>,
    pub difficulty: Option<f64>,
    pub due: DateTime<Utc>,
    pub last_review: Option<DateTime<Utc>>,
    pub elapsed_days: i32,
    pub scheduled_days: i32,
    pub reps: i32,
    pub lapses: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DbCard {
    pub fn status(&self) -> std::result::Result<CardStatus, ParseError> {
        self.state.parse()
    }

    /// Convert to the scheduler's view of the card
    pub fn to_schedule_state(&self) -> std::result::Result<ScheduleState, ParseError> {
        let step = self.step.map(|s| s.max(0) as u32).unwrap_or(0);
        let state = match self.status()? {
            CardStatus::New | CardStatus::Learning => CardState::Learning { step },
            CardStatus::Review => CardState::Review,
            CardStatus::Relearning => CardState::Relearning { step },
        };
        let memory = match (self.stability, self.difficulty) {
            (Some(stability), Some(difficulty)) => Some(Memory { stability, difficulty }),
            _ => None,
        };
        Ok(ScheduleState {
            state,
            memory,
            due: self.due,
            last_review: self.last_review,
        })
    }

    /// Copy of this card carrying the given schedule state.
    ///
    /// Counters are left alone.
    pub fn with_schedule(&self, schedule: &ScheduleState) -> Self {
        Self {
            state: schedule.state.status().as_str().to_string(),
            step: schedule.state.step().map(|s| s as i16),
            stability: schedule.stability(),
            difficulty: schedule.difficulty(),
            due: schedule.due,
            last_review: schedule.last_review,
            ..self.clone()
        }
    }

    /// Convert to API response type
    pub fn to_response(&self) -> CardResponse {
        CardResponse {
            id: self.id,
            notebook_id: self.notebook_id,
            state: self.status().unwrap_or_default(),
            step: self.step,
            stability: self.stability,
            difficulty: self.difficulty,
            due: self.due,
            last_review: self.last_review,
            elapsed_days: self.elapsed_days,
            scheduled_days: self.scheduled_days,
            reps: self.reps,
            lapses: self.lapses,
        }
    }
}

/// Card fields needed to undo a review that the before/after columns don't hold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UndoSnapshot {
    pub step: Option<i16>,
    pub due: DateTime<Utc>,
    pub last_review: Option<DateTime<Utc>>,
    pub reps: i32,
    pub lapses: i32,
    #[serde(default)]
    pub elapsed_days: i32,
    #[serde(default)]
    pub scheduled_days: i32,
}

impl UndoSnapshot {
    pub fn capture(card: &DbCard) -> Self {
        Self {
            step: card.step,
            due: card.due,
            last_review: card.last_review,
            reps: card.reps,
            lapses: card.lapses,
            elapsed_days: card.elapsed_days,
            scheduled_days: card.scheduled_days,
        }
    }
}

/// Review record to insert
#[derive(Debug, Clone, PartialEq)]
pub struct NewReview {
    pub id: Uuid,
    pub user_id: Uuid,
    pub card_id: Uuid,
    pub notebook_id: Uuid,
    pub rating: Rating,
    pub mode: ReviewMode,
    pub duration_ms: Option<i32>,
    pub state_before: String,
    pub stability_before: Option<f64>,
    pub difficulty_before: Option<f64>,
    pub state_after: String,
    pub stability_after: Option<f64>,
    pub difficulty_after: Option<f64>,
    pub elapsed_days: i32,
    pub scheduled_days: i32,
    pub retrievability: Option<f64>,
    pub undo_snapshot: UndoSnapshot,
    pub reviewed_at: DateTime<Utc>,
}

/// Review record as stored
#[derive(Debug, Clone, FromRow)]
pub struct DbReview {
    pub user_id: Uuid,
    pub id: Uuid,
    pub seq: i64,
    pub card_id: Option<Uuid>,
    pub notebook_id: Uuid,
    pub rating: String,
    pub mode: String,
    pub duration_ms: Option<i32>,
    pub state_before: String,
    pub stability_before: Option<f64>,
    pub difficulty_before: Option<f64>,
    pub state_after: String,
    pub stability_after: Option<f64>,
    pub difficulty_after: Option<f64>,
    pub elapsed_days: i32,
    pub scheduled_days: i32,
    pub retrievability: Option<f64>,
    pub undo_snapshot: Json<UndoSnapshot>,
    pub reviewed_at: DateTime<Utc>,
}

impl DbReview {
    pub fn review_mode(&self) -> std::result::Result<ReviewMode, ParseError> {
        self.mode.parse()
    }

    pub fn to_summary(&self) -> Result<ReviewSummary> {
        Ok(ReviewSummary {
            id: self.id,
            card_id: self.card_id,
            rating: self.rating.parse()?,
            mode: self.review_mode()?,
            elapsed_days: self.elapsed_days,
            scheduled_days: self.scheduled_days,
            retrievability: self.retrievability,
            reviewed_at: self.reviewed_at,
        })
    }
}

/// Per-notebook study counts row
#[derive(Debug, Clone, FromRow)]
pub struct StudyCountRow {
    pub notebook_id: Uuid,
    pub due_count: i64,
    pub new_count: i64,
    pub total: i64,
}

/// Review history entry used for replay
#[derive(Debug, Clone, FromRow)]
pub struct HistoryRow {
    pub card_id: Uuid,
    pub rating: String,
    pub reviewed_at: DateTime<Utc>,
}

// === API Request Types ===

/// POST /api/users/register
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegisterUserRequest {
    pub name: Option<String>,
}

/// POST /api/reviews
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitReviewRequest {
    /// Client-generated idempotency key
    pub id: Uuid,
    pub card_id: Uuid,
    pub rating: String,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub duration_ms: Option<i32>,
}

/// Validated review submission
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReviewInput {
    pub id: Uuid,
    pub card_id: Uuid,
    pub rating: Rating,
    pub mode: ReviewMode,
    pub duration_ms: Option<i32>,
}

impl SubmitReviewRequest {
    /// Validate rating and mode before anything touches storage
    pub fn validate(&self) -> Result<ReviewInput> {
        if self.id.is_nil() {
            return Err(ApiError::BadRequest("id is required".to_string()));
        }
        if self.card_id.is_nil() {
            return Err(ApiError::BadRequest("card_id is required".to_string()));
        }
        if let Some(ms) = self.duration_ms {
            if ms < 0 {
                return Err(ApiError::BadRequest("duration_ms must not be negative".to_string()));
            }
        }
        Ok(ReviewInput {
            id: self.id,
            card_id: self.card_id,
            rating: self.rating.parse()?,
            mode: ReviewMode::parse_or_default(self.mode.as_deref())?,
            duration_ms: self.duration_ms,
        })
    }
}

/// GET /api/reviews/study query
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StudyQuery {
    pub notebook_id: Option<Uuid>,
    pub limit: Option<i64>,
}

/// GET /api/reviews/practice query
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PracticeQuery {
    pub notebook_id: Option<Uuid>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

// === API Response Types ===

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterUserResponse {
    pub user_id: Uuid,
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardResponse {
    pub id: Uuid,
    pub notebook_id: Uuid,
    pub state: CardStatus,
    pub step: Option<i16>,
    pub stability: Option<f64>,
    pub difficulty: Option<f64>,
    pub due: DateTime<Utc>,
    pub last_review: Option<DateTime<Utc>>,
    pub elapsed_days: i32,
    pub scheduled_days: i32,
    pub reps: i32,
    pub lapses: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewSummary {
    pub id: Uuid,
    pub card_id: Option<Uuid>,
    pub rating: Rating,
    pub mode: ReviewMode,
    pub elapsed_days: i32,
    pub scheduled_days: i32,
    pub retrievability: Option<f64>,
    pub reviewed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitReviewResponse {
    pub review: ReviewSummary,
    /// None only when a retried review's card has since been deleted
    pub card: Option<CardResponse>,
    /// Previews for the card's next review
    pub intervals: Option<IntervalPreview>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UndoReviewResponse {
    /// None for practice reviews, which never changed the card
    pub card: Option<CardResponse>,
}

/// Card with precomputed intervals for all four ratings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudyCard {
    #[serde(flatten)]
    pub card: CardResponse,
    pub intervals: IntervalPreview,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PracticePage {
    pub items: Vec<StudyCard>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotebookStudyCounts {
    pub due: i64,
    pub new: i64,
    pub total: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudyCountsResponse {
    pub counts: HashMap<Uuid, NotebookStudyCounts>,
    pub total_due: i64,
    pub total_new: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerSettingsResponse {
    pub notebook_id: Uuid,
    pub config: SchedulerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RescheduleResponse {
    pub cards_rescheduled: u64,
}

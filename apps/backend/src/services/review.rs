//! Review submission and undo.
//!
//! Planning is pure so the protocol rules can be tested without a database;
//! the async functions wrap each plan in a single transaction.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sqlx::PgConnection;
use uuid::Uuid;

use recall_core::{CardStatus, Rating, ReviewEntry, ReviewMode, Scheduler, ScheduleState};

use crate::db::{reviews as queries, Database};
use crate::error::{ApiError, Result};
use crate::models::{
    DbCard, DbReview, NewReview, ReviewInput, SubmitReviewResponse, UndoSnapshot,
};

/// Result of planning a submission against a locked card.
#[derive(Debug, Clone)]
pub struct SubmissionPlan {
    pub review: NewReview,
    /// Card as it will be after the review
    pub card: DbCard,
    /// False for practice reviews, which never write the card
    pub mutates_card: bool,
}

/// Compute the review record and the card update for one submission.
pub fn plan_submission<R: Rng + ?Sized>(
    card: &DbCard,
    input: &ReviewInput,
    scheduler: &Scheduler,
    now: DateTime<Utc>,
    rng: &mut R,
) -> Result<SubmissionPlan> {
    let status_before = card.status()?;
    let schedule = card.to_schedule_state()?;
    let outcome = scheduler.review(&schedule, input.rating, now, rng);

    let mut review = NewReview {
        id: input.id,
        user_id: card.user_id,
        card_id: card.id,
        notebook_id: card.notebook_id,
        rating: input.rating,
        mode: input.mode,
        duration_ms: input.duration_ms,
        state_before: status_before.as_str().to_string(),
        stability_before: card.stability,
        difficulty_before: card.difficulty,
        state_after: status_before.as_str().to_string(),
        stability_after: card.stability,
        difficulty_after: card.difficulty,
        elapsed_days: clamp_days(outcome.elapsed_days),
        scheduled_days: clamp_days(outcome.scheduled_days),
        retrievability: Some(outcome.retrievability),
        undo_snapshot: UndoSnapshot::capture(card),
        reviewed_at: now,
    };

    if input.mode == ReviewMode::Practice {
        return Ok(SubmissionPlan {
            review,
            card: card.clone(),
            mutates_card: false,
        });
    }

    let lapsed = input.rating == Rating::Again && status_before.is_graduated();
    let mut updated = card.with_schedule(&outcome.card);
    updated.elapsed_days = review.elapsed_days;
    updated.scheduled_days = review.scheduled_days;
    updated.reps = card.reps + 1;
    updated.lapses = card.lapses + i32::from(lapsed);

    review.state_after = updated.state.clone();
    review.stability_after = updated.stability;
    review.difficulty_after = updated.difficulty;

    Ok(SubmissionPlan {
        review,
        card: updated,
        mutates_card: true,
    })
}

/// Restore the card to its exact pre-review state.
pub fn plan_undo(review: &DbReview, card: &DbCard) -> DbCard {
    let snapshot = &review.undo_snapshot.0;
    DbCard {
        state: review.state_before.clone(),
        step: snapshot.step,
        stability: review.stability_before,
        difficulty: review.difficulty_before,
        due: snapshot.due,
        last_review: snapshot.last_review,
        elapsed_days: snapshot.elapsed_days,
        scheduled_days: snapshot.scheduled_days,
        reps: snapshot.reps,
        lapses: snapshot.lapses,
        ..card.clone()
    }
}

fn clamp_days(days: i64) -> i32 {
    days.clamp(0, i64::from(i32::MAX)) as i32
}

/// A stored review may only answer a retry for the same card.
pub fn check_retry(existing: &DbReview, input: &ReviewInput) -> Result<()> {
    match existing.card_id {
        Some(card_id) if card_id != input.card_id => Err(ApiError::ReviewIdConflict),
        _ => Ok(()),
    }
}

fn respond(
    review: &DbReview,
    current: Option<(&DbCard, &Scheduler)>,
    now: DateTime<Utc>,
) -> Result<SubmitReviewResponse> {
    let (card, intervals) = match current {
        Some((card, scheduler)) => (
            Some(card.to_response()),
            Some(scheduler.preview(&card.to_schedule_state()?, now)),
        ),
        None => (None, None),
    };
    Ok(SubmitReviewResponse {
        review: review.to_summary()?,
        card,
        intervals,
    })
}

/// Answer a retried submission from the stored review and the card as it is now.
async fn stored_outcome(
    conn: &mut PgConnection,
    user_id: Uuid,
    existing: &DbReview,
) -> Result<SubmitReviewResponse> {
    let card = match existing.card_id {
        Some(card_id) => queries::lock_card(conn, user_id, card_id).await?,
        None => None,
    };
    let Some(card) = card else {
        return respond(existing, None, Utc::now());
    };
    let scheduler = queries::get_notebook(conn, user_id, card.notebook_id)
        .await?
        .ok_or(ApiError::CardNotReviewable)?
        .scheduler()?;
    respond(existing, Some((&card, &scheduler)), Utc::now())
}

/// Submit a review.
///
/// Re-submitting an id that already exists returns the persisted outcome
/// without touching the card again, even if the card has since been deleted.
pub async fn submit_review(db: &Database, user_id: Uuid, input: ReviewInput) -> Result<SubmitReviewResponse> {
    let mut tx = db.pool().begin().await?;

    if let Some(existing) = queries::get_review(&mut tx, user_id, input.id).await? {
        check_retry(&existing, &input)?;
        let response = stored_outcome(&mut tx, user_id, &existing).await?;
        tx.commit().await?;
        tracing::info!(review_id = %input.id, "Duplicate review submission, returning stored outcome");
        return Ok(response);
    }

    let card = queries::lock_card(&mut tx, user_id, input.card_id)
        .await?
        .ok_or(ApiError::CardNotReviewable)?;
    // Read the clock under the card lock so reviewed_at follows application order
    let now = Utc::now();

    let notebook = queries::get_notebook(&mut tx, user_id, card.notebook_id)
        .await?
        .ok_or(ApiError::CardNotReviewable)?;
    let scheduler = notebook.scheduler()?;

    let plan = {
        let mut rng = StdRng::from_entropy();
        plan_submission(&card, &input, &scheduler, now, &mut rng)?
    };

    let Some(review) = queries::insert_review(&mut tx, &plan.review).await? else {
        // Lost a race with a concurrent submission of the same id
        let existing = queries::get_review(&mut tx, user_id, input.id)
            .await?
            .ok_or_else(|| ApiError::Internal(format!("review {} vanished after conflict", input.id)))?;
        check_retry(&existing, &input)?;
        let response = stored_outcome(&mut tx, user_id, &existing).await?;
        tx.commit().await?;
        return Ok(response);
    };

    let card = if plan.mutates_card {
        queries::update_card(&mut tx, &plan.card).await?
    } else {
        card
    };

    tx.commit().await?;

    tracing::debug!(
        review_id = %review.id,
        card_id = %card.id,
        rating = %input.rating,
        mode = %input.mode,
        state = %card.state,
        "Review recorded"
    );

    respond(&review, Some((&card, &scheduler)), now)
}

/// Undo a review.
///
/// Returns the restored card for scheduled reviews and `None` for practice
/// reviews, which only delete the record.
pub async fn undo_review(db: &Database, user_id: Uuid, review_id: Uuid) -> Result<Option<DbCard>> {
    let mut tx = db.pool().begin().await?;

    let review = queries::lock_review(&mut tx, user_id, review_id)
        .await?
        .ok_or(ApiError::ReviewNotFound)?;

    if review.review_mode()? == ReviewMode::Practice {
        queries::delete_review(&mut tx, user_id, review.id).await?;
        tx.commit().await?;
        tracing::debug!(review_id = %review.id, "Practice review removed");
        return Ok(None);
    }

    let card_id = review.card_id.ok_or(ApiError::CardAlreadyDeleted)?;
    let card = queries::lock_card(&mut tx, user_id, card_id)
        .await?
        .ok_or(ApiError::CardAlreadyDeleted)?;

    // Checked under the card lock so a concurrent submit can't slip in between
    let latest = queries::latest_scheduled_review_id(&mut tx, user_id, card_id).await?;
    if latest != Some(review.id) {
        return Err(ApiError::ReviewNotLatest);
    }

    let restored = queries::update_card(&mut tx, &plan_undo(&review, &card)).await?;
    queries::delete_review(&mut tx, user_id, review.id).await?;
    tx.commit().await?;

    tracing::debug!(review_id = %review.id, card_id = %card_id, "Review undone");
    Ok(Some(restored))
}

/// Recompute every reviewed card in a notebook by replaying its scheduled
/// reviews from the new-card state. Fuzzing is never applied.
pub async fn reschedule_notebook(db: &Database, user_id: Uuid, notebook_id: Uuid) -> Result<u64> {
    let mut tx = db.pool().begin().await?;

    let notebook = queries::get_notebook(&mut tx, user_id, notebook_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Notebook not found".to_string()))?;
    let scheduler = notebook.scheduler()?;

    let cards = queries::lock_notebook_cards(&mut tx, user_id, notebook_id).await?;
    let history = group_history(queries::scheduled_history(&mut tx, user_id, notebook_id).await?)?;

    let mut rescheduled = 0;
    for card in &cards {
        let Some(entries) = history.get(&card.id) else {
            continue;
        };
        let replayed = replay(&scheduler, card, entries);
        queries::update_card(&mut tx, &replayed).await?;
        rescheduled += 1;
    }

    tx.commit().await?;

    tracing::info!(notebook_id = %notebook_id, cards = rescheduled, "Notebook rescheduled");
    Ok(rescheduled)
}

/// Replay review history for one card
pub fn replay(scheduler: &Scheduler, card: &DbCard, entries: &[ReviewEntry]) -> DbCard {
    let schedule = scheduler.reschedule(ScheduleState::new(card.created_at), entries);
    let mut updated = card.with_schedule(&schedule);
    if schedule.state.status() == CardStatus::Review {
        if let Some(last) = schedule.last_review {
            updated.scheduled_days = clamp_days((schedule.due - last).num_days());
        }
    }
    updated
}

fn group_history(rows: Vec<crate::models::HistoryRow>) -> Result<HashMap<Uuid, Vec<ReviewEntry>>> {
    let mut grouped: HashMap<Uuid, Vec<ReviewEntry>> = HashMap::new();
    for row in rows {
        grouped.entry(row.card_id).or_default().push(ReviewEntry {
            rating: row.rating.parse()?,
            reviewed_at: row.reviewed_at,
        });
    }
    Ok(grouped)
}

//! Queries that run inside the review transactions.
//!
//! Each takes the transaction's connection so callers control locking scope.

use sqlx::{types::Json, PgConnection};
use uuid::Uuid;

use crate::error::Result;
use crate::models::{DbCard, DbNotebook, DbReview, HistoryRow, NewReview};

/// Lock a card row for the rest of the transaction
pub async fn lock_card(conn: &mut PgConnection, user_id: Uuid, card_id: Uuid) -> Result<Option<DbCard>> {
    let card = sqlx::query_as::<_, DbCard>(
        r#"
        SELECT id, user_id, notebook_id, state, step, stability, difficulty,
               due, last_review, elapsed_days, scheduled_days, reps, lapses,
               created_at, updated_at
        FROM cards
        WHERE user_id = $1 AND id = $2
        FOR UPDATE
        "#,
    )
    .bind(user_id)
    .bind(card_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(card)
}

/// Lock every card in a notebook, in id order
pub async fn lock_notebook_cards(
    conn: &mut PgConnection,
    user_id: Uuid,
    notebook_id: Uuid,
) -> Result<Vec<DbCard>> {
    let cards = sqlx::query_as::<_, DbCard>(
        r#"
        SELECT id, user_id, notebook_id, state, step, stability, difficulty,
               due, last_review, elapsed_days, scheduled_days, reps, lapses,
               created_at, updated_at
        FROM cards
        WHERE user_id = $1 AND notebook_id = $2
        ORDER BY id
        FOR UPDATE
        "#,
    )
    .bind(user_id)
    .bind(notebook_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(cards)
}

/// Write the schedule state and counters of a card
pub async fn update_card(conn: &mut PgConnection, card: &DbCard) -> Result<DbCard> {
    let card = sqlx::query_as::<_, DbCard>(
        r#"
        UPDATE cards
        SET state = $3, step = $4, stability = $5, difficulty = $6,
            due = $7, last_review = $8, elapsed_days = $9, scheduled_days = $10,
            reps = $11, lapses = $12, updated_at = NOW()
        WHERE user_id = $1 AND id = $2
        RETURNING id, user_id, notebook_id, state, step, stability, difficulty,
                  due, last_review, elapsed_days, scheduled_days, reps, lapses,
                  created_at, updated_at
        "#,
    )
    .bind(card.user_id)
    .bind(card.id)
    .bind(&card.state)
    .bind(card.step)
    .bind(card.stability)
    .bind(card.difficulty)
    .bind(card.due)
    .bind(card.last_review)
    .bind(card.elapsed_days)
    .bind(card.scheduled_days)
    .bind(card.reps)
    .bind(card.lapses)
    .fetch_one(&mut *conn)
    .await?;

    Ok(card)
}

pub async fn get_notebook(
    conn: &mut PgConnection,
    user_id: Uuid,
    notebook_id: Uuid,
) -> Result<Option<DbNotebook>> {
    let notebook = sqlx::query_as::<_, DbNotebook>(
        r#"
        SELECT id, user_id, name, scheduler_config, created_at, updated_at
        FROM notebooks
        WHERE user_id = $1 AND id = $2
        "#,
    )
    .bind(user_id)
    .bind(notebook_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(notebook)
}

pub async fn get_review(conn: &mut PgConnection, user_id: Uuid, review_id: Uuid) -> Result<Option<DbReview>> {
    let review = sqlx::query_as::<_, DbReview>(
        r#"
        SELECT user_id, id, seq, card_id, notebook_id, rating, mode, duration_ms,
               state_before, stability_before, difficulty_before,
               state_after, stability_after, difficulty_after,
               elapsed_days, scheduled_days, retrievability, undo_snapshot, reviewed_at
        FROM reviews
        WHERE user_id = $1 AND id = $2
        "#,
    )
    .bind(user_id)
    .bind(review_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(review)
}

/// Lock a review row so two undos of the same review serialize
pub async fn lock_review(conn: &mut PgConnection, user_id: Uuid, review_id: Uuid) -> Result<Option<DbReview>> {
    let review = sqlx::query_as::<_, DbReview>(
        r#"
        SELECT user_id, id, seq, card_id, notebook_id, rating, mode, duration_ms,
               state_before, stability_before, difficulty_before,
               state_after, stability_after, difficulty_after,
               elapsed_days, scheduled_days, retrievability, undo_snapshot, reviewed_at
        FROM reviews
        WHERE user_id = $1 AND id = $2
        FOR UPDATE
        "#,
    )
    .bind(user_id)
    .bind(review_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(review)
}

/// Insert a review; `None` when the id already exists for this user
pub async fn insert_review(conn: &mut PgConnection, review: &NewReview) -> Result<Option<DbReview>> {
    let review = sqlx::query_as::<_, DbReview>(
        r#"
        INSERT INTO reviews (
            user_id, id, card_id, notebook_id, rating, mode, duration_ms,
            state_before, stability_before, difficulty_before,
            state_after, stability_after, difficulty_after,
            elapsed_days, scheduled_days, retrievability, undo_snapshot, reviewed_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
        ON CONFLICT (user_id, id) DO NOTHING
        RETURNING user_id, id, seq, card_id, notebook_id, rating, mode, duration_ms,
                  state_before, stability_before, difficulty_before,
                  state_after, stability_after, difficulty_after,
                  elapsed_days, scheduled_days, retrievability, undo_snapshot, reviewed_at
        "#,
    )
    .bind(review.user_id)
    .bind(review.id)
    .bind(review.card_id)
    .bind(review.notebook_id)
    .bind(review.rating.as_str())
    .bind(review.mode.as_str())
    .bind(review.duration_ms)
    .bind(&review.state_before)
    .bind(review.stability_before)
    .bind(review.difficulty_before)
    .bind(&review.state_after)
    .bind(review.stability_after)
    .bind(review.difficulty_after)
    .bind(review.elapsed_days)
    .bind(review.scheduled_days)
    .bind(review.retrievability)
    .bind(Json(&review.undo_snapshot))
    .bind(review.reviewed_at)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(review)
}

pub async fn delete_review(conn: &mut PgConnection, user_id: Uuid, review_id: Uuid) -> Result<()> {
    sqlx::query("DELETE FROM reviews WHERE user_id = $1 AND id = $2")
        .bind(user_id)
        .bind(review_id)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

/// Most recently applied scheduled review of a card; practice reviews never count.
///
/// `seq` is assigned while the card is locked, so it is the application order.
pub async fn latest_scheduled_review_id(
    conn: &mut PgConnection,
    user_id: Uuid,
    card_id: Uuid,
) -> Result<Option<Uuid>> {
    let id = sqlx::query_scalar::<_, Uuid>(
        r#"
        SELECT id
        FROM reviews
        WHERE user_id = $1 AND card_id = $2 AND mode = 'scheduled'
        ORDER BY seq DESC
        LIMIT 1
        "#,
    )
    .bind(user_id)
    .bind(card_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(id)
}

/// Scheduled review history of a notebook, in replay order per card
pub async fn scheduled_history(
    conn: &mut PgConnection,
    user_id: Uuid,
    notebook_id: Uuid,
) -> Result<Vec<HistoryRow>> {
    let rows = sqlx::query_as::<_, HistoryRow>(
        r#"
        SELECT card_id, rating, reviewed_at
        FROM reviews
        WHERE user_id = $1 AND notebook_id = $2
          AND mode = 'scheduled' AND card_id IS NOT NULL
        ORDER BY card_id, seq
        "#,
    )
    .bind(user_id)
    .bind(notebook_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows)
}

//! PostgreSQL database operations

pub mod reviews;

use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, types::Json, PgPool};
use uuid::Uuid;

use crate::error::{ApiError, Result};
use crate::models::*;

/// Database wrapper with connection pool
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Connect to PostgreSQL and create connection pool
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    /// Run database migrations
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| ApiError::Migration(e.to_string()))?;
        Ok(())
    }

    /// Get the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    // === User Repository ===

    /// Create a new user with generated token
    pub async fn create_user(&self, name: Option<&str>) -> Result<User> {
        let token = Uuid::new_v4().to_string();
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (token, name)
            VALUES ($1, $2)
            RETURNING id, token, name, created_at
            "#,
        )
        .bind(&token)
        .bind(name)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    /// Get user by token
    pub async fn get_user_by_token(&self, token: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, token, name, created_at
            FROM users
            WHERE token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    // === Notebook Repository ===

    /// Create a notebook; the configuration must already be validated
    pub async fn create_notebook(
        &self,
        user_id: Uuid,
        name: &str,
        config: &SchedulerConfig,
    ) -> Result<DbNotebook> {
        let notebook = sqlx::query_as::<_, DbNotebook>(
            r#"
            INSERT INTO notebooks (user_id, name, scheduler_config)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, name, scheduler_config, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(name)
        .bind(Json(config))
        .fetch_one(&self.pool)
        .await?;

        Ok(notebook)
    }

    pub async fn get_notebook(&self, user_id: Uuid, notebook_id: Uuid) -> Result<Option<DbNotebook>> {
        let notebook = sqlx::query_as::<_, DbNotebook>(
            r#"
            SELECT id, user_id, name, scheduler_config, created_at, updated_at
            FROM notebooks
            WHERE user_id = $1 AND id = $2
            "#,
        )
        .bind(user_id)
        .bind(notebook_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(notebook)
    }

    pub async fn get_notebooks_by_ids(&self, user_id: Uuid, ids: &[Uuid]) -> Result<Vec<DbNotebook>> {
        let notebooks = sqlx::query_as::<_, DbNotebook>(
            r#"
            SELECT id, user_id, name, scheduler_config, created_at, updated_at
            FROM notebooks
            WHERE user_id = $1 AND id = ANY($2)
            "#,
        )
        .bind(user_id)
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(notebooks)
    }

    /// Replace a notebook's scheduler configuration
    pub async fn update_scheduler_config(
        &self,
        user_id: Uuid,
        notebook_id: Uuid,
        config: &SchedulerConfig,
    ) -> Result<Option<DbNotebook>> {
        let notebook = sqlx::query_as::<_, DbNotebook>(
            r#"
            UPDATE notebooks
            SET scheduler_config = $3, updated_at = NOW()
            WHERE user_id = $1 AND id = $2
            RETURNING id, user_id, name, scheduler_config, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(notebook_id)
        .bind(Json(config))
        .fetch_optional(&self.pool)
        .await?;

        Ok(notebook)
    }

    // === Card Repository ===

    /// Create a card in the new state, due immediately
    pub async fn create_card(&self, user_id: Uuid, notebook_id: Uuid) -> Result<DbCard> {
        let card = sqlx::query_as::<_, DbCard>(
            r#"
            INSERT INTO cards (user_id, notebook_id)
            SELECT user_id, id FROM notebooks
            WHERE user_id = $1 AND id = $2
            RETURNING id, user_id, notebook_id, state, step, stability, difficulty,
                      due, last_review, elapsed_days, scheduled_days, reps, lapses,
                      created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(notebook_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| ApiError::NotFound("Notebook not found".to_string()))?;

        Ok(card)
    }

    pub async fn get_card(&self, user_id: Uuid, card_id: Uuid) -> Result<Option<DbCard>> {
        let card = sqlx::query_as::<_, DbCard>(
            r#"
            SELECT id, user_id, notebook_id, state, step, stability, difficulty,
                   due, last_review, elapsed_days, scheduled_days, reps, lapses,
                   created_at, updated_at
            FROM cards
            WHERE user_id = $1 AND id = $2
            "#,
        )
        .bind(user_id)
        .bind(card_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(card)
    }

    /// Delete a card; its reviews stay with a null card reference
    pub async fn delete_card(&self, user_id: Uuid, card_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM cards WHERE user_id = $1 AND id = $2")
            .bind(user_id)
            .bind(card_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    // === Study Repository ===

    /// Due reviewed cards plus up to `new_card_cap` new cards per notebook
    pub async fn get_study_cards(
        &self,
        user_id: Uuid,
        notebook_id: Option<Uuid>,
        new_card_cap: i64,
        limit: i64,
        now: DateTime<Utc>,
    ) -> Result<Vec<DbCard>> {
        let cards = sqlx::query_as::<_, DbCard>(
            r#"
            WITH new_cards AS (
                SELECT *, ROW_NUMBER() OVER (
                    PARTITION BY notebook_id ORDER BY created_at, id
                ) AS new_rank
                FROM cards
                WHERE user_id = $1
                  AND state = 'new'
                  AND ($2::uuid IS NULL OR notebook_id = $2)
            )
            SELECT id, user_id, notebook_id, state, step, stability, difficulty,
                   due, last_review, elapsed_days, scheduled_days, reps, lapses,
                   created_at, updated_at
            FROM cards
            WHERE user_id = $1
              AND state <> 'new'
              AND due <= $3
              AND ($2::uuid IS NULL OR notebook_id = $2)
            UNION ALL
            SELECT id, user_id, notebook_id, state, step, stability, difficulty,
                   due, last_review, elapsed_days, scheduled_days, reps, lapses,
                   created_at, updated_at
            FROM new_cards
            WHERE new_rank <= $4
            ORDER BY due, id
            LIMIT $5
            "#,
        )
        .bind(user_id)
        .bind(notebook_id)
        .bind(now)
        .bind(new_card_cap)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(cards)
    }

    /// Every card, due or not, for practice mode
    pub async fn get_practice_cards(
        &self,
        user_id: Uuid,
        notebook_id: Option<Uuid>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<DbCard>> {
        let cards = sqlx::query_as::<_, DbCard>(
            r#"
            SELECT id, user_id, notebook_id, state, step, stability, difficulty,
                   due, last_review, elapsed_days, scheduled_days, reps, lapses,
                   created_at, updated_at
            FROM cards
            WHERE user_id = $1 AND ($2::uuid IS NULL OR notebook_id = $2)
            ORDER BY due, id
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(user_id)
        .bind(notebook_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(cards)
    }

    pub async fn count_practice_cards(&self, user_id: Uuid, notebook_id: Option<Uuid>) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM cards
            WHERE user_id = $1 AND ($2::uuid IS NULL OR notebook_id = $2)
            "#,
        )
        .bind(user_id)
        .bind(notebook_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// Uncapped due and new counts for each of the user's notebooks
    pub async fn get_study_counts(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<Vec<StudyCountRow>> {
        let rows = sqlx::query_as::<_, StudyCountRow>(
            r#"
            SELECT n.id AS notebook_id,
                   COUNT(c.id) FILTER (WHERE c.state <> 'new' AND c.due <= $2) AS due_count,
                   COUNT(c.id) FILTER (WHERE c.state = 'new') AS new_count,
                   COUNT(c.id) AS total
            FROM notebooks n
            LEFT JOIN cards c ON c.notebook_id = n.id AND c.user_id = n.user_id
            WHERE n.user_id = $1
            GROUP BY n.id
            "#,
        )
        .bind(user_id)
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    // === Review Repository ===

    pub async fn get_review(&self, user_id: Uuid, review_id: Uuid) -> Result<Option<DbReview>> {
        let mut conn = self.pool.acquire().await?;
        reviews::get_review(&mut conn, user_id, review_id).await
    }
}

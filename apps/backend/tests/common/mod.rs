//! Common test utilities and fixtures for integration tests.
//!
//! # Requirements
//! Integration tests require a PostgreSQL database (set DATABASE_URL env var).

pub mod fixtures;

use std::sync::Arc;

use axum::Router;
use uuid::Uuid;

use recall_backend::config::AppConfig;
use recall_backend::db::Database;
use recall_backend::models::{DbCard, DbNotebook, SchedulerConfig};
use recall_backend::{build_router, AppState};

/// Test context containing database connection and router.
pub struct TestContext {
    pub db: Arc<Database>,
    pub config: Arc<AppConfig>,
    app: Router,
}

impl TestContext {
    /// Create a new test context.
    ///
    /// # Panics
    /// Panics if DATABASE_URL is not set or database connection fails.
    pub async fn new() -> Self {
        dotenvy::dotenv().ok();

        let database_url =
            std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for integration tests");
        let mut config = AppConfig::with_database_url(database_url);
        config.new_card_cap = 3;

        let db = Database::connect(&config.database_url, 5)
            .await
            .expect("Failed to connect to test database");

        db.run_migrations()
            .await
            .expect("Failed to run migrations");

        let db = Arc::new(db);
        let config = Arc::new(config);

        let app = build_router(AppState {
            db: db.clone(),
            config: config.clone(),
        });

        Self { db, config, app }
    }

    /// Get the router for use with axum-test.
    pub fn router(&self) -> Router {
        self.app.clone()
    }

    /// Create a test user and return its ID and token.
    pub async fn create_test_user(&self) -> (Uuid, String) {
        let user = self
            .db
            .create_user(Some("test"))
            .await
            .expect("Failed to create test user");
        (user.id, user.token)
    }

    /// Create a notebook with fuzzing disabled so intervals are deterministic.
    pub async fn create_notebook(&self, user_id: Uuid) -> DbNotebook {
        self.create_notebook_with(user_id, fixtures::unfuzzed_config())
            .await
    }

    pub async fn create_notebook_with(&self, user_id: Uuid, config: SchedulerConfig) -> DbNotebook {
        self.db
            .create_notebook(user_id, "Test notebook", &config)
            .await
            .expect("Failed to create notebook")
    }

    pub async fn create_cards(&self, user_id: Uuid, notebook_id: Uuid, count: usize) -> Vec<DbCard> {
        let mut cards = Vec::with_capacity(count);
        for _ in 0..count {
            cards.push(
                self.db
                    .create_card(user_id, notebook_id)
                    .await
                    .expect("Failed to create card"),
            );
        }
        cards
    }

    pub async fn card(&self, user_id: Uuid, card_id: Uuid) -> Option<DbCard> {
        self.db
            .get_card(user_id, card_id)
            .await
            .expect("Failed to load card")
    }

    pub async fn review_count(&self, user_id: Uuid) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM reviews WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(self.db.pool())
            .await
            .expect("Failed to count reviews")
    }

    /// Format authorization header value.
    pub fn auth_header_value(token: &str) -> String {
        format!("Bearer {}", token)
    }

    /// Remove everything a test user owns.
    pub async fn cleanup_user(&self, user_id: Uuid) {
        let _ = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(self.db.pool())
            .await;
    }
}

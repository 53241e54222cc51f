//! Study and practice listings with interval previews.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use recall_core::Scheduler;

use crate::config::AppConfig;
use crate::db::Database;
use crate::error::Result;
use crate::models::{
    DbCard, NotebookStudyCounts, PracticePage, PracticeQuery, StudyCard, StudyCountRow,
    StudyCountsResponse, StudyQuery,
};

const DEFAULT_PAGE_SIZE: i64 = 50;

/// Cards due for scheduled study, with new cards capped per notebook.
pub async fn study_cards(
    db: &Database,
    config: &AppConfig,
    user_id: Uuid,
    query: &StudyQuery,
    now: DateTime<Utc>,
) -> Result<Vec<StudyCard>> {
    let limit = clamp_limit(query.limit, config.study_limit_max);
    let cards = db
        .get_study_cards(user_id, query.notebook_id, config.new_card_cap, limit, now)
        .await?;
    with_previews(db, user_id, cards, now).await
}

/// All cards regardless of due date, for practice mode.
pub async fn practice_cards(
    db: &Database,
    config: &AppConfig,
    user_id: Uuid,
    query: &PracticeQuery,
    now: DateTime<Utc>,
) -> Result<PracticePage> {
    let limit = clamp_limit(query.limit, config.study_limit_max);
    let offset = query.offset.unwrap_or(0).max(0);

    let total = db.count_practice_cards(user_id, query.notebook_id).await?;
    let cards = db
        .get_practice_cards(user_id, query.notebook_id, limit, offset)
        .await?;

    Ok(PracticePage {
        items: with_previews(db, user_id, cards, now).await?,
        total,
        limit,
        offset,
    })
}

/// Due and new counts per notebook.
pub async fn study_counts(
    db: &Database,
    config: &AppConfig,
    user_id: Uuid,
    now: DateTime<Utc>,
) -> Result<StudyCountsResponse> {
    let rows = db.get_study_counts(user_id, now).await?;
    Ok(summarize_counts(rows, config.new_card_cap))
}

fn clamp_limit(limit: Option<i64>, max: i64) -> i64 {
    limit.unwrap_or(DEFAULT_PAGE_SIZE.min(max)).clamp(1, max)
}

pub fn summarize_counts(rows: Vec<StudyCountRow>, new_card_cap: i64) -> StudyCountsResponse {
    let counts: HashMap<Uuid, NotebookStudyCounts> = rows
        .into_iter()
        .map(|row| {
            (
                row.notebook_id,
                NotebookStudyCounts {
                    due: row.due_count,
                    new: row.new_count.min(new_card_cap),
                    total: row.total,
                },
            )
        })
        .collect();

    StudyCountsResponse {
        total_due: counts.values().map(|c| c.due).sum(),
        total_new: counts.values().map(|c| c.new).sum(),
        counts,
    }
}

async fn with_previews(
    db: &Database,
    user_id: Uuid,
    cards: Vec<DbCard>,
    now: DateTime<Utc>,
) -> Result<Vec<StudyCard>> {
    let mut notebook_ids: Vec<Uuid> = cards.iter().map(|c| c.notebook_id).collect();
    notebook_ids.sort_unstable();
    notebook_ids.dedup();

    let schedulers = db
        .get_notebooks_by_ids(user_id, &notebook_ids)
        .await?
        .iter()
        .map(|n| n.scheduler().map(|s| (n.id, s)))
        .collect::<Result<HashMap<Uuid, Scheduler>>>()?;

    attach_previews(cards, &schedulers, now)
}

/// Attach interval previews using each card's notebook scheduler.
///
/// Cards whose notebook is missing from `schedulers` are skipped.
pub fn attach_previews(
    cards: Vec<DbCard>,
    schedulers: &HashMap<Uuid, Scheduler>,
    now: DateTime<Utc>,
) -> Result<Vec<StudyCard>> {
    let mut study = Vec::with_capacity(cards.len());
    for card in cards {
        let Some(scheduler) = schedulers.get(&card.notebook_id) else {
            tracing::warn!(card_id = %card.id, notebook_id = %card.notebook_id, "Card without notebook skipped");
            continue;
        };
        study.push(StudyCard {
            intervals: scheduler.preview(&card.to_schedule_state()?, now),
            card: card.to_response(),
        });
    }
    Ok(study)
}

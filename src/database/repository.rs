//! Repository layer for database operations
//!
//! Owner-scoped CRUD for worry records. Every query and mutation carries
//! the owner id, so one user's records are invisible to another.

use super::models::*;
use crate::error::{AppError, Result};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

/// Repository for database operations
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

/// Internal row struct for SQLite deserialization. The action plan is
/// stored as a pair of nullable columns that must be set together.
#[derive(sqlx::FromRow)]
struct WorryRow {
    id: String,
    owner_id: String,
    text: String,
    category: String,
    evidence: Option<String>,
    reframe: Option<String>,
    action_what: Option<String>,
    action_how: Option<String>,
    scheduled_for: Option<NaiveDate>,
    status: String,
    created_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    effectiveness_rating: Option<i64>,
    lesson_learned: Option<String>,
}

impl WorryRow {
    /// Convert a database row into the domain model.
    fn into_record(self) -> Result<WorryRecord> {
        let WorryRow {
            id,
            owner_id,
            text,
            category,
            evidence,
            reframe,
            action_what,
            action_how,
            scheduled_for,
            status,
            created_at,
            completed_at,
            effectiveness_rating,
            lesson_learned,
        } = self;

        let action_plan = match (action_what, action_how) {
            (Some(what), Some(how)) => Some(ActionPlan { what, how }),
            (None, None) => None,
            _ => {
                return Err(AppError::Store(format!(
                    "inconsistent action plan columns for worry {id}"
                )))
            }
        };

        let effectiveness_rating = effectiveness_rating
            .map(|v| {
                u8::try_from(v)
                    .map_err(|_| AppError::Store(format!("invalid effectiveness rating: {v}")))
            })
            .transpose()?;

        Ok(WorryRecord {
            id,
            owner_id,
            text,
            category: WorryCategory::parse(&category)?,
            evidence,
            reframe,
            action_plan,
            scheduled_for,
            status: WorryStatus::parse(&status)?,
            created_at,
            completed_at,
            effectiveness_rating,
            lesson_learned,
        })
    }
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Persist a new worry with a fresh id, pending status and creation
    /// timestamp assigned here.
    pub async fn create_worry(&self, owner_id: &str, draft: &WorryDraft) -> Result<WorryRecord> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        let row = sqlx::query_as::<_, WorryRow>(
            r#"
            INSERT INTO worries (
                id, owner_id, text, category, evidence, reframe,
                action_what, action_how, scheduled_for, status, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 'pending', ?)
            RETURNING *
            "#,
        )
        .bind(&id)
        .bind(owner_id)
        .bind(&draft.text)
        .bind(draft.category.as_str())
        .bind(draft.evidence.as_deref())
        .bind(draft.reframe.as_deref())
        .bind(draft.action_plan.as_ref().map(|p| p.what.as_str()))
        .bind(draft.action_plan.as_ref().map(|p| p.how.as_str()))
        .bind(draft.scheduled_for)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!("Created worry: {}", id);
        row.into_record()
    }

    /// Get a worry by id, scoped to its owner
    pub async fn get_worry(&self, owner_id: &str, id: &str) -> Result<WorryRecord> {
        let row = sqlx::query_as::<_, WorryRow>(
            r#"
            SELECT * FROM worries WHERE id = ? AND owner_id = ?
            "#,
        )
        .bind(id)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::WorryNotFound(id.to_string()))?;

        row.into_record()
    }

    /// List all worries for an owner, newest first
    pub async fn list_worries(&self, owner_id: &str) -> Result<Vec<WorryRecord>> {
        let rows = sqlx::query_as::<_, WorryRow>(
            r#"
            SELECT * FROM worries
            WHERE owner_id = ?
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(WorryRow::into_record).collect()
    }

    /// Mark a worry completed, optionally recording an effectiveness
    /// review. Completing an already-completed worry is a no-op that
    /// returns the stored record unchanged; an earlier review is never
    /// overwritten.
    pub async fn complete_worry(
        &self,
        owner_id: &str,
        id: &str,
        review: Option<&ReviewOutcome>,
    ) -> Result<WorryRecord> {
        let existing = self.get_worry(owner_id, id).await?;
        if existing.status == WorryStatus::Completed {
            tracing::debug!("Worry {} already completed, leaving unchanged", id);
            return Ok(existing);
        }

        let now = Utc::now();

        let rows = sqlx::query(
            r#"
            UPDATE worries
            SET status = 'completed',
                completed_at = ?,
                effectiveness_rating = ?,
                lesson_learned = ?
            WHERE id = ? AND owner_id = ? AND status = 'pending'
            "#,
        )
        .bind(now)
        .bind(review.map(|r| i64::from(r.effectiveness_rating)))
        .bind(review.map(|r| r.lesson_learned.as_str()))
        .bind(id)
        .bind(owner_id)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if rows == 0 {
            // Another session completed it between the read and the
            // guarded update; the stored record is authoritative.
            tracing::debug!("Worry {} completed concurrently elsewhere", id);
        } else {
            tracing::debug!("Completed worry: {}", id);
        }

        self.get_worry(owner_id, id).await
    }

    /// Permanently delete a worry. Irreversible.
    pub async fn delete_worry(&self, owner_id: &str, id: &str) -> Result<()> {
        let rows = sqlx::query("DELETE FROM worries WHERE id = ? AND owner_id = ?")
            .bind(id)
            .bind(owner_id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if rows == 0 {
            return Err(AppError::WorryNotFound(id.to_string()));
        }

        tracing::debug!("Deleted worry: {}", id);
        Ok(())
    }

    /// List pending scheduled worries whose date has arrived, soonest first
    pub async fn list_due_scheduled(
        &self,
        owner_id: &str,
        on_or_before: NaiveDate,
    ) -> Result<Vec<WorryRecord>> {
        let rows = sqlx::query_as::<_, WorryRow>(
            r#"
            SELECT * FROM worries
            WHERE owner_id = ?
              AND status = 'pending'
              AND category = 'scheduled'
              AND scheduled_for <= ?
            ORDER BY scheduled_for ASC
            "#,
        )
        .bind(owner_id)
        .bind(on_or_before)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(WorryRow::into_record).collect()
    }
}

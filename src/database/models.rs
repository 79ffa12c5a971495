//! Database models
//!
//! Rust structs representing persisted worry records and the ephemeral
//! values the wizard produces. All models use serde for serialization
//! to notification and display surfaces.

use crate::error::{AppError, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// How a worry was resolved by the decision flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorryCategory {
    /// Something the user can act on right away
    Actionable,
    /// Not actionable; consciously released
    LetItGo,
    /// Actionable, but planned for a later date
    Scheduled,
}

impl WorryCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Actionable => "actionable",
            Self::LetItGo => "let_it_go",
            Self::Scheduled => "scheduled",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "actionable" => Ok(Self::Actionable),
            "let_it_go" => Ok(Self::LetItGo),
            "scheduled" => Ok(Self::Scheduled),
            other => Err(AppError::Store(format!("invalid category: {other}"))),
        }
    }
}

/// Lifecycle status of a worry record. Transitions one way,
/// pending to completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorryStatus {
    Pending,
    Completed,
}

impl WorryStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            other => Err(AppError::Store(format!("invalid status: {other}"))),
        }
    }
}

/// A concrete next step attached to actionable and scheduled worries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionPlan {
    pub what: String,
    pub how: String,
}

/// A processed worry and its resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorryRecord {
    pub id: String,
    pub owner_id: String,
    pub text: String,
    pub category: WorryCategory,
    pub evidence: Option<String>,
    pub reframe: Option<String>,
    pub action_plan: Option<ActionPlan>,
    pub scheduled_for: Option<NaiveDate>,
    pub status: WorryStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub effectiveness_rating: Option<u8>,
    pub lesson_learned: Option<String>,
}

/// Output of a terminal wizard step, ready to be persisted.
///
/// Only the wizard's confirmation methods construct drafts, which keeps
/// category and structured fields consistent: an action plan is present
/// iff the category is actionable or scheduled, and a date is present
/// iff the category is scheduled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorryDraft {
    pub text: String,
    pub category: WorryCategory,
    pub evidence: Option<String>,
    pub reframe: Option<String>,
    pub action_plan: Option<ActionPlan>,
    pub scheduled_for: Option<NaiveDate>,
}

/// A finished effectiveness review, applied when a record is completed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewOutcome {
    pub effectiveness_rating: u8,
    pub lesson_learned: String,
}

//! Application configuration constants
//!
//! Central location for validation boundaries and file names used
//! throughout the application.

// ===== Worry Text Limits =====

/// Maximum length for a captured worry statement in characters.
/// Longer entries are almost certainly pasted by accident.
pub const MAX_WORRY_TEXT_LENGTH: usize = 2000;

// ===== Effectiveness Review Limits =====

/// Lowest effectiveness rating a review can record
pub const MIN_EFFECTIVENESS_RATING: u8 = 1;

/// Highest effectiveness rating a review can record
pub const MAX_EFFECTIVENESS_RATING: u8 = 5;

/// Rating pre-selected when a review form opens; the user must
/// acknowledge it before the review can be submitted.
pub const DEFAULT_EFFECTIVENESS_RATING: u8 = 3;

// ===== Action Plans =====

/// The `how` recorded for an act-now plan. Scheduled plans carry
/// user-provided text instead.
pub const ACTION_HOW_IMMEDIATE: &str = "immediate";

// ===== File Names =====

/// SQLite database file inside the application data directory
pub const DB_FILE_NAME: &str = "worries.db";

/// JSON settings file inside the application data directory
pub const SETTINGS_FILE_NAME: &str = "settings.json";

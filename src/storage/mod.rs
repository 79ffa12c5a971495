//! Storage module
//!
//! Provides the record store contract consumed by the worry engine and
//! its canonical SQLite-backed implementation.

pub mod record_store;

pub use record_store::{RecordStore, Snapshot, SqliteRecordStore, Subscription};

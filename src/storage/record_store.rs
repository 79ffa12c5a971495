//! Record store contract and SQLite-backed implementation
//!
//! The worry engine talks to persistence exclusively through the
//! [`RecordStore`] trait: create, complete and delete mutations plus a
//! per-owner subscription that pushes the owner's full record list on
//! every change. Snapshots are the single source of truth for what is
//! persisted; callers must not assume a mutation is visible in the feed
//! before the next push arrives.

use crate::database::{Repository, ReviewOutcome, WorryDraft, WorryRecord};
use crate::error::Result;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};

/// One full-list push from a record feed, newest record first
pub type Snapshot = Vec<WorryRecord>;

/// Live feed of one owner's records.
///
/// Dropping the subscription unsubscribes; a torn-down view must drop
/// its subscription so stale pushes cannot reach it.
pub struct Subscription {
    rx: watch::Receiver<Snapshot>,
}

impl Subscription {
    pub(crate) fn new(rx: watch::Receiver<Snapshot>) -> Self {
        Self { rx }
    }

    /// Wait for the next push. Returns false once the feed is closed.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }

    /// True if a push arrived since the last call to [`Self::latest`]
    pub fn has_changed(&self) -> bool {
        self.rx.has_changed().unwrap_or(false)
    }

    /// The most recent snapshot, marking it as seen
    pub fn latest(&mut self) -> Snapshot {
        self.rx.borrow_and_update().clone()
    }
}

/// Persistence contract consumed by the worry engine.
///
/// Completion is the only update the domain performs on an existing
/// record, so the contract models it directly rather than exposing a
/// generic partial-field update.
#[allow(async_fn_in_trait)]
pub trait RecordStore: Clone + Send + Sync {
    /// Persist a draft as a new pending record; the store assigns the
    /// id and creation timestamp.
    async fn create(&self, owner_id: &str, draft: &WorryDraft) -> Result<WorryRecord>;

    /// Flip a record to completed, optionally recording a review.
    /// Already-completed records are returned unchanged.
    async fn complete(
        &self,
        owner_id: &str,
        id: &str,
        review: Option<&ReviewOutcome>,
    ) -> Result<WorryRecord>;

    /// Hard-delete a record. Irreversible.
    async fn delete(&self, owner_id: &str, id: &str) -> Result<()>;

    /// Open a live snapshot feed for one owner, seeded with the current
    /// record list.
    async fn subscribe(&self, owner_id: &str) -> Result<Subscription>;
}

/// Canonical store: owner-scoped repository plus per-owner watch
/// channels that republish the full snapshot after every mutation.
#[derive(Clone)]
pub struct SqliteRecordStore {
    repo: Repository,
    feeds: Arc<Mutex<HashMap<String, watch::Sender<Snapshot>>>>,
}

impl SqliteRecordStore {
    pub fn new(repo: Repository) -> Self {
        Self {
            repo,
            feeds: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Push the owner's current record list to their feed, if anyone is
    /// listening. Feeds with no remaining subscribers are pruned.
    async fn publish(&self, owner_id: &str) {
        let mut feeds = self.feeds.lock().await;

        let Some(tx) = feeds.get(owner_id) else {
            return;
        };

        if tx.receiver_count() == 0 {
            feeds.remove(owner_id);
            return;
        }

        match self.repo.list_worries(owner_id).await {
            Ok(snapshot) => {
                tx.send_replace(snapshot);
            }
            Err(e) => {
                // The mutation itself already succeeded; subscribers
                // catch up on the next push.
                tracing::warn!("Failed to publish snapshot for {}: {}", owner_id, e);
            }
        }
    }
}

impl RecordStore for SqliteRecordStore {
    async fn create(&self, owner_id: &str, draft: &WorryDraft) -> Result<WorryRecord> {
        let record = self.repo.create_worry(owner_id, draft).await?;
        self.publish(owner_id).await;
        Ok(record)
    }

    async fn complete(
        &self,
        owner_id: &str,
        id: &str,
        review: Option<&ReviewOutcome>,
    ) -> Result<WorryRecord> {
        let record = self.repo.complete_worry(owner_id, id, review).await?;
        self.publish(owner_id).await;
        Ok(record)
    }

    async fn delete(&self, owner_id: &str, id: &str) -> Result<()> {
        self.repo.delete_worry(owner_id, id).await?;
        self.publish(owner_id).await;
        Ok(())
    }

    async fn subscribe(&self, owner_id: &str) -> Result<Subscription> {
        let snapshot = self.repo.list_worries(owner_id).await?;
        let mut feeds = self.feeds.lock().await;

        let rx = match feeds.get(owner_id) {
            Some(tx) => {
                // Refresh so the new subscriber starts from current state
                tx.send_replace(snapshot);
                tx.subscribe()
            }
            None => {
                let (tx, rx) = watch::channel(snapshot);
                feeds.insert(owner_id.to_string(), tx);
                rx
            }
        };

        tracing::debug!("Opened record feed for owner {}", owner_id);
        Ok(Subscription::new(rx))
    }
}

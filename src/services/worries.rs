//! Worry engine
//!
//! Coordinates one owner's wizard session with the record store:
//! commits terminal wizard steps, completes and deletes records, and
//! reconciles the visible list against the store's snapshot feed.
//!
//! The feed is the single source of truth for persisted records. A
//! commit inserts the created record as an optimistic entry so the UI
//! shows it immediately; the entry is dropped as soon as a snapshot
//! containing the same id arrives, so it can never outlive or duplicate
//! its authoritative counterpart.

use crate::database::{ReviewOutcome, WorryCategory, WorryDraft, WorryRecord, WorryStatus};
use crate::error::{AppError, Result};
use crate::services::identity::CurrentUser;
use crate::services::wizard::{FlowOptions, WizardSession};
use crate::storage::{RecordStore, Snapshot};
use chrono::NaiveDate;

/// Engine for one authenticated owner's worry flow
pub struct WorryService<S: RecordStore> {
    store: S,
    owner: CurrentUser,
    session: WizardSession,
    /// Records from the latest snapshot, newest first
    confirmed: Vec<WorryRecord>,
    /// Optimistic entries awaiting confirmation by a snapshot
    pending_local: Vec<WorryRecord>,
    /// Deletion intent awaiting explicit confirmation
    pending_delete: Option<String>,
    /// A store call is in flight; refuse further submissions until it
    /// resolves
    in_flight: bool,
}

impl<S: RecordStore> WorryService<S> {
    pub fn new(store: S, owner: CurrentUser, options: FlowOptions) -> Self {
        Self {
            store,
            owner,
            session: WizardSession::new(options),
            confirmed: Vec::new(),
            pending_local: Vec::new(),
            pending_delete: None,
            in_flight: false,
        }
    }

    pub fn owner(&self) -> &CurrentUser {
        &self.owner
    }

    pub fn session(&self) -> &WizardSession {
        &self.session
    }

    /// The wizard session, for step transitions driven by the UI
    pub fn session_mut(&mut self) -> &mut WizardSession {
        &mut self.session
    }

    /// True while a store call is unresolved; the UI disables
    /// re-submission of the same action.
    pub fn is_busy(&self) -> bool {
        self.in_flight
    }

    /// Replace the confirmed list with a snapshot from the feed and
    /// drop every optimistic entry the snapshot now confirms.
    pub fn apply_snapshot(&mut self, snapshot: Snapshot) {
        self.pending_local
            .retain(|pending| !snapshot.iter().any(|confirmed| confirmed.id == pending.id));
        self.confirmed = snapshot;
    }

    /// The list shown to the user: optimistic entries first (they are
    /// the newest), then the confirmed snapshot.
    pub fn worries(&self) -> Vec<&WorryRecord> {
        self.pending_local
            .iter()
            .rev()
            .chain(self.confirmed.iter())
            .collect()
    }

    /// Pending scheduled worries whose date has arrived
    pub fn due_scheduled(&self, today: NaiveDate) -> Vec<&WorryRecord> {
        self.worries()
            .into_iter()
            .filter(|r| {
                r.status == WorryStatus::Pending
                    && r.category == WorryCategory::Scheduled
                    && r.scheduled_for.is_some_and(|date| date <= today)
            })
            .collect()
    }

    /// Commit the release confirmation
    pub async fn commit_release(&mut self) -> Result<WorryRecord> {
        let draft = self.session.confirm_release()?;
        self.commit(draft).await
    }

    /// Commit the act-now confirmation
    pub async fn commit_action(&mut self, what: &str) -> Result<WorryRecord> {
        let draft = self.session.confirm_action(what)?;
        self.commit(draft).await
    }

    /// Commit the schedule confirmation
    pub async fn commit_schedule(
        &mut self,
        what: &str,
        how: &str,
        date: NaiveDate,
    ) -> Result<WorryRecord> {
        let draft = self.session.confirm_schedule(what, how, date)?;
        self.commit(draft).await
    }

    /// Persist a terminal-step draft. On success the session resets to
    /// capture; on failure it is left untouched so the user can retry
    /// without re-entering anything.
    async fn commit(&mut self, draft: WorryDraft) -> Result<WorryRecord> {
        self.begin_call()?;
        let result = self.store.create(&self.owner.id, &draft).await;
        self.in_flight = false;

        let record = result?;
        tracing::info!("Committed worry {} ({})", record.id, record.category.as_str());

        self.pending_local.push(record.clone());
        self.session.reset();
        Ok(record)
    }

    /// Complete a record without a review; only the completion
    /// timestamp is stamped.
    pub async fn complete_quick(&mut self, id: &str) -> Result<WorryRecord> {
        self.complete(id, None).await
    }

    /// Complete a record with a finished effectiveness review
    pub async fn complete_reviewed(
        &mut self,
        id: &str,
        outcome: ReviewOutcome,
    ) -> Result<WorryRecord> {
        self.complete(id, Some(outcome)).await
    }

    async fn complete(
        &mut self,
        id: &str,
        review: Option<ReviewOutcome>,
    ) -> Result<WorryRecord> {
        self.begin_call()?;
        let result = self.store.complete(&self.owner.id, id, review.as_ref()).await;
        self.in_flight = false;

        let record = result?;
        tracing::info!("Completed worry {}", record.id);

        // Refresh local copies right away; the next snapshot confirms
        self.replace_local(record.clone());
        Ok(record)
    }

    /// Register the intent to delete a record. Nothing is removed until
    /// [`Self::confirm_delete`]; [`Self::cancel_delete`] withdraws it.
    pub fn request_delete(&mut self, id: &str) -> Result<()> {
        if !self.worries().iter().any(|r| r.id == id) {
            return Err(AppError::WorryNotFound(id.to_string()));
        }
        self.pending_delete = Some(id.to_string());
        Ok(())
    }

    pub fn pending_delete(&self) -> Option<&str> {
        self.pending_delete.as_deref()
    }

    pub fn cancel_delete(&mut self) {
        self.pending_delete = None;
    }

    /// Execute the registered deletion. On failure the intent stays in
    /// place so the user can retry or cancel.
    pub async fn confirm_delete(&mut self) -> Result<()> {
        let Some(id) = self.pending_delete.clone() else {
            return Err(AppError::Validation(
                "no deletion awaiting confirmation".into(),
            ));
        };

        self.begin_call()?;
        let result = self.store.delete(&self.owner.id, &id).await;
        self.in_flight = false;
        result?;

        tracing::info!("Deleted worry {}", id);
        self.pending_delete = None;
        self.confirmed.retain(|r| r.id != id);
        self.pending_local.retain(|r| r.id != id);
        Ok(())
    }

    fn begin_call(&mut self) -> Result<()> {
        if self.in_flight {
            return Err(AppError::Validation(
                "a submission is already in flight".into(),
            ));
        }
        self.in_flight = true;
        Ok(())
    }

    fn replace_local(&mut self, record: WorryRecord) {
        for slot in self
            .confirmed
            .iter_mut()
            .chain(self.pending_local.iter_mut())
        {
            if slot.id == record.id {
                *slot = record.clone();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::ActionPlan;
    use crate::storage::Subscription;
    use chrono::Utc;
    use std::sync::{Arc, Mutex};
    use uuid::Uuid;

    /// In-memory store with controllable failures and a feed that only
    /// pushes when the test says so, for exercising the reconciliation
    /// contract.
    #[derive(Clone)]
    struct TestStore {
        inner: Arc<Mutex<TestStoreInner>>,
        feed: Arc<tokio::sync::watch::Sender<Snapshot>>,
    }

    impl Default for TestStore {
        fn default() -> Self {
            let (feed, _) = tokio::sync::watch::channel(Vec::new());
            Self {
                inner: Arc::default(),
                feed: Arc::new(feed),
            }
        }
    }

    #[derive(Default)]
    struct TestStoreInner {
        records: Vec<WorryRecord>,
        fail_writes: bool,
    }

    impl TestStore {
        fn fail_writes(&self, fail: bool) {
            self.inner.lock().unwrap().fail_writes = fail;
        }

        fn stored(&self) -> Vec<WorryRecord> {
            self.inner.lock().unwrap().records.clone()
        }

        fn check_writable(&self) -> Result<()> {
            if self.inner.lock().unwrap().fail_writes {
                Err(AppError::Store("store unavailable".into()))
            } else {
                Ok(())
            }
        }
    }

    impl RecordStore for TestStore {
        async fn create(&self, owner_id: &str, draft: &WorryDraft) -> Result<WorryRecord> {
            self.check_writable()?;
            let record = WorryRecord {
                id: Uuid::new_v4().to_string(),
                owner_id: owner_id.to_string(),
                text: draft.text.clone(),
                category: draft.category,
                evidence: draft.evidence.clone(),
                reframe: draft.reframe.clone(),
                action_plan: draft.action_plan.clone(),
                scheduled_for: draft.scheduled_for,
                status: WorryStatus::Pending,
                created_at: Utc::now(),
                completed_at: None,
                effectiveness_rating: None,
                lesson_learned: None,
            };
            self.inner.lock().unwrap().records.push(record.clone());
            Ok(record)
        }

        async fn complete(
            &self,
            owner_id: &str,
            id: &str,
            review: Option<&ReviewOutcome>,
        ) -> Result<WorryRecord> {
            self.check_writable()?;
            let mut inner = self.inner.lock().unwrap();
            let record = inner
                .records
                .iter_mut()
                .find(|r| r.id == id && r.owner_id == owner_id)
                .ok_or_else(|| AppError::WorryNotFound(id.to_string()))?;
            if record.status == WorryStatus::Pending {
                record.status = WorryStatus::Completed;
                record.completed_at = Some(Utc::now());
                if let Some(review) = review {
                    record.effectiveness_rating = Some(review.effectiveness_rating);
                    record.lesson_learned = Some(review.lesson_learned.clone());
                }
            }
            Ok(record.clone())
        }

        async fn delete(&self, owner_id: &str, id: &str) -> Result<()> {
            self.check_writable()?;
            let mut inner = self.inner.lock().unwrap();
            let before = inner.records.len();
            inner
                .records
                .retain(|r| !(r.id == id && r.owner_id == owner_id));
            if inner.records.len() == before {
                return Err(AppError::WorryNotFound(id.to_string()));
            }
            Ok(())
        }

        async fn subscribe(&self, _owner_id: &str) -> Result<Subscription> {
            // Deliberately lazy: the feed only moves when a test pushes,
            // which is how stale-snapshot behavior gets exercised.
            Ok(Subscription::new(self.feed.subscribe()))
        }
    }

    fn test_user() -> CurrentUser {
        CurrentUser {
            id: "user-1".to_string(),
            display_name: "Test User".to_string(),
        }
    }

    fn service(store: TestStore) -> WorryService<TestStore> {
        WorryService::new(store, test_user(), FlowOptions { restructure: false })
    }

    async fn commit_release(svc: &mut WorryService<TestStore>, text: &str) -> WorryRecord {
        svc.session_mut().submit_worry(text).unwrap();
        svc.session_mut().choose_not_actionable().unwrap();
        svc.commit_release().await.unwrap()
    }

    #[tokio::test]
    async fn test_act_now_commit_shape() {
        let mut svc = service(TestStore::default());

        svc.session_mut().submit_worry("Presentation tomorrow").unwrap();
        svc.session_mut().choose_actionable().unwrap();
        svc.session_mut().choose_act_now().unwrap();

        let record = svc.commit_action("Rehearse for 15 min").await.unwrap();

        assert_eq!(record.category, WorryCategory::Actionable);
        assert_eq!(record.status, WorryStatus::Pending);
        assert_eq!(
            record.action_plan,
            Some(ActionPlan {
                what: "Rehearse for 15 min".to_string(),
                how: "immediate".to_string(),
            })
        );

        // Session reset for the next worry
        assert!(matches!(
            svc.session().step(),
            crate::services::wizard::WizardStep::Capture { .. }
        ));
    }

    #[tokio::test]
    async fn test_release_commit_shape() {
        let mut svc = service(TestStore::default());
        let record = commit_release(&mut svc, "Global politics").await;

        assert_eq!(record.category, WorryCategory::LetItGo);
        assert_eq!(record.status, WorryStatus::Pending);
        assert_eq!(record.action_plan, None);
        assert_eq!(record.scheduled_for, None);
        assert_eq!(record.text, "Global politics");
    }

    #[tokio::test]
    async fn test_schedule_commit_shape() {
        let mut svc = service(TestStore::default());

        svc.session_mut().submit_worry("Renew passport").unwrap();
        svc.session_mut().choose_actionable().unwrap();
        svc.session_mut().choose_schedule_later().unwrap();

        let date = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let record = svc
            .commit_schedule("Visit passport office", "on a day off", date)
            .await
            .unwrap();

        assert_eq!(record.category, WorryCategory::Scheduled);
        assert_eq!(record.scheduled_for, Some(date));
        assert_eq!(record.action_plan.unwrap().what, "Visit passport office");
        assert_eq!(record.status, WorryStatus::Pending);
    }

    #[tokio::test]
    async fn test_commit_failure_preserves_session_for_retry() {
        let store = TestStore::default();
        let mut svc = service(store.clone());

        svc.session_mut().submit_worry("Presentation tomorrow").unwrap();
        svc.session_mut().choose_actionable().unwrap();
        svc.session_mut().choose_act_now().unwrap();

        store.fail_writes(true);
        let result = svc.commit_action("Rehearse for 15 min").await;
        assert!(matches!(result, Err(AppError::Store(_))));

        // Session untouched: still at act-now, text intact, not busy
        assert!(matches!(
            svc.session().step(),
            crate::services::wizard::WizardStep::ActNow { .. }
        ));
        assert!(!svc.is_busy());
        assert!(svc.worries().is_empty());

        // Retry without re-entering data
        store.fail_writes(false);
        let record = svc.commit_action("Rehearse for 15 min").await.unwrap();
        assert_eq!(record.text, "Presentation tomorrow");
    }

    #[tokio::test]
    async fn test_optimistic_entry_reconciled_not_duplicated() {
        let store = TestStore::default();
        let mut svc = service(store.clone());

        let record = commit_release(&mut svc, "Global politics").await;

        // Visible optimistically before any snapshot mentions it
        assert_eq!(svc.worries().len(), 1);
        assert_eq!(svc.worries()[0].id, record.id);

        // A stale snapshot without the record leaves the entry alone
        svc.apply_snapshot(Vec::new());
        assert_eq!(svc.worries().len(), 1);

        // The authoritative snapshot replaces it, no duplicate
        svc.apply_snapshot(store.stored());
        let visible = svc.worries();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id, record.id);
    }

    #[tokio::test]
    async fn test_snapshot_is_source_of_truth_after_confirmation() {
        let store = TestStore::default();
        let mut svc = service(store.clone());

        let record = commit_release(&mut svc, "Old worry").await;
        svc.apply_snapshot(store.stored());

        // Another session deletes the record; the next snapshot wins
        store.delete("user-1", &record.id).await.unwrap();
        svc.apply_snapshot(store.stored());

        assert!(svc.worries().is_empty());
    }

    #[tokio::test]
    async fn test_complete_quick_then_reviewed_is_noop() {
        let store = TestStore::default();
        let mut svc = service(store.clone());

        let record = commit_release(&mut svc, "Old worry").await;
        svc.apply_snapshot(store.stored());

        let completed = svc.complete_quick(&record.id).await.unwrap();
        assert_eq!(completed.status, WorryStatus::Completed);
        assert_eq!(completed.effectiveness_rating, None);

        // Completing again with a review does not revive or overwrite
        let outcome = ReviewOutcome {
            effectiveness_rating: 4,
            lesson_learned: "It went fine".to_string(),
        };
        let second = svc.complete_reviewed(&record.id, outcome).await.unwrap();
        assert_eq!(second, completed);
        assert_eq!(svc.worries().len(), 1);
        assert_eq!(svc.worries()[0].status, WorryStatus::Completed);
    }

    #[tokio::test]
    async fn test_reviewed_complete_records_outcome() {
        let store = TestStore::default();
        let mut svc = service(store.clone());

        let record = commit_release(&mut svc, "Presentation").await;
        svc.apply_snapshot(store.stored());

        let outcome = ReviewOutcome {
            effectiveness_rating: 4,
            lesson_learned: "It went fine".to_string(),
        };
        let completed = svc.complete_reviewed(&record.id, outcome).await.unwrap();

        assert_eq!(completed.status, WorryStatus::Completed);
        assert_eq!(completed.effectiveness_rating, Some(4));
        assert_eq!(completed.lesson_learned.as_deref(), Some("It went fine"));
        assert!(completed.completed_at.is_some());
    }

    #[tokio::test]
    async fn test_delete_requires_confirmation() {
        let store = TestStore::default();
        let mut svc = service(store.clone());

        let record = commit_release(&mut svc, "To delete").await;

        // Confirming without an intent is rejected
        assert!(svc.confirm_delete().await.is_err());

        svc.request_delete(&record.id).unwrap();
        assert_eq!(svc.pending_delete(), Some(record.id.as_str()));

        // Cancelling withdraws the intent; nothing was removed
        svc.cancel_delete();
        assert!(svc.pending_delete().is_none());
        assert_eq!(store.stored().len(), 1);

        // Request again and confirm for real
        svc.request_delete(&record.id).unwrap();
        svc.confirm_delete().await.unwrap();
        assert!(store.stored().is_empty());
        assert!(svc.worries().is_empty());
        assert!(svc.pending_delete().is_none());
    }

    #[tokio::test]
    async fn test_failed_delete_keeps_intent_for_retry() {
        let store = TestStore::default();
        let mut svc = service(store.clone());

        let record = commit_release(&mut svc, "Sticky worry").await;
        svc.request_delete(&record.id).unwrap();

        store.fail_writes(true);
        assert!(svc.confirm_delete().await.is_err());
        assert_eq!(svc.pending_delete(), Some(record.id.as_str()));
        assert_eq!(svc.worries().len(), 1);

        store.fail_writes(false);
        svc.confirm_delete().await.unwrap();
        assert!(svc.worries().is_empty());
    }

    #[tokio::test]
    async fn test_request_delete_unknown_id() {
        let mut svc = service(TestStore::default());
        assert!(matches!(
            svc.request_delete("missing"),
            Err(AppError::WorryNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_due_scheduled_filtering() {
        let store = TestStore::default();
        let mut svc = service(store.clone());

        svc.session_mut().submit_worry("Renew passport").unwrap();
        svc.session_mut().choose_actionable().unwrap();
        svc.session_mut().choose_schedule_later().unwrap();
        let due_date = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        svc.commit_schedule("Visit passport office", "", due_date)
            .await
            .unwrap();

        svc.session_mut().submit_worry("Far future").unwrap();
        svc.session_mut().choose_actionable().unwrap();
        svc.session_mut().choose_schedule_later().unwrap();
        let far = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        svc.commit_schedule("Do it later", "", far).await.unwrap();

        commit_release(&mut svc, "Not scheduled").await;

        let today = NaiveDate::from_ymd_opt(2025, 3, 15).unwrap();
        let due = svc.due_scheduled(today);
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].text, "Renew passport");
    }
}

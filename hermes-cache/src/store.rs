//! Fetch-and-cache primitive shared by every table.
//!
//! Each fetch runs in three steps: `begin` marks the table loading and stamps
//! a request generation, the read suspends on the network, and `settle`
//! publishes either the decoded rows or the failure message. Both steps are
//! single snapshot swaps on the watch channel.

use crate::api_client::{ApiClientError, TableSource};
use crate::config::StaleResponsePolicy;
use crate::lookup::dedupe_by_key;
use crate::state::CacheState;
use crate::table::{
    FireStatistics, MediaDetailsTable, PostverifiedReports, PreverifiedReports, ResponseLogs,
    Table, UserAccounts,
};
use chrono::Utc;
use hermes_core::{media_endpoint, MediaId, MediaStorage, TableId, MEDIA_BLOB_ENDPOINT};
use std::sync::Arc;
use tokio::sync::watch;

/// How a single fetch settled. Informational only: the outcome is already
/// reflected in the table's status by the time this is returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Loaded { rows: usize },
    Failed { message: String },
    /// A newer request for the same table was issued before this one settled.
    Superseded,
    /// The table cannot be fetched in bulk (keyed media storage).
    Unsupported,
}

impl FetchOutcome {
    pub fn is_loaded(&self) -> bool {
        matches!(self, FetchOutcome::Loaded { .. })
    }
}

pub struct TableStore {
    source: Arc<dyn TableSource>,
    state: watch::Sender<Arc<CacheState>>,
    policy: StaleResponsePolicy,
}

impl TableStore {
    pub fn new(source: Arc<dyn TableSource>, policy: StaleResponsePolicy) -> Self {
        let (state, _) = watch::channel(Arc::new(CacheState::new()));
        Self {
            source,
            state,
            policy,
        }
    }

    pub fn policy(&self) -> StaleResponsePolicy {
        self.policy
    }

    pub fn snapshot(&self) -> Arc<CacheState> {
        Arc::clone(&self.state.borrow())
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<CacheState>> {
        self.state.subscribe()
    }

    /// Fetch `T` from its bulk endpoint and replace its snapshot.
    pub async fn fetch_table<T: Table>(&self) -> FetchOutcome {
        let table = T::ID;
        let generation = self.begin(table);
        tracing::debug!(table = %table, generation, endpoint = table.endpoint(), "Fetching table");

        let result = self
            .source
            .get_json(table.endpoint())
            .await
            .and_then(|body| Ok(serde_json::from_value::<Vec<T::Row>>(body)?));

        let result = result.map(|rows| {
            let (rows, dropped) = dedupe_by_key(rows);
            if dropped > 0 {
                tracing::warn!(table = %table, dropped, "Dropped rows with duplicate primary keys");
            }
            rows
        });

        let outcome = self.settle::<T>(generation, result);
        self.log_outcome(table, generation, &outcome);
        outcome
    }

    /// Dispatch a bulk fetch by table id.
    pub async fn fetch(&self, table: TableId) -> FetchOutcome {
        match table {
            TableId::FireStatistics => self.fetch_table::<FireStatistics>().await,
            TableId::PostverifiedReports => self.fetch_table::<PostverifiedReports>().await,
            TableId::PreverifiedReports => self.fetch_table::<PreverifiedReports>().await,
            TableId::ResponseLogs => self.fetch_table::<ResponseLogs>().await,
            TableId::UserAccounts => self.fetch_table::<UserAccounts>().await,
            TableId::MediaDetails => self.fetch_table::<MediaDetailsTable>().await,
            TableId::MediaStorage => {
                tracing::warn!(table = %table, "Keyed table has no bulk endpoint; use fetch_media_by_id");
                FetchOutcome::Unsupported
            }
        }
    }

    /// Fetch one media row and add it to the keyed media map.
    ///
    /// Entries for other ids are kept. A response is stale only when a newer
    /// request for the same id was issued; a fresh row is always written.
    /// The shared table flags follow the newest media request of any id.
    pub async fn fetch_media_by_id(&self, id: MediaId) -> FetchOutcome {
        let table = TableId::MediaStorage;
        let mut generation = 0;
        self.transition(|next| {
            generation = next.begin_media(id);
            true
        });
        let path = media_endpoint(id);
        tracing::debug!(table = %table, generation, media_id = %id, "Fetching media");

        let result = self
            .source
            .get_json(&path)
            .await
            .and_then(|body| Ok(serde_json::from_value::<MediaStorage>(body)?));

        let discard = self.policy == StaleResponsePolicy::Discard;
        let mut outcome = FetchOutcome::Superseded;
        self.transition(|next| {
            if discard && next.is_media_superseded(id, generation) {
                return false;
            }
            let owns_flags = !discard || !next.status(table).is_superseded_by_newer(generation);
            match result {
                Ok(row) => {
                    next.insert_media(id, row);
                    if owns_flags {
                        next.status_mut(table).succeed(Utc::now());
                    }
                    outcome = FetchOutcome::Loaded { rows: 1 };
                    true
                }
                Err(err) => {
                    let message = err.to_string();
                    outcome = FetchOutcome::Failed {
                        message: message.clone(),
                    };
                    if !owns_flags {
                        return false;
                    }
                    next.status_mut(table).fail(message);
                    true
                }
            }
        });
        self.log_outcome(table, generation, &outcome);
        outcome
    }

    /// Download the file behind a media id. The result is not cached and
    /// failures leave the table flags alone.
    pub async fn fetch_media_blob(&self, id: MediaId) -> Option<Vec<u8>> {
        let body = serde_json::json!({ "MS_media_id": id });
        match self.source.post_bytes(MEDIA_BLOB_ENDPOINT, &body).await {
            Ok(bytes) => {
                tracing::debug!(media_id = %id, bytes = bytes.len(), "Fetched media blob");
                Some(bytes)
            }
            Err(err) => {
                tracing::warn!(media_id = %id, error = %err, "Media blob fetch failed");
                None
            }
        }
    }

    /// Re-run the combined report join against the current snapshot.
    pub fn combine_reports(&self) {
        self.transition(|next| {
            next.rederive_combined();
            true
        });
    }

    fn begin(&self, table: TableId) -> u64 {
        let mut generation = 0;
        self.transition(|next| {
            generation = next.status_mut(table).begin();
            true
        });
        generation
    }

    /// Publish the result of a bulk fetch of `T` issued with `generation`.
    fn settle<T: Table>(
        &self,
        generation: u64,
        result: Result<Vec<T::Row>, ApiClientError>,
    ) -> FetchOutcome {
        let table = T::ID;
        let policy = self.policy;
        let mut outcome = FetchOutcome::Superseded;
        self.transition(|next| {
            if policy == StaleResponsePolicy::Discard
                && next.status(table).is_superseded_by_newer(generation)
            {
                return false;
            }
            outcome = match result {
                Ok(rows) => {
                    let count = rows.len();
                    next.replace_rows::<T>(rows);
                    next.status_mut(table).succeed(Utc::now());
                    FetchOutcome::Loaded { rows: count }
                }
                Err(err) => {
                    let message = err.to_string();
                    next.status_mut(table).fail(message.clone());
                    FetchOutcome::Failed { message }
                }
            };
            true
        });
        outcome
    }

    /// Derive the next snapshot from the current one and publish it.
    ///
    /// `update` returns `false` to abandon the transition; nothing is
    /// published and subscribers are not woken.
    fn transition(&self, update: impl FnOnce(&mut CacheState) -> bool) -> bool {
        self.state.send_if_modified(|current| {
            let mut next = CacheState::clone(current);
            if !update(&mut next) {
                return false;
            }
            *current = Arc::new(next);
            true
        })
    }

    fn log_outcome(&self, table: TableId, generation: u64, outcome: &FetchOutcome) {
        match outcome {
            FetchOutcome::Loaded { rows } => {
                tracing::info!(table = %table, generation, rows, "Table loaded");
            }
            FetchOutcome::Failed { message } => {
                tracing::warn!(table = %table, generation, error = %message, "Table fetch failed");
            }
            FetchOutcome::Superseded => {
                tracing::debug!(table = %table, generation, "Discarded stale response");
            }
            FetchOutcome::Unsupported => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use hermes_core::UserId;
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FixedSource {
        routes: Mutex<HashMap<String, Result<Value, String>>>,
    }

    impl FixedSource {
        fn set(&self, path: &str, response: Result<Value, String>) {
            self.routes
                .lock()
                .unwrap()
                .insert(path.to_string(), response);
        }
    }

    #[async_trait]
    impl TableSource for FixedSource {
        async fn get_json(&self, path: &str) -> Result<Value, ApiClientError> {
            let routes = self.routes.lock().unwrap();
            match routes.get(path) {
                Some(Ok(body)) => Ok(body.clone()),
                Some(Err(message)) => Err(ApiClientError::InvalidResponse(message.clone())),
                None => Err(ApiClientError::InvalidResponse("HTTP 404: not found".to_string())),
            }
        }
    }

    fn user_json(id: i64) -> Value {
        json!({
            "UA_user_id": id,
            "UA_username": format!("user{}", id),
            "UA_user_role": "civilian",
            "UA_created_at": "2025-01-01 00:00:00",
            "UA_last_name": "Reyes",
            "UA_first_name": "Lia",
            "UA_email_address": "lia@example.com",
            "UA_phone_number": "0917",
            "UA_reputation_score": 0.0
        })
    }

    fn store_with(source: Arc<FixedSource>) -> TableStore {
        TableStore::new(source, StaleResponsePolicy::Discard)
    }

    #[tokio::test]
    async fn test_fetch_success_replaces_rows() {
        let source = Arc::new(FixedSource::default());
        source.set("/user/get/all", Ok(json!([user_json(1), user_json(2)])));
        let store = store_with(source.clone());

        let outcome = store.fetch_table::<UserAccounts>().await;
        assert_eq!(outcome, FetchOutcome::Loaded { rows: 2 });

        let snapshot = store.snapshot();
        let status = snapshot.status(TableId::UserAccounts);
        assert!(!status.loading);
        assert!(status.error.is_none());
        assert!(status.is_loaded());
        assert_eq!(snapshot.user_accounts[1].user_id, UserId::new(2));

        source.set("/user/get/all", Ok(json!([user_json(3)])));
        store.fetch_table::<UserAccounts>().await;
        let snapshot = store.snapshot();
        assert_eq!(snapshot.user_accounts.len(), 1);
        assert_eq!(snapshot.user_accounts[0].user_id, UserId::new(3));
    }

    #[tokio::test]
    async fn test_failure_keeps_previous_rows() {
        let source = Arc::new(FixedSource::default());
        source.set("/user/get/all", Ok(json!([user_json(1)])));
        let store = store_with(source.clone());
        store.fetch_table::<UserAccounts>().await;
        let before = store.snapshot();

        source.set("/user/get/all", Err("HTTP 500: database offline".to_string()));
        let outcome = store.fetch_table::<UserAccounts>().await;
        assert!(matches!(outcome, FetchOutcome::Failed { .. }));

        let after = store.snapshot();
        assert!(!after.is_loading(TableId::UserAccounts));
        assert_eq!(
            after.error(TableId::UserAccounts),
            Some("Unexpected response: HTTP 500: database offline")
        );
        assert!(Arc::ptr_eq(&before.user_accounts, &after.user_accounts));
        assert_eq!(
            before.status(TableId::UserAccounts).loaded_at,
            after.status(TableId::UserAccounts).loaded_at
        );
    }

    #[tokio::test]
    async fn test_decode_failure_is_a_fetch_failure() {
        let source = Arc::new(FixedSource::default());
        source.set("/user/get/all", Ok(json!({"unexpected": "object"})));
        let store = store_with(source);

        let outcome = store.fetch_table::<UserAccounts>().await;
        assert!(matches!(outcome, FetchOutcome::Failed { ref message } if message.starts_with("Serialization error")));
        assert!(store.snapshot().user_accounts.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_keys_are_collapsed() {
        let source = Arc::new(FixedSource::default());
        source.set("/user/get/all", Ok(json!([user_json(1), user_json(1), user_json(2)])));
        let store = store_with(source);

        assert_eq!(store.fetch_table::<UserAccounts>().await, FetchOutcome::Loaded { rows: 2 });
    }

    #[tokio::test]
    async fn test_bulk_fetch_of_media_storage_is_unsupported() {
        let store = store_with(Arc::new(FixedSource::default()));
        assert_eq!(store.fetch(TableId::MediaStorage).await, FetchOutcome::Unsupported);
        assert_eq!(store.snapshot().status(TableId::MediaStorage).generation(), 0);
    }

    #[tokio::test]
    async fn test_media_blob_from_json_only_source_is_none() {
        let store = store_with(Arc::new(FixedSource::default()));
        let before = store.snapshot();

        assert_eq!(store.fetch_media_blob(MediaId::new(4)).await, None);
        assert!(Arc::ptr_eq(&before, &store.snapshot()));
    }

    #[tokio::test]
    async fn test_subscribers_see_each_swap() {
        let source = Arc::new(FixedSource::default());
        source.set("/user/get/all", Ok(json!([user_json(1)])));
        let store = store_with(source);
        let mut rx = store.subscribe();

        store.fetch_table::<UserAccounts>().await;
        assert!(rx.has_changed().unwrap());
        let seen = rx.borrow_and_update().clone();
        assert_eq!(seen.user_accounts.len(), 1);
        assert!(!seen.is_loading(TableId::UserAccounts));
    }
}

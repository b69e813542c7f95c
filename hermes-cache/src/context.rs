//! The cache as consumers see it.

use crate::api_client::{ApiClientError, RestClient, TableSource};
use crate::config::{CacheConfig, StaleResponsePolicy};
use crate::lookup;
use crate::refresh::{RefreshOrchestrator, RefreshReport};
use crate::state::CacheState;
use crate::store::{FetchOutcome, TableStore};
use crate::table::{
    FireStatistics, MediaDetailsTable, PostverifiedReports, PreverifiedReports, ResponseLogs,
    Table, UserAccounts,
};
use hermes_core::{
    CombinedReport, MediaId, MediaStorage, PostverifiedReport, PreverifiedReport, ReportId,
    TableId, UserAccount, UserId, VerificationId,
};
use std::sync::Arc;
use tokio::sync::{watch, OnceCell};

/// Shared handle to one memory-resident cache.
///
/// Clones share state. Reads return a whole [`CacheState`] snapshot; holding
/// one never blocks writers and never observes a half-applied update.
#[derive(Clone)]
pub struct CacheContext {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    store: TableStore,
    initial_load: OnceCell<RefreshReport>,
}

impl CacheContext {
    pub fn new(source: Arc<dyn TableSource>, policy: StaleResponsePolicy) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                store: TableStore::new(source, policy),
                initial_load: OnceCell::new(),
            }),
        }
    }

    /// Build a context backed by the REST client described in `config`.
    pub fn from_config(config: &CacheConfig) -> Result<Self, ApiClientError> {
        let client = RestClient::new(config)?;
        tracing::debug!(base_url = client.base_url(), "Cache context created");
        Ok(Self::new(Arc::new(client), config.stale_responses))
    }

    /// Build a context and schedule its initial load on the current tokio
    /// runtime. Must be called from within a runtime.
    pub fn spawn(source: Arc<dyn TableSource>, policy: StaleResponsePolicy) -> Self {
        let context = Self::new(source, policy);
        let loader = context.clone();
        tokio::spawn(async move {
            loader.initial_load().await;
        });
        context
    }

    /// Load preverified reports and user accounts.
    ///
    /// Runs once per context; later calls (from any clone) wait for and
    /// return the first run's report.
    pub async fn initial_load(&self) -> RefreshReport {
        self.inner
            .initial_load
            .get_or_init(|| async {
                tracing::info!("Starting initial load");
                RefreshOrchestrator::initial_load().run(&self.inner.store).await
            })
            .await
            .clone()
    }

    pub fn initial_load_done(&self) -> bool {
        self.inner.initial_load.initialized()
    }

    // ------------------------------------------------------------------------
    // Snapshots
    // ------------------------------------------------------------------------

    pub fn snapshot(&self) -> Arc<CacheState> {
        self.inner.store.snapshot()
    }

    /// Receiver notified on every snapshot swap.
    pub fn subscribe(&self) -> watch::Receiver<Arc<CacheState>> {
        self.inner.store.subscribe()
    }

    pub fn combined_reports(&self) -> Arc<Vec<CombinedReport>> {
        Arc::clone(&self.snapshot().combined_reports)
    }

    // ------------------------------------------------------------------------
    // Fetches
    // ------------------------------------------------------------------------

    pub async fn fetch_table<T: Table>(&self) -> FetchOutcome {
        self.inner.store.fetch_table::<T>().await
    }

    pub async fn fetch(&self, table: TableId) -> FetchOutcome {
        self.inner.store.fetch(table).await
    }

    pub async fn fetch_fire_statistics(&self) -> FetchOutcome {
        self.fetch_table::<FireStatistics>().await
    }

    pub async fn fetch_postverified_reports(&self) -> FetchOutcome {
        self.fetch_table::<PostverifiedReports>().await
    }

    pub async fn fetch_preverified_reports(&self) -> FetchOutcome {
        self.fetch_table::<PreverifiedReports>().await
    }

    pub async fn fetch_response_logs(&self) -> FetchOutcome {
        self.fetch_table::<ResponseLogs>().await
    }

    pub async fn fetch_user_accounts(&self) -> FetchOutcome {
        self.fetch_table::<UserAccounts>().await
    }

    pub async fn fetch_media_details(&self) -> FetchOutcome {
        self.fetch_table::<MediaDetailsTable>().await
    }

    pub async fn fetch_media_by_id(&self, id: MediaId) -> FetchOutcome {
        self.inner.store.fetch_media_by_id(id).await
    }

    /// Raw bytes of a media file, or `None` when the download fails.
    pub async fn fetch_media_blob(&self, id: MediaId) -> Option<Vec<u8>> {
        self.inner.store.fetch_media_blob(id).await
    }

    /// Reload postverified reports, preverified reports and user accounts
    /// concurrently. Resolves after all three settle.
    pub async fn refresh_all(&self) -> RefreshReport {
        RefreshOrchestrator::refresh_all()
            .run(&self.inner.store)
            .await
    }

    /// Re-derive the combined view from the cached source tables.
    pub fn combine_reports(&self) {
        self.inner.store.combine_reports();
    }

    // ------------------------------------------------------------------------
    // Lookups (cloned out of the current snapshot)
    // ------------------------------------------------------------------------

    pub fn preverified_report(&self, id: ReportId) -> Option<PreverifiedReport> {
        lookup::find_by_id::<PreverifiedReports>(&self.snapshot(), id).cloned()
    }

    pub fn postverified_report(&self, id: VerificationId) -> Option<PostverifiedReport> {
        lookup::find_by_id::<PostverifiedReports>(&self.snapshot(), id).cloned()
    }

    pub fn postverified_for_report(&self, report_id: ReportId) -> Option<PostverifiedReport> {
        lookup::postverified_for_report(&self.snapshot(), report_id).cloned()
    }

    pub fn user_account(&self, id: UserId) -> Option<UserAccount> {
        lookup::find_by_id::<UserAccounts>(&self.snapshot(), id).cloned()
    }

    pub fn media(&self, id: MediaId) -> Option<MediaStorage> {
        lookup::media(&self.snapshot(), id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Serves fixed bodies and counts requests per path.
    #[derive(Default)]
    struct CountingSource {
        hits: std::sync::Mutex<Vec<String>>,
        calls: AtomicUsize,
    }

    impl CountingSource {
        fn hits_for(&self, path: &str) -> usize {
            self.hits.lock().unwrap().iter().filter(|p| *p == path).count()
        }
    }

    #[async_trait]
    impl TableSource for CountingSource {
        async fn get_json(&self, path: &str) -> Result<Value, ApiClientError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.hits.lock().unwrap().push(path.to_string());
            match path {
                "/reports/preverified/all" => Ok(json!([{
                    "PR_report_id": 7,
                    "PR_user_id": 1,
                    "PR_latitude": "14.5995",
                    "PR_longitude": 120.9842,
                    "PR_address": "Tondo",
                    "PR_timestamp": "2025-04-01 10:00:00",
                    "PR_verified": false,
                    "PR_report_status": "pending"
                }])),
                "/reports/postverified/all" => Ok(json!([{
                    "VR_verification_id": 70,
                    "VR_report_id": 7,
                    "VR_confidence_score": 0.8,
                    "VR_detected": true,
                    "VR_verification_timestamp": "2025-04-01 11:00:00"
                }])),
                "/user/get/all" => Err(ApiClientError::InvalidResponse(
                    "HTTP 500: user service down".to_string(),
                )),
                "/media/3" => Ok(json!({
                    "MS_media_id": 3,
                    "MS_user_owner": 1,
                    "MS_file_type": "image/jpeg",
                    "MS_file_name": "smoke.jpg"
                })),
                _ => Err(ApiClientError::InvalidResponse("HTTP 404: not found".to_string())),
            }
        }
    }

    fn context() -> (CacheContext, Arc<CountingSource>) {
        let source = Arc::new(CountingSource::default());
        (
            CacheContext::new(source.clone(), StaleResponsePolicy::Discard),
            source,
        )
    }

    #[tokio::test]
    async fn test_initial_load_runs_once_across_clones() {
        let (ctx, source) = context();
        let other = ctx.clone();

        let (a, b) = tokio::join!(ctx.initial_load(), other.initial_load());
        assert_eq!(a, b);
        assert!(ctx.initial_load_done());
        assert_eq!(source.hits_for("/reports/preverified/all"), 1);
        assert_eq!(source.hits_for("/user/get/all"), 1);

        ctx.initial_load().await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_refresh_all_isolates_failures() {
        let (ctx, _) = context();
        let report = ctx.refresh_all().await;

        let failed: Vec<_> = report.failed().map(|(table, _)| table).collect();
        assert_eq!(failed, vec![TableId::UserAccounts]);

        let snapshot = ctx.snapshot();
        assert_eq!(snapshot.preverified_reports.len(), 1);
        assert_eq!(snapshot.postverified_reports.len(), 1);
        assert!(snapshot.error(TableId::UserAccounts).is_some());
        assert!(!snapshot.any_loading());
        assert_eq!(ctx.combined_reports().len(), 1);
        assert!(ctx.combined_reports()[0].is_verified());
    }

    #[tokio::test]
    async fn test_lookups_clone_from_snapshot() {
        let (ctx, _) = context();
        assert!(ctx.preverified_report(ReportId::new(7)).is_none());

        ctx.fetch_preverified_reports().await;
        ctx.fetch_postverified_reports().await;
        ctx.fetch_media_by_id(MediaId::new(3)).await;

        let report = ctx.preverified_report(ReportId::new(7));
        assert_eq!(report.map(|r| r.address), Some("Tondo".to_string()));
        assert_eq!(
            ctx.postverified_for_report(ReportId::new(7)).map(|v| v.verification_id),
            Some(VerificationId::new(70))
        );
        assert!(ctx.postverified_report(VerificationId::new(70)).is_some());
        assert!(ctx.user_account(UserId::new(1)).is_none());
        assert_eq!(
            ctx.media(MediaId::new(3)).map(|m| m.file_name),
            Some("smoke.jpg".to_string())
        );
    }

    #[tokio::test]
    async fn test_spawn_schedules_initial_load() {
        let source = Arc::new(CountingSource::default());
        let ctx = CacheContext::spawn(source.clone(), StaleResponsePolicy::Discard);

        let report = ctx.initial_load().await;
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
        assert_eq!(report.outcomes.len(), 2);
        assert!(ctx.initial_load_done());
        assert_eq!(source.hits_for("/reports/preverified/all"), 1);
    }
}

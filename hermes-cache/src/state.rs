//! Cache state snapshots.
//!
//! A [`CacheState`] is immutable once published. Every table is held behind
//! its own `Arc`, so deriving the next snapshot from the previous one copies
//! pointers, not rows.

use crate::join;
use crate::table::Table;
use hermes_core::{
    CombinedReport, FireStatistic, MediaDetails, MediaId, MediaStorage, PostverifiedReport,
    PreverifiedReport, ResponseLog, TableId, Timestamp, UserAccount,
};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Load bookkeeping for one table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableStatus {
    pub loading: bool,
    pub error: Option<String>,
    /// When the last successful fetch settled. `None` until the first one.
    pub loaded_at: Option<Timestamp>,
    generation: u64,
}

impl TableStatus {
    /// Number of fetches issued for this table so far.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded_at.is_some()
    }

    /// Failed and nothing has ever loaded: the caller has no rows to fall
    /// back on.
    pub fn is_unavailable(&self) -> bool {
        self.error.is_some() && self.loaded_at.is_none()
    }

    pub(crate) fn begin(&mut self) -> u64 {
        self.generation += 1;
        self.loading = true;
        self.error = None;
        self.generation
    }

    pub(crate) fn is_superseded_by_newer(&self, generation: u64) -> bool {
        generation < self.generation
    }

    pub(crate) fn succeed(&mut self, at: Timestamp) {
        self.loading = false;
        self.error = None;
        self.loaded_at = Some(at);
    }

    pub(crate) fn fail(&mut self, message: String) {
        self.loading = false;
        self.error = Some(message);
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheState {
    pub fire_statistics: Arc<Vec<FireStatistic>>,
    pub postverified_reports: Arc<Vec<PostverifiedReport>>,
    pub preverified_reports: Arc<Vec<PreverifiedReport>>,
    pub response_logs: Arc<Vec<ResponseLog>>,
    pub user_accounts: Arc<Vec<UserAccount>>,
    pub media_details: Arc<Vec<MediaDetails>>,
    pub media_storage: Arc<BTreeMap<MediaId, MediaStorage>>,
    pub combined_reports: Arc<Vec<CombinedReport>>,
    status: [TableStatus; TableId::COUNT],
    /// Newest media generation issued per id.
    media_requests: Arc<BTreeMap<MediaId, u64>>,
}

impl CacheState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self, table: TableId) -> &TableStatus {
        &self.status[table.index()]
    }

    pub(crate) fn status_mut(&mut self, table: TableId) -> &mut TableStatus {
        &mut self.status[table.index()]
    }

    pub fn is_loading(&self, table: TableId) -> bool {
        self.status(table).loading
    }

    pub fn error(&self, table: TableId) -> Option<&str> {
        self.status(table).error.as_deref()
    }

    pub fn rows<T: Table>(&self) -> &[T::Row] {
        T::rows(self).as_slice()
    }

    pub fn row_count(&self, table: TableId) -> usize {
        match table {
            TableId::FireStatistics => self.fire_statistics.len(),
            TableId::PostverifiedReports => self.postverified_reports.len(),
            TableId::PreverifiedReports => self.preverified_reports.len(),
            TableId::ResponseLogs => self.response_logs.len(),
            TableId::UserAccounts => self.user_accounts.len(),
            TableId::MediaDetails => self.media_details.len(),
            TableId::MediaStorage => self.media_storage.len(),
        }
    }

    /// True while any table has a fetch in flight.
    pub fn any_loading(&self) -> bool {
        self.status.iter().any(|s| s.loading)
    }

    /// Swap in a new row set for `T`, re-deriving the join when `T` feeds it.
    pub(crate) fn replace_rows<T: Table>(&mut self, rows: Vec<T::Row>) {
        *T::rows_mut(self) = Arc::new(rows);
        if T::feeds_join() {
            self.rederive_combined();
        }
    }

    /// Start a media fetch for `id`, returning its generation.
    pub(crate) fn begin_media(&mut self, id: MediaId) -> u64 {
        let generation = self.status_mut(TableId::MediaStorage).begin();
        let mut requests = BTreeMap::clone(&self.media_requests);
        requests.insert(id, generation);
        self.media_requests = Arc::new(requests);
        generation
    }

    /// A newer request for the same media id has been issued.
    pub(crate) fn is_media_superseded(&self, id: MediaId, generation: u64) -> bool {
        self.media_requests
            .get(&id)
            .is_some_and(|&newest| generation < newest)
    }

    pub(crate) fn insert_media(&mut self, id: MediaId, row: MediaStorage) {
        let mut media = BTreeMap::clone(&self.media_storage);
        media.insert(id, row);
        self.media_storage = Arc::new(media);
    }

    pub(crate) fn rederive_combined(&mut self) {
        self.combined_reports = Arc::new(join::combine(
            &self.preverified_reports,
            &self.postverified_reports,
        ));
    }
}

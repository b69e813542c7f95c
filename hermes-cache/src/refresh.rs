//! Concurrent multi-table refresh.

use crate::store::{FetchOutcome, TableStore};
use futures_util::future::join_all;
use hermes_core::TableId;

/// Tables reloaded by a user-triggered refresh. Fire statistics and response
/// logs are only fetched on demand.
pub const REFRESH_ALL_TABLES: &[TableId] = &[
    TableId::PostverifiedReports,
    TableId::PreverifiedReports,
    TableId::UserAccounts,
];

/// Tables loaded once when a context starts.
pub const INITIAL_LOAD_TABLES: &[TableId] = &[TableId::PreverifiedReports, TableId::UserAccounts];

/// Per-table results of one fan-out, in the order the tables were listed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshReport {
    pub outcomes: Vec<(TableId, FetchOutcome)>,
}

impl RefreshReport {
    pub fn failed(&self) -> impl Iterator<Item = (TableId, &str)> {
        self.outcomes.iter().filter_map(|(table, outcome)| match outcome {
            FetchOutcome::Failed { message } => Some((*table, message.as_str())),
            _ => None,
        })
    }

    pub fn all_loaded(&self) -> bool {
        self.outcomes.iter().all(|(_, outcome)| outcome.is_loaded())
    }
}

/// Fans a fixed table set out to the store and waits for every fetch to
/// settle. A failing table never cancels or delays the others.
#[derive(Debug, Clone, Copy)]
pub struct RefreshOrchestrator {
    tables: &'static [TableId],
}

impl RefreshOrchestrator {
    pub const fn new(tables: &'static [TableId]) -> Self {
        Self { tables }
    }

    pub const fn refresh_all() -> Self {
        Self::new(REFRESH_ALL_TABLES)
    }

    pub const fn initial_load() -> Self {
        Self::new(INITIAL_LOAD_TABLES)
    }

    pub fn tables(&self) -> &'static [TableId] {
        self.tables
    }

    pub async fn run(&self, store: &TableStore) -> RefreshReport {
        let fetches = self.tables.iter().map(|&table| async move {
            let outcome = store.fetch(table).await;
            (table, outcome)
        });
        let outcomes = join_all(fetches).await;

        let report = RefreshReport { outcomes };
        let failed = report.failed().count();
        if failed == 0 {
            tracing::info!(tables = self.tables.len(), "Refresh settled");
        } else {
            tracing::warn!(tables = self.tables.len(), failed, "Refresh settled with failures");
        }
        report
    }
}

//! Compile-time mapping from table markers to row types and snapshot slots.

use crate::state::CacheState;
use hermes_core::{
    FireStatistic, Keyed, MediaDetails, PostverifiedReport, PreverifiedReport, ResponseLog,
    TableId, UserAccount,
};
use serde::de::DeserializeOwned;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

/// A list-shaped table whose snapshot is replaced wholesale on every
/// successful fetch.
pub trait Table: Send + Sync + 'static {
    type Row: Keyed<Key = Self::Key> + DeserializeOwned + Clone + fmt::Debug + Send + Sync + 'static;
    type Key: Copy + Eq + Hash + fmt::Debug + Send + Sync + 'static;

    const ID: TableId;

    fn rows(state: &CacheState) -> &Arc<Vec<Self::Row>>;

    fn rows_mut(state: &mut CacheState) -> &mut Arc<Vec<Self::Row>>;

    /// Whether replacing this table must re-derive the combined report view.
    fn feeds_join() -> bool {
        false
    }
}

macro_rules! list_table {
    ($(#[$meta:meta])* $marker:ident, $row:ty, $id:expr, $field:ident) => {
        list_table!($(#[$meta])* $marker, $row, $id, $field, false);
    };
    ($(#[$meta:meta])* $marker:ident, $row:ty, $id:expr, $field:ident, $join:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default)]
        pub struct $marker;

        impl Table for $marker {
            type Row = $row;
            type Key = <$row as Keyed>::Key;

            const ID: TableId = $id;

            fn rows(state: &CacheState) -> &Arc<Vec<$row>> {
                &state.$field
            }

            fn rows_mut(state: &mut CacheState) -> &mut Arc<Vec<$row>> {
                &mut state.$field
            }

            fn feeds_join() -> bool {
                $join
            }
        }
    };
}

list_table!(FireStatistics, FireStatistic, TableId::FireStatistics, fire_statistics);
list_table!(
    /// Right side of the combined report join.
    PostverifiedReports,
    PostverifiedReport,
    TableId::PostverifiedReports,
    postverified_reports,
    true
);
list_table!(
    /// Left side of the combined report join.
    PreverifiedReports,
    PreverifiedReport,
    TableId::PreverifiedReports,
    preverified_reports,
    true
);
list_table!(ResponseLogs, ResponseLog, TableId::ResponseLogs, response_logs);
list_table!(UserAccounts, UserAccount, TableId::UserAccounts, user_accounts);
list_table!(MediaDetailsTable, MediaDetails, TableId::MediaDetails, media_details);

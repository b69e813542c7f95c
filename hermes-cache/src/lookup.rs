//! Point lookups over the current snapshot.
//!
//! Tables hold hundreds of rows, so every lookup is a linear scan. A miss is
//! a normal outcome (the referenced row may simply not be fetched yet).

use crate::state::CacheState;
use crate::table::Table;
use hermes_core::{Keyed, MediaId, MediaStorage, PostverifiedReport, ReportId};
use std::collections::HashSet;

/// Row of `T` whose primary key equals `key`.
pub fn find_by_id<T: Table>(state: &CacheState, key: T::Key) -> Option<&T::Row> {
    find_in(state.rows::<T>(), key)
}

/// First row in `rows` with primary key `key`.
pub fn find_in<R: Keyed>(rows: &[R], key: R::Key) -> Option<&R> {
    rows.iter().find(|row| row.key() == key)
}

/// Verification attached to a preverified report, looked up by foreign key.
pub fn postverified_for_report(state: &CacheState, report_id: ReportId) -> Option<&PostverifiedReport> {
    state
        .postverified_reports
        .iter()
        .find(|row| row.report_id == report_id)
}

pub fn media(state: &CacheState, id: MediaId) -> Option<&MediaStorage> {
    state.media_storage.get(&id)
}

/// Keep the first row for every primary key, preserving order.
///
/// Returns the deduplicated rows and how many were dropped.
pub(crate) fn dedupe_by_key<R: Keyed>(rows: Vec<R>) -> (Vec<R>, usize) {
    let before = rows.len();
    let mut seen = HashSet::with_capacity(before);
    let unique: Vec<R> = rows.into_iter().filter(|row| seen.insert(row.key())).collect();
    let dropped = before - unique.len();
    (unique, dropped)
}

//! Closed set of tables mirrored by the client cache.

use crate::error::CoreError;
use crate::identity::MediaId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier for every server table the cache knows about.
///
/// The discriminant doubles as the index into per-table status arrays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TableId {
    FireStatistics,
    PostverifiedReports,
    PreverifiedReports,
    ResponseLogs,
    UserAccounts,
    MediaDetails,
    MediaStorage,
}

impl TableId {
    pub const COUNT: usize = 7;

    pub const ALL: [TableId; TableId::COUNT] = [
        TableId::FireStatistics,
        TableId::PostverifiedReports,
        TableId::PreverifiedReports,
        TableId::ResponseLogs,
        TableId::UserAccounts,
        TableId::MediaDetails,
        TableId::MediaStorage,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }

    /// Name used by the dashboards and in log fields.
    pub const fn name(self) -> &'static str {
        match self {
            TableId::FireStatistics => "fireStatistics",
            TableId::PostverifiedReports => "postverifiedReports",
            TableId::PreverifiedReports => "preverifiedReports",
            TableId::ResponseLogs => "responseLogs",
            TableId::UserAccounts => "userAccounts",
            TableId::MediaDetails => "mediaDetails",
            TableId::MediaStorage => "mediaStorage",
        }
    }

    /// Path of the bulk GET endpoint, relative to the API base URL.
    ///
    /// `MediaStorage` has no bulk endpoint; its value is the prefix that
    /// [`media_endpoint`] extends with a row id.
    pub const fn endpoint(self) -> &'static str {
        match self {
            TableId::FireStatistics => "/fire-statistics",
            TableId::PostverifiedReports => "/reports/postverified/all",
            TableId::PreverifiedReports => "/reports/preverified/all",
            TableId::ResponseLogs => "/response-logs",
            TableId::UserAccounts => "/user/get/all",
            TableId::MediaDetails => "/media/details/get/all",
            TableId::MediaStorage => "/media",
        }
    }

    /// List-shaped tables are replaced wholesale; keyed ones accumulate.
    pub const fn is_keyed(self) -> bool {
        matches!(self, TableId::MediaStorage)
    }
}

/// POST endpoint answering with the raw bytes of one media file.
pub const MEDIA_BLOB_ENDPOINT: &str = "/media/blob/get/one";

/// Endpoint for a single media row.
pub fn media_endpoint(id: MediaId) -> String {
    format!("{}/{}", TableId::MediaStorage.endpoint(), id)
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TableId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        TableId::ALL
            .into_iter()
            .find(|id| id.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| CoreError::UnknownTable {
                name: s.to_string(),
            })
    }
}

//! Hermes Core - Row Types
//!
//! Pure data structures mirrored from the incident-reporting API.
//! This crate contains ONLY data types and decoding rules - no I/O.

mod entities;
mod enums;
mod error;
mod identity;
mod table;

pub use entities::{
    CombinedReport, FireStatistic, Keyed, MediaDetails, MediaStorage, PostverifiedReport,
    PreverifiedReport, ResponseLog, UserAccount,
};
pub use enums::{ReportStatus, ResponseStatus, SeverityLevel, SpreadPotential, UserRole};
pub use error::{CoreError, CoreResult};
pub use identity::{
    parse_timestamp, MediaId, ReportId, ResponseId, StatisticId, Timestamp, UserId,
    VerificationId,
};
pub use table::{media_endpoint, TableId, MEDIA_BLOB_ENDPOINT};

//! Row structures mirrored from the server tables
//!
//! Field names on the wire carry the table prefix used by the MySQL schema
//! (`PR_`, `VR_`, `UA_`, ...). Structs use plain Rust names and rename on
//! (de)serialization.

use crate::enums::{ReportStatus, ResponseStatus, SeverityLevel, SpreadPotential, UserRole};
use crate::error::CoreError;
use crate::identity::{
    parse_timestamp, MediaId, ReportId, ResponseId, StatisticId, Timestamp, UserId,
    VerificationId,
};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::hash::Hash;

/// Access to a row's primary key.
pub trait Keyed {
    type Key: Copy + Eq + Hash + fmt::Debug + Send + Sync + 'static;

    fn key(&self) -> Self::Key;
}

/// Aggregated fire metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FireStatistic {
    #[serde(rename = "FS_statistic_id")]
    pub statistic_id: StatisticId,
    #[serde(rename = "FS_last_update")]
    pub last_update: String,
    #[serde(rename = "FS_total_fires")]
    pub total_fires: i64,
    #[serde(rename = "FS_false_alarms")]
    pub false_alarms: i64,
    #[serde(rename = "FS_detected_fires")]
    pub detected_fires: i64,
    #[serde(
        rename = "FS_average_confidence",
        deserialize_with = "wire::average_confidence",
        serialize_with = "wire::decimal_text"
    )]
    pub average_confidence: f64,
}

/// Citizen-submitted incident, before responder verification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreverifiedReport {
    #[serde(rename = "PR_report_id")]
    pub report_id: ReportId,
    #[serde(rename = "PR_user_id")]
    pub user_id: UserId,
    #[serde(rename = "PR_image", default)]
    pub image: Option<MediaId>,
    #[serde(rename = "PR_video", default)]
    pub video: Option<MediaId>,
    #[serde(
        rename = "PR_latitude",
        deserialize_with = "wire::latitude",
        serialize_with = "wire::decimal_text"
    )]
    pub latitude: f64,
    #[serde(
        rename = "PR_longitude",
        deserialize_with = "wire::longitude",
        serialize_with = "wire::decimal_text"
    )]
    pub longitude: f64,
    #[serde(rename = "PR_address")]
    pub address: String,
    #[serde(rename = "PR_timestamp")]
    pub timestamp: String,
    #[serde(
        rename = "PR_verified",
        deserialize_with = "wire::verified",
        serialize_with = "wire::flag_int"
    )]
    pub verified: bool,
    #[serde(rename = "PR_report_status")]
    pub status: ReportStatus,
}

/// A responder's verification outcome for one preverified report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostverifiedReport {
    #[serde(rename = "VR_verification_id")]
    pub verification_id: VerificationId,
    /// Foreign key into `PreverifiedReport::report_id`.
    #[serde(rename = "VR_report_id")]
    pub report_id: ReportId,
    #[serde(
        rename = "VR_confidence_score",
        deserialize_with = "wire::confidence_score",
        serialize_with = "wire::decimal_text"
    )]
    pub confidence_score: f64,
    #[serde(
        rename = "VR_detected",
        deserialize_with = "wire::detected",
        serialize_with = "wire::flag_int"
    )]
    pub detected: bool,
    #[serde(rename = "VR_verification_timestamp")]
    pub verification_timestamp: String,
    #[serde(rename = "VR_severity_level", default)]
    pub severity_level: Option<SeverityLevel>,
    #[serde(rename = "VR_spread_potential", default)]
    pub spread_potential: Option<SpreadPotential>,
    #[serde(rename = "VR_fire_type", default)]
    pub fire_type: Option<String>,
}

/// Audit entry for a dispatched response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseLog {
    #[serde(rename = "RL_response_id")]
    pub response_id: ResponseId,
    #[serde(rename = "RL_verified_report_id")]
    pub verified_report_id: VerificationId,
    #[serde(rename = "RL_response_time")]
    pub response_time: String,
    #[serde(rename = "RL_response_status")]
    pub status: ResponseStatus,
}

/// Registered user. The password column is never decoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserAccount {
    #[serde(rename = "UA_user_id")]
    pub user_id: UserId,
    #[serde(rename = "UA_username")]
    pub username: String,
    #[serde(rename = "UA_user_role")]
    pub role: UserRole,
    #[serde(rename = "UA_created_at")]
    pub created_at: String,
    #[serde(rename = "UA_last_name")]
    pub last_name: String,
    #[serde(rename = "UA_first_name")]
    pub first_name: String,
    #[serde(rename = "UA_middle_name", default)]
    pub middle_name: Option<String>,
    #[serde(rename = "UA_suffix", default)]
    pub suffix: Option<String>,
    #[serde(rename = "UA_email_address")]
    pub email_address: String,
    #[serde(rename = "UA_phone_number")]
    pub phone_number: String,
    #[serde(
        rename = "UA_reputation_score",
        deserialize_with = "wire::reputation_score",
        serialize_with = "wire::decimal_text"
    )]
    pub reputation_score: f64,
    #[serde(rename = "UA_id_picture_front", default)]
    pub id_picture_front: Option<MediaId>,
    #[serde(rename = "UA_id_picture_back", default)]
    pub id_picture_back: Option<MediaId>,
}

/// Media row fetched one id at a time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaStorage {
    #[serde(rename = "MS_media_id")]
    pub media_id: MediaId,
    #[serde(rename = "MS_user_owner")]
    pub user_owner: UserId,
    #[serde(rename = "MS_file_type")]
    pub file_type: String,
    #[serde(rename = "MS_file_name")]
    pub file_name: String,
    /// Encoded payload; absent when the server returns metadata only.
    #[serde(rename = "MS_file_data", default)]
    pub file_data: Option<String>,
}

/// Metadata-only media listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaDetails {
    #[serde(rename = "MS_media_id")]
    pub media_id: MediaId,
    #[serde(rename = "MS_user_owner")]
    pub user_owner: UserId,
    #[serde(rename = "MS_file_type")]
    pub file_type: String,
    #[serde(rename = "MS_file_name")]
    pub file_name: String,
}

/// A preverified report paired with its verification, if one exists.
#[derive(Debug, Clone, PartialEq)]
pub struct CombinedReport {
    pub preverified: PreverifiedReport,
    pub postverified: Option<PostverifiedReport>,
}

impl CombinedReport {
    pub fn new(preverified: PreverifiedReport, postverified: Option<PostverifiedReport>) -> Self {
        Self {
            preverified,
            postverified,
        }
    }

    pub fn report_id(&self) -> ReportId {
        self.preverified.report_id
    }

    pub fn is_verified(&self) -> bool {
        self.postverified.is_some()
    }

    pub fn as_pair(&self) -> (&PreverifiedReport, Option<&PostverifiedReport>) {
        (&self.preverified, self.postverified.as_ref())
    }
}

// ============================================================================
// ACCESSORS
// ============================================================================

impl FireStatistic {
    pub fn last_update_at(&self) -> Option<Timestamp> {
        parse_timestamp(&self.last_update)
    }
}

impl PreverifiedReport {
    pub fn submitted_at(&self) -> Option<Timestamp> {
        parse_timestamp(&self.timestamp)
    }

    /// Media ids attached to the submission, image first.
    pub fn media_ids(&self) -> impl Iterator<Item = MediaId> {
        self.image.into_iter().chain(self.video)
    }
}

impl PostverifiedReport {
    pub fn verified_at(&self) -> Option<Timestamp> {
        parse_timestamp(&self.verification_timestamp)
    }
}

impl ResponseLog {
    pub fn responded_at(&self) -> Option<Timestamp> {
        parse_timestamp(&self.response_time)
    }
}

impl UserAccount {
    pub fn created_at_ts(&self) -> Option<Timestamp> {
        parse_timestamp(&self.created_at)
    }

    /// "First Middle Last Suffix", skipping blank parts.
    pub fn display_name(&self) -> String {
        [
            Some(self.first_name.as_str()),
            self.middle_name.as_deref(),
            Some(self.last_name.as_str()),
            self.suffix.as_deref(),
        ]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
    }
}

impl Keyed for FireStatistic {
    type Key = StatisticId;
    fn key(&self) -> StatisticId {
        self.statistic_id
    }
}

impl Keyed for PreverifiedReport {
    type Key = ReportId;
    fn key(&self) -> ReportId {
        self.report_id
    }
}

impl Keyed for PostverifiedReport {
    type Key = VerificationId;
    fn key(&self) -> VerificationId {
        self.verification_id
    }
}

impl Keyed for ResponseLog {
    type Key = ResponseId;
    fn key(&self) -> ResponseId {
        self.response_id
    }
}

impl Keyed for UserAccount {
    type Key = UserId;
    fn key(&self) -> UserId {
        self.user_id
    }
}

impl Keyed for MediaDetails {
    type Key = MediaId;
    fn key(&self) -> MediaId {
        self.media_id
    }
}

impl Keyed for MediaStorage {
    type Key = MediaId;
    fn key(&self) -> MediaId {
        self.media_id
    }
}

// ============================================================================
// LENIENT DECODING
// ============================================================================

/// PyMySQL hands DECIMAL columns to Flask as strings and TINYINT(1) columns
/// as integers. Both shapes are accepted alongside plain JSON numbers and
/// booleans, and rows serialize back in the server's form.
mod wire {
    use super::*;
    use serde::Serializer;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrText {
        Number(f64),
        Text(String),
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum FlagRepr {
        Bool(bool),
        Int(i64),
        Text(String),
    }

    fn decimal<'de, D>(deserializer: D, field: &'static str) -> Result<f64, D::Error>
    where
        D: Deserializer<'de>,
    {
        match NumberOrText::deserialize(deserializer)? {
            NumberOrText::Number(value) => Ok(value),
            NumberOrText::Text(text) => text.trim().parse::<f64>().map_err(|_| {
                serde::de::Error::custom(CoreError::InvalidDecimal { field, value: text })
            }),
        }
    }

    fn flag<'de, D>(deserializer: D, field: &'static str) -> Result<bool, D::Error>
    where
        D: Deserializer<'de>,
    {
        let invalid =
            |value: String| serde::de::Error::custom(CoreError::InvalidFlag { field, value });
        match FlagRepr::deserialize(deserializer)? {
            FlagRepr::Bool(value) => Ok(value),
            FlagRepr::Int(0) => Ok(false),
            FlagRepr::Int(1) => Ok(true),
            FlagRepr::Int(other) => Err(invalid(other.to_string())),
            FlagRepr::Text(text) => match text.trim() {
                "0" | "false" => Ok(false),
                "1" | "true" => Ok(true),
                _ => Err(invalid(text)),
            },
        }
    }

    macro_rules! wire_field {
        ($($name:ident => $decode:ident($ty:ty, $field:literal);)*) => {
            $(
                pub(super) fn $name<'de, D>(deserializer: D) -> Result<$ty, D::Error>
                where
                    D: Deserializer<'de>,
                {
                    $decode(deserializer, $field)
                }
            )*
        };
    }

    wire_field! {
        average_confidence => decimal(f64, "FS_average_confidence");
        latitude => decimal(f64, "PR_latitude");
        longitude => decimal(f64, "PR_longitude");
        confidence_score => decimal(f64, "VR_confidence_score");
        reputation_score => decimal(f64, "UA_reputation_score");
        verified => flag(bool, "PR_verified");
        detected => flag(bool, "VR_detected");
    }

    /// Shortest text that parses back to the same `f64`.
    pub(super) fn decimal_text<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub(super) fn flag_int<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(u8::from(*value))
    }
}

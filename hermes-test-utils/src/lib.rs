//! Hermes Test Utilities
//!
//! Shared test infrastructure for the Hermes workspace:
//! - A scripted [`TableSource`] for driving the cache without a server
//! - Proptest generators for every row type
//! - Fixtures for common rows and wire bodies
//! - Assertions for cache state invariants

pub use hermes_cache::{
    ApiClientError, CacheContext, CacheState, FetchOutcome, StaleResponsePolicy, TableSource,
    TableStatus,
};
pub use hermes_core::{
    CombinedReport, FireStatistic, MediaDetails, MediaId, MediaStorage, PostverifiedReport,
    PreverifiedReport, ReportId, ReportStatus, ResponseId, ResponseLog, ResponseStatus,
    SeverityLevel, SpreadPotential, StatisticId, TableId, Timestamp, UserAccount, UserId,
    UserRole, VerificationId,
};

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

// ============================================================================
// MOCK TABLE SOURCE
// ============================================================================

/// One canned reply for a path.
#[derive(Debug, Clone)]
pub struct ScriptedResponse {
    pub body: Result<Value, String>,
    pub delay: Duration,
}

impl ScriptedResponse {
    pub fn ok(body: Value) -> Self {
        Self {
            body: Ok(body),
            delay: Duration::ZERO,
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            body: Err(message.into()),
            delay: Duration::ZERO,
        }
    }

    /// Reply only after `delay` (tokio time, so paused clocks apply).
    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[derive(Debug, Default)]
struct Script {
    queued: HashMap<String, VecDeque<ScriptedResponse>>,
    sticky: HashMap<String, ScriptedResponse>,
    requests: Vec<String>,
    /// Binary replies keyed by path and JSON request body.
    blobs: HashMap<(String, String), Result<Vec<u8>, String>>,
    posts: Vec<(String, Value)>,
}

/// In-memory [`TableSource`] with per-path scripted replies.
///
/// Queued replies are consumed in order; once a path's queue is empty the
/// sticky reply for that path is served. Paths with neither answer like a
/// server 404. Failures surface as `ApiClientError::InvalidResponse`.
#[derive(Debug, Clone, Default)]
pub struct MockTableSource {
    script: Arc<Mutex<Script>>,
}

impl MockTableSource {
    pub fn new() -> Self {
        Self::default()
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Serve `body` for every request to `path`.
    pub fn respond(&self, path: &str, body: Value) -> &Self {
        self.script()
            .sticky
            .insert(path.to_string(), ScriptedResponse::ok(body));
        self
    }

    /// Serve `rows` as a JSON array for every request to `path`.
    pub fn respond_rows<T: Serialize>(&self, path: &str, rows: &[T]) -> &Self {
        self.respond(path, fixtures::rows_json(rows))
    }

    /// Fail every request to `path` with `message`.
    pub fn fail(&self, path: &str, message: impl Into<String>) -> &Self {
        self.script()
            .sticky
            .insert(path.to_string(), ScriptedResponse::fail(message));
        self
    }

    /// Queue a one-shot reply for the next unanswered request to `path`.
    pub fn enqueue(&self, path: &str, response: ScriptedResponse) -> &Self {
        self.script()
            .queued
            .entry(path.to_string())
            .or_default()
            .push_back(response);
        self
    }

    /// Answer a POST of `body` to `path` with raw `bytes`.
    pub fn respond_blob(&self, path: &str, body: Value, bytes: impl Into<Vec<u8>>) -> &Self {
        self.script()
            .blobs
            .insert((path.to_string(), body.to_string()), Ok(bytes.into()));
        self
    }

    pub fn fail_blob(&self, path: &str, body: Value, message: impl Into<String>) -> &Self {
        self.script()
            .blobs
            .insert((path.to_string(), body.to_string()), Err(message.into()));
        self
    }

    /// Every POST so far with its body, in request order.
    pub fn posts(&self) -> Vec<(String, Value)> {
        self.script().posts.clone()
    }

    /// Every path requested so far, in request order.
    pub fn requests(&self) -> Vec<String> {
        self.script().requests.clone()
    }

    pub fn request_count(&self, path: &str) -> usize {
        self.script().requests.iter().filter(|p| *p == path).count()
    }

    fn next_response(&self, path: &str) -> Option<ScriptedResponse> {
        let mut script = self.script();
        script.requests.push(path.to_string());
        if let Some(next) = script.queued.get_mut(path).and_then(VecDeque::pop_front) {
            return Some(next);
        }
        script.sticky.get(path).cloned()
    }
}

#[async_trait]
impl TableSource for MockTableSource {
    async fn get_json(&self, path: &str) -> Result<Value, ApiClientError> {
        let Some(response) = self.next_response(path) else {
            return Err(ApiClientError::InvalidResponse(format!(
                "HTTP 404: no route for {}",
                path
            )));
        };
        if !response.delay.is_zero() {
            tokio::time::sleep(response.delay).await;
        }
        response.body.map_err(ApiClientError::InvalidResponse)
    }

    async fn post_bytes(&self, path: &str, body: &Value) -> Result<Vec<u8>, ApiClientError> {
        let mut script = self.script();
        script.posts.push((path.to_string(), body.clone()));
        match script.blobs.get(&(path.to_string(), body.to_string())) {
            Some(reply) => reply.clone().map_err(ApiClientError::InvalidResponse),
            None => Err(ApiClientError::InvalidResponse(format!(
                "HTTP 404: no blob for {} {}",
                path, body
            ))),
        }
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for Hermes rows.

    use super::*;
    use proptest::prelude::*;

    /// Ids a generated preverified set draws from. Orphan foreign keys are
    /// drawn above this range so they never match.
    pub const REPORT_ID_RANGE: std::ops::Range<i64> = 1..100_000;

    // === Scalars ===

    pub fn arb_timestamp() -> impl Strategy<Value = Timestamp> {
        // 2020-01-01 .. 2030-01-01
        (1577836800i64..1893456000i64).prop_map(|secs| {
            chrono::DateTime::from_timestamp(secs, 0).unwrap_or_else(chrono::Utc::now)
        })
    }

    /// Timestamp in the MySQL `DATETIME` text form the API emits.
    pub fn arb_wire_timestamp() -> impl Strategy<Value = String> {
        arb_timestamp().prop_map(|ts| ts.format("%Y-%m-%d %H:%M:%S").to_string())
    }

    pub fn arb_media_id() -> impl Strategy<Value = MediaId> {
        (1i64..1_000_000).prop_map(MediaId::new)
    }

    pub fn arb_user_id() -> impl Strategy<Value = UserId> {
        (1i64..10_000).prop_map(UserId::new)
    }

    // === Enums ===

    pub fn arb_user_role() -> impl Strategy<Value = UserRole> {
        prop_oneof![
            Just(UserRole::Civilian),
            Just(UserRole::Responder),
            Just(UserRole::Admin),
            Just(UserRole::Superadmin),
        ]
    }

    pub fn arb_report_status() -> impl Strategy<Value = ReportStatus> {
        prop_oneof![
            Just(ReportStatus::Pending),
            Just(ReportStatus::Verified),
            Just(ReportStatus::FalseAlarm),
            Just(ReportStatus::Resolved),
        ]
    }

    pub fn arb_severity_level() -> impl Strategy<Value = SeverityLevel> {
        prop_oneof![
            Just(SeverityLevel::Low),
            Just(SeverityLevel::Moderate),
            Just(SeverityLevel::High),
            Just(SeverityLevel::Critical),
        ]
    }

    pub fn arb_spread_potential() -> impl Strategy<Value = SpreadPotential> {
        prop_oneof![
            Just(SpreadPotential::Low),
            Just(SpreadPotential::Moderate),
            Just(SpreadPotential::High),
        ]
    }

    pub fn arb_table_id() -> impl Strategy<Value = TableId> {
        prop::sample::select(TableId::ALL.to_vec())
    }

    /// Tables that have a bulk endpoint.
    pub fn arb_list_table_id() -> impl Strategy<Value = TableId> {
        prop::sample::select(
            TableId::ALL
                .into_iter()
                .filter(|table| !table.is_keyed())
                .collect::<Vec<_>>(),
        )
    }

    // === Rows ===

    pub fn arb_preverified_report(report_id: ReportId) -> impl Strategy<Value = PreverifiedReport> {
        (
            arb_user_id(),
            prop::option::of(arb_media_id()),
            prop::option::of(arb_media_id()),
            -90.0f64..90.0,
            -180.0f64..180.0,
            "[A-Za-z0-9 ]{1,40}",
            arb_wire_timestamp(),
            any::<bool>(),
            arb_report_status(),
        )
            .prop_map(
                move |(user_id, image, video, latitude, longitude, address, timestamp, verified, status)| {
                    PreverifiedReport {
                        report_id,
                        user_id,
                        image,
                        video,
                        latitude,
                        longitude,
                        address,
                        timestamp,
                        verified,
                        status,
                    }
                },
            )
    }

    pub fn arb_postverified_report(
        verification_id: VerificationId,
        report_id: ReportId,
    ) -> impl Strategy<Value = PostverifiedReport> {
        (
            0.0f64..=1.0,
            any::<bool>(),
            arb_wire_timestamp(),
            prop::option::of(arb_severity_level()),
            prop::option::of(arb_spread_potential()),
            prop::option::of("[a-z]{3,12}"),
        )
            .prop_map(
                move |(confidence_score, detected, verification_timestamp, severity_level, spread_potential, fire_type)| {
                    PostverifiedReport {
                        verification_id,
                        report_id,
                        confidence_score,
                        detected,
                        verification_timestamp,
                        severity_level,
                        spread_potential,
                        fire_type,
                    }
                },
            )
    }

    pub fn arb_user_account(user_id: UserId) -> impl Strategy<Value = UserAccount> {
        (
            "[a-z][a-z0-9_]{2,15}",
            arb_user_role(),
            arb_wire_timestamp(),
            "[A-Z][a-z]{1,12}",
            "[A-Z][a-z]{1,12}",
            prop::option::of("[A-Z][a-z]{1,12}"),
            0.0f64..100.0,
        )
            .prop_map(
                move |(username, role, created_at, last_name, first_name, middle_name, reputation_score)| {
                    UserAccount {
                        user_id,
                        email_address: format!("{}@example.com", username),
                        username,
                        role,
                        created_at,
                        last_name,
                        first_name,
                        middle_name,
                        suffix: None,
                        phone_number: "09170000000".to_string(),
                        reputation_score,
                        id_picture_front: None,
                        id_picture_back: None,
                    }
                },
            )
    }

    pub fn arb_media_storage(media_id: MediaId) -> impl Strategy<Value = MediaStorage> {
        (arb_user_id(), prop::sample::select(vec!["image/jpeg", "image/png", "video/mp4"]), "[a-z0-9]{4,16}")
            .prop_map(move |(user_owner, file_type, stem)| MediaStorage {
                media_id,
                user_owner,
                file_type: file_type.to_string(),
                file_name: format!("{}.bin", stem),
                file_data: None,
            })
    }

    // === Row sets ===

    /// Preverified reports with unique ids, in arbitrary order.
    pub fn arb_preverified_reports(max: usize) -> impl Strategy<Value = Vec<PreverifiedReport>> {
        prop::collection::btree_set(REPORT_ID_RANGE, 0..=max)
            .prop_flat_map(|ids| {
                ids.into_iter()
                    .map(|id| arb_preverified_report(ReportId::new(id)))
                    .collect::<Vec<_>>()
            })
            .prop_shuffle()
    }

    pub fn arb_user_accounts(max: usize) -> impl Strategy<Value = Vec<UserAccount>> {
        prop::collection::btree_set(1i64..10_000, 0..=max).prop_flat_map(|ids| {
            ids.into_iter()
                .map(|id| arb_user_account(UserId::new(id)))
                .collect::<Vec<_>>()
        })
    }

    /// A report id that usually names one of `known` and sometimes names
    /// nothing at all.
    fn arb_foreign_report_id(known: Vec<ReportId>) -> BoxedStrategy<ReportId> {
        let orphan = (REPORT_ID_RANGE.end..REPORT_ID_RANGE.end * 2).prop_map(ReportId::new);
        if known.is_empty() {
            orphan.boxed()
        } else {
            prop_oneof![3 => prop::sample::select(known), 1 => orphan].boxed()
        }
    }

    /// Preverified reports plus verifications pointing at them.
    ///
    /// Verification ids are unique. Several verifications may share a report
    /// id, and some reference reports not in the set.
    pub fn arb_report_set(
        max: usize,
    ) -> impl Strategy<Value = (Vec<PreverifiedReport>, Vec<PostverifiedReport>)> {
        arb_preverified_reports(max).prop_flat_map(move |pre| {
            let known: Vec<ReportId> = pre.iter().map(|row| row.report_id).collect();
            let post = prop::collection::btree_set(1i64..100_000, 0..=max).prop_flat_map(
                move |verification_ids| {
                    verification_ids
                        .into_iter()
                        .map(|vid| {
                            arb_foreign_report_id(known.clone()).prop_flat_map(move |report_id| {
                                arb_postverified_report(VerificationId::new(vid), report_id)
                            })
                        })
                        .collect::<Vec<_>>()
                },
            );
            (Just(pre), post.prop_shuffle())
        })
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Fixed rows for scenario tests.

    use super::*;

    /// Serialize rows as the JSON array a list endpoint returns, flags as
    /// `0`/`1` and decimals as strings.
    pub fn rows_json<T: Serialize>(rows: &[T]) -> Value {
        serde_json::to_value(rows).unwrap_or_else(|_| Value::Array(Vec::new()))
    }

    pub fn preverified_report(id: i64) -> PreverifiedReport {
        PreverifiedReport {
            report_id: ReportId::new(id),
            user_id: UserId::new(1),
            image: Some(MediaId::new(id * 100)),
            video: None,
            latitude: 14.5995,
            longitude: 120.9842,
            address: format!("{} Rizal Avenue, Manila", id),
            timestamp: "2025-04-01 09:30:00".to_string(),
            verified: false,
            status: ReportStatus::Pending,
        }
    }

    pub fn postverified_report(verification_id: i64, report_id: i64) -> PostverifiedReport {
        PostverifiedReport {
            verification_id: VerificationId::new(verification_id),
            report_id: ReportId::new(report_id),
            confidence_score: 0.87,
            detected: true,
            verification_timestamp: "2025-04-01 10:15:00".to_string(),
            severity_level: Some(SeverityLevel::High),
            spread_potential: Some(SpreadPotential::Moderate),
            fire_type: Some("structural".to_string()),
        }
    }

    pub fn user_account(id: i64) -> UserAccount {
        UserAccount {
            user_id: UserId::new(id),
            username: format!("user{}", id),
            role: UserRole::Civilian,
            created_at: "2025-01-15 08:00:00".to_string(),
            last_name: "Bautista".to_string(),
            first_name: "Maria".to_string(),
            middle_name: None,
            suffix: None,
            email_address: format!("user{}@example.com", id),
            phone_number: "09171234567".to_string(),
            reputation_score: 3.5,
            id_picture_front: None,
            id_picture_back: None,
        }
    }

    pub fn responder(id: i64) -> UserAccount {
        UserAccount {
            role: UserRole::Responder,
            ..user_account(id)
        }
    }

    pub fn fire_statistic(id: i64) -> FireStatistic {
        FireStatistic {
            statistic_id: StatisticId::new(id),
            last_update: "2025-04-01 12:00:00".to_string(),
            total_fires: 42,
            false_alarms: 5,
            detected_fires: 37,
            average_confidence: 0.81,
        }
    }

    pub fn response_log(id: i64, verification_id: i64) -> ResponseLog {
        ResponseLog {
            response_id: ResponseId::new(id),
            verified_report_id: VerificationId::new(verification_id),
            response_time: "2025-04-01 10:45:00".to_string(),
            status: ResponseStatus::Dispatched,
        }
    }

    pub fn media_storage(id: i64) -> MediaStorage {
        MediaStorage {
            media_id: MediaId::new(id),
            user_owner: UserId::new(1),
            file_type: "image/jpeg".to_string(),
            file_name: format!("report-{}.jpg", id),
            file_data: None,
        }
    }

    pub fn media_details(id: i64) -> MediaDetails {
        MediaDetails {
            media_id: MediaId::new(id),
            user_owner: UserId::new(1),
            file_type: "image/jpeg".to_string(),
            file_name: format!("report-{}.jpg", id),
        }
    }

    /// Source answering every list endpoint with a small consistent data set:
    /// three preverified reports, verifications for reports 1 and 2, and two
    /// users.
    pub fn seeded_source() -> MockTableSource {
        let source = MockTableSource::new();
        source
            .respond_rows(
                TableId::PreverifiedReports.endpoint(),
                &[preverified_report(1), preverified_report(2), preverified_report(3)],
            )
            .respond_rows(
                TableId::PostverifiedReports.endpoint(),
                &[postverified_report(10, 1), postverified_report(20, 2)],
            )
            .respond_rows(TableId::UserAccounts.endpoint(), &[user_account(1), responder(2)])
            .respond_rows(TableId::FireStatistics.endpoint(), &[fire_statistic(1)])
            .respond_rows(TableId::ResponseLogs.endpoint(), &[response_log(1, 10)])
            .respond_rows(TableId::MediaDetails.endpoint(), &[media_details(100)]);
        source
    }
}

// ============================================================================
// ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Invariant checks over published snapshots.

    use super::*;

    /// No table is both loading and failed.
    pub fn assert_flags_exclusive(state: &CacheState) {
        for table in TableId::ALL {
            let status = state.status(table);
            assert!(
                !(status.loading && status.error.is_some()),
                "{} is loading and failed at once: {:?}",
                table,
                status
            );
        }
    }

    /// The combined view matches a fresh left join of the cached tables.
    pub fn assert_combined_consistent(state: &CacheState) {
        assert_eq!(
            state.combined_reports.len(),
            state.preverified_reports.len(),
            "combined view must have one entry per preverified report"
        );
        for (combined, pre) in state.combined_reports.iter().zip(state.preverified_reports.iter()) {
            assert_eq!(combined.report_id(), pre.report_id);
            let expected = state
                .postverified_reports
                .iter()
                .find(|post| post.report_id == pre.report_id)
                .map(|post| post.verification_id);
            assert_eq!(
                combined.postverified.as_ref().map(|post| post.verification_id),
                expected,
                "report {} paired with the wrong verification",
                pre.report_id
            );
        }
    }

    pub fn assert_table_failed(state: &CacheState, table: TableId) {
        let status = state.status(table);
        assert!(!status.loading, "{} still loading", table);
        assert!(status.error.is_some(), "{} has no error recorded", table);
    }

    pub fn assert_table_loaded(state: &CacheState, table: TableId) {
        let status = state.status(table);
        assert!(!status.loading, "{} still loading", table);
        assert!(status.error.is_none(), "{} failed: {:?}", table, status.error);
        assert!(status.is_loaded(), "{} never loaded", table);
    }
}

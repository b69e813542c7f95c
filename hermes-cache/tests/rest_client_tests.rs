use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use hermes_cache::{
    ApiClientError, CacheConfig, CacheContext, FetchOutcome, RestClient, TableSource,
};
use hermes_core::{MediaId, ReportId, TableId};
use serde_json::{json, Value};
use std::time::Duration;

/// Serve `app` on an ephemeral port. `None` when the sandbox forbids binding
/// to localhost; callers skip.
async fn serve(app: Router) -> Option<String> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.ok()?;
    let addr = listener.local_addr().ok()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Some(format!("http://{}", addr))
}

const PNG_SIGNATURE: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

async fn media_blob(Json(body): Json<Value>) -> Response {
    if body["MS_media_id"] == json!(11) {
        ([(header::CONTENT_TYPE, "image/png")], PNG_SIGNATURE.to_vec()).into_response()
    } else {
        (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Media not found" })),
        )
            .into_response()
    }
}

fn hermes_api() -> Router {
    Router::new()
        .route(
            "/reports/preverified/all",
            get(|| async {
                Json(json!([{
                    "PR_report_id": 1,
                    "PR_user_id": 4,
                    "PR_image": 11,
                    "PR_video": null,
                    "PR_latitude": "14.6760",
                    "PR_longitude": "121.0437",
                    "PR_address": "Diliman, Quezon City",
                    "PR_timestamp": "2025-04-01 09:30:00",
                    "PR_verified": 1,
                    "PR_report_status": "verified"
                }]))
            }),
        )
        .route(
            "/reports/postverified/all",
            get(|| async {
                Json(json!([{
                    "VR_verification_id": 9,
                    "VR_report_id": 1,
                    "VR_confidence_score": "0.93",
                    "VR_detected": 1,
                    "VR_verification_timestamp": "2025-04-01 10:00:00",
                    "VR_severity_level": "high",
                    "VR_spread_potential": "moderate",
                    "VR_fire_type": "grass"
                }]))
            }),
        )
        .route(
            "/user/get/all",
            get(|| async {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "database offline" })),
                )
            }),
        )
        .route(
            "/fire-statistics",
            get(|| async { (StatusCode::OK, "not json at all") }),
        )
        .route(
            "/response-logs",
            get(|| async {
                tokio::time::sleep(Duration::from_millis(500)).await;
                Json(json!([]))
            }),
        )
        .route(
            "/media/:id",
            get(|| async {
                Json(json!({
                    "MS_media_id": 11,
                    "MS_user_owner": 4,
                    "MS_file_type": "image/png",
                    "MS_file_name": "diliman.png"
                }))
            }),
        )
        .route("/media/blob/get/one", post(media_blob))
}

fn config_for(base_url: &str, timeout_ms: u64) -> CacheConfig {
    let mut config = CacheConfig::new(format!("{}/", base_url));
    config.request_timeout_ms = timeout_ms;
    config
}

#[tokio::test]
async fn server_error_body_becomes_the_message() {
    let Some(base) = serve(hermes_api()).await else {
        return;
    };
    let client = RestClient::new(&config_for(&base, 2_000)).unwrap();

    let err = client.get_json("/user/get/all").await.unwrap_err();
    match err {
        ApiClientError::InvalidResponse(message) => {
            assert_eq!(message, "HTTP 500: database offline");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn unrouted_path_reports_status() {
    let Some(base) = serve(hermes_api()).await else {
        return;
    };
    let client = RestClient::new(&config_for(&base, 2_000)).unwrap();

    let err = client.get_json("/no/such/table").await.unwrap_err();
    assert!(err.to_string().contains("HTTP 404"));
}

#[tokio::test]
async fn malformed_body_is_a_serialization_error() {
    let Some(base) = serve(hermes_api()).await else {
        return;
    };
    let client = RestClient::new(&config_for(&base, 2_000)).unwrap();

    let err = client.get_json("/fire-statistics").await.unwrap_err();
    assert!(matches!(err, ApiClientError::Serde(_)));
}

#[tokio::test]
async fn slow_server_times_out() {
    let Some(base) = serve(hermes_api()).await else {
        return;
    };
    let client = RestClient::new(&config_for(&base, 50)).unwrap();

    let err = client.get_json("/response-logs").await.unwrap_err();
    assert!(matches!(err, ApiClientError::Timeout(timeout) if timeout == Duration::from_millis(50)));
}

#[tokio::test]
async fn context_over_http_end_to_end() {
    let Some(base) = serve(hermes_api()).await else {
        return;
    };
    let ctx = CacheContext::from_config(&config_for(&base, 2_000)).unwrap();

    let report = ctx.refresh_all().await;
    assert_eq!(report.failed().count(), 1);

    let snapshot = ctx.snapshot();
    assert_eq!(
        snapshot.error(TableId::UserAccounts),
        Some("Unexpected response: HTTP 500: database offline")
    );
    let pre = ctx.preverified_report(ReportId::new(1)).unwrap();
    assert!(pre.verified);
    assert!((pre.latitude - 14.676).abs() < 1e-9);
    assert_eq!(pre.media_ids().collect::<Vec<_>>(), vec![MediaId::new(11)]);

    let combined = ctx.combined_reports();
    assert_eq!(combined.len(), 1);
    let verification = combined[0].postverified.as_ref().unwrap();
    assert!(verification.detected);
    assert_eq!(verification.confidence_score, 0.93);

    assert_eq!(
        ctx.fetch_media_by_id(MediaId::new(11)).await,
        FetchOutcome::Loaded { rows: 1 }
    );
    assert_eq!(
        ctx.media(MediaId::new(11)).map(|m| m.file_name),
        Some("diliman.png".to_string())
    );
}

#[tokio::test]
async fn media_blob_is_posted_and_returned_raw() {
    let Some(base) = serve(hermes_api()).await else {
        return;
    };
    let config = config_for(&base, 2_000);
    let client = RestClient::new(&config).unwrap();

    let bytes = client
        .post_bytes("/media/blob/get/one", &json!({ "MS_media_id": 11 }))
        .await
        .unwrap();
    assert_eq!(bytes, PNG_SIGNATURE);

    let err = client
        .post_bytes("/media/blob/get/one", &json!({ "MS_media_id": 12 }))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Unexpected response: HTTP 404: Media not found");

    let ctx = CacheContext::from_config(&config).unwrap();
    assert_eq!(
        ctx.fetch_media_blob(MediaId::new(11)).await.as_deref(),
        Some(PNG_SIGNATURE)
    );
    assert_eq!(ctx.fetch_media_blob(MediaId::new(12)).await, None);
    assert!(ctx.snapshot().media_storage.is_empty());
}

#[tokio::test]
async fn unreachable_server_records_transport_error() {
    let Ok(listener) = std::net::TcpListener::bind("127.0.0.1:0") else {
        return;
    };
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let ctx = CacheContext::from_config(&config_for(&format!("http://{}", addr), 1_000)).unwrap();
    let outcome = ctx.fetch_user_accounts().await;

    assert!(matches!(outcome, FetchOutcome::Failed { .. }));
    let snapshot = ctx.snapshot();
    assert!(!snapshot.is_loading(TableId::UserAccounts));
    assert!(snapshot.error(TableId::UserAccounts).is_some());
}

#[test]
fn rest_client_is_a_table_source() {
    fn assert_source<T: TableSource + Clone + 'static>() {}
    assert_source::<RestClient>();
}

//! HTTP-level tests for destiny-server.
//!
//! Requests go through the full router with `tower::ServiceExt::oneshot`;
//! images are stored on disk under a temp dir, usage is kept in memory.
#![allow(clippy::tests_outside_test_module)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use destiny_core::{Clock, FixedClock};
use destiny_images::{BlobStore, FsBlobStore, ImageFormat, ImageStore};
use destiny_server::{
    AppState, DestinyNarrator, GeneratedImage, MockImageGenerator, MockNarrator, Narrative,
    PartnerImageGenerator, Portrait, ProviderError, Vibe, router,
};
use destiny_usage::{LimiterConfig, MemoryUsageStore, UsageLimiter, UsageStore};
use http_body_util::BodyExt;
use parking_lot::Mutex;
use serde_json::{Value, json};
use tempfile::TempDir;
use time::macros::date;
use tower::ServiceExt;

const PNG: &[u8] = &[
    0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n', 0, 0, 0, 13, b'I', b'H', b'D', b'R',
];
const PNG_DATA_URI: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAQAAAC1HAwCAAAAC0lEQVR42mNkYAAAAAYAAjCB0C8AAAAASUVORK5CYII=";
const BOUNDARY: &str = "destiny-test-boundary";

// ============================================================================
// Test Helpers
// ============================================================================

struct Harness {
    _dir: TempDir,
    clock: Arc<FixedClock>,
    state: AppState,
}

impl Harness {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let clock = Arc::new(FixedClock::new(date!(2024 - 06 - 01)));
        let shared: Arc<dyn Clock> = clock.clone();

        let usage: Arc<dyn UsageStore> = Arc::new(MemoryUsageStore::new());
        let limiter =
            UsageLimiter::new(usage, LimiterConfig::with_limit(3)).with_clock(shared.clone());
        let blobs: Arc<dyn BlobStore> = Arc::new(FsBlobStore::new(dir.path().join("images")));
        let images = ImageStore::new(blobs).with_clock(shared.clone());

        Self {
            _dir: dir,
            clock,
            state: AppState::new(limiter, images, shared),
        }
    }

    fn app(&self) -> Router {
        router(self.state.clone())
    }
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, headers, body.to_vec())
}

async fn send_json(app: Router, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Value) {
    let (status, headers, body) = send(app, request).await;
    let value = serde_json::from_slice(&body).unwrap();
    (status, headers, value)
}

fn multipart(field: &str, content_type: &str, data: &[u8]) -> Request<Body> {
    let mut body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"me.png\"\r\nContent-Type: {content_type}\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::post("/api/upload-image")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

fn analyze(user: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::post("/api/analyze").header(header::CONTENT_TYPE, "application/json");
    if let Some(user) = user {
        builder = builder.header("x-user-id", user);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn upload(app: Router) -> String {
    let (status, _, body) = send_json(app, multipart("image", "image/png", PNG)).await;
    assert_eq!(status, StatusCode::OK);
    body["data"]["imageUrl"].as_str().unwrap().to_string()
}

/// Image generator that counts calls and delegates to the mock.
#[derive(Default)]
struct CountingGenerator {
    calls: AtomicUsize,
}

#[async_trait]
impl PartnerImageGenerator for CountingGenerator {
    fn name(&self) -> &'static str {
        "counting"
    }

    async fn generate(&self, portrait: &Portrait, vibe: Vibe) -> Result<GeneratedImage, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        MockImageGenerator::new().generate(portrait, vibe).await
    }
}

/// Image generator that records the portraits it was given.
#[derive(Default)]
struct RecordingGenerator {
    seen: Mutex<Vec<(ImageFormat, usize)>>,
}

#[async_trait]
impl PartnerImageGenerator for RecordingGenerator {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn generate(&self, portrait: &Portrait, vibe: Vibe) -> Result<GeneratedImage, ProviderError> {
        self.seen.lock().push((portrait.format, portrait.data.len()));
        MockImageGenerator::new().generate(portrait, vibe).await
    }
}

/// Serve test portraits on an ephemeral local port.
async fn spawn_image_host() -> String {
    let app = Router::new()
        .route(
            "/me",
            get(|headers: HeaderMap| async move {
                let agent = headers
                    .get(header::USER_AGENT)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default();
                if !agent.starts_with("Mozilla/5.0") {
                    return StatusCode::FORBIDDEN.into_response();
                }
                ([(header::CONTENT_TYPE, "IMAGE/WEBP; charset=binary")], PNG).into_response()
            }),
        )
        .route("/untyped", get(|| async { Response::new(Body::from(PNG)) }))
        .route(
            "/empty",
            get(|| async { ([(header::CONTENT_TYPE, "image/png")], "") }),
        );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

struct BrokenGenerator;

#[async_trait]
impl PartnerImageGenerator for BrokenGenerator {
    fn name(&self) -> &'static str {
        "broken"
    }

    async fn generate(&self, _: &Portrait, _: Vibe) -> Result<GeneratedImage, ProviderError> {
        Err(ProviderError::failed("broken", "upstream 503"))
    }
}

struct FixedNarrator;

#[async_trait]
impl DestinyNarrator for FixedNarrator {
    fn name(&self) -> &'static str {
        "fixed"
    }

    async fn narrate(&self, _: Vibe, _: u8) -> Result<Narrative, ProviderError> {
        Ok(Narrative {
            interpretation: "custom".into(),
            emotional_resonance: "r".into(),
            communication_style: "c".into(),
            core_values: "v".into(),
            partner_type: "t".into(),
        })
    }
}

// ============================================================================
// Health, Fallback
// ============================================================================

#[tokio::test]
async fn health_reports_mock_mode() {
    let h = Harness::new();
    let (status, _, body) =
        send_json(h.app(), Request::get("/api/health").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["env"]["mockMode"], true);
    assert!(body.get("mockMode").is_none());
    assert_eq!(body["version"], destiny_core::VERSION);
    assert!(body["timestamp"].as_str().unwrap().starts_with("2024-06-01T"));
}

#[tokio::test]
async fn health_reports_custom_providers() {
    let h = Harness::new();
    let state = h
        .state
        .clone()
        .with_providers(Arc::new(MockImageGenerator::new()), Arc::new(MockNarrator::new()));
    let (status, _, body) = send_json(
        router(state),
        Request::get("/api/health").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["env"]["mockMode"], false);
}

#[test]
fn file_config_serves_with_mock_providers() {
    let dir = TempDir::new().unwrap();
    let mut config = destiny_config::Config::default();
    config.usage.dir = dir.path().join("usage").display().to_string();
    config.images.root = dir.path().join("images").display().to_string();
    let state = AppState::from_config(&config).unwrap();
    assert!(state.mock_mode);
}

#[tokio::test]
async fn unknown_route_uses_envelope() {
    let h = Harness::new();
    let (status, _, body) =
        send_json(h.app(), Request::get("/api/nope").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
    assert_eq!(body["error"]["message"], "Route GET /api/nope not found");
}

// ============================================================================
// Upload and Image Serving
// ============================================================================

#[tokio::test]
async fn uploaded_image_is_served() {
    let h = Harness::new();
    let url = upload(h.app()).await;
    assert!(url.starts_with("/images/2024-06-01/"));
    assert!(url.ends_with(".png"));

    let (status, headers, body) =
        send(h.app(), Request::get(url.as_str()).body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "image/png");
    assert_eq!(body, PNG);
}

#[tokio::test]
async fn upload_rejects_non_image() {
    let h = Harness::new();
    let (status, _, body) = send_json(h.app(), multipart("image", "text/plain", b"hello")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_REQUEST");
}

#[tokio::test]
async fn upload_requires_image_field() {
    let h = Harness::new();
    let (status, _, body) = send_json(h.app(), multipart("avatar", "image/png", PNG)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_REQUEST");
}

#[tokio::test]
async fn upload_over_body_limit_is_rejected() {
    let h = Harness::new();
    let app = router(h.state.clone().with_max_body_bytes(256));
    let (status, _, body) = send_json(app, multipart("image", "image/png", &[0u8; 4096])).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["error"]["code"], "PAYLOAD_TOO_LARGE");
}

#[tokio::test]
async fn missing_and_traversal_images_are_not_found() {
    let h = Harness::new();
    for path in [
        "/images/2024-06-01/missing.png",
        "/images/%2E%2E/secret.png",
        "/images/2024-06-01/..%5Csecret.png",
        "/images/not-a-day/x.png",
    ] {
        let (status, _, body) =
            send_json(h.app(), Request::get(path).body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{path}");
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }
}

// ============================================================================
// Usage
// ============================================================================

#[tokio::test]
async fn usage_reports_remaining_and_reset() {
    let h = Harness::new();
    let request = || {
        Request::get("/api/usage")
            .header("x-user-id", "alice")
            .body(Body::empty())
            .unwrap()
    };

    let (status, _, body) = send_json(h.app(), request()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["remaining"], 3);
    assert_eq!(body["data"]["limit"], 3);
    assert_eq!(body["data"]["resetDate"], "2024-06-02");

    h.state.limiter.check_and_consume("alice").await.unwrap();
    let (_, _, body) = send_json(h.app(), request()).await;
    assert_eq!(body["data"]["remaining"], 2);
}

#[tokio::test]
async fn usage_requires_user() {
    let h = Harness::new();
    let (status, _, body) =
        send_json(h.app(), Request::get("/api/usage").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "MISSING_USER_ID");
}

// ============================================================================
// Analyze
// ============================================================================

#[tokio::test]
async fn analyze_returns_result_and_headers() {
    let h = Harness::new();
    let url = upload(h.app()).await;

    let (status, headers, body) = send_json(
        h.app(),
        analyze(Some("alice"), json!({"userImageUrl": url, "vibe": "gentle"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(headers["x-ratelimit-remaining"], "2");
    assert_eq!(headers["x-ratelimit-limit"], "3");

    let data = &body["data"];
    let score = data["score"].as_u64().unwrap();
    assert!((60..=99).contains(&score));
    assert!(!data["interpretation"].as_str().unwrap().is_empty());
    assert!(data["partnerType"].as_str().unwrap().contains(" · "));

    let partner = data["partnerImageUrl"].as_str().unwrap();
    let (status, headers, _) =
        send(h.app(), Request::get(partner).body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "image/png");
}

#[tokio::test]
async fn fourth_analysis_is_denied_without_provider_calls() {
    let h = Harness::new();
    let counter = Arc::new(CountingGenerator::default());
    let state = h
        .state
        .clone()
        .with_providers(counter.clone(), Arc::new(MockNarrator::new()));
    let app = router(state);
    let body = json!({"userImageUrl": PNG_DATA_URI, "vibe": "sunny"});

    for expected in ["2", "1", "0"] {
        let (status, headers, _) = send(app.clone(), analyze(Some("bob"), body.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers["x-ratelimit-remaining"], expected);
    }

    let (status, headers, json) = send_json(app.clone(), analyze(Some("bob"), body.clone())).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(json["error"]["code"], "RATE_LIMIT_EXCEEDED");
    assert_eq!(headers["x-ratelimit-remaining"], "0");
    assert_eq!(headers["x-ratelimit-limit"], "3");
    assert_eq!(counter.calls.load(Ordering::SeqCst), 3);

    // Another user is unaffected, and the quota resets the next day.
    let (status, _, _) = send(app.clone(), analyze(Some("carol"), body.clone())).await;
    assert_eq!(status, StatusCode::OK);
    h.clock.advance_days(1);
    let (status, _, _) = send(app, analyze(Some("bob"), body)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn analyze_requires_user_id() {
    let h = Harness::new();
    let (status, _, body) = send_json(
        h.app(),
        analyze(None, json!({"userImageUrl": PNG_DATA_URI, "vibe": "gentle"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "MISSING_USER_ID");
}

#[tokio::test]
async fn analyze_accepts_user_id_in_body() {
    let h = Harness::new();
    let (status, _, _) = send(
        h.app(),
        analyze(
            None,
            json!({"userImageUrl": PNG_DATA_URI, "vibe": "mysterious", "userId": "dave"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(h.state.limiter.peek_remaining("dave").await.unwrap(), 2);
}

#[tokio::test]
async fn invalid_input_is_rejected_after_quota_check() {
    let h = Harness::new();
    let cases = [
        json!({"userImageUrl": PNG_DATA_URI, "vibe": "bold"}),
        json!({"userImageUrl": PNG_DATA_URI}),
        json!({"vibe": "gentle"}),
        json!({"userImageUrl": "ftp://example.com/me.png", "vibe": "gentle"}),
        json!({"userImageUrl": "/images/2024-06-01/missing.png", "vibe": "gentle"}),
    ];
    for body in cases.iter().take(3) {
        let (status, _, json) = send_json(h.app(), analyze(Some("erin"), body.clone())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
        assert_eq!(json["error"]["code"], "INVALID_REQUEST");
    }
    assert_eq!(h.state.limiter.peek_remaining("erin").await.unwrap(), 0);

    for body in &cases[3..] {
        let (status, _, json) = send_json(h.app(), analyze(Some("frank"), body.clone())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
        assert_eq!(json["error"]["code"], "INVALID_REQUEST");
    }
}

#[tokio::test]
async fn remote_portrait_is_fetched() {
    let host = spawn_image_host().await;
    let h = Harness::new();
    let recorder = Arc::new(RecordingGenerator::default());
    let state = h
        .state
        .clone()
        .with_providers(recorder.clone(), Arc::new(MockNarrator::new()));

    for (path, user) in [("/me", "remy"), ("/untyped", "rosa")] {
        let (status, headers, body) = send_json(
            router(state.clone()),
            analyze(Some(user), json!({"userImageUrl": format!("{host}{path}"), "vibe": "bold"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{path}: {body}");
        assert_eq!(headers["x-ratelimit-remaining"], "2");
    }

    // The response content type decides the format; a missing one means JPEG.
    assert_eq!(
        *recorder.seen.lock(),
        vec![(ImageFormat::Webp, PNG.len()), (ImageFormat::Jpeg, PNG.len())]
    );
}

#[tokio::test]
async fn remote_portrait_failure_is_analysis_error() {
    let host = spawn_image_host().await;
    let h = Harness::new();
    let recorder = Arc::new(RecordingGenerator::default());
    let state = h
        .state
        .clone()
        .with_providers(recorder.clone(), Arc::new(MockNarrator::new()));

    for path in ["/missing", "/empty"] {
        let (status, _, body) = send_json(
            router(state.clone()),
            analyze(Some("sam"), json!({"userImageUrl": format!("{host}{path}"), "vibe": "gentle"})),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "{path}");
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "ANALYSIS_ERROR");
    }
    assert!(recorder.seen.lock().is_empty());
}

#[tokio::test]
async fn malformed_json_is_rejected() {
    let h = Harness::new();
    let request = Request::post("/api/analyze")
        .header("x-user-id", "gina")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, _, body) = send_json(h.app(), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_REQUEST");
}

#[tokio::test]
async fn provider_failure_falls_back_to_mock() {
    let h = Harness::new();
    let state = h
        .state
        .clone()
        .with_providers(
            Arc::new(BrokenGenerator),
            Arc::new(MockNarrator::new().with_delay(Duration::from_secs(5))),
        )
        .with_provider_timeout(Duration::from_millis(50));

    let (status, _, body) = send_json(
        router(state),
        analyze(Some("hank"), json!({"userImageUrl": PNG_DATA_URI, "vibe": "intellectual"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert!(
        body["data"]["partnerImageUrl"]
            .as_str()
            .unwrap()
            .starts_with("/images/2024-06-01/")
    );
    assert!(!body["data"]["coreValues"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn custom_narrator_is_used() {
    let h = Harness::new();
    let state = h
        .state
        .clone()
        .with_providers(Arc::new(MockImageGenerator::new()), Arc::new(FixedNarrator));
    let (status, _, body) = send_json(
        router(state),
        analyze(Some("ivy"), json!({"userImageUrl": PNG_DATA_URI, "vibe": "gentle"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["interpretation"], "custom");
    assert_eq!(body["data"]["partnerType"], "t");
}

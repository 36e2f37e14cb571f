//! HTTP routes.

use std::time::{Duration, Instant};

use axum::body::Bytes;
use axum::extract::multipart::MultipartError;
use axum::extract::rejection::BytesRejection;
use axum::extract::{DefaultBodyLimit, MatchedPath, Multipart, Path, Request, State};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode, Uri, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use destiny_core::{VERSION, format_day};
use destiny_images::{ImageFormat, StoredImage, decode_data_uri};
use destiny_metrics::{
    ERROR_IMAGE_STORE, ERROR_PROVIDER, ERROR_REQUEST, ERROR_TIMEOUT, ERROR_USAGE_STORE,
    record_analysis_duration,
    record_analysis_request, record_error, record_http_request, record_image_saved,
    record_provider_fallback, record_quota_denied, record_score,
};
use destiny_score::{MatchLabel, label_for};
use destiny_usage::sanitize_user_id;
use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::fetch::{fetch_image, parse_remote_url};
use crate::provider::{GeneratedImage, Narrative, Portrait, ProviderError, Vibe};
use crate::response::{
    ANALYSIS_ERROR, ApiError, ApiResponse, INTERNAL_ERROR, PAYLOAD_TOO_LARGE, RATE_LIMIT_EXCEEDED,
    UPLOAD_ERROR, USAGE_ERROR,
};
use crate::state::AppState;

/// Header carrying the caller's user id.
pub const USER_ID_HEADER: &str = "x-user-id";
/// Requests left today, set on analysis responses.
pub const RATE_LIMIT_REMAINING_HEADER: &str = "x-ratelimit-remaining";
/// Configured daily limit, set on analysis responses.
pub const RATE_LIMIT_LIMIT_HEADER: &str = "x-ratelimit-limit";

/// Build the full application router.
pub fn router(state: AppState) -> Router {
    let images_route = format!("{}/{{date}}/{{file}}", state.images.url_prefix());
    let cors = cors_layer(&state.client_origins);
    let body_limit = state.max_body_bytes;

    let api = Router::new()
        .route("/health", get(health))
        .route("/upload-image", post(upload_image))
        .route("/usage", get(usage))
        .route("/analyze", post(analyze));

    Router::new()
        .nest("/api", api)
        .route(&images_route, get(serve_image))
        .fallback(not_found)
        .with_state(state)
        .layer(middleware::from_fn(track_request))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(DefaultBodyLimit::max(body_limit))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::HeaderName::from_static(USER_ID_HEADER),
        ])
        .expose_headers([
            header::HeaderName::from_static(RATE_LIMIT_REMAINING_HEADER),
            header::HeaderName::from_static(RATE_LIMIT_LIMIT_HEADER),
        ]);

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(origin = %o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if parsed.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer
            .allow_origin(AllowOrigin::list(parsed))
            .allow_credentials(true)
    }
}

/// Record per-route request metrics.
async fn track_request(request: Request, next: Next) -> Response {
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| "unmatched".to_owned());
    let start = Instant::now();
    let response = next.run(request).await;
    record_http_request(&route, response.status().as_u16(), start.elapsed().as_secs_f64());
    response
}

// ============================================================================
// Health
// ============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Health {
    status: &'static str,
    timestamp: String,
    version: &'static str,
    env: HealthEnv,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthEnv {
    mock_mode: bool,
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let timestamp = state.clock.now().format(&Rfc3339).unwrap_or_default();
    Json(Health {
        status: "ok",
        timestamp,
        version: VERSION,
        env: HealthEnv {
            mock_mode: state.mock_mode,
        },
    })
}

// ============================================================================
// Upload
// ============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Uploaded {
    image_url: String,
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::new(StatusCode::PAYLOAD_TOO_LARGE, PAYLOAD_TOO_LARGE, "Image is too large")
    } else {
        ApiError::bad_request(format!("Malformed upload: {}", err.body_text()))
    }
}

async fn upload_image(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<ApiResponse<Uploaded>, ApiError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("image") {
            continue;
        }

        let content_type = field.content_type().map(str::to_owned).unwrap_or_default();
        if !content_type.to_ascii_lowercase().starts_with("image/") {
            return Err(ApiError::bad_request("Only image files are allowed"));
        }
        let data = field.bytes().await.map_err(multipart_error)?;
        if data.is_empty() {
            return Err(ApiError::bad_request("Missing or invalid image file"));
        }

        let size = data.len();
        let image = state
            .images
            .save(data, Some(content_type.as_str()))
            .await
            .map_err(|e| {
                record_error(ERROR_IMAGE_STORE);
                warn!(error = %e, "failed to save upload");
                ApiError::internal(UPLOAD_ERROR, "Failed to save image")
            })?;
        record_image_saved(image.format.extension(), "upload", size as u64);

        return Ok(ApiResponse::ok(Uploaded {
            image_url: state.images.url_for(&image),
        }));
    }

    Err(ApiError::bad_request("Missing or invalid image file"))
}

// ============================================================================
// Usage
// ============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UsageInfo {
    remaining: u32,
    limit: u32,
    reset_date: String,
}

fn header_user_id(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn sanitized(raw: &str) -> Result<String, ApiError> {
    sanitize_user_id(raw).ok_or_else(|| ApiError::bad_request("Invalid user identification"))
}

async fn usage(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<ApiResponse<UsageInfo>, ApiError> {
    let raw = header_user_id(&headers).ok_or_else(ApiError::missing_user_id)?;
    let user_id = sanitized(raw)?;

    let remaining = state.limiter.peek_remaining(&user_id).await.map_err(|e| {
        record_error(ERROR_USAGE_STORE);
        warn!(user_id, error = %e, "usage lookup failed");
        ApiError::internal(USAGE_ERROR, "Failed to read usage")
    })?;

    let today = state.clock.today();
    let reset = today.next_day().unwrap_or(today);
    Ok(ApiResponse::ok(UsageInfo {
        remaining,
        limit: state.limiter.daily_limit(),
        reset_date: format_day(reset),
    }))
}

// ============================================================================
// Analyze
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeRequest {
    user_image_url: Option<serde_json::Value>,
    vibe: Option<serde_json::Value>,
    user_id: Option<serde_json::Value>,
}

/// Analysis payload returned to the client.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub score: u8,
    pub label: MatchLabel,
    #[serde(flatten)]
    pub narrative: Narrative,
    pub partner_image_url: String,
}

fn json_str(value: &Option<serde_json::Value>) -> Option<&str> {
    value
        .as_ref()
        .and_then(serde_json::Value::as_str)
        .filter(|s| !s.is_empty())
}

async fn analyze(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, ApiError> {
    let body = body.map_err(|e| {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::new(StatusCode::PAYLOAD_TOO_LARGE, PAYLOAD_TOO_LARGE, "Request body is too large")
        } else {
            ApiError::bad_request(e.body_text())
        }
    })?;
    let request: AnalyzeRequest = if body.is_empty() {
        AnalyzeRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::bad_request(format!("Malformed JSON body: {e}")))?
    };

    let raw_user = header_user_id(&headers)
        .or_else(|| json_str(&request.user_id))
        .ok_or_else(ApiError::missing_user_id)?;
    let user_id = sanitized(raw_user)?;

    let limit = state.limiter.daily_limit();
    let decision = state.limiter.check_and_consume(&user_id).await.map_err(|e| {
        record_error(ERROR_USAGE_STORE);
        warn!(user_id, error = %e, "usage check failed");
        ApiError::internal(USAGE_ERROR, "Failed to record usage")
    })?;
    if !decision.allowed {
        record_quota_denied();
        return Err(ApiError::new(
            StatusCode::TOO_MANY_REQUESTS,
            RATE_LIMIT_EXCEEDED,
            "Daily limit reached, please try again tomorrow",
        )
        .with_header(RATE_LIMIT_REMAINING_HEADER, 0)
        .with_header(RATE_LIMIT_LIMIT_HEADER, limit));
    }
    record_analysis_request();

    let image_url = json_str(&request.user_image_url)
        .ok_or_else(|| ApiError::bad_request("Missing or invalid userImageUrl field"))?;
    let vibe: Vibe = json_str(&request.vibe)
        .and_then(|v| v.parse().ok())
        .ok_or_else(|| {
            ApiError::bad_request(
                "Missing or invalid vibe field (must be gentle, sunny, intellectual, or mysterious)",
            )
        })?;

    let start = Instant::now();
    let portrait = load_portrait(&state, image_url).await?;

    let score = state.scores.lock().generate();
    let label = label_for(score);
    record_score(label.as_str());
    info!(user_id, %vibe, score, %label, "analysis started");

    let (generated, narrative) = tokio::join!(
        generate_image(&state, &portrait, vibe),
        narrate(&state, vibe, score)
    );
    let generated = generated.map_err(|e| {
        record_error(ERROR_PROVIDER);
        warn!(error = %e, "partner image generation failed");
        ApiError::internal(ANALYSIS_ERROR, "Partner image generation failed")
    })?;
    let narrative = narrative.map_err(|e| {
        record_error(ERROR_PROVIDER);
        warn!(error = %e, "narrative generation failed");
        ApiError::internal(ANALYSIS_ERROR, "Narrative generation failed")
    })?;

    let partner = save_generated(&state, generated).await?;
    let partner_image_url = state.images.url_for(&partner);
    record_analysis_duration(start.elapsed().as_secs_f64());
    info!(user_id, score, partner_image_url, "analysis complete");

    let result = AnalysisResult {
        score,
        label,
        narrative,
        partner_image_url,
    };
    let mut response = ApiResponse::ok(result).into_response();
    let response_headers = response.headers_mut();
    response_headers.insert(RATE_LIMIT_REMAINING_HEADER, HeaderValue::from(decision.remaining));
    response_headers.insert(RATE_LIMIT_LIMIT_HEADER, HeaderValue::from(limit));
    Ok(response)
}

/// Resolve `userImageUrl` to image bytes: a data URI, a stored image path
/// or an http(s) URL.
async fn load_portrait(state: &AppState, image_url: &str) -> Result<Portrait, ApiError> {
    if image_url.starts_with("data:") {
        let (data, format) = decode_data_uri(image_url)
            .map_err(|e| ApiError::bad_request(format!("Invalid userImageUrl: {e}")))?;
        return Ok(Portrait { data, format });
    }

    let prefix = format!("{}/", state.images.url_prefix());
    if !image_url.starts_with(&prefix) {
        let Some(url) = parse_remote_url(image_url) else {
            return Err(ApiError::bad_request(
                "userImageUrl must be an uploaded image path, a data URI or an http(s) URL",
            ));
        };
        return match fetch_image(url, state.provider_timeout, state.max_body_bytes).await {
            Ok(remote) => Ok(Portrait {
                format: remote.format(),
                data: remote.data,
            }),
            Err(e) => {
                record_error(if e.is_timeout() { ERROR_TIMEOUT } else { ERROR_REQUEST });
                warn!(error = %e, "failed to fetch portrait");
                Err(ApiError::internal(
                    ANALYSIS_ERROR,
                    format!("Failed to fetch userImageUrl: {e}"),
                ))
            }
        };
    }
    match state.images.read(image_url).await {
        Ok(Some((data, format))) => Ok(Portrait { data, format }),
        Ok(None) => Err(ApiError::bad_request("userImageUrl does not exist")),
        Err(e) => {
            record_error(ERROR_IMAGE_STORE);
            warn!(error = %e, "failed to read portrait");
            Err(ApiError::internal(ANALYSIS_ERROR, "Failed to read userImageUrl"))
        }
    }
}

async fn with_timeout<T>(
    limit: Duration,
    provider: &'static str,
    call: impl Future<Output = Result<T, ProviderError>>,
) -> Result<T, ProviderError> {
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(ProviderError::Timeout(provider)),
    }
}

async fn generate_image(
    state: &AppState,
    portrait: &Portrait,
    vibe: Vibe,
) -> Result<GeneratedImage, ProviderError> {
    let provider = state.image_generator.name();
    let primary = with_timeout(
        state.provider_timeout,
        provider,
        state.image_generator.generate(portrait, vibe),
    )
    .await;
    match primary {
        Ok(image) => Ok(image),
        Err(e) => {
            warn!(provider, error = %e, "image provider failed, using fallback");
            record_provider_fallback("image", e.reason());
            state.fallback_image_generator.generate(portrait, vibe).await
        }
    }
}

async fn narrate(state: &AppState, vibe: Vibe, score: u8) -> Result<Narrative, ProviderError> {
    let provider = state.narrator.name();
    let primary = with_timeout(
        state.provider_timeout,
        provider,
        state.narrator.narrate(vibe, score),
    )
    .await;
    match primary {
        Ok(narrative) => Ok(narrative),
        Err(e) => {
            warn!(provider, error = %e, "narrative provider failed, using fallback");
            record_provider_fallback("narrative", e.reason());
            state.fallback_narrator.narrate(vibe, score).await
        }
    }
}

async fn save_generated(state: &AppState, image: GeneratedImage) -> Result<StoredImage, ApiError> {
    let (data, content_type) = match image {
        GeneratedImage::DataUri(uri) => {
            let (data, format) = decode_data_uri(&uri).map_err(|e| {
                record_error(ERROR_PROVIDER);
                warn!(error = %e, "provider returned an undecodable image");
                ApiError::internal(ANALYSIS_ERROR, "Partner image could not be decoded")
            })?;
            (data, Some(format.mime().to_string()))
        }
        GeneratedImage::Raw { data, content_type } => (data, content_type),
    };

    let size = data.len() as u64;
    let image = state
        .images
        .save(data, content_type.as_deref())
        .await
        .map_err(|e| {
            record_error(ERROR_IMAGE_STORE);
            warn!(error = %e, "failed to save partner image");
            ApiError::internal(ANALYSIS_ERROR, "Failed to save partner image")
        })?;
    record_image_saved(image.format.extension(), "generated", size);
    Ok(image)
}

// ============================================================================
// Static images and fallback
// ============================================================================

async fn serve_image(
    State(state): State<AppState>,
    Path((date, file)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let url = format!("{}/{date}/{file}", state.images.url_prefix());
    match state.images.read(&url).await {
        Ok(Some((data, format))) => Ok(image_response(data, format)),
        Ok(None) => {
            debug!(url, "image not found");
            Err(ApiError::not_found(format!("Image {url} not found")))
        }
        Err(e) => {
            record_error(ERROR_IMAGE_STORE);
            warn!(url, error = %e, "failed to read image");
            Err(ApiError::internal(INTERNAL_ERROR, "Internal server error"))
        }
    }
}

fn image_response(data: Bytes, format: ImageFormat) -> Response {
    (
        [
            (header::CONTENT_TYPE, format.mime()),
            (header::CACHE_CONTROL, "public, max-age=86400"),
        ],
        data,
    )
        .into_response()
}

async fn not_found(method: Method, uri: Uri) -> ApiError {
    ApiError::not_found(format!("Route {method} {} not found", uri.path()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_str_rejects_non_strings() {
        assert_eq!(json_str(&Some(serde_json::json!("a"))), Some("a"));
        assert_eq!(json_str(&Some(serde_json::json!(""))), None);
        assert_eq!(json_str(&Some(serde_json::json!(42))), None);
        assert_eq!(json_str(&None), None);
    }

    #[test]
    fn header_user_id_trims() {
        let mut headers = HeaderMap::new();
        assert!(header_user_id(&headers).is_none());
        headers.insert(USER_ID_HEADER, HeaderValue::from_static("  "));
        assert!(header_user_id(&headers).is_none());
        headers.insert(USER_ID_HEADER, HeaderValue::from_static(" u-1 "));
        assert_eq!(header_user_id(&headers), Some("u-1"));
    }
}

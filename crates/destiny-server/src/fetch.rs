//! Remote portrait download.
//!
//! `userImageUrl` may point at any http(s) image; it is downloaded once per
//! analysis and handed to the image generator like an uploaded one.

use std::time::Duration;

use bytes::Bytes;
use destiny_images::ImageFormat;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use reqwest::{StatusCode, Url};
use tracing::debug;

/// Some image hosts refuse requests without a browser user agent.
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";
/// Assumed when the response carries no content type.
const DEFAULT_CONTENT_TYPE: &str = "image/jpeg";

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("failed to build HTTP client: {0}")]
    Client(reqwest::Error),
    #[error("request failed: {0}")]
    Request(reqwest::Error),
    #[error("HTTP {0}")]
    Status(StatusCode),
    #[error("failed to read response body: {0}")]
    Body(reqwest::Error),
    #[error("response is empty")]
    Empty,
    #[error("response exceeds {0} bytes")]
    TooLarge(usize),
}

impl FetchError {
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Request(e) | Self::Body(e) => e.is_timeout(),
            _ => false,
        }
    }
}

/// A downloaded image.
#[derive(Debug, Clone)]
pub struct RemoteImage {
    pub data: Bytes,
    /// Lowercased MIME essence, e.g. `image/png`.
    pub content_type: String,
}

impl RemoteImage {
    pub fn format(&self) -> ImageFormat {
        ImageFormat::detect(Some(&self.content_type), &self.data)
    }
}

/// Parse `url` and accept it only when it is absolute http or https.
pub fn parse_remote_url(url: &str) -> Option<Url> {
    let parsed = Url::parse(url).ok()?;
    matches!(parsed.scheme(), "http" | "https").then_some(parsed)
}

/// `IMAGE/PNG; charset=binary` -> `image/png`; missing or blank -> `image/jpeg`.
pub fn normalize_content_type(raw: Option<&str>) -> String {
    let essence = raw
        .and_then(|v| v.split(';').next())
        .map(str::trim)
        .unwrap_or_default();
    if essence.is_empty() {
        DEFAULT_CONTENT_TYPE.to_string()
    } else {
        essence.to_ascii_lowercase()
    }
}

/// Download `url`, giving up after `timeout`.
///
/// Non-2xx responses, empty bodies and bodies over `max_bytes` are errors.
pub async fn fetch_image(
    url: Url,
    timeout: Duration,
    max_bytes: usize,
) -> Result<RemoteImage, FetchError> {
    debug!(%url, "fetching remote portrait");

    let client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(FetchError::Client)?;

    let response = client
        .get(url.clone())
        .header(USER_AGENT, BROWSER_USER_AGENT)
        .send()
        .await
        .map_err(FetchError::Request)?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status(status));
    }
    if response
        .content_length()
        .is_some_and(|len| len > max_bytes as u64)
    {
        return Err(FetchError::TooLarge(max_bytes));
    }

    let content_type = normalize_content_type(
        response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok()),
    );
    let data = response.bytes().await.map_err(FetchError::Body)?;
    if data.is_empty() {
        return Err(FetchError::Empty);
    }
    if data.len() > max_bytes {
        return Err(FetchError::TooLarge(max_bytes));
    }

    debug!(%url, bytes = data.len(), content_type = %content_type, "fetched remote portrait");
    Ok(RemoteImage { data, content_type })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_is_normalized() {
        assert_eq!(
            normalize_content_type(Some("IMAGE/PNG; charset=binary")),
            "image/png"
        );
        assert_eq!(normalize_content_type(Some("  image/webp ")), "image/webp");
        assert_eq!(normalize_content_type(Some("")), "image/jpeg");
        assert_eq!(normalize_content_type(Some("; q=1")), "image/jpeg");
        assert_eq!(normalize_content_type(None), "image/jpeg");
    }

    #[test]
    fn format_follows_content_type() {
        let png: &'static [u8] = b"\x89PNG\r\n\x1a\n";
        let image = RemoteImage {
            data: Bytes::from_static(png),
            content_type: "image/webp".into(),
        };
        assert_eq!(image.format(), ImageFormat::Webp);

        let image = RemoteImage {
            data: Bytes::from_static(png),
            content_type: "application/octet-stream".into(),
        };
        assert_eq!(image.format(), ImageFormat::Png);
    }

    #[test]
    fn only_http_urls_are_remote() {
        assert!(parse_remote_url("https://cdn.example/a.png").is_some());
        assert!(parse_remote_url("HTTP://cdn.example/a.png").is_some());
        assert!(parse_remote_url("ftp://cdn.example/a.png").is_none());
        assert!(parse_remote_url("file:///etc/passwd").is_none());
        assert!(parse_remote_url("/images/2024-01-01/a.png").is_none());
        assert!(parse_remote_url("not a url").is_none());
    }
}

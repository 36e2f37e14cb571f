//! AI collaborator seams.
//!
//! The analysis flow calls two external collaborators: one renders a
//! partner portrait, the other writes the compatibility narrative. Both are
//! traits so deployments can plug in real providers; the built-in mocks in
//! [`crate::mock`] are used when none are configured and as the fallback when
//! a provider fails or times out.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use destiny_images::ImageFormat;
use serde::{Deserialize, Serialize};

/// Partner style picked by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vibe {
    Gentle,
    Sunny,
    Intellectual,
    Mysterious,
}

impl Vibe {
    /// Every vibe, in display order.
    pub const ALL: [Vibe; 4] = [Self::Gentle, Self::Sunny, Self::Intellectual, Self::Mysterious];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gentle => "gentle",
            Self::Sunny => "sunny",
            Self::Intellectual => "intellectual",
            Self::Mysterious => "mysterious",
        }
    }
}

impl fmt::Display for Vibe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown vibe.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown vibe: {0}")]
pub struct ParseVibeError(String);

impl FromStr for Vibe {
    type Err = ParseVibeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| ParseVibeError(s.to_string()))
    }
}

/// The user's portrait, as handed to the image generator.
#[derive(Debug, Clone)]
pub struct Portrait {
    pub data: Bytes,
    pub format: ImageFormat,
}

/// Image produced by a [`PartnerImageGenerator`].
#[derive(Debug, Clone)]
pub enum GeneratedImage {
    /// `data:<mime>;base64,...` payload or bare base64.
    DataUri(String),
    /// Raw bytes with an optional MIME type.
    Raw {
        data: Bytes,
        content_type: Option<String>,
    },
}

/// Compatibility narrative produced by a [`DestinyNarrator`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Narrative {
    pub interpretation: String,
    pub emotional_resonance: String,
    pub communication_style: String,
    pub core_values: String,
    pub partner_type: String,
}

/// Provider failure.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("{provider} failed: {message}")]
    Failed {
        provider: &'static str,
        message: String,
    },
    #[error("{0} timed out")]
    Timeout(&'static str),
}

impl ProviderError {
    /// Create a failure from any error type.
    #[inline]
    pub fn failed<E: fmt::Display>(provider: &'static str, err: E) -> Self {
        Self::Failed {
            provider,
            message: err.to_string(),
        }
    }

    /// Short reason label for metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Failed { .. } => "error",
            Self::Timeout(_) => "timeout",
        }
    }
}

/// Renders a synthetic partner portrait.
#[async_trait]
pub trait PartnerImageGenerator: Send + Sync {
    /// Provider name for logs and metrics.
    fn name(&self) -> &'static str;

    async fn generate(&self, portrait: &Portrait, vibe: Vibe) -> Result<GeneratedImage, ProviderError>;
}

/// Writes the compatibility narrative for a score.
#[async_trait]
pub trait DestinyNarrator: Send + Sync {
    /// Provider name for logs and metrics.
    fn name(&self) -> &'static str;

    async fn narrate(&self, vibe: Vibe, score: u8) -> Result<Narrative, ProviderError>;
}

#[async_trait]
impl<P: PartnerImageGenerator + ?Sized> PartnerImageGenerator for Arc<P> {
    #[inline]
    fn name(&self) -> &'static str {
        (**self).name()
    }

    #[inline]
    async fn generate(&self, portrait: &Portrait, vibe: Vibe) -> Result<GeneratedImage, ProviderError> {
        (**self).generate(portrait, vibe).await
    }
}

#[async_trait]
impl<N: DestinyNarrator + ?Sized> DestinyNarrator for Arc<N> {
    #[inline]
    fn name(&self) -> &'static str {
        (**self).name()
    }

    #[inline]
    async fn narrate(&self, vibe: Vibe, score: u8) -> Result<Narrative, ProviderError> {
        (**self).narrate(vibe, score).await
    }
}

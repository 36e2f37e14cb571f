//! Application state shared across requests.

use std::sync::Arc;
use std::time::Duration;

use destiny_config::Config;
use destiny_core::{Clock, SystemClock};
use destiny_images::{BlobStore, FsBlobStore, ImageStore};
use destiny_score::ScoreGenerator;
use destiny_usage::{
    Enforcement, FileUsageStore, LimiterConfig, ReadFailurePolicy, UsageLimiter, UsageStore,
};
use parking_lot::Mutex;

use crate::error::ServerError;
use crate::mock::{MockImageGenerator, MockNarrator};
use crate::provider::{DestinyNarrator, PartnerImageGenerator};

pub type SharedLimiter = Arc<UsageLimiter<Arc<dyn UsageStore>>>;
pub type SharedImages = Arc<ImageStore<Arc<dyn BlobStore>>>;

/// Shared state for all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub limiter: SharedLimiter,
    pub images: SharedImages,
    pub scores: Arc<Mutex<ScoreGenerator>>,
    pub image_generator: Arc<dyn PartnerImageGenerator>,
    pub narrator: Arc<dyn DestinyNarrator>,
    pub fallback_image_generator: Arc<dyn PartnerImageGenerator>,
    pub fallback_narrator: Arc<dyn DestinyNarrator>,
    pub clock: Arc<dyn Clock>,
    pub provider_timeout: Duration,
    pub retention_days: u32,
    pub max_body_bytes: usize,
    pub client_origins: Vec<String>,
    pub mock_mode: bool,
}

impl AppState {
    /// State over the given stores with mock providers and default limits.
    ///
    /// The limiter and image store should share `clock` so quota days and
    /// image buckets agree.
    pub fn new(
        limiter: UsageLimiter<Arc<dyn UsageStore>>,
        images: ImageStore<Arc<dyn BlobStore>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let defaults = Config::default();
        let mock_image: Arc<dyn PartnerImageGenerator> = Arc::new(MockImageGenerator::new());
        let mock_narrator: Arc<dyn DestinyNarrator> = Arc::new(MockNarrator::new());
        Self {
            limiter: Arc::new(limiter),
            images: Arc::new(images),
            scores: Arc::new(Mutex::new(ScoreGenerator::new())),
            image_generator: mock_image.clone(),
            narrator: mock_narrator.clone(),
            fallback_image_generator: mock_image,
            fallback_narrator: mock_narrator,
            clock,
            provider_timeout: Duration::from_secs(defaults.server.provider_timeout_secs),
            retention_days: defaults.images.retention_days,
            max_body_bytes: defaults.server.max_body_bytes,
            client_origins: Vec::new(),
            mock_mode: true,
        }
    }

    /// Build file-backed state from a validated config.
    pub fn from_config(config: &Config) -> Result<Self, ServerError> {
        let clock: Arc<dyn Clock> = Arc::new(
            SystemClock::from_offset_hours(config.usage.utc_offset_hours)
                .map_err(|e| ServerError::Config(format!("usage.utc_offset_hours: {e}")))?,
        );

        let read_failure: ReadFailurePolicy = config
            .usage
            .read_failure
            .parse()
            .map_err(|e| ServerError::Config(format!("{e}")))?;
        let enforcement: Enforcement = config
            .usage
            .enforcement
            .parse()
            .map_err(|e| ServerError::Config(format!("{e}")))?;
        let limiter_config = LimiterConfig::with_limit(config.usage.daily_limit)
            .read_failure(read_failure)
            .enforcement(enforcement);

        let usage_store: Arc<dyn UsageStore> = Arc::new(FileUsageStore::new(&config.usage.dir));
        let limiter = UsageLimiter::new(usage_store, limiter_config).with_clock(clock.clone());

        let blobs: Arc<dyn BlobStore> = Arc::new(FsBlobStore::new(&config.images.root));
        let images = ImageStore::new(blobs)
            .with_clock(clock.clone())
            .with_url_prefix(config.images.url_prefix.clone());

        let mut state = Self::new(limiter, images, clock);
        state.provider_timeout = Duration::from_secs(config.server.provider_timeout_secs);
        state.retention_days = config.images.retention_days;
        state.max_body_bytes = config.server.max_body_bytes;
        state.client_origins = config.server.client_origins.clone();
        Ok(state)
    }

    /// Replace the AI providers. Mocks stay in place as the fallback.
    pub fn with_providers(
        mut self,
        image_generator: Arc<dyn PartnerImageGenerator>,
        narrator: Arc<dyn DestinyNarrator>,
    ) -> Self {
        self.image_generator = image_generator;
        self.narrator = narrator;
        self.mock_mode = false;
        self
    }

    /// Replace the score generator, e.g. with a seeded one.
    pub fn with_scores(mut self, scores: ScoreGenerator) -> Self {
        self.scores = Arc::new(Mutex::new(scores));
        self
    }

    pub fn with_provider_timeout(mut self, timeout: Duration) -> Self {
        self.provider_timeout = timeout;
        self
    }

    pub fn with_max_body_bytes(mut self, bytes: usize) -> Self {
        self.max_body_bytes = bytes;
        self
    }

    pub fn with_retention_days(mut self, days: u32) -> Self {
        self.retention_days = days;
        self
    }
}

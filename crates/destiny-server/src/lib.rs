//! Destiny server library.
//!
//! Exposes the HTTP service for the binaries, integration tests and
//! embedding with custom AI providers.

mod api;
pub mod cli;
mod error;
pub mod fetch;
mod maintenance;
pub mod mock;
pub mod provider;
mod response;
mod server;
mod state;

pub use api::{
    AnalysisResult, RATE_LIMIT_LIMIT_HEADER, RATE_LIMIT_REMAINING_HEADER, USER_ID_HEADER, router,
};
pub use cli::{CleanupArgs, ServerArgs};
pub use error::ServerError;
pub use maintenance::{MaintenanceReport, run_maintenance, spawn_maintenance};
pub use mock::{MockImageGenerator, MockNarrator, mock_narrative};
pub use provider::{
    DestinyNarrator, GeneratedImage, Narrative, PartnerImageGenerator, Portrait, ProviderError,
    Vibe,
};
pub use response::{ApiError, ApiResponse, ErrorBody};
pub use server::{DEFAULT_SHUTDOWN_TIMEOUT, run_with_shutdown, serve};
pub use state::{AppState, SharedImages, SharedLimiter};
pub use tokio_util::sync::CancellationToken;

pub mod backend;
pub mod client;
pub mod fixture;
pub mod http;

pub use backend::{ApiRequest, Backend};
pub use client::ApiClient;
pub use fixture::FixtureBackend;
pub use http::HttpBackend;

use crate::config::{BackendKind, Settings};
use mybooks_core::ApiError;
use std::sync::Arc;

/// Pick the backend once, from configuration.
pub fn backend_from_settings(settings: &Settings) -> Result<Arc<dyn Backend>, ApiError> {
    let backend: Arc<dyn Backend> = match settings.backend {
        BackendKind::Http => Arc::new(HttpBackend::new(&settings.api)?),
        BackendKind::Fixture => {
            tracing::info!("Using the in-memory fixture backend");
            Arc::new(FixtureBackend::new())
        }
    };
    Ok(backend)
}

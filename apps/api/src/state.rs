use std::sync::Arc;

use sqlx::PgPool;

use crate::analysis::PendingAnalyses;
use crate::provider::Provider;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    /// Active text-generation/embedding backend, chosen once at startup.
    /// Nothing downstream branches on the concrete provider.
    pub provider: Arc<dyn Provider>,
    /// In-flight posting-analysis registry used by the request coalescer.
    pub pending: PendingAnalyses,
}

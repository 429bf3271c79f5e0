pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::ai::handlers as ai_handlers;
use crate::analysis::handlers as analysis_handlers;
use crate::postings::handlers as posting_handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // AI operations
        .route(
            "/api/v1/ai/availability",
            get(ai_handlers::handle_availability),
        )
        .route(
            "/api/v1/ai/cover-letter",
            post(ai_handlers::handle_generate_cover_letter),
        )
        .route(
            "/api/v1/ai/analyze-resume-html",
            post(ai_handlers::handle_analyze_resume_html),
        )
        .route(
            "/api/v1/ai/analyze-resume-text",
            post(ai_handlers::handle_analyze_resume_text),
        )
        // Résumé + cover-letter reads
        .route("/api/v1/resume/latest", get(ai_handlers::handle_latest_resume))
        .route(
            "/api/v1/cover-letters/latest",
            get(ai_handlers::handle_latest_cover_letter),
        )
        .route(
            "/api/v1/cover-letters/:posting_id",
            get(ai_handlers::handle_cover_letters_for_posting),
        )
        // Posting storage
        .route(
            "/api/v1/postings",
            post(posting_handlers::handle_save_posting).get(posting_handlers::handle_list_postings),
        )
        .route("/api/v1/postings/:id", get(posting_handlers::handle_get_posting))
        // Posting analysis (cached + coalesced)
        .route(
            "/api/v1/postings/:id/analyze",
            post(analysis_handlers::handle_analyze_posting),
        )
        .route(
            "/api/v1/postings/:id/analysis",
            get(analysis_handlers::handle_get_analysis),
        )
        .route("/api/v1/analyses", get(analysis_handlers::handle_list_analyses))
        .route(
            "/api/v1/analyses/stats",
            get(analysis_handlers::handle_analysis_stats),
        )
        .with_state(state)
}

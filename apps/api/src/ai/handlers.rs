use axum::{extract::Path, extract::State, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::AppError;
use crate::models::cover_letter::CoverLetterRow;
use crate::models::resume::{ResumeAnalysisResult, ResumeAnalysisRow};
use crate::state::AppState;
use crate::store;

#[derive(Debug, Deserialize)]
pub struct CoverLetterRequest {
    pub resume: Value,
    pub posting: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverLetterResponse {
    pub success: bool,
    pub cover_letter: String,
    pub posting_id: String,
    pub posting_name: Option<String>,
    pub generated_at: DateTime<Utc>,
    pub provider: &'static str,
}

/// POST /api/v1/ai/cover-letter
pub async fn handle_generate_cover_letter(
    State(state): State<AppState>,
    Json(req): Json<CoverLetterRequest>,
) -> Result<Json<CoverLetterResponse>, AppError> {
    if req.resume.is_null() || req.posting.is_null() {
        return Err(AppError::Validation(
            "Both resume and posting data are required".to_string(),
        ));
    }

    let posting_id = req
        .posting
        .get("id")
        .and_then(Value::as_str)
        .unwrap_or("unknown")
        .to_string();

    let letter = crate::ai::generate_cover_letter(
        &state.db,
        state.provider.as_ref(),
        &req.resume,
        &req.posting,
        &posting_id,
    )
    .await?;

    Ok(Json(CoverLetterResponse {
        success: true,
        cover_letter: letter,
        posting_name: req
            .posting
            .get("name")
            .and_then(Value::as_str)
            .map(str::to_string),
        posting_id,
        generated_at: Utc::now(),
        provider: state.provider.kind().as_str(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct ResumeHtmlRequest {
    pub html: String,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResumeTextRequest {
    pub text: String,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeAnalysisResponse {
    pub success: bool,
    pub analysis: ResumeAnalysisResult,
    pub analyzed_at: DateTime<Utc>,
    pub provider: &'static str,
}

/// POST /api/v1/ai/analyze-resume-html
pub async fn handle_analyze_resume_html(
    State(state): State<AppState>,
    Json(req): Json<ResumeHtmlRequest>,
) -> Result<Json<ResumeAnalysisResponse>, AppError> {
    if req.html.trim().is_empty() {
        return Err(AppError::Validation("Resume HTML is required".to_string()));
    }

    let analysis = crate::ai::analyze_resume_html(
        &state.db,
        state.provider.as_ref(),
        &req.html,
        req.url.as_deref(),
    )
    .await?;

    Ok(Json(ResumeAnalysisResponse {
        success: true,
        analysis,
        analyzed_at: Utc::now(),
        provider: state.provider.kind().as_str(),
    }))
}

/// POST /api/v1/ai/analyze-resume-text
pub async fn handle_analyze_resume_text(
    State(state): State<AppState>,
    Json(req): Json<ResumeTextRequest>,
) -> Result<Json<ResumeAnalysisResponse>, AppError> {
    if req.text.trim().is_empty() {
        return Err(AppError::Validation("Resume text is required".to_string()));
    }

    let analysis = crate::ai::analyze_resume_text(
        &state.db,
        state.provider.as_ref(),
        &req.text,
        req.url.as_deref(),
    )
    .await?;

    Ok(Json(ResumeAnalysisResponse {
        success: true,
        analysis,
        analyzed_at: Utc::now(),
        provider: state.provider.kind().as_str(),
    }))
}

/// GET /api/v1/resume/latest
pub async fn handle_latest_resume(
    State(state): State<AppState>,
) -> Result<Json<ResumeAnalysisRow>, AppError> {
    let row = store::resumes::latest_analysis(&state.db)
        .await?
        .ok_or_else(|| {
            AppError::NotFound("No resume analysis stored yet. Analyze a resume first.".to_string())
        })?;
    Ok(Json(row))
}

#[derive(Debug, Serialize)]
pub struct AvailabilityResponse {
    pub available: bool,
    pub provider: &'static str,
}

/// GET /api/v1/ai/availability
pub async fn handle_availability(State(state): State<AppState>) -> Json<AvailabilityResponse> {
    let available = state.provider.check_availability().await;
    Json(AvailabilityResponse {
        available,
        provider: state.provider.kind().as_str(),
    })
}

/// GET /api/v1/cover-letters/latest
pub async fn handle_latest_cover_letter(
    State(state): State<AppState>,
) -> Result<Json<CoverLetterRow>, AppError> {
    let row = store::cover_letters::latest(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("No cover letters generated yet".to_string()))?;
    Ok(Json(row))
}

/// GET /api/v1/cover-letters/:posting_id
pub async fn handle_cover_letters_for_posting(
    State(state): State<AppState>,
    Path(posting_id): Path<String>,
) -> Result<Json<Vec<CoverLetterRow>>, AppError> {
    let rows = store::cover_letters::find_by_posting(&state.db, &posting_id).await?;
    Ok(Json(rows))
}

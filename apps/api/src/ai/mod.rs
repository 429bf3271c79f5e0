//! Generation service: builds prompts, invokes the active provider, cleans
//! and validates model output, persists results and kicks off best-effort
//! embedding writes.
//!
//! Posting analysis is not here: it is wrapped by the cache/coalescer in
//! `crate::analysis`.

use chrono::Utc;
use serde_json::Value;
use sqlx::PgPool;
use tracing::{error, info, warn};

use crate::embeddings::{self, EmbeddingOwner};
use crate::errors::AppError;
use crate::models::resume::ResumeAnalysisResult;
use crate::provider::{Provider, TaskType};
use crate::store;

pub mod handlers;
pub mod prompts;

/// Generates a cover letter from résumé and posting data.
///
/// The most recent posting analysis is pulled in best-effort to sharpen the
/// letter; its absence (or a failed read) never blocks generation. The letter
/// is persisted and embedded best-effort as well: the caller gets the text
/// even when storage is down.
pub async fn generate_cover_letter(
    pool: &PgPool,
    provider: &dyn Provider,
    resume: &Value,
    posting: &Value,
    posting_id: &str,
) -> Result<String, AppError> {
    info!("Generating cover letter for posting {posting_id}");

    let prior_analysis = match store::analyses::find_latest(pool, posting_id).await {
        Ok(found) => found.map(|record| record.analysis),
        Err(e) => {
            warn!("Could not load posting analysis for {posting_id}: {e}");
            None
        }
    };
    if prior_analysis.is_some() {
        info!("Found analysis for posting {posting_id}, using it to improve the letter");
    }

    let config = provider.task_config(TaskType::CoverLetter)?;
    let prompt = prompts::cover_letter_prompt(resume, posting, prior_analysis.as_ref());
    let letter = provider
        .generate_text(&prompt, prompts::COVER_LETTER_SYSTEM, config)
        .await?
        .trim()
        .to_string();

    info!("Cover letter generated for posting {posting_id}");
    save_cover_letter(pool, provider, posting_id, &letter).await;

    Ok(letter)
}

/// Persists the letter and attaches an embedding. Both steps are best-effort:
/// the generated text is the caller's deliverable, storage is not.
async fn save_cover_letter(pool: &PgPool, provider: &dyn Provider, posting_id: &str, letter: &str) {
    let generated_at = Utc::now();
    match store::cover_letters::insert(pool, posting_id, letter, generated_at).await {
        Ok(id) => {
            embeddings::store_embedding(pool, provider, EmbeddingOwner::CoverLetter(id), letter)
                .await;
        }
        Err(e) => {
            error!("Failed to persist cover letter for posting {posting_id}: {e}");
        }
    }
}

/// Analyzes the raw HTML of a résumé page into a structured result.
pub async fn analyze_resume_html(
    pool: &PgPool,
    provider: &dyn Provider,
    html: &str,
    source_url: Option<&str>,
) -> Result<ResumeAnalysisResult, AppError> {
    info!("Analyzing resume HTML ({} bytes)", html.len());
    ensure_provider_available(provider).await?;

    let config = provider.task_config(TaskType::ResumeAnalysisHtml)?;
    let response = provider
        .generate_text(
            &prompts::resume_html_prompt(html),
            prompts::RESUME_ANALYSIS_SYSTEM,
            config,
        )
        .await?;

    let analysis = parse_resume_response(&response)?;
    persist_resume_analysis(pool, provider, source_url, &analysis).await;
    Ok(analysis)
}

/// Analyzes the plain text of a résumé into a structured result.
pub async fn analyze_resume_text(
    pool: &PgPool,
    provider: &dyn Provider,
    text: &str,
    source_url: Option<&str>,
) -> Result<ResumeAnalysisResult, AppError> {
    info!("Analyzing resume text ({} bytes)", text.len());
    ensure_provider_available(provider).await?;

    let config = provider.task_config(TaskType::ResumeAnalysisText)?;
    let response = provider
        .generate_text(
            &prompts::resume_text_prompt(text),
            prompts::RESUME_TEXT_ANALYSIS_SYSTEM,
            config,
        )
        .await?;

    let analysis = parse_resume_response(&response)?;
    persist_resume_analysis(pool, provider, source_url, &analysis).await;
    Ok(analysis)
}

async fn ensure_provider_available(provider: &dyn Provider) -> Result<(), AppError> {
    if provider.check_availability().await {
        Ok(())
    } else {
        Err(AppError::ProviderUnavailable(format!(
            "{} backend did not answer the availability probe",
            provider.kind().as_str()
        )))
    }
}

fn parse_resume_response(response: &str) -> Result<ResumeAnalysisResult, AppError> {
    let cleaned = strip_json_fences(response);
    serde_json::from_str(cleaned)
        .map_err(|e| AppError::AnalysisParse(format!("resume analysis was not valid JSON: {e}")))
}

/// Upserts the analysis keyed by the résumé id from its source URL, then
/// attaches an embedding of the analysis JSON. Best-effort: a storage failure
/// is logged and the analysis is still returned to the caller.
async fn persist_resume_analysis(
    pool: &PgPool,
    provider: &dyn Provider,
    source_url: Option<&str>,
    analysis: &ResumeAnalysisResult,
) {
    let resume_id = source_url
        .and_then(extract_resume_id)
        .unwrap_or_else(|| "unknown".to_string());

    let analysis_json = match serde_json::to_value(analysis) {
        Ok(value) => value,
        Err(e) => {
            warn!("Failed to serialize resume analysis for storage: {e}");
            return;
        }
    };

    match store::resumes::upsert_analysis(pool, &resume_id, &analysis_json).await {
        Ok(row) => {
            embeddings::store_embedding(
                pool,
                provider,
                EmbeddingOwner::ResumeAnalysis(row.id),
                &analysis_json.to_string(),
            )
            .await;
        }
        Err(e) => {
            warn!("Failed to save resume analysis {resume_id} to DB: {e}");
        }
    }
}

/// Strips ```json ... ``` or ``` ... ``` code fences from model output.
pub(crate) fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

/// Extracts the résumé id from a job-board résumé URL
/// (`.../resume/<hex-id>?...`).
pub(crate) fn extract_resume_id(url: &str) -> Option<String> {
    let (_, rest) = url.split_once("/resume/")?;
    let id: String = rest
        .chars()
        .take_while(|c| c.is_ascii_hexdigit())
        .collect();
    if id.is_empty() {
        None
    } else {
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_json_fences_with_json_tag() {
        let input = "```json\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn strip_json_fences_without_tag() {
        let input = "```\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn strip_json_fences_no_fences() {
        let input = "{\"key\": \"value\"}";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn parses_fenced_resume_analysis() {
        let response = "```json\n{\"personalInfo\": {\"fullName\": \"Jane Doe\"}, \"position\": \"Engineer\"}\n```";
        let analysis = parse_resume_response(response).unwrap();
        assert_eq!(analysis.personal_info.full_name, "Jane Doe");
        assert_eq!(analysis.position, "Engineer");
    }

    #[test]
    fn malformed_resume_analysis_is_a_parse_error() {
        let err = parse_resume_response("not json at all").unwrap_err();
        assert!(matches!(err, AppError::AnalysisParse(_)));
    }

    #[test]
    fn extracts_resume_id_from_url() {
        assert_eq!(
            extract_resume_id("https://hh.example/resume/a1b2c3d4e5?query=1"),
            Some("a1b2c3d4e5".to_string())
        );
        assert_eq!(extract_resume_id("https://hh.example/vacancy/123"), None);
        assert_eq!(extract_resume_id("https://hh.example/resume/"), None);
    }
}

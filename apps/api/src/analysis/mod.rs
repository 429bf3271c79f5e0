//! Posting-analysis cache and request coalescer.
//!
//! Guarantees at most one concurrent generation per posting id and never
//! regenerates an analysis that is already persisted. Concurrent callers for
//! the same posting all observe the same outcome, success or failure.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use serde_json::{json, Value};
use sqlx::PgPool;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::ai::{prompts, strip_json_fences};
use crate::embeddings::{self, EmbeddingOwner};
use crate::errors::AppError;
use crate::models::analysis::{
    ExperienceMatch, PostingAnalysis, PostingAnalysisRecord, Recommendation, SalaryAdequacy,
};
use crate::provider::{Provider, ProviderError, TaskType};
use crate::state::AppState;
use crate::store;

pub mod handlers;

/// Failure of one posting analysis. Clone-able so a single outcome can be
/// fanned out to every coalesced waiter.
#[derive(Debug, Clone, Error)]
pub enum AnalysisError {
    #[error("posting {0} not found")]
    PostingNotFound(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("provider unavailable: {0}")]
    Provider(String),

    #[error("analysis response was not valid JSON: {0}")]
    Parse(String),

    #[error("analysis failed validation: {0}")]
    Validation(String),

    #[error("failed to persist analysis: {0}")]
    Persistence(String),
}

type PendingResult = Result<PostingAnalysisRecord, AnalysisError>;

/// Process-local registry of in-flight posting analyses.
///
/// Entries are inserted when a generation starts and removed unconditionally
/// when it settles; a leaked entry would permanently block retries for that
/// posting id. The registry is an explicit dependency of the coalescer, not
/// ambient global state.
#[derive(Clone, Default)]
pub struct PendingAnalyses {
    inner: Arc<Mutex<HashMap<String, broadcast::Sender<PendingResult>>>>,
}

enum Role {
    Waiter(broadcast::Receiver<PendingResult>),
    Leader(broadcast::Sender<PendingResult>),
}

impl PendingAnalyses {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `generate` for `posting_id` unless one is already in flight, in
    /// which case the caller joins the existing request.
    ///
    /// The generation itself runs on a detached task: a caller that
    /// disconnects does not abort it, and the registry entry is still cleared
    /// when it settles.
    pub async fn run_coalesced<F, Fut>(&self, posting_id: &str, generate: F) -> PendingResult
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = PendingResult> + Send + 'static,
    {
        let role = {
            let mut pending = self
                .inner
                .lock()
                .expect("in-flight analysis registry lock poisoned");
            match pending.get(posting_id) {
                Some(tx) => Role::Waiter(tx.subscribe()),
                None => {
                    // Capacity 1: exactly one outcome is ever sent per entry.
                    let (tx, _) = broadcast::channel(1);
                    pending.insert(posting_id.to_string(), tx.clone());
                    Role::Leader(tx)
                }
            }
        };

        match role {
            Role::Waiter(mut rx) => {
                info!("Analysis already in flight for posting {posting_id}, joining it");
                match rx.recv().await {
                    Ok(outcome) => outcome,
                    Err(_) => Err(AnalysisError::Provider(
                        "in-flight analysis ended without a result".to_string(),
                    )),
                }
            }
            Role::Leader(tx) => {
                let mut rx = tx.subscribe();
                let registry = self.inner.clone();
                let key = posting_id.to_string();
                let fut = generate();
                tokio::spawn(async move {
                    let outcome = fut.await;
                    registry
                        .lock()
                        .expect("in-flight analysis registry lock poisoned")
                        .remove(&key);
                    // No receivers left is fine: every caller already settled.
                    let _ = tx.send(outcome);
                });
                match rx.recv().await {
                    Ok(outcome) => outcome,
                    Err(_) => Err(AnalysisError::Provider(
                        "in-flight analysis ended without a result".to_string(),
                    )),
                }
            }
        }
    }
}

/// Analyzes a posting for toxicity and red flags, deduplicating concurrent
/// requests and reusing any persisted analysis.
pub async fn analyze_posting(
    state: &AppState,
    posting_id: &str,
) -> Result<PostingAnalysisRecord, AppError> {
    let pool = state.db.clone();
    let provider = state.provider.clone();
    let key = posting_id.to_string();

    let record = state
        .pending
        .run_coalesced(posting_id, move || generate_analysis(pool, provider, key))
        .await?;
    Ok(record)
}

async fn generate_analysis(
    pool: PgPool,
    provider: Arc<dyn Provider>,
    posting_id: String,
) -> PendingResult {
    // A persisted analysis makes the operation idempotent across restarts.
    match store::analyses::find_latest(&pool, &posting_id).await {
        Ok(Some(existing)) => {
            info!("Found existing analysis for posting {posting_id}");
            return Ok(existing);
        }
        Ok(None) => {}
        // Read failures count as cache misses; validation happens on write.
        Err(e) => warn!("Could not read existing analysis for posting {posting_id}: {e}"),
    }

    info!("Analyzing posting {posting_id} for toxicity and red flags");

    let posting = store::postings::get_posting(&pool, &posting_id)
        .await
        .map_err(|e| AnalysisError::Persistence(e.to_string()))?
        .ok_or_else(|| AnalysisError::PostingNotFound(posting_id.clone()))?;

    // Latest résumé analysis is a best-effort personalization input.
    let resume = match store::resumes::latest_analysis(&pool).await {
        Ok(row) => row.map(|r| r.analysis),
        Err(e) => {
            warn!("Could not load latest resume analysis: {e}");
            None
        }
    };

    let config = provider
        .task_config(TaskType::PostingAnalysis)
        .map_err(provider_failure)?;
    let prompt = prompts::posting_analysis_prompt(&posting.data, resume.as_ref());
    let response = provider
        .generate_text(&prompt, prompts::POSTING_ANALYSIS_SYSTEM, config)
        .await
        .map_err(provider_failure)?;

    let analysis = parse_analysis_response(&response)?;

    let analyzed_at = Utc::now();
    // Full response envelope, kept verbatim for replay.
    let envelope = json!({
        "success": true,
        "data": analysis,
        "postingId": posting_id,
        "analyzedAt": analyzed_at,
    });

    let record = store::analyses::insert(&pool, &posting_id, &analysis, analyzed_at, &envelope)
        .await
        .map_err(|e| AnalysisError::Persistence(e.to_string()))?;

    info!(
        "Successfully analyzed posting {posting_id}, toxicity score: {}",
        record.analysis.toxicity_score
    );

    embeddings::store_embedding(
        &pool,
        provider.as_ref(),
        EmbeddingOwner::PostingAnalysis(record.id),
        &record.analysis.summary,
    )
    .await;

    Ok(record)
}

fn provider_failure(err: ProviderError) -> AnalysisError {
    match &err {
        ProviderError::UnknownTask(_) => AnalysisError::Configuration(err.to_string()),
        _ => AnalysisError::Provider(err.to_string()),
    }
}

/// Cleans and parses the model response, then applies the domain validation
/// rules. Nothing is persisted unless this returns `Ok`.
pub(crate) fn parse_analysis_response(response: &str) -> Result<PostingAnalysis, AnalysisError> {
    let cleaned = strip_json_fences(response);
    let value: Value = serde_json::from_str(cleaned).map_err(|e| AnalysisError::Parse(e.to_string()))?;
    validate_analysis(&value)
}

pub(crate) fn validate_analysis(value: &Value) -> Result<PostingAnalysis, AnalysisError> {
    let toxicity_score = value
        .get("toxicityScore")
        .and_then(Value::as_i64)
        .ok_or_else(|| AnalysisError::Validation("toxicityScore must be an integer".to_string()))?;
    if !(1..=10).contains(&toxicity_score) {
        return Err(AnalysisError::Validation(format!(
            "toxicityScore {toxicity_score} is outside 1..=10"
        )));
    }

    let recommendation = value
        .get("recommendation")
        .and_then(Value::as_str)
        .ok_or_else(|| AnalysisError::Validation("recommendation is missing".to_string()))?;
    let recommendation = Recommendation::parse(recommendation).ok_or_else(|| {
        AnalysisError::Validation(format!("unknown recommendation \"{recommendation}\""))
    })?;

    let red_flags = string_array(value, "redFlags")?;
    let positives = string_array(value, "positives")?;

    let summary = value
        .get("summary")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AnalysisError::Validation("summary must be a non-empty string".to_string()))?;

    // These two were never gated in older model outputs; absence falls back
    // to the neutral variant, but a present-and-unknown value is rejected.
    let salary_adequacy = optional_field(value, "salaryAdequacy", SalaryAdequacy::parse)?
        .unwrap_or(SalaryAdequacy::NotSpecified);
    let experience_match = optional_field(value, "experienceMatch", ExperienceMatch::parse)?
        .unwrap_or(ExperienceMatch::RequiresExperience);

    Ok(PostingAnalysis {
        toxicity_score: toxicity_score as i32,
        recommendation,
        red_flags,
        positives,
        summary: summary.to_string(),
        salary_adequacy,
        experience_match,
    })
}

fn string_array(value: &Value, key: &str) -> Result<Vec<String>, AnalysisError> {
    let items = value
        .get(key)
        .and_then(Value::as_array)
        .ok_or_else(|| AnalysisError::Validation(format!("{key} must be an array")))?;

    items
        .iter()
        .map(|item| {
            item.as_str()
                .map(str::to_string)
                .ok_or_else(|| AnalysisError::Validation(format!("{key} entries must be strings")))
        })
        .collect()
}

fn optional_field<T>(
    value: &Value,
    key: &str,
    parse: fn(&str) -> Option<T>,
) -> Result<Option<T>, AnalysisError> {
    match value.get(key).and_then(Value::as_str) {
        None => Ok(None),
        Some(s) => parse(s)
            .map(Some)
            .ok_or_else(|| AnalysisError::Validation(format!("unknown {key} \"{s}\""))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use uuid::Uuid;

    fn valid_response() -> Value {
        json!({
            "toxicityScore": 6,
            "recommendation": "caution",
            "redFlags": ["unpaid trial period"],
            "positives": ["remote friendly"],
            "summary": "Workable but negotiate carefully.",
            "salaryAdequacy": "low",
            "experienceMatch": "requires_experience"
        })
    }

    fn sample_record(posting_id: &str) -> PostingAnalysisRecord {
        PostingAnalysisRecord {
            id: Uuid::new_v4(),
            posting_id: posting_id.to_string(),
            analysis: validate_analysis(&valid_response()).unwrap(),
            analyzed_at: Utc::now(),
        }
    }

    // ── validation ──────────────────────────────────────────────────────

    #[test]
    fn valid_analysis_passes() {
        let analysis = validate_analysis(&valid_response()).unwrap();
        assert_eq!(analysis.toxicity_score, 6);
        assert_eq!(analysis.recommendation, Recommendation::Caution);
        assert_eq!(analysis.red_flags, vec!["unpaid trial period"]);
    }

    #[test]
    fn toxicity_score_bounds_are_enforced() {
        for bad in [0, 11, -3] {
            let mut value = valid_response();
            value["toxicityScore"] = json!(bad);
            let err = validate_analysis(&value).unwrap_err();
            assert!(matches!(err, AnalysisError::Validation(_)), "score {bad}");
        }
    }

    #[test]
    fn non_integer_toxicity_score_is_rejected() {
        let mut value = valid_response();
        value["toxicityScore"] = json!(5.5);
        assert!(matches!(
            validate_analysis(&value),
            Err(AnalysisError::Validation(_))
        ));

        value["toxicityScore"] = json!("7");
        assert!(matches!(
            validate_analysis(&value),
            Err(AnalysisError::Validation(_))
        ));
    }

    #[test]
    fn unknown_recommendation_is_rejected() {
        let mut value = valid_response();
        value["recommendation"] = json!("maybe");
        let err = validate_analysis(&value).unwrap_err();
        assert!(err.to_string().contains("maybe"));
    }

    #[test]
    fn flags_must_be_string_arrays() {
        let mut value = valid_response();
        value["redFlags"] = json!("not an array");
        assert!(matches!(
            validate_analysis(&value),
            Err(AnalysisError::Validation(_))
        ));

        let mut value = valid_response();
        value["positives"] = json!([1, 2]);
        assert!(matches!(
            validate_analysis(&value),
            Err(AnalysisError::Validation(_))
        ));

        let mut value = valid_response();
        value["redFlags"] = json!([]);
        assert!(validate_analysis(&value).is_ok(), "empty arrays are fine");
    }

    #[test]
    fn empty_summary_is_rejected() {
        let mut value = valid_response();
        value["summary"] = json!("   ");
        assert!(matches!(
            validate_analysis(&value),
            Err(AnalysisError::Validation(_))
        ));
    }

    #[test]
    fn missing_enum_fields_fall_back_to_neutral_variants() {
        let mut value = valid_response();
        value.as_object_mut().unwrap().remove("salaryAdequacy");
        value.as_object_mut().unwrap().remove("experienceMatch");
        let analysis = validate_analysis(&value).unwrap();
        assert_eq!(analysis.salary_adequacy, SalaryAdequacy::NotSpecified);
        assert_eq!(analysis.experience_match, ExperienceMatch::RequiresExperience);
    }

    #[test]
    fn present_but_unknown_enum_fields_are_rejected() {
        let mut value = valid_response();
        value["salaryAdequacy"] = json!("generous");
        assert!(matches!(
            validate_analysis(&value),
            Err(AnalysisError::Validation(_))
        ));
    }

    #[test]
    fn fenced_analysis_response_is_cleaned_before_parsing() {
        let response = format!("```json\n{}\n```", valid_response());
        let analysis = parse_analysis_response(&response).unwrap();
        assert_eq!(analysis.recommendation, Recommendation::Caution);
    }

    #[test]
    fn garbage_response_is_a_parse_error() {
        assert!(matches!(
            parse_analysis_response("the posting looks fine"),
            Err(AnalysisError::Parse(_))
        ));
    }

    // ── coalescing ──────────────────────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn concurrent_requests_coalesce_into_one_generation() {
        let pending = PendingAnalyses::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let started = tokio::time::Instant::now();

        let mut handles = Vec::new();
        for _ in 0..5 {
            let pending = pending.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                pending
                    .run_coalesced("123", move || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(500)).await;
                        Ok(sample_record("123"))
                    })
                    .await
            }));
        }

        let mut results = Vec::new();
        for handle in handles {
            results.push(handle.await.unwrap());
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        // Everyone settles within one generation's latency, not N of them.
        assert!(started.elapsed() <= Duration::from_millis(600));

        let first = results[0].as_ref().unwrap();
        for result in &results {
            let record = result.as_ref().unwrap();
            assert_eq!(record.id, first.id);
            assert_eq!(record.analysis.summary, first.analysis.summary);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn coalesced_failure_reaches_every_waiter_and_clears_the_registry() {
        let pending = PendingAnalyses::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..3 {
            let pending = pending.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                pending
                    .run_coalesced("666", move || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(100)).await;
                        Err(AnalysisError::Provider("backend down".to_string()))
                    })
                    .await
            }));
        }

        for handle in handles {
            let err = handle.await.unwrap().unwrap_err();
            assert!(matches!(err, AnalysisError::Provider(_)));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // The failed attempt must not block a retry.
        let retried = pending
            .run_coalesced("666", {
                let calls = calls.clone();
                move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(sample_record("666"))
                }
            })
            .await;
        assert!(retried.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn sequential_requests_each_run_generation() {
        let pending = PendingAnalyses::new();
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..2 {
            let calls = calls.clone();
            let result = pending
                .run_coalesced("42", move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(sample_record("42"))
                })
                .await;
            assert!(result.is_ok());
        }

        // The registry entry is removed after each settle, so the second
        // sequential call generates again (the persisted-result short-circuit
        // lives in generate_analysis, not in the registry).
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn generation_survives_the_leader_disconnecting() {
        let pending = PendingAnalyses::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let leader = {
            let pending = pending.clone();
            let calls = calls.clone();
            tokio::spawn(async move {
                pending
                    .run_coalesced("99", move || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(500)).await;
                        Ok(sample_record("99"))
                    })
                    .await
            })
        };

        // Let the leader register and start generating, then drop its caller.
        tokio::task::yield_now().await;
        leader.abort();

        // A new caller joins the still-running generation instead of starting
        // a second one, and receives its result.
        let result = pending
            .run_coalesced("99", {
                let calls = calls.clone();
                move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(sample_record("duplicate"))
                }
            })
            .await;

        assert_eq!(result.unwrap().posting_id, "99");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}

use axum::{extract::Path, extract::State, Json};
use serde::Serialize;

use crate::errors::AppError;
use crate::models::analysis::{PostingAnalysisRecord, Recommendation};
use crate::state::AppState;
use crate::store;

/// POST /api/v1/postings/:id/analyze
///
/// Coalesced: concurrent requests for the same posting share one generation.
pub async fn handle_analyze_posting(
    State(state): State<AppState>,
    Path(posting_id): Path<String>,
) -> Result<Json<PostingAnalysisRecord>, AppError> {
    let record = crate::analysis::analyze_posting(&state, &posting_id).await?;
    Ok(Json(record))
}

/// GET /api/v1/postings/:id/analysis. Read-only, never triggers generation.
pub async fn handle_get_analysis(
    State(state): State<AppState>,
    Path(posting_id): Path<String>,
) -> Result<Json<PostingAnalysisRecord>, AppError> {
    let record = store::analyses::find_latest(&state.db, &posting_id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("No analysis found for posting {posting_id}"))
        })?;
    Ok(Json(record))
}

/// GET /api/v1/analyses
pub async fn handle_list_analyses(
    State(state): State<AppState>,
) -> Result<Json<Vec<PostingAnalysisRecord>>, AppError> {
    let records = store::analyses::list_all(&state.db).await?;
    Ok(Json(records))
}

#[derive(Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisStats {
    pub total: usize,
    pub recommendations: RecommendationCounts,
    pub toxicity_levels: ToxicityLevels,
    pub average_toxicity: f64,
}

#[derive(Debug, PartialEq, Serialize)]
pub struct RecommendationCounts {
    pub apply: usize,
    pub caution: usize,
    pub avoid: usize,
}

/// Bands: 1-3 low, 4-6 medium, 7-10 high.
#[derive(Debug, PartialEq, Serialize)]
pub struct ToxicityLevels {
    pub low: usize,
    pub medium: usize,
    pub high: usize,
}

/// GET /api/v1/analyses/stats
pub async fn handle_analysis_stats(
    State(state): State<AppState>,
) -> Result<Json<AnalysisStats>, AppError> {
    let records = store::analyses::list_all(&state.db).await?;
    Ok(Json(compute_stats(&records)))
}

fn compute_stats(records: &[PostingAnalysisRecord]) -> AnalysisStats {
    let count_recommendation = |wanted: Recommendation| {
        records
            .iter()
            .filter(|r| r.analysis.recommendation == wanted)
            .count()
    };
    let count_band = |min: i32, max: i32| {
        records
            .iter()
            .filter(|r| (min..=max).contains(&r.analysis.toxicity_score))
            .count()
    };

    let average_toxicity = if records.is_empty() {
        0.0
    } else {
        let sum: i64 = records
            .iter()
            .map(|r| i64::from(r.analysis.toxicity_score))
            .sum();
        sum as f64 / records.len() as f64
    };

    AnalysisStats {
        total: records.len(),
        recommendations: RecommendationCounts {
            apply: count_recommendation(Recommendation::Apply),
            caution: count_recommendation(Recommendation::Caution),
            avoid: count_recommendation(Recommendation::Avoid),
        },
        toxicity_levels: ToxicityLevels {
            low: count_band(1, 3),
            medium: count_band(4, 6),
            high: count_band(7, 10),
        },
        average_toxicity,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::analysis::{ExperienceMatch, PostingAnalysis, SalaryAdequacy};
    use chrono::Utc;
    use uuid::Uuid;

    fn record(score: i32, recommendation: Recommendation) -> PostingAnalysisRecord {
        PostingAnalysisRecord {
            id: Uuid::new_v4(),
            posting_id: "p".to_string(),
            analysis: PostingAnalysis {
                toxicity_score: score,
                recommendation,
                red_flags: vec![],
                positives: vec![],
                summary: "s".to_string(),
                salary_adequacy: SalaryAdequacy::NotSpecified,
                experience_match: ExperienceMatch::RequiresExperience,
            },
            analyzed_at: Utc::now(),
        }
    }

    #[test]
    fn stats_over_empty_set_are_zero() {
        let stats = compute_stats(&[]);
        assert_eq!(stats.total, 0);
        assert_eq!(stats.average_toxicity, 0.0);
    }

    #[test]
    fn stats_count_bands_and_recommendations() {
        let records = vec![
            record(2, Recommendation::Apply),
            record(3, Recommendation::Apply),
            record(5, Recommendation::Caution),
            record(9, Recommendation::Avoid),
        ];
        let stats = compute_stats(&records);

        assert_eq!(stats.total, 4);
        assert_eq!(stats.recommendations.apply, 2);
        assert_eq!(stats.recommendations.caution, 1);
        assert_eq!(stats.recommendations.avoid, 1);
        assert_eq!(stats.toxicity_levels.low, 2);
        assert_eq!(stats.toxicity_levels.medium, 1);
        assert_eq!(stats.toxicity_levels.high, 1);
        assert!((stats.average_toxicity - 4.75).abs() < f64::EPSILON);
    }
}

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;
use tracing::warn;
use uuid::Uuid;

use crate::models::analysis::{PostingAnalysis, PostingAnalysisRecord, PostingAnalysisRow};

/// Inserts a validated analysis as a new row. Analyses are never updated in
/// place; lookups pick the newest row per posting.
pub async fn insert(
    pool: &PgPool,
    posting_id: &str,
    analysis: &PostingAnalysis,
    analyzed_at: DateTime<Utc>,
    payload: &Value,
) -> Result<PostingAnalysisRecord, sqlx::Error> {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO posting_analyses
            (id, posting_id, toxicity_score, recommendation, red_flags, positives,
             summary, salary_adequacy, experience_match, analyzed_at, payload)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        "#,
    )
    .bind(id)
    .bind(posting_id)
    .bind(analysis.toxicity_score)
    .bind(analysis.recommendation.as_str())
    .bind(&analysis.red_flags)
    .bind(&analysis.positives)
    .bind(&analysis.summary)
    .bind(analysis.salary_adequacy.as_str())
    .bind(analysis.experience_match.as_str())
    .bind(analyzed_at)
    .bind(payload)
    .execute(pool)
    .await?;

    Ok(PostingAnalysisRecord {
        id,
        posting_id: posting_id.to_string(),
        analysis: analysis.clone(),
        analyzed_at,
    })
}

/// The newest persisted analysis for a posting. Rows that no longer decode
/// into the current enums are skipped as if absent; the caller regenerates.
pub async fn find_latest(
    pool: &PgPool,
    posting_id: &str,
) -> Result<Option<PostingAnalysisRecord>, sqlx::Error> {
    let row: Option<PostingAnalysisRow> = sqlx::query_as(
        r#"
        SELECT id, posting_id, toxicity_score, recommendation, red_flags, positives,
               summary, salary_adequacy, experience_match, analyzed_at
        FROM posting_analyses
        WHERE posting_id = $1
        ORDER BY analyzed_at DESC
        LIMIT 1
        "#,
    )
    .bind(posting_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.and_then(|row| decode_row(row, posting_id)))
}

/// Every persisted analysis, newest first, skipping undecodable rows.
pub async fn list_all(pool: &PgPool) -> Result<Vec<PostingAnalysisRecord>, sqlx::Error> {
    let rows: Vec<PostingAnalysisRow> = sqlx::query_as(
        r#"
        SELECT id, posting_id, toxicity_score, recommendation, red_flags, positives,
               summary, salary_adequacy, experience_match, analyzed_at
        FROM posting_analyses
        ORDER BY analyzed_at DESC
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .filter_map(|row| {
            let posting_id = row.posting_id.clone();
            decode_row(row, &posting_id)
        })
        .collect())
}

fn decode_row(row: PostingAnalysisRow, posting_id: &str) -> Option<PostingAnalysisRecord> {
    match PostingAnalysisRecord::try_from(row) {
        Ok(record) => Some(record),
        Err(e) => {
            warn!("Ignoring undecodable analysis row for posting {posting_id}: {e}");
            None
        }
    }
}

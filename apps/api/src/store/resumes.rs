use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::resume::ResumeAnalysisRow;

/// Upserts a résumé analysis keyed by résumé id. A re-analysis of the same
/// résumé replaces the stored JSON and bumps updated_at; the row id (and any
/// attached embedding's owner) stays stable.
pub async fn upsert_analysis(
    pool: &PgPool,
    resume_id: &str,
    analysis: &Value,
) -> Result<ResumeAnalysisRow, sqlx::Error> {
    sqlx::query_as(
        r#"
        INSERT INTO resume_analyses (id, resume_id, analysis, created_at, updated_at)
        VALUES ($1, $2, $3, now(), now())
        ON CONFLICT (resume_id) DO UPDATE SET analysis = EXCLUDED.analysis, updated_at = now()
        RETURNING id, resume_id, analysis, created_at, updated_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(resume_id)
    .bind(analysis)
    .fetch_one(pool)
    .await
}

/// The most recently updated résumé analysis, if any.
pub async fn latest_analysis(pool: &PgPool) -> Result<Option<ResumeAnalysisRow>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT id, resume_id, analysis, created_at, updated_at
        FROM resume_analyses
        ORDER BY updated_at DESC
        LIMIT 1
        "#,
    )
    .fetch_optional(pool)
    .await
}

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::cover_letter::CoverLetterRow;

/// Inserts a generated letter and returns its row id. Letters are append-only;
/// regenerating for the same posting adds a new row.
pub async fn insert(
    pool: &PgPool,
    posting_id: &str,
    content: &str,
    generated_at: DateTime<Utc>,
) -> Result<Uuid, sqlx::Error> {
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO cover_letters (id, posting_id, content, generated_at) VALUES ($1, $2, $3, $4)",
    )
    .bind(id)
    .bind(posting_id)
    .bind(content)
    .bind(generated_at)
    .execute(pool)
    .await?;
    Ok(id)
}

pub async fn latest(pool: &PgPool) -> Result<Option<CoverLetterRow>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT id, posting_id, content, generated_at
        FROM cover_letters
        ORDER BY generated_at DESC
        LIMIT 1
        "#,
    )
    .fetch_optional(pool)
    .await
}

/// Letters generated for one posting, newest first.
pub async fn find_by_posting(
    pool: &PgPool,
    posting_id: &str,
) -> Result<Vec<CoverLetterRow>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT id, posting_id, content, generated_at
        FROM cover_letters
        WHERE posting_id = $1
        ORDER BY generated_at DESC
        "#,
    )
    .bind(posting_id)
    .fetch_all(pool)
    .await
}

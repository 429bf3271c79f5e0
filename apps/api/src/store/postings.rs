use serde_json::Value;
use sqlx::PgPool;

use crate::models::posting::PostingRow;

/// Upserts a scraped posting. Re-saving the same posting refreshes its data
/// and saved-at timestamp.
pub async fn save_posting(pool: &PgPool, id: &str, data: &Value) -> Result<PostingRow, sqlx::Error> {
    sqlx::query_as(
        r#"
        INSERT INTO postings (id, data, saved_at)
        VALUES ($1, $2, now())
        ON CONFLICT (id) DO UPDATE SET data = EXCLUDED.data, saved_at = now()
        RETURNING id, data, saved_at
        "#,
    )
    .bind(id)
    .bind(data)
    .fetch_one(pool)
    .await
}

pub async fn get_posting(pool: &PgPool, id: &str) -> Result<Option<PostingRow>, sqlx::Error> {
    sqlx::query_as("SELECT id, data, saved_at FROM postings WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// All saved postings, newest first.
pub async fn list_postings(pool: &PgPool) -> Result<Vec<PostingRow>, sqlx::Error> {
    sqlx::query_as("SELECT id, data, saved_at FROM postings ORDER BY saved_at DESC")
        .fetch_all(pool)
        .await
}

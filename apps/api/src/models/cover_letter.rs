use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// A generated cover letter, keyed by posting id and generation timestamp.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CoverLetterRow {
    pub id: Uuid,
    pub posting_id: String,
    pub content: String,
    pub generated_at: DateTime<Utc>,
}

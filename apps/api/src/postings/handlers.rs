use axum::{extract::Path, extract::State, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::embeddings::{self, EmbeddingOwner};
use crate::errors::AppError;
use crate::models::posting::{PostingRow, PostingSummary};
use crate::state::AppState;
use crate::store;

#[derive(Debug, Deserialize)]
pub struct SavePostingRequest {
    pub posting: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavePostingResponse {
    pub success: bool,
    pub posting_id: String,
    pub saved_at: DateTime<Utc>,
}

/// POST /api/v1/postings
pub async fn handle_save_posting(
    State(state): State<AppState>,
    Json(req): Json<SavePostingRequest>,
) -> Result<Json<SavePostingResponse>, AppError> {
    let posting_id = req
        .posting
        .get("id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::Validation("posting.id is required".to_string()))?
        .to_string();

    let row = store::postings::save_posting(&state.db, &posting_id, &req.posting).await?;
    info!("Saved posting {posting_id}");

    // Side channel for later similarity ranking over saved postings.
    embeddings::store_embedding(
        &state.db,
        state.provider.as_ref(),
        EmbeddingOwner::Posting(posting_id.clone()),
        &row.data.to_string(),
    )
    .await;

    Ok(Json(SavePostingResponse {
        success: true,
        posting_id,
        saved_at: row.saved_at,
    }))
}

/// GET /api/v1/postings
pub async fn handle_list_postings(
    State(state): State<AppState>,
) -> Result<Json<Vec<PostingSummary>>, AppError> {
    let rows = store::postings::list_postings(&state.db).await?;
    let summaries = rows.iter().map(PostingSummary::from_row).collect();
    Ok(Json(summaries))
}

/// GET /api/v1/postings/:id
pub async fn handle_get_posting(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PostingRow>, AppError> {
    let row = store::postings::get_posting(&state.db, &id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Posting {id} not found")))?;
    Ok(Json(row))
}

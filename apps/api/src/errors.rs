use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::analysis::AnalysisError;
use crate::provider::ProviderError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Analysis parse error: {0}")]
    AnalysisParse(String),

    #[error("Analysis validation error: {0}")]
    AnalysisValidation(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<ProviderError> for AppError {
    fn from(err: ProviderError) -> Self {
        match &err {
            ProviderError::UnknownTask(_) => AppError::Configuration(err.to_string()),
            _ => AppError::ProviderUnavailable(err.to_string()),
        }
    }
}

impl From<AnalysisError> for AppError {
    fn from(err: AnalysisError) -> Self {
        match err {
            AnalysisError::PostingNotFound(id) => {
                AppError::NotFound(format!("Posting {id} not found"))
            }
            AnalysisError::Configuration(msg) => AppError::Configuration(msg),
            AnalysisError::Provider(msg) => AppError::ProviderUnavailable(msg),
            AnalysisError::Parse(msg) => AppError::AnalysisParse(msg),
            AnalysisError::Validation(msg) => AppError::AnalysisValidation(msg),
            AnalysisError::Persistence(msg) => AppError::Persistence(msg),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Configuration(msg) => {
                tracing::error!("Configuration error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "CONFIGURATION_ERROR",
                    msg.clone(),
                )
            }
            AppError::ProviderUnavailable(msg) => {
                tracing::error!("Provider unavailable: {msg}");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "PROVIDER_UNAVAILABLE",
                    msg.clone(),
                )
            }
            AppError::AnalysisParse(msg) => {
                tracing::error!("Analysis parse error: {msg}");
                (StatusCode::BAD_GATEWAY, "ANALYSIS_PARSE_ERROR", msg.clone())
            }
            AppError::AnalysisValidation(msg) => {
                tracing::error!("Analysis validation error: {msg}");
                (
                    StatusCode::BAD_GATEWAY,
                    "ANALYSIS_VALIDATION_ERROR",
                    msg.clone(),
                )
            }
            AppError::Persistence(msg) => {
                tracing::error!("Persistence error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "PERSISTENCE_ERROR",
                    msg.clone(),
                )
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "A database error occurred".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_task_maps_to_configuration_error() {
        let err = AppError::from(ProviderError::UnknownTask(
            crate::provider::TaskType::Embedding,
        ));
        assert!(matches!(err, AppError::Configuration(_)));
    }

    #[test]
    fn transport_failures_map_to_provider_unavailable() {
        let err = AppError::from(ProviderError::EmptyCompletion);
        assert!(matches!(err, AppError::ProviderUnavailable(_)));
    }

    #[test]
    fn analysis_errors_keep_their_category() {
        assert!(matches!(
            AppError::from(AnalysisError::Validation("bad score".to_string())),
            AppError::AnalysisValidation(_)
        ));
        assert!(matches!(
            AppError::from(AnalysisError::Parse("not json".to_string())),
            AppError::AnalysisParse(_)
        ));
        assert!(matches!(
            AppError::from(AnalysisError::PostingNotFound("1".to_string())),
            AppError::NotFound(_)
        ));
    }
}

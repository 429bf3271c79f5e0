//! Provider abstraction: the single seam over interchangeable
//! text-generation/embedding backends.
//!
//! The rest of the system only ever sees `dyn Provider`; the concrete backend
//! is chosen once at startup by `select_provider` and never branched on again.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub mod openai;
pub mod yandex;

pub use openai::OpenAiProvider;
pub use yandex::YandexProvider;

/// Unit of AI work. Each task maps to a backend-specific model configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskType {
    CoverLetter,
    ResumeAnalysisHtml,
    ResumeAnalysisText,
    PostingAnalysis,
    AvailabilityCheck,
    Embedding,
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TaskType::CoverLetter => "COVER_LETTER",
            TaskType::ResumeAnalysisHtml => "RESUME_ANALYSIS_HTML",
            TaskType::ResumeAnalysisText => "RESUME_ANALYSIS_TEXT",
            TaskType::PostingAnalysis => "POSTING_ANALYSIS",
            TaskType::AvailabilityCheck => "AVAILABILITY_CHECK",
            TaskType::Embedding => "EMBEDDING",
        };
        f.write_str(name)
    }
}

/// Model settings for one task on one backend.
///
/// `temperature` is optional on purpose: some backends cannot customize
/// sampling temperature for certain models and omit it.
#[derive(Debug, Clone, Copy)]
pub struct ModelConfig {
    pub model: &'static str,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("provider returned empty completion")]
    EmptyCompletion,

    #[error("provider returned empty or non-numeric embedding")]
    EmptyEmbedding,

    #[error("retries exhausted after {0} attempts")]
    RetriesExhausted(u32),

    #[error("no model configuration registered for task {0}")]
    UnknownTask(TaskType),
}

/// Uniform contract over one text-generation/embedding backend.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Generates text for a prompt pair under the given model configuration.
    async fn generate_text(
        &self,
        prompt: &str,
        system: &str,
        config: ModelConfig,
    ) -> Result<String, ProviderError>;

    /// Generates an embedding vector for the given text.
    async fn generate_embedding(&self, text: &str) -> Result<Vec<f32>, ProviderError>;

    /// Probes the backend with a minimal completion. Never fails: transport
    /// and backend errors are converted to `false`.
    async fn check_availability(&self) -> bool;

    /// Looks up this backend's model configuration for a task.
    fn task_config(&self, task: TaskType) -> Result<ModelConfig, ProviderError>;

    fn kind(&self) -> ProviderKind;
}

/// The configured backend identity, used for startup selection and
/// observability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    OpenAi,
    Yandex,
}

impl ProviderKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Yandex => "yandex",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Some(ProviderKind::OpenAi),
            "yandex" => Some(ProviderKind::Yandex),
            _ => None,
        }
    }

    /// Environment variable holding this backend's API key.
    pub fn credential_var(self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "OPENAI_API_KEY",
            ProviderKind::Yandex => "YANDEX_API_KEY",
        }
    }
}

/// Constructs the active adapter. Called exactly once, at startup, after the
/// credential has been resolved.
pub fn select_provider(kind: ProviderKind, api_key: String) -> Arc<dyn Provider> {
    match kind {
        ProviderKind::OpenAi => Arc::new(OpenAiProvider::new(api_key)),
        ProviderKind::Yandex => Arc::new(YandexProvider::new(api_key)),
    }
}

/// Minimal probe prompt shared by both adapters' availability checks.
pub(crate) const AVAILABILITY_PROMPT: &str = "Availability check. Reply with \"OK\".";

pub(crate) const MAX_RETRIES: u32 = 3;

/// Exponential backoff: 1s, 2s, 4s.
pub(crate) fn backoff(attempt: u32) -> Duration {
    Duration::from_millis(1000 * (1 << (attempt - 1)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_kind_parses_case_insensitively() {
        assert_eq!(ProviderKind::parse("openai"), Some(ProviderKind::OpenAi));
        assert_eq!(ProviderKind::parse(" OpenAI "), Some(ProviderKind::OpenAi));
        assert_eq!(ProviderKind::parse("yandex"), Some(ProviderKind::Yandex));
        assert_eq!(ProviderKind::parse("anthropic"), None);
    }

    #[test]
    fn credential_var_matches_provider() {
        assert_eq!(ProviderKind::OpenAi.credential_var(), "OPENAI_API_KEY");
        assert_eq!(ProviderKind::Yandex.credential_var(), "YANDEX_API_KEY");
    }

    #[test]
    fn backoff_doubles_per_attempt() {
        assert_eq!(backoff(1), Duration::from_millis(1000));
        assert_eq!(backoff(2), Duration::from_millis(2000));
        assert_eq!(backoff(3), Duration::from_millis(4000));
    }
}

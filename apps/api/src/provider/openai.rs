//! Chat-completions-style backend (OpenAI API).
//!
//! Note: gpt-5-mini does not accept a custom sampling temperature, so the
//! completion tasks omit it and the backend default applies.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{
    backoff, ModelConfig, Provider, ProviderError, ProviderKind, TaskType, AVAILABILITY_PROMPT,
    MAX_RETRIES,
};
use async_trait::async_trait;

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const COMPLETION_MODEL: &str = "gpt-5-mini";
const EMBEDDING_MODEL: &str = "text-embedding-3-small";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

pub struct OpenAiProvider {
    client: Client,
    api_key: String,
}

impl OpenAiProvider {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .build()
                .expect("Failed to build HTTP client"),
            api_key,
        }
    }

    /// Sends one chat completion, retrying on 429 and 5xx with backoff.
    async fn chat(&self, request: &ChatRequest<'_>) -> Result<String, ProviderError> {
        let mut last_error: Option<ProviderError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                let delay = backoff(attempt);
                warn!(
                    "OpenAI call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = self
                .client
                .post(format!("{OPENAI_BASE_URL}/chat/completions"))
                .bearer_auth(&self.api_key)
                .json(request)
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(ProviderError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("OpenAI API returned {status}: {body}");
                last_error = Some(ProviderError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<ApiErrorBody>(&body)
                    .map(|e| e.error.message)
                    .unwrap_or(body);
                return Err(ProviderError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            let parsed: ChatResponse = response.json().await?;
            let content = parsed
                .choices
                .into_iter()
                .next()
                .and_then(|c| c.message.content)
                .map(|text| text.trim().to_string())
                .filter(|text| !text.is_empty());

            return match content {
                Some(text) => {
                    debug!("OpenAI completion succeeded ({} chars)", text.len());
                    Ok(text)
                }
                None => Err(ProviderError::EmptyCompletion),
            };
        }

        Err(last_error.unwrap_or(ProviderError::RetriesExhausted(MAX_RETRIES)))
    }

    fn lookup(task: TaskType) -> Option<ModelConfig> {
        Some(match task {
            TaskType::CoverLetter
            | TaskType::ResumeAnalysisHtml
            | TaskType::ResumeAnalysisText
            | TaskType::PostingAnalysis => ModelConfig {
                model: COMPLETION_MODEL,
                temperature: None,
                max_tokens: None,
            },
            TaskType::AvailabilityCheck => ModelConfig {
                model: COMPLETION_MODEL,
                temperature: None,
                max_tokens: Some(10),
            },
            TaskType::Embedding => ModelConfig {
                model: EMBEDDING_MODEL,
                temperature: Some(0.0),
                max_tokens: None,
            },
        })
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    async fn generate_text(
        &self,
        prompt: &str,
        system: &str,
        config: ModelConfig,
    ) -> Result<String, ProviderError> {
        let request = ChatRequest {
            model: config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        };

        self.chat(&request).await
    }

    async fn generate_embedding(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let config = self.task_config(TaskType::Embedding)?;
        let request = EmbeddingRequest {
            model: config.model,
            input: text,
        };

        let response = self
            .client
            .post(format!("{OPENAI_BASE_URL}/embeddings"))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: EmbeddingResponse = response.json().await?;
        let embedding = parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .filter(|v| !v.is_empty());

        embedding.ok_or(ProviderError::EmptyEmbedding)
    }

    async fn check_availability(&self) -> bool {
        let config = match self.task_config(TaskType::AvailabilityCheck) {
            Ok(c) => c,
            Err(_) => return false,
        };
        let request = ChatRequest {
            model: config.model,
            messages: vec![ChatMessage {
                role: "user",
                content: AVAILABILITY_PROMPT,
            }],
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        };

        let response = self
            .client
            .post(format!("{OPENAI_BASE_URL}/chat/completions"))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await;

        match response {
            Ok(r) if r.status().is_success() => match r.json::<ChatResponse>().await {
                Ok(parsed) => parsed
                    .choices
                    .first()
                    .and_then(|c| c.message.content.as_deref())
                    .is_some(),
                Err(e) => {
                    warn!("OpenAI availability probe returned an unreadable body: {e}");
                    false
                }
            },
            Ok(r) => {
                warn!("OpenAI API unavailable: status {}", r.status());
                false
            }
            Err(e) => {
                warn!("OpenAI API unavailable: {e}");
                false
            }
        }
    }

    fn task_config(&self, task: TaskType) -> Result<ModelConfig, ProviderError> {
        Self::lookup(task).ok_or(ProviderError::UnknownTask(task))
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAi
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_tasks_have_no_custom_temperature() {
        let provider = OpenAiProvider::new("test-key".to_string());
        for task in [
            TaskType::CoverLetter,
            TaskType::ResumeAnalysisHtml,
            TaskType::ResumeAnalysisText,
            TaskType::PostingAnalysis,
        ] {
            let config = provider.task_config(task).unwrap();
            assert_eq!(config.model, COMPLETION_MODEL);
            assert!(config.temperature.is_none(), "{task} should omit temperature");
        }
    }

    #[test]
    fn availability_check_is_token_capped() {
        let provider = OpenAiProvider::new("test-key".to_string());
        let config = provider.task_config(TaskType::AvailabilityCheck).unwrap();
        assert_eq!(config.max_tokens, Some(10));
    }

    #[test]
    fn embedding_task_uses_embedding_model() {
        let provider = OpenAiProvider::new("test-key".to_string());
        let config = provider.task_config(TaskType::Embedding).unwrap();
        assert_eq!(config.model, EMBEDDING_MODEL);
        assert_eq!(config.temperature, Some(0.0));
    }

    #[test]
    fn temperature_is_omitted_from_request_json() {
        let request = ChatRequest {
            model: COMPLETION_MODEL,
            messages: vec![ChatMessage {
                role: "user",
                content: "hello",
            }],
            max_tokens: None,
            temperature: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("temperature").is_none());
        assert!(json.get("max_tokens").is_none());
    }
}

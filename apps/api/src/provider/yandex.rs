//! REST-completion-style backend (Yandex Foundation Models API).
//!
//! Unlike the chat backend, this one supports per-task temperatures on every
//! model, and addresses models through `modelUri` strings.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{
    backoff, ModelConfig, Provider, ProviderError, ProviderKind, TaskType, AVAILABILITY_PROMPT,
    MAX_RETRIES,
};
use async_trait::async_trait;

const YANDEX_BASE_URL: &str = "https://llm.api.cloud.yandex.net/foundationModels/v1";
const COMPLETION_MODEL: &str = "yandexgpt";
const EMBEDDING_MODEL: &str = "yandexgpt-embedding";
const AVAILABILITY_MODEL_URI: &str = "gpt://yandexgpt/lite";

fn model_uri(model: &str) -> String {
    format!("gpt://{model}")
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CompletionRequest<'a> {
    model_uri: String,
    completion_options: CompletionOptions,
    messages: Vec<CompletionMessage<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CompletionOptions {
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct CompletionMessage<'a> {
    role: &'a str,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    result: CompletionResult,
}

#[derive(Debug, Deserialize)]
struct CompletionResult {
    alternatives: Vec<Alternative>,
}

#[derive(Debug, Deserialize)]
struct Alternative {
    message: AlternativeMessage,
}

#[derive(Debug, Deserialize)]
struct AlternativeMessage {
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbeddingRequest<'a> {
    model_uri: String,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

pub struct YandexProvider {
    client: Client,
    api_key: String,
}

impl YandexProvider {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .build()
                .expect("Failed to build HTTP client"),
            api_key,
        }
    }

    async fn complete(&self, request: &CompletionRequest<'_>) -> Result<String, ProviderError> {
        let mut last_error: Option<ProviderError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                let delay = backoff(attempt);
                warn!(
                    "Yandex call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = self
                .client
                .post(format!("{YANDEX_BASE_URL}/completion"))
                .header("Authorization", format!("Api-Key {}", self.api_key))
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
                warn!("Yandex API returned {status}: {body}");
                last_error = Some(ProviderError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(ProviderError::Api {
                    status: status.as_u16(),
                    message: body,
                });
            }

            let parsed: CompletionResponse = response.json().await?;
            let text = parsed
                .result
                .alternatives
                .into_iter()
                .next()
                .and_then(|a| a.message.text)
                .map(|text| text.trim().to_string())
                .filter(|text| !text.is_empty());

            return match text {
                Some(text) => {
                    debug!("Yandex completion succeeded ({} chars)", text.len());
                    Ok(text)
                }
                None => Err(ProviderError::EmptyCompletion),
            };
        }

        Err(last_error.unwrap_or(ProviderError::RetriesExhausted(MAX_RETRIES)))
    }

    fn lookup(task: TaskType) -> Option<ModelConfig> {
        Some(match task {
            TaskType::CoverLetter => ModelConfig {
                model: COMPLETION_MODEL,
                temperature: Some(0.7),
                max_tokens: None,
            },
            TaskType::ResumeAnalysisHtml | TaskType::ResumeAnalysisText => ModelConfig {
                model: COMPLETION_MODEL,
                temperature: Some(0.1),
                max_tokens: None,
            },
            TaskType::PostingAnalysis => ModelConfig {
                model: COMPLETION_MODEL,
                temperature: Some(0.3),
                max_tokens: None,
            },
            TaskType::AvailabilityCheck => ModelConfig {
                model: COMPLETION_MODEL,
                temperature: Some(0.0),
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
impl Provider for YandexProvider {
    async fn generate_text(
        &self,
        prompt: &str,
        system: &str,
        config: ModelConfig,
    ) -> Result<String, ProviderError> {
        let request = CompletionRequest {
            model_uri: model_uri(config.model),
            completion_options: CompletionOptions {
                stream: false,
                temperature: config.temperature,
                max_tokens: config.max_tokens,
            },
            messages: vec![
                CompletionMessage {
                    role: "system",
                    text: system,
                },
                CompletionMessage {
                    role: "user",
                    text: prompt,
                },
            ],
        };

        self.complete(&request).await
    }

    async fn generate_embedding(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let config = self.task_config(TaskType::Embedding)?;
        let request = EmbeddingRequest {
            model_uri: model_uri(config.model),
            text,
        };

        let response = self
            .client
            .post(format!("{YANDEX_BASE_URL}/embedding"))
            .header("Authorization", format!("Api-Key {}", self.api_key))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let parsed: EmbeddingResponse = response.json().await?;
        if parsed.embedding.is_empty() {
            return Err(ProviderError::EmptyEmbedding);
        }
        Ok(parsed.embedding)
    }

    async fn check_availability(&self) -> bool {
        let request = CompletionRequest {
            model_uri: AVAILABILITY_MODEL_URI.to_string(),
            completion_options: CompletionOptions {
                stream: false,
                temperature: None,
                max_tokens: Some(10),
            },
            messages: vec![CompletionMessage {
                role: "user",
                text: AVAILABILITY_PROMPT,
            }],
        };

        let response = self
            .client
            .post(format!("{YANDEX_BASE_URL}/completion"))
            .header("Authorization", format!("Api-Key {}", self.api_key))
            .json(&request)
            .send()
            .await;

        match response {
            Ok(r) if r.status().is_success() => true,
            Ok(r) => {
                warn!("Yandex API unavailable: status {}", r.status());
                false
            }
            Err(e) => {
                warn!("Yandex API unavailable: {e}");
                false
            }
        }
    }

    fn task_config(&self, task: TaskType) -> Result<ModelConfig, ProviderError> {
        Self::lookup(task).ok_or(ProviderError::UnknownTask(task))
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Yandex
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_uri_uses_gpt_scheme() {
        assert_eq!(model_uri("yandexgpt"), "gpt://yandexgpt");
        assert_eq!(model_uri("yandexgpt-embedding"), "gpt://yandexgpt-embedding");
    }

    #[test]
    fn every_task_has_a_temperature() {
        let provider = YandexProvider::new("test-key".to_string());
        let cover = provider.task_config(TaskType::CoverLetter).unwrap();
        assert_eq!(cover.temperature, Some(0.7));
        let resume = provider.task_config(TaskType::ResumeAnalysisHtml).unwrap();
        assert_eq!(resume.temperature, Some(0.1));
        let posting = provider.task_config(TaskType::PostingAnalysis).unwrap();
        assert_eq!(posting.temperature, Some(0.3));
    }

    #[test]
    fn completion_request_serializes_camel_case() {
        let request = CompletionRequest {
            model_uri: model_uri(COMPLETION_MODEL),
            completion_options: CompletionOptions {
                stream: false,
                temperature: Some(0.3),
                max_tokens: None,
            },
            messages: vec![CompletionMessage {
                role: "user",
                text: "hello",
            }],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["modelUri"], "gpt://yandexgpt");
        assert_eq!(json["completionOptions"]["stream"], false);
        assert!(json["completionOptions"].get("maxTokens").is_none());
    }
}

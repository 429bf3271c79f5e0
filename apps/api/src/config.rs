use anyhow::{bail, Context, Result};

use crate::provider::ProviderKind;

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing; the service must never
/// run half-configured.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub ai_provider: ProviderKind,
    pub provider_api_key: String,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let ai_provider = match std::env::var("AI_PROVIDER") {
            Ok(value) => match ProviderKind::parse(&value) {
                Some(kind) => kind,
                None => bail!("Unsupported AI provider: {value}"),
            },
            Err(_) => ProviderKind::OpenAi,
        };

        // Only the active provider's credential is required.
        let provider_api_key = require_env(ai_provider.credential_var())?;

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            ai_provider,
            provider_api_key,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

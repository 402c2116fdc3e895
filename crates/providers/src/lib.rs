//! Model gateway implementations for agentloop.
//!
//! All providers implement the `agentloop_core::Provider` trait.
//! [`build_from_config`] picks the right one from an [`AppConfig`].

pub mod openai_compat;

pub use openai_compat::{OPENAI_BASE_URL, OPENROUTER_BASE_URL, OpenAiCompatProvider};

use std::sync::Arc;

use agentloop_config::AppConfig;
use agentloop_core::{Provider, ProviderError};

/// Build the configured provider.
///
/// Ollama needs no key. Hosted providers fail with
/// [`ProviderError::NotConfigured`] when the key is missing, so the caller
/// can report it before the first turn instead of on the first request.
pub fn build_from_config(config: &AppConfig) -> Result<Arc<dyn Provider>, ProviderError> {
    let provider = build(config)?;
    tracing::debug!(provider = %provider.name(), base_url = %provider.base_url(), "Provider ready");
    Ok(Arc::new(provider))
}

fn build(config: &AppConfig) -> Result<OpenAiCompatProvider, ProviderError> {
    let provider = match config.provider.as_str() {
        "ollama" => OpenAiCompatProvider::ollama(config.base_url.as_deref()),
        "openai" | "openrouter" => {
            let key = config.api_key.clone().ok_or_else(|| {
                ProviderError::NotConfigured(format!(
                    "provider '{}' needs an API key (set AGENTLOOP_API_KEY)",
                    config.provider
                ))
            })?;
            let default_url = if config.provider == "openai" {
                OPENAI_BASE_URL
            } else {
                OPENROUTER_BASE_URL
            };
            let url = config.base_url.as_deref().unwrap_or(default_url);
            OpenAiCompatProvider::new(config.provider.as_str(), url, key)
        }
        "custom" => {
            let url = config.base_url.clone().ok_or_else(|| {
                ProviderError::NotConfigured("provider 'custom' needs a base_url".into())
            })?;
            OpenAiCompatProvider::new("custom", url, config.api_key.clone().unwrap_or_default())
        }
        other => {
            return Err(ProviderError::NotConfigured(format!(
                "unknown provider '{other}'"
            )));
        }
    };
    Ok(provider)
}

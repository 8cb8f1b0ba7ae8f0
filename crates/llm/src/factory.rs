//! LLM provider factory.
//!
//! Builds the generation client named by configuration, injecting the
//! endpoint and API key it needs.

use crate::client::LlmClient;
use crate::providers::openai::{DEFAULT_GROQ_BASE_URL, DEFAULT_OPENAI_BASE_URL};
use crate::providers::{OllamaClient, OpenAiCompatClient};
use crate::types::ProviderType;
use docqa_core::{AppError, AppResult};
use std::sync::Arc;

/// Create an LLM client based on the provider name.
///
/// # Arguments
/// * `provider` - Provider identifier ("groq", "openai", "ollama")
/// * `endpoint` - Optional custom base URL
/// * `api_key` - API key for hosted providers
///
/// # Errors
/// Returns `AppError::Config` if the provider is unknown or a hosted
/// provider has no API key.
pub fn create_client(
    provider: &str,
    endpoint: Option<&str>,
    api_key: Option<&str>,
) -> AppResult<Arc<dyn LlmClient>> {
    let provider_type = ProviderType::parse(provider)
        .ok_or_else(|| AppError::Config(format!("Unknown provider: {}", provider)))?;

    let api_key = match (provider_type.requires_api_key(), api_key) {
        (true, None) => {
            return Err(AppError::Config(format!(
                "Provider '{}' requires an API key",
                provider_type.as_str()
            )))
        }
        (_, key) => key.unwrap_or_default(),
    };

    tracing::debug!(provider = provider_type.as_str(), endpoint = ?endpoint, "Creating LLM client");

    let client: Arc<dyn LlmClient> = match provider_type {
        ProviderType::Ollama => match endpoint {
            Some(base_url) => Arc::new(OllamaClient::with_base_url(base_url)),
            None => Arc::new(OllamaClient::new()),
        },
        ProviderType::Groq => Arc::new(OpenAiCompatClient::new(
            "groq",
            endpoint.unwrap_or(DEFAULT_GROQ_BASE_URL),
            api_key,
        )),
        ProviderType::OpenAI => Arc::new(OpenAiCompatClient::new(
            "openai",
            endpoint.unwrap_or(DEFAULT_OPENAI_BASE_URL),
            api_key,
        )),
    };

    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_ollama_client() {
        let client = create_client("ollama", None, None).unwrap();
        assert_eq!(client.provider_name(), "ollama");
    }

    #[test]
    fn test_create_ollama_with_custom_endpoint() {
        let client = create_client("ollama", Some("http://localhost:8080"), None);
        assert!(client.is_ok());
    }

    #[test]
    fn test_create_groq_client() {
        let client = create_client("groq", None, Some("gsk-test")).unwrap();
        assert_eq!(client.provider_name(), "groq");
    }

    #[test]
    fn test_hosted_providers_require_api_key() {
        for provider in ["groq", "openai"] {
            match create_client(provider, None, None) {
                Err(err) => assert!(err.to_string().contains("requires an API key")),
                Ok(_) => panic!("Expected error for {} without API key", provider),
            }
        }
    }

    #[test]
    fn test_unknown_provider() {
        match create_client("unknown", None, None) {
            Err(err) => assert!(err.to_string().contains("Unknown provider")),
            Ok(_) => panic!("Expected error for unknown provider"),
        }
    }
}

//! Provider construction from configuration.
//!
//! Builds the primary provider and, when configured, the secondary, and
//! wraps them in a [`FallbackProvider`].

use std::sync::Arc;
use std::time::Duration;

use verdant_config::{AppConfig, ProviderConfig};
use verdant_core::provider::Provider;

use crate::fallback::FallbackProvider;
use crate::openai_compat::OpenAiCompatProvider;

/// Build a single provider from its configuration.
pub fn build_provider(config: &ProviderConfig) -> Arc<dyn Provider> {
    let base_url = config
        .api_url
        .clone()
        .unwrap_or_else(|| default_base_url(&config.name));

    let mut keys = config.api_keys.clone();
    if keys.is_empty() && is_local(&config.name) {
        keys.push("local".into());
    }

    Arc::new(
        OpenAiCompatProvider::new(&config.name, base_url, &config.model, keys)
            .with_max_tokens(config.max_tokens),
    )
}

/// Build the primary→secondary chain from the application config.
pub fn build_from_config(config: &AppConfig) -> FallbackProvider {
    let primary = &config.providers.primary;
    let chain = FallbackProvider::new(
        "upstream",
        build_provider(primary),
        Duration::from_secs(primary.timeout_secs),
    );

    match &config.providers.fallback {
        Some(secondary) => chain.with_secondary(
            build_provider(secondary),
            Duration::from_secs(secondary.timeout_secs),
        ),
        None => chain,
    }
}

fn is_local(provider_name: &str) -> bool {
    matches!(provider_name, "ollama" | "vllm" | "llamacpp" | "llama.cpp")
}

/// Get the default base URL for well-known providers.
fn default_base_url(provider_name: &str) -> String {
    match provider_name {
        "openrouter" => "https://openrouter.ai/api/v1".into(),
        "openai" => "https://api.openai.com/v1".into(),
        "ollama" => "http://localhost:11434/v1".into(),
        "deepseek" => "https://api.deepseek.com/v1".into(),
        "groq" => "https://api.groq.com/openai/v1".into(),
        "together" => "https://api.together.xyz/v1".into(),
        "vllm" => "http://localhost:8000/v1".into(),
        "llamacpp" | "llama.cpp" => "http://localhost:8080/v1".into(),
        _ => format!("https://{provider_name}.api.example.com/v1"),
    }
}

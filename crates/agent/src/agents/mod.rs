//! Built-in agents.

pub mod llm;
pub mod profiles;

use std::sync::Arc;

use verdant_config::AppConfig;
use verdant_core::provider::Provider;
use verdant_telemetry::MetricsRegistry;

use crate::registry::AgentRegistry;

pub use llm::LlmAgent;

/// A registry holding the built-in agents, all sharing one provider.
pub fn default_registry(
    config: &AppConfig,
    provider: Arc<dyn Provider>,
    metrics: Arc<MetricsRegistry>,
) -> AgentRegistry {
    let registry = AgentRegistry::new(config.scoring.clone(), metrics);
    for profile in profiles::builtin() {
        let agent = LlmAgent::new(profile, provider.clone(), &config.agent)
            .with_max_tokens(config.providers.primary.max_tokens);
        registry.register(Arc::new(agent));
    }
    registry
}

//! Provider fallback: one primary, at most one secondary.
//!
//! When the primary fails (error or timeout), the identical request is
//! sent once to the secondary. There is no further retry and no backoff
//! at this layer.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use verdant_core::error::ProviderError;
use verdant_core::provider::*;

/// A provider that tries a primary and then, once, a secondary.
pub struct FallbackProvider {
    name: String,
    primary: FallbackEntry,
    secondary: Option<FallbackEntry>,
}

/// A single entry in the fallback pair.
struct FallbackEntry {
    provider: Arc<dyn verdant_core::Provider>,
    timeout: Duration,
}

impl FallbackEntry {
    /// Run one attempt, mapping an elapsed timeout to `ProviderError::Timeout`.
    async fn attempt(
        &self,
        request: CompletionRequest,
    ) -> std::result::Result<CompletionResponse, ProviderError> {
        let provider_name = self.provider.name();
        match tokio::time::timeout(self.timeout, self.provider.complete(request)).await {
            Ok(Ok(mut response)) => {
                if response.provider.is_empty() {
                    response.provider = provider_name.to_string();
                }
                Ok(response)
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(ProviderError::Timeout(format!(
                "Provider '{}' timed out after {}s",
                provider_name,
                self.timeout.as_secs_f32()
            ))),
        }
    }
}

impl FallbackProvider {
    /// Create a fallback provider around a primary with the given timeout.
    pub fn new(
        name: impl Into<String>,
        primary: Arc<dyn verdant_core::Provider>,
        timeout: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            primary: FallbackEntry {
                provider: primary,
                timeout,
            },
            secondary: None,
        }
    }

    /// Set the secondary provider. Replaces any previous secondary.
    pub fn with_secondary(
        mut self,
        provider: Arc<dyn verdant_core::Provider>,
        timeout: Duration,
    ) -> Self {
        self.secondary = Some(FallbackEntry { provider, timeout });
        self
    }

    pub fn has_secondary(&self) -> bool {
        self.secondary.is_some()
    }

    /// Names of the providers in attempt order.
    pub fn chain(&self) -> Vec<&str> {
        std::iter::once(&self.primary)
            .chain(&self.secondary)
            .map(|e| e.provider.name())
            .collect()
    }
}

#[async_trait]
impl verdant_core::Provider for FallbackProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> std::result::Result<CompletionResponse, ProviderError> {
        let primary_error = match self.primary.attempt(request.clone()).await {
            Ok(response) => return Ok(response),
            Err(e) => e,
        };

        let Some(secondary) = &self.secondary else {
            warn!(
                provider = %self.primary.provider.name(),
                error = %primary_error,
                "Fallback: primary failed, no secondary configured"
            );
            return Err(primary_error);
        };

        warn!(
            provider = %self.primary.provider.name(),
            error = %primary_error,
            "Fallback: primary failed, trying secondary"
        );
        info!(provider = %secondary.provider.name(), "Fallback: trying secondary provider");

        secondary.attempt(request).await.inspect_err(|e| {
            warn!(
                provider = %secondary.provider.name(),
                error = %e,
                "Fallback: secondary failed"
            );
        })
    }
}

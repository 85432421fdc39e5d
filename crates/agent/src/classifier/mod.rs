//! Intent classification.
//!
//! One structured prompt goes to the upstream provider (which itself falls
//! over from primary to secondary at most once). The reply must hold a
//! single JSON object. Any failure, transport or parse, degrades to the
//! fallback intent instead of surfacing as an error.

pub mod parse;
pub mod prompt;

use std::sync::Arc;

use tracing::{debug, warn};
use verdant_config::ClassifierConfig;
use verdant_core::context::RequestContext;
use verdant_core::error::Error;
use verdant_core::intent::Intent;
use verdant_core::provider::{CompletionRequest, Provider};

pub use parse::parse_intent;
pub use prompt::{PromptBuilder, PromptDocument, PromptSection};

pub struct IntentClassifier {
    provider: Arc<dyn Provider>,
    config: ClassifierConfig,
}

impl IntentClassifier {
    pub fn new(provider: Arc<dyn Provider>, config: ClassifierConfig) -> Self {
        Self { provider, config }
    }

    /// The prompt document that `classify` would send.
    pub fn prompt(&self, user_message: &str, context: &RequestContext) -> PromptDocument {
        PromptBuilder::new(&self.config).build(user_message, context)
    }

    /// Classify a message. Never fails: total failure yields [`Intent::fallback`].
    pub async fn classify(&self, user_message: &str, context: &RequestContext) -> Intent {
        match self.try_classify(user_message, context).await {
            Ok(intent) => {
                debug!(
                    intent_type = %intent.intent_type,
                    image_intent = %intent.image_intent,
                    confidence = intent.confidence,
                    "Classified intent"
                );
                intent
            }
            Err(e) => {
                warn!(error = %e, kind = e.kind(), "Intent classification degraded to fallback");
                Intent::fallback(e)
            }
        }
    }

    /// Classify, surfacing the failure cause instead of degrading.
    pub async fn try_classify(
        &self,
        user_message: &str,
        context: &RequestContext,
    ) -> Result<Intent, Error> {
        let request = CompletionRequest::new(self.prompt(user_message, context).render())
            .with_temperature(self.config.temperature)
            .with_max_tokens(self.config.max_tokens)
            .json();

        let response = self.provider.complete(request).await?;
        debug!(provider = %response.provider, model = %response.model, "Classifier replied");
        Ok(parse_intent(&response.text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ContextBuilder;
    use crate::test_helpers::SequentialMockProvider;
    use verdant_config::ContextConfig;
    use verdant_core::error::ProviderError;
    use verdant_core::intent::{FALLBACK_CONFIDENCE, ImageIntent, IntentType};

    fn context(message: &str) -> RequestContext {
        ContextBuilder::new(ContextConfig::default()).build(message, &[], vec![], None)
    }

    #[tokio::test]
    async fn returns_parsed_intent() {
        let provider = Arc::new(SequentialMockProvider::texts(&[
            r#"{"type":"consultation","subtype":"plantSelection","confidence":0.9,"imageIntent":"noImageNeeded"}"#,
        ]));
        let classifier = IntentClassifier::new(provider.clone(), ClassifierConfig::default());
        let msg = "Какие растения подходят для тени?";
        let intent = classifier.classify(msg, &context(msg)).await;
        assert_eq!(intent.intent_type, IntentType::Consultation);
        assert_eq!(intent.image_intent, ImageIntent::NoImageNeeded);
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn sends_json_mode_prompt_with_message() {
        let provider = Arc::new(SequentialMockProvider::texts(&["{}"]));
        let classifier = IntentClassifier::new(provider.clone(), ClassifierConfig::default());
        classifier.classify("hello garden", &context("hello garden")).await;

        let requests = provider.requests();
        assert!(requests[0].json_mode);
        assert!(requests[0].prompt.contains("[Current Message]\nhello garden"));
        assert!((requests[0].temperature - 0.1).abs() < 1e-6);
    }

    #[tokio::test]
    async fn provider_failure_degrades() {
        let provider = Arc::new(SequentialMockProvider::new(vec![Err(
            ProviderError::Network("connection refused".into()),
        )]));
        let classifier = IntentClassifier::new(provider, ClassifierConfig::default());
        let intent = classifier.classify("hi", &context("hi")).await;
        assert_eq!(intent.intent_type, IntentType::Unclear);
        assert_eq!(intent.confidence, FALLBACK_CONFIDENCE);
        assert!(intent.failure.as_deref().is_some_and(|f| f.contains("connection refused")));
        assert!(intent.is_degraded());
    }

    #[tokio::test]
    async fn malformed_reply_is_not_retried() {
        let provider = Arc::new(SequentialMockProvider::texts(&["no json here", "{}"]));
        let classifier = IntentClassifier::new(provider.clone(), ClassifierConfig::default());
        let intent = classifier.classify("hi", &context("hi")).await;
        assert!(intent.is_degraded());
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn try_classify_reports_cause() {
        let provider = Arc::new(SequentialMockProvider::texts(&["```json\n{not json}\n```"]));
        let classifier = IntentClassifier::new(provider, ClassifierConfig::default());
        let err = classifier.try_classify("hi", &context("hi")).await.unwrap_err();
        assert_eq!(err.kind(), "parse_error");
    }
}

//! An agent that answers by calling the upstream model with its own system prompt.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};
use verdant_config::AgentConfig;
use verdant_core::agent::{Agent, AgentOutput, AgentProfile, AgentRequest};
use verdant_core::context::Language;
use verdant_core::error::Error;
use verdant_core::provider::{CompletionRequest, Provider};

pub struct LlmAgent {
    profile: AgentProfile,
    provider: Arc<dyn Provider>,
    temperature: f32,
    history_turns: usize,
    max_tokens: Option<u32>,
}

impl LlmAgent {
    pub fn new(profile: AgentProfile, provider: Arc<dyn Provider>, config: &AgentConfig) -> Self {
        Self {
            profile,
            provider,
            temperature: config.temperature,
            history_turns: config.history_turns,
            max_tokens: None,
        }
    }

    /// Set the max tokens per response.
    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    /// System prompt plus the language instruction and earlier image notes.
    fn system_message(&self, request: &AgentRequest) -> String {
        let context = &request.context;
        let mut system = self.profile.system_prompt.clone();

        match context.language {
            Some(Language::Ru) => system.push_str("\n\nAnswer in Russian."),
            Some(Language::En) => system.push_str("\n\nAnswer in English."),
            None => system.push_str("\n\nAnswer in the language the user writes in."),
        }

        if !context.recent_image_analyses.is_empty() {
            system.push_str("\n\n[Earlier Image Analyses]\n");
            for (i, note) in context.recent_image_analyses.iter().enumerate() {
                system.push_str(&format!("{}. {}\n", i + 1, note));
            }
        }
        system
    }

    fn completion_request(&self, request: &AgentRequest) -> CompletionRequest {
        let context = &request.context;
        let mut completion = CompletionRequest::new(context.user_message.clone())
            .with_system(self.system_message(request))
            .with_history(context.recent_turns(self.history_turns).to_vec())
            .with_images(context.images().cloned().collect())
            .with_temperature(self.temperature);
        if let Some(max) = self.max_tokens {
            completion = completion.with_max_tokens(max);
        }
        completion
    }
}

#[async_trait]
impl Agent for LlmAgent {
    fn profile(&self) -> &AgentProfile {
        &self.profile
    }

    async fn execute(&self, request: &AgentRequest) -> Result<AgentOutput, Error> {
        let completion = self.completion_request(request);
        debug!(
            agent_id = %self.profile.id,
            history = completion.history.len(),
            images = completion.images.len(),
            "Calling model"
        );

        let response = self
            .provider
            .complete(completion)
            .await
            .map_err(|e| Error::Execution {
                agent_id: self.profile.id.clone(),
                reason: e.to_string(),
            })?;

        if response.text.trim().is_empty() && response.images.is_empty() {
            return Err(Error::Execution {
                agent_id: self.profile.id.clone(),
                reason: "model returned an empty response".into(),
            });
        }

        info!(
            agent_id = %self.profile.id,
            provider = %response.provider,
            model = %response.model,
            images = response.images.len(),
            "Agent produced a response"
        );

        let mut metadata = serde_json::Map::new();
        metadata.insert("model".into(), response.model.into());
        metadata.insert("provider".into(), response.provider.into());
        if let Some(usage) = response.usage {
            metadata.insert("total_tokens".into(), usage.total_tokens.into());
        }

        Ok(AgentOutput {
            message: response.text,
            attachments: response.images,
            metadata,
        })
    }
}

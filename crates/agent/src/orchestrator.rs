//! The request pipeline.
//!
//! ```text
//! message + history + attachments
//!       │
//!       ▼
//! ContextBuilder ─► IntentClassifier ─► ImageSelector
//!                                            │
//!                       context + selected images
//!                                            ▼
//!                     AgentRegistry::select_agent ─► Agent::execute
//!                                            │
//!                                            ▼
//!                                      AgentResponse
//! ```
//!
//! Every stage is timed into a [`RequestTrace`]. Errors and panics are
//! converted into a failed [`AgentResponse`]; nothing escapes
//! [`Orchestrator::process_request`].

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;
use serde::Serialize;
use tracing::{debug, error, info, warn};
use verdant_config::AppConfig;
use verdant_core::agent::{AgentRequest, AgentResponse, ResponseError};
use verdant_core::context::RequestContext;
use verdant_core::error::Error;
use verdant_core::intent::Intent;
use verdant_core::message::{Attachment, Message};
use verdant_core::provider::Provider;
use verdant_telemetry::{MetricsRegistry, RequestTrace, Stage};

use crate::agents::default_registry;
use crate::classifier::IntentClassifier;
use crate::context::ContextBuilder;
use crate::images::ImageSelector;
use crate::registry::AgentRegistry;
use crate::scoring::ScoreBreakdown;

/// What the pipeline decided for a message, without executing an agent.
#[derive(Debug, Clone, Serialize)]
pub struct RoutingPreview {
    pub intent: Intent,
    pub selected_image_ids: Vec<String>,
    pub agent_id: Option<String>,
    pub score: Option<ScoreBreakdown>,
    #[serde(skip)]
    pub context: RequestContext,
}

pub struct Orchestrator {
    context_builder: ContextBuilder,
    classifier: IntentClassifier,
    selector: ImageSelector,
    registry: Arc<AgentRegistry>,
    metrics: Arc<MetricsRegistry>,
}

impl Orchestrator {
    pub fn new(
        config: &AppConfig,
        provider: Arc<dyn Provider>,
        registry: Arc<AgentRegistry>,
    ) -> Self {
        Self {
            context_builder: ContextBuilder::new(config.context.clone()),
            classifier: IntentClassifier::new(provider, config.classifier.clone()),
            selector: ImageSelector::new(config.selection.clone()),
            metrics: registry.metrics().clone(),
            registry,
        }
    }

    /// Wire the configured provider chain and the built-in agents.
    pub fn from_config(config: &AppConfig) -> Self {
        let provider: Arc<dyn Provider> = Arc::new(verdant_providers::build_from_config(config));
        let metrics = Arc::new(MetricsRegistry::new(config.metrics.sample_cap));
        let registry = Arc::new(default_registry(config, provider.clone(), metrics));
        Self::new(config, provider, registry)
    }

    pub fn registry(&self) -> &Arc<AgentRegistry> {
        &self.registry
    }

    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.metrics
    }

    /// Run one request through the pipeline. Always returns a response.
    pub async fn process_request(
        &self,
        user_message: &str,
        history: &[Message],
        attachments: Vec<Attachment>,
        current_agent_id: Option<&str>,
    ) -> AgentResponse {
        let started = Instant::now();
        let mut trace = RequestTrace::new();

        let outcome = AssertUnwindSafe(self.run(
            user_message,
            history,
            attachments,
            current_agent_id,
            &mut trace,
        ))
        .catch_unwind()
        .await;
        let elapsed_ms = elapsed_ms(started);

        let mut response = match outcome {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                warn!(request_id = %trace.id, kind = e.kind(), error = %e, "Request failed");
                trace.error_kind = Some(e.kind().to_string());
                AgentResponse::failed(&e, elapsed_ms)
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!(request_id = %trace.id, panic = %message, "Request panicked");
                // A panic inside the agent still counts against it.
                if let Some(agent_id) = &trace.agent_id
                    && trace.duration_of(Stage::ExecuteAgent).is_none()
                {
                    self.metrics.record_agent_execution(agent_id, elapsed_ms, false);
                }
                trace.error_kind = Some("panic".into());
                panic_response(message, elapsed_ms)
            }
        };

        if response.selected_agent.is_none() {
            response.selected_agent = trace.agent_id.clone();
        }
        trace.record(Stage::Total, elapsed_ms, response.success);
        response.metadata.insert("request_id".into(), trace.id.clone().into());
        response.metadata.insert("elapsed_ms".into(), elapsed_ms.into());
        response.metadata.insert("timings_ms".into(), trace.timings_json());

        info!(
            request_id = %trace.id,
            success = response.success,
            agent_id = response.selected_agent.as_deref().unwrap_or("-"),
            elapsed_ms,
            "Request complete"
        );
        self.metrics.record_trace(trace);
        response
    }

    /// Build context, classify, select images and pick an agent, without executing it.
    pub async fn preview(
        &self,
        user_message: &str,
        history: &[Message],
        attachments: Vec<Attachment>,
        current_agent_id: Option<&str>,
    ) -> RoutingPreview {
        let context = self
            .context_builder
            .build(user_message, history, attachments, current_agent_id);
        let intent = self.classifier.classify(user_message, &context).await;
        let selected = self.select_images(&context, &intent);
        let selected_image_ids = selected.iter().map(|a| a.id.clone()).collect();
        let request = AgentRequest::new(context.with_selected_images(selected), intent);

        let (agent_id, score) = match self.registry.select_agent(&request) {
            Ok(selection) => (Some(selection.agent.id().to_string()), Some(selection.score)),
            Err(e) => {
                debug!(error = %e, "No agent for preview");
                (None, None)
            }
        };
        RoutingPreview {
            intent: request.intent,
            selected_image_ids,
            agent_id,
            score,
            context: request.context,
        }
    }

    async fn run(
        &self,
        user_message: &str,
        history: &[Message],
        attachments: Vec<Attachment>,
        current_agent_id: Option<&str>,
        trace: &mut RequestTrace,
    ) -> Result<AgentResponse, Error> {
        let stage = Instant::now();
        let context = self
            .context_builder
            .build(user_message, history, attachments, current_agent_id);
        trace.record(Stage::BuildContext, elapsed_ms(stage), true);

        let stage = Instant::now();
        let intent = self.classifier.classify(user_message, &context).await;
        trace.record(Stage::ClassifyIntent, elapsed_ms(stage), !intent.is_degraded());

        let stage = Instant::now();
        let selected = self.select_images(&context, &intent);
        trace.record(Stage::SelectImages, elapsed_ms(stage), true);

        let request = AgentRequest::new(context.with_selected_images(selected), intent);

        let stage = Instant::now();
        let selection = self.registry.select_agent(&request);
        trace.record(Stage::SelectAgent, elapsed_ms(stage), selection.is_ok());
        let selection = selection?;
        let agent_id = selection.agent.id().to_string();
        trace.agent_id = Some(agent_id.clone());
        debug!(
            agent_id = %agent_id,
            score = selection.score.total(),
            candidates = selection.candidates,
            "Selected agent"
        );

        let stage = Instant::now();
        let result = selection.agent.execute(&request).await;
        let execute_ms = elapsed_ms(stage);
        trace.record(Stage::ExecuteAgent, execute_ms, result.is_ok());
        self.metrics
            .record_agent_execution(&agent_id, execute_ms, result.is_ok());
        let output = result?;

        let mut response = AgentResponse::completed(agent_id, output);
        response.metadata.insert("intent".into(), serde_json::to_value(&request.intent)?);
        response.metadata.insert(
            "selected_image_ids".into(),
            request
                .context
                .attachments
                .iter()
                .map(|a| a.id.clone())
                .collect::<Vec<_>>()
                .into(),
        );
        response
            .metadata
            .insert("score".into(), serde_json::to_value(&selection.score)?);
        Ok(response)
    }

    /// The orchestrator passes the context's own attachments, new or borrowed,
    /// as the current ones.
    fn select_images(&self, context: &RequestContext, intent: &Intent) -> Vec<Attachment> {
        self.selector
            .select(&context.history, intent, &context.attachments)
            .into_iter()
            .cloned()
            .collect()
    }
}

fn elapsed_ms(since: Instant) -> u64 {
    u64::try_from(since.elapsed().as_millis()).unwrap_or(u64::MAX)
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".into())
}

fn panic_response(message: String, elapsed_ms: u64) -> AgentResponse {
    AgentResponse {
        success: false,
        message: Some("Sorry, something went wrong while processing the request.".into()),
        selected_agent: None,
        generated_attachments: None,
        error: Some(ResponseError {
            kind: "panic".into(),
            message,
            elapsed_ms,
        }),
        metadata: serde_json::Map::new(),
    }
}

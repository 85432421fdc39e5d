//! End-to-end tests for the Verdant orchestration core.
//!
//! These tests drive the full pipeline from user input to `AgentResponse`
//! with scripted providers standing in for the upstream models.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use verdant_agent::{ContextBuilder, ImageSelector, IntentClassifier, Orchestrator, default_registry};
use verdant_config::AppConfig;
use verdant_core::agent::AgentResponse;
use verdant_core::error::ProviderError;
use verdant_core::intent::{FALLBACK_CONFIDENCE, ImageIntent, IntentType};
use verdant_core::message::{Attachment, Message};
use verdant_core::provider::{CompletionRequest, CompletionResponse, Provider, Usage};
use verdant_providers::FallbackProvider;
use verdant_telemetry::{MetricsRegistry, Stage};

// ── Scripted providers ───────────────────────────────────────────────────

/// Returns scripted results in order and records every request.
struct ScriptedProvider {
    name: &'static str,
    responses: Mutex<VecDeque<Result<CompletionResponse, ProviderError>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedProvider {
    fn new(name: &'static str, responses: Vec<Result<CompletionResponse, ProviderError>>) -> Self {
        Self {
            name,
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Classification reply first, agent reply second.
    fn classify_then_answer(intent_json: &str, answer: &str) -> Self {
        Self::new(
            "e2e_mock",
            vec![Ok(text_response(intent_json)), Ok(text_response(answer))],
        )
    }

    fn failing(name: &'static str, calls: usize) -> Self {
        Self::new(
            name,
            (0..calls)
                .map(|_| Err(ProviderError::Network("connection refused".into())))
                .collect(),
        )
    }

    fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        self.name
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ProviderError> {
        let mut requests = self.requests.lock().unwrap();
        let call = requests.len();
        requests.push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("ScriptedProvider '{}' exhausted at call #{call}", self.name))
    }
}

/// Answers classification calls with a fixed intent and everything else with
/// an echo of the prompt. Order-independent, for concurrent tests.
struct RoutingProvider {
    intent_json: &'static str,
}

#[async_trait::async_trait]
impl Provider for RoutingProvider {
    fn name(&self) -> &str {
        "routing_mock"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ProviderError> {
        if request.json_mode {
            Ok(text_response(self.intent_json))
        } else {
            Ok(text_response(&format!("re: {}", request.prompt)))
        }
    }
}

fn text_response(text: &str) -> CompletionResponse {
    CompletionResponse {
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        ..CompletionResponse::text(text, "mock-model")
    }
}

fn image(id: &str) -> Attachment {
    Attachment::image(vec![0xFF, 0xD8, 0xFF], "image/jpeg").with_id(id)
}

fn orchestrator_with(provider: Arc<dyn Provider>) -> Orchestrator {
    let config = AppConfig::default();
    let metrics = Arc::new(MetricsRegistry::new(config.metrics.sample_cap));
    let registry = Arc::new(default_registry(&config, provider.clone(), metrics));
    Orchestrator::new(&config, provider, registry)
}

fn selected_ids(response: &AgentResponse) -> Vec<String> {
    serde_json::from_value(response.metadata["selected_image_ids"].clone()).unwrap()
}

// ── Scenarios ────────────────────────────────────────────────────────────

#[tokio::test]
async fn scenario_a_new_photo_is_analysed() {
    let provider = Arc::new(ScriptedProvider::classify_then_answer(
        r#"```json
{"type":"analysis","subtype":"siteAnalysis","confidence":0.92,"imageIntent":"analyzeNew","reasoning":"photo of a plot"}
```"#,
        "Участок солнечный, почва песчаная.",
    ));
    let orchestrator = orchestrator_with(provider.clone());

    let response = orchestrator
        .process_request("Проанализируй это фото участка", &[], vec![image("image1")], None)
        .await;

    assert!(response.success, "{response:?}");
    assert_eq!(response.metadata["intent"]["type"], "analysis");
    assert_eq!(response.metadata["intent"]["imageIntent"], "analyzeNew");
    assert_eq!(selected_ids(&response), vec!["image1"]);
    assert_eq!(response.selected_agent.as_deref(), Some("site_analyst"));

    let agent_call = &provider.requests()[1];
    assert_eq!(agent_call.images.len(), 1);
    assert_eq!(agent_call.images[0].id, "image1");
    assert!(agent_call.system.as_deref().unwrap().contains("Answer in Russian."));
}

#[tokio::test]
async fn scenario_b_ordinal_reference_to_history_image() {
    let provider = Arc::new(ScriptedProvider::classify_then_answer(
        r#"{"type":"analysis","subtype":"plantIdentification","confidence":0.8,"imageIntent":"referenceSpecific","referencedImageIndices":[0]}"#,
        "На первом фото туя.",
    ));
    let orchestrator = orchestrator_with(provider.clone());
    let history = vec![
        Message::user("Вот мой участок").with_attachments(vec![image("image1")]),
        Message::assistant("Вижу, красивый участок."),
    ];

    let response = orchestrator
        .process_request("А что насчет первого фото?", &history, vec![], None)
        .await;

    assert!(response.success, "{response:?}");
    assert_eq!(response.metadata["intent"]["imageIntent"], "referenceSpecific");
    assert_eq!(
        response.metadata["intent"]["referencedImageIndices"],
        serde_json::json!([0])
    );
    assert_eq!(selected_ids(&response), vec!["image1"]);

    let prompt = &provider.requests()[0].prompt;
    assert!(prompt.contains("images in conversation: 1"));
    assert!(prompt.contains("user: Вот мой участок [1 image(s)]"));
}

#[tokio::test]
async fn scenario_c_text_only_question() {
    let provider = Arc::new(ScriptedProvider::classify_then_answer(
        r#"{"type":"consultation","subtype":"plantSelection","confidence":0.9,"imageIntent":"noImageNeeded"}"#,
        "Хосты, папоротники, астильбы.",
    ));
    let orchestrator = orchestrator_with(provider.clone());

    let response = orchestrator
        .process_request("Какие растения подходят для тени?", &[], vec![], None)
        .await;

    assert!(response.success);
    assert_eq!(response.metadata["intent"]["imageIntent"], "noImageNeeded");
    assert!(selected_ids(&response).is_empty());
    assert_eq!(response.selected_agent.as_deref(), Some("garden_consultant"));
    assert!(provider.requests()[1].images.is_empty());
}

#[tokio::test]
async fn scenario_d_both_providers_fail() {
    let primary = Arc::new(ScriptedProvider::failing("primary", 2));
    let secondary = Arc::new(ScriptedProvider::failing("secondary", 2));
    let upstream: Arc<dyn Provider> = Arc::new(
        FallbackProvider::new("upstream", primary.clone(), Duration::from_secs(5))
            .with_secondary(secondary.clone(), Duration::from_secs(5)),
    );

    // The classifier degrades instead of failing.
    let config = AppConfig::default();
    let classifier = IntentClassifier::new(upstream.clone(), config.classifier.clone());
    let context = ContextBuilder::new(config.context.clone()).build("Привет", &[], vec![], None);
    let intent = classifier.classify("Привет", &context).await;
    assert_eq!(intent.intent_type, IntentType::Unclear);
    assert_eq!(intent.image_intent, ImageIntent::Unclear);
    assert_eq!(intent.confidence, FALLBACK_CONFIDENCE);
    assert!(intent.failure.as_deref().is_some_and(|f| f.contains("connection refused")));
    assert_eq!((primary.calls(), secondary.calls()), (1, 1));

    // The whole request still produces a response.
    let orchestrator = orchestrator_with(upstream);
    let response = orchestrator.process_request("Привет", &[], vec![], None).await;
    assert!(!response.success);
    assert!(response.message.is_some());
    let error = response.error.as_ref().unwrap();
    assert_eq!(error.kind, "execution_error");

    // Exactly one hand-off per call: classify + execute on each provider.
    assert_eq!((primary.calls(), secondary.calls()), (2, 2));

    let classify = orchestrator.metrics().stage_stats(Stage::ClassifyIntent);
    assert_eq!((classify.count, classify.failures), (1, 1));
}

// ── Properties ───────────────────────────────────────────────────────────

#[tokio::test]
async fn secondary_provider_answers_when_primary_fails() {
    let primary = Arc::new(ScriptedProvider::new(
        "primary",
        vec![Err(ProviderError::QuotaExceeded("monthly limit".into()))],
    ));
    let secondary = Arc::new(ScriptedProvider::new(
        "secondary",
        vec![Ok(text_response(
            r#"{"type":"generation","subtype":"visualization","confidence":0.7,"imageIntent":"generateBased"}"#,
        ))],
    ));
    let upstream: Arc<dyn Provider> = Arc::new(
        FallbackProvider::new("upstream", primary.clone(), Duration::from_secs(5))
            .with_secondary(secondary.clone(), Duration::from_secs(5)),
    );

    let config = AppConfig::default();
    let context = ContextBuilder::new(config.context.clone()).build(
        "Нарисуй клумбу на этом месте",
        &[],
        vec![image("spot")],
        None,
    );
    let intent = IntentClassifier::new(upstream, config.classifier.clone())
        .classify("Нарисуй клумбу на этом месте", &context)
        .await;

    assert_eq!(intent.intent_type, IntentType::Generation);
    assert_eq!(intent.image_intent, ImageIntent::GenerateBased);
    assert!(!intent.is_degraded());
    assert_eq!((primary.calls(), secondary.calls()), (1, 1));
    assert_eq!(
        primary.requests()[0].prompt,
        secondary.requests()[0].prompt,
        "secondary must get the identical prompt"
    );
}

#[tokio::test]
async fn transient_messages_never_reach_a_model() {
    let provider = Arc::new(ScriptedProvider::classify_then_answer(
        r#"{"type":"consultation","imageIntent":"noImageNeeded","confidence":0.6}"#,
        "ok",
    ));
    let orchestrator = orchestrator_with(provider.clone());

    let mut typing = Message::assistant("TYPING_PLACEHOLDER");
    typing.is_typing = true;
    let mut failed = Message::assistant("ERROR_BUBBLE");
    failed.is_error = true;
    let history = vec![
        Message::user("Как поливать розы?"),
        Message::assistant("Раз в неделю, обильно."),
        typing,
        failed,
    ];

    let response = orchestrator
        .process_request("А летом?", &history, vec![], None)
        .await;
    assert!(response.success);

    for request in provider.requests() {
        let rendered = serde_json::to_string(&request).unwrap();
        assert!(!rendered.contains("TYPING_PLACEHOLDER"));
        assert!(!rendered.contains("ERROR_BUBBLE"));
    }
    let agent_call = &provider.requests()[1];
    assert_eq!(agent_call.history.len(), 2);
    assert!(provider.requests()[0].prompt.contains("Как поливать розы?"));
}

#[tokio::test]
async fn no_image_intents_select_nothing_even_with_images_around() {
    for image_intent in ["noImageNeeded", "unclear"] {
        let reply = format!(r#"{{"type":"consultation","imageIntent":"{image_intent}","confidence":0.5}}"#);
        let provider = Arc::new(ScriptedProvider::classify_then_answer(&reply, "ok"));
        let orchestrator = orchestrator_with(provider.clone());
        let history = vec![Message::user("фото").with_attachments(vec![image("old")])];

        let response = orchestrator
            .process_request("Что скажешь?", &history, vec![image("new")], None)
            .await;

        assert!(response.success);
        assert!(selected_ids(&response).is_empty(), "{image_intent}");
        assert!(provider.requests()[1].images.is_empty());
    }
}

#[test]
fn reference_specific_selects_exactly_the_indexed_image() {
    let history = vec![
        Message::user("first").with_attachments(vec![image("a"), image("b")]),
        Message::assistant("nice"),
        Message::user("second").with_attachments(vec![image("c")]),
    ];
    let selector = ImageSelector::new(AppConfig::default().selection);
    let intent_for = |indices: Vec<usize>| {
        verdant_core::intent::Intent::new(IntentType::Analysis, ImageIntent::ReferenceSpecific, 0.9)
            .with_references(indices)
    };

    let ids = |indices: Vec<usize>| -> Vec<String> {
        selector
            .select(&history, &intent_for(indices), &[])
            .into_iter()
            .map(|a| a.id.clone())
            .collect()
    };
    assert_eq!(ids(vec![0]), vec!["a"]);
    assert_eq!(ids(vec![2]), vec!["c"]);
    assert!(ids(vec![3]).is_empty());
}

#[test]
fn context_building_is_idempotent() {
    let builder = ContextBuilder::new(AppConfig::default().context);
    let history = vec![
        Message::user("Вот участок").with_attachments(vec![image("p1")]),
        Message::assistant("Глина, северный склон.").with_image_analysis("clay, north slope"),
    ];
    let at = history[0].timestamp;

    let first = builder.build_at("И что посадить?", &history, vec![], Some("site_analyst"), at);
    let second = builder.build_at("И что посадить?", &history, vec![], Some("site_analyst"), at);
    assert_eq!(first, second);
    assert!(first.attachments_borrowed);
    assert_eq!(first.recent_image_analyses, vec!["clay, north slope"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_share_metrics() {
    let orchestrator = Arc::new(orchestrator_with(Arc::new(RoutingProvider {
        intent_json: r#"{"type":"consultation","imageIntent":"noImageNeeded","confidence":0.8}"#,
    })));

    let handles: Vec<_> = (0..16)
        .map(|i| {
            let orchestrator = orchestrator.clone();
            tokio::spawn(async move {
                orchestrator
                    .process_request(&format!("Как ухаживать за розой {i}?"), &[], vec![], None)
                    .await
            })
        })
        .collect();

    for handle in handles {
        let response = handle.await.unwrap();
        assert!(response.success);
        assert!(response.message.unwrap().starts_with("re: "));
    }

    let snapshot = orchestrator.metrics().snapshot();
    assert_eq!(snapshot.requests, 16);
    assert_eq!(snapshot.failed_requests, 0);
    let consultant = orchestrator.metrics().agent_metrics("garden_consultant").unwrap();
    assert_eq!(consultant.success_count, 16);
    assert_eq!(orchestrator.metrics().stage_stats(Stage::Total).count, 16);
}

#[tokio::test]
async fn default_config_file_drives_the_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, AppConfig::default_toml()).unwrap();
    let config = AppConfig::load_from(&path).unwrap();

    let provider: Arc<dyn Provider> = Arc::new(RoutingProvider {
        intent_json: r#"{"type":"generation","subtype":"visualization","imageIntent":"generateBased","confidence":0.9}"#,
    });
    let metrics = Arc::new(MetricsRegistry::new(config.metrics.sample_cap));
    let registry = Arc::new(default_registry(&config, provider.clone(), metrics));
    let orchestrator = Orchestrator::new(&config, provider, registry);

    let response = orchestrator
        .process_request("Нарисуй дизайн клумбы", &[], vec![image("bed"), image("extra")], None)
        .await;
    assert!(response.success);
    assert_eq!(selected_ids(&response), vec!["bed"]);
    assert_eq!(response.selected_agent.as_deref(), Some("landscape_designer"));
}

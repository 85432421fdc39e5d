//! Agents: specialized responders and the request/response envelope.
//!
//! An agent declares a finite set of capabilities, a system prompt and
//! domain keyword lists. The orchestrator asks every registered agent
//! whether it can handle a request, scores the survivors, and executes
//! the winner.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::context::RequestContext;
use crate::error::Error;
use crate::intent::{Intent, IntentType};
use crate::message::Attachment;

/// A single thing an agent can do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Capability {
    Consultation,
    Analysis,
    TextGeneration,
    ImageGeneration,
    ImageAnalysis,
    ImageEditing,
    // domain specialties
    PlantCare,
    LandscapeDesign,
    SiteAssessment,
}

impl Capability {
    pub const ALL: [Capability; 9] = [
        Self::Consultation,
        Self::Analysis,
        Self::TextGeneration,
        Self::ImageGeneration,
        Self::ImageAnalysis,
        Self::ImageEditing,
        Self::PlantCare,
        Self::LandscapeDesign,
        Self::SiteAssessment,
    ];

    fn bit(self) -> u16 {
        1 << (self as u16)
    }

    /// Whether this capability works with image payloads.
    pub fn is_image(self) -> bool {
        matches!(
            self,
            Self::ImageGeneration | Self::ImageAnalysis | Self::ImageEditing
        )
    }

    /// The capability an agent must declare to serve an intent type.
    /// `Unclear` has no single requirement.
    pub fn for_intent(intent_type: IntentType) -> Option<Capability> {
        match intent_type {
            IntentType::Consultation => Some(Self::Consultation),
            IntentType::Generation => Some(Self::ImageGeneration),
            IntentType::Modification => Some(Self::ImageEditing),
            IntentType::Analysis => Some(Self::Analysis),
            IntentType::Unclear => None,
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Consultation => "consultation",
            Self::Analysis => "analysis",
            Self::TextGeneration => "textGeneration",
            Self::ImageGeneration => "imageGeneration",
            Self::ImageAnalysis => "imageAnalysis",
            Self::ImageEditing => "imageEditing",
            Self::PlantCare => "plantCare",
            Self::LandscapeDesign => "landscapeDesign",
            Self::SiteAssessment => "siteAssessment",
        })
    }
}

/// A set of capabilities, stored as a bit set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct CapabilitySet(u16);

impl CapabilitySet {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub fn insert(&mut self, capability: Capability) {
        self.0 |= capability.bit();
    }

    pub fn with(mut self, capability: Capability) -> Self {
        self.insert(capability);
        self
    }

    pub fn contains(&self, capability: Capability) -> bool {
        self.0 & capability.bit() != 0
    }

    pub fn contains_all(&self, other: CapabilitySet) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Any of the image capabilities.
    pub fn handles_images(&self) -> bool {
        self.iter().any(Capability::is_image)
    }

    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        Capability::ALL.into_iter().filter(|c| self.contains(*c))
    }
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        let mut set = Self::empty();
        for capability in iter {
            set.insert(capability);
        }
        set
    }
}

impl Serialize for CapabilitySet {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

impl<'de> Deserialize<'de> for CapabilitySet {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Vec::<Capability>::deserialize(deserializer)?
            .into_iter()
            .collect())
    }
}

/// A named list of domain keywords used for keyword scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordGroup {
    pub domain: String,
    pub words: Vec<String>,
}

impl KeywordGroup {
    pub fn new(domain: impl Into<String>, words: &[&str]) -> Self {
        Self {
            domain: domain.into(),
            words: words.iter().map(|w| w.to_lowercase()).collect(),
        }
    }
}

/// Static description of an agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentProfile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub capabilities: CapabilitySet,
    pub system_prompt: String,
    #[serde(default)]
    pub keywords: Vec<KeywordGroup>,
}

/// Everything an agent needs to serve one request.
#[derive(Debug, Clone, Serialize)]
pub struct AgentRequest {
    pub id: String,
    pub context: RequestContext,
    pub intent: Intent,
    pub timestamp: DateTime<Utc>,
}

impl AgentRequest {
    pub fn new(context: RequestContext, intent: Intent) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            context,
            intent,
            timestamp: Utc::now(),
        }
    }
}

/// What an agent produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgentOutput {
    pub message: String,
    pub attachments: Vec<Attachment>,
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl AgentOutput {
    pub fn text(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }
}

/// A specialized responder.
#[async_trait]
pub trait Agent: Send + Sync {
    fn profile(&self) -> &AgentProfile;

    fn id(&self) -> &str {
        &self.profile().id
    }

    fn capabilities(&self) -> CapabilitySet {
        self.profile().capabilities
    }

    /// Whether this agent is willing to serve the request.
    ///
    /// Default: the agent declares the capability required by the intent
    /// type; for `Unclear` intents any conversational or analytic agent qualifies.
    fn can_handle(&self, intent: &Intent, _context: &RequestContext) -> Result<bool, Error> {
        let caps = self.capabilities();
        Ok(match Capability::for_intent(intent.intent_type) {
            Some(required) => caps.contains(required),
            None => {
                caps.contains(Capability::Consultation)
                    || caps.contains(Capability::TextGeneration)
                    || caps.contains(Capability::Analysis)
            }
        })
    }

    async fn execute(&self, request: &AgentRequest) -> Result<AgentOutput, Error>;
}

/// Error details carried by a failed response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseError {
    /// Stable error tag, see `Error::kind`.
    pub kind: String,
    pub message: String,
    pub elapsed_ms: u64,
}

/// The only thing that crosses the orchestrator boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentResponse {
    pub success: bool,
    pub message: Option<String>,
    pub selected_agent: Option<String>,
    pub generated_attachments: Option<Vec<Attachment>>,
    pub error: Option<ResponseError>,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl AgentResponse {
    pub fn completed(agent_id: impl Into<String>, output: AgentOutput) -> Self {
        Self {
            success: true,
            message: Some(output.message),
            selected_agent: Some(agent_id.into()),
            generated_attachments: if output.attachments.is_empty() {
                None
            } else {
                Some(output.attachments)
            },
            error: None,
            metadata: output.metadata,
        }
    }

    pub fn failed(error: &Error, elapsed_ms: u64) -> Self {
        Self {
            success: false,
            message: Some(user_facing_message(error).to_string()),
            selected_agent: None,
            generated_attachments: None,
            error: Some(ResponseError {
                kind: error.kind().to_string(),
                message: error.to_string(),
                elapsed_ms,
            }),
            metadata: serde_json::Map::new(),
        }
    }
}

fn user_facing_message(error: &Error) -> &'static str {
    match error {
        Error::NoCapableAgent { .. } => {
            "Sorry, none of the assistants can handle this request yet. Could you rephrase it?"
        }
        Error::Execution { .. } | Error::Provider(_) => {
            "Sorry, the assistant could not finish this request. Please try again."
        }
        _ => "Sorry, something went wrong while processing the request.",
    }
}

//! Request routing for the garden assistant.
//!
//! A message goes through five steps:
//!
//! 1. **Build context** from the message, the conversation and any attachments
//! 2. **Classify intent** with the upstream model (degrading to `unclear` on failure)
//! 3. **Select images** the chosen intent needs
//! 4. **Score agents** and pick the best one that can handle the request
//! 5. **Execute** it and wrap the outcome in an [`AgentResponse`](verdant_core::agent::AgentResponse)
//!
//! [`Orchestrator`] runs the steps, records per-stage metrics and turns
//! every failure into a response.

pub mod agents;
pub mod classifier;
pub mod context;
pub mod images;
pub mod orchestrator;
pub mod registry;
pub mod scoring;

#[cfg(test)]
mod test_helpers;

pub use agents::{LlmAgent, default_registry};
pub use classifier::IntentClassifier;
pub use classifier::prompt::PromptDocument;
pub use context::ContextBuilder;
pub use images::ImageSelector;
pub use orchestrator::{Orchestrator, RoutingPreview};
pub use registry::{AgentRegistry, AgentSelection};
pub use scoring::{AgentScorer, ScoreBreakdown};

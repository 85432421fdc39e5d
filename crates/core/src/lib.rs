//! # Verdant Core
//!
//! Domain types, traits, and error definitions for the Verdant agent
//! orchestration core. This crate has **no framework dependencies**: it
//! defines the vocabulary every other crate implements against.
//!
//! ## Design Philosophy
//!
//! The request pipeline is built from plain values (`RequestContext`,
//! `Intent`) and a handful of traits at the seams:
//! - [`Provider`] is the external LLM collaborator
//! - [`Agent`] is a specialized responder with declared capabilities
//! - [`ConversationStore`] is the external conversation storage
//!
//! Everything request-scoped is immutable once built; the only shared
//! mutable state lives behind the registries in the agent and telemetry crates.

pub mod agent;
pub mod context;
pub mod error;
pub mod intent;
pub mod message;
pub mod provider;
pub mod store;

// Re-export key types at crate root for ergonomics
pub use agent::{
    Agent, AgentOutput, AgentProfile, AgentRequest, AgentResponse, Capability, CapabilitySet,
    KeywordGroup, ResponseError,
};
pub use context::{Language, RequestContext};
pub use error::{ClassificationError, Error, ProviderError, Result, StoreError};
pub use intent::{ImageIntent, Intent, IntentSubtype, IntentType};
pub use message::{Attachment, AttachmentKind, Message, Role, SessionId};
pub use provider::{CompletionRequest, CompletionResponse, Provider, Usage};
pub use store::{ConversationStore, InMemoryConversationStore};

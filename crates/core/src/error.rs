//! Error types for the Verdant domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each pipeline stage has its own error variant.

use thiserror::Error;

/// The top-level error type for all Verdant operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Intent classification ---
    #[error("Classification error: {0}")]
    Classification(#[from] ClassificationError),

    // --- Agent selection / execution ---
    #[error("Capability check failed for agent '{agent_id}': {reason}")]
    Capability { agent_id: String, reason: String },

    #[error("No registered agent can handle intent '{intent}'")]
    NoCapableAgent { intent: String },

    #[error("Agent '{agent_id}' failed: {reason}")]
    Execution { agent_id: String, reason: String },

    // --- Conversation storage ---
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Stable snake_case tag reported as the error type in an `AgentResponse`.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Provider(_) => "provider_error",
            Self::Classification(_) => "parse_error",
            Self::Capability { .. } => "capability_error",
            Self::NoCapableAgent { .. } => "no_capable_agent",
            Self::Execution { .. } => "execution_error",
            Self::Store(_) => "store_error",
            Self::Config { .. } => "config_error",
            Self::Serialization(_) => "serialization_error",
            Self::Internal(_) => "internal_error",
        }
    }
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Quota exhausted: {0}")]
    QuotaExceeded(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),
}

impl ProviderError {
    /// Whether this failure should advance the provider's API-key pointer.
    pub fn rotates_key(&self) -> bool {
        matches!(
            self,
            Self::AuthenticationFailed(_) | Self::QuotaExceeded(_) | Self::RateLimited { .. }
        )
    }
}

/// The classifier got a reply but could not read an intent out of it.
#[derive(Debug, Clone, Error)]
pub enum ClassificationError {
    #[error("classifier returned an empty reply")]
    EmptyReply,

    #[error("no JSON object found in classifier reply")]
    NoJsonObject,

    #[error("invalid classifier JSON: {0}")]
    InvalidJson(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

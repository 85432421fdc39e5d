//! Request-scoped context.
//!
//! A `RequestContext` is built fresh for every request and never mutated:
//! later stages that need to change it (e.g. forwarding the selected
//! images) produce a new instance.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::message::{Attachment, Message};

/// Conversation language, detected from the script of user messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Ru,
    En,
}

impl Language {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Ru => "ru",
            Self::En => "en",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Immutable bundle of everything known about one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestContext {
    pub user_message: String,

    /// Model-facing history snapshot: transient UI messages already removed.
    pub history: Arc<[Message]>,

    /// Attachments for this request. Either supplied by the caller or
    /// borrowed from the most recent history message carrying images.
    pub attachments: Vec<Attachment>,

    /// True when `attachments` were taken from history rather than supplied.
    pub attachments_borrowed: bool,

    pub current_agent_id: Option<String>,

    pub timestamp: DateTime<Utc>,

    pub language: Option<Language>,

    /// The caller attached new images to this request.
    pub has_images: bool,

    /// An image appears within the recent history window.
    pub has_recent_images_in_history: bool,

    /// Number of model-facing history messages.
    pub conversation_length: usize,

    /// Up to the most recent image-analysis notes from history, oldest first.
    pub recent_image_analyses: Vec<String>,

    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl RequestContext {
    /// A copy of this context forwarding exactly `images` as its attachments.
    pub fn with_selected_images(&self, images: Vec<Attachment>) -> Self {
        let mut metadata = self.metadata.clone();
        metadata.insert(
            "selected_image_ids".into(),
            images.iter().map(|a| a.id.clone()).collect::<Vec<_>>().into(),
        );
        Self {
            attachments: images,
            metadata,
            ..self.clone()
        }
    }

    /// Image attachments carried by this request.
    pub fn images(&self) -> impl Iterator<Item = &Attachment> {
        self.attachments.iter().filter(|a| a.is_image())
    }

    /// The last `n` history messages, oldest first.
    pub fn recent_turns(&self, n: usize) -> &[Message] {
        let start = self.history.len().saturating_sub(n);
        &self.history[start..]
    }

    /// Total image attachments across the history snapshot.
    pub fn history_image_count(&self) -> usize {
        self.history.iter().map(|m| m.images().count()).sum()
    }
}

//! Builds the immutable [`RequestContext`] for one request.
//!
//! Building is pure apart from reading the clock, and `build_at` takes the
//! timestamp explicitly so identical inputs give equal contexts.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;
use verdant_config::ContextConfig;
use verdant_core::context::RequestContext;
use verdant_core::message::{Attachment, Message};

use super::language;

pub struct ContextBuilder {
    config: ContextConfig,
}

impl ContextBuilder {
    pub fn new(config: ContextConfig) -> Self {
        Self { config }
    }

    /// Build a context stamped with the current time. Never fails.
    pub fn build(
        &self,
        user_message: &str,
        history: &[Message],
        attachments: Vec<Attachment>,
        current_agent_id: Option<&str>,
    ) -> RequestContext {
        self.build_at(user_message, history, attachments, current_agent_id, Utc::now())
    }

    pub fn build_at(
        &self,
        user_message: &str,
        history: &[Message],
        attachments: Vec<Attachment>,
        current_agent_id: Option<&str>,
        timestamp: DateTime<Utc>,
    ) -> RequestContext {
        let history: Arc<[Message]> = history
            .iter()
            .filter(|m| !m.is_transient())
            .cloned()
            .collect();

        let has_images = attachments.iter().any(Attachment::is_image);
        let mut metadata = serde_json::Map::new();

        let (attachments, attachments_borrowed) =
            if attachments.is_empty() && self.config.borrow_history_images {
                match borrow_latest_images(&history) {
                    Some((source, images)) => {
                        debug!(
                            message_id = %source.id,
                            count = images.len(),
                            "Borrowing images from history"
                        );
                        metadata.insert("borrowed_from".into(), source.id.clone().into());
                        (images, true)
                    }
                    None => (Vec::new(), false),
                }
            } else {
                (attachments, false)
            };

        let language = language::detect(user_message).or_else(|| {
            language::vote(
                history
                    .iter()
                    .rev()
                    .filter(|m| m.role == verdant_core::message::Role::User)
                    .take(self.config.language_vote_window),
            )
        });

        RequestContext {
            user_message: user_message.to_string(),
            has_recent_images_in_history: self.recent_images(&history),
            conversation_length: history.len(),
            recent_image_analyses: self.recent_analyses(&history),
            history,
            attachments,
            attachments_borrowed,
            current_agent_id: current_agent_id.map(str::to_string),
            timestamp,
            language,
            has_images,
            metadata,
        }
    }

    fn recent_images(&self, history: &[Message]) -> bool {
        history
            .iter()
            .rev()
            .take(self.config.recent_image_window)
            .any(Message::has_images)
    }

    /// The newest `analysis_window` analysis notes, oldest first.
    fn recent_analyses(&self, history: &[Message]) -> Vec<String> {
        let window = self.config.analysis_window;
        let mut notes = VecDeque::with_capacity(window);
        if window == 0 {
            return Vec::new();
        }
        for analysis in history
            .iter()
            .filter_map(|m| m.image_analysis.as_deref())
            .map(str::trim)
            .filter(|a| !a.is_empty())
        {
            if notes.len() == window {
                notes.pop_front();
            }
            notes.push_back(analysis.to_string());
        }
        notes.into()
    }
}

fn borrow_latest_images(history: &[Message]) -> Option<(&Message, Vec<Attachment>)> {
    history
        .iter()
        .rev()
        .find(|m| m.has_images())
        .map(|m| (m, m.images().cloned().collect()))
}

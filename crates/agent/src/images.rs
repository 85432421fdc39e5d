//! Image selection: which images travel with the request.
//!
//! A pure function of the history, the intent and the current
//! attachments. The returned references borrow from the caller's data;
//! nothing is copied until the orchestrator forwards the selection.

use std::collections::HashSet;

use tracing::debug;
use verdant_config::SelectionConfig;
use verdant_core::intent::{ImageIntent, Intent};
use verdant_core::message::{Attachment, Message};

pub struct ImageSelector {
    config: SelectionConfig,
}

impl ImageSelector {
    pub fn new(config: SelectionConfig) -> Self {
        Self { config }
    }

    /// Select images for `intent`.
    ///
    /// `history` is the model-facing history, oldest first. `current` holds
    /// the images attached to this request.
    pub fn select<'a>(
        &self,
        history: &'a [Message],
        intent: &Intent,
        current: &'a [Attachment],
    ) -> Vec<&'a Attachment> {
        let max = self.config.max_images;
        // Zero means the model gave no usable count.
        let needed = intent.images_needed.filter(|n| *n > 0);

        let selected: Vec<&Attachment> = match intent.image_intent {
            ImageIntent::AnalyzeNew => current_images(current)
                .take(needed.unwrap_or(max).min(max))
                .collect(),
            ImageIntent::AnalyzeRecent => newest_first(history)
                .take(needed.unwrap_or(self.config.default_recent).min(max))
                .collect(),
            ImageIntent::CompareMultiple => {
                let limit = needed.unwrap_or(max).min(max);
                dedup_by_id(current_images(current).chain(newest_first(history)))
                    .take(limit)
                    .collect()
            }
            ImageIntent::ReferenceSpecific => {
                let chronological: Vec<&Attachment> =
                    history.iter().flat_map(Message::images).collect();
                // Exactly the referenced images, in the order given.
                intent
                    .referenced_image_indices
                    .iter()
                    .filter_map(|i| chronological.get(*i).copied())
                    .collect()
            }
            ImageIntent::GenerateBased => current_images(current)
                .chain(newest_first(history))
                .take(1)
                .collect(),
            ImageIntent::NoImageNeeded | ImageIntent::Unclear => Vec::new(),
        };

        debug!(
            image_intent = %intent.image_intent,
            selected = selected.len(),
            "Selected images"
        );
        selected
    }
}

fn current_images(current: &[Attachment]) -> impl Iterator<Item = &Attachment> {
    current.iter().filter(|a| a.is_image())
}

/// History images from the newest message back, in attachment order within a message.
fn newest_first(history: &[Message]) -> impl Iterator<Item = &Attachment> {
    history.iter().rev().flat_map(Message::images)
}

fn dedup_by_id<'a>(
    images: impl Iterator<Item = &'a Attachment>,
) -> impl Iterator<Item = &'a Attachment> {
    let mut seen = HashSet::new();
    images.filter(move |a| {
        let attachment: &'a Attachment = *a;
        seen.insert(attachment.id.as_str())
    })
}

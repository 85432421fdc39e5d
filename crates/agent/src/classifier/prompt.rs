//! Classifier prompt construction.
//!
//! The prompt is assembled as a [`PromptDocument`] of titled sections and
//! rendered to text only at the end, so each section can be inspected in
//! tests without a model call.

use verdant_config::ClassifierConfig;
use verdant_core::context::RequestContext;
use verdant_core::intent::{ImageIntent, IntentSubtype, IntentType};
use verdant_core::message::{Message, Role};

// ── Document ──────────────────────────────────────────────────────────────

/// One titled block of the prompt.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptSection {
    pub title: &'static str,
    pub body: String,
}

/// A structured prompt, rendered as `[Title]` headed blocks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PromptDocument {
    pub sections: Vec<PromptSection>,
}

impl PromptDocument {
    pub fn push(&mut self, title: &'static str, body: impl Into<String>) {
        let body = body.into();
        if !body.trim().is_empty() {
            self.sections.push(PromptSection { title, body });
        }
    }

    pub fn section(&self, title: &str) -> Option<&str> {
        self.sections
            .iter()
            .find(|s| s.title == title)
            .map(|s| s.body.as_str())
    }

    pub fn render(&self) -> String {
        self.sections
            .iter()
            .map(|s| format!("[{}]\n{}", s.title, s.body.trim_end()))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

// ── Builder ───────────────────────────────────────────────────────────────

pub const TASK: &str = "Task";
pub const INTENT_TYPES: &str = "Intent Types";
pub const IMAGE_INTENTS: &str = "Image Intents";
pub const CONVERSATION: &str = "Recent Conversation";
pub const FLAGS: &str = "Context";
pub const MESSAGE: &str = "Current Message";
pub const FORMAT: &str = "Response Format";

pub struct PromptBuilder<'a> {
    config: &'a ClassifierConfig,
}

impl<'a> PromptBuilder<'a> {
    pub fn new(config: &'a ClassifierConfig) -> Self {
        Self { config }
    }

    pub fn build(&self, user_message: &str, context: &RequestContext) -> PromptDocument {
        let mut doc = PromptDocument::default();
        doc.push(TASK, TASK_TEXT);
        doc.push(INTENT_TYPES, render_intent_types());
        doc.push(IMAGE_INTENTS, render_image_intents());
        doc.push(CONVERSATION, self.render_conversation(context));
        doc.push(FLAGS, render_flags(context));
        doc.push(MESSAGE, user_message.trim());
        doc.push(FORMAT, FORMAT_TEXT);
        doc
    }

    fn render_conversation(&self, context: &RequestContext) -> String {
        context
            .recent_turns(self.config.history_turns)
            .iter()
            .map(|m| self.render_turn(m))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn render_turn(&self, message: &Message) -> String {
        let role = match message.role {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        };
        let mut line = format!(
            "{role}: {}",
            excerpt(&message.content, self.config.turn_excerpt_chars)
        );
        let images = message.images().count();
        if images > 0 {
            line.push_str(&format!(" [{images} image(s)]"));
        }
        line
    }
}

const TASK_TEXT: &str = "\
You route requests for a garden and landscape design assistant.
Classify the user's current message. Also decide which images, if any,
the answer needs. Reply with one JSON object and nothing else.";

const FORMAT_TEXT: &str = r#"{
  "type": "<intent type>",
  "subtype": "<subtype>",
  "confidence": <number between 0 and 1>,
  "reasoning": "<one short sentence>",
  "imageIntent": "<image intent>",
  "referencedImageIndices": [<zero-based indices, only for referenceSpecific>],
  "imagesNeeded": <number of images, optional>,
  "extractedEntities": { "plants": [], "location": null, "style": null }
}
Image indices count every image in the conversation from the oldest (0)."#;

fn render_intent_types() -> String {
    let mut out = String::new();
    for intent_type in IntentType::ALL {
        out.push_str(&format!(
            "- {}: {}\n",
            intent_type.as_str(),
            type_definition(intent_type)
        ));
        for subtype in IntentSubtype::ALL
            .iter()
            .filter(|s| s.parent() == intent_type)
        {
            out.push_str(&format!(
                "  - {}: {}\n",
                subtype.as_str(),
                subtype.definition()
            ));
        }
    }
    out
}

fn render_image_intents() -> String {
    ImageIntent::ALL
        .iter()
        .map(|i| format!("- {}: {}", i.as_str(), i.definition()))
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_flags(context: &RequestContext) -> String {
    let new_images = if context.attachments_borrowed {
        0
    } else {
        context.images().count()
    };
    let language = context
        .language
        .map(|l| l.code().to_string())
        .unwrap_or_else(|| "unknown".into());
    let mut lines = vec![
        format!("new images attached: {}", yes_no(context.has_images)),
        format!("new image count: {new_images}"),
        format!(
            "recent images in conversation: {}",
            yes_no(context.has_recent_images_in_history)
        ),
        format!("images in conversation: {}", context.history_image_count()),
        format!("conversation length: {}", context.conversation_length),
        format!("language: {language}"),
    ];
    if let Some(agent) = &context.current_agent_id {
        lines.push(format!("current agent: {agent}"));
    }
    if !context.recent_image_analyses.is_empty() {
        lines.push(format!(
            "earlier image analyses: {}",
            context.recent_image_analyses.len()
        ));
    }
    lines.join("\n")
}

fn type_definition(intent_type: IntentType) -> &'static str {
    match intent_type {
        IntentType::Consultation => "advice or information in text, no picture needed",
        IntentType::Generation => "create a new design image or visualization",
        IntentType::Modification => "change an existing image or design",
        IntentType::Analysis => "examine photos of a site, plant or problem",
        IntentType::Unclear => "the goal cannot be determined",
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}

/// At most `max` characters of `text` on one line, with an ellipsis when cut.
fn excerpt(text: &str, max: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max {
        return flat;
    }
    let mut cut: String = flat.chars().take(max).collect();
    cut.push('…');
    cut
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ContextBuilder;
    use verdant_config::ContextConfig;
    use verdant_core::message::Attachment;

    fn build(message: &str, history: &[Message], attachments: Vec<Attachment>) -> PromptDocument {
        let ctx = ContextBuilder::new(ContextConfig::default()).build(message, history, attachments, None);
        let config = ClassifierConfig::default();
        PromptBuilder::new(&config).build(message, &ctx)
    }

    #[test]
    fn enumerates_every_type_subtype_and_image_intent() {
        let doc = build("hi", &[], vec![]);
        let types = doc.section(INTENT_TYPES).unwrap();
        for t in IntentType::ALL {
            assert!(types.contains(t.as_str()));
        }
        for s in IntentSubtype::ALL {
            assert!(types.contains(s.as_str()), "missing {s}");
        }
        let images = doc.section(IMAGE_INTENTS).unwrap();
        for i in ImageIntent::ALL {
            assert!(images.contains(i.as_str()));
        }
    }

    #[test]
    fn conversation_keeps_last_three_truncated_turns() {
        let long = "x".repeat(300);
        let history = vec![
            Message::user("oldest turn"),
            Message::assistant("second"),
            Message::user(long.clone()),
            Message::assistant("latest"),
        ];
        let doc = build("q", &history, vec![]);
        let conversation = doc.section(CONVERSATION).unwrap();
        assert!(!conversation.contains("oldest turn"));
        assert_eq!(conversation.lines().count(), 3);
        let long_line = conversation.lines().nth(1).unwrap();
        assert_eq!(long_line.chars().filter(|c| *c == 'x').count(), 100);
        assert!(long_line.ends_with('…'));
    }

    #[test]
    fn transient_messages_never_reach_the_prompt() {
        let mut typing = Message::assistant("TYPING-PLACEHOLDER");
        typing.is_typing = true;
        let mut failed = Message::assistant("ERROR-BUBBLE");
        failed.is_error = true;
        let history = vec![Message::user("hello"), typing, failed];

        let rendered = build("q", &history, vec![]).render();
        assert!(!rendered.contains("TYPING-PLACEHOLDER"));
        assert!(!rendered.contains("ERROR-BUBBLE"));
    }

    #[test]
    fn flags_report_images_and_language() {
        let image = Attachment::image(vec![0u8; 4], "image/jpeg");
        let doc = build("Проанализируй это фото участка", &[], vec![image]);
        let flags = doc.section(FLAGS).unwrap();
        assert!(flags.contains("new images attached: yes"));
        assert!(flags.contains("new image count: 1"));
        assert!(flags.contains("language: ru"));
        assert_eq!(doc.section(MESSAGE), Some("Проанализируй это фото участка"));
    }

    #[test]
    fn empty_history_omits_conversation_section() {
        let doc = build("hi", &[], vec![]);
        assert!(doc.section(CONVERSATION).is_none());
        let rendered = doc.render();
        assert!(rendered.starts_with("[Task]"));
        assert!(rendered.contains("[Response Format]"));
    }

    #[test]
    fn history_images_are_marked() {
        let history = vec![
            Message::user("my yard").with_attachments(vec![Attachment::image(vec![1u8], "image/png")]),
        ];
        let doc = build("what about the first photo?", &history, vec![]);
        assert!(doc.section(CONVERSATION).unwrap().contains("[1 image(s)]"));
        assert!(doc.section(FLAGS).unwrap().contains("images in conversation: 1"));
    }
}

//! Lenient parsing of the classifier's JSON reply.
//!
//! Models wrap JSON in Markdown fences, add prose around it, quote numbers
//! and invent enum values. Everything recoverable is recovered; unknown
//! enum values are coerced to safe defaults.

use serde::Deserialize;
use serde_json::Value;
use verdant_core::error::ClassificationError;
use verdant_core::intent::{ImageIntent, Intent, IntentSubtype, IntentType};

/// Confidence used when the reply omits it or it is not a number.
const DEFAULT_CONFIDENCE: f32 = 0.5;

/// Every field is a loose `Value` so one mistyped field never sinks the reply.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawIntent {
    #[serde(rename = "type", alias = "intentType", alias = "intent_type")]
    intent_type: Option<Value>,
    subtype: Option<Value>,
    confidence: Option<Value>,
    reasoning: Option<Value>,
    #[serde(rename = "imageIntent", alias = "image_intent")]
    image_intent: Option<Value>,
    #[serde(rename = "referencedImageIndices", alias = "referenced_image_indices")]
    referenced_image_indices: Option<Value>,
    #[serde(rename = "imagesNeeded", alias = "images_needed")]
    images_needed: Option<Value>,
    #[serde(rename = "extractedEntities", alias = "extracted_entities")]
    extracted_entities: Option<Value>,
}

/// Parse a classifier reply into an [`Intent`].
pub fn parse_intent(reply: &str) -> Result<Intent, ClassificationError> {
    let text = strip_fences(reply);
    if text.is_empty() {
        return Err(ClassificationError::EmptyReply);
    }
    let json = extract_object(text).ok_or(ClassificationError::NoJsonObject)?;
    let value: Value =
        serde_json::from_str(json).map_err(|e| ClassificationError::InvalidJson(e.to_string()))?;
    if !value.is_object() {
        return Err(ClassificationError::NoJsonObject);
    }
    let raw: RawIntent =
        serde_json::from_value(value).map_err(|e| ClassificationError::InvalidJson(e.to_string()))?;
    Ok(raw.into_intent())
}

impl RawIntent {
    fn into_intent(self) -> Intent {
        let intent_type = text(&self.intent_type)
            .map(IntentType::from_external)
            .unwrap_or(IntentType::Unclear);
        let image_intent = text(&self.image_intent)
            .map(ImageIntent::from_external)
            .unwrap_or(ImageIntent::Unclear);
        let confidence = self
            .confidence
            .as_ref()
            .and_then(number)
            .map(|c| c as f32)
            .unwrap_or(DEFAULT_CONFIDENCE);

        let mut intent = Intent::new(intent_type, image_intent, confidence);
        intent.subtype = text(&self.subtype).map(IntentSubtype::from_external);
        intent.reasoning = text(&self.reasoning).unwrap_or_default().to_string();
        // A bare index stands for a one-element list.
        intent.referenced_image_indices = match &self.referenced_image_indices {
            Some(Value::Array(items)) => items.iter().filter_map(index).collect(),
            Some(single) => index(single).into_iter().collect(),
            None => Vec::new(),
        };
        intent.images_needed = self.images_needed.as_ref().and_then(index);
        intent.extracted_entities = match self.extracted_entities {
            Some(Value::Object(map)) => map,
            _ => serde_json::Map::new(),
        };
        intent
    }
}

/// The string content of a field, if it is a string.
fn text(value: &Option<Value>) -> Option<&str> {
    value.as_ref().and_then(Value::as_str)
}

/// Remove a surrounding Markdown code fence, if any.
pub fn strip_fences(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (`json`).
    let body = match rest.split_once('\n') {
        Some((_, body)) => body,
        None => rest.trim_start_matches(|c: char| c.is_ascii_alphabetic()),
    };
    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
}

/// The span from the first `{` to the last `}`.
fn extract_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').parse::<f64>().ok().map(|v| {
            if s.trim().ends_with('%') { v / 100.0 } else { v }
        }),
        _ => None,
    }
}

/// A non-negative integer, from a number or a numeric string.
fn index(value: &Value) -> Option<usize> {
    let n = number(value)?;
    (n >= 0.0 && n.fract() == 0.0 && n <= usize::MAX as f64).then_some(n as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_json() {
        let intent = parse_intent(
            r#"{"type":"analysis","subtype":"siteAnalysis","confidence":0.92,
                "reasoning":"photo of a plot","imageIntent":"analyzeNew","imagesNeeded":1}"#,
        )
        .unwrap();
        assert_eq!(intent.intent_type, IntentType::Analysis);
        assert_eq!(intent.subtype, Some(IntentSubtype::SiteAnalysis));
        assert_eq!(intent.image_intent, ImageIntent::AnalyzeNew);
        assert_eq!(intent.images_needed, Some(1));
        assert!((intent.confidence - 0.92).abs() < 1e-6);
    }

    #[test]
    fn strips_markdown_fences_and_prose() {
        let reply = "```json\n{\"type\":\"consultation\",\"imageIntent\":\"noImageNeeded\"}\n```";
        let intent = parse_intent(reply).unwrap();
        assert_eq!(intent.intent_type, IntentType::Consultation);
        assert_eq!(intent.image_intent, ImageIntent::NoImageNeeded);

        let chatty = "Sure! Here it is: {\"type\":\"generation\"} Hope this helps.";
        assert_eq!(parse_intent(chatty).unwrap().intent_type, IntentType::Generation);
    }

    #[test]
    fn unknown_values_become_safe_defaults() {
        let intent = parse_intent(
            r#"{"type":"teleport","subtype":"astrology","imageIntent":"dream"}"#,
        )
        .unwrap();
        assert_eq!(intent.intent_type, IntentType::Unclear);
        assert_eq!(intent.subtype, Some(IntentSubtype::GeneralQuestion));
        assert_eq!(intent.image_intent, ImageIntent::Unclear);
    }

    #[test]
    fn missing_fields_default() {
        let intent = parse_intent("{}").unwrap();
        assert_eq!(intent.intent_type, IntentType::Unclear);
        assert_eq!(intent.image_intent, ImageIntent::Unclear);
        assert_eq!(intent.subtype, None);
        assert_eq!(intent.confidence, DEFAULT_CONFIDENCE);
    }

    #[test]
    fn confidence_is_clamped_and_coerced() {
        assert_eq!(parse_intent(r#"{"confidence": 7}"#).unwrap().confidence, 1.0);
        assert_eq!(parse_intent(r#"{"confidence": -2}"#).unwrap().confidence, 0.0);
        let pct = parse_intent(r#"{"confidence": "80%"}"#).unwrap().confidence;
        assert!((pct - 0.8).abs() < 1e-6);
    }

    #[test]
    fn indices_accept_numbers_and_strings_and_drop_garbage() {
        let intent = parse_intent(
            r#"{"imageIntent":"referenceSpecific","referencedImageIndices":[0,"2",-1,1.5,"x"]}"#,
        )
        .unwrap();
        assert_eq!(intent.referenced_image_indices, vec![0, 2]);
    }

    #[test]
    fn mistyped_auxiliary_fields_do_not_discard_the_intent() {
        let intent = parse_intent(
            r#"{"type":"analysis","imageIntent":"analyzeNew","confidence":0.9,"extractedEntities":[]}"#,
        )
        .unwrap();
        assert_eq!(intent.intent_type, IntentType::Analysis);
        assert_eq!(intent.image_intent, ImageIntent::AnalyzeNew);
        assert!((intent.confidence - 0.9).abs() < 1e-6);
        assert!(intent.extracted_entities.is_empty());

        let intent = parse_intent(
            r#"{"type":"analysis","imageIntent":"referenceSpecific","referencedImageIndices":0,
                "subtype":7,"reasoning":["a"]}"#,
        )
        .unwrap();
        assert_eq!(intent.image_intent, ImageIntent::ReferenceSpecific);
        assert_eq!(intent.referenced_image_indices, vec![0]);
        assert_eq!(intent.subtype, None);
        assert!(intent.reasoning.is_empty());

        let intent = parse_intent(r#"{"type":3,"imageIntent":null,"referencedImageIndices":"x"}"#).unwrap();
        assert_eq!(intent.intent_type, IntentType::Unclear);
        assert_eq!(intent.image_intent, ImageIntent::Unclear);
        assert!(intent.referenced_image_indices.is_empty());
    }

    #[test]
    fn model_text_cannot_mark_the_intent_degraded() {
        let intent = parse_intent(
            r#"{"type":"unclear","imageIntent":"unclear","reasoning":"classification failed: vague","failure":"x"}"#,
        )
        .unwrap();
        assert_eq!(intent.failure, None);
        assert!(!intent.is_degraded());
    }

    #[test]
    fn snake_case_keys_are_accepted() {
        let intent = parse_intent(
            r#"{"type":"analysis","image_intent":"compare_multiple","images_needed":"3"}"#,
        )
        .unwrap();
        assert_eq!(intent.image_intent, ImageIntent::CompareMultiple);
        assert_eq!(intent.images_needed, Some(3));
    }

    #[test]
    fn failures_are_typed() {
        assert!(matches!(parse_intent("   "), Err(ClassificationError::EmptyReply)));
        assert!(matches!(
            parse_intent("I think it's a question"),
            Err(ClassificationError::NoJsonObject)
        ));
        assert!(matches!(
            parse_intent("{\"type\": consultation}"),
            Err(ClassificationError::InvalidJson(_))
        ));
        assert!(matches!(parse_intent("[1, 2]"), Err(ClassificationError::NoJsonObject)));
    }

    #[test]
    fn fence_without_closing_marker() {
        assert_eq!(strip_fences("```json\n{\"a\":1}"), "{\"a\":1}");
        assert_eq!(strip_fences("  {\"a\":1}  "), "{\"a\":1}");
    }
}

//! Intent: the structured classification of what the user wants.
//!
//! Enum values arrive from an LLM, so every enum here has a lenient
//! `from_external` constructor that coerces unknown values to a safe
//! default instead of failing.

use serde::{Deserialize, Serialize};

/// Primary intent type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IntentType {
    Consultation,
    Generation,
    Modification,
    Analysis,
    Unclear,
}

impl IntentType {
    pub const ALL: [IntentType; 5] = [
        Self::Consultation,
        Self::Generation,
        Self::Modification,
        Self::Analysis,
        Self::Unclear,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Consultation => "consultation",
            Self::Generation => "generation",
            Self::Modification => "modification",
            Self::Analysis => "analysis",
            Self::Unclear => "unclear",
        }
    }

    /// Parse a value produced outside the process. Unknown → `Unclear`.
    pub fn from_external(value: &str) -> Self {
        let value = normalize(value);
        Self::ALL
            .into_iter()
            .find(|t| normalize(t.as_str()) == value)
            .unwrap_or(Self::Unclear)
    }
}

impl std::fmt::Display for IntentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fine-grained intent subtype.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IntentSubtype {
    // consultation
    GeneralQuestion,
    PlantCare,
    PlantSelection,
    DesignAdvice,
    // generation
    LandscapeDesign,
    Visualization,
    PlantingPlan,
    // modification
    ImageEdit,
    DesignRevision,
    // analysis
    SiteAnalysis,
    PlantIdentification,
    ProblemDiagnosis,
    ImageComparison,
}

impl IntentSubtype {
    pub const ALL: [IntentSubtype; 13] = [
        Self::GeneralQuestion,
        Self::PlantCare,
        Self::PlantSelection,
        Self::DesignAdvice,
        Self::LandscapeDesign,
        Self::Visualization,
        Self::PlantingPlan,
        Self::ImageEdit,
        Self::DesignRevision,
        Self::SiteAnalysis,
        Self::PlantIdentification,
        Self::ProblemDiagnosis,
        Self::ImageComparison,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GeneralQuestion => "generalQuestion",
            Self::PlantCare => "plantCare",
            Self::PlantSelection => "plantSelection",
            Self::DesignAdvice => "designAdvice",
            Self::LandscapeDesign => "landscapeDesign",
            Self::Visualization => "visualization",
            Self::PlantingPlan => "plantingPlan",
            Self::ImageEdit => "imageEdit",
            Self::DesignRevision => "designRevision",
            Self::SiteAnalysis => "siteAnalysis",
            Self::PlantIdentification => "plantIdentification",
            Self::ProblemDiagnosis => "problemDiagnosis",
            Self::ImageComparison => "imageComparison",
        }
    }

    /// The primary type this subtype belongs to.
    pub fn parent(&self) -> IntentType {
        match self {
            Self::GeneralQuestion | Self::PlantCare | Self::PlantSelection | Self::DesignAdvice => {
                IntentType::Consultation
            }
            Self::LandscapeDesign | Self::Visualization | Self::PlantingPlan => {
                IntentType::Generation
            }
            Self::ImageEdit | Self::DesignRevision => IntentType::Modification,
            Self::SiteAnalysis
            | Self::PlantIdentification
            | Self::ProblemDiagnosis
            | Self::ImageComparison => IntentType::Analysis,
        }
    }

    /// One-line definition, used when enumerating subtypes for the classifier.
    pub fn definition(&self) -> &'static str {
        match self {
            Self::GeneralQuestion => "any other question or small talk",
            Self::PlantCare => "watering, feeding, pruning, wintering of plants",
            Self::PlantSelection => "which plants suit given conditions",
            Self::DesignAdvice => "advice on layout, style or zoning in words",
            Self::LandscapeDesign => "create a new design or concept for a plot",
            Self::Visualization => "render an image of how something will look",
            Self::PlantingPlan => "produce a planting scheme or schedule",
            Self::ImageEdit => "change something in an existing image",
            Self::DesignRevision => "rework a previously proposed design",
            Self::SiteAnalysis => "assess a plot from photos: light, soil, slopes, zones",
            Self::PlantIdentification => "identify a plant in a photo",
            Self::ProblemDiagnosis => "diagnose disease, pests or damage",
            Self::ImageComparison => "compare several images or options",
        }
    }

    /// Parse a value produced outside the process. Unknown → `GeneralQuestion`.
    pub fn from_external(value: &str) -> Self {
        let value = normalize(value);
        Self::ALL
            .into_iter()
            .find(|s| normalize(s.as_str()) == value)
            .unwrap_or(Self::GeneralQuestion)
    }
}

impl std::fmt::Display for IntentSubtype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How images should be chosen for a request.
///
/// Produced alongside the primary intent: the intent type alone cannot
/// tell which of the conversation's images are meant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ImageIntent {
    /// Images just attached to this message.
    AnalyzeNew,
    /// Unspecified images from earlier in the conversation.
    AnalyzeRecent,
    /// Two or more images considered together.
    CompareMultiple,
    /// An ordinal reference such as "the first one".
    ReferenceSpecific,
    /// Exactly one seed image for generation.
    GenerateBased,
    NoImageNeeded,
    Unclear,
}

impl ImageIntent {
    pub const ALL: [ImageIntent; 7] = [
        Self::AnalyzeNew,
        Self::AnalyzeRecent,
        Self::CompareMultiple,
        Self::ReferenceSpecific,
        Self::GenerateBased,
        Self::NoImageNeeded,
        Self::Unclear,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AnalyzeNew => "analyzeNew",
            Self::AnalyzeRecent => "analyzeRecent",
            Self::CompareMultiple => "compareMultiple",
            Self::ReferenceSpecific => "referenceSpecific",
            Self::GenerateBased => "generateBased",
            Self::NoImageNeeded => "noImageNeeded",
            Self::Unclear => "unclear",
        }
    }

    pub fn definition(&self) -> &'static str {
        match self {
            Self::AnalyzeNew => "work with the images attached to the current message",
            Self::AnalyzeRecent => "work with earlier images without saying which",
            Self::CompareMultiple => "compare two or more images together",
            Self::ReferenceSpecific => {
                "refers to particular earlier images by position (\"the first photo\")"
            }
            Self::GenerateBased => "generate something from one seed image",
            Self::NoImageNeeded => "the request needs no images",
            Self::Unclear => "cannot tell",
        }
    }

    /// Parse a value produced outside the process. Unknown → `Unclear`.
    pub fn from_external(value: &str) -> Self {
        let value = normalize(value);
        Self::ALL
            .into_iter()
            .find(|i| normalize(i.as_str()) == value)
            .unwrap_or(Self::Unclear)
    }
}

impl std::fmt::Display for ImageIntent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lowercase and drop separators so `analyze_new`, `AnalyzeNew` and
/// `analyze-new` all compare equal.
fn normalize(value: &str) -> String {
    value
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Structured classification of the user's goal for one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Intent {
    #[serde(rename = "type")]
    pub intent_type: IntentType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtype: Option<IntentSubtype>,

    /// Always within [0, 1].
    pub confidence: f32,

    #[serde(default)]
    pub reasoning: String,

    pub image_intent: ImageIntent,

    /// Chronological indices into the conversation's images.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub referenced_image_indices: Vec<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images_needed: Option<usize>,

    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub extracted_entities: serde_json::Map<String, serde_json::Value>,

    /// Why classification failed. Set only on the fallback intent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

/// Confidence assigned when classification could not be performed.
pub const FALLBACK_CONFIDENCE: f32 = 0.1;

impl Intent {
    /// An intent with the given type and image intent and nothing else set.
    pub fn new(intent_type: IntentType, image_intent: ImageIntent, confidence: f32) -> Self {
        Self {
            intent_type,
            subtype: None,
            confidence: clamp_confidence(confidence),
            reasoning: String::new(),
            image_intent,
            referenced_image_indices: Vec::new(),
            images_needed: None,
            extracted_entities: serde_json::Map::new(),
            failure: None,
        }
    }

    /// The degraded intent used when classification fails entirely.
    pub fn fallback(cause: impl std::fmt::Display) -> Self {
        let cause = cause.to_string();
        Self {
            reasoning: format!("classification failed: {cause}"),
            failure: Some(cause),
            ..Self::new(IntentType::Unclear, ImageIntent::Unclear, FALLBACK_CONFIDENCE)
        }
    }

    pub fn with_subtype(mut self, subtype: IntentSubtype) -> Self {
        self.subtype = Some(subtype);
        self
    }

    pub fn with_references(mut self, indices: Vec<usize>) -> Self {
        self.referenced_image_indices = indices;
        self
    }

    pub fn with_images_needed(mut self, count: usize) -> Self {
        self.images_needed = Some(count);
        self
    }

    pub fn is_degraded(&self) -> bool {
        self.failure.is_some()
    }
}

/// Clamp to [0, 1]; NaN becomes 0.
pub fn clamp_confidence(value: f32) -> f32 {
    if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) }
}

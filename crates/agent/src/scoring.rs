//! Additive agent scoring.
//!
//! Every capable agent gets a base score plus bonuses for the intent type,
//! the subtype, image context, conversation continuity, domain keywords
//! and its rolling success rate. Fuzzy keyword hits use normalized
//! Levenshtein similarity and are capped strictly below an exact hit.

use serde::Serialize;
use verdant_config::ScoringConfig;
use verdant_core::agent::{AgentProfile, AgentRequest, Capability, KeywordGroup};
use verdant_core::intent::IntentSubtype;

/// (subtype, capability the agent must declare, bonus).
///
/// For a subtype, the agent receives the largest bonus among the rows whose
/// capability it declares.
pub static SUBTYPE_BONUSES: &[(IntentSubtype, Capability, f64)] = &[
    (IntentSubtype::GeneralQuestion, Capability::Consultation, 0.5),
    (IntentSubtype::PlantCare, Capability::PlantCare, 1.5),
    (IntentSubtype::PlantCare, Capability::Consultation, 0.5),
    (IntentSubtype::PlantSelection, Capability::PlantCare, 1.0),
    (IntentSubtype::PlantSelection, Capability::Consultation, 1.0),
    (IntentSubtype::DesignAdvice, Capability::LandscapeDesign, 1.0),
    (IntentSubtype::DesignAdvice, Capability::Consultation, 0.5),
    (IntentSubtype::LandscapeDesign, Capability::LandscapeDesign, 1.5),
    (IntentSubtype::Visualization, Capability::ImageGeneration, 1.5),
    (IntentSubtype::PlantingPlan, Capability::LandscapeDesign, 1.0),
    (IntentSubtype::PlantingPlan, Capability::PlantCare, 0.5),
    (IntentSubtype::ImageEdit, Capability::ImageEditing, 1.5),
    (IntentSubtype::DesignRevision, Capability::ImageEditing, 1.0),
    (IntentSubtype::DesignRevision, Capability::LandscapeDesign, 0.5),
    (IntentSubtype::SiteAnalysis, Capability::SiteAssessment, 1.5),
    (IntentSubtype::PlantIdentification, Capability::ImageAnalysis, 1.0),
    (IntentSubtype::PlantIdentification, Capability::PlantCare, 1.0),
    (IntentSubtype::ProblemDiagnosis, Capability::PlantCare, 1.5),
    (IntentSubtype::ProblemDiagnosis, Capability::ImageAnalysis, 0.5),
    (IntentSubtype::ImageComparison, Capability::ImageAnalysis, 1.5),
];

/// Per-component score of one agent for one request.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub base: f64,
    pub intent: f64,
    pub subtype: f64,
    pub context: f64,
    pub conversation: f64,
    pub keywords: f64,
    pub performance: f64,
}

impl ScoreBreakdown {
    pub fn total(&self) -> f64 {
        self.base
            + self.intent
            + self.subtype
            + self.context
            + self.conversation
            + self.keywords
            + self.performance
    }
}

pub struct AgentScorer {
    config: ScoringConfig,
}

impl AgentScorer {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn score(
        &self,
        profile: &AgentProfile,
        request: &AgentRequest,
        success_rate: f64,
    ) -> ScoreBreakdown {
        let caps = profile.capabilities;
        let intent = &request.intent;
        let context = &request.context;

        let intent_bonus = match Capability::for_intent(intent.intent_type) {
            Some(required) if caps.contains(required) => {
                self.config.intent_bonus * f64::from(intent.confidence)
            }
            _ => 0.0,
        };

        let subtype_bonus = intent
            .subtype
            .map(|subtype| {
                SUBTYPE_BONUSES
                    .iter()
                    .filter(|(s, cap, _)| *s == subtype && caps.contains(*cap))
                    .map(|(_, _, bonus)| *bonus)
                    .fold(0.0, f64::max)
            })
            .unwrap_or(0.0);

        let context_bonus = if !caps.handles_images() {
            0.0
        } else if context.has_images {
            self.config.new_images_bonus
        } else if context.has_recent_images_in_history {
            self.config.recent_images_bonus
        } else {
            0.0
        };

        let conversation_bonus = if context.conversation_length > 0 {
            self.config.conversation_bonus
        } else {
            0.0
        };

        ScoreBreakdown {
            base: self.config.base,
            intent: intent_bonus,
            subtype: subtype_bonus,
            context: context_bonus,
            conversation: conversation_bonus,
            keywords: self.keyword_score(&profile.keywords, &context.user_message),
            performance: self.config.performance_weight * success_rate.clamp(0.0, 1.0),
        }
    }

    /// Sum over keyword groups: 1.0 for an exact substring hit, else the best fuzzy score.
    pub fn keyword_score(&self, groups: &[KeywordGroup], message: &str) -> f64 {
        let lowered = message.to_lowercase();
        let tokens: Vec<&str> = lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| t.chars().count() >= self.config.fuzzy_min_token_chars)
            .collect();

        groups
            .iter()
            .map(|group| {
                if group.words.iter().any(|w| !w.is_empty() && lowered.contains(w.as_str())) {
                    1.0
                } else {
                    group
                        .words
                        .iter()
                        .map(|w| self.fuzzy_score(w, &tokens))
                        .fold(0.0, f64::max)
                }
            })
            .sum()
    }

    /// Best similarity of `keyword` against any token, scaled into `[0, fuzzy_ceiling)`.
    fn fuzzy_score(&self, keyword: &str, tokens: &[&str]) -> f64 {
        let keyword_len = keyword.chars().count();
        if keyword_len < self.config.fuzzy_min_token_chars || keyword.contains(char::is_whitespace) {
            return 0.0;
        }
        tokens
            .iter()
            .filter_map(|token| {
                let distance = strsim::levenshtein(token, keyword);
                if distance == 0 || distance > self.config.fuzzy_max_distance {
                    return None;
                }
                let longest = keyword_len.max(token.chars().count());
                let similarity = 1.0 - distance as f64 / longest as f64;
                Some(similarity.max(0.0) * self.config.fuzzy_ceiling)
            })
            .fold(0.0, f64::max)
    }
}

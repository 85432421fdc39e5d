//! Configuration loading, validation, and management for Verdant.
//!
//! Loads configuration from `~/.verdant/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.verdant/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Upstream LLM providers (primary and optional fallback)
    #[serde(default)]
    pub providers: ProvidersConfig,

    /// Intent classifier settings
    #[serde(default)]
    pub classifier: ClassifierConfig,

    /// Context builder windows
    #[serde(default)]
    pub context: ContextConfig,

    /// Image selection limits
    #[serde(default)]
    pub selection: SelectionConfig,

    /// Agent scoring weights
    #[serde(default)]
    pub scoring: ScoringConfig,

    /// Rolling metrics settings
    #[serde(default)]
    pub metrics: MetricsConfig,

    /// Built-in agent execution settings
    #[serde(default)]
    pub agent: AgentConfig,
}

fn default_true() -> bool {
    true
}

// ── Providers ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default = "ProviderConfig::primary_default")]
    pub primary: ProviderConfig,

    /// Consulted once, only after the primary fails
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<ProviderConfig>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            primary: ProviderConfig::primary_default(),
            fallback: None,
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Provider name (e.g. "openrouter", "openai", "ollama")
    pub name: String,

    /// Base URL; well-known providers have a built-in default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    /// API keys, rotated on auth/quota failures
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub api_keys: Vec<String>,

    /// Model identifier sent upstream
    pub model: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_timeout_secs() -> u64 {
    30
}
fn default_max_tokens() -> u32 {
    2048
}

impl ProviderConfig {
    fn primary_default() -> Self {
        Self {
            name: "openrouter".into(),
            api_url: None,
            api_keys: Vec::new(),
            model: "google/gemini-2.5-flash".into(),
            timeout_secs: default_timeout_secs(),
            max_tokens: default_max_tokens(),
        }
    }

    pub fn has_api_key(&self) -> bool {
        self.api_keys.iter().any(|k| !k.is_empty())
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("name", &self.name)
            .field("api_url", &self.api_url)
            .field("api_keys", &format!("[{} REDACTED]", self.api_keys.len()))
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

// ── Classifier ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// How many recent turns are quoted in the classification prompt
    #[serde(default = "default_history_turns")]
    pub history_turns: usize,

    /// Each quoted turn is cut to this many characters
    #[serde(default = "default_turn_excerpt_chars")]
    pub turn_excerpt_chars: usize,

    #[serde(default = "default_classifier_temperature")]
    pub temperature: f32,

    #[serde(default = "default_classifier_max_tokens")]
    pub max_tokens: u32,
}

fn default_history_turns() -> usize {
    3
}
fn default_turn_excerpt_chars() -> usize {
    100
}
fn default_classifier_temperature() -> f32 {
    0.1
}
fn default_classifier_max_tokens() -> u32 {
    600
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            history_turns: default_history_turns(),
            turn_excerpt_chars: default_turn_excerpt_chars(),
            temperature: default_classifier_temperature(),
            max_tokens: default_classifier_max_tokens(),
        }
    }
}

// ── Context ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Image-analysis notes kept for consultative continuity
    #[serde(default = "default_analysis_window")]
    pub analysis_window: usize,

    /// How many trailing messages count as "recent" for images
    #[serde(default = "default_recent_image_window")]
    pub recent_image_window: usize,

    /// User messages consulted when the current message's script is ambiguous
    #[serde(default = "default_language_vote_window")]
    pub language_vote_window: usize,

    /// Borrow images from history when the caller attaches none
    #[serde(default = "default_true")]
    pub borrow_history_images: bool,
}

fn default_analysis_window() -> usize {
    5
}
fn default_recent_image_window() -> usize {
    10
}
fn default_language_vote_window() -> usize {
    5
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            analysis_window: default_analysis_window(),
            recent_image_window: default_recent_image_window(),
            language_vote_window: default_language_vote_window(),
            borrow_history_images: true,
        }
    }
}

// ── Selection ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionConfig {
    /// Upper bound on images forwarded for comparisons
    #[serde(default = "default_max_images")]
    pub max_images: usize,

    /// Images collected for `analyzeRecent` when the intent names no count
    #[serde(default = "default_recent_images")]
    pub default_recent: usize,
}

fn default_max_images() -> usize {
    5
}
fn default_recent_images() -> usize {
    5
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            max_images: default_max_images(),
            default_recent: default_recent_images(),
        }
    }
}

// ── Scoring ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    #[serde(default = "default_base")]
    pub base: f64,
    /// Maximum bonus for declaring the intent type's capability
    #[serde(default = "default_intent_bonus")]
    pub intent_bonus: f64,
    #[serde(default = "default_new_images_bonus")]
    pub new_images_bonus: f64,
    #[serde(default = "default_recent_images_bonus")]
    pub recent_images_bonus: f64,
    #[serde(default = "default_conversation_bonus")]
    pub conversation_bonus: f64,
    /// Best possible fuzzy keyword score; must stay below an exact hit (1.0)
    #[serde(default = "default_fuzzy_ceiling")]
    pub fuzzy_ceiling: f64,
    #[serde(default = "default_fuzzy_max_distance")]
    pub fuzzy_max_distance: usize,
    #[serde(default = "default_fuzzy_min_token_chars")]
    pub fuzzy_min_token_chars: usize,
    /// Multiplier for the rolling success rate
    #[serde(default = "default_performance_weight")]
    pub performance_weight: f64,
}

fn default_base() -> f64 {
    1.0
}
fn default_intent_bonus() -> f64 {
    2.0
}
fn default_new_images_bonus() -> f64 {
    1.5
}
fn default_recent_images_bonus() -> f64 {
    1.0
}
fn default_conversation_bonus() -> f64 {
    0.5
}
fn default_fuzzy_ceiling() -> f64 {
    0.6
}
fn default_fuzzy_max_distance() -> usize {
    2
}
fn default_fuzzy_min_token_chars() -> usize {
    3
}
fn default_performance_weight() -> f64 {
    1.0
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            base: default_base(),
            intent_bonus: default_intent_bonus(),
            new_images_bonus: default_new_images_bonus(),
            recent_images_bonus: default_recent_images_bonus(),
            conversation_bonus: default_conversation_bonus(),
            fuzzy_ceiling: default_fuzzy_ceiling(),
            fuzzy_max_distance: default_fuzzy_max_distance(),
            fuzzy_min_token_chars: default_fuzzy_min_token_chars(),
            performance_weight: default_performance_weight(),
        }
    }
}

// ── Metrics ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Execution samples retained per agent
    #[serde(default = "default_sample_cap")]
    pub sample_cap: usize,
}

fn default_sample_cap() -> usize {
    100
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            sample_cap: default_sample_cap(),
        }
    }
}

// ── Agent ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_agent_temperature")]
    pub temperature: f32,

    /// Prior turns forwarded to the executing agent
    #[serde(default = "default_agent_history_turns")]
    pub history_turns: usize,
}

fn default_agent_temperature() -> f32 {
    0.7
}
fn default_agent_history_turns() -> usize {
    6
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            temperature: default_agent_temperature(),
            history_turns: default_agent_history_turns(),
        }
    }
}

// ── Loading ───────────────────────────────────────────────────────────────

impl AppConfig {
    /// Load configuration from the default path (~/.verdant/config.toml).
    ///
    /// Environment overrides:
    /// - `VERDANT_API_KEY`, then `OPENROUTER_API_KEY` → primary keys (if none configured)
    /// - `VERDANT_FALLBACK_API_KEY` → fallback keys (if none configured)
    /// - `VERDANT_MODEL` → primary model
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if !self.providers.primary.has_api_key() {
            if let Some(key) = lookup("VERDANT_API_KEY").or_else(|| lookup("OPENROUTER_API_KEY")) {
                self.providers.primary.api_keys = split_keys(&key);
            }
        }

        if let Some(fallback) = self.providers.fallback.as_mut() {
            if !fallback.has_api_key() {
                if let Some(key) = lookup("VERDANT_FALLBACK_API_KEY") {
                    fallback.api_keys = split_keys(&key);
                }
            }
        }

        if let Some(model) = lookup("VERDANT_MODEL") {
            self.providers.primary.model = model;
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".verdant")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for temperature in [self.classifier.temperature, self.agent.temperature] {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(ConfigError::ValidationError(
                    "temperatures must be between 0.0 and 2.0".into(),
                ));
            }
        }

        if !(0.0..1.0).contains(&self.scoring.fuzzy_ceiling) {
            return Err(ConfigError::ValidationError(
                "scoring.fuzzy_ceiling must be in [0.0, 1.0) so fuzzy hits never match exact ones"
                    .into(),
            ));
        }

        if self.selection.max_images == 0 {
            return Err(ConfigError::ValidationError(
                "selection.max_images must be at least 1".into(),
            ));
        }

        if self.metrics.sample_cap == 0 {
            return Err(ConfigError::ValidationError(
                "metrics.sample_cap must be at least 1".into(),
            ));
        }

        let providers = std::iter::once(&self.providers.primary).chain(&self.providers.fallback);
        for provider in providers {
            if provider.name.trim().is_empty() || provider.model.trim().is_empty() {
                return Err(ConfigError::ValidationError(
                    "every provider needs a name and a model".into(),
                ));
            }
        }

        Ok(())
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            providers: ProvidersConfig::default(),
            classifier: ClassifierConfig::default(),
            context: ContextConfig::default(),
            selection: SelectionConfig::default(),
            scoring: ScoringConfig::default(),
            metrics: MetricsConfig::default(),
            agent: AgentConfig::default(),
        }
    }
}

/// Keys may be given as a comma-separated list.
fn split_keys(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(String::from)
        .collect()
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.providers.primary.name, "openrouter");
        assert_eq!(config.classifier.history_turns, 3);
        assert_eq!(config.selection.max_images, 5);
        assert_eq!(config.metrics.sample_cap, 100);
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.providers.primary.model, config.providers.primary.model);
        assert_eq!(parsed.scoring.fuzzy_ceiling, config.scoring.fuzzy_ceiling);
    }

    #[test]
    fn fuzzy_ceiling_must_stay_below_exact() {
        let mut config = AppConfig::default();
        config.scoring.fuzzy_ceiling = 1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn invalid_temperature_rejected() {
        let mut config = AppConfig::default();
        config.classifier.temperature = 5.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.providers.primary.name, "openrouter");
        assert!(config.providers.fallback.is_none());
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[providers.primary]
name = "openai"
model = "gpt-4o-mini"
api_keys = ["sk-a", "sk-b"]

[providers.fallback]
name = "openrouter"
model = "google/gemini-2.5-flash"
timeout_secs = 10

[scoring]
intent_bonus = 3.0
"#,
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.providers.primary.api_keys.len(), 2);
        assert_eq!(config.providers.primary.timeout_secs, 30);
        assert_eq!(config.providers.fallback.as_ref().unwrap().timeout_secs, 10);
        assert_eq!(config.scoring.intent_bonus, 3.0);
        assert_eq!(config.scoring.base, 1.0);
    }

    #[test]
    fn unparsable_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "providers = 42").unwrap();
        assert!(matches!(
            AppConfig::load_from(&path),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn env_overrides_fill_missing_keys() {
        let mut config = AppConfig::default();
        config.providers.fallback = Some(ProviderConfig::primary_default());
        let env: HashMap<&str, &str> = HashMap::from([
            ("OPENROUTER_API_KEY", "sk-1, sk-2"),
            ("VERDANT_FALLBACK_API_KEY", "sk-fb"),
            ("VERDANT_MODEL", "openai/gpt-4o"),
        ]);
        config.apply_env(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.providers.primary.api_keys, vec!["sk-1", "sk-2"]);
        assert_eq!(
            config.providers.fallback.as_ref().unwrap().api_keys,
            vec!["sk-fb"]
        );
        assert_eq!(config.providers.primary.model, "openai/gpt-4o");
    }

    #[test]
    fn configured_keys_win_over_env() {
        let mut config = AppConfig::default();
        config.providers.primary.api_keys = vec!["from-file".into()];
        config.apply_env(|k| (k == "VERDANT_API_KEY").then(|| "from-env".to_string()));
        assert_eq!(config.providers.primary.api_keys, vec!["from-file"]);
    }

    #[test]
    fn debug_redacts_keys() {
        let mut config = AppConfig::default();
        config.providers.primary.api_keys = vec!["sk-secret".into()];
        let debug = format!("{:?}", config);
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("REDACTED"));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("openrouter"));
        assert!(toml_str.contains("fuzzy_ceiling"));
    }
}

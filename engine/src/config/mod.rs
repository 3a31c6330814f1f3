//! Configuration management
//!
//! This module handles loading, validation, and management of the Scribe configuration.
//! Configuration is stored in TOML format at ~/.scribe/config.toml.
//!
//! # Configuration Sections
//!
//! - **core**: Log level, data directory (run history), output directory (reports)
//! - **llm**: Provider selection, per-call timeout, provider endpoints
//! - **pipeline**: Step ordering, default iteration cap, per-step overrides
//!
//! # Path Expansion
//!
//! `~` in `data_dir` and `output_dir` is expanded to the user's home directory.
//!
//! # Examples
//!
//! ```no_run
//! use scribe_engine::config::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load configuration from default location
//! let config = Config::load_or_create()?;
//!
//! println!("Default provider: {}", config.llm.default_provider);
//! println!("Iteration cap: {}", config.pipeline.max_iterations);
//! # Ok(())
//! # }
//! ```

use scribe_sdk::errors::EngineError;
use scribe_sdk::types::PayloadKind;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

/// Providers the engine knows how to build
pub const VALID_PROVIDERS: [&str; 2] = ["openai", "ollama"];

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Core settings
    pub core: CoreConfig,

    /// Reasoning engine configuration
    pub llm: LLMConfig,

    /// Pipeline configuration
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

/// Core configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Data directory path for run history (supports ~ expansion)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Directory reports are written to (supports ~ expansion)
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

/// Reasoning engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMConfig {
    /// Provider tried first (openai, ollama)
    pub default_provider: String,

    /// Provider tried when the default one fails
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_provider: Option<String>,

    /// Per-call timeout enforced on every provider
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// OpenAI provider settings
    #[serde(default)]
    pub openai: OpenAIConfig,

    /// Ollama provider settings
    #[serde(default)]
    pub ollama: OllamaConfig,
}

/// OpenAI-compatible provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIConfig {
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,

    #[serde(default = "default_openai_model")]
    pub model: String,

    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

/// Ollama provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    #[serde(default = "default_ollama_base_url")]
    pub base_url: String,

    #[serde(default = "default_ollama_model")]
    pub model: String,
}

/// Pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Default iteration cap applied to every step
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Step identifiers in execution order
    #[serde(default = "default_steps")]
    pub steps: Vec<String>,

    /// Per-step overrides keyed by step identifier
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub overrides: BTreeMap<String, StepOverride>,
}

/// Optional per-step settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StepOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_iterations: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

/// Resolved settings for one step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepSettings {
    pub max_iterations: u32,
    pub temperature: f32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            steps: default_steps(),
            overrides: BTreeMap::new(),
        }
    }
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            base_url: default_openai_base_url(),
            model: default_openai_model(),
            api_key_env: default_api_key_env(),
            max_tokens: default_max_tokens(),
        }
    }
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: default_ollama_base_url(),
            model: default_ollama_model(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            core: CoreConfig {
                log_level: default_log_level(),
                data_dir: default_data_dir(),
                output_dir: default_output_dir(),
            },
            llm: LLMConfig {
                default_provider: "openai".to_string(),
                fallback_provider: None,
                timeout_secs: default_timeout_secs(),
                openai: OpenAIConfig::default(),
                ollama: OllamaConfig::default(),
            },
            pipeline: PipelineConfig::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("~/.scribe/data")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("scribe-output")
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_max_tokens() -> u32 {
    500
}

fn default_ollama_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_ollama_model() -> String {
    "llama3.1:8b".to_string()
}

fn default_max_iterations() -> u32 {
    3
}

fn default_steps() -> Vec<String> {
    PayloadKind::ALL
        .iter()
        .map(|k| k.as_str().to_string())
        .collect()
}

/// Default decoding temperature for each step
pub fn default_temperature(kind: PayloadKind) -> f32 {
    match kind {
        PayloadKind::Insights => 0.3,
        PayloadKind::Notes => 0.2,
        PayloadKind::Todos => 0.1,
        PayloadKind::RepoPlan => 0.3,
        PayloadKind::Article => 0.5,
    }
}

impl Config {
    /// Load configuration from the default location (~/.scribe/config.toml)
    ///
    /// If the configuration file doesn't exist, creates a default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration file cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    pub fn load_or_create() -> Result<Self, EngineError> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load_from_path(&config_path)
        } else {
            Self::create_default(&config_path)
        }
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, EngineError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("Failed to read config file: {}", e)))?;

        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml(contents: &str) -> Result<Self, EngineError> {
        let mut config: Config = toml::from_str(contents)
            .map_err(|e| EngineError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate_and_process()?;

        Ok(config)
    }

    /// Create default configuration and save to path
    fn create_default(path: &Path) -> Result<Self, EngineError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                EngineError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let defaults = Self::default();

        // Written before processing so that ~ stays unexpanded in the file
        let toml_string = toml::to_string_pretty(&defaults)
            .map_err(|e| EngineError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string)
            .map_err(|e| EngineError::Config(format!("Failed to write config file: {}", e)))?;

        let mut config = defaults;
        config.validate_and_process()?;
        Ok(config)
    }

    /// Get the default configuration file path (~/.scribe/config.toml)
    pub fn default_config_path() -> Result<PathBuf, EngineError> {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(".scribe").join("config.toml"))
    }

    /// Path of the run history database
    pub fn db_path(&self) -> PathBuf {
        self.core.data_dir.join("scribe.db")
    }

    /// Configured steps, in execution order
    pub fn pipeline_kinds(&self) -> Result<Vec<PayloadKind>, EngineError> {
        self.pipeline.steps.iter().map(|s| s.parse()).collect()
    }

    /// Iteration cap and temperature for one step, overrides applied
    pub fn step_settings(&self, kind: PayloadKind) -> StepSettings {
        let overrides = self.pipeline.overrides.get(kind.as_str());

        StepSettings {
            max_iterations: overrides
                .and_then(|o| o.max_iterations)
                .unwrap_or(self.pipeline.max_iterations),
            temperature: overrides
                .and_then(|o| o.temperature)
                .unwrap_or_else(|| default_temperature(kind)),
        }
    }

    /// Validate and process configuration
    ///
    /// Dependency order between steps is checked when the orchestrator is
    /// built, since it depends on each strategy's declared inputs.
    pub fn validate_and_process(&mut self) -> Result<(), EngineError> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.core.log_level.as_str()) {
            return Err(EngineError::InvalidConfiguration(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.core.log_level,
                valid_log_levels.join(", ")
            )));
        }

        if !VALID_PROVIDERS.contains(&self.llm.default_provider.as_str()) {
            return Err(EngineError::InvalidConfiguration(format!(
                "Invalid default provider '{}'. Must be one of: {}",
                self.llm.default_provider,
                VALID_PROVIDERS.join(", ")
            )));
        }

        if let Some(fallback) = &self.llm.fallback_provider {
            if !VALID_PROVIDERS.contains(&fallback.as_str()) {
                return Err(EngineError::InvalidConfiguration(format!(
                    "Invalid fallback provider '{}'. Must be one of: {}",
                    fallback,
                    VALID_PROVIDERS.join(", ")
                )));
            }
            if *fallback == self.llm.default_provider {
                return Err(EngineError::InvalidConfiguration(
                    "fallback_provider must differ from default_provider".to_string(),
                ));
            }
        }

        if self.llm.timeout_secs == 0 {
            return Err(EngineError::InvalidConfiguration(
                "timeout_secs must be at least 1".to_string(),
            ));
        }

        if self.pipeline.max_iterations == 0 {
            return Err(EngineError::InvalidConfiguration(
                "max_iterations must be at least 1".to_string(),
            ));
        }

        if self.pipeline.steps.is_empty() {
            return Err(EngineError::InvalidConfiguration(
                "pipeline.steps must name at least one step".to_string(),
            ));
        }

        let kinds = self.pipeline_kinds()?;
        let mut seen = HashSet::new();
        for kind in &kinds {
            if !seen.insert(*kind) {
                return Err(EngineError::InvalidConfiguration(format!(
                    "Step '{}' appears more than once",
                    kind
                )));
            }
        }

        for (name, step) in &self.pipeline.overrides {
            name.parse::<PayloadKind>()?;

            if step.max_iterations == Some(0) {
                return Err(EngineError::InvalidConfiguration(format!(
                    "max_iterations for '{}' must be at least 1",
                    name
                )));
            }
            if let Some(t) = step.temperature {
                if !(0.0..=2.0).contains(&t) {
                    return Err(EngineError::InvalidConfiguration(format!(
                        "temperature for '{}' must be between 0.0 and 2.0",
                        name
                    )));
                }
            }
        }

        self.core.data_dir = expand_path(&self.core.data_dir)?;
        self.core.output_dir = expand_path(&self.core.output_dir)?;

        Ok(())
    }
}

/// Expand ~ in path to user's home directory
fn expand_path(path: &Path) -> Result<PathBuf, EngineError> {
    let path_str = path
        .to_str()
        .ok_or_else(|| EngineError::Config("Invalid UTF-8 in path".to_string()))?;

    if let Some(rest) = path_str.strip_prefix("~/") {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(rest))
    } else if path_str == "~" {
        dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))
    } else {
        Ok(path.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_toml() -> &'static str {
        r#"
[core]
log_level = "debug"
data_dir = "/tmp/scribe-test"

[llm]
default_provider = "ollama"
"#
    }

    #[test]
    fn test_default_config_is_valid() {
        let mut config = Config::default();
        config.validate_and_process().unwrap();

        assert_eq!(config.core.log_level, "info");
        assert_eq!(config.llm.default_provider, "openai");
        assert_eq!(config.llm.openai.model, "gpt-4o-mini");
        assert_eq!(config.llm.openai.max_tokens, 500);
        assert_eq!(config.pipeline.max_iterations, 3);
        assert_eq!(config.pipeline_kinds().unwrap(), PayloadKind::ALL.to_vec());
    }

    #[test]
    fn test_minimal_toml_fills_defaults() {
        let config = Config::from_toml(minimal_toml()).unwrap();

        assert_eq!(config.core.log_level, "debug");
        assert_eq!(config.core.data_dir, PathBuf::from("/tmp/scribe-test"));
        assert_eq!(config.llm.timeout_secs, 120);
        assert_eq!(config.llm.ollama.base_url, "http://localhost:11434");
        assert_eq!(config.pipeline.steps.len(), 5);
        assert_eq!(config.db_path(), PathBuf::from("/tmp/scribe-test/scribe.db"));
    }

    #[test]
    fn test_expand_path_with_tilde() {
        let expanded = expand_path(&PathBuf::from("~/scribe")).unwrap();
        let home = dirs::home_dir().unwrap();
        assert_eq!(expanded, home.join("scribe"));
    }

    #[test]
    fn test_expand_path_without_tilde() {
        let path = PathBuf::from("/absolute/path");
        assert_eq!(expand_path(&path).unwrap(), path);
    }

    #[test]
    fn test_zero_iteration_cap_rejected() {
        let toml = format!("{}\n[pipeline]\nmax_iterations = 0\n", minimal_toml());
        let err = Config::from_toml(&toml).unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_unknown_step_rejected() {
        let toml = format!(
            "{}\n[pipeline]\nsteps = [\"insights\", \"summary\"]\n",
            minimal_toml()
        );
        let err = Config::from_toml(&toml).unwrap_err();
        assert!(err.to_string().contains("Unknown step 'summary'"));
    }

    #[test]
    fn test_duplicate_step_rejected() {
        let toml = format!(
            "{}\n[pipeline]\nsteps = [\"insights\", \"insights\"]\n",
            minimal_toml()
        );
        assert!(Config::from_toml(&toml).is_err());
    }

    #[test]
    fn test_override_temperature_range() {
        let toml = format!(
            "{}\n[pipeline.overrides.notes]\ntemperature = 3.5\n",
            minimal_toml()
        );
        let err = Config::from_toml(&toml).unwrap_err();
        assert!(err.to_string().contains("temperature for 'notes'"));
    }

    #[test]
    fn test_fallback_must_differ() {
        let toml = minimal_toml().replace(
            "default_provider = \"ollama\"",
            "default_provider = \"ollama\"\nfallback_provider = \"ollama\"",
        );
        assert!(Config::from_toml(&toml).is_err());
    }

    #[test]
    fn test_invalid_log_level() {
        let toml = minimal_toml().replace("debug", "verbose");
        let err = Config::from_toml(&toml).unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_parse_error_is_config_error() {
        let err = Config::from_toml("[core\nlog_level=").unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
    }

    #[test]
    fn test_step_settings_apply_overrides() {
        let toml = format!(
            "{}\n[pipeline]\nmax_iterations = 2\n\n[pipeline.overrides.todos]\nmax_iterations = 4\ntemperature = 0.0\n",
            minimal_toml()
        );
        let config = Config::from_toml(&toml).unwrap();

        assert_eq!(
            config.step_settings(PayloadKind::Todos),
            StepSettings {
                max_iterations: 4,
                temperature: 0.0
            }
        );
        assert_eq!(
            config.step_settings(PayloadKind::Insights),
            StepSettings {
                max_iterations: 2,
                temperature: 0.3
            }
        );
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_string = toml::to_string_pretty(&config).unwrap();

        let parsed: Config = toml::from_str(&toml_string).unwrap();
        assert_eq!(parsed.llm.default_provider, config.llm.default_provider);
        assert_eq!(parsed.pipeline.steps, config.pipeline.steps);
        assert_eq!(parsed.core.data_dir, config.core.data_dir);
    }

    #[test]
    fn test_load_from_path() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, minimal_toml()).unwrap();

        let config = Config::load_from_path(&path).unwrap();
        assert_eq!(config.llm.default_provider, "ollama");

        let missing = Config::load_from_path(&dir.path().join("nope.toml"));
        assert!(matches!(missing, Err(EngineError::Config(_))));
    }
}

//! Application Configuration Module
//!
//! Loads settings from environment variables (and a `.env` file, if present)
//! into a single struct shared by every subcommand.

use std::env;
use std::path::PathBuf;
use tracing::Level;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ProviderKind {
    Gemini,
    #[value(name = "openai")]
    OpenAi,
    Offline,
}

impl std::str::FromStr for ProviderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gemini" => Ok(ProviderKind::Gemini),
            "openai" => Ok(ProviderKind::OpenAi),
            "offline" => Ok(ProviderKind::Offline),
            _ => Err(ConfigError::InvalidProvider(s.to_string())),
        }
    }
}

/// Holds all configuration loaded from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub provider: ProviderKind,
    pub openai_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
    pub chat_model: Option<String>,
    pub base_url: Option<String>,
    pub data_dir: PathBuf,
    pub prompts_dir: Option<PathBuf>,
    pub explanation_language: Option<String>,
    pub tts_command: Option<String>,
    pub log_level: Level,
}

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid log level provided for RUST_LOG: {0}")]
    InvalidLogLevel(String),
    #[error("Invalid provider for POLYGLOT_PROVIDER: {0} (expected gemini, openai or offline)")]
    InvalidProvider(String),
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    // *   `POLYGLOT_PROVIDER`: "gemini" (default), "openai" or "offline".
    // *   `GEMINI_API_KEY` / `OPENAI_API_KEY`: required by the matching provider.
    // *   `CHAT_MODEL`: (Optional) Model name. Defaults per provider.
    // *   `GATEWAY_BASE_URL`: (Optional) Override of the provider endpoint.
    // *   `POLYGLOT_DATA_DIR`: (Optional) Store directory. Defaults to "polyglot-data".
    // *   `POLYGLOT_PROMPTS_DIR`: (Optional) Directory of `<task>.md` prompt overrides.
    // *   `POLYGLOT_EXPLAIN_IN`: (Optional) Language for explanations and subtitles.
    // *   `POLYGLOT_TTS_COMMAND`: (Optional) Program run as `<cmd> <locale> <text>` to speak.
    // *   `RUST_LOG`: (Optional) The logging level. Defaults to "INFO".
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file. This is useful for local development and is ignored if not present.
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let provider = match lookup("POLYGLOT_PROVIDER") {
            Some(raw) => raw.parse()?,
            None => ProviderKind::Gemini,
        };

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str
            .parse::<Level>()
            .map_err(|_| ConfigError::InvalidLogLevel(log_level_str))?;

        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(Self {
            provider,
            openai_api_key: non_empty("OPENAI_API_KEY"),
            gemini_api_key: non_empty("GEMINI_API_KEY"),
            chat_model: non_empty("CHAT_MODEL"),
            base_url: non_empty("GATEWAY_BASE_URL"),
            data_dir: non_empty("POLYGLOT_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("polyglot-data")),
            prompts_dir: non_empty("POLYGLOT_PROMPTS_DIR").map(PathBuf::from),
            explanation_language: non_empty("POLYGLOT_EXPLAIN_IN"),
            tts_command: non_empty("POLYGLOT_TTS_COMMAND"),
            log_level,
        })
    }

    /// The API key the selected provider needs. `None` for the offline provider.
    pub fn api_key(&self) -> Result<Option<&str>, ConfigError> {
        match self.provider {
            ProviderKind::Offline => Ok(None),
            ProviderKind::OpenAi => self.openai_api_key.as_deref().map(Some).ok_or_else(|| {
                ConfigError::MissingVar("OPENAI_API_KEY must be set for openai provider".to_string())
            }),
            ProviderKind::Gemini => self.gemini_api_key.as_deref().map(Some).ok_or_else(|| {
                ConfigError::MissingVar("GEMINI_API_KEY must be set for gemini provider".to_string())
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_to_gemini_and_local_data_dir() {
        let config = config(&[]).unwrap();
        assert_eq!(config.provider, ProviderKind::Gemini);
        assert_eq!(config.data_dir, PathBuf::from("polyglot-data"));
        assert_eq!(config.log_level, Level::INFO);
        assert!(config.chat_model.is_none());
    }

    #[test]
    fn missing_key_is_reported_for_the_selected_provider() {
        let config = config(&[("POLYGLOT_PROVIDER", "openai"), ("GEMINI_API_KEY", "g")]).unwrap();
        assert!(matches!(config.api_key(), Err(ConfigError::MissingVar(msg)) if msg.contains("OPENAI")));
    }

    #[test]
    fn offline_needs_no_key() {
        let config = config(&[("POLYGLOT_PROVIDER", "Offline")]).unwrap();
        assert_eq!(config.api_key().unwrap(), None);
    }

    #[test]
    fn rejects_bad_provider_and_log_level() {
        assert!(matches!(
            config(&[("POLYGLOT_PROVIDER", "claude")]),
            Err(ConfigError::InvalidProvider(_))
        ));
        assert!(matches!(
            config(&[("RUST_LOG", "chatty")]),
            Err(ConfigError::InvalidLogLevel(_))
        ));
    }

    #[test]
    fn blank_values_count_as_unset() {
        let config = config(&[("GEMINI_API_KEY", "  "), ("POLYGLOT_DATA_DIR", "/tmp/pg")]).unwrap();
        assert!(config.api_key().is_err());
        assert_eq!(config.data_dir, PathBuf::from("/tmp/pg"));
    }
}

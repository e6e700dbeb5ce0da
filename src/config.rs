//! Environment configuration

use crate::state_machine::UnmatchedPolicy;
use thiserror::Error;

const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";
const DEFAULT_MAX_CONVERSATIONS: usize = 10_000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingVar(&'static str),
    #[error("invalid value for {var}: {value:?}")]
    InvalidValue { var: &'static str, value: String },
}

/// Process configuration, read once at startup
#[derive(Debug, Clone)]
pub struct Config {
    /// Bot token for the chat platform
    pub telegram_token: String,
    /// API key for the AI service
    pub gemini_api_key: String,
    /// Model used for summarization and question answering
    pub gemini_model: String,
    /// What to do with message shapes the bot has no handler for
    pub unmatched_policy: UnmatchedPolicy,
    /// Upper bound on conversations held in the in-memory store
    pub max_conversations: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            telegram_token: require("TELEGRAM_BOT_TOKEN")?,
            gemini_api_key: require("GEMINI_API_KEY")?,
            gemini_model: std::env::var("DOCRELAY_GEMINI_MODEL")
                .unwrap_or_else(|_| DEFAULT_GEMINI_MODEL.to_string()),
            unmatched_policy: match std::env::var("DOCRELAY_UNMATCHED_POLICY") {
                Ok(value) => parse_policy(&value).ok_or(ConfigError::InvalidValue {
                    var: "DOCRELAY_UNMATCHED_POLICY",
                    value,
                })?,
                Err(_) => UnmatchedPolicy::default(),
            },
            max_conversations: match std::env::var("DOCRELAY_MAX_CONVERSATIONS") {
                Ok(value) => value.parse().map_err(|_| ConfigError::InvalidValue {
                    var: "DOCRELAY_MAX_CONVERSATIONS",
                    value,
                })?,
                Err(_) => DEFAULT_MAX_CONVERSATIONS,
            },
        })
    }
}

fn require(var: &'static str) -> Result<String, ConfigError> {
    match std::env::var(var) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(ConfigError::MissingVar(var)),
    }
}

fn parse_policy(value: &str) -> Option<UnmatchedPolicy> {
    match value.to_ascii_lowercase().as_str() {
        "ignore" => Some(UnmatchedPolicy::Ignore),
        "hint" => Some(UnmatchedPolicy::Hint),
        _ => None,
    }
}

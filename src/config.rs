//! Runtime configuration
//!
//! Read from the process environment (after `dotenv`) by the binaries.
//! `from_lookup` takes any key lookup so tests never touch the real env.

use crate::error::ChatError;
use crate::memory::{ContextConfig, OverflowPolicy, DEFAULT_HISTORY_LIMIT};
use crate::Result;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.deepseek.com/v1";
pub const DEFAULT_MODEL: &str = "deepseek-chat";
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 8000;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_MAX_TRANSACTIONS_IN_LIST: usize = 5;
pub const DEFAULT_PORT: u16 = 8003;
/// Upper bound on `CHAT_HISTORY_LIMIT`
pub const MAX_HISTORY_LIMIT: usize = 10_000;

/// Connection settings for the completion service
#[derive(Debug, Clone)]
pub struct CompletionConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub max_output_tokens: u32,
    pub request_timeout: Duration,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub name: String,
    pub completion: CompletionConfig,
    pub history_limit: usize,
    pub max_transactions_in_list: usize,
    pub port: u16,
    pub context: ContextConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: "Ledger Chat Assistant".to_string(),
            completion: CompletionConfig::default(),
            history_limit: DEFAULT_HISTORY_LIMIT,
            max_transactions_in_list: DEFAULT_MAX_TRANSACTIONS_IN_LIST,
            port: DEFAULT_PORT,
            context: ContextConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        // First non-blank value among `keys`
        let get = |keys: &[&str]| -> Option<String> {
            keys.iter()
                .filter_map(|key| lookup(*key))
                .map(|value| value.trim().to_string())
                .find(|value| !value.is_empty())
        };

        let defaults = AppConfig::default();

        let completion = CompletionConfig {
            base_url: get(&["COMPLETION_API_URL", "DEEPSEEK_API_URL"])
                .unwrap_or(defaults.completion.base_url),
            model: get(&["COMPLETION_MODEL", "DEEPSEEK_MODEL"])
                .unwrap_or(defaults.completion.model),
            api_key: get(&["COMPLETION_API_KEY", "DEEPSEEK_API_KEY"]),
            max_output_tokens: parse_or(
                "MAX_OUTPUT_TOKENS",
                get(&["MAX_OUTPUT_TOKENS"]),
                defaults.completion.max_output_tokens,
            )?,
            request_timeout: Duration::from_secs(parse_or(
                "REQUEST_TIMEOUT_SECS",
                get(&["REQUEST_TIMEOUT_SECS"]),
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )?),
        };

        let context = ContextConfig {
            max_input_chars: parse_or(
                "MAX_INPUT_CHARS",
                get(&["MAX_INPUT_CHARS"]),
                defaults.context.max_input_chars,
            )?,
            overflow: match get(&["INPUT_OVERFLOW_POLICY"]) {
                Some(raw) => raw.parse::<OverflowPolicy>()?,
                None => defaults.context.overflow,
            },
        };

        let config = AppConfig {
            name: defaults.name,
            completion,
            history_limit: parse_or(
                "CHAT_HISTORY_LIMIT",
                get(&["CHAT_HISTORY_LIMIT"]),
                defaults.history_limit,
            )?,
            max_transactions_in_list: parse_or(
                "MAX_TRANSACTIONS_IN_LIST",
                get(&["MAX_TRANSACTIONS_IN_LIST"]),
                defaults.max_transactions_in_list,
            )?,
            port: parse_or("PORT", get(&["PORT", "API_PORT"]), defaults.port)?,
            context,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.history_limit == 0 || self.history_limit > MAX_HISTORY_LIMIT {
            return Err(ChatError::Config(format!(
                "CHAT_HISTORY_LIMIT must be between 1 and {}",
                MAX_HISTORY_LIMIT
            )));
        }
        if self.context.max_input_chars == 0 {
            return Err(ChatError::Config("MAX_INPUT_CHARS must be at least 1".to_string()));
        }
        if self.completion.max_output_tokens == 0 {
            return Err(ChatError::Config("MAX_OUTPUT_TOKENS must be at least 1".to_string()));
        }
        if self.completion.request_timeout.is_zero() {
            return Err(ChatError::Config("REQUEST_TIMEOUT_SECS must be at least 1".to_string()));
        }
        Ok(())
    }
}

fn parse_or<T>(key: &str, raw: Option<String>, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        Some(value) => value
            .parse()
            .map_err(|e| ChatError::Config(format!("invalid {} '{}': {}", key, value, e))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_pairs(pairs: &[(&str, &str)]) -> Result<AppConfig> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_when_env_is_empty() {
        let config = from_pairs(&[]).unwrap();
        assert_eq!(config.completion.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.completion.model, DEFAULT_MODEL);
        assert!(config.completion.api_key.is_none());
        assert_eq!(config.completion.max_output_tokens, 8000);
        assert_eq!(config.history_limit, 50);
        assert_eq!(config.max_transactions_in_list, 5);
        assert_eq!(config.port, 8003);
        assert_eq!(config.context.overflow, OverflowPolicy::Truncate);
    }

    #[test]
    fn test_primary_keys_win_over_fallbacks() {
        let config = from_pairs(&[
            ("COMPLETION_API_KEY", "primary"),
            ("DEEPSEEK_API_KEY", "fallback"),
            ("DEEPSEEK_MODEL", "deepseek-reasoner"),
            ("API_PORT", "9000"),
        ])
        .unwrap();
        assert_eq!(config.completion.api_key.as_deref(), Some("primary"));
        assert_eq!(config.completion.model, "deepseek-reasoner");
        assert_eq!(config.port, 9000);
    }

    #[test]
    fn test_blank_values_are_ignored() {
        let config = from_pairs(&[("COMPLETION_API_KEY", "  "), ("DEEPSEEK_API_KEY", "k")]).unwrap();
        assert_eq!(config.completion.api_key.as_deref(), Some("k"));
    }

    #[test]
    fn test_invalid_values_are_config_errors() {
        assert!(matches!(
            from_pairs(&[("PORT", "eighty")]),
            Err(ChatError::Config(_))
        ));
        assert!(matches!(
            from_pairs(&[("INPUT_OVERFLOW_POLICY", "ignore")]),
            Err(ChatError::Config(_))
        ));
        assert!(matches!(
            from_pairs(&[("CHAT_HISTORY_LIMIT", "0")]),
            Err(ChatError::Config(_))
        ));
    }

    #[test]
    fn test_history_limit_upper_bound() {
        let at_max = MAX_HISTORY_LIMIT.to_string();
        assert_eq!(
            from_pairs(&[("CHAT_HISTORY_LIMIT", at_max.as_str())])
                .unwrap()
                .history_limit,
            MAX_HISTORY_LIMIT
        );

        let above = (MAX_HISTORY_LIMIT + 1).to_string();
        let huge = usize::MAX.to_string();
        for value in [above.as_str(), huge.as_str()] {
            assert!(matches!(
                from_pairs(&[("CHAT_HISTORY_LIMIT", value)]),
                Err(ChatError::Config(_))
            ));
        }
    }

    #[test]
    fn test_input_budget_settings() {
        let config = from_pairs(&[
            ("MAX_INPUT_CHARS", "120"),
            ("INPUT_OVERFLOW_POLICY", "reject"),
            ("REQUEST_TIMEOUT_SECS", "15"),
        ])
        .unwrap();
        assert_eq!(config.context.max_input_chars, 120);
        assert_eq!(config.context.overflow, OverflowPolicy::Reject);
        assert_eq!(config.completion.request_timeout, Duration::from_secs(15));
    }
}

//! Input budget management
//!
//! Bounds the user message before it is placed in the model prompt, so a
//! single oversized message cannot blow the token budget.

use crate::error::ChatError;
use crate::Result;
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;
use tracing::info;

/// Default cap on characters of user input forwarded to the model
pub const DEFAULT_MAX_INPUT_CHARS: usize = 4_000;

/// What to do with a message longer than the budget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverflowPolicy {
    /// Keep the leading `max_input_chars` characters
    Truncate,
    /// Refuse the message
    Reject,
}

impl FromStr for OverflowPolicy {
    type Err = ChatError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "truncate" => Ok(OverflowPolicy::Truncate),
            "reject" => Ok(OverflowPolicy::Reject),
            other => Err(ChatError::Config(format!(
                "unknown input overflow policy '{}' (expected 'truncate' or 'reject')",
                other
            ))),
        }
    }
}

impl fmt::Display for OverflowPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverflowPolicy::Truncate => write!(f, "truncate"),
            OverflowPolicy::Reject => write!(f, "reject"),
        }
    }
}

/// Configuration for the input budget
#[derive(Debug, Clone)]
pub struct ContextConfig {
    /// Maximum characters of user text sent to the model
    pub max_input_chars: usize,
    pub overflow: OverflowPolicy,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_input_chars: DEFAULT_MAX_INPUT_CHARS,
            overflow: OverflowPolicy::Truncate,
        }
    }
}

/// Applies the input budget to incoming messages
#[derive(Debug, Clone)]
pub struct ContextManager {
    config: ContextConfig,
}

impl ContextManager {
    pub fn new() -> Self {
        Self {
            config: ContextConfig::default(),
        }
    }

    pub fn with_config(config: ContextConfig) -> Self {
        Self { config }
    }

    /// Bound `text` to the configured budget.
    ///
    /// Borrows when the text already fits. Counts characters, not bytes, so
    /// truncation never splits a UTF-8 sequence.
    pub fn bound_input<'a>(&self, text: &'a str) -> Result<Cow<'a, str>> {
        let max = self.config.max_input_chars;
        let char_count = text.chars().count();

        if char_count <= max {
            return Ok(Cow::Borrowed(text));
        }

        match self.config.overflow {
            OverflowPolicy::Truncate => {
                info!(
                    original_chars = char_count,
                    max_chars = max,
                    "Truncating oversized user message"
                );
                Ok(Cow::Owned(text.chars().take(max).collect()))
            }
            OverflowPolicy::Reject => Err(ChatError::Validation(format!(
                "message is {} characters; the limit is {}",
                char_count, max
            ))),
        }
    }
}

impl Default for ContextManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Rough token estimate (about four bytes per token)
pub fn estimate_tokens(text: &str) -> usize {
    (text.len() + 3) / 4
}

//! Ledger Chat Assistant
//!
//! A conversational assistant for a personal-finance tracker that:
//! - Turns each free-form message into exactly one outcome
//!   (plain reply, app-modification directive, or ledger entry)
//! - Calls the completion service through bounded exponential backoff
//! - Keeps a bounded, ordered, in-memory conversation history
//! - Never lets an internal error escape to the caller
//!
//! PIPELINE:
//! RECEIVED → CONTEXT BUILT → MODEL CALLED → INTERPRETED → (LEDGER APPLIED)? → RECORDED → RETURNED

pub mod agent;
pub mod api;
pub mod completion;
pub mod config;
pub mod error;
pub mod interpreter;
pub mod ledger;
pub mod memory;
pub mod models;
pub mod prompt;
pub mod retry;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::{ChatError, Result};

// Re-export common types
pub use agent::{AssistantConfig, ChatOrchestrator};
pub use models::*;
pub use retry::{RetryError, RetryExecutor, RetryPolicy};

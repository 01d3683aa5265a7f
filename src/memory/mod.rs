//! Assistant Memory
//!
//! Bounded conversation history shared across requests, plus the input
//! budget applied before a message reaches the model

pub mod store;
pub mod context_manager;

pub use store::{ConversationHistory, ConversationMemory, Turn, TurnRole, DEFAULT_HISTORY_LIMIT};
pub use context_manager::{ContextConfig, ContextManager, OverflowPolicy};

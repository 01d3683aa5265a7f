//! Chat orchestrator - one linear pipeline per message
//!
//! RECEIVED → CONTEXT BUILT → MODEL CALLED → INTERPRETED → (LEDGER APPLIED)? → RECORDED → RETURNED

use crate::completion::{CompletionRequest, CompletionService, SamplingParams};
use crate::config::AppConfig;
use crate::error::ChatError;
use crate::interpreter::{PatternInterpreter, ResponseInterpreter};
use crate::ledger::{FinancialSummaryProvider, TransactionSink};
use crate::memory::context_manager::estimate_tokens;
use crate::memory::{ContextConfig, ContextManager, ConversationMemory, Turn, TurnRole};
use crate::models::{ChatOutcome, InterpretedResponse};
use crate::prompt::{build_messages, PromptContext};
use crate::retry::{RetryExecutor, RetryPolicy};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

pub const GENERIC_ERROR_REPLY: &str =
    "Sorry, I encountered an error processing your request. Please try again.";
pub const EMPTY_MESSAGE_REPLY: &str = "Please type a message so I can help.";
pub const MESSAGE_TOO_LONG_REPLY: &str =
    "That message is too long for me to process. Please shorten it and try again.";

/// Pipeline milestones, logged as each one is reached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageStage {
    Received,
    ContextBuilt,
    ModelCalled,
    Interpreted,
    LedgerApplied,
    Recorded,
    Returned,
}

impl fmt::Display for MessageStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MessageStage::Received => "received",
            MessageStage::ContextBuilt => "context_built",
            MessageStage::ModelCalled => "model_called",
            MessageStage::Interpreted => "interpreted",
            MessageStage::LedgerApplied => "ledger_applied",
            MessageStage::Recorded => "recorded",
            MessageStage::Returned => "returned",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone)]
pub struct AssistantConfig {
    pub completion_retry: RetryPolicy,
    pub ledger_retry: RetryPolicy,
    pub max_output_tokens: u32,
    pub sampling: SamplingParams,
    pub context: ContextConfig,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            completion_retry: RetryPolicy::default(),
            ledger_retry: RetryPolicy::default(),
            max_output_tokens: crate::config::DEFAULT_MAX_OUTPUT_TOKENS,
            sampling: SamplingParams::default(),
            context: ContextConfig::default(),
        }
    }
}

impl From<&AppConfig> for AssistantConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            max_output_tokens: config.completion.max_output_tokens,
            context: config.context.clone(),
            ..Self::default()
        }
    }
}

/// Error plus the last stage reached before it
struct PipelineFailure {
    stage: MessageStage,
    error: ChatError,
}

fn failed_at(stage: MessageStage) -> impl FnOnce(ChatError) -> PipelineFailure {
    move |error| PipelineFailure { stage, error }
}

/// Entry point for every user message
pub struct ChatOrchestrator {
    memory: ConversationMemory,
    completion: Arc<dyn CompletionService>,
    summary: Arc<dyn FinancialSummaryProvider>,
    sink: Arc<dyn TransactionSink>,
    interpreter: Box<dyn ResponseInterpreter>,
    retry: RetryExecutor,
    context: ContextManager,
    config: AssistantConfig,
}

impl ChatOrchestrator {
    pub fn new(
        memory: ConversationMemory,
        completion: Arc<dyn CompletionService>,
        summary: Arc<dyn FinancialSummaryProvider>,
        sink: Arc<dyn TransactionSink>,
        config: AssistantConfig,
    ) -> Self {
        Self {
            memory,
            completion,
            summary,
            sink,
            interpreter: Box::new(PatternInterpreter::new()),
            retry: RetryExecutor::new(),
            context: ContextManager::with_config(config.context.clone()),
            config,
        }
    }

    /// Swap in a different interpreter
    pub fn with_interpreter(mut self, interpreter: Box<dyn ResponseInterpreter>) -> Self {
        self.interpreter = interpreter;
        self
    }

    /// Handle one message. Never fails: every error becomes a text outcome.
    pub async fn process_message(&self, text: &str) -> ChatOutcome {
        let request_id = Uuid::new_v4();
        let start_time = Instant::now();

        if text.trim().is_empty() {
            debug!(%request_id, "Ignoring blank message");
            return ChatOutcome::text(EMPTY_MESSAGE_REPLY);
        }

        let bounded = match self.context.bound_input(text) {
            Ok(bounded) => bounded,
            Err(e) => {
                warn!(%request_id, error = %e, "Rejecting oversized message");
                self.memory.record(TurnRole::User, text).await;
                self.memory
                    .record(TurnRole::Assistant, MESSAGE_TOO_LONG_REPLY)
                    .await;
                return ChatOutcome::text(MESSAGE_TOO_LONG_REPLY);
            }
        };

        info!(
            %request_id,
            chars = text.chars().count(),
            est_tokens = estimate_tokens(&bounded),
            "Processing chat message"
        );

        // The transcript keeps what the user actually typed
        self.memory.record(TurnRole::User, text).await;
        debug!(%request_id, stage = %MessageStage::Received, "Stage reached");

        let outcome = match self.run_pipeline(request_id, &bounded).await {
            Ok((raw, outcome)) => {
                self.memory.record(TurnRole::Assistant, raw).await;
                outcome
            }
            Err(failure) => {
                error!(
                    %request_id,
                    stage = %failure.stage,
                    error = %failure.error,
                    "Chat pipeline failed"
                );
                self.memory
                    .record(TurnRole::Assistant, GENERIC_ERROR_REPLY)
                    .await;
                ChatOutcome::text(GENERIC_ERROR_REPLY)
            }
        };
        debug!(%request_id, stage = %MessageStage::Recorded, "Stage reached");

        info!(
            %request_id,
            stage = %MessageStage::Returned,
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "Chat message processed"
        );

        outcome
    }

    /// Steps 2-6. Returns the raw model text and the outcome to hand back.
    async fn run_pipeline(
        &self,
        request_id: Uuid,
        message: &str,
    ) -> std::result::Result<(String, ChatOutcome), PipelineFailure> {
        let snapshot = self
            .summary
            .financial_snapshot()
            .await
            .map_err(failed_at(MessageStage::Received))?;

        let request = CompletionRequest {
            messages: build_messages(&PromptContext::today(snapshot), message),
            max_output_tokens: self.config.max_output_tokens,
            sampling: self.config.sampling,
        };
        debug!(%request_id, stage = %MessageStage::ContextBuilt, "Stage reached");

        let raw = self
            .retry
            .execute_if(
                &self.config.completion_retry,
                || self.completion.complete(&request),
                ChatError::is_retryable,
            )
            .await
            .map_err(|e| failed_at(MessageStage::ContextBuilt)(e.into()))?;
        debug!(%request_id, stage = %MessageStage::ModelCalled, "Stage reached");

        let interpreted = self.interpreter.parse(&raw);
        debug!(%request_id, stage = %MessageStage::Interpreted, "Stage reached");

        let outcome = match interpreted {
            InterpretedResponse::PlainReply { text } => ChatOutcome::text(text),
            InterpretedResponse::FeatureDirective { reply, directive } => {
                info!(
                    %request_id,
                    kind = %directive.kind,
                    feature = %directive.name,
                    "Feature directive requested"
                );
                ChatOutcome::Directive {
                    content: reply,
                    directive,
                }
            }
            InterpretedResponse::LedgerInstruction(instruction) => {
                let record = self
                    .retry
                    .execute(&self.config.ledger_retry, || {
                        self.sink.record_transaction(
                            instruction.tx_type,
                            instruction.amount,
                            &instruction.description,
                        )
                    })
                    .await
                    .map_err(|e| failed_at(MessageStage::Interpreted)(e.into()))?;

                info!(
                    %request_id,
                    stage = %MessageStage::LedgerApplied,
                    transaction_id = record.id,
                    tx_type = %record.tx_type,
                    amount = record.amount,
                    "Ledger instruction applied"
                );
                ChatOutcome::text(raw.clone())
            }
        };

        Ok((raw, outcome))
    }

    /// Independent snapshot of the conversation, oldest first
    pub async fn history(&self) -> Vec<Turn> {
        self.memory.snapshot().await
    }
}

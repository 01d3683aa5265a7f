//! Scripted collaborators shared by unit tests

use crate::completion::{CompletionRequest, CompletionService};
use crate::error::ChatError;
use crate::ledger::{FinancialSummaryProvider, TransactionSink};
use crate::models::{FinancialContextSnapshot, TransactionRecord, TransactionType};
use crate::Result;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

/// One scripted completion result
#[derive(Debug, Clone)]
pub enum Step {
    Reply(String),
    /// Retryable failure (e.g. a 503)
    Transient,
    /// Permanent failure (e.g. a 401)
    Rejected,
}

/// Plays back steps in order; the last step repeats forever
pub struct ScriptedCompletion {
    steps: Mutex<VecDeque<Step>>,
    calls: AtomicU32,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedCompletion {
    pub fn new(steps: Vec<Step>) -> Self {
        assert!(!steps.is_empty(), "script needs at least one step");
        Self {
            steps: Mutex::new(steps.into()),
            calls: AtomicU32::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn replying(text: &str) -> Self {
        Self::new(vec![Step::Reply(text.to_string())])
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionService for ScriptedCompletion {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());

        let step = {
            let mut steps = self.steps.lock().unwrap();
            if steps.len() > 1 {
                steps.pop_front()
            } else {
                steps.front().cloned()
            }
        };

        match step {
            Some(Step::Reply(text)) => Ok(text),
            Some(Step::Transient) => Err(ChatError::TransientService("status 503: overloaded".into())),
            Some(Step::Rejected) | None => Err(ChatError::ServiceRejected {
                status: 401,
                message: "invalid api key".into(),
            }),
        }
    }
}

pub struct FixedSummary(pub FinancialContextSnapshot);

impl Default for FixedSummary {
    fn default() -> Self {
        Self(FinancialContextSnapshot {
            balance: 1200.0,
            monthly_income: 3000.0,
            monthly_expenses: 1800.0,
        })
    }
}

#[async_trait]
impl FinancialSummaryProvider for FixedSummary {
    async fn financial_snapshot(&self) -> Result<FinancialContextSnapshot> {
        Ok(self.0)
    }
}

pub struct FailingSummary;

#[async_trait]
impl FinancialSummaryProvider for FailingSummary {
    async fn financial_snapshot(&self) -> Result<FinancialContextSnapshot> {
        Err(ChatError::TransientService("ledger offline".into()))
    }
}

/// Sink whose every call fails
#[derive(Default)]
pub struct FailingSink {
    calls: AtomicU32,
}

impl FailingSink {
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TransactionSink for FailingSink {
    async fn record_transaction(
        &self,
        _tx_type: TransactionType,
        _amount: f64,
        _description: &str,
    ) -> Result<TransactionRecord> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(ChatError::TransientService("ledger write failed".into()))
    }
}

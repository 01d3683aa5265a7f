//! Ledger collaborators
//!
//! The orchestrator reads figures through [`FinancialSummaryProvider`] and
//! writes entries through [`TransactionSink`]. [`InMemoryLedger`] backs both
//! for the binaries and tests.

use crate::error::ChatError;
use crate::models::{
    FinancialContextSnapshot, FinancialSummary, LedgerUpdate, TransactionRecord,
    TransactionRequest, TransactionType,
};
use crate::Result;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

/// Source of the current financial figures
#[async_trait::async_trait]
pub trait FinancialSummaryProvider: Send + Sync {
    async fn financial_snapshot(&self) -> Result<FinancialContextSnapshot>;
}

/// Applies a ledger mutation
#[async_trait::async_trait]
pub trait TransactionSink: Send + Sync {
    /// Fails with `ChatError::Validation` on a non-positive amount or blank description
    async fn record_transaction(
        &self,
        tx_type: TransactionType,
        amount: f64,
        description: &str,
    ) -> Result<TransactionRecord>;
}

#[derive(Debug, Default)]
struct LedgerState {
    balance: f64,
    monthly_income: f64,
    monthly_expenses: f64,
    /// Newest first
    transactions: Vec<TransactionRecord>,
    next_id: u64,
}

/// In-memory ledger for development
#[derive(Debug, Clone, Default)]
pub struct InMemoryLedger {
    state: Arc<RwLock<LedgerState>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn summary(&self) -> FinancialSummary {
        let state = self.state.read().await;
        let savings_rate = if state.monthly_income > 0.0 {
            (state.monthly_income - state.monthly_expenses) / state.monthly_income * 100.0
        } else {
            0.0
        };

        FinancialSummary {
            balance: state.balance,
            monthly_income: state.monthly_income,
            monthly_expenses: state.monthly_expenses,
            savings_rate,
        }
    }

    /// Up to `limit` transactions, newest first
    pub async fn recent_transactions(&self, limit: usize) -> Vec<TransactionRecord> {
        let state = self.state.read().await;
        state.transactions.iter().take(limit).cloned().collect()
    }

    /// Validate and apply an entry, returning the updated figures
    pub async fn add_transaction(&self, request: TransactionRequest) -> Result<LedgerUpdate> {
        let description = validate_transaction(request.amount, &request.description)?;

        let mut state = self.state.write().await;

        // sequential ids starting at 1
        state.next_id += 1;
        let record = TransactionRecord {
            id: state.next_id,
            description,
            amount: request.amount,
            tx_type: request.tx_type,
            date: Utc::now(),
        };

        let (new_income, new_expenses) = match record.tx_type {
            TransactionType::Income => {
                state.monthly_income += record.amount;
                state.balance += record.amount;
                (Some(state.monthly_income), None)
            }
            TransactionType::Expense => {
                state.monthly_expenses += record.amount;
                state.balance -= record.amount;
                (None, Some(state.monthly_expenses))
            }
        };

        state.transactions.insert(0, record.clone());

        info!(
            id = record.id,
            tx_type = %record.tx_type,
            amount = record.amount,
            balance = state.balance,
            "Transaction recorded"
        );

        Ok(LedgerUpdate {
            transaction: record,
            new_balance: state.balance,
            new_income,
            new_expenses,
        })
    }
}

fn validate_transaction(amount: f64, description: &str) -> Result<String> {
    let description = description.trim();
    if description.is_empty() {
        return Err(ChatError::Validation(
            "transaction description is required".to_string(),
        ));
    }
    if !amount.is_finite() || amount <= 0.0 {
        return Err(ChatError::Validation(format!(
            "amount must be a positive number, got {}",
            amount
        )));
    }
    Ok(description.to_string())
}

#[async_trait::async_trait]
impl FinancialSummaryProvider for InMemoryLedger {
    async fn financial_snapshot(&self) -> Result<FinancialContextSnapshot> {
        Ok(self.summary().await.snapshot())
    }
}

#[async_trait::async_trait]
impl TransactionSink for InMemoryLedger {
    async fn record_transaction(
        &self,
        tx_type: TransactionType,
        amount: f64,
        description: &str,
    ) -> Result<TransactionRecord> {
        let update = self
            .add_transaction(TransactionRequest {
                description: description.to_string(),
                amount,
                tx_type,
            })
            .await?;
        Ok(update.transaction)
    }
}

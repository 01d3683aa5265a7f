//! Core data models for the ledger chat assistant

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

//
// ================= Enums =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Income,
    Expense,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum FeatureKind {
    NewFeature,
    UpdateFeature,
    FixIssue,
}

//
// ================= Financial Context =================
//

/// Read-only view of the ledger, captured once per message
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FinancialContextSnapshot {
    pub balance: f64,
    pub monthly_income: f64,
    pub monthly_expenses: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FinancialSummary {
    pub balance: f64,
    pub monthly_income: f64,
    pub monthly_expenses: f64,
    /// Percentage of income not spent; 0 when there is no income
    pub savings_rate: f64,
}

impl FinancialSummary {
    pub fn snapshot(&self) -> FinancialContextSnapshot {
        FinancialContextSnapshot {
            balance: self.balance,
            monthly_income: self.monthly_income,
            monthly_expenses: self.monthly_expenses,
        }
    }
}

//
// ================= Ledger =================
//

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransactionRecord {
    pub id: u64,
    pub description: String,
    pub amount: f64,
    #[serde(rename = "type")]
    pub tx_type: TransactionType,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRequest {
    pub description: String,
    pub amount: f64,
    #[serde(rename = "type")]
    pub tx_type: TransactionType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerUpdate {
    pub transaction: TransactionRecord,
    pub new_balance: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_income: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_expenses: Option<f64>,
}

//
// ================= Interpretation =================
//

/// Requested change to the hosting application
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeatureDirective {
    #[serde(rename = "type")]
    pub kind: FeatureKind,
    #[serde(rename = "featureName")]
    pub name: String,
    pub description: String,
}

/// Income or expense recognized in a model reply
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LedgerInstruction {
    pub tx_type: TransactionType,
    pub amount: f64,
    pub description: String,
}

/// Exactly one of these is produced per model call
#[derive(Debug, Clone, PartialEq)]
pub enum InterpretedResponse {
    PlainReply {
        text: String,
    },
    FeatureDirective {
        /// Friendly text carried in the envelope
        reply: String,
        directive: FeatureDirective,
    },
    LedgerInstruction(LedgerInstruction),
}

//
// ================= Outcome =================
//

/// What the caller of `process_message` receives
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ChatOutcome {
    Text {
        content: String,
    },
    Directive {
        content: String,
        directive: FeatureDirective,
    },
}

impl ChatOutcome {
    pub fn text(content: impl Into<String>) -> Self {
        ChatOutcome::Text {
            content: content.into(),
        }
    }

    pub fn content(&self) -> &str {
        match self {
            ChatOutcome::Text { content } | ChatOutcome::Directive { content, .. } => content,
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransactionType::Income => "income",
            TransactionType::Expense => "expense",
        };
        write!(f, "{}", s)
    }
}

impl fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FeatureKind::NewFeature => "newFeature",
            FeatureKind::UpdateFeature => "updateFeature",
            FeatureKind::FixIssue => "fixIssue",
        };
        write!(f, "{}", s)
    }
}

//! Prompt assembly
//!
//! The model sees one system prompt carrying the current financial numbers
//! and the single user message. Conversation history is never sent.

use crate::completion::PromptMessage;
use crate::models::FinancialContextSnapshot;
use chrono::{NaiveDate, Utc};

/// Everything the system prompt embeds
#[derive(Debug, Clone, Copy)]
pub struct PromptContext {
    pub snapshot: FinancialContextSnapshot,
    pub date: NaiveDate,
}

impl PromptContext {
    pub fn today(snapshot: FinancialContextSnapshot) -> Self {
        Self {
            snapshot,
            date: Utc::now().date_naive(),
        }
    }
}

/// Build system prompt with the current ledger figures
pub fn build_system_prompt(ctx: &PromptContext) -> String {
    format!(
        r#"You are a personal finance assistant built into a budget tracker. Help the user track money and answer financial questions.

Current financial data:
- Balance: {balance:.2}
- Monthly income: {income:.2}
- Monthly expenses: {expenses:.2}
- Today's date: {date}

When the user reports an expense, confirm it with a sentence of the form "spent <amount> on <what>".
When the user reports income, confirm it with a sentence of the form "received <amount> from <source>".
Write amounts as plain numbers, optionally prefixed with $.

If the user asks you to add, change or fix something in the app itself, reply with ONLY this JSON:
{{
  "type": "appModification",
  "content": "short friendly explanation of what will be done",
  "modification": {{
    "type": "newFeature|updateFeature|fixIssue",
    "featureName": "name of the feature",
    "description": "what should be implemented"
  }}
}}

Otherwise answer naturally. Keep responses concise and friendly."#,
        balance = ctx.snapshot.balance,
        income = ctx.snapshot.monthly_income,
        expenses = ctx.snapshot.monthly_expenses,
        date = ctx.date.format("%Y-%m-%d"),
    )
}

/// System prompt followed by the user message
pub fn build_messages(ctx: &PromptContext, user_message: &str) -> Vec<PromptMessage> {
    vec![
        PromptMessage::system(build_system_prompt(ctx)),
        PromptMessage::user(user_message),
    ]
}

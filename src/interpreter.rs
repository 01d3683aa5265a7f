//! Response interpretation
//!
//! Turns raw model text into exactly one [`InterpretedResponse`]. All
//! natural-language extraction lives here; the orchestrator only matches on
//! the result.

use crate::models::{
    FeatureDirective, InterpretedResponse, LedgerInstruction, TransactionType,
};
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use serde::Deserialize;
use tracing::debug;

/// Envelope discriminator for application-modification replies
pub const APP_MODIFICATION_TYPE: &str = "appModification";

lazy_static! {
    static ref EXPENSE_PATTERN: Regex = Regex::new(
        r#"(?i)\b(?:spent|paid)\s+\$?(\d{1,3}(?:,\d{3})+(?:\.\d+)?|\d+(?:\.\d+)?)\s+(?:on|for)\s+([^.!?\n"]+)"#
    )
    .expect("expense pattern is valid");
    static ref INCOME_PATTERN: Regex = Regex::new(
        r#"(?i)\b(?:received|earned)\s+\$?(\d{1,3}(?:,\d{3})+(?:\.\d+)?|\d+(?:\.\d+)?)\s+from\s+([^.!?\n"]+)"#
    )
    .expect("income pattern is valid");
}

/// Classifies raw completion text
pub trait ResponseInterpreter: Send + Sync {
    /// Never fails: anything unrecognized is a plain reply
    fn parse(&self, raw: &str) -> InterpretedResponse;
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    content: Option<String>,
    modification: Option<FeatureDirective>,
}

/// JSON envelope first, then expense, then income, else plain text
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternInterpreter;

impl PatternInterpreter {
    pub fn new() -> Self {
        Self
    }
}

impl ResponseInterpreter for PatternInterpreter {
    fn parse(&self, raw: &str) -> InterpretedResponse {
        if let Some((reply, directive)) = extract_directive(raw) {
            debug!(feature = %directive.name, kind = %directive.kind, "Parsed feature directive");
            return InterpretedResponse::FeatureDirective { reply, directive };
        }

        if let Some(instruction) = match_ledger(&EXPENSE_PATTERN, raw, TransactionType::Expense)
            .or_else(|| match_ledger(&INCOME_PATTERN, raw, TransactionType::Income))
        {
            debug!(
                tx_type = %instruction.tx_type,
                amount = instruction.amount,
                "Parsed ledger instruction"
            );
            return InterpretedResponse::LedgerInstruction(instruction);
        }

        InterpretedResponse::PlainReply {
            text: raw.to_string(),
        }
    }
}

/// Parse an `appModification` envelope, optionally wrapped in a ```json fence
fn extract_directive(raw: &str) -> Option<(String, FeatureDirective)> {
    let cleaned = raw
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    if !cleaned.starts_with('{') {
        return None;
    }

    let envelope: Envelope = serde_json::from_str(cleaned).ok()?;
    if envelope.kind != APP_MODIFICATION_TYPE {
        return None;
    }

    let directive = envelope.modification?;
    let reply = envelope
        .content
        .filter(|c| !c.trim().is_empty())
        .unwrap_or_else(|| raw.to_string());

    Some((reply, directive))
}

fn match_ledger(pattern: &Regex, raw: &str, tx_type: TransactionType) -> Option<LedgerInstruction> {
    pattern
        .captures_iter(raw)
        .find_map(|caps| instruction_from(&caps, tx_type))
}

fn instruction_from(caps: &Captures<'_>, tx_type: TransactionType) -> Option<LedgerInstruction> {
    let amount: f64 = caps.get(1)?.as_str().replace(',', "").parse().ok()?;
    if !amount.is_finite() || amount <= 0.0 {
        return None;
    }

    let description = caps
        .get(2)?
        .as_str()
        .trim()
        .trim_end_matches([',', ';', ':'])
        .trim();
    if description.is_empty() {
        return None;
    }

    Some(LedgerInstruction {
        tx_type,
        amount,
        description: description.to_string(),
    })
}

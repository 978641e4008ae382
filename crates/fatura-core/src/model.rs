use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::sections::SectionConfig;

/// Direction of a transaction relative to the cardholder's balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Flow {
    /// Purchase or fee: increases the balance owed.
    Outgoing,
    /// Credit, refund or payment: decreases the balance owed.
    Incoming,
}

impl fmt::Display for Flow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Flow::Outgoing => write!(f, "outgoing"),
            Flow::Incoming => write!(f, "incoming"),
        }
    }
}

/// A single transaction recovered from the statement.
///
/// `amount` is stored signed (negative for `Incoming`) so that per-card
/// summation downstream is plain addition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedTransaction {
    pub date: NaiveDate,
    pub description: String,
    pub amount: Decimal,
    /// Last four digits of the card this transaction was billed to.
    /// `None` for sections of the statement that are not card-scoped
    /// (bank products and services).
    pub last4: Option<String>,
    pub flow: Flow,
    /// Current installment number when the line carried an "n/m" marker.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub installment_number: Option<u32>,
    /// Total number of installments when the line carried an "n/m" marker.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub installment_total: Option<u32>,
}

/// Why a line inside a transactions-eligible context did not produce a
/// transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    NoTransactionPattern,
    ValueExceedsCeiling,
    DateWithoutAmount,
    AmountWithoutDate,
    NoActiveCard,
    InvalidDate,
    UnrecognizedLine,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            RejectReason::NoTransactionPattern => "no transaction pattern found",
            RejectReason::ValueExceedsCeiling => {
                "value exceeds line-item ceiling, likely a subtotal"
            }
            RejectReason::DateWithoutAmount => "date without paired amount",
            RejectReason::AmountWithoutDate => "amount without paired date",
            RejectReason::NoActiveCard => "transaction found before any card header",
            RejectReason::InvalidDate => "date token is not a valid calendar date",
            RejectReason::UnrecognizedLine => "unrecognized line",
        };
        write!(f, "{msg}")
    }
}

/// A line retained for audit because it could not be parsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedLine {
    pub line: String,
    pub reason: RejectReason,
}

/// Per-card comparison of the extracted sum against the control total
/// printed in the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardReconciliation {
    /// Subtotal printed in the statement for this card, when present.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub control_total: Option<Decimal>,
    /// Signed sum of all transactions attributed to this card.
    pub calculated_total: Decimal,
    /// `|calculated_total - control_total|`, when a control total exists.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub delta: Option<Decimal>,
    /// Whether the delta is within the reconciliation tolerance.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub balanced: Option<bool>,
}

/// Aggregate statistics for one parse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseStats {
    /// Number of non-blank lines extracted across all pages.
    pub total_lines: usize,
    /// Number of transactions extracted.
    pub matched: usize,
    /// Number of rejected lines.
    pub rejected: usize,
    /// Sum of `|amount|` over all transactions.
    pub sum_abs_values: Decimal,
    /// Sum of outgoing amounts.
    pub sum_outgoing: Decimal,
    /// Sum of incoming magnitudes.
    pub sum_incoming: Decimal,
    /// Reconciliation entries keyed by card last-4 (the key "unknown"
    /// collects transactions without a card).
    pub by_card: BTreeMap<String, CardReconciliation>,
}

/// Terminal output of one parse invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseResult {
    /// Transactions in original document order.
    pub items: Vec<ParsedTransaction>,
    pub stats: ParseStats,
    /// Rejected lines in original document order, for audit.
    pub rejects: Vec<RejectedLine>,
    /// Internal-consistency violations. Non-empty means a parser bug,
    /// never a document-quality issue.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub defects: Vec<String>,
}

/// Caller-supplied billing-period metadata and heuristic knobs.
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Year applicable to short DD/MM dates. `None` means detect a
    /// four-digit year from the document's first lines.
    pub billing_year: Option<i32>,
    /// Statement month, used only to disambiguate year-end wraparound.
    pub billing_month: Option<u32>,
    /// Amounts above this are statement subtotals, not line items.
    /// Heuristic observed from sample documents; not a business rule.
    pub line_item_ceiling: Decimal,
    /// Maximum per-card delta still considered balanced.
    pub reconcile_tolerance: Decimal,
    /// Section keyword tables; defaults to the builtin statement layout.
    pub sections: SectionConfig,
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions {
            billing_year: None,
            billing_month: None,
            line_item_ceiling: Decimal::new(10_000_00, 2),
            reconcile_tolerance: Decimal::new(1, 2),
            sections: SectionConfig::builtin(),
        }
    }
}

impl ParseOptions {
    /// Options for a statement covering the given billing period.
    pub fn for_period(year: i32, month: Option<u32>) -> Self {
        ParseOptions {
            billing_year: Some(year),
            billing_month: month,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_default_ceiling_and_tolerance() {
        let opts = ParseOptions::default();
        assert_eq!(opts.line_item_ceiling, dec!(10000.00));
        assert_eq!(opts.reconcile_tolerance, dec!(0.01));
        assert!(opts.billing_year.is_none());
    }

    #[test]
    fn test_flow_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Flow::Outgoing).unwrap(), "\"outgoing\"");
        assert_eq!(serde_json::to_string(&Flow::Incoming).unwrap(), "\"incoming\"");
    }

    #[test]
    fn test_reject_reason_snake_case() {
        let json = serde_json::to_string(&RejectReason::ValueExceedsCeiling).unwrap();
        assert_eq!(json, "\"value_exceeds_ceiling\"");
    }
}

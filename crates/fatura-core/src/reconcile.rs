//! Per-card reconciliation of extracted sums against printed subtotals.

use rust_decimal::Decimal;
use std::collections::BTreeMap;

use crate::cards::CardContext;
use crate::model::{CardReconciliation, ParsedTransaction};

/// Map key for transactions that carry no card attribution.
pub const UNKNOWN_CARD: &str = "unknown";

/// Build per-card reconciliation entries and cross-check the tracker's
/// running totals against an independent recomputation from the emitted
/// transactions. Any mismatch between the two is a parser defect, not a
/// document-quality issue.
pub fn reconcile(
    contexts: BTreeMap<String, CardContext>,
    items: &[ParsedTransaction],
    tolerance: Decimal,
) -> (BTreeMap<String, CardReconciliation>, Vec<String>) {
    let mut recomputed: BTreeMap<String, Decimal> = BTreeMap::new();
    for tx in items {
        let key = tx.last4.as_deref().unwrap_or(UNKNOWN_CARD).to_string();
        *recomputed.entry(key).or_insert(Decimal::ZERO) += tx.amount;
    }

    let mut by_card = BTreeMap::new();
    let mut defects = Vec::new();

    for (last4, ctx) in contexts {
        let independent = recomputed
            .remove(&last4)
            .unwrap_or(Decimal::ZERO);
        if independent != ctx.calculated_total {
            let defect = format!(
                "card {last4}: tracked total {} disagrees with recomputed total {}",
                ctx.calculated_total, independent
            );
            tracing::error!(card = %last4, "{defect}");
            defects.push(defect);
        }

        let delta = ctx.control_total.map(|c| (ctx.calculated_total - c).abs());
        let balanced = delta.map(|d| d <= tolerance);
        by_card.insert(
            last4,
            CardReconciliation {
                control_total: ctx.control_total,
                calculated_total: ctx.calculated_total,
                delta,
                balanced,
            },
        );
    }

    // Transactions not scoped to any card still contribute an entry, so
    // the per-card sums add up to the statement-wide sum.
    for (key, total) in recomputed {
        by_card.insert(
            key,
            CardReconciliation {
                control_total: None,
                calculated_total: total,
                delta: None,
                balanced: None,
            },
        );
    }

    (by_card, defects)
}

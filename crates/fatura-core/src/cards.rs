//! Per-card running context across the statement.
//!
//! Cards appear as header lines; every transaction after a header and
//! before the next belongs to that card. Control totals may arrive
//! before or after the card's transactions, so the tracker accumulates
//! both independently and reconciliation runs once at the end.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// Running state for one card.
#[derive(Debug, Clone, PartialEq)]
pub struct CardContext {
    pub last4: String,
    /// Date of the most recent transaction attributed to this card.
    pub last_known_date: Option<NaiveDate>,
    /// Subtotal printed in the statement, when seen.
    pub control_total: Option<Decimal>,
    /// Signed sum of attributed transaction amounts.
    pub calculated_total: Decimal,
    /// Number of attributed transactions.
    pub transaction_count: usize,
}

impl CardContext {
    fn new(last4: &str) -> Self {
        CardContext {
            last4: last4.to_string(),
            last_known_date: None,
            control_total: None,
            calculated_total: Decimal::ZERO,
            transaction_count: 0,
        }
    }
}

/// Tracks every card seen in the document and which one is active.
#[derive(Debug, Default)]
pub struct CardTracker {
    cards: BTreeMap<String, CardContext>,
}

impl CardTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// A card header was seen: (re-)open its context. The date memory
    /// resets so a card reappearing on a later page starts fresh.
    pub fn on_card_header(&mut self, last4: &str) {
        self.cards
            .entry(last4.to_string())
            .and_modify(|c| c.last_known_date = None)
            .or_insert_with(|| CardContext::new(last4));
    }

    /// A transaction was attributed to a card. Control totals can
    /// reference a card whose header line was lost in extraction, so
    /// the context is created on demand.
    pub fn on_transaction(&mut self, last4: &str, date: NaiveDate, amount: Decimal) {
        let card = self
            .cards
            .entry(last4.to_string())
            .or_insert_with(|| CardContext::new(last4));
        card.last_known_date = Some(date);
        card.calculated_total += amount;
        card.transaction_count += 1;
    }

    /// A printed per-card subtotal was seen.
    pub fn on_control_total(&mut self, last4: &str, total: Decimal) {
        let card = self
            .cards
            .entry(last4.to_string())
            .or_insert_with(|| CardContext::new(last4));
        card.control_total = Some(total);
    }

    pub fn get(&self, last4: &str) -> Option<&CardContext> {
        self.cards.get(last4)
    }

    /// All tracked cards, ordered by last4.
    pub fn into_contexts(self) -> BTreeMap<String, CardContext> {
        self.cards
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, day).unwrap()
    }

    #[test]
    fn test_transactions_accumulate_per_card() {
        let mut tracker = CardTracker::new();
        tracker.on_card_header("9826");
        tracker.on_transaction("9826", d(3), dec!(100.00));
        tracker.on_transaction("9826", d(4), dec!(-25.50));
        tracker.on_transaction("1044", d(5), dec!(10.00));

        let card = tracker.get("9826").unwrap();
        assert_eq!(card.calculated_total, dec!(74.50));
        assert_eq!(card.transaction_count, 2);
        assert_eq!(card.last_known_date, Some(d(4)));
        assert_eq!(tracker.get("1044").unwrap().calculated_total, dec!(10.00));
    }

    #[test]
    fn test_header_reappearance_resets_date_memory() {
        let mut tracker = CardTracker::new();
        tracker.on_card_header("9826");
        tracker.on_transaction("9826", d(3), dec!(100.00));
        tracker.on_card_header("9826");

        let card = tracker.get("9826").unwrap();
        assert_eq!(card.last_known_date, None);
        // Totals survive the reset.
        assert_eq!(card.calculated_total, dec!(100.00));
    }

    #[test]
    fn test_control_total_before_any_transaction() {
        let mut tracker = CardTracker::new();
        tracker.on_control_total("7001", dec!(9139.39));
        let card = tracker.get("7001").unwrap();
        assert_eq!(card.control_total, Some(dec!(9139.39)));
        assert_eq!(card.calculated_total, Decimal::ZERO);
    }
}

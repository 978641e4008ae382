pub mod cards;
pub mod error;
pub mod extraction;
pub mod model;
pub mod reconcile;
pub mod sections;
pub mod transactions;

use regex::Regex;
use rust_decimal::Decimal;
use std::sync::LazyLock;

use cards::CardTracker;
use error::FaturaError;
use extraction::{RawLine, TokenExtractor};
use model::{
    Flow, ParseOptions, ParseResult, ParseStats, ParsedTransaction, RejectReason, RejectedLine,
};
use sections::{classify_line, LineEvent, ParserMode};
use transactions::{match_line, LineMatch};

/// Four-digit years the billing-year fallback will accept.
static YEAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(20\d{2})\b").unwrap());

/// How many leading lines the billing-year fallback scans. Statement
/// headers carry the due date within the first page.
const YEAR_SCAN_LINES: usize = 100;

/// Main API entry point: extract and reconcile the transactions of one
/// credit-card statement PDF.
pub fn parse_statement(
    pdf_bytes: &[u8],
    extractor: &dyn TokenExtractor,
    options: &ParseOptions,
) -> Result<ParseResult, FaturaError> {
    let lines = extraction::extract_raw_lines(pdf_bytes, extractor)?;

    let billing_year = match options.billing_year {
        Some(year) => year,
        None => detect_billing_year(&lines).ok_or_else(|| {
            FaturaError::ParseError(
                "no billing year given and none found in the document header".into(),
            )
        })?,
    };

    let mut mode = ParserMode::Preamble;
    let mut active_card: Option<String> = None;
    let mut tracker = CardTracker::new();
    let mut items: Vec<ParsedTransaction> = Vec::new();
    let mut rejects: Vec<RejectedLine> = Vec::new();

    let mut i = 0;
    while i < lines.len() {
        let line = &lines[i];
        let mut consumed = 1;

        match classify_line(&options.sections, &line.text) {
            LineEvent::CardHeader { last4 } => {
                tracker.on_card_header(&last4);
                active_card = Some(last4.clone());
                match &mut mode {
                    ParserMode::Transactions {
                        card,
                        card_scoped: true,
                    } => *card = Some(last4),
                    // A card header inside an ignored section re-opens
                    // the card-scoped transaction listing. In the
                    // preamble it only records the card: sections open
                    // on their own marker lines.
                    ParserMode::Ignored { .. } => {
                        mode = ParserMode::Transactions {
                            card: Some(last4),
                            card_scoped: true,
                        };
                    }
                    _ => {}
                }
            }
            LineEvent::ControlTotal { last4, total } => {
                tracker.on_control_total(&last4, total);
            }
            LineEvent::EnterTransactions { card_scoped } => {
                mode = ParserMode::Transactions {
                    card: if card_scoped { active_card.clone() } else { None },
                    card_scoped,
                };
            }
            LineEvent::EnterIgnored { reason } => {
                tracing::debug!(section = %reason, "entering ignored section");
                active_card = None;
                mode = ParserMode::Ignored { reason };
            }
            LineEvent::Content => match &mode {
                ParserMode::Preamble => {
                    // Transaction-shaped lines before any recognized
                    // section are kept visible for audit.
                    if let LineMatch::Transaction(_) = match_line(
                        &line.text,
                        billing_year,
                        options.billing_month,
                        options.line_item_ceiling,
                    ) {
                        rejects.push(RejectedLine {
                            line: line.text.clone(),
                            reason: RejectReason::UnrecognizedLine,
                        });
                    }
                }
                ParserMode::Ignored { .. } => {}
                ParserMode::Transactions { card, card_scoped } => {
                    consumed = process_transaction_line(
                        &lines,
                        i,
                        billing_year,
                        options,
                        card.as_deref(),
                        *card_scoped,
                        &mut tracker,
                        &mut items,
                        &mut rejects,
                    );
                }
            },
        }

        i += consumed;
    }

    let stats = build_stats(lines.len(), &items, &rejects);
    let (by_card, defects) = reconcile::reconcile(
        tracker.into_contexts(),
        &items,
        options.reconcile_tolerance,
    );

    tracing::debug!(
        matched = items.len(),
        rejected = rejects.len(),
        cards = by_card.len(),
        "parse complete"
    );

    Ok(ParseResult {
        items,
        stats: ParseStats { by_card, ..stats },
        rejects,
        defects,
    })
}

/// Handle one content line inside a transaction-bearing section.
/// Returns how many lines were consumed (2 when a date-only fragment
/// merged with its successor).
#[allow(clippy::too_many_arguments)]
fn process_transaction_line(
    lines: &[RawLine],
    i: usize,
    billing_year: i32,
    options: &ParseOptions,
    card: Option<&str>,
    card_scoped: bool,
    tracker: &mut CardTracker,
    items: &mut Vec<ParsedTransaction>,
    rejects: &mut Vec<RejectedLine>,
) -> usize {
    let line = &lines[i];
    let matched = match_line(
        &line.text,
        billing_year,
        options.billing_month,
        options.line_item_ceiling,
    );

    match matched {
        LineMatch::Transaction(draft) => {
            emit(draft, card, card_scoped, tracker, items, rejects, &line.text);
            1
        }
        LineMatch::Reject(reason) => {
            rejects.push(RejectedLine {
                line: line.text.clone(),
                reason,
            });
            1
        }
        LineMatch::DateFragment => {
            // Amount wrapped onto the next printed line: merge and
            // rematch, but only within the same page and column, and
            // only when the successor carries no date of its own — a
            // dated successor is the next transaction, not a wrapped
            // continuation.
            if let Some(next) = lines.get(i + 1) {
                if next.page_index == line.page_index
                    && next.column == line.column
                    && !transactions::has_leading_date(&next.text)
                {
                    let merged = format!("{} {}", line.text, next.text);
                    if let LineMatch::Transaction(draft) = match_line(
                        &merged,
                        billing_year,
                        options.billing_month,
                        options.line_item_ceiling,
                    ) {
                        emit(draft, card, card_scoped, tracker, items, rejects, &merged);
                        return 2;
                    }
                }
            }
            rejects.push(RejectedLine {
                line: line.text.clone(),
                reason: RejectReason::DateWithoutAmount,
            });
            1
        }
        LineMatch::AmountFragment => {
            rejects.push(RejectedLine {
                line: line.text.clone(),
                reason: RejectReason::AmountWithoutDate,
            });
            1
        }
        LineMatch::NoPattern => {
            rejects.push(RejectedLine {
                line: line.text.clone(),
                reason: RejectReason::NoTransactionPattern,
            });
            1
        }
    }
}

fn emit(
    draft: transactions::TransactionDraft,
    card: Option<&str>,
    card_scoped: bool,
    tracker: &mut CardTracker,
    items: &mut Vec<ParsedTransaction>,
    rejects: &mut Vec<RejectedLine>,
    source_line: &str,
) {
    let last4 = if card_scoped {
        match card {
            Some(c) => Some(c.to_string()),
            None => {
                rejects.push(RejectedLine {
                    line: source_line.to_string(),
                    reason: RejectReason::NoActiveCard,
                });
                return;
            }
        }
    } else {
        None
    };

    if let Some(last4) = &last4 {
        tracker.on_transaction(last4, draft.date, draft.amount);
    }

    items.push(ParsedTransaction {
        date: draft.date,
        description: draft.description,
        amount: draft.amount,
        last4,
        flow: draft.flow,
        installment_number: draft.installment_number,
        installment_total: draft.installment_total,
    });
}

fn build_stats(
    total_lines: usize,
    items: &[ParsedTransaction],
    rejects: &[RejectedLine],
) -> ParseStats {
    let mut sum_abs = Decimal::ZERO;
    let mut sum_out = Decimal::ZERO;
    let mut sum_in = Decimal::ZERO;
    for tx in items {
        sum_abs += tx.amount.abs();
        match tx.flow {
            Flow::Outgoing => sum_out += tx.amount,
            Flow::Incoming => sum_in += tx.amount.abs(),
        }
    }

    ParseStats {
        total_lines,
        matched: items.len(),
        rejected: rejects.len(),
        sum_abs_values: sum_abs,
        sum_outgoing: sum_out,
        sum_incoming: sum_in,
        by_card: Default::default(),
    }
}

/// Find the statement's year in its first lines. Headers print the due
/// date with a four-digit year near the top of the first page.
pub fn detect_billing_year(lines: &[RawLine]) -> Option<i32> {
    lines
        .iter()
        .take(YEAR_SCAN_LINES)
        .find_map(|l| YEAR.captures(&l.text))
        .and_then(|caps| caps[1].parse().ok())
}

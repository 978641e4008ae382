//! Transaction line grammar and amount/date normalization.
//!
//! A transaction line is `<date> <description> <amount>` where the date
//! is DD/MM (day possibly corrupted by extraction artifacts) and the
//! amount uses pt-BR formatting: dots for thousands, comma for decimals,
//! a leading minus for credits.

use chrono::NaiveDate;
use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::LazyLock;

use crate::error::FaturaError;
use crate::model::{Flow, RejectReason};

/// Full transaction shape. The description is matched lazily so the
/// amount capture lands on the first well-formed amount after the date.
static TRANSACTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{1,4}/\d{2})(.*?)(-?\d{1,3}(?:\.\d{3})*,\d{2})").unwrap()
});

/// A date token at the start of a line, for fragment detection.
static LEADING_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\d{1,4}/\d{1,2}(\s|$)").unwrap());

/// Any pt-BR amount, for fragment detection and description cleanup.
static AMOUNT_ANYWHERE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-?\d{1,3}(?:\.\d{3})*,\d{2}").unwrap());

/// Installment marker "n/m" inside a description (e.g. "NETFLIX 02/10").
static INSTALLMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{1,2})/(\d{1,2})\b").unwrap());

/// A transaction matched from one line, before card attribution.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionDraft {
    pub date: NaiveDate,
    pub description: String,
    /// Signed: negative for incoming (credits, refunds, payments).
    pub amount: Decimal,
    pub flow: Flow,
    pub installment_number: Option<u32>,
    pub installment_total: Option<u32>,
}

/// Result of running the transaction grammar over one line.
#[derive(Debug, Clone, PartialEq)]
pub enum LineMatch {
    Transaction(TransactionDraft),
    Reject(RejectReason),
    /// Starts with a date token but carries no amount. Candidate for
    /// merging with the following line of the same page and column.
    DateFragment,
    /// Carries an amount but no date. The complement of `DateFragment`.
    AmountFragment,
    /// Neither a date nor an amount.
    NoPattern,
}

/// Match one line against the transaction grammar.
pub fn match_line(
    text: &str,
    billing_year: i32,
    billing_month: Option<u32>,
    line_item_ceiling: Decimal,
) -> LineMatch {
    let Some(caps) = TRANSACTION.captures(text) else {
        return classify_fragment(text);
    };

    let date_token = normalize_date_token(&caps[1]);
    let date = match resolve_date(&date_token, billing_year, billing_month) {
        Some(d) => d,
        None => return LineMatch::Reject(RejectReason::InvalidDate),
    };

    let amount = match parse_pt_br_amount(&caps[3]) {
        Ok(a) => a,
        Err(_) => return LineMatch::Reject(RejectReason::NoTransactionPattern),
    };
    if amount.abs() > line_item_ceiling {
        return LineMatch::Reject(RejectReason::ValueExceedsCeiling);
    }

    let description = clean_description(&caps[2], &date_token);
    let (installment_number, installment_total, description) =
        extract_installments(description);

    let flow = if amount.is_sign_negative() {
        Flow::Incoming
    } else {
        Flow::Outgoing
    };

    LineMatch::Transaction(TransactionDraft {
        date,
        description,
        amount,
        flow,
        installment_number,
        installment_total,
    })
}

fn classify_fragment(text: &str) -> LineMatch {
    let has_date = has_leading_date(text);
    let has_amount = AMOUNT_ANYWHERE.is_match(text);
    match (has_date, has_amount) {
        (true, false) => LineMatch::DateFragment,
        (false, true) => LineMatch::AmountFragment,
        _ => LineMatch::NoPattern,
    }
}

/// Whether a line starts with a date-shaped token. A line that does is
/// never the continuation of a wrapped transaction.
pub fn has_leading_date(text: &str) -> bool {
    LEADING_DATE.is_match(text)
}

/// Parse a pt-BR formatted amount ("1.234,56", "-45,00") into a Decimal.
pub fn parse_pt_br_amount(s: &str) -> Result<Decimal, FaturaError> {
    let canonical = s.trim().replace('.', "").replace(',', ".");
    Decimal::from_str(&canonical)
        .map_err(|_| FaturaError::ParseError(format!("not a pt-BR amount: '{s}'")))
}

/// Repair a date token whose segments picked up stray digits from a
/// neighboring column ("0731/03" for "31/03"): keep the rightmost two
/// digits of each over-long segment. Idempotent on well-formed tokens.
pub fn normalize_date_token(token: &str) -> String {
    match token.split_once('/') {
        Some((day, month)) => {
            format!("{}/{}", rightmost_two(day), rightmost_two(month))
        }
        None => token.to_string(),
    }
}

fn rightmost_two(segment: &str) -> &str {
    if segment.len() > 2 {
        &segment[segment.len() - 2..]
    } else {
        segment
    }
}

/// Resolve a normalized "DD/MM" token to a calendar date.
///
/// Statements spanning a year boundary print December transactions on a
/// January statement; a transaction month greater than the billing month
/// therefore belongs to the previous year.
pub fn resolve_date(token: &str, billing_year: i32, billing_month: Option<u32>) -> Option<NaiveDate> {
    let (day_s, month_s) = token.split_once('/')?;
    let day: u32 = day_s.parse().ok()?;
    let month: u32 = month_s.parse().ok()?;

    let year = match billing_month {
        Some(bm) if month > bm => billing_year - 1,
        _ => billing_year,
    };

    NaiveDate::from_ymd_opt(year, month, day)
}

/// Strip extraction artifacts out of a raw description capture: a
/// duplicated leading date token, embedded amounts bleeding in from the
/// value column, currency markers and stray separators. Falls back to
/// the whitespace-collapsed original when cleanup would empty it.
fn clean_description(raw: &str, date_token: &str) -> String {
    let mut s = raw.trim().to_string();
    if let Some(rest) = s.strip_prefix(date_token) {
        s = rest.to_string();
    }
    s = AMOUNT_ANYWHERE.replace_all(&s, " ").into_owned();
    s = s.replace("R$", " ");

    let cleaned: String = s.split_whitespace().collect::<Vec<_>>().join(" ");
    let cleaned = cleaned
        .trim_matches(|c: char| matches!(c, '-' | '*' | '.' | ','))
        .trim()
        .to_string();

    if cleaned.is_empty() {
        raw.split_whitespace().collect::<Vec<_>>().join(" ")
    } else {
        cleaned
    }
}

/// Pick up an "n/m" installment marker from a description and strip it
/// out. Only pairs that read as a plausible installment (1 <= n <= m,
/// m >= 2) count; anything else stays plain description text. The last
/// plausible pair wins, matching where statements print the marker.
fn extract_installments(description: String) -> (Option<u32>, Option<u32>, String) {
    let mut found: Option<(u32, u32, std::ops::Range<usize>)> = None;
    for caps in INSTALLMENT.captures_iter(&description) {
        let Some(m) = caps.get(0) else { continue };
        let Ok(number) = caps[1].parse::<u32>() else { continue };
        let Ok(total) = caps[2].parse::<u32>() else { continue };
        if number >= 1 && total >= 2 && number <= total {
            found = Some((number, total, m.range()));
        }
    }

    let Some((number, total, range)) = found else {
        return (None, None, description);
    };

    let mut stripped = description.clone();
    stripped.replace_range(range, " ");
    let stripped: String = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
    if stripped.is_empty() {
        (Some(number), Some(total), description)
    } else {
        (Some(number), Some(total), stripped)
    }
}

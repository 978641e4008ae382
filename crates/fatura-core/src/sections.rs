//! Section classification for the statement line stream.
//!
//! Sections are recognized by keyword sets, not exact prefixes: a line
//! matches when its normalized text contains all of a section's keywords
//! in any order. Extraction artifacts (stray `##` prefixes, doubled
//! separators, diacritics lost or kept) therefore do not matter, and new
//! statement-section variants are added by editing the config table, not
//! the control flow.

use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::LazyLock;

use crate::error::FaturaError;
use crate::transactions::parse_pt_br_amount;

/// Card headers are "(final <4 digits>)" anywhere in the line. The same
/// shape also appears inside control-total lines, which are told apart
/// by the summary words preceding the match.
static CARD_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(\s*final\s*(\d{4})\s*\)").unwrap());

/// Printed per-card subtotal: "lancamentos no cartao (final XXXX) 1.234,56".
/// Matched separately from the line-item grammar.
static CONTROL_TOTAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"lancamentos\s*(?:no\s*)?cartao\s*\(\s*final\s*(\d{4})\s*\)\s*(\d{1,3}(?:\.\d{3})*,\d{2})")
        .unwrap()
});

/// Words that disqualify a "(final XXXX)" match from being a card
/// header; they mark summary/limit lines instead.
const HEADER_INVALID_WORDS: &[&str] = &["lancamentos", "cartao", "total", "limites"];

/// One recognizable section: a name and the keywords that must all be
/// present (order-independent, after normalization).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionRule {
    pub name: String,
    pub keywords: Vec<String>,
    /// Whether transactions in this section belong to the active card.
    #[serde(default)]
    pub card_scoped: bool,
}

/// Keyword tables driving section classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionConfig {
    /// Sections whose lines carry current-period transactions.
    pub transactions: Vec<SectionRule>,
    /// Sections whose lines must never be counted as transactions.
    pub ignored: Vec<SectionRule>,
}

impl SectionConfig {
    /// The builtin tables for the targeted statement layout.
    pub fn builtin() -> Self {
        fn rule(name: &str, keywords: &[&str], card_scoped: bool) -> SectionRule {
            SectionRule {
                name: name.to_string(),
                keywords: keywords.iter().map(|k| k.to_string()).collect(),
                card_scoped,
            }
        }

        SectionConfig {
            transactions: vec![
                rule(
                    "purchases-and-withdrawals",
                    &["lancamentos", "compras", "saques"],
                    true,
                ),
                rule(
                    "products-and-services",
                    &["lancamentos", "produtos", "servicos"],
                    false,
                ),
            ],
            ignored: vec![
                rule(
                    "installments-billed-in-future-statements",
                    &["compras", "parceladas", "proximas", "faturas"],
                    false,
                ),
                rule(
                    "charges-billed-on-this-statement",
                    &["encargos", "cobrados", "nesta", "fatura"],
                    false,
                ),
                rule("credit-limits", &["limites", "credito"], false),
            ],
        }
    }

    /// Parse a config from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, FaturaError> {
        let mut config: SectionConfig = serde_json::from_str(json)?;
        config.normalize_keywords();
        config.validate()?;
        Ok(config)
    }

    /// Load a config from a JSON file.
    pub fn load(path: &Path) -> Result<Self, FaturaError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| FaturaError::SectionConfigLoad {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        let mut config: SectionConfig =
            serde_json::from_str(&content).map_err(|e| FaturaError::SectionConfigLoad {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        config.normalize_keywords();
        config.validate()?;
        Ok(config)
    }

    /// Validate that the tables are well-formed.
    pub fn validate(&self) -> Result<(), FaturaError> {
        if self.transactions.is_empty() {
            return Err(FaturaError::SectionConfigInvalid(
                "transactions sections must not be empty".into(),
            ));
        }
        for rule in self.transactions.iter().chain(self.ignored.iter()) {
            if rule.name.is_empty() {
                return Err(FaturaError::SectionConfigInvalid(
                    "section name must not be empty".into(),
                ));
            }
            if rule.keywords.is_empty() || rule.keywords.iter().any(|k| k.is_empty()) {
                return Err(FaturaError::SectionConfigInvalid(format!(
                    "section '{}' has an empty keyword set",
                    rule.name
                )));
            }
        }
        Ok(())
    }

    fn normalize_keywords(&mut self) {
        for rule in self.transactions.iter_mut().chain(self.ignored.iter_mut()) {
            for kw in &mut rule.keywords {
                *kw = normalize_line(kw);
            }
        }
    }
}

/// Parsing mode threaded explicitly through the line-processing loop.
/// Never module-level state: two concurrent parses share nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParserMode {
    /// Before any recognized section.
    Preamble,
    /// Inside a transaction-bearing section.
    Transactions {
        /// Active card, when the section is card-scoped and a header
        /// has been seen.
        card: Option<String>,
        card_scoped: bool,
    },
    /// Inside a section whose lines are never transactions.
    Ignored { reason: String },
}

/// What one line means for the parser state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum LineEvent {
    /// "HOLDER NAME (final 1234)" — a card block starts here.
    CardHeader { last4: String },
    /// Printed per-card subtotal.
    ControlTotal { last4: String, total: Decimal },
    /// Marker line opening a transaction-bearing section.
    EnterTransactions { card_scoped: bool },
    /// Marker line opening an ignored section.
    EnterIgnored { reason: String },
    /// Anything else; interpretation depends on the current mode.
    Content,
}

/// Classify one raw line. The caller owns the mode transition.
pub fn classify_line(config: &SectionConfig, raw: &str) -> LineEvent {
    let normalized = normalize_line(raw);

    // Control totals first: they contain the card-header shape too.
    if let Some(caps) = CONTROL_TOTAL.captures(&normalized) {
        if let Ok(total) = parse_pt_br_amount(&caps[2]) {
            return LineEvent::ControlTotal {
                last4: caps[1].to_string(),
                total,
            };
        }
    }

    if let Some(caps) = CARD_HEADER.captures(&normalized) {
        let start = caps.get(0).map(|m| m.start()).unwrap_or(0);
        let before = &normalized[..start];
        let is_header = !HEADER_INVALID_WORDS.iter().any(|w| before.contains(w));
        if is_header {
            return LineEvent::CardHeader {
                last4: caps[1].to_string(),
            };
        }
    }

    for rule in &config.transactions {
        if keywords_match(rule, &normalized) {
            return LineEvent::EnterTransactions {
                card_scoped: rule.card_scoped,
            };
        }
    }

    for rule in &config.ignored {
        if keywords_match(rule, &normalized) {
            return LineEvent::EnterIgnored {
                reason: rule.name.clone(),
            };
        }
    }

    LineEvent::Content
}

fn keywords_match(rule: &SectionRule, normalized: &str) -> bool {
    rule.keywords.iter().all(|k| normalized.contains(k.as_str()))
}

/// Lowercase, fold diacritics and collapse whitespace, so keyword
/// matching survives accent loss and spacing artifacts in extraction.
pub fn normalize_line(raw: &str) -> String {
    let folded: String = raw.chars().map(fold_diacritic).collect();
    folded
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn fold_diacritic(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ã' | 'ä' | 'Á' | 'À' | 'Â' | 'Ã' | 'Ä' => 'a',
        'é' | 'è' | 'ê' | 'ë' | 'É' | 'È' | 'Ê' | 'Ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' | 'Í' | 'Ì' | 'Î' | 'Ï' => 'i',
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' | 'Ó' | 'Ò' | 'Ô' | 'Õ' | 'Ö' => 'o',
        'ú' | 'ù' | 'û' | 'ü' | 'Ú' | 'Ù' | 'Û' | 'Ü' => 'u',
        'ç' | 'Ç' => 'c',
        _ => c,
    }
}

//! Integration tests for parse_statement() end-to-end pipeline.
//!
//! Uses a MockExtractor that returns pre-built PageTokens without
//! invoking pdftotext, so these tests run without poppler-utils.

use std::collections::HashMap;

use fatura_core::error::FaturaError;
use fatura_core::extraction::{PageTokens, Token, TokenExtractor};
use fatura_core::model::{ParseOptions, RejectReason};
use fatura_core::parse_statement;
use rust_decimal_macros::dec;

struct MockExtractor {
    pages: Vec<PageTokens>,
    chars: HashMap<usize, Vec<Token>>,
}

impl MockExtractor {
    fn words_only(pages: Vec<PageTokens>) -> Self {
        MockExtractor {
            pages,
            chars: HashMap::new(),
        }
    }
}

impl TokenExtractor for MockExtractor {
    fn word_tokens(&self, _pdf_bytes: &[u8]) -> Result<Vec<PageTokens>, FaturaError> {
        Ok(self.pages.clone())
    }

    fn char_tokens(
        &self,
        _pdf_bytes: &[u8],
        page_index: usize,
    ) -> Result<Vec<Token>, FaturaError> {
        Ok(self.chars.get(&page_index).cloned().unwrap_or_default())
    }

    fn backend_name(&self) -> &str {
        "mock"
    }
}

fn tok(text: &str, x: f32, y: f32) -> Token {
    Token {
        text: text.to_string(),
        x_min: x,
        x_max: x + text.len() as f32 * 5.0,
        y,
    }
}

/// One whole-line token per printed line, stacked top to bottom in a
/// single column.
fn page(page_index: usize, lines: &[&str]) -> PageTokens {
    PageTokens {
        page_index,
        tokens: lines
            .iter()
            .enumerate()
            .map(|(i, text)| tok(text, 40.0, 100.0 + i as f32 * 12.0))
            .collect(),
    }
}

/// Character-level tokens for one printed line, the shape the word-box
/// explosion produces: adjacent characters touch, words sit apart.
fn char_line(text: &str, y: f32) -> Vec<Token> {
    let mut out = Vec::new();
    let mut x = 40.0;
    for c in text.chars() {
        if c == ' ' {
            x += 4.0;
            continue;
        }
        out.push(Token {
            text: c.to_string(),
            x_min: x,
            x_max: x + 0.5,
            y,
        });
        x += 0.6;
    }
    out
}

// ---------------------------------------------------------------------------
// Test 1: Balanced statement — three transactions matching the control total
// ---------------------------------------------------------------------------
#[test]
fn balanced_statement_reconciles() {
    let extractor = MockExtractor::words_only(vec![page(
        0,
        &[
            "Fatura Vencimento: 10/06/2024",
            "LANÇAMENTOS: COMPRAS E SAQUES",
            "JOAO C SILVA (final 9826)",
            "12/05 MERCADO CENTRAL 45,00",
            "15/05 PADARIA DA VILA 12,50",
            "20/05 PAGAMENTO EFETUADO -10,00",
            "LANÇAMENTOS NO CARTÃO (final 9826) 47,50",
        ],
    )]);

    // Billing year comes from the document header here.
    let result = parse_statement(&[], &extractor, &ParseOptions::default()).unwrap();

    assert_eq!(result.items.len(), 3);
    assert!(result.items.iter().all(|tx| tx.last4.as_deref() == Some("9826")));
    assert_eq!(result.items[0].description, "MERCADO CENTRAL");
    assert_eq!(result.items[2].amount, dec!(-10.00));

    assert_eq!(result.stats.matched, 3);
    assert_eq!(result.stats.sum_outgoing, dec!(57.50));
    assert_eq!(result.stats.sum_incoming, dec!(10.00));
    assert_eq!(result.stats.sum_abs_values, dec!(67.50));

    let card = &result.stats.by_card["9826"];
    assert_eq!(card.control_total, Some(dec!(47.50)));
    assert_eq!(card.calculated_total, dec!(47.50));
    assert_eq!(card.delta, Some(dec!(0.00)));
    assert_eq!(card.balanced, Some(true));
    assert!(result.defects.is_empty());
}

// ---------------------------------------------------------------------------
// Test 2: Corrupted date digits repaired via the rightmost-two rule
// ---------------------------------------------------------------------------
#[test]
fn corrupted_date_repaired() {
    let extractor = MockExtractor::words_only(vec![page(
        0,
        &[
            "LANÇAMENTOS: COMPRAS E SAQUES",
            "JOAO C SILVA (final 9826)",
            "0731/03 FARMACIA SP 45,00",
        ],
    )]);

    let options = ParseOptions::for_period(2024, Some(5));
    let result = parse_statement(&[], &extractor, &options).unwrap();

    assert_eq!(result.items.len(), 1);
    let tx = &result.items[0];
    assert_eq!(tx.date.to_string(), "2024-03-31");
    assert_eq!(tx.description, "FARMACIA SP");
    assert!(result.rejects.is_empty());
}

// ---------------------------------------------------------------------------
// Test 3: Subtotal-sized amounts are rejected, not extracted
// ---------------------------------------------------------------------------
#[test]
fn ceiling_rejects_subtotal_lines() {
    let extractor = MockExtractor::words_only(vec![page(
        0,
        &[
            "LANÇAMENTOS: COMPRAS E SAQUES",
            "JOAO C SILVA (final 9826)",
            "12/05 MERCADO CENTRAL 45,00",
            "12/05 SALDO ANTERIOR 11.426,65",
        ],
    )]);

    let options = ParseOptions::for_period(2024, Some(6));
    let result = parse_statement(&[], &extractor, &options).unwrap();

    assert_eq!(result.items.len(), 1);
    assert_eq!(result.rejects.len(), 1);
    assert_eq!(result.rejects[0].reason, RejectReason::ValueExceedsCeiling);
    assert!(result.rejects[0].line.contains("11.426,65"));
    // The rejected subtotal must not pollute the card sum.
    assert_eq!(result.stats.by_card["9826"].calculated_total, dec!(45.00));
}

// ---------------------------------------------------------------------------
// Test 4: Amount wrapped to the next printed line merges back
// ---------------------------------------------------------------------------
#[test]
fn wrapped_line_merges_with_successor() {
    let extractor = MockExtractor::words_only(vec![page(
        0,
        &[
            "LANÇAMENTOS: COMPRAS E SAQUES",
            "JOAO C SILVA (final 9826)",
            "28/05 RESTAURANTE BELA",
            "VISTA 89,90",
        ],
    )]);

    let options = ParseOptions::for_period(2024, Some(6));
    let result = parse_statement(&[], &extractor, &options).unwrap();

    assert_eq!(result.items.len(), 1);
    let tx = &result.items[0];
    assert_eq!(tx.description, "RESTAURANTE BELA VISTA");
    assert_eq!(tx.amount, dec!(89.90));
    assert!(result.rejects.is_empty());
}

// ---------------------------------------------------------------------------
// Test 5: Date fragment with no mergeable successor is audited
// ---------------------------------------------------------------------------
#[test]
fn unmergeable_fragments_are_rejected() {
    let extractor = MockExtractor::words_only(vec![page(
        0,
        &[
            "LANÇAMENTOS: COMPRAS E SAQUES",
            "JOAO C SILVA (final 9826)",
            "28/05 RESTAURANTE BELA",
            "sem valor nesta linha",
            "VISTA 89,90",
        ],
    )]);

    let options = ParseOptions::for_period(2024, Some(6));
    let result = parse_statement(&[], &extractor, &options).unwrap();

    assert!(result.items.is_empty());
    let reasons: Vec<_> = result.rejects.iter().map(|r| r.reason).collect();
    assert!(reasons.contains(&RejectReason::DateWithoutAmount));
    assert!(reasons.contains(&RejectReason::AmountWithoutDate));
}

// ---------------------------------------------------------------------------
// Test 5b: A dated successor is never consumed as a wrapped continuation
// ---------------------------------------------------------------------------
#[test]
fn dated_successor_is_not_merged() {
    let extractor = MockExtractor::words_only(vec![page(
        0,
        &[
            "LANÇAMENTOS: COMPRAS E SAQUES",
            "JOAO C SILVA (final 9826)",
            "12/05 MERCADO",
            "13/05 PADARIA DA VILA 12,50",
        ],
    )]);

    let options = ParseOptions::for_period(2024, Some(6));
    let result = parse_statement(&[], &extractor, &options).unwrap();

    // The fragment is audited on its own; the following transaction
    // keeps its own date and survives intact.
    assert_eq!(result.items.len(), 1);
    let tx = &result.items[0];
    assert_eq!(tx.date.to_string(), "2024-05-13");
    assert_eq!(tx.description, "PADARIA DA VILA");
    assert_eq!(tx.amount, dec!(12.50));

    assert_eq!(result.rejects.len(), 1);
    assert_eq!(result.rejects[0].reason, RejectReason::DateWithoutAmount);
    assert_eq!(result.rejects[0].line, "12/05 MERCADO");
}

// ---------------------------------------------------------------------------
// Test 6: Products section yields unscoped transactions
// ---------------------------------------------------------------------------
#[test]
fn products_section_has_no_card() {
    let extractor = MockExtractor::words_only(vec![page(
        0,
        &[
            "LANÇAMENTOS: COMPRAS E SAQUES",
            "JOAO C SILVA (final 9826)",
            "12/05 MERCADO CENTRAL 45,00",
            "LANÇAMENTOS: PRODUTOS E SERVIÇOS",
            "10/05 ANUIDADE DIFERENCIADA 25,00",
        ],
    )]);

    let options = ParseOptions::for_period(2024, Some(6));
    let result = parse_statement(&[], &extractor, &options).unwrap();

    assert_eq!(result.items.len(), 2);
    assert_eq!(result.items[0].last4.as_deref(), Some("9826"));
    assert_eq!(result.items[1].last4, None);
    assert_eq!(result.stats.by_card["unknown"].calculated_total, dec!(25.00));
    assert_eq!(result.stats.by_card["9826"].calculated_total, dec!(45.00));
}

// ---------------------------------------------------------------------------
// Test 7: Transaction before any card header in a card-scoped section
// ---------------------------------------------------------------------------
#[test]
fn transaction_without_card_header_rejected() {
    let extractor = MockExtractor::words_only(vec![page(
        0,
        &[
            "LANÇAMENTOS: COMPRAS E SAQUES",
            "12/05 MERCADO CENTRAL 45,00",
        ],
    )]);

    let options = ParseOptions::for_period(2024, Some(6));
    let result = parse_statement(&[], &extractor, &options).unwrap();

    assert!(result.items.is_empty());
    assert_eq!(result.rejects.len(), 1);
    assert_eq!(result.rejects[0].reason, RejectReason::NoActiveCard);
}

// ---------------------------------------------------------------------------
// Test 8: Ignored sections never contribute transactions
// ---------------------------------------------------------------------------
#[test]
fn ignored_sections_are_skipped() {
    let extractor = MockExtractor::words_only(vec![page(
        0,
        &[
            "LANÇAMENTOS: COMPRAS E SAQUES",
            "JOAO C SILVA (final 9826)",
            "12/05 MERCADO CENTRAL 45,00",
            "COMPRAS PARCELADAS - PRÓXIMAS FATURAS",
            "10/06 MAGAZINE NORTE 03/10 129,90",
            "LIMITES DE CRÉDITO",
            "Limite total 5.000,00",
        ],
    )]);

    let options = ParseOptions::for_period(2024, Some(6));
    let result = parse_statement(&[], &extractor, &options).unwrap();

    assert_eq!(result.items.len(), 1);
    assert_eq!(result.items[0].description, "MERCADO CENTRAL");
    assert!(result.rejects.is_empty());
}

// ---------------------------------------------------------------------------
// Test 9: Page with no word tokens falls back to character tokens
// ---------------------------------------------------------------------------
#[test]
fn character_fallback_page_parses() {
    let mut chars = HashMap::new();
    chars.insert(1, char_line("12/05 LIVRARIA CULTURA 30,00", 100.0));

    let extractor = MockExtractor {
        pages: vec![
            page(
                0,
                &[
                    "LANÇAMENTOS: COMPRAS E SAQUES",
                    "JOAO C SILVA (final 9826)",
                ],
            ),
            PageTokens {
                page_index: 1,
                tokens: Vec::new(),
            },
        ],
        chars,
    };

    let options = ParseOptions::for_period(2024, Some(6));
    let result = parse_statement(&[], &extractor, &options).unwrap();

    assert_eq!(result.items.len(), 1);
    let tx = &result.items[0];
    assert_eq!(tx.description, "LIVRARIA CULTURA");
    assert_eq!(tx.amount, dec!(30.00));
    assert_eq!(tx.last4.as_deref(), Some("9826"));
}

// ---------------------------------------------------------------------------
// Test 10: Two-column page reads left column before right column
// ---------------------------------------------------------------------------
#[test]
fn two_column_page_reads_left_then_right() {
    let tokens = vec![
        // Right column, printed higher on the page.
        tok("14/05 CAFE DO PONTO 8,00", 320.0, 100.0),
        // Left column.
        tok("12/05 MERCADO CENTRAL 45,00", 40.0, 150.0),
        tok("13/05 PADARIA DA VILA 12,50", 40.0, 162.0),
    ];
    let extractor = MockExtractor::words_only(vec![
        page(
            0,
            &[
                "LANÇAMENTOS: COMPRAS E SAQUES",
                "JOAO C SILVA (final 9826)",
            ],
        ),
        PageTokens {
            page_index: 1,
            tokens,
        },
    ]);

    let options = ParseOptions::for_period(2024, Some(6));
    let result = parse_statement(&[], &extractor, &options).unwrap();

    let descriptions: Vec<_> = result.items.iter().map(|tx| tx.description.as_str()).collect();
    assert_eq!(
        descriptions,
        vec!["MERCADO CENTRAL", "PADARIA DA VILA", "CAFE DO PONTO"]
    );
}

// ---------------------------------------------------------------------------
// Test 11: Transaction-shaped lines in the preamble are audited
// ---------------------------------------------------------------------------
#[test]
fn preamble_transaction_shapes_are_audited() {
    let extractor = MockExtractor::words_only(vec![page(
        0,
        &[
            "12/05 COMPRA FORA DE SECAO 19,90",
            "LANÇAMENTOS: COMPRAS E SAQUES",
            "JOAO C SILVA (final 9826)",
            "13/05 MERCADO CENTRAL 45,00",
        ],
    )]);

    let options = ParseOptions::for_period(2024, Some(6));
    let result = parse_statement(&[], &extractor, &options).unwrap();

    assert_eq!(result.items.len(), 1);
    assert_eq!(result.rejects.len(), 1);
    assert_eq!(result.rejects[0].reason, RejectReason::UnrecognizedLine);
}

// ---------------------------------------------------------------------------
// Test 12: No billing year anywhere is an error, not a guess
// ---------------------------------------------------------------------------
#[test]
fn missing_billing_year_is_an_error() {
    let extractor = MockExtractor::words_only(vec![page(
        0,
        &[
            "LANÇAMENTOS: COMPRAS E SAQUES",
            "JOAO C SILVA (final 9826)",
            "12/05 MERCADO CENTRAL 45,00",
        ],
    )]);

    let result = parse_statement(&[], &extractor, &ParseOptions::default());
    assert!(matches!(result, Err(FaturaError::ParseError(_))));
}

// ---------------------------------------------------------------------------
// Test 13: Result serializes to the documented wire shape
// ---------------------------------------------------------------------------
#[test]
fn result_serializes_to_wire_shape() {
    let extractor = MockExtractor::words_only(vec![page(
        0,
        &[
            "LANÇAMENTOS: COMPRAS E SAQUES",
            "JOAO C SILVA (final 9826)",
            "12/05 MERCADO CENTRAL 45,00",
            "LANÇAMENTOS NO CARTÃO (final 9826) 45,00",
        ],
    )]);

    let options = ParseOptions::for_period(2024, Some(6));
    let result = parse_statement(&[], &extractor, &options).unwrap();

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["items"][0]["date"], "2024-05-12");
    assert_eq!(json["items"][0]["amount"], "45.00");
    assert_eq!(json["items"][0]["flow"], "outgoing");
    assert_eq!(json["items"][0]["last4"], "9826");
    assert_eq!(json["stats"]["matched"], 1);
    assert_eq!(json["stats"]["by_card"]["9826"]["balanced"], true);
    // Defect-free results omit the defects key entirely.
    assert!(json.get("defects").is_none());

    let back: fatura_core::model::ParseResult = serde_json::from_value(json).unwrap();
    assert_eq!(back, result);
}

// ---------------------------------------------------------------------------
// Test 14: Every extracted line is accounted for
// ---------------------------------------------------------------------------
#[test]
fn line_accounting_is_conservative() {
    let extractor = MockExtractor::words_only(vec![page(
        0,
        &[
            "Fatura Vencimento: 10/06/2024",
            "LANÇAMENTOS: COMPRAS E SAQUES",
            "JOAO C SILVA (final 9826)",
            "12/05 MERCADO CENTRAL 45,00",
            "texto solto sem padrao",
            "LANÇAMENTOS NO CARTÃO (final 9826) 45,00",
        ],
    )]);

    let result = parse_statement(&[], &extractor, &ParseOptions::default()).unwrap();

    assert_eq!(result.stats.total_lines, 6);
    assert_eq!(result.stats.matched, result.items.len());
    assert_eq!(result.stats.rejected, result.rejects.len());
    assert!(result.stats.matched + result.stats.rejected <= result.stats.total_lines);
    // The stray text inside the section is audited, not dropped.
    assert!(result
        .rejects
        .iter()
        .any(|r| r.reason == RejectReason::NoTransactionPattern));
}

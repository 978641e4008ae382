use fatura_core::error::FaturaError;
use fatura_core::extraction::pdftotext::PdftotextExtractor;
use std::path::PathBuf;

use crate::commands::PeriodArgs;
use crate::output;

pub fn run(
    input_file: PathBuf,
    output_format: &str,
    strict: bool,
    period: &PeriodArgs,
) -> Result<(), FaturaError> {
    let options = super::build_options(period)?;
    let pdf_bytes = std::fs::read(&input_file)?;
    let extractor = PdftotextExtractor::new();
    let result = fatura_core::parse_statement(&pdf_bytes, &extractor, &options)?;

    match output_format {
        "json" => {
            let json = serde_json::to_string_pretty(&result.stats.by_card)?;
            println!("{json}");
        }
        _ => output::table::print_reconciliation(&result.stats),
    }

    for defect in &result.defects {
        eprintln!("defect: {defect}");
    }

    if strict {
        let unbalanced: Vec<&str> = result
            .stats
            .by_card
            .iter()
            .filter(|(_, rec)| rec.balanced == Some(false))
            .map(|(last4, _)| last4.as_str())
            .collect();
        if !unbalanced.is_empty() {
            return Err(FaturaError::ParseError(format!(
                "card(s) out of balance: {}",
                unbalanced.join(", ")
            )));
        }
    }

    Ok(())
}

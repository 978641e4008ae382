use fatura_core::extraction::pdftotext::PdftotextExtractor;
use std::path::PathBuf;

use crate::commands::PeriodArgs;
use crate::output;

pub fn run(
    input_file: PathBuf,
    output_format: &str,
    output_file: Option<PathBuf>,
    show_rejects: bool,
    period: &PeriodArgs,
) -> Result<(), fatura_core::error::FaturaError> {
    let options = super::build_options(period)?;
    let pdf_bytes = std::fs::read(&input_file)?;
    let extractor = PdftotextExtractor::new();
    let result = fatura_core::parse_statement(&pdf_bytes, &extractor, &options)?;

    match output_file {
        Some(path) => {
            // Always write JSON when saving to file
            let json = serde_json::to_string_pretty(&result)?;
            std::fs::write(&path, json)?;
            eprintln!(
                "{} transaction(s), written to {}",
                result.items.len(),
                path.display()
            );
            if !result.rejects.is_empty() {
                eprintln!("  {} line(s) rejected during parsing", result.rejects.len());
            }
            for defect in &result.defects {
                eprintln!("  defect: {defect}");
            }
        }
        None => match output_format {
            "json" => output::json::print(&result)?,
            _ => output::table::print(&result, show_rejects),
        },
    }

    Ok(())
}

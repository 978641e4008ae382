use fatura_core::error::FaturaError;
use fatura_core::model::ParseResult;

pub fn print(result: &ParseResult) -> Result<(), FaturaError> {
    let json = serde_json::to_string_pretty(result)?;
    println!("{json}");
    Ok(())
}

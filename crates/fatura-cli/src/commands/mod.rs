pub mod parse;
pub mod reconcile;
pub mod sections;

use clap::Args;
use fatura_core::error::FaturaError;
use fatura_core::model::ParseOptions;
use fatura_core::sections::SectionConfig;
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::str::FromStr;

/// Billing-period and heuristic knobs shared by parse and reconcile.
#[derive(Args)]
pub struct PeriodArgs {
    /// Billing year for DD/MM dates (default: detected from the document)
    #[arg(long)]
    pub year: Option<i32>,

    /// Billing month, used to resolve year-end wraparound
    #[arg(long)]
    pub month: Option<u32>,

    /// Reject line items above this amount (default: 10000.00)
    #[arg(long, value_parser = parse_decimal)]
    pub ceiling: Option<Decimal>,

    /// Per-card balance tolerance (default: 0.01)
    #[arg(long, value_parser = parse_decimal)]
    pub tolerance: Option<Decimal>,

    /// Custom section keyword tables (JSON file)
    #[arg(long, value_name = "FILE")]
    pub sections: Option<PathBuf>,
}

fn parse_decimal(s: &str) -> Result<Decimal, String> {
    Decimal::from_str(s).map_err(|e| e.to_string())
}

pub fn build_options(period: &PeriodArgs) -> Result<ParseOptions, FaturaError> {
    let mut options = ParseOptions {
        billing_year: period.year,
        billing_month: period.month,
        ..Default::default()
    };
    if let Some(ceiling) = period.ceiling {
        options.line_item_ceiling = ceiling;
    }
    if let Some(tolerance) = period.tolerance {
        options.reconcile_tolerance = tolerance;
    }
    if let Some(path) = &period.sections {
        options.sections = SectionConfig::load(path)?;
    }
    Ok(options)
}

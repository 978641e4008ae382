use fatura_core::sections::{SectionConfig, SectionRule};
use std::path::Path;

pub fn list() -> Result<(), fatura_core::error::FaturaError> {
    let config = SectionConfig::builtin();

    println!("Transaction-bearing sections:\n");
    for rule in &config.transactions {
        print_rule(rule);
    }

    println!("Ignored sections:\n");
    for rule in &config.ignored {
        print_rule(rule);
    }

    Ok(())
}

fn print_rule(rule: &SectionRule) {
    let scope = if rule.card_scoped { " [card-scoped]" } else { "" };
    println!("  {}{}", rule.name, scope);
    println!("    keywords: {}", rule.keywords.join(", "));
    println!();
}

pub fn validate(file: &Path) -> Result<(), fatura_core::error::FaturaError> {
    let config = SectionConfig::load(file)?;
    println!(
        "OK: {} transaction section(s), {} ignored section(s)",
        config.transactions.len(),
        config.ignored.len()
    );
    Ok(())
}

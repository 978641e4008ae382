use fatura_core::model::{ParseResult, ParseStats};

pub fn print(result: &ParseResult, show_rejects: bool) {
    if result.items.is_empty() {
        println!("No transactions found.");
    } else {
        let max_desc = result
            .items
            .iter()
            .map(|tx| tx.description.len())
            .max()
            .unwrap_or(11)
            .max("Description".len());

        println!(
            "{:<10}  {:<7}  {:<width$}  {:>12}",
            "Date",
            "Card",
            "Description",
            "Amount",
            width = max_desc
        );
        for tx in &result.items {
            println!(
                "{:<10}  {:<7}  {:<width$}  {:>12}",
                tx.date,
                tx.last4.as_deref().unwrap_or("-"),
                tx.description,
                tx.amount,
                width = max_desc
            );
        }
    }

    println!();
    print_reconciliation(&result.stats);

    if show_rejects && !result.rejects.is_empty() {
        println!("\nRejected lines:");
        for reject in &result.rejects {
            println!("  [{}] {}", reject.reason, reject.line);
        }
    }

    if !result.defects.is_empty() {
        println!("\nDefects:");
        for defect in &result.defects {
            println!("  {defect}");
        }
    }
}

pub fn print_reconciliation(stats: &ParseStats) {
    println!(
        "{} line(s): {} matched, {} rejected",
        stats.total_lines, stats.matched, stats.rejected
    );
    println!(
        "Outgoing {}  Incoming {}  Total |amounts| {}",
        stats.sum_outgoing, stats.sum_incoming, stats.sum_abs_values
    );

    if stats.by_card.is_empty() {
        return;
    }

    println!();
    println!(
        "{:<8}  {:>12}  {:>12}  {:>8}  {}",
        "Card", "Calculated", "Control", "Delta", "Status"
    );
    for (last4, rec) in &stats.by_card {
        let control = rec
            .control_total
            .map(|d| d.to_string())
            .unwrap_or_else(|| "-".into());
        let delta = rec.delta.map(|d| d.to_string()).unwrap_or_else(|| "-".into());
        let status = match rec.balanced {
            Some(true) => "balanced",
            Some(false) => "OUT OF BALANCE",
            None => "no control total",
        };
        println!(
            "{:<8}  {:>12}  {:>12}  {:>8}  {}",
            last4, rec.calculated_total, control, delta, status
        );
    }
}

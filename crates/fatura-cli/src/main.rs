mod commands;
mod output;

use clap::{Parser, Subcommand};
use commands::PeriodArgs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "fatura",
    version,
    about = "Extract and reconcile transactions from credit card statement PDFs"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract transactions from a statement PDF
    Parse {
        /// Path to the statement PDF
        input_file: PathBuf,

        /// Output format: table (default) or json
        #[arg(short, long, default_value = "table")]
        output: String,

        /// Write the full JSON result to a file
        #[arg(short = 'O', long = "out", value_name = "FILE")]
        out: Option<PathBuf>,

        /// Also list lines that were rejected during parsing
        #[arg(long)]
        show_rejects: bool,

        #[command(flatten)]
        period: PeriodArgs,
    },
    /// Check extracted sums against the subtotals printed per card
    Reconcile {
        /// Path to the statement PDF
        input_file: PathBuf,

        /// Output format: table (default) or json
        #[arg(short, long, default_value = "table")]
        output: String,

        /// Fail when any card does not balance against its control total
        #[arg(long)]
        strict: bool,

        #[command(flatten)]
        period: PeriodArgs,
    },
    /// Manage and inspect section keyword tables
    Sections {
        #[command(subcommand)]
        action: SectionsAction,
    },
}

#[derive(Subcommand)]
enum SectionsAction {
    /// Print the builtin section tables
    List,
    /// Validate a custom section config file
    Validate {
        /// Path to JSON section config
        file: PathBuf,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Parse {
            input_file,
            output,
            out,
            show_rejects,
            period,
        } => commands::parse::run(input_file, &output, out, show_rejects, &period),
        Commands::Reconcile {
            input_file,
            output,
            strict,
            period,
        } => commands::reconcile::run(input_file, &output, strict, &period),
        Commands::Sections { action } => match action {
            SectionsAction::List => commands::sections::list(),
            SectionsAction::Validate { file } => commands::sections::validate(&file),
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

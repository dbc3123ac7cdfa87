//! mediaplan CLI - media-plan spreadsheet ingestion tool
//!
//! A command-line tool for validating and converting media-plan
//! spreadsheets (.xlsx, .xls) to JSON.

use clap::{Parser, Subcommand};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use mediaplan::{ingest_file, IngestionOutcome, Record, REQUIRED_FIELDS};
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

/// Media-plan spreadsheet ingestion to validated JSON
#[derive(Parser)]
#[command(
    name = "mediaplan",
    version,
    about = "Ingest media-plan spreadsheets",
    long_about = "mediaplan - media-plan spreadsheet ingestion tool.\n\n\
                  Decodes .xlsx and .xls uploads, canonicalizes column labels\n\
                  and validates the required plan columns."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest a plan and emit its records as JSON
    Json {
        /// Input file path
        input: PathBuf,

        /// Output file path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output compact JSON (no indentation)
        #[arg(long)]
        compact: bool,
    },

    /// Validate a plan without emitting records
    Check {
        /// Input file path
        input: PathBuf,
    },

    /// Show plan information
    Info {
        /// Input file path
        input: PathBuf,
    },

    /// Show version information
    Version,
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Json {
            input,
            output,
            compact,
        } => {
            let pb = create_spinner("Ingesting plan...");
            let records = ingest_or_exit(&input, &pb);
            pb.set_message("Rendering to JSON...");

            let json = if compact {
                serde_json::to_string(&records)?
            } else {
                serde_json::to_string_pretty(&records)?
            };

            pb.finish_and_clear();
            write_output(output.as_ref(), &json)?;

            if let Some(path) = output {
                println!(
                    "{} Wrote {} records: {}",
                    "✓".green().bold(),
                    records.len(),
                    path.display()
                );
            }
        }

        Commands::Check { input } => {
            let pb = create_spinner("Ingesting plan...");
            let records = ingest_or_exit(&input, &pb);
            pb.finish_and_clear();

            println!(
                "{} {} valid records in {}",
                "✓".green().bold(),
                records.len(),
                input.display()
            );
        }

        Commands::Info { input } => {
            let pb = create_spinner("Ingesting plan...");
            let records = ingest_or_exit(&input, &pb);
            pb.finish_and_clear();

            println!("{}", "Plan Information".cyan().bold());
            println!("{}", "─".repeat(40));
            println!(
                "{}: {}",
                "File".bold(),
                input.file_name().unwrap_or_default().to_string_lossy()
            );
            println!("{}: {}", "Records".bold(), records.len());

            if let Some(first) = records.first() {
                let columns: Vec<&str> = first.keys().collect();
                println!("{}: {}", "Columns".bold(), columns.join(", "));
            }
            println!(
                "{}: {}",
                "Required".bold(),
                REQUIRED_FIELDS.join(", ")
            );
        }

        Commands::Version => {
            print_version();
        }
    }

    Ok(())
}

fn ingest_or_exit(input: &PathBuf, pb: &ProgressBar) -> Vec<Record> {
    match ingest_file(input) {
        IngestionOutcome::Accepted(records) => records,
        IngestionOutcome::Rejected(why) => {
            pb.finish_and_clear();
            eprintln!("{} {}", "✗".red().bold(), why.message());
            std::process::exit(1);
        }
    }
}

fn print_version() {
    println!(
        "{} {}",
        "mediaplan".green().bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!("Media-plan spreadsheet ingestion to validated JSON");
    println!();
    println!("Supported formats: XLSX, XLS");
}

fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
            .template("{spinner:.blue} {msg}")
            .unwrap(),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn write_output(path: Option<&PathBuf>, content: &str) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
        }
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            writeln!(handle, "{}", content)?;
        }
    }
    Ok(())
}

//! flashreport CLI - record flashing results and export them as an XLSX report

#![deny(warnings)]

// Global invariants enforced:
// - Any failure exits non-zero and leaves no report file behind
// - Identical database contents yield identical report cells

use anyhow::Context;
use clap::{Parser, Subcommand};
use flashreport_core::config::{self, ResolvedConfig};
use flashreport_core::summary::render_text;
use flashreport_core::window::{self, parse_timestamp};
use flashreport_core::{generate_report, FlashStore, ReportOptions, TimeWindow};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "flashreport")]
#[command(about = "Record device flashing results and export them as an XLSX report")]
#[command(version = env!("FLASHREPORT_VERSION"))]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to config file (default: auto-discover in current directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export the latest flash of every device flashed in a time window
    Report {
        /// Window start, exclusive (YYYY-MM-DD_HH:MM)
        #[arg(long)]
        start_date: String,

        /// Window end, exclusive (YYYY-MM-DD_HH:MM)
        #[arg(long)]
        end_date: String,

        /// SQLite database (overrides config file)
        #[arg(long)]
        db: Option<PathBuf>,

        /// Directory to write the report into (overrides config file)
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Skip the console summary
        #[arg(long, conflicts_with = "json")]
        quiet: bool,

        /// Print the summary as JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Create the database schema if it does not exist
    Init {
        /// SQLite database (overrides config file)
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Record one flashing attempt and its test results
    Record {
        /// Chip type, e.g. green or blue-shiny
        #[arg(long)]
        chip_type: String,

        /// Software flashed onto the chip, e.g. master or relay_mk1
        #[arg(long)]
        software: String,

        /// Physical chip number
        #[arg(long)]
        chip_number: Option<String>,

        /// Identifier assigned by the flashing station
        #[arg(long)]
        flashed_id: Option<String>,

        /// Time of the flash (YYYY-MM-DD_HH:MM, default: now)
        #[arg(long)]
        at: Option<String>,

        /// Test result as key=value; repeatable
        #[arg(long = "test", value_parser = parse_key_value)]
        tests: Vec<(String, String)>,

        /// SQLite database (overrides config file)
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Validate or show the configuration
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Validate a config file without generating a report
    Validate,
    /// Show the resolved configuration (merged defaults + config file)
    Show,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Report {
            start_date,
            end_date,
            db,
            output_dir,
            quiet,
            json,
        } => {
            let resolved = load_config(cli.config.as_deref())?;
            let window = TimeWindow::parse(&start_date, &end_date, resolved.timezone)?;

            let database = db.unwrap_or_else(|| resolved.database.clone());
            let output_dir = output_dir.unwrap_or_else(|| resolved.output_dir.clone());
            let options = ReportOptions::from(&resolved);

            let written = generate_report(&database, &output_dir, &window, &options)
                .with_context(|| format!("failed to generate report from {}", database.display()))?;

            if json {
                println!("{}", serde_json::to_string_pretty(&written.summary)?);
            } else if !quiet {
                print!("{}", render_text(&written.summary));
            }
            eprintln!("Report written to: {}", written.path.display());
        }
        Commands::Init { db } => {
            let resolved = load_config(cli.config.as_deref())?;
            let database = db.unwrap_or(resolved.database);
            FlashStore::open(&database)
                .with_context(|| format!("failed to initialize {}", database.display()))?;
            println!("Database ready: {}", database.display());
        }
        Commands::Record {
            chip_type,
            software,
            chip_number,
            flashed_id,
            at,
            tests,
            db,
        } => {
            let resolved = load_config(cli.config.as_deref())?;
            let database = db.unwrap_or(resolved.database);

            let flashed_time = match at {
                Some(at) => resolved.timezone.epoch_seconds(&parse_timestamp(&at)?)? as f64,
                None => window::now_epoch(),
            };

            let store = FlashStore::open(&database)
                .with_context(|| format!("failed to open {}", database.display()))?;
            let chip_id = store.register_chip(&chip_type, chip_number.as_deref())?;
            let flash_id =
                store.register_flash(chip_id, &software, flashed_time, flashed_id.as_deref())?;
            for (key, value) in &tests {
                store.register_test(flash_id, key, value)?;
            }
            tracing::info!(chip_id, flash_id, tests = tests.len(), "recorded flash");
            println!(
                "Recorded flash {} for chip {} ({} test result(s))",
                flash_id,
                chip_number.as_deref().unwrap_or("<unnumbered>"),
                tests.len()
            );
        }
        Commands::Config { action } => match action {
            ConfigAction::Validate => {
                let cwd = std::env::current_dir()?;
                match config::load_and_resolve(&cwd, cli.config.as_deref()) {
                    Ok(resolved) => {
                        if let Some(ref p) = resolved.config_path {
                            println!("Config valid: {}", p.display());
                        } else {
                            println!("No config file found. Using defaults.");
                        }
                    }
                    Err(e) => {
                        eprintln!("Config validation failed: {:#}", e);
                        std::process::exit(1);
                    }
                }
            }
            ConfigAction::Show => {
                let resolved = load_config(cli.config.as_deref())?;
                println!("Configuration:");
                if let Some(ref p) = resolved.config_path {
                    println!("  Source: {}", p.display());
                } else {
                    println!("  Source: defaults (no config file found)");
                }
                println!("  database: {}", resolved.database.display());
                println!("  output_dir: {}", resolved.output_dir.display());
                println!("  highlight_color: {:06X}", resolved.highlight_rgb);
                println!("  rssi_policy: {}", resolved.rssi_policy.as_str());
                println!("  timezone: {}", resolved.timezone.as_str());
            }
        },
    }

    Ok(())
}

fn load_config(config_path: Option<&std::path::Path>) -> anyhow::Result<ResolvedConfig> {
    let cwd = std::env::current_dir()?;
    let resolved =
        config::load_and_resolve(&cwd, config_path).context("failed to load configuration")?;
    if let Some(path) = &resolved.config_path {
        tracing::info!(path = %path.display(), "using config");
    }
    Ok(resolved)
}

/// Log to stderr; `RUST_LOG` wins over `-v`
fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got {:?}", s))?;
    if key.trim().is_empty() {
        return Err(format!("empty key in {:?}", s));
    }
    Ok((key.trim().to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_report_requires_both_dates() {
        let result =
            Cli::try_parse_from(["flashreport", "report", "--start-date", "2024-01-01_00:00"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_quiet_and_json_conflict() {
        let result = Cli::try_parse_from([
            "flashreport",
            "report",
            "--start-date",
            "2024-01-01_00:00",
            "--end-date",
            "2024-01-02_00:00",
            "--quiet",
            "--json",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_key_value() {
        assert_eq!(
            parse_key_value("rssi=-42").unwrap(),
            ("rssi".to_string(), "-42".to_string())
        );
        assert_eq!(
            parse_key_value("note=a=b").unwrap(),
            ("note".to_string(), "a=b".to_string())
        );
        assert!(parse_key_value("flashed").is_err());
        assert!(parse_key_value("=true").is_err());
    }
}

//! CLI for mixprime: search a 32-bit space for prime mixing constants.

mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "mixprime")]
#[command(about = "mixprime: search, inspect and compare 32-bit prime mixing constants")]
#[command(version = mixprime_core::VERSION)]
struct Cli {
    /// Log every rejection and worker summary
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a full search and print the selected P/Q pair
    Generate {
        /// JSON config file (partial files are merged over the defaults)
        #[arg(long)]
        config: Option<String>,

        /// Output format
        #[arg(long, default_value = "text", value_parser = ["text", "json", "csv"])]
        format: String,

        /// Write JSON/CSV output to this file instead of stdout
        #[arg(long)]
        output: Option<String>,

        /// Reduced run: 10 candidates, 100 avalanche cases
        #[arg(long)]
        quick: bool,

        /// Override worker count
        #[arg(long)]
        workers: Option<usize>,

        /// Override candidate count
        #[arg(long)]
        candidates: Option<usize>,

        /// Seed the random source for a reproducible run
        #[arg(long)]
        seed: Option<u64>,

        /// Override the wall-clock budget in seconds
        #[arg(long)]
        timeout_secs: Option<u64>,

        /// What to do when no candidate is far enough from P
        #[arg(long, value_parser = ["strict", "second-best"])]
        fallback: Option<String>,

        /// Compare against a previous JSON result
        #[arg(long)]
        compare: Option<String>,
    },

    /// Evaluate a single constant (hex with 0x prefix, or decimal)
    Inspect {
        /// Value to inspect, e.g. 0xB7E15163
        value: String,

        /// JSON config file supplying thresholds
        #[arg(long)]
        config: Option<String>,

        /// Avalanche trials
        #[arg(long, default_value = "10000")]
        cases: usize,

        /// Print the evaluated candidate as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the default configuration as JSON
    Config,
}

fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    match cli.command {
        Commands::Generate {
            config,
            format,
            output,
            quick,
            workers,
            candidates,
            seed,
            timeout_secs,
            fallback,
            compare,
        } => commands::generate::run(commands::generate::GenerateCommandConfig {
            config_path: config.as_deref(),
            format: &format,
            output_path: output.as_deref(),
            quick,
            verbose: cli.verbose,
            workers,
            candidates,
            seed,
            timeout_secs,
            fallback: fallback.as_deref(),
            compare_path: compare.as_deref(),
        }),
        Commands::Inspect {
            value,
            config,
            cases,
            json,
        } => commands::inspect::run(commands::inspect::InspectCommandConfig {
            value: &value,
            config_path: config.as_deref(),
            cases,
            json,
        }),
        Commands::Config => commands::config::run(),
    }
}

//! labelsmith - rule-based weak supervision from the command line
//!
//! Usage:
//!   labelsmith serve --port 8000                       # Run the remote training worker
//!   labelsmith check "noise > 0.5 | gaps >= 2"         # Parse and normalise a rule
//!   labelsmith run --config run.toml --features fm.json --rules rules.json
//!   labelsmith run ... --gold gold.json --out ./store  # Score against gold, persist the result

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod commands;
mod error;
mod output;

use commands::{check, run, serve};
use labelsmith::worker::{DEFAULT_HOST, DEFAULT_PORT};

/// labelsmith - rule-based weak supervision
///
/// Label time-series feature data with rules, aggregate the votes and train
/// surrogate models that generalise them.
#[derive(Parser)]
#[command(name = "labelsmith")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output (debug logging for labelsmith)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the remote training worker
    Serve {
        /// Address to bind
        #[arg(long, default_value = DEFAULT_HOST)]
        host: String,

        /// Port to bind
        #[arg(long, default_value_t = DEFAULT_PORT)]
        port: u16,
    },

    /// Parse a rule and print its normalised form and features
    Check {
        /// Rule expression or free-form program
        #[arg(value_name = "EXPR")]
        expr: String,

        /// Render features as table["name"] lookups on this table
        #[arg(long)]
        table: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Execute one labeling run and print its scores as JSON
    Run {
        /// Run configuration (TOML)
        #[arg(short, long, value_name = "FILE")]
        config: PathBuf,

        /// Feature matrix (JSON)
        #[arg(short, long, value_name = "FILE")]
        features: PathBuf,

        /// Rules of the rule set (JSON array)
        #[arg(short, long, value_name = "FILE")]
        rules: PathBuf,

        /// Gold labels (JSON object: item key to label index)
        #[arg(short, long, value_name = "FILE")]
        gold: Option<PathBuf>,

        /// Store directory; the result is persisted there when given
        #[arg(short, long, value_name = "DIR")]
        out: Option<PathBuf>,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "info,labelsmith=debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    // logs go to stderr so JSON on stdout stays parseable
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Serve { host, port } => serve::run(&host, port),

        Commands::Check { expr, table, json } => check::run(&expr, table.as_deref(), json),

        Commands::Run {
            config,
            features,
            rules,
            gold,
            out,
        } => run::run(&run::RunArgs {
            config,
            features,
            rules,
            gold,
            out,
        }),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&e.to_string());
            e.exit_code()
        }
    }
}

mod cmd_collections;
mod cmd_path;
mod cmd_policy;
mod json_io;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser, Debug)]
#[command(name = "pathbind")]
#[command(about = "Read and write JSON by dotted path, and map it onto typed models")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,

    /// Log registration and graph walks to stderr (trace level)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Split a dotted path into tokens
    Tokenize {
        /// Dotted path, e.g. "addresses.0.city"
        path: String,
    },
    /// Print the value at a path, or null
    Get {
        /// Input file (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Dotted path to read
        #[arg(short, long)]
        path: String,
    },
    /// Write a value at a path and print the resulting tree
    Set {
        /// Input file (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Dotted path to write
        #[arg(short, long)]
        path: String,

        /// JSON value to write
        #[arg(long)]
        value: String,
    },
    /// Link a flat collection listing into a nested collection tree
    Collections {
        /// Input file (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,
    },
    /// Edit metadata policies
    Policy {
        #[command(subcommand)]
        op: cmd_policy::PolicyOp,
    },
}

const LOG_ENV: &str = "PATHBIND_LOG";
const VERBOSE_FILTER: &str = "warn,pathbind=trace,pathbind_samples=trace";

/// `--verbose` wins over `PATHBIND_LOG`, which wins over the `warn` default.
fn filter_directive(verbose: bool, env: Option<String>) -> String {
    if verbose {
        VERBOSE_FILTER.to_string()
    } else {
        env.unwrap_or_else(|| "warn".to_string())
    }
}

fn init_logging(verbose: bool) {
    let directive = filter_directive(verbose, std::env::var(LOG_ENV).ok());
    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
    tracing::debug!(%directive, "logging initialized");
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Tokenize { path } => cmd_path::run_tokenize(&path, cli.pretty),
        Commands::Get { input, path } => cmd_path::run_get(&input, &path, cli.pretty),
        Commands::Set { input, path, value } => {
            cmd_path::run_set(&input, &path, &value, cli.pretty)
        }
        Commands::Collections { input } => cmd_collections::run(&input, cli.pretty),
        Commands::Policy { op } => cmd_policy::run(op, cli.pretty),
    }
}

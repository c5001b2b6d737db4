use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "paceload")]
#[command(about = "Paceload - rate-limited, retry-aware bulk loader", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (TOML). Missing file is fine.
    #[arg(long, global = true, env = "PACELOAD_CONFIG", default_value = "paceload.toml")]
    pub config: PathBuf,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Load a CSV file into a sink, one record at a time
    Load(LoadArgs),

    /// Parse a CSV file and report loadable rows without writing anything
    Inspect {
        #[command(flatten)]
        input: InputArgs,

        /// Number of sample rows to print
        #[arg(long, default_value = "5")]
        sample: usize,
    },
}

#[derive(Args, Clone, Debug)]
pub struct InputArgs {
    /// CSV file with a header row
    #[arg(long)]
    pub input: PathBuf,

    /// Column holding the natural key (defaults to the first column)
    #[arg(long)]
    pub key_column: Option<String>,

    /// Skip rows where this column is blank or NaN (repeatable)
    #[arg(long = "require")]
    pub require: Vec<String>,

    /// Keep this column as text instead of inferring numbers (repeatable)
    #[arg(long = "raw-column")]
    pub raw_columns: Vec<String>,
}

#[derive(Args, Clone, Debug)]
pub struct LoadArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Where to write records
    #[arg(long, value_enum)]
    pub sink: Option<SinkKind>,

    /// Maximum write attempts per second, retries included
    #[arg(long)]
    pub rate: Option<f64>,

    /// Attempts per record before it is counted as failed
    #[arg(long)]
    pub max_attempts: Option<u32>,

    /// Log progress every N successful records (0 disables)
    #[arg(long)]
    pub progress_interval: Option<u64>,

    /// Postgres connection string
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Target table for the postgres sink
    #[arg(long)]
    pub table: Option<String>,

    /// Collection URL for the http sink
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Bearer token for the http sink
    #[arg(long, env = "PACELOAD_BEARER_TOKEN", hide_env_values = true)]
    pub bearer_token: Option<String>,

    /// Per-request timeout for the http sink, in seconds
    #[arg(long)]
    pub request_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SinkKind {
    Postgres,
    Http,
    #[default]
    DryRun,
}

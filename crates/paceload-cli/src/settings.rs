use anyhow::Result;
use config::{Config, Environment, File};
use paceload_core::WriterConfig;
use serde::Deserialize;
use std::path::Path;

use crate::cli::{InputArgs, LoadArgs, SinkKind};

/// Layered settings: defaults, then the TOML file, then `PACELOAD_*`
/// variables, then command-line flags.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub writer: WriterConfig,
    pub input: InputSettings,
    pub sink: SinkSettings,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct InputSettings {
    pub key_column: Option<String>,
    pub require: Vec<String>,
    pub raw_columns: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SinkSettings {
    pub kind: SinkKind,
    pub database_url: Option<String>,
    pub table: Option<String>,
    pub endpoint: Option<String>,
    pub bearer_token: Option<String>,
    pub request_timeout_secs: u64,
}

impl Default for SinkSettings {
    fn default() -> Self {
        Self {
            kind: SinkKind::DryRun,
            database_url: None,
            table: None,
            endpoint: None,
            bearer_token: None,
            request_timeout_secs: 10,
        }
    }
}

impl Settings {
    /// Read the optional config file and `PACELOAD_*` environment
    /// (e.g. `PACELOAD_WRITER__RATE_LIMIT_PER_SECOND=2`).
    pub fn load(path: &Path) -> Result<Self> {
        let settings = Config::builder()
            .add_source(File::from(path).required(false))
            .add_source(
                Environment::with_prefix("PACELOAD")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize::<Settings>()?;

        Ok(settings)
    }

    pub fn apply_input_args(&mut self, args: &InputArgs) {
        if let Some(ref key) = args.key_column {
            self.input.key_column = Some(key.clone());
        }
        if !args.require.is_empty() {
            self.input.require = args.require.clone();
        }
        if !args.raw_columns.is_empty() {
            self.input.raw_columns = args.raw_columns.clone();
        }
    }

    pub fn apply_load_args(&mut self, args: &LoadArgs) {
        self.apply_input_args(&args.input);

        if let Some(rate) = args.rate {
            self.writer.rate_limit_per_second = rate;
        }
        if let Some(attempts) = args.max_attempts {
            self.writer.max_attempts_per_record = attempts;
        }
        if let Some(interval) = args.progress_interval {
            self.writer.progress_interval_records = interval;
        }

        if let Some(kind) = args.sink {
            self.sink.kind = kind;
        }
        if let Some(ref url) = args.database_url {
            self.sink.database_url = Some(url.clone());
        }
        if let Some(ref table) = args.table {
            self.sink.table = Some(table.clone());
        }
        if let Some(ref endpoint) = args.endpoint {
            self.sink.endpoint = Some(endpoint.clone());
        }
        if let Some(ref token) = args.bearer_token {
            self.sink.bearer_token = Some(token.clone());
        }
        if let Some(secs) = args.request_timeout_secs {
            self.sink.request_timeout_secs = secs;
        }
    }
}

use anyhow::{Context, Result};
use std::future::Future;
use std::time::Duration;

use crate::cli::{Commands, InputArgs, SinkKind};
use crate::csv_source::{CsvSource, CsvSourceOptions};
use crate::dry_run::DryRunSink;
use crate::settings::Settings;
use paceload_core::{
    CancellationToken, LoadReport, RecordSink, RecordSource, Row, ThrottledWriter,
};
use paceload_db::{PostgresSink, PostgresSinkConfig};
use paceload_http::{HttpSink, HttpSinkConfig};

pub async fn execute(command: Commands, mut settings: Settings) -> Result<()> {
    match command {
        Commands::Load(args) => {
            settings.apply_load_args(&args);
            settings.writer.validate()?;

            let source = open_source(&args.input, &settings)?;
            println!(
                "Loading {} records from {} into {:?} sink",
                source.size_hint().unwrap_or(0),
                args.input.input.display(),
                settings.sink.kind
            );
            println!(
                "Rate limit: {} records/sec, up to {} attempts per record",
                settings.writer.rate_limit_per_second, settings.writer.max_attempts_per_record
            );

            let cancel = CancellationToken::new();
            watch_ctrl_c(cancel.clone());
            let writer = ThrottledWriter::new(settings.writer.clone()).with_cancellation(cancel);

            let report = match settings.sink.kind {
                SinkKind::Postgres => {
                    let database_url = settings
                        .sink
                        .database_url
                        .clone()
                        .context("postgres sink needs --database-url or DATABASE_URL")?;
                    let table = settings
                        .sink
                        .table
                        .clone()
                        .context("postgres sink needs --table")?;
                    let key_column = source.key_column().to_string();

                    let mut sink =
                        PostgresSink::new(PostgresSinkConfig::new(database_url, table, key_column));
                    run_load(&writer, source, &mut sink).await?
                }
                SinkKind::Http => {
                    let endpoint = settings
                        .sink
                        .endpoint
                        .clone()
                        .context("http sink needs --endpoint")?;

                    let mut config = HttpSinkConfig::new(endpoint)
                        .with_timeout(Duration::from_secs(settings.sink.request_timeout_secs));
                    if let Some(ref token) = settings.sink.bearer_token {
                        config = config.with_bearer_token(token.clone());
                    }

                    let mut sink = HttpSink::new(config)?;
                    run_load(&writer, source, &mut sink).await?
                }
                SinkKind::DryRun => {
                    let mut sink = DryRunSink::default();
                    run_load(&writer, source, &mut sink).await?
                }
            };

            println!();
            println!("{}", report);
            if report.aborted {
                println!("⚠ Run cancelled before the input was exhausted.");
            }
        }

        Commands::Inspect { input, sample } => {
            settings.apply_input_args(&input);

            let mut source = open_source(&input, &settings)?;
            println!("File: {}", input.input.display());
            println!("  Columns: {}", source.headers().join(", "));
            println!("  Key column: {}", source.key_column());
            println!("  Loadable rows: {}", source.size_hint().unwrap_or(0));

            println!();
            println!("Sample rows:");
            let mut shown = 0;
            while shown < sample {
                match source.next_record().await? {
                    Some(row) => {
                        shown += 1;
                        println!("{}. {}", shown, row.to_json());
                    }
                    None => break,
                }
            }

            while source.next_record().await?.is_some() {}
            let stats = source.stats();
            println!();
            println!("  Emitted: {}", stats.emitted);
            println!("  Skipped: {}", stats.skipped);
        }
    }

    Ok(())
}

fn open_source(input: &InputArgs, settings: &Settings) -> Result<CsvSource> {
    let options = CsvSourceOptions {
        key_column: settings.input.key_column.clone(),
        required: settings.input.require.clone(),
        raw_columns: settings.input.raw_columns.clone(),
    };

    let source = CsvSource::open(&input.input, options)?;
    Ok(source)
}

async fn run_load<K>(writer: &ThrottledWriter, source: CsvSource, sink: &mut K) -> Result<LoadReport>
where
    K: RecordSink<Row>,
{
    let report = writer.run(source, sink).await?;
    Ok(report)
}

/// Ctrl-C stops the run after the record in flight; a second Ctrl-C exits
/// immediately with status 130.
fn watch_ctrl_c(cancel: CancellationToken) {
    tokio::spawn(async move {
        if handle_interrupts(cancel, tokio::signal::ctrl_c).await {
            tracing::error!("Second interrupt received, exiting without waiting");
            std::process::exit(130);
        }
    });
}

/// Cancel on the first signal. Returns `true` once a second signal arrives,
/// `false` if listening fails.
async fn handle_interrupts<F, Fut>(cancel: CancellationToken, mut next_signal: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::io::Result<()>>,
{
    if next_signal().await.is_err() {
        return false;
    }
    tracing::warn!(
        "Interrupt received, finishing the current record before stopping (Ctrl-C again to force quit)"
    );
    cancel.cancel();

    next_signal().await.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_second_interrupt_forces_exit() {
        let cancel = CancellationToken::new();
        let signals = AtomicU32::new(0);

        let force = handle_interrupts(cancel.clone(), || {
            signals.fetch_add(1, Ordering::SeqCst);
            async { Ok(()) }
        })
        .await;

        assert!(force);
        assert!(cancel.is_cancelled());
        assert_eq!(signals.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_first_interrupt_only_cancels() {
        let cancel = CancellationToken::new();
        let watcher = tokio::spawn(handle_interrupts(cancel.clone(), {
            let mut seen = 0;
            move || {
                seen += 1;
                let first = seen == 1;
                async move {
                    if first {
                        Ok(())
                    } else {
                        std::future::pending().await
                    }
                }
            }
        }));

        cancel.cancelled().await;
        assert!(!watcher.is_finished());
        watcher.abort();
    }

    #[tokio::test]
    async fn test_listener_failure_leaves_run_alone() {
        let cancel = CancellationToken::new();
        let force = handle_interrupts(cancel.clone(), || async {
            Err(std::io::Error::new(std::io::ErrorKind::Other, "no signal handler"))
        })
        .await;

        assert!(!force);
        assert!(!cancel.is_cancelled());
    }
}

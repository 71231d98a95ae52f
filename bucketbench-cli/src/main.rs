//! Continuous download benchmark for S3-compatible object storage.
//!
//! Lists the configured bucket once, then cyclically re-downloads its
//! objects with a fixed pool of parallel workers, measuring download
//! throughput and first-byte latency. An untimed warm-up window can run
//! before the measurement window so connection setup does not skew the
//! numbers.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use argh::FromArgs;
use bucketbench_engine::Benchmark;
use bucketbench_storage::{S3CompatibleStore, S3StoreConfig};

use crate::config::Config;

mod config;
mod observability;
mod output;

/// Download benchmark for S3-compatible object storage.
#[derive(Debug, FromArgs)]
struct Args {
    /// path to the yaml configuration file
    #[argh(option, short = 'c')]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Args = argh::from_env();
    observability::init_tracing();

    let config_file = std::fs::File::open(&args.config).context("failed to open config file")?;
    let config: Config =
        serde_yaml::from_reader(config_file).context("failed to parse config YAML")?;

    let store = S3CompatibleStore::new(S3StoreConfig {
        bucket: config.bucket.clone(),
        region: config.region.clone(),
        endpoint: Some(config.endpoint.clone()),
        access_key: config.access_key.clone(),
        secret_key: config.secret_key.clone(),
        path_style: config.path_style,
        request_timeout: None,
    })
    .context("failed to construct storage client")?;

    let mut bench = Benchmark::start(Arc::new(store), config.concurrency)
        .await
        .context("failed to start benchmark")?;

    let mut interrupted = false;
    if !config.warmup.is_zero() {
        tracing::info!(warmup = ?config.warmup, "warming up");
        interrupted = drain(&mut bench, config.warmup).await;
    }

    let measured = Instant::now();
    if !interrupted {
        tracing::info!(duration = ?config.duration, "measuring");
        bench.set_metrics_enabled(true);
        drain(&mut bench, config.duration).await;
    }
    let elapsed = measured.elapsed();

    bench.stop();
    let report = bench.collect_report().await;
    output::print_report(&report, elapsed, config.concurrency);

    Ok(())
}

/// Drives the consumer side of the engine until the window elapses.
///
/// Returns `true` if the run was interrupted with Ctrl-C.
async fn drain(bench: &mut Benchmark, window: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + window;
    loop {
        tokio::select! {
            _ = tokio::time::sleep_until(deadline) => return false,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted, stopping early");
                return true;
            }
            next = bench.next_object() => {
                tracing::trace!(name = %next.name, size = next.size, "drained object");
            }
        }
    }
}

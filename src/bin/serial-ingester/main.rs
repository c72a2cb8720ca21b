mod args;

use std::process::ExitCode;

use anyhow::{Context as _, Result};
use args::Args;
use clap::Parser as _;
use iaq_sensors::collector::{Collector, ReadingSink, SerialLineSource, SinkError};
use iaq_sensors::reading::Reading;
use iaq_sensors::{db, port};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt as _;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const READING_CHANNEL_CAPACITY: usize = 16;

/// Hands readings from the blocking collector loop to the async insert task.
struct ChannelSink {
    tx: mpsc::Sender<Reading>,
}

impl ReadingSink for ChannelSink {
    fn submit(&mut self, reading: Reading) -> Result<(), SinkError> {
        self.tx
            .blocking_send(reading)
            .map_err(|_| SinkError::Closed)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(e) = run().await {
        eprintln!("{e:#}");
        return ExitCode::from(1);
    }

    ExitCode::from(0)
}

async fn run() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let pool = db::new_pool(&args.database_url).await?;

    db::ensure_schema(&pool)
        .await
        .context("failed to prepare database schema")?;

    let timezone = args.timezone;
    let port_name = args.port;
    let (tx, rx) = mpsc::channel(READING_CHANNEL_CAPACITY);

    let collector_task = tokio::task::spawn_blocking(move || -> Result<()> {
        let mut collector = match port_name {
            Some(name) => {
                let handle = port::open_port(&name)?;
                info!("listening on {name}");
                Collector::with_source(SerialLineSource::new(handle), timezone)
            }
            None => Collector::discover(timezone)?,
        };

        collector.run(&mut ChannelSink { tx })
    });

    let mut readings = ReceiverStream::new(rx);
    while let Some(reading) = readings.next().await {
        if let Err(e) = db::insert_reading(&pool, &reading).await {
            warn!("failed to persist reading: {e:#}");
            continue;
        }
        info!("[{}] data saved", reading.recorded_at);
    }

    // The stream only ends when the collector is done; surface its error.
    collector_task
        .await
        .context("collector task panicked")?
        .context("collector stopped")
}

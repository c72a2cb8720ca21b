mod args;

use std::io;
use std::process::ExitCode;

use anyhow::{Context as _, Result, bail};
use args::Args;
use clap::Parser as _;
use iaq_sensors::kalman::{self, FilterConfig};
use iaq_sensors::reading::Reading;
use iaq_sensors::{db, schema};
use tracing_subscriber::EnvFilter;

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

    if !schema::is_channel(&args.channel) {
        bail!(
            "unknown channel: {} (expected one of {})",
            args.channel,
            schema::CHANNELS.join(", ")
        );
    }

    let pool = db::new_pool(&args.database_url).await?;

    let mut readings = db::recent_readings(&pool, args.limit, args.timezone)
        .await
        .context("failed to fetch recent readings")?;

    // The query returns newest first; plot order is oldest first.
    readings.sort_by(|a, b| a.recorded_at.cmp(&b.recorded_at));

    let raw: Vec<Option<f64>> = readings
        .iter()
        .map(|r| r.get(&args.channel).and_then(|v| v.as_number()))
        .collect();

    let filled = kalman::fill_gaps(&raw);
    if filled.is_empty() {
        bail!("no samples recorded for channel {}", args.channel);
    }

    let config = FilterConfig {
        process_noise: args.process_noise,
        measurement_noise: args.measurement_noise,
        initial_covariance: args.initial_covariance,
        initial_estimate: None,
    };
    let smoothed = kalman::smooth(&filled, &config);

    write_csv(&readings, &raw, &smoothed).context("failed to write CSV output")?;

    Ok(())
}

fn write_csv(readings: &[Reading], raw: &[Option<f64>], smoothed: &[f64]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(io::stdout());
    writer.write_record(["recorded_at", "raw", "smoothed"])?;

    for ((reading, raw), smoothed) in readings.iter().zip(raw).zip(smoothed) {
        writer.write_record([
            reading.recorded_at.to_rfc3339(),
            raw.map(|v| v.to_string()).unwrap_or_default(),
            smoothed.to_string(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

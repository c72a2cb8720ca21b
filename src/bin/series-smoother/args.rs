use chrono_tz::Tz;
use clap::Parser;

#[derive(Debug, Parser)]
pub struct Args {
    /// Channel to smooth, e.g. co2 or pm_2_5.
    #[arg(long)]
    pub channel: String,

    /// How many of the most recent readings to pull.
    #[arg(long, default_value_t = 100)]
    pub limit: i64,

    /// Q: assumed variance of the signal's drift between steps.
    #[arg(long, default_value_t = 1e-5)]
    pub process_noise: f64,

    /// R: assumed variance of the sensor's observation error.
    #[arg(long, default_value_t = 0.1)]
    pub measurement_noise: f64,

    /// P0: covariance assigned to the initial estimate.
    #[arg(long, default_value_t = 1.0)]
    pub initial_covariance: f64,

    #[arg(long, env = "TZ")]
    pub timezone: Tz,

    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,
}

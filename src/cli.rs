//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use tiktok_downloader_core::RunConfig;
use tiktok_downloader_core::config::{
    DEFAULT_MAX_RETRIES, DEFAULT_PROXY_TIMEOUT, DEFAULT_RETRY_DELAY, default_worker_count,
    parse_proxy_list,
};

/// Archive the videos you liked and favorited on TikTok.
///
/// Reads the links from your TikTok user data export and stores each item's
/// metadata, video or images, music and cover under the output directory.
#[derive(Parser, Debug)]
#[command(name = "tiktok-downloader")]
#[command(author, version, about)]
pub struct Args {
    /// Path to the user data export (JSON)
    #[arg(short, long, default_value = "./user_data_tiktok.json")]
    pub file: PathBuf,

    /// Output directory
    #[arg(short, long, default_value = "./DownloadedFiles")]
    pub dir: PathBuf,

    /// Number of parallel workers (1-128) [default: max(32, CPU cores)]
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(1..=128))]
    pub threads: Option<u8>,

    /// Comma separated proxies to try in order, e.g. http://1.2.3.4:8080
    #[arg(short, long)]
    pub proxy: Option<String>,

    /// Seconds to wait for each proxy probe
    #[arg(long, default_value_t = DEFAULT_PROXY_TIMEOUT.as_secs_f64(), value_parser = parse_seconds)]
    pub proxy_timeout: f64,

    /// Extra page fetch attempts when the page data is missing
    #[arg(short = 'r', long, default_value_t = DEFAULT_MAX_RETRIES)]
    pub max_retries: u32,

    /// Seconds to wait between page fetch attempts
    #[arg(long, default_value_t = DEFAULT_RETRY_DELAY.as_secs_f64(), value_parser = parse_seconds)]
    pub retry_delay: f64,

    /// Also write logs to this file
    #[arg(long)]
    pub log: Option<PathBuf>,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Disable the progress display
    #[arg(long)]
    pub no_progress: bool,
}

fn parse_seconds(raw: &str) -> Result<f64, String> {
    let value: f64 = raw
        .parse()
        .map_err(|_| format!("'{raw}' is not a number of seconds"))?;
    if !value.is_finite() || value < 0.0 {
        return Err(format!("'{raw}' must be a non-negative number of seconds"));
    }
    Ok(value)
}

impl Args {
    /// Resolves the flags into the pipeline configuration.
    pub fn run_config(&self) -> RunConfig {
        RunConfig {
            worker_count: self
                .threads
                .map_or_else(default_worker_count, usize::from),
            download_root: self.dir.clone(),
            preferred_proxies: self.proxy.as_deref().and_then(parse_proxy_list),
            proxy_timeout: Duration::from_secs_f64(self.proxy_timeout),
            max_retries: self.max_retries,
            retry_delay: Duration::from_secs_f64(self.retry_delay),
            ..RunConfig::default()
        }
    }
}

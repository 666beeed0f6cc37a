use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::booking::session::DEFAULT_USER_AGENT;
use crate::booking::{HttpSettings, RenderSettings, RetryPolicy, ScraperSettings};

/// Golf tee-time finder
#[derive(Parser, Debug, Clone)]
#[command(name = "teetime-finder", version, about)]
pub struct Config {
    /// API listen address
    #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:8080")]
    pub listen_addr: String,

    /// SQLite course catalog path
    #[arg(long, env = "DATABASE_PATH", default_value = "courses.db")]
    pub database_path: String,

    /// JSON file of courses to load into the catalog at start-up
    #[arg(long, env = "COURSES_FILE")]
    pub courses_file: Option<PathBuf>,

    /// Per-request HTTP timeout in seconds
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value = "15")]
    pub request_timeout_secs: u64,

    /// Data-request attempts per scrape (403s and errors both count)
    #[arg(long, env = "MAX_ATTEMPTS", default_value = "3")]
    pub max_attempts: u32,

    /// Linear backoff step in milliseconds (attempt n waits n × this)
    #[arg(long, env = "BACKOFF_DELAY_MS", default_value = "2000")]
    pub backoff_delay_ms: u64,

    /// Lower bound of the random pre-request delay (ms)
    #[arg(long, env = "JITTER_MIN_MS", default_value = "200")]
    pub jitter_min_ms: u64,

    /// Upper bound of the random pre-request delay (ms)
    #[arg(long, env = "JITTER_MAX_MS", default_value = "700")]
    pub jitter_max_ms: u64,

    /// How long the headless browser waits for tee-time cards (seconds)
    #[arg(long, env = "RENDER_TIMEOUT_SECS", default_value = "15")]
    pub render_timeout_secs: u64,

    /// Chrome/Chromium binary for the browser fallback (auto-detected if unset)
    #[arg(long, env = "CHROME_EXECUTABLE")]
    pub chrome_executable: Option<PathBuf>,

    /// User-Agent sent to booking sites
    #[arg(long, env = "USER_AGENT", default_value = DEFAULT_USER_AGENT)]
    pub user_agent: String,
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.listen_addr.parse::<SocketAddr>().is_err() {
            anyhow::bail!("listen_addr '{}' is not a valid socket address", self.listen_addr);
        }
        if self.max_attempts == 0 {
            anyhow::bail!("max_attempts must be at least 1");
        }
        if self.request_timeout_secs == 0 {
            anyhow::bail!("request_timeout_secs must be positive");
        }
        if self.render_timeout_secs == 0 {
            anyhow::bail!("render_timeout_secs must be positive");
        }
        if self.jitter_min_ms > self.jitter_max_ms {
            anyhow::bail!("jitter_min_ms must not exceed jitter_max_ms");
        }
        if self.user_agent.trim().is_empty() {
            anyhow::bail!("user_agent must not be empty");
        }
        Ok(())
    }

    pub fn scraper_settings(&self) -> ScraperSettings {
        ScraperSettings {
            http: HttpSettings {
                request_timeout: Duration::from_secs(self.request_timeout_secs),
                user_agent: self.user_agent.clone(),
            },
            retry: RetryPolicy {
                max_attempts: self.max_attempts,
                backoff_step: Duration::from_millis(self.backoff_delay_ms),
                jitter_min: Duration::from_millis(self.jitter_min_ms),
                jitter_max: Duration::from_millis(self.jitter_max_ms),
            },
            render: RenderSettings {
                wait_timeout: Duration::from_secs(self.render_timeout_secs),
                chrome_executable: self.chrome_executable.clone(),
                ..RenderSettings::default()
            },
        }
    }
}

// src/config.rs
use crate::countdown::DEFAULT_LEAD;
use crate::errors::ConfigError;
use crate::feed_download::DEFAULT_FEED_URL;
use crate::timezone::SourceTimezone;
use clap::Parser;
use log::LevelFilter;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

pub const MIN_POLL_INTERVAL_SECS: u64 = 30;

#[derive(Debug, Parser)]
#[command(name = "showwatch", version, about = "Watches an upcoming-shows feed and counts down to each show")]
pub struct Cli {
    /// Upcoming shows JSON endpoint
    #[arg(long, env = "SHOWWATCH_URL", default_value = DEFAULT_FEED_URL)]
    pub url: String,

    /// Seconds between polls of the feed
    #[arg(long, env = "SHOWWATCH_POLL_SECS", default_value_t = 300)]
    pub poll_secs: u64,

    /// Seconds before a show starts to pop the notification
    #[arg(long, env = "SHOWWATCH_LEAD_SECS", default_value_t = DEFAULT_LEAD.as_secs())]
    pub lead_secs: u64,

    /// HTTP request timeout in seconds
    #[arg(long, env = "SHOWWATCH_TIMEOUT_SECS", default_value_t = 10)]
    pub timeout_secs: u64,

    /// IANA zone the feed publishes its dates in
    #[arg(long, env = "SHOWWATCH_SOURCE_TZ", default_value = "America/Los_Angeles")]
    pub source_tz: String,

    /// Keep at most this many upcoming shows from each poll
    #[arg(long)]
    pub max_shows: Option<usize>,

    /// Log countdowns instead of showing desktop notifications
    #[arg(long)]
    pub no_notify: bool,

    /// Run without the terminal dashboard
    #[arg(long, conflicts_with = "once")]
    pub headless: bool,

    /// Fetch the feed once, print it and exit
    #[arg(long)]
    pub once: bool,

    /// With --once, print JSON instead of text
    #[arg(long, requires = "once")]
    pub json: bool,

    /// Log file used while the dashboard owns the terminal
    #[arg(long, env = "SHOWWATCH_LOG_FILE", default_value = "showwatch.log")]
    pub log_file: PathBuf,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, env = "SHOWWATCH_LOG_LEVEL", default_value = "info")]
    pub log_level: LevelFilter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Dashboard,
    Headless,
    Once { json: bool },
}

/// Validated settings for the monitor.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub feed_url: Url,
    pub poll_interval: Duration,
    pub lead: Duration,
    pub request_timeout: Duration,
    pub source_tz: SourceTimezone,
    pub max_shows: Option<usize>,
    pub notifications: bool,
}

impl MonitorConfig {
    /// Default settings against `feed_url`.
    pub fn for_url(feed_url: Url) -> Self {
        Self {
            feed_url,
            poll_interval: Duration::from_secs(300),
            lead: DEFAULT_LEAD,
            request_timeout: Duration::from_secs(10),
            source_tz: SourceTimezone::default(),
            max_shows: None,
            notifications: true,
        }
    }
}

impl Cli {
    pub fn run_mode(&self) -> RunMode {
        if self.once {
            RunMode::Once { json: self.json }
        } else if self.headless {
            RunMode::Headless
        } else {
            RunMode::Dashboard
        }
    }

    pub fn monitor_config(&self) -> Result<MonitorConfig, ConfigError> {
        let feed_url = Url::parse(&self.url).map_err(|e| ConfigError::InvalidUrl {
            url: self.url.clone(),
            reason: e.to_string(),
        })?;
        if feed_url.scheme() != "http" && feed_url.scheme() != "https" {
            return Err(ConfigError::InvalidUrl {
                url: self.url.clone(),
                reason: "only http/https supported".to_string(),
            });
        }
        if self.poll_secs < MIN_POLL_INTERVAL_SECS {
            return Err(ConfigError::PollIntervalTooShort {
                min: MIN_POLL_INTERVAL_SECS,
                got: self.poll_secs,
            });
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::TimeoutTooShort);
        }

        Ok(MonitorConfig {
            feed_url,
            poll_interval: Duration::from_secs(self.poll_secs),
            lead: Duration::from_secs(self.lead_secs),
            request_timeout: Duration::from_secs(self.timeout_secs),
            source_tz: SourceTimezone::from_name(&self.source_tz)?,
            max_shows: self.max_shows,
            notifications: !self.no_notify,
        })
    }
}

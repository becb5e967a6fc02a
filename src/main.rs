use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use showwatch::app::{self, App};
use showwatch::config::{Cli, MonitorConfig, RunMode};
use showwatch::event::MonitorCommand;
use showwatch::event_store::StoreEvent;
use showwatch::feed_download::{FeedFetcher, HttpFeedFetcher, download_and_parse_feed};
use showwatch::logging;
use showwatch::monitor::Monitor;
use showwatch::notifier::{DesktopNotifier, LogNotifier, Notifier};
use showwatch::show_factory::ScheduleFactory;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mode = cli.run_mode();

    // The dashboard owns the terminal, so it logs to a file.
    match mode {
        RunMode::Dashboard => logging::init_file_logger(&cli.log_file, cli.log_level)
            .with_context(|| format!("cannot open log file {}", cli.log_file.display()))?,
        RunMode::Headless | RunMode::Once { .. } => logging::init_console_logger(cli.log_level)?,
    }

    let config = cli.monitor_config()?;
    let fetcher: Arc<dyn FeedFetcher + Send + Sync> =
        Arc::new(HttpFeedFetcher::new(config.request_timeout)?);

    match mode {
        RunMode::Once { json } => print_once(&config, fetcher.as_ref(), json).await,
        RunMode::Headless => run_headless(config, fetcher).await,
        RunMode::Dashboard => run_dashboard(config, fetcher).await,
    }
}

fn notifier_for(config: &MonitorConfig) -> Arc<dyn Notifier> {
    if config.notifications { Arc::new(DesktopNotifier) } else { Arc::new(LogNotifier) }
}

async fn print_once(
    config: &MonitorConfig,
    fetcher: &(dyn FeedFetcher + Send + Sync),
    json: bool,
) -> Result<()> {
    let factory = ScheduleFactory::new().with_source_timezone(config.source_tz);
    let mut snapshot = download_and_parse_feed(&config.feed_url, fetcher, &factory).await?;
    if let Some(limit) = config.max_shows {
        snapshot.keep_next(chrono::Utc::now(), limit);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        print!("{}", snapshot);
    }
    Ok(())
}

async fn run_headless(
    config: MonitorConfig,
    fetcher: Arc<dyn FeedFetcher + Send + Sync>,
) -> Result<()> {
    let notifier = notifier_for(&config);
    let monitor = Monitor::new(config, fetcher, notifier);

    let mut store_events = monitor.store_events();
    tokio::spawn(async move {
        loop {
            match store_events.recv().await {
                Ok(StoreEvent::Added(show)) => info!("New show: {}", show),
                Ok(StoreEvent::Removed(show, reason)) => info!("Dropped show ({}): {}", reason, show),
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!("Missed {} show updates", missed)
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let (commands_tx, commands_rx) = mpsc::unbounded_channel();
    let handle = tokio::spawn(monitor.run(commands_rx));

    tokio::signal::ctrl_c().await.context("cannot listen for Ctrl-C")?;
    info!("Interrupted, stopping");
    let _ = commands_tx.send(MonitorCommand::Shutdown);
    handle.await?;
    Ok(())
}

async fn run_dashboard(
    config: MonitorConfig,
    fetcher: Arc<dyn FeedFetcher + Send + Sync>,
) -> Result<()> {
    let notifier = notifier_for(&config);
    let monitor = Monitor::new(config, fetcher, notifier);
    let dashboard_rx = monitor.dashboard();

    let (commands_tx, commands_rx) = mpsc::unbounded_channel();
    let handle = tokio::spawn(monitor.run(commands_rx));

    let app = App::new(dashboard_rx.borrow().clone(), commands_tx.clone());
    // crossterm polling blocks, keep it off the runtime threads.
    let ui_result = tokio::task::spawn_blocking(move || app::start_ui(app, dashboard_rx)).await?;

    let _ = commands_tx.send(MonitorCommand::Shutdown);
    handle.await?;
    ui_result
}

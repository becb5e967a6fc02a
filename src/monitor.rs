// src/monitor.rs
use crate::config::MonitorConfig;
use crate::countdown::CountdownScheduler;
use crate::errors::FeedError;
use crate::event::MonitorCommand;
use crate::event_store::{EventStore, MergeOutcome, StoreEvent, TrackedShow};
use crate::feed_download::{FeedFetcher, download_and_parse_feed};
use crate::notifier::{CountdownAlert, Notifier};
use crate::show::{LiveStatus, UpcomingShow};
use crate::show_factory::ScheduleFactory;
use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::{self, MissedTickBehavior};
use url::Url;

const SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// What the view needs to draw one frame.
#[derive(Debug, Clone)]
pub struct Dashboard {
    pub feed_url: Url,
    pub live: LiveStatus,
    pub shows: Vec<TrackedShow>,
    pub last_refresh: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub next_poll: Option<DateTime<Utc>>,
    /// Local time minus source-zone time at the last refresh.
    pub source_bias: chrono::Duration,
}

impl Dashboard {
    pub fn new(feed_url: Url) -> Self {
        Self {
            feed_url,
            live: LiveStatus::offline(),
            shows: Vec::new(),
            last_refresh: None,
            last_error: None,
            next_poll: None,
            source_bias: chrono::Duration::zero(),
        }
    }
}

/// Polls the feed, keeps the event store in step with it and turns due
/// countdowns into notifications.
pub struct Monitor {
    config: MonitorConfig,
    fetcher: Arc<dyn FeedFetcher + Send + Sync>,
    notifier: Arc<dyn Notifier>,
    factory: ScheduleFactory,
    store: EventStore,
    scheduler: CountdownScheduler,
    due_rx: mpsc::UnboundedReceiver<UpcomingShow>,
    live: LiveStatus,
    last_refresh: Option<DateTime<Utc>>,
    last_error: Option<String>,
    next_poll: Option<DateTime<Utc>>,
    dashboard_tx: watch::Sender<Dashboard>,
}

impl Monitor {
    pub fn new(
        config: MonitorConfig,
        fetcher: Arc<dyn FeedFetcher + Send + Sync>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let factory = ScheduleFactory::new().with_source_timezone(config.source_tz);
        let store = match config.max_shows {
            Some(limit) => EventStore::new().with_limit(limit),
            None => EventStore::new(),
        };
        let (scheduler, due_rx) = CountdownScheduler::new(config.lead);
        let (dashboard_tx, _) = watch::channel(Dashboard::new(config.feed_url.clone()));

        Self {
            config,
            fetcher,
            notifier,
            factory,
            store,
            scheduler,
            due_rx,
            live: LiveStatus::offline(),
            last_refresh: None,
            last_error: None,
            next_poll: None,
            dashboard_tx,
        }
    }

    pub fn dashboard(&self) -> watch::Receiver<Dashboard> {
        self.dashboard_tx.subscribe()
    }

    pub fn store_events(&self) -> broadcast::Receiver<StoreEvent> {
        self.store.subscribe()
    }

    pub fn store(&self) -> &EventStore {
        &self.store
    }

    pub fn scheduler(&self) -> &CountdownScheduler {
        &self.scheduler
    }

    pub fn live(&self) -> &LiveStatus {
        &self.live
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Polls the feed once and merges the result. On failure the current
    /// list is left alone.
    pub async fn refresh(&mut self, now: DateTime<Utc>) -> Result<MergeOutcome, FeedError> {
        self.next_poll = chrono::Duration::from_std(self.config.poll_interval)
            .ok()
            .map(|interval| now + interval);

        let result =
            download_and_parse_feed(&self.config.feed_url, self.fetcher.as_ref(), &self.factory)
                .await;
        let snapshot = match result {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("Monitor: refresh failed, keeping {} shows: {}", self.store.len(), e);
                self.last_error = Some(e.to_string());
                self.publish(now);
                return Err(e);
            }
        };

        let (live, upcoming) = snapshot.into_parts();
        if live != self.live {
            info!("Monitor: {}", live);
        }
        self.live = live;

        let outcome = self.store.reconcile(&upcoming, now);
        for (show, _) in &outcome.removed {
            self.scheduler.cancel(show);
        }
        for show in &outcome.added {
            self.scheduler.schedule(show, now);
        }
        debug!(
            "Monitor: +{} -{} shows, {} timers running",
            outcome.added.len(),
            outcome.removed.len(),
            self.scheduler.len()
        );

        self.last_refresh = Some(now);
        self.last_error = None;
        self.publish(now);
        Ok(outcome)
    }

    /// Handles a countdown that came due. Returns true if a notification
    /// was sent.
    pub async fn handle_due(&mut self, show: UpcomingShow, now: DateTime<Utc>) -> bool {
        self.scheduler.complete(&show);
        // The show may have been withdrawn after its timer fired.
        if !self.store.contains(&show) {
            debug!("Monitor: ignoring stale countdown for '{}'", show.title());
            return false;
        }

        let alert = CountdownAlert::new(show.clone(), show.starts_at() - now);
        if let Err(e) = self.notifier.notify(&alert).await {
            error!("Monitor: notification for '{}' failed: {}", show.title(), e);
        }
        self.store.mark_notified(&show, now);
        self.sweep(now);
        true
    }

    /// Drops started and notified shows between polls. Returns how many
    /// were removed. A started show whose countdown has not been handled
    /// yet stays until it is.
    pub fn sweep(&mut self, now: DateTime<Utc>) -> usize {
        let scheduler = &self.scheduler;
        let removed = self.store.sweep_except(now, |show| scheduler.is_scheduled(show));
        for (show, _) in &removed {
            self.scheduler.cancel(show);
        }
        if !removed.is_empty() {
            self.publish(now);
        }
        removed.len()
    }

    /// Waits for the next countdown to come due.
    pub async fn next_due(&mut self) -> Option<UpcomingShow> {
        self.due_rx.recv().await
    }

    pub async fn run(mut self, mut commands: mpsc::UnboundedReceiver<MonitorCommand>) {
        let mut poll = time::interval(self.config.poll_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut sweep = time::interval(SWEEP_INTERVAL);
        sweep.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            "Monitor: polling {} every {:?}, notifying {:?} ahead",
            self.config.feed_url, self.config.poll_interval, self.config.lead
        );

        loop {
            tokio::select! {
                _ = poll.tick() => {
                    let _ = self.refresh(Utc::now()).await;
                }
                Some(show) = self.due_rx.recv() => {
                    self.handle_due(show, Utc::now()).await;
                }
                _ = sweep.tick() => {
                    self.sweep(Utc::now());
                }
                command = commands.recv() => match command {
                    Some(MonitorCommand::RefreshNow) => {
                        let _ = self.refresh(Utc::now()).await;
                        poll.reset();
                    }
                    Some(MonitorCommand::Shutdown) | None => break,
                },
            }
        }

        info!("Monitor: shutting down");
        self.scheduler.shutdown().await;
    }

    fn publish(&self, now: DateTime<Utc>) {
        self.dashboard_tx.send_replace(Dashboard {
            feed_url: self.config.feed_url.clone(),
            live: self.live.clone(),
            shows: self.store.shows().to_vec(),
            last_refresh: self.last_refresh,
            last_error: self.last_error.clone(),
            next_poll: self.next_poll,
            source_bias: self.factory.source_timezone().bias(now),
        });
    }
}

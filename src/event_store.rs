// src/event_store.rs
use crate::show::UpcomingShow;
use chrono::{DateTime, Utc};
use log::debug;
use std::collections::{HashMap, HashSet};
use std::fmt;
use tokio::sync::broadcast;

const EVENT_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalReason {
    /// Start time has passed.
    Started,
    /// The countdown notification went out.
    Notified,
    /// Missing from the latest fetch, including shows that were moved.
    Withdrawn,
}

impl fmt::Display for RemovalReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            RemovalReason::Started => "started",
            RemovalReason::Notified => "notified",
            RemovalReason::Withdrawn => "withdrawn",
        };
        f.write_str(reason)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    Added(UpcomingShow),
    Removed(UpcomingShow, RemovalReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedShow {
    show: UpcomingShow,
    notified_at: Option<DateTime<Utc>>,
}

impl TrackedShow {
    pub fn show(&self) -> &UpcomingShow {
        &self.show
    }

    pub fn notified_at(&self) -> Option<DateTime<Utc>> {
        self.notified_at
    }

    fn removal_reason(&self, now: DateTime<Utc>) -> Option<RemovalReason> {
        if self.notified_at.is_some() {
            Some(RemovalReason::Notified)
        } else if !self.show.is_upcoming(now) {
            Some(RemovalReason::Started)
        } else {
            None
        }
    }
}

/// What one reconcile or sweep changed.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    pub added: Vec<UpcomingShow>,
    pub removed: Vec<(UpcomingShow, RemovalReason)>,
}

impl MergeOutcome {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// The deduplicated list of shows still worth counting down to.
///
/// Every change is broadcast to subscribers as a [`StoreEvent`].
pub struct EventStore {
    shows: Vec<TrackedShow>,
    // Shows already notified, kept until they start so a later poll
    // cannot bring them back.
    notified: HashMap<UpcomingShow, DateTime<Utc>>,
    limit: Option<usize>,
    events_tx: broadcast::Sender<StoreEvent>,
}

impl Default for EventStore {
    fn default() -> Self {
        Self::new()
    }
}

impl EventStore {
    pub fn new() -> Self {
        let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { shows: Vec::new(), notified: HashMap::new(), limit: None, events_tx }
    }

    /// Tracks at most `limit` shows: the earliest upcoming ones of each fetch.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events_tx.subscribe()
    }

    pub fn shows(&self) -> &[TrackedShow] {
        &self.shows
    }

    pub fn len(&self) -> usize {
        self.shows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shows.is_empty()
    }

    pub fn contains(&self, show: &UpcomingShow) -> bool {
        self.shows.iter().any(|tracked| &tracked.show == show)
    }

    pub fn next_show(&self) -> Option<&UpcomingShow> {
        self.shows.first().map(|tracked| &tracked.show)
    }

    /// Merges a freshly fetched list into the store.
    ///
    /// Only fetched shows that start strictly after `now` and were not
    /// notified count as listed, capped to the earliest `limit` of them.
    /// Started, notified and no-longer-listed shows are dropped first, then
    /// listed shows not yet tracked are added.
    pub fn reconcile(&mut self, fetched: &[UpcomingShow], now: DateTime<Utc>) -> MergeOutcome {
        let mut seen: HashSet<&UpcomingShow> = HashSet::new();
        let mut eligible: Vec<&UpcomingShow> = fetched
            .iter()
            .filter(|show| show.is_upcoming(now) && !self.notified.contains_key(*show))
            .filter(|show| seen.insert(*show))
            .collect();
        eligible.sort_by(|a, b| a.schedule_order(b));
        if let Some(limit) = self.limit {
            eligible.truncate(limit);
        }

        let listed: HashSet<&UpcomingShow> = eligible.iter().copied().collect();
        let mut outcome = MergeOutcome {
            removed: self.remove_where(|tracked| {
                tracked.removal_reason(now).or_else(|| {
                    (!listed.contains(&tracked.show)).then_some(RemovalReason::Withdrawn)
                })
            }),
            added: Vec::new(),
        };
        self.forget_started(now);

        for show in eligible {
            if self.contains(show) {
                continue;
            }
            self.shows.push(TrackedShow { show: show.clone(), notified_at: None });
            outcome.added.push(show.clone());
        }
        self.shows.sort_by(|a, b| a.show.schedule_order(&b.show));

        for show in &outcome.added {
            debug!("EventStore: added {}", show);
            let _ = self.events_tx.send(StoreEvent::Added(show.clone()));
        }
        outcome
    }

    /// Drops shows that have started or been notified since the last call.
    pub fn sweep(&mut self, now: DateTime<Utc>) -> Vec<(UpcomingShow, RemovalReason)> {
        self.sweep_except(now, |_| false)
    }

    /// Like [`EventStore::sweep`], but started shows for which `awaiting`
    /// returns true stay tracked.
    pub fn sweep_except<F>(
        &mut self,
        now: DateTime<Utc>,
        awaiting: F,
    ) -> Vec<(UpcomingShow, RemovalReason)>
    where
        F: Fn(&UpcomingShow) -> bool,
    {
        let removed = self.remove_where(|tracked| match tracked.removal_reason(now) {
            Some(RemovalReason::Started) if awaiting(&tracked.show) => None,
            reason => reason,
        });
        self.forget_started(now);
        removed
    }

    /// Sets the "already notified" time on a tracked show. Returns false if
    /// the show is not tracked or was already notified.
    pub fn mark_notified(&mut self, show: &UpcomingShow, now: DateTime<Utc>) -> bool {
        let Some(tracked) = self.shows.iter_mut().find(|tracked| &tracked.show == show) else {
            return false;
        };
        if tracked.notified_at.is_some() {
            return false;
        }
        tracked.notified_at = Some(now);
        self.notified.insert(show.clone(), now);
        true
    }

    fn remove_where<F>(&mut self, mut reason_for: F) -> Vec<(UpcomingShow, RemovalReason)>
    where
        F: FnMut(&TrackedShow) -> Option<RemovalReason>,
    {
        let mut removed = Vec::new();
        self.shows.retain(|tracked| match reason_for(tracked) {
            Some(reason) => {
                removed.push((tracked.show.clone(), reason));
                false
            }
            None => true,
        });
        for (show, reason) in &removed {
            debug!("EventStore: removed {} ({})", show, reason);
            let _ = self.events_tx.send(StoreEvent::Removed(show.clone(), *reason));
        }
        removed
    }

    fn forget_started(&mut self, now: DateTime<Utc>) {
        self.notified.retain(|show, _| show.is_upcoming(now));
    }
}

// src/countdown.rs
use crate::show::UpcomingShow;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use log::{debug, trace};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub const DEFAULT_LEAD: Duration = Duration::from_secs(10);

/// One-shot timers that report a show on the due channel `lead` before it
/// starts.
///
/// A show has at most one timer. Cancelling aborts the task, so a removed
/// show can never fire. Must be used inside a Tokio runtime.
pub struct CountdownScheduler {
    lead: Duration,
    timers: HashMap<UpcomingShow, JoinHandle<()>>,
    due_tx: mpsc::UnboundedSender<UpcomingShow>,
}

impl CountdownScheduler {
    pub fn new(lead: Duration) -> (Self, mpsc::UnboundedReceiver<UpcomingShow>) {
        let (due_tx, due_rx) = mpsc::unbounded_channel();
        (Self { lead, timers: HashMap::new(), due_tx }, due_rx)
    }

    pub fn lead(&self) -> Duration {
        self.lead
    }

    pub fn fire_at(&self, show: &UpcomingShow) -> DateTime<Utc> {
        let lead = chrono::Duration::from_std(self.lead).unwrap_or(chrono::Duration::zero());
        show.starts_at() - lead
    }

    /// Starts the timer for `show`. Does nothing and returns false when the
    /// show already has one.
    pub fn schedule(&mut self, show: &UpcomingShow, now: DateTime<Utc>) -> bool {
        if self.timers.contains_key(show) {
            return false;
        }
        // Already inside the lead window: fire straight away.
        let delay = (self.fire_at(show) - now).to_std().unwrap_or(Duration::ZERO);
        debug!("CountdownScheduler: '{}' fires in {:?}", show.title(), delay);

        let due_tx = self.due_tx.clone();
        let due_show = show.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            trace!("CountdownScheduler: '{}' is due", due_show.title());
            let _ = due_tx.send(due_show);
        });
        self.timers.insert(show.clone(), handle);
        true
    }

    /// Aborts the timer for `show`, if any.
    pub fn cancel(&mut self, show: &UpcomingShow) -> bool {
        match self.timers.remove(show) {
            Some(handle) => {
                handle.abort();
                debug!("CountdownScheduler: cancelled '{}'", show.title());
                true
            }
            None => false,
        }
    }

    /// Forgets the timer of a show whose due message has been handled.
    pub fn complete(&mut self, show: &UpcomingShow) {
        self.timers.remove(show);
    }

    pub fn is_scheduled(&self, show: &UpcomingShow) -> bool {
        self.timers.contains_key(show)
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /// Aborts every timer and waits for the tasks to wind down.
    pub async fn shutdown(mut self) {
        let handles: Vec<JoinHandle<()>> = self.timers.drain().map(|(_, handle)| handle).collect();
        for handle in &handles {
            handle.abort();
        }
        debug!("CountdownScheduler: shutting down {} timers", handles.len());
        join_all(handles).await;
    }
}

impl Drop for CountdownScheduler {
    fn drop(&mut self) {
        for handle in self.timers.values() {
            handle.abort();
        }
    }
}

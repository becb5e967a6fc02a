// src/notifier.rs
use crate::errors::NotifyError;
use crate::show::UpcomingShow;
use async_trait::async_trait;
use log::info;
use std::sync::Mutex;

const APP_NAME: &str = "showwatch";

/// A "starting soon" message for one show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountdownAlert {
    show: UpcomingShow,
    remaining: chrono::Duration,
}

impl CountdownAlert {
    pub fn new(show: UpcomingShow, remaining: chrono::Duration) -> Self {
        Self { show, remaining: remaining.max(chrono::Duration::zero()) }
    }

    pub fn show(&self) -> &UpcomingShow {
        &self.show
    }

    pub fn remaining(&self) -> chrono::Duration {
        self.remaining
    }

    pub fn summary(&self) -> String {
        match self.remaining.num_seconds() {
            0 => format!("{} starting now", self.show.kind()),
            secs => format!("{} starting in {}s", self.show.kind(), secs),
        }
    }

    pub fn body(&self) -> String {
        if self.show.is_premium() {
            format!("{} (premium)", self.show.title())
        } else {
            self.show.title().to_string()
        }
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, alert: &CountdownAlert) -> Result<(), NotifyError>;
}

// ===== Desktop notifications
pub struct DesktopNotifier;

#[async_trait]
impl Notifier for DesktopNotifier {
    async fn notify(&self, alert: &CountdownAlert) -> Result<(), NotifyError> {
        let summary = alert.summary();
        let body = alert.body();
        // Keep the popup up for the rest of the countdown.
        let timeout_ms = alert.remaining().num_milliseconds().clamp(5_000, 60_000) as u32;
        info!("DesktopNotifier: {} - {}", summary, body);

        // notify-rust talks to the platform synchronously.
        tokio::task::spawn_blocking(move || {
            notify_rust::Notification::new()
                .appname(APP_NAME)
                .summary(&summary)
                .body(&body)
                .timeout(notify_rust::Timeout::Milliseconds(timeout_ms))
                .show()
                .map(|_| ())
                .map_err(|e| NotifyError::Desktop(e.to_string()))
        })
        .await?
    }
}

// ===== Log-only notifications
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, alert: &CountdownAlert) -> Result<(), NotifyError> {
        info!("Countdown: {} - {}", alert.summary(), alert.body());
        Ok(())
    }
}

// ===== Recording notifier for testing
#[derive(Default)]
pub struct RecordingNotifier {
    alerts: Mutex<Vec<CountdownAlert>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alerts(&self) -> Vec<CountdownAlert> {
        self.alerts.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, alert: &CountdownAlert) -> Result<(), NotifyError> {
        self.alerts.lock().unwrap_or_else(|e| e.into_inner()).push(alert.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn show(premium: bool) -> UpcomingShow {
        UpcomingShow::new(
            "Unprofessional Fridays".to_string(),
            Utc.with_ymd_and_hms(2026, 10, 23, 19, 0, 0).unwrap(),
            premium,
            "Live Show".to_string(),
            None,
        )
    }

    #[test]
    fn alert_text() {
        let alert = CountdownAlert::new(show(false), chrono::Duration::seconds(10));
        assert_eq!(alert.summary(), "Live Show starting in 10s");
        assert_eq!(alert.body(), "Unprofessional Fridays");

        let premium = CountdownAlert::new(show(true), chrono::Duration::seconds(-3));
        assert_eq!(premium.remaining(), chrono::Duration::zero());
        assert_eq!(premium.summary(), "Live Show starting now");
        assert_eq!(premium.body(), "Unprofessional Fridays (premium)");
    }

    #[test]
    fn zero_remaining_reads_starting_now() {
        let at_start = CountdownAlert::new(show(false), chrono::Duration::zero());
        assert_eq!(at_start.summary(), "Live Show starting now");

        let one_left = CountdownAlert::new(show(false), chrono::Duration::seconds(1));
        assert_eq!(one_left.summary(), "Live Show starting in 1s");
    }

    #[tokio::test]
    async fn recording_notifier_keeps_alerts() {
        let notifier = RecordingNotifier::new();
        let alert = CountdownAlert::new(show(false), chrono::Duration::seconds(5));
        notifier.notify(&alert).await.unwrap();
        LogNotifier.notify(&alert).await.unwrap();
        assert_eq!(notifier.alerts(), vec![alert]);
    }
}

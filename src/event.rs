// src/event.rs

/// Requests the view can make of a running monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorCommand {
    /// Poll the feed now instead of waiting for the next interval.
    RefreshNow,
    Shutdown,
}

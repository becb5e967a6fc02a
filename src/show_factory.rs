// src/show_factory.rs
use crate::errors::FeedError;
use crate::show::{FeedSnapshot, LiveStatus, UpcomingShow};
use crate::timezone::SourceTimezone;
use log::warn;
use serde::Deserialize;

// === WIRE FORMAT ===

#[derive(Debug, Default, Deserialize)]
pub struct RawFeed {
    #[serde(rename = "liveNow", default)]
    pub live_now: Option<RawLiveShow>,
    #[serde(rename = "upcoming", default)]
    pub upcoming: Vec<RawUpcomingShow>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawLiveShow {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawUpcomingShow {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub premium: bool,
}

impl RawFeed {
    pub fn from_json(content: &str) -> Result<Self, FeedError> {
        Ok(serde_json::from_str(content)?)
    }
}

// === FACTORY ===

pub struct ScheduleFactory {
    source_tz: SourceTimezone,
}

impl Default for ScheduleFactory {
    fn default() -> Self {
        Self { source_tz: SourceTimezone::default() }
    }
}

impl ScheduleFactory {
    pub fn new() -> Self {
        Self::default()
    }

    // Builder methods
    pub fn with_source_timezone(mut self, source_tz: SourceTimezone) -> Self {
        self.source_tz = source_tz;
        self
    }

    pub fn source_timezone(&self) -> SourceTimezone {
        self.source_tz
    }

    pub fn create_snapshot(&self, raw: RawFeed) -> FeedSnapshot {
        let live = match raw.live_now {
            Some(live) => LiveStatus::live(non_empty(live.title), non_empty(live.image)),
            None => LiveStatus::offline(),
        };

        let upcoming: Vec<UpcomingShow> =
            raw.upcoming.into_iter().filter_map(|item| self.create_show(item)).collect();

        FeedSnapshot::new(live, upcoming)
    }

    pub fn parse(&self, content: &str) -> Result<FeedSnapshot, FeedError> {
        Ok(self.create_snapshot(RawFeed::from_json(content)?))
    }

    fn create_show(&self, item: RawUpcomingShow) -> Option<UpcomingShow> {
        let Some(title) = non_empty(item.title) else {
            warn!("ScheduleFactory: skipping upcoming entry without a title");
            return None;
        };
        let Some(date) = item.date else {
            warn!("ScheduleFactory: skipping '{}', no date", title);
            return None;
        };
        let starts_at = match self.source_tz.parse(&date) {
            Ok(starts_at) => starts_at,
            Err(e) => {
                warn!("ScheduleFactory: skipping '{}': {}", title, e);
                return None;
            }
        };

        Some(UpcomingShow::new(
            title,
            starts_at,
            item.premium,
            non_empty(item.kind).unwrap_or_else(|| "Show".to_string()),
            non_empty(item.image),
        ))
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

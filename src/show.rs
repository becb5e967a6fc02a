// src/show.rs
use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use url::Url;

// === UPCOMING SHOW ===

/// A scheduled show as published by the feed, with its start time already
/// corrected to UTC.
///
/// Two shows are the same show when all five fields match; a show that moves
/// to a new time is a different show.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UpcomingShow {
    #[serde(rename = "title")]
    title: String,
    #[serde(rename = "starts_at")]
    starts_at: DateTime<Utc>,
    #[serde(rename = "premium")]
    premium: bool,
    #[serde(rename = "type")]
    kind: String,
    #[serde(rename = "image")]
    image: Option<String>,
}

impl UpcomingShow {
    pub fn new(
        title: String,
        starts_at: DateTime<Utc>,
        premium: bool,
        kind: String,
        image: Option<String>,
    ) -> Self {
        Self { title, starts_at, premium, kind, image }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn starts_at(&self) -> DateTime<Utc> {
        self.starts_at
    }

    pub fn starts_at_local(&self) -> DateTime<Local> {
        self.starts_at.with_timezone(&Local)
    }

    pub fn is_premium(&self) -> bool {
        self.premium
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn image(&self) -> Option<&str> {
        self.image.as_deref()
    }

    /// Resolves the image path against the feed URL. Absolute image URLs are
    /// returned unchanged.
    pub fn image_url(&self, base: &Url) -> Option<Url> {
        self.image.as_deref().and_then(|path| base.join(path).ok())
    }

    pub fn is_upcoming(&self, now: DateTime<Utc>) -> bool {
        self.starts_at > now
    }

    /// Earliest start first, ties broken by title.
    pub fn schedule_order(&self, other: &UpcomingShow) -> Ordering {
        self.starts_at.cmp(&other.starts_at).then_with(|| self.title.cmp(&other.title))
    }

    /// Time left until the show starts, zero once it has started.
    pub fn time_until_start(&self, now: DateTime<Utc>) -> chrono::Duration {
        (self.starts_at - now).max(chrono::Duration::zero())
    }
}

impl fmt::Display for UpcomingShow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}{}] at {}",
            self.title,
            self.kind,
            if self.premium { ", premium" } else { "" },
            self.starts_at_local().format("%a %b %e %H:%M")
        )
    }
}

// === LIVE STATUS ===

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveStatus {
    #[serde(rename = "is_live")]
    is_live: bool,
    #[serde(rename = "title")]
    title: Option<String>,
    #[serde(rename = "image")]
    image: Option<String>,
}

impl LiveStatus {
    pub fn offline() -> Self {
        Self::default()
    }

    pub fn live(title: Option<String>, image: Option<String>) -> Self {
        Self { is_live: true, title, image }
    }

    pub fn is_live(&self) -> bool {
        self.is_live
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn image(&self) -> Option<&str> {
        self.image.as_deref()
    }
}

impl fmt::Display for LiveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.is_live, self.title.as_deref()) {
            (true, Some(title)) => write!(f, "LIVE: {}", title),
            (true, None) => write!(f, "LIVE"),
            (false, _) => write!(f, "Not live"),
        }
    }
}

// === SNAPSHOT ===

/// Everything one poll of the feed produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedSnapshot {
    #[serde(rename = "live")]
    live: LiveStatus,
    #[serde(rename = "upcoming")]
    upcoming: Vec<UpcomingShow>,
    #[serde(rename = "fetched_at")]
    fetched_at: DateTime<Utc>,
}

impl FeedSnapshot {
    pub fn new(live: LiveStatus, upcoming: Vec<UpcomingShow>) -> Self {
        Self { live, upcoming, fetched_at: Utc::now() }
    }

    pub fn live(&self) -> &LiveStatus {
        &self.live
    }

    pub fn upcoming(&self) -> &[UpcomingShow] {
        &self.upcoming
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    /// Keeps only the next `limit` shows that start after `now`.
    pub fn keep_next(&mut self, now: DateTime<Utc>, limit: usize) {
        self.upcoming.retain(|show| show.is_upcoming(now));
        self.upcoming.sort_by(UpcomingShow::schedule_order);
        self.upcoming.truncate(limit);
    }

    pub fn into_parts(self) -> (LiveStatus, Vec<UpcomingShow>) {
        (self.live, self.upcoming)
    }
}

impl fmt::Display for FeedSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Status      : {}", self.live)?;
        writeln!(f, "Upcoming    : {}", self.upcoming.len())?;
        for show in &self.upcoming {
            writeln!(f, "  - {}", show)?;
        }
        writeln!(f, "Fetched at  : {}", self.fetched_at.with_timezone(&Local))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn show(title: &str, image: Option<&str>) -> UpcomingShow {
        UpcomingShow::new(
            title.to_string(),
            Utc.with_ymd_and_hms(2026, 10, 21, 18, 0, 0).unwrap(),
            false,
            "Video".to_string(),
            image.map(String::from),
        )
    }

    #[test]
    fn keep_next_skips_started_shows() {
        let at = |title: &str, y: i32| {
            UpcomingShow::new(
                title.to_string(),
                Utc.with_ymd_and_hms(y, 10, 21, 18, 0, 0).unwrap(),
                false,
                "Video".to_string(),
                None,
            )
        };
        let mut snapshot = FeedSnapshot::new(
            LiveStatus::offline(),
            vec![at("Old", 2001), at("Later", 2027), at("Sooner", 2026)],
        );
        snapshot.keep_next(Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(), 1);
        assert_eq!(snapshot.upcoming(), &[at("Sooner", 2026)]);
    }

    #[test]
    fn equality_covers_every_field() {
        let base = show("Quick Look", Some("/a.jpg"));
        assert_eq!(base, show("Quick Look", Some("/a.jpg")));
        assert_ne!(base, show("Quick Look", Some("/b.jpg")));
        assert_ne!(base, show("Quick Look", None));

        let premium = UpcomingShow::new(
            base.title().to_string(),
            base.starts_at(),
            true,
            base.kind().to_string(),
            base.image().map(String::from),
        );
        assert_ne!(base, premium);
    }

    #[test]
    fn image_url_resolves_relative_paths() {
        let base = Url::parse("https://www.example.com/upcoming_json").unwrap();
        let relative = show("Relative", Some("/images/show.png"));
        assert_eq!(
            relative.image_url(&base).unwrap().as_str(),
            "https://www.example.com/images/show.png"
        );

        let absolute = show("Absolute", Some("https://cdn.example.net/x.jpg"));
        assert_eq!(absolute.image_url(&base).unwrap().as_str(), "https://cdn.example.net/x.jpg");
        assert!(show("None", None).image_url(&base).is_none());
    }

    #[test]
    fn time_until_start_never_negative() {
        let s = show("Past", None);
        let after = s.starts_at() + chrono::Duration::minutes(5);
        assert_eq!(s.time_until_start(after), chrono::Duration::zero());
        assert!(!s.is_upcoming(after));
        let before = s.starts_at() - chrono::Duration::seconds(90);
        assert_eq!(s.time_until_start(before).num_seconds(), 90);
        assert!(s.is_upcoming(before));
    }

    #[test]
    fn live_status_display() {
        assert_eq!(LiveStatus::offline().to_string(), "Not live");
        assert_eq!(LiveStatus::live(Some("Bombcast".into()), None).to_string(), "LIVE: Bombcast");
        assert_eq!(LiveStatus::live(None, None).to_string(), "LIVE");
    }
}

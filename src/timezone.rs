// src/timezone.rs
use crate::errors::{ConfigError, TimeParseError};
use chrono::{
    DateTime, Duration, FixedOffset, Local, NaiveDateTime, Offset, TimeZone, Utc,
};
use chrono_tz::Tz;
use log::trace;

/// Zone the upcoming feed publishes its dates in.
pub const DEFAULT_SOURCE_TZ: Tz = chrono_tz::America::Los_Angeles;

// Tried in order. The first one is what the site actually sends.
const NAIVE_FORMATS: &[&str] = &[
    "%b %d, %Y %I:%M %p",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Places offset-less feed timestamps in their source zone and turns them
/// into UTC instants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceTimezone {
    tz: Tz,
}

impl Default for SourceTimezone {
    fn default() -> Self {
        Self { tz: DEFAULT_SOURCE_TZ }
    }
}

impl SourceTimezone {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    pub fn from_name(name: &str) -> Result<Self, ConfigError> {
        name.parse::<Tz>()
            .map(Self::new)
            .map_err(|_| ConfigError::UnknownTimezone(name.to_string()))
    }

    pub fn tz(&self) -> Tz {
        self.tz
    }

    /// UTC offset of the source zone at `at`.
    pub fn offset_at(&self, at: DateTime<Utc>) -> FixedOffset {
        self.tz.offset_from_utc_datetime(&at.naive_utc()).fix()
    }

    /// How far local wall-clock time is ahead of the source zone at `at`.
    pub fn bias(&self, at: DateTime<Utc>) -> Duration {
        let local = Local.offset_from_utc_datetime(&at.naive_utc()).local_minus_utc();
        let source = self.offset_at(at).local_minus_utc();
        Duration::seconds(i64::from(local - source))
    }

    /// Converts a source-zone wall-clock time to UTC.
    ///
    /// Fall-back hours resolve to the earlier instant; times inside a
    /// spring-forward gap move forward by an hour.
    pub fn to_utc(&self, naive: NaiveDateTime) -> Result<DateTime<Utc>, TimeParseError> {
        if let Some(dt) = self.tz.from_local_datetime(&naive).earliest() {
            return Ok(dt.with_timezone(&Utc));
        }
        self.tz
            .from_local_datetime(&(naive + Duration::hours(1)))
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
            .ok_or_else(|| TimeParseError::Unrepresentable {
                time: naive.to_string(),
                zone: self.tz.name().to_string(),
            })
    }

    /// Parses a feed date string. Strings carrying their own offset are
    /// trusted as-is; everything else is read as source-zone local time.
    pub fn parse(&self, raw: &str) -> Result<DateTime<Utc>, TimeParseError> {
        let raw = raw.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Ok(dt.with_timezone(&Utc));
        }
        let naive = NAIVE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
            .ok_or_else(|| TimeParseError::UnrecognisedFormat(raw.to_string()))?;
        let utc = self.to_utc(naive)?;
        trace!("SourceTimezone: '{}' in {} -> {}", raw, self.tz.name(), utc);
        Ok(utc)
    }
}

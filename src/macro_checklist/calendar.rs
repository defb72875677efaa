// =============================================================================
// Economic Calendar — ForexFactory weekly feed with a local file cache
// =============================================================================
//
// The weekly JSON is cached on disk and reused while the file is younger than
// the TTL, which keeps us clear of the feed's rate limit when the checklist is
// run several times in a row.
//
// Event times come in two shapes:
//   - RFC 3339:  "2025-01-08T08:30:00-05:00"
//   - legacy:    date "01-08-2025" + time "8:30am" | "All Day" | "Tentative"
// Legacy times are interpreted in the configured local offset; untimed events
// are pinned to 12:00 local so they still fall inside a day window.
// =============================================================================

use std::path::{Path, PathBuf};
use std::time::{Duration as StdDuration, SystemTime};

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, instrument, trace, warn};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One row of the weekly calendar feed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub impact: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub time: String,
}

/// A relevant event with its resolved local time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpcomingEvent {
    pub event: CalendarEvent,
    pub local_time: DateTime<FixedOffset>,
}

/// Which events count as "high impact" for the session.
#[derive(Debug, Clone)]
pub struct CalendarFilter {
    pub countries: Vec<String>,
    pub impact_levels: Vec<String>,
    pub lookahead: Duration,
}

impl CalendarFilter {
    fn accepts(&self, event: &CalendarEvent) -> bool {
        self.countries.iter().any(|c| c == event.country.trim())
            && self.impact_levels.iter().any(|i| i == event.impact.trim())
    }
}

// ---------------------------------------------------------------------------
// Parsing and filtering
// ---------------------------------------------------------------------------

/// Parse "8:30am" / "12:05pm" into a wall-clock time.
fn parse_clock(time: &str) -> Option<NaiveTime> {
    let t: String = time.trim().to_lowercase().split_whitespace().collect();
    let (body, pm) = if let Some(b) = t.strip_suffix("pm") {
        (b, true)
    } else if let Some(b) = t.strip_suffix("am") {
        (b, false)
    } else {
        return None;
    };

    let (h, m) = body.split_once(':')?;
    if h.is_empty() || h.len() > 2 || m.len() != 2 {
        return None;
    }
    let mut hour: u32 = h.parse().ok()?;
    let minute: u32 = m.parse().ok()?;
    if hour == 0 || hour > 12 {
        return None;
    }

    if pm && hour != 12 {
        hour += 12;
    }
    if !pm && hour == 12 {
        hour = 0;
    }
    NaiveTime::from_hms_opt(hour, minute, 0)
}

/// Resolve an event's date/time strings to a local datetime.
pub fn parse_event_datetime(
    date: &str,
    time: &str,
    tz: FixedOffset,
) -> Option<DateTime<FixedOffset>> {
    let date = date.trim();
    if date.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(date) {
        return Some(dt.with_timezone(&tz));
    }

    let day = NaiveDate::parse_from_str(date, "%m-%d-%Y").ok()?;
    let time = time.trim();
    let clock = if time.is_empty()
        || time.eq_ignore_ascii_case("all day")
        || time.eq_ignore_ascii_case("tentative")
    {
        NaiveTime::from_hms_opt(12, 0, 0)?
    } else {
        parse_clock(time)?
    };

    tz.from_local_datetime(&day.and_time(clock)).single()
}

/// Lookahead window for a user-supplied hour count.
pub fn lookahead_from_hours(hours: i64) -> Result<Duration> {
    if hours < 0 {
        anyhow::bail!("lookahead must not be negative (got {hours}h)");
    }
    Duration::try_hours(hours).with_context(|| format!("lookahead of {hours}h is out of range"))
}

/// Events matching `filter` that start within `[now, now + lookahead]`.
pub fn high_impact_events(
    events: &[CalendarEvent],
    now: DateTime<FixedOffset>,
    filter: &CalendarFilter,
) -> Vec<UpcomingEvent> {
    // Past the representable range the window is open-ended.
    let end = now.checked_add_signed(filter.lookahead);
    let tz = *now.offset();

    events
        .iter()
        .filter(|ev| filter.accepts(ev))
        .filter_map(|ev| {
            let Some(local_time) = parse_event_datetime(&ev.date, &ev.time, tz) else {
                trace!(title = %ev.title, date = %ev.date, time = %ev.time, "unparseable event time");
                return None;
            };
            let in_window = now <= local_time && end.map_or(true, |end| local_time <= end);
            in_window.then(|| UpcomingEvent {
                event: ev.clone(),
                local_time,
            })
        })
        .collect()
}

/// Decode the feed body. Anything other than an array yields no events;
/// malformed rows are skipped.
pub fn parse_feed(body: &Value) -> Vec<CalendarEvent> {
    let Some(rows) = body.as_array() else {
        warn!("calendar feed is not an array, ignoring");
        return Vec::new();
    };

    rows.iter()
        .filter_map(|row| match serde_json::from_value::<CalendarEvent>(row.clone()) {
            Ok(ev) => Some(ev),
            Err(e) => {
                trace!(error = %e, "skipping malformed calendar row");
                None
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Cache
// ---------------------------------------------------------------------------

/// True when `path` exists and was modified no longer than `ttl` ago.
pub fn cache_is_fresh(path: &Path, ttl: StdDuration) -> bool {
    let Ok(modified) = std::fs::metadata(path).and_then(|m| m.modified()) else {
        return false;
    };
    match SystemTime::now().duration_since(modified) {
        Ok(age) => age <= ttl,
        // Modified in the future (clock skew): treat as fresh.
        Err(_) => true,
    }
}

/// Events from a fresh cache file. `None` when the cache is stale, missing
/// or unreadable, so the caller goes to the network instead.
pub fn cached_events(path: &Path, ttl: StdDuration) -> Option<Vec<CalendarEvent>> {
    if !cache_is_fresh(path, ttl) {
        return None;
    }
    let body = std::fs::read_to_string(path)
        .context("failed to read calendar cache")
        .and_then(|content| {
            serde_json::from_str::<Value>(&content).context("failed to parse calendar cache")
        });
    match body {
        Ok(body) => Some(parse_feed(&body)),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "ignoring corrupt calendar cache");
            None
        }
    }
}

fn write_cache(path: &Path, body: &Value) -> Result<()> {
    let content = serde_json::to_string(body).context("failed to serialise calendar cache")?;
    let tmp_path = path.with_extension("json.tmp");

    std::fs::write(&tmp_path, content)
        .with_context(|| format!("failed to write calendar cache to {}", tmp_path.display()))?;
    std::fs::rename(&tmp_path, path)
        .with_context(|| format!("failed to rename calendar cache to {}", path.display()))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Fetches the weekly calendar, going through the on-disk cache.
pub struct CalendarClient {
    url: String,
    cache_path: PathBuf,
    cache_ttl: StdDuration,
    client: reqwest::Client,
}

impl CalendarClient {
    pub fn new(url: impl Into<String>, cache_path: impl Into<PathBuf>, ttl_minutes: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(20))
            .build()
            .context("failed to build reqwest client")?;

        Ok(Self {
            url: url.into(),
            cache_path: cache_path.into(),
            cache_ttl: StdDuration::from_secs(ttl_minutes.saturating_mul(60)),
            client,
        })
    }

    /// All events of the current week.
    #[instrument(skip(self), name = "calendar::fetch_events")]
    pub async fn fetch_events(&self) -> Result<Vec<CalendarEvent>> {
        if let Some(events) = cached_events(&self.cache_path, self.cache_ttl) {
            debug!(path = %self.cache_path.display(), "calendar served from cache");
            return Ok(events);
        }

        let resp = self
            .client
            .get(&self.url)
            .send()
            .await
            .context("GET calendar feed request failed")?;

        let status = resp.status();
        if !status.is_success() {
            anyhow::bail!("calendar feed returned {}", status);
        }

        let body: Value = resp
            .json()
            .await
            .context("failed to parse calendar feed")?;

        if let Err(e) = write_cache(&self.cache_path, &body) {
            warn!(error = %e, "could not refresh calendar cache");
        }

        let events = parse_feed(&body);
        info!(count = events.len(), "calendar feed downloaded");
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn bogota() -> FixedOffset {
        FixedOffset::west_opt(5 * 3600).unwrap()
    }

    fn usd_high(hours: i64) -> CalendarFilter {
        CalendarFilter {
            countries: vec!["USD".to_string()],
            impact_levels: vec!["High".to_string()],
            lookahead: Duration::hours(hours),
        }
    }

    fn event(country: &str, impact: &str, date: &str, time: &str) -> CalendarEvent {
        CalendarEvent {
            title: format!("{country} {impact}"),
            country: country.to_string(),
            impact: impact.to_string(),
            date: date.to_string(),
            time: time.to_string(),
        }
    }

    #[test]
    fn parse_clock_handles_noon_and_midnight() {
        assert_eq!(parse_clock("8:30am"), NaiveTime::from_hms_opt(8, 30, 0));
        assert_eq!(parse_clock("12:00pm"), NaiveTime::from_hms_opt(12, 0, 0));
        assert_eq!(parse_clock("12:15am"), NaiveTime::from_hms_opt(0, 15, 0));
        assert_eq!(parse_clock("2:00 PM"), NaiveTime::from_hms_opt(14, 0, 0));
        assert!(parse_clock("14:00").is_none());
        assert!(parse_clock("13:00pm").is_none());
    }

    #[test]
    fn legacy_date_formats() {
        let tz = bogota();
        let dt = parse_event_datetime("01-08-2025", "8:30am", tz).unwrap();
        assert_eq!(dt.to_rfc3339(), "2025-01-08T08:30:00-05:00");

        let all_day = parse_event_datetime("01-08-2025", "All Day", tz).unwrap();
        assert_eq!(all_day.to_rfc3339(), "2025-01-08T12:00:00-05:00");

        let tentative = parse_event_datetime("01-08-2025", "Tentative", tz).unwrap();
        assert_eq!(tentative, all_day);

        assert!(parse_event_datetime("", "8:30am", tz).is_none());
        assert!(parse_event_datetime("2025/01/08", "8:30am", tz).is_none());
        assert!(parse_event_datetime("01-08-2025", "soon", tz).is_none());
    }

    #[test]
    fn rfc3339_dates_are_converted_to_local() {
        let dt = parse_event_datetime("2025-01-08T08:30:00-05:00", "", FixedOffset::east_opt(0).unwrap())
            .unwrap();
        assert_eq!(dt.to_rfc3339(), "2025-01-08T13:30:00+00:00");
    }

    #[test]
    fn filter_by_country_impact_and_window() {
        let tz = bogota();
        let now = tz.with_ymd_and_hms(2025, 1, 8, 7, 0, 0).unwrap();
        let events = vec![
            event("USD", "High", "01-08-2025", "8:30am"),
            event("USD", "Medium", "01-08-2025", "9:00am"),
            event("EUR", "High", "01-08-2025", "9:00am"),
            event("USD", "High", "01-08-2025", "6:00am"),
            event("USD", "High", "01-10-2025", "8:30am"),
            event("USD", "High", "2025-01-09T06:00:00-05:00", ""),
        ];

        let found = high_impact_events(&events, now, &usd_high(24));
        let times: Vec<String> = found.iter().map(|u| u.local_time.to_rfc3339()).collect();
        assert_eq!(
            times,
            vec!["2025-01-08T08:30:00-05:00", "2025-01-09T06:00:00-05:00"]
        );
    }

    #[test]
    fn window_edges_are_inclusive() {
        let tz = bogota();
        let now = tz.with_ymd_and_hms(2025, 1, 8, 8, 30, 0).unwrap();
        let events = vec![
            event("USD", "High", "01-08-2025", "8:30am"),
            event("USD", "High", "01-08-2025", "9:30am"),
        ];
        assert_eq!(high_impact_events(&events, now, &usd_high(1)).len(), 2);
    }

    #[test]
    fn lookahead_past_calendar_range_is_open_ended() {
        let tz = bogota();
        let now = tz.with_ymd_and_hms(2025, 1, 8, 7, 0, 0).unwrap();
        let events = vec![
            event("USD", "High", "01-08-2025", "8:30am"),
            event("USD", "High", "01-08-2025", "6:00am"),
        ];
        let filter = CalendarFilter {
            lookahead: Duration::hours(10_000_000_000),
            ..usd_high(0)
        };

        let found = high_impact_events(&events, now, &filter);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].local_time.to_rfc3339(), "2025-01-08T08:30:00-05:00");
    }

    #[test]
    fn lookahead_hours_are_validated() {
        assert_eq!(lookahead_from_hours(24).unwrap(), Duration::hours(24));
        assert_eq!(lookahead_from_hours(0).unwrap(), Duration::zero());
        assert!(lookahead_from_hours(-1).is_err());
        assert!(lookahead_from_hours(i64::MAX).is_err());
    }

    #[test]
    fn parse_feed_skips_bad_rows() {
        let body = json!([
            { "title": "CPI m/m", "country": "USD", "impact": "High", "date": "01-08-2025", "time": "8:30am" },
            { "title": 42 },
            { "country": "USD" }
        ]);
        let events = parse_feed(&body);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].title, "CPI m/m");
        assert_eq!(events[1].impact, "");

        assert!(parse_feed(&json!({ "error": "rate limited" })).is_empty());
    }

    #[test]
    fn missing_cache_is_stale() {
        let path = std::env::temp_dir().join("impulse-journal-no-such-cache.json");
        let _ = std::fs::remove_file(&path);
        assert!(!cache_is_fresh(&path, StdDuration::from_secs(900)));
    }

    #[test]
    fn written_cache_is_fresh_and_round_trips() {
        let path = std::env::temp_dir().join(format!(
            "impulse-journal-cache-{}.json",
            std::process::id()
        ));
        let body = json!([{ "title": "FOMC", "country": "USD", "impact": "High" }]);
        write_cache(&path, &body).unwrap();

        assert!(cache_is_fresh(&path, StdDuration::from_secs(900)));
        let cached = cached_events(&path, StdDuration::from_secs(900)).unwrap();
        assert_eq!(cached[0].title, "FOMC");

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn huge_cache_ttl_saturates() {
        let client = CalendarClient::new("http://localhost/ff.json", "cache.json", u64::MAX).unwrap();
        assert_eq!(client.cache_ttl, StdDuration::from_secs(u64::MAX));
    }

    #[test]
    fn corrupt_fresh_cache_is_not_served() {
        let path = std::env::temp_dir().join(format!(
            "impulse-journal-corrupt-cache-{}.json",
            std::process::id()
        ));
        std::fs::write(&path, "[{\"title\": \"FOMC\"").unwrap();

        assert!(cache_is_fresh(&path, StdDuration::from_secs(900)));
        assert!(cached_events(&path, StdDuration::from_secs(900)).is_none());

        std::fs::remove_file(&path).unwrap();
    }
}

//! # Google Calendar Source
//!
//! Lists today's events of one calendar through the Calendar v3 API. The mapper
//! keeps events provider-neutral; the next event and the agenda (with its `done`
//! flags) are derived from those records at aggregation time, so cached events
//! still produce an up-to-date agenda.

#[cfg(feature = "sources")]
use async_trait::async_trait;
#[cfg(feature = "sources")]
use chrono::{Duration, Local};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::Deserialize;

#[cfg(feature = "sources")]
use crate::error::SourceError;
use crate::model::{AgendaItem, NextEvent};
#[cfg(feature = "sources")]
use crate::retrieve::ApiClient;
#[cfg(feature = "sources")]
use crate::sources::SourceClient;

/// `start` / `end` object of a Calendar event.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleEventTime {
    pub date_time: Option<DateTime<chrono::FixedOffset>>,
    pub date: Option<NaiveDate>,
}

/// One event item.
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleEvent {
    pub summary: Option<String>,
    pub location: Option<String>,
    pub status: Option<String>,
    pub start: Option<GoogleEventTime>,
    pub end: Option<GoogleEventTime>,
}

/// Raw events list response.
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleEventsResponse {
    #[serde(default)]
    pub items: Vec<GoogleEvent>,
}

/// Normalized calendar entry.
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarEvent {
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
    pub all_day: bool,
    pub location: Option<String>,
}

/// Client for one calendar, authenticated with an API key.
#[cfg(feature = "sources")]
pub struct GoogleCalendarClient {
    api: ApiClient,
    calendar_id: String,
    api_key: String,
}

#[cfg(feature = "sources")]
impl GoogleCalendarClient {
    pub fn new(api: ApiClient, calendar_id: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            api,
            calendar_id: calendar_id.into(),
            api_key: api_key.into(),
        }
    }
}

#[cfg(feature = "sources")]
#[async_trait]
impl SourceClient for GoogleCalendarClient {
    type Raw = GoogleEventsResponse;
    type Record = Vec<CalendarEvent>;

    fn name(&self) -> &'static str {
        "calendar"
    }

    async fn fetch_raw(&self) -> Result<GoogleEventsResponse, SourceError> {
        let (time_min, time_max) = today_window(Local::now());
        let path = format!("calendar/v3/calendars/{}/events", self.calendar_id);
        let query = [
            ("key", self.api_key.clone()),
            ("timeMin", time_min.to_rfc3339()),
            ("timeMax", time_max.to_rfc3339()),
            ("singleEvents", "true".to_string()),
            ("orderBy", "startTime".to_string()),
        ];
        self.api.get_json(&path, &query).await
    }

    fn parse(&self, raw: GoogleEventsResponse) -> Result<Vec<CalendarEvent>, SourceError> {
        Ok(map_events(raw))
    }
}

/// Local midnight to the next local midnight, in UTC.
#[cfg(feature = "sources")]
fn today_window(now: DateTime<Local>) -> (DateTime<Utc>, DateTime<Utc>) {
    let midnight = now
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .and_then(|naive| Local.from_local_datetime(&naive).earliest())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| now.with_timezone(&Utc));
    (midnight, midnight + Duration::days(1))
}

fn resolve_time(t: &GoogleEventTime) -> Option<(DateTime<Utc>, bool)> {
    if let Some(dt) = t.date_time {
        return Some((dt.with_timezone(&Utc), false));
    }
    t.date
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| (Utc.from_utc_datetime(&naive), true))
}

/// Pure mapper: drops cancelled and undated items, sorts by start.
pub fn map_events(raw: GoogleEventsResponse) -> Vec<CalendarEvent> {
    let mut events: Vec<CalendarEvent> = raw
        .items
        .into_iter()
        .filter(|item| item.status.as_deref() != Some("cancelled"))
        .filter_map(|item| {
            let (start, all_day) = item.start.as_ref().and_then(resolve_time)?;
            let end = item.end.as_ref().and_then(resolve_time).map(|(e, _)| e);
            Some(CalendarEvent {
                title: item.summary.unwrap_or_else(|| "(untitled)".to_string()),
                start,
                end,
                all_day,
                location: item.location,
            })
        })
        .collect();
    events.sort_by_key(|e| e.start);
    events
}

/// First timed event starting after `now`.
pub fn next_event(events: &[CalendarEvent], now: DateTime<Utc>) -> Option<NextEvent> {
    events
        .iter()
        .filter(|e| !e.all_day && e.start > now)
        .min_by_key(|e| e.start)
        .map(|e| NextEvent {
            title: e.title.clone(),
            time: e.start.to_rfc3339(),
            minutes_until: (e.start - now).num_minutes(),
            location: e.location.clone(),
        })
}

/// Today's agenda in start order; an item is done once it has ended.
pub fn agenda(events: &[CalendarEvent], now: DateTime<Utc>) -> Vec<AgendaItem> {
    events
        .iter()
        .map(|e| AgendaItem {
            title: e.title.clone(),
            start: e.start.to_rfc3339(),
            end: e.end.map(|end| end.to_rfc3339()),
            all_day: e.all_day,
            done: match e.end {
                Some(end) => end <= now,
                None => !e.all_day && e.start <= now,
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"{
        "kind": "calendar#events",
        "items": [
            {
                "summary": "Design review",
                "location": "Room 2",
                "status": "confirmed",
                "start": { "dateTime": "2026-10-18T14:00:00+03:00" },
                "end": { "dateTime": "2026-10-18T15:00:00+03:00" }
            },
            {
                "summary": "Standup",
                "status": "confirmed",
                "start": { "dateTime": "2026-10-18T09:00:00Z" },
                "end": { "dateTime": "2026-10-18T09:15:00Z" }
            },
            {
                "summary": "Cancelled sync",
                "status": "cancelled",
                "start": { "dateTime": "2026-10-18T10:00:00Z" }
            },
            {
                "summary": "Name day",
                "start": { "date": "2026-10-18" },
                "end": { "date": "2026-10-19" }
            },
            { "summary": "No start" }
        ]
    }"#;

    fn events() -> Vec<CalendarEvent> {
        map_events(serde_json::from_str(FIXTURE).unwrap())
    }

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_map_events_sorted_and_filtered() {
        let titles: Vec<_> = events().into_iter().map(|e| e.title).collect();
        assert_eq!(titles, vec!["Name day", "Standup", "Design review"]);
    }

    #[test]
    fn test_next_event_skips_past_and_all_day() {
        let next = next_event(&events(), at("2026-10-18T10:30:00Z")).unwrap();
        assert_eq!(next.title, "Design review");
        // 14:00+03:00 is 11:00Z.
        assert_eq!(next.minutes_until, 30);
        assert_eq!(next.location.as_deref(), Some("Room 2"));

        assert!(next_event(&events(), at("2026-10-18T20:00:00Z")).is_none());
    }

    #[test]
    fn test_agenda_done_flags() {
        let items = agenda(&events(), at("2026-10-18T10:30:00Z"));
        let flags: Vec<_> = items.iter().map(|a| (a.title.as_str(), a.done)).collect();
        assert_eq!(
            flags,
            vec![("Name day", false), ("Standup", true), ("Design review", false)]
        );
        assert!(items[0].all_day);
    }
}

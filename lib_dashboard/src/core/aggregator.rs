//! # Snapshot Aggregator
//!
//! Collects every source concurrently and assembles one [`Snapshot`].
//!
//! A failing source never fails the aggregation. Each one degrades to a
//! documented fallback instead:
//! - weather: the last reading if any, else [`WeatherReading::unavailable`];
//! - calendar, tasks, local events: the last list if any, else empty;
//! - next event: `null` when there is no calendar data.

use chrono::{Local, Timelike, Utc};

use crate::cache::{CacheOutcome, SourceCache};
use crate::model::{LocalEvent, Snapshot, TaskItem, WeatherReading};
use crate::sources::assistant;
use crate::sources::calendar::{self, CalendarEvent};
use crate::views::{filter, filter_raw, FilterResult, FilteredSnapshot, ViewId};

/// Owns the per-source caches and merges their outcomes.
pub struct SnapshotAggregator {
    weather: SourceCache<WeatherReading>,
    calendar: SourceCache<Vec<CalendarEvent>>,
    tasks: SourceCache<Vec<TaskItem>>,
    local_events: SourceCache<Vec<LocalEvent>>,
    location: String,
}

impl SnapshotAggregator {
    /// `location` labels the static weather fallback.
    pub fn new(
        weather: SourceCache<WeatherReading>,
        calendar: SourceCache<Vec<CalendarEvent>>,
        tasks: SourceCache<Vec<TaskItem>>,
        local_events: SourceCache<Vec<LocalEvent>>,
        location: impl Into<String>,
    ) -> Self {
        Self {
            weather,
            calendar,
            tasks,
            local_events,
            location: location.into(),
        }
    }

    /// Builds the full, unfiltered snapshot tagged with `view`.
    pub async fn build_snapshot(&self, view: ViewId) -> Snapshot {
        let (weather, events, todos, local_events) = tokio::join!(
            self.weather.get(),
            self.calendar.get(),
            self.tasks.get(),
            self.local_events.get(),
        );

        let weather = settle(self.weather.name(), weather)
            .unwrap_or_else(|| WeatherReading::unavailable(self.location.as_str()));
        let events = settle(self.calendar.name(), events).unwrap_or_default();
        let todos = settle(self.tasks.name(), todos).unwrap_or_default();
        let local_events = settle(self.local_events.name(), local_events).unwrap_or_default();

        let now = Utc::now();
        let next_event = calendar::next_event(&events, now);
        let agenda = calendar::agenda(&events, now);
        let assistant = assistant::compose(Local::now().hour(), &weather, next_event.as_ref(), &todos);

        Snapshot {
            view,
            weather,
            next_event,
            todos,
            agenda,
            local_events,
            assistant,
            generated_at: now,
        }
    }

    /// Builds the snapshot and shapes it for `view`.
    pub async fn aggregate(&self, view: ViewId) -> FilteredSnapshot {
        let snapshot = self.build_snapshot(view).await;
        filter(view, snapshot)
    }

    /// Like `aggregate`, for a view name that has not been validated.
    pub async fn aggregate_raw(&self, raw: &str) -> FilterResult {
        let view = raw.parse::<ViewId>().unwrap_or_default();
        filter_raw(raw, self.build_snapshot(view).await)
    }
}

/// Logs a degraded outcome and extracts whatever value survived.
fn settle<T>(source: &str, outcome: CacheOutcome<T>) -> Option<T> {
    match &outcome {
        CacheOutcome::Stale { error, .. } => {
            log::warn!("[{}] serving stale data: {}", source, error);
        }
        CacheOutcome::Unavailable(error) => {
            log::warn!("[{}] unavailable, using fallback: {}", source, error);
        }
        CacheOutcome::Hit(_) | CacheOutcome::Fetched(_) => {}
    }
    outcome.into_value()
}

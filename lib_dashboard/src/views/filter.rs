//! # View Filter
//!
//! Pure reshaping of a full [`Snapshot`] into the shape a view shows. The only
//! non-deterministic part is the quotation draw of the guest and art views.

use rand::Rng;
use serde::Serialize;

use crate::model::{AgendaItem, LocalEvent, Quote, Snapshot, WeatherReading};
use crate::views::quotes::draw_quote;
use crate::views::ViewId;

/// Number of pending agenda items shown in the briefing.
pub const BRIEFING_AGENDA_LIMIT: usize = 3;

/// Local event categories kept by the art view.
pub const ART_CATEGORIES: [&str; 2] = ["art", "music"];

/// Guest view: weather, local events and a quotation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestView {
    pub view: ViewId,
    pub weather: WeatherReading,
    pub local_events: Vec<LocalEvent>,
    pub guest_quote: Quote,
}

/// Temperature and condition only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BriefWeather {
    pub temperature: Option<f64>,
    pub condition: String,
}

/// Next event reduced to what the briefing shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BriefEvent {
    pub title: String,
    pub time: String,
    pub minutes_until: i64,
}

/// Counts and the first pending agenda items.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BriefingSummary {
    pub next_event: Option<BriefEvent>,
    pub todo_count: usize,
    pub urgent_todo_count: usize,
    pub agenda_count: usize,
    pub upcoming_agenda: Vec<AgendaItem>,
}

/// Briefing view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BriefingView {
    pub view: ViewId,
    pub weather: BriefWeather,
    pub summary: BriefingSummary,
}

/// Weather view.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherView {
    pub view: ViewId,
    pub weather: WeatherReading,
    pub local_events: Vec<LocalEvent>,
}

/// Art view: only art and music events survive.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtView {
    pub view: ViewId,
    pub weather: WeatherReading,
    pub quote: Quote,
    pub local_events: Vec<LocalEvent>,
}

/// Output of the filter, serialized flat as the `dashboard:update` payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FilteredSnapshot {
    Personal(Snapshot),
    Guest(GuestView),
    Briefing(BriefingView),
    Weather(WeatherView),
    Art(ArtView),
}

impl FilteredSnapshot {
    /// The view this output was shaped for.
    pub fn view(&self) -> ViewId {
        match self {
            FilteredSnapshot::Personal(s) => s.view,
            FilteredSnapshot::Guest(g) => g.view,
            FilteredSnapshot::Briefing(b) => b.view,
            FilteredSnapshot::Weather(w) => w.view,
            FilteredSnapshot::Art(a) => a.view,
        }
    }
}

/// Filter output for a raw (unvalidated) view name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterResult {
    pub snapshot: FilteredSnapshot,
    /// Present when the requested view was unknown and `personal` was used instead.
    pub warning: Option<String>,
}

/// Filters with the thread-local RNG.
pub fn filter(view: ViewId, snapshot: Snapshot) -> FilteredSnapshot {
    filter_with(view, snapshot, &mut rand::rng())
}

/// Filters a snapshot for a view name that has not been validated.
///
/// Unknown names get the `personal` shape and a warning, never an error.
pub fn filter_raw(view: &str, snapshot: Snapshot) -> FilterResult {
    let (view, warning) = ViewId::parse_or_default(view);
    FilterResult {
        snapshot: filter(view, snapshot),
        warning,
    }
}

/// Filters with a caller supplied RNG.
pub fn filter_with<R: Rng>(view: ViewId, snapshot: Snapshot, rng: &mut R) -> FilteredSnapshot {
    match view {
        ViewId::Personal => FilteredSnapshot::Personal(snapshot),
        ViewId::Guest => FilteredSnapshot::Guest(GuestView {
            view,
            weather: snapshot.weather,
            local_events: snapshot.local_events,
            guest_quote: draw_quote(rng),
        }),
        ViewId::Briefing => FilteredSnapshot::Briefing(briefing(snapshot)),
        ViewId::Weather => FilteredSnapshot::Weather(WeatherView {
            view,
            weather: snapshot.weather,
            local_events: snapshot.local_events,
        }),
        ViewId::Art => FilteredSnapshot::Art(ArtView {
            view,
            weather: snapshot.weather,
            quote: draw_quote(rng),
            local_events: snapshot
                .local_events
                .into_iter()
                .filter(|e| is_art_category(&e.category))
                .collect(),
        }),
    }
}

// Categories arrive normalized from the local events mapper.
fn is_art_category(category: &str) -> bool {
    ART_CATEGORIES.contains(&category)
}

fn briefing(snapshot: Snapshot) -> BriefingView {
    let urgent_todo_count = snapshot.todos.iter().filter(|t| t.urgent).count();
    let upcoming_agenda = snapshot
        .agenda
        .iter()
        .filter(|a| !a.done)
        .take(BRIEFING_AGENDA_LIMIT)
        .cloned()
        .collect();

    BriefingView {
        view: ViewId::Briefing,
        weather: BriefWeather {
            temperature: snapshot.weather.temperature,
            condition: snapshot.weather.condition,
        },
        summary: BriefingSummary {
            next_event: snapshot.next_event.map(|e| BriefEvent {
                title: e.title,
                time: e.time,
                minutes_until: e.minutes_until,
            }),
            todo_count: snapshot.todos.len(),
            urgent_todo_count,
            agenda_count: snapshot.agenda.len(),
            upcoming_agenda,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AssistantMessage, NextEvent, TaskItem};
    use crate::views::quotes::QUOTES;
    use chrono::{TimeZone, Utc};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn event(title: &str, category: &str) -> LocalEvent {
        LocalEvent {
            title: title.to_string(),
            date: "2026-10-18".to_string(),
            venue: None,
            category: category.to_string(),
            url: None,
        }
    }

    fn agenda_item(title: &str, done: bool) -> AgendaItem {
        AgendaItem {
            title: title.to_string(),
            start: "2026-10-18T09:00:00Z".to_string(),
            end: None,
            all_day: false,
            done,
        }
    }

    fn task(id: &str, urgent: bool) -> TaskItem {
        TaskItem {
            id: id.to_string(),
            content: format!("task {}", id),
            priority: if urgent { 4 } else { 1 },
            due: None,
            urgent,
        }
    }

    fn sample_snapshot() -> Snapshot {
        Snapshot {
            view: ViewId::Personal,
            weather: WeatherReading {
                location: "Athens".to_string(),
                temperature: Some(21.5),
                apparent_temperature: Some(20.0),
                humidity: Some(55.0),
                wind_speed: Some(12.0),
                condition: "Clear".to_string(),
                icon: "clear-day".to_string(),
                observed_at: None,
            },
            next_event: Some(NextEvent {
                title: "Standup".to_string(),
                time: "2026-10-18T10:00:00Z".to_string(),
                minutes_until: 25,
                location: Some("Room 4".to_string()),
            }),
            todos: vec![task("1", true), task("2", false), task("3", true)],
            agenda: vec![
                agenda_item("a", true),
                agenda_item("b", false),
                agenda_item("c", false),
                agenda_item("d", true),
                agenda_item("e", false),
                agenda_item("f", false),
            ],
            local_events: vec![
                event("Gallery night", "art"),
                event("Derby", "sports"),
                event("Jazz trio", "music"),
                event("Farmers market", "food"),
                event("Sculpture walk", "art"),
            ],
            assistant: AssistantMessage {
                greeting: "Good morning".to_string(),
                message: "2 urgent tasks".to_string(),
            },
            generated_at: Utc.with_ymd_and_hms(2026, 10, 18, 9, 35, 0).unwrap(),
        }
    }

    #[test]
    fn test_personal_is_identity() {
        let snapshot = sample_snapshot();
        let out = filter(ViewId::Personal, snapshot.clone());
        assert_eq!(out, FilteredSnapshot::Personal(snapshot));
    }

    #[test]
    fn test_deterministic_apart_from_quote() {
        let snapshot = sample_snapshot();
        for view in [ViewId::Personal, ViewId::Briefing, ViewId::Weather] {
            assert_eq!(filter(view, snapshot.clone()), filter(view, snapshot.clone()));
        }
        // Same seed, same draw.
        let a = filter_with(ViewId::Guest, snapshot.clone(), &mut StdRng::seed_from_u64(7));
        let b = filter_with(ViewId::Guest, snapshot, &mut StdRng::seed_from_u64(7));
        assert_eq!(a, b);
    }

    #[test]
    fn test_guest_shape() {
        let json = serde_json::to_value(filter(ViewId::Guest, sample_snapshot())).unwrap();
        let obj = json.as_object().unwrap();
        let mut keys: Vec<_> = obj.keys().map(String::as_str).collect();
        keys.sort();
        assert_eq!(keys, vec!["guestQuote", "localEvents", "view", "weather"]);
        let text = obj["guestQuote"]["text"].as_str().unwrap();
        assert!(QUOTES.iter().any(|(t, _)| *t == text));
    }

    #[test]
    fn test_briefing_summary() {
        let FilteredSnapshot::Briefing(b) = filter(ViewId::Briefing, sample_snapshot()) else {
            panic!("expected briefing shape");
        };
        assert_eq!(b.weather.temperature, Some(21.5));
        assert_eq!(b.weather.condition, "Clear");
        assert_eq!(b.summary.todo_count, 3);
        assert_eq!(b.summary.urgent_todo_count, 2);
        assert!(b.summary.urgent_todo_count <= b.summary.todo_count);
        assert_eq!(b.summary.agenda_count, 6);
        let titles: Vec<_> = b.summary.upcoming_agenda.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, vec!["b", "c", "e"]);
        assert!(b.summary.upcoming_agenda.iter().all(|a| !a.done));
        let next = b.summary.next_event.unwrap();
        assert_eq!(next.title, "Standup");
        assert_eq!(next.minutes_until, 25);
    }

    #[test]
    fn test_briefing_with_empty_sources() {
        let mut snapshot = sample_snapshot();
        snapshot.next_event = None;
        snapshot.todos.clear();
        snapshot.agenda.clear();
        snapshot.weather = WeatherReading::unavailable("Athens");
        let json = serde_json::to_value(filter(ViewId::Briefing, snapshot)).unwrap();
        assert!(json["summary"]["nextEvent"].is_null());
        assert_eq!(json["summary"]["todoCount"], 0);
        assert_eq!(json["summary"]["upcomingAgenda"].as_array().unwrap().len(), 0);
        assert!(json["weather"]["temperature"].is_null());
    }

    #[test]
    fn test_weather_shape() {
        let json = serde_json::to_value(filter(ViewId::Weather, sample_snapshot())).unwrap();
        let obj = json.as_object().unwrap();
        assert!(obj.contains_key("weather"));
        assert_eq!(obj["localEvents"].as_array().unwrap().len(), 5);
        assert!(!obj.contains_key("todos"));
        assert!(!obj.contains_key("agenda"));
    }

    #[test]
    fn test_art_keeps_art_and_music_in_order() {
        let FilteredSnapshot::Art(art) = filter(ViewId::Art, sample_snapshot()) else {
            panic!("expected art shape");
        };
        let titles: Vec<_> = art.local_events.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["Gallery night", "Jazz trio", "Sculpture walk"]);
        assert!(art
            .local_events
            .iter()
            .all(|e| ART_CATEGORIES.contains(&e.category.as_str())));
    }

    #[test]
    fn test_art_drops_unnormalized_categories() {
        let mut snapshot = sample_snapshot();
        snapshot.local_events = vec![
            event("Choir", " Music "),
            event("Mural", "ART"),
            event("Recital", "music"),
        ];
        let FilteredSnapshot::Art(art) = filter(ViewId::Art, snapshot) else {
            panic!("expected art shape");
        };
        let categories: Vec<_> = art.local_events.iter().map(|e| e.category.as_str()).collect();
        assert_eq!(categories, vec!["music"]);
    }

    #[test]
    fn test_unknown_raw_view_falls_back_to_personal() {
        let snapshot = sample_snapshot();
        let result = filter_raw("bogus", snapshot.clone());
        assert_eq!(result.snapshot, FilteredSnapshot::Personal(snapshot));
        assert!(result.warning.is_some());
    }
}

//! # Snapshot Data Model
//!
//! Normalized records produced by the source mappers and the `Snapshot` that the
//! aggregator assembles from them. The engine never looks at provider-specific
//! fields; everything here is provider-neutral.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::views::ViewId;

/// Current weather conditions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherReading {
    /// Human readable location label.
    pub location: String,
    /// Air temperature in the configured unit.
    pub temperature: Option<f64>,
    /// Perceived temperature.
    pub apparent_temperature: Option<f64>,
    /// Relative humidity, percent.
    pub humidity: Option<f64>,
    /// Wind speed in the configured unit.
    pub wind_speed: Option<f64>,
    /// Short condition label ("Clear", "Rain", ...).
    pub condition: String,
    /// Icon key for the frontend.
    pub icon: String,
    /// Observation time reported by the provider.
    pub observed_at: Option<String>,
}

impl WeatherReading {
    /// Static fallback used when the weather source has neither live nor cached data.
    ///
    /// All measurements are null; only the location and an explicit
    /// `Unavailable` condition are filled in.
    pub fn unavailable(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            temperature: None,
            apparent_temperature: None,
            humidity: None,
            wind_speed: None,
            condition: "Unavailable".to_string(),
            icon: "unknown".to_string(),
            observed_at: None,
        }
    }
}

/// The next upcoming calendar entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NextEvent {
    pub title: String,
    /// Start time, RFC 3339.
    pub time: String,
    /// Whole minutes from aggregation time until the start.
    pub minutes_until: i64,
    pub location: Option<String>,
}

/// One open task from the task list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskItem {
    pub id: String,
    pub content: String,
    /// 1 (normal) to 4 (urgent).
    pub priority: u8,
    pub due: Option<NaiveDate>,
    /// Set by the task mapper.
    pub urgent: bool,
}

/// One entry of today's agenda.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgendaItem {
    pub title: String,
    pub start: String,
    pub end: Option<String>,
    pub all_day: bool,
    /// Set by the calendar mapper.
    pub done: bool,
}

/// A nearby happening from the local events file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalEvent {
    pub title: String,
    pub date: String,
    #[serde(default)]
    pub venue: Option<String>,
    /// Free-form category such as "art", "music", "sports".
    pub category: String,
    #[serde(default)]
    pub url: Option<String>,
}

/// Message composed locally for the assistant panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantMessage {
    pub greeting: String,
    pub message: String,
}

/// A quotation drawn for the guest and art views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub text: String,
    pub author: String,
}

/// The full, unfiltered aggregate of one refresh cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub view: ViewId,
    pub weather: WeatherReading,
    pub next_event: Option<NextEvent>,
    pub todos: Vec<TaskItem>,
    pub agenda: Vec<AgendaItem>,
    pub local_events: Vec<LocalEvent>,
    pub assistant: AssistantMessage,
    /// When the aggregation ran.
    pub generated_at: DateTime<Utc>,
}

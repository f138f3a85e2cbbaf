use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::views::ViewId;

/// Shortest refresh period the scheduler accepts.
pub const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(1);

/// Runtime settings of the hub and its sources.
///
/// Every field has a default, so a partial JSON document deserializes cleanly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HubSettings {
    pub refresh_interval_secs: u64,
    pub heartbeat_interval_secs: u64,
    pub default_view: ViewId,
    pub fetch_timeout_secs: u64,
    pub http_max_retries: u32,

    pub weather_ttl_secs: u64,
    pub calendar_ttl_secs: u64,
    pub tasks_ttl_secs: u64,

    pub weather_latitude: f64,
    pub weather_longitude: f64,
    pub weather_location: String,
    pub weather_base_url: String,

    pub calendar_id: Option<String>,
    pub calendar_api_key: Option<String>,
    pub calendar_base_url: String,

    pub todoist_token: Option<String>,
    pub todoist_project_id: Option<String>,
    pub todoist_base_url: String,

    pub local_events_path: PathBuf,
}

impl Default for HubSettings {
    fn default() -> Self {
        Self {
            refresh_interval_secs: 30,
            heartbeat_interval_secs: 30,
            default_view: ViewId::default(),
            fetch_timeout_secs: 5,
            http_max_retries: 2,
            weather_ttl_secs: 600,
            calendar_ttl_secs: 300,
            tasks_ttl_secs: 0,
            weather_latitude: 37.98,
            weather_longitude: 23.73,
            weather_location: "Athens".to_string(),
            weather_base_url: "https://api.open-meteo.com/".to_string(),
            calendar_id: None,
            calendar_api_key: None,
            calendar_base_url: "https://www.googleapis.com/".to_string(),
            todoist_token: None,
            todoist_project_id: None,
            todoist_base_url: "https://api.todoist.com/".to_string(),
            local_events_path: PathBuf::from("local_events.json"),
        }
    }
}

impl HubSettings {
    /// Refresh period, clamped to at least one second.
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs).max(MIN_REFRESH_INTERVAL)
    }

    /// Heartbeat period, clamped to at least one second.
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs).max(MIN_REFRESH_INTERVAL)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn weather_ttl(&self) -> Duration {
        Duration::from_secs(self.weather_ttl_secs)
    }

    pub fn calendar_ttl(&self) -> Duration {
        Duration::from_secs(self.calendar_ttl_secs)
    }

    pub fn tasks_ttl(&self) -> Duration {
        Duration::from_secs(self.tasks_ttl_secs)
    }
}

fn mask(secret: &Option<String>) -> &'static str {
    if secret.is_some() { "<set>" } else { "<unset>" }
}

impl fmt::Display for HubSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "HubSettings
    Refresh: {}s, Heartbeat: {}s, Default view: {},
    Fetch timeout: {}s, HTTP retries: {},
    TTL weather/calendar/tasks: {}s/{}s/{}s,
    Weather: {} ({}, {}),
    Calendar: {} (key {}),
    Todoist token: {},
    Local events: {}",
            self.refresh_interval_secs,
            self.heartbeat_interval_secs,
            self.default_view,
            self.fetch_timeout_secs,
            self.http_max_retries,
            self.weather_ttl_secs,
            self.calendar_ttl_secs,
            self.tasks_ttl_secs,
            self.weather_location,
            self.weather_latitude,
            self.weather_longitude,
            self.calendar_id.as_deref().unwrap_or("<none>"),
            mask(&self.calendar_api_key),
            mask(&self.todoist_token),
            self.local_events_path.display(),
        )
    }
}

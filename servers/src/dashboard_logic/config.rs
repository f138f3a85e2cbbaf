use anyhow::{Context, Result};
use clap::Parser;
use lib_dashboard::{HubSettings, ViewId};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser, Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[clap(about = "Live dashboard WebSocket hub", version)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[clap(long, env = "DASHBOARD_PORT", help = "Port to listen on for client connections.")]
    pub port: Option<u16>,

    #[clap(long, env = "DASHBOARD_CONFIG_PATH", help = "Path to the JSON configuration file.")]
    pub config_path: Option<PathBuf>,

    #[clap(long, env = "DASHBOARD_LOG_DIR", help = "Directory for log files.")]
    pub log_dir: Option<PathBuf>,

    #[clap(long, env = "DASHBOARD_LOG_LEVEL", help = "Logging level (trace, debug, info, warn, error).")]
    pub log_level: Option<String>,

    #[clap(long, env = "DASHBOARD_REFRESH_INTERVAL_SECONDS", help = "Seconds between refresh cycles (minimum 1).")]
    pub refresh_interval_seconds: Option<u64>,

    #[clap(long, env = "DASHBOARD_HEARTBEAT_INTERVAL_SECONDS", help = "Seconds between heartbeat sweeps.")]
    pub heartbeat_interval_seconds: Option<u64>,

    #[clap(long, env = "DASHBOARD_DEFAULT_VIEW", help = "View at startup (personal, guest, briefing, weather, art).")]
    pub default_view: Option<String>,

    #[clap(long, env = "DASHBOARD_FETCH_TIMEOUT_SECONDS", help = "Per-source fetch timeout in seconds.")]
    pub fetch_timeout_seconds: Option<u64>,

    #[clap(long, env = "DASHBOARD_HTTP_MAX_RETRIES", help = "Retries of transient HTTP failures per fetch.")]
    pub http_max_retries: Option<u32>,

    #[clap(long, env = "DASHBOARD_WEATHER_TTL_SECONDS", help = "Weather cache lifetime in seconds.")]
    pub weather_ttl_seconds: Option<u64>,

    #[clap(long, env = "DASHBOARD_CALENDAR_TTL_SECONDS", help = "Calendar cache lifetime in seconds.")]
    pub calendar_ttl_seconds: Option<u64>,

    #[clap(long, env = "DASHBOARD_TASKS_TTL_SECONDS", help = "Task cache lifetime in seconds (0 = always live).")]
    pub tasks_ttl_seconds: Option<u64>,

    #[clap(long, env = "DASHBOARD_WEATHER_LATITUDE", help = "Latitude of the weather location.")]
    pub weather_latitude: Option<f64>,

    #[clap(long, env = "DASHBOARD_WEATHER_LONGITUDE", help = "Longitude of the weather location.")]
    pub weather_longitude: Option<f64>,

    #[clap(long, env = "DASHBOARD_WEATHER_LOCATION", help = "Display name of the weather location.")]
    pub weather_location: Option<String>,

    #[clap(long, env = "DASHBOARD_CALENDAR_ID", help = "Google Calendar id.")]
    pub calendar_id: Option<String>,

    #[clap(long, env = "DASHBOARD_CALENDAR_API_KEY", help = "Google API key for the calendar.")]
    pub calendar_api_key: Option<String>,

    #[clap(long, env = "DASHBOARD_TODOIST_TOKEN", help = "Todoist personal API token.")]
    pub todoist_token: Option<String>,

    #[clap(long, env = "DASHBOARD_TODOIST_PROJECT_ID", help = "Restrict tasks to one Todoist project.")]
    pub todoist_project_id: Option<String>,

    #[clap(long, env = "DASHBOARD_LOCAL_EVENTS_PATH", help = "Path to the local events JSON file.")]
    pub local_events_path: Option<PathBuf>,
}

impl Config {
    // Merge two Config structs, where 'other' overrides 'self' for Some values
    fn merge(self, other: Config) -> Config {
        Config {
            port: other.port.or(self.port),
            config_path: other.config_path.or(self.config_path),
            log_dir: other.log_dir.or(self.log_dir),
            log_level: other.log_level.or(self.log_level),
            refresh_interval_seconds: other.refresh_interval_seconds.or(self.refresh_interval_seconds),
            heartbeat_interval_seconds: other.heartbeat_interval_seconds.or(self.heartbeat_interval_seconds),
            default_view: other.default_view.or(self.default_view),
            fetch_timeout_seconds: other.fetch_timeout_seconds.or(self.fetch_timeout_seconds),
            http_max_retries: other.http_max_retries.or(self.http_max_retries),
            weather_ttl_seconds: other.weather_ttl_seconds.or(self.weather_ttl_seconds),
            calendar_ttl_seconds: other.calendar_ttl_seconds.or(self.calendar_ttl_seconds),
            tasks_ttl_seconds: other.tasks_ttl_seconds.or(self.tasks_ttl_seconds),
            weather_latitude: other.weather_latitude.or(self.weather_latitude),
            weather_longitude: other.weather_longitude.or(self.weather_longitude),
            weather_location: other.weather_location.or(self.weather_location),
            calendar_id: other.calendar_id.or(self.calendar_id),
            calendar_api_key: other.calendar_api_key.or(self.calendar_api_key),
            todoist_token: other.todoist_token.or(self.todoist_token),
            todoist_project_id: other.todoist_project_id.or(self.todoist_project_id),
            local_events_path: other.local_events_path.or(self.local_events_path),
        }
    }

    fn defaults() -> Config {
        let hub = HubSettings::default();
        Config {
            port: Some(3000),
            log_dir: Some(PathBuf::from("./logs")),
            log_level: Some("info".to_string()),
            refresh_interval_seconds: Some(hub.refresh_interval_secs),
            heartbeat_interval_seconds: Some(hub.heartbeat_interval_secs),
            default_view: Some(hub.default_view.to_string()),
            fetch_timeout_seconds: Some(hub.fetch_timeout_secs),
            http_max_retries: Some(hub.http_max_retries),
            weather_ttl_seconds: Some(hub.weather_ttl_secs),
            calendar_ttl_seconds: Some(hub.calendar_ttl_secs),
            tasks_ttl_seconds: Some(hub.tasks_ttl_secs),
            weather_latitude: Some(hub.weather_latitude),
            weather_longitude: Some(hub.weather_longitude),
            weather_location: Some(hub.weather_location),
            local_events_path: Some(hub.local_events_path),
            ..Default::default()
        }
    }

    pub fn port(&self) -> u16 {
        self.port.unwrap_or(3000)
    }

    pub fn log_dir(&self) -> PathBuf {
        self.log_dir.clone().unwrap_or_else(|| PathBuf::from("./logs"))
    }

    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or("info")
    }

    /// Converts the merged configuration into the library settings.
    /// A default view outside the closed set is a startup error.
    pub fn to_hub_settings(&self) -> Result<HubSettings> {
        let mut s = HubSettings::default();
        if let Some(raw) = &self.default_view {
            s.default_view = raw
                .parse::<ViewId>()
                .with_context(|| format!("invalid default view '{}'", raw))?;
        }
        if let Some(v) = self.refresh_interval_seconds {
            s.refresh_interval_secs = v;
        }
        if let Some(v) = self.heartbeat_interval_seconds {
            s.heartbeat_interval_secs = v;
        }
        if let Some(v) = self.fetch_timeout_seconds {
            s.fetch_timeout_secs = v;
        }
        if let Some(v) = self.http_max_retries {
            s.http_max_retries = v;
        }
        if let Some(v) = self.weather_ttl_seconds {
            s.weather_ttl_secs = v;
        }
        if let Some(v) = self.calendar_ttl_seconds {
            s.calendar_ttl_secs = v;
        }
        if let Some(v) = self.tasks_ttl_seconds {
            s.tasks_ttl_secs = v;
        }
        if let Some(v) = self.weather_latitude {
            s.weather_latitude = v;
        }
        if let Some(v) = self.weather_longitude {
            s.weather_longitude = v;
        }
        if let Some(v) = &self.weather_location {
            s.weather_location = v.clone();
        }
        if let Some(v) = &self.local_events_path {
            s.local_events_path = v.clone();
        }
        s.calendar_id = self.calendar_id.clone();
        s.calendar_api_key = self.calendar_api_key.clone();
        s.todoist_token = self.todoist_token.clone();
        s.todoist_project_id = self.todoist_project_id.clone();
        Ok(s)
    }
}

/// Merges the JSON file over `config`.
///
/// This runs before the logger exists, so a missing or broken file is reported
/// back as a notice for the caller to log once logging is up.
fn load_file_layer(config: Config, path: &Path) -> (Config, Option<String>) {
    if !path.exists() {
        let notice = format!(
            "Config file not found at {}. Using defaults and environment/CLI variables.",
            path.display()
        );
        return (config, Some(notice));
    }
    match fs::read_to_string(path) {
        Ok(config_str) => match serde_json::from_str::<Config>(&config_str) {
            Ok(file_config) => (config.merge(file_config), None),
            Err(e) => {
                let notice = format!(
                    "Failed to parse config file {}: {}. Falling back to other sources.",
                    path.display(),
                    e
                );
                (config, Some(notice))
            }
        },
        Err(e) => {
            let notice = format!(
                "Failed to read config file {}: {}. Falling back to other sources.",
                path.display(),
                e
            );
            (config, Some(notice))
        }
    }
}

/// Loads the configuration: defaults, then the JSON file, then environment and CLI.
///
/// # Returns
/// The merged configuration and, if the file layer was skipped, the reason.
pub fn load_config() -> (Config, Option<String>) {
    // 1. Load defaults
    let default_config = Config::defaults();

    // 2. Load from config file (server_dashboard.conf) if present.
    //    clap covers both the CLI flag and the environment variable for the path.
    let cli_args = Config::parse();
    let config_file_path = cli_args
        .config_path
        .clone()
        .unwrap_or_else(|| PathBuf::from("server_dashboard.conf"));

    let (current_config, notice) = load_file_layer(default_config, &config_file_path);

    // 3. Environment variables and CLI arguments win over the file.
    (current_config.merge(cli_args), notice)
}

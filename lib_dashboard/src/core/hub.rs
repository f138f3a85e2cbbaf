//! # Dashboard Hub
//!
//! The facade the outer surfaces talk to. It wires the aggregator, the scheduler
//! and the connection manager together and exposes the control operations:
//! snapshot query, default view change, on-demand refresh and connection count.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::task::JoinHandle;

use crate::configs::HubSettings;
use crate::core::aggregator::SnapshotAggregator;
use crate::core::connection_manager::ConnectionManager;
use crate::core::scheduler::Scheduler;
use crate::error::HubError;
use crate::views::{FilterResult, FilteredSnapshot, ViewId};

/// Answer of a snapshot query. `warning` is set when an unknown view was requested.
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotResponse {
    #[serde(flatten)]
    pub snapshot: FilteredSnapshot,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Point-in-time status of the hub.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HubStatus {
    pub connections: usize,
    pub current_view: ViewId,
    pub scheduler_active: bool,
    pub refresh_interval_secs: u64,
    pub uptime_secs: u64,
}

pub struct DashboardHub {
    aggregator: Arc<SnapshotAggregator>,
    connections: Arc<ConnectionManager>,
    scheduler: Arc<Scheduler>,
    heartbeat: Mutex<Option<JoinHandle<()>>>,
    started_at: Instant,
}

impl DashboardHub {
    /// Wires a hub around an already built aggregator.
    pub fn new(
        aggregator: SnapshotAggregator,
        default_view: ViewId,
        refresh_interval: Duration,
        heartbeat_interval: Duration,
    ) -> Self {
        let aggregator = Arc::new(aggregator);
        let connections = Arc::new(ConnectionManager::new(heartbeat_interval));
        let scheduler = Arc::new(Scheduler::new(
            Arc::clone(&aggregator),
            Arc::clone(&connections),
            default_view,
            refresh_interval,
        ));
        Self {
            aggregator,
            connections,
            scheduler,
            heartbeat: Mutex::new(None),
            started_at: Instant::now(),
        }
    }

    /// Same as [`DashboardHub::new`], with intervals and the default view taken from `settings`.
    pub fn with_settings(aggregator: SnapshotAggregator, settings: &HubSettings) -> Self {
        Self::new(
            aggregator,
            settings.default_view,
            settings.refresh_interval(),
            settings.heartbeat_interval(),
        )
    }

    pub fn connections(&self) -> &Arc<ConnectionManager> {
        &self.connections
    }

    pub fn scheduler(&self) -> &Arc<Scheduler> {
        &self.scheduler
    }

    /// Starts the heartbeat, then the scheduler (which runs its first cycle before returning).
    pub async fn start(&self) {
        {
            let mut heartbeat = self.heartbeat.lock().unwrap_or_else(PoisonError::into_inner);
            if heartbeat.is_none() {
                *heartbeat = Some(self.connections.start_heartbeat());
            }
        }
        self.scheduler.start().await;
    }

    /// Stops the scheduler, then closes every connection.
    pub async fn shutdown(&self) {
        self.scheduler.stop();
        self.connections.shutdown();
        let handle = self.heartbeat.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                log::warn!("Heartbeat task ended abnormally: {}", e);
            }
        }
        log::info!("Dashboard hub shut down.");
    }

    /// # Get Snapshot
    ///
    /// Read-only query. No view means the current default view; an unknown view
    /// falls back to `personal` with a warning. Nothing is broadcast and the
    /// default view is not touched.
    pub async fn get_snapshot(&self, view: Option<&str>) -> SnapshotResponse {
        match view {
            Some(raw) => {
                let FilterResult { snapshot, warning } = self.aggregator.aggregate_raw(raw).await;
                SnapshotResponse { snapshot, warning }
            }
            None => SnapshotResponse {
                snapshot: self.aggregator.aggregate(self.scheduler.current_view().await).await,
                warning: None,
            },
        }
    }

    /// Changes the global view and pushes one update for it.
    pub async fn set_default_view(&self, raw: &str) -> Result<ViewId, HubError> {
        self.scheduler.set_view(raw).await
    }

    pub async fn current_view(&self) -> ViewId {
        self.scheduler.current_view().await
    }

    /// One refresh cycle outside the timer. Returns the number of deliveries.
    pub async fn trigger_refresh(&self) -> usize {
        self.scheduler.trigger_refresh().await
    }

    pub fn connection_count(&self) -> usize {
        self.connections.connection_count()
    }

    pub async fn status(&self) -> HubStatus {
        HubStatus {
            connections: self.connection_count(),
            current_view: self.current_view().await,
            scheduler_active: self.scheduler.is_active(),
            refresh_interval_secs: self.scheduler.interval().as_secs(),
            uptime_secs: self.started_at.elapsed().as_secs(),
        }
    }
}

#[cfg(feature = "sources")]
mod build {
    use super::*;
    use crate::cache::SourceCache;
    use crate::error::SourceError;
    use crate::retrieve::ApiClient;
    use crate::sources::calendar::{CalendarEvent, GoogleCalendarClient};
    use crate::sources::local_events::LocalEventsFile;
    use crate::sources::tasks::TodoistClient;
    use crate::sources::weather::OpenMeteoClient;
    use crate::sources::Unconfigured;
    use crate::model::TaskItem;

    impl SnapshotAggregator {
        /// Builds the production sources from settings.
        ///
        /// Calendar and tasks fall back to [`Unconfigured`] when their credentials
        /// are missing; they then degrade like any unavailable source.
        ///
        /// # Errors
        /// `SourceError::Network` if an HTTP client cannot be built (bad base URL).
        pub fn from_settings(settings: &HubSettings) -> Result<Self, SourceError> {
            let timeout = settings.fetch_timeout();
            let retries = settings.http_max_retries;

            let weather = OpenMeteoClient::new(
                ApiClient::new(&settings.weather_base_url, None, retries, timeout)?,
                settings.weather_latitude,
                settings.weather_longitude,
                settings.weather_location.as_str(),
                "celsius",
            );

            let calendar: SourceCache<Vec<CalendarEvent>> =
                match (&settings.calendar_id, &settings.calendar_api_key) {
                    (Some(id), Some(key)) => SourceCache::from_client(
                        GoogleCalendarClient::new(
                            ApiClient::new(&settings.calendar_base_url, None, retries, timeout)?,
                            id.as_str(),
                            key.as_str(),
                        ),
                        settings.calendar_ttl(),
                        timeout,
                    ),
                    _ => {
                        log::warn!("Calendar id or API key missing; calendar disabled.");
                        SourceCache::from_client(Unconfigured::new("calendar"), settings.calendar_ttl(), timeout)
                    }
                };

            let tasks: SourceCache<Vec<TaskItem>> = match &settings.todoist_token {
                Some(token) => SourceCache::from_client(
                    TodoistClient::new(
                        ApiClient::new(&settings.todoist_base_url, Some(token.clone()), retries, timeout)?,
                        settings.todoist_project_id.clone(),
                    ),
                    settings.tasks_ttl(),
                    timeout,
                ),
                None => {
                    log::warn!("Todoist token missing; tasks disabled.");
                    SourceCache::from_client(Unconfigured::new("tasks"), settings.tasks_ttl(), timeout)
                }
            };

            Ok(SnapshotAggregator::new(
                SourceCache::from_client(weather, settings.weather_ttl(), timeout),
                calendar,
                tasks,
                SourceCache::from_client(
                    LocalEventsFile::new(settings.local_events_path.clone()),
                    Duration::ZERO,
                    timeout,
                ),
                settings.weather_location.as_str(),
            ))
        }
    }

    impl DashboardHub {
        /// Builds the production hub from settings.
        pub fn from_settings(settings: &HubSettings) -> Result<Self, SourceError> {
            let aggregator = SnapshotAggregator::from_settings(settings)?;
            Ok(Self::with_settings(aggregator, settings))
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_from_settings_rejects_bad_base_url() {
            let settings = HubSettings {
                weather_base_url: "not a url".into(),
                ..Default::default()
            };
            assert!(matches!(
                DashboardHub::from_settings(&settings),
                Err(SourceError::Network(_))
            ));
        }

        #[test]
        fn test_from_settings_defaults() {
            let hub = DashboardHub::from_settings(&HubSettings::default()).unwrap();
            assert_eq!(hub.connection_count(), 0);
            assert!(!hub.scheduler().is_active());
        }
    }
}

//! # Refresh Scheduler
//!
//! Drives refresh cycles and owns the current default view.
//!
//! A cycle aggregates the snapshot for a view, wraps it in a `dashboard:update`
//! envelope and broadcasts it. Cycles are triggered three ways:
//! 1.  the recurring timer (first tick one interval after `start`);
//! 2.  a view change through `set_view`;
//! 3.  an explicit `trigger_refresh`.
//!
//! The aggregation runs in its own task, so a panicking collaborator surfaces
//! as a `CycleFailure` instead of taking the timer down. A failed cycle is
//! broadcast as an `error` event and the scheduler keeps going.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::configs::MIN_REFRESH_INTERVAL;
use crate::core::aggregator::SnapshotAggregator;
use crate::core::connection_manager::ConnectionManager;
use crate::error::HubError;
use crate::protocol::{Envelope, EVENT_DASHBOARD_UPDATE};
use crate::views::ViewId;

pub struct Scheduler {
    aggregator: Arc<SnapshotAggregator>,
    connections: Arc<ConnectionManager>,
    view: RwLock<ViewId>,
    interval: Duration,
    /// Present while the timer runs.
    timer: Mutex<Option<CancellationToken>>,
}

impl Scheduler {
    /// Intervals below one second are clamped to one second.
    pub fn new(
        aggregator: Arc<SnapshotAggregator>,
        connections: Arc<ConnectionManager>,
        initial_view: ViewId,
        interval: Duration,
    ) -> Self {
        Self {
            aggregator,
            connections,
            view: RwLock::new(initial_view),
            interval: interval.max(MIN_REFRESH_INTERVAL),
            timer: Mutex::new(None),
        }
    }

    /// Effective timer period.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Runs one cycle right away, then starts the recurring timer.
    /// Does nothing if the timer is already running.
    pub async fn start(self: &Arc<Self>) {
        let token = {
            let mut timer = self.timer.lock().unwrap_or_else(PoisonError::into_inner);
            if timer.is_some() {
                log::debug!("Scheduler already active, start ignored.");
                return;
            }
            let token = CancellationToken::new();
            *timer = Some(token.clone());
            token
        };

        log::info!(
            "Scheduler started (view '{}', every {}s)",
            self.current_view().await,
            self.interval.as_secs()
        );
        self.trigger_refresh().await;

        let scheduler = Arc::clone(self);
        let period = self.interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        scheduler.trigger_refresh().await;
                    }
                }
            }
            log::info!("Scheduler timer stopped.");
        });
    }

    /// Cancels the timer. A cycle already in progress completes.
    pub fn stop(&self) {
        if let Some(token) = self.timer.lock().unwrap_or_else(PoisonError::into_inner).take() {
            token.cancel();
        }
    }

    pub fn is_active(&self) -> bool {
        self.timer.lock().unwrap_or_else(PoisonError::into_inner).is_some()
    }

    pub async fn current_view(&self) -> ViewId {
        *self.view.read().await
    }

    /// # Set View
    ///
    /// Validates `raw` strictly, stores it as the current view and runs one cycle
    /// for it immediately.
    ///
    /// # Errors
    /// `HubError::InvalidView` for anything outside the closed set. The current
    /// view is left untouched in that case.
    pub async fn set_view(&self, raw: &str) -> Result<ViewId, HubError> {
        let view: ViewId = raw.parse()?;
        let previous = std::mem::replace(&mut *self.view.write().await, view);
        log::info!("Default view changed: '{}' -> '{}'", previous, view);

        self.cycle_and_report(view).await;
        Ok(view)
    }

    /// One cycle for the current view. Returns the number of deliveries
    /// (0 when the cycle failed).
    pub async fn trigger_refresh(&self) -> usize {
        let view = self.current_view().await;
        self.cycle_and_report(view).await
    }

    /// Aggregates, serializes and broadcasts for `view`.
    pub async fn run_cycle(&self, view: ViewId) -> Result<usize, HubError> {
        let aggregator = Arc::clone(&self.aggregator);
        let filtered = tokio::spawn(async move { aggregator.aggregate(view).await })
            .await
            .map_err(|e| HubError::CycleFailure(e.to_string()))?;

        let envelope = Envelope::with_payload(EVENT_DASHBOARD_UPDATE, &filtered)?;
        self.connections.broadcast(&envelope)
    }

    async fn cycle_and_report(&self, view: ViewId) -> usize {
        match self.run_cycle(view).await {
            Ok(delivered) => {
                log::debug!("Cycle for '{}' delivered to {} client(s)", view, delivered);
                delivered
            }
            Err(err) => {
                log::error!("Refresh cycle for '{}' failed: {}", view, err);
                let notice = Envelope::error("Failed to update dashboard", Some(err.to_string()));
                if let Err(e) = self.connections.broadcast(&notice) {
                    log::error!("Could not broadcast the failure notice: {}", e);
                }
                0
            }
        }
    }
}

//! # Data Sources Module
//!
//! The contract between the engine and the upstream collaborators, plus the
//! concrete clients.
//!
//! ## Purpose:
//! Every upstream source exposes one async `fetch_raw` that can fail with a
//! [`SourceError`] and one pure `parse` that maps the provider payload into a
//! normalized record. The engine only ever sees normalized records; raw provider
//! fields stay inside the client module.
//!
//! ## Contained Modules:
//! - **`weather`**: Open-Meteo current conditions (feature `sources`).
//! - **`calendar`**: Google Calendar events, next-event and agenda derivation (client behind feature `sources`).
//! - **`tasks`**: Todoist active tasks with the urgency flag (feature `sources`).
//! - **`local_events`**: view-independent local JSON file of nearby happenings.
//! - **`assistant`**: locally composed assistant message.

use std::marker::PhantomData;

use async_trait::async_trait;

use crate::error::SourceError;

#[cfg(feature = "sources")]
/// Open-Meteo weather client.
pub mod weather;
/// Google Calendar client and agenda helpers.
pub mod calendar;
#[cfg(feature = "sources")]
/// Todoist task client.
pub mod tasks;
/// Local events file reader.
pub mod local_events;
/// Assistant message composition.
pub mod assistant;

/// One upstream source: fetch raw data, then map it.
#[async_trait]
pub trait SourceClient: Send + Sync {
    /// Provider-specific payload.
    type Raw: Send + 'static;
    /// Normalized record handed to the engine.
    type Record: Send + 'static;

    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Retrieves the raw payload. Network, auth and quota problems surface as errors.
    async fn fetch_raw(&self) -> Result<Self::Raw, SourceError>;

    /// Pure mapping from raw payload to normalized record.
    fn parse(&self, raw: Self::Raw) -> Result<Self::Record, SourceError>;
}

/// Type-erased "fetch and normalize" used by the source caches.
#[async_trait]
pub trait Fetch<T>: Send + Sync
where
    T: Send + 'static,
{
    /// Source name, for logs.
    fn source_name(&self) -> &str;

    /// One live attempt.
    async fn fetch(&self) -> Result<T, SourceError>;
}

#[async_trait]
impl<C> Fetch<C::Record> for C
where
    C: SourceClient,
{
    fn source_name(&self) -> &str {
        self.name()
    }

    async fn fetch(&self) -> Result<C::Record, SourceError> {
        let raw = self.fetch_raw().await?;
        self.parse(raw)
    }
}

/// Stand-in for a provider that is switched off (missing token, no calendar id).
///
/// Every fetch fails with `NotConfigured`, so the aggregator applies the same
/// fallback it would for an outage.
pub struct Unconfigured<T> {
    name: &'static str,
    _record: PhantomData<fn() -> T>,
}

impl<T> Unconfigured<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            _record: PhantomData,
        }
    }
}

#[async_trait]
impl<T> SourceClient for Unconfigured<T>
where
    T: Send + 'static,
{
    type Raw = ();
    type Record = T;

    fn name(&self) -> &'static str {
        self.name
    }

    async fn fetch_raw(&self) -> Result<(), SourceError> {
        Err(SourceError::NotConfigured(self.name.to_string()))
    }

    fn parse(&self, _raw: ()) -> Result<T, SourceError> {
        Err(SourceError::NotConfigured(self.name.to_string()))
    }
}

//! # Local Events File
//!
//! A view-independent local source: a JSON file of nearby happenings maintained
//! next to the server. The file is read on every aggregation, so edits show up on
//! the next cycle. Accepted layouts are a bare array or `{ "events": [...] }`.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::SourceError;
use crate::model::LocalEvent;
use crate::sources::SourceClient;

#[derive(Deserialize)]
#[serde(untagged)]
enum EventsDocument {
    Bare(Vec<LocalEvent>),
    Wrapped { events: Vec<LocalEvent> },
}

/// Reader for the local events JSON file.
pub struct LocalEventsFile {
    path: PathBuf,
}

impl LocalEventsFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl SourceClient for LocalEventsFile {
    type Raw = String;
    type Record = Vec<LocalEvent>;

    fn name(&self) -> &'static str {
        "local_events"
    }

    async fn fetch_raw(&self) -> Result<String, SourceError> {
        Ok(tokio::fs::read_to_string(&self.path).await?)
    }

    fn parse(&self, raw: String) -> Result<Vec<LocalEvent>, SourceError> {
        parse_events(&raw)
    }
}

/// Pure mapper for the file contents. Categories are trimmed and lowercased.
pub fn parse_events(raw: &str) -> Result<Vec<LocalEvent>, SourceError> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    let mut events = match serde_json::from_str::<EventsDocument>(raw)? {
        EventsDocument::Bare(events) | EventsDocument::Wrapped { events } => events,
    };
    for event in &mut events {
        event.category = event.category.trim().to_lowercase();
    }
    Ok(events)
}

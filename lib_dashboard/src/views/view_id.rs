use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::HubError;

/// The closed set of dashboard views.
///
/// The first variant is the startup default. Parsing is strict everywhere except
/// [`ViewId::parse_or_default`], which backs the read-only snapshot query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewId {
    /// Everything: weather, calendar, tasks, agenda, local events, assistant.
    #[default]
    Personal,
    /// Visitor-safe view with a random quotation.
    Guest,
    /// Condensed morning summary.
    Briefing,
    /// Weather and local events only.
    Weather,
    /// Weather, a quotation and art/music events.
    Art,
}

impl ViewId {
    /// All views, in declaration order.
    pub const ALL: [ViewId; 5] = [
        ViewId::Personal,
        ViewId::Guest,
        ViewId::Briefing,
        ViewId::Weather,
        ViewId::Art,
    ];

    /// Wire name of the view.
    pub fn as_str(&self) -> &'static str {
        match self {
            ViewId::Personal => "personal",
            ViewId::Guest => "guest",
            ViewId::Briefing => "briefing",
            ViewId::Weather => "weather",
            ViewId::Art => "art",
        }
    }

    /// Lenient parse: unknown input falls back to `personal` and yields a warning.
    pub fn parse_or_default(raw: &str) -> (ViewId, Option<String>) {
        match raw.parse::<ViewId>() {
            Ok(view) => (view, None),
            Err(_) => {
                let warning = format!("Unknown view '{}', falling back to 'personal'", raw);
                log::warn!("{}", warning);
                (ViewId::Personal, Some(warning))
            }
        }
    }
}

impl FromStr for ViewId {
    type Err = HubError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ViewId::ALL
            .iter()
            .copied()
            .find(|v| v.as_str() == s.trim())
            .ok_or_else(|| HubError::InvalidView(s.to_string()))
    }
}

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

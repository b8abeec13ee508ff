//! CalDAV-side VTODO types.
//!
//! `Todo` is a provider-neutral snapshot of one VTODO item. The CalDAV client
//! converts wire ICS into this type (see `ics::parse`) and back
//! (see `ics::generate`); the sync engine works exclusively with it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// A CalDAV VTODO snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Todo {
    /// Server-side item identifier (ICS UID). Immutable once created.
    pub uid: String,
    pub summary: String,
    pub status: TodoStatus,
    /// Free-text description, possibly carrying an embedded annotation block
    /// (see `mapper::encode_description`).
    pub description: Option<String>,
    pub due: Option<DateTime<Utc>>,
    /// DTSTART.
    pub start: Option<DateTime<Utc>>,
    /// COMPLETED.
    pub completed: Option<DateTime<Utc>>,
    /// PRIORITY 1-9 (1 = highest). `None` when the property is absent or 0.
    pub priority: Option<u8>,
    /// CATEGORIES. The first entry is reserved for the project, the rest are
    /// tags.
    pub categories: Vec<String>,
    pub created: Option<DateTime<Utc>>,
    pub last_modified: Option<DateTime<Utc>>,
}

impl Todo {
    /// Timestamp used for last-write-wins comparison, when the server
    /// reported one.
    pub fn last_modified(&self) -> Option<DateTime<Utc>> {
        self.last_modified.or(self.created)
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == TodoStatus::Cancelled
    }
}

/// VTODO STATUS values understood by the sync engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING-KEBAB-CASE")]
pub enum TodoStatus {
    NeedsAction,
    Completed,
    Cancelled,
}

impl TodoStatus {
    /// Parse an ICS STATUS value. Anything unrecognised (including
    /// IN-PROCESS) degrades to NEEDS-ACTION with a warning.
    pub fn from_ical(value: &str) -> Self {
        match value {
            "NEEDS-ACTION" => TodoStatus::NeedsAction,
            "COMPLETED" => TodoStatus::Completed,
            "CANCELLED" => TodoStatus::Cancelled,
            other => {
                warn!(status = other, "unknown VTODO status, treating as NEEDS-ACTION");
                TodoStatus::NeedsAction
            }
        }
    }

    pub fn as_ical(&self) -> &'static str {
        match self {
            TodoStatus::NeedsAction => "NEEDS-ACTION",
            TodoStatus::Completed => "COMPLETED",
            TodoStatus::Cancelled => "CANCELLED",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_roundtrips_through_ical() {
        for status in [
            TodoStatus::NeedsAction,
            TodoStatus::Completed,
            TodoStatus::Cancelled,
        ] {
            assert_eq!(TodoStatus::from_ical(status.as_ical()), status);
        }
    }

    #[test]
    fn test_unknown_status_degrades_to_needs_action() {
        assert_eq!(TodoStatus::from_ical("IN-PROCESS"), TodoStatus::NeedsAction);
        assert_eq!(TodoStatus::from_ical("whatever"), TodoStatus::NeedsAction);
    }
}

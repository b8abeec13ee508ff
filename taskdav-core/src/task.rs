//! Taskwarrior-side task types.
//!
//! `Task` is an immutable snapshot of one Taskwarrior entry as produced by
//! `task export`. The sync engine never mutates a snapshot in place; every
//! change goes back through the local store as a fresh create/update/delete.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A Taskwarrior task snapshot.
///
/// Field names and the compact `YYYYMMDDTHHMMSSZ` timestamp encoding follow
/// the Taskwarrior JSON export format, so this type (de)serializes directly
/// against `task export` / `task import`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub uuid: String,
    pub description: String,
    pub status: TaskStatus,
    #[serde(with = "tw_date")]
    pub entry: DateTime<Utc>,
    #[serde(default, with = "tw_date_opt", skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,
    #[serde(default, with = "tw_date_opt", skip_serializing_if = "Option::is_none")]
    pub due: Option<DateTime<Utc>>,
    /// Start/scheduled timestamp (`scheduled` in Taskwarrior).
    #[serde(default, with = "tw_date_opt", skip_serializing_if = "Option::is_none")]
    pub scheduled: Option<DateTime<Utc>>,
    /// Completion timestamp (`end` in Taskwarrior).
    #[serde(default, with = "tw_date_opt", skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<TaskPriority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<Annotation>,
    /// UID of the linked CalDAV todo, stored as a UDA on the task.
    /// This is the sole correlation key between the two stores.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caldav_uid: Option<String>,
}

impl Task {
    /// Timestamp used for last-write-wins comparison.
    /// Taskwarrior omits `modified` on tasks that were never touched after
    /// creation, in which case the entry timestamp stands in.
    pub fn last_modified(&self) -> DateTime<Utc> {
        self.modified.unwrap_or(self.entry)
    }

    pub fn is_deleted(&self) -> bool {
        self.status == TaskStatus::Deleted
    }
}

/// Taskwarrior lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Completed,
    Deleted,
    Waiting,
    Recurring,
}

/// Taskwarrior priority level (`H`/`M`/`L`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskPriority {
    #[serde(rename = "H")]
    High,
    #[serde(rename = "M")]
    Medium,
    #[serde(rename = "L")]
    Low,
}

/// A timestamped annotation on a task.
///
/// `entry` is absent only for annotations recovered best-effort from a
/// malformed line in a remote description block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    #[serde(default, with = "tw_date_opt", skip_serializing_if = "Option::is_none")]
    pub entry: Option<DateTime<Utc>>,
    pub description: String,
}

/// Serde support for Taskwarrior's compact UTC timestamp format.
pub mod tw_date {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub const FORMAT: &str = "%Y%m%dT%H%M%SZ";

    pub fn format(dt: &DateTime<Utc>) -> String {
        dt.format(FORMAT).to_string()
    }

    pub fn parse(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
        NaiveDateTime::parse_from_str(s, FORMAT).map(|n| n.and_utc())
    }

    pub fn serialize<S>(dt: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format(dt))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse(&s).map_err(de::Error::custom)
    }
}

/// Like [`tw_date`] but for optional timestamps.
pub mod tw_date_opt {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S>(dt: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match dt {
            Some(dt) => serializer.serialize_str(&super::tw_date::format(dt)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            Some(s) => super::tw_date::parse(&s)
                .map(Some)
                .map_err(de::Error::custom),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_task_deserializes_from_export_json() {
        let json = r#"{
            "id": 3,
            "uuid": "a1b2c3d4-0000-0000-0000-000000000000",
            "description": "Buy milk",
            "status": "pending",
            "entry": "20250110T080000Z",
            "modified": "20250111T093000Z",
            "due": "20250115T120000Z",
            "project": "home",
            "priority": "H",
            "tags": ["errand"],
            "annotations": [{"entry": "20250110T081500Z", "description": "semi-skimmed"}],
            "caldav_uid": "remote-123",
            "urgency": 9.1
        }"#;

        let task: Task = serde_json::from_str(json).expect("Should parse export JSON");
        assert_eq!(task.description, "Buy milk");
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.priority, Some(TaskPriority::High));
        assert_eq!(task.entry, Utc.with_ymd_and_hms(2025, 1, 10, 8, 0, 0).unwrap());
        assert_eq!(task.tags, vec!["errand"]);
        assert_eq!(task.annotations.len(), 1);
        assert_eq!(task.caldav_uid.as_deref(), Some("remote-123"));
    }

    #[test]
    fn test_task_serializes_to_import_json() {
        let task = Task {
            uuid: "u-1".to_string(),
            description: "Water plants".to_string(),
            status: TaskStatus::Completed,
            entry: Utc.with_ymd_and_hms(2025, 2, 1, 9, 0, 0).unwrap(),
            modified: None,
            due: None,
            scheduled: None,
            end: Some(Utc.with_ymd_and_hms(2025, 2, 2, 9, 0, 0).unwrap()),
            priority: None,
            project: Some("home".to_string()),
            tags: Vec::new(),
            annotations: Vec::new(),
            caldav_uid: None,
        };

        let json = serde_json::to_string(&task).unwrap();
        assert!(json.contains(r#""entry":"20250201T090000Z""#), "Got: {json}");
        assert!(json.contains(r#""end":"20250202T090000Z""#), "Got: {json}");
        assert!(json.contains(r#""status":"completed""#), "Got: {json}");
        // Absent optionals must not appear as nulls in import JSON
        assert!(!json.contains("null"), "Got: {json}");
    }

    #[test]
    fn test_last_modified_falls_back_to_entry() {
        let entry = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        let task = Task {
            uuid: "u-2".to_string(),
            description: "x".to_string(),
            status: TaskStatus::Pending,
            entry,
            modified: None,
            due: None,
            scheduled: None,
            end: None,
            priority: None,
            project: None,
            tags: Vec::new(),
            annotations: Vec::new(),
            caldav_uid: None,
        };
        assert_eq!(task.last_modified(), entry);
    }
}

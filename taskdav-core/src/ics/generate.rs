//! ICS generation for VTODO items.

use chrono::{DateTime, Utc};
use icalendar::{Calendar, Component};

use crate::error::{TaskdavError, TaskdavResult};
use crate::todo::Todo;

const DATETIME_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// Generate a full VCALENDAR document containing one VTODO.
pub fn generate_ics(todo: &Todo) -> TaskdavResult<String> {
    if todo.uid.is_empty() {
        return Err(TaskdavError::IcsGenerate(
            "cannot generate a VTODO without a UID".into(),
        ));
    }

    let mut vtodo = icalendar::Todo::new();
    vtodo.uid(&todo.uid);
    vtodo.summary(&todo.summary);

    // DTSTAMP - required by RFC 5545
    let dtstamp = todo.last_modified.unwrap_or_else(Utc::now);
    vtodo.add_property("DTSTAMP", format_utc(&dtstamp));

    vtodo.add_property("STATUS", todo.status.as_ical());

    if let Some(ref description) = todo.description {
        vtodo.description(description);
    }

    if let Some(due) = todo.due {
        vtodo.add_property("DUE", format_utc(&due));
    }
    if let Some(start) = todo.start {
        vtodo.add_property("DTSTART", format_utc(&start));
    }
    if let Some(completed) = todo.completed {
        vtodo.add_property("COMPLETED", format_utc(&completed));
    }
    if let Some(created) = todo.created {
        vtodo.add_property("CREATED", format_utc(&created));
    }
    if let Some(last_modified) = todo.last_modified {
        vtodo.add_property("LAST-MODIFIED", format_utc(&last_modified));
    }

    if let Some(priority) = todo.priority {
        vtodo.add_property("PRIORITY", priority.to_string());
    }

    if !todo.categories.is_empty() {
        vtodo.add_property("CATEGORIES", todo.categories.join(","));
    }

    let mut cal = Calendar::new();
    cal.push(vtodo.done());
    let cal = cal.done();

    Ok(clean_ics(&cal.to_string()))
}

fn format_utc(dt: &DateTime<Utc>) -> String {
    dt.format(DATETIME_FORMAT).to_string()
}

/// Tidy the icalendar crate's output: our own PRODID, and no CALSCALE line
/// (GREGORIAN is the default).
fn clean_ics(ics: &str) -> String {
    let mut result = String::with_capacity(ics.len());

    for line in ics.lines() {
        if line.starts_with("PRODID:") {
            result.push_str("PRODID:-//taskdav//taskdav//EN\r\n");
            continue;
        }
        if line == "CALSCALE:GREGORIAN" {
            continue;
        }
        result.push_str(line);
        result.push_str("\r\n");
    }

    result
}

//! ICS parsing for VTODO items using the icalendar crate's parser.

use chrono::{DateTime, TimeZone, Utc};
use icalendar::{
    CalendarDateTime, DatePerhapsTime,
    parser::{read_calendar, unfold},
};
use tracing::warn;

use crate::todo::{Todo, TodoStatus};

/// Parse ICS content into a Todo. Returns None when the content holds no
/// usable VTODO (callers treat that as a per-item parse failure and skip).
pub fn parse_todo(content: &str) -> Option<Todo> {
    let unfolded = unfold(content);
    let calendar = read_calendar(&unfolded).ok()?;
    let vtodo = calendar.components.iter().find(|c| c.name == "VTODO")?;

    let uid = vtodo.find_prop("UID")?.val.to_string();
    let summary = vtodo
        .find_prop("SUMMARY")
        .map(|p| unescape_text(p.val.as_ref()))
        .unwrap_or_default();

    let status = vtodo
        .find_prop("STATUS")
        .map(|p| TodoStatus::from_ical(p.val.as_ref()))
        .unwrap_or(TodoStatus::NeedsAction);

    let description = vtodo
        .find_prop("DESCRIPTION")
        .map(|p| unescape_text(p.val.as_ref()));

    let due = parse_utc_prop(vtodo, "DUE");
    let start = parse_utc_prop(vtodo, "DTSTART");
    let completed = parse_utc_prop(vtodo, "COMPLETED");
    let created = parse_utc_prop(vtodo, "CREATED");
    let last_modified = parse_utc_prop(vtodo, "LAST-MODIFIED");

    // PRIORITY 0 means "undefined" per RFC 5545
    let priority = vtodo
        .find_prop("PRIORITY")
        .and_then(|p| p.val.as_ref().parse::<u8>().ok())
        .filter(|p| *p != 0);

    let categories: Vec<String> = vtodo
        .properties
        .iter()
        .filter(|p| p.name == "CATEGORIES")
        .flat_map(|p| {
            p.val
                .as_ref()
                .split(',')
                .map(|c| c.trim().to_string())
                .collect::<Vec<_>>()
        })
        .filter(|c| !c.is_empty())
        .collect();

    Some(Todo {
        uid,
        summary,
        status,
        description,
        due,
        start,
        completed,
        priority,
        categories,
        created,
        last_modified,
    })
}

fn parse_utc_prop(
    component: &icalendar::parser::Component<'_>,
    name: &str,
) -> Option<DateTime<Utc>> {
    let prop = component.find_prop(name)?;
    let dpt = DatePerhapsTime::try_from(prop).ok()?;
    to_utc(dpt, name)
}

/// Normalize any ICS date/time flavor to a UTC instant, so timestamps from
/// clients in different timezones compare correctly.
fn to_utc(dpt: DatePerhapsTime, prop: &str) -> Option<DateTime<Utc>> {
    match dpt {
        DatePerhapsTime::Date(d) => Some(d.and_hms_opt(0, 0, 0)?.and_utc()),
        DatePerhapsTime::DateTime(dt) => match dt {
            CalendarDateTime::Utc(dt) => Some(dt),
            CalendarDateTime::Floating(naive) => Some(naive.and_utc()),
            CalendarDateTime::WithTimezone { date_time, tzid } => {
                let Ok(tz) = tzid.parse::<chrono_tz::Tz>() else {
                    warn!(prop, tzid, "unknown TZID, treating value as UTC");
                    return Some(date_time.and_utc());
                };
                tz.from_local_datetime(&date_time)
                    .earliest()
                    .map(|dt| dt.with_timezone(&Utc))
            }
        },
    }
}

/// Undo RFC 5545 TEXT escaping. The icalendar parser hands property values
/// through verbatim, so embedded newlines arrive as literal `\n` sequences.
fn unescape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') | Some('N') => out.push('\n'),
            Some(',') => out.push(','),
            Some(';') => out.push(';'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_minimal_vtodo() {
        let ics = "BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
PRODID:TEST\r\n\
BEGIN:VTODO\r\n\
UID:todo-123\r\n\
SUMMARY:Buy milk\r\n\
STATUS:NEEDS-ACTION\r\n\
DUE:20250115T120000Z\r\n\
CATEGORIES:work,errand\r\n\
PRIORITY:5\r\n\
LAST-MODIFIED:20250111T093000Z\r\n\
END:VTODO\r\n\
END:VCALENDAR";

        let todo = parse_todo(ics).expect("Should parse");
        assert_eq!(todo.uid, "todo-123");
        assert_eq!(todo.summary, "Buy milk");
        assert_eq!(todo.status, TodoStatus::NeedsAction);
        assert_eq!(
            todo.due,
            Some(Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap())
        );
        assert_eq!(todo.categories, vec!["work", "errand"]);
        assert_eq!(todo.priority, Some(5));
        assert_eq!(
            todo.last_modified,
            Some(Utc.with_ymd_and_hms(2025, 1, 11, 9, 30, 0).unwrap())
        );
    }

    #[test]
    fn test_parse_zoned_due_normalizes_to_utc() {
        let ics = "BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
PRODID:TEST\r\n\
BEGIN:VTODO\r\n\
UID:todo-tz\r\n\
SUMMARY:Zoned\r\n\
DUE;TZID=Europe/Berlin:20250615T120000\r\n\
END:VTODO\r\n\
END:VCALENDAR";

        let todo = parse_todo(ics).expect("Should parse");
        // Berlin is UTC+2 in June
        assert_eq!(
            todo.due,
            Some(Utc.with_ymd_and_hms(2025, 6, 15, 10, 0, 0).unwrap()),
            "zoned timestamps must be compared as instants"
        );
    }

    #[test]
    fn test_parse_priority_zero_is_absent() {
        let ics = "BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
PRODID:TEST\r\n\
BEGIN:VTODO\r\n\
UID:todo-p0\r\n\
SUMMARY:No priority\r\n\
PRIORITY:0\r\n\
END:VTODO\r\n\
END:VCALENDAR";

        let todo = parse_todo(ics).expect("Should parse");
        assert_eq!(todo.priority, None, "PRIORITY:0 means undefined");
    }

    #[test]
    fn test_parse_unescapes_description_newlines() {
        let ics = "BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
PRODID:TEST\r\n\
BEGIN:VTODO\r\n\
UID:todo-desc\r\n\
SUMMARY:Escapes\r\n\
DESCRIPTION:line one\\nline two\\, with comma\r\n\
END:VTODO\r\n\
END:VCALENDAR";

        let todo = parse_todo(ics).expect("Should parse");
        assert_eq!(
            todo.description.as_deref(),
            Some("line one\nline two, with comma")
        );
    }

    #[test]
    fn test_parse_without_vtodo_returns_none() {
        let ics = "BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
PRODID:TEST\r\n\
BEGIN:VEVENT\r\n\
UID:ev-1\r\n\
SUMMARY:An event\r\n\
DTSTART:20250101T100000Z\r\n\
DTEND:20250101T110000Z\r\n\
END:VEVENT\r\n\
END:VCALENDAR";

        assert!(parse_todo(ics).is_none());
    }
}

//! Bidirectional field mapping between Taskwarrior tasks and CalDAV todos.
//!
//! Both directions are pure and total: a field that cannot be expressed on
//! the other side is dropped with a logged note, never an error. Neither
//! direction invents identifiers — a todo's UID comes from the task's
//! `caldav_uid` attribute when present and is otherwise left empty for the
//! remote store to assign on create.

use chrono::Utc;
use tracing::{debug, warn};

use crate::task::{Annotation, Task, TaskPriority, TaskStatus, tw_date};
use crate::todo::{Todo, TodoStatus};

/// Line separating the free-text description from the annotation block in a
/// todo's DESCRIPTION field.
pub const ANNOTATION_DELIMITER: &str = "--- TaskWarrior Annotations ---";

/// Map a task snapshot to the fields of its remote counterpart.
pub fn task_to_todo(task: &Task) -> Todo {
    let status = match task.status {
        TaskStatus::Pending | TaskStatus::Waiting | TaskStatus::Recurring => {
            TodoStatus::NeedsAction
        }
        TaskStatus::Completed => TodoStatus::Completed,
        TaskStatus::Deleted => TodoStatus::Cancelled,
    };

    let priority = task.priority.map(|p| match p {
        TaskPriority::High => 1,
        TaskPriority::Medium => 5,
        TaskPriority::Low => 9,
    });

    let mut tags = task.tags.clone();
    tags.sort();
    tags.dedup();
    let categories = match &task.project {
        Some(project) => {
            let mut cats = Vec::with_capacity(tags.len() + 1);
            cats.push(project.clone());
            cats.extend(tags);
            cats
        }
        None => tags,
    };

    // A task has no free-text body of its own (its one-line description maps
    // to SUMMARY), so the exported DESCRIPTION carries only the annotations.
    let encoded = encode_description("", &task.annotations);
    let description = if encoded.is_empty() { None } else { Some(encoded) };

    Todo {
        uid: task.caldav_uid.clone().unwrap_or_default(),
        summary: task.description.clone(),
        status,
        description,
        due: task.due,
        start: task.scheduled,
        completed: task.end,
        priority,
        categories,
        created: Some(task.entry),
        last_modified: Some(task.last_modified()),
    }
}

/// Map a todo snapshot to the fields of its local counterpart.
///
/// When `existing` is given (an update of an already-linked task), its uuid
/// and entry timestamp are preserved and incoming annotations are merged with
/// the existing ones instead of replacing them.
pub fn todo_to_task(todo: &Todo, existing: Option<&Task>) -> Task {
    let status = match todo.status {
        TodoStatus::NeedsAction => TaskStatus::Pending,
        TodoStatus::Completed => TaskStatus::Completed,
        TodoStatus::Cancelled => TaskStatus::Deleted,
    };

    let priority = todo.priority.map(|p| match p {
        1..=3 => TaskPriority::High,
        4..=6 => TaskPriority::Medium,
        _ => TaskPriority::Low,
    });

    // category[0] is the project by convention; an externally reordered
    // category list silently reassigns it.
    let project = todo.categories.first().cloned();
    let tags: Vec<String> = todo.categories.iter().skip(1).cloned().collect();

    let (free_text, incoming) = decode_description(todo.description.as_deref().unwrap_or(""));
    let description = if free_text.is_empty() {
        todo.summary.clone()
    } else {
        free_text
    };

    let annotations = match existing {
        Some(task) if !task.annotations.is_empty() => {
            merge_annotations(&task.annotations, &incoming)
        }
        _ => incoming,
    };

    let entry = existing
        .map(|t| t.entry)
        .or(todo.created)
        .unwrap_or_else(Utc::now);

    Task {
        uuid: existing.map(|t| t.uuid.clone()).unwrap_or_default(),
        description,
        status,
        entry,
        modified: todo.last_modified,
        due: todo.due,
        scheduled: todo.start,
        end: todo.completed,
        priority,
        project,
        tags,
        annotations,
        caldav_uid: Some(todo.uid.clone()),
    }
}

/// Encode a free-text description plus annotations into one DESCRIPTION
/// value.
///
/// Layout: the free text (if any), then the delimiter line, then one line per
/// annotation as `TIMESTAMP|text`. Annotations without a timestamp are
/// written verbatim. With no annotations the free text is returned alone.
pub fn encode_description(text: &str, annotations: &[Annotation]) -> String {
    if annotations.is_empty() {
        return text.to_string();
    }

    let mut lines = Vec::with_capacity(annotations.len() + 2);
    if !text.is_empty() {
        lines.push(text.to_string());
    }
    lines.push(ANNOTATION_DELIMITER.to_string());
    for annotation in annotations {
        match annotation.entry {
            Some(entry) => lines.push(format!(
                "{}|{}",
                tw_date::format(&entry),
                annotation.description
            )),
            None => lines.push(annotation.description.clone()),
        }
    }
    lines.join("\n")
}

/// Decode a DESCRIPTION value into (free text, annotations).
///
/// Lines after the delimiter that fail to parse as `TIMESTAMP|text` are
/// preserved as raw annotations without a timestamp, so a later encode
/// reproduces them byte-for-byte.
pub fn decode_description(description: &str) -> (String, Vec<Annotation>) {
    let lines: Vec<&str> = description.split('\n').collect();
    let Some(delimiter_idx) = lines.iter().position(|l| *l == ANNOTATION_DELIMITER) else {
        return (description.to_string(), Vec::new());
    };

    let text = lines[..delimiter_idx].join("\n");

    let mut annotations = Vec::new();
    for line in &lines[delimiter_idx + 1..] {
        if line.is_empty() {
            continue;
        }
        let parsed = line
            .split_once('|')
            .and_then(|(ts, rest)| tw_date::parse(ts).ok().map(|entry| (entry, rest)));
        match parsed {
            Some((entry, rest)) => annotations.push(Annotation {
                entry: Some(entry),
                description: rest.to_string(),
            }),
            None => {
                warn!(line, "annotation line has no parsable timestamp, keeping as-is");
                annotations.push(Annotation {
                    entry: None,
                    description: (*line).to_string(),
                });
            }
        }
    }

    (text, annotations)
}

/// Merge incoming annotations into an existing sequence, deduplicating by
/// (timestamp, text) so a round-tripped annotation is never added twice.
pub fn merge_annotations(existing: &[Annotation], incoming: &[Annotation]) -> Vec<Annotation> {
    let fingerprint = |a: &Annotation| {
        (
            a.entry.map(|e| tw_date::format(&e)).unwrap_or_default(),
            a.description.clone(),
        )
    };

    let seen: std::collections::HashSet<_> = existing.iter().map(fingerprint).collect();

    let mut merged = existing.to_vec();
    for annotation in incoming {
        if !seen.contains(&fingerprint(annotation)) {
            debug!(annotation = %annotation.description, "adding annotation from remote");
            merged.push(annotation.clone());
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn task(project: Option<&str>, tags: &[&str]) -> Task {
        Task {
            uuid: "local-1".to_string(),
            description: "Buy milk".to_string(),
            status: TaskStatus::Pending,
            entry: Utc.with_ymd_and_hms(2025, 1, 10, 8, 0, 0).unwrap(),
            modified: Some(Utc.with_ymd_and_hms(2025, 1, 11, 9, 30, 0).unwrap()),
            due: Some(Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap()),
            scheduled: None,
            end: None,
            priority: Some(TaskPriority::Medium),
            project: project.map(str::to_string),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            annotations: vec![Annotation {
                entry: Some(Utc.with_ymd_and_hms(2025, 1, 10, 8, 15, 0).unwrap()),
                description: "semi-skimmed".to_string(),
            }],
            caldav_uid: Some("remote-1".to_string()),
        }
    }

    #[test]
    fn test_status_maps_both_ways() {
        let mut t = task(Some("work"), &[]);
        for (local, remote) in [
            (TaskStatus::Pending, TodoStatus::NeedsAction),
            (TaskStatus::Completed, TodoStatus::Completed),
            (TaskStatus::Deleted, TodoStatus::Cancelled),
        ] {
            t.status = local;
            let todo = task_to_todo(&t);
            assert_eq!(todo.status, remote);
            assert_eq!(todo_to_task(&todo, None).status, local);
        }
    }

    #[test]
    fn test_waiting_and_recurring_export_as_needs_action() {
        let mut t = task(Some("work"), &[]);
        t.status = TaskStatus::Waiting;
        assert_eq!(task_to_todo(&t).status, TodoStatus::NeedsAction);
        t.status = TaskStatus::Recurring;
        assert_eq!(task_to_todo(&t).status, TodoStatus::NeedsAction);
    }

    #[test]
    fn test_priority_buckets() {
        let mut t = task(None, &[]);

        t.priority = Some(TaskPriority::High);
        assert_eq!(task_to_todo(&t).priority, Some(1));
        t.priority = Some(TaskPriority::Medium);
        assert_eq!(task_to_todo(&t).priority, Some(5));
        t.priority = Some(TaskPriority::Low);
        assert_eq!(task_to_todo(&t).priority, Some(9));

        let mut todo = task_to_todo(&t);
        for (remote, local) in [
            (2, TaskPriority::High),
            (4, TaskPriority::Medium),
            (6, TaskPriority::Medium),
            (7, TaskPriority::Low),
        ] {
            todo.priority = Some(remote);
            assert_eq!(
                todo_to_task(&todo, None).priority,
                Some(local),
                "priority {remote} should bucket to {local:?}"
            );
        }
    }

    #[test]
    fn test_absent_priority_stays_absent() {
        let mut t = task(None, &[]);
        t.priority = None;
        let todo = task_to_todo(&t);
        assert_eq!(todo.priority, None);
        assert_eq!(todo_to_task(&todo, None).priority, None);
    }

    #[test]
    fn test_categories_are_project_then_sorted_tags() {
        let t = task(Some("work"), &["zeta", "alpha"]);
        let todo = task_to_todo(&t);
        assert_eq!(todo.categories, vec!["work", "alpha", "zeta"]);
    }

    #[test]
    fn test_categories_without_project_are_sorted_tags_only() {
        let t = task(None, &["b", "a"]);
        let todo = task_to_todo(&t);
        assert_eq!(todo.categories, vec!["a", "b"]);
    }

    #[test]
    fn test_first_category_becomes_project_on_import() {
        let mut todo = task_to_todo(&task(Some("work"), &["errand"]));
        let back = todo_to_task(&todo, None);
        assert_eq!(back.project.as_deref(), Some("work"));
        assert_eq!(back.tags, vec!["errand"]);

        todo.categories.clear();
        let back = todo_to_task(&todo, None);
        assert_eq!(back.project, None, "empty categories should clear project");
        assert!(back.tags.is_empty(), "empty categories should clear tags");
    }

    #[test]
    fn test_absent_dates_stay_absent() {
        let mut t = task(Some("work"), &[]);
        t.due = None;
        t.scheduled = None;
        t.end = None;
        let todo = task_to_todo(&t);
        assert_eq!(todo.due, None);
        assert_eq!(todo.start, None);
        assert_eq!(todo.completed, None);
        let back = todo_to_task(&todo, None);
        assert_eq!(back.due, None);
        assert_eq!(back.scheduled, None);
        assert_eq!(back.end, None);
    }

    #[test]
    fn test_roundtrip_preserves_task_fields() {
        let t = task(Some("work"), &["errand", "shop"]);
        let back = todo_to_task(&task_to_todo(&t), None);

        assert_eq!(back.description, t.description);
        assert_eq!(back.status, t.status);
        assert_eq!(back.priority, t.priority);
        assert_eq!(back.due, t.due);
        assert_eq!(back.scheduled, t.scheduled);
        assert_eq!(back.end, t.end);
        assert_eq!(back.project, t.project);
        let tags: std::collections::BTreeSet<_> = back.tags.iter().collect();
        let expected: std::collections::BTreeSet<_> = t.tags.iter().collect();
        assert_eq!(tags, expected);
        assert_eq!(back.annotations, t.annotations);
        assert_eq!(back.entry, t.entry);
        assert_eq!(back.caldav_uid, t.caldav_uid);
    }

    #[test]
    fn test_encode_decode_roundtrips_annotations() {
        let annotations = vec![
            Annotation {
                entry: Some(Utc.with_ymd_and_hms(2025, 1, 10, 8, 15, 0).unwrap()),
                description: "first note".to_string(),
            },
            Annotation {
                entry: Some(Utc.with_ymd_and_hms(2025, 1, 11, 10, 0, 0).unwrap()),
                description: "with | a pipe".to_string(),
            },
            Annotation {
                entry: None,
                description: "raw line kept as-is".to_string(),
            },
        ];

        let encoded = encode_description("shopping notes", &annotations);
        let (text, decoded) = decode_description(&encoded);
        assert_eq!(text, "shopping notes");
        assert_eq!(decoded, annotations);
    }

    #[test]
    fn test_encode_of_decode_is_byte_identical() {
        let original = format!(
            "free text line\n{}\n20250110T081500Z|note one\nmalformed line\n20250111T100000Z|note two",
            ANNOTATION_DELIMITER
        );
        let (text, annotations) = decode_description(&original);
        assert_eq!(
            encode_description(&text, &annotations),
            original,
            "re-encoding a decoded description must be lossless"
        );
    }

    #[test]
    fn test_decode_without_delimiter_is_all_free_text() {
        let (text, annotations) = decode_description("just a plain description");
        assert_eq!(text, "just a plain description");
        assert!(annotations.is_empty());
    }

    #[test]
    fn test_empty_annotations_encode_to_bare_text() {
        assert_eq!(encode_description("hello", &[]), "hello");
        assert_eq!(encode_description("", &[]), "");
    }

    #[test]
    fn test_merge_annotations_skips_duplicates() {
        let a = Annotation {
            entry: Some(Utc.with_ymd_and_hms(2025, 1, 10, 8, 15, 0).unwrap()),
            description: "kept once".to_string(),
        };
        let b = Annotation {
            entry: Some(Utc.with_ymd_and_hms(2025, 1, 12, 9, 0, 0).unwrap()),
            description: "new from remote".to_string(),
        };

        let merged = merge_annotations(&[a.clone()], &[a.clone(), b.clone()]);
        assert_eq!(merged, vec![a, b]);
    }

    #[test]
    fn test_update_merges_annotations_from_existing_task() {
        let existing = task(Some("work"), &[]);
        let mut todo = task_to_todo(&existing);
        // Remote gained one extra annotation
        todo.description = Some(format!(
            "{}\n20250110T081500Z|semi-skimmed\n20250112T090000Z|added remotely",
            ANNOTATION_DELIMITER
        ));

        let updated = todo_to_task(&todo, Some(&existing));
        assert_eq!(updated.annotations.len(), 2, "no duplicate, one new");
        assert_eq!(updated.uuid, existing.uuid);
        assert_eq!(updated.entry, existing.entry);
    }

    #[test]
    fn test_remote_free_text_becomes_task_description() {
        let todo = Todo {
            uid: "r-9".to_string(),
            summary: "Summary".to_string(),
            status: TodoStatus::NeedsAction,
            description: Some("A longer body".to_string()),
            due: None,
            start: None,
            completed: None,
            priority: None,
            categories: Vec::new(),
            created: Some(Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap()),
            last_modified: None,
        };
        let t = todo_to_task(&todo, None);
        assert_eq!(t.description, "A longer body");

        let without_body = Todo {
            description: None,
            ..todo
        };
        let t = todo_to_task(&without_body, None);
        assert_eq!(t.description, "Summary");
    }

    #[test]
    fn test_mapper_never_invents_a_uid() {
        let mut t = task(Some("work"), &[]);
        t.caldav_uid = None;
        let todo = task_to_todo(&t);
        assert!(
            todo.uid.is_empty(),
            "uid must stay empty for the remote store to assign"
        );
    }
}

//! Correlation of local and remote snapshots.

use std::collections::HashMap;

use tracing::warn;

use crate::task::Task;
use crate::todo::Todo;

/// A correlated pair of records, joined on the task's `caldav_uid`.
///
/// The "neither side" shape cannot be constructed.
#[derive(Debug, Clone)]
pub enum TaskPair {
    LocalOnly(Task),
    RemoteOnly(Todo),
    Linked(Task, Todo),
}

impl TaskPair {
    pub fn task(&self) -> Option<&Task> {
        match self {
            TaskPair::LocalOnly(task) | TaskPair::Linked(task, _) => Some(task),
            TaskPair::RemoteOnly(_) => None,
        }
    }

    pub fn todo(&self) -> Option<&Todo> {
        match self {
            TaskPair::RemoteOnly(todo) | TaskPair::Linked(_, todo) => Some(todo),
            TaskPair::LocalOnly(_) => None,
        }
    }

    /// Short identifier for log lines.
    pub fn label(&self) -> String {
        match self {
            TaskPair::LocalOnly(task) => format!("task:{}", task.uuid),
            TaskPair::RemoteOnly(todo) => format!("todo:{}", todo.uid),
            TaskPair::Linked(task, todo) => format!("task:{} todo:{}", task.uuid, todo.uid),
        }
    }
}

/// Join the two snapshots for one mapping.
///
/// Single pass over the todos to build a uid index, single pass over the
/// tasks to consume it: O(n+m). A task whose `caldav_uid` matches no remote
/// todo degrades to local-only (the uid may be stale after an external remote
/// deletion, or the todo may live in another calendar).
pub fn correlate(tasks: Vec<Task>, todos: Vec<Todo>) -> Vec<TaskPair> {
    let mut index: HashMap<String, usize> = HashMap::with_capacity(todos.len());
    for (i, todo) in todos.iter().enumerate() {
        index.insert(todo.uid.clone(), i);
    }

    let mut slots: Vec<Option<Todo>> = todos.into_iter().map(Some).collect();
    let mut pairs = Vec::with_capacity(slots.len());

    for task in tasks {
        let matched = task
            .caldav_uid
            .as_ref()
            .and_then(|uid| index.get(uid))
            .and_then(|&i| slots[i].take());

        match matched {
            Some(todo) => pairs.push(TaskPair::Linked(task, todo)),
            None => {
                if let Some(uid) = &task.caldav_uid {
                    warn!(
                        task = %task.uuid,
                        caldav_uid = %uid,
                        "caldav_uid matches no remote todo, treating as local-only"
                    );
                }
                pairs.push(TaskPair::LocalOnly(task));
            }
        }
    }

    for todo in slots.into_iter().flatten() {
        pairs.push(TaskPair::RemoteOnly(todo));
    }

    pairs
}

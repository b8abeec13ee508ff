//! Change classification and last-write-wins conflict resolution.
//!
//! Classification is a pure function of the pair shape, both statuses, both
//! timestamps and the mapping configuration. No state from earlier runs is
//! consulted; there is none.

use chrono::TimeDelta;
use tracing::debug;

use crate::config::Mapping;
use crate::sync::pair::TaskPair;
use crate::task::Task;
use crate::todo::Todo;

/// Window within which two last-modified timestamps count as equal, to
/// absorb clock and precision skew between the stores. Without it a sync
/// round-trip of an unchanged record would itself look like a modification
/// and ping-pong forever.
pub const TIMESTAMP_TOLERANCE_SECS: i64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Exists only locally; create it remotely.
    NewLocal,
    /// Exists only remotely; create it locally.
    NewRemote,
    /// Both changed or local changed; local side is authoritative.
    LocalWins,
    /// Remote side is authoritative.
    RemoteWins,
    /// Local deletion to propagate to the remote store.
    DeletedLocal,
    /// Remote cancellation to propagate to the local store.
    DeletedRemote,
    Unchanged,
    /// Record lies outside the active project/calendar mapping.
    SkipUnmapped,
}

impl Classification {
    pub fn describe(&self) -> &'static str {
        match self {
            Classification::NewLocal => "new local task",
            Classification::NewRemote => "new remote todo",
            Classification::LocalWins => "modified, local wins",
            Classification::RemoteWins => "modified, remote wins",
            Classification::DeletedLocal => "deleted locally",
            Classification::DeletedRemote => "cancelled remotely",
            Classification::Unchanged => "unchanged",
            Classification::SkipUnmapped => "skipped (unmapped)",
        }
    }
}

/// Classify one correlated pair for the given mapping.
pub fn classify(pair: &TaskPair, mapping: &Mapping, propagate_deletions: bool) -> Classification {
    // Mapping membership comes before everything else. A `project:work`
    // filter also matches subprojects like `work.reports`, which have no
    // mapping of their own.
    if let Some(task) = pair.task()
        && task.project.as_deref() != Some(mapping.project.as_str())
    {
        return Classification::SkipUnmapped;
    }

    match pair {
        TaskPair::LocalOnly(task) => {
            if task.is_deleted() {
                // Terminal locally and never existed remotely
                Classification::Unchanged
            } else {
                Classification::NewLocal
            }
        }
        TaskPair::RemoteOnly(todo) => {
            if todo.is_cancelled() {
                // Nothing to create locally from a tombstone
                Classification::Unchanged
            } else {
                Classification::NewRemote
            }
        }
        TaskPair::Linked(task, todo) => {
            match (task.is_deleted(), todo.is_cancelled()) {
                (true, true) => Classification::Unchanged,
                (true, false) => {
                    if propagate_deletions {
                        Classification::DeletedLocal
                    } else {
                        debug!(pair = %pair.label(), "deletion propagation disabled, suppressing");
                        Classification::Unchanged
                    }
                }
                (false, true) => {
                    if propagate_deletions {
                        Classification::DeletedRemote
                    } else {
                        debug!(pair = %pair.label(), "deletion propagation disabled, suppressing");
                        Classification::Unchanged
                    }
                }
                (false, false) => resolve(task, todo),
            }
        }
    }
}

/// Whole-record last-write-wins. Per-field merging would need a three-way
/// diff against a common ancestor this stateless design does not have, so
/// the strictly newer side takes the entire record.
fn resolve(task: &Task, todo: &Todo) -> Classification {
    let local_ts = task.last_modified();
    let Some(remote_ts) = todo.last_modified() else {
        debug!(
            task = %task.uuid,
            todo = %todo.uid,
            local = %local_ts,
            "remote reports no timestamp, local wins"
        );
        return Classification::LocalWins;
    };

    let delta = local_ts.signed_duration_since(remote_ts);
    if delta.abs() <= TimeDelta::seconds(TIMESTAMP_TOLERANCE_SECS) {
        return Classification::Unchanged;
    }

    let winner = if delta > TimeDelta::zero() {
        Classification::LocalWins
    } else {
        Classification::RemoteWins
    };
    debug!(
        task = %task.uuid,
        todo = %todo.uid,
        local = %local_ts,
        remote = %remote_ts,
        winner = winner.describe(),
        "resolved conflict by last-write-wins"
    );
    winner
}

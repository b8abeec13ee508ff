//! Outcome counters for a sync run.

use std::fmt;

/// Aggregate counts of apply outcomes, per mapping or for a whole run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncStats {
    pub local_created: u64,
    pub local_updated: u64,
    pub local_deleted: u64,
    pub remote_created: u64,
    pub remote_updated: u64,
    pub remote_deleted: u64,
    pub unchanged: u64,
    pub skipped: u64,
    pub failed: u64,
}

impl SyncStats {
    pub fn merge(&mut self, other: &SyncStats) {
        self.local_created += other.local_created;
        self.local_updated += other.local_updated;
        self.local_deleted += other.local_deleted;
        self.remote_created += other.remote_created;
        self.remote_updated += other.remote_updated;
        self.remote_deleted += other.remote_deleted;
        self.unchanged += other.unchanged;
        self.skipped += other.skipped;
        self.failed += other.failed;
    }

    /// Number of apply-operations that changed something on either side.
    pub fn changes(&self) -> u64 {
        self.local_created
            + self.local_updated
            + self.local_deleted
            + self.remote_created
            + self.remote_updated
            + self.remote_deleted
    }
}

impl fmt::Display for SyncStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Taskwarrior: {} created, {} updated, {} deleted",
            self.local_created, self.local_updated, self.local_deleted
        )?;
        writeln!(
            f,
            "CalDAV: {} created, {} updated, {} deleted",
            self.remote_created, self.remote_updated, self.remote_deleted
        )?;
        write!(
            f,
            "Unchanged: {}  Skipped: {}  Failed: {}",
            self.unchanged, self.skipped, self.failed
        )
    }
}

//! Collaborator traits for the two task stores.
//!
//! The sync engine is generic over these, so tests can drive it against
//! in-memory stores while the binary wires in the Taskwarrior subprocess
//! client and the CalDAV HTTP client. Implementations must surface not-found
//! and transport/auth failures as errors, never as silent no-ops.

use crate::error::TaskdavResult;
use crate::task::Task;
use crate::todo::Todo;

/// The local task-manager store (Taskwarrior).
#[allow(async_fn_in_trait)]
pub trait LocalStore {
    /// Snapshot of all tasks in a project, across all lifecycle statuses.
    async fn list(&self, project: &str) -> TaskdavResult<Vec<Task>>;

    /// Create a task and return its local identifier (uuid).
    async fn create(&self, task: &Task) -> TaskdavResult<String>;

    /// Replace the task identified by `uuid` with the given fields.
    async fn update(&self, uuid: &str, task: &Task) -> TaskdavResult<()>;

    async fn delete(&self, uuid: &str) -> TaskdavResult<()>;
}

/// The remote calendar store (CalDAV VTODO collection).
#[allow(async_fn_in_trait)]
pub trait RemoteStore {
    /// Snapshot of all todos in a calendar, including completed and
    /// cancelled ones.
    async fn list(&self, calendar: &str) -> TaskdavResult<Vec<Todo>>;

    /// Create a todo and return its server-side identifier (UID). When the
    /// given todo carries no UID the store assigns one.
    async fn create(&self, calendar: &str, todo: &Todo) -> TaskdavResult<String>;

    async fn update(&self, calendar: &str, uid: &str, todo: &Todo) -> TaskdavResult<()>;

    async fn delete(&self, calendar: &str, uid: &str) -> TaskdavResult<()>;
}

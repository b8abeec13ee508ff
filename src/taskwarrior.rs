//! Taskwarrior subprocess client.
//!
//! Drives the `task` binary over stdin/stdout: snapshots come from
//! `task ... export` (JSON), creates and updates go through `task import`
//! (which accepts pre-assigned uuids and replaces whole records), deletions
//! through `task <uuid> delete`.

use std::path::PathBuf;
use std::process::Stdio;

use taskdav_core::error::{TaskdavError, TaskdavResult};
use taskdav_core::store::LocalStore;
use taskdav_core::task::Task;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};
use uuid::Uuid;

/// UDA that must be configured in `.taskrc` before syncing.
pub const CALDAV_UID_UDA: &str = "caldav_uid";

pub struct TaskWarrior {
    binary_path: PathBuf,
    data_location: Option<String>,
}

impl TaskWarrior {
    /// Locate the `task` binary (overridable via config) and capture the
    /// data-location override, if any.
    pub fn new(task_bin: Option<&str>, data_location: Option<String>) -> TaskdavResult<Self> {
        let name = task_bin.unwrap_or("task");
        let binary_path = which::which(name)
            .map_err(|_| TaskdavError::TaskwarriorNotInstalled(name.to_string()))?;

        let data_location = data_location.or_else(|| std::env::var("TASKDATA").ok());

        Ok(TaskWarrior {
            binary_path,
            data_location,
        })
    }

    /// Fail unless the `caldav_uid` UDA is configured. Without it Taskwarrior
    /// would drop the foreign identifier on import and every run would
    /// re-create every todo.
    pub async fn check_uda(&self) -> TaskdavResult<()> {
        let output = self.run(&["udas".to_string()], None).await?;
        if output.contains(CALDAV_UID_UDA) {
            return Ok(());
        }
        Err(TaskdavError::Taskwarrior(format!(
            "required UDA '{CALDAV_UID_UDA}' is not configured.\n\n\
             Add the following to your ~/.taskrc:\n\n  \
             uda.{CALDAV_UID_UDA}.type=string\n  \
             uda.{CALDAV_UID_UDA}.label=CalDAV UID\n\n\
             Then run 'task udas' to verify."
        )))
    }

    /// Export tasks matching the given filter arguments.
    pub async fn export(&self, filter: &[String]) -> TaskdavResult<Vec<Task>> {
        let mut args = filter.to_vec();
        args.push("export".to_string());

        let output = self.run(&args, None).await?;
        if output.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&output).map_err(|e| {
            TaskdavError::Taskwarrior(format!("failed to parse export JSON: {e}"))
        })
    }

    /// Import (create or replace) tasks from JSON on stdin.
    pub async fn import(&self, tasks: &[Task]) -> TaskdavResult<()> {
        if tasks.is_empty() {
            return Ok(());
        }

        // Annotations recovered without a timestamp cannot be represented in
        // import JSON; stamp them with the task's entry time.
        let patched: Vec<Task> = tasks
            .iter()
            .map(|task| {
                let mut task = task.clone();
                for annotation in &mut task.annotations {
                    if annotation.entry.is_none() {
                        annotation.entry = Some(task.entry);
                    }
                }
                task
            })
            .collect();

        let json = serde_json::to_string(&patched)
            .map_err(|e| TaskdavError::Serialization(e.to_string()))?;

        debug!(count = patched.len(), "importing tasks");
        self.run(&["import".to_string()], Some(&json)).await?;
        Ok(())
    }

    /// Remove the `caldav_uid` UDA from a task.
    pub async fn clear_caldav_uid(&self, uuid: &str) -> TaskdavResult<()> {
        self.run(
            &[
                uuid.to_string(),
                "modify".to_string(),
                format!("{CALDAV_UID_UDA}:"),
            ],
            None,
        )
        .await?;
        info!(task = uuid, "cleared {}", CALDAV_UID_UDA);
        Ok(())
    }

    /// Run a `task` command and collect stdout. Nonzero exit becomes a typed
    /// error carrying stderr.
    async fn run(&self, args: &[String], stdin_data: Option<&str>) -> TaskdavResult<String> {
        let mut full_args = vec!["rc.confirmation=off".to_string()];
        if let Some(location) = &self.data_location {
            full_args.push(format!("rc.data.location={location}"));
        }
        full_args.extend(args.iter().cloned());

        debug!(binary = %self.binary_path.display(), args = ?full_args, "running task");

        let mut child = Command::new(&self.binary_path)
            .args(&full_args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                TaskdavError::Taskwarrior(format!(
                    "failed to spawn {}: {e}",
                    self.binary_path.display()
                ))
            })?;

        if let Some(data) = stdin_data {
            // unwrap safe: stdin was piped above
            let mut stdin = child.stdin.take().unwrap();
            stdin.write_all(data.as_bytes()).await?;
        } else {
            drop(child.stdin.take());
        }

        let output = child.wait_with_output().await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TaskdavError::Taskwarrior(format!(
                "task exited with status {}: {}",
                output.status.code().unwrap_or(-1),
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl LocalStore for TaskWarrior {
    async fn list(&self, project: &str) -> TaskdavResult<Vec<Task>> {
        // No status filter: completed and deleted tasks are part of the
        // snapshot, deletions would be invisible otherwise.
        self.export(&[format!("project:{project}")]).await
    }

    async fn create(&self, task: &Task) -> TaskdavResult<String> {
        let mut task = task.clone();
        if task.uuid.is_empty() {
            task.uuid = Uuid::new_v4().to_string();
        }
        let uuid = task.uuid.clone();
        self.import(std::slice::from_ref(&task)).await?;
        Ok(uuid)
    }

    async fn update(&self, uuid: &str, task: &Task) -> TaskdavResult<()> {
        let mut task = task.clone();
        task.uuid = uuid.to_string();
        self.import(std::slice::from_ref(&task)).await
    }

    async fn delete(&self, uuid: &str) -> TaskdavResult<()> {
        self.run(&[uuid.to_string(), "delete".to_string()], None)
            .await?;
        Ok(())
    }
}

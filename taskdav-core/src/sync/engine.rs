//! The sync executor.
//!
//! Processes one mapping at a time: load both snapshots, correlate, classify
//! every pair, then apply the resulting create/update/delete operations.
//! A failing list aborts the run (nothing useful can be decided without a
//! snapshot); a failing apply is isolated to its record, counted, and the
//! remaining records still get processed.

use tracing::{debug, info, warn};

use crate::config::{Config, Mapping};
use crate::error::TaskdavResult;
use crate::mapper;
use crate::store::{LocalStore, RemoteStore};
use crate::sync::classify::{Classification, classify};
use crate::sync::pair::{TaskPair, correlate};
use crate::sync::stats::SyncStats;
use crate::task::Task;
use crate::todo::Todo;

pub struct SyncEngine<'a, L, R> {
    config: &'a Config,
    local: &'a L,
    remote: &'a R,
    dry_run: bool,
}

impl<'a, L: LocalStore, R: RemoteStore> SyncEngine<'a, L, R> {
    pub fn new(config: &'a Config, local: &'a L, remote: &'a R, dry_run: bool) -> Self {
        SyncEngine {
            config,
            local,
            remote,
            dry_run,
        }
    }

    /// Sync every configured mapping in order and return aggregate stats.
    pub async fn sync(&self) -> TaskdavResult<SyncStats> {
        let mut total = SyncStats::default();
        for mapping in &self.config.mappings {
            let stats = self.sync_mapping(mapping).await?;
            total.merge(&stats);
        }
        Ok(total)
    }

    /// Sync a single project/calendar mapping.
    pub async fn sync_mapping(&self, mapping: &Mapping) -> TaskdavResult<SyncStats> {
        let tasks = self.local.list(&mapping.project).await?;
        let todos = self.remote.list(&mapping.calendar).await?;
        info!(
            project = %mapping.project,
            calendar = %mapping.calendar,
            tasks = tasks.len(),
            todos = todos.len(),
            "loaded snapshots"
        );

        let propagate = self.config.sync.propagate_deletions;
        let mut stats = SyncStats::default();

        for pair in correlate(tasks, todos) {
            let classification = classify(&pair, mapping, propagate);
            debug!(pair = %pair.label(), "{}", classification.describe());

            if let Err(e) = self.apply(&pair, classification, mapping, &mut stats).await {
                warn!(
                    pair = %pair.label(),
                    error = %e,
                    "failed to apply '{}', continuing with remaining records",
                    classification.describe()
                );
                stats.failed += 1;
            }
        }

        Ok(stats)
    }

    async fn apply(
        &self,
        pair: &TaskPair,
        classification: Classification,
        mapping: &Mapping,
        stats: &mut SyncStats,
    ) -> TaskdavResult<()> {
        match (classification, pair) {
            (Classification::Unchanged, _) => stats.unchanged += 1,
            (Classification::SkipUnmapped, _) => {
                warn!(pair = %pair.label(), "outside the active mapping, skipping");
                stats.skipped += 1;
            }
            (Classification::NewLocal, TaskPair::LocalOnly(task)) => {
                self.create_remote(task, mapping, stats).await?;
            }
            (Classification::NewRemote, TaskPair::RemoteOnly(todo)) => {
                self.create_local(todo, mapping, stats).await?;
            }
            (Classification::LocalWins, TaskPair::Linked(task, todo)) => {
                self.update_remote(task, todo, mapping, stats).await?;
            }
            (Classification::RemoteWins, TaskPair::Linked(task, todo)) => {
                self.update_local(task, todo, mapping, stats).await?;
            }
            (Classification::DeletedLocal, TaskPair::Linked(_, todo)) => {
                self.delete_remote(todo, mapping, stats).await?;
            }
            (Classification::DeletedRemote, TaskPair::Linked(task, _)) => {
                self.delete_local(task, stats).await?;
            }
            // classify never pairs these classifications with these shapes
            (classification, pair) => {
                debug!(pair = %pair.label(), ?classification, "no operation for pair shape");
                stats.unchanged += 1;
            }
        }
        Ok(())
    }

    async fn create_remote(
        &self,
        task: &Task,
        mapping: &Mapping,
        stats: &mut SyncStats,
    ) -> TaskdavResult<()> {
        let todo = mapper::task_to_todo(task);
        if self.dry_run {
            info!(
                task = %task.uuid,
                calendar = %mapping.calendar,
                "dry-run: would create todo"
            );
        } else {
            let uid = self.remote.create(&mapping.calendar, &todo).await?;
            // Write the assigned uid back immediately; later pairs in this
            // run and every later run correlate through it.
            let mut linked = task.clone();
            linked.caldav_uid = Some(uid.clone());
            self.local.update(&task.uuid, &linked).await?;
            info!(task = %task.uuid, uid = %uid, calendar = %mapping.calendar, "created todo");
        }
        stats.remote_created += 1;
        Ok(())
    }

    async fn create_local(
        &self,
        todo: &Todo,
        mapping: &Mapping,
        stats: &mut SyncStats,
    ) -> TaskdavResult<()> {
        let mut task = mapper::todo_to_task(todo, None);
        if task.project.is_none() {
            task.project = Some(mapping.project.clone());
        }
        if self.dry_run {
            info!(todo = %todo.uid, project = ?task.project, "dry-run: would create task");
        } else {
            let uuid = self.local.create(&task).await?;
            info!(todo = %todo.uid, task = %uuid, "created task");
        }
        stats.local_created += 1;
        Ok(())
    }

    async fn update_remote(
        &self,
        task: &Task,
        todo: &Todo,
        mapping: &Mapping,
        stats: &mut SyncStats,
    ) -> TaskdavResult<()> {
        let mut updated = mapper::task_to_todo(task);
        updated.uid = todo.uid.clone();
        if self.dry_run {
            info!(todo = %todo.uid, "dry-run: would update todo from task {}", task.uuid);
        } else {
            self.remote
                .update(&mapping.calendar, &todo.uid, &updated)
                .await?;
            info!(todo = %todo.uid, task = %task.uuid, "updated todo");
        }
        stats.remote_updated += 1;
        Ok(())
    }

    async fn update_local(
        &self,
        task: &Task,
        todo: &Todo,
        mapping: &Mapping,
        stats: &mut SyncStats,
    ) -> TaskdavResult<()> {
        let mut updated = mapper::todo_to_task(todo, Some(task));
        if updated.project.is_none() {
            updated.project = Some(mapping.project.clone());
        }
        if self.dry_run {
            info!(task = %task.uuid, "dry-run: would update task from todo {}", todo.uid);
        } else {
            self.local.update(&task.uuid, &updated).await?;
            info!(task = %task.uuid, todo = %todo.uid, "updated task");
        }
        stats.local_updated += 1;
        Ok(())
    }

    async fn delete_remote(
        &self,
        todo: &Todo,
        mapping: &Mapping,
        stats: &mut SyncStats,
    ) -> TaskdavResult<()> {
        if self.dry_run {
            info!(todo = %todo.uid, "dry-run: would delete todo");
        } else {
            self.remote.delete(&mapping.calendar, &todo.uid).await?;
            info!(todo = %todo.uid, "deleted todo");
        }
        stats.remote_deleted += 1;
        Ok(())
    }

    async fn delete_local(&self, task: &Task, stats: &mut SyncStats) -> TaskdavResult<()> {
        if self.dry_run {
            info!(task = %task.uuid, "dry-run: would delete task");
        } else {
            self.local.delete(&task.uuid).await?;
            info!(task = %task.uuid, "deleted task");
        }
        stats.local_deleted += 1;
        Ok(())
    }
}

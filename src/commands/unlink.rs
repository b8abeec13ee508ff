use std::path::Path;
use std::process::ExitCode;

use anyhow::Result;
use dialoguer::Confirm;
use owo_colors::OwoColorize;
use taskdav_core::config::Config;
use tracing::info;

use crate::taskwarrior::{CALDAV_UID_UDA, TaskWarrior};

pub struct UnlinkArgs {
    pub project: Option<String>,
    pub yes: bool,
    pub dry_run: bool,
}

/// Strip the `caldav_uid` UDA from tasks, detaching them from their remote
/// counterparts without deleting anything on either side.
pub async fn run(config_path: Option<&Path>, args: UnlinkArgs) -> Result<ExitCode> {
    // Load for validation only; unlink never talks to the server
    let config = match config_path {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    let taskwarrior = TaskWarrior::new(
        config.taskwarrior.task_bin.as_deref(),
        config.taskwarrior_data_location(),
    )?;
    taskwarrior.check_uda().await?;

    let mut filter = vec![format!("{CALDAV_UID_UDA}.any:")];
    if let Some(project) = &args.project {
        filter.push(format!("project:{project}"));
    }

    let tasks = taskwarrior.export(&filter).await?;
    if tasks.is_empty() {
        match &args.project {
            Some(project) => println!("No linked tasks found in project '{project}'"),
            None => println!("No linked tasks found"),
        }
        return Ok(ExitCode::SUCCESS);
    }

    println!("Found {} linked task(s):", tasks.len());
    for task in &tasks {
        println!(
            "  - [{}] {} {}",
            task.project.as_deref().unwrap_or("(no project)"),
            task.description,
            format!("({})", task.caldav_uid.as_deref().unwrap_or("")).dimmed()
        );
    }

    if args.dry_run {
        println!("\n{}", format!("Would unlink {} task(s)", tasks.len()).yellow());
        return Ok(ExitCode::SUCCESS);
    }

    if !args.yes {
        let confirmed = Confirm::new()
            .with_prompt(format!("Remove {CALDAV_UID_UDA} from these tasks?"))
            .default(false)
            .interact()?;
        if !confirmed {
            println!("Cancelled");
            return Ok(ExitCode::SUCCESS);
        }
    }

    for task in &tasks {
        taskwarrior.clear_caldav_uid(&task.uuid).await?;
    }
    info!(count = tasks.len(), "unlinked tasks");
    println!("Unlinked {} task(s)", tasks.len());

    Ok(ExitCode::SUCCESS)
}

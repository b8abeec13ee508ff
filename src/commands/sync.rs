use std::path::Path;
use std::process::ExitCode;

use anyhow::Result;
use owo_colors::OwoColorize;
use taskdav_core::config::Config;
use taskdav_core::sync::{SyncEngine, SyncStats};
use tracing::info;

use crate::caldav::CaldavClient;
use crate::render::{Render, spinner};
use crate::taskwarrior::TaskWarrior;

pub struct SyncArgs {
    pub dry_run: bool,
    pub propagate_deletions: bool,
    pub keep_deletions: bool,
}

pub async fn run(config_path: Option<&Path>, args: SyncArgs) -> Result<ExitCode> {
    let mut config = match config_path {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    // Command-line overrides for the deletion policy
    if args.propagate_deletions {
        config.sync.propagate_deletions = true;
        info!("deletion propagation enabled via command line");
    } else if args.keep_deletions {
        config.sync.propagate_deletions = false;
        info!("deletion propagation disabled via command line");
    }

    if args.dry_run {
        println!("{}", "Dry run: no changes will be made".yellow());
    }

    let taskwarrior = TaskWarrior::new(
        config.taskwarrior.task_bin.as_deref(),
        config.taskwarrior_data_location(),
    )?;
    taskwarrior.check_uda().await?;

    let caldav = CaldavClient::new(&config.caldav)?;

    let engine = SyncEngine::new(&config, &taskwarrior, &caldav, args.dry_run);

    let mut total = SyncStats::default();
    for (i, mapping) in config.mappings.iter().enumerate() {
        let bar = spinner(mapping.render());
        let result = engine.sync_mapping(mapping).await;
        bar.finish_and_clear();

        println!("{}", mapping.render());
        // A failing snapshot load is fatal: nothing can be decided without it
        let stats = result?;
        println!("{}", stats.render());
        total.merge(&stats);

        if i < config.mappings.len() - 1 {
            println!();
        }
    }

    println!("\n{total}");

    if total.failed > 0 {
        eprintln!(
            "{}",
            format!("Sync completed with {} failed record(s)", total.failed).red()
        );
        return Ok(ExitCode::FAILURE);
    }

    Ok(ExitCode::SUCCESS)
}

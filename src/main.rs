mod caldav;
mod commands;
mod render;
mod taskwarrior;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "taskdav")]
#[command(about = "Bidirectional sync between Taskwarrior and CalDAV task lists")]
#[command(version)]
struct Cli {
    /// Enable verbose output (debug level)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file (default: ~/.config/taskdav/config.toml)
    #[arg(short, long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Synchronize Taskwarrior and CalDAV
    Sync {
        /// Perform a trial run with no changes made
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Propagate deletions between the stores (overrides config)
        #[arg(long, conflicts_with = "keep_deletions")]
        propagate_deletions: bool,

        /// Never propagate deletions (overrides config)
        #[arg(long)]
        keep_deletions: bool,
    },
    /// Remove the CalDAV link from Taskwarrior tasks
    Unlink {
        /// Only unlink tasks in this project
        #[arg(long)]
        project: Option<String>,

        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,

        /// Show what would be unlinked without making changes
        #[arg(short = 'n', long)]
        dry_run: bool,
    },
    /// Test the CalDAV connection and list calendars
    Check,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Sync {
            dry_run,
            propagate_deletions,
            keep_deletions,
        } => {
            commands::sync::run(
                config_path,
                commands::sync::SyncArgs {
                    dry_run,
                    propagate_deletions,
                    keep_deletions,
                },
            )
            .await
        }
        Commands::Unlink {
            project,
            yes,
            dry_run,
        } => {
            commands::unlink::run(
                config_path,
                commands::unlink::UnlinkArgs {
                    project,
                    yes,
                    dry_run,
                },
            )
            .await
        }
        Commands::Check => commands::check::run(config_path).await,
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "taskdav=debug,taskdav_cli=debug,taskdav_core=debug"
    } else {
        "taskdav=info,taskdav_cli=info,taskdav_core=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

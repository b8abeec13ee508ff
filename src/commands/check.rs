use std::path::Path;
use std::process::ExitCode;

use anyhow::Result;
use owo_colors::OwoColorize;
use taskdav_core::config::Config;

use crate::caldav::CaldavClient;
use crate::render::spinner;

/// Test the CalDAV connection and show how server calendars line up with the
/// configured mappings.
pub async fn run(config_path: Option<&Path>) -> Result<ExitCode> {
    let config = match config_path {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    let caldav = CaldavClient::new(&config.caldav)?;

    let bar = spinner(format!("Connecting to {}", config.caldav.url));
    let result = caldav.list_calendars().await;
    bar.finish_and_clear();

    let calendars = result?;
    println!("Connected to {}", config.caldav.url.bold());
    println!("Logged in as {}\n", config.caldav.username);

    if calendars.is_empty() {
        println!("{}", "No calendars found on the server".yellow());
    } else {
        println!("Found {} calendar(s):", calendars.len());
        for calendar in &calendars {
            let name = calendar.display_name.as_deref().unwrap_or(&calendar.id);
            let mapped = config
                .project_for_calendar(&calendar.id)
                .map(|project| format!(" ← project '{project}'").green().to_string())
                .unwrap_or_default();
            let todos = if calendar.supports_todos {
                String::new()
            } else {
                " (no VTODO support)".red().to_string()
            };
            println!("  - {} [{}]{}{}", name, calendar.id, mapped, todos);
        }
    }

    println!("\nConfigured mappings:");
    for mapping in &config.mappings {
        let missing = if calendars.iter().any(|c| c.id == mapping.calendar) {
            String::new()
        } else {
            " (not on server)".red().to_string()
        };
        println!("  {} → {}{}", mapping.project, mapping.calendar, missing);
    }

    Ok(ExitCode::SUCCESS)
}

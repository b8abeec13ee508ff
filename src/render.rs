//! Terminal rendering for sync output.
//!
//! Extension traits adding colored rendering to taskdav-core types, plus the
//! progress spinner used while snapshots load.

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use taskdav_core::config::Mapping;
use taskdav_core::sync::SyncStats;

pub trait Render {
    fn render(&self) -> String;
}

impl Render for Mapping {
    fn render(&self) -> String {
        format!("{} ⇄ {}", self.project.bold(), self.calendar)
    }
}

impl Render for SyncStats {
    fn render(&self) -> String {
        if self.changes() == 0 && self.failed == 0 {
            let mut line = format!("   No changes ({} unchanged)", self.unchanged);
            if self.skipped > 0 {
                line.push_str(&format!(", {} skipped", self.skipped));
            }
            return line.dimmed().to_string();
        }

        let mut parts = Vec::new();
        push_count(&mut parts, "created", self.local_created + self.remote_created, Kind::Create);
        push_count(&mut parts, "updated", self.local_updated + self.remote_updated, Kind::Update);
        push_count(&mut parts, "deleted", self.local_deleted + self.remote_deleted, Kind::Delete);
        if self.skipped > 0 {
            parts.push(format!("{} skipped", self.skipped).dimmed().to_string());
        }
        if self.failed > 0 {
            parts.push(format!("{} failed", self.failed).red().bold().to_string());
        }

        format!("   {}", parts.join(", "))
    }
}

enum Kind {
    Create,
    Update,
    Delete,
}

fn push_count(parts: &mut Vec<String>, label: &str, count: u64, kind: Kind) {
    if count == 0 {
        return;
    }
    let text = format!("{count} {label}");
    let colored = match kind {
        Kind::Create => text.green().to_string(),
        Kind::Update => text.yellow().to_string(),
        Kind::Delete => text.red().to_string(),
    };
    parts.push(colored);
}

pub fn spinner(message: String) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::default_spinner()
            .tick_strings(&["   ", ".  ", ".. ", "..."])
            .template("{msg}{spinner}")
            .unwrap(),
    );
    bar.set_message(message);
    bar.enable_steady_tick(std::time::Duration::from_millis(150));
    bar
}

//! Configuration loading for taskdav.
//!
//! The configuration lives at `~/.config/taskdav/config.toml`:
//!
//! ```toml
//! [caldav]
//! url = "https://dav.example.com/calendars/alice/"
//! username = "alice"
//! password = "app-password"
//!
//! [[mappings]]
//! project = "work"
//! calendar = "work-calendar"
//!
//! [sync]
//! propagate_deletions = false
//! ```
//!
//! Everything is read once at run start and is immutable for the run.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{TaskdavError, TaskdavResult};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub caldav: CaldavConfig,
    pub mappings: Vec<Mapping>,
    #[serde(default)]
    pub sync: SyncOptions,
    #[serde(default)]
    pub taskwarrior: TaskwarriorConfig,
}

/// CalDAV server credentials. `url` points at the calendar home collection;
/// calendar ids from mappings are resolved relative to it.
#[derive(Debug, Clone, Deserialize)]
pub struct CaldavConfig {
    pub url: String,
    pub username: String,
    pub password: String,
}

/// One unit of sync scope: a Taskwarrior project paired with a CalDAV
/// calendar.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Mapping {
    pub project: String,
    pub calendar: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SyncOptions {
    /// When false, a deletion observed on one side is never applied to the
    /// other.
    #[serde(default)]
    pub propagate_deletions: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskwarriorConfig {
    /// Override for the `task` binary name/path.
    pub task_bin: Option<String>,
    /// Override for the Taskwarrior data directory (`rc.data.location`).
    /// Supports `~` expansion.
    pub data_location: Option<String>,
}

impl Config {
    pub fn config_path() -> TaskdavResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| TaskdavError::Config("Could not determine config directory".into()))?
            .join("taskdav");

        Ok(config_dir.join("config.toml"))
    }

    /// Load from the default location.
    pub fn load() -> TaskdavResult<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load and validate a configuration file.
    pub fn load_from(path: &Path) -> TaskdavResult<Self> {
        if !path.exists() {
            return Err(TaskdavError::Config(format!(
                "Configuration file not found: {}\n\
                 Create it with a [caldav] section and at least one [[mappings]] entry.",
                path.display()
            )));
        }

        let config: Config = config::Config::builder()
            .add_source(config::File::from(path.to_path_buf()))
            .build()
            .map_err(|e| TaskdavError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| TaskdavError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> TaskdavResult<()> {
        if self.caldav.url.is_empty() {
            return Err(TaskdavError::Config("[caldav] url must not be empty".into()));
        }
        if self.mappings.is_empty() {
            return Err(TaskdavError::Config(
                "[[mappings]] must contain at least one project/calendar entry".into(),
            ));
        }
        for (idx, mapping) in self.mappings.iter().enumerate() {
            if mapping.project.is_empty() || mapping.calendar.is_empty() {
                return Err(TaskdavError::Config(format!(
                    "mapping {} must set both project and calendar",
                    idx + 1
                )));
            }
        }
        Ok(())
    }

    /// Expanded Taskwarrior data location, if configured.
    pub fn taskwarrior_data_location(&self) -> Option<String> {
        self.taskwarrior
            .data_location
            .as_deref()
            .map(|p| shellexpand::tilde(p).into_owned())
    }

    pub fn calendar_for_project(&self, project: &str) -> Option<&str> {
        self.mappings
            .iter()
            .find(|m| m.project == project)
            .map(|m| m.calendar.as_str())
    }

    pub fn project_for_calendar(&self, calendar: &str) -> Option<&str> {
        self.mappings
            .iter()
            .find(|m| m.calendar == calendar)
            .map(|m| m.project.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_str: &str) -> Config {
        toml::from_str(toml_str).expect("Should parse config TOML")
    }

    #[test]
    fn test_parse_full_config() {
        let config = parse(
            r#"
            [caldav]
            url = "https://dav.example.com/cal/"
            username = "alice"
            password = "secret"

            [[mappings]]
            project = "work"
            calendar = "work-calendar"

            [[mappings]]
            project = "home"
            calendar = "home-calendar"

            [sync]
            propagate_deletions = true
            "#,
        );

        assert_eq!(config.mappings.len(), 2);
        assert!(config.sync.propagate_deletions);
        assert_eq!(config.calendar_for_project("work"), Some("work-calendar"));
        assert_eq!(config.project_for_calendar("home-calendar"), Some("home"));
        assert_eq!(config.calendar_for_project("unknown"), None);
    }

    #[test]
    fn test_sync_section_is_optional_and_defaults_off() {
        let config = parse(
            r#"
            [caldav]
            url = "https://dav.example.com/cal/"
            username = "alice"
            password = "secret"

            [[mappings]]
            project = "work"
            calendar = "work-calendar"
            "#,
        );

        assert!(!config.sync.propagate_deletions);
    }

    #[test]
    fn test_validate_rejects_empty_mappings() {
        let config = parse(
            r#"
            [caldav]
            url = "https://dav.example.com/cal/"
            username = "alice"
            password = "secret"

            mappings = []
            "#,
        );
        assert!(config.validate().is_err());
    }
}

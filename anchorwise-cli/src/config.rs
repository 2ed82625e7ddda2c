use anyhow::{Context, Result};
use anchorwise_core::{
    DEFAULT_DAYS_AHEAD, DEFAULT_TASK_DURATION_MINUTES, DEFAULT_TASK_MINUTES, ReminderPolicy, parse_timezone,
};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::state::ensure_anchorwise_home;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub user_id: String,
    pub timezone: String,
    /// Checked in this order; availability output keeps it.
    pub anchors: Vec<String>,
    pub availability: AvailabilitySection,
    pub slots: SlotsSection,
    pub calendar: CalendarSection,
    pub reminders: ReminderPolicy,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct AvailabilitySection {
    pub days_ahead: u32,
    pub task_duration_minutes: i64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct SlotsSection {
    pub estimated_minutes: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalendarBackend {
    #[default]
    None,
    /// `calendar.json` next to the config.
    File,
    /// Google Calendar API (requires the `gcal` feature).
    Google,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarSection {
    pub backend: CalendarBackend,
    pub calendar_id: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            user_id: "local".to_string(),
            timezone: "America/Los_Angeles".to_string(),
            anchors: ["Morning Coffee", "Start Laptop", "After Lunch", "End of Day", "After Dinner"]
                .map(String::from)
                .to_vec(),
            availability: AvailabilitySection::default(),
            slots: SlotsSection::default(),
            calendar: CalendarSection::default(),
            reminders: ReminderPolicy::default(),
        }
    }
}

impl Default for AvailabilitySection {
    fn default() -> Self {
        Self {
            days_ahead: DEFAULT_DAYS_AHEAD,
            task_duration_minutes: DEFAULT_TASK_DURATION_MINUTES,
        }
    }
}

impl Default for SlotsSection {
    fn default() -> Self {
        Self {
            estimated_minutes: DEFAULT_TASK_MINUTES,
        }
    }
}

impl Default for CalendarSection {
    fn default() -> Self {
        Self {
            backend: CalendarBackend::None,
            calendar_id: "primary".to_string(),
        }
    }
}

impl Config {
    pub fn tz(&self) -> Result<Tz> {
        parse_timezone(&self.timezone).context("config.timezone")
    }
}

pub fn config_path() -> Result<PathBuf> {
    Ok(ensure_anchorwise_home()?.join("config.toml"))
}

pub fn load_config() -> Result<Config> {
    load_config_from(&config_path()?)
}

pub fn load_config_from(p: &Path) -> Result<Config> {
    if !p.exists() {
        return Ok(Config::default());
    }
    let s = fs::read_to_string(p).with_context(|| format!("read {}", p.display()))?;
    toml::from_str(&s).with_context(|| format!("parse {}", p.display()))
}

pub fn save_config_to(cfg: &Config, p: &Path) -> Result<()> {
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

pub fn init_config() -> Result<()> {
    let p = config_path()?;
    if p.exists() {
        println!("Config already exists: {}", p.display());
        return Ok(());
    }
    save_config_to(&Config::default(), &p)?;
    println!("Wrote {}", p.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_means_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(cfg.availability.days_ahead, 7);
        assert_eq!(cfg.availability.task_duration_minutes, 20);
        assert_eq!(cfg.slots.estimated_minutes, 15);
        assert_eq!(cfg.reminders.minutes_before, 15);
        assert_eq!(cfg.calendar.backend, CalendarBackend::None);
    }

    #[test]
    fn partial_file_fills_the_rest() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("config.toml");
        fs::write(
            &p,
            "user_id = \"u42\"\ntimezone = \"Europe/Berlin\"\n\n[calendar]\nbackend = \"file\"\n",
        )
        .unwrap();
        let cfg = load_config_from(&p).unwrap();
        assert_eq!(cfg.user_id, "u42");
        assert_eq!(cfg.tz().unwrap(), chrono_tz::Europe::Berlin);
        assert_eq!(cfg.calendar.backend, CalendarBackend::File);
        assert_eq!(cfg.calendar.calendar_id, "primary");
        assert_eq!(cfg.anchors.len(), 5);
    }

    #[test]
    fn round_trips_through_toml() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("config.toml");
        let mut cfg = Config::default();
        cfg.reminders.window_minutes = 5;
        save_config_to(&cfg, &p).unwrap();
        assert_eq!(load_config_from(&p).unwrap().reminders.window_minutes, 5);
    }

    #[test]
    fn bad_timezone_is_reported() {
        let cfg = Config {
            timezone: "Nowhere/Special".into(),
            ..Config::default()
        };
        assert!(cfg.tz().is_err());
    }
}

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

/// `$ANCHORWISE_HOME`, else `~/.anchorwise`.
pub fn anchorwise_home() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("ANCHORWISE_HOME") {
        if !dir.trim().is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }
    let home = std::env::var("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home).join(".anchorwise"))
}

pub fn ensure_anchorwise_home() -> Result<PathBuf> {
    let dir = anchorwise_home()?;
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir)
}

pub fn tasks_path() -> Result<PathBuf> {
    Ok(ensure_anchorwise_home()?.join("tasks.json"))
}

pub fn calendar_path() -> Result<PathBuf> {
    Ok(ensure_anchorwise_home()?.join("calendar.json"))
}

pub fn audit_log_path() -> Result<PathBuf> {
    Ok(ensure_anchorwise_home()?.join("audit.jsonl"))
}

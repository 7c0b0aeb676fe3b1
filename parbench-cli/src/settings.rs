//! Per-task settings files.
//!
//! Each task family ships a `settings.toml` next to its sources. The only
//! key the harness reads is `tasks_type`; a missing or malformed file
//! degrades to [`TasksType::Unknown`], which poisons the composed name and
//! keeps the family out of the run without failing registration.

use serde::Deserialize;
use std::path::Path;

/// Declared parallelism category of a task family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TasksType {
    /// Shared-memory family: thread and vectorized backends apply.
    Threads,
    /// Distributed family: process backends apply.
    Processes,
    /// Missing or unreadable declaration.
    Unknown,
}

impl TasksType {
    /// Name prefix used when composing benchmark names.
    pub fn prefix(self) -> &'static str {
        match self {
            TasksType::Threads => "threads",
            TasksType::Processes => "processes",
            TasksType::Unknown => "unknown",
        }
    }
}

#[derive(Deserialize)]
struct SettingsFile {
    tasks_type: Option<String>,
}

/// Read the `tasks_type` declaration from a settings file.
pub fn read_tasks_type(path: &Path) -> TasksType {
    let Ok(content) = std::fs::read_to_string(path) else {
        return TasksType::Unknown;
    };
    let Ok(parsed) = toml::from_str::<SettingsFile>(&content) else {
        return TasksType::Unknown;
    };
    match parsed.tasks_type.as_deref() {
        Some("threads") => TasksType::Threads,
        Some("processes") => TasksType::Processes,
        _ => TasksType::Unknown,
    }
}

/// Task identifier: the name of the directory holding the settings file.
pub fn task_id(path: &Path) -> String {
    path.parent()
        .and_then(|dir| dir.file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "unknown".to_string())
}

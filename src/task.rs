use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: u32,
    pub title: String,
    /// Lowercase English day names; when non-empty the task only appears on
    /// the listed days. Names that match no weekday never match any day.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub weekdays: Vec<String>,
    /// Only this person ever sees the task.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclusive: Option<String>,
    /// Swaps between the two rotation roles on even/odd days of the month.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub alternate: bool,
}

impl Task {
    pub fn new(id: u32, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            weekdays: Vec::new(),
            exclusive: None,
            alternate: false,
        }
    }
}

/// The even/odd pair for alternating tasks: `even` sees them on even
/// days of the month, `odd` on odd days. Anyone else never sees them.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Rotation {
    pub even: String,
    pub odd: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct UserDef {
    pub username: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tasks: Vec<Task>,
}

/// Everything the definitions file can declare. All sections are optional so
/// a file with only `users` (or only shared `tasks`) still loads.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct AppData {
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub users: Vec<UserDef>,
    #[serde(default)]
    pub rotation: Option<Rotation>,
}

impl AppData {
    /// Loads the definitions file. Any failure is reported to the caller so
    /// the UI can show it, but the app keeps running on empty definitions.
    pub fn load(path: &Path) -> Result<Self, String> {
        let data = fs::read_to_string(path).map_err(|err| {
            warn!(path = %path.display(), %err, "failed to read definitions");
            format!("could not read {}: {err}", path.display())
        })?;
        let parsed: AppData = serde_json::from_str(&data).map_err(|err| {
            warn!(path = %path.display(), %err, "failed to parse definitions");
            format!("could not parse {}: {err}", path.display())
        })?;
        info!(
            tasks = parsed.tasks.len(),
            users = parsed.users.len(),
            "loaded definitions"
        );
        Ok(parsed)
    }

    pub fn user(&self, username: &str) -> Option<&UserDef> {
        self.users.iter().find(|u| u.username == username)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_full_definitions() {
        let raw = r#"{
            "rotation": { "even": "isabela", "odd": "rafaela" },
            "tasks": [
                { "id": 1, "title": "Water the plants" },
                { "id": 2, "title": "Set the table", "alternate": true },
                { "id": 3, "title": "Take out trash", "weekdays": ["monday", "thursday"] }
            ],
            "users": [
                { "username": "isabela", "password": "pw", "theme": "pink" },
                { "username": "rafaela", "password": "pw", "tasks": [
                    { "id": 1, "title": "Practice piano" }
                ] }
            ]
        }"#;
        let data: AppData = serde_json::from_str(raw).unwrap();
        assert_eq!(data.tasks.len(), 3);
        assert!(data.tasks[1].alternate);
        assert_eq!(data.tasks[2].weekdays, vec!["monday", "thursday"]);
        assert_eq!(data.user("isabela").unwrap().theme.as_deref(), Some("pink"));
        assert_eq!(data.user("rafaela").unwrap().tasks.len(), 1);
        assert_eq!(data.rotation.as_ref().unwrap().even, "isabela");
    }

    #[test]
    fn missing_sections_default_to_empty() {
        let data: AppData = serde_json::from_str("{}").unwrap();
        assert_eq!(data, AppData::default());
    }

    #[test]
    fn load_reports_missing_file() {
        let err = AppData::load(Path::new("/nonexistent/tasks.json")).unwrap_err();
        assert!(err.contains("could not read"));
    }

    #[test]
    fn load_reports_bad_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.json");
        fs::write(&path, "[1, 2").unwrap();
        let err = AppData::load(&path).unwrap_err();
        assert!(err.contains("could not parse"));
    }
}

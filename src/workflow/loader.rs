//! Workflow document loader
//!
//! Load stored workflow documents (name, seed variables, action definitions)
//! from YAML or JSON files.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::definition::ActionDefinition;

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error in {file}: {error}")]
    Parse {
        file: String,
        error: serde_yaml::Error,
    },
}

/// A stored workflow: a name, optional seed variables, and the raw action
/// definitions the factory materializes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowDocument {
    pub name: String,

    /// Variables seeded into the execution context before the run starts
    #[serde(default)]
    pub variables: HashMap<String, Value>,

    pub actions: Vec<ActionDefinition>,
}

pub struct WorkflowLoader;

impl WorkflowLoader {
    pub fn load_file(path: &Path) -> Result<WorkflowDocument, LoadError> {
        let content = std::fs::read_to_string(path)?;
        // serde_yaml handles JSON documents too
        serde_yaml::from_str(&content).map_err(|e| LoadError::Parse {
            file: path.display().to_string(),
            error: e,
        })
    }

    pub fn load_directory(dir: &Path) -> Result<Vec<WorkflowDocument>, LoadError> {
        let mut workflows = Vec::new();

        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();

            if path.is_file() {
                let ext = path.extension().and_then(|e| e.to_str());
                if matches!(ext, Some("yaml") | Some("yml") | Some("json")) {
                    workflows.push(Self::load_file(&path)?);
                }
            }
        }

        Ok(workflows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_load_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("login.yaml");

        fs::write(
            &path,
            r##"
name: login-flow
variables:
  base_url: "https://example.com"
actions:
  - type: navigate
    url: "https://example.com/login"
  - type: click
    name: submit
    selector: "#submit"
"##,
        )
        .unwrap();

        let workflow = WorkflowLoader::load_file(&path).unwrap();
        assert_eq!(workflow.name, "login-flow");
        assert_eq!(workflow.actions.len(), 2);
        assert_eq!(workflow.actions[0].action_type, "navigate");
        assert_eq!(workflow.actions[1].display_name(), "submit");
        assert_eq!(
            workflow.variables.get("base_url").unwrap(),
            "https://example.com"
        );
    }

    #[test]
    fn test_load_directory_skips_other_files() {
        let dir = tempdir().unwrap();

        fs::write(
            dir.path().join("a.yaml"),
            "name: a\nactions:\n  - type: wait\n    seconds: 1.5\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("b.json"),
            r#"{ "name": "b", "actions": [ { "type": "navigate", "url": "https://x" } ] }"#,
        )
        .unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let workflows = WorkflowLoader::load_directory(dir.path()).unwrap();
        assert_eq!(workflows.len(), 2);
    }

    #[test]
    fn test_parse_error_names_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.yaml");
        fs::write(&path, "name: [unterminated").unwrap();

        let err = WorkflowLoader::load_file(&path).unwrap_err();
        assert!(err.to_string().contains("broken.yaml"));
    }
}

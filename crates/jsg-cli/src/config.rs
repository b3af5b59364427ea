use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Deserialize;

/// Top-level project configuration loaded from `.jsg.yaml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct JsgConfig {
    pub output: String,
    pub sources: Vec<SourceEntry>,
    pub targets: Vec<TargetEntry>,
    /// Flat generation options passed through to the pipeline (see the
    /// recognized keys in jsg-core's options module).
    pub options: IndexMap<String, String>,
}

impl Default for JsgConfig {
    fn default() -> Self {
        Self {
            output: "src/generated".to_string(),
            sources: Vec::new(),
            targets: Vec::new(),
            options: IndexMap::new(),
        }
    }
}

/// One schema document: the locator it is registered under and the file
/// that provides its content.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceEntry {
    pub key: String,
    pub path: PathBuf,
}

/// One generation target.
#[derive(Debug, Clone, Deserialize)]
pub struct TargetEntry {
    pub type_name: String,
    #[serde(default = "default_module")]
    pub module: String,
    pub location: String,
    #[serde(default)]
    pub rebase_to_root: bool,
}

fn default_module() -> String {
    "models".to_string()
}

/// Default config file name.
pub const CONFIG_FILE_NAME: &str = ".jsg.yaml";

/// Load config from a YAML file. Returns `None` if the file doesn't exist.
pub fn load_config(path: &Path) -> Result<Option<JsgConfig>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)
        .map_err(|e| format!("failed to read config {}: {}", path.display(), e))?;
    let config: JsgConfig = serde_yaml_ng::from_str(&content)
        .map_err(|e| format!("failed to parse config {}: {}", path.display(), e))?;
    Ok(Some(config))
}

/// Generate the default config file content.
pub fn default_config_content() -> &'static str {
    r#"# jsg configuration - https://github.com/jsg-rs/jsg
output: src/generated

sources:
  - key: https://example.com/schemas/person.json
    path: schemas/person.json

targets:
  - type_name: Person
    module: models
    location: https://example.com/schemas/person.json
    # rebase_to_root: true     # when location addresses a subschema

options: {}
  # fallback_dialect: draft2020-12   # draft4 | draft6 | draft7 | draft2019-09 | draft2020-12 | openapi3.0
  # optional_as_nullable: "true"
  # use_optional_name_heuristics: "true"
  # always_assert_format: "true"
  # disabled_naming_heuristics: documentation-title
"#
}

//! Generator settings.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::GenResult;

/// Severity of the cross-configuration dependency check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DependencyCheck {
    Ignore,
    #[default]
    Warn,
    Error,
}

/// Settings for a generation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorSettings {
    /// How sibling configurations that disagree on dependencies are reported.
    pub dependency_check: DependencyCheck,
    /// Generate independent projects in parallel.
    pub parallel: bool,
    /// Make changed read-only outputs writable and replace them.
    pub overwrite_read_only: bool,
    /// Where the outputs of each run are recorded for stale-file cleanup.
    pub cleanup_database: Option<PathBuf>,
    pub case_sensitive_placeholders: bool,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            dependency_check: DependencyCheck::Warn,
            parallel: true,
            overwrite_read_only: true,
            cleanup_database: None,
            case_sensitive_placeholders: true,
        }
    }
}

impl GeneratorSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_yaml_str(yaml: &str) -> GenResult<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_yaml_file(path: &Path) -> GenResult<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn dependency_check(mut self, check: DependencyCheck) -> Self {
        self.dependency_check = check;
        self
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn overwrite_read_only(mut self, overwrite: bool) -> Self {
        self.overwrite_read_only = overwrite;
        self
    }

    pub fn cleanup_database(mut self, path: impl Into<PathBuf>) -> Self {
        self.cleanup_database = Some(path.into());
        self
    }

    pub fn case_sensitive_placeholders(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive_placeholders = case_sensitive;
        self
    }
}

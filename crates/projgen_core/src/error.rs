//! Error types for project generation.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for generation operations.
pub type GenResult<T> = Result<T, GenError>;

/// Errors that can occur while generating project files.
#[derive(Error, Debug)]
pub enum GenError {
    #[error("Configuration conflict in {file}: {message}")]
    ConfigurationConflict { file: PathBuf, message: String },

    #[error("Cannot resolve parameter '{name}' in '{template}'\n{available}")]
    MissingBinding {
        name: String,
        template: String,
        available: String,
    },

    #[error("Parameter '{0}' is declared more than once in the same scope")]
    DuplicateBinding(String),

    #[error("Parameter path '{0}' does not resolve to a scalar value")]
    NotScalar(String),

    #[error("Resolution of '{0}' did not converge")]
    RecursionLimit(String),

    #[error("Dependency inconsistency in project {project}:\n{details}")]
    DependencyInconsistency { project: String, details: String },

    #[error("Cannot replace {path}: {reason}")]
    FilesystemConflict { path: PathBuf, reason: String },

    #[error("No option matched for axis '{axis}' in configuration {configuration}")]
    NoOptionMatch { configuration: String, axis: String },

    #[error("Option '{key}' of axis '{axis}' already set by axis '{owner}' in {configuration}")]
    OptionKeyCollision {
        configuration: String,
        key: String,
        axis: String,
        owner: String,
    },

    #[error("Unsupported dependency in configuration {configuration}: {message}")]
    UnsupportedDependency {
        configuration: String,
        message: String,
    },

    #[error("Invalid project model: {0}")]
    InvalidModel(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl GenError {
    /// Whether the error comes from authoring the project model rather than
    /// from the environment.
    pub fn is_authoring_error(&self) -> bool {
        matches!(
            self,
            GenError::ConfigurationConflict { .. }
                | GenError::DependencyInconsistency { .. }
                | GenError::NoOptionMatch { .. }
                | GenError::OptionKeyCollision { .. }
                | GenError::UnsupportedDependency { .. }
                | GenError::InvalidModel(_)
        )
    }
}

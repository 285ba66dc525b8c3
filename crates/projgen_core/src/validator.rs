//! Configuration validation and dependency consolidation.

use std::collections::HashMap;
use std::path::Path;

use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::error::{GenError, GenResult};
use crate::model::{Configuration, ProjectReference};
use crate::settings::DependencyCheck;

/// Validation result with details.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn add_error(&mut self, message: impl Into<String>) {
        self.valid = false;
        self.errors.push(message.into());
    }

    pub fn add_warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn merge(&mut self, other: ValidationResult) {
        if !other.valid {
            self.valid = false;
        }
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }
}

/// One field that differs between two values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDifference {
    pub path: String,
    pub left: String,
    pub right: String,
}

/// Sort the configurations of one project file by (name, platform) and
/// validate them.
///
/// Ties keep their input order. Fails with
/// [`GenError::ConfigurationConflict`] when configurations disagree on the
/// project name or GUID, or when two share a (name, platform) identity.
pub fn sort_and_validate<'c>(
    file: &Path,
    configurations: &[&'c Configuration],
) -> GenResult<Vec<&'c Configuration>> {
    let mut sorted = configurations.to_vec();
    sorted.sort_by(|a, b| a.identity().cmp(&b.identity()));

    let Some(first) = sorted.first() else {
        return Err(GenError::InvalidModel(format!(
            "no configurations for {}",
            file.display()
        )));
    };

    let project_name = &first.project_name;
    for conf in &sorted {
        if &conf.project_name != project_name {
            return Err(GenError::ConfigurationConflict {
                file: file.to_path_buf(),
                message: format!(
                    "configurations of one project file must share a project name: {} != {}",
                    project_name, conf.project_name
                ),
            });
        }
    }

    let project_guid = first.project_guid;
    for conf in &sorted {
        if conf.project_guid != project_guid {
            return Err(GenError::ConfigurationConflict {
                file: file.to_path_buf(),
                message: format!(
                    "project GUID differs between configurations: {} != {} ({})",
                    project_guid,
                    conf.project_guid,
                    conf
                ),
            });
        }
    }

    let mut seen: HashMap<(&str, &str), &Configuration> = HashMap::new();
    for conf in &sorted {
        if let Some(previous) = seen.insert(conf.identity(), conf) {
            return Err(GenError::ConfigurationConflict {
                file: file.to_path_buf(),
                message: describe_collision(previous, conf)?,
            });
        }
    }

    Ok(sorted)
}

fn describe_collision(first: &Configuration, second: &Configuration) -> GenResult<String> {
    let differences = field_diff(first, second)?;
    let mut message = format!(
        "project '{}' contains distinct configurations with the same identity {}|{}",
        first.project_name, first.name, first.platform
    );

    if differences.is_empty() {
        message.push_str("; the same configuration is declared twice");
    } else {
        message.push_str(", add something to distinguish them. Differing fields:");
        for diff in differences {
            message.push_str(&format!(
                "\n- {}: {} and {}",
                diff.path, diff.left, diff.right
            ));
        }
    }
    Ok(message)
}

/// Field-level differences between two serializable values.
///
/// Nested objects are compared field by field; lists and scalars are compared
/// as a whole.
pub fn field_diff<T: Serialize>(left: &T, right: &T) -> GenResult<Vec<FieldDifference>> {
    let left = serde_json::to_value(left)?;
    let right = serde_json::to_value(right)?;
    let mut differences = Vec::new();
    diff_values("", &left, &right, &mut differences);
    Ok(differences)
}

fn diff_values(
    path: &str,
    left: &serde_json::Value,
    right: &serde_json::Value,
    out: &mut Vec<FieldDifference>,
) {
    use serde_json::Value as Json;

    match (left, right) {
        (Json::Object(l), Json::Object(r)) => {
            let mut keys: Vec<&String> = l.keys().chain(r.keys()).collect();
            keys.sort();
            keys.dedup();
            for key in keys {
                let child = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", path, key)
                };
                diff_values(
                    &child,
                    l.get(key).unwrap_or(&Json::Null),
                    r.get(key).unwrap_or(&Json::Null),
                    out,
                );
            }
        }
        (l, r) if l != r => out.push(FieldDifference {
            path: path.to_string(),
            left: l.to_string(),
            right: r.to_string(),
        }),
        _ => {}
    }
}

/// Distinct project references of all configurations, in first-seen order.
///
/// Identity is (project file, GUID): templates emit one reference block per
/// referenced project rather than one per configuration.
pub fn consolidate_dependencies<'c>(
    configurations: &[&'c Configuration],
) -> Vec<&'c ProjectReference> {
    let mut consolidated: Vec<&ProjectReference> = Vec::new();
    let mut guids_by_file: HashMap<&Path, Uuid> = HashMap::new();

    for conf in configurations {
        for dependency in &conf.dependencies {
            if consolidated
                .iter()
                .any(|d| d.identity() == dependency.identity())
            {
                continue;
            }

            let (file, guid) = dependency.identity();
            if let Some(known) = guids_by_file.insert(file, guid) {
                if known != guid {
                    warn!(
                        "{} is referenced with two GUIDs ({} and {}) by {}",
                        file.display(),
                        known,
                        guid,
                        conf
                    );
                }
            }
            consolidated.push(dependency);
        }
    }

    consolidated
}

/// Report dependencies that some sibling configurations have and others lack.
///
/// With [`DependencyCheck::Warn`] every finding is logged and returned as a
/// warning; with [`DependencyCheck::Error`] any finding fails with
/// [`GenError::DependencyInconsistency`].
pub fn check_dependency_consistency(
    project: &str,
    configurations: &[&Configuration],
    check: DependencyCheck,
) -> GenResult<ValidationResult> {
    let mut result = ValidationResult::new();
    if check == DependencyCheck::Ignore || configurations.len() < 2 {
        return Ok(result);
    }

    let mut findings = Vec::new();
    for dependency in consolidate_dependencies(configurations) {
        let (having, missing): (Vec<&Configuration>, Vec<&Configuration>) =
            configurations.iter().partition(|conf| {
                conf.dependencies
                    .iter()
                    .any(|d| d.identity() == dependency.identity())
            });

        if missing.is_empty() {
            continue;
        }

        findings.push(format!(
            "{} ({}) is a dependency of {} but not of {}",
            dependency.project_name,
            dependency.project_file.display(),
            join_identities(&having),
            join_identities(&missing)
        ));
    }

    if findings.is_empty() {
        return Ok(result);
    }

    match check {
        DependencyCheck::Error => Err(GenError::DependencyInconsistency {
            project: project.to_string(),
            details: findings.join("\n"),
        }),
        _ => {
            for finding in findings {
                warn!("Project {}: {}", project, finding);
                result.add_warning(finding);
            }
            Ok(result)
        }
    }
}

fn join_identities(configurations: &[&Configuration]) -> String {
    configurations
        .iter()
        .map(|c| format!("{}|{}", c.name, c.platform))
        .collect::<Vec<_>>()
        .join(", ")
}

//! In-memory project model.
//!
//! The model is built by the caller before generation and is read-only for the
//! duration of a pass. Configurations refer to the configurations of other
//! projects through [`ProjectReference`] snapshots, never by ownership.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::value::Value;

/// Stable project GUID for a project file.
///
/// The GUID is a name-based (v5) UUID of the lexically normalized path with
/// `/` separators, so rebuilding the same model gives the same GUID.
pub fn project_guid_for(project_file: &Path) -> Uuid {
    let mut parts: Vec<String> = Vec::new();
    for component in project_file.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir if parts.last().is_some_and(|p| p != "..") => {
                parts.pop();
            }
            Component::RootDir => parts.push(String::new()),
            other => parts.push(other.as_os_str().to_string_lossy().into_owned()),
        }
    }
    Uuid::new_v5(&Uuid::NAMESPACE_URL, parts.join("/").as_bytes())
}

/// Kind of binary a configuration produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OutputKind {
    #[default]
    Exe,
    Lib,
    Dll,
    Utility,
    None,
    DotNetConsoleApp,
    DotNetWindowsApp,
    DotNetClassLibrary,
}

impl OutputKind {
    pub fn is_dotnet(&self) -> bool {
        matches!(
            self,
            OutputKind::DotNetConsoleApp
                | OutputKind::DotNetWindowsApp
                | OutputKind::DotNetClassLibrary
        )
    }

    pub fn is_executable(&self) -> bool {
        matches!(
            self,
            OutputKind::Exe | OutputKind::DotNetConsoleApp | OutputKind::DotNetWindowsApp
        )
    }
}

/// Target tuple of a configuration, as named fragments (optimization,
/// platform, toolchain, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Target(pub BTreeMap<String, String>);

impl Target {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, fragment: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(fragment.into(), value.into());
        self
    }

    pub fn get(&self, fragment: &str) -> Option<&str> {
        self.0.get(fragment).map(String::as_str)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let values: Vec<&str> = self.0.values().map(String::as_str).collect();
        f.write_str(&values.join("_"))
    }
}

/// Reference from one configuration to a configuration of another project.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectReference {
    pub project_name: String,
    /// Full path of the referenced project file, extension included.
    pub project_file: PathBuf,
    pub guid: Uuid,
    pub output: OutputKind,
    pub target_file_name: String,
    /// Export-only projects describe prebuilt binaries and get no reference
    /// block in generated files.
    #[serde(default)]
    pub export: bool,
}

impl ProjectReference {
    /// Identity used to deduplicate references across configurations.
    pub fn identity(&self) -> (&Path, Uuid) {
        (self.project_file.as_path(), self.guid)
    }
}

/// A NuGet package reference.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PackageReference {
    pub name: String,
    pub version: String,
}

/// One (name, platform, target) build variant of a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    pub name: String,
    pub platform: String,
    pub target: Target,
    pub project_name: String,
    pub project_guid: Uuid,
    /// Full path of the generated project file, extension included.
    pub project_file: PathBuf,
    pub output: OutputKind,
    pub target_path: PathBuf,
    pub intermediate_path: PathBuf,
    pub target_file_name: String,
    #[serde(default)]
    pub defines: Vec<String>,
    /// Direct dependencies in declaration order, without duplicates.
    #[serde(default)]
    pub dependencies: Vec<ProjectReference>,
    /// Chosen value per option axis.
    #[serde(default)]
    pub settings: BTreeMap<String, String>,
    #[serde(default)]
    pub nuget_references: Vec<PackageReference>,
}

impl Configuration {
    pub fn new(
        project_name: impl Into<String>,
        name: impl Into<String>,
        platform: impl Into<String>,
    ) -> Self {
        let project_name = project_name.into();
        let project_guid = project_guid_for(Path::new(&project_name));
        Self {
            name: name.into(),
            platform: platform.into(),
            target: Target::new(),
            project_file: PathBuf::from(&project_name),
            target_file_name: project_name.clone(),
            project_name,
            project_guid,
            output: OutputKind::default(),
            target_path: PathBuf::from("bin"),
            intermediate_path: PathBuf::from("obj"),
            defines: Vec::new(),
            dependencies: Vec::new(),
            settings: BTreeMap::new(),
            nuget_references: Vec::new(),
        }
    }

    pub fn guid(mut self, guid: Uuid) -> Self {
        self.project_guid = guid;
        self
    }

    /// Set the generated file. A GUID still derived from the previous file
    /// follows the new one; an explicit [`Configuration::guid`] is kept.
    pub fn project_file(mut self, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        if self.project_guid == project_guid_for(&self.project_file) {
            self.project_guid = project_guid_for(&path);
        }
        self.project_file = path;
        self
    }

    pub fn output(mut self, output: OutputKind) -> Self {
        self.output = output;
        self
    }

    pub fn target(mut self, target: Target) -> Self {
        self.target = target;
        self
    }

    pub fn target_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.target_path = path.into();
        self
    }

    pub fn intermediate_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.intermediate_path = path.into();
        self
    }

    pub fn target_file_name(mut self, name: impl Into<String>) -> Self {
        self.target_file_name = name.into();
        self
    }

    pub fn define(mut self, define: impl Into<String>) -> Self {
        self.defines.push(define.into());
        self
    }

    /// Choose `value` on option axis `axis`.
    pub fn setting(mut self, axis: impl Into<String>, value: impl Into<String>) -> Self {
        self.settings.insert(axis.into(), value.into());
        self
    }

    pub fn nuget(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.nuget_references.push(PackageReference {
            name: name.into(),
            version: version.into(),
        });
        self
    }

    /// Add a dependency on `other`, ignoring repeats of the same identity.
    pub fn depends_on(mut self, other: &Configuration) -> Self {
        let reference = other.as_reference();
        if !self
            .dependencies
            .iter()
            .any(|d| d.identity() == reference.identity())
        {
            self.dependencies.push(reference);
        }
        self
    }

    /// Snapshot used by dependents to refer to this configuration.
    pub fn as_reference(&self) -> ProjectReference {
        ProjectReference {
            project_name: self.project_name.clone(),
            project_file: self.project_file.clone(),
            guid: self.project_guid,
            output: self.output,
            target_file_name: self.target_file_name.clone(),
            export: false,
        }
    }

    /// (Name, Platform) identity within one project file.
    pub fn identity(&self) -> (&str, &str) {
        (&self.name, &self.platform)
    }

    /// Value chosen on `axis`, if any.
    pub fn chosen(&self, axis: &str) -> Option<&str> {
        self.settings.get(axis).map(String::as_str)
    }

    /// Value chosen on `axis`, or the omit sentinel.
    pub fn setting_or_omit(&self, axis: &str) -> Value {
        self.chosen(axis).map(Value::from).unwrap_or(Value::Omit)
    }

    /// Directory of the generated project file.
    pub fn project_directory(&self) -> &Path {
        self.project_file.parent().unwrap_or_else(|| Path::new(""))
    }
}

impl fmt::Display for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{} ({})", self.name, self.platform, self.project_name)
    }
}

/// Settings of an Android packaging project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AndroidPackage {
    pub android_manifest: PathBuf,
    pub ant_build_xml: PathBuf,
    pub ant_project_properties: PathBuf,
    /// Directory the ant build runs from.
    pub ant_build_root: PathBuf,
    /// Project whose dynamic library is loaded first by the activity.
    pub app_lib_project: Option<String>,
}

/// Settings of a Python project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PythonProject {
    pub search_paths: Vec<PathBuf>,
    pub startup_file: Option<PathBuf>,
    pub interpreter_id: Option<Uuid>,
    pub interpreter_version: Option<String>,
}

/// What kind of project file a project produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectKind {
    Cpp,
    CSharp { root_namespace: String },
    Python(PythonProject),
    AndroidPackage(AndroidPackage),
}

/// A named group of configurations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
    pub kind: ProjectKind,
    pub source_root: PathBuf,
    #[serde(default)]
    pub source_files: Vec<PathBuf>,
    pub configurations: Vec<Configuration>,
}

impl Project {
    pub fn new(
        name: impl Into<String>,
        kind: ProjectKind,
        source_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            source_root: source_root.into(),
            source_files: Vec::new(),
            configurations: Vec::new(),
        }
    }

    pub fn file(mut self, path: impl Into<PathBuf>) -> Self {
        self.source_files.push(path.into());
        self
    }

    pub fn configuration(mut self, configuration: Configuration) -> Self {
        self.configurations.push(configuration);
        self
    }

    /// Configurations grouped by generated project file, in first-seen order.
    pub fn configurations_by_file(&self) -> Vec<(&Path, Vec<&Configuration>)> {
        let mut groups: Vec<(&Path, Vec<&Configuration>)> = Vec::new();
        for conf in &self.configurations {
            match groups
                .iter_mut()
                .find(|(file, _)| *file == conf.project_file.as_path())
            {
                Some((_, confs)) => confs.push(conf),
                None => groups.push((conf.project_file.as_path(), vec![conf])),
            }
        }
        groups
    }
}

/// A project configuration included in a solution configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncludedProject {
    pub project: ProjectReference,
    pub configuration: String,
    pub platform: String,
    #[serde(default = "default_true")]
    pub build: bool,
}

fn default_true() -> bool {
    true
}

/// One (name, platform) configuration of a solution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolutionConfiguration {
    pub name: String,
    pub platform: String,
    pub projects: Vec<IncludedProject>,
}

impl SolutionConfiguration {
    pub fn new(name: impl Into<String>, platform: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            platform: platform.into(),
            projects: Vec::new(),
        }
    }

    /// Include `conf` in this solution configuration.
    pub fn include(mut self, conf: &Configuration) -> Self {
        self.projects.push(IncludedProject {
            project: conf.as_reference(),
            configuration: conf.name.clone(),
            platform: conf.platform.clone(),
            build: true,
        });
        self
    }

    /// Section name used in the solution file.
    pub fn section_name(&self) -> String {
        format!("{}|{}", self.name, self.platform)
    }
}

/// A solution grouping several projects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Solution {
    pub name: String,
    /// Full path of the solution file, extension included.
    pub file: PathBuf,
    pub configurations: Vec<SolutionConfiguration>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_depends_on_dedups() {
        let lib = Configuration::new("core", "Debug", "x64").project_file("/w/core/core.vcxproj");
        let app = Configuration::new("app", "Debug", "x64")
            .depends_on(&lib)
            .depends_on(&lib);
        assert_eq!(app.dependencies.len(), 1);
        assert_eq!(app.dependencies[0].project_name, "core");
    }

    #[test]
    fn test_project_guid_is_stable() {
        let a = Configuration::new("core", "Debug", "x64").project_file("/w/core/core.vcxproj");
        let b = Configuration::new("core", "Release", "x64")
            .project_file("/w/core/./src/../core.vcxproj");
        let other =
            Configuration::new("core", "Debug", "x64").project_file("/w/other/core.vcxproj");

        assert_eq!(a.project_guid, b.project_guid);
        assert_ne!(a.project_guid, other.project_guid);
        assert_eq!(a.project_guid, project_guid_for(Path::new("/w/core/core.vcxproj")));
    }

    #[test]
    fn test_explicit_guid_survives_project_file() {
        let guid = Uuid::new_v4();
        let conf = Configuration::new("core", "Debug", "x64")
            .guid(guid)
            .project_file("/w/core/core.vcxproj");
        assert_eq!(conf.project_guid, guid);
    }

    #[test]
    fn test_setting_or_omit() {
        let conf = Configuration::new("app", "Debug", "x64").setting("WarningLevel", "Level4");
        assert_eq!(conf.setting_or_omit("WarningLevel"), Value::from("Level4"));
        assert!(conf.setting_or_omit("Optimization").is_omit());
    }

    #[test]
    fn test_target_display() {
        let target = Target::new()
            .with("optimization", "Debug")
            .with("platform", "win64");
        assert_eq!(target.to_string(), "Debug_win64");
    }

    #[test]
    fn test_configurations_by_file() {
        let app = |name: &str, platform: &str, file: &str| {
            Configuration::new("app", name, platform).project_file(file)
        };
        let project = Project::new("app", ProjectKind::Cpp, "/src")
            .configuration(app("Debug", "x64", "/w/a.vcxproj"))
            .configuration(app("Debug", "ARM64", "/w/b.vcxproj"))
            .configuration(app("Release", "x64", "/w/a.vcxproj"));

        let groups = project.configurations_by_file();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].1.len(), 2);
        assert_eq!(groups[1].0, Path::new("/w/b.vcxproj"));
    }
}

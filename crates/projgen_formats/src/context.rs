//! Per-file generation context.

use std::path::{Path, PathBuf};

use projgen_core::{
    check_dependency_consistency, consolidate_dependencies, sort_and_validate, Configuration,
    ExplicitOptions, GenResult, GeneratorSettings, OptionSelector, Project, ProjectReference,
    Resolver,
};

use crate::util::{extension_of, relative_path, windows_path};

/// Everything a generator needs to render one project file.
///
/// Building a context validates the configurations and consolidates their
/// dependencies, so a context that exists is always safe to render.
pub struct GenerationContext<'a> {
    project: &'a Project,
    file: &'a Path,
    configurations: Vec<&'a Configuration>,
    dependencies: Vec<&'a ProjectReference>,
    settings: &'a GeneratorSettings,
    warnings: Vec<String>,
}

impl<'a> GenerationContext<'a> {
    /// Sort and validate the configurations of `file`, check their
    /// dependencies and consolidate project references.
    pub fn new(
        project: &'a Project,
        file: &'a Path,
        configurations: &[&'a Configuration],
        settings: &'a GeneratorSettings,
    ) -> GenResult<Self> {
        let configurations = sort_and_validate(file, configurations)?;
        let check = check_dependency_consistency(
            &project.name,
            &configurations,
            settings.dependency_check,
        )?;

        let dependencies = consolidate_dependencies(&configurations)
            .into_iter()
            .filter(|d| !d.export)
            .collect();

        Ok(Self {
            project,
            file,
            configurations,
            dependencies,
            settings,
            warnings: check.warnings,
        })
    }

    pub fn project(&self) -> &'a Project {
        self.project
    }

    /// Full path of the generated file.
    pub fn file(&self) -> &'a Path {
        self.file
    }

    pub fn directory(&self) -> &'a Path {
        self.file.parent().unwrap_or_else(|| Path::new(""))
    }

    /// Configurations in (name, platform) order.
    pub fn configurations(&self) -> &[&'a Configuration] {
        &self.configurations
    }

    /// The first configuration in sorted order; project-wide sections are
    /// rendered from it.
    pub fn first(&self) -> &'a Configuration {
        self.configurations[0]
    }

    /// Distinct non-export project references, in first-seen order.
    pub fn dependencies(&self) -> &[&'a ProjectReference] {
        &self.dependencies
    }

    pub fn settings(&self) -> &'a GeneratorSettings {
        self.settings
    }

    /// Non-fatal findings from validating the configurations.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// A fresh resolver for one render of this file.
    pub fn resolver(&self) -> Resolver {
        Resolver::with_case_sensitivity(self.settings.case_sensitive_placeholders)
    }

    /// Compute the options map of every configuration, in sorted order.
    ///
    /// `generate` is called once per configuration with a selector holding a
    /// fresh map.
    pub fn compute_options<F>(&self, mut generate: F) -> GenResult<Vec<ExplicitOptions>>
    where
        F: FnMut(&mut OptionSelector<'_>) -> GenResult<()>,
    {
        let mut all = Vec::with_capacity(self.configurations.len());
        for conf in &self.configurations {
            let mut selector = OptionSelector::new(conf);
            generate(&mut selector)?;
            all.push(selector.finish());
        }
        Ok(all)
    }

    /// `path` relative to the directory of the generated file, with `\`
    /// separators.
    pub fn relative(&self, path: &Path) -> String {
        windows_path(&relative_path(self.directory(), path))
    }

    /// Source files of the project as (include path, lower-cased extension),
    /// sorted case-insensitively by include path.
    pub fn source_files(&self) -> Vec<(String, String)> {
        let mut files: Vec<(String, String)> = self
            .project
            .source_files
            .iter()
            .map(|file| {
                let full: PathBuf = self.project.source_root.join(file);
                (self.relative(&full), extension_of(file))
            })
            .collect();
        files.sort_by_key(|(include, _)| include.to_lowercase());
        files.dedup_by(|a, b| a.0.eq_ignore_ascii_case(&b.0));
        files
    }
}

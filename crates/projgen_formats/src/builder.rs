//! Multi-project generation.
//!
//! The builder renders every file of a project in memory, writes them only
//! when the whole project rendered, then writes the solutions. A failing
//! project is reported and does not stop the others.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, error, info, warn};

use projgen_core::{
    cleanup_stale, CleanupReport, Configuration, DeleteOutcome, FileSystem, GenError, GenResult,
    GenerationOutput, GenerationSession, GeneratorSettings, OsFileSystem, OutputWriter, Project,
    Solution,
};

use crate::context::GenerationContext;
use crate::generator::{GeneratorRegistry, PendingOutput, ProjectGenerator};
use crate::sln::SlnGenerator;

/// A project or solution that could not be generated.
#[derive(Debug)]
pub struct ProjectFailure {
    /// Project or solution name.
    pub project: String,
    /// File being generated when the error occurred, if any.
    pub file: Option<PathBuf>,
    pub error: GenError,
}

impl ProjectFailure {
    fn new(project: &str, file: Option<&Path>, error: GenError) -> Self {
        Self {
            project: project.to_string(),
            file: file.map(Path::to_path_buf),
            error,
        }
    }

    fn log(&self) {
        if self.error.is_authoring_error() {
            error!("Invalid model, cannot generate {}", self);
        } else {
            error!("Failed to write {}", self);
        }
    }
}

impl fmt::Display for ProjectFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.file {
            Some(file) => write!(f, "{} ({}): {}", self.project, file.display(), self.error),
            None => write!(f, "{}: {}", self.project, self.error),
        }
    }
}

/// Outcome of a builder run.
#[derive(Debug, Default)]
pub struct GenerationReport {
    /// Generated and skipped outputs, in project order.
    pub output: GenerationOutput,
    pub failures: Vec<ProjectFailure>,
    /// Non-fatal findings, prefixed with the project name.
    pub warnings: Vec<String>,
    /// Set when a cleanup database is configured and every project succeeded.
    pub cleanup: Option<CleanupReport>,
}

impl GenerationReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn generated(&self) -> &[PathBuf] {
        &self.output.generated
    }

    pub fn skipped(&self) -> &[PathBuf] {
        &self.output.skipped
    }
}

impl fmt::Display for GenerationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} Failed: {:2}", self.output, self.failures.len())
    }
}

/// Written outputs and warnings of one project.
struct ProjectRun {
    output: GenerationOutput,
    warnings: Vec<String>,
}

/// Runs the generators over a set of projects and solutions.
pub struct Builder {
    settings: GeneratorSettings,
    fs: Arc<dyn FileSystem>,
    registry: GeneratorRegistry,
}

impl Builder {
    /// A builder writing to the real filesystem with every built-in
    /// generator registered.
    pub fn new(settings: GeneratorSettings) -> Self {
        Self {
            settings,
            fs: Arc::new(OsFileSystem),
            registry: GeneratorRegistry::with_defaults(),
        }
    }

    pub fn with_file_system(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    /// Register an additional generator, replacing the one for its extension.
    pub fn with_generator(mut self, generator: Arc<dyn ProjectGenerator>) -> Self {
        self.registry.register(generator);
        self
    }

    pub fn registry(&self) -> &GeneratorRegistry {
        &self.registry
    }

    pub fn settings(&self) -> &GeneratorSettings {
        &self.settings
    }

    /// Generate every project, then every solution.
    ///
    /// Project and solution failures are collected in the report. Stale
    /// shared outputs and stale outputs of earlier runs are only removed
    /// when nothing failed, since a failed project did not claim the outputs
    /// it would have produced. The only error returned is a failure to
    /// update the cleanup database.
    pub fn generate(
        &self,
        projects: &[Project],
        solutions: &[Solution],
    ) -> GenResult<GenerationReport> {
        let session = GenerationSession::new();

        let results: Vec<Result<ProjectRun, ProjectFailure>> = if self.settings.parallel {
            projects
                .par_iter()
                .map(|project| self.generate_project(project, &session))
                .collect()
        } else {
            projects
                .iter()
                .map(|project| self.generate_project(project, &session))
                .collect()
        };

        let mut report = GenerationReport::default();
        for result in results {
            match result {
                Ok(run) => {
                    report.output.merge(run.output);
                    report.warnings.extend(run.warnings);
                }
                Err(failure) => {
                    failure.log();
                    report.failures.push(failure);
                }
            }
        }

        let writer = self.writer(&session);
        if report.is_success() {
            remove_stale_shared(&writer);
        } else {
            warn!(
                "Keeping stale shared outputs: {} failures",
                report.failures.len()
            );
        }

        for solution in solutions {
            if let Err(e) =
                SlnGenerator.generate(solution, &self.settings, &writer, &mut report.output)
            {
                let failure = ProjectFailure::new(&solution.name, Some(&solution.file), e);
                failure.log();
                report.failures.push(failure);
            }
        }

        if let Some(database) = &self.settings.cleanup_database {
            if report.is_success() {
                report.cleanup = Some(cleanup_stale(self.fs.as_ref(), &session, database)?);
            } else {
                warn!(
                    "Skipping stale output cleanup: {} failures",
                    report.failures.len()
                );
            }
        }

        info!("{}", report);
        Ok(report)
    }

    fn writer<'a>(&'a self, session: &'a GenerationSession) -> OutputWriter<'a> {
        OutputWriter::new(self.fs.as_ref(), session)
            .overwrite_read_only(self.settings.overwrite_read_only)
    }

    /// Render every file of `project`, then write them. A project with a bad
    /// file or a failing render writes nothing.
    fn generate_project(
        &self,
        project: &Project,
        session: &GenerationSession,
    ) -> Result<ProjectRun, ProjectFailure> {
        info!("Generating project {}", project.name);

        let groups: Vec<(&Path, Vec<&Configuration>)> = project.configurations_by_file();
        if groups.is_empty() {
            return Err(ProjectFailure::new(
                &project.name,
                None,
                GenError::InvalidModel(format!("project '{}' has no configurations", project.name)),
            ));
        }

        let mut pending: Vec<PendingOutput> = Vec::new();
        let mut warnings = Vec::new();
        for (file, confs) in groups {
            let fail = |e| ProjectFailure::new(&project.name, Some(file), e);
            let generator = self.registry.for_file(file, &project.kind).map_err(fail)?;
            let context =
                GenerationContext::new(project, file, &confs, &self.settings).map_err(fail)?;

            debug!("{} -> {}", generator.name(), file.display());
            pending.extend(generator.generate(&context).map_err(fail)?);
            warnings.extend(
                context
                    .warnings()
                    .iter()
                    .map(|w| format!("{}: {}", project.name, w)),
            );
        }

        let writer = self.writer(session);
        let mut output = GenerationOutput::new();
        for item in pending {
            let path = item.path().to_path_buf();
            item.commit(&writer, &mut output)
                .map_err(|e| ProjectFailure::new(&project.name, Some(&path), e))?;
        }
        Ok(ProjectRun { output, warnings })
    }
}

/// Remove the shared outputs marked stale that no project of the run
/// produced.
fn remove_stale_shared(writer: &OutputWriter<'_>) {
    for (path, outcome) in writer.remove_unclaimed_stale() {
        if outcome == DeleteOutcome::Deleted {
            info!("Removed stale {}", path.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use projgen_core::{MockFileSystem, OutputKind, ProjectKind};

    fn builder(fs: &MockFileSystem) -> Builder {
        Builder::new(GeneratorSettings::new().parallel(false))
            .with_file_system(Arc::new(fs.clone()))
    }

    fn cpp(name: &str) -> Project {
        let file = format!("/w/{name}/{name}.vcxproj");
        Project::new(name, ProjectKind::Cpp, format!("/w/{name}"))
            .file("main.cpp")
            .configuration(
                Configuration::new(name, "Debug", "x64")
                    .project_file(&file)
                    .output(OutputKind::Lib),
            )
    }

    #[test]
    fn test_generates_every_project() {
        let fs = MockFileSystem::new();
        let report = builder(&fs).generate(&[cpp("core"), cpp("app")], &[]).unwrap();

        assert!(report.is_success());
        assert_eq!(
            report.generated(),
            &[
                PathBuf::from("/w/core/core.vcxproj"),
                PathBuf::from("/w/app/app.vcxproj")
            ]
        );
        assert!(fs.contents(Path::new("/w/core/core.vcxproj")).is_some());
    }

    #[test]
    fn test_failure_is_isolated() {
        let fs = MockFileSystem::new();
        let broken = Project::new("broken", ProjectKind::Cpp, "/w/broken").configuration(
            Configuration::new("broken", "Debug", "x64").project_file("/w/broken/broken.unknown"),
        );
        let report = builder(&fs).generate(&[broken, cpp("core")], &[]).unwrap();

        assert!(!report.is_success());
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].project, "broken");
        assert_eq!(report.generated(), &[PathBuf::from("/w/core/core.vcxproj")]);
        assert_eq!(report.to_string(), "Generated:  1 Skipped:  0 Failed:  1");
    }

    #[test]
    fn test_project_without_configurations_fails() {
        let fs = MockFileSystem::new();
        let empty = Project::new("empty", ProjectKind::Cpp, "/w/empty");
        let report = builder(&fs).generate(&[empty], &[]).unwrap();
        assert!(matches!(
            report.failures[0].error,
            GenError::InvalidModel(_)
        ));
        assert!(report.failures[0].file.is_none());
    }

    #[test]
    fn test_render_failure_writes_no_file_of_the_project() {
        let fs = MockFileSystem::new();
        let cs = |file: &str, name: &str, output: OutputKind| {
            Configuration::new("tools", name, "AnyCPU")
                .project_file(file)
                .output(output)
        };
        let tools = Project::new(
            "tools",
            ProjectKind::CSharp {
                root_namespace: "Tools".to_string(),
            },
            "/w/tools",
        )
        .configuration(cs("/w/tools/a.csproj", "Debug", OutputKind::DotNetConsoleApp))
        .configuration(cs("/w/tools/b.csproj", "Debug", OutputKind::DotNetConsoleApp))
        .configuration(cs("/w/tools/b.csproj", "Release", OutputKind::DotNetClassLibrary));

        let report = builder(&fs).generate(&[tools], &[]).unwrap();

        assert_eq!(report.failures.len(), 1);
        assert_eq!(
            report.failures[0].file.as_deref(),
            Some(Path::new("/w/tools/b.csproj"))
        );
        assert!(report.failures[0].error.is_authoring_error());
        assert!(report.generated().is_empty());
        assert!(!fs.was_called("write"));
    }

    #[test]
    fn test_dependency_warnings_reported() {
        let fs = MockFileSystem::new();
        let lib = Configuration::new("lib", "Debug", "x64").project_file("/w/lib/lib.vcxproj");
        let core = Project::new("core", ProjectKind::Cpp, "/w/core")
            .configuration(
                Configuration::new("core", "Debug", "x64")
                    .project_file("/w/core/core.vcxproj")
                    .depends_on(&lib),
            )
            .configuration(
                Configuration::new("core", "Release", "x64").project_file("/w/core/core.vcxproj"),
            );

        let report = builder(&fs).generate(&[core, cpp("app")], &[]).unwrap();

        assert!(report.is_success());
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].starts_with("core: lib ("));
        assert!(report.warnings[0]
            .ends_with("is a dependency of Debug|x64 but not of Release|x64"));
    }
}

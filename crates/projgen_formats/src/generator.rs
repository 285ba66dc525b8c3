//! Generator trait and registry.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use projgen_core::{GenError, GenResult, GenerationOutput, OutputWriter, ProjectKind};

use crate::context::GenerationContext;
use crate::util::extension_of;

/// An output rendered in memory and not yet written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingOutput {
    /// A file owned by one project.
    File { path: PathBuf, content: Vec<u8> },
    /// A file several projects may produce; written once per session.
    Shared { path: PathBuf, content: Vec<u8> },
    /// A shared file this project no longer produces. It is removed at the
    /// end of the run unless another project claims it.
    StaleShared { path: PathBuf },
}

impl PendingOutput {
    pub fn file(path: impl Into<PathBuf>, content: Vec<u8>) -> Self {
        PendingOutput::File {
            path: path.into(),
            content,
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            PendingOutput::File { path, .. }
            | PendingOutput::Shared { path, .. }
            | PendingOutput::StaleShared { path } => path,
        }
    }

    /// Write the output and record the outcome in `output`.
    pub fn commit(
        self,
        writer: &OutputWriter<'_>,
        output: &mut GenerationOutput,
    ) -> GenResult<()> {
        match self {
            PendingOutput::File { path, content } => {
                writer.write_into(&path, &content, output)?;
            }
            PendingOutput::Shared { path, content } => {
                writer.write_shared(&path, move || Ok(content), output)?;
            }
            PendingOutput::StaleShared { path } => writer.session().defer_stale_shared(&path),
        }
        Ok(())
    }
}

/// Renders one kind of project file.
///
/// Generators hold no per-run state and never touch the disk; everything
/// they need arrives through the context, and everything they produce is
/// returned as [`PendingOutput`]s. They must be `Send + Sync` so projects
/// can be generated in parallel.
pub trait ProjectGenerator: Send + Sync {
    /// Unique generator name, used in logs.
    fn name(&self) -> &str;

    /// Extension of the files this generator produces, without the dot.
    fn extension(&self) -> &str;

    /// Whether projects of `kind` can be rendered by this generator.
    fn supports(&self, kind: &ProjectKind) -> bool;

    /// Compute options and render every output of the file described by
    /// `context`. Any option or consistency error surfaces here, before
    /// anything is written.
    fn generate(&self, context: &GenerationContext<'_>) -> GenResult<Vec<PendingOutput>>;
}

/// Generators keyed by file extension.
#[derive(Default, Clone)]
pub struct GeneratorRegistry {
    generators: HashMap<String, Arc<dyn ProjectGenerator>>,
}

impl GeneratorRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            generators: HashMap::new(),
        }
    }

    /// Registry with every built-in generator.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(crate::vcxproj::VcxprojGenerator));
        registry.register(Arc::new(crate::csproj::CsprojGenerator));
        registry.register(Arc::new(crate::pyproj::PyprojGenerator));
        registry.register(Arc::new(crate::androidproj::AndroidprojGenerator));
        registry
    }

    /// Register a generator under its extension, replacing any previous one.
    pub fn register(&mut self, generator: Arc<dyn ProjectGenerator>) {
        let extension = generator.extension().to_lowercase();
        debug!("Registering generator {} for .{}", generator.name(), extension);
        self.generators.insert(extension, generator);
    }

    pub fn get(&self, extension: &str) -> Option<Arc<dyn ProjectGenerator>> {
        self.generators.get(&extension.to_lowercase()).cloned()
    }

    /// Generator for `file`, checked against the kind of `project`.
    pub fn for_file(
        &self,
        file: &Path,
        kind: &ProjectKind,
    ) -> GenResult<Arc<dyn ProjectGenerator>> {
        let extension = extension_of(file);
        let generator = self.get(&extension).ok_or_else(|| {
            GenError::InvalidModel(format!(
                "no generator for '.{}' files ({})",
                extension,
                file.display()
            ))
        })?;

        if !generator.supports(kind) {
            return Err(GenError::InvalidModel(format!(
                "generator {} cannot render {}",
                generator.name(),
                file.display()
            )));
        }
        Ok(generator)
    }

    pub fn extensions(&self) -> Vec<&str> {
        let mut extensions: Vec<&str> = self.generators.keys().map(String::as_str).collect();
        extensions.sort();
        extensions
    }

    pub fn len(&self) -> usize {
        self.generators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.generators.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use projgen_core::{DeleteOutcome, GenerationSession, MockFileSystem};

    #[test]
    fn test_defaults_registered() {
        let registry = GeneratorRegistry::with_defaults();
        assert_eq!(
            registry.extensions(),
            vec!["androidproj", "csproj", "pyproj", "vcxproj"]
        );
    }

    #[test]
    fn test_for_file_checks_kind() {
        let registry = GeneratorRegistry::with_defaults();
        assert!(registry
            .for_file(Path::new("/w/a.VCXPROJ"), &ProjectKind::Cpp)
            .is_ok());
        assert!(matches!(
            registry.for_file(
                Path::new("/w/a.vcxproj"),
                &ProjectKind::Python(Default::default())
            ),
            Err(GenError::InvalidModel(_))
        ));
        assert!(registry
            .for_file(Path::new("/w/a.unknown"), &ProjectKind::Cpp)
            .is_err());
    }

    #[test]
    fn test_commit_defers_stale_shared() {
        let stale = Path::new("/w/tools/packages.config");
        let fs = MockFileSystem::new().with_file(stale, "<packages />");
        let session = GenerationSession::new();
        let writer = OutputWriter::new(&fs, &session);
        let mut output = GenerationOutput::new();

        PendingOutput::file("/w/tools/tools.csproj", b"<Project />".to_vec())
            .commit(&writer, &mut output)
            .unwrap();
        PendingOutput::StaleShared {
            path: stale.to_path_buf(),
        }
        .commit(&writer, &mut output)
        .unwrap();

        assert_eq!(output.generated, vec![PathBuf::from("/w/tools/tools.csproj")]);
        assert!(fs.contents(stale).is_some());

        let removed = writer.remove_unclaimed_stale();
        assert_eq!(removed, vec![(stale.to_path_buf(), DeleteOutcome::Deleted)]);
        assert!(fs.contents(stale).is_none());
    }
}

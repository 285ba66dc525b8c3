//! # projgen_core
//!
//! Core machinery for generating IDE project files from an in-memory project
//! model.
//!
//! This crate knows nothing about any particular file format. It provides:
//!
//! - Scoped placeholder resolution with guaranteed scope cleanup
//! - Output buffers that drop lines tagged for removal
//! - Write-if-different output with shared-output deduplication
//! - Declarative first-match option selection
//! - Configuration sorting, identity validation and dependency checks
//! - Stale output cleanup across runs
//!
//! ## Example
//!
//! ```rust
//! use projgen_core::{OutputBuffer, Resolver, Value};
//!
//! let resolver = Resolver::new();
//! let mut buffer = OutputBuffer::new();
//! {
//!     let _scope = resolver
//!         .declare_all([("name", Value::from("core")), ("warnings", Value::Omit)])
//!         .unwrap();
//!     buffer.write(&resolver, "<Name>[name]</Name>\n<Warn>[warnings]</Warn>\n").unwrap();
//! }
//! assert_eq!(buffer.finalize(), b"<Name>core</Name>\n".to_vec());
//! ```

pub mod cleanup;
pub mod error;
pub mod fs;
pub mod model;
pub mod options;
pub mod output;
pub mod resolver;
pub mod session;
pub mod settings;
pub mod validator;
pub mod value;
pub mod writer;

pub use cleanup::{cleanup_stale, CleanupReport, OutputDatabase};
pub use error::{GenError, GenResult};
pub use fs::{FileSystem, MockFileSystem, OsFileSystem};
pub use model::{
    project_guid_for, AndroidPackage, Configuration, IncludedProject, OutputKind,
    PackageReference, Project, ProjectKind, ProjectReference, PythonProject, Solution,
    SolutionConfiguration, Target,
};
pub use options::{uniform_option, AxisWriter, ExplicitOptions, OptionRule, OptionSelector};
pub use output::{remove_tagged_lines, OutputBuffer};
pub use resolver::{Resolver, ScopeGuard};
pub use session::GenerationSession;
pub use settings::{DependencyCheck, GeneratorSettings};
pub use validator::{
    check_dependency_consistency, consolidate_dependencies, field_diff, sort_and_validate,
    FieldDifference, ValidationResult,
};
pub use value::{Value, OMIT_TAG};
pub use writer::{DeleteOutcome, GenerationOutput, OutputWriter, SharedOutcome, WriteOutcome};

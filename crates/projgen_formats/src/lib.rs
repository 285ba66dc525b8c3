//! # projgen_formats
//!
//! Project file generators built on `projgen_core`:
//!
//! - `.vcxproj` for C++ projects
//! - `.csproj` plus the shared NuGet `packages.config`
//! - `.pyproj` for Python projects
//! - `.androidproj` for Android packaging projects
//! - `.sln` solutions
//!
//! The [`Builder`] runs them over a set of projects, in parallel when
//! enabled, and reports every failure without stopping the other projects.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use projgen_core::{
//!     Configuration, GeneratorSettings, MockFileSystem, OutputKind, Project, ProjectKind,
//! };
//! use projgen_formats::Builder;
//!
//! let project = Project::new("core", ProjectKind::Cpp, "/w/core")
//!     .file("core.cpp")
//!     .configuration(
//!         Configuration::new("core", "Debug", "x64")
//!             .project_file("/w/core/core.vcxproj")
//!             .output(OutputKind::Lib),
//!     );
//!
//! let fs = MockFileSystem::new();
//! let builder = Builder::new(GeneratorSettings::default()).with_file_system(Arc::new(fs.clone()));
//! let report = builder.generate(&[project], &[]).unwrap();
//!
//! assert!(report.is_success());
//! assert!(fs.contents(std::path::Path::new("/w/core/core.vcxproj")).is_some());
//! ```

pub mod androidproj;
pub mod builder;
pub mod context;
pub mod csproj;
pub mod generator;
mod msbuild;
pub mod packages_config;
pub mod pyproj;
pub mod sln;
pub mod util;
pub mod vcxproj;

pub use androidproj::AndroidprojGenerator;
pub use builder::{Builder, GenerationReport, ProjectFailure};
pub use context::GenerationContext;
pub use csproj::CsprojGenerator;
pub use generator::{GeneratorRegistry, ProjectGenerator};
pub use pyproj::PyprojGenerator;
pub use sln::SlnGenerator;
pub use util::{format_guid, project_type_guid, relative_path, windows_path};
pub use vcxproj::VcxprojGenerator;

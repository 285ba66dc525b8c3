//! NuGet `packages.config` shared by the C# projects of one directory.
//!
//! Several projects may live in the same directory and reference the same
//! `packages.config`. The file is written once per session, by whichever
//! project claims it first, and is never removed while a project of the
//! run still produces it.

use std::collections::BTreeSet;
use std::path::PathBuf;

use tracing::debug;

use projgen_core::{GenResult, OutputBuffer, PackageReference, Value};

use crate::context::GenerationContext;
use crate::generator::PendingOutput;

pub const FILE_NAME: &str = "packages.config";

mod template {
    pub const BEGIN: &str = "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<packages>\n";

    pub const PACKAGE: &str = "  <package id=\"[package.name]\" version=\"[package.version]\" \
                               targetFramework=\"[framework]\" />\n";

    pub const END: &str = "</packages>\n";
}

/// Path of the `packages.config` next to the project file.
pub fn packages_config_path(context: &GenerationContext<'_>) -> PathBuf {
    context.directory().join(FILE_NAME)
}

/// Distinct NuGet references of every configuration, sorted.
pub fn collect_packages(context: &GenerationContext<'_>) -> Vec<PackageReference> {
    context
        .configurations()
        .iter()
        .flat_map(|conf| conf.nuget_references.iter().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Folder name of a .NET framework version: `v4.7.2` becomes `net472`.
pub fn framework_folder(version: &str) -> String {
    let digits: String = version.chars().filter(|c| c.is_ascii_digit()).collect();
    format!("net{}", digits)
}

/// Render the `packages.config` of the project directory.
///
/// Without NuGet references the file is marked stale. The builder removes
/// it at the end of the run when it is writable and no other project of the
/// run produced it.
pub fn generate(context: &GenerationContext<'_>, framework: &str) -> GenResult<PendingOutput> {
    let path = packages_config_path(context);
    let packages = collect_packages(context);

    if packages.is_empty() {
        debug!("{} has no NuGet references", context.file().display());
        return Ok(PendingOutput::StaleShared { path });
    }

    let content = render(context, &packages, framework)?;
    Ok(PendingOutput::Shared { path, content })
}

fn render(
    context: &GenerationContext<'_>,
    packages: &[PackageReference],
    framework: &str,
) -> GenResult<Vec<u8>> {
    let resolver = context.resolver();
    let mut buffer = OutputBuffer::new();

    buffer.write_verbatim(template::BEGIN);
    {
        let _framework = resolver.declare("framework", framework_folder(framework));
        for package in packages {
            let _package = resolver.declare("package", Value::from_serialize(package)?);
            buffer.write(&resolver, template::PACKAGE)?;
        }
    }
    buffer.write_verbatim(template::END);

    Ok(buffer.finalize())
}

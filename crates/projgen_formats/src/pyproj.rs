//! Python Tools project (`.pyproj`) generator.

use projgen_core::{GenResult, OutputBuffer, ProjectKind, PythonProject, Value};

use crate::context::GenerationContext;
use crate::generator::{PendingOutput, ProjectGenerator};
use crate::msbuild::write_source_files;
use crate::util::{format_guid, PYPROJ_EXTENSION};

mod template {
    pub const PROJECT_BEGIN: &str = "<Project DefaultTargets=\"Build\" xmlns=\"http://schemas.microsoft.com/developer/msbuild/2003\" ToolsVersion=\"4.0\">
";

    pub const PROJECT_DESCRIPTION: &str = "  <PropertyGroup>
    <Configuration Condition=\" '$(Configuration)' == '' \">[first.name]</Configuration>
    <SchemaVersion>2.0</SchemaVersion>
    <ProjectGuid>[guid]</ProjectGuid>
    <ProjectHome>[projectHome]</ProjectHome>
    <StartupFile>[startupFile]</StartupFile>
    <SearchPath>[searchPath]</SearchPath>
    <WorkingDirectory>.</WorkingDirectory>
    <OutputPath>.</OutputPath>
    <ProjectTypeGuids>{888888a0-9f3d-457c-b088-3a5042f75d52}</ProjectTypeGuids>
    <LaunchProvider>Standard Python launcher</LaunchProvider>
    <InterpreterId>[interpreterId]</InterpreterId>
    <InterpreterVersion>[interpreterVersion]</InterpreterVersion>
  </PropertyGroup>
";

    pub const CONFIGURATION: &str =
        "  <PropertyGroup Condition=\"'$(Configuration)' == '[conf.name]'\" />\n";

    pub const TOOLS: &str = "  <PropertyGroup>
    <VisualStudioVersion Condition=\" '$(VisualStudioVersion)' == '' \">10.0</VisualStudioVersion>
    <PtvsTargetsFile>$(MSBuildExtensionsPath32)\\Microsoft\\VisualStudio\\v$(VisualStudioVersion)\\Python Tools\\Microsoft.PythonTools.targets</PtvsTargetsFile>
  </PropertyGroup>
";

    pub const ITEM_GROUP_BEGIN: &str = "  <ItemGroup>\n";

    pub const ITEM_GROUP_END: &str = "  </ItemGroup>\n";

    pub const PROJECT_REFERENCE: &str = "    <ProjectReference Include=\"[include]\">
      <Name>[projectName]</Name>
      <Project>[projectGuid]</Project>
      <Private>True</Private>
    </ProjectReference>
";

    pub const PROJECT_END: &str = "  <Import Project=\"$(PtvsTargetsFile)\" Condition=\"Exists($(PtvsTargetsFile))\" />
</Project>
";
}

/// Generator for Python projects.
#[derive(Debug, Default, Clone, Copy)]
pub struct PyprojGenerator;

impl PyprojGenerator {
    fn render(
        &self,
        context: &GenerationContext<'_>,
        python: &PythonProject,
    ) -> GenResult<Vec<u8>> {
        let resolver = context.resolver();
        let mut buffer = OutputBuffer::new();
        let first = context.first();
        let project = context.project();

        buffer.write_verbatim(template::PROJECT_BEGIN);

        let search_path: Vec<String> = python
            .search_paths
            .iter()
            .map(|p| context.relative(&project.source_root.join(p)))
            .collect();

        {
            let _description = resolver.declare_all([
                ("first", Value::from_serialize(first)?),
                ("guid", Value::from(format_guid(first.project_guid))),
                ("projectHome", Value::from(context.relative(&project.source_root))),
                (
                    "startupFile",
                    Value::from(python.startup_file.as_ref().map(|p| {
                        p.to_string_lossy().replace('/', "\\")
                    })),
                ),
                (
                    "searchPath",
                    if search_path.is_empty() {
                        Value::Omit
                    } else {
                        Value::from(search_path)
                    },
                ),
                (
                    "interpreterId",
                    Value::from(python.interpreter_id.map(format_guid)),
                ),
                (
                    "interpreterVersion",
                    Value::from(python.interpreter_version.clone()),
                ),
            ])?;
            buffer.write(&resolver, template::PROJECT_DESCRIPTION)?;
        }

        for conf in context.configurations() {
            let _conf = resolver.declare("conf", Value::from_serialize(*conf)?);
            buffer.write(&resolver, template::CONFIGURATION)?;
        }

        buffer.write_verbatim(template::TOOLS);

        write_source_files(&mut buffer, &resolver, context, |extension| match extension {
            "py" | "pyw" => Some("Compile"),
            _ => Some("Content"),
        })?;

        if !context.dependencies().is_empty() {
            buffer.write_verbatim(template::ITEM_GROUP_BEGIN);
            for dependency in context.dependencies() {
                let _reference = resolver.declare_all([
                    ("include", Value::from(context.relative(&dependency.project_file))),
                    ("projectName", Value::from(&dependency.project_name)),
                    ("projectGuid", Value::from(format_guid(dependency.guid))),
                ])?;
                buffer.write(&resolver, template::PROJECT_REFERENCE)?;
            }
            buffer.write_verbatim(template::ITEM_GROUP_END);
        }

        buffer.write_verbatim(template::PROJECT_END);
        Ok(buffer.finalize())
    }
}

impl ProjectGenerator for PyprojGenerator {
    fn name(&self) -> &str {
        "pyproj"
    }

    fn extension(&self) -> &str {
        PYPROJ_EXTENSION
    }

    fn supports(&self, kind: &ProjectKind) -> bool {
        matches!(kind, ProjectKind::Python(_))
    }

    fn generate(&self, context: &GenerationContext<'_>) -> GenResult<Vec<PendingOutput>> {
        let python = match &context.project().kind {
            ProjectKind::Python(python) => python.clone(),
            _ => PythonProject::default(),
        };
        let content = self.render(context, &python)?;
        Ok(vec![PendingOutput::file(context.file(), content)])
    }
}

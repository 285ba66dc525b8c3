//! C# project (`.csproj`) generator.

use std::path::Path;

use projgen_core::{
    uniform_option, ExplicitOptions, GenResult, OptionRule, OptionSelector, OutputBuffer,
    OutputKind, ProjectKind, Value,
};

use crate::context::GenerationContext;
use crate::generator::{PendingOutput, ProjectGenerator};
use crate::msbuild::{configuration_bindings, write_project_references, write_source_files};
use crate::packages_config;
use crate::util::{format_guid, relative_path, windows_path, CSPROJ_EXTENSION, TOOLS_VERSION};

const DEFAULT_FRAMEWORK: &str = "v4.7.2";

mod template {
    pub const PROJECT_BEGIN: &str = "<?xml version=\"1.0\" encoding=\"utf-8\"?>
<Project ToolsVersion=\"[toolsVersion]\" DefaultTargets=\"Build\" xmlns=\"http://schemas.microsoft.com/developer/msbuild/2003\">
  <Import Project=\"$(MSBuildExtensionsPath)\\$(MSBuildToolsVersion)\\Microsoft.Common.props\" Condition=\"Exists('$(MSBuildExtensionsPath)\\$(MSBuildToolsVersion)\\Microsoft.Common.props')\" />
";

    pub const PROJECT_DESCRIPTION: &str = "  <PropertyGroup>
    <Configuration Condition=\" '$(Configuration)' == '' \">[first.name]</Configuration>
    <Platform Condition=\" '$(Platform)' == '' \">[first.platform]</Platform>
    <ProjectGuid>[guid]</ProjectGuid>
    <OutputType>[outputType]</OutputType>
    <RootNamespace>[rootNamespace]</RootNamespace>
    <AssemblyName>[assemblyName]</AssemblyName>
    <TargetFrameworkVersion>[targetFramework]</TargetFrameworkVersion>
    <FileAlignment>512</FileAlignment>
  </PropertyGroup>
";

    pub const CONFIGURATION: &str = "  <PropertyGroup Condition=\" '$(Configuration)|$(Platform)' == '[conf.name]|[conf.platform]' \">
    <PlatformTarget>[conf.platform]</PlatformTarget>
    <DebugSymbols>[options.DebugSymbols]</DebugSymbols>
    <DebugType>[options.DebugType]</DebugType>
    <Optimize>[options.Optimize]</Optimize>
    <OutputPath>[options.OutputPath]\\</OutputPath>
    <IntermediateOutputPath>[options.IntermediateOutputPath]\\</IntermediateOutputPath>
    <DefineConstants>[options.DefineConstants]</DefineConstants>
    <WarningLevel>[options.WarningLevel]</WarningLevel>
    <TreatWarningsAsErrors>[options.TreatWarningsAsErrors]</TreatWarningsAsErrors>
  </PropertyGroup>
";

    pub const PACKAGES_CONFIG: &str = "  <ItemGroup>
    <None Include=\"packages.config\" />
  </ItemGroup>
";

    pub const PROJECT_END: &str = "  <Import Project=\"$(MSBuildToolsPath)\\Microsoft.CSharp.targets\" />
</Project>
";
}

/// Generator for C# projects, including their `packages.config`.
#[derive(Debug, Default, Clone, Copy)]
pub struct CsprojGenerator;

impl CsprojGenerator {
    fn generate_options(&self, selector: &mut OptionSelector<'_>) -> GenResult<()> {
        let conf = selector.configuration();
        let output = conf.output;
        let framework = conf
            .chosen("TargetFramework")
            .unwrap_or(DEFAULT_FRAMEWORK)
            .to_string();
        let defines = if conf.defines.is_empty() {
            Value::Omit
        } else {
            Value::from(conf.defines.join(";"))
        };
        let directory = conf.project_directory().to_path_buf();
        let output_path = windows_path(&relative_path(&directory, &conf.target_path));
        let intermediate_path = windows_path(&relative_path(&directory, &conf.intermediate_path));

        selector.select(
            "OutputType",
            vec![
                OptionRule::when(move |_| output == OutputKind::DotNetConsoleApp, |w| {
                    w.set("OutputType", "Exe")
                }),
                OptionRule::when(move |_| output == OutputKind::DotNetWindowsApp, |w| {
                    w.set("OutputType", "WinExe")
                }),
                OptionRule::when(move |_| output == OutputKind::DotNetClassLibrary, |w| {
                    w.set("OutputType", "Library")
                }),
            ],
        )?;

        selector.select(
            "DebugInformation",
            vec![
                OptionRule::setting("DebugInformation", "Full", |w| {
                    w.set("DebugSymbols", "true");
                    w.set("DebugType", "full");
                }),
                OptionRule::default_setting("DebugInformation", "PdbOnly", |w| {
                    w.omit("DebugSymbols");
                    w.set("DebugType", "pdbonly");
                }),
                OptionRule::setting("DebugInformation", "None", |w| {
                    w.set("DebugSymbols", "false");
                    w.set("DebugType", "none");
                }),
            ],
        )?;

        selector.select(
            "Optimize",
            vec![
                OptionRule::setting("Optimize", "Enabled", |w| w.set("Optimize", "true")),
                OptionRule::default_setting("Optimize", "Disabled", |w| {
                    w.set("Optimize", "false")
                }),
            ],
        )?;

        selector.select_with_fallback(
            "WarningLevel",
            vec![
                OptionRule::setting("WarningLevel", "Level0", |w| w.set("WarningLevel", 0)),
                OptionRule::setting("WarningLevel", "Level1", |w| w.set("WarningLevel", 1)),
                OptionRule::setting("WarningLevel", "Level2", |w| w.set("WarningLevel", 2)),
                OptionRule::setting("WarningLevel", "Level3", |w| w.set("WarningLevel", 3)),
                OptionRule::setting("WarningLevel", "Level4", |w| w.set("WarningLevel", 4)),
            ],
            |w| w.set("WarningLevel", 4),
        )?;

        selector.select_with_fallback(
            "TreatWarningsAsErrors",
            vec![OptionRule::setting("TreatWarningsAsErrors", "Enabled", |w| {
                w.set("TreatWarningsAsErrors", "true")
            })],
            |w| w.omit("TreatWarningsAsErrors"),
        )?;

        selector.assign("TargetFrameworkVersion", framework)?;
        selector.assign("DefineConstants", defines)?;
        selector.assign("OutputPath", output_path)?;
        selector.assign("IntermediateOutputPath", intermediate_path)?;
        Ok(())
    }

    fn render(
        &self,
        context: &GenerationContext<'_>,
        options: &[ExplicitOptions],
        header: &ProjectHeader,
        has_packages: bool,
    ) -> GenResult<Vec<u8>> {
        let resolver = context.resolver();
        let mut buffer = OutputBuffer::new();
        let first = context.first();

        {
            let _header = resolver.declare("toolsVersion", TOOLS_VERSION);
            buffer.write(&resolver, template::PROJECT_BEGIN)?;
        }

        {
            let _description = resolver.declare_all([
                ("first", Value::from_serialize(first)?),
                ("guid", Value::from(format_guid(first.project_guid))),
                ("outputType", header.output_type.clone()),
                ("rootNamespace", Value::from(&header.root_namespace)),
                ("assemblyName", Value::from(&first.target_file_name)),
                ("targetFramework", header.framework.clone()),
            ])?;
            buffer.write(&resolver, template::PROJECT_DESCRIPTION)?;
        }

        for (conf, opts) in context.configurations().iter().zip(options) {
            let _conf = resolver.declare_all(configuration_bindings(conf, opts)?)?;
            buffer.write(&resolver, template::CONFIGURATION)?;
        }

        write_source_files(&mut buffer, &resolver, context, |extension| match extension {
            "cs" => Some("Compile"),
            "xaml" => Some("Page"),
            "config" | "json" | "xml" | "txt" => Some("Content"),
            _ => Some("None"),
        })?;

        if has_packages {
            buffer.write_verbatim(template::PACKAGES_CONFIG);
        }

        write_project_references(&mut buffer, &resolver, context)?;

        buffer.write_verbatim(template::PROJECT_END);
        Ok(buffer.finalize())
    }
}

/// Project-wide values that must agree across configurations.
struct ProjectHeader {
    output_type: Value,
    framework: Value,
    root_namespace: String,
}

impl ProjectHeader {
    fn new(context: &GenerationContext<'_>, options: &[ExplicitOptions]) -> GenResult<Self> {
        let file: &Path = context.file();
        let root_namespace = match &context.project().kind {
            ProjectKind::CSharp { root_namespace } => root_namespace.clone(),
            _ => context.first().project_name.clone(),
        };

        Ok(Self {
            output_type: uniform_option(file, "OutputType", options, Value::Omit)?,
            framework: uniform_option(
                file,
                "TargetFrameworkVersion",
                options,
                Value::from(DEFAULT_FRAMEWORK),
            )?,
            root_namespace,
        })
    }
}

impl ProjectGenerator for CsprojGenerator {
    fn name(&self) -> &str {
        "csproj"
    }

    fn extension(&self) -> &str {
        CSPROJ_EXTENSION
    }

    fn supports(&self, kind: &ProjectKind) -> bool {
        matches!(kind, ProjectKind::CSharp { .. })
    }

    fn generate(&self, context: &GenerationContext<'_>) -> GenResult<Vec<PendingOutput>> {
        let options = context.compute_options(|selector| self.generate_options(selector))?;
        let header = ProjectHeader::new(context, &options)?;
        let has_packages = !packages_config::collect_packages(context).is_empty();

        let content = self.render(context, &options, &header, has_packages)?;
        let packages = packages_config::generate(context, &header.framework.to_string())?;
        Ok(vec![PendingOutput::file(context.file(), content), packages])
    }
}

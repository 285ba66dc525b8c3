//! Visual C++ project (`.vcxproj`) generator.

use projgen_core::{
    ExplicitOptions, GenResult, OptionRule, OptionSelector, OutputBuffer, OutputKind, ProjectKind,
    Value,
};

use crate::context::GenerationContext;
use crate::generator::{PendingOutput, ProjectGenerator};
use crate::msbuild::{
    configuration_bindings, write_project_configurations, write_project_references,
    write_source_files,
};
use crate::util::{format_guid, relative_path, windows_path, TOOLS_VERSION, VCXPROJ_EXTENSION};

mod template {
    pub const PROJECT_BEGIN: &str = "<?xml version=\"1.0\" encoding=\"utf-8\"?>
<Project DefaultTargets=\"Build\" ToolsVersion=\"[toolsVersion]\" xmlns=\"http://schemas.microsoft.com/developer/msbuild/2003\">
";

    pub const PROJECT_DESCRIPTION: &str = "  <PropertyGroup Label=\"Globals\">
    <ProjectGuid>[guid]</ProjectGuid>
    <RootNamespace>[projectName]</RootNamespace>
    <ProjectName>[projectName]</ProjectName>
    <WindowsTargetPlatformVersion>[windowsTargetPlatformVersion]</WindowsTargetPlatformVersion>
  </PropertyGroup>
  <Import Project=\"$(VCTargetsPath)\\Microsoft.Cpp.Default.props\" />
";

    pub const CONFIGURATION_GENERAL: &str = "  <PropertyGroup Condition=\"'$(Configuration)|$(Platform)'=='[conf.name]|[conf.platform]'\" Label=\"Configuration\">
    <ConfigurationType>[options.ConfigurationType]</ConfigurationType>
    <UseDebugLibraries>[options.UseDebugLibraries]</UseDebugLibraries>
    <CharacterSet>[options.CharacterSet]</CharacterSet>
    <PlatformToolset>[options.PlatformToolset]</PlatformToolset>
  </PropertyGroup>
";

    pub const AFTER_CONFIGURATION_GENERAL: &str =
        "  <Import Project=\"$(VCTargetsPath)\\Microsoft.Cpp.props\" />
  <ImportGroup Label=\"ExtensionSettings\">
  </ImportGroup>
  <PropertyGroup Label=\"UserMacros\" />
";

    pub const CONFIGURATION_PATHS: &str = "  <PropertyGroup Condition=\"'$(Configuration)|$(Platform)'=='[conf.name]|[conf.platform]'\">
    <OutDir>[options.OutputDirectory]\\</OutDir>
    <IntDir>[options.IntermediateDirectory]\\</IntDir>
    <TargetName>[options.TargetName]</TargetName>
  </PropertyGroup>
";

    pub const ITEM_DEFINITION: &str = "  <ItemDefinitionGroup Condition=\"'$(Configuration)|$(Platform)'=='[conf.name]|[conf.platform]'\">
    <ClCompile>
      <WarningLevel>[options.WarningLevel]</WarningLevel>
      <Optimization>[options.Optimization]</Optimization>
      <PreprocessorDefinitions>[options.PreprocessorDefinitions]</PreprocessorDefinitions>
    </ClCompile>
  </ItemDefinitionGroup>
";

    pub const PROJECT_END: &str = "  <Import Project=\"$(VCTargetsPath)\\Microsoft.Cpp.targets\" />
  <ImportGroup Label=\"ExtensionTargets\">
  </ImportGroup>
</Project>
";
}

/// Generator for C++ projects.
#[derive(Debug, Default, Clone, Copy)]
pub struct VcxprojGenerator;

impl VcxprojGenerator {
    fn generate_options(&self, selector: &mut OptionSelector<'_>) -> GenResult<()> {
        let conf = selector.configuration();
        let output = conf.output;
        let preprocessor = if conf.defines.is_empty() {
            Value::Omit
        } else {
            Value::from(format!("{};%(PreprocessorDefinitions)", conf.defines.join(";")))
        };
        let output_directory = conf.target_path.clone();
        let intermediate_directory = conf.intermediate_path.clone();
        let target_name = conf.target_file_name.clone();
        let toolset = conf.setting_or_omit("PlatformToolset");

        selector.select(
            "ConfigurationType",
            vec![
                OptionRule::when(move |_| output == OutputKind::Exe, |w| {
                    w.set("ConfigurationType", "Application")
                }),
                OptionRule::when(move |_| output == OutputKind::Lib, |w| {
                    w.set("ConfigurationType", "StaticLibrary")
                }),
                OptionRule::when(move |_| output == OutputKind::Dll, |w| {
                    w.set("ConfigurationType", "DynamicLibrary")
                }),
                OptionRule::when(
                    move |_| matches!(output, OutputKind::Utility | OutputKind::None),
                    |w| w.set("ConfigurationType", "Utility"),
                ),
            ],
        )?;

        selector.select(
            "DebugLibraries",
            vec![
                OptionRule::setting("DebugLibraries", "Enabled", |w| {
                    w.set("UseDebugLibraries", "true")
                }),
                OptionRule::default_setting("DebugLibraries", "Disabled", |w| {
                    w.set("UseDebugLibraries", "false")
                }),
            ],
        )?;

        selector.select_with_fallback(
            "CharacterSet",
            vec![
                OptionRule::setting("CharacterSet", "Unicode", |w| {
                    w.set("CharacterSet", "Unicode")
                }),
                OptionRule::setting("CharacterSet", "MultiByte", |w| {
                    w.set("CharacterSet", "MultiByte")
                }),
            ],
            |w| w.omit("CharacterSet"),
        )?;

        selector.select(
            "WarningLevel",
            vec![
                OptionRule::setting("WarningLevel", "Level0", |w| {
                    w.set("WarningLevel", "TurnOffAllWarnings")
                }),
                OptionRule::setting("WarningLevel", "Level1", |w| {
                    w.set("WarningLevel", "Level1")
                }),
                OptionRule::setting("WarningLevel", "Level2", |w| {
                    w.set("WarningLevel", "Level2")
                }),
                OptionRule::default_setting("WarningLevel", "Level3", |w| {
                    w.set("WarningLevel", "Level3")
                }),
                OptionRule::setting("WarningLevel", "Level4", |w| {
                    w.set("WarningLevel", "Level4")
                }),
                OptionRule::setting("WarningLevel", "All", |w| {
                    w.set("WarningLevel", "EnableAllWarnings")
                }),
            ],
        )?;

        selector.select_with_fallback(
            "Optimization",
            vec![
                OptionRule::setting("Optimization", "Disable", |w| {
                    w.set("Optimization", "Disabled")
                }),
                OptionRule::setting("Optimization", "MinimizeSize", |w| {
                    w.set("Optimization", "MinSpace")
                }),
                OptionRule::setting("Optimization", "MaximizeSpeed", |w| {
                    w.set("Optimization", "MaxSpeed")
                }),
                OptionRule::setting("Optimization", "FullOptimization", |w| {
                    w.set("Optimization", "Full")
                }),
            ],
            |w| w.omit("Optimization"),
        )?;

        selector.assign("PlatformToolset", toolset)?;
        selector.assign("PreprocessorDefinitions", preprocessor)?;
        selector.assign("TargetName", target_name)?;

        let directory = selector.configuration().project_directory().to_path_buf();
        selector.assign(
            "OutputDirectory",
            windows_path(&relative_path(&directory, &output_directory)),
        )?;
        selector.assign(
            "IntermediateDirectory",
            windows_path(&relative_path(&directory, &intermediate_directory)),
        )?;
        Ok(())
    }

    fn render(
        &self,
        context: &GenerationContext<'_>,
        options: &[ExplicitOptions],
    ) -> GenResult<Vec<u8>> {
        let resolver = context.resolver();
        let mut buffer = OutputBuffer::new();
        let first = context.first();

        {
            let _header = resolver.declare("toolsVersion", TOOLS_VERSION);
            buffer.write(&resolver, template::PROJECT_BEGIN)?;
        }

        write_project_configurations(&mut buffer, &resolver, context)?;

        {
            let _globals = resolver.declare_all([
                ("guid", Value::from(format_guid(first.project_guid))),
                ("projectName", Value::from(&first.project_name)),
                (
                    "windowsTargetPlatformVersion",
                    first.setting_or_omit("WindowsTargetPlatformVersion"),
                ),
            ])?;
            buffer.write(&resolver, template::PROJECT_DESCRIPTION)?;
        }

        for (conf, opts) in context.configurations().iter().zip(options) {
            let _conf = resolver.declare_all(configuration_bindings(conf, opts)?)?;
            buffer.write(&resolver, template::CONFIGURATION_GENERAL)?;
        }

        buffer.write_verbatim(template::AFTER_CONFIGURATION_GENERAL);

        for (conf, opts) in context.configurations().iter().zip(options) {
            let _conf = resolver.declare_all(configuration_bindings(conf, opts)?)?;
            buffer.write(&resolver, template::CONFIGURATION_PATHS)?;
        }

        for (conf, opts) in context.configurations().iter().zip(options) {
            let _conf = resolver.declare_all(configuration_bindings(conf, opts)?)?;
            buffer.write(&resolver, template::ITEM_DEFINITION)?;
        }

        write_source_files(&mut buffer, &resolver, context, |extension| match extension {
            "c" | "cc" | "cpp" | "cxx" => Some("ClCompile"),
            "h" | "hh" | "hpp" | "hxx" | "inl" => Some("ClInclude"),
            "rc" => Some("ResourceCompile"),
            _ => Some("None"),
        })?;

        write_project_references(&mut buffer, &resolver, context)?;

        buffer.write_verbatim(template::PROJECT_END);
        Ok(buffer.finalize())
    }
}

impl ProjectGenerator for VcxprojGenerator {
    fn name(&self) -> &str {
        "vcxproj"
    }

    fn extension(&self) -> &str {
        VCXPROJ_EXTENSION
    }

    fn supports(&self, kind: &ProjectKind) -> bool {
        matches!(kind, ProjectKind::Cpp)
    }

    fn generate(&self, context: &GenerationContext<'_>) -> GenResult<Vec<PendingOutput>> {
        let options = context.compute_options(|selector| self.generate_options(selector))?;
        let content = self.render(context, &options)?;
        Ok(vec![PendingOutput::file(context.file(), content)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use projgen_core::{Configuration, GeneratorSettings, Project};
    use std::path::Path;

    fn render(project: &Project) -> GenResult<String> {
        let settings = GeneratorSettings::default();
        let confs: Vec<&Configuration> = project.configurations.iter().collect();
        let ctx = GenerationContext::new(
            project,
            Path::new("/w/core/core.vcxproj"),
            &confs,
            &settings,
        )?;
        let generator = VcxprojGenerator;
        let options = ctx.compute_options(|s| generator.generate_options(s))?;
        Ok(String::from_utf8(generator.render(&ctx, &options)?).unwrap())
    }

    fn conf(name: &str) -> Configuration {
        Configuration::new("core", name, "x64")
            .project_file("/w/core/core.vcxproj")
            .target_path("/w/bin/x64")
            .intermediate_path("/w/core/obj")
    }

    #[test]
    fn test_unset_options_drop_their_lines() {
        let project = Project::new("core", ProjectKind::Cpp, "/w/core")
            .configuration(conf("Debug").setting("DebugLibraries", "Enabled"));
        let text = render(&project).unwrap();

        assert!(text.contains("<UseDebugLibraries>true</UseDebugLibraries>"));
        assert!(text.contains("<WarningLevel>Level3</WarningLevel>"));
        assert!(text.contains("<OutDir>..\\bin\\x64\\</OutDir>"));
        assert!(text.contains("<IntDir>obj\\</IntDir>"));
        assert!(!text.contains("<Optimization>"));
        assert!(!text.contains("<CharacterSet>"));
        assert!(!text.contains("<PreprocessorDefinitions>"));
        assert!(!text.contains("WindowsTargetPlatformVersion"));
        assert!(!text.contains(projgen_core::OMIT_TAG));
    }

    #[test]
    fn test_configurations_rendered_in_sorted_order() {
        let project = Project::new("core", ProjectKind::Cpp, "/w/core")
            .configuration(conf("Release").setting("Optimization", "FullOptimization"))
            .configuration(conf("Debug").define("_DEBUG"));
        let text = render(&project).unwrap();

        let debug = text.find("Include=\"Debug|x64\"").unwrap();
        let release = text.find("Include=\"Release|x64\"").unwrap();
        assert!(debug < release);
        assert!(text.contains("<Optimization>Full</Optimization>"));
        assert!(text.contains(
            "<PreprocessorDefinitions>_DEBUG;%(PreprocessorDefinitions)</PreprocessorDefinitions>"
        ));
    }

    #[test]
    fn test_dotnet_output_has_no_configuration_type() {
        let project = Project::new("core", ProjectKind::Cpp, "/w/core")
            .configuration(conf("Debug").output(OutputKind::DotNetClassLibrary));
        assert!(matches!(
            render(&project),
            Err(projgen_core::GenError::NoOptionMatch { axis, .. }) if axis == "ConfigurationType"
        ));
    }
}

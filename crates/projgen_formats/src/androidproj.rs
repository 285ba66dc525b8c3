//! Android packaging project (`.androidproj`) generator.

use projgen_core::{
    uniform_option, AndroidPackage, Configuration, ExplicitOptions, GenError, GenResult, OptionRule,
    OptionSelector, OutputBuffer, OutputKind, ProjectKind, Value,
};

use crate::context::GenerationContext;
use crate::generator::{PendingOutput, ProjectGenerator};
use crate::msbuild::{
    configuration_bindings, write_project_configurations, write_project_references,
    write_source_files,
};
use crate::util::{
    format_guid, relative_path, windows_path, ANDROIDPROJ_EXTENSION, TOOLS_VERSION,
};

mod template {
    pub const PROJECT_BEGIN: &str = "<?xml version=\"1.0\" encoding=\"utf-8\"?>
<Project DefaultTargets=\"Build\" ToolsVersion=\"[toolsVersion]\" xmlns=\"http://schemas.microsoft.com/developer/msbuild/2003\">
";

    pub const PROJECT_DESCRIPTION: &str = "  <PropertyGroup Label=\"Globals\">
    <ProjectGuid>[guid]</ProjectGuid>
    <RootNamespace>[projectName]</RootNamespace>
    <MinimumVisualStudioVersion>[toolsVersion]</MinimumVisualStudioVersion>
    <ProjectVersion>1.0</ProjectVersion>
    <ProjectName>[projectName]</ProjectName>
    <AndroidTargetsPath>[androidTargetsPath]</AndroidTargetsPath>
  </PropertyGroup>
  <Import Project=\"$(AndroidTargetsPath)\\Android.Default.props\" />
";

    pub const CONFIGURATION_GENERAL: &str = "  <PropertyGroup Condition=\"'$(Configuration)|$(Platform)'=='[conf.name]|[conf.platform]'\" Label=\"Configuration\">
    <UseDebugLibraries>[options.UseDebugLibraries]</UseDebugLibraries>
    <AndroidAPILevel>[options.AndroidAPILevel]</AndroidAPILevel>
    <OutDir>$(ProjectDir)[options.OutputDirectory]\\</OutDir>
    <IntDir>[options.IntermediateDirectory]\\</IntDir>
    <TargetName>[options.OutputFile]</TargetName>
    <ShowAndroidPathsVerbosity>[options.ShowAndroidPathsVerbosity]</ShowAndroidPathsVerbosity>
  </PropertyGroup>
";

    pub const AFTER_CONFIGURATION_GENERAL: &str =
        "  <Import Project=\"$(AndroidTargetsPath)\\Android.props\" />
  <ImportGroup Label=\"ExtensionSettings\">
  </ImportGroup>
  <ImportGroup Label=\"Shared\" />
  <PropertyGroup Label=\"UserMacros\" />
";

    pub const ITEM_DEFINITION: &str = "  <ItemDefinitionGroup Condition=\"'$(Configuration)|$(Platform)'=='[conf.name]|[conf.platform]'\">
    <AntPackage>
      <WorkingDirectory>[androidPackageDirectory]</WorkingDirectory>
      <AndroidAppLibName>[options.AndroidAppLibName]</AndroidAppLibName>
    </AntPackage>
  </ItemDefinitionGroup>
";

    pub const ANDROID_FILES: &str = "  <ItemGroup>
    <AntBuildXml Include=\"[antBuildXml]\" />
    <AndroidManifest Include=\"[androidManifest]\" />
    <AntProjectPropertiesFile Include=\"[antProjectPropertiesFile]\" />
  </ItemGroup>
";

    pub const PROJECT_TARGETS: &str = "  <Import Project=\"$(AndroidTargetsPath)\\Android.targets\" />
  <ImportGroup Label=\"ExtensionTargets\" />
";

    pub const PROJECT_END: &str = "</Project>\n";
}

/// Generator for Android packaging projects.
#[derive(Debug, Default, Clone, Copy)]
pub struct AndroidprojGenerator;

/// Name of the native library the activity loads first.
///
/// The library comes from the dependency on `app_lib_project`, which must be
/// a dynamic library.
fn app_lib_name(conf: &Configuration, package: &AndroidPackage) -> GenResult<Value> {
    let Some(app_lib_project) = &package.app_lib_project else {
        return Ok(Value::Omit);
    };

    let dependency = conf
        .dependencies
        .iter()
        .find(|d| &d.project_name == app_lib_project)
        .ok_or_else(|| GenError::UnsupportedDependency {
            configuration: conf.to_string(),
            message: format!("missing dependency on app library project '{}'", app_lib_project),
        })?;

    if dependency.output != OutputKind::Dll {
        return Err(GenError::UnsupportedDependency {
            configuration: conf.to_string(),
            message: format!(
                "cannot use '{}' as app library: output type must be a dynamic library",
                dependency.project_name
            ),
        });
    }

    Ok(Value::from(&dependency.target_file_name))
}

impl AndroidprojGenerator {
    fn generate_options(
        &self,
        selector: &mut OptionSelector<'_>,
        package: &AndroidPackage,
    ) -> GenResult<()> {
        let conf = selector.configuration();
        let app_lib = app_lib_name(conf, package)?;
        let directory = conf.project_directory().to_path_buf();
        let output_directory = windows_path(&relative_path(&directory, &conf.target_path));
        let intermediate_directory =
            windows_path(&relative_path(&directory, &conf.intermediate_path));
        let output_file = conf.target_file_name.clone();
        let api_level = conf.setting_or_omit("AndroidAPILevel");
        let targets_path = conf.chosen("AndroidTargetsPath").map(|path| {
            if path.ends_with('\\') {
                path.to_string()
            } else {
                format!("{}\\", path)
            }
        });

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
            "ShowAndroidPathsVerbosity",
            vec![
                OptionRule::setting("ShowAndroidPathsVerbosity", "High", |w| {
                    w.set("ShowAndroidPathsVerbosity", "High")
                }),
                OptionRule::setting("ShowAndroidPathsVerbosity", "Normal", |w| {
                    w.set("ShowAndroidPathsVerbosity", "Normal")
                }),
                OptionRule::setting("ShowAndroidPathsVerbosity", "Low", |w| {
                    w.set("ShowAndroidPathsVerbosity", "Low")
                }),
            ],
            |w| w.omit("ShowAndroidPathsVerbosity"),
        )?;

        selector.assign("AndroidAPILevel", api_level)?;
        selector.assign("OutputFile", output_file)?;
        selector.assign("AndroidAppLibName", app_lib)?;
        selector.assign("OutputDirectory", output_directory)?;
        selector.assign("IntermediateDirectory", intermediate_directory)?;
        selector.assign("AndroidTargetsPath", Value::from(targets_path))?;
        Ok(())
    }

    fn render(
        &self,
        context: &GenerationContext<'_>,
        options: &[ExplicitOptions],
        package: &AndroidPackage,
    ) -> GenResult<Vec<u8>> {
        let resolver = context.resolver();
        let mut buffer = OutputBuffer::new();
        let first = context.first();
        let _tools = resolver.declare("toolsVersion", TOOLS_VERSION);

        buffer.write(&resolver, template::PROJECT_BEGIN)?;
        write_project_configurations(&mut buffer, &resolver, context)?;

        let targets_path =
            uniform_option(context.file(), "AndroidTargetsPath", options, Value::Omit)?;
        {
            let _globals = resolver.declare_all([
                ("projectName", Value::from(&first.project_name)),
                ("guid", Value::from(format_guid(first.project_guid))),
                ("androidTargetsPath", targets_path),
            ])?;
            buffer.write(&resolver, template::PROJECT_DESCRIPTION)?;
        }

        for (conf, opts) in context.configurations().iter().zip(options) {
            let _conf = resolver.declare_all(configuration_bindings(conf, opts)?)?;
            buffer.write(&resolver, template::CONFIGURATION_GENERAL)?;
        }

        buffer.write_verbatim(template::AFTER_CONFIGURATION_GENERAL);

        {
            let directory = context.relative(&package.ant_build_root);
            let _package = resolver.declare("androidPackageDirectory", directory);
            for (conf, opts) in context.configurations().iter().zip(options) {
                let _conf = resolver.declare_all(configuration_bindings(conf, opts)?)?;
                buffer.write(&resolver, template::ITEM_DEFINITION)?;
            }
        }

        write_source_files(&mut buffer, &resolver, context, |extension| match extension {
            "h" | "hpp" => Some("ClInclude"),
            _ => Some("Content"),
        })?;

        {
            let _files = resolver.declare_all([
                ("antBuildXml", context.relative(&package.ant_build_xml)),
                ("androidManifest", context.relative(&package.android_manifest)),
                (
                    "antProjectPropertiesFile",
                    context.relative(&package.ant_project_properties),
                ),
            ])?;
            buffer.write(&resolver, template::ANDROID_FILES)?;
        }

        buffer.write_verbatim(template::PROJECT_TARGETS);
        write_project_references(&mut buffer, &resolver, context)?;
        buffer.write_verbatim(template::PROJECT_END);

        Ok(buffer.finalize())
    }
}

impl ProjectGenerator for AndroidprojGenerator {
    fn name(&self) -> &str {
        "androidproj"
    }

    fn extension(&self) -> &str {
        ANDROIDPROJ_EXTENSION
    }

    fn supports(&self, kind: &ProjectKind) -> bool {
        matches!(kind, ProjectKind::AndroidPackage(_))
    }

    fn generate(&self, context: &GenerationContext<'_>) -> GenResult<Vec<PendingOutput>> {
        let package = match &context.project().kind {
            ProjectKind::AndroidPackage(package) => package.clone(),
            _ => AndroidPackage::default(),
        };
        let options =
            context.compute_options(|selector| self.generate_options(selector, &package))?;
        let content = self.render(context, &options, &package)?;
        Ok(vec![PendingOutput::file(context.file(), content)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use projgen_core::{GeneratorSettings, Project};
    use std::path::Path;

    const FILE: &str = "/w/apk/game.androidproj";

    fn package() -> AndroidPackage {
        AndroidPackage {
            android_manifest: "/w/apk/AndroidManifest.xml".into(),
            ant_build_xml: "/w/apk/build.xml".into(),
            ant_project_properties: "/w/apk/project.properties".into(),
            ant_build_root: "/w/apk".into(),
            app_lib_project: Some("engine".to_string()),
        }
    }

    fn engine(output: OutputKind) -> Configuration {
        Configuration::new("engine", "Debug", "ARM64")
            .project_file("/w/engine/engine.vcxproj")
            .output(output)
            .target_file_name("libengine.so")
    }

    fn apk(name: &str, dependency: &Configuration) -> Configuration {
        Configuration::new("game", name, "ARM64")
            .project_file(FILE)
            .target_file_name("game.apk")
            .target_path("/w/apk/bin")
            .intermediate_path("/w/apk/obj")
            .setting("AndroidTargetsPath", "C:\\Android\\targets")
            .depends_on(dependency)
    }

    fn render(project: &Project) -> GenResult<String> {
        let settings = GeneratorSettings::default();
        let confs: Vec<&Configuration> = project.configurations.iter().collect();
        let ctx = GenerationContext::new(project, Path::new(FILE), &confs, &settings)?;
        let package = package();
        let generator = AndroidprojGenerator;
        let options = ctx.compute_options(|s| generator.generate_options(s, &package))?;
        Ok(String::from_utf8(generator.render(&ctx, &options, &package)?).unwrap())
    }

    #[test]
    fn test_render_package() {
        let lib = engine(OutputKind::Dll);
        let project = Project::new("game", ProjectKind::AndroidPackage(package()), "/w/apk")
            .configuration(apk("Release", &lib))
            .configuration(apk("Debug", &lib));
        let text = render(&project).unwrap();

        assert!(text.contains("<AndroidAppLibName>libengine.so</AndroidAppLibName>"));
        assert!(text.contains("<TargetName>game.apk</TargetName>"));
        assert!(text.contains("<OutDir>$(ProjectDir)bin\\</OutDir>"));
        assert!(text.contains("<AndroidTargetsPath>C:\\Android\\targets\\</AndroidTargetsPath>"));
        assert!(text.contains("<ProjectReference Include=\"..\\engine\\engine.vcxproj\">"));
        assert_eq!(text.matches("<ProjectReference ").count(), 1);
        assert!(!text.contains("<AndroidAPILevel>"));
    }

    #[test]
    fn test_app_lib_must_be_dynamic() {
        let lib = engine(OutputKind::Lib);
        let project = Project::new("game", ProjectKind::AndroidPackage(package()), "/w/apk")
            .configuration(apk("Debug", &lib));
        assert!(matches!(
            render(&project),
            Err(GenError::UnsupportedDependency { .. })
        ));
    }

    #[test]
    fn test_missing_app_lib_dependency() {
        let other = Configuration::new("audio", "Debug", "ARM64")
            .project_file("/w/audio/audio.vcxproj")
            .output(OutputKind::Dll);
        let project = Project::new("game", ProjectKind::AndroidPackage(package()), "/w/apk")
            .configuration(apk("Debug", &other));
        assert!(matches!(
            render(&project),
            Err(GenError::UnsupportedDependency { message, .. }) if message.contains("engine")
        ));
    }

    #[test]
    fn test_targets_path_must_be_uniform() {
        let lib = engine(OutputKind::Dll);
        let project = Project::new("game", ProjectKind::AndroidPackage(package()), "/w/apk")
            .configuration(apk("Debug", &lib))
            .configuration(apk("Release", &lib).setting("AndroidTargetsPath", "D:\\other"));
        assert!(matches!(
            render(&project),
            Err(GenError::ConfigurationConflict { .. })
        ));
    }
}

//! Visual Studio solution (`.sln`) generator.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::debug;
use uuid::Uuid;

use projgen_core::session::output_key;
use projgen_core::{
    GenError, GenResult, GenerationOutput, GeneratorSettings, IncludedProject, OutputBuffer,
    OutputWriter, ProjectReference, Resolver, Solution, SolutionConfiguration, Value,
};

use crate::util::{format_guid, project_type_guid, relative_path, windows_path};

mod template {
    pub const HEADER: &str = "
Microsoft Visual Studio Solution File, Format Version 12.00
# Visual Studio Version 17
VisualStudioVersion = [visualStudioVersion]
MinimumVisualStudioVersion = 10.0.40219.1
";

    pub const PROJECT: &str =
        "Project(\"{[projectTypeGuid]}\") = \"[projectName]\", \"[projectFile]\", \"[projectGuid]\"
EndProject
";

    pub const GLOBAL_BEGIN: &str = "Global\n";

    pub const SOLUTION_CONFIGURATIONS_BEGIN: &str =
        "\tGlobalSection(SolutionConfigurationPlatforms) = preSolution\n";

    pub const SOLUTION_CONFIGURATION: &str =
        "\t\t[configurationName]|[category] = [configurationName]|[category]\n";

    pub const PROJECT_CONFIGURATIONS_BEGIN: &str =
        "\tGlobalSection(ProjectConfigurationPlatforms) = postSolution\n";

    pub const PROJECT_ACTIVE_CONFIGURATION: &str =
        "\t\t[projectGuid].[solutionConf]|[solutionPlatform].ActiveCfg = \
         [projectConf]|[projectPlatform]\n";

    pub const PROJECT_BUILD_CONFIGURATION: &str =
        "\t\t[projectGuid].[solutionConf]|[solutionPlatform].Build.0 = \
         [projectConf]|[projectPlatform]\n";

    pub const SECTION_END: &str = "\tEndGlobalSection\n";

    pub const GLOBAL_END: &str = "\tGlobalSection(SolutionProperties) = preSolution
\t\tHideSolutionNode = FALSE
\tEndGlobalSection
EndGlobal
";
}

const VISUAL_STUDIO_VERSION: &str = "17.0.31903.59";

/// Generator for solution files.
#[derive(Debug, Default, Clone, Copy)]
pub struct SlnGenerator;

/// Solution configurations in (name, platform) order.
fn sorted_configurations(solution: &Solution) -> GenResult<Vec<&SolutionConfiguration>> {
    if solution.configurations.is_empty() {
        return Err(GenError::InvalidModel(format!(
            "solution '{}' has no configurations",
            solution.name
        )));
    }

    let mut configurations: Vec<&SolutionConfiguration> = solution.configurations.iter().collect();
    configurations.sort_by(|a, b| (&a.name, &a.platform).cmp(&(&b.name, &b.platform)));

    for pair in configurations.windows(2) {
        if pair[0].section_name() == pair[1].section_name() {
            return Err(GenError::ConfigurationConflict {
                file: solution.file.clone(),
                message: format!(
                    "solution configuration '{}' is declared twice",
                    pair[0].section_name()
                ),
            });
        }
    }
    Ok(configurations)
}

/// One entry per distinct project GUID, sorted by (name, GUID).
///
/// A GUID names exactly one project file and a project file has exactly one
/// GUID; either mismatch is a conflict.
fn distinct_projects<'s>(
    solution: &'s Solution,
    configurations: &[&'s SolutionConfiguration],
) -> GenResult<Vec<&'s ProjectReference>> {
    let mut projects: BTreeMap<Uuid, &ProjectReference> = BTreeMap::new();
    let mut guids: BTreeMap<PathBuf, Uuid> = BTreeMap::new();

    for &conf in configurations {
        let mut seen = Vec::new();
        for included in &conf.projects {
            let project = &included.project;
            if seen.contains(&project.guid) {
                return Err(GenError::ConfigurationConflict {
                    file: solution.file.clone(),
                    message: format!(
                        "project {} is included twice in solution configuration '{}'",
                        project.project_name,
                        conf.section_name()
                    ),
                });
            }
            seen.push(project.guid);

            let path = output_key(&project.project_file);
            match guids.get(&path) {
                Some(&guid) if guid != project.guid => {
                    return Err(GenError::ConfigurationConflict {
                        file: solution.file.clone(),
                        message: format!(
                            "{} is listed under two GUIDs: {} and {}",
                            project.project_file.display(),
                            format_guid(guid),
                            format_guid(project.guid)
                        ),
                    });
                }
                Some(_) => {}
                None => {
                    guids.insert(path, project.guid);
                }
            }

            match projects.get(&project.guid) {
                Some(existing) if existing.project_file != project.project_file => {
                    return Err(GenError::ConfigurationConflict {
                        file: solution.file.clone(),
                        message: format!(
                            "GUID {} is shared by {} and {}",
                            format_guid(project.guid),
                            existing.project_file.display(),
                            project.project_file.display()
                        ),
                    });
                }
                Some(_) => {}
                None => {
                    projects.insert(project.guid, project);
                }
            }
        }
    }

    let mut projects: Vec<&ProjectReference> = projects.into_values().collect();
    projects.sort_by(|a, b| (&a.project_name, a.guid).cmp(&(&b.project_name, b.guid)));
    Ok(projects)
}

impl SlnGenerator {
    /// Render `solution` to its file content.
    pub fn render(&self, solution: &Solution, settings: &GeneratorSettings) -> GenResult<Vec<u8>> {
        let configurations = sorted_configurations(solution)?;
        let projects = distinct_projects(solution, &configurations)?;
        let directory = solution.file.parent().unwrap_or_else(|| Path::new(""));

        let resolver = Resolver::with_case_sensitivity(settings.case_sensitive_placeholders);
        let mut buffer = OutputBuffer::new();

        {
            let _version = resolver.declare("visualStudioVersion", VISUAL_STUDIO_VERSION);
            buffer.write(&resolver, template::HEADER)?;
        }

        for project in &projects {
            let _project = resolver.declare_all([
                ("projectTypeGuid", Value::from(project_type_guid(&project.project_file)?)),
                ("projectName", Value::from(&project.project_name)),
                (
                    "projectFile",
                    Value::from(windows_path(&relative_path(directory, &project.project_file))),
                ),
                ("projectGuid", Value::from(format_guid(project.guid))),
            ])?;
            buffer.write(&resolver, template::PROJECT)?;
        }

        buffer.write_verbatim(template::GLOBAL_BEGIN);

        buffer.write_verbatim(template::SOLUTION_CONFIGURATIONS_BEGIN);
        for conf in &configurations {
            let _conf = resolver.declare_all([
                ("configurationName", conf.name.as_str()),
                ("category", conf.platform.as_str()),
            ])?;
            buffer.write(&resolver, template::SOLUTION_CONFIGURATION)?;
        }
        buffer.write_verbatim(template::SECTION_END);

        buffer.write_verbatim(template::PROJECT_CONFIGURATIONS_BEGIN);
        for project in &projects {
            let _project = resolver.declare("projectGuid", format_guid(project.guid));
            for conf in &configurations {
                let Some(included) = find_included(conf, project.guid) else {
                    continue;
                };
                let _conf = resolver.declare_all([
                    ("solutionConf", conf.name.as_str()),
                    ("solutionPlatform", conf.platform.as_str()),
                    ("projectConf", included.configuration.as_str()),
                    ("projectPlatform", included.platform.as_str()),
                ])?;
                buffer.write(&resolver, template::PROJECT_ACTIVE_CONFIGURATION)?;
                if included.build {
                    buffer.write(&resolver, template::PROJECT_BUILD_CONFIGURATION)?;
                }
            }
        }
        buffer.write_verbatim(template::SECTION_END);

        buffer.write_verbatim(template::GLOBAL_END);
        Ok(buffer.finalize())
    }

    /// Render and write `solution`.
    pub fn generate(
        &self,
        solution: &Solution,
        settings: &GeneratorSettings,
        writer: &OutputWriter<'_>,
        output: &mut GenerationOutput,
    ) -> GenResult<()> {
        debug!("Generating solution {}", solution.name);
        let content = self.render(solution, settings)?;
        writer.write_into(&solution.file, &content, output)?;
        Ok(())
    }
}

fn find_included(conf: &SolutionConfiguration, guid: Uuid) -> Option<&IncludedProject> {
    conf.projects.iter().find(|p| p.project.guid == guid)
}

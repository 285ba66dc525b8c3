//! Fragments shared by the MSBuild-based generators.

use projgen_core::{GenResult, OutputBuffer, Resolver, Value};

use crate::context::GenerationContext;
use crate::util::format_guid;

mod template {
    pub const CONFIGURATIONS_BEGIN: &str = "  <ItemGroup Label=\"ProjectConfigurations\">\n";

    pub const CONFIGURATION: &str = "    <ProjectConfiguration Include=\"[conf.name]|[conf.platform]\">
      <Configuration>[conf.name]</Configuration>
      <Platform>[conf.platform]</Platform>
    </ProjectConfiguration>
";

    pub const ITEM_GROUP_BEGIN: &str = "  <ItemGroup>\n";

    pub const ITEM_GROUP_END: &str = "  </ItemGroup>\n";

    pub const PROJECT_REFERENCE: &str = "    <ProjectReference Include=\"[include]\">
      <Project>[projectGuid]</Project>
      <Name>[projectName]</Name>
    </ProjectReference>
";
}

/// Bind `conf` and `options` for one configuration.
///
/// The returned values are meant for [`Resolver::declare_all`].
pub fn configuration_bindings(
    conf: &projgen_core::Configuration,
    options: &projgen_core::ExplicitOptions,
) -> GenResult<[(&'static str, Value); 2]> {
    Ok([
        ("conf", Value::from_serialize(conf)?),
        ("options", options.to_value()),
    ])
}

/// The `ProjectConfigurations` item group.
pub fn write_project_configurations(
    buffer: &mut OutputBuffer,
    resolver: &Resolver,
    context: &GenerationContext<'_>,
) -> GenResult<()> {
    buffer.write_verbatim(template::CONFIGURATIONS_BEGIN);
    for conf in context.configurations() {
        let _conf = resolver.declare("conf", Value::from_serialize(*conf)?);
        buffer.write(resolver, template::CONFIGURATION)?;
    }
    buffer.write_verbatim(template::ITEM_GROUP_END);
    Ok(())
}

/// One `ProjectReference` per consolidated dependency; nothing when the
/// project has none.
pub fn write_project_references(
    buffer: &mut OutputBuffer,
    resolver: &Resolver,
    context: &GenerationContext<'_>,
) -> GenResult<()> {
    if context.dependencies().is_empty() {
        return Ok(());
    }

    buffer.write_verbatim(template::ITEM_GROUP_BEGIN);
    for dependency in context.dependencies() {
        let _reference = resolver.declare_all([
            ("include", Value::from(context.relative(&dependency.project_file))),
            ("projectGuid", Value::from(format_guid(dependency.guid))),
            ("projectName", Value::from(&dependency.project_name)),
        ])?;
        buffer.write(resolver, template::PROJECT_REFERENCE)?;
    }
    buffer.write_verbatim(template::ITEM_GROUP_END);
    Ok(())
}

/// Write one item per source file, `element` chosen from the file
/// extension; files mapped to `None` are left out.
pub fn write_source_files<F>(
    buffer: &mut OutputBuffer,
    resolver: &Resolver,
    context: &GenerationContext<'_>,
    element_for: F,
) -> GenResult<()>
where
    F: Fn(&str) -> Option<&'static str>,
{
    let files: Vec<(String, &'static str)> = context
        .source_files()
        .into_iter()
        .filter_map(|(include, extension)| element_for(&extension).map(|e| (include, e)))
        .collect();

    if files.is_empty() {
        return Ok(());
    }

    buffer.write_verbatim(template::ITEM_GROUP_BEGIN);
    for (include, element) in files {
        let _file = resolver.declare_all([("element", element), ("include", include.as_str())])?;
        buffer.write(resolver, "    <[element] Include=\"[include]\" />\n")?;
    }
    buffer.write_verbatim(template::ITEM_GROUP_END);
    Ok(())
}

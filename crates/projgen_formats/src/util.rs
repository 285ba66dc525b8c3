//! Path and GUID helpers shared by the generators.

use std::path::{Component, Path, PathBuf};

use uuid::Uuid;

use projgen_core::{GenError, GenResult};

pub const VCXPROJ_EXTENSION: &str = "vcxproj";
pub const CSPROJ_EXTENSION: &str = "csproj";
pub const PYPROJ_EXTENSION: &str = "pyproj";
pub const ANDROIDPROJ_EXTENSION: &str = "androidproj";

/// MSBuild tools version written in project headers.
pub const TOOLS_VERSION: &str = "17.0";

/// Path of `to` relative to the directory `from_dir`.
///
/// Paths that share no root (one relative and one absolute, or different
/// drive prefixes) are returned unchanged.
pub fn relative_path(from_dir: &Path, to: &Path) -> PathBuf {
    if from_dir.has_root() != to.has_root() {
        return to.to_path_buf();
    }

    let from: Vec<Component> = normalized(from_dir);
    let target: Vec<Component> = normalized(to);

    if let (Some(Component::Prefix(a)), Some(Component::Prefix(b))) = (from.first(), target.first())
    {
        if a != b {
            return to.to_path_buf();
        }
    }

    let common = from
        .iter()
        .zip(&target)
        .take_while(|(a, b)| a == b)
        .count();

    let mut relative = PathBuf::new();
    for _ in common..from.len() {
        relative.push("..");
    }
    for component in &target[common..] {
        relative.push(component.as_os_str());
    }

    if relative.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        relative
    }
}

fn normalized(path: &Path) -> Vec<Component<'_>> {
    let mut components = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir
                if matches!(components.last(), Some(Component::Normal(_))) =>
            {
                components.pop();
            }
            other => components.push(other),
        }
    }
    components
}

/// Render a path with `\` separators, as MSBuild and solution files expect.
pub fn windows_path(path: &Path) -> String {
    path.components()
        .map(|component| match component {
            Component::RootDir => String::new(),
            other => other.as_os_str().to_string_lossy().into_owned(),
        })
        .collect::<Vec<_>>()
        .join("\\")
}

/// `{XXXXXXXX-XXXX-XXXX-XXXX-XXXXXXXXXXXX}` in upper case.
pub fn format_guid(guid: Uuid) -> String {
    format!("{{{}}}", guid.hyphenated().to_string().to_uppercase())
}

/// Solution project type GUID for a project file, chosen by extension.
pub fn project_type_guid(project_file: &Path) -> GenResult<&'static str> {
    let extension = project_file
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        VCXPROJ_EXTENSION => Ok("8BC9CEB8-8B4A-11D0-8D11-00A0C91BC942"),
        CSPROJ_EXTENSION => Ok("FAE04EC0-301F-11D3-BF4B-00C04F79EFBC"),
        PYPROJ_EXTENSION => Ok("888888A0-9F3D-457C-B088-3A5042F75D52"),
        ANDROIDPROJ_EXTENSION => Ok("EAAC564B-F271-4B9C-99B6-F18BE0B11958"),
        _ => Err(GenError::InvalidModel(format!(
            "unknown file extension '{}': unable to detect the project type of {}",
            extension,
            project_file.display()
        ))),
    }
}

/// Lower-cased extension of `path`, empty when it has none.
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_path_sibling() {
        let rel = relative_path(Path::new("/w/app"), Path::new("/w/core/core.vcxproj"));
        assert_eq!(rel, PathBuf::from("../core/core.vcxproj"));
        assert_eq!(windows_path(&rel), "..\\core\\core.vcxproj");
    }

    #[test]
    fn test_relative_path_nested_and_same() {
        assert_eq!(
            relative_path(Path::new("/w/app"), Path::new("/w/app/src/main.cpp")),
            PathBuf::from("src/main.cpp")
        );
        assert_eq!(
            relative_path(Path::new("/w/app"), Path::new("/w/app")),
            PathBuf::from(".")
        );
        assert_eq!(
            relative_path(Path::new("/w/app/./x/.."), Path::new("/w/bin")),
            PathBuf::from("../bin")
        );
    }

    #[test]
    fn test_relative_path_mixed_roots() {
        assert_eq!(
            relative_path(Path::new("/w/app"), Path::new("bin/x64")),
            PathBuf::from("bin/x64")
        );
    }

    #[test]
    fn test_format_guid() {
        let guid = Uuid::parse_str("8bc9ceb8-8b4a-11d0-8d11-00a0c91bc942").unwrap();
        assert_eq!(format_guid(guid), "{8BC9CEB8-8B4A-11D0-8D11-00A0C91BC942}");
    }

    #[test]
    fn test_project_type_guid() {
        assert_eq!(
            project_type_guid(Path::new("/w/a.CSPROJ")).unwrap(),
            "FAE04EC0-301F-11D3-BF4B-00C04F79EFBC"
        );
        assert!(matches!(
            project_type_guid(Path::new("/w/a.txt")),
            Err(GenError::InvalidModel(_))
        ));
    }
}

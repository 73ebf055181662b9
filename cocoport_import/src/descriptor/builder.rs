use std::{fs, path::Path};

use cocoport_shared::{
    absolute_path,
    log::{info, trace},
    normalize_path,
};
use serde::Deserialize;

use crate::{
    common::{parent_dir, validate_project_name},
    descriptor::{DeclaredResources, ProjectDescriptor},
    Error, Result,
};

/// Content of a builder project file that is relevant for the import.
#[derive(Debug, Deserialize)]
struct BuilderProjectFile {
    #[serde(rename = "resourcePaths")]
    resource_paths: Vec<ResourcePathConfig>,
    #[serde(rename = "fileVersion", default)]
    file_version: Option<plist::Value>,
}

#[derive(Debug, Deserialize)]
struct ResourcePathConfig {
    path: String,
}

/// Parses the property list of a builder project.
///
/// The project is named after the descriptor file and every entry of `resourcePaths` is resolved
/// relative to the directory of the descriptor.
pub fn parse_builder_descriptor(descriptor_path: impl AsRef<Path>) -> Result<ProjectDescriptor> {
    let descriptor_path = absolute_path(descriptor_path.as_ref())?;
    let malformed = |reason: String| Error::MalformedDescriptor(descriptor_path.clone(), reason);

    let name = descriptor_path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .ok_or_else(|| Error::InvalidPath(descriptor_path.clone()))?
        .to_owned();
    validate_project_name(&descriptor_path, &name)?;

    let content = fs::read(&descriptor_path).map_err(|err| malformed(err.to_string()))?;
    let project_file: BuilderProjectFile = plist::from_bytes(&content).map_err(|err| malformed(err.to_string()))?;

    let version = project_file.file_version.and_then(|value| match value {
        plist::Value::Integer(integer) => integer
            .as_signed()
            .map(|signed| signed.to_string())
            .or_else(|| integer.as_unsigned().map(|unsigned| unsigned.to_string())),
        plist::Value::String(string) => Some(string),
        _ => None,
    });
    info!(
        "Project Name : {name}, File Version : {}",
        version.as_deref().unwrap_or("unknown")
    );

    let project_dir = parent_dir(&descriptor_path);
    let roots = project_file
        .resource_paths
        .iter()
        .map(|config| {
            let root = normalize_path(project_dir.join(&config.path));
            trace!("Declared resource path '{}' resolves to {root:?}", config.path);
            root
        })
        .collect::<Vec<_>>();
    if roots.is_empty() {
        return Err(Error::NoResources(descriptor_path));
    }

    Ok(ProjectDescriptor {
        path: descriptor_path,
        name,
        version,
        resources: DeclaredResources::Roots(roots),
    })
}

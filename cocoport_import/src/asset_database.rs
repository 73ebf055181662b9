//! Interfaces to the asset database of the host project and an implementation that writes directly
//! into the assets folder of the host project.

use std::{
    fs,
    path::{Path, PathBuf},
};

use cocoport_shared::{
    log::{info, trace},
    relative_path_inside,
    uuid::Uuid,
    walkdir::WalkDir,
};
use serde::{Deserialize, Serialize};

use crate::{config::ImportConfig, AssetUrl, BoxError};

/// Extension of the files that store the [`AssetMetaData`] next to every imported file.
pub const META_FILE_EXTENSION: &str = "meta";

/// Imports a folder of staged files into the asset database.
pub trait BulkImporter {
    /// Imports `staged_root` as a folder with the same name below `destination_url`. Blocks until
    /// the import has finished.
    fn import(&self, staged_root: &Path, destination_url: &AssetUrl, recursive: bool) -> Result<(), BoxError>;
}

/// Converts the scene files of a project into scenes of the host project.
pub trait SceneConverter {
    fn convert(&self, conversion: &SceneConversion) -> Result<(), BoxError>;
}

/// Scene file format of a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneFormat {
    /// `.ccb` files of builder projects
    Builder,
    /// `.csd` files of studio projects
    Studio,
}

impl SceneFormat {
    /// Extension of the scene files.
    pub fn extension(&self) -> &'static str {
        match self {
            SceneFormat::Builder => "ccb",
            SceneFormat::Studio => "csd",
        }
    }
}

/// Everything a [`SceneConverter`] needs to convert the scenes of one project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneConversion {
    pub format: SceneFormat,
    /// Scene files in the order they have been discovered.
    pub scene_files: Vec<PathBuf>,
    /// Directory that the resources referenced by the scenes are resolved against.
    pub resource_root: PathBuf,
    pub staging_root: PathBuf,
    /// Url under which the resources of the project have been imported.
    pub destination_url: AssetUrl,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetMetaData {
    pub uuid: Uuid,
    pub imported_from: PathBuf,
}

/// Asset database that stores the assets as plain files in the assets folder of the host project.
///
/// `db://assets/Game/logo.png` is stored as `<project>/assets/Game/logo.png` together with
/// `<project>/assets/Game/logo.png.meta`. Scene files are stored unchanged.
#[derive(Debug, Clone)]
pub struct FileSystemAssetDatabase {
    assets_root_url: AssetUrl,
    assets_path: PathBuf,
}

impl FileSystemAssetDatabase {
    pub fn new(config: &ImportConfig) -> Self {
        Self {
            assets_root_url: config.assets_root_url().clone(),
            assets_path: config.assets_path(),
        }
    }

    /// Returns the location of `url` on the filesystem.
    pub fn path_of(&self, url: &AssetUrl) -> Result<PathBuf, BoxError> {
        let relative = url
            .as_str()
            .strip_prefix(self.assets_root_url.as_str())
            .filter(|rest| rest.is_empty() || rest.starts_with('/'))
            .ok_or_else(|| format!("url '{url}' is not located below '{}'", self.assets_root_url))?;
        let relative = relative.trim_start_matches('/');
        if relative.split('/').any(|segment| segment == "..") {
            return Err(format!("url '{url}' leaves the asset root").into());
        }
        Ok(self.assets_path.join(relative))
    }

    /// Copies `source` to `destination` and writes the meta file. The uuid of an existing meta
    /// file is kept.
    fn store(&self, source: &Path, destination: &Path) -> Result<(), BoxError> {
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(source, destination)?;

        let meta_file_path = meta_file_path(destination);
        let uuid = match fs::read_to_string(&meta_file_path) {
            Ok(content) => serde_yaml::from_str::<AssetMetaData>(&content)?.uuid,
            Err(_) => Uuid::new_v4(),
        };
        let meta_data = AssetMetaData {
            uuid,
            imported_from: source.to_owned(),
        };
        fs::write(&meta_file_path, serde_yaml::to_string(&meta_data)?)?;
        trace!("Stored {source:?} as {destination:?} with uuid {uuid}");
        Ok(())
    }
}

/// Returns the path of the meta file that belongs to `asset_path`, e.g. `logo.png.meta`.
pub fn meta_file_path(asset_path: &Path) -> PathBuf {
    let mut file_name = asset_path.file_name().unwrap_or_default().to_owned();
    file_name.push(".");
    file_name.push(META_FILE_EXTENSION);
    asset_path.with_file_name(file_name)
}

impl BulkImporter for FileSystemAssetDatabase {
    fn import(&self, staged_root: &Path, destination_url: &AssetUrl, recursive: bool) -> Result<(), BoxError> {
        let folder_name = staged_root
            .file_name()
            .ok_or_else(|| format!("staged root {staged_root:?} has no name"))?;
        let destination_root = self.path_of(destination_url)?.join(folder_name);
        info!("Importing {staged_root:?} into {destination_root:?}");

        let max_depth = if recursive { usize::MAX } else { 1 };
        let mut count = 0;
        for entry in WalkDir::new(staged_root).min_depth(1).max_depth(max_depth).sort_by_file_name() {
            let entry = entry?;
            let relative = entry.path().strip_prefix(staged_root)?;
            let destination = destination_root.join(relative);
            if entry.file_type().is_dir() {
                fs::create_dir_all(&destination)?;
            } else {
                self.store(entry.path(), &destination)?;
                count += 1;
            }
        }
        fs::create_dir_all(&destination_root)?;

        info!("Imported {count} files into {destination_root:?}");
        Ok(())
    }
}

impl SceneConverter for FileSystemAssetDatabase {
    fn convert(&self, conversion: &SceneConversion) -> Result<(), BoxError> {
        let destination_root = self.path_of(&conversion.destination_url)?;
        for scene_file in &conversion.scene_files {
            let relative = relative_path_inside(scene_file, &conversion.staging_root)
                .or_else(|| relative_path_inside(scene_file, &conversion.resource_root))
                .or_else(|| scene_file.file_name().map(PathBuf::from))
                .ok_or_else(|| format!("scene file {scene_file:?} has no name"))?;
            self.store(scene_file, &destination_root.join(relative))?;
        }
        info!(
            "Stored {} {:?} scene files in {destination_root:?}",
            conversion.scene_files.len(),
            conversion.format
        );
        Ok(())
    }
}

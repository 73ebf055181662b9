use std::path::{Path, PathBuf};

use crate::{
    common::{ASSETS_ROOT_URL, TEMP_FOLDER_NAME},
    AssetUrl,
};

/// Name of the folder in the host project that backs the [`ASSETS_ROOT_URL`].
pub const ASSETS_FOLDER_NAME: &str = "assets";

/// Settings of the host project that the resources are imported into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportConfig {
    project_path: PathBuf,
    temp_folder_name: String,
    assets_root_url: AssetUrl,
    assets_folder_name: String,
}

impl ImportConfig {
    /// Creates the default configuration for the host project at `project_path`.
    pub fn new(project_path: impl Into<PathBuf>) -> Self {
        Self {
            project_path: project_path.into(),
            temp_folder_name: TEMP_FOLDER_NAME.to_owned(),
            assets_root_url: AssetUrl::new(ASSETS_ROOT_URL),
            assets_folder_name: ASSETS_FOLDER_NAME.to_owned(),
        }
    }

    pub fn with_temp_folder_name(mut self, temp_folder_name: impl Into<String>) -> Self {
        self.temp_folder_name = temp_folder_name.into();
        self
    }

    pub fn with_assets_root_url(mut self, assets_root_url: AssetUrl) -> Self {
        self.assets_root_url = assets_root_url;
        self
    }

    pub fn with_assets_folder_name(mut self, assets_folder_name: impl Into<String>) -> Self {
        self.assets_folder_name = assets_folder_name.into();
        self
    }

    pub fn project_path(&self) -> &Path {
        &self.project_path
    }

    pub fn assets_root_url(&self) -> &AssetUrl {
        &self.assets_root_url
    }

    /// Folder in which the staging directories are created.
    pub fn temp_path(&self) -> PathBuf {
        self.project_path.join(&self.temp_folder_name)
    }

    /// Folder that contains the assets of the host project.
    pub fn assets_path(&self) -> PathBuf {
        self.project_path.join(&self.assets_folder_name)
    }

    /// Staging directory for the resources of the project `project_name`.
    pub fn staging_root(&self, project_name: &str) -> PathBuf {
        self.temp_path().join(project_name)
    }

    /// Staging directory for the scene files of the project `project_name`, e.g. `Game_ccbs`.
    pub fn scene_staging_root(&self, project_name: &str, scene_extension: &str) -> PathBuf {
        self.temp_path().join(format!("{project_name}_{scene_extension}s"))
    }

    /// Url under which the resources of the project `project_name` are imported.
    pub fn destination_url(&self, project_name: &str) -> AssetUrl {
        self.assets_root_url.join(project_name)
    }
}

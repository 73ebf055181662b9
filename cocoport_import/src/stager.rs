//! Copies the resources of a project into the staging directories.
//!
//! Builder projects are staged by walking their resource directories on the filesystem while studio
//! projects are staged by walking the resource tree declared in their descriptor. In both cases
//! the directory structure relative to the resource directory is kept:
//!
//! ```text
//! Resources/                        temp/Game/
//! ├─ resources-auto/                ├─ logo.png
//! │  ├─ logo.png            ==>     ├─ ui/
//! ├─ ui/                            │  ├─ button.png
//! │  ├─ button.png
//! │  ├─ Menu.ccb            ==>     temp/Game_ccbs/ui/Menu.ccb
//! ```

use std::{
    fs,
    path::{Component, Path, PathBuf},
};

use cocoport_shared::{
    log::{trace, warn},
    pathdiff, relative_path_inside,
    walkdir::WalkDir,
};

use crate::{
    common::{has_extension, AUTO_RESOURCES_FOLDER_NAME},
    descriptor::{FontFormat, ResourceKind, ResourceNode},
    references::{resolve_references, ReferenceKind},
    AssetUrl, Result, Warning,
};

/// Working state of one import.
#[derive(Debug)]
pub struct StagingPlan {
    resource_roots: Vec<PathBuf>,
    staging_root: PathBuf,
    scene_staging_root: PathBuf,
    destination_url: AssetUrl,
    scene_files: Vec<PathBuf>,
    warnings: Vec<Warning>,
    staged_file_count: usize,
}

impl StagingPlan {
    pub fn new(
        resource_roots: Vec<PathBuf>,
        staging_root: impl Into<PathBuf>,
        scene_staging_root: impl Into<PathBuf>,
        destination_url: AssetUrl,
    ) -> Self {
        Self {
            resource_roots,
            staging_root: staging_root.into(),
            scene_staging_root: scene_staging_root.into(),
            destination_url,
            scene_files: Vec::new(),
            warnings: Vec::new(),
            staged_file_count: 0,
        }
    }

    pub fn resource_roots(&self) -> &[PathBuf] {
        &self.resource_roots
    }

    /// Directory into which all resources except the scene files are copied.
    pub fn staging_root(&self) -> &Path {
        &self.staging_root
    }

    /// Directory into which scene files are copied if the format requires them to be staged.
    pub fn scene_staging_root(&self) -> &Path {
        &self.scene_staging_root
    }

    pub fn destination_url(&self) -> &AssetUrl {
        &self.destination_url
    }

    /// Scene files in the order they have been discovered.
    pub fn scene_files(&self) -> &[PathBuf] {
        &self.scene_files
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Number of files that have been copied into the staging directories.
    pub fn staged_file_count(&self) -> usize {
        self.staged_file_count
    }

    pub(crate) fn take_warnings(&mut self) -> Vec<Warning> {
        std::mem::take(&mut self.warnings)
    }

    /// Logs the warning and keeps it for the report.
    pub fn warn(&mut self, warning: Warning) {
        warn!("{warning}");
        self.warnings.push(warning);
    }

    pub fn extend_warnings(&mut self, warnings: impl IntoIterator<Item = Warning>) {
        for warning in warnings {
            self.warn(warning);
        }
    }

    /// Keeps warnings that have already been logged when they occurred.
    pub(crate) fn extend_collected_warnings(&mut self, warnings: impl IntoIterator<Item = Warning>) {
        self.warnings.extend(warnings);
    }

    pub fn enqueue_scene_file(&mut self, scene_file: impl Into<PathBuf>) {
        let scene_file = scene_file.into();
        trace!("Enqueued scene file {scene_file:?}");
        self.scene_files.push(scene_file);
    }

    /// Copies `source` to `destination` unless `destination` already exists. Returns whether the
    /// file has been copied.
    ///
    /// A missing source or a failing copy is reported as a [`Warning`] so that the remaining
    /// resources can still be staged.
    pub fn stage_file(&mut self, source: &Path, destination: &Path) -> bool {
        if !source.is_file() {
            self.warn(Warning::MissingSource(source.to_owned()));
            return false;
        }
        if destination.exists() {
            trace!("Skipping {source:?} because {destination:?} is already staged");
            return false;
        }

        let copy_result = destination
            .parent()
            .map_or(Ok(()), fs::create_dir_all)
            .and_then(|_| fs::copy(source, destination));
        if let Err(err) = copy_result {
            self.warn(Warning::CopyFailed {
                source_path: source.to_owned(),
                destination: destination.to_owned(),
                reason: err.to_string(),
            });
            return false;
        }

        trace!("Staged {source:?} as {destination:?}");
        self.staged_file_count += 1;
        true
    }
}

/// Removes the [`AUTO_RESOURCES_FOLDER_NAME`] components so that the content of those folders
/// ends up in their parent folder.
fn collapse_auto_resources(relative_dir: &Path) -> PathBuf {
    relative_dir
        .components()
        .filter(|component| !matches!(component, Component::Normal(name) if *name == AUTO_RESOURCES_FOLDER_NAME))
        .collect()
}

/// Stages the content of a builder resource directory.
///
/// Scene files (`scene_extension`) are copied to the scene staging root at their path relative
/// to `resource_root` and enqueued for conversion. Every other file is copied to the staging root.
/// Entries are visited in the order of their file names.
pub fn stage_builder_root(plan: &mut StagingPlan, resource_root: &Path, scene_extension: &str) -> Result<()> {
    if !resource_root.is_dir() {
        plan.warn(Warning::MissingSource(resource_root.to_owned()));
        return Ok(());
    }

    for entry in WalkDir::new(resource_root).min_depth(1).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!("Failed to read directory entry in {resource_root:?}: {err}");
                continue;
            }
        };

        let Some(relative_path) = pathdiff::diff_paths(entry.path(), resource_root) else {
            warn!("Failed to get relative path of {:?} relative to {resource_root:?}", entry.path());
            continue;
        };

        if entry.file_type().is_dir() {
            let destination = plan.staging_root().join(collapse_auto_resources(&relative_path));
            fs::create_dir_all(&destination)?;
        } else if has_extension(entry.path(), scene_extension) {
            let destination = plan.scene_staging_root().join(&relative_path);
            if plan.stage_file(entry.path(), &destination) {
                plan.enqueue_scene_file(destination);
            }
        } else {
            let relative_dir = relative_path.parent().unwrap_or_else(|| Path::new(""));
            let destination = plan
                .staging_root()
                .join(collapse_auto_resources(relative_dir))
                .join(entry.file_name());
            plan.stage_file(entry.path(), &destination);
        }
    }

    Ok(())
}

/// Stages the resource tree declared by a studio project.
pub struct StudioTreeWalker<'a> {
    plan: &'a mut StagingPlan,
    resource_root: &'a Path,
    descriptor_path: &'a Path,
    scene_extension: &'a str,
}

impl<'a> StudioTreeWalker<'a> {
    pub fn new(plan: &'a mut StagingPlan, resource_root: &'a Path, descriptor_path: &'a Path, scene_extension: &'a str) -> Self {
        Self {
            plan,
            resource_root,
            descriptor_path,
            scene_extension,
        }
    }

    /// Stages the resource root itself and all `nodes` below it.
    pub fn stage(&mut self, nodes: &[ResourceNode]) -> Result<()> {
        self.create_asset_folder(self.resource_root)?;
        self.stage_nodes(nodes, self.resource_root)
    }

    fn stage_nodes(&mut self, nodes: &[ResourceNode], current_dir: &Path) -> Result<()> {
        for node in nodes {
            let file_path = current_dir.join(&node.name);
            match &node.kind {
                ResourceKind::Folder(children) => {
                    self.create_asset_folder(&file_path)?;
                    self.stage_nodes(children, &file_path)?;
                }
                ResourceKind::SceneReference => match find_scene_file(&file_path, self.scene_extension) {
                    Some(scene_file) => self.plan.enqueue_scene_file(scene_file),
                    None => self.plan.warn(Warning::MissingSource(file_path)),
                },
                ResourceKind::PlistInfo => {}
                ResourceKind::Image | ResourceKind::Font(FontFormat::TrueType) | ResourceKind::Audio => {
                    self.stage_file(&file_path);
                }
                ResourceKind::PlistImageFolder { plist_file, image } => {
                    for (attribute, value) in [("PListFile", plist_file), ("Image", image)] {
                        match value {
                            Some(value) => {
                                self.stage_file(&current_dir.join(value));
                            }
                            None => self.plan.warn(Warning::InvalidNode {
                                descriptor: self.descriptor_path.to_owned(),
                                tag: "PlistImageFolder".to_owned(),
                                reason: format!("missing {attribute} attribute in '{}'", node.name),
                            }),
                        }
                    }
                }
                ResourceKind::Font(FontFormat::Bitmap) => self.stage_with_references(&file_path, ReferenceKind::BitmapFont),
                ResourceKind::Particle => self.stage_with_references(&file_path, ReferenceKind::Particle),
                ResourceKind::TileMap => self.stage_with_references(&file_path, ReferenceKind::TileMap),
            }
        }
        Ok(())
    }

    /// Creates the folder in the staging root that mirrors `folder`.
    fn create_asset_folder(&mut self, folder: &Path) -> Result<()> {
        match relative_path_inside(folder, self.resource_root) {
            Some(relative_path) => fs::create_dir_all(self.plan.staging_root().join(relative_path))?,
            None => self.plan.warn(Warning::OutsideResourceRoot {
                file: folder.to_owned(),
                resource_root: self.resource_root.to_owned(),
            }),
        }
        Ok(())
    }

    fn stage_file(&mut self, file: &Path) -> bool {
        match relative_path_inside(file, self.resource_root) {
            Some(relative_path) => {
                let destination = self.plan.staging_root().join(relative_path);
                self.plan.stage_file(file, &destination)
            }
            None => {
                self.plan.warn(Warning::OutsideResourceRoot {
                    file: file.to_owned(),
                    resource_root: self.resource_root.to_owned(),
                });
                false
            }
        }
    }

    /// Stages `file` followed by all files it refers to.
    fn stage_with_references(&mut self, file: &Path, kind: ReferenceKind) {
        self.stage_file(file);
        if !file.is_file() {
            return;
        }

        let resolved = resolve_references(kind, file);
        self.plan.extend_warnings(resolved.warnings);
        for reference in &resolved.paths {
            self.stage_file(reference);
        }
    }
}

/// Returns `path` if it's a scene file or the first scene file directly inside of `path` if it's
/// a folder.
fn find_scene_file(path: &Path, scene_extension: &str) -> Option<PathBuf> {
    if path.is_file() {
        return has_extension(path, scene_extension).then(|| path.to_owned());
    }

    let entries = match fs::read_dir(path) {
        Ok(entries) => entries,
        Err(err) => {
            trace!("Failed to read directory {path:?}: {err}");
            return None;
        }
    };
    let mut candidates = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|candidate| candidate.is_file() && has_extension(candidate, scene_extension))
        .collect::<Vec<_>>();
    candidates.sort();
    candidates.into_iter().next()
}

use std::{
    collections::BTreeMap,
    fmt::{self, Formatter},
    path::{Path, PathBuf},
    sync::Arc,
};

use cocoport_shared::{
    absolute_path,
    log::{error, info},
};

use crate::{
    asset_database::{BulkImporter, SceneConverter},
    common::{extract_extension_from_path, validate_project_name},
    config::ImportConfig,
    descriptor::{DeclaredResources, ProjectDescriptor},
    importer::{BuilderImporter, ProjectImporter, StudioImporter},
    stager::StagingPlan,
    staging_area::StagingGuard,
    AssetUrl, Error, Result, Warning,
};

/// States of an import. Every import starts in [`PipelineState::Idle`] and ends in either
/// [`PipelineState::Succeeded`] or [`PipelineState::Failed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Parsing,
    Staging,
    BulkImporting,
    ConvertingScenes,
    CleaningUp,
    Succeeded,
    Failed,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Summary of a successful import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportReport {
    pub project_name: String,
    pub destination_url: AssetUrl,
    /// Number of files that have been copied into the staging directories.
    pub staged_file_count: usize,
    pub scene_files: Vec<PathBuf>,
    /// Everything that has been skipped or couldn't be cleaned up.
    pub warnings: Vec<Warning>,
}

/// Runs imports of projects into the host project.
///
/// One [`Pipeline`] runs one import at a time. Imports of the same project must not run
/// concurrently because preparing the staging directories removes them first.
pub struct Pipeline<'a> {
    config: ImportConfig,
    bulk_importer: &'a dyn BulkImporter,
    scene_converter: &'a dyn SceneConverter,
    importers: BTreeMap<String, Arc<dyn ProjectImporter>>,
    state: PipelineState,
}

impl<'a> Pipeline<'a> {
    /// Creates a [`Pipeline`] with the importers for builder and studio projects.
    pub fn new(config: ImportConfig, bulk_importer: &'a dyn BulkImporter, scene_converter: &'a dyn SceneConverter) -> Self {
        Self {
            config,
            bulk_importer,
            scene_converter,
            importers: BTreeMap::new(),
            state: PipelineState::Idle,
        }
        .register(Arc::new(BuilderImporter))
        .register(Arc::new(StudioImporter))
    }

    /// Registers a [`ProjectImporter`] for its descriptor extension.
    pub fn register(mut self, importer: Arc<dyn ProjectImporter>) -> Self {
        let extension = importer.descriptor_extension().to_lowercase();
        if self.importers.contains_key(&extension) {
            panic!("importer for extension '{extension}' already registered");
        }
        self.importers.insert(extension, importer);
        self
    }

    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    /// Returns the registered importer that is responsible for the descriptor at `descriptor_path`.
    pub fn importer_for_path(&self, descriptor_path: &Path) -> Result<Arc<dyn ProjectImporter>> {
        let extension = extract_extension_from_path(descriptor_path).unwrap_or_default();
        self.importers
            .get(&extension)
            .cloned()
            .ok_or_else(|| Error::UnsupportedDescriptor(extension, descriptor_path.to_owned()))
    }

    /// State of the last import.
    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Imports the project described by the descriptor at `descriptor_path`.
    ///
    /// The staging directories are removed before this function returns no matter how the import
    /// ends.
    pub fn import(&mut self, descriptor_path: impl AsRef<Path>) -> Result<ImportReport> {
        self.state = PipelineState::Idle;
        let descriptor_path = descriptor_path.as_ref();
        match self.run(descriptor_path) {
            Ok(report) => {
                self.transition(PipelineState::Succeeded);
                Ok(report)
            }
            Err(err) => {
                error!("Import of {descriptor_path:?} failed: {err}");
                self.transition(PipelineState::Failed);
                Err(err)
            }
        }
    }

    fn transition(&mut self, state: PipelineState) {
        info!("Import state: {} -> {state}", self.state);
        self.state = state;
    }

    fn run(&mut self, descriptor_path: &Path) -> Result<ImportReport> {
        let descriptor_path = absolute_path(descriptor_path)?;
        let importer = self.importer_for_path(&descriptor_path)?;
        info!("Import {} project {descriptor_path:?}", importer.name());

        self.transition(PipelineState::Parsing);
        let mut parse_warnings = Vec::new();
        let descriptor = importer.parse(&descriptor_path, &mut parse_warnings)?;
        // The name becomes a directory below the temp folder that is removed recursively.
        validate_project_name(&descriptor.path, &descriptor.name)?;

        self.transition(PipelineState::Staging);
        let staging_root = self.config.staging_root(&descriptor.name);
        let scene_staging_root = self
            .config
            .scene_staging_root(&descriptor.name, importer.scene_format().extension());
        let guard = StagingGuard::prepare([staging_root.clone(), scene_staging_root.clone()]).map_err(|err| Error::StageFailure {
            stage: PipelineState::Staging,
            source: Box::new(err),
        })?;

        let mut plan = StagingPlan::new(
            resource_roots(&descriptor),
            staging_root,
            scene_staging_root,
            self.config.destination_url(&descriptor.name),
        );
        plan.extend_collected_warnings(parse_warnings);

        let result = self.stage_and_import(&*importer, &descriptor, &mut plan);

        // Cleanup problems are only reported. They never fail an import.
        self.transition(PipelineState::CleaningUp);
        let cleanup_warnings = guard.release();
        result?;

        info!("Import {} project finished.", importer.name());
        info!("Resources are imported to folder : {}", plan.destination_url());

        let mut warnings = plan.take_warnings();
        warnings.extend(cleanup_warnings);
        Ok(ImportReport {
            project_name: descriptor.name,
            destination_url: plan.destination_url().clone(),
            staged_file_count: plan.staged_file_count(),
            scene_files: plan.scene_files().to_vec(),
            warnings,
        })
    }

    fn stage_and_import(&mut self, importer: &dyn ProjectImporter, descriptor: &ProjectDescriptor, plan: &mut StagingPlan) -> Result<()> {
        info!("Staging project '{}' from {:?}", descriptor.name, plan.resource_roots());
        importer.stage(descriptor, plan).map_err(|err| Error::StageFailure {
            stage: PipelineState::Staging,
            source: Box::new(err),
        })?;
        info!(
            "Staged {} files and {} scene files with {} warnings",
            plan.staged_file_count(),
            plan.scene_files().len(),
            plan.warnings().len()
        );

        self.transition(PipelineState::BulkImporting);
        self.bulk_importer
            .import(plan.staging_root(), self.config.assets_root_url(), true)
            .map_err(|source| Error::StageFailure {
                stage: PipelineState::BulkImporting,
                source,
            })?;

        self.transition(PipelineState::ConvertingScenes);
        let conversion = importer.scene_conversion(descriptor, plan);
        self.scene_converter
            .convert(&conversion)
            .map_err(|source| Error::StageFailure {
                stage: PipelineState::ConvertingScenes,
                source,
            })?;

        Ok(())
    }
}

/// Imports the project described by `descriptor_path` with a [`Pipeline`] that is only used for this import.
pub fn import_project(
    config: ImportConfig,
    bulk_importer: &dyn BulkImporter,
    scene_converter: &dyn SceneConverter,
    descriptor_path: impl AsRef<Path>,
) -> Result<ImportReport> {
    Pipeline::new(config, bulk_importer, scene_converter).import(descriptor_path)
}

fn resource_roots(descriptor: &ProjectDescriptor) -> Vec<PathBuf> {
    match &descriptor.resources {
        DeclaredResources::Roots(roots) => roots.clone(),
        DeclaredResources::Tree { root, .. } => vec![root.clone()],
    }
}

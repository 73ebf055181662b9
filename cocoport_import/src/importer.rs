use std::path::Path;

use cocoport_shared::log::info;

use crate::{
    asset_database::{SceneConversion, SceneFormat},
    descriptor::{parse_builder_descriptor, parse_studio_descriptor, DeclaredResources, ProjectDescriptor},
    stager::{stage_builder_root, StagingPlan, StudioTreeWalker},
    Error, Result, Warning,
};

/// Format specific part of the import of one project format.
pub trait ProjectImporter {
    /// Human readable name of the project format.
    fn name(&self) -> &str;

    /// Extension of the descriptor files, lower case and without the dot.
    fn descriptor_extension(&self) -> &str;

    fn scene_format(&self) -> SceneFormat;

    /// Parses the descriptor at `descriptor_path`. Recovered problems are pushed to `warnings`.
    fn parse(&self, descriptor_path: &Path, warnings: &mut Vec<Warning>) -> Result<ProjectDescriptor>;

    /// Copies the declared resources into the staging directories of `plan`.
    fn stage(&self, descriptor: &ProjectDescriptor, plan: &mut StagingPlan) -> Result<()>;

    /// Arguments for the [`SceneConverter`](crate::SceneConverter) once the resources have been imported.
    fn scene_conversion(&self, descriptor: &ProjectDescriptor, plan: &StagingPlan) -> SceneConversion;
}

/// Imports `.ccbproj` projects.
///
/// Scene files are staged next to the generic staging directory and converted from there. The
/// converter resolves the resources of the scenes against the generic staging directory.
#[derive(Debug, Default, Clone, Copy)]
pub struct BuilderImporter;

impl ProjectImporter for BuilderImporter {
    fn name(&self) -> &str {
        "Cocos Builder"
    }

    fn descriptor_extension(&self) -> &str {
        "ccbproj"
    }

    fn scene_format(&self) -> SceneFormat {
        SceneFormat::Builder
    }

    fn parse(&self, descriptor_path: &Path, _warnings: &mut Vec<Warning>) -> Result<ProjectDescriptor> {
        parse_builder_descriptor(descriptor_path)
    }

    fn stage(&self, descriptor: &ProjectDescriptor, plan: &mut StagingPlan) -> Result<()> {
        let DeclaredResources::Roots(roots) = &descriptor.resources else {
            return Err(Error::MalformedDescriptor(
                descriptor.path.clone(),
                "expected resource directories".to_owned(),
            ));
        };
        for root in roots {
            info!("Staging resources of {root:?}");
            stage_builder_root(plan, root, self.scene_format().extension())?;
        }
        Ok(())
    }

    fn scene_conversion(&self, _descriptor: &ProjectDescriptor, plan: &StagingPlan) -> SceneConversion {
        SceneConversion {
            format: self.scene_format(),
            scene_files: plan.scene_files().to_vec(),
            resource_root: plan.staging_root().to_owned(),
            staging_root: plan.scene_staging_root().to_owned(),
            destination_url: plan.destination_url().clone(),
        }
    }
}

/// Imports `.ccs` projects.
///
/// Scene files are converted in place. The converter resolves the resources of the scenes against
/// the resource directory of the project.
#[derive(Debug, Default, Clone, Copy)]
pub struct StudioImporter;

impl ProjectImporter for StudioImporter {
    fn name(&self) -> &str {
        "Cocos Studio"
    }

    fn descriptor_extension(&self) -> &str {
        "ccs"
    }

    fn scene_format(&self) -> SceneFormat {
        SceneFormat::Studio
    }

    fn parse(&self, descriptor_path: &Path, warnings: &mut Vec<Warning>) -> Result<ProjectDescriptor> {
        parse_studio_descriptor(descriptor_path, warnings)
    }

    fn stage(&self, descriptor: &ProjectDescriptor, plan: &mut StagingPlan) -> Result<()> {
        let DeclaredResources::Tree { root, nodes } = &descriptor.resources else {
            return Err(Error::MalformedDescriptor(
                descriptor.path.clone(),
                "expected a resource tree".to_owned(),
            ));
        };
        info!("Staging resources of {root:?}");
        StudioTreeWalker::new(plan, root, &descriptor.path, self.scene_format().extension()).stage(nodes)
    }

    fn scene_conversion(&self, descriptor: &ProjectDescriptor, plan: &StagingPlan) -> SceneConversion {
        let resource_root = match &descriptor.resources {
            DeclaredResources::Tree { root, .. } => root.clone(),
            DeclaredResources::Roots(_) => descriptor.project_dir().to_owned(),
        };
        SceneConversion {
            format: self.scene_format(),
            scene_files: plan.scene_files().to_vec(),
            resource_root,
            staging_root: plan.staging_root().to_owned(),
            destination_url: plan.destination_url().clone(),
        }
    }
}

//! # Overview
//!
//! Crate for [importing](Pipeline) legacy game projects into the asset database of a host project.
//!
//! Two project formats are supported. A builder project (`.ccbproj`) is a property list that
//! lists the directories containing its resources. A studio project (`.ccs`) is an XML document
//! that declares every resource below the `cocosstudio` directory next to it. The resources of
//! both formats are copied into staging directories inside of the `temp` folder of the host
//! project, imported in one go and finally the scene files of the project are converted.
//!
//! ## Example:
//!
//! **Builder Project:**
//!
//! ```text
//! Game/
//! ├─ Game.ccbproj
//! ├─ Resources/
//! │  ├─ resources-auto/
//! │  │  ├─ logo.png
//! │  ├─ ui/
//! │  │  ├─ button.png
//! │  │  ├─ Menu.ccb
//! ```
//!
//! **Staging Directories:**
//!
//! ```text
//! <host project>/temp/
//! ├─ Game/
//! │  ├─ logo.png
//! │  ├─ ui/
//! │  │  ├─ button.png
//! ├─ Game_ccbs/
//! │  ├─ ui/
//! │  │  ├─ Menu.ccb
//! ```
//!
//! `temp/Game` is then imported as `db://assets/Game` and `Menu.ccb` is handed to the
//! [`SceneConverter`]. Both staging directories are removed afterwards.
//!
//! # Components
//!
//! The [`Pipeline`] selects the [`ProjectImporter`] by the extension of the descriptor and runs
//! the import. The host project is represented by a [`BulkImporter`] and a [`SceneConverter`].
//! [`FileSystemAssetDatabase`] implements both by writing directly into the assets folder of the
//! host project.

mod asset_database;
mod common;
mod config;
mod descriptor;
mod importer;
mod pipeline;
mod references;
mod stager;
mod staging_area;

pub use asset_database::*;
pub use common::{
    AssetUrl, BoxError, Error, Result, Warning, ASSETS_ROOT_URL, AUTO_RESOURCES_FOLDER_NAME, STUDIO_RESOURCE_FOLDER_NAME,
    TEMP_FOLDER_NAME,
};
pub use config::*;
pub use descriptor::*;
pub use importer::*;
pub use pipeline::*;
pub use references::*;
pub use stager::*;
pub use staging_area::{destroy as destroy_staging_directory, prepare as prepare_staging_directory, StagingGuard};

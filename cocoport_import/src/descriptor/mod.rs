//! Project descriptors of the supported project formats.
//!
//! A builder project (`.ccbproj`) explicitly lists the directories that contain its resources. A
//! studio project (`.ccs`) instead has a fixed resource directory next to the descriptor and
//! declares every resource in a tree of XML elements.

mod builder;
mod studio;

use std::path::{Path, PathBuf};

pub use builder::parse_builder_descriptor;
pub use studio::parse_studio_descriptor;

/// Result of parsing a project descriptor. Created once per import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectDescriptor {
    /// Absolute path of the descriptor file.
    pub path: PathBuf,
    pub name: String,
    /// Version of the authoring tool or the file format if the descriptor declares one.
    pub version: Option<String>,
    pub resources: DeclaredResources,
}

impl ProjectDescriptor {
    /// Directory that contains the descriptor file.
    pub fn project_dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new(""))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeclaredResources {
    /// Absolute resource directories in the order of declaration.
    Roots(Vec<PathBuf>),
    /// A single resource directory with the resources declared in the descriptor.
    Tree { root: PathBuf, nodes: Vec<ResourceNode> },
}

/// One entry of the resource tree declared by a studio project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceNode {
    /// Path segment relative to the parent node.
    pub name: String,
    pub kind: ResourceKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceKind {
    Folder(Vec<ResourceNode>),
    /// A scene project. Either the scene file itself or a folder containing it.
    SceneReference,
    /// Image information without a file of its own.
    PlistInfo,
    Image,
    Font(FontFormat),
    Audio,
    /// A sprite sheet declared as a property list and the image it refers to. Both paths are
    /// relative to the directory of the node.
    PlistImageFolder {
        plist_file: Option<String>,
        image: Option<String>,
    },
    Particle,
    TileMap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontFormat {
    TrueType,
    Bitmap,
}

impl ResourceNode {
    pub fn new(name: impl Into<String>, kind: ResourceKind) -> Self {
        Self { name: name.into(), kind }
    }
}

use std::{
    fmt::{self, Formatter},
    io,
    path::{Component, Path, PathBuf},
    result,
};

use cocoport_shared::thiserror;
use roxmltree::{Document, ParsingOptions};

use crate::PipelineState;

/// Url of the asset root in the asset database.
pub const ASSETS_ROOT_URL: &str = "db://assets";

/// Name of the folder in the host project in which the staging directories are created.
pub const TEMP_FOLDER_NAME: &str = "temp";

/// Directories with this name are collapsed onto their parent when staging builder projects.
pub const AUTO_RESOURCES_FOLDER_NAME: &str = "resources-auto";

/// Name of the resource directory next to a studio project descriptor.
pub const STUDIO_RESOURCE_FOLDER_NAME: &str = "cocosstudio";

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub type Result<T> = result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Malformed project descriptor {0}: {1}")]
    MalformedDescriptor(PathBuf, String),
    #[error("Project descriptor {0} doesn't declare any resources")]
    NoResources(PathBuf),
    #[error("Resource directory {0} doesn't exist")]
    ResourceRootMissing(PathBuf),
    #[error("Unsupported descriptor extension '{0}' in path {1}")]
    UnsupportedDescriptor(String, PathBuf),
    #[error("Invalid path: {0}")]
    InvalidPath(PathBuf),
    #[error("{stage:?} failed: {source}")]
    StageFailure {
        stage: PipelineState,
        #[source]
        source: BoxError,
    },
    #[error("IoError: {0}")]
    IoError(#[from] io::Error),
}

/// Problems that are recovered from while importing. Every [`Warning`] is logged when it occurs and
/// reported in the [`ImportReport`](crate::ImportReport) so that one broken resource doesn't fail the
/// whole import.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Warning {
    #[error("{0} is not found")]
    MissingSource(PathBuf),
    #[error("Skipping '{tag}' node in {descriptor}: {reason}")]
    InvalidNode { descriptor: PathBuf, tag: String, reason: String },
    #[error("Failed to resolve references of {file}: {reason}")]
    ReferenceResolution { file: PathBuf, reason: String },
    #[error("{file} is located outside of the resource directory {resource_root}")]
    OutsideResourceRoot { file: PathBuf, resource_root: PathBuf },
    #[error("Failed to copy {source_path} to {destination}: {reason}")]
    CopyFailed {
        source_path: PathBuf,
        destination: PathBuf,
        reason: String,
    },
    #[error("Failed to remove {path}: {reason}")]
    Cleanup { path: PathBuf, reason: String },
}

/// Url of a folder or asset in the asset database, e.g. `db://assets/MyProject`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AssetUrl(String);

impl AssetUrl {
    /// Create a new [`AssetUrl`]. Trailing slashes are removed.
    ///
    /// # Example
    ///
    /// ```rust
    /// use cocoport_import::AssetUrl;
    /// let url = AssetUrl::new("db://assets/");
    /// assert_eq!(url.as_str(), "db://assets");
    /// ```
    pub fn new(url: impl Into<String>) -> Self {
        let url = url.into();
        Self(url.trim_end_matches('/').to_owned())
    }

    /// Appends a path segment.
    ///
    /// # Example
    ///
    /// ```rust
    /// use cocoport_import::AssetUrl;
    /// let url = AssetUrl::new("db://assets").join("MyProject");
    /// assert_eq!(url.as_str(), "db://assets/MyProject");
    /// ```
    pub fn join(&self, segment: &str) -> Self {
        Self::new(format!("{}/{}", self.0, segment.trim_start_matches('/')))
    }

    /// Returns the last path segment.
    ///
    /// # Example
    ///
    /// ```rust
    /// use cocoport_import::AssetUrl;
    /// assert_eq!(AssetUrl::new("db://assets/MyProject").basename(), "MyProject");
    /// ```
    pub fn basename(&self) -> &str {
        self.path().rsplit('/').next().unwrap_or_default()
    }

    /// Returns the part after the `scheme://` prefix.
    pub fn path(&self) -> &str {
        self.0.split_once("://").map(|(_, path)| path).unwrap_or(&self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetUrl {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AssetUrl {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

pub(crate) fn extract_extension_from_path(path: &Path) -> Result<String> {
    Ok(path
        .extension()
        .and_then(|extension| extension.to_str())
        .map(|extension| extension.to_lowercase())
        .ok_or(Error::InvalidPath(path.to_owned()))?
        .to_owned())
}

/// Compares the extension of `path` ignoring its case. `extension` has to be lowercase.
pub(crate) fn has_extension(path: &Path, extension: &str) -> bool {
    extract_extension_from_path(path).is_ok_and(|found| found == extension)
}

/// Checks that the project name can be used as the name of its staging directories and asset
/// folder. The name has to be exactly one normal path segment, so `..`, `.`, absolute paths and
/// names containing a separator are rejected.
pub(crate) fn validate_project_name(descriptor_path: &Path, name: &str) -> Result<()> {
    let is_single_segment = !name.contains(['/', '\\'])
        && matches!(Path::new(name).components().collect::<Vec<_>>().as_slice(), [Component::Normal(_)]);
    if is_single_segment {
        Ok(())
    } else {
        Err(Error::MalformedDescriptor(
            descriptor_path.to_owned(),
            format!("project name '{name}' is not a valid folder name"),
        ))
    }
}

/// Parses the XML based formats. Some exporters write a DTD so it has to be allowed.
pub(crate) fn parse_xml(content: &str) -> result::Result<Document<'_>, roxmltree::Error> {
    let options = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    Document::parse_with_options(content, options)
}

/// Directory that relative references inside of `file` are resolved against.
pub(crate) fn parent_dir(file: &Path) -> &Path {
    file.parent().unwrap_or_else(|| Path::new(""))
}

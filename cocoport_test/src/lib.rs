use std::{
    collections::BTreeSet,
    fs,
    path::{Path, PathBuf},
    sync::Once,
};

use cocoport_shared::{
    log::{self, LevelFilter},
    pathdiff,
    walkdir::WalkDir,
};
use simple_logger::SimpleLogger;

static LOGGER: Once = Once::new();

/// Installs the logger for the tests. Can be called by every test because only the first call has an effect.
pub fn setup_logger() {
    LOGGER.call_once(|| {
        SimpleLogger::new()
            .with_level(LevelFilter::Trace)
            .init()
            .expect("failed to initialize the logger");
        log::trace!("Logger initialized for tests");
    });
}

/// Writes `content` to the file at `root/relative_path` and creates all missing parent directories.
pub fn write_file(root: impl AsRef<Path>, relative_path: impl AsRef<Path>, content: impl AsRef<[u8]>) -> PathBuf {
    let path = root.as_ref().join(relative_path);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap_or_else(|err| panic!("Failed to create directory \"{}\": {err}", parent.display()));
    }
    fs::write(&path, content).unwrap_or_else(|err| panic!("Failed to write file \"{}\": {err}", path.display()));
    path
}

/// Returns the paths of all files below `root` relative to `root`. Directories are not part of the result.
///
/// Returns an empty set if `root` doesn't exist.
pub fn collect_files(root: impl AsRef<Path>) -> BTreeSet<PathBuf> {
    let root = root.as_ref();
    if !root.exists() {
        return BTreeSet::new();
    }
    WalkDir::new(root)
        .into_iter()
        .map(|entry| entry.expect("Failed to read directory entry"))
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| pathdiff::diff_paths(entry.path(), root).expect("entry is not located in root"))
        .collect()
}

/// Builds a set of relative paths from string literals for comparisons with [`collect_files`].
pub fn path_set<'a>(paths: impl IntoIterator<Item = &'a str>) -> BTreeSet<PathBuf> {
    paths.into_iter().map(PathBuf::from).collect()
}

#[cfg(test)]
mod tests {
    use std::env;

    use super::*;

    #[test]
    fn write_and_collect() {
        setup_logger();
        let root = env::temp_dir().join("cocoport_test_write_and_collect");
        let _ = fs::remove_dir_all(&root);
        write_file(&root, "a/b/c.txt", "c");
        write_file(&root, "d.txt", "d");
        assert_eq!(collect_files(&root), path_set(["a/b/c.txt", "d.txt"]));
        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn collect_missing_root() {
        assert!(collect_files("the/wrong/path").is_empty());
    }
}

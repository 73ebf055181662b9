use std::{
    fs, io,
    path::{Path, PathBuf},
};

use cocoport_shared::log::{info, trace, warn};

use crate::Warning;

/// Removes a single file. Replaced in the tests to simulate files that can't be removed.
type RemoveFileFn<'a> = dyn Fn(&Path) -> io::Result<()> + 'a;

/// Creates an empty directory at `root`. An existing directory is removed first.
///
/// Fails if the previous content of `root` couldn't be removed completely.
pub fn prepare(root: &Path) -> io::Result<()> {
    prepare_with(root, &|path: &Path| fs::remove_file(path))
}

fn prepare_with(root: &Path, remove_file: &RemoveFileFn<'_>) -> io::Result<()> {
    if root.exists() {
        info!("Removing existing staging directory {root:?}");
        for warning in remove_dir_recursive(root, remove_file) {
            warn!("{warning}");
        }
        if fs::read_dir(root).is_ok_and(|mut entries| entries.next().is_some()) {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                format!("failed to remove the previous content of staging directory {root:?}"),
            ));
        }
    }
    fs::create_dir_all(root)?;
    info!("Created staging directory {root:?}");
    Ok(())
}

/// Removes `root` and everything below it on a best-effort basis.
///
/// Never fails. Everything that couldn't be removed is logged and returned as [`Warning::Cleanup`].
pub fn destroy(root: &Path) -> Vec<Warning> {
    destroy_with(root, &|path: &Path| fs::remove_file(path))
}

fn destroy_with(root: &Path, remove_file: &RemoveFileFn<'_>) -> Vec<Warning> {
    let warnings = remove_dir_recursive(root, remove_file);
    if warnings.is_empty() {
        info!("Removed staging directory {root:?}");
    } else {
        for warning in &warnings {
            warn!("{warning}");
        }
        warn!("Removing {root:?} failed, please delete it manually!");
    }
    warnings
}

/// Removes the directory recursively. Entries that disappear while the directory is removed are
/// not an error.
fn remove_dir_recursive(path: &Path, remove_file: &RemoveFileFn<'_>) -> Vec<Warning> {
    let mut warnings = Vec::new();
    remove_dir_recursive_into(path, remove_file, &mut warnings);
    warnings
}

fn remove_dir_recursive_into(path: &Path, remove_file: &RemoveFileFn<'_>, warnings: &mut Vec<Warning>) {
    let cleanup_warning = |path: &Path, reason: String| Warning::Cleanup {
        path: path.to_owned(),
        reason,
    };

    if fs::symlink_metadata(path).is_err() {
        return;
    }

    let entries = match fs::read_dir(path) {
        Ok(entries) => entries,
        Err(err) => {
            if err.kind() != io::ErrorKind::NotFound {
                warnings.push(cleanup_warning(path, format!("failed to read directory: {err}")));
            }
            return;
        }
    };

    for entry in entries {
        let entry_path = match entry {
            Ok(entry) => entry.path(),
            Err(err) => {
                warnings.push(cleanup_warning(path, format!("failed to read directory entry: {err}")));
                continue;
            }
        };

        // The entry might have been removed since the directory was read.
        let metadata = match fs::symlink_metadata(&entry_path) {
            Ok(metadata) => metadata,
            Err(err) => {
                if err.kind() != io::ErrorKind::NotFound {
                    warnings.push(cleanup_warning(&entry_path, err.to_string()));
                }
                continue;
            }
        };

        if metadata.is_dir() {
            remove_dir_recursive_into(&entry_path, remove_file, warnings);
        } else {
            trace!("Removing file {entry_path:?}");
            if let Err(err) = remove_file(&entry_path) {
                if err.kind() != io::ErrorKind::NotFound {
                    warnings.push(cleanup_warning(&entry_path, err.to_string()));
                }
            }
        }
    }

    if let Err(err) = fs::remove_dir(path) {
        if err.kind() == io::ErrorKind::NotFound {
            return;
        }
        let is_not_empty = fs::read_dir(path).is_ok_and(|mut entries| entries.next().is_some());
        if is_not_empty {
            warnings.push(cleanup_warning(path, "directory is not empty".to_owned()));
        } else {
            warnings.push(cleanup_warning(path, err.to_string()));
        }
    }
}

/// Owns the staging directories of one import and removes them when it's dropped, so that every
/// way out of the import removes them.
pub struct StagingGuard {
    roots: Vec<PathBuf>,
}

impl StagingGuard {
    /// Prepares all `roots`. Directories that were already prepared are removed again when
    /// preparing one of the following ones fails.
    pub fn prepare(roots: impl IntoIterator<Item = PathBuf>) -> io::Result<Self> {
        let mut guard = Self { roots: Vec::new() };
        for root in roots {
            prepare(&root)?;
            guard.roots.push(root);
        }
        Ok(guard)
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Removes the staging directories and returns what couldn't be removed.
    pub fn release(mut self) -> Vec<Warning> {
        self.destroy_all()
    }

    fn destroy_all(&mut self) -> Vec<Warning> {
        self.roots.drain(..).flat_map(|root| destroy(&root)).collect()
    }
}

impl Drop for StagingGuard {
    fn drop(&mut self) {
        self.destroy_all();
    }
}

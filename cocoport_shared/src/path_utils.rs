use std::{
    env, io,
    path::{Component, Path, PathBuf},
};

/// Lexically normalizes the given path by removing `.` components and resolving `..` components
/// against the preceding ones. The filesystem is not accessed, so symlinks are not resolved.
///
/// # Example
///
/// ```rust
/// use std::path::Path;
/// use cocoport_shared::normalize_path;
/// assert_eq!(normalize_path("project/./res/../images/a.png"), Path::new("project/images/a.png"));
/// assert_eq!(normalize_path("../a.png"), Path::new("../a.png"));
/// ```
pub fn normalize_path(path: impl AsRef<Path>) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.as_ref().components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match normalized.components().next_back() {
                Some(Component::Normal(_)) => {
                    normalized.pop();
                }
                // `/..` is `/`
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => normalized.push(Component::ParentDir),
            },
            other => normalized.push(other),
        }
    }
    normalized
}

/// Returns the normalized absolute version of `path`. Relative paths are interpreted relative
/// to the current working directory.
pub fn absolute_path(path: impl AsRef<Path>) -> io::Result<PathBuf> {
    let path = path.as_ref();
    if path.is_absolute() {
        Ok(normalize_path(path))
    } else {
        Ok(normalize_path(env::current_dir()?.join(path)))
    }
}

/// Returns `path` relative to `base` when `path` is located inside of `base`.
///
/// Returns `None` when the relative path would have to leave `base` with `..` components.
pub fn relative_path_inside(path: impl AsRef<Path>, base: impl AsRef<Path>) -> Option<PathBuf> {
    let relative = pathdiff::diff_paths(normalize_path(path), normalize_path(base))?;
    if relative.components().any(|component| matches!(component, Component::ParentDir)) {
        return None;
    }
    Some(relative)
}

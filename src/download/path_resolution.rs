//! Resolving a completed transfer to an on-disk path, the same way any
//! code that joins a relative path onto a root directory should:
//! reject absolute paths and `..` components before they ever touch
//! the filesystem, on a path of however many components, not just a
//! single filename.

use std::path::{Component, Path, PathBuf};

/// Rejects absolute paths and any `..` component. Returns `None` for
/// anything unsafe rather than erroring — callers just skip the candidate.
pub fn safe_relative_path(candidate: &str) -> Option<PathBuf> {
    let path = Path::new(candidate);
    if path.is_absolute() {
        return None;
    }
    let mut sanitized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => sanitized.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    if sanitized.as_os_str().is_empty() {
        None
    } else {
        Some(sanitized)
    }
}

fn leaf(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Probes candidates in priority order — an explicit `download_path`
/// first, then `username/directory`, then the directory's leaf name
/// alone — and returns the first one that exists under
/// `downloads_root`, per `exists`.
pub fn resolve<F: Fn(&Path) -> bool>(
    downloads_root: &Path,
    download_path: Option<&str>,
    username: &str,
    directory: &str,
    exists: F,
) -> Option<PathBuf> {
    let dir_leaf = leaf(directory);
    let mut candidates: Vec<String> = Vec::new();
    if let Some(explicit) = download_path {
        candidates.push(explicit.to_string());
    }
    candidates.push(format!("{}/{}", username, directory));
    candidates.push(format!("{}/{}", username, dir_leaf));
    candidates.push(directory.to_string());
    candidates.push(dir_leaf.to_string());

    for candidate in candidates {
        if let Some(relative) = safe_relative_path(&candidate) {
            let full = downloads_root.join(&relative);
            if exists(&full) {
                return Some(relative);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_absolute_and_parent_references() {
        assert!(safe_relative_path("/etc/passwd").is_none());
        assert!(safe_relative_path("../secrets").is_none());
        assert!(safe_relative_path("a/../../b").is_none());
        assert_eq!(safe_relative_path("Artist/Album"), Some(PathBuf::from("Artist/Album")));
    }

    #[test]
    fn resolve_tries_candidates_in_order() {
        let root = Path::new("/downloads");
        let exists = |p: &Path| p == Path::new("/downloads/peer/Album");
        let resolved = resolve(root, None, "peer", "Music/Album", exists);
        assert_eq!(resolved, None); // "peer/Music/Album" tried first, doesn't exist

        let exists_leaf = |p: &Path| p == Path::new("/downloads/peer/Album");
        let resolved = resolve(root, None, "peer", "Music/Album", exists_leaf);
        assert_eq!(resolved, Some(PathBuf::from("peer/Album")));
    }

    #[test]
    fn explicit_download_path_is_tried_first() {
        let root = Path::new("/downloads");
        let exists = |p: &Path| p == Path::new("/downloads/explicit/path");
        let resolved = resolve(root, Some("explicit/path"), "peer", "Music/Album", exists);
        assert_eq!(resolved, Some(PathBuf::from("explicit/path")));
    }
}

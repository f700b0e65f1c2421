use std::path::{Path, PathBuf};

use super::error::{DataError, Result};
use super::normalize::normalize;

/// Return the files in `dir` whose normalized name contains the normalized
/// `keyword`, in directory iteration order. Subdirectories never match.
///
/// An empty result is not an error; a missing directory is.
pub fn find_files(dir: &Path, keyword: &str) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(DataError::DirectoryNotFound(dir.to_path_buf()));
    }

    let keyword = normalize(keyword);
    let mut matches = Vec::new();

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.path().is_file() {
            continue;
        }
        let name = entry.file_name();
        let name = normalize(&name.to_string_lossy());
        if name.contains(&keyword) {
            log::debug!("'{keyword}' matched {name}");
            matches.push(entry.path());
        }
    }

    Ok(matches)
}

/// Same as [`find_files`] but ordered by normalized file name, so "first
/// match" and "last write" are reproducible.
pub fn find_files_sorted(dir: &Path, keyword: &str) -> Result<Vec<PathBuf>> {
    let mut files = find_files(dir, keyword)?;
    files.sort_by_cached_key(|p| normalized_file_name(p));
    Ok(files)
}

/// Normalized file name of `path` (empty if it has none).
pub fn normalized_file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| normalize(&n.to_string_lossy()))
        .unwrap_or_default()
}

use crate::config::RunConfig;
use crate::error::RunError;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Every accepted file under `root`, in walk order.
///
/// A missing or unreadable root is an error; unreadable entries below it are
/// logged and skipped.
pub fn scan_incoming(root: &Path, config: &RunConfig) -> Result<Vec<PathBuf>, RunError> {
    fs::read_dir(root).map_err(|source| RunError::Scan {
        path: root.to_path_buf(),
        source,
    })?;

    let mut files = Vec::new();
    for entry in WalkDir::new(root).follow_links(false) {
        match entry {
            Ok(entry) => {
                if entry.file_type().is_file() && config.accepts(entry.path()) {
                    files.push(entry.into_path());
                }
            }
            Err(e) => log::warn!("Error accessing entry: {e}"),
        }
    }

    log::debug!("Found {} files under {}", files.len(), root.display());
    Ok(files)
}

/// Files directly inside a series folder, sorted by name.
pub fn list_series_files(folder: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(folder)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .collect();
    files.sort();
    files
}

/// Every file anywhere under `root`, regardless of extension.
pub fn list_all_files(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"x").unwrap();
    }

    #[test]
    fn scan_filters_by_extension() {
        let temp = TempDir::new().unwrap();
        touch(&temp.path().join("a/1.dcm"));
        touch(&temp.path().join("a/b/2.DCM"));
        touch(&temp.path().join("a/notes.txt"));
        touch(&temp.path().join("3.tif"));

        let mut found = scan_incoming(temp.path(), &RunConfig::default()).unwrap();
        found.sort();

        let expected: Vec<PathBuf> = ["3.tif", "a/1.dcm", "a/b/2.DCM"]
            .iter()
            .map(|rel| temp.path().join(rel))
            .collect();
        assert_eq!(found, expected);
    }

    #[test]
    fn missing_root_is_fatal() {
        let temp = TempDir::new().unwrap();
        let err = scan_incoming(&temp.path().join("absent"), &RunConfig::default()).unwrap_err();
        assert!(matches!(err, RunError::Scan { .. }));
    }

    #[test]
    fn series_listing_is_shallow_and_sorted() {
        let temp = TempDir::new().unwrap();
        touch(&temp.path().join("s/2.dcm"));
        touch(&temp.path().join("s/1.dcm"));
        touch(&temp.path().join("s/nested/3.dcm"));

        let files = list_series_files(&temp.path().join("s"));
        assert_eq!(
            files,
            vec![temp.path().join("s/1.dcm"), temp.path().join("s/2.dcm")]
        );
        assert_eq!(list_all_files(temp.path()).len(), 3);
    }
}

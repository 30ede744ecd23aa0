use crate::error::ArchiveError;
use crate::scan::list_all_files;
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Archive folder for files no analysis claimed.
pub const NOT_ANALYZED: &str = "Not_analyzed";

/// Moves processed acquisitions from the incoming tree into the archive tree,
/// keeping their path relative to the incoming root.
///
/// A file that an analysis consumed but could not move is held: it stays in
/// the incoming tree and the sweep leaves it for the next pass.
pub struct Archive {
    incoming_root: PathBuf,
    processed_root: PathBuf,
    held: RefCell<BTreeSet<PathBuf>>,
}

impl Archive {
    pub fn new(incoming_root: impl AsRef<Path>, processed_root: impl AsRef<Path>) -> Self {
        Self {
            incoming_root: incoming_root.as_ref().to_path_buf(),
            processed_root: processed_root.as_ref().to_path_buf(),
            held: RefCell::default(),
        }
    }

    /// `processed/<folder>/<relative>`, or `processed/<relative>` when the
    /// series folder already sits inside a directory named `folder`.
    pub fn destination(&self, path: &Path, folder: &str) -> Result<PathBuf, ArchiveError> {
        let relative = path
            .strip_prefix(&self.incoming_root)
            .map_err(|_| ArchiveError::OutsideRoot {
                path: path.to_path_buf(),
                root: self.incoming_root.clone(),
            })?;

        let nested = relative
            .parent()
            .and_then(Path::parent)
            .and_then(Path::file_name)
            .is_some_and(|name| name == folder);

        Ok(if nested {
            self.processed_root.join(relative)
        } else {
            self.processed_root.join(folder).join(relative)
        })
    }

    /// Moves one file, replacing whatever is at the destination.
    ///
    /// Returns `false` when the file could not be moved; it is then left where
    /// it is and held back from the sweep.
    pub fn relocate(&self, path: &Path, folder: &str) -> Result<bool, ArchiveError> {
        let destination = self.destination(path, folder)?;
        match move_file(path, &destination) {
            Ok(()) => {
                log::debug!("Moved {} to {}", path.display(), destination.display());
                Ok(true)
            }
            Err(e) => {
                log::debug!(
                    "Unable to move {} to {} ({e})",
                    path.display(),
                    destination.display()
                );
                if folder != NOT_ANALYZED {
                    self.held.borrow_mut().insert(path.to_path_buf());
                }
                Ok(false)
            }
        }
    }

    /// Moves every file in `paths`; returns how many actually moved.
    pub fn relocate_all<'a>(
        &self,
        paths: impl IntoIterator<Item = &'a Path>,
        folder: &str,
    ) -> Result<usize, ArchiveError> {
        let mut moved = 0;
        for path in paths {
            if self.relocate(path, folder)? {
                moved += 1;
            }
        }
        Ok(moved)
    }

    /// Moves everything still in the incoming tree to [`NOT_ANALYZED`],
    /// except held files.
    pub fn sweep_unanalyzed(&self) -> usize {
        let leftovers: Vec<PathBuf> = {
            let held = self.held.borrow();
            list_all_files(&self.incoming_root)
                .into_iter()
                .filter(|path| !held.contains(path))
                .collect()
        };

        let mut moved = 0;
        for path in &leftovers {
            match self.relocate(path, NOT_ANALYZED) {
                Ok(true) => moved += 1,
                Ok(false) => {}
                Err(e) => log::debug!("Skipping {} ({e})", path.display()),
            }
        }
        if moved > 0 {
            log::info!("Moved {moved} unanalyzed files to {NOT_ANALYZED}");
        }
        moved
    }

    /// Removes empty directories below the incoming root, deepest first.
    pub fn prune_empty_dirs(&self) -> usize {
        let mut removed = 0;
        let dirs = WalkDir::new(&self.incoming_root)
            .min_depth(1)
            .contents_first(true)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_dir());
        for dir in dirs {
            // Non-empty directories fail here and are kept.
            if fs::remove_dir(dir.path()).is_ok() {
                removed += 1;
            }
        }
        removed
    }
}

/// Rename with a copy-and-delete fallback across volumes. A partial copy is
/// removed again so the source stays the only version.
fn move_file(path: &Path, destination: &Path) -> io::Result<()> {
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent)?;
    }
    if destination.is_file() {
        fs::remove_file(destination)?;
    }
    if fs::rename(path, destination).is_ok() {
        return Ok(());
    }
    fs::copy(path, destination)?;
    fs::remove_file(path).inspect_err(|_| {
        let _ = fs::remove_file(destination);
    })
}

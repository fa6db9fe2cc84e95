use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::{is_extension_allowed, IMAGE_EXTENSIONS};

/// Outcome of reading a directory that is allowed to be absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum DirScan<T> {
    /// The directory does not exist or could not be read.
    Missing,
    Found(Vec<T>),
}

impl<T> DirScan<T> {
    pub(crate) fn is_missing(&self) -> bool {
        matches!(self, DirScan::Missing)
    }

    pub(crate) fn items(&self) -> &[T] {
        match self {
            DirScan::Missing => &[],
            DirScan::Found(items) => items,
        }
    }

    pub(crate) fn into_vec(self) -> Vec<T> {
        match self {
            DirScan::Missing => Vec::new(),
            DirScan::Found(items) => items,
        }
    }
}

/// List the card images directly inside `dir`, sorted by file name.
pub(crate) fn discover_images(dir: &Path) -> DirScan<PathBuf> {
    if !dir.is_dir() {
        return DirScan::Missing;
    }
    let mut images = Vec::new();
    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name();
    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(err) if err.depth() == 0 => {
                tracing::warn!(dir = %dir.display(), error = %err, "image directory is unreadable");
                return DirScan::Missing;
            }
            Err(_) => continue,
        };
        if !entry.file_type().is_file() {
            continue;
        }
        if is_extension_allowed(entry.path(), &IMAGE_EXTENSIONS) {
            images.push(entry.into_path());
        }
    }
    DirScan::Found(images)
}

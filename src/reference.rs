use std::fs;
use std::path::{Path, PathBuf};

use base64::Engine;
use walkdir::WalkDir;

use crate::{guess_image_media_type, is_extension_allowed, CardRecord, DirScan, IMAGE_EXTENSIONS};

/// A reference photo with its known-correct identification.
#[derive(Debug, Clone)]
pub(crate) struct ExamplePair {
    pub(crate) name: String,
    pub(crate) image_path: PathBuf,
    pub(crate) media_type: &'static str,
    pub(crate) image_base64: String,
    pub(crate) card: CardRecord,
}

/// Find the image sharing `stem`, trying extensions in preference order.
/// Extension case is ignored, matching image discovery.
fn matching_image(dir: &Path, stem: &str) -> Option<PathBuf> {
    let mut candidates: Vec<PathBuf> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| path.file_stem().is_some_and(|s| s.to_string_lossy() == stem))
        .collect();
    candidates.retain(|path| is_extension_allowed(path, &IMAGE_EXTENSIONS));
    IMAGE_EXTENSIONS.iter().find_map(|ext| {
        candidates
            .iter()
            .find(|path| is_extension_allowed(path, &[*ext]))
            .cloned()
    })
}

fn load_pair(dir: &Path, label_path: &Path) -> Option<ExamplePair> {
    let stem = label_path.file_stem()?.to_string_lossy().into_owned();
    let Some(image_path) = matching_image(dir, &stem) else {
        tracing::debug!(label = %label_path.display(), "example label has no matching image, skipping");
        return None;
    };
    let card = match fs::read_to_string(label_path)
        .map_err(|e| e.to_string())
        .and_then(|raw| serde_json::from_str::<CardRecord>(&raw).map_err(|e| e.to_string()))
    {
        Ok(card) => card,
        Err(err) => {
            tracing::warn!(label = %label_path.display(), error = %err, "invalid example label, skipping");
            return None;
        }
    };
    let bytes = match fs::read(&image_path) {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::warn!(image = %image_path.display(), error = %err, "unreadable example image, skipping");
            return None;
        }
    };
    Some(ExamplePair {
        name: stem,
        media_type: guess_image_media_type(&image_path),
        image_base64: base64::engine::general_purpose::STANDARD.encode(&bytes),
        image_path,
        card,
    })
}

/// Load every label/image pair in `dir`. Unmatched or broken labels are skipped.
pub(crate) fn load_example_pairs(dir: &Path) -> DirScan<ExamplePair> {
    if !dir.is_dir() {
        return DirScan::Missing;
    }
    let mut pairs = Vec::new();
    let walker = WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name();
    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(err) if err.depth() == 0 => return DirScan::Missing,
            Err(_) => continue,
        };
        if !entry.file_type().is_file() || !is_extension_allowed(entry.path(), &["json"]) {
            continue;
        }
        if let Some(pair) = load_pair(dir, entry.path()) {
            pairs.push(pair);
        }
    }
    tracing::debug!(dir = %dir.display(), count = pairs.len(), "loaded example pairs");
    DirScan::Found(pairs)
}

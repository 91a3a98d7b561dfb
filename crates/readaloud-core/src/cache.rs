//! Remembers the last listened page per document.
//!
//! Entries live under the cache root in a directory named after a hash of the
//! document path, as a tiny TOML file with a single `page` field.

use sha2::{Digest, Sha256};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const CACHE_DIR: &str = ".cache";

/// Load the cached page for a given document, if present.
pub fn load_last_page(cache_root: &Path, doc_path: &Path) -> Option<usize> {
    let path = bookmark_path(cache_root, doc_path);
    let data = fs::read_to_string(path).ok()?;
    let value: CacheEntry = toml::from_str(&data).ok()?;
    Some(value.page)
}

/// Persist the current page for a given document. Errors are ignored; losing a
/// bookmark is not worth interrupting playback for.
pub fn save_last_page(cache_root: &Path, doc_path: &Path, page: usize) {
    let path = bookmark_path(cache_root, doc_path);
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    let entry = CacheEntry { page };
    if let Ok(contents) = toml::to_string(&entry) {
        if let Ok(mut file) = fs::File::create(&path) {
            let _ = file.write_all(contents.as_bytes());
            debug!(path = %path.display(), page, "Saved bookmark");
        }
    }
}

#[derive(serde::Serialize, serde::Deserialize)]
struct CacheEntry {
    page: usize,
}

pub fn hash_dir(cache_root: &Path, doc_path: &Path) -> PathBuf {
    let mut hasher = Sha256::new();
    hasher.update(doc_path.as_os_str().to_string_lossy().as_bytes());
    let hash = format!("{:x}", hasher.finalize());
    cache_root.join(hash)
}

fn bookmark_path(cache_root: &Path, doc_path: &Path) -> PathBuf {
    hash_dir(cache_root, doc_path).join("bookmark.toml")
}

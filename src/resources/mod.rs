//! Image resource pools backing published posts
//!
//! - `ImageStore`: enumerates the files an account may attach
//! - `DirImageStore`: one directory per account under a common root
//! - `rotator`: random-without-replacement selection over a pool

pub mod rotator;

// Re-export main types
pub use rotator::ResourceRotator;

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::utils::sanitize_filename;

/// File extensions recognized as postable images
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

/// Source of image resources for an account
pub trait ImageStore: Send + Sync {
    /// List every image available to the account, keyed by file name
    fn list(&self, account_id: &str) -> Result<HashSet<String>>;
}

/// Image store reading `<root>/<account_id>/` directories
pub struct DirImageStore {
    root: PathBuf,
}

impl DirImageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    // Account ids come from operator config; sanitized so an id can
    // never name a directory outside the root.
    fn account_dir(&self, account_id: &str) -> PathBuf {
        self.root.join(sanitize_filename(account_id))
    }
}

impl ImageStore for DirImageStore {
    fn list(&self, account_id: &str) -> Result<HashSet<String>> {
        let dir = self.account_dir(account_id);
        if !dir.is_dir() {
            return Ok(HashSet::new());
        }

        let entries = std::fs::read_dir(&dir)
            .with_context(|| format!("Failed to read image directory: {}", dir.display()))?;

        let mut names = HashSet::new();
        for entry in entries {
            let path = entry
                .with_context(|| format!("Failed to read entry in {}", dir.display()))?
                .path();
            if path.is_file() && has_image_extension(&path) {
                if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                    names.insert(name.to_string());
                }
            }
        }

        Ok(names)
    }
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_with_files(files: &[&str]) -> (TempDir, DirImageStore) {
        let dir = TempDir::new().unwrap();
        let account_dir = dir.path().join("alice");
        std::fs::create_dir_all(&account_dir).unwrap();
        for name in files {
            std::fs::write(account_dir.join(name), b"img").unwrap();
        }
        let store = DirImageStore::new(dir.path());
        (dir, store)
    }

    #[test]
    fn test_lists_only_image_files() {
        let (_dir, store) = store_with_files(&["a.jpg", "b.PNG", "notes.txt", "c.webp"]);
        let listed = store.list("alice").unwrap();

        assert_eq!(listed.len(), 3);
        assert!(listed.contains("a.jpg"));
        assert!(listed.contains("b.PNG"));
        assert!(listed.contains("c.webp"));
        assert!(!listed.contains("notes.txt"));
    }

    #[test]
    fn test_missing_account_dir_is_empty() {
        let (_dir, store) = store_with_files(&["a.jpg"]);
        assert!(store.list("nobody").unwrap().is_empty());
    }

    #[test]
    fn test_subdirectories_are_skipped() {
        let (dir, store) = store_with_files(&["a.jpg"]);
        std::fs::create_dir_all(dir.path().join("alice").join("thumbs.png")).unwrap();

        let listed = store.list("alice").unwrap();
        assert_eq!(listed.len(), 1);
        assert!(listed.contains("a.jpg"));
    }

    #[test]
    fn test_account_id_cannot_escape_root() {
        let (dir, store) = store_with_files(&["a.jpg"]);
        std::fs::write(dir.path().join("stray.jpg"), b"img").unwrap();

        // ".." collapses to an underscore name, not a parent traversal
        assert!(store.list("../").unwrap().is_empty());
    }
}

//! Search base for cross-file references
//!
//! Asset files refer to each other by paths relative to the root of an
//! extracted game tree (`appearance/mesh/foo.msh`, `shader/bar.sht`).
//! Such references may use either slash.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRoot {
    root: PathBuf,
}

impl AssetRoot {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Join a stored reference onto the root without checking it exists.
    pub fn join(&self, reference: &str) -> PathBuf {
        reference
            .split(['/', '\\'])
            .filter(|part| !part.is_empty())
            .fold(self.root.clone(), |path, part| path.join(part))
    }

    /// Locate `reference` under the root.
    pub fn find_file(&self, reference: &str) -> Result<PathBuf> {
        let path = self.join(reference);
        if path.is_file() {
            Ok(path)
        } else {
            Err(Error::MissingReference {
                path: PathBuf::from(reference),
            })
        }
    }

    /// Like [`find_file`](Self::find_file), but a miss is only a warning.
    pub fn find_optional(&self, reference: &str) -> Option<PathBuf> {
        match self.find_file(reference) {
            Ok(path) => Some(path),
            Err(e) => {
                tracing::warn!("{e} (under {})", self.root.display());
                None
            }
        }
    }

    /// `path` as a forward-slash reference relative to the root, if it
    /// lies under it.
    pub fn relative_to_root(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let parts: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Some(parts.join("/"))
    }

    /// Every file under the root whose extension is one of `extensions`
    /// (lowercase, without the dot), in walk order.
    pub fn files_with_extension(&self, extensions: &[&str]) -> Vec<PathBuf> {
        WalkDir::new(&self.root)
            .follow_links(true)
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!("Skipping unreadable entry: {e}");
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| {
                entry
                    .path()
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| extensions.contains(&ext.to_ascii_lowercase().as_str()))
            })
            .map(walkdir::DirEntry::into_path)
            .collect()
    }
}

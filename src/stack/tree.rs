use crate::fs::{DirEntry, FileSystem};
use std::cell::OnceCell;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Read-only, root-relative view of a checkout used while evaluating rules.
///
/// The recursive file listing is computed at most once per detection.
pub struct Tree<'a> {
    fs: &'a dyn FileSystem,
    root: &'a Path,
    files: OnceCell<Vec<PathBuf>>,
}

impl<'a> Tree<'a> {
    pub fn new(fs: &'a dyn FileSystem, root: &'a Path) -> Self {
        Self {
            fs,
            root,
            files: OnceCell::new(),
        }
    }

    pub fn root(&self) -> &Path {
        self.root
    }

    pub fn has(&self, relative: &str) -> bool {
        self.fs.is_file(&self.root.join(relative))
    }

    pub fn has_dir(&self, relative: &str) -> bool {
        self.fs.is_dir(&self.root.join(relative))
    }

    pub fn read(&self, relative: &str) -> Option<String> {
        let path = self.root.join(relative);
        if !self.fs.is_file(&path) {
            return None;
        }
        match self.fs.read_to_string(&path) {
            Ok(content) => Some(content),
            Err(e) => {
                warn!(file = relative, error = %e, "Unreadable marker file");
                None
            }
        }
    }

    /// First candidate that exists as a file, in the order given.
    pub fn first_existing<'c>(&self, candidates: &[&'c str]) -> Option<&'c str> {
        candidates.iter().copied().find(|c| self.has(c))
    }

    pub fn read_dir(&self, relative: &str) -> Vec<DirEntry> {
        self.fs
            .read_dir(&self.root.join(relative))
            .unwrap_or_default()
    }

    pub fn files(&self) -> &[PathBuf] {
        self.files.get_or_init(|| match self.fs.list_files(self.root) {
            Ok(files) => files,
            Err(e) => {
                warn!(error = %e, "Failed to list workspace files");
                Vec::new()
            }
        })
    }

    pub fn count_extension(&self, extensions: &[&str]) -> usize {
        self.files()
            .iter()
            .filter(|f| {
                f.extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| extensions.contains(&e))
            })
            .count()
    }
}

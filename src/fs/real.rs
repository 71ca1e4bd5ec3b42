use super::{DirEntry, FileSystem, FileType};
use anyhow::{Context, Result};
use ignore::WalkBuilder;
use std::fs;
use std::path::{Path, PathBuf};

pub struct RealFileSystem;

impl RealFileSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RealFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

fn file_type_of(path: &Path) -> FileType {
    if path.is_file() {
        FileType::File
    } else if path.is_dir() {
        FileType::Directory
    } else {
        FileType::Symlink
    }
}

impl FileSystem for RealFileSystem {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        fs::read_to_string(path).context(format!("Failed to read file {:?}", path))
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<DirEntry>> {
        let entries = fs::read_dir(path).context(format!("Failed to read directory {:?}", path))?;

        let mut result = Vec::new();
        for entry in entries {
            let entry = entry.context("Failed to read directory entry")?;
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().to_string();
            let file_type = file_type_of(&path);

            result.push(DirEntry {
                path,
                name,
                file_type,
            });
        }

        result.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(result)
    }

    fn list_files(&self, root: &Path) -> Result<Vec<PathBuf>> {
        let walker = WalkBuilder::new(root)
            .hidden(true)
            .git_ignore(true)
            .require_git(false)
            // Only the checkout's own ignore files apply; nothing above it
            // or in the host's global git config.
            .parents(false)
            .git_global(false)
            .build();

        let mut files = Vec::new();
        for entry in walker {
            let entry = entry.context(format!("Failed to walk {:?}", root))?;
            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }
            if let Ok(relative) = entry.path().strip_prefix(root) {
                files.push(relative.to_path_buf());
            }
        }

        files.sort();
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        let base = dir.path();

        fs::create_dir(base.join("subdir")).unwrap();
        fs::write(base.join("test.txt"), "hello world").unwrap();
        fs::write(base.join("subdir/nested.txt"), "nested content").unwrap();

        dir
    }

    #[test]
    fn test_exists_and_kinds() {
        let temp = create_test_dir();
        let fs = RealFileSystem::new();

        assert!(fs.exists(temp.path()));
        assert!(fs.is_dir(&temp.path().join("subdir")));
        assert!(fs.is_file(&temp.path().join("test.txt")));
        assert!(!fs.exists(&temp.path().join("nonexistent")));
    }

    #[test]
    fn test_read_to_string() {
        let temp = create_test_dir();
        let fs = RealFileSystem::new();

        let content = fs.read_to_string(&temp.path().join("test.txt")).unwrap();
        assert_eq!(content, "hello world");
    }

    #[test]
    fn test_read_dir_is_sorted() {
        let temp = create_test_dir();
        let fs = RealFileSystem::new();

        let entries = fs.read_dir(temp.path()).unwrap();
        let names: Vec<&str> = entries.iter().map(|e| e.file_name()).collect();

        assert_eq!(names, vec!["subdir", "test.txt"]);
        assert!(entries[0].is_dir());
    }

    #[test]
    fn test_list_files_relative_and_sorted() {
        let temp = create_test_dir();
        let fs = RealFileSystem::new();

        let files = fs.list_files(temp.path()).unwrap();
        assert_eq!(
            files,
            vec![PathBuf::from("subdir/nested.txt"), PathBuf::from("test.txt")]
        );
    }

    #[test]
    fn test_list_files_skips_git_metadata_and_ignored() {
        let temp = create_test_dir();
        fs::create_dir(temp.path().join(".git")).unwrap();
        fs::write(temp.path().join(".git/HEAD"), "ref: refs/heads/main").unwrap();
        fs::create_dir(temp.path().join("node_modules")).unwrap();
        fs::write(temp.path().join("node_modules/dep.js"), "").unwrap();
        fs::write(temp.path().join(".gitignore"), "node_modules/\n").unwrap();

        let fs = RealFileSystem::new();
        let files = fs.list_files(temp.path()).unwrap();

        assert!(files.iter().all(|f| !f.starts_with(".git")));
        assert!(files.iter().all(|f| !f.starts_with("node_modules")));
    }

    #[test]
    fn test_list_files_ignores_rules_outside_root() {
        let outer = TempDir::new().unwrap();
        fs::write(outer.path().join(".gitignore"), "*.py\n").unwrap();
        let checkout = outer.path().join("checkout");
        fs::create_dir(&checkout).unwrap();
        fs::write(checkout.join("app.py"), "print('hi')").unwrap();

        let files = RealFileSystem::new().list_files(&checkout).unwrap();
        assert_eq!(files, vec![PathBuf::from("app.py")]);
    }
}

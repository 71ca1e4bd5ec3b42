//! Shared fixtures: local git remotes served over `file://` and a scripted
//! container engine.

#![allow(dead_code)]

use async_trait::async_trait;
use git2::{Repository, Signature};
use stackcraft::build::{ContainerEngine, EngineOutput};
use stackcraft::progress::{ProgressEvent, ProgressHandler};
use stackcraft::record::{MemoryRecordStore, RecordStore};
use stackcraft::{BuildError, StackcraftConfig, StackcraftService};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// A bare repository with one commit on `main`, plus a scratch root for
/// workspaces.
pub struct GitFixture {
    dir: TempDir,
}

impl GitFixture {
    pub fn with_files(files: &[(&str, &str)]) -> Self {
        let dir = TempDir::new().unwrap();
        let work = dir.path().join("work");
        std::fs::create_dir_all(&work).unwrap();

        let repo = Repository::init(&work).unwrap();
        for (path, contents) in files {
            let full = work.join(path);
            if let Some(parent) = full.parent() {
                std::fs::create_dir_all(parent).unwrap();
            }
            std::fs::write(full, contents).unwrap();
        }

        let mut index = repo.index().unwrap();
        index
            .add_all(["*"].iter(), git2::IndexAddOption::DEFAULT, None)
            .unwrap();
        index.write().unwrap();
        let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
        let sig = Signature::now("fixture", "fixture@localhost").unwrap();
        repo.commit(Some("refs/heads/main"), &sig, &sig, "initial", &tree, &[])
            .unwrap();
        repo.set_head("refs/heads/main").unwrap();

        git2::build::RepoBuilder::new()
            .bare(true)
            .clone(&file_url(&work), &dir.path().join("remote.git"))
            .unwrap();
        std::fs::create_dir_all(dir.path().join("workspaces")).unwrap();

        Self { dir }
    }

    pub fn empty() -> Self {
        Self::with_files(&[])
    }

    pub fn remote_path(&self) -> PathBuf {
        self.dir.path().join("remote.git")
    }

    pub fn url(&self) -> String {
        file_url(&self.remote_path())
    }

    pub fn workspace_root(&self) -> PathBuf {
        self.dir.path().join("workspaces")
    }

    /// Entries left under the workspace root.
    pub fn leftover_workspaces(&self) -> usize {
        std::fs::read_dir(self.workspace_root()).unwrap().count()
    }

    pub fn branches(&self) -> Vec<String> {
        let repo = Repository::open_bare(self.remote_path()).unwrap();
        let branches = repo.branches(Some(git2::BranchType::Local)).unwrap();
        branches
            .map(|b| b.unwrap().0.name().unwrap().unwrap().to_string())
            .collect()
    }

    /// Contents of `path` at the tip of `branch` on the remote.
    pub fn read_on_branch(&self, branch: &str, path: &str) -> Option<String> {
        let repo = Repository::open_bare(self.remote_path()).unwrap();
        let reference = repo.find_branch(branch, git2::BranchType::Local).ok()?;
        let tree = reference.get().peel_to_tree().unwrap();
        let entry = tree.get_path(Path::new(path)).ok()?;
        let blob = repo.find_blob(entry.id()).unwrap();
        Some(String::from_utf8_lossy(blob.content()).into_owned())
    }

    /// Creates `branch` on the remote at the tip of `main`.
    pub fn create_remote_branch(&self, branch: &str) {
        let repo = Repository::open_bare(self.remote_path()).unwrap();
        let main = repo
            .find_branch("main", git2::BranchType::Local)
            .unwrap()
            .get()
            .peel_to_commit()
            .unwrap();
        repo.branch(branch, &main, false).unwrap();
    }

    pub fn branch_tip(&self, branch: &str) -> Option<String> {
        let repo = Repository::open_bare(self.remote_path()).unwrap();
        let reference = repo.find_branch(branch, git2::BranchType::Local).ok()?;
        let tip = reference.get().peel_to_commit().unwrap().id().to_string();
        Some(tip)
    }

    /// Makes the remote's object and ref directories unwritable. Returns
    /// false when the current user can write anyway (e.g. root).
    #[cfg(unix)]
    pub fn make_remote_read_only(&self) -> bool {
        use std::os::unix::fs::PermissionsExt;
        for dir in self.remote_dirs() {
            std::fs::set_permissions(&dir, std::fs::Permissions::from_mode(0o555)).unwrap();
        }
        let check = self.remote_path().join("objects").join("write-check");
        match std::fs::write(&check, b"x") {
            Ok(()) => {
                let _ = std::fs::remove_file(&check);
                self.restore_remote_permissions();
                false
            }
            Err(_) => true,
        }
    }

    #[cfg(unix)]
    pub fn restore_remote_permissions(&self) {
        use std::os::unix::fs::PermissionsExt;
        for dir in self.remote_dirs() {
            std::fs::set_permissions(&dir, std::fs::Permissions::from_mode(0o755)).unwrap();
        }
    }

    fn remote_dirs(&self) -> Vec<PathBuf> {
        directories_under(&self.remote_path())
    }

    pub fn config(&self) -> StackcraftConfig {
        StackcraftConfig {
            workspace_root: self.workspace_root(),
            allowed_schemes: vec!["file".to_string()],
            record_path: None,
            ..StackcraftConfig::default()
        }
    }
}

fn directories_under(root: &Path) -> Vec<PathBuf> {
    let mut dirs = vec![root.to_path_buf()];
    let mut i = 0;
    while i < dirs.len() {
        let entries = std::fs::read_dir(&dirs[i]).unwrap();
        for entry in entries.flatten() {
            if entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
                dirs.push(entry.path());
            }
        }
        i += 1;
    }
    dirs
}

pub fn file_url(path: &Path) -> String {
    url::Url::from_file_path(path).unwrap().to_string()
}

/// Engine that records each build and answers from a script.
#[derive(Default)]
pub struct ScriptedEngine {
    pub fail_with: Option<String>,
    pub builds: Mutex<Vec<BuildCall>>,
}

#[derive(Debug, Clone)]
pub struct BuildCall {
    pub tag: String,
    pub recipe: String,
}

impl ScriptedEngine {
    pub fn succeeding() -> Self {
        Self::default()
    }

    pub fn failing(log: &str) -> Self {
        Self {
            fail_with: Some(log.to_string()),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<BuildCall> {
        self.builds.lock().unwrap().clone()
    }
}

#[async_trait]
impl ContainerEngine for ScriptedEngine {
    async fn ping(&self) -> Result<(), BuildError> {
        Ok(())
    }

    async fn build(
        &self,
        context_dir: &Path,
        recipe_file: &str,
        tag: &str,
    ) -> Result<EngineOutput, BuildError> {
        let recipe = std::fs::read_to_string(context_dir.join(recipe_file))?;
        self.builds.lock().unwrap().push(BuildCall {
            tag: tag.to_string(),
            recipe,
        });
        Ok(match &self.fail_with {
            Some(log) => EngineOutput {
                success: false,
                log: log.clone(),
                image_id: None,
            },
            None => EngineOutput {
                success: true,
                log: "Step 1/1 : FROM scratch\nSuccessfully built 0123456789ab\n".to_string(),
                image_id: Some("sha256:0123456789ab".to_string()),
            },
        })
    }
}

/// Collects every event for later inspection.
#[derive(Default)]
pub struct CollectingHandler {
    pub events: Mutex<Vec<ProgressEvent>>,
}

impl CollectingHandler {
    pub fn acquired_paths(&self) -> Vec<PathBuf> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| match e {
                ProgressEvent::WorkspaceAcquired { path, .. } => Some(path.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn released(&self) -> Vec<bool> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| match e {
                ProgressEvent::WorkspaceReleased { removed, .. } => Some(*removed),
                _ => None,
            })
            .collect()
    }
}

impl ProgressHandler for CollectingHandler {
    fn on_progress(&self, event: &ProgressEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

pub struct Harness {
    pub service: StackcraftService,
    pub engine: Arc<ScriptedEngine>,
    pub records: Arc<MemoryRecordStore>,
    pub progress: Arc<CollectingHandler>,
}

pub fn harness(fixture: &GitFixture, engine: ScriptedEngine) -> Harness {
    let engine = Arc::new(engine);
    let records = Arc::new(MemoryRecordStore::new());
    let progress = Arc::new(CollectingHandler::default());
    let service = StackcraftService::new(
        fixture.config(),
        engine.clone(),
        records.clone() as Arc<dyn RecordStore>,
    )
    .with_progress(progress.clone());
    Harness {
        service,
        engine,
        records,
        progress,
    }
}

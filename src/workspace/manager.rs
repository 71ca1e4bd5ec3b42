use super::git::{classify_clone_error, configure_transport_timeouts, remote_callbacks};
use super::repository::{Credential, RepositoryReference};
use crate::config::StackcraftConfig;
use crate::error::CloneError;
use git2::build::RepoBuilder;
use git2::{AutotagOption, FetchOptions};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// An exclusive checkout owned by one operation.
///
/// The directory is deleted by [`Workspace::release`] or, failing that, when
/// the value is dropped; either way deletion errors are logged and swallowed.
#[derive(Debug)]
pub struct Workspace {
    id: Uuid,
    path: PathBuf,
    dir: Option<TempDir>,
}

impl Workspace {
    pub(crate) fn new(id: Uuid, dir: TempDir) -> Self {
        Self {
            id,
            path: dir.path().to_path_buf(),
            dir: Some(dir),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes `contents` to `file_name` at the checkout root, replacing any
    /// existing file.
    pub async fn write_file(&self, file_name: &str, contents: &str) -> std::io::Result<PathBuf> {
        let path = self.path.join(file_name);
        tokio::fs::write(&path, contents).await?;
        Ok(path)
    }

    /// Deletes the checkout. Returns `false` when deletion failed.
    pub fn release(mut self) -> bool {
        self.close()
    }

    fn close(&mut self) -> bool {
        let Some(dir) = self.dir.take() else {
            return true;
        };
        match dir.close() {
            Ok(()) => {
                debug!(workspace = %self.path.display(), "Workspace removed");
                true
            }
            Err(e) => {
                warn!(workspace = %self.path.display(), error = %e, "Failed to remove workspace");
                false
            }
        }
    }
}

#[cfg(test)]
pub(crate) fn scratch_workspace(root: &Path) -> Workspace {
    let dir = tempfile::Builder::new()
        .prefix("ws-")
        .tempdir_in(root)
        .expect("create scratch workspace");
    Workspace::new(Uuid::new_v4(), dir)
}

impl Drop for Workspace {
    fn drop(&mut self) {
        self.close();
    }
}

/// Creates per-operation checkouts under a common root.
#[derive(Debug, Clone)]
pub struct WorkspaceManager {
    root: PathBuf,
    clone_depth: u32,
    fetch_timeout: Duration,
}

impl WorkspaceManager {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            clone_depth: 1,
            fetch_timeout: Duration::from_secs(60),
        }
    }

    pub fn from_config(config: &StackcraftConfig) -> Self {
        Self {
            root: config.workspace_root.clone(),
            clone_depth: config.clone_depth,
            fetch_timeout: config.fetch_timeout(),
        }
    }

    pub fn with_clone_depth(mut self, depth: u32) -> Self {
        self.clone_depth = depth;
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Clones `repo` into a fresh directory under the root.
    ///
    /// The fetch timeout bounds each network read inside libgit2; there is no
    /// deadline around the clone as a whole. The credential is consumed by the
    /// clone and dropped with it. On any failure the partially populated
    /// directory is removed before returning.
    pub async fn acquire(
        &self,
        repo: &RepositoryReference,
        credential: Option<Credential>,
    ) -> Result<Workspace, CloneError> {
        tokio::fs::create_dir_all(&self.root).await?;

        let id = Uuid::new_v4();
        let dir = tempfile::Builder::new()
            .prefix(&format!("ws-{}-", id.simple()))
            .tempdir_in(&self.root)?;
        let workspace = Workspace::new(id, dir);

        let url = repo.as_str().to_string();
        let destination = workspace.path().to_path_buf();
        let depth = self.clone_depth;

        info!(workspace_id = %id, repository = %url, "Cloning repository");

        configure_transport_timeouts(self.fetch_timeout);
        // Awaited to completion: the checkout must not be removed while
        // libgit2 is still writing into it.
        let outcome = tokio::task::spawn_blocking(move || {
            clone_into(&url, &destination, credential.as_ref(), depth)
        })
        .await;

        match outcome {
            Err(join) => Err(CloneError::Join(join.to_string())),
            Ok(Err(e)) => Err(e),
            Ok(Ok(())) => {
                debug!(workspace = %workspace.path().display(), "Clone complete");
                Ok(workspace)
            }
        }
    }
}

fn clone_into(
    url: &str,
    destination: &Path,
    credential: Option<&Credential>,
    depth: u32,
) -> Result<(), CloneError> {
    let mut fetch_options = FetchOptions::new();
    fetch_options.remote_callbacks(remote_callbacks(credential));
    fetch_options.download_tags(AutotagOption::None);
    // libgit2's local transport cannot negotiate shallow fetches
    if depth > 0 && !url.starts_with("file:") {
        fetch_options.depth(depth.min(i32::MAX as u32) as i32);
    }

    let mut builder = RepoBuilder::new();
    builder.fetch_options(fetch_options);
    builder
        .clone(url, destination)
        .map(|_| ())
        .map_err(|e| classify_clone_error(&e, url))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_failed_clone_leaves_no_directory() {
        let root = tempfile::tempdir().unwrap();
        let manager = WorkspaceManager::new(root.path().join("workspaces"));
        let missing = root.path().join("missing.git");
        let url = url::Url::from_directory_path(&missing).unwrap();
        let repo = RepositoryReference::parse(url.as_str(), &["file".to_string()]).unwrap();

        let err = manager.acquire(&repo, None).await.unwrap_err();

        assert!(matches!(err, CloneError::Unreachable { .. } | CloneError::Git(_)), "{:?}", err);
        let leftovers = std::fs::read_dir(manager.root()).unwrap().count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn test_release_removes_directory() {
        let root = tempfile::tempdir().unwrap();
        let dir = tempfile::Builder::new().prefix("ws-").tempdir_in(root.path()).unwrap();
        std::fs::write(dir.path().join("file.txt"), "x").unwrap();
        let workspace = Workspace::new(Uuid::new_v4(), dir);
        let path = workspace.path().to_path_buf();

        assert!(workspace.release());
        assert!(!path.exists());
    }

    #[test]
    fn test_drop_removes_directory() {
        let root = tempfile::tempdir().unwrap();
        let dir = tempfile::Builder::new().prefix("ws-").tempdir_in(root.path()).unwrap();
        let path = dir.path().to_path_buf();
        drop(Workspace::new(Uuid::new_v4(), dir));
        assert!(!path.exists());
    }
}

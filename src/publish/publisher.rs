use crate::config::StackcraftConfig;
use crate::error::PublishError;
use crate::workspace::git::{classify_push_error, configure_transport_timeouts, remote_callbacks};
use crate::workspace::{Credential, RepositoryReference, Workspace};
use chrono::{DateTime, Utc};
use git2::{Direction, PushOptions, Repository, Signature};
use serde::Serialize;
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishResult {
    pub branch: String,
    pub commit: String,
}

/// `<prefix>-<yyyymmddHHMMSS>-<suffix>`
pub fn branch_name(prefix: &str, now: DateTime<Utc>, suffix: &str) -> String {
    format!("{}-{}-{}", prefix, now.format("%Y%m%d%H%M%S"), suffix)
}

fn fresh_branch_name(prefix: &str) -> String {
    let random = Uuid::new_v4().simple().to_string();
    branch_name(prefix, Utc::now(), &random[..8])
}

/// Commits the recipe onto a new branch and pushes it without force.
///
/// The checkout's current branch is left untouched: the commit is written
/// straight to the new ref.
#[derive(Debug, Clone)]
pub struct Publisher {
    recipe_file: String,
    branch_prefix: String,
    author: String,
    email: String,
    transport_timeout: Duration,
}

impl Publisher {
    pub fn new() -> Self {
        Self {
            recipe_file: "Dockerfile".to_string(),
            branch_prefix: "stackcraft/dockerfile".to_string(),
            author: "stackcraft".to_string(),
            email: "stackcraft@localhost".to_string(),
            transport_timeout: Duration::from_secs(60),
        }
    }

    pub fn from_config(config: &StackcraftConfig) -> Self {
        Self {
            recipe_file: config.recipe_file.clone(),
            branch_prefix: config.branch_prefix.clone(),
            author: config.commit_author.clone(),
            email: config.commit_email.clone(),
            transport_timeout: config.fetch_timeout(),
        }
    }

    pub fn with_branch_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.branch_prefix = prefix.into();
        self
    }

    /// Writes the recipe into the checkout.
    pub async fn stage(&self, recipe: &str, workspace: &Workspace) -> Result<PathBuf, PublishError> {
        Ok(workspace.write_file(&self.recipe_file, recipe).await?)
    }

    /// Commits the staged recipe to a fresh branch and pushes it.
    pub async fn push(
        &self,
        repo: &RepositoryReference,
        workspace: &Workspace,
        credential: Option<Credential>,
    ) -> Result<PublishResult, PublishError> {
        let branch = fresh_branch_name(&self.branch_prefix);
        self.push_branch(repo, workspace, credential, &branch).await
    }

    /// Commits the staged recipe to `branch` and pushes it. Fails with
    /// [`PublishError::BranchExists`] when the remote already has that branch.
    ///
    /// The push runs to completion: once this returns, the remote either has
    /// the branch or never will from this call.
    pub async fn push_branch(
        &self,
        repo: &RepositoryReference,
        workspace: &Workspace,
        credential: Option<Credential>,
        branch: &str,
    ) -> Result<PublishResult, PublishError> {
        let job = PushJob {
            checkout: workspace.path().to_path_buf(),
            url: repo.as_str().to_string(),
            recipe_file: self.recipe_file.clone(),
            branch: branch.to_string(),
            author: self.author.clone(),
            email: self.email.clone(),
        };
        info!(branch = %job.branch, "Publishing recipe");

        configure_transport_timeouts(self.transport_timeout);
        tokio::task::spawn_blocking(move || job.run(credential.as_ref()))
            .await
            .map_err(|join| PublishError::Join(join.to_string()))?
    }

    pub async fn publish(
        &self,
        repo: &RepositoryReference,
        recipe: &str,
        workspace: &Workspace,
        credential: Option<Credential>,
    ) -> Result<PublishResult, PublishError> {
        self.stage(recipe, workspace).await?;
        self.push(repo, workspace, credential).await
    }
}

impl Default for Publisher {
    fn default() -> Self {
        Self::new()
    }
}

struct PushJob {
    checkout: PathBuf,
    url: String,
    recipe_file: String,
    branch: String,
    author: String,
    email: String,
}

impl PushJob {
    fn run(self, credential: Option<&Credential>) -> Result<PublishResult, PublishError> {
        let git_err = |e: git2::Error| PublishError::Git(e.message().to_string());
        let repo = Repository::open(&self.checkout).map_err(git_err)?;
        let refname = format!("refs/heads/{}", self.branch);

        self.ensure_branch_absent(&repo, &refname, credential)?;

        let commit = self.commit(&repo, &refname).map_err(git_err)?;
        debug!(branch = %self.branch, commit = %commit, "Recipe committed");

        self.push(&repo, &refname, credential)?;

        Ok(PublishResult {
            branch: self.branch,
            commit,
        })
    }

    fn ensure_branch_absent(
        &self,
        repo: &Repository,
        refname: &str,
        credential: Option<&Credential>,
    ) -> Result<(), PublishError> {
        let mut remote = repo
            .remote_anonymous(&self.url)
            .map_err(|e| classify_push_error(&e, &self.url))?;
        let connection = remote
            .connect_auth(Direction::Fetch, Some(remote_callbacks(credential)), None)
            .map_err(|e| classify_push_error(&e, &self.url))?;
        let exists = connection
            .list()
            .map_err(|e| classify_push_error(&e, &self.url))?
            .iter()
            .any(|head| head.name() == refname);
        if exists {
            return Err(PublishError::BranchExists(self.branch.clone()));
        }
        Ok(())
    }

    /// Stages the recipe and commits on top of HEAD, updating only `refname`.
    fn commit(&self, repo: &Repository, refname: &str) -> Result<String, git2::Error> {
        let mut index = repo.index()?;
        index.add_path(Path::new(&self.recipe_file))?;
        index.write()?;
        let tree = repo.find_tree(index.write_tree()?)?;

        let signature = Signature::now(&self.author, &self.email)?;
        let parent = repo.head().ok().and_then(|head| head.peel_to_commit().ok());
        let parents: Vec<&git2::Commit> = parent.iter().collect();

        let message = format!("Add {} generated by stackcraft", self.recipe_file);
        let oid = repo.commit(Some(refname), &signature, &signature, &message, &tree, &parents)?;
        Ok(oid.to_string())
    }

    fn push(
        &self,
        repo: &Repository,
        refname: &str,
        credential: Option<&Credential>,
    ) -> Result<(), PublishError> {
        let rejection: RefCell<Option<String>> = RefCell::new(None);

        {
            let mut callbacks = remote_callbacks(credential);
            callbacks.push_update_reference(|_reference, status| {
                if let Some(status) = status {
                    *rejection.borrow_mut() = Some(status.to_string());
                }
                Ok(())
            });

            let mut options = PushOptions::new();
            options.remote_callbacks(callbacks);

            let mut remote = repo
                .remote_anonymous(&self.url)
                .map_err(|e| classify_push_error(&e, &self.url))?;
            // No leading '+': the remote must fast-forward or refuse
            let refspec = format!("{}:{}", refname, refname);
            remote
                .push(&[refspec.as_str()], Some(&mut options))
                .map_err(|e| classify_push_error(&e, &self.url))?;
        }

        match rejection.into_inner() {
            Some(reason) => Err(PublishError::Rejected {
                branch: self.branch.clone(),
                reason,
            }),
            None => Ok(()),
        }
    }
}

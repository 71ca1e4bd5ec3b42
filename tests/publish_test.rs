//! Publish operation against a local bare remote.

mod support;

use stackcraft::publish::Publisher;
use stackcraft::workspace::{Workspace, WorkspaceManager};
use stackcraft::{PublishError, RepositoryReference, Stage, StackcraftConfig};
use support::{harness, GitFixture, ScriptedEngine};

const RECIPE: &str = "FROM nginx:alpine\nCOPY . /usr/share/nginx/html\n";

#[tokio::test]
async fn test_publish_pushes_recipe_to_new_branch() {
    let fixture = GitFixture::with_files(&[("index.html", "<h1>hi</h1>")]);
    let h = harness(&fixture, ScriptedEngine::succeeding());

    let result = h.service.publish(&fixture.url(), None, RECIPE).await.unwrap();

    assert!(result.branch.starts_with("stackcraft/dockerfile-"));
    assert!(fixture.branches().contains(&result.branch));
    assert_eq!(
        fixture.read_on_branch(&result.branch, "Dockerfile").as_deref(),
        Some(RECIPE)
    );
    assert_eq!(
        fixture.read_on_branch(&result.branch, "index.html").as_deref(),
        Some("<h1>hi</h1>")
    );
    assert!(fixture.read_on_branch("main", "Dockerfile").is_none());
    assert_eq!(fixture.leftover_workspaces(), 0);
}

#[tokio::test]
async fn test_repeated_publish_creates_distinct_branches() {
    let fixture = GitFixture::with_files(&[("index.html", "<h1>hi</h1>")]);
    let h = harness(&fixture, ScriptedEngine::succeeding());

    let first = h.service.publish(&fixture.url(), None, RECIPE).await.unwrap();
    let second = h.service.publish(&fixture.url(), None, RECIPE).await.unwrap();

    assert_ne!(first.branch, second.branch);
    assert_eq!(fixture.branches().len(), 3);
}

#[tokio::test]
async fn test_failed_publish_leaves_remote_untouched() {
    let fixture = GitFixture::with_files(&[("index.html", "<h1>hi</h1>")]);
    let h = harness(&fixture, ScriptedEngine::succeeding());
    let missing = support::file_url(&fixture.remote_path().with_file_name("gone.git"));

    let err = h.service.publish(&missing, None, RECIPE).await.unwrap_err();

    assert_eq!(err.stage, Stage::Clone);
    assert_eq!(fixture.branches(), vec!["main".to_string()]);
    assert_eq!(fixture.leftover_workspaces(), 0);
}

async fn staged_checkout(
    fixture: &GitFixture,
    config: &StackcraftConfig,
) -> (RepositoryReference, Workspace, Publisher) {
    let repo = RepositoryReference::parse(&fixture.url(), &config.allowed_schemes).unwrap();
    let workspace = WorkspaceManager::from_config(config)
        .acquire(&repo, None)
        .await
        .unwrap();
    let publisher = Publisher::from_config(config);
    publisher.stage(RECIPE, &workspace).await.unwrap();
    (repo, workspace, publisher)
}

#[tokio::test]
async fn test_existing_branch_is_never_overwritten() {
    let fixture = GitFixture::with_files(&[("index.html", "<h1>hi</h1>")]);
    fixture.create_remote_branch("stackcraft/dockerfile-taken");
    let tip_before = fixture.branch_tip("stackcraft/dockerfile-taken");
    let config = fixture.config();
    let (repo, workspace, publisher) = staged_checkout(&fixture, &config).await;

    let err = publisher
        .push_branch(&repo, &workspace, None, "stackcraft/dockerfile-taken")
        .await
        .unwrap_err();

    assert!(matches!(err, PublishError::BranchExists(ref b) if b == "stackcraft/dockerfile-taken"));
    assert_eq!(fixture.branch_tip("stackcraft/dockerfile-taken"), tip_before);
    assert!(fixture.read_on_branch("stackcraft/dockerfile-taken", "Dockerfile").is_none());
    assert!(workspace.release());
}

#[tokio::test]
async fn test_conflicting_ref_is_refused_without_new_branch() {
    let fixture = GitFixture::with_files(&[("index.html", "<h1>hi</h1>")]);
    // A branch named exactly like the prefix directory blocks every
    // `stackcraft/dockerfile-*` ref on the remote.
    let config = StackcraftConfig {
        branch_prefix: "stackcraft/dockerfile".to_string(),
        ..fixture.config()
    };
    fixture.create_remote_branch("stackcraft");
    let (repo, workspace, publisher) = staged_checkout(&fixture, &config).await;

    let err = publisher.push(&repo, &workspace, None).await.unwrap_err();

    assert!(
        matches!(err, PublishError::Rejected { .. } | PublishError::Git(_)),
        "unexpected error: {err}"
    );
    let mut branches = fixture.branches();
    branches.sort();
    assert_eq!(branches, vec!["main".to_string(), "stackcraft".to_string()]);
    assert!(workspace.release());
}

#[cfg(unix)]
#[tokio::test]
async fn test_publish_without_write_access_fails_cleanly() {
    let fixture = GitFixture::with_files(&[("index.html", "<h1>hi</h1>")]);
    let h = harness(&fixture, ScriptedEngine::succeeding());
    if !fixture.make_remote_read_only() {
        // Permission bits do not restrict this user.
        return;
    }

    let outcome = h.service.publish(&fixture.url(), None, RECIPE).await;
    fixture.restore_remote_permissions();

    let err = outcome.unwrap_err();
    assert_eq!(err.stage, Stage::Publish);
    assert_eq!(fixture.branches(), vec!["main".to_string()]);
    assert_eq!(fixture.leftover_workspaces(), 0);
}

#[tokio::test]
async fn test_push_outcome_is_final_when_it_returns() {
    let fixture = GitFixture::with_files(&[("index.html", "<h1>hi</h1>")]);
    // A zero transport timeout must not turn a completed push into an error.
    let config = StackcraftConfig {
        fetch_timeout_secs: 0,
        ..fixture.config()
    };
    let (repo, workspace, publisher) = staged_checkout(&fixture, &config).await;

    let result = publisher.push(&repo, &workspace, None).await.unwrap();

    assert!(fixture.branches().contains(&result.branch));
    assert_eq!(
        fixture.read_on_branch(&result.branch, "Dockerfile").as_deref(),
        Some(RECIPE)
    );
    assert!(workspace.release());
}

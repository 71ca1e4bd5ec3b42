//! Generate operation against local git remotes.

mod support;

use stackcraft::error::{CloneError, PipelineErrorKind};
use stackcraft::fs::{DirEntry, FileSystem};
use stackcraft::recipe::{Template, Validator};
use stackcraft::record::{GenerationRecord, RecordStore};
use stackcraft::{Stage, StackTag, StackcraftService};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use support::{harness, GitFixture, ScriptedEngine};

#[tokio::test]
async fn test_generate_node_repository() {
    let fixture = GitFixture::with_files(&[
        (
            "package.json",
            r#"{"name":"api","scripts":{"start":"node server.js"},"engines":{"node":">=18"}}"#,
        ),
        ("package-lock.json", "{}"),
        ("server.js", "require('http').createServer().listen(3000)"),
    ]);
    let h = harness(&fixture, ScriptedEngine::succeeding());

    let generation = h.service.generate(&fixture.url(), None).await.unwrap();

    assert_eq!(generation.profile.primary, StackTag::Node);
    assert_eq!(generation.recipe.template(), Template::Node);
    assert!(generation.recipe.text().starts_with("FROM node:"));
    assert!(generation.recipe.text().contains("npm ci"));
    assert!(Validator::new().validate(generation.recipe.text()).is_ok());
    assert_eq!(fixture.leftover_workspaces(), 0);
}

#[tokio::test]
async fn test_generate_python_repository() {
    let fixture = GitFixture::with_files(&[
        ("requirements.txt", "flask==3.0.0\n"),
        ("app.py", "from flask import Flask\napp = Flask(__name__)\n"),
    ]);
    let h = harness(&fixture, ScriptedEngine::succeeding());

    let generation = h.service.generate(&fixture.url(), None).await.unwrap();

    assert_eq!(generation.profile.primary, StackTag::Python);
    assert!(generation.recipe.text().starts_with("FROM python:"));
    assert!(generation.recipe.text().contains("requirements.txt"));
}

#[tokio::test]
async fn test_python_wins_over_tooling_package_json() {
    let fixture = GitFixture::with_files(&[
        ("requirements.txt", "django==5.0\n"),
        ("manage.py", "import django\n"),
        ("package.json", r#"{"devDependencies":{"prettier":"3"}}"#),
    ]);
    let h = harness(&fixture, ScriptedEngine::succeeding());

    let generation = h.service.generate(&fixture.url(), None).await.unwrap();

    assert_eq!(generation.profile.primary, StackTag::Python);
    assert!(generation.profile.has_tag(StackTag::Django));
}

#[tokio::test]
async fn test_empty_repository_gets_generic_recipe() {
    let fixture = GitFixture::with_files(&[("NOTES.txt", "nothing to see")]);
    let h = harness(&fixture, ScriptedEngine::succeeding());

    let generation = h.service.generate(&fixture.url(), None).await.unwrap();

    assert!(generation.profile.is_unknown());
    assert_eq!(generation.recipe.template(), Template::Generic);
    assert!(Validator::new().validate(generation.recipe.text()).is_ok());
}

#[tokio::test]
async fn test_generation_is_recorded_without_credentials() {
    let fixture = GitFixture::with_files(&[("go.mod", "module example.com/svc\n\ngo 1.22\n")]);
    let h = harness(&fixture, ScriptedEngine::succeeding());

    let generation = h.service.generate(&fixture.url(), None).await.unwrap();

    let records = h.records.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].recipe, generation.recipe.text());
    assert_eq!(records[0].profile.primary, StackTag::Go);
}

#[tokio::test]
async fn test_missing_remote_fails_at_clone_and_cleans_up() {
    let fixture = GitFixture::empty();
    let h = harness(&fixture, ScriptedEngine::succeeding());
    let missing = support::file_url(&fixture.workspace_root().join("..").join("nope.git"));

    let err = h.service.generate(&missing, None).await.unwrap_err();

    assert_eq!(err.stage, Stage::Clone);
    assert_eq!(fixture.leftover_workspaces(), 0);
    assert!(h.records.records().is_empty());
}

#[tokio::test]
async fn test_disallowed_scheme_is_rejected_before_cloning() {
    let fixture = GitFixture::empty();
    let h = harness(&fixture, ScriptedEngine::succeeding());

    let err = h
        .service
        .generate("https://github.com/acme/api", None)
        .await
        .unwrap_err();

    assert_eq!(err.stage, Stage::Clone);
    assert!(matches!(
        err.kind,
        PipelineErrorKind::Clone(CloneError::UnsupportedScheme { .. })
    ));
    assert!(h.progress.acquired_paths().is_empty());
}

#[tokio::test]
async fn test_concurrent_generates_use_distinct_workspaces() {
    let fixture = GitFixture::with_files(&[("index.html", "<html></html>")]);
    let h = harness(&fixture, ScriptedEngine::succeeding());
    let url = fixture.url();

    let (a, b) = tokio::join!(h.service.generate(&url, None), h.service.generate(&url, None));

    assert_eq!(a.unwrap().recipe, b.unwrap().recipe);
    let paths = h.progress.acquired_paths();
    assert_eq!(paths.len(), 2);
    assert_ne!(paths[0], paths[1]);
    assert_eq!(h.progress.released(), vec![true, true]);
    assert_eq!(fixture.leftover_workspaces(), 0);
}

struct UnwritableRecords;

#[async_trait::async_trait]
impl RecordStore for UnwritableRecords {
    async fn record(&self, _record: &GenerationRecord) -> anyhow::Result<()> {
        anyhow::bail!("record volume is read-only")
    }
}

#[tokio::test]
async fn test_failing_record_store_does_not_fail_generate() {
    let fixture = GitFixture::with_files(&[("index.html", "<h1>hi</h1>")]);
    let service = StackcraftService::new(
        fixture.config(),
        Arc::new(ScriptedEngine::succeeding()),
        Arc::new(UnwritableRecords),
    );

    let generation = service.generate(&fixture.url(), None).await.unwrap();

    assert_eq!(generation.recipe.template(), Template::Static);
    assert_eq!(fixture.leftover_workspaces(), 0);
}

/// A tree reader that crashes on first use.
struct CrashingFileSystem;

impl FileSystem for CrashingFileSystem {
    fn exists(&self, _path: &Path) -> bool {
        panic!("file system crashed")
    }

    fn is_dir(&self, _path: &Path) -> bool {
        panic!("file system crashed")
    }

    fn is_file(&self, _path: &Path) -> bool {
        panic!("file system crashed")
    }

    fn read_to_string(&self, _path: &Path) -> anyhow::Result<String> {
        panic!("file system crashed")
    }

    fn read_dir(&self, _path: &Path) -> anyhow::Result<Vec<DirEntry>> {
        panic!("file system crashed")
    }

    fn list_files(&self, _root: &Path) -> anyhow::Result<Vec<PathBuf>> {
        panic!("file system crashed")
    }
}

#[tokio::test]
async fn test_crash_during_detection_still_releases_workspace() {
    let fixture = GitFixture::with_files(&[("index.html", "<h1>hi</h1>")]);
    let h = harness(&fixture, ScriptedEngine::succeeding());
    let service = h.service.with_file_system(Arc::new(CrashingFileSystem));

    let err = service.generate(&fixture.url(), None).await.unwrap_err();

    assert_eq!(err.stage, Stage::Detect);
    assert!(matches!(err.kind, PipelineErrorKind::Internal(_)));
    assert_eq!(fixture.leftover_workspaces(), 0);
    assert_eq!(h.progress.released(), vec![true]);
    assert!(h.records.records().is_empty());
}

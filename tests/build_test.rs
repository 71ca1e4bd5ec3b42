//! Build operation with a scripted engine.

mod support;

use stackcraft::error::{BuildError, PipelineErrorKind};
use stackcraft::Stage;
use support::{harness, GitFixture, ScriptedEngine};

const RECIPE: &str = "FROM alpine:3.20\nWORKDIR /app\nCOPY . .\nCMD [\"sh\"]\n";

#[tokio::test]
async fn test_build_writes_recipe_and_tags_image() {
    let fixture = GitFixture::with_files(&[("main.sh", "echo hi")]);
    let h = harness(&fixture, ScriptedEngine::succeeding());

    let result = h.service.build(&fixture.url(), None, RECIPE).await.unwrap();

    assert_eq!(result.image_id.as_deref(), Some("sha256:0123456789ab"));
    assert!(result.log.contains("Successfully built"));
    let calls = h.engine.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].recipe, RECIPE);
    assert_eq!(calls[0].tag, result.image_tag);
    assert_eq!(fixture.leftover_workspaces(), 0);
}

#[tokio::test]
async fn test_invalid_recipe_never_reaches_engine() {
    let fixture = GitFixture::with_files(&[("main.sh", "echo hi")]);
    let h = harness(&fixture, ScriptedEngine::succeeding());

    let err = h
        .service
        .build(&fixture.url(), None, "RUN echo before from\n")
        .await
        .unwrap_err();

    assert_eq!(err.stage, Stage::Build);
    assert!(matches!(
        err.kind,
        PipelineErrorKind::Build(BuildError::InvalidRecipe(_))
    ));
    assert!(h.engine.calls().is_empty());
    assert_eq!(fixture.leftover_workspaces(), 0);
}

#[tokio::test]
async fn test_failed_build_carries_log() {
    let fixture = GitFixture::with_files(&[("main.sh", "echo hi")]);
    let h = harness(
        &fixture,
        ScriptedEngine::failing("Step 2/4 : RUN make\nmake: *** No targets.  Stop.\n"),
    );

    let err = h.service.build(&fixture.url(), None, RECIPE).await.unwrap_err();

    assert_eq!(err.stage, Stage::Build);
    let log = err.build_log().unwrap();
    assert!(log.contains("No targets"));
    assert_eq!(fixture.leftover_workspaces(), 0);
}

#[tokio::test]
async fn test_recipe_does_not_leak_into_remote() {
    let fixture = GitFixture::with_files(&[("main.sh", "echo hi")]);
    let h = harness(&fixture, ScriptedEngine::succeeding());

    h.service.build(&fixture.url(), None, RECIPE).await.unwrap();

    assert_eq!(fixture.branches(), vec!["main".to_string()]);
    assert!(fixture.read_on_branch("main", "Dockerfile").is_none());
}

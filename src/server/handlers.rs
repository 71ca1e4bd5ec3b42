use crate::error::{PipelineError, Stage, ValidationError};
use crate::pipeline::StackcraftService;
use crate::stack::StackProfile;
use crate::workspace::Credential;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use tracing::warn;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log: Option<String>,
}

impl<T> ApiResponse<T> {
    fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            stage: None,
            log: None,
        }
    }
}

impl ApiResponse<()> {
    fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            stage: None,
            log: None,
        }
    }
}

/// Fields are optional so a missing one is reported as a validation error
/// rather than a deserialization failure.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct RepositoryRequest {
    repository_url: Option<String>,
    github_token: Option<String>,
    dockerfile: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct GenerateData {
    dockerfile: String,
    tech_stack: StackProfile,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct BuildData {
    message: &'static str,
    success: bool,
    image_tag: String,
    image_id: Option<String>,
    log: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct PushData {
    branch: String,
    commit: String,
}

#[derive(Debug, Serialize)]
pub(super) struct HealthData {
    status: &'static str,
    version: &'static str,
}

pub(super) enum ApiError {
    BadRequest(String),
    Validation(ValidationError),
    Pipeline(PipelineError),
    Internal(String),
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::Validation(err)
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        ApiError::Pipeline(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(ApiResponse::error(message))).into_response()
            }
            ApiError::Validation(err) => {
                (StatusCode::BAD_REQUEST, Json(ApiResponse::error(err.to_string()))).into_response()
            }
            ApiError::Pipeline(err) => {
                warn!(stage = %err.stage, error = %err, "Request failed");
                let body = ApiResponse::<()> {
                    success: false,
                    data: None,
                    error: Some(err.to_string()),
                    stage: Some(err.stage),
                    log: err.build_log().map(String::from),
                };
                (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
            }
            ApiError::Internal(message) => {
                warn!(error = %message, "Request task failed");
                (StatusCode::INTERNAL_SERVER_ERROR, Json(ApiResponse::error(message))).into_response()
            }
        }
    }
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

/// Starts `operation` on its own task immediately. Dropping the returned
/// future (a client that disconnects) leaves the operation running to the
/// end, so its workspace is released and a started push is not cut off.
fn detached<T, F>(operation: F) -> impl Future<Output = Result<T, ApiError>>
where
    F: Future<Output = Result<T, PipelineError>> + Send + 'static,
    T: Send + 'static,
{
    let handle = tokio::spawn(operation);
    async move {
        match handle.await {
            Ok(result) => result.map_err(ApiError::from),
            Err(join) => Err(ApiError::Internal(format!("Operation task failed: {}", join))),
        }
    }
}

pub(super) async fn health() -> Json<ApiResponse<HealthData>> {
    Json(ApiResponse::success(HealthData {
        status: "ok",
        version: crate::VERSION,
    }))
}

pub(super) async fn generate(
    State(service): State<Arc<StackcraftService>>,
    body: Result<Json<RepositoryRequest>, JsonRejection>,
) -> ApiResult<GenerateData> {
    let Json(request) = body?;
    let url = ValidationError::require("repositoryUrl", request.repository_url.as_deref())?.to_string();
    let credential = Credential::from_optional(request.github_token);

    let generation = detached(async move { service.generate(&url, credential).await }).await?;
    Ok(Json(ApiResponse::success(GenerateData {
        dockerfile: generation.recipe.into_text(),
        tech_stack: generation.profile,
    })))
}

pub(super) async fn build(
    State(service): State<Arc<StackcraftService>>,
    body: Result<Json<RepositoryRequest>, JsonRejection>,
) -> ApiResult<BuildData> {
    let Json(request) = body?;
    let url = ValidationError::require("repositoryUrl", request.repository_url.as_deref())?.to_string();
    let recipe = ValidationError::require("dockerfile", request.dockerfile.as_deref())?.to_string();
    let credential = Credential::from_optional(request.github_token);

    let result = detached(async move { service.build(&url, credential, &recipe).await }).await?;
    Ok(Json(ApiResponse::success(BuildData {
        message: "Build completed",
        success: true,
        image_tag: result.image_tag,
        image_id: result.image_id,
        log: result.log,
    })))
}

pub(super) async fn push(
    State(service): State<Arc<StackcraftService>>,
    body: Result<Json<RepositoryRequest>, JsonRejection>,
) -> ApiResult<PushData> {
    let Json(request) = body?;
    let url = ValidationError::require("repositoryUrl", request.repository_url.as_deref())?.to_string();
    let recipe = ValidationError::require("dockerfile", request.dockerfile.as_deref())?.to_string();
    let credential = Credential::from_optional(request.github_token);

    let result = detached(async move { service.publish(&url, credential, &recipe).await }).await?;
    Ok(Json(ApiResponse::success(PushData {
        branch: result.branch,
        commit: result.commit,
    })))
}

use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use super::domain::{
    AdminUser, Application, ApplicationFilter, ApplicationId, ApplicationStatus,
    ApplicationSubmission, Decision, Role, UserId,
};
use super::repository::{ApplicationRepository, NotificationPublisher};
use super::service::{DocumentVerificationUpdate, ReviewWorkflowService, WorkflowError};

/// Body of `PATCH /applications/{id}/status`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdateRequest {
    #[serde(default)]
    pub status: Option<ApplicationStatus>,
    #[serde(default)]
    pub admin_id: Option<UserId>,
    #[serde(default)]
    pub admin_role: Option<Role>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub vetting_data: Option<VettingData>,
}

/// Optional vetting details sent alongside a move to `in_progress`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VettingData {
    /// Reviewer asserts every document was checked; skips the derived gate when allowed.
    #[serde(default)]
    pub documents_verified: bool,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteRequest {
    #[serde(default)]
    pub user_id: Option<UserId>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerQuery {
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminQuery {
    #[serde(default)]
    pub admin_id: Option<String>,
    #[serde(default)]
    pub admin_role: Option<Role>,
    #[serde(default)]
    pub status: Option<ApplicationStatus>,
    #[serde(default)]
    pub service_name: Option<String>,
}

impl AdminQuery {
    fn admin(&self) -> Result<AdminUser, WorkflowError> {
        admin_from(self.admin_id.clone().map(UserId), self.admin_role)
    }

    fn filter(&self) -> ApplicationFilter {
        ApplicationFilter {
            status: self.status,
            service_name: self.service_name.clone(),
        }
    }
}

/// Router builder exposing intake, review, and owner endpoints.
pub fn application_router<R, N>(service: Arc<ReviewWorkflowService<R, N>>) -> Router
where
    R: ApplicationRepository + 'static,
    N: NotificationPublisher + 'static,
{
    Router::new()
        .route(
            "/api/v1/applications",
            get(admin_list_handler::<R, N>).post(submit_handler::<R, N>),
        )
        .route(
            "/api/v1/applications/:application_id",
            get(owner_get_handler::<R, N>).delete(delete_handler::<R, N>),
        )
        .route(
            "/api/v1/applications/:application_id/status",
            patch(status_handler::<R, N>),
        )
        .route(
            "/api/v1/applications/:application_id/verify-documents",
            patch(verify_documents_handler::<R, N>),
        )
        .route(
            "/api/v1/users/:user_id/applications",
            get(user_list_handler::<R, N>),
        )
        .route(
            "/api/v1/admin/applications/:application_id",
            get(review_handler::<R, N>),
        )
        .with_state(service)
}

pub(crate) async fn submit_handler<R, N>(
    State(service): State<Arc<ReviewWorkflowService<R, N>>>,
    payload: Result<Json<ApplicationSubmission>, JsonRejection>,
) -> Response
where
    R: ApplicationRepository + 'static,
    N: NotificationPublisher + 'static,
{
    let Json(submission) = match payload {
        Ok(body) => body,
        Err(rejection) => return json_rejection(rejection),
    };

    match service.submit(submission) {
        Ok(application) => (StatusCode::CREATED, Json(application)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn owner_get_handler<R, N>(
    State(service): State<Arc<ReviewWorkflowService<R, N>>>,
    Path(application_id): Path<String>,
    query: Result<Query<OwnerQuery>, QueryRejection>,
) -> Response
where
    R: ApplicationRepository + 'static,
    N: NotificationPublisher + 'static,
{
    let Query(query) = match query {
        Ok(query) => query,
        Err(rejection) => return query_rejection(rejection),
    };
    let user_id = match required_user(query.user_id.map(UserId), "userId") {
        Ok(user_id) => user_id,
        Err(err) => return err.into_response(),
    };

    match service.get_for_owner(&ApplicationId(application_id), &user_id) {
        Ok(application) => (StatusCode::OK, Json(application)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn user_list_handler<R, N>(
    State(service): State<Arc<ReviewWorkflowService<R, N>>>,
    Path(user_id): Path<String>,
) -> Response
where
    R: ApplicationRepository + 'static,
    N: NotificationPublisher + 'static,
{
    match service.list_for_user(&UserId(user_id)) {
        Ok(applications) => (StatusCode::OK, Json(applications)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn admin_list_handler<R, N>(
    State(service): State<Arc<ReviewWorkflowService<R, N>>>,
    query: Result<Query<AdminQuery>, QueryRejection>,
) -> Response
where
    R: ApplicationRepository + 'static,
    N: NotificationPublisher + 'static,
{
    let Query(query) = match query {
        Ok(query) => query,
        Err(rejection) => return query_rejection(rejection),
    };

    let result = query
        .admin()
        .and_then(|admin| service.list_for_admin(&admin, &query.filter()));
    match result {
        Ok(applications) => (StatusCode::OK, Json(applications)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn review_handler<R, N>(
    State(service): State<Arc<ReviewWorkflowService<R, N>>>,
    Path(application_id): Path<String>,
    query: Result<Query<AdminQuery>, QueryRejection>,
) -> Response
where
    R: ApplicationRepository + 'static,
    N: NotificationPublisher + 'static,
{
    let Query(query) = match query {
        Ok(query) => query,
        Err(rejection) => return query_rejection(rejection),
    };

    let result = query
        .admin()
        .and_then(|admin| service.review(&ApplicationId(application_id), &admin));
    match result {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn status_handler<R, N>(
    State(service): State<Arc<ReviewWorkflowService<R, N>>>,
    Path(application_id): Path<String>,
    payload: Result<Json<StatusUpdateRequest>, JsonRejection>,
) -> Response
where
    R: ApplicationRepository + 'static,
    N: NotificationPublisher + 'static,
{
    let Json(request) = match payload {
        Ok(body) => body,
        Err(rejection) => return json_rejection(rejection),
    };

    match apply_status_update(&service, &ApplicationId(application_id), request) {
        Ok(application) => (StatusCode::OK, Json(application)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn verify_documents_handler<R, N>(
    State(service): State<Arc<ReviewWorkflowService<R, N>>>,
    Path(application_id): Path<String>,
    payload: Result<Json<DocumentVerificationUpdate>, JsonRejection>,
) -> Response
where
    R: ApplicationRepository + 'static,
    N: NotificationPublisher + 'static,
{
    let Json(update) = match payload {
        Ok(body) => body,
        Err(rejection) => return json_rejection(rejection),
    };

    match service.verify_documents(&ApplicationId(application_id), update) {
        Ok(application) => (StatusCode::OK, Json(application)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn delete_handler<R, N>(
    State(service): State<Arc<ReviewWorkflowService<R, N>>>,
    Path(application_id): Path<String>,
    payload: Result<Json<DeleteRequest>, JsonRejection>,
) -> Response
where
    R: ApplicationRepository + 'static,
    N: NotificationPublisher + 'static,
{
    let Json(request) = match payload {
        Ok(body) => body,
        Err(rejection) => return json_rejection(rejection),
    };

    let result = required_user(request.user_id, "userId").and_then(|user_id| {
        service.delete_application(&ApplicationId(application_id), &user_id)
    });
    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => err.into_response(),
    }
}

/// Map a requested target status onto the controller operation that produces it.
fn apply_status_update<R, N>(
    service: &ReviewWorkflowService<R, N>,
    application_id: &ApplicationId,
    request: StatusUpdateRequest,
) -> Result<Application, WorkflowError>
where
    R: ApplicationRepository + 'static,
    N: NotificationPublisher + 'static,
{
    let status = request
        .status
        .ok_or_else(|| WorkflowError::Validation("status is required".to_string()))?;
    let admin = admin_from(request.admin_id, request.admin_role)?;

    match status {
        ApplicationStatus::InProgress => {
            let vetting = request.vetting_data.unwrap_or_default();
            let notes = vetting.notes.or(request.notes);
            service.vet(application_id, &admin, notes, vetting.documents_verified)
        }
        ApplicationStatus::Completed => {
            service.decide(application_id, &admin, Decision::Approve, request.notes)
        }
        ApplicationStatus::Rejected => {
            service.decide(application_id, &admin, Decision::Reject, request.notes)
        }
        ApplicationStatus::Pending => Err(WorkflowError::Validation(
            "applications cannot be moved back to pending".to_string(),
        )),
    }
}

fn admin_from(admin_id: Option<UserId>, role: Option<Role>) -> Result<AdminUser, WorkflowError> {
    let id = required_user(admin_id, "adminId")?;
    let role =
        role.ok_or_else(|| WorkflowError::Validation("adminRole is required".to_string()))?;
    Ok(AdminUser {
        id,
        role,
        name: None,
        email: None,
    })
}

fn required_user(value: Option<UserId>, field: &str) -> Result<UserId, WorkflowError> {
    match value {
        Some(id) if !id.is_blank() => Ok(id),
        _ => Err(WorkflowError::Validation(format!("{field} is required"))),
    }
}

fn json_rejection(rejection: JsonRejection) -> Response {
    WorkflowError::Validation(rejection.body_text()).into_response()
}

fn query_rejection(rejection: QueryRejection) -> Response {
    WorkflowError::Validation(rejection.body_text()).into_response()
}

impl WorkflowError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            WorkflowError::NotAuthorized(_) => StatusCode::FORBIDDEN,
            WorkflowError::VettingIncomplete { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            WorkflowError::NotFound(_) => StatusCode::NOT_FOUND,
            WorkflowError::Validation(_) => StatusCode::BAD_REQUEST,
            WorkflowError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for WorkflowError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let payload = match &self {
            WorkflowError::Persistence(source) => {
                error!(error = %source, "persistence collaborator failed");
                json!({
                    "error": "the application store is unavailable, please try again later",
                })
            }
            WorkflowError::VettingIncomplete { missing } => json!({
                "error": self.to_string(),
                "missingDocuments": missing,
            }),
            other => json!({ "error": other.to_string() }),
        };
        (status, Json(payload)).into_response()
    }
}

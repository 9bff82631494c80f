use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Router,
};
use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::api_keys::ApiKeyRecord;
use super::domain::{ApiKeyId, BrandId, SurveyResponse};
use super::repository::{ApiKeyRepository, AutomationRepository, RepositoryError, SurveyRepository};
use super::service::{SurveyService, SurveyServiceError};
use super::webhook::TriggerRequest;

/// Router builder exposing the trigger webhook, response intake, and key management.
pub fn survey_router<S, A, K>(service: Arc<SurveyService<S, A, K>>) -> Router
where
    S: SurveyRepository + 'static,
    A: AutomationRepository + 'static,
    K: ApiKeyRepository + 'static,
{
    Router::new()
        .route("/api/v1/surveys/trigger", post(trigger_handler::<S, A, K>))
        .route("/api/v1/responses", post(response_handler::<S, A, K>))
        .route(
            "/api/v1/brands/:brand_id/api-keys",
            get(list_keys_handler::<S, A, K>).post(issue_key_handler::<S, A, K>),
        )
        .route(
            "/api/v1/brands/:brand_id/api-keys/:key_id",
            delete(revoke_key_handler::<S, A, K>),
        )
        .with_state(service)
}

#[derive(Debug, Clone, Deserialize)]
pub struct IssueKeyRequest {
    pub name: String,
}

/// Key metadata safe to list: never the digest, never the plaintext.
#[derive(Debug, Clone, Serialize)]
pub struct ApiKeyView {
    pub id: ApiKeyId,
    pub name: String,
    pub key_prefix: String,
    pub created_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl From<&ApiKeyRecord> for ApiKeyView {
    fn from(record: &ApiKeyRecord) -> Self {
        Self {
            id: record.id.clone(),
            name: record.name.clone(),
            key_prefix: record.key_prefix.clone(),
            created_at: record.created_at,
            last_used_at: record.last_used_at,
            revoked_at: record.revoked_at,
        }
    }
}

pub(crate) async fn trigger_handler<S, A, K>(
    State(service): State<Arc<SurveyService<S, A, K>>>,
    headers: HeaderMap,
    axum::Json(request): axum::Json<TriggerRequest>,
) -> Response
where
    S: SurveyRepository + 'static,
    A: AutomationRepository + 'static,
    K: ApiKeyRepository + 'static,
{
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    match service.trigger(authorization, request, Utc::now()) {
        Ok(outcome) => {
            let status = if outcome.eligibility.eligible {
                StatusCode::ACCEPTED
            } else {
                StatusCode::OK
            };
            (status, axum::Json(outcome)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn response_handler<S, A, K>(
    State(service): State<Arc<SurveyService<S, A, K>>>,
    axum::Json(response): axum::Json<SurveyResponse>,
) -> Response
where
    S: SurveyRepository + 'static,
    A: AutomationRepository + 'static,
    K: ApiKeyRepository + 'static,
{
    match service.record_response(&response, Utc::now()) {
        Ok(outcome) => (StatusCode::OK, axum::Json(outcome)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn issue_key_handler<S, A, K>(
    State(service): State<Arc<SurveyService<S, A, K>>>,
    Path(brand_id): Path<String>,
    axum::Json(request): axum::Json<IssueKeyRequest>,
) -> Response
where
    S: SurveyRepository + 'static,
    A: AutomationRepository + 'static,
    K: ApiKeyRepository + 'static,
{
    let name = request.name.trim();
    if name.is_empty() {
        let payload = json!({ "error": "api key name is required" });
        return (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response();
    }

    match service.issue_api_key(name, BrandId(brand_id), Utc::now()) {
        Ok(issued) => {
            let payload = json!({
                "api_key": ApiKeyView::from(&issued.record),
                "key": issued.full_key.expose_secret(),
                "notice": "store this key now; it cannot be retrieved again",
            });
            (StatusCode::CREATED, axum::Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn list_keys_handler<S, A, K>(
    State(service): State<Arc<SurveyService<S, A, K>>>,
    Path(brand_id): Path<String>,
) -> Response
where
    S: SurveyRepository + 'static,
    A: AutomationRepository + 'static,
    K: ApiKeyRepository + 'static,
{
    match service.list_api_keys(&BrandId(brand_id)) {
        Ok(records) => {
            let views: Vec<ApiKeyView> = records.iter().map(ApiKeyView::from).collect();
            (StatusCode::OK, axum::Json(views)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn revoke_key_handler<S, A, K>(
    State(service): State<Arc<SurveyService<S, A, K>>>,
    Path((brand_id, key_id)): Path<(String, String)>,
) -> Response
where
    S: SurveyRepository + 'static,
    A: AutomationRepository + 'static,
    K: ApiKeyRepository + 'static,
{
    match service.revoke_api_key(&BrandId(brand_id), &ApiKeyId(key_id), Utc::now()) {
        Ok(record) => (StatusCode::OK, axum::Json(ApiKeyView::from(&record))).into_response(),
        Err(error) => error_response(error),
    }
}

/// HTTP status for a failed survey operation.
pub fn status_for(error: &SurveyServiceError) -> StatusCode {
    match error {
        SurveyServiceError::Unauthorized => StatusCode::UNAUTHORIZED,
        SurveyServiceError::Trigger(_) => StatusCode::UNPROCESSABLE_ENTITY,
        SurveyServiceError::ContactNotFound(_)
        | SurveyServiceError::EventNotFound(_)
        | SurveyServiceError::LocationNotFound(_)
        | SurveyServiceError::ApiKeyNotFound(_)
        | SurveyServiceError::EventOutOfScope { .. }
        | SurveyServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        SurveyServiceError::EventNotDistributable { .. }
        | SurveyServiceError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
        SurveyServiceError::KeyIssue(_)
        | SurveyServiceError::Repository(RepositoryError::Unavailable(_)) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn error_response(error: SurveyServiceError) -> Response {
    let status = status_for(&error);
    let payload = json!({ "error": error.to_string() });
    (status, axum::Json(payload)).into_response()
}

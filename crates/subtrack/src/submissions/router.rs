use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{NewSubmission, ResellerId, ResellerUpdate, SubmissionId, SubmissionStatus};
use super::expiry::MAX_EXPIRY_WINDOW_DAYS;
use super::repository::{PlanRepository, ResellerRepository, SubmissionRepository};
use super::service::{FieldErrors, SubmissionError, SubmissionService};

type SharedService<S, P, R> = Arc<SubmissionService<S, P, R>>;

#[derive(Debug, Deserialize)]
pub(crate) struct ListQuery {
    #[serde(default)]
    pub(crate) reseller_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TransitionRequest {
    pub(crate) status: SubmissionStatus,
    #[serde(default)]
    pub(crate) duration_months: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RenewRequest {
    pub(crate) extra_months: u32,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProfileNameRequest {
    #[serde(default)]
    pub(crate) profile_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BanRequest {
    pub(crate) banned: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ExpiringQuery {
    #[serde(default)]
    pub(crate) window_days: Option<u32>,
}

/// Router builder exposing the submission lifecycle, expiry dashboards, and reseller
/// administration over HTTP.
pub fn submission_router<S, P, R>(service: SharedService<S, P, R>) -> Router
where
    S: SubmissionRepository + 'static,
    P: PlanRepository + 'static,
    R: ResellerRepository + 'static,
{
    Router::new()
        .route(
            "/api/v1/submissions",
            post(create_handler::<S, P, R>).get(list_handler::<S, P, R>),
        )
        .route(
            "/api/v1/submissions/active",
            post(create_active_handler::<S, P, R>),
        )
        .route(
            "/api/v1/submissions/expiring",
            get(expiring_handler::<S, P, R>),
        )
        .route("/api/v1/submissions/expired", get(expired_handler::<S, P, R>))
        .route(
            "/api/v1/submissions/overview",
            get(overview_handler::<S, P, R>),
        )
        .route("/api/v1/submissions/:id", get(get_handler::<S, P, R>))
        .route(
            "/api/v1/submissions/:id/status",
            post(transition_handler::<S, P, R>),
        )
        .route(
            "/api/v1/submissions/:id/renew",
            post(renew_handler::<S, P, R>),
        )
        .route(
            "/api/v1/submissions/:id/profile-name",
            put(profile_name_handler::<S, P, R>),
        )
        .route(
            "/api/v1/submissions/:id/notification-read",
            post(notification_read_handler::<S, P, R>),
        )
        .route("/api/v1/plans", get(plans_handler::<S, P, R>))
        .route("/api/v1/resellers", get(list_resellers_handler::<S, P, R>))
        .route(
            "/api/v1/resellers/:id",
            get(get_reseller_handler::<S, P, R>)
                .put(update_reseller_handler::<S, P, R>)
                .delete(delete_reseller_handler::<S, P, R>),
        )
        .route(
            "/api/v1/resellers/:id/ban",
            post(ban_reseller_handler::<S, P, R>),
        )
        .with_state(service)
}

pub(crate) async fn create_handler<S, P, R>(
    State(service): State<SharedService<S, P, R>>,
    Json(request): Json<NewSubmission>,
) -> Response
where
    S: SubmissionRepository + 'static,
    P: PlanRepository + 'static,
    R: ResellerRepository + 'static,
{
    match service.create(request) {
        Ok(submission) => (StatusCode::CREATED, Json(submission)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn create_active_handler<S, P, R>(
    State(service): State<SharedService<S, P, R>>,
    Json(request): Json<NewSubmission>,
) -> Response
where
    S: SubmissionRepository + 'static,
    P: PlanRepository + 'static,
    R: ResellerRepository + 'static,
{
    match service.create_active(request) {
        Ok(submission) => (StatusCode::CREATED, Json(submission)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn list_handler<S, P, R>(
    State(service): State<SharedService<S, P, R>>,
    Query(query): Query<ListQuery>,
) -> Response
where
    S: SubmissionRepository + 'static,
    P: PlanRepository + 'static,
    R: ResellerRepository + 'static,
{
    let result = match query.reseller_id {
        Some(reseller_id) => service.list_for_reseller(&ResellerId(reseller_id)),
        None => service.list_all(),
    };

    match result {
        Ok(submissions) => (StatusCode::OK, Json(submissions)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn get_handler<S, P, R>(
    State(service): State<SharedService<S, P, R>>,
    Path(id): Path<String>,
) -> Response
where
    S: SubmissionRepository + 'static,
    P: PlanRepository + 'static,
    R: ResellerRepository + 'static,
{
    match service.get(&SubmissionId(id)) {
        Ok(submission) => (StatusCode::OK, Json(submission)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn transition_handler<S, P, R>(
    State(service): State<SharedService<S, P, R>>,
    Path(id): Path<String>,
    Json(request): Json<TransitionRequest>,
) -> Response
where
    S: SubmissionRepository + 'static,
    P: PlanRepository + 'static,
    R: ResellerRepository + 'static,
{
    match service.transition(&SubmissionId(id), request.status, request.duration_months) {
        Ok(submission) => (StatusCode::OK, Json(submission)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn renew_handler<S, P, R>(
    State(service): State<SharedService<S, P, R>>,
    Path(id): Path<String>,
    Json(request): Json<RenewRequest>,
) -> Response
where
    S: SubmissionRepository + 'static,
    P: PlanRepository + 'static,
    R: ResellerRepository + 'static,
{
    match service.renew(&SubmissionId(id), request.extra_months) {
        Ok(submission) => (StatusCode::OK, Json(submission)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn profile_name_handler<S, P, R>(
    State(service): State<SharedService<S, P, R>>,
    Path(id): Path<String>,
    Json(request): Json<ProfileNameRequest>,
) -> Response
where
    S: SubmissionRepository + 'static,
    P: PlanRepository + 'static,
    R: ResellerRepository + 'static,
{
    match service.set_profile_name(&SubmissionId(id), request.profile_name) {
        Ok(submission) => (StatusCode::OK, Json(submission)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn notification_read_handler<S, P, R>(
    State(service): State<SharedService<S, P, R>>,
    Path(id): Path<String>,
) -> Response
where
    S: SubmissionRepository + 'static,
    P: PlanRepository + 'static,
    R: ResellerRepository + 'static,
{
    let id = SubmissionId(id);
    match service.mark_notification_read(&id) {
        Ok(updated) => {
            let payload = json!({ "submission_id": id, "updated": updated });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn expiring_handler<S, P, R>(
    State(service): State<SharedService<S, P, R>>,
    Query(query): Query<ExpiringQuery>,
) -> Response
where
    S: SubmissionRepository + 'static,
    P: PlanRepository + 'static,
    R: ResellerRepository + 'static,
{
    let scanner = service.scanner();
    let window_days = query
        .window_days
        .unwrap_or(scanner.config().expiring_soon_days);
    if window_days > MAX_EXPIRY_WINDOW_DAYS {
        let fields = FieldErrors::single(
            "window_days",
            format!("Window cannot exceed {MAX_EXPIRY_WINDOW_DAYS} days."),
        );
        return error_response(fields.into());
    }

    match scanner.list_expiring_within(window_days) {
        Ok(rows) => {
            let payload = json!({ "window_days": window_days, "submissions": rows });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(err) => error_response(err.into()),
    }
}

pub(crate) async fn expired_handler<S, P, R>(
    State(service): State<SharedService<S, P, R>>,
) -> Response
where
    S: SubmissionRepository + 'static,
    P: PlanRepository + 'static,
    R: ResellerRepository + 'static,
{
    match service.scanner().list_expired() {
        Ok(rows) => (StatusCode::OK, Json(rows)).into_response(),
        Err(err) => error_response(err.into()),
    }
}

pub(crate) async fn overview_handler<S, P, R>(
    State(service): State<SharedService<S, P, R>>,
) -> Response
where
    S: SubmissionRepository + 'static,
    P: PlanRepository + 'static,
    R: ResellerRepository + 'static,
{
    match service.scanner().overview() {
        Ok(overview) => (StatusCode::OK, Json(overview)).into_response(),
        Err(err) => error_response(err.into()),
    }
}

pub(crate) async fn plans_handler<S, P, R>(
    State(service): State<SharedService<S, P, R>>,
) -> Response
where
    S: SubmissionRepository + 'static,
    P: PlanRepository + 'static,
    R: ResellerRepository + 'static,
{
    match service.list_plans() {
        Ok(plans) => (StatusCode::OK, Json(plans)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn list_resellers_handler<S, P, R>(
    State(service): State<SharedService<S, P, R>>,
) -> Response
where
    S: SubmissionRepository + 'static,
    P: PlanRepository + 'static,
    R: ResellerRepository + 'static,
{
    match service.list_resellers() {
        Ok(resellers) => (StatusCode::OK, Json(resellers)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn get_reseller_handler<S, P, R>(
    State(service): State<SharedService<S, P, R>>,
    Path(id): Path<String>,
) -> Response
where
    S: SubmissionRepository + 'static,
    P: PlanRepository + 'static,
    R: ResellerRepository + 'static,
{
    match service.get_reseller(&ResellerId(id)) {
        Ok(reseller) => (StatusCode::OK, Json(reseller)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn update_reseller_handler<S, P, R>(
    State(service): State<SharedService<S, P, R>>,
    Path(id): Path<String>,
    Json(request): Json<ResellerUpdate>,
) -> Response
where
    S: SubmissionRepository + 'static,
    P: PlanRepository + 'static,
    R: ResellerRepository + 'static,
{
    match service.update_reseller_info(&ResellerId(id), request) {
        Ok(reseller) => (StatusCode::OK, Json(reseller)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn ban_reseller_handler<S, P, R>(
    State(service): State<SharedService<S, P, R>>,
    Path(id): Path<String>,
    Json(request): Json<BanRequest>,
) -> Response
where
    S: SubmissionRepository + 'static,
    P: PlanRepository + 'static,
    R: ResellerRepository + 'static,
{
    match service.set_reseller_banned(&ResellerId(id), request.banned) {
        Ok(reseller) => (StatusCode::OK, Json(reseller)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn delete_reseller_handler<S, P, R>(
    State(service): State<SharedService<S, P, R>>,
    Path(id): Path<String>,
) -> Response
where
    S: SubmissionRepository + 'static,
    P: PlanRepository + 'static,
    R: ResellerRepository + 'static,
{
    let id = ResellerId(id);
    match service.delete_reseller(&id) {
        Ok(removed) => {
            let payload = json!({ "reseller_id": id, "submissions_removed": removed });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(err) => error_response(err),
    }
}

fn error_response(err: SubmissionError) -> Response {
    match err {
        SubmissionError::NotFound { .. } => {
            let payload = json!({ "error": err.to_string() });
            (StatusCode::NOT_FOUND, Json(payload)).into_response()
        }
        SubmissionError::Validation(fields) => {
            let payload = json!({
                "error": "Please check the form fields and try again.",
                "fields": fields,
            });
            (StatusCode::UNPROCESSABLE_ENTITY, Json(payload)).into_response()
        }
        SubmissionError::Storage(source) => {
            tracing::error!(error = %source, "submission storage failure");
            let payload = json!({ "error": source.to_string() });
            (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response()
        }
    }
}

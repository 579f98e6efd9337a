use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use super::domain::{FormId, SignupRequest};
use super::origin::enforce_allowed_origins;
use super::repository::{CorsSettingsRepository, EmailSignupRepository, SignupFormRepository};
use super::service::{ConfirmError, EmailSignupService, SignupError};

/// Router builder exposing the public intake and confirmation endpoints.
///
/// The origin gate is layered onto the submission route only; confirmation
/// links arrive from mail clients and never carry a meaningful Origin.
pub fn signup_router<F, S, C>(
    service: Arc<EmailSignupService<F, S>>,
    cors: Arc<C>,
) -> Router
where
    F: SignupFormRepository + 'static,
    S: EmailSignupRepository + 'static,
    C: CorsSettingsRepository + 'static,
{
    let submission = Router::new()
        .route("/api/signups", post(submit_handler::<F, S>))
        .route_layer(middleware::from_fn_with_state(
            cors,
            enforce_allowed_origins::<C>,
        ))
        .with_state(service.clone());

    let rest = Router::new()
        .route(
            "/api/signups/confirmations",
            get(confirm_handler::<F, S>),
        )
        .route("/api/signups/:form_id", get(list_handler::<F, S>))
        .route("/api/signups/:form_id/stats", get(stats_handler::<F, S>))
        .with_state(service);

    submission.merge(rest)
}

pub(crate) async fn submit_handler<F, S>(
    State(service): State<Arc<EmailSignupService<F, S>>>,
    Json(request): Json<SignupRequest>,
) -> Response
where
    F: SignupFormRepository + 'static,
    S: EmailSignupRepository + 'static,
{
    match service.submit(request).await {
        Ok(receipt) => (StatusCode::OK, Json(json!({ "message": receipt.message }))).into_response(),
        Err(err) => signup_error_response(err),
    }
}

fn signup_error_response(err: SignupError) -> Response {
    let status = match &err {
        SignupError::InvalidEmail => StatusCode::BAD_REQUEST,
        SignupError::FormNotFound => StatusCode::NOT_FOUND,
        SignupError::FormNotActive | SignupError::EmailAlreadySignedUp => StatusCode::CONFLICT,
        SignupError::Repository(_) | SignupError::TokenStore(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, Json(json!({ "error": err.to_string() }))).into_response()
}

#[derive(Debug, Deserialize)]
pub(crate) struct ConfirmationParams {
    #[serde(rename = "confirmationToken")]
    confirmation_token: String,
}

pub(crate) async fn confirm_handler<F, S>(
    State(service): State<Arc<EmailSignupService<F, S>>>,
    Query(params): Query<ConfirmationParams>,
) -> Response
where
    F: SignupFormRepository + 'static,
    S: EmailSignupRepository + 'static,
{
    match service.confirm(&params.confirmation_token).await {
        Ok(receipt) => (StatusCode::OK, Json(json!({ "message": receipt.message }))).into_response(),
        Err(err) => confirm_error_response(err),
    }
}

/// Confirmation failures answer with a structured problem payload so the
/// landing page can show the title and detail verbatim.
fn confirm_error_response(err: ConfirmError) -> Response {
    let (status, detail) = match &err {
        ConfirmError::InvalidToken => (
            StatusCode::BAD_REQUEST,
            "Invalid token, submit the signup again with the email address that needs to be signed up.",
        ),
        ConfirmError::ExpiredToken => (
            StatusCode::BAD_REQUEST,
            "The confirmation token is expired, please sign up to the form again.",
        ),
        ConfirmError::EmailAlreadyConfirmed => (
            StatusCode::CONFLICT,
            "The email address has already been confirmed.",
        ),
        ConfirmError::Repository(_) | ConfirmError::TokenStore(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "The confirmation could not be processed, please try again later.",
        ),
    };
    let body = json!({
        "title": err.to_string(),
        "detail": detail,
        "status": status.as_u16(),
    });
    (status, Json(body)).into_response()
}

/// Owner-facing view of one collected signup.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailSignupView {
    pub email: String,
    pub form_id: FormId,
    pub signup_date: DateTime<Utc>,
}

pub(crate) async fn list_handler<F, S>(
    State(service): State<Arc<EmailSignupService<F, S>>>,
    Path(form_id): Path<Uuid>,
) -> Response
where
    F: SignupFormRepository + 'static,
    S: EmailSignupRepository + 'static,
{
    match service.signups_for_form(FormId(form_id)).await {
        Ok(signups) => {
            let views: Vec<EmailSignupView> = signups
                .into_iter()
                .map(|signup| EmailSignupView {
                    email: signup.email_address,
                    form_id: signup.form_id,
                    signup_date: signup.signup_date,
                })
                .collect();
            (StatusCode::OK, Json(views)).into_response()
        }
        Err(err) => signup_error_response(err),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatsParams {
    #[serde(default)]
    start_date: Option<NaiveDate>,
    #[serde(default)]
    end_date: Option<NaiveDate>,
}

pub(crate) async fn stats_handler<F, S>(
    State(service): State<Arc<EmailSignupService<F, S>>>,
    Path(form_id): Path<Uuid>,
    Query(params): Query<StatsParams>,
) -> Response
where
    F: SignupFormRepository + 'static,
    S: EmailSignupRepository + 'static,
{
    match service
        .signups_per_day(FormId(form_id), params.start_date, params.end_date)
        .await
    {
        Ok(stats) => (StatusCode::OK, Json(stats)).into_response(),
        Err(err) => signup_error_response(err),
    }
}

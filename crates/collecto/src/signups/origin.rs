use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::{debug, warn};

use super::domain::SignupRequest;
use super::repository::CorsSettingsRepository;

/// Submission bodies are tiny; anything past this is not a signup.
const MAX_PEEK_BYTES: usize = 64 * 1024;

/// Precondition filter for signup submissions.
///
/// Peeks the request body to learn which form is targeted, compares the
/// `Origin` header against that form's allow-list, and short-circuits with
/// 403 before the orchestrator runs. The buffered body is re-attached so
/// the handler downstream still reads it. Forms without CORS settings are
/// unrestricted; whether the form exists at all is the orchestrator's call.
pub async fn enforce_allowed_origins<C>(
    State(cors): State<Arc<C>>,
    request: Request,
    next: Next,
) -> Response
where
    C: CorsSettingsRepository + 'static,
{
    let (parts, body) = request.into_parts();
    let origin = parts
        .headers
        .get(header::ORIGIN)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);

    let bytes = match to_bytes(body, MAX_PEEK_BYTES).await {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!(error = %err, "could not buffer signup body");
            return bad_request();
        }
    };

    let submission: SignupRequest = match serde_json::from_slice(&bytes) {
        Ok(submission) => submission,
        Err(err) => {
            warn!(error = %err, "signup body is not a valid submission");
            return bad_request();
        }
    };

    let settings = match cors.by_form(submission.form_id).await {
        Ok(settings) => settings,
        Err(err) => {
            // Infrastructure trouble must not lock visitors out; the
            // orchestrator still has final authority over the form.
            warn!(form_id = %submission.form_id, error = %err, "cors settings lookup failed, letting the request through");
            None
        }
    };

    if let Some(settings) = settings {
        if !settings.allows(origin.as_deref()) {
            warn!(
                form_id = %submission.form_id,
                origin = origin.as_deref().unwrap_or_default(),
                "origin is not allowed for this form"
            );
            return (
                StatusCode::FORBIDDEN,
                Json(json!({ "error": "Origin is not allowed." })),
            )
                .into_response();
        }
        debug!(form_id = %submission.form_id, "origin allowed");
    }

    let request = Request::from_parts(parts, Body::from(bytes));
    next.run(request).await
}

fn bad_request() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": "Malformed signup submission." })),
    )
        .into_response()
}

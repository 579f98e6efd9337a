use crate::infra::AppState;
use axum::extract::{Path, Query};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Extension;
use axum::Json;
use collecto::exports::{collect_form_submissions, export, ExportError, ExportFormat};
use collecto::signups::{
    signup_router, CorsSettingsRepository, EmailSignupRepository, EmailSignupService, FormId,
    SignupFormRepository,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

/// Repositories the export endpoints read from, shared via extension.
#[derive(Clone)]
pub(crate) struct ExportContext {
    pub(crate) forms: Arc<dyn SignupFormRepository>,
    pub(crate) signups: Arc<dyn EmailSignupRepository>,
}

pub(crate) fn with_service_routes<F, S, C>(
    service: Arc<EmailSignupService<F, S>>,
    cors: Arc<C>,
) -> axum::Router
where
    F: SignupFormRepository + 'static,
    S: EmailSignupRepository + 'static,
    C: CorsSettingsRepository + 'static,
{
    signup_router(service, cors)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route("/api/exports", axum::routing::get(export_all_endpoint))
        .route(
            "/api/exports/:form_id",
            axum::routing::get(export_form_endpoint),
        )
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[derive(Debug, Deserialize)]
pub(crate) struct ExportParams {
    #[serde(default = "default_export_format")]
    pub(crate) format: String,
}

fn default_export_format() -> String {
    "csv".to_string()
}

pub(crate) async fn export_all_endpoint(
    Extension(context): Extension<ExportContext>,
    Query(params): Query<ExportParams>,
) -> Response {
    let format = match ExportFormat::parse(&params.format) {
        Ok(format) => format,
        Err(err) => return export_error_response(err),
    };

    let forms = match context.forms.list().await {
        Ok(forms) => forms,
        Err(err) => return repository_error_response(err),
    };
    if forms.is_empty() {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "No forms found to export." })),
        )
            .into_response();
    }

    let form_ids: Vec<FormId> = forms.iter().map(|form| form.id).collect();
    render_export(&context, &form_ids, format).await
}

pub(crate) async fn export_form_endpoint(
    Extension(context): Extension<ExportContext>,
    Path(form_id): Path<Uuid>,
    Query(params): Query<ExportParams>,
) -> Response {
    let format = match ExportFormat::parse(&params.format) {
        Ok(format) => format,
        Err(err) => return export_error_response(err),
    };

    let form_id = FormId(form_id);
    match context.forms.fetch(form_id).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": "Form not found." })),
            )
                .into_response();
        }
        Err(err) => return repository_error_response(err),
    }

    render_export(&context, &[form_id], format).await
}

async fn render_export(context: &ExportContext, form_ids: &[FormId], format: ExportFormat) -> Response {
    let records = match collect_form_submissions(
        context.forms.as_ref(),
        context.signups.as_ref(),
        form_ids,
    )
    .await
    {
        Ok(records) => records,
        Err(err) => return repository_error_response(err),
    };

    match export(&records, format) {
        Ok(bytes) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, format.content_type().to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", format.file_name()),
                ),
            ],
            bytes,
        )
            .into_response(),
        Err(err) => export_error_response(err),
    }
}

fn export_error_response(err: ExportError) -> Response {
    let status = match &err {
        ExportError::UnsupportedFormat(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(json!({ "error": err.to_string() }))).into_response()
}

fn repository_error_response(err: collecto::signups::RepositoryError) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": err.to_string() })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::{InMemoryFormRepository, InMemorySignupRepository};
    use axum::body::to_bytes;
    use collecto::signups::{EmailSignup, SignupForm};

    async fn seeded_context() -> (ExportContext, FormId) {
        let forms = InMemoryFormRepository::default();
        let signups = InMemorySignupRepository::default();

        let form = SignupForm::new("Launch List", Uuid::new_v4());
        let form_id = form.id;
        forms.put(form);
        for email in ["a@example.com", "b@example.com"] {
            signups
                .insert(EmailSignup::new(form_id, email))
                .await
                .expect("seed insert succeeds");
        }

        (
            ExportContext {
                forms: Arc::new(forms),
                signups: Arc::new(signups),
            },
            form_id,
        )
    }

    async fn body_string(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body reads");
        String::from_utf8(bytes.to_vec()).expect("body is utf-8")
    }

    #[tokio::test]
    async fn export_all_renders_csv_with_one_row_per_subscriber() {
        let (context, form_id) = seeded_context().await;
        let response = export_all_endpoint(
            Extension(context),
            Query(ExportParams {
                format: "csv".to_string(),
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"collecto_export.csv\""
        );
        let body = body_string(response).await;
        assert!(body.starts_with("Form ID,Form Name,Subscriber Email"));
        assert_eq!(body.lines().count(), 3);
        assert!(body.contains(&form_id.to_string()));
    }

    #[tokio::test]
    async fn export_all_answers_404_when_no_forms_exist() {
        let context = ExportContext {
            forms: Arc::new(InMemoryFormRepository::default()),
            signups: Arc::new(InMemorySignupRepository::default()),
        };
        let response = export_all_endpoint(
            Extension(context),
            Query(ExportParams {
                format: "csv".to_string(),
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(body_string(response).await.contains("No forms found to export."));
    }

    #[tokio::test]
    async fn export_form_renders_json_for_one_form() {
        let (context, form_id) = seeded_context().await;
        let response = export_form_endpoint(
            Extension(context),
            Path(form_id.0),
            Query(ExportParams {
                format: "json".to_string(),
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
        let parsed: serde_json::Value =
            serde_json::from_str(&body_string(response).await).expect("body parses");
        let objects = parsed.as_array().expect("array of records");
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0]["Form Name"], "Launch List");
        assert_eq!(
            objects[0]["Subscriber Email"]
                .as_array()
                .expect("emails are an array")
                .len(),
            2
        );
    }

    #[tokio::test]
    async fn export_form_answers_404_for_unknown_form() {
        let (context, _) = seeded_context().await;
        let response = export_form_endpoint(
            Extension(context),
            Path(Uuid::new_v4()),
            Query(ExportParams {
                format: "csv".to_string(),
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn unsupported_format_is_a_bad_request() {
        let (context, _) = seeded_context().await;
        let response = export_all_endpoint(
            Extension(context),
            Query(ExportParams {
                format: "xml".to_string(),
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_string(response).await.contains("xml"));
    }
}

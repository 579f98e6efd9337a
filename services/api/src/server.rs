use crate::cli::ServeArgs;
use crate::infra::{
    AppState, InMemoryCorsRepository, InMemoryEmailSettingsRepository, InMemoryFormRepository,
    InMemorySignupRepository, InMemoryTemplateRepository, InMemoryTokenStore,
};
use crate::routes::{with_service_routes, ExportContext};
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use collecto::config::AppConfig;
use collecto::error::AppError;
use collecto::signups::{
    ConfirmationPipeline, CorsSettings, DnsMxLookup, EmailAddressValidator, EmailDispatcher,
    EmailSignupService, NoopEmailDispatcher, SignupForm, SignupOptions, SmtpEmailDispatcher,
};
use collecto::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let forms = Arc::new(InMemoryFormRepository::default());
    let signups = Arc::new(InMemorySignupRepository::default());
    let cors = Arc::new(InMemoryCorsRepository::default());

    if args.seed_demo_form {
        let form = SignupForm::new("Demo Form", Uuid::new_v4());
        let form_id = form.id;
        info!(%form_id, allowed_origin = %config.signup.base_url, "seeded demo signup form");
        forms.put(form);
        // The demo form only accepts browser submissions from our own pages.
        cors.put(CorsSettings {
            form_id,
            allowed_origins: vec![config.signup.base_url.clone()],
        });
    }

    let dispatcher: Arc<dyn EmailDispatcher> = if config.signup.email_confirmation {
        Arc::new(SmtpEmailDispatcher::new(config.smtp.clone()))
    } else {
        Arc::new(NoopEmailDispatcher)
    };
    let pipeline = ConfirmationPipeline {
        token_store: Arc::new(InMemoryTokenStore::default()),
        dispatcher,
        email_settings: Arc::new(InMemoryEmailSettingsRepository::default()),
        templates: Arc::new(InMemoryTemplateRepository::default()),
    };

    let validator = EmailAddressValidator::new(Arc::new(DnsMxLookup::new()));
    let service = Arc::new(EmailSignupService::new(
        forms.clone(),
        signups.clone(),
        validator,
        pipeline,
        SignupOptions::from(&config.signup),
    ));

    let export_context = ExportContext {
        forms: forms.clone(),
        signups: signups.clone(),
    };

    let app = with_service_routes(service, cors)
        .layer(Extension(app_state))
        .layer(Extension(export_context))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "collecto ready to collect signups");

    axum::serve(listener, app).await?;
    Ok(())
}

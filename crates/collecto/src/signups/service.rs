use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{info, warn};

use super::dispatch::{confirmation_message, EmailDispatcher, Message};
use super::domain::{
    EmailSignup, FormId, FormStatus, SignupRequest, SignupStats, TemplateEvent,
};
use super::repository::{
    EmailSettingsRepository, EmailSignupRepository, RepositoryError, SignupFormRepository,
    TemplateRepository,
};
use super::tokens::{issue_token, ConfirmationTokenStore, SignupCandidate, TokenStoreError};
use super::validation::EmailAddressValidator;

/// Terminal outcomes of the submission state machine, each mapped to a
/// stable user-facing message by its `Display` impl.
#[derive(Debug, thiserror::Error)]
pub enum SignupError {
    #[error("Invalid email address.")]
    InvalidEmail,
    #[error("Form not found.")]
    FormNotFound,
    #[error("Form is not active.")]
    FormNotActive,
    #[error("Email address is already signed up for this form.")]
    EmailAlreadySignedUp,
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    TokenStore(#[from] TokenStoreError),
}

/// Terminal outcomes of confirmation resolution.
#[derive(Debug, thiserror::Error)]
pub enum ConfirmError {
    #[error("Confirmation token expired.")]
    ExpiredToken,
    #[error("Invalid confirmation token.")]
    InvalidToken,
    #[error("Email already confirmed.")]
    EmailAlreadyConfirmed,
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    TokenStore(#[from] TokenStoreError),
}

/// Successful outcome handed back to the HTTP layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignupReceipt {
    pub message: &'static str,
}

impl SignupReceipt {
    fn submitted() -> Self {
        Self {
            message: "Email address submitted successfully.",
        }
    }

    fn pending_confirmation() -> Self {
        Self {
            message: "Email address submitted, please confirm the signup from your inbox.",
        }
    }

    fn confirmed() -> Self {
        Self {
            message: "Email confirmed.",
        }
    }
}

/// Runtime knobs for the signup pipeline, derived from [`crate::config::SignupConfig`].
#[derive(Debug, Clone)]
pub struct SignupOptions {
    pub email_confirmation: bool,
    pub base_url: String,
    pub confirmation_ttl: Duration,
}

impl Default for SignupOptions {
    fn default() -> Self {
        Self {
            email_confirmation: false,
            base_url: "http://localhost:3000".to_string(),
            confirmation_ttl: Duration::from_secs(3600),
        }
    }
}

impl From<&crate::config::SignupConfig> for SignupOptions {
    fn from(config: &crate::config::SignupConfig) -> Self {
        Self {
            email_confirmation: config.email_confirmation,
            base_url: config.base_url.clone(),
            confirmation_ttl: config.confirmation_ttl,
        }
    }
}

/// Collaborators of the confirmation flow, grouped so the service
/// constructor stays readable.
pub struct ConfirmationPipeline {
    pub token_store: Arc<dyn ConfirmationTokenStore>,
    pub dispatcher: Arc<dyn EmailDispatcher>,
    pub email_settings: Arc<dyn EmailSettingsRepository>,
    pub templates: Arc<dyn TemplateRepository>,
}

/// Orchestrates signup intake and confirmation on top of the form and
/// signup repositories.
pub struct EmailSignupService<F, S> {
    forms: Arc<F>,
    signups: Arc<S>,
    validator: EmailAddressValidator,
    pipeline: ConfirmationPipeline,
    options: SignupOptions,
}

impl<F, S> EmailSignupService<F, S>
where
    F: SignupFormRepository + 'static,
    S: EmailSignupRepository + 'static,
{
    pub fn new(
        forms: Arc<F>,
        signups: Arc<S>,
        validator: EmailAddressValidator,
        pipeline: ConfirmationPipeline,
        options: SignupOptions,
    ) -> Self {
        Self {
            forms,
            signups,
            validator,
            pipeline,
            options,
        }
    }

    /// Submission state machine: validate, look the form up, check for a
    /// duplicate, check the form is active, then either persist or start
    /// the confirmation flow.
    pub async fn submit(&self, request: SignupRequest) -> Result<SignupReceipt, SignupError> {
        info!(form_id = %request.form_id, "processing signup submission");

        if !self.validator.validate(&request.email).await {
            return Err(SignupError::InvalidEmail);
        }

        let form = self
            .forms
            .fetch(request.form_id)
            .await?
            .ok_or(SignupError::FormNotFound)?;

        // Duplicate detection runs before the active-status check, so a
        // repeated address on a paused form still reports the duplicate.
        let existing = self.signups.by_form(form.id).await?;
        if existing
            .iter()
            .any(|signup| signup.email_address == request.email)
        {
            return Err(SignupError::EmailAlreadySignedUp);
        }

        if form.status != FormStatus::Active {
            return Err(SignupError::FormNotActive);
        }

        if !self.options.email_confirmation {
            let signup = match request.signup_date {
                Some(date) => EmailSignup::with_date(form.id, &request.email, date),
                None => EmailSignup::new(form.id, &request.email),
            };
            match self.signups.insert(signup).await {
                Ok(()) => {}
                // Two submissions can race past the duplicate check; the
                // storage constraint is authoritative.
                Err(RepositoryError::Conflict) => return Err(SignupError::EmailAlreadySignedUp),
                Err(other) => return Err(other.into()),
            }
            info!(form_id = %form.id, "email signup recorded");
            return Ok(SignupReceipt::submitted());
        }

        let candidate = SignupCandidate::new(form.id, request.email.clone());
        let token = issue_token();
        self.pipeline
            .token_store
            .put(&token, &candidate.encode(), self.options.confirmation_ttl)
            .await?;

        let message = confirmation_message(&request.email, &self.options.base_url, &token);
        self.dispatch_for_form(form.id, message).await;

        info!(form_id = %form.id, "signup parked, awaiting confirmation");
        Ok(SignupReceipt::pending_confirmation())
    }

    /// Resolves a confirmation token: decode the parked candidate, re-check
    /// for a duplicate, persist, then evict the token best effort.
    pub async fn confirm(&self, confirmation_token: &str) -> Result<SignupReceipt, ConfirmError> {
        let payload = self
            .pipeline
            .token_store
            .get(confirmation_token)
            .await?
            .ok_or(ConfirmError::ExpiredToken)?;

        let candidate = SignupCandidate::decode(&payload).ok_or(ConfirmError::InvalidToken)?;

        let existing = self.signups.by_form(candidate.form_id).await?;
        if existing
            .iter()
            .any(|signup| signup.email_address == candidate.email)
        {
            return Err(ConfirmError::EmailAlreadyConfirmed);
        }

        let signup = EmailSignup::new(candidate.form_id, &candidate.email);
        match self.signups.insert(signup).await {
            Ok(()) => {}
            Err(RepositoryError::Conflict) => return Err(ConfirmError::EmailAlreadyConfirmed),
            Err(other) => return Err(other.into()),
        }

        // Eviction is best effort; the row now exists, so a lingering token
        // can only ever produce EmailAlreadyConfirmed.
        if let Err(err) = self.pipeline.token_store.remove(confirmation_token).await {
            warn!(error = %err, "failed to evict confirmation token");
        }

        self.send_welcome_email(candidate.form_id, &candidate.email)
            .await;

        info!(form_id = %candidate.form_id, "email signup confirmed");
        Ok(SignupReceipt::confirmed())
    }

    /// All collected signups for a form, for the owner-facing listing.
    pub async fn signups_for_form(
        &self,
        form_id: FormId,
    ) -> Result<Vec<EmailSignup>, SignupError> {
        let form = self
            .forms
            .fetch(form_id)
            .await?
            .ok_or(SignupError::FormNotFound)?;
        Ok(self.signups.by_form(form.id).await?)
    }

    /// Per-day signup counts for a form, optionally bounded by a date range.
    pub async fn signups_per_day(
        &self,
        form_id: FormId,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<SignupStats>, SignupError> {
        let form = self
            .forms
            .fetch(form_id)
            .await?
            .ok_or(SignupError::FormNotFound)?;

        let mut per_day: BTreeMap<NaiveDate, u64> = BTreeMap::new();
        for signup in self.signups.by_form(form.id).await? {
            let date = signup.signup_date.date_naive();
            if start_date.is_some_and(|start| date < start)
                || end_date.is_some_and(|end| date > end)
            {
                continue;
            }
            *per_day.entry(date).or_default() += 1;
        }

        Ok(per_day
            .into_iter()
            .map(|(date, count)| SignupStats { date, count })
            .collect())
    }

    async fn dispatch_for_form(&self, form_id: FormId, message: Message) {
        let settings = match self.pipeline.email_settings.by_form(form_id).await {
            Ok(settings) => settings,
            Err(err) => {
                warn!(%form_id, error = %err, "failed to load form email settings, falling back to defaults");
                None
            }
        };
        // A failed send never rolls anything back; the visitor can retry.
        if let Err(err) = self
            .pipeline
            .dispatcher
            .send(message, settings.as_ref())
            .await
        {
            warn!(%form_id, error = %err, "email dispatch failed");
        }
    }

    async fn send_welcome_email(&self, form_id: FormId, email: &str) {
        let template = match self
            .pipeline
            .templates
            .by_form_and_event(form_id, TemplateEvent::EmailConfirmed)
            .await
        {
            Ok(Some(template)) => template,
            Ok(None) => return,
            Err(err) => {
                warn!(%form_id, error = %err, "failed to load welcome email template");
                return;
            }
        };
        let message = Message::new(vec![email.to_string()], template.subject, template.body);
        self.dispatch_for_form(form_id, message).await;
    }
}

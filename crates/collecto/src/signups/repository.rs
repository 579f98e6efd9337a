use async_trait::async_trait;

use super::domain::{
    CorsSettings, CustomEmailTemplate, EmailSignup, FormEmailSettings, FormId, SignupForm,
    TemplateEvent,
};

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Read-only view of signup forms. Form management lives elsewhere; this
/// crate only ever looks forms up.
#[async_trait]
pub trait SignupFormRepository: Send + Sync {
    async fn fetch(&self, id: FormId) -> Result<Option<SignupForm>, RepositoryError>;
    async fn list(&self) -> Result<Vec<SignupForm>, RepositoryError>;
}

/// Storage for collected addresses.
///
/// `insert` is expected to enforce uniqueness of `(form_id, email_address)`
/// and answer [`RepositoryError::Conflict`] on violation; that constraint is
/// the authoritative duplicate signal when concurrent submissions race past
/// the service-level check.
#[async_trait]
pub trait EmailSignupRepository: Send + Sync {
    async fn insert(&self, signup: EmailSignup) -> Result<(), RepositoryError>;
    async fn by_form(&self, form_id: FormId) -> Result<Vec<EmailSignup>, RepositoryError>;
}

/// Lookup of per-form origin allow-lists for the origin gate.
#[async_trait]
pub trait CorsSettingsRepository: Send + Sync {
    async fn by_form(&self, form_id: FormId) -> Result<Option<CorsSettings>, RepositoryError>;
}

/// Lookup of per-form outbound email settings.
#[async_trait]
pub trait EmailSettingsRepository: Send + Sync {
    async fn by_form(&self, form_id: FormId)
        -> Result<Option<FormEmailSettings>, RepositoryError>;
}

/// Lookup of owner-authored email templates.
#[async_trait]
pub trait TemplateRepository: Send + Sync {
    async fn by_form_and_event(
        &self,
        form_id: FormId,
        event: TemplateEvent,
    ) -> Result<Option<CustomEmailTemplate>, RepositoryError>;
}

//! Signup intake and confirmation.
//!
//! A submission passes the origin gate, then the orchestrating
//! [`EmailSignupService`] validates the address, checks the form and
//! existing signups, and either persists immediately or parks the
//! candidate in the confirmation token store and mails out a link.

pub mod dispatch;
pub mod domain;
pub mod origin;
pub mod repository;
pub mod router;
pub mod service;
pub mod tokens;
pub mod validation;

pub use dispatch::{
    DispatchError, EmailDispatcher, Message, NoopEmailDispatcher, SmtpEmailDispatcher,
};
pub use domain::{
    CorsSettings, CustomEmailTemplate, EmailSignup, FormEmailSettings, FormId, FormStatus,
    RecaptchaSettings, SignupForm, SignupRequest, SignupStats, SmtpSettings, TemplateEvent,
};
pub use origin::enforce_allowed_origins;
pub use repository::{
    CorsSettingsRepository, EmailSettingsRepository, EmailSignupRepository, RepositoryError,
    SignupFormRepository, TemplateRepository,
};
pub use router::{signup_router, EmailSignupView};
pub use service::{
    ConfirmError, ConfirmationPipeline, EmailSignupService, SignupError, SignupOptions,
    SignupReceipt,
};
pub use tokens::{issue_token, ConfirmationTokenStore, SignupCandidate, TokenStoreError};
pub use validation::{DnsMxLookup, EmailAddressValidator, MxLookup};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifier wrapper for signup forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FormId(pub Uuid);

impl FormId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(value: &str) -> Option<Self> {
        Uuid::parse_str(value).ok().map(Self)
    }
}

impl Default for FormId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for FormId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Only active forms accept new signups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FormStatus {
    Active,
    Inactive,
}

/// A tenant-owned collection point for email addresses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignupForm {
    pub id: FormId,
    pub name: String,
    pub created_by: Uuid,
    pub status: FormStatus,
    pub created_at: DateTime<Utc>,
}

impl SignupForm {
    pub fn new(name: impl Into<String>, created_by: Uuid) -> Self {
        Self {
            id: FormId::new(),
            name: name.into(),
            created_by,
            status: FormStatus::Active,
            created_at: Utc::now(),
        }
    }
}

/// One collected address. Rows are created through the signup service and
/// never updated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailSignup {
    pub id: Uuid,
    pub email_address: String,
    pub form_id: FormId,
    pub signup_date: DateTime<Utc>,
}

impl EmailSignup {
    pub fn new(form_id: FormId, email_address: impl Into<String>) -> Self {
        Self::with_date(form_id, email_address, Utc::now())
    }

    pub fn with_date(
        form_id: FormId,
        email_address: impl Into<String>,
        signup_date: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            email_address: email_address.into(),
            form_id,
            signup_date,
        }
    }
}

/// Per-form allow-list consulted by the origin gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorsSettings {
    pub form_id: FormId,
    pub allowed_origins: Vec<String>,
}

impl CorsSettings {
    /// An absent or empty Origin header always passes: same-origin requests
    /// and non-browser clients do not send one.
    pub fn allows(&self, origin: Option<&str>) -> bool {
        match origin {
            None | Some("") => true,
            Some(origin) => self.allowed_origins.iter().any(|allowed| allowed == origin),
        }
    }
}

/// Form-scoped SMTP transport configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmtpSettings {
    pub form_id: FormId,
    pub from_address: String,
    pub server: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

/// How outbound email is produced for a form. Forms without settings fall
/// back to the process-wide defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FormEmailSettings {
    /// Only a from-address is customized; transport comes from the process
    /// defaults.
    Generic { form_id: FormId, from_address: String },
    /// Full per-form SMTP transport.
    Smtp(SmtpSettings),
}

/// Recaptcha keys a form owner may attach. Verification calls are outside
/// this crate's scope; the settings ride along with the form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecaptchaSettings {
    pub form_id: FormId,
    pub site_key: String,
    pub secret_key: String,
}

/// Lifecycle moments a form owner can attach a custom email template to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TemplateEvent {
    EmailConfirmed,
}

/// Owner-authored email template for a form event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomEmailTemplate {
    pub form_id: FormId,
    pub event: TemplateEvent,
    pub subject: String,
    pub body: String,
}

/// Inbound submission payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub form_id: FormId,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signup_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recaptcha_token: Option<String>,
}

/// Per-day signup count for a form, used by the stats endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SignupStats {
    pub date: NaiveDate,
    pub count: u64,
}

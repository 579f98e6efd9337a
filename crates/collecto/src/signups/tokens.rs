use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use super::domain::FormId;

const PAYLOAD_FORM_PREFIX: &str = "formId:";
const PAYLOAD_EMAIL_SEPARATOR: &str = "#signup:";

/// Error enumeration for token store failures.
#[derive(Debug, thiserror::Error)]
pub enum TokenStoreError {
    #[error("token store unavailable: {0}")]
    Unavailable(String),
}

/// Time-bounded key-value store holding signups awaiting confirmation.
///
/// Entries expire on their own; the service additionally evicts a token
/// after a successful confirmation, best effort. No uniqueness or locking
/// guarantees beyond what the backing cache provides.
#[async_trait]
pub trait ConfirmationTokenStore: Send + Sync {
    async fn put(&self, token: &str, payload: &str, ttl: Duration)
        -> Result<(), TokenStoreError>;
    async fn get(&self, token: &str) -> Result<Option<String>, TokenStoreError>;
    async fn remove(&self, token: &str) -> Result<(), TokenStoreError>;
}

/// Freshly generated opaque token for a confirmation link.
pub fn issue_token() -> String {
    Uuid::new_v4().simple().to_string()
}

/// The pending signup a confirmation token resolves to. Lives only inside
/// the token store, encoded as `formId:<uuid>#signup:<email>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignupCandidate {
    pub form_id: FormId,
    pub email: String,
}

impl SignupCandidate {
    pub fn new(form_id: FormId, email: impl Into<String>) -> Self {
        Self {
            form_id,
            email: email.into(),
        }
    }

    pub fn encode(&self) -> String {
        format!(
            "{PAYLOAD_FORM_PREFIX}{}{PAYLOAD_EMAIL_SEPARATOR}{}",
            self.form_id, self.email
        )
    }

    /// Returns `None` for any payload missing a segment or carrying a
    /// malformed form id.
    pub fn decode(payload: &str) -> Option<Self> {
        let rest = payload.strip_prefix(PAYLOAD_FORM_PREFIX)?;
        let (raw_id, email) = rest.split_once(PAYLOAD_EMAIL_SEPARATOR)?;
        let form_id = FormId::parse(raw_id)?;
        if email.is_empty() {
            return None;
        }
        Some(Self {
            form_id,
            email: email.to_string(),
        })
    }
}

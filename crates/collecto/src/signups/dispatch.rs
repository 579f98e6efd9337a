use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use tracing::debug;

use crate::config::SmtpDefaults;

use super::domain::FormEmailSettings;

const SENDER_DISPLAY_NAME: &str = "Collecto";

/// Outbound email payload, transport-agnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub to: Vec<String>,
    pub subject: String,
    pub html_body: String,
}

impl Message {
    pub fn new(to: Vec<String>, subject: impl Into<String>, html_body: impl Into<String>) -> Self {
        Self {
            to,
            subject: subject.into(),
            html_body: html_body.into(),
        }
    }
}

/// Error enumeration for dispatch failures.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("invalid mailbox address: {0}")]
    Address(#[from] lettre::address::AddressError),
    #[error("failed to build email message: {0}")]
    Build(#[from] lettre::error::Error),
    #[error("smtp transport failure: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),
    #[error("no smtp configuration available for this message")]
    MissingConfiguration,
}

/// Capability interface for sending email. The concrete implementation is
/// chosen once at startup; callers never learn which one they hold.
#[async_trait]
pub trait EmailDispatcher: Send + Sync {
    async fn send(
        &self,
        message: Message,
        form_settings: Option<&FormEmailSettings>,
    ) -> Result<(), DispatchError>;
}

struct ResolvedTransport {
    server: String,
    port: u16,
    username: String,
    password: String,
    from_address: String,
}

/// Picks the transport for one message. Full per-form SMTP settings win
/// outright; the generic variant only replaces the from-address on top of
/// the process defaults.
fn resolve_transport(
    form_settings: Option<&FormEmailSettings>,
    defaults: Option<&SmtpDefaults>,
) -> Result<ResolvedTransport, DispatchError> {
    match (form_settings, defaults) {
        (Some(FormEmailSettings::Smtp(s)), _) => Ok(ResolvedTransport {
            server: s.server.clone(),
            port: s.port,
            username: s.username.clone(),
            password: s.password.clone(),
            from_address: s.from_address.clone(),
        }),
        (Some(FormEmailSettings::Generic { from_address, .. }), Some(d)) => {
            Ok(ResolvedTransport {
                server: d.server.clone(),
                port: d.port,
                username: d.username.clone(),
                password: d.password.clone(),
                from_address: from_address.clone(),
            })
        }
        (None, Some(d)) => Ok(ResolvedTransport {
            server: d.server.clone(),
            port: d.port,
            username: d.username.clone(),
            password: d.password.clone(),
            from_address: d.from_address.clone(),
        }),
        (_, None) => Err(DispatchError::MissingConfiguration),
    }
}

/// SMTP-backed dispatcher. Per-form settings win; otherwise the process
/// defaults apply.
pub struct SmtpEmailDispatcher {
    defaults: Option<SmtpDefaults>,
}

impl SmtpEmailDispatcher {
    pub fn new(defaults: Option<SmtpDefaults>) -> Self {
        Self { defaults }
    }
}

#[async_trait]
impl EmailDispatcher for SmtpEmailDispatcher {
    async fn send(
        &self,
        message: Message,
        form_settings: Option<&FormEmailSettings>,
    ) -> Result<(), DispatchError> {
        let ResolvedTransport {
            server,
            port,
            username,
            password,
            from_address,
        } = resolve_transport(form_settings, self.defaults.as_ref())?;

        let Message {
            to,
            subject,
            html_body,
        } = message;

        let from: Mailbox = format!("{SENDER_DISPLAY_NAME} <{from_address}>").parse()?;
        let mut builder = lettre::Message::builder().from(from).subject(subject);
        for recipient in &to {
            builder = builder.to(recipient.parse()?);
        }
        let email = builder.header(ContentType::TEXT_HTML).body(html_body)?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&server)?
            .port(port)
            .credentials(Credentials::new(username, password))
            .build();
        transport.send(email).await?;
        Ok(())
    }
}

/// Dispatcher that drops every message, for deployments without outbound
/// email.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopEmailDispatcher;

#[async_trait]
impl EmailDispatcher for NoopEmailDispatcher {
    async fn send(
        &self,
        message: Message,
        _form_settings: Option<&FormEmailSettings>,
    ) -> Result<(), DispatchError> {
        debug!(to = ?message.to, subject = %message.subject, "email dispatch disabled, dropping message");
        Ok(())
    }
}

/// Renders the double opt-in confirmation email for a pending signup.
pub(crate) fn confirmation_message(email: &str, base_url: &str, token: &str) -> Message {
    let link = format!("{base_url}/api/signups/confirmations?confirmationToken={token}");
    let body = format!(
        "<html><body>\
         <h2>Confirm your signup</h2>\
         <p>Someone (hopefully you) asked to sign this address up. \
         The request expires in one hour.</p>\
         <p><a href=\"{link}\">Confirm my email</a></p>\
         <p>If this was not you, ignore this message.</p>\
         </body></html>"
    );
    Message::new(vec![email.to_string()], "Confirm your signup", body)
}

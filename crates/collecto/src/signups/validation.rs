use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use hickory_resolver::{
    config::ResolverConfig, name_server::TokioConnectionProvider, Resolver,
};
use tracing::{debug, warn};

/// Bound on the MX query so a slow resolver cannot stall a submission.
const MX_LOOKUP_TIMEOUT: Duration = Duration::from_secs(3);

/// Liveness probe for an email domain.
#[async_trait]
pub trait MxLookup: Send + Sync {
    /// Returns true when the domain publishes at least one MX record.
    async fn has_mx_records(&self, domain: &str) -> bool;
}

/// [`MxLookup`] backed by the system DNS configuration.
pub struct DnsMxLookup {
    resolver: Resolver<TokioConnectionProvider>,
}

impl DnsMxLookup {
    pub fn new() -> Self {
        let resolver = Resolver::builder_with_config(
            ResolverConfig::default(),
            TokioConnectionProvider::default(),
        )
        .build();
        Self { resolver }
    }
}

impl Default for DnsMxLookup {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MxLookup for DnsMxLookup {
    async fn has_mx_records(&self, domain: &str) -> bool {
        match tokio::time::timeout(MX_LOOKUP_TIMEOUT, self.resolver.mx_lookup(domain)).await {
            Ok(Ok(answer)) => answer.iter().next().is_some(),
            Ok(Err(err)) => {
                debug!(%domain, error = %err, "mx lookup failed, treating address as invalid");
                false
            }
            Err(_) => {
                warn!(%domain, "mx lookup timed out, treating address as invalid");
                false
            }
        }
    }
}

/// Two-stage address validation: shape first, then an MX probe on the
/// domain. Both stages collapse to a single pass/fail for callers.
pub struct EmailAddressValidator {
    mx: Arc<dyn MxLookup>,
}

impl EmailAddressValidator {
    pub fn new(mx: Arc<dyn MxLookup>) -> Self {
        Self { mx }
    }

    pub async fn validate(&self, email: &str) -> bool {
        let Some(domain) = well_formed_domain(email) else {
            debug!("email address failed the syntactic check");
            return false;
        };
        self.mx.has_mx_records(domain).await
    }
}

/// Accepts `local@domain.tld`: non-whitespace segments around a single `@`,
/// with at least one dot inside the domain. Returns the domain on success.
fn well_formed_domain(email: &str) -> Option<&str> {
    if email.chars().any(char::is_whitespace) {
        return None;
    }
    let (local, domain) = email.split_once('@')?;
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return None;
    }
    let (host, tld) = domain.rsplit_once('.')?;
    if host.is_empty() || tld.is_empty() {
        return None;
    }
    Some(domain)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StaticMx(bool);

    #[async_trait]
    impl MxLookup for StaticMx {
        async fn has_mx_records(&self, _domain: &str) -> bool {
            self.0
        }
    }

    #[test]
    fn well_formed_addresses_expose_their_domain() {
        assert_eq!(well_formed_domain("user@example.com"), Some("example.com"));
        assert_eq!(well_formed_domain("a.b+c@mail.co.uk"), Some("mail.co.uk"));
    }

    #[test]
    fn malformed_addresses_are_rejected_before_dns() {
        for email in [
            "",
            "plainaddress",
            "missing-domain@",
            "@missing-local.com",
            "no-dot@domain",
            "two@@example.com",
            "with space@example.com",
            "trailing-dot@example.",
            "leading-dot@.example",
        ] {
            assert_eq!(well_formed_domain(email), None, "{email:?} should be rejected");
        }
    }

    #[tokio::test]
    async fn validation_requires_both_stages() {
        let accepts = EmailAddressValidator::new(Arc::new(StaticMx(true)));
        assert!(accepts.validate("user@example.com").await);
        assert!(!accepts.validate("not-an-email").await);

        let rejects = EmailAddressValidator::new(Arc::new(StaticMx(false)));
        assert!(!rejects.validate("user@example.com").await);
    }
}

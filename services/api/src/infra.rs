use async_trait::async_trait;
use collecto::signups::{
    ConfirmationTokenStore, CorsSettings, CorsSettingsRepository, CustomEmailTemplate,
    EmailSettingsRepository, EmailSignup, EmailSignupRepository, FormEmailSettings, FormId,
    RepositoryError, SignupForm, SignupFormRepository, TemplateEvent, TemplateRepository,
    TokenStoreError,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryFormRepository {
    forms: Arc<Mutex<HashMap<FormId, SignupForm>>>,
}

impl InMemoryFormRepository {
    pub(crate) fn put(&self, form: SignupForm) {
        let mut guard = self.forms.lock().expect("form mutex poisoned");
        guard.insert(form.id, form);
    }
}

#[async_trait]
impl SignupFormRepository for InMemoryFormRepository {
    async fn fetch(&self, id: FormId) -> Result<Option<SignupForm>, RepositoryError> {
        let guard = self.forms.lock().expect("form mutex poisoned");
        Ok(guard.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<SignupForm>, RepositoryError> {
        let guard = self.forms.lock().expect("form mutex poisoned");
        let mut forms: Vec<SignupForm> = guard.values().cloned().collect();
        forms.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(forms)
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemorySignupRepository {
    signups: Arc<Mutex<Vec<EmailSignup>>>,
}

#[async_trait]
impl EmailSignupRepository for InMemorySignupRepository {
    async fn insert(&self, signup: EmailSignup) -> Result<(), RepositoryError> {
        let mut guard = self.signups.lock().expect("signup mutex poisoned");
        // Stands in for the database unique index on (form_id, email_address).
        if guard
            .iter()
            .any(|row| row.form_id == signup.form_id && row.email_address == signup.email_address)
        {
            return Err(RepositoryError::Conflict);
        }
        guard.push(signup);
        Ok(())
    }

    async fn by_form(&self, form_id: FormId) -> Result<Vec<EmailSignup>, RepositoryError> {
        let guard = self.signups.lock().expect("signup mutex poisoned");
        Ok(guard
            .iter()
            .filter(|row| row.form_id == form_id)
            .cloned()
            .collect())
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryCorsRepository {
    settings: Arc<Mutex<HashMap<FormId, CorsSettings>>>,
}

impl InMemoryCorsRepository {
    pub(crate) fn put(&self, settings: CorsSettings) {
        let mut guard = self.settings.lock().expect("cors mutex poisoned");
        guard.insert(settings.form_id, settings);
    }
}

#[async_trait]
impl CorsSettingsRepository for InMemoryCorsRepository {
    async fn by_form(&self, form_id: FormId) -> Result<Option<CorsSettings>, RepositoryError> {
        let guard = self.settings.lock().expect("cors mutex poisoned");
        Ok(guard.get(&form_id).cloned())
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryEmailSettingsRepository {
    settings: Arc<Mutex<HashMap<FormId, FormEmailSettings>>>,
}

#[async_trait]
impl EmailSettingsRepository for InMemoryEmailSettingsRepository {
    async fn by_form(
        &self,
        form_id: FormId,
    ) -> Result<Option<FormEmailSettings>, RepositoryError> {
        let guard = self.settings.lock().expect("email settings mutex poisoned");
        Ok(guard.get(&form_id).cloned())
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryTemplateRepository {
    templates: Arc<Mutex<HashMap<(FormId, TemplateEvent), CustomEmailTemplate>>>,
}

#[async_trait]
impl TemplateRepository for InMemoryTemplateRepository {
    async fn by_form_and_event(
        &self,
        form_id: FormId,
        event: TemplateEvent,
    ) -> Result<Option<CustomEmailTemplate>, RepositoryError> {
        let guard = self.templates.lock().expect("template mutex poisoned");
        Ok(guard.get(&(form_id, event)).cloned())
    }
}

/// Process-local token store. Expiry is checked lazily on read, which is
/// enough for a single-instance deployment; expired entries linger until
/// touched.
#[derive(Default, Clone)]
pub(crate) struct InMemoryTokenStore {
    entries: Arc<Mutex<HashMap<String, (String, Instant)>>>,
}

#[async_trait]
impl ConfirmationTokenStore for InMemoryTokenStore {
    async fn put(&self, token: &str, payload: &str, ttl: Duration) -> Result<(), TokenStoreError> {
        let mut guard = self.entries.lock().expect("token mutex poisoned");
        guard.insert(token.to_string(), (payload.to_string(), Instant::now() + ttl));
        Ok(())
    }

    async fn get(&self, token: &str) -> Result<Option<String>, TokenStoreError> {
        let mut guard = self.entries.lock().expect("token mutex poisoned");
        match guard.get(token) {
            Some((_, deadline)) if *deadline <= Instant::now() => {
                guard.remove(token);
                Ok(None)
            }
            Some((payload, _)) => Ok(Some(payload.clone())),
            None => Ok(None),
        }
    }

    async fn remove(&self, token: &str) -> Result<(), TokenStoreError> {
        let mut guard = self.entries.lock().expect("token mutex poisoned");
        guard.remove(token);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn token_store_round_trips_and_evicts() {
        let store = InMemoryTokenStore::default();
        store
            .put("tok", "payload", Duration::from_secs(60))
            .await
            .expect("put succeeds");
        assert_eq!(store.get("tok").await.expect("get succeeds").as_deref(), Some("payload"));

        store.remove("tok").await.expect("remove succeeds");
        assert_eq!(store.get("tok").await.expect("get succeeds"), None);
    }

    #[tokio::test]
    async fn token_store_expires_entries() {
        let store = InMemoryTokenStore::default();
        store
            .put("tok", "payload", Duration::from_millis(1))
            .await
            .expect("put succeeds");
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(store.get("tok").await.expect("get succeeds"), None);
    }

    #[tokio::test]
    async fn cors_repository_serves_seeded_settings() {
        let repository = InMemoryCorsRepository::default();
        let form_id = FormId::new();
        repository.put(CorsSettings {
            form_id,
            allowed_origins: vec!["https://collecto.example".to_string()],
        });

        let settings = repository
            .by_form(form_id)
            .await
            .expect("lookup succeeds")
            .expect("settings present");
        assert!(settings.allows(Some("https://collecto.example")));
        assert!(!settings.allows(Some("https://evil.example")));

        assert!(repository
            .by_form(FormId::new())
            .await
            .expect("lookup succeeds")
            .is_none());
    }

    #[tokio::test]
    async fn signup_repository_rejects_duplicate_addresses_per_form() {
        let repository = InMemorySignupRepository::default();
        let form_id = FormId::new();
        repository
            .insert(EmailSignup::new(form_id, "user@example.com"))
            .await
            .expect("first insert succeeds");

        let err = repository
            .insert(EmailSignup::new(form_id, "user@example.com"))
            .await
            .expect_err("duplicate insert must fail");
        assert!(matches!(err, RepositoryError::Conflict));

        // Same address on a different form is a distinct signup.
        repository
            .insert(EmailSignup::new(FormId::new(), "user@example.com"))
            .await
            .expect("insert on another form succeeds");
    }
}

use tracing::warn;

use crate::signups::{
    EmailSignupRepository, FormId, RepositoryError, SignupFormRepository,
};

use super::metadata::{ExportField, Exportable, FieldValue};

/// One form with its collected subscriber addresses, flattened for export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormSubmissionsData {
    pub id: FormId,
    pub name: String,
    pub emails: Vec<String>,
}

impl Exportable for FormSubmissionsData {
    fn export_fields() -> Vec<ExportField<Self>> {
        vec![
            ExportField {
                display_name: "Form ID",
                accessor: |record| FieldValue::Text(record.id.to_string()),
            },
            ExportField {
                display_name: "Form Name",
                accessor: |record| FieldValue::Text(record.name.clone()),
            },
            ExportField {
                display_name: "Subscriber Email",
                accessor: |record| FieldValue::List(record.emails.clone()),
            },
        ]
    }
}

/// Assembles export records for the given forms. Ids that resolve to no
/// form are skipped rather than failing the whole export.
pub async fn collect_form_submissions<F, S>(
    forms: &F,
    signups: &S,
    form_ids: &[FormId],
) -> Result<Vec<FormSubmissionsData>, RepositoryError>
where
    F: SignupFormRepository + ?Sized,
    S: EmailSignupRepository + ?Sized,
{
    let mut records = Vec::with_capacity(form_ids.len());
    for &form_id in form_ids {
        let Some(form) = forms.fetch(form_id).await? else {
            warn!(%form_id, "skipping unknown form during export");
            continue;
        };
        let emails = signups
            .by_form(form_id)
            .await?
            .into_iter()
            .map(|signup| signup.email_address)
            .collect();
        records.push(FormSubmissionsData {
            id: form.id,
            name: form.name,
            emails,
        });
    }
    Ok(records)
}

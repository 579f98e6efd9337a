//! Export engine: declarative field metadata rendered through a
//! format-specific strategy.
//!
//! Exportable types declare an ordered table of `(display name, accessor)`
//! pairs; the engine resolves the table once per export and hands it to
//! the CSV or JSON strategy.

pub mod metadata;
pub mod report;
mod strategies;

pub use metadata::{ExportField, Exportable, FieldValue};
pub use report::{collect_form_submissions, FormSubmissionsData};

/// Output formats the engine knows how to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    /// Parses the format out of a query parameter. Unknown formats are the
    /// one place "unsupported" can surface; the render dispatch below is
    /// exhaustive by construction.
    pub fn parse(value: &str) -> Result<Self, ExportError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            other => Err(ExportError::UnsupportedFormat(other.to_string())),
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Csv => "text/csv",
            Self::Json => "application/json",
        }
    }

    pub fn file_name(&self) -> &'static str {
        match self {
            Self::Csv => "collecto_export.csv",
            Self::Json => "collecto_export.json",
        }
    }
}

/// Error enumeration for export failures. No partial output is ever
/// produced; a failed render yields nothing.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("export format '{0}' is not supported")]
    UnsupportedFormat(String),
    #[error("failed to render csv export: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to render json export: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to finish export buffer: {0}")]
    Buffer(String),
}

/// Renders `records` in the requested format.
pub fn export<T: Exportable>(records: &[T], format: ExportFormat) -> Result<Vec<u8>, ExportError> {
    let fields = T::export_fields();
    match format {
        ExportFormat::Csv => strategies::render_csv(records, &fields),
        ExportFormat::Json => strategies::render_json(records, &fields),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_known_formats_case_insensitively() {
        assert_eq!(ExportFormat::parse("csv").unwrap(), ExportFormat::Csv);
        assert_eq!(ExportFormat::parse("Json").unwrap(), ExportFormat::Json);
        assert_eq!(ExportFormat::parse(" CSV ").unwrap(), ExportFormat::Csv);
    }

    #[test]
    fn parse_rejects_unknown_formats() {
        let err = ExportFormat::parse("xlsx").unwrap_err();
        assert!(matches!(err, ExportError::UnsupportedFormat(_)));
        assert!(err.to_string().contains("xlsx"));
    }

    #[test]
    fn formats_carry_their_content_type_and_file_name() {
        assert_eq!(ExportFormat::Csv.content_type(), "text/csv");
        assert_eq!(ExportFormat::Json.content_type(), "application/json");
        assert_eq!(ExportFormat::Csv.file_name(), "collecto_export.csv");
        assert_eq!(ExportFormat::Json.file_name(), "collecto_export.json");
    }
}

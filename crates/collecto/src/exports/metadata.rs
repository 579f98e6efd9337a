/// Value produced by an export field accessor.
///
/// `List` is what makes form exports interesting: a form row carries the
/// whole set of subscriber addresses, and the CSV strategy expands it into
/// one output row per element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    List(Vec<String>),
}

/// One column of an export: a display name and the accessor extracting the
/// value from a record.
pub struct ExportField<T> {
    pub display_name: &'static str,
    pub accessor: fn(&T) -> FieldValue,
}

/// Types renderable by the export engine declare a static, ordered field
/// table. The order is the column order and is stable per type.
pub trait Exportable: Sized {
    fn export_fields() -> Vec<ExportField<Self>>;
}

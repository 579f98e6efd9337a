use csv::WriterBuilder;
use serde_json::{Map, Value};

use super::metadata::{ExportField, FieldValue};
use super::ExportError;

/// CSV rendering with list expansion.
///
/// Each record spans as many rows as its longest list field. Scalar values
/// repeat on every row of their record; a list shorter than the record's
/// row count pads the tail with empty cells.
pub(super) fn render_csv<T>(
    records: &[T],
    fields: &[ExportField<T>],
) -> Result<Vec<u8>, ExportError> {
    let mut writer = WriterBuilder::new().from_writer(Vec::new());
    writer.write_record(fields.iter().map(|field| field.display_name))?;

    for record in records {
        let values: Vec<FieldValue> = fields
            .iter()
            .map(|field| (field.accessor)(record))
            .collect();
        let rows = row_count(&values);
        for row in 0..rows {
            let cells = values.iter().map(|value| match value {
                FieldValue::Text(text) => text.as_str(),
                FieldValue::List(items) => items.get(row).map(String::as_str).unwrap_or(""),
            });
            writer.write_record(cells)?;
        }
    }

    writer
        .into_inner()
        .map_err(|err| ExportError::Buffer(err.to_string()))
}

fn row_count(values: &[FieldValue]) -> usize {
    values
        .iter()
        .map(|value| match value {
            FieldValue::Text(_) => 1,
            FieldValue::List(items) => items.len().max(1),
        })
        .max()
        .unwrap_or(1)
}

/// JSON rendering keeps one object per record; list fields stay arrays.
pub(super) fn render_json<T>(
    records: &[T],
    fields: &[ExportField<T>],
) -> Result<Vec<u8>, ExportError> {
    let objects: Vec<Value> = records
        .iter()
        .map(|record| {
            let mut object = Map::new();
            for field in fields {
                let value = match (field.accessor)(record) {
                    FieldValue::Text(text) => Value::String(text),
                    FieldValue::List(items) => {
                        Value::Array(items.into_iter().map(Value::String).collect())
                    }
                };
                object.insert(field.display_name.to_string(), value);
            }
            Value::Object(object)
        })
        .collect();
    Ok(serde_json::to_vec_pretty(&objects)?)
}

#[cfg(test)]
mod tests {
    use super::super::metadata::Exportable;
    use super::*;

    struct Sample {
        name: String,
        tags: Vec<String>,
    }

    impl Exportable for Sample {
        fn export_fields() -> Vec<ExportField<Self>> {
            vec![
                ExportField {
                    display_name: "Name",
                    accessor: |record| FieldValue::Text(record.name.clone()),
                },
                ExportField {
                    display_name: "Tag",
                    accessor: |record| FieldValue::List(record.tags.clone()),
                },
            ]
        }
    }

    fn csv_lines(bytes: Vec<u8>) -> Vec<String> {
        String::from_utf8(bytes)
            .unwrap()
            .lines()
            .map(str::to_owned)
            .collect()
    }

    #[test]
    fn csv_expands_lists_into_one_row_per_element() {
        let records = vec![Sample {
            name: "newsletter".into(),
            tags: vec!["a@example.com".into(), "b@example.com".into(), "c@example.com".into()],
        }];
        let lines = csv_lines(render_csv(&records, &Sample::export_fields()).unwrap());
        assert_eq!(
            lines,
            vec![
                "Name,Tag",
                "newsletter,a@example.com",
                "newsletter,b@example.com",
                "newsletter,c@example.com",
            ]
        );
    }

    #[test]
    fn csv_keeps_one_row_for_records_with_empty_lists() {
        let records = vec![Sample {
            name: "quiet".into(),
            tags: vec![],
        }];
        let lines = csv_lines(render_csv(&records, &Sample::export_fields()).unwrap());
        assert_eq!(lines, vec!["Name,Tag", "quiet,"]);
    }

    #[test]
    fn csv_quotes_values_containing_commas_and_leaves_plus_signs_alone() {
        let records = vec![Sample {
            name: "a,b".into(),
            tags: vec!["user+tag@example.com".into()],
        }];
        let lines = csv_lines(render_csv(&records, &Sample::export_fields()).unwrap());
        assert_eq!(lines[1], "\"a,b\",user+tag@example.com");
    }

    #[test]
    fn json_renders_one_object_per_record_with_arrays_for_lists() {
        let records = vec![Sample {
            name: "newsletter".into(),
            tags: vec!["a@example.com".into(), "b@example.com".into()],
        }];
        let bytes = render_json(&records, &Sample::export_fields()).unwrap();
        let parsed: Value = serde_json::from_slice(&bytes).unwrap();
        let objects = parsed.as_array().unwrap();
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0]["Name"], "newsletter");
        assert_eq!(
            objects[0]["Tag"],
            serde_json::json!(["a@example.com", "b@example.com"])
        );
    }
}
